//! ffmpeg argument lists for each output kind.

use giffer_core::{ConversionOptions, OutputKind};

use crate::GifMode;
use crate::staging::INPUT_PATH;

/// Build the engine `run` arguments for one conversion.
pub fn transcode_args(options: &ConversionOptions, gif_mode: GifMode) -> Vec<String> {
    let output = options.output_kind.output_path();
    let mut args: Vec<String> = vec!["-i".into(), INPUT_PATH.into()];

    match options.output_kind {
        OutputKind::Gif => {
            let base = format!("fps={},scale={}:-1", options.fps, options.width_px);
            match gif_mode {
                GifMode::Palette => args.extend([
                    "-filter_complex".into(),
                    format!("{base}:flags=lanczos,split[s0][s1];[s0]palettegen[p];[s1][p]paletteuse"),
                ]),
                GifMode::Simple => args.extend(["-vf".into(), base]),
            }
        }
        // Straight container conversion, no filters.
        OutputKind::Mp4 => {}
    }

    args.push(output);
    args
}
