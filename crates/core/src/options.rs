use serde::{Deserialize, Serialize};

use crate::types::OutputKind;

pub const DEFAULT_WIDTH_PX: u32 = 200;
pub const DEFAULT_FPS: u32 = 15;

/// Validated conversion parameters, derived from raw user input per job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionOptions {
    pub width_px: u32,
    pub fps: u32,
    pub output_kind: OutputKind,
}

impl ConversionOptions {
    /// Resolve raw strings into options. Never fails: anything unusable
    /// degrades to the defaults.
    pub fn resolve(raw_width: &str, raw_fps: &str, raw_kind_ext: &str) -> Self {
        Self {
            width_px: positive_or(raw_width, DEFAULT_WIDTH_PX),
            fps: positive_or(raw_fps, DEFAULT_FPS),
            output_kind: OutputKind::from_ext_or_default(raw_kind_ext),
        }
    }
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            width_px: DEFAULT_WIDTH_PX,
            fps: DEFAULT_FPS,
            output_kind: OutputKind::SUPPORTED[0],
        }
    }
}

fn positive_or(raw: &str, default: u32) -> u32 {
    match parse_leading_int(raw) {
        Some(v) if v > 0 => u32::try_from(v).unwrap_or(default),
        _ => default,
    }
}

/// Lenient integer parse: leading whitespace, an optional sign, then the
/// longest run of ASCII digits. Trailing garbage is ignored ("500px" is 500).
fn parse_leading_int(raw: &str) -> Option<i64> {
    let s = raw.trim_start();
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let value: i64 = rest[..digits].parse().ok()?;
    Some(if negative { -value } else { value })
}
