use giffer_core::InputFile;
use tracing::debug;

use crate::EngineError;
use crate::engine::Engine;

/// Canonical name of the staged input inside the engine filesystem.
/// Overwritten by every job.
pub const INPUT_PATH: &str = "input.mp4";

/// Copy the full input into the engine filesystem.
pub async fn stage_input(engine: &dyn Engine, input: &InputFile) -> Result<(), EngineError> {
    debug!(file = %input.name, bytes = input.len(), path = INPUT_PATH, "staging input");
    engine.write_file(INPUT_PATH, input.bytes.clone()).await
}

/// Remove staged input and produced output. Failures are logged only.
pub async fn remove_scratch_files(engine: &dyn Engine, paths: &[&str]) {
    for path in paths {
        if let Err(e) = engine.remove_file(path).await {
            debug!(path, error = %e, "scratch cleanup skipped");
        }
    }
}
