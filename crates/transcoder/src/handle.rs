use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{error, info, warn};

use crate::EngineError;
use crate::engine::Engine;

/// Engine readiness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Pending,
    Loading,
    Ready,
    /// Load failed. Permanent: there is no retry.
    Failed(String),
}

/// Owns the single engine instance for the life of the process.
pub struct TranscoderHandle {
    engine: Arc<dyn Engine>,
    state: Mutex<LoadState>,
}

impl TranscoderHandle {
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        Self {
            engine,
            state: Mutex::new(LoadState::Pending),
        }
    }

    /// Load the engine. Meant to be called exactly once; later calls do not
    /// reload and just report the current state.
    pub async fn load(&self) -> Result<(), EngineError> {
        let previous = {
            let mut state = self.state.lock();
            let previous = state.clone();
            if previous == LoadState::Pending {
                *state = LoadState::Loading;
            }
            previous
        };
        match previous {
            LoadState::Pending => {}
            LoadState::Ready => {
                warn!("engine load requested again, already ready");
                return Ok(());
            }
            LoadState::Loading => {
                warn!("engine load requested while loading");
                return Err(EngineError::NotLoaded);
            }
            LoadState::Failed(msg) => {
                warn!(error = %msg, "engine load requested again after failure");
                return Err(EngineError::LoadFailed(msg));
            }
        }

        let mut pending = LoadingGuard {
            state: &self.state,
            finished: false,
        };
        let result = self.engine.load().await;
        pending.finished = true;

        match result {
            Ok(()) => {
                *self.state.lock() = LoadState::Ready;
                info!(engine = self.engine.name(), "transcoder ready");
                Ok(())
            }
            Err(e) => {
                *self.state.lock() = LoadState::Failed(e.to_string());
                error!(engine = self.engine.name(), error = %e, "transcoder failed to load");
                Err(e)
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(*self.state.lock(), LoadState::Ready)
    }

    pub fn load_state(&self) -> LoadState {
        self.state.lock().clone()
    }

    pub fn engine(&self) -> &dyn Engine {
        self.engine.as_ref()
    }
}

/// Marks an abandoned load as failed so the handle never sticks in
/// `Loading`.
struct LoadingGuard<'a> {
    state: &'a Mutex<LoadState>,
    finished: bool,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            warn!("engine load cancelled before completion");
            *self.state.lock() = LoadState::Failed("load cancelled".to_string());
        }
    }
}
