pub mod config;
pub mod download;
pub mod orchestrator;
pub mod prefs;
pub mod resource;

pub use orchestrator::{ConvertOutcome, Notification, Orchestrator, Snapshot};
