//! Conversion orchestration.
//!
//! The orchestrator owns the selected input, the source-preview and output
//! slots, and the job generation counter. Every file selection and every job
//! start bumps the counter; a finished job is applied only while its stamp
//! is still the latest, so results for a superseded input are dropped.

use std::sync::Arc;

use giffer_core::error::ErrorSummary;
use giffer_core::format::format_size;
use giffer_core::{ConversionOptions, ConversionStatus, ConvertError, InputFile, JobPhase, OutputKind};
use giffer_transcoder::{
    ConversionJob, EngineError, GifMode, InFlight, JobOutput, StartRejected, TranscoderHandle,
};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info};

use crate::download::{DownloadLink, DownloadTrigger, download_filename};
use crate::prefs::{PrefsError, Preferences, RawSettings, keys};
use crate::resource::{BlobRegistry, ResourceSlot};

/// Behavior switches for an [`Orchestrator`].
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub gif_mode: GifMode,
    pub auto_download: bool,
    pub size_decimals: usize,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            gif_mode: GifMode::Palette,
            auto_download: false,
            size_decimals: 2,
        }
    }
}

/// Dismissible result notice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    Success { size_display: String },
    Failure { message: String },
}

/// What presentation layers see.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub engine_ready: bool,
    pub status: ConversionStatus,
    pub has_input: bool,
    pub source_url: String,
    pub output_url: String,
    pub output_kind: Option<OutputKind>,
    pub output_size_display: String,
    pub error_message: String,
    pub notification: Option<Notification>,
}

/// Record of the last job whose result was applied. Forgotten when the
/// input changes or the session closes.
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub generation: u64,
    pub options: ConversionOptions,
    pub phases: Vec<JobPhase>,
    pub error: Option<ErrorSummary>,
}

/// Result of one `convert` call.
#[derive(Debug)]
pub enum ConvertOutcome {
    Succeeded { url: String, size_display: String },
    Failed(ConvertError),
    /// Start request dropped without changing any state.
    Ignored(StartRejected),
    NotReady,
    /// Finished after the input was replaced; result discarded.
    Stale,
}

struct State {
    generation: u64,
    input: Option<InputFile>,
    source: ResourceSlot,
    output: ResourceSlot,
    output_kind: Option<OutputKind>,
    result: ConversionStatus,
    output_size_display: String,
    error_message: Option<String>,
    notification: Option<Notification>,
    last_job: Option<JobReport>,
}

impl State {
    /// Forget everything derived from the previous input.
    fn reset_result(&mut self) {
        self.output.clear();
        self.output_kind = None;
        self.result = ConversionStatus::Idle;
        self.output_size_display.clear();
        self.error_message = None;
        self.notification = None;
    }
}

pub struct Orchestrator {
    transcoder: Arc<TranscoderHandle>,
    blobs: BlobRegistry,
    downloads: Arc<dyn DownloadTrigger>,
    prefs: Preferences,
    settings: OrchestratorSettings,
    in_flight: InFlight,
    state: Mutex<State>,
}

impl Orchestrator {
    pub fn new(
        transcoder: Arc<TranscoderHandle>,
        blobs: BlobRegistry,
        downloads: Arc<dyn DownloadTrigger>,
        prefs: Preferences,
        settings: OrchestratorSettings,
    ) -> Self {
        let state = State {
            generation: 0,
            input: None,
            source: ResourceSlot::new("source", blobs.clone()),
            output: ResourceSlot::new("output", blobs.clone()),
            output_kind: None,
            result: ConversionStatus::Idle,
            output_size_display: String::new(),
            error_message: None,
            notification: None,
            last_job: None,
        };
        Self {
            transcoder,
            blobs,
            downloads,
            prefs,
            settings,
            in_flight: InFlight::new(),
            state: Mutex::new(state),
        }
    }

    /// Load the engine. A failure leaves the orchestrator permanently not
    /// ready.
    pub async fn load_engine(&self) -> Result<(), EngineError> {
        self.transcoder.load().await
    }

    pub fn blobs(&self) -> &BlobRegistry {
        &self.blobs
    }

    pub fn preferences(&self) -> &Preferences {
        &self.prefs
    }

    /// Replace the selected input. Any previous output is released and any
    /// in-flight job is superseded.
    pub fn select_file(&self, file: InputFile) {
        let mut st = self.state.lock();
        st.generation += 1;
        st.reset_result();
        st.last_job = None;
        let url = st.source.publish(file.bytes.clone(), &file.mime_hint);
        info!(
            file = %file.name,
            bytes = file.len(),
            generation = st.generation,
            source_url = %url,
            "input selected"
        );
        st.input = Some(file);
    }

    /// Drop the selected input and both artifacts.
    pub fn clear_file(&self) {
        let mut st = self.state.lock();
        st.generation += 1;
        st.reset_result();
        st.last_job = None;
        st.source.clear();
        st.input = None;
        debug!(generation = st.generation, "input cleared");
    }

    pub fn raw_settings(&self) -> RawSettings {
        self.prefs.raw_settings()
    }

    pub fn set_width(&self, raw: &str) -> Result<(), PrefsError> {
        self.prefs.set_value(keys::WIDTH, raw)
    }

    pub fn set_fps(&self, raw: &str) -> Result<(), PrefsError> {
        self.prefs.set_value(keys::FPS, raw)
    }

    pub fn set_output_kind(&self, raw_ext: &str) -> Result<(), PrefsError> {
        self.prefs.set_value(keys::KIND, raw_ext)
    }

    pub fn set_filename(&self, raw: &str) -> Result<(), PrefsError> {
        self.prefs.set_value(keys::FILENAME, raw)
    }

    /// Convert the selected input with the current settings. Ignored when
    /// nothing is selected or a job is already running.
    pub async fn convert(&self) -> ConvertOutcome {
        let raw = self.prefs.raw_settings();
        let options = ConversionOptions::resolve(&raw.width, &raw.fps, &raw.kind);

        let started = {
            let mut st = self.state.lock();
            let generation = st.generation + 1;
            let started = self.in_flight.try_start(generation, st.input.as_ref(), options);
            if started.is_ok() {
                st.generation = generation;
                st.error_message = None;
                st.notification = None;
            }
            started
        };
        let (mut job, guard) = match started {
            Ok(started) => started,
            Err(rejected) => {
                debug!(?rejected, "convert request ignored");
                return ConvertOutcome::Ignored(rejected);
            }
        };

        info!(
            job = job.generation(),
            width = options.width_px,
            fps = options.fps,
            kind = %options.output_kind,
            "conversion started"
        );
        let result = job.run(&self.transcoder, self.settings.gif_mode).await;
        let outcome = self.finish(&job, result, &raw.filename);

        // Clearing the in-flight flag is always the last step.
        drop(guard);
        outcome
    }

    fn finish(
        &self,
        job: &ConversionJob,
        result: Result<JobOutput, ConvertError>,
        filename: &str,
    ) -> ConvertOutcome {
        let (url, size_display, link) = {
            let mut st = self.state.lock();
            let current_input = st.input.as_ref().map(InputFile::id);
            if st.generation != job.generation() || current_input != Some(job.input_id()) {
                info!(
                    job = job.generation(),
                    latest = st.generation,
                    "discarding result for superseded input"
                );
                return ConvertOutcome::Stale;
            }

            if matches!(result, Err(ConvertError::EngineNotReady)) {
                return ConvertOutcome::NotReady;
            }

            st.last_job = Some(JobReport {
                generation: job.generation(),
                options: *job.options(),
                phases: job.history().to_vec(),
                error: result.as_ref().err().map(ErrorSummary::from),
            });

            match result {
                Ok(output) => {
                    let url = st.output.publish(output.bytes, output.kind.mime_type());
                    let size_display = format_size(output.size, self.settings.size_decimals);
                    st.output_kind = Some(output.kind);
                    st.output_size_display = size_display.clone();
                    st.result = ConversionStatus::Succeeded;
                    st.notification = Some(Notification::Success {
                        size_display: size_display.clone(),
                    });
                    let link = self
                        .settings
                        .auto_download
                        .then(|| DownloadLink::new(url.clone(), download_filename(filename, output.kind)));
                    (url, size_display, link)
                }
                Err(e) => {
                    let message = e.user_message().to_string();
                    st.result = ConversionStatus::Failed;
                    st.error_message = Some(message.clone());
                    st.notification = Some(Notification::Failure { message });
                    return ConvertOutcome::Failed(e);
                }
            }
        };

        if let Some(link) = link {
            link.click(self.downloads.as_ref());
        }
        ConvertOutcome::Succeeded { url, size_display }
    }

    /// Download the current output under the configured file name.
    /// Returns false when there is nothing to download.
    pub fn download(&self) -> bool {
        let link = {
            let st = self.state.lock();
            match (st.output.url(), st.output_kind) {
                (Some(url), Some(kind)) => {
                    let filename = self.prefs.raw_settings().filename;
                    DownloadLink::new(url, download_filename(&filename, kind))
                }
                _ => return false,
            }
        };
        link.click(self.downloads.as_ref());
        true
    }

    /// Dismiss the result notice, releasing the output artifact.
    pub fn dismiss_notification(&self) {
        let mut st = self.state.lock();
        if st.notification.is_some() || !st.output.is_empty() {
            debug!("notification dismissed");
        }
        st.reset_result();
    }

    /// End the session: release every artifact and forget the input.
    pub fn close(&self) {
        let mut st = self.state.lock();
        st.generation += 1;
        st.reset_result();
        st.last_job = None;
        st.source.clear();
        st.input = None;
        info!(live_urls = self.blobs.live_count(), "session closed");
    }

    pub fn is_converting(&self) -> bool {
        self.in_flight.is_active()
    }

    pub fn last_job(&self) -> Option<JobReport> {
        self.state.lock().last_job.clone()
    }

    pub fn snapshot(&self) -> Snapshot {
        let st = self.state.lock();
        let status = if self.in_flight.is_active() {
            ConversionStatus::Converting
        } else {
            st.result
        };
        Snapshot {
            engine_ready: self.transcoder.is_ready(),
            status,
            has_input: st.input.is_some(),
            source_url: st.source.url().unwrap_or_default().to_string(),
            output_url: st.output.url().unwrap_or_default().to_string(),
            output_kind: st.output_kind,
            output_size_display: st.output_size_display.clone(),
            error_message: st.error_message.clone().unwrap_or_default(),
            notification: st.notification.clone(),
        }
    }
}
