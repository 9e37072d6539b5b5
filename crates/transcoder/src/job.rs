use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use bytes::Bytes;
use giffer_core::{ConversionOptions, ConvertError, InputFile, JobPhase, OutputKind};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::GifMode;
use crate::args::transcode_args;
use crate::handle::TranscoderHandle;
use crate::staging::{INPUT_PATH, remove_scratch_files, stage_input};

/// Bytes produced by a successful job.
#[derive(Debug, Clone)]
pub struct JobOutput {
    pub bytes: Bytes,
    pub kind: OutputKind,
    /// `None` when the engine could not report a size.
    pub size: Option<u64>,
}

impl JobOutput {
    pub fn mime_type(&self) -> &'static str {
        self.kind.mime_type()
    }
}

/// Why a start request was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartRejected {
    NoInput,
    Busy,
}

/// Single-flight flag: at most one job may be past Idle at a time.
#[derive(Debug, Clone, Default)]
pub struct InFlight(Arc<AtomicBool>);

/// Held by the running job. Dropping it clears the flag on every exit path.
#[derive(Debug)]
pub struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Claim the flag and create a job. Rejected requests change nothing.
    pub fn try_start(
        &self,
        generation: u64,
        input: Option<&InputFile>,
        options: ConversionOptions,
    ) -> Result<(ConversionJob, InFlightGuard), StartRejected> {
        let input = input.ok_or(StartRejected::NoInput)?;
        if self
            .0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(StartRejected::Busy);
        }
        let job = ConversionJob::new(generation, input.clone(), options);
        Ok((job, InFlightGuard(self.0.clone())))
    }
}

/// One conversion: Staging -> Transcoding -> ReadingOutput -> Succeeded | Failed.
#[derive(Debug)]
pub struct ConversionJob {
    generation: u64,
    input: InputFile,
    options: ConversionOptions,
    phase: JobPhase,
    history: Vec<JobPhase>,
    started_at: Instant,
}

impl ConversionJob {
    pub fn new(generation: u64, input: InputFile, options: ConversionOptions) -> Self {
        Self {
            generation,
            input,
            options,
            phase: JobPhase::Idle,
            history: vec![JobPhase::Idle],
            started_at: Instant::now(),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn input_id(&self) -> Uuid {
        self.input.id()
    }

    pub fn options(&self) -> &ConversionOptions {
        &self.options
    }

    pub fn phase(&self) -> JobPhase {
        self.phase
    }

    /// Every phase entered so far, in order.
    pub fn history(&self) -> &[JobPhase] {
        &self.history
    }

    fn enter(&mut self, phase: JobPhase) {
        debug!(job = self.generation, from = %self.phase, to = %phase, "job phase");
        self.phase = phase;
        self.history.push(phase);
    }

    /// Drive the job to a terminal phase. An engine that is not ready is
    /// refused up front and the job stays Idle.
    pub async fn run(
        &mut self,
        handle: &TranscoderHandle,
        gif_mode: GifMode,
    ) -> Result<JobOutput, ConvertError> {
        if !handle.is_ready() {
            warn!(job = self.generation, "conversion requested before engine was ready");
            return Err(ConvertError::EngineNotReady);
        }

        match self.execute(handle, gif_mode).await {
            Ok(output) => {
                self.enter(JobPhase::Succeeded);
                info!(
                    job = self.generation,
                    kind = %output.kind,
                    size = ?output.size,
                    elapsed_ms = self.started_at.elapsed().as_millis() as u64,
                    "conversion succeeded"
                );
                Ok(output)
            }
            Err(e) => {
                self.enter(JobPhase::Failed);
                warn!(job = self.generation, error = %e, "conversion failed");
                Err(e)
            }
        }
    }

    async fn execute(
        &mut self,
        handle: &TranscoderHandle,
        gif_mode: GifMode,
    ) -> Result<JobOutput, ConvertError> {
        let engine = handle.engine();
        let kind = self.options.output_kind;
        let output_path = kind.output_path();

        self.enter(JobPhase::Staging);
        stage_input(engine, &self.input)
            .await
            .map_err(|e| ConvertError::failure(JobPhase::Staging, e))?;

        self.enter(JobPhase::Transcoding);
        let args = transcode_args(&self.options, gif_mode);
        info!(job = self.generation, file = %self.input.name, ?args, "transcoding");
        engine
            .run(&args)
            .await
            .map_err(|e| ConvertError::failure(JobPhase::Transcoding, e))?;

        self.enter(JobPhase::ReadingOutput);
        let bytes = engine
            .read_file(&output_path)
            .await
            .map_err(|e| ConvertError::failure(JobPhase::ReadingOutput, e))?;

        let size = match engine.stat(&output_path).await {
            Ok(stat) => Some(stat.size),
            Err(e) => {
                let err = ConvertError::StatUnavailable(e.to_string());
                debug!(job = self.generation, error = %err, "using unknown size");
                None
            }
        };

        remove_scratch_files(engine, &[INPUT_PATH, output_path.as_str()]).await;

        Ok(JobOutput { bytes, kind, size })
    }
}
