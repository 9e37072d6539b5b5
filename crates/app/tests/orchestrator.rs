use std::sync::Arc;

use bytes::Bytes;
use giffer_app::download::DownloadTrigger;
use giffer_app::orchestrator::{ConvertOutcome, Notification, Orchestrator, OrchestratorSettings};
use giffer_app::prefs::Preferences;
use giffer_app::resource::BlobRegistry;
use giffer_core::error::USER_FAILURE_MESSAGE;
use giffer_core::format::UNKNOWN_SIZE;
use giffer_core::{ConversionStatus, ConvertError, InputFile, JobPhase, OutputKind};
use giffer_transcoder::{
    Engine, EngineError, FileStat, GifMode, StartRejected, TranscoderHandle,
};
use parking_lot::Mutex;
use tokio::sync::Notify;

/// Fake engine. `run` can be held open until the test releases it.
#[derive(Default)]
struct ScriptedEngine {
    calls: Mutex<Vec<String>>,
    gated: bool,
    run_entered: Notify,
    run_release: Notify,
    fail_run: bool,
    fail_stat: bool,
}

impl ScriptedEngine {
    fn gated() -> Self {
        Self {
            gated: true,
            ..Default::default()
        }
    }

    fn count(&self, prefix: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.starts_with(prefix)).count()
    }
}

#[async_trait::async_trait]
impl Engine for ScriptedEngine {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn load(&self) -> Result<(), EngineError> {
        self.calls.lock().push("load".into());
        Ok(())
    }

    async fn write_file(&self, path: &str, _data: Bytes) -> Result<(), EngineError> {
        self.calls.lock().push(format!("write {path}"));
        Ok(())
    }

    async fn run(&self, args: &[String]) -> Result<(), EngineError> {
        self.calls.lock().push(format!("run {}", args.join(" ")));
        if self.gated {
            self.run_entered.notify_one();
            self.run_release.notified().await;
        }
        if self.fail_run {
            return Err(EngineError::RunFailed("Invalid data found when processing input".into()));
        }
        Ok(())
    }

    async fn read_file(&self, path: &str) -> Result<Bytes, EngineError> {
        self.calls.lock().push(format!("read {path}"));
        if path.ends_with(".gif") {
            Ok(Bytes::from_static(b"GIF89a-fake"))
        } else {
            Ok(Bytes::from_static(b"ftyp-fake-mp4"))
        }
    }

    async fn stat(&self, path: &str) -> Result<FileStat, EngineError> {
        self.calls.lock().push(format!("stat {path}"));
        if self.fail_stat {
            return Err(EngineError::FileNotFound(path.into()));
        }
        Ok(FileStat { size: 1_240_000 })
    }

    async fn remove_file(&self, path: &str) -> Result<(), EngineError> {
        self.calls.lock().push(format!("remove {path}"));
        Ok(())
    }
}

/// Records downloads and whether the URL was alive when clicked.
struct RecordingDownloads {
    blobs: BlobRegistry,
    clicks: Mutex<Vec<(String, String, bool)>>,
}

impl DownloadTrigger for RecordingDownloads {
    fn trigger(&self, url: &str, suggested_filename: &str) {
        let alive = self.blobs.is_alive(url);
        self.clicks
            .lock()
            .push((url.to_string(), suggested_filename.to_string(), alive));
    }
}

struct Harness {
    engine: Arc<ScriptedEngine>,
    downloads: Arc<RecordingDownloads>,
    orch: Arc<Orchestrator>,
}

fn harness(engine: ScriptedEngine, auto_download: bool) -> Harness {
    let engine = Arc::new(engine);
    let blobs = BlobRegistry::new();
    let downloads = Arc::new(RecordingDownloads {
        blobs: blobs.clone(),
        clicks: Mutex::new(Vec::new()),
    });
    let orch = Orchestrator::new(
        Arc::new(TranscoderHandle::new(engine.clone())),
        blobs,
        downloads.clone(),
        Preferences::in_memory(),
        OrchestratorSettings {
            gif_mode: GifMode::Palette,
            auto_download,
            size_decimals: 2,
        },
    );
    Harness {
        engine,
        downloads,
        orch: Arc::new(orch),
    }
}

async fn ready(engine: ScriptedEngine, auto_download: bool) -> Harness {
    let h = harness(engine, auto_download);
    h.orch.load_engine().await.unwrap();
    h
}

fn clip(name: &str) -> InputFile {
    InputFile::new(vec![7u8; 64], name, Some("video/mp4"))
}

#[tokio::test]
async fn gif_conversion_succeeds_with_resolved_options() {
    let h = ready(ScriptedEngine::default(), false).await;
    h.orch.set_output_kind("gif").unwrap();
    h.orch.set_width("500").unwrap();
    h.orch.set_fps("").unwrap();
    h.orch.select_file(clip("a.mp4"));

    let outcome = h.orch.convert().await;
    let ConvertOutcome::Succeeded { url, size_display } = outcome else {
        panic!("expected success, got {outcome:?}");
    };
    assert_eq!(size_display, "~1.24 MB");

    let blob = h.orch.blobs().resolve(&url).unwrap();
    assert_eq!(blob.mime_type, "image/gif");

    let report = h.orch.last_job().unwrap();
    assert_eq!(report.options.width_px, 500);
    assert_eq!(report.options.fps, 15);
    assert_eq!(report.options.output_kind, OutputKind::Gif);
    assert_eq!(
        report.phases,
        [
            JobPhase::Idle,
            JobPhase::Staging,
            JobPhase::Transcoding,
            JobPhase::ReadingOutput,
            JobPhase::Succeeded
        ]
    );

    let snap = h.orch.snapshot();
    assert_eq!(snap.status, ConversionStatus::Succeeded);
    assert_eq!(snap.output_url, url);
    assert_eq!(snap.output_kind, Some(OutputKind::Gif));
    assert_eq!(
        snap.notification,
        Some(Notification::Success {
            size_display: "~1.24 MB".into()
        })
    );
    assert!(!h.orch.is_converting());
}

#[tokio::test]
async fn run_failure_marks_job_failed_and_leaves_output_empty() {
    let h = ready(
        ScriptedEngine {
            fail_run: true,
            ..Default::default()
        },
        true,
    )
    .await;
    h.orch.select_file(clip("a.mp4"));

    let outcome = h.orch.convert().await;
    assert!(matches!(
        outcome,
        ConvertOutcome::Failed(ConvertError::ConversionFailure {
            stage: JobPhase::Transcoding,
            ..
        })
    ));

    let snap = h.orch.snapshot();
    assert_eq!(snap.status, ConversionStatus::Failed);
    assert!(snap.output_url.is_empty());
    assert_eq!(snap.error_message, USER_FAILURE_MESSAGE);
    assert!(!snap.error_message.contains("Invalid data"));
    assert!(!h.orch.is_converting());
    assert!(h.downloads.clicks.lock().is_empty());
    assert_eq!(h.orch.last_job().unwrap().error.unwrap().code, "conversion_failure");
}

#[tokio::test]
async fn result_for_superseded_input_is_discarded() {
    let h = ready(ScriptedEngine::gated(), true).await;
    h.orch.select_file(clip("first.mp4"));

    let task = tokio::spawn({
        let orch = h.orch.clone();
        async move { orch.convert().await }
    });
    h.engine.run_entered.notified().await;
    assert!(h.orch.is_converting());
    assert_eq!(h.orch.snapshot().status, ConversionStatus::Converting);

    h.orch.select_file(clip("second.mp4"));
    h.engine.run_release.notify_one();

    let outcome = task.await.unwrap();
    assert!(matches!(outcome, ConvertOutcome::Stale));

    let snap = h.orch.snapshot();
    assert!(snap.output_url.is_empty());
    assert_eq!(snap.status, ConversionStatus::Idle);
    assert!(snap.has_input);
    assert!(h.orch.last_job().is_none());
    assert!(h.downloads.clicks.lock().is_empty());
    // Only the source preview of the second file is alive.
    assert_eq!(h.orch.blobs().live_count(), 1);
    assert!(!h.orch.is_converting());
}

#[tokio::test]
async fn convert_while_running_is_ignored() {
    let h = ready(ScriptedEngine::gated(), false).await;
    h.orch.select_file(clip("a.mp4"));

    let task = tokio::spawn({
        let orch = h.orch.clone();
        async move { orch.convert().await }
    });
    h.engine.run_entered.notified().await;

    let before = h.orch.snapshot();
    let second = h.orch.convert().await;
    assert!(matches!(second, ConvertOutcome::Ignored(StartRejected::Busy)));
    let after = h.orch.snapshot();
    assert_eq!(before.status, after.status);
    assert_eq!(before.source_url, after.source_url);
    assert_eq!(h.engine.count("run"), 1);

    h.engine.run_release.notify_one();
    assert!(matches!(task.await.unwrap(), ConvertOutcome::Succeeded { .. }));
    assert_eq!(h.engine.count("run"), 1);
}

#[tokio::test]
async fn convert_without_file_is_ignored() {
    let h = ready(ScriptedEngine::default(), false).await;

    let outcome = h.orch.convert().await;
    assert!(matches!(outcome, ConvertOutcome::Ignored(StartRejected::NoInput)));
    assert_eq!(h.orch.snapshot().status, ConversionStatus::Idle);
    assert_eq!(h.engine.count("write"), 0);
    assert!(h.orch.last_job().is_none());
}

#[tokio::test]
async fn convert_before_engine_load_is_refused() {
    let h = harness(ScriptedEngine::default(), false);
    h.orch.select_file(clip("a.mp4"));

    let outcome = h.orch.convert().await;
    assert!(matches!(outcome, ConvertOutcome::NotReady));
    let snap = h.orch.snapshot();
    assert!(!snap.engine_ready);
    assert_eq!(snap.status, ConversionStatus::Idle);
    assert!(snap.output_url.is_empty());
    assert!(h.engine.calls.lock().is_empty());
}

#[tokio::test]
async fn republishing_output_revokes_previous_url() {
    let h = ready(ScriptedEngine::default(), false).await;
    h.orch.select_file(clip("a.mp4"));

    let ConvertOutcome::Succeeded { url: first, .. } = h.orch.convert().await else {
        panic!("first conversion failed");
    };
    h.orch.set_output_kind("mp4").unwrap();
    let ConvertOutcome::Succeeded { url: second, .. } = h.orch.convert().await else {
        panic!("second conversion failed");
    };

    assert_ne!(first, second);
    assert!(!h.orch.blobs().is_alive(&first));
    assert_eq!(h.orch.blobs().resolve(&second).unwrap().mime_type, "video/mp4");
    // source preview + one output
    assert_eq!(h.orch.blobs().live_count(), 2);
}

#[tokio::test]
async fn new_selection_clears_previous_output() {
    let h = ready(ScriptedEngine::default(), false).await;
    h.orch.select_file(clip("a.mp4"));
    let ConvertOutcome::Succeeded { url, .. } = h.orch.convert().await else {
        panic!("conversion failed");
    };
    let old_source = h.orch.snapshot().source_url;

    h.orch.select_file(clip("b.mp4"));
    let snap = h.orch.snapshot();
    assert!(snap.output_url.is_empty());
    assert!(snap.notification.is_none());
    assert_eq!(snap.status, ConversionStatus::Idle);
    assert!(!h.orch.blobs().is_alive(&url));
    assert!(!h.orch.blobs().is_alive(&old_source));
    assert_ne!(snap.source_url, old_source);
}

#[tokio::test]
async fn auto_download_uses_chosen_name() {
    let h = ready(ScriptedEngine::default(), true).await;
    h.orch.set_filename("holiday").unwrap();
    h.orch.set_output_kind("mp4").unwrap();
    h.orch.select_file(clip("a.mov"));

    let ConvertOutcome::Succeeded { url, .. } = h.orch.convert().await else {
        panic!("conversion failed");
    };
    let clicks = h.downloads.clicks.lock().clone();
    assert_eq!(clicks, vec![(url, "holiday.mp4".to_string(), true)]);
}

#[tokio::test]
async fn manual_download_and_dismiss() {
    let h = ready(
        ScriptedEngine {
            fail_stat: true,
            ..Default::default()
        },
        false,
    )
    .await;
    assert!(!h.orch.download());

    h.orch.select_file(clip("a.mp4"));
    let ConvertOutcome::Succeeded { url, size_display } = h.orch.convert().await else {
        panic!("conversion failed");
    };
    assert_eq!(size_display, UNKNOWN_SIZE);
    assert!(h.downloads.clicks.lock().is_empty());

    assert!(h.orch.download());
    assert_eq!(h.downloads.clicks.lock()[0].1, "mygif.gif");

    h.orch.dismiss_notification();
    let snap = h.orch.snapshot();
    assert!(snap.notification.is_none());
    assert!(snap.output_url.is_empty());
    assert!(!h.orch.blobs().is_alive(&url));
    assert!(!h.orch.download());
    // Dismissing twice is harmless.
    h.orch.dismiss_notification();
}

#[tokio::test]
async fn close_releases_every_url() {
    let h = ready(ScriptedEngine::default(), false).await;
    h.orch.select_file(clip("a.mp4"));
    assert!(matches!(h.orch.convert().await, ConvertOutcome::Succeeded { .. }));
    assert_eq!(h.orch.blobs().live_count(), 2);

    h.orch.close();
    assert_eq!(h.orch.blobs().live_count(), 0);
    let snap = h.orch.snapshot();
    assert!(!snap.has_input);
    assert!(snap.source_url.is_empty());
}

#[tokio::test]
async fn scratch_files_are_removed_after_read_back() {
    let h = ready(ScriptedEngine::default(), false).await;
    h.orch.select_file(clip("a.mp4"));
    h.orch.convert().await;

    let calls = h.engine.calls.lock().clone();
    let read = calls.iter().position(|c| c == "read output.gif").unwrap();
    let removed_input = calls.iter().position(|c| c == "remove input.mp4").unwrap();
    assert!(removed_input > read);
    assert!(calls.iter().any(|c| c == "remove output.gif"));
}

#[tokio::test]
async fn last_job_is_forgotten_with_its_input() {
    let h = ready(ScriptedEngine::default(), false).await;
    h.orch.select_file(clip("a.mp4"));
    assert!(matches!(h.orch.convert().await, ConvertOutcome::Succeeded { .. }));
    assert!(h.orch.last_job().is_some());

    h.orch.select_file(clip("b.mp4"));
    assert!(h.orch.last_job().is_none());

    assert!(matches!(h.orch.convert().await, ConvertOutcome::Succeeded { .. }));
    assert!(h.orch.last_job().is_some());
    h.orch.clear_file();
    assert!(h.orch.last_job().is_none());

    h.orch.select_file(clip("c.mp4"));
    assert!(matches!(h.orch.convert().await, ConvertOutcome::Succeeded { .. }));
    h.orch.close();
    assert!(h.orch.last_job().is_none());
}
