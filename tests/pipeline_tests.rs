//! End-to-end pipeline scenarios against the in-tree engine doubles

use std::sync::Arc;

use bytes::Bytes;
use clipforge::engine::mock::{MockEngine, MockLoader};
use clipforge::engine::{Engine, EngineLifecycle};
use clipforge::probe::mock::StaticProbe;
use clipforge::probe::{MediaSource, ProbeError};
use clipforge::trim::PolicyError;
use clipforge::{ClipMode, ErrorCategory, JobError, JobState, PipelineConfig, SubmitError, TranscodeJob};

// Test utilities

fn source(name: &str, content_type: &str) -> MediaSource {
    MediaSource::new(name, content_type, Bytes::from_static(b"raw video bytes"))
}

fn job_with(
    engine: Arc<MockEngine>,
    probe: StaticProbe,
) -> (TranscodeJob, Arc<MockLoader>, Arc<EngineLifecycle>) {
    let loader = Arc::new(MockLoader::new(engine));
    let lifecycle = EngineLifecycle::new(loader.clone());
    let job = TranscodeJob::new(
        lifecycle.clone(),
        Arc::new(probe),
        &PipelineConfig::default(),
    );
    (job, loader, lifecycle)
}

fn completed(state: JobState) -> clipforge::OutputFile {
    match state {
        JobState::Completed(output) => output,
        other => panic!("expected completion, job ended {}", other.name()),
    }
}

fn has_pair(args: &[String], flag: &str, value: &str) -> bool {
    args.windows(2).any(|w| w[0] == flag && w[1] == value)
}

// Scenario: 600 s source, trim [10, 40], stream copy

#[tokio::test]
async fn stream_copy_trim_produces_a_30s_clip() {
    let engine = MockEngine::succeeding();
    let (mut job, _loader, _lifecycle) =
        job_with(engine.clone(), StaticProbe::new(600.0, 1280, 720));

    job.open(source("lecture.mp4", "video/mp4")).await.unwrap();
    {
        let window = job.window_mut().unwrap();
        assert!(window.set_end(40.0));
        assert!(window.set_start(10.0));
    }
    job.set_mode(ClipMode::StreamCopy);

    let output = completed(job.submit().await.unwrap());
    assert_eq!(output.name, "lecture.mp4");
    assert_eq!(output.content_type, "video/mp4");

    let plan = job.plan().unwrap();
    assert_eq!(plan.mode, ClipMode::StreamCopy);
    assert_eq!(plan.duration_seconds, 30.0);

    let runs = engine.runs();
    assert_eq!(runs.len(), 1);
    let args = &runs[0];
    assert!(has_pair(args, "-ss", "10.000"));
    assert!(has_pair(args, "-t", "30.000"));
    assert!(has_pair(args, "-c:v", "copy"));
    assert!(has_pair(args, "-c:a", "copy"));
    assert!(has_pair(args, "-movflags", "+faststart"));

    // No staged entries survive a completed job
    assert!(engine.entries().await.is_empty());
}

// Scenario: 1080p source, trim [0, 20], re-encode

#[tokio::test]
async fn reencode_caps_1080p_at_720() {
    let engine = MockEngine::succeeding();
    let (mut job, _loader, _lifecycle) =
        job_with(engine.clone(), StaticProbe::new(90.0, 1920, 1080));

    job.open(source("phone.mov", "video/quicktime"))
        .await
        .unwrap();
    {
        let window = job.window_mut().unwrap();
        assert!(window.set_end(20.0));
    }
    job.set_mode(ClipMode::ReEncode);

    let output = completed(job.submit().await.unwrap());
    assert_eq!(output.content_type, "video/mp4");

    let plan = job.plan().unwrap();
    assert_eq!(plan.target_height, Some(720));
    assert_eq!(plan.duration_seconds, 20.0);

    let args = &engine.runs()[0];
    assert!(has_pair(args, "-t", "20.000"));
    assert!(has_pair(args, "-vf", "scale=-2:720"));
    assert!(has_pair(args, "-c:v", "libx264"));
    assert!(has_pair(args, "-b:a", "128k"));
    assert!(has_pair(args, "-movflags", "+faststart"));
    assert!(engine.entries().await.is_empty());
}

// Scenario: over-length selection is refused before the engine runs

#[tokio::test]
async fn over_limit_selection_is_refused_and_stays_editable() {
    let engine = MockEngine::succeeding();
    let (mut job, _loader, _lifecycle) =
        job_with(engine.clone(), StaticProbe::new(600.0, 1280, 720));

    job.open(source("lecture.mp4", "video/mp4")).await.unwrap();
    assert!(job.window_mut().unwrap().set_end(400.0));

    let refusal = job.submit().await.unwrap_err();
    assert!(matches!(
        refusal,
        SubmitError::Policy(PolicyError::ClipTooLong { .. })
    ));
    assert_eq!(engine.run_count(), 0);
    assert_eq!(job.state(), JobState::Idle);

    // The job stays editable: shrink the window and resubmit
    assert!(job.window_mut().unwrap().set_end(250.0));
    completed(job.submit().await.unwrap());
    assert_eq!(engine.run_count(), 1);
}

#[tokio::test]
async fn empty_selection_is_refused() {
    let engine = MockEngine::succeeding();
    let (mut job, _loader, _lifecycle) =
        job_with(engine.clone(), StaticProbe::new(0.0, 640, 480));

    job.open(source("broken.mp4", "video/mp4")).await.unwrap();
    let refusal = job.submit().await.unwrap_err();
    assert_eq!(refusal, SubmitError::Policy(PolicyError::EmptyWindow));
    assert_eq!(engine.run_count(), 0);
}

// Scenario: non-video input never loads the engine

#[tokio::test]
async fn non_video_input_is_rejected_without_loading_the_engine() {
    let engine = MockEngine::succeeding();
    let (mut job, loader, _lifecycle) =
        job_with(engine.clone(), StaticProbe::new(60.0, 1280, 720));

    let err = job
        .open(source("photo.png", "image/png"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        JobError::Input(ProbeError::NotAVideo { .. })
    ));
    assert_eq!(err.category(), ErrorCategory::NotAVideo);
    assert!(matches!(job.state(), JobState::Failed(_)));

    assert_eq!(loader.load_count(), 0);
    assert_eq!(engine.run_count(), 0);
}

// Scenario: cancellation mid-encode leaves no staged entries behind

#[tokio::test]
async fn cancellation_mid_encode_cleans_up() {
    let engine = MockEngine::blocking();
    let (mut job, _loader, _lifecycle) =
        job_with(engine.clone(), StaticProbe::new(120.0, 1280, 720));

    job.open(source("stream.mp4", "video/mp4")).await.unwrap();
    assert!(job.window_mut().unwrap().set_end(60.0));

    let cancel = job.cancel_token();
    let mut updates = job.subscribe();
    let running = tokio::spawn(async move { job.submit().await.unwrap() });

    loop {
        updates.changed().await.unwrap();
        let state = updates.borrow_and_update().clone();
        if matches!(state, JobState::Encoding { .. }) {
            break;
        }
        assert!(!state.is_terminal(), "job ended before encoding started");
    }
    cancel.cancel();

    let terminal = running.await.unwrap();
    assert_eq!(terminal, JobState::Cancelled);
    assert_eq!(engine.run_count(), 1);
    assert!(engine.entries().await.is_empty());
}

// Execution failures surface as a terminal Failed state, cleaned up

#[tokio::test]
async fn execution_failure_is_terminal_and_cleaned_up() {
    let engine = MockEngine::failing("corrupt input");
    let (mut job, _loader, _lifecycle) =
        job_with(engine.clone(), StaticProbe::new(60.0, 1280, 720));

    job.open(source("corrupt.mp4", "video/mp4")).await.unwrap();
    let terminal = job.submit().await.unwrap();
    match &terminal {
        JobState::Failed(e) => {
            assert!(matches!(e, JobError::Execution(_)));
            assert_eq!(e.category(), ErrorCategory::ProcessingFailed);
        }
        other => panic!("expected failure, got {}", other.name()),
    }
    assert!(engine.entries().await.is_empty());
}

// Progress stays within [0, 1] and never decreases, whatever the engine emits

#[tokio::test]
async fn progress_is_monotonic_under_out_of_order_events() {
    let engine = MockEngine::succeeding();
    engine.set_progress_points(vec![5_000, 2_000, 8_000, 30_000, 10_000]);
    let (mut job, _loader, _lifecycle) =
        job_with(engine.clone(), StaticProbe::new(60.0, 1280, 720));

    job.open(source("clip.mp4", "video/mp4")).await.unwrap();
    assert!(job.window_mut().unwrap().set_end(30.0));

    let mut updates = job.subscribe();
    let collector = tokio::spawn(async move {
        let mut fractions = Vec::new();
        loop {
            if updates.changed().await.is_err() {
                break;
            }
            let state = updates.borrow_and_update().clone();
            match state {
                JobState::Encoding { progress } => fractions.push(progress),
                ref terminal if terminal.is_terminal() => break,
                _ => {}
            }
        }
        fractions
    });

    completed(job.submit().await.unwrap());
    let fractions = collector.await.unwrap();

    assert!(!fractions.is_empty());
    assert!(fractions.iter().all(|f| (0.0..=1.0).contains(f)));
    assert!(
        fractions.windows(2).all(|w| w[0] <= w[1]),
        "progress went backwards: {fractions:?}"
    );
}

// The shared engine loads once however many jobs run

#[tokio::test]
async fn queued_jobs_share_one_engine_load() {
    let engine = MockEngine::succeeding();
    let loader = Arc::new(MockLoader::new(engine.clone()));
    let lifecycle = EngineLifecycle::new(loader.clone());
    let config = PipelineConfig::default();

    let mut handles = Vec::new();
    for i in 0..3 {
        let lifecycle = lifecycle.clone();
        let config = config.clone();
        handles.push(tokio::spawn(async move {
            let mut job = TranscodeJob::new(
                lifecycle,
                Arc::new(StaticProbe::new(120.0, 1280, 720)),
                &config,
            );
            job.open(source(&format!("clip{i}.mp4"), "video/mp4"))
                .await
                .unwrap();
            assert!(job.window_mut().unwrap().set_end(10.0));
            job.submit().await.unwrap()
        }));
    }

    for handle in handles {
        completed(handle.await.unwrap());
    }
    assert_eq!(loader.load_count(), 1);
    assert_eq!(engine.run_count(), 3);
    assert!(engine.entries().await.is_empty());
}
