//! Functional tests for the retry protocol, enhancement pass and try-on service

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use virtual_tryon::config::Settings;
use virtual_tryon::garment::GarmentSource;
use virtual_tryon::orchestrator::{GarmentInfo, OrchestratorConfig, TryOnOrchestrator, Validation};
use virtual_tryon::progress::{NoopProgress, ProgressEvent};
use virtual_tryon::remote::{
    GenerationPart, GenerationRequest, GenerationResponse, InlineData, RemoteGeneration,
};
use virtual_tryon::service::{TryOnRequest, TryOnService};
use virtual_tryon::{AppError, Result};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const USER_BYTES: &[u8] = b"user-image-bytes";

/// What the fake remote does on one call
enum Step {
    Image(Vec<u8>),
    /// Return the user image unchanged
    Echo,
    TextOnly,
    Fail(u16),
    Hang,
}

#[derive(Clone, Copy)]
struct CallTiming {
    started: Instant,
    finished: Option<Instant>,
}

/// Plays back a fixed script of responses and records every call
struct ScriptedRemote {
    steps: Mutex<VecDeque<Step>>,
    requests: Mutex<Vec<GenerationRequest>>,
    timings: Mutex<Vec<CallTiming>>,
}

impl ScriptedRemote {
    fn new(steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(steps.into()),
            requests: Mutex::new(Vec::new()),
            timings: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.requests.lock().len()
    }

    fn request(&self, index: usize) -> GenerationRequest {
        self.requests.lock()[index].clone()
    }

    fn timings(&self) -> Vec<CallTiming> {
        self.timings.lock().clone()
    }
}

fn image_response(data: Vec<u8>) -> GenerationResponse {
    GenerationResponse {
        candidates: vec![vec![
            GenerationPart::text("Here is the result"),
            GenerationPart::inline(data, "image/png"),
        ]],
    }
}

#[async_trait]
impl RemoteGeneration for ScriptedRemote {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(
        &self,
        _model: &str,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse> {
        let call = {
            let mut requests = self.requests.lock();
            requests.push(request.clone());
            requests.len() - 1
        };
        self.timings.lock().push(CallTiming {
            started: Instant::now(),
            finished: None,
        });

        let step = self.steps.lock().pop_front().unwrap_or(Step::Fail(500));
        let result = match step {
            Step::Image(data) => Ok(image_response(data)),
            Step::Echo => Ok(image_response(USER_BYTES.to_vec())),
            Step::TextOnly => Ok(GenerationResponse {
                candidates: vec![vec![GenerationPart::text("I cannot do that")]],
            }),
            Step::Fail(status) => Err(AppError::Transport {
                status: Some(status),
                message: format!("scripted failure {}", status),
            }),
            Step::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(AppError::Internal("hang finished".into()))
            }
        };

        self.timings.lock()[call].finished = Some(Instant::now());
        result
    }
}

fn config(max_retries: u32, backoff_ms: u64) -> OrchestratorConfig {
    OrchestratorConfig {
        model: "test-image-model".to_string(),
        max_retries,
        backoff: Duration::from_millis(backoff_ms),
        deadline: Duration::from_millis(500),
        temperature: 0.5,
    }
}

fn user() -> InlineData {
    InlineData::new(USER_BYTES.to_vec(), "image/jpeg")
}

fn garment_image() -> InlineData {
    InlineData::new(b"garment-image-bytes".to_vec(), "image/jpeg")
}

fn garment() -> GarmentInfo {
    GarmentInfo::new("red sequined dress", "dress")
}

#[tokio::test]
async fn test_validates_on_third_attempt() {
    let remote = ScriptedRemote::new(vec![Step::Echo, Step::Echo, Step::Image(vec![7, 7, 7])]);
    let orchestrator = TryOnOrchestrator::with_config(remote.clone(), config(2, 1));

    let outcome = orchestrator
        .try_on(&user(), &garment_image(), &garment(), &NoopProgress)
        .await
        .unwrap();

    assert_eq!(outcome.attempt, 3);
    assert_eq!(outcome.attempt_index(), 2);
    assert!(outcome.validated);
    assert_eq!(outcome.image.data, vec![7, 7, 7]);
    assert_eq!(remote.calls(), 3);

    let validations: Vec<_> = outcome.session.attempts().iter().map(|a| a.validation).collect();
    assert_eq!(validations, vec![Validation::Failed, Validation::Failed, Validation::Passed]);
    assert_eq!(outcome.prompt_used, remote.request(2).parts[0].as_text().unwrap());
}

#[tokio::test]
async fn test_request_shape_and_escalating_prompts() {
    let remote = ScriptedRemote::new(vec![Step::Fail(503), Step::Fail(503), Step::Image(vec![1])]);
    let orchestrator = TryOnOrchestrator::with_config(remote.clone(), config(2, 1));

    orchestrator
        .try_on(&user(), &garment_image(), &garment(), &NoopProgress)
        .await
        .unwrap();

    let prompts: Vec<String> = (0..3)
        .map(|i| remote.request(i).parts[0].as_text().unwrap().to_string())
        .collect();
    assert_ne!(prompts[0], prompts[1]);
    assert_ne!(prompts[1], prompts[2]);

    for i in 0..3 {
        let request = remote.request(i);
        assert_eq!(request.parts.len(), 3);
        assert_eq!(request.parts[1].as_inline(), Some(&user()));
        assert_eq!(request.parts[2].as_inline(), Some(&garment_image()));
        assert_eq!(request.config.temperature, Some(0.5));
    }
}

#[tokio::test]
async fn test_first_valid_attempt_stops_session() {
    let remote = ScriptedRemote::new(vec![Step::Image(vec![9]), Step::Image(vec![8])]);
    let orchestrator = TryOnOrchestrator::with_config(remote.clone(), config(2, 1));

    let outcome = orchestrator
        .try_on(&user(), &garment_image(), &garment(), &NoopProgress)
        .await
        .unwrap();

    assert_eq!(outcome.attempt, 1);
    assert!(outcome.validated);
    assert_eq!(remote.calls(), 1);
}

#[tokio::test]
async fn test_last_attempt_accepted_unvalidated() {
    let remote =
        ScriptedRemote::new(vec![Step::Echo, Step::Echo, Step::Echo, Step::Image(vec![1])]);
    let orchestrator = TryOnOrchestrator::with_config(remote.clone(), config(2, 1));

    let outcome = orchestrator
        .try_on(&user(), &garment_image(), &garment(), &NoopProgress)
        .await
        .unwrap();

    assert_eq!(outcome.attempt, 3);
    assert!(!outcome.validated);
    assert_eq!(outcome.image.data, USER_BYTES);
    assert_eq!(remote.calls(), 3);
}

#[tokio::test]
async fn test_earlier_unvalidated_image_survives_final_error() {
    let remote = ScriptedRemote::new(vec![Step::Fail(500), Step::Echo, Step::Fail(502)]);
    let orchestrator = TryOnOrchestrator::with_config(remote.clone(), config(2, 1));

    let outcome = orchestrator
        .try_on(&user(), &garment_image(), &garment(), &NoopProgress)
        .await
        .unwrap();

    assert_eq!(outcome.attempt, 2);
    assert!(!outcome.validated);
    assert_eq!(outcome.session.attempts().len(), 3);
}

#[tokio::test]
async fn test_always_timing_out_exhausts_budget() {
    let remote = ScriptedRemote::new(vec![Step::Hang, Step::Hang, Step::Hang, Step::Hang]);
    let mut cfg = config(2, 5);
    cfg.deadline = Duration::from_millis(30);
    let orchestrator = TryOnOrchestrator::with_config(remote.clone(), cfg);

    let err = orchestrator
        .try_on(&user(), &garment_image(), &garment(), &NoopProgress)
        .await
        .unwrap_err();

    assert!(err.is_timeout(), "unexpected error: {}", err);
    assert_eq!(remote.calls(), 3);
}

#[tokio::test]
async fn test_exhaustion_returns_last_error() {
    let remote = ScriptedRemote::new(vec![Step::Fail(500), Step::Fail(429), Step::Fail(503)]);
    let orchestrator = TryOnOrchestrator::with_config(remote.clone(), config(2, 1));

    let err = orchestrator
        .try_on(&user(), &garment_image(), &garment(), &NoopProgress)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Transport { status: Some(503), .. }));
    assert_eq!(remote.calls(), 3);
}

#[tokio::test]
async fn test_missing_image_counts_as_failure() {
    let remote = ScriptedRemote::new(vec![Step::TextOnly, Step::TextOnly, Step::TextOnly]);
    let orchestrator = TryOnOrchestrator::with_config(remote.clone(), config(2, 1));

    let err = orchestrator
        .try_on(&user(), &garment_image(), &garment(), &NoopProgress)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::NoCandidateImage));
    assert_eq!(remote.calls(), 3);
}

#[tokio::test]
async fn test_zero_retries_means_single_attempt() {
    let remote = ScriptedRemote::new(vec![Step::Echo]);
    let orchestrator = TryOnOrchestrator::with_config(remote.clone(), config(0, 1));

    let outcome = orchestrator
        .try_on(&user(), &garment_image(), &garment(), &NoopProgress)
        .await
        .unwrap();

    assert_eq!(outcome.attempt, 1);
    assert!(!outcome.validated);
    assert_eq!(remote.calls(), 1);
}

#[tokio::test]
async fn test_backoff_separates_attempts() {
    let backoff = Duration::from_millis(60);
    let remote = ScriptedRemote::new(vec![Step::Fail(500), Step::Echo, Step::Image(vec![4])]);
    let orchestrator =
        TryOnOrchestrator::with_config(remote.clone(), config(2, backoff.as_millis() as u64));

    orchestrator
        .try_on(&user(), &garment_image(), &garment(), &NoopProgress)
        .await
        .unwrap();

    let timings = remote.timings();
    assert_eq!(timings.len(), 3);
    for pair in timings.windows(2) {
        let finished = pair[0].finished.unwrap();
        assert!(pair[1].started >= finished);
        assert!(pair[1].started.duration_since(finished) >= backoff);
    }
}

#[tokio::test]
async fn test_progress_events_follow_attempts() {
    let remote = ScriptedRemote::new(vec![Step::Fail(500), Step::Image(vec![3])]);
    let orchestrator = TryOnOrchestrator::with_config(remote, config(2, 1));
    let (tx, mut rx) = mpsc::unbounded_channel();

    orchestrator
        .try_on(&user(), &garment_image(), &garment(), &tx)
        .await
        .unwrap();

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }

    assert_eq!(
        events,
        vec![
            ProgressEvent::AttemptStarted { attempt: 1, total: 3 },
            ProgressEvent::AttemptFailed {
                attempt: 1,
                error: "Transport error (HTTP 500): scripted failure 500".to_string(),
            },
            ProgressEvent::RetryScheduled { next_attempt: 2, delay_ms: 1 },
            ProgressEvent::AttemptStarted { attempt: 2, total: 3 },
            ProgressEvent::ValidationResult { attempt: 2, passed: true },
        ]
    );
}

#[tokio::test]
async fn test_cleanup_success_replaces_image() {
    let remote = ScriptedRemote::new(vec![Step::Image(vec![5, 5])]);
    let orchestrator = TryOnOrchestrator::with_config(remote.clone(), config(2, 1));
    let try_on = InlineData::new(vec![1, 1], "image/png");

    let result = orchestrator
        .cleanup(&user(), &try_on, "red sequined dress", &NoopProgress)
        .await;

    assert!(result.enhanced);
    assert!(result.error.is_none());
    assert_eq!(result.image.data, vec![5, 5]);

    let request = remote.request(0);
    assert_eq!(request.parts.len(), 3);
    assert_eq!(request.parts[1].as_inline(), Some(&user()));
    assert_eq!(request.parts[2].as_inline(), Some(&try_on));
}

#[tokio::test]
async fn test_cleanup_failure_keeps_try_on_result() {
    let remote = ScriptedRemote::new(vec![Step::Fail(500), Step::Image(vec![9])]);
    let orchestrator = TryOnOrchestrator::with_config(remote.clone(), config(2, 1));
    let try_on = InlineData::new(vec![1, 1], "image/png");

    let result = orchestrator
        .cleanup(&user(), &try_on, "red sequined dress", &NoopProgress)
        .await;

    assert!(!result.enhanced);
    assert_eq!(result.image, try_on);
    assert!(result.error.unwrap().contains("500"));
    assert_eq!(remote.calls(), 1);
}

fn png(width: u32, height: u32, tint: u8) -> Vec<u8> {
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([tint, (x * 9) as u8, (y * 7) as u8])
    });
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn fast_settings() -> Settings {
    let mut settings = Settings::default();
    settings.orchestrator.backoff_ms = 1;
    settings
}

#[tokio::test]
async fn test_service_runs_full_workflow() {
    let remote = ScriptedRemote::new(vec![Step::Image(vec![42]), Step::Image(vec![43])]);
    let service = TryOnService::new(remote.clone(), &fast_settings()).unwrap();

    let result = service
        .run(
            TryOnRequest {
                user_image: png(24, 32, 200),
                user_mime_type: "image/png".to_string(),
                garment: GarmentSource::Upload {
                    bytes: png(16, 16, 30),
                    mime_type: "image/png".to_string(),
                    filename: None,
                },
                garment_info: garment(),
                cleanup: Some(true),
            },
            Arc::new(NoopProgress),
        )
        .await
        .unwrap();

    assert_eq!(result.outcome.attempt, 1);
    assert!(result.outcome.validated);
    assert!(result.enhanced());
    assert_eq!(result.final_image().data, vec![43]);

    // Both images reach the remote as prepared JPEGs
    let first = remote.request(0);
    assert_eq!(first.parts[1].as_inline().unwrap().mime_type, "image/jpeg");
    assert_eq!(first.parts[2].as_inline().unwrap().mime_type, "image/jpeg");
}

#[tokio::test]
async fn test_service_accepts_url_garment_served_as_octet_stream() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/garments/dress"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/octet-stream")
                .set_body_bytes(png(16, 16, 30)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let remote = ScriptedRemote::new(vec![Step::Image(vec![42])]);
    let service = TryOnService::new(remote.clone(), &fast_settings()).unwrap();

    let result = service
        .run(
            TryOnRequest {
                user_image: png(24, 32, 200),
                user_mime_type: "image/png".to_string(),
                garment: GarmentSource::Url(format!("{}/garments/dress", server.uri())),
                garment_info: garment(),
                cleanup: Some(false),
            },
            Arc::new(NoopProgress),
        )
        .await
        .unwrap();

    assert!(result.outcome.validated);
    assert_eq!(result.final_image().data, vec![42]);
    assert_eq!(remote.calls(), 1);
    assert_eq!(remote.request(0).parts[2].as_inline().unwrap().mime_type, "image/jpeg");
}

#[tokio::test]
async fn test_service_rejects_bad_upload_before_remote_call() {
    let remote = ScriptedRemote::new(vec![Step::Image(vec![1])]);
    let service = TryOnService::new(remote.clone(), &fast_settings()).unwrap();

    let err = service
        .run(
            TryOnRequest {
                user_image: b"%PDF-1.4".to_vec(),
                user_mime_type: "application/pdf".to_string(),
                garment: GarmentSource::Upload {
                    bytes: png(8, 8, 10),
                    mime_type: "image/png".to_string(),
                    filename: None,
                },
                garment_info: garment(),
                cleanup: None,
            },
            Arc::new(NoopProgress),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::UnsupportedFileType(_)));
    assert_eq!(remote.calls(), 0);
}
