//! Mock speech vendor for integration tests
//!
//! Serves both the `OpenAI` and `ElevenLabs` speech endpoints and answers
//! with silent audio whose length follows the text: 50 ms per character,
//! divided by the requested speed.

use std::collections::HashMap;
use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

/// API key the mock accepts
pub const TEST_API_KEY: &str = "test-key";

const SECONDS_PER_CHAR: f64 = 0.05;

/// One request as the mock received it
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub query: HashMap<String, String>,
    pub body: Value,
}

/// Mock vendor returning predictable audio
pub struct MockTts {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<MockTtsState>,
}

struct MockTtsState {
    request_count: AtomicU32,
    /// Status every authenticated request fails with, if set
    fail_status: Option<StatusCode>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockTts {
    /// Start the mock server, returning immediately
    pub async fn start() -> anyhow::Result<Self> {
        Self::start_inner(None).await
    }

    /// Start a mock server that answers every request with `status`
    pub async fn start_failing(status: u16) -> anyhow::Result<Self> {
        Self::start_inner(Some(StatusCode::from_u16(status)?)).await
    }

    async fn start_inner(fail_status: Option<StatusCode>) -> anyhow::Result<Self> {
        let state = Arc::new(MockTtsState {
            request_count: AtomicU32::new(0),
            fail_status,
            requests: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/v1/audio/speech", routing::post(handle_openai_speech))
            .route("/v1/text-to-speech/{voice_id}", routing::post(handle_elevenlabs_speech))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(Self { addr, shutdown, state })
    }

    /// Base URL for configuring the mock as a provider
    pub fn base_url(&self) -> String {
        format!("http://{}/v1", self.addr)
    }

    /// Number of speech requests received
    pub fn request_count(&self) -> u32 {
        self.state.request_count.load(Ordering::Relaxed)
    }

    /// Every request received so far, in arrival order
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }
}

impl Drop for MockTts {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl MockTtsState {
    fn record(&self, path: String, query: HashMap<String, String>, body: &Value) {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        self.requests.lock().unwrap().push(RecordedRequest {
            path,
            query,
            body: body.clone(),
        });
    }
}

async fn handle_openai_speech(
    State(state): State<Arc<MockTtsState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.record("/v1/audio/speech".to_owned(), HashMap::new(), &body);

    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {TEST_API_KEY}"));

    if let Some(rejection) = reject(&state, authorized) {
        return rejection;
    }

    let text = body["input"].as_str().unwrap_or_default();
    let speed = body["speed"].as_f64().unwrap_or(1.0);
    let wav = body["response_format"].as_str() == Some("wav");

    audio_response(text, speed, wav)
}

async fn handle_elevenlabs_speech(
    State(state): State<Arc<MockTtsState>>,
    Path(voice_id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let wav = query.get("output_format").is_some_and(|f| f.starts_with("wav_"));
    state.record(format!("/v1/text-to-speech/{voice_id}"), query, &body);

    let authorized = headers
        .get("xi-api-key")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == TEST_API_KEY);

    if let Some(rejection) = reject(&state, authorized) {
        return rejection;
    }

    let text = body["text"].as_str().unwrap_or_default();
    let speed = body["voice_settings"]["speed"].as_f64().unwrap_or(1.0);

    audio_response(text, speed, wav)
}

fn reject(state: &MockTtsState, authorized: bool) -> Option<Response> {
    if !authorized {
        return Some(error_response(StatusCode::UNAUTHORIZED, "invalid api key"));
    }

    state
        .fail_status
        .map(|status| error_response(status, "mock failure"))
}

fn error_response(status: StatusCode, message: &str) -> Response {
    let body = serde_json::json!({ "error": { "message": message } });
    (status, Json(body)).into_response()
}

fn audio_response(text: &str, speed: f64, wav: bool) -> Response {
    #[allow(clippy::cast_precision_loss)]
    let seconds = text.chars().count() as f64 * SECONDS_PER_CHAR / speed;

    if wav {
        ([(header::CONTENT_TYPE, "audio/wav")], silent_wav(seconds)).into_response()
    } else {
        ([(header::CONTENT_TYPE, "audio/mpeg")], tts::audio::silent_mp3(seconds)).into_response()
    }
}

/// Mono 16-bit 24 kHz silence
fn silent_wav(seconds: f64) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 24_000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let samples = (seconds * 24_000.0).round() as u32;
        for _ in 0..samples {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}
