pub mod config;
pub mod error;
pub mod metrics;
pub mod validation;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::{
    extract::{Path, Request, State, WebSocketUpgrade},
    middleware::Next,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::GlobalKeyExtractor, GovernorLayer,
};
use tower_http::{
    cors::CorsLayer, limit::RequestBodyLimitLayer, map_response_body::MapResponseBodyLayer,
    timeout::TimeoutLayer, trace::TraceLayer,
};
use tracing::{error, info, warn};

use synth_core::{frame_stream, phonemize, EngineRegistry, Phoneme, SynthesisError};

use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::metrics::{
    AppMetrics, DetailedMetricsResponse, EndpointMetricsResponse, SystemMetrics,
};
use crate::validation::validate_tts_request;

/// Identifier reported in the X-Engine response header
pub const ENGINE_NAME: &str = "phoneme-dsp";

pub static START_TIME: std::sync::OnceLock<std::time::Instant> = std::sync::OnceLock::new();

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<EngineRegistry>,
    pub request_count: Arc<AtomicU64>,
    pub metrics: Arc<AppMetrics>,
    pub config: ServerConfig,
}

impl AppState {
    pub fn new(registry: EngineRegistry, config: ServerConfig) -> Self {
        Self {
            registry: Arc::new(registry),
            request_count: Arc::new(AtomicU64::new(0)),
            metrics: Arc::new(AppMetrics::new()),
            config,
        }
    }
}

#[derive(Deserialize)]
pub struct TtsRequest {
    text: String,
    language: Option<String>,
}

#[derive(Serialize)]
pub struct TtsResponse {
    audio_base64: String,
    duration_ms: u64,
    sample_rate: u32,
    phoneme_count: usize,
}

#[derive(Serialize)]
pub struct VoiceDetail {
    key: String,
    sample_rate: u32,
    mel_bands: usize,
    frame_size: usize,
    frame_duration_ms: f32,
    alphabet: Vec<&'static str>,
}

/// Assemble the full router with middleware, ready to serve or to drive in tests
pub fn build_router(state: AppState) -> Router {
    // CORS configuration - environment-aware
    let cors = cors_layer(&state.config);

    // Rate limiting configuration
    // Using GlobalKeyExtractor to rate limit globally (all requests share the same limit)
    // This works better in Docker/proxy environments where IP extraction can be problematic
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(((state.config.rate_limit_per_minute / 60).max(1)) as u64)
            .burst_size(state.config.rate_limit_per_minute.max(1))
            .key_extractor(GlobalKeyExtractor)
            .finish()
            .unwrap(),
    );

    let middleware_stack = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(GovernorLayer::new(governor_conf))
        .layer(TimeoutLayer::new(state.config.request_timeout()))
        // Re-box the limit layer's response body so Timeout/Governor see axum's Body type
        .layer(MapResponseBodyLayer::new(axum::body::Body::new))
        .layer(RequestBodyLimitLayer::new(state.config.max_body_bytes))
        .layer(cors)
        .into_inner();

    // Separate routes for metrics (should be protected in production)
    let public_api = Router::new()
        .route("/health", get(health_check))
        .route("/healthz", get(health_check))
        .route("/voices", get(list_voices))
        .route("/voices/detail", get(list_voices_detail))
        .route("/tts", post(tts_endpoint))
        .route("/tts/wav", post(tts_wav_endpoint))
        .route("/stream/{lang}/{text}", get(stream_ws));

    // Metrics endpoint - consider adding authentication in production
    let metrics_api = Router::new().route("/metrics", get(metrics_endpoint));

    let api = Router::new().merge(public_api).merge(metrics_api);

    Router::new()
        .merge(api.clone()) // root paths
        .nest("/api", api) // /api prefix
        .fallback(not_found)
        .layer(axum::middleware::from_fn(add_request_id))
        .layer(middleware_stack)
        .with_state(state)
}

/// CORS configuration - environment-aware
fn cors_layer(config: &ServerConfig) -> CorsLayer {
    if let Some(ref allowed_origins) = config.cors_allowed_origins {
        // Production: Use specific origins from environment
        let origins: Vec<axum::http::HeaderValue> = allowed_origins
            .iter()
            .filter_map(|origin: &String| origin.parse::<axum::http::HeaderValue>().ok())
            .collect();

        if origins.is_empty() {
            warn!("CORS_ALLOWED_ORIGINS is empty, falling back to permissive CORS");
            permissive_cors()
        } else {
            info!("CORS configured for {} origin(s)", origins.len());
            CorsLayer::new()
                .allow_origin(tower_http::cors::AllowOrigin::list(origins))
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers(tower_http::cors::Any)
                .allow_credentials(false)
        }
    } else {
        // Development: Allow all origins (with warning)
        warn!("CORS_ALLOWED_ORIGINS not set, allowing all origins (development mode)");
        permissive_cors()
    }
}

fn permissive_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers(tower_http::cors::Any)
        .allow_credentials(false)
}

/// Request ID middleware for tracing
async fn add_request_id(mut request: Request, next: Next) -> Response {
    let request_id = uuid::Uuid::new_v4().to_string();
    request.headers_mut().insert(
        "x-request-id",
        axum::http::HeaderValue::from_str(&request_id).unwrap(),
    );
    let mut response = next.run(request).await;
    response.headers_mut().insert(
        "x-request-id",
        axum::http::HeaderValue::from_str(&request_id).unwrap(),
    );
    response
}

async fn not_found(uri: axum::http::Uri) -> ApiError {
    ApiError::NotFound(format!("No route for {uri}"))
}

pub async fn health_check() -> &'static str {
    "ok"
}

pub async fn list_voices(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.registry.list_languages())
}

pub async fn list_voices_detail(State(state): State<AppState>) -> Json<Vec<VoiceDetail>> {
    let mut out = Vec::new();
    for key in state.registry.list_languages() {
        if let Ok(engine) = state.registry.engine_for(Some(&key)) {
            let config = engine.config();
            out.push(VoiceDetail {
                key,
                sample_rate: config.sample_rate,
                mel_bands: config.mel_bands,
                frame_size: config.frame_size,
                frame_duration_ms: config.frame_duration_ms(),
                alphabet: Phoneme::ALL.iter().map(|p| p.label()).collect(),
            });
        }
    }
    Json(out)
}

pub async fn tts_endpoint(
    State(state): State<AppState>,
    Json(req): Json<TtsRequest>,
) -> Result<Json<TtsResponse>, ApiError> {
    state.request_count.fetch_add(1, Ordering::Relaxed);
    let started = std::time::Instant::now();

    let result = synthesize_response(&state, req).await;
    let latency_ms = started.elapsed().as_millis() as u64;
    match &result {
        Ok(_) => state.metrics.tts.record_request(latency_ms),
        Err(_) => state.metrics.tts.record_error(),
    }

    result.map(Json)
}

async fn synthesize_response(
    state: &AppState,
    req: TtsRequest,
) -> Result<TtsResponse, ApiError> {
    let (samples, sample_rate, phoneme_count) =
        run_synthesis(state, req.text, req.language.as_deref()).await?;

    let audio_base64 = synth_core::wav::encode_wav_base64(&samples, sample_rate)?;
    let duration_ms = (samples.len() as f32 / sample_rate as f32 * 1000.0) as u64;

    Ok(TtsResponse {
        audio_base64,
        duration_ms,
        sample_rate,
        phoneme_count,
    })
}

pub async fn tts_wav_endpoint(
    State(state): State<AppState>,
    Json(req): Json<TtsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.request_count.fetch_add(1, Ordering::Relaxed);
    let started = std::time::Instant::now();

    let language = req
        .language
        .clone()
        .unwrap_or_else(|| state.registry.default_language().to_string());

    let result = run_synthesis(&state, req.text, req.language.as_deref()).await;
    let latency_ms = started.elapsed().as_millis() as u64;
    match &result {
        Ok(_) => state.metrics.tts.record_request(latency_ms),
        Err(_) => state.metrics.tts.record_error(),
    }
    let (samples, sample_rate, phoneme_count) = result?;

    let bytes = synth_core::wav::encode_wav(&samples, sample_rate)?;

    Ok((
        [
            ("content-type", "audio/wav".to_string()),
            ("x-sample-rate", sample_rate.to_string()),
            ("x-language", language),
            ("x-engine", ENGINE_NAME.to_string()),
            ("x-phoneme-count", phoneme_count.to_string()),
        ],
        bytes,
    ))
}

/// Validate, resolve the engine and run the blocking pipeline off the async runtime
async fn run_synthesis(
    state: &AppState,
    text: String,
    language: Option<&str>,
) -> Result<(Vec<f32>, u32, usize), ApiError> {
    validate_tts_request(&text, language)?;

    let engine = state
        .registry
        .engine_for(language)
        .map_err(|e| ApiError::InvalidInput(e.to_string()))?;
    let sample_rate = engine.config().sample_rate;

    let started = std::time::Instant::now();
    let (samples, phoneme_count) = tokio::task::spawn_blocking(move || {
        let phoneme_count = phonemize(&text).len();
        let samples = engine.synthesize_whole(&text)?;
        Ok::<_, SynthesisError>((samples, phoneme_count))
    })
    .await
    .map_err(|e| anyhow::anyhow!("Synthesis task failed: {e}"))??;

    state.metrics.synthesis.record_synthesis(
        started.elapsed().as_millis() as u64,
        phoneme_count,
        samples.len(),
    );

    Ok((samples, sample_rate, phoneme_count))
}

pub async fn stream_ws(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path((lang, text)): Path<(String, String)>,
) -> impl IntoResponse {
    if let Err(e) = validate_tts_request(&text, Some(&lang)) {
        return ws.on_upgrade(move |mut socket| async move {
            use axum::extract::ws::Message;
            let error_msg = serde_json::json!({ "error": format!("{e}"), "code": 400 });
            let _ = socket.send(Message::Text(error_msg.to_string().into())).await;
            let _ = socket.close().await;
        });
    }

    ws.on_upgrade(move |mut socket| async move {
        use axum::extract::ws::Message;

        state.request_count.fetch_add(1, Ordering::Relaxed);

        let engine = match state.registry.engine_for(Some(&lang)) {
            Ok(engine) => engine,
            Err(e) => {
                let err_msg = serde_json::json!({ "error": format!("{e}"), "code": 400 });
                let _ = socket.send(Message::Text(err_msg.to_string().into())).await;
                let _ = socket.close().await;
                return;
            }
        };

        let phoneme_count = phonemize(&text).len();
        let metadata = serde_json::json!({
            "type": "metadata",
            "sample_rate": engine.config().sample_rate,
            "frame_size": engine.config().frame_size,
            "phoneme_count": phoneme_count,
        });
        if socket
            .send(Message::Text(metadata.to_string().into()))
            .await
            .is_err()
        {
            return;
        }

        let started = std::time::Instant::now();
        let mut frames_sent = 0usize;
        let mut samples_sent = 0usize;

        // Frames arrive as the blocking pipeline produces them; dropping the
        // stream on send failure stops the synthesis worker as well.
        let mut frames = Box::pin(frame_stream(engine, text));
        while let Some(result) = frames.next().await {
            match result {
                Ok(frame) => {
                    samples_sent += frame.len();
                    let bytes = synth_core::wav::frame_to_le_bytes(&frame);
                    if let Err(e) = socket.send(Message::Binary(bytes.into())).await {
                        warn!("Failed to send WS frame: {e}");
                        return;
                    }
                    frames_sent += 1;
                }
                Err(e) => {
                    error!("Stream synthesis failed: {e}");
                    let code = if e.is_client_error() { 400 } else { 500 };
                    let err_msg = serde_json::json!({ "error": format!("{e}"), "code": code });
                    let _ = socket.send(Message::Text(err_msg.to_string().into())).await;
                    let _ = socket.close().await;
                    return;
                }
            }
        }

        state.metrics.synthesis.record_synthesis(
            started.elapsed().as_millis() as u64,
            frames_sent,
            samples_sent,
        );

        let complete = serde_json::json!({
            "type": "complete",
            "frames": frames_sent,
            "samples": samples_sent,
        });
        let _ = socket.send(Message::Text(complete.to_string().into())).await;
        let _ = socket.close().await;
    })
}

pub async fn metrics_endpoint(State(state): State<AppState>) -> Json<DetailedMetricsResponse> {
    let mut system = sysinfo::System::new();
    system.refresh_cpu();
    system.refresh_memory();

    // Get CPU usage (average across all cores)
    let cpu_usage = system.global_cpu_info().cpu_usage();

    // Get memory information
    let memory_used = system.used_memory();
    let memory_total = system.total_memory();
    let memory_usage_percent = if memory_total > 0 {
        (memory_used as f64 / memory_total as f64 * 100.0) as f32
    } else {
        0.0
    };

    let request_count = state.request_count.load(Ordering::Relaxed);

    let uptime = START_TIME
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0);

    // Get system load (Unix-like systems only)
    let system_load = {
        #[cfg(unix)]
        {
            use std::fs;
            if let Ok(loadavg) = fs::read_to_string("/proc/loadavg") {
                loadavg
                    .split_whitespace()
                    .next()
                    .and_then(|s| s.parse::<f64>().ok())
            } else {
                None
            }
        }
        #[cfg(not(unix))]
        None
    };

    Json(DetailedMetricsResponse {
        timestamp: chrono::Utc::now(),
        system: SystemMetrics {
            cpu_usage_percent: cpu_usage,
            memory_used_mb: memory_used / 1024 / 1024, // Convert bytes to MB
            memory_total_mb: memory_total / 1024 / 1024,
            memory_usage_percent,
            request_count,
            uptime_seconds: uptime,
            system_load,
        },
        endpoints: EndpointMetricsResponse {
            tts: state.metrics.tts.stats(),
        },
        synthesis: state.metrics.synthesis.snapshot(),
    })
}
