//! Axum-based gateway for the virtual-patient consultation. One POST /chat
//! turn runs the whole pipeline (language model → per-segment speech → phoneme
//! alignment) and returns the ordered segment list; /voices proxies the
//! synthesis backend's catalogue for the setup screen.

mod error;
mod lipsync;
mod llm;
mod pipeline;
mod tts;

#[cfg(feature = "console")]
mod console;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use lipsync::{CueExtractor, RhubarbExtractor};
use llm::{ChatModel, GeminiChat};
use medsim_core::{distress_reply, SimulationConfig};
use pipeline::TurnPipeline;
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tts::{ElevenLabsTts, SpeechSynth};

#[derive(Clone)]
struct AppState {
    pipeline: Arc<TurnPipeline>,
    synth: Option<Arc<dyn SpeechSynth>>,
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MedicalCommandRequest {
    command: String,
}

#[tokio::main]
async fn main() {
    // .env first: API keys stay in the backend, the client never sees them.
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[medsim-gateway] .env not loaded: {} (using system environment)", e);
    }
    if std::env::var("GEMINI_API_KEY").is_err() {
        eprintln!("[medsim-gateway] hint: GEMINI_API_KEY is unset; chat will serve the scripted technical-difficulty reply");
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Arc::new(SimulationConfig::from_env());

    #[cfg(feature = "console")]
    if std::env::args().any(|a| a == "--console") {
        console::run(config).await;
        return;
    }

    let chat_model: Option<Arc<dyn ChatModel>> = GeminiChat::from_config(&config)
        .ok()
        .map(|m| Arc::new(m) as Arc<dyn ChatModel>);
    let synth: Option<Arc<dyn SpeechSynth>> = ElevenLabsTts::from_config(&config)
        .ok()
        .map(|s| Arc::new(s) as Arc<dyn SpeechSynth>);
    let extractor: Arc<dyn CueExtractor> =
        Arc::new(RhubarbExtractor::new(config.audio_dir.clone()));

    let state = AppState {
        pipeline: Arc::new(TurnPipeline::new(
            config.clone(),
            chat_model,
            synth.clone(),
            extractor,
        )),
        synth,
    };

    let port = config.port;
    let app = build_app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("medsim-gateway listening on {}", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            eprintln!("[medsim-gateway] cannot bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        eprintln!("[medsim-gateway] server error: {}", e);
    }
}

fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/chat", post(chat))
        .route("/medical-command", post(medical_command))
        .route("/voices", get(voices))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn root() -> &'static str {
    "🏥 Simulation Médicale - Serveur actif !"
}

/// One consultation turn. Pipeline-absorbed failures still come back 200
/// with a speakable reply; only a terminal model failure becomes a 500, and
/// even that carries the distress segment so the patient never goes mute.
async fn chat(State(state): State<AppState>, Json(request): Json<ChatRequest>) -> Response {
    match state.pipeline.run_turn(request.message.as_deref()).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => {
            tracing::error!("turn failed: {}", e);
            let fallback = medsim_core::ChatResponse { messages: distress_reply() };
            (StatusCode::INTERNAL_SERVER_ERROR, Json(fallback)).into_response()
        }
    }
}

/// Scenario-control alias for /chat: the supervising clinician injects a
/// directive as if it were the doctor speaking.
async fn medical_command(
    State(state): State<AppState>,
    Json(request): Json<MedicalCommandRequest>,
) -> Response {
    tracing::info!("medical command received");
    match state.pipeline.run_turn(Some(&request.command)).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => {
            tracing::error!("medical command failed: {}", e);
            let fallback = medsim_core::ChatResponse { messages: distress_reply() };
            (StatusCode::INTERNAL_SERVER_ERROR, Json(fallback)).into_response()
        }
    }
}

/// Voice catalogue passthrough for the setup screen.
async fn voices(State(state): State<AppState>) -> Response {
    let Some(synth) = &state.synth else {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": "speech synthesis is not configured" })),
        )
            .into_response();
    };
    match synth.voices().await {
        Ok(catalogue) => Json(catalogue).into_response(),
        Err(e) => {
            tracing::error!("voice catalogue fetch failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}
