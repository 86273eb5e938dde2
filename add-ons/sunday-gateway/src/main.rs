//! Sunday gateway: chat, speech synthesis, conversation history and the static frontend.
//!
//! Keys for the completion and speech APIs stay in the backend (config file or `.env`);
//! the browser never sees them.

mod handlers;

use axum::{
    body::Body,
    http::Request,
    middleware::Next,
    response::Response,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Instant;
use sunday_core::{
    Companion, ElevenLabsTts, GatewayConfig, HistoryStore, KnowledgeBase, OpenAiCompatClient,
    PersonaSelector, SpeechError, SpeechSynthesizer,
};
use tower_http::services::{ServeDir, ServeFile};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub companion: Arc<Companion>,
    /// `None` when the speech key or voice is not configured.
    pub speech: Option<Arc<dyn SpeechSynthesizer>>,
}

#[tokio::main]
async fn main() {
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[sunday-gateway] .env not loaded: {} (using system environment)", e);
    }
    let _log_guard = init_tracing();

    let config = match GatewayConfig::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("[sunday-gateway] configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--verify") {
        match run_verify(&config).await {
            Ok(()) => std::process::exit(0),
            Err(e) => {
                eprintln!("PRE-FLIGHT FAILED: {}", e);
                std::process::exit(1);
            }
        }
    }

    if let Err(e) = serve(config).await {
        tracing::error!(target: "sunday::gateway", "Gateway stopped: {}", e);
        std::process::exit(1);
    }
}

/// Console output always; a daily rolling file as well when `SUNDAY_LOG_DIR` is set.
fn init_tracing() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let (file_layer, guard) = match std::env::var("SUNDAY_LOG_DIR").ok().filter(|d| !d.trim().is_empty()) {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "sunday-gateway.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();
    guard
}

/// Wire the library pieces from configuration. Fails on unreadable knowledge or persona files.
fn build_state(config: GatewayConfig) -> Result<AppState, BoxError> {
    let knowledge = KnowledgeBase::load_dir(&config.documents_dir)?;
    let persona = PersonaSelector::from_settings(&config.persona)?;
    let completion = OpenAiCompatClient::from_settings(&config.completion)?;
    tracing::info!(
        target: "sunday::gateway",
        backend = config.completion.backend.as_str(),
        base_url = completion.base_url(),
        model = %config.completion.resolved_model(),
        "Completion backend ready"
    );

    let speech: Option<Arc<dyn SpeechSynthesizer>> = match ElevenLabsTts::from_settings(&config.speech) {
        Ok(tts) => Some(Arc::new(tts)),
        Err(SpeechError::NotConfigured) => {
            tracing::warn!(target: "sunday::tts", "Speech key or voice id missing; /tts will answer 500");
            None
        }
        Err(e) => return Err(e.into()),
    };

    let companion = Companion::new(
        HistoryStore::new(&config.history_file),
        knowledge,
        persona,
        Arc::new(completion),
        config.completion.temperature,
    );

    Ok(AppState {
        config: Arc::new(config),
        companion: Arc::new(companion),
        speech,
    })
}

async fn serve(config: GatewayConfig) -> Result<(), BoxError> {
    let addr = config.bind_addr();
    let state = build_state(config)?;
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(target: "sunday::gateway", "Sunday gateway listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_app(state: AppState) -> Router {
    let frontend_enabled = state.config.frontend_enabled;
    let static_dir = state.config.static_dir.clone();
    let assets_dir = state.config.assets_dir.clone();

    let mut app = Router::new()
        .route("/chat", post(handlers::chat::chat))
        .route("/tts", post(handlers::tts::tts))
        .route("/history", get(handlers::history::get_history))
        .route("/clear", post(handlers::history::clear_history))
        .route("/health", get(handlers::status::health))
        .route("/context", get(handlers::status::context))
        .route("/knowledge/reload", post(handlers::status::reload_knowledge))
        .with_state(state);

    if frontend_enabled {
        app = app
            .route_service("/", ServeFile::new(static_dir.join("index.html")))
            .nest_service("/assets", ServeDir::new(assets_dir))
            .fallback_service(ServeDir::new(static_dir));
    }

    app.layer(axum::middleware::from_fn(log_requests))
}

async fn log_requests(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();
    let response = next.run(request).await;
    tracing::info!(
        target: "sunday::gateway",
        %method,
        path = %path,
        status = response.status().as_u16(),
        latency_ms = started.elapsed().as_millis() as u64,
        "request"
    );
    response
}

/// `--verify`: resolve configuration and local files without binding a port.
async fn run_verify(config: &GatewayConfig) -> Result<(), BoxError> {
    println!("Sunday gateway {} pre-flight", sunday_core::version());
    println!("--- configuration (secrets masked) ---");
    println!("{}", config.to_redacted_toml()?);

    let knowledge = KnowledgeBase::load_dir(&config.documents_dir)?;
    println!(
        "knowledge: {} document(s), {} chars from {}",
        knowledge.documents(),
        knowledge.len(),
        config.documents_dir.display()
    );

    PersonaSelector::from_settings(&config.persona)?;
    println!(
        "persona: trigger name {}",
        if config.persona.trigger_name.is_some() { "set" } else { "not set" }
    );

    let history = HistoryStore::new(&config.history_file).load().await;
    println!(
        "history: {} turn(s) in {}",
        history.len(),
        config.history_file.display()
    );
    println!(
        "speech: {}",
        if config.speech.is_configured() { "configured" } else { "not configured" }
    );
    println!("PRE-FLIGHT OK");
    Ok(())
}
