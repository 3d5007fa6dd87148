use anyhow::Result;
use axum::extract::DefaultBodyLimit;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};
use tracing::info;

use agri_api_server::config::Settings;
use agri_api_server::handlers;
use agri_api_server::knowledge::KnowledgeBase;
use agri_api_server::services::GeminiService;
use agri_api_server::session::SessionStore;
use agri_api_server::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,agri_api_server=debug".to_string()),
        )
        .with_target(true)
        .with_thread_ids(true)
        .json()
        .init();

    info!("🚀 Starting Agricultural AI Assistant API...");

    // Missing GEMINI_API_KEY fails here and aborts startup
    let settings = Settings::load()?;
    info!("✅ Configuration loaded");

    let knowledge_base = Arc::new(KnowledgeBase::load(&settings.knowledge_base_path));
    let session_store = Arc::new(SessionStore::new());
    let gemini = Some(Arc::new(GeminiService::new(&settings)));
    info!("✅ Gemini service initialized");

    // Periodic expiry sweep for the lifetime of the process. Outcomes are
    // logged; the loop never terminates on a bad sweep.
    let sweeper = session_store.clone();
    let idle_timeout = Duration::from_secs(settings.conversation_timeout);
    let sweep_interval = Duration::from_secs(settings.sweep_interval_seconds);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_interval);
        ticker.tick().await; // first tick fires immediately, skip it
        loop {
            ticker.tick().await;
            let removed = sweeper.sweep_expired(idle_timeout);
            if removed > 0 {
                info!("Expiry sweep removed {} sessions", removed);
            }
        }
    });
    info!("✅ Background cleanup task started");

    let state = Arc::new(AppState {
        settings: settings.clone(),
        knowledge_base,
        session_store,
        gemini,
    });

    let app = handlers::router(state)
        .layer(
            CorsLayer::permissive()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(true)),
        )
        .layer(CatchPanicLayer::new())
        // Body limit (image uploads - max 10MB)
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024));

    let addr = SocketAddr::from((settings.host.parse::<std::net::IpAddr>()?, settings.port));
    info!("🎯 Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
