pub mod chat;
pub mod health;
pub mod predict;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/chat", post(chat::chat_handler))
        .route("/text-to-speech", post(chat::text_to_speech_handler))
        .route("/conversation/clear", post(chat::clear_conversation_handler))
        .route("/predict", post(predict::predict_handler))
        .with_state(state)
}
