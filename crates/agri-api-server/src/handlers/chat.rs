use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::info;

use crate::models::chat::{
    ChatRequest, ChatResponse, ClearConversationRequest, ClearConversationResponse, TtsRequest,
};
use crate::services::prompt;
use crate::session::Role;
use crate::state::AppState;
use crate::utils::error::ApiError;

pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let message = request.message.trim().to_string();
    let session_id = request.session_id;
    let language = request.language;

    if message.is_empty() {
        return Err(ApiError::BadRequest("Message must not be empty".to_string()));
    }
    if message.chars().count() > state.settings.max_message_length {
        return Err(ApiError::BadRequest("Message too long".to_string()));
    }

    if state
        .session_store
        .check_and_record_rate(&session_id, state.settings.rate_limit_per_minute)
    {
        return Err(ApiError::RateLimited(format!(
            "Rate limit exceeded for session {}",
            session_id
        )));
    }

    let gemini = state
        .gemini
        .as_ref()
        .ok_or_else(|| ApiError::Unavailable("AI model is not available".to_string()))?;

    info!(
        "Chat request: session={}, language={}, message_len={}",
        session_id,
        language,
        message.len()
    );

    // Snapshot the history before recording the new question, so the prompt
    // carries prior turns plus the question exactly once.
    let history = state.session_store.get_or_create(&session_id);
    state
        .session_store
        .append(&session_id, Role::User, message.as_str());

    let context = state.knowledge_base.retrieve(&message);
    let chat_prompt = prompt::build_chat_prompt(&message, &context, &history, &language);

    // Upstream call happens outside the session store lock.
    let reply = gemini.complete_chat(&chat_prompt).await?;

    state
        .session_store
        .append(&session_id, Role::Assistant, reply.as_str());

    Ok(Json(ChatResponse { reply, session_id }))
}

pub async fn text_to_speech_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TtsRequest>,
) -> Result<Response, ApiError> {
    if request.text.trim().is_empty() {
        return Err(ApiError::BadRequest("Text must not be empty".to_string()));
    }

    let gemini = state
        .gemini
        .as_ref()
        .ok_or_else(|| ApiError::Unavailable("AI model is not available".to_string()))?;

    let audio = gemini
        .synthesize_speech(&request.text, &request.language)
        .await?;

    Ok(([(header::CONTENT_TYPE, "audio/wav")], audio).into_response())
}

pub async fn clear_conversation_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ClearConversationRequest>,
) -> Json<ClearConversationResponse> {
    let session_id = request.session_id;
    state.session_store.clear(&session_id);
    info!("Conversation cleared for session: {}", session_id);

    Json(ClearConversationResponse {
        message: "Conversation history cleared".to_string(),
        session_id,
    })
}
