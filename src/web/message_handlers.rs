// src/web/message_handlers.rs
use crate::{
    error::AppResult,
    models::{
        message::{Message, MessagePayload},
        realtime::{ChangeEvent, Table},
        user::SessionUser,
    },
    services::message_service,
    state::AppState,
};
use axum::{
    extract::{Extension, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

// GET /api/messages
pub async fn list_messages(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
) -> AppResult<Json<Vec<Message>>> {
    Ok(Json(message_service::list_messages_for(&state.db_pool, &user).await?))
}

// POST /api/messages
pub async fn send_message(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    Json(payload): Json<MessagePayload>,
) -> AppResult<impl IntoResponse> {
    let message = message_service::send_message(&state.db_pool, &user, &payload).await?;
    state.realtime.publish(ChangeEvent::insert(Table::Messages, &message)).await;
    Ok((StatusCode::CREATED, Json(message)))
}
