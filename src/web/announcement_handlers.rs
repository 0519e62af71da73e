// src/web/announcement_handlers.rs
use crate::{
    error::{AppError, AppResult},
    models::{
        announcement::{Announcement, AnnouncementPayload, Reply, ReplyPayload},
        realtime::{ChangeEvent, Table},
        user::SessionUser,
    },
    services::{announcement_service, class_service, new_id, required},
    state::AppState,
};
use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;

/// Aviso existente e acessível ao utilizador.
async fn accessible_announcement(state: &AppState, user: &SessionUser, id: &str) -> AppResult<Announcement> {
    let announcement = announcement_service::find_announcement(&state.db_pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Aviso".to_string()))?;
    class_service::ensure_class_access(&state.db_pool, user, &announcement.class_id).await?;
    Ok(announcement)
}

// GET /api/announcements
pub async fn list_announcements(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
) -> AppResult<Json<Vec<Announcement>>> {
    let scope = class_service::ClassScope::for_user(&user);
    Ok(Json(announcement_service::list_announcements(&state.db_pool, &scope).await?))
}

// POST /api/announcements
pub async fn create_announcement(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    Json(payload): Json<AnnouncementPayload>,
) -> AppResult<impl IntoResponse> {
    let created = announcement_service::create_announcement(&state.db_pool, &user, &payload).await?;
    let events: Vec<ChangeEvent> = created.iter().map(|a| ChangeEvent::insert(Table::Announcements, a)).collect();
    state.realtime.publish_all(events).await;
    Ok((StatusCode::CREATED, Json(created)))
}

// DELETE /api/announcements/{id}
pub async fn delete_announcement(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    accessible_announcement(&state, &user, &id).await?;
    let removed = announcement_service::delete_announcement(&state.db_pool, &id).await?;
    state.replies.drop_thread(&removed.id).await;
    state.realtime.publish(ChangeEvent::delete_in_class(Table::Announcements, &removed.id, &removed.class_id)).await;
    Ok(StatusCode::NO_CONTENT)
}

// GET /api/announcements/{id}/replies
pub async fn list_replies(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    Path(id): Path<String>,
) -> AppResult<Json<Vec<Reply>>> {
    accessible_announcement(&state, &user, &id).await?;
    Ok(Json(state.replies.list(&id).await))
}

// POST /api/announcements/{id}/replies
pub async fn add_reply(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    Path(id): Path<String>,
    Json(payload): Json<ReplyPayload>,
) -> AppResult<impl IntoResponse> {
    let announcement = accessible_announcement(&state, &user, &id).await?;
    let reply = Reply {
        id: new_id(),
        announcement_id: announcement.id.clone(),
        author_id: user.id.clone(),
        author_name: user.name.clone(),
        content: required(&payload.content, "content")?,
        created_at: Utc::now(),
    };
    state.replies.add(reply.clone()).await;
    tracing::debug!("💬 Resposta de {} ao aviso {}", user.id, announcement.id);

    // As respostas não têm tabela; avisa quem segue os avisos
    state.realtime.publish(ChangeEvent::update(Table::Announcements, &announcement)).await;
    Ok((StatusCode::CREATED, Json(reply)))
}
