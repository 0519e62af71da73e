// src/web/user_handlers.rs
//! Gestão de professores e das definições (só a secretaria).
use crate::{
    error::AppResult,
    models::{
        realtime::{ChangeEvent, EventType, Table},
        user::{NewUser, PasswordReset, SettingsUpdate, SettingsView, User},
    },
    services::{settings_service, user_service},
    state::AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

// GET /api/users
pub async fn list_users(State(state): State<AppState>) -> AppResult<Json<Vec<User>>> {
    Ok(Json(user_service::find_all_users(&state.db_pool).await?))
}

// GET /api/professors
pub async fn list_professors(State(state): State<AppState>) -> AppResult<Json<Vec<User>>> {
    Ok(Json(user_service::find_professors(&state.db_pool).await?))
}

// POST /api/users
pub async fn create_user(
    State(state): State<AppState>,
    Json(new_user): Json<NewUser>,
) -> AppResult<impl IntoResponse> {
    let user = user_service::create_user(&state.db_pool, &new_user).await?;
    state.realtime.publish(ChangeEvent::insert(Table::Users, &user)).await;
    Ok((StatusCode::CREATED, Json(user)))
}

// PUT /api/users/{id}/password
pub async fn reset_password(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(reset): Json<PasswordReset>,
) -> AppResult<StatusCode> {
    user_service::update_user_password(&state.db_pool, &user_id, &reset.new_password).await?;
    Ok(StatusCode::NO_CONTENT)
}

// DELETE /api/users/{id}
pub async fn delete_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<StatusCode> {
    let affected_classes = user_service::delete_user(&state.db_pool, &user_id).await?;

    let mut events = vec![ChangeEvent::delete(Table::Users, &user_id)];
    events.extend(affected_classes.iter().map(|class_id| {
        ChangeEvent::new(
            Table::ClassTeachers,
            EventType::Delete,
            None,
            Some(serde_json::json!({ "class_id": class_id, "user_id": user_id })),
        )
    }));
    state.realtime.publish_all(events).await;
    Ok(StatusCode::NO_CONTENT)
}

// GET /api/settings
pub async fn get_settings(State(state): State<AppState>) -> AppResult<Json<SettingsView>> {
    let settings = settings_service::get_settings(&state.db_pool).await?;
    Ok(Json(settings.into()))
}

// PUT /api/settings
pub async fn update_settings(
    State(state): State<AppState>,
    Json(update): Json<SettingsUpdate>,
) -> AppResult<Json<SettingsView>> {
    let view: SettingsView = settings_service::update_settings(&state.db_pool, &update).await?.into();
    state.realtime.publish(ChangeEvent::update(Table::SystemSettings, &view)).await;
    Ok(Json(view))
}
