// src/web/class_handlers.rs
use crate::{
    calendar,
    error::AppResult,
    models::{
        class::{Class, ClassAggregate, ClassPayload, Inventory, InventoryPayload, TeacherAssignment, TeacherRef},
        realtime::{ChangeEvent, Table},
        user::SessionUser,
    },
    services::{class_service, inventory_service},
    state::AppState,
    web::mw_secretary::ensure_secretary,
};
use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

// GET /api/classes
pub async fn list_classes(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
) -> AppResult<Json<Vec<ClassAggregate>>> {
    let scope = class_service::ClassScope::for_user(&user);
    Ok(Json(class_service::get_classes(&state.db_pool, &scope).await?))
}

// POST /api/classes (secretaria)
pub async fn create_class(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    Json(payload): Json<ClassPayload>,
) -> AppResult<impl IntoResponse> {
    ensure_secretary(&user)?;
    let class = class_service::create_class(
        &state.db_pool,
        &payload.name,
        payload.description.as_deref(),
        &payload.teacher_ids,
    )
    .await?;

    let mut events = vec![ChangeEvent::insert(Table::Classes, &class)];
    if !payload.teacher_ids.is_empty() {
        events.push(ChangeEvent::insert(Table::ClassTeachers, &serde_json::json!({ "class_id": class.id })));
    }
    state.realtime.publish_all(events).await;
    Ok((StatusCode::CREATED, Json(class)))
}

// GET /api/classes/{id}
pub async fn get_class(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    Path(class_id): Path<String>,
) -> AppResult<Json<ClassAggregate>> {
    class_service::ensure_class_access(&state.db_pool, &user, &class_id).await?;
    Ok(Json(class_service::get_class(&state.db_pool, &class_id).await?))
}

// PUT /api/classes/{id} (secretaria)
pub async fn update_class(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    Path(class_id): Path<String>,
    Json(payload): Json<ClassPayload>,
) -> AppResult<Json<Class>> {
    ensure_secretary(&user)?;
    let class =
        class_service::update_class(&state.db_pool, &class_id, &payload.name, payload.description.as_deref()).await?;
    state.realtime.publish(ChangeEvent::update(Table::Classes, &class)).await;
    Ok(Json(class))
}

// DELETE /api/classes/{id} (secretaria)
pub async fn delete_class(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    Path(class_id): Path<String>,
) -> AppResult<StatusCode> {
    ensure_secretary(&user)?;
    let (class, announcement_ids) = class_service::delete_class(&state.db_pool, &class_id).await?;
    for announcement_id in &announcement_ids {
        state.replies.drop_thread(announcement_id).await;
    }
    state.realtime.publish(ChangeEvent::delete(Table::Classes, &class.id)).await;
    Ok(StatusCode::NO_CONTENT)
}

// PUT /api/classes/{id}/teachers (secretaria)
pub async fn set_teachers(
    State(state): State<AppState>,
    Path(class_id): Path<String>,
    Json(assignment): Json<TeacherAssignment>,
) -> AppResult<Json<Vec<TeacherRef>>> {
    let teachers = class_service::set_class_teachers(&state.db_pool, &class_id, &assignment.teacher_ids).await?;
    state
        .realtime
        .publish(ChangeEvent::update(
            Table::ClassTeachers,
            &serde_json::json!({ "class_id": class_id, "teachers": teachers }),
        ))
        .await;
    Ok(Json(teachers))
}

// GET /api/classes/{id}/inventory
pub async fn get_inventory(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    Path(class_id): Path<String>,
) -> AppResult<Json<Inventory>> {
    class_service::ensure_class_access(&state.db_pool, &user, &class_id).await?;
    let quarter = calendar::current_quarter();
    Ok(Json(inventory_service::get_inventory(&state.db_pool, &class_id, &quarter).await?))
}

// PUT /api/classes/{id}/inventory
pub async fn save_inventory(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    Path(class_id): Path<String>,
    Json(payload): Json<InventoryPayload>,
) -> AppResult<Json<Inventory>> {
    class_service::ensure_class_access(&state.db_pool, &user, &class_id).await?;
    let inventory = inventory_service::save_inventory(&state.db_pool, &class_id, &payload).await?;
    state.realtime.publish(ChangeEvent::update(Table::Inventory, &inventory)).await;
    Ok(Json(inventory))
}
