// src/web/attendance_handlers.rs
use crate::{
    calendar,
    error::AppResult,
    models::{
        attendance::{AttendanceDay, AttendanceDayPayload, AttendanceQuery},
        realtime::{ChangeEvent, Table},
        user::SessionUser,
    },
    services::{attendance_service, class_service},
    state::AppState,
};
use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};

// GET /api/classes/{id}/attendance?date=AAAA-MM-DD (por omissão, hoje)
pub async fn get_attendance(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    Path(class_id): Path<String>,
    Query(query): Query<AttendanceQuery>,
) -> AppResult<Json<AttendanceDay>> {
    class_service::ensure_class_access(&state.db_pool, &user, &class_id).await?;
    let date = query.date.unwrap_or_else(calendar::today);
    Ok(Json(attendance_service::get_attendance_day(&state.db_pool, &class_id, date).await?))
}

// POST /api/classes/{id}/attendance
pub async fn save_attendance(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    Path(class_id): Path<String>,
    Json(payload): Json<AttendanceDayPayload>,
) -> AppResult<Json<AttendanceDay>> {
    class_service::ensure_class_access(&state.db_pool, &user, &class_id).await?;
    let records =
        attendance_service::save_attendance_day(&state.db_pool, &class_id, payload.date, &payload.marks).await?;
    tracing::info!(
        "📝 Chamada de {} gravada na turma {} por {} ({} marcação(ões)).",
        payload.date,
        class_id,
        user.id,
        records.len()
    );

    let events: Vec<ChangeEvent> = records.iter().map(|r| ChangeEvent::update(Table::AttendanceRecords, r)).collect();
    state.realtime.publish_all(events).await;
    Ok(Json(attendance_service::get_attendance_day(&state.db_pool, &class_id, payload.date).await?))
}
