// src/web/student_handlers.rs
//! Alunos, visitantes e aniversários de uma turma.
use crate::{
    error::{AppError, AppResult},
    models::{
        class::{Birthday, BirthdayPayload, Student, StudentPayload, StudentUpdate, Visitor, VisitorPayload},
        realtime::{ChangeEvent, EventType, Table},
        report::BirthdayQuery,
        user::SessionUser,
    },
    services::{birthday_service, class_service, student_service, visitor_service},
    state::AppState,
};
use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;

#[derive(Serialize)]
pub struct CreatedStudent {
    #[serde(flatten)]
    student: Student,
    birthday: Option<Birthday>,
}

// GET /api/classes/{id}/students
pub async fn list_students(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    Path(class_id): Path<String>,
) -> AppResult<Json<Vec<Student>>> {
    class_service::ensure_class_access(&state.db_pool, &user, &class_id).await?;
    Ok(Json(student_service::list_students(&state.db_pool, &class_id).await?))
}

// POST /api/classes/{id}/students
pub async fn create_student(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    Path(class_id): Path<String>,
    Json(payload): Json<StudentPayload>,
) -> AppResult<impl IntoResponse> {
    class_service::ensure_class_access(&state.db_pool, &user, &class_id).await?;
    let (student, birthday) = student_service::create_student(&state.db_pool, &class_id, &payload).await?;

    let mut events = vec![ChangeEvent::insert(Table::Students, &student)];
    if let Some(b) = &birthday {
        events.push(ChangeEvent::insert(Table::Birthdays, b));
    }
    state.realtime.publish_all(events).await;
    Ok((StatusCode::CREATED, Json(CreatedStudent { student, birthday })))
}

// PUT /api/students/{id}
pub async fn update_student(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    Path(student_id): Path<String>,
    Json(update): Json<StudentUpdate>,
) -> AppResult<Json<Student>> {
    let current = student_service::find_student(&state.db_pool, &student_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Aluno".to_string()))?;
    class_service::ensure_class_access(&state.db_pool, &user, &current.class_id).await?;
    if let Some(target) = update.class_id.as_deref().filter(|t| *t != current.class_id) {
        class_service::ensure_class_access(&state.db_pool, &user, target).await?;
    }

    let student = student_service::update_student(&state.db_pool, &student_id, &update).await?;
    state.realtime.publish(ChangeEvent::update(Table::Students, &student)).await;
    Ok(Json(student))
}

// DELETE /api/students/{id}
pub async fn delete_student(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    Path(student_id): Path<String>,
) -> AppResult<StatusCode> {
    let student = student_service::find_student(&state.db_pool, &student_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Aluno".to_string()))?;
    class_service::ensure_class_access(&state.db_pool, &user, &student.class_id).await?;

    student_service::delete_student(&state.db_pool, &student_id).await?;
    // O aniversário espelhado cai em cascata
    state
        .realtime
        .publish_all(vec![
            ChangeEvent::delete_in_class(Table::Students, &student.id, &student.class_id),
            ChangeEvent::new(
                Table::Birthdays,
                EventType::Delete,
                None,
                Some(serde_json::json!({ "student_id": student.id, "class_id": student.class_id })),
            ),
        ])
        .await;
    Ok(StatusCode::NO_CONTENT)
}

// GET /api/classes/{id}/visitors
pub async fn list_visitors(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    Path(class_id): Path<String>,
) -> AppResult<Json<Vec<Visitor>>> {
    class_service::ensure_class_access(&state.db_pool, &user, &class_id).await?;
    Ok(Json(visitor_service::list_visitors(&state.db_pool, &class_id).await?))
}

// POST /api/classes/{id}/visitors
pub async fn create_visitor(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    Path(class_id): Path<String>,
    Json(payload): Json<VisitorPayload>,
) -> AppResult<impl IntoResponse> {
    class_service::ensure_class_access(&state.db_pool, &user, &class_id).await?;
    let visitor = visitor_service::create_visitor(&state.db_pool, &class_id, &payload).await?;
    state.realtime.publish(ChangeEvent::insert(Table::Visitors, &visitor)).await;
    Ok((StatusCode::CREATED, Json(visitor)))
}

// DELETE /api/visitors/{id}
pub async fn delete_visitor(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    Path(visitor_id): Path<String>,
) -> AppResult<StatusCode> {
    let visitor = visitor_service::find_visitor(&state.db_pool, &visitor_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Visitante".to_string()))?;
    class_service::ensure_class_access(&state.db_pool, &user, &visitor.class_id).await?;

    visitor_service::delete_visitor(&state.db_pool, &visitor_id).await?;
    state.realtime.publish(ChangeEvent::delete_in_class(Table::Visitors, &visitor.id, &visitor.class_id)).await;
    Ok(StatusCode::NO_CONTENT)
}

// GET /api/birthdays?month=
pub async fn list_birthdays(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    Query(query): Query<BirthdayQuery>,
) -> AppResult<Json<Vec<Birthday>>> {
    let scope = class_service::ClassScope::for_user(&user);
    let visible = class_service::visible_class_ids(&state.db_pool, &scope).await?;
    let birthdays = birthday_service::list_birthdays(&state.db_pool, query.month)
        .await?
        .into_iter()
        .filter(|b| visible.contains(&b.class_id))
        .collect();
    Ok(Json(birthdays))
}

// POST /api/birthdays
pub async fn create_birthday(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    Json(payload): Json<BirthdayPayload>,
) -> AppResult<impl IntoResponse> {
    class_service::ensure_class_access(&state.db_pool, &user, &payload.class_id).await?;
    let birthday = birthday_service::create_birthday(&state.db_pool, &payload).await?;
    state.realtime.publish(ChangeEvent::insert(Table::Birthdays, &birthday)).await;
    Ok((StatusCode::CREATED, Json(birthday)))
}

// DELETE /api/birthdays/{id}
pub async fn delete_birthday(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    Path(birthday_id): Path<String>,
) -> AppResult<StatusCode> {
    let birthday = birthday_service::find_birthday(&state.db_pool, &birthday_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Aniversário".to_string()))?;
    class_service::ensure_class_access(&state.db_pool, &user, &birthday.class_id).await?;

    birthday_service::delete_birthday(&state.db_pool, &birthday_id).await?;
    state.realtime.publish(ChangeEvent::delete_in_class(Table::Birthdays, &birthday.id, &birthday.class_id)).await;
    Ok(StatusCode::NO_CONTENT)
}
