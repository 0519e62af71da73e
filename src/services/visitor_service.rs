// src/services/visitor_service.rs
use crate::{
    calendar,
    error::{AppError, AppResult},
    models::class::{Visitor, VisitorPayload},
    services::{new_id, optional, required},
};
use sqlx::SqlitePool;

const VISITOR_COLUMNS: &str = "id, class_id, name, visit_date, phone, notes, created_at";

pub async fn find_visitor(db_pool: &SqlitePool, id: &str) -> AppResult<Option<Visitor>> {
    let visitor = sqlx::query_as::<_, Visitor>(&format!("SELECT {} FROM visitors WHERE id = ?1", VISITOR_COLUMNS))
        .bind(id)
        .fetch_optional(db_pool)
        .await?;
    Ok(visitor)
}

pub async fn list_visitors(db_pool: &SqlitePool, class_id: &str) -> AppResult<Vec<Visitor>> {
    let visitors = sqlx::query_as::<_, Visitor>(&format!(
        "SELECT {} FROM visitors WHERE class_id = ?1 ORDER BY visit_date DESC, name ASC",
        VISITOR_COLUMNS
    ))
    .bind(class_id)
    .fetch_all(db_pool)
    .await?;
    Ok(visitors)
}

pub async fn list_all_visitors(db_pool: &SqlitePool) -> AppResult<Vec<Visitor>> {
    let visitors = sqlx::query_as::<_, Visitor>(&format!(
        "SELECT {} FROM visitors ORDER BY visit_date DESC, name ASC",
        VISITOR_COLUMNS
    ))
    .fetch_all(db_pool)
    .await?;
    Ok(visitors)
}

/// Regista um visitante; sem data, conta como visita de hoje.
pub async fn create_visitor(db_pool: &SqlitePool, class_id: &str, payload: &VisitorPayload) -> AppResult<Visitor> {
    let name = required(&payload.name, "name")?;
    let visit_date = payload.visit_date.unwrap_or_else(calendar::today);
    let id = new_id();

    sqlx::query(
        r#"
        INSERT INTO visitors (id, class_id, name, visit_date, phone, notes)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(&id)
    .bind(class_id)
    .bind(&name)
    .bind(visit_date)
    .bind(optional(payload.phone.as_deref()))
    .bind(optional(payload.notes.as_deref()))
    .execute(db_pool)
    .await?;
    tracing::info!("👋 Visitante '{}' registado na turma {}.", name, class_id);

    find_visitor(db_pool, &id).await?.ok_or(AppError::InternalServerError)
}

pub async fn delete_visitor(db_pool: &SqlitePool, id: &str) -> AppResult<Visitor> {
    let visitor = find_visitor(db_pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Visitante".to_string()))?;
    sqlx::query("DELETE FROM visitors WHERE id = ?1")
        .bind(id)
        .execute(db_pool)
        .await?;
    Ok(visitor)
}
