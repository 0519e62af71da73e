// src/services/mod.rs
pub mod announcement_service;
pub mod attendance_service;
pub mod auth_service;
pub mod birthday_service;
pub mod class_service;
pub mod inventory_service;
pub mod message_service;
pub mod report_service;
pub mod settings_service;
pub mod student_service;
pub mod user_service;
pub mod visitor_service;

use crate::error::{AppError, AppResult};

/// Erro de UNIQUE do SQLite?
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

/// Texto obrigatório, já sem espaços nas pontas.
pub(crate) fn required(value: &str, field: &str) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("O campo '{}' é obrigatório.", field)));
    }
    Ok(trimmed.to_string())
}

/// Texto opcional: vazio passa a `None`.
pub(crate) fn optional(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(String::from)
}

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
