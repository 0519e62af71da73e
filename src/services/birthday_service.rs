// src/services/birthday_service.rs
use crate::{
    error::{AppError, AppResult},
    models::class::{Birthday, BirthdayPayload},
    services::{new_id, required},
};
use chrono::{Datelike, NaiveDate};
use sqlx::{Sqlite, SqlitePool};

const BIRTHDAY_COLUMNS: &str = "id, class_id, student_id, name, birth_date, month, day, created_at";

/// Insere um aniversário. Mês e dia ficam fixados aqui e não voltam a ser
/// calculados se a data de origem mudar.
pub async fn insert_birthday<'e, E>(
    executor: E,
    class_id: &str,
    student_id: Option<&str>,
    name: &str,
    birth_date: NaiveDate,
) -> AppResult<String>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let id = new_id();
    sqlx::query(
        r#"
        INSERT INTO birthdays (id, class_id, student_id, name, birth_date, month, day)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&id)
    .bind(class_id)
    .bind(student_id)
    .bind(name)
    .bind(birth_date)
    .bind(birth_date.month() as i64)
    .bind(birth_date.day() as i64)
    .execute(executor)
    .await?;
    Ok(id)
}

pub async fn find_birthday(db_pool: &SqlitePool, id: &str) -> AppResult<Option<Birthday>> {
    let birthday = sqlx::query_as::<_, Birthday>(&format!("SELECT {} FROM birthdays WHERE id = ?1", BIRTHDAY_COLUMNS))
        .bind(id)
        .fetch_optional(db_pool)
        .await?;
    Ok(birthday)
}

/// Aniversários de um mês (1..=12), ou todos.
pub async fn list_birthdays(db_pool: &SqlitePool, month: Option<u32>) -> AppResult<Vec<Birthday>> {
    let birthdays = match month {
        Some(month) => {
            if !(1..=12).contains(&month) {
                return Err(AppError::Validation("Mês inválido.".to_string()));
            }
            sqlx::query_as::<_, Birthday>(&format!(
                "SELECT {} FROM birthdays WHERE month = ?1 ORDER BY day ASC, name ASC",
                BIRTHDAY_COLUMNS
            ))
            .bind(month as i64)
            .fetch_all(db_pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, Birthday>(&format!(
                "SELECT {} FROM birthdays ORDER BY month ASC, day ASC, name ASC",
                BIRTHDAY_COLUMNS
            ))
            .fetch_all(db_pool)
            .await?
        }
    };
    Ok(birthdays)
}

pub async fn create_birthday(db_pool: &SqlitePool, payload: &BirthdayPayload) -> AppResult<Birthday> {
    let name = required(&payload.name, "name")?;
    let id = insert_birthday(db_pool, &payload.class_id, None, &name, payload.birth_date).await?;
    tracing::info!("🎂 Aniversário de '{}' registado.", name);
    find_birthday(db_pool, &id).await?.ok_or(AppError::InternalServerError)
}

pub async fn delete_birthday(db_pool: &SqlitePool, id: &str) -> AppResult<Birthday> {
    let birthday = find_birthday(db_pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Aniversário".to_string()))?;
    sqlx::query("DELETE FROM birthdays WHERE id = ?1")
        .bind(id)
        .execute(db_pool)
        .await?;
    Ok(birthday)
}
