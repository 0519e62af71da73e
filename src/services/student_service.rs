// src/services/student_service.rs
use crate::{
    error::{AppError, AppResult},
    models::class::{Birthday, Student, StudentPayload, StudentUpdate},
    services::{birthday_service, class_service, new_id, optional, required},
};
use sqlx::SqlitePool;

const STUDENT_COLUMNS: &str = "id, class_id, name, birthday, phone, created_at";

pub async fn find_student(db_pool: &SqlitePool, id: &str) -> AppResult<Option<Student>> {
    let student = sqlx::query_as::<_, Student>(&format!("SELECT {} FROM students WHERE id = ?1", STUDENT_COLUMNS))
        .bind(id)
        .fetch_optional(db_pool)
        .await?;
    Ok(student)
}

pub async fn list_students(db_pool: &SqlitePool, class_id: &str) -> AppResult<Vec<Student>> {
    let students = sqlx::query_as::<_, Student>(&format!(
        "SELECT {} FROM students WHERE class_id = ?1 ORDER BY name ASC",
        STUDENT_COLUMNS
    ))
    .bind(class_id)
    .fetch_all(db_pool)
    .await?;
    Ok(students)
}

pub async fn list_all_students(db_pool: &SqlitePool) -> AppResult<Vec<Student>> {
    let students = sqlx::query_as::<_, Student>(&format!("SELECT {} FROM students ORDER BY name ASC", STUDENT_COLUMNS))
        .fetch_all(db_pool)
        .await?;
    Ok(students)
}

/// Cria o aluno e, se tiver data de nascimento, o aniversário espelhado.
pub async fn create_student(
    db_pool: &SqlitePool,
    class_id: &str,
    payload: &StudentPayload,
) -> AppResult<(Student, Option<Birthday>)> {
    let name = required(&payload.name, "name")?;
    let phone = optional(payload.phone.as_deref());
    let id = new_id();

    let mut tx = db_pool.begin().await?;
    sqlx::query("INSERT INTO students (id, class_id, name, birthday, phone) VALUES (?1, ?2, ?3, ?4, ?5)")
        .bind(&id)
        .bind(class_id)
        .bind(&name)
        .bind(payload.birthday)
        .bind(&phone)
        .execute(&mut *tx)
        .await?;

    let birthday_id = match payload.birthday {
        Some(date) => Some(birthday_service::insert_birthday(&mut *tx, class_id, Some(&id), &name, date).await?),
        None => None,
    };
    tx.commit().await?;
    tracing::info!("✅ Aluno '{}' criado na turma {}.", name, class_id);

    let student = find_student(db_pool, &id).await?.ok_or(AppError::InternalServerError)?;
    let birthday = match birthday_id {
        Some(bid) => birthday_service::find_birthday(db_pool, &bid).await?,
        None => None,
    };
    Ok((student, birthday))
}

/// Atualiza o aluno. O aniversário espelhado não é tocado.
pub async fn update_student(db_pool: &SqlitePool, id: &str, update: &StudentUpdate) -> AppResult<Student> {
    let current = find_student(db_pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Aluno".to_string()))?;
    let name = required(&update.name, "name")?;
    let phone = optional(update.phone.as_deref());

    let class_id = match update.class_id.as_deref() {
        Some(target) if target != current.class_id => {
            if class_service::find_class(db_pool, target).await?.is_none() {
                return Err(AppError::NotFound("Turma".to_string()));
            }
            target.to_string()
        }
        _ => current.class_id,
    };

    sqlx::query("UPDATE students SET name = ?1, birthday = ?2, phone = ?3, class_id = ?4 WHERE id = ?5")
        .bind(&name)
        .bind(update.birthday)
        .bind(&phone)
        .bind(&class_id)
        .bind(id)
        .execute(db_pool)
        .await?;

    find_student(db_pool, id).await?.ok_or(AppError::InternalServerError)
}

pub async fn delete_student(db_pool: &SqlitePool, id: &str) -> AppResult<Student> {
    let student = find_student(db_pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Aluno".to_string()))?;
    sqlx::query("DELETE FROM students WHERE id = ?1")
        .bind(id)
        .execute(db_pool)
        .await?;
    tracing::info!("🗑️ Aluno '{}' removido.", student.name);
    Ok(student)
}
