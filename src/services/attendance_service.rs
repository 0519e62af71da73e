// src/services/attendance_service.rs
use crate::{
    calendar,
    error::{AppError, AppResult},
    models::attendance::{AttendanceDay, AttendanceEntry, AttendanceMark, AttendanceRecord},
    services::{new_id, student_service},
};
use chrono::NaiveDate;
use sqlx::SqlitePool;
use std::collections::{HashMap, HashSet};

const ATTENDANCE_COLUMNS: &str = "id, student_id, class_id, date, present, week, quarter";

pub async fn list_attendance_for_day(
    db_pool: &SqlitePool,
    class_id: &str,
    date: NaiveDate,
) -> AppResult<Vec<AttendanceRecord>> {
    let records = sqlx::query_as::<_, AttendanceRecord>(&format!(
        "SELECT {} FROM attendance_records WHERE class_id = ?1 AND date = ?2",
        ATTENDANCE_COLUMNS
    ))
    .bind(class_id)
    .bind(date)
    .fetch_all(db_pool)
    .await?;
    Ok(records)
}

pub async fn list_attendance_for_quarter(db_pool: &SqlitePool, quarter: &str) -> AppResult<Vec<AttendanceRecord>> {
    let records = sqlx::query_as::<_, AttendanceRecord>(&format!(
        "SELECT {} FROM attendance_records WHERE quarter = ?1 ORDER BY date ASC",
        ATTENDANCE_COLUMNS
    ))
    .bind(quarter)
    .fetch_all(db_pool)
    .await?;
    Ok(records)
}

pub async fn list_attendance_for_class(
    db_pool: &SqlitePool,
    class_id: &str,
    quarter: &str,
) -> AppResult<Vec<AttendanceRecord>> {
    let records = sqlx::query_as::<_, AttendanceRecord>(&format!(
        "SELECT {} FROM attendance_records WHERE class_id = ?1 AND quarter = ?2 ORDER BY date ASC",
        ATTENDANCE_COLUMNS
    ))
    .bind(class_id)
    .bind(quarter)
    .fetch_all(db_pool)
    .await?;
    Ok(records)
}

pub async fn list_attendance_between(
    db_pool: &SqlitePool,
    start: NaiveDate,
    end: NaiveDate,
) -> AppResult<Vec<AttendanceRecord>> {
    let records = sqlx::query_as::<_, AttendanceRecord>(&format!(
        "SELECT {} FROM attendance_records WHERE date >= ?1 AND date <= ?2 ORDER BY date ASC",
        ATTENDANCE_COLUMNS
    ))
    .bind(start)
    .bind(end)
    .fetch_all(db_pool)
    .await?;
    Ok(records)
}

/// Chamada de um dia: todos os alunos da turma com a marcação gravada, se existir.
pub async fn get_attendance_day(db_pool: &SqlitePool, class_id: &str, date: NaiveDate) -> AppResult<AttendanceDay> {
    let students = student_service::list_students(db_pool, class_id).await?;
    let marks: HashMap<String, bool> = list_attendance_for_day(db_pool, class_id, date)
        .await?
        .into_iter()
        .map(|r| (r.student_id, r.present))
        .collect();

    let entries = students
        .into_iter()
        .map(|s| AttendanceEntry {
            present: marks.get(&s.id).copied(),
            student_id: s.id,
            student_name: s.name,
        })
        .collect();

    Ok(AttendanceDay {
        class_id: class_id.to_string(),
        date,
        week: calendar::week_in_quarter(date),
        quarter: calendar::quarter_of(date),
        entries,
    })
}

/// Grava a chamada do dia. Cada marcação é um upsert por (aluno, data), por
/// isso gravar duas vezes o mesmo dia substitui em vez de duplicar.
pub async fn save_attendance_day(
    db_pool: &SqlitePool,
    class_id: &str,
    date: NaiveDate,
    marks: &[AttendanceMark],
) -> AppResult<Vec<AttendanceRecord>> {
    if marks.is_empty() {
        return Err(AppError::Validation("Nenhuma marcação enviada.".to_string()));
    }

    let enrolled: HashSet<String> = student_service::list_students(db_pool, class_id)
        .await?
        .into_iter()
        .map(|s| s.id)
        .collect();
    if let Some(stranger) = marks.iter().find(|m| !enrolled.contains(&m.student_id)) {
        return Err(AppError::Validation(format!(
            "O aluno '{}' não pertence a esta turma.",
            stranger.student_id
        )));
    }

    let week = calendar::week_in_quarter(date) as i64;
    let quarter = calendar::quarter_of(date);
    tracing::debug!("Gravando chamada de {} na turma {} (semana {}, {})", date, class_id, week, quarter);

    let mut tx = db_pool.begin().await?;
    for mark in marks {
        sqlx::query(
            r#"
            INSERT INTO attendance_records (id, student_id, class_id, date, present, week, quarter)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(student_id, date) DO UPDATE SET
               class_id = excluded.class_id,
               present = excluded.present,
               week = excluded.week,
               quarter = excluded.quarter
            "#,
        )
        .bind(new_id())
        .bind(&mark.student_id)
        .bind(class_id)
        .bind(date)
        .bind(mark.present)
        .bind(week)
        .bind(&quarter)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    let present = marks.iter().filter(|m| m.present).count();
    tracing::info!("✅ Chamada de {} gravada: {}/{} presentes.", date, present, marks.len());
    list_attendance_for_day(db_pool, class_id, date).await
}
