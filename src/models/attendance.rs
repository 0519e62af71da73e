// src/models/attendance.rs
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub id: String,
    pub student_id: String,
    pub class_id: String,
    pub date: NaiveDate,
    pub present: bool,
    /// Semana dentro do trimestre (1..=13).
    pub week: i64,
    pub quarter: String,
}

/// Marcação de um aluno num dia.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceMark {
    pub student_id: String,
    pub present: bool,
}

#[derive(Debug, Deserialize)]
pub struct AttendanceDayPayload {
    pub date: NaiveDate,
    pub marks: Vec<AttendanceMark>,
}

#[derive(Debug, Deserialize)]
pub struct AttendanceQuery {
    pub date: Option<NaiveDate>,
}

/// Chamada de um dia: cada aluno da turma e se estava presente
/// (`None` se ainda não foi marcado).
#[derive(Debug, Clone, Serialize)]
pub struct AttendanceDay {
    pub class_id: String,
    pub date: NaiveDate,
    pub week: u32,
    pub quarter: String,
    pub entries: Vec<AttendanceEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttendanceEntry {
    pub student_id: String,
    pub student_name: String,
    pub present: Option<bool>,
}
