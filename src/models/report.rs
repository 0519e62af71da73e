// src/models/report.rs
use crate::models::class::{Birthday, Inventory};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Resumo de uma turma no painel.
#[derive(Debug, Clone, Serialize)]
pub struct ClassSummary {
    pub class_id: String,
    pub name: String,
    pub students: usize,
    pub present: usize,
    /// Percentagem arredondada de presenças no trimestre.
    pub attendance_rate: u32,
    pub visitors: usize,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct InventoryTotals {
    pub bibles: i64,
    pub magazines: i64,
    pub offerings: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub quarter: String,
    pub total_classes: usize,
    pub total_students: usize,
    pub total_teachers: usize,
    pub total_visitors: usize,
    pub quarter_visitors: usize,
    pub quarter_present: usize,
    pub quarter_attendance_rate: u32,
    /// Presenças por semana do trimestre (13 pontos).
    pub weekly_present: Vec<u32>,
    pub birthdays_this_month: Vec<Birthday>,
    pub inventory_totals: InventoryTotals,
    pub classes: Vec<ClassSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentAttendance {
    pub student_id: String,
    pub name: String,
    pub present: usize,
    pub absent: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassReport {
    pub class_id: String,
    pub name: String,
    pub quarter: String,
    pub students: usize,
    pub present: usize,
    pub absent: usize,
    pub attendance_rate: u32,
    pub weekly_present: Vec<u32>,
    pub per_student: Vec<StudentAttendance>,
    pub visitors: usize,
    pub inventory: Inventory,
}

#[derive(Debug, Clone, Serialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub present: usize,
    pub visitors: usize,
    pub birthdays: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CalendarMonth {
    pub year: i32,
    pub month: u32,
    pub days: Vec<CalendarDay>,
}

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    /// Etiqueta do trimestre (ex.: `2024-Q2`); omissa = trimestre atual.
    pub quarter: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CalendarQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct BirthdayQuery {
    pub month: Option<u32>,
}
