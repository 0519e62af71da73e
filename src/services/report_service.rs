// src/services/report_service.rs
//! Estatísticas do painel e relatórios: redutores puros sobre os agregados
//! carregados, sem nada gravado.

use crate::{
    calendar::{self, WEEKS_PER_QUARTER},
    error::{AppError, AppResult},
    models::{
        attendance::AttendanceRecord,
        class::{Birthday, ClassAggregate, Inventory, Visitor},
        report::{
            CalendarDay, CalendarMonth, ClassReport, ClassSummary, DashboardStats, InventoryTotals,
            StudentAttendance,
        },
    },
    services::{
        attendance_service, birthday_service, class_service::{self, ClassScope}, inventory_service,
    },
};
use chrono::{Datelike, NaiveDate};
use sqlx::SqlitePool;
use std::collections::{BTreeMap, HashSet};

/// Percentagem de presenças no trimestre: presentes / (alunos × 13),
/// arredondada ao inteiro mais próximo.
pub fn attendance_rate(present: usize, students: usize) -> u32 {
    if students == 0 {
        return 0;
    }
    let possible = (students as f64) * f64::from(WEEKS_PER_QUARTER);
    ((present as f64 / possible) * 100.0).round() as u32
}

/// Presenças por semana do trimestre (13 pontos).
pub fn weekly_series<'a>(records: impl IntoIterator<Item = &'a AttendanceRecord>) -> Vec<u32> {
    let mut series = vec![0u32; WEEKS_PER_QUARTER as usize];
    for record in records.into_iter().filter(|r| r.present) {
        if (1..=i64::from(WEEKS_PER_QUARTER)).contains(&record.week) {
            series[(record.week - 1) as usize] += 1;
        }
    }
    series
}

fn present_count<'a>(records: impl IntoIterator<Item = &'a AttendanceRecord>) -> usize {
    records.into_iter().filter(|r| r.present).count()
}

pub fn inventory_totals(inventories: &[Inventory]) -> InventoryTotals {
    inventories.iter().fold(InventoryTotals::default(), |mut acc, inv| {
        acc.bibles += inv.bibles;
        acc.magazines += inv.magazines;
        acc.offerings += inv.offerings;
        acc
    })
}

pub fn validate_quarter(label: &str) -> AppResult<()> {
    if calendar::parse_quarter(label).is_some() {
        Ok(())
    } else {
        Err(AppError::Validation(format!("Trimestre inválido: '{}'", label)))
    }
}

/// Painel: totais, presenças do trimestre e resumo por turma.
pub fn summarize_dashboard(
    classes: &[ClassAggregate],
    records: &[AttendanceRecord],
    inventories: &[Inventory],
    quarter: &str,
    today: NaiveDate,
) -> DashboardStats {
    let class_ids: HashSet<&str> = classes.iter().map(|c| c.id.as_str()).collect();
    let quarter_records: Vec<&AttendanceRecord> = records
        .iter()
        .filter(|r| r.quarter == quarter && class_ids.contains(r.class_id.as_str()))
        .collect();

    let total_students: usize = classes.iter().map(|c| c.students.len()).sum();
    let total_visitors: usize = classes.iter().map(|c| c.visitors.len()).sum();
    let quarter_visitors = classes
        .iter()
        .flat_map(|c| c.visitors.iter())
        .filter(|v| calendar::quarter_of(v.visit_date) == quarter)
        .count();
    let total_teachers = classes
        .iter()
        .flat_map(|c| c.teachers.iter().map(|t| t.id.as_str()))
        .collect::<HashSet<_>>()
        .len();
    let quarter_present = present_count(quarter_records.iter().copied());

    let mut birthdays_this_month: Vec<Birthday> = classes
        .iter()
        .flat_map(|c| c.birthdays.iter())
        .filter(|b| b.month == i64::from(today.month()))
        .cloned()
        .collect();
    birthdays_this_month.sort_by(|a, b| a.day.cmp(&b.day).then_with(|| a.name.cmp(&b.name)));

    let scoped_inventories: Vec<Inventory> = inventories
        .iter()
        .filter(|inv| inv.quarter == quarter && class_ids.contains(inv.class_id.as_str()))
        .cloned()
        .collect();

    let summaries = classes
        .iter()
        .map(|class| {
            let present = present_count(quarter_records.iter().copied().filter(|r| r.class_id == class.id));
            ClassSummary {
                class_id: class.id.clone(),
                name: class.name.clone(),
                students: class.students.len(),
                present,
                attendance_rate: attendance_rate(present, class.students.len()),
                visitors: class.visitors.len(),
            }
        })
        .collect();

    DashboardStats {
        quarter: quarter.to_string(),
        total_classes: classes.len(),
        total_students,
        total_teachers,
        total_visitors,
        quarter_visitors,
        quarter_present,
        quarter_attendance_rate: attendance_rate(quarter_present, total_students),
        weekly_present: weekly_series(quarter_records.iter().copied()),
        birthdays_this_month,
        inventory_totals: inventory_totals(&scoped_inventories),
        classes: summaries,
    }
}

/// Relatório de uma turma num trimestre.
pub fn build_class_report(
    class: &ClassAggregate,
    records: &[AttendanceRecord],
    inventory: Inventory,
    quarter: &str,
) -> ClassReport {
    let records: Vec<&AttendanceRecord> = records
        .iter()
        .filter(|r| r.class_id == class.id && r.quarter == quarter)
        .collect();
    let present = present_count(records.iter().copied());
    let absent = records.len() - present;

    let per_student = class
        .students
        .iter()
        .map(|s| {
            let own: Vec<&AttendanceRecord> = records.iter().copied().filter(|r| r.student_id == s.id).collect();
            let present = present_count(own.iter().copied());
            StudentAttendance {
                student_id: s.id.clone(),
                name: s.name.clone(),
                present,
                absent: own.len() - present,
            }
        })
        .collect();

    ClassReport {
        class_id: class.id.clone(),
        name: class.name.clone(),
        quarter: quarter.to_string(),
        students: class.students.len(),
        present,
        absent,
        attendance_rate: attendance_rate(present, class.students.len()),
        weekly_present: weekly_series(records.iter().copied()),
        per_student,
        visitors: class
            .visitors
            .iter()
            .filter(|v| calendar::quarter_of(v.visit_date) == quarter)
            .count(),
        inventory,
    }
}

/// Calendário de um mês: presenças, visitantes e aniversariantes por dia.
pub fn build_calendar_month(
    year: i32,
    month: u32,
    records: &[AttendanceRecord],
    visitors: &[Visitor],
    birthdays: &[Birthday],
) -> AppResult<CalendarMonth> {
    let days_in_month =
        calendar::days_in_month(year, month).ok_or_else(|| AppError::Validation("Mês inválido.".to_string()))?;

    let mut days: BTreeMap<NaiveDate, CalendarDay> = BTreeMap::new();
    for day in 1..=days_in_month {
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            days.insert(date, CalendarDay { date, present: 0, visitors: 0, birthdays: Vec::new() });
        }
    }

    for record in records.iter().filter(|r| r.present) {
        if let Some(day) = days.get_mut(&record.date) {
            day.present += 1;
        }
    }
    for visitor in visitors {
        if let Some(day) = days.get_mut(&visitor.visit_date) {
            day.visitors += 1;
        }
    }
    for birthday in birthdays.iter().filter(|b| b.month == i64::from(month)) {
        // 29/02 em ano não bissexto não aparece
        let Some(date) = NaiveDate::from_ymd_opt(year, month, birthday.day as u32) else {
            continue;
        };
        if let Some(day) = days.get_mut(&date) {
            day.birthdays.push(birthday.name.clone());
        }
    }

    Ok(CalendarMonth { year, month, days: days.into_values().collect() })
}

// --- Carregamento + redução ---

pub async fn dashboard(db_pool: &SqlitePool, scope: &ClassScope, quarter: &str) -> AppResult<DashboardStats> {
    validate_quarter(quarter)?;
    let classes = class_service::get_classes(db_pool, scope).await?;
    let records = attendance_service::list_attendance_for_quarter(db_pool, quarter).await?;
    let inventories = inventory_service::list_inventory_for_quarter(db_pool, quarter).await?;
    Ok(summarize_dashboard(&classes, &records, &inventories, quarter, calendar::today()))
}

pub async fn class_report(db_pool: &SqlitePool, class_id: &str, quarter: &str) -> AppResult<ClassReport> {
    validate_quarter(quarter)?;
    let class = class_service::get_class(db_pool, class_id).await?;
    let records = attendance_service::list_attendance_for_class(db_pool, class_id, quarter).await?;
    let inventory = inventory_service::get_inventory(db_pool, class_id, quarter).await?;
    Ok(build_class_report(&class, &records, inventory, quarter))
}

pub async fn calendar_month(db_pool: &SqlitePool, scope: &ClassScope, year: i32, month: u32) -> AppResult<CalendarMonth> {
    let days = calendar::days_in_month(year, month).ok_or_else(|| AppError::Validation("Mês inválido.".to_string()))?;
    let (Some(start), Some(end)) = (
        NaiveDate::from_ymd_opt(year, month, 1),
        NaiveDate::from_ymd_opt(year, month, days),
    ) else {
        return Err(AppError::Validation("Mês inválido.".to_string()));
    };

    let visible = class_service::visible_class_ids(db_pool, scope).await?;
    let records: Vec<AttendanceRecord> = attendance_service::list_attendance_between(db_pool, start, end)
        .await?
        .into_iter()
        .filter(|r| visible.contains(&r.class_id))
        .collect();
    let classes = class_service::get_classes(db_pool, scope).await?;
    let visitors: Vec<Visitor> = classes.iter().flat_map(|c| c.visitors.iter().cloned()).collect();
    let birthdays: Vec<Birthday> = birthday_service::list_birthdays(db_pool, Some(month))
        .await?
        .into_iter()
        .filter(|b| visible.contains(&b.class_id))
        .collect();

    build_calendar_month(year, month, &records, &visitors, &birthdays)
}
