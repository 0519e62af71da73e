// src/calendar.rs
//! Trimestres da EBD: 13 semanas, etiquetados pelo trimestre civil.

use chrono::{Datelike, Local, NaiveDate};

/// Semanas num trimestre.
pub const WEEKS_PER_QUARTER: u32 = 13;

/// Etiqueta do trimestre, com `month0` a contar de zero (janeiro = 0).
pub fn quarter_label(year: i32, month0: u32) -> String {
    format!("{}-Q{}", year, month0 / 3 + 1)
}

pub fn quarter_of(date: NaiveDate) -> String {
    quarter_label(date.year(), date.month0())
}

pub fn current_quarter() -> String {
    quarter_of(today())
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Semana do ano com semanas a começar ao domingo; a semana que contém
/// 1 de janeiro é a semana 1.
pub fn week_of_year(date: NaiveDate) -> u32 {
    let jan1_offset = NaiveDate::from_ymd_opt(date.year(), 1, 1)
        .map(|d| d.weekday().num_days_from_sunday())
        .unwrap_or(0);
    (date.ordinal0() + jan1_offset) / 7 + 1
}

/// Semana dentro do trimestre, sempre em `[1, 13]`.
pub fn week_in_quarter(date: NaiveDate) -> u32 {
    (week_of_year(date) - 1) % WEEKS_PER_QUARTER + 1
}

/// Lê uma etiqueta `AAAA-Qn`, devolvendo o ano e o número do trimestre.
pub fn parse_quarter(label: &str) -> Option<(i32, u32)> {
    let (year, quarter) = label.trim().split_once("-Q")?;
    let year = year.parse::<i32>().ok()?;
    let quarter = quarter.parse::<u32>().ok()?;
    (1..=4).contains(&quarter).then_some((year, quarter))
}

/// Primeiro e último dia do trimestre civil que contém `date`.
pub fn quarter_bounds(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first_month = date.month0() / 3 * 3 + 1;
    let start = NaiveDate::from_ymd_opt(date.year(), first_month, 1).unwrap_or(date);
    let end = if first_month == 10 {
        NaiveDate::from_ymd_opt(date.year(), 12, 31)
    } else {
        NaiveDate::from_ymd_opt(date.year(), first_month + 3, 1).and_then(|d| d.pred_opt())
    }
    .unwrap_or(date);
    (start, end)
}

pub fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((next - first).num_days() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn quarter_label_uses_zero_based_month() {
        assert_eq!(quarter_label(2024, 0), "2024-Q1");
        assert_eq!(quarter_label(2024, 2), "2024-Q1");
        assert_eq!(quarter_label(2024, 3), "2024-Q2");
        assert_eq!(quarter_label(2024, 11), "2024-Q4");
        assert_eq!(quarter_of(d(2024, 5, 5)), "2024-Q2");
    }

    #[test]
    fn parse_quarter_labels() {
        assert_eq!(parse_quarter("2024-Q2"), Some((2024, 2)));
        assert_eq!(parse_quarter("2024-Q5"), None);
        assert_eq!(parse_quarter("Q2-2024"), None);
        assert_eq!(parse_quarter(&quarter_of(d(2023, 12, 24))), Some((2023, 4)));
    }

    #[test]
    fn week_numbers_start_on_sunday() {
        // 2024-01-01 foi segunda: domingo 7 já é a semana 2
        assert_eq!(week_of_year(d(2024, 1, 1)), 1);
        assert_eq!(week_of_year(d(2024, 1, 6)), 1);
        assert_eq!(week_of_year(d(2024, 1, 7)), 2);
        assert_eq!(week_of_year(d(2024, 5, 5)), 19);
    }

    #[test]
    fn week_in_quarter_wraps_every_13_weeks() {
        assert_eq!(week_in_quarter(d(2024, 5, 5)), 6);
        assert_eq!(week_in_quarter(d(2024, 1, 1)), 1);
        // semana 14 volta a ser a 1
        assert_eq!(week_of_year(d(2024, 3, 31)), 14);
        assert_eq!(week_in_quarter(d(2024, 3, 31)), 1);

        let mut day = d(2023, 1, 1);
        while day < d(2025, 1, 1) {
            let w = week_in_quarter(day);
            assert!((1..=WEEKS_PER_QUARTER).contains(&w), "{} -> {}", day, w);
            day = day.succ_opt().unwrap();
        }
    }

    #[test]
    fn quarter_bounds_cover_the_calendar_quarter() {
        assert_eq!(quarter_bounds(d(2024, 5, 5)), (d(2024, 4, 1), d(2024, 6, 30)));
        assert_eq!(quarter_bounds(d(2024, 11, 20)), (d(2024, 10, 1), d(2024, 12, 31)));
        assert_eq!(quarter_bounds(d(2024, 2, 29)), (d(2024, 1, 1), d(2024, 3, 31)));
    }

    #[test]
    fn month_lengths() {
        assert_eq!(days_in_month(2024, 2), Some(29));
        assert_eq!(days_in_month(2023, 2), Some(28));
        assert_eq!(days_in_month(2024, 12), Some(31));
        assert_eq!(days_in_month(2024, 13), None);
    }
}
