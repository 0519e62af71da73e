// src/web/report_handlers.rs
use crate::{
    calendar,
    error::AppResult,
    models::{
        report::{CalendarMonth, CalendarQuery, ClassReport, DashboardStats, ReportQuery},
        user::SessionUser,
    },
    services::{class_service, report_service},
    state::AppState,
};
use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use chrono::Datelike;

fn quarter_or_current(query: ReportQuery) -> String {
    query.quarter.unwrap_or_else(calendar::current_quarter)
}

// GET /api/reports/dashboard?quarter=
pub async fn dashboard(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    Query(query): Query<ReportQuery>,
) -> AppResult<Json<DashboardStats>> {
    let quarter = quarter_or_current(query);
    let scope = class_service::ClassScope::for_user(&user);
    Ok(Json(report_service::dashboard(&state.db_pool, &scope, &quarter).await?))
}

// GET /api/reports/classes/{id}?quarter=
pub async fn class_report(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    Path(class_id): Path<String>,
    Query(query): Query<ReportQuery>,
) -> AppResult<Json<ClassReport>> {
    class_service::ensure_class_access(&state.db_pool, &user, &class_id).await?;
    let quarter = quarter_or_current(query);
    Ok(Json(report_service::class_report(&state.db_pool, &class_id, &quarter).await?))
}

// GET /api/calendar?year=&month= (mês 1..=12; por omissão, o mês corrente)
pub async fn calendar_month(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    Query(query): Query<CalendarQuery>,
) -> AppResult<Json<CalendarMonth>> {
    let today = calendar::today();
    let year = query.year.unwrap_or_else(|| today.year());
    let month = query.month.unwrap_or_else(|| today.month());
    let scope = class_service::ClassScope::for_user(&user);
    Ok(Json(report_service::calendar_month(&state.db_pool, &scope, year, month).await?))
}
