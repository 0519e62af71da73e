// src/web/page_handlers.rs
use crate::{
    error::{AppError, AppResult},
    models::user::{Role, SessionUser},
    services::settings_service,
    state::AppState,
    templates::HomePage,
};
use askama::Template;
use axum::{
    extract::{Extension, State},
    response::Html,
};

// GET / (protegido pelo middleware)
pub async fn home_page_handler(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
) -> AppResult<Html<String>> {
    tracing::debug!("GET /: Acesso para {}", user.id);
    let church_name = settings_service::get_settings(&state.db_pool).await?.church_name;

    let template = HomePage {
        church_name,
        user_name: user.name,
        role_label: match user.role {
            Role::Professor => "Professor",
            Role::Secretario => "Secretaria",
        },
        is_secretary: user.role == Role::Secretario,
    };

    template.render().map(Html).map_err(|e| {
        tracing::error!("Falha ao renderizar template HomePage: {}", e);
        AppError::InternalServerError
    })
}
