// src/web/mw_secretary.rs
use crate::{error::AppError, models::user::SessionUser};
use axum::{
    extract::{Extension, Request},
    middleware::Next,
    response::Response,
};

/// Middleware que só deixa passar a secretaria.
/// Deve ser executado *depois* do middleware `require_auth`.
pub async fn require_secretary(
    Extension(user): Extension<SessionUser>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if user.is_secretary() {
        Ok(next.run(request).await)
    } else {
        tracing::warn!("Secretaria MW: Acesso negado para {}.", user.id);
        Err(AppError::Forbidden)
    }
}

/// Para rotas onde só alguns métodos são da secretaria (ex.: `GET` aberto,
/// `POST` restrito), o handler chama isto diretamente.
pub fn ensure_secretary(user: &SessionUser) -> Result<(), AppError> {
    if user.is_secretary() {
        Ok(())
    } else {
        tracing::warn!("Operação reservada à secretaria recusada para {}.", user.id);
        Err(AppError::Forbidden)
    }
}
