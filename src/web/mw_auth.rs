// src/web/mw_auth.rs
use crate::{
    error::AppError,
    models::user::{Role, SessionUser},
    services::{settings_service, user_service},
    state::AppState,
};
use axum::{
    extract::{OriginalUri, Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

/// Chave única da sessão com a identidade de quem está autenticado.
pub const SESSION_USER_KEY: &str = "current_user";

// Middleware que verifica se o utilizador está logado
pub async fn require_auth(
    State(state): State<AppState>,
    session: Session,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let wants_json = {
        let path = request
            .extensions()
            .get::<OriginalUri>()
            .map_or_else(|| request.uri().path(), |uri| uri.0.path());
        path.starts_with("/api") || path.starts_with("/ws")
    };

    let user = match session.get::<SessionUser>(SESSION_USER_KEY).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            tracing::debug!("Autenticação MW: Não autenticado.");
            return if wants_json {
                Err(AppError::Unauthorized)
            } else {
                Ok(Redirect::to("/login").into_response())
            };
        }
        Err(e) => {
            tracing::error!("Autenticação MW: Erro ao ler sessão: {:?}", e);
            return Err(AppError::SessionError(format!("Erro ao verificar sessão: {}", e)));
        }
    };

    let user = match refresh_session_user(&state, &session, user).await? {
        Some(user) => user,
        None => {
            // Conta apagada entretanto
            session
                .delete()
                .await
                .map_err(|e| AppError::SessionError(format!("Falha ao apagar sessão: {}", e)))?;
            return if wants_json {
                Err(AppError::Unauthorized)
            } else {
                Ok(Redirect::to("/login").into_response())
            };
        }
    };

    tracing::debug!("Autenticação MW: '{}' ({}) autenticado.", user.id, user.role.as_str());
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Confirma que a identidade da sessão ainda existe. Uma sessão de secretaria
/// com o id fixo antigo é reescrita com o id atual.
async fn refresh_session_user(
    state: &AppState,
    session: &Session,
    user: SessionUser,
) -> Result<Option<SessionUser>, AppError> {
    match user.role {
        Role::Professor => Ok(user_service::find_user_by_id(&state.db_pool, &user.id)
            .await?
            .map(|_| user)),
        Role::Secretario if user.id == settings_service::LEGACY_SECRETARY_ID => {
            let settings = settings_service::get_settings(&state.db_pool).await?;
            let migrated = SessionUser { id: settings.secretary_id, ..user };
            session
                .insert(SESSION_USER_KEY, &migrated)
                .await
                .map_err(|e| AppError::SessionError(format!("Falha ao reescrever sessão: {}", e)))?;
            tracing::info!("Sessão da secretaria migrada para o id {}", migrated.id);
            Ok(Some(migrated))
        }
        Role::Secretario => Ok(Some(user)),
    }
}
