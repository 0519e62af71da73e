// src/services/auth_service.rs
use crate::{
    error::{AppError, AppResult},
    models::user::{Role, SessionUser},
    services::{settings_service, user_service},
};
use sqlx::SqlitePool;
use std::sync::atomic::{AtomicU32, Ordering};

/// Tamanho mínimo das senhas novas.
pub const MIN_PASSWORD_LEN: usize = 6;

static HASH_COST: AtomicU32 = AtomicU32::new(bcrypt::DEFAULT_COST);

/// Custo bcrypt dos hashes novos (4..=31).
pub fn set_hash_cost(cost: u32) {
    HASH_COST.store(cost.clamp(4, 31), Ordering::Relaxed);
}

/// Verifica se a senha fornecida corresponde ao hash guardado.
pub async fn verify_password(password: &str, stored_hash: &str) -> AppResult<bool> {
    let password = password.to_string();
    let stored_hash = stored_hash.to_string();
    tokio::task::spawn_blocking(move || {
        tracing::debug!("Verificando hash bcrypt...");
        bcrypt::verify(&password, &stored_hash)
    })
    .await
    .map_err(|e| {
        tracing::error!("Erro na task spawn_blocking (verify_password): {:?}", e);
        AppError::InternalServerError
    })?
    .map_err(|e| {
        tracing::error!("Erro bcrypt ao verificar senha: {:?}", e);
        AppError::PasswordHashingError
    })
}

/// Gera um hash bcrypt para uma senha.
pub async fn hash_password(password: &str) -> AppResult<String> {
    let password = password.to_string();
    let cost = HASH_COST.load(Ordering::Relaxed);
    tokio::task::spawn_blocking(move || {
        tracing::debug!("Gerando hash bcrypt (custo {})...", cost);
        bcrypt::hash(&password, cost)
    })
    .await
    .map_err(|e| {
        tracing::error!("Erro na task spawn_blocking (hash_password): {:?}", e);
        AppError::InternalServerError
    })?
    .map_err(|e| {
        tracing::error!("Erro bcrypt ao gerar hash: {:?}", e);
        AppError::PasswordHashingError
    })
}

pub fn validate_new_password(password: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "A senha deve ter pelo menos {} caracteres.",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

/// Autentica pelo papel escolhido no formulário. A secretaria compara com a
/// linha de `system_settings`; professores com a sua linha em `users`.
pub async fn authenticate(
    db_pool: &SqlitePool,
    username: &str,
    password: &str,
    role: Role,
) -> AppResult<SessionUser> {
    let username = username.trim();
    match role {
        Role::Secretario => {
            let settings = settings_service::get_settings(db_pool).await?;
            if !settings.username.eq_ignore_ascii_case(username) {
                tracing::warn!("Login de secretaria com utilizador desconhecido: {}", username);
                return Err(AppError::InvalidCredentials);
            }
            if !verify_password(password, &settings.password_hash).await? {
                tracing::warn!("Senha incorreta para a secretaria ({})", username);
                return Err(AppError::InvalidCredentials);
            }
            Ok(SessionUser {
                id: settings.secretary_id,
                username: settings.username,
                name: settings.secretary_name,
                role: Role::Secretario,
            })
        }
        Role::Professor => {
            let user = match user_service::find_user_by_username(db_pool, username).await? {
                Some(user) if user.role == Role::Professor => user,
                _ => {
                    tracing::warn!("Professor não encontrado: {}", username);
                    return Err(AppError::InvalidCredentials);
                }
            };
            if !verify_password(password, &user.password_hash).await? {
                tracing::warn!("Senha incorreta para o professor {}", username);
                return Err(AppError::InvalidCredentials);
            }
            Ok(SessionUser {
                id: user.id,
                username: user.username,
                name: user.name,
                role: Role::Professor,
            })
        }
    }
}
