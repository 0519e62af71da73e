// src/services/settings_service.rs
use crate::{
    error::{AppError, AppResult},
    models::user::{SettingsUpdate, SystemSettings},
    services::{auth_service, new_id, optional},
};
use sqlx::SqlitePool;

/// Id fixo que a secretaria tinha antes de passar a ter um uuid próprio.
pub const LEGACY_SECRETARY_ID: &str = "secretaria-001";

pub async fn find_settings(db_pool: &SqlitePool) -> AppResult<Option<SystemSettings>> {
    let settings = sqlx::query_as::<_, SystemSettings>(
        r#"
        SELECT secretary_id, secretary_name, username, password_hash, church_name, updated_at
        FROM system_settings
        WHERE id = 1
        "#,
    )
    .fetch_optional(db_pool)
    .await?;
    Ok(settings)
}

pub async fn get_settings(db_pool: &SqlitePool) -> AppResult<SystemSettings> {
    find_settings(db_pool).await?.ok_or_else(|| {
        tracing::error!("Linha de system_settings inexistente!");
        AppError::NotFound("Definições do sistema".to_string())
    })
}

/// Cria a linha de definições na primeira execução.
pub async fn ensure_settings(
    db_pool: &SqlitePool,
    username: &str,
    raw_password: &str,
    church_name: &str,
) -> AppResult<SystemSettings> {
    if let Some(settings) = find_settings(db_pool).await? {
        return Ok(settings);
    }

    tracing::info!("Criando definições iniciais (secretaria '{}')...", username);
    let password_hash = auth_service::hash_password(raw_password).await?;
    sqlx::query(
        r#"
        INSERT OR IGNORE INTO system_settings (id, secretary_id, secretary_name, username, password_hash, church_name)
        VALUES (1, ?1, 'Secretaria', ?2, ?3, ?4)
        "#,
    )
    .bind(new_id())
    .bind(username)
    .bind(&password_hash)
    .bind(church_name)
    .execute(db_pool)
    .await?;

    get_settings(db_pool).await
}

/// Troca o id fixo antigo da secretaria por um uuid novo, também nos recados.
/// Devolve o id novo quando houve migração.
pub async fn migrate_legacy_secretary_id(db_pool: &SqlitePool) -> AppResult<Option<String>> {
    let Some(settings) = find_settings(db_pool).await? else {
        return Ok(None);
    };
    if settings.secretary_id != LEGACY_SECRETARY_ID {
        return Ok(None);
    }

    let fresh_id = new_id();
    tracing::info!("Migrando id legado da secretaria para {}", fresh_id);

    let mut tx = db_pool.begin().await?;
    sqlx::query("UPDATE system_settings SET secretary_id = ?1, updated_at = CURRENT_TIMESTAMP WHERE id = 1")
        .bind(&fresh_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("UPDATE messages SET sender_id = ?1 WHERE sender_id = ?2")
        .bind(&fresh_id)
        .bind(LEGACY_SECRETARY_ID)
        .execute(&mut *tx)
        .await?;
    sqlx::query("UPDATE messages SET recipient_id = ?1 WHERE recipient_id = ?2")
        .bind(&fresh_id)
        .bind(LEGACY_SECRETARY_ID)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok(Some(fresh_id))
}

pub async fn update_settings(db_pool: &SqlitePool, update: &SettingsUpdate) -> AppResult<SystemSettings> {
    let current = get_settings(db_pool).await?;

    let secretary_name = optional(update.secretary_name.as_deref()).unwrap_or(current.secretary_name);
    let username = optional(update.username.as_deref()).unwrap_or(current.username);
    let church_name = optional(update.church_name.as_deref()).unwrap_or(current.church_name);
    let password_hash = match update.new_password.as_deref() {
        Some(raw) => {
            auth_service::validate_new_password(raw)?;
            auth_service::hash_password(raw).await?
        }
        None => current.password_hash,
    };

    sqlx::query(
        r#"
        UPDATE system_settings
        SET secretary_name = ?1, username = ?2, password_hash = ?3, church_name = ?4,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = 1
        "#,
    )
    .bind(&secretary_name)
    .bind(&username)
    .bind(&password_hash)
    .bind(&church_name)
    .execute(db_pool)
    .await?;

    tracing::info!("✅ Definições atualizadas (utilizador da secretaria: {}).", username);
    get_settings(db_pool).await
}
