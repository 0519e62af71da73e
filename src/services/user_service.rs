// src/services/user_service.rs
use crate::{
    error::{AppError, AppResult},
    models::user::{NewUser, Role, User, UserRow},
    services::{auth_service, is_unique_violation, new_id, required},
};
use sqlx::SqlitePool;
use std::collections::HashMap;

const USER_COLUMNS: &str = "id, username, password_hash, name, role, created_at, updated_at";

/// Busca um utilizador pelo seu ID.
pub async fn find_user_by_id(db_pool: &SqlitePool, user_id: &str) -> AppResult<Option<UserRow>> {
    tracing::debug!("Buscando utilizador por ID: {}", user_id);
    let user = sqlx::query_as::<_, UserRow>(&format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS))
        .bind(user_id)
        .fetch_optional(db_pool)
        .await?;
    Ok(user)
}

/// Busca pelo nome de utilizador (sem distinguir maiúsculas).
pub async fn find_user_by_username(db_pool: &SqlitePool, username: &str) -> AppResult<Option<UserRow>> {
    let user = sqlx::query_as::<_, UserRow>(&format!(
        "SELECT {} FROM users WHERE username = ?1 COLLATE NOCASE",
        USER_COLUMNS
    ))
    .bind(username)
    .fetch_optional(db_pool)
    .await?;
    Ok(user)
}

/// Turmas de cada professor, a partir de `class_teachers`.
async fn class_ids_by_user(db_pool: &SqlitePool) -> AppResult<HashMap<String, Vec<String>>> {
    let rows: Vec<(String, String)> =
        sqlx::query_as("SELECT user_id, class_id FROM class_teachers ORDER BY class_id, position")
            .fetch_all(db_pool)
            .await?;

    let mut by_user: HashMap<String, Vec<String>> = HashMap::new();
    for (user_id, class_id) in rows {
        by_user.entry(user_id).or_default().push(class_id);
    }
    Ok(by_user)
}

pub async fn class_ids_for(db_pool: &SqlitePool, user_id: &str) -> AppResult<Vec<String>> {
    let ids = sqlx::query_scalar::<_, String>(
        "SELECT class_id FROM class_teachers WHERE user_id = ?1 ORDER BY class_id",
    )
    .bind(user_id)
    .fetch_all(db_pool)
    .await?;
    Ok(ids)
}

/// Todos os utilizadores, já com as turmas de cada professor.
pub async fn find_all_users(db_pool: &SqlitePool) -> AppResult<Vec<User>> {
    tracing::debug!("Buscando todos os utilizadores...");
    let rows = sqlx::query_as::<_, UserRow>(&format!("SELECT {} FROM users ORDER BY name ASC", USER_COLUMNS))
        .fetch_all(db_pool)
        .await?;
    let mut class_ids = class_ids_by_user(db_pool).await?;

    let users: Vec<User> = rows
        .into_iter()
        .map(|row| {
            let ids = class_ids.remove(&row.id).unwrap_or_default();
            User::from_row(row, ids)
        })
        .collect();
    tracing::debug!("Encontrados {} utilizadores.", users.len());
    Ok(users)
}

pub async fn find_professors(db_pool: &SqlitePool) -> AppResult<Vec<User>> {
    Ok(find_all_users(db_pool)
        .await?
        .into_iter()
        .filter(|u| u.role == Role::Professor)
        .collect())
}

/// Cria um professor (registo próprio ou pela secretaria).
pub async fn create_user(db_pool: &SqlitePool, new_user: &NewUser) -> AppResult<User> {
    let username = required(&new_user.username, "username")?;
    let name = required(&new_user.name, "name")?;
    auth_service::validate_new_password(&new_user.password)?;
    tracing::info!("Tentando criar utilizador: {}", username);

    let password_hash = auth_service::hash_password(&new_user.password).await?;
    let id = new_id();

    let result = sqlx::query(
        r#"
        INSERT INTO users (id, username, password_hash, name, role)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(&id)
    .bind(&username)
    .bind(&password_hash)
    .bind(&name)
    .bind(Role::Professor)
    .execute(db_pool)
    .await;

    if let Err(e) = &result {
        if is_unique_violation(e) {
            tracing::warn!("Falha ao criar user: '{}' já existe.", username);
            return Err(AppError::Conflict(format!("O utilizador '{}' já existe.", username)));
        }
    }
    result?;

    let row = find_user_by_id(db_pool, &id).await?.ok_or(AppError::InternalServerError)?;
    tracing::info!("✅ Utilizador '{}' criado com sucesso.", username);
    Ok(User::from_row(row, Vec::new()))
}

pub async fn update_user_password(db_pool: &SqlitePool, user_id: &str, new_raw_password: &str) -> AppResult<()> {
    tracing::info!("Tentando alterar senha para user: {}", user_id);
    auth_service::validate_new_password(new_raw_password)?;
    let new_password_hash = auth_service::hash_password(new_raw_password).await?;

    let rows_affected = sqlx::query("UPDATE users SET password_hash = ?1 WHERE id = ?2")
        .bind(&new_password_hash)
        .bind(user_id)
        .execute(db_pool)
        .await?
        .rows_affected();

    if rows_affected == 0 {
        tracing::warn!("Falha ao alterar senha: Utilizador '{}' não encontrado.", user_id);
        Err(AppError::NotFound("Utilizador".to_string()))
    } else {
        tracing::info!("✅ Senha alterada com sucesso para user: {}", user_id);
        Ok(())
    }
}

/// Remove o utilizador. O `ON DELETE CASCADE` tira-o das listas de
/// professores; as posições dos restantes não mudam, logo a ordem mantém-se.
/// Devolve as turmas afetadas.
pub async fn delete_user(db_pool: &SqlitePool, user_id: &str) -> AppResult<Vec<String>> {
    let affected_classes = class_ids_for(db_pool, user_id).await?;

    let rows_affected = sqlx::query("DELETE FROM users WHERE id = ?1")
        .bind(user_id)
        .execute(db_pool)
        .await?
        .rows_affected();

    if rows_affected == 0 {
        return Err(AppError::NotFound("Utilizador".to_string()));
    }
    tracing::info!(
        "🗑️ Utilizador '{}' removido ({} turma(s) afetada(s)).",
        user_id,
        affected_classes.len()
    );
    Ok(affected_classes)
}
