// src/services/message_service.rs
use crate::{
    error::{AppError, AppResult},
    models::{
        message::{Message, MessagePayload},
        user::{Role, SessionUser},
    },
    services::{new_id, optional, required, user_service},
};
use sqlx::SqlitePool;

const MESSAGE_COLUMNS: &str = "id, sender_id, sender_name, sender_role, recipient_id, is_broadcast, content, created_at";

pub async fn find_message(db_pool: &SqlitePool, id: &str) -> AppResult<Option<Message>> {
    let message = sqlx::query_as::<_, Message>(&format!("SELECT {} FROM messages WHERE id = ?1", MESSAGE_COLUMNS))
        .bind(id)
        .fetch_optional(db_pool)
        .await?;
    Ok(message)
}

/// Recados que o utilizador pode ler, do mais antigo para o mais recente.
pub async fn list_messages_for(db_pool: &SqlitePool, user: &SessionUser) -> AppResult<Vec<Message>> {
    let messages = sqlx::query_as::<_, Message>(&format!(
        "SELECT {} FROM messages ORDER BY created_at ASC, rowid ASC",
        MESSAGE_COLUMNS
    ))
    .fetch_all(db_pool)
    .await?;

    Ok(messages
        .into_iter()
        .filter(|m| m.is_visible_to(&user.id, user.role))
        .collect())
}

/// Envia um recado. Professores falam sempre com a secretaria; a secretaria
/// responde a um professor ou escreve para todos.
pub async fn send_message(db_pool: &SqlitePool, sender: &SessionUser, payload: &MessagePayload) -> AppResult<Message> {
    let content = required(&payload.content, "content")?;

    let (recipient_id, is_broadcast) = match sender.role {
        Role::Professor => {
            if payload.broadcast {
                return Err(AppError::Forbidden);
            }
            (None, false)
        }
        Role::Secretario if payload.broadcast => (None, true),
        Role::Secretario => {
            let recipient = optional(payload.recipient_id.as_deref())
                .ok_or_else(|| AppError::Validation("Indique o professor destinatário.".to_string()))?;
            match user_service::find_user_by_id(db_pool, &recipient).await? {
                Some(user) if user.role == Role::Professor => (Some(recipient), false),
                _ => return Err(AppError::NotFound("Professor".to_string())),
            }
        }
    };

    let id = new_id();
    sqlx::query(
        r#"
        INSERT INTO messages (id, sender_id, sender_name, sender_role, recipient_id, is_broadcast, content)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&id)
    .bind(&sender.id)
    .bind(&sender.name)
    .bind(sender.role)
    .bind(&recipient_id)
    .bind(is_broadcast)
    .bind(&content)
    .execute(db_pool)
    .await?;
    tracing::debug!("✉️ Recado {} enviado por {}", id, sender.id);

    find_message(db_pool, &id).await?.ok_or(AppError::InternalServerError)
}
