// src/services/announcement_service.rs
use crate::{
    error::{AppError, AppResult},
    models::{
        announcement::{Announcement, AnnouncementPayload, AnnouncementTarget},
        user::SessionUser,
    },
    services::{class_service, new_id, required},
};
use sqlx::SqlitePool;

const ANNOUNCEMENT_COLUMNS: &str = "id, class_id, title, content, author_id, author_name, created_at";

pub async fn find_announcement(db_pool: &SqlitePool, id: &str) -> AppResult<Option<Announcement>> {
    let announcement = sqlx::query_as::<_, Announcement>(&format!(
        "SELECT {} FROM announcements WHERE id = ?1",
        ANNOUNCEMENT_COLUMNS
    ))
    .bind(id)
    .fetch_optional(db_pool)
    .await?;
    Ok(announcement)
}

pub async fn list_all_announcements(db_pool: &SqlitePool) -> AppResult<Vec<Announcement>> {
    let announcements = sqlx::query_as::<_, Announcement>(&format!(
        "SELECT {} FROM announcements ORDER BY created_at DESC, title ASC",
        ANNOUNCEMENT_COLUMNS
    ))
    .fetch_all(db_pool)
    .await?;
    Ok(announcements)
}

/// Avisos das turmas visíveis para o utilizador.
pub async fn list_announcements(db_pool: &SqlitePool, scope: &class_service::ClassScope) -> AppResult<Vec<Announcement>> {
    let visible = class_service::visible_class_ids(db_pool, scope).await?;
    Ok(list_all_announcements(db_pool)
        .await?
        .into_iter()
        .filter(|a| visible.contains(&a.class_id))
        .collect())
}

/// Cria um aviso. "Todas as turmas" vira uma cópia por turma, cada uma com o
/// id da sua turma, gravadas na mesma transação.
pub async fn create_announcement(
    db_pool: &SqlitePool,
    author: &SessionUser,
    payload: &AnnouncementPayload,
) -> AppResult<Vec<Announcement>> {
    let title = required(&payload.title, "title")?;
    let content = required(&payload.content, "content")?;

    let class_ids: Vec<String> = match &payload.target {
        AnnouncementTarget::Class(class_id) => {
            class_service::ensure_class_access(db_pool, author, class_id).await?;
            vec![class_id.clone()]
        }
        AnnouncementTarget::All => {
            if !author.is_secretary() {
                return Err(AppError::Forbidden);
            }
            class_service::list_class_rows(db_pool)
                .await?
                .into_iter()
                .map(|c| c.id)
                .collect()
        }
    };
    if class_ids.is_empty() {
        return Err(AppError::Validation("Não há turmas para receber o aviso.".to_string()));
    }

    let ids: Vec<String> = class_ids.iter().map(|_| new_id()).collect();
    let mut tx = db_pool.begin().await?;
    for (id, class_id) in ids.iter().zip(&class_ids) {
        sqlx::query(
            r#"
            INSERT INTO announcements (id, class_id, title, content, author_id, author_name)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(id)
        .bind(class_id)
        .bind(&title)
        .bind(&content)
        .bind(&author.id)
        .bind(&author.name)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    tracing::info!("📢 Aviso '{}' publicado em {} turma(s).", title, class_ids.len());

    let mut created = Vec::with_capacity(ids.len());
    for id in &ids {
        if let Some(a) = find_announcement(db_pool, id).await? {
            created.push(a);
        }
    }
    Ok(created)
}

pub async fn delete_announcement(db_pool: &SqlitePool, id: &str) -> AppResult<Announcement> {
    let announcement = find_announcement(db_pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Aviso".to_string()))?;
    sqlx::query("DELETE FROM announcements WHERE id = ?1")
        .bind(id)
        .execute(db_pool)
        .await?;
    Ok(announcement)
}
