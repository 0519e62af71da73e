// src/models/announcement.rs
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Announcement {
    pub id: String,
    pub class_id: String,
    pub title: String,
    pub content: String,
    pub author_id: String,
    pub author_name: String,
    pub created_at: Option<NaiveDateTime>,
}

/// Destino de um aviso: uma turma ou todas (uma cópia por turma).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "scope", content = "class_id", rename_all = "lowercase")]
pub enum AnnouncementTarget {
    Class(String),
    All,
}

#[derive(Debug, Deserialize)]
pub struct AnnouncementPayload {
    pub title: String,
    pub content: String,
    pub target: AnnouncementTarget,
}

/// Resposta a um aviso. Só existe em memória.
#[derive(Debug, Clone, Serialize)]
pub struct Reply {
    pub id: String,
    pub announcement_id: String,
    pub author_id: String,
    pub author_name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct ReplyPayload {
    pub content: String,
}
