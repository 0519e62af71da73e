// src/state.rs
use crate::{models::announcement::Reply, realtime::RealtimeHub};
use sqlx::SqlitePool;
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::sync::Mutex;
use tower_cookies::Key;

/// Respostas aos avisos, guardadas apenas em memória (perdem-se ao reiniciar).
#[derive(Debug, Clone, Default)]
pub struct ReplyBoard {
    threads: Arc<Mutex<HashMap<String, Vec<Reply>>>>,
}

impl ReplyBoard {
    pub async fn add(&self, reply: Reply) {
        let mut threads = self.threads.lock().await;
        threads.entry(reply.announcement_id.clone()).or_default().push(reply);
    }

    pub async fn list(&self, announcement_id: &str) -> Vec<Reply> {
        let threads = self.threads.lock().await;
        threads.get(announcement_id).cloned().unwrap_or_default()
    }

    /// Apaga a conversa de um aviso removido.
    pub async fn drop_thread(&self, announcement_id: &str) {
        self.threads.lock().await.remove(announcement_id);
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub realtime: RealtimeHub,
    pub replies: ReplyBoard,
    pub cookie_key: Key,
    pub realtime_idle_timeout: Duration,
}

impl AppState {
    pub fn new(db_pool: SqlitePool, cookie_key: Key, realtime_idle_timeout: Duration) -> Self {
        Self {
            db_pool,
            realtime: RealtimeHub::default(),
            replies: ReplyBoard::default(),
            cookie_key,
            realtime_idle_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn reply(announcement: &str, content: &str) -> Reply {
        Reply {
            id: uuid::Uuid::new_v4().to_string(),
            announcement_id: announcement.to_string(),
            author_id: "u1".into(),
            author_name: "Ana".into(),
            content: content.to_string(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn replies_are_grouped_per_announcement() {
        let board = ReplyBoard::default();
        board.add(reply("a1", "primeira")).await;
        board.add(reply("a1", "segunda")).await;
        board.add(reply("a2", "outra")).await;

        let thread = board.list("a1").await;
        assert_eq!(thread.len(), 2);
        assert_eq!(thread[0].content, "primeira");
        assert_eq!(board.list("a2").await.len(), 1);

        board.drop_thread("a1").await;
        assert!(board.list("a1").await.is_empty());
    }
}
