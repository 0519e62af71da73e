// Utilitários partilhados pelos testes de integração.
#![allow(dead_code)]

use axum::Router;
use ebd_gestao::{
    db,
    models::{
        class::{Class, StudentPayload},
        user::{NewUser, Role, SessionUser, User},
    },
    services::{auth_service, class_service, settings_service, student_service, user_service},
    state::AppState,
    web::routes::create_router,
};
use sqlx::SqlitePool;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_cookies::{CookieManagerLayer, Key};
use tower_sessions::{MemoryStore, SessionManagerLayer};

pub const SECRETARY_USERNAME: &str = "secretaria";
pub const SECRETARY_PASSWORD: &str = "segredo123";

/// Base em memória, migrada e com as definições iniciais.
pub async fn test_pool() -> SqlitePool {
    auth_service::set_hash_cost(4);
    let pool = db::create_db_pool("sqlite::memory:").await.expect("pool em memória");
    settings_service::ensure_settings(&pool, SECRETARY_USERNAME, SECRETARY_PASSWORD, "Igreja Teste")
        .await
        .expect("definições iniciais");
    pool
}

pub fn test_state(pool: SqlitePool, idle_timeout: Duration) -> AppState {
    AppState::new(pool, Key::from(&[7u8; 64]), idle_timeout)
}

/// Router completo com sessões em memória.
pub fn test_app(pool: SqlitePool) -> Router {
    app_with(test_state(pool, Duration::from_secs(60)), MemoryStore::default())
}

/// Router sobre um estado e uma loja de sessões que o teste também controla.
pub fn app_with(state: AppState, store: MemoryStore) -> Router {
    let session_layer = SessionManagerLayer::new(store).with_secure(false);
    create_router(state).layer(
        ServiceBuilder::new()
            .layer(CookieManagerLayer::new())
            .layer(session_layer),
    )
}

pub async fn secretary(pool: &SqlitePool) -> SessionUser {
    let settings = settings_service::get_settings(pool).await.expect("definições");
    SessionUser {
        id: settings.secretary_id,
        username: settings.username,
        name: settings.secretary_name,
        role: Role::Secretario,
    }
}

pub async fn professor(pool: &SqlitePool, username: &str) -> User {
    user_service::create_user(
        pool,
        &NewUser { username: username.into(), name: format!("Prof. {}", username), password: "senha123".into() },
    )
    .await
    .expect("professor criado")
}

pub fn as_session(user: &User) -> SessionUser {
    SessionUser { id: user.id.clone(), username: user.username.clone(), name: user.name.clone(), role: user.role }
}

pub async fn class_named(pool: &SqlitePool, name: &str, teacher_ids: &[String]) -> Class {
    class_service::create_class(pool, name, None, teacher_ids).await.expect("turma criada")
}

pub async fn enroll(pool: &SqlitePool, class_id: &str, names: &[&str]) -> Vec<String> {
    let mut ids = Vec::new();
    for name in names {
        let (student, _) = student_service::create_student(
            pool,
            class_id,
            &StudentPayload { name: name.to_string(), birthday: None, phone: None },
        )
        .await
        .expect("aluno criado");
        ids.push(student.id);
    }
    ids
}
