// src/models/user.rs
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Papel de quem está autenticado.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    Professor,
    Secretario,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Professor => "professor",
            Role::Secretario => "secretario",
        }
    }
}

// Representa uma linha da tabela 'users'
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: String,
    pub username: String,
    pub password_hash: String,
    pub name: String,
    pub role: Role,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

/// Utilizador como é devolvido pela API (sem o hash).
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub name: String,
    pub role: Role,
    /// Turmas onde o professor leciona (vazio para a secretaria).
    pub class_ids: Vec<String>,
    pub created_at: Option<NaiveDateTime>,
}

impl User {
    pub fn from_row(row: UserRow, class_ids: Vec<String>) -> Self {
        Self {
            id: row.id,
            username: row.username,
            name: row.name,
            role: row.role,
            class_ids,
            created_at: row.created_at,
        }
    }
}

/// Identidade guardada na sessão e injetada nos handlers pelo middleware.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: String,
    pub username: String,
    pub name: String,
    pub role: Role,
}

impl SessionUser {
    pub fn is_secretary(&self) -> bool {
        self.role == Role::Secretario
    }
}

/// Linha única de 'system_settings'.
#[derive(Debug, Clone, FromRow)]
pub struct SystemSettings {
    pub secretary_id: String,
    pub secretary_name: String,
    pub username: String,
    pub password_hash: String,
    pub church_name: String,
    pub updated_at: Option<NaiveDateTime>,
}

/// Vista pública das definições.
#[derive(Debug, Clone, Serialize)]
pub struct SettingsView {
    pub secretary_id: String,
    pub secretary_name: String,
    pub username: String,
    pub church_name: String,
}

impl From<SystemSettings> for SettingsView {
    fn from(s: SystemSettings) -> Self {
        Self {
            secretary_id: s.secretary_id,
            secretary_name: s.secretary_name,
            username: s.username,
            church_name: s.church_name,
        }
    }
}

// Struct para dados do formulário de login
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub name: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct PasswordReset {
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct SettingsUpdate {
    pub secretary_name: Option<String>,
    pub username: Option<String>,
    pub new_password: Option<String>,
    pub church_name: Option<String>,
}
