// src/config.rs
use crate::error::{AppError, AppResult};
use std::{env, net::SocketAddr, time::Duration};
use tower_cookies::Key;

/// Configuração lida das variáveis de ambiente (e do `.env`, se existir).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub session_secret: String,
    pub bind_addr: SocketAddr,
    pub secretary_username: String,
    pub secretary_password: String,
    pub church_name: String,
    pub session_inactivity_days: i64,
    pub realtime_idle_timeout: Duration,
    pub bcrypt_cost: u32,
}

impl Config {
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")?;
        let session_secret = env::var("SESSION_SECRET")?;

        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
            .parse::<SocketAddr>()
            .map_err(|e| AppError::ConfigError(format!("BIND_ADDR inválido: {}", e)))?;

        let secretary_username = env::var("SECRETARY_USERNAME").unwrap_or_else(|_| "secretaria".to_string());
        let secretary_password = match env::var("SECRETARY_PASSWORD") {
            Ok(p) => p,
            Err(_) => {
                tracing::warn!("⚠️ SECRETARY_PASSWORD não definida, a usar a senha inicial padrão.");
                "secretaria".to_string()
            }
        };
        let church_name = env::var("CHURCH_NAME").unwrap_or_else(|_| "EBD".to_string());

        Ok(Self {
            database_url,
            session_secret,
            bind_addr,
            secretary_username,
            secretary_password,
            church_name,
            session_inactivity_days: parse_or("SESSION_INACTIVITY_DAYS", 1)?,
            realtime_idle_timeout: Duration::from_secs(parse_or("REALTIME_IDLE_TIMEOUT_SECS", 120)?),
            bcrypt_cost: parse_or("BCRYPT_COST", bcrypt::DEFAULT_COST)?,
        })
    }

    /// Chave dos cookies assinados, derivada de `SESSION_SECRET`.
    pub fn cookie_key(&self) -> AppResult<Key> {
        cookie_key_from_secret(&self.session_secret)
    }
}

pub fn cookie_key_from_secret(secret: &str) -> AppResult<Key> {
    Key::try_from(secret.as_bytes()).map_err(|e| {
        AppError::ConfigError(format!("SESSION_SECRET tem de ter pelo menos 64 bytes: {}", e))
    })
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> AppResult<T> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| AppError::ConfigError(format!("{} inválido: '{}'", key, raw))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_secrets_are_rejected() {
        assert!(cookie_key_from_secret("curta").is_err());
        assert!(cookie_key_from_secret(&"x".repeat(64)).is_ok());
    }
}
