use crate::security::{self, SecurityError};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use thiserror::Error;
use tracing::warn;

pub const DEFAULT_ADMIN_USERNAME: &str = "admin";
pub const DEFAULT_ADMIN_PASSWORD: &str = "changeme";
pub const DEFAULT_SECRET: &str = "replace-this-in-production";
pub const DEFAULT_SESSION_MAX_AGE: i64 = 7 * 24 * 60 * 60;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
    #[error("ADMIN_PASSWORD_HASH: {0}")]
    PasswordHash(#[from] SecurityError),
}

/// Process-wide settings, read once at startup and shared read-only.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub admin_username: String,
    pub admin_password_hash: String,
    pub session_secret: String,
    pub session_max_age: i64,
    pub database_path: PathBuf,
    pub static_dir: PathBuf,
    pub upload_dir: PathBuf,
    pub assets_dir: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable source. Unset and empty
    /// variables fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let host = var("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let host: IpAddr = host.parse().map_err(|_| ConfigError::Invalid {
            name: "HOST",
            value: host.clone(),
        })?;
        let port = match var("PORT") {
            Some(p) => p.parse::<u16>().map_err(|_| ConfigError::Invalid {
                name: "PORT",
                value: p.clone(),
            })?,
            None => 5000,
        };

        let session_max_age = match var("SESSION_MAX_AGE_SECS") {
            Some(v) => v
                .parse::<i64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or(ConfigError::Invalid {
                    name: "SESSION_MAX_AGE_SECS",
                    value: v.clone(),
                })?,
            None => DEFAULT_SESSION_MAX_AGE,
        };

        let admin_password_hash = match var("ADMIN_PASSWORD_HASH") {
            Some(hash) => {
                security::validate_hash(&hash)?;
                hash
            }
            None => {
                let password = var("ADMIN_PASSWORD").unwrap_or_else(|| {
                    warn!("ADMIN_PASSWORD not set, using the default password");
                    DEFAULT_ADMIN_PASSWORD.to_string()
                });
                security::hash_password(&password)?
            }
        };

        let session_secret = var("SECRET_KEY").unwrap_or_else(|| {
            warn!("SECRET_KEY not set, sessions are signed with the default secret");
            DEFAULT_SECRET.to_string()
        });

        let static_dir = PathBuf::from(var("STATIC_DIR").unwrap_or_else(|| "static".into()));
        let upload_dir = var("UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| static_dir.join("uploads"));

        Ok(AppConfig {
            bind_addr: SocketAddr::new(host, port),
            admin_username: var("ADMIN_USERNAME")
                .unwrap_or_else(|| DEFAULT_ADMIN_USERNAME.to_string()),
            admin_password_hash,
            session_secret,
            session_max_age,
            database_path: PathBuf::from(var("DATABASE_PATH").unwrap_or_else(|| "blog.db".into())),
            static_dir,
            upload_dir,
            assets_dir: PathBuf::from(var("ASSETS_DIR").unwrap_or_else(|| "assets".into())),
        })
    }
}
