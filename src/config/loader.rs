//! Load process config: defaults, then `<config dir>/<env>.json`, then environment variables.

use crate::config::types::{AppConfig, Environment, FileConfig};
use crate::config::validate;
use crate::error::ConfigError;
use secrecy::SecretString;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_CONFIG_DIR: &str = "config";

impl AppConfig {
    /// Load from the process environment (and `.env` if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using `lookup` in place of the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = AppConfig::default();
        if let Some(env) = lookup("APP_ENV") {
            config.env = Environment::from_str(&env)
                .map_err(|reason| ConfigError::Invalid { key: "APP_ENV", reason })?;
        }

        let dir = lookup("CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_DIR));
        if let Some(file) = read_env_file(&dir, config.env)? {
            apply_file(&mut config, file);
        }

        apply_env(&mut config, &lookup)?;
        validate(&config)?;
        Ok(config)
    }
}

/// Missing file is not an error: the process runs on defaults and env vars.
fn read_env_file(dir: &Path, env: Environment) -> Result<Option<FileConfig>, ConfigError> {
    let path = dir.join(format!("{}.json", env.as_str()));
    let shown = path.display().to_string();
    let raw = match std::fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(path = %shown, "config file not found, using defaults and environment");
            return Ok(None);
        }
        Err(source) => return Err(ConfigError::Io { path: shown, source }),
    };
    let file = serde_json::from_str(&raw).map_err(|source| ConfigError::File { path: shown, source })?;
    Ok(Some(file))
}

fn apply_file(config: &mut AppConfig, file: FileConfig) {
    if let Some(host) = file.host {
        config.host = host;
    }
    if let Some(port) = file.port {
        config.port = port;
    }
    if let Some(store) = file.store {
        config.store = store;
    }
    if let Some(seed) = file.seed_file {
        config.seed_file = Some(seed);
    }
    if let Some(db) = file.db {
        if let Some(v) = db.host {
            config.db.host = v;
        }
        if let Some(v) = db.name {
            config.db.name = v;
        }
        if let Some(v) = db.user {
            config.db.user = v;
        }
        if let Some(v) = db.port {
            config.db.port = v;
        }
        if let Some(v) = db.password {
            config.db.password = SecretString::from(v);
        }
        if let Some(v) = db.max_connections {
            config.db.max_connections = v;
        }
    }
}

fn apply_env<F>(config: &mut AppConfig, lookup: &F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup("HOST") {
        config.host = parse("HOST", &v)?;
    }
    if let Some(v) = lookup("PORT") {
        config.port = parse("PORT", &v)?;
    }
    if let Some(v) = lookup("STORE_BACKEND") {
        config.store = parse("STORE_BACKEND", &v)?;
    }
    if let Some(v) = lookup("SEED_FILE") {
        config.seed_file = Some(PathBuf::from(v));
    }
    if let Some(v) = lookup("DB_HOST") {
        config.db.host = v;
    }
    if let Some(v) = lookup("DB_NAME") {
        config.db.name = v;
    }
    if let Some(v) = lookup("DB_USER") {
        config.db.user = v;
    }
    if let Some(v) = lookup("DB_PORT") {
        config.db.port = parse("DB_PORT", &v)?;
    }
    if let Some(v) = lookup("DB_PASSWORD") {
        config.db.password = SecretString::from(v);
    }
    if let Some(v) = lookup("DB_MAX_CONNECTIONS") {
        config.db.max_connections = parse("DB_MAX_CONNECTIONS", &v)?;
    }
    Ok(())
}

fn parse<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::Invalid { key, reason: e.to_string() })
}
