//! Process configuration types: defaults, the JSON overlay file shape, and the resolved config.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sqlx::postgres::PgConnectOptions;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

/// Application environment. Selects which `config/<env>.json` overlay is read.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Production,
    Build,
    #[default]
    Development,
    Test,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Production => "production",
            Environment::Build => "build",
            Environment::Development => "development",
            Environment::Test => "test",
        }
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "production" => Ok(Environment::Production),
            "build" => Ok(Environment::Build),
            "development" => Ok(Environment::Development),
            "test" => Ok(Environment::Test),
            other => Err(format!(
                "{} (expected production, build, development or test)",
                other
            )),
        }
    }
}

/// Which store implementation backs the API.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Postgres,
    /// Process-local store; data is lost on restart.
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "postgres" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(format!("{} (expected postgres or memory)", other)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct DbConfig {
    pub host: String,
    pub name: String,
    pub user: String,
    pub port: u16,
    pub password: SecretString,
    pub max_connections: u32,
}

impl Default for DbConfig {
    fn default() -> Self {
        DbConfig {
            host: "127.0.0.1".into(),
            name: "pet_loyalty".into(),
            user: "postgres".into(),
            port: 5432,
            password: SecretString::from("password".to_string()),
            max_connections: 5,
        }
    }
}

impl DbConfig {
    /// Connection options for the configured database.
    pub fn connect_options(&self) -> PgConnectOptions {
        self.server_options().database(&self.name)
    }

    /// Connection options for the server's maintenance database (`postgres`).
    pub fn admin_connect_options(&self) -> PgConnectOptions {
        self.server_options().database("postgres")
    }

    fn server_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(self.password.expose_secret())
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub env: Environment,
    pub host: IpAddr,
    pub port: u16,
    pub store: StoreBackend,
    /// JSON seed loaded into the memory backend at startup.
    pub seed_file: Option<PathBuf>,
    pub db: DbConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            env: Environment::default(),
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8080,
            store: StoreBackend::default(),
            seed_file: None,
            db: DbConfig::default(),
        }
    }
}

/// Shape of `config/<env>.json`. Every key is optional; unknown keys are rejected.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub host: Option<IpAddr>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub store: Option<StoreBackend>,
    #[serde(default)]
    pub seed_file: Option<PathBuf>,
    #[serde(default)]
    pub db: Option<FileDbConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileDbConfig {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub max_connections: Option<u32>,
}
