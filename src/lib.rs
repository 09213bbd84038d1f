//! Pet-store customer loyalty backend: gift eligibility over customers, purchases and pets.

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod migration;
pub mod model;
pub mod response;
pub mod routes;
pub mod service;
pub mod state;
pub mod store;

pub use config::{AppConfig, DbConfig, Environment, StoreBackend};
pub use error::{AppError, ConfigError, StoreError};
pub use migration::apply_migrations;
pub use routes::{app, common_routes, customer_routes};
pub use service::{GiftOutcome, GiftService};
pub use state::AppState;
pub use store::{ensure_database_exists, InMemoryStore, PgStore, Seed, Stores};
