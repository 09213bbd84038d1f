//! DDL for the loyalty tables. Idempotent: every statement is IF NOT EXISTS.
//! Order follows foreign-key dependencies: customers first, then purchases and pets.

use crate::error::AppError;
use sqlx::PgPool;

const CUSTOMERS: &str = r#"
CREATE TABLE IF NOT EXISTS customers (
    id TEXT PRIMARY KEY,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    gift_type TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

const PURCHASES: &str = r#"
CREATE TABLE IF NOT EXISTS purchases (
    id TEXT PRIMARY KEY,
    customer_id TEXT NOT NULL REFERENCES customers (id) ON DELETE CASCADE,
    purchased_at TIMESTAMPTZ NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

const PETS: &str = r#"
CREATE TABLE IF NOT EXISTS pets (
    id TEXT PRIMARY KEY,
    owner_id TEXT NOT NULL REFERENCES customers (id) ON DELETE CASCADE,
    name VARCHAR(255) NOT NULL CHECK (char_length(name) >= 1),
    species TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

const INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS purchases_customer_date_idx ON purchases (customer_id, purchased_at)",
    "CREATE INDEX IF NOT EXISTS pets_owner_idx ON pets (owner_id)",
];

/// Create the customers, purchases and pets tables and their indexes.
pub async fn apply_migrations(pool: &PgPool) -> Result<(), AppError> {
    for (name, ddl) in [("customers", CUSTOMERS), ("purchases", PURCHASES), ("pets", PETS)] {
        tracing::debug!(table = name, "ensure table");
        sqlx::query(ddl).execute(pool).await?;
    }
    for ddl in INDEXES {
        sqlx::query(ddl).execute(pool).await?;
    }
    tracing::info!("migrations applied");
    Ok(())
}
