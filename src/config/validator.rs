//! Config validation: ports, required strings, pool size.

use crate::config::AppConfig;
use crate::error::ConfigError;

pub fn validate(config: &AppConfig) -> Result<(), ConfigError> {
    if config.port == 0 {
        return Err(ConfigError::Invalid {
            key: "port",
            reason: "must be between 1 and 65535".into(),
        });
    }
    if config.db.port == 0 {
        return Err(ConfigError::Invalid {
            key: "db.port",
            reason: "must be between 1 and 65535".into(),
        });
    }
    for (key, value) in [
        ("db.host", &config.db.host),
        ("db.name", &config.db.name),
        ("db.user", &config.db.user),
    ] {
        if value.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key,
                reason: "must not be empty".into(),
            });
        }
    }
    if config.db.max_connections == 0 {
        return Err(ConfigError::Invalid {
            key: "db.max_connections",
            reason: "must be at least 1".into(),
        });
    }
    Ok(())
}
