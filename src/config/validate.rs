use anyhow::{Result, bail};

use super::{AppConfig, defaults};

pub fn validate(cfg: &AppConfig) -> Result<()> {
    let mut errors: Vec<String> = Vec::new();

    if cfg.general.host.trim().is_empty() {
        errors.push("general.host must not be empty".to_string());
    }

    if let Some(database) = cfg.database.as_ref() {
        if database.url.trim().is_empty() {
            errors.push("database.url must not be empty".to_string());
        }

        if database.max_connections == 0 {
            errors.push("database.max_connections must be > 0".to_string());
        }

        if database.min_idle > database.max_connections {
            errors.push(format!(
                "database.min_idle ({}) must be <= database.max_connections ({})",
                database.min_idle, database.max_connections
            ));
        }
    }

    if let Some(auth) = cfg.auth.as_ref() {
        if auth.jwt_secret.trim().is_empty() {
            errors.push("auth.jwt_secret must not be empty".to_string());
        }

        if let Some(email) = auth.super_admin_email.as_deref() {
            if !email.contains('@') {
                errors.push(format!(
                    "auth.super_admin_email must be an email address (got '{email}')"
                ));
            }
        }
    }

    if cfg.directory.search_min_chars == 0 {
        errors.push("directory.search_min_chars must be > 0".to_string());
    }

    if cfg.directory.search_limit == 0 || cfg.directory.search_limit > defaults::MAX_SEARCH_LIMIT {
        errors.push(format!(
            "directory.search_limit must be between 1 and {}",
            defaults::MAX_SEARCH_LIMIT
        ));
    }

    if errors.is_empty() {
        return Ok(());
    }

    bail!("invalid app config:\n- {}", errors.join("\n- "))
}

#[cfg(test)]
mod tests {
    use crate::config::{AppConfig, AuthConfig, DatabaseConfig};

    use super::validate;

    fn valid_config() -> AppConfig {
        AppConfig {
            database: Some(DatabaseConfig {
                url: "sqlite::memory:".to_string(),
                max_connections: 4,
                min_idle: 1,
            }),
            auth: Some(AuthConfig {
                jwt_secret: "secret".to_string(),
                leeway_secs: 0,
                super_admin_email: Some("owner@example.com".to_string()),
            }),
            ..AppConfig::default()
        }
    }

    #[test]
    fn accepts_default_sections_with_database_and_auth() {
        validate(&valid_config()).expect("config should validate");
    }

    #[test]
    fn collects_every_problem_into_one_error() {
        let mut cfg = valid_config();
        cfg.general.host = "  ".to_string();
        if let Some(db) = cfg.database.as_mut() {
            db.min_idle = 9;
        }
        cfg.directory.search_limit = 0;

        let message = validate(&cfg).expect_err("config should fail").to_string();

        assert!(message.contains("general.host must not be empty"));
        assert!(message.contains("database.min_idle (9) must be <= database.max_connections (4)"));
        assert!(message.contains("directory.search_limit must be between 1 and 100"));
    }

    #[test]
    fn rejects_blank_secret_and_malformed_bootstrap_email() {
        let mut cfg = valid_config();
        cfg.auth = Some(AuthConfig {
            jwt_secret: String::new(),
            leeway_secs: 0,
            super_admin_email: Some("owner".to_string()),
        });

        let message = validate(&cfg).expect_err("config should fail").to_string();

        assert!(message.contains("auth.jwt_secret must not be empty"));
        assert!(message.contains("auth.super_admin_email must be an email address"));
    }
}
