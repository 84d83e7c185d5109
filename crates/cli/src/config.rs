use std::path::PathBuf;

use anyhow::Context;

/// Log output format for the tracing subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    fn from_env_value(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => anyhow::bail!("LOG_FORMAT must be 'text' or 'json', got '{other}'"),
        }
    }
}

/// Runner configuration loaded from environment variables.
///
/// Command-line flags override these values.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Postgres connection string. Only required by commands that touch the database.
    pub database_url: Option<String>,
    /// Rule document path (default: `rules.json`).
    pub rules_path: PathBuf,
    /// Actor recorded on every write and audit entry (default: `extprop`).
    pub actor: String,
    /// Pool size (default: `10`).
    pub max_connections: u32,
    pub log_format: LogFormat,
}

impl RunnerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var              | Default      |
    /// |----------------------|--------------|
    /// | `DATABASE_URL`       | (unset)      |
    /// | `EXTPROP_RULES_PATH` | `rules.json` |
    /// | `EXTPROP_ACTOR`      | `extprop`    |
    /// | `DB_MAX_CONNECTIONS` | `10`         |
    /// | `LOG_FORMAT`         | `text`       |
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let database_url = lookup("DATABASE_URL").filter(|s| !s.trim().is_empty());

        let rules_path = lookup("EXTPROP_RULES_PATH")
            .unwrap_or_else(|| "rules.json".into())
            .into();

        let actor = lookup("EXTPROP_ACTOR").unwrap_or_else(|| "extprop".into());

        let max_connections: u32 = lookup("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|| "10".into())
            .parse()
            .context("DB_MAX_CONNECTIONS must be a valid u32")?;

        let log_format = LogFormat::from_env_value(&lookup("LOG_FORMAT").unwrap_or_default())?;

        Ok(Self {
            database_url,
            rules_path,
            actor,
            max_connections,
            log_format,
        })
    }

    pub fn require_database_url(&self) -> anyhow::Result<&str> {
        self.database_url
            .as_deref()
            .context("DATABASE_URL must be set for this command (or pass --entities for an offline run)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> anyhow::Result<RunnerConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        RunnerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = load(&[]).unwrap();
        assert_eq!(config.rules_path, PathBuf::from("rules.json"));
        assert_eq!(config.actor, "extprop");
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.log_format, LogFormat::Text);
        assert!(config.require_database_url().is_err());
    }

    #[test]
    fn env_values_override_defaults() {
        let config = load(&[
            ("DATABASE_URL", "postgres://localhost/extprop"),
            ("EXTPROP_ACTOR", "nightly"),
            ("DB_MAX_CONNECTIONS", "4"),
            ("LOG_FORMAT", "JSON"),
        ])
        .unwrap();
        assert_eq!(config.require_database_url().unwrap(), "postgres://localhost/extprop");
        assert_eq!(config.actor, "nightly");
        assert_eq!(config.max_connections, 4);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn invalid_numbers_are_rejected() {
        assert!(load(&[("DB_MAX_CONNECTIONS", "many")]).is_err());
        assert!(load(&[("LOG_FORMAT", "xml")]).is_err());
    }
}
