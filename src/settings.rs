//! Process settings from the environment (`.env` honored), logging setup and store selection.

use crate::config::{load_declarations, EntityDeclaration, ResolvedModel};
use crate::error::{AppError, ConfigError};
use crate::store::{MemoryStore, PgStore, RowStore};
use sqlx::postgres::PgPoolOptions;
use std::path::PathBuf;
use std::sync::Arc;

pub const DEFAULT_BIND: &str = "127.0.0.1:3000";
pub const DEFAULT_SCHEMA: &str = "public";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    /// Postgres connection string; rows live in memory when unset.
    pub database_url: Option<String>,
    pub schema: String,
    /// JSON declarations file; the caller supplies its own declarations when unset.
    pub declarations: Option<PathBuf>,
    pub bind: String,
    pub seed_on_start: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            database_url: None,
            schema: DEFAULT_SCHEMA.into(),
            declarations: None,
            bind: DEFAULT_BIND.into(),
            seed_on_start: false,
        }
    }
}

impl Settings {
    /// Reads `.env` first, if present; real environment variables win.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let seed_on_start = match get("ENGINE_SEED_ON_START") {
            None => false,
            Some(v) => parse_bool(&v)
                .ok_or_else(|| ConfigError::Load(format!("ENGINE_SEED_ON_START: expected a boolean, got '{}'", v)))?,
        };
        let defaults = Settings::default();
        Ok(Settings {
            database_url: get("DATABASE_URL"),
            schema: get("ENGINE_SCHEMA").unwrap_or(defaults.schema),
            declarations: get("ENGINE_DECLARATIONS").map(PathBuf::from),
            bind: get("ENGINE_BIND").unwrap_or(defaults.bind),
            seed_on_start,
        })
    }

    /// Declarations from `ENGINE_DECLARATIONS`, if set.
    pub fn load_declarations(&self) -> Result<Option<Vec<EntityDeclaration>>, ConfigError> {
        self.declarations.as_ref().map(load_declarations).transpose()
    }

    /// Postgres when a database url is configured (tables created if missing), else in-memory.
    pub async fn open_store(&self, model: &ResolvedModel) -> Result<Arc<dyn RowStore>, AppError> {
        let Some(url) = &self.database_url else {
            tracing::info!("DATABASE_URL not set; using in-memory store");
            return Ok(Arc::new(MemoryStore::new()));
        };
        let pool = PgPoolOptions::new().max_connections(5).connect(url).await?;
        let store = PgStore::new(pool, self.schema.clone());
        store.ensure_tables(model).await?;
        tracing::info!(schema = %self.schema, entities = model.len(), "postgres store ready");
        Ok(Arc::new(store))
    }
}

/// Install the `fmt` subscriber. `RUST_LOG` overrides `default_filter`.
pub fn init_tracing(default_filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(pairs: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let env: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Settings::from_lookup(|k| env.get(k).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        assert_eq!(settings(&[]).unwrap(), Settings::default());
        assert_eq!(settings(&[("DATABASE_URL", "  ")]).unwrap().database_url, None);
    }

    #[test]
    fn reads_overrides() {
        let s = settings(&[
            ("DATABASE_URL", "postgres://localhost/engine"),
            ("ENGINE_SCHEMA", "demo"),
            ("ENGINE_DECLARATIONS", "entities.json"),
            ("ENGINE_BIND", "0.0.0.0:8080"),
            ("ENGINE_SEED_ON_START", "yes"),
        ])
        .unwrap();
        assert_eq!(s.database_url.as_deref(), Some("postgres://localhost/engine"));
        assert_eq!(s.schema, "demo");
        assert_eq!(s.declarations, Some(PathBuf::from("entities.json")));
        assert_eq!(s.bind, "0.0.0.0:8080");
        assert!(s.seed_on_start);
    }

    #[test]
    fn rejects_bad_bool() {
        assert!(matches!(settings(&[("ENGINE_SEED_ON_START", "maybe")]), Err(ConfigError::Load(_))));
    }
}
