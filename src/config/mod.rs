//! Key-value configuration storage backed by SQLite, and the [`Settings`]
//! resolved from it.
//!
//! Shares a database with [`TokenStorage`](crate::auth::TokenStorage); pass
//! the same path to both. Each setting resolves as: stored value, then its
//! environment variable, then the built-in default.

use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result, anyhow, bail};
use rusqlite::Connection;

use crate::consts::{DEFAULT_BACKEND_URL, DEFAULT_RADIUS_KM, MAX_RARE_RADIUS_KM};

/// A setting users can store with `birdspot config set`.
pub struct SettingDef {
    pub key: &'static str,
    pub env: &'static str,
    pub description: &'static str,
}

pub const BACKEND_URL: &str = "backend_url";
pub const FLICKR_API_KEY: &str = "flickr_api_key";
pub const PEXELS_API_KEY: &str = "pexels_api_key";
pub const RADIUS_KM: &str = "radius_km";

pub const SETTINGS: &[SettingDef] = &[
    SettingDef {
        key: BACKEND_URL,
        env: "BIRDSPOT_BACKEND_URL",
        description: "base URL of the birdspot backend",
    },
    SettingDef {
        key: FLICKR_API_KEY,
        env: "FLICKR_API_KEY",
        description: "enables Flickr photo lookups",
    },
    SettingDef {
        key: PEXELS_API_KEY,
        env: "PEXELS_API_KEY",
        description: "enables Pexels photo lookups",
    },
    SettingDef {
        key: RADIUS_KM,
        env: "BIRDSPOT_RADIUS_KM",
        description: "default rare-birds search radius in km",
    },
];

pub fn setting(key: &str) -> Option<&'static SettingDef> {
    SETTINGS.iter().find(|s| s.key == key)
}

/// Persistent key-value configuration store.
pub struct Config {
    conn: Mutex<Connection>,
}

impl Config {
    /// Open or create the config table in the given database.
    /// Use `":memory:"` for tests.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path).context("failed to open config database")?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS config (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
        )
        .context("failed to create config table")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| anyhow!("config lock poisoned"))
    }

    /// Get a config value by key.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT value FROM config WHERE key = ?1")?;
        let mut rows = stmt.query([key])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    /// Set a config value (upsert). Only known keys are accepted, and the
    /// value must parse for that key.
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        if setting(key).is_none() {
            bail!("unknown setting: {key}");
        }
        let value = value.trim();
        if key == RADIUS_KM {
            parse_radius(value)?;
        }
        if key == BACKEND_URL && !(value.starts_with("http://") || value.starts_with("https://")) {
            bail!("backend_url must start with http:// or https://");
        }
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO config (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            [key, value],
        )?;
        Ok(())
    }

    /// Remove a config key.
    pub fn remove(&self, key: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM config WHERE key = ?1", [key])?;
        Ok(())
    }

    /// All stored pairs, sorted by key.
    pub fn list(&self) -> Result<Vec<(String, String)>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT key, value FROM config ORDER BY key ASC")?;
        let pairs = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(pairs)
    }
}

fn parse_radius(value: &str) -> Result<u32> {
    let radius: u32 = value
        .parse()
        .with_context(|| format!("radius_km must be a whole number, got {value:?}"))?;
    if radius == 0 || radius > MAX_RARE_RADIUS_KM {
        bail!("radius_km must be 1-{MAX_RARE_RADIUS_KM}");
    }
    Ok(radius)
}

/// Effective settings for this run.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub backend_url: String,
    pub flickr_api_key: Option<String>,
    pub pexels_api_key: Option<String>,
    pub radius_km: u32,
}

impl Settings {
    /// Resolve against the stored config and the process environment.
    pub fn load(config: &Config) -> Result<Self> {
        Self::resolve(config, |var| std::env::var(var).ok())
    }

    /// Resolve with an explicit environment lookup.
    pub fn resolve(config: &Config, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let lookup = |key: &str| -> Result<Option<String>> {
            let env_var = setting(key).map(|s| s.env).unwrap_or_default();
            let value = config.get(key)?.or_else(|| env(env_var));
            Ok(value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()))
        };

        let radius_km = match lookup(RADIUS_KM)? {
            Some(raw) => parse_radius(&raw)?,
            None => DEFAULT_RADIUS_KM,
        };

        Ok(Self {
            backend_url: lookup(BACKEND_URL)?.unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string()),
            flickr_api_key: lookup(FLICKR_API_KEY)?,
            pexels_api_key: lookup(PEXELS_API_KEY)?,
            radius_km,
        })
    }
}
