use std::sync::{Mutex, MutexGuard};

use anyhow::{Result, anyhow};
use rusqlite::Connection;

use super::token::TokenPair;

/// The logged-in account and its current tokens.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Session {
    pub email: String,
    pub tokens: TokenPair,
}

const SESSION_KEY: &str = "session";

/// Keeps the session in SQLite.
///
/// Shares a database with [`Config`](crate::config::Config); pass the same
/// path to both.
pub struct TokenStorage {
    conn: Mutex<Connection>,
}

impl TokenStorage {
    /// Open or create the credentials table in the given database path.
    /// Use `":memory:"` for tests.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS credentials (
                name TEXT PRIMARY KEY,
                data TEXT NOT NULL
            )",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn in_memory() -> Result<Self> {
        Self::open(":memory:")
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("credential store lock poisoned"))
    }

    /// The stored session, if anyone is logged in.
    pub fn get(&self) -> Result<Option<Session>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT data FROM credentials WHERE name = ?1")?;
        let mut rows = stmt.query([SESSION_KEY])?;
        match rows.next()? {
            Some(row) => {
                let json: String = row.get(0)?;
                Ok(Some(serde_json::from_str(&json)?))
            }
            None => Ok(None),
        }
    }

    /// Store the session (upsert).
    pub fn set(&self, session: &Session) -> Result<()> {
        let json = serde_json::to_string(session)?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO credentials (name, data) VALUES (?1, ?2)
             ON CONFLICT(name) DO UPDATE SET data = excluded.data",
            [SESSION_KEY, json.as_str()],
        )?;
        Ok(())
    }

    /// Replace only the tokens of the stored session, keeping the email.
    pub fn update_tokens(&self, tokens: TokenPair) -> Result<()> {
        let Some(mut session) = self.get()? else {
            return Err(anyhow!("no session to update"));
        };
        session.tokens = tokens;
        self.set(&session)
    }

    /// Forget the session. Returns whether one was stored.
    pub fn clear(&self) -> Result<bool> {
        let conn = self.conn()?;
        let removed = conn.execute("DELETE FROM credentials WHERE name = ?1", [SESSION_KEY])?;
        Ok(removed > 0)
    }
}
