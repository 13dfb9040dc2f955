use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::db::DbPool;

/// Admin account for the local backend.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct User {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub display_name: Option<String>,
    pub created_at: String,
}

impl User {
    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(User {
            id: row.get(0)?,
            email: row.get(1)?,
            password_hash: row.get(2)?,
            display_name: row.get(3)?,
            created_at: row.get(4)?,
        })
    }

    const SELECT_COLS: &'static str = "id, email, password_hash, display_name, created_at";

    pub fn get_by_email(pool: &DbPool, email: &str) -> Option<User> {
        let conn = pool.get().ok()?;
        conn.query_row(
            &format!(
                "SELECT {} FROM users WHERE email = ?1 COLLATE NOCASE",
                Self::SELECT_COLS
            ),
            params![email.trim()],
            Self::from_row,
        )
        .optional()
        .ok()
        .flatten()
    }

    pub fn count(pool: &DbPool) -> i64 {
        let conn = match pool.get() {
            Ok(c) => c,
            Err(_) => return 0,
        };
        conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .unwrap_or(0)
    }

    pub fn create(
        pool: &DbPool,
        email: &str,
        password_hash: &str,
        display_name: Option<&str>,
    ) -> Result<String, String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        let id = uuid::Uuid::new_v4().to_string();
        conn.execute(
            "INSERT INTO users (id, email, password_hash, display_name) VALUES (?1, ?2, ?3, ?4)",
            params![id, email.trim(), password_hash, display_name],
        )
        .map_err(|e| e.to_string())?;
        Ok(id)
    }
}
