use chrono::{Duration, Utc};
use log::info;

use crate::db::DbPool;
use crate::models::user::User;
use crate::security::auth::{hash_password, verify_password};

use super::{AuthProvider, Session};

/// Users table + bcrypt, for the local backend.
pub struct LocalAuth {
    pool: DbPool,
    session_hours: i64,
}

impl LocalAuth {
    pub fn new(pool: DbPool, session_hours: i64) -> Self {
        LocalAuth {
            pool,
            session_hours: session_hours.max(1),
        }
    }
}

/// Create the first admin from configuration when the users table is empty.
pub fn seed_admin(pool: &DbPool, email: &str, password: &str) -> Result<bool, String> {
    if User::count(pool) > 0 || email.trim().is_empty() || password.is_empty() {
        return Ok(false);
    }
    let hash = hash_password(password)?;
    User::create(pool, email, &hash, None)?;
    info!("Created admin account {}", email.trim());
    Ok(true)
}

impl AuthProvider for LocalAuth {
    fn sign_in(&self, email: &str, password: &str) -> Result<Option<Session>, String> {
        let user = match User::get_by_email(&self.pool, email) {
            Some(u) => u,
            None => return Ok(None),
        };
        if !verify_password(password, &user.password_hash) {
            return Ok(None);
        }
        Ok(Some(Session {
            user_id: user.id,
            email: user.email,
            display_name: user.display_name,
            access_token: None,
            expires_at: Utc::now() + Duration::hours(self.session_hours),
        }))
    }

    fn sign_out(&self, _session: &Session) -> Result<(), String> {
        Ok(())
    }
}
