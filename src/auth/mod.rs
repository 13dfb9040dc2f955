use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod hosted;
pub mod local;
pub mod session;

pub use session::SessionRegistry;

/// A signed-in admin. Created by an [`AuthProvider`], held by the
/// [`SessionRegistry`], handed to every write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub email: String,
    pub display_name: Option<String>,
    /// Bearer token for the hosted backend. `None` locally.
    pub access_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }

    /// Display name, falling back to the email address.
    pub fn name(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.email)
    }

    #[cfg(test)]
    pub fn for_tests() -> Session {
        Session {
            user_id: "user-test".into(),
            email: "kate@example.com".into(),
            display_name: Some("Kate".into()),
            access_token: None,
            expires_at: Utc::now() + chrono::Duration::hours(1),
        }
    }
}

/// Email/password sign-in against whichever backend is configured.
pub trait AuthProvider: Send + Sync {
    /// `Ok(None)` for wrong credentials; `Err` when the backend itself failed.
    fn sign_in(&self, email: &str, password: &str) -> Result<Option<Session>, String>;

    /// Revoke the session with the backend, where that means anything.
    fn sign_out(&self, session: &Session) -> Result<(), String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_falls_back_to_email() {
        let mut session = Session::for_tests();
        assert_eq!(session.name(), "Kate");
        session.display_name = Some(" ".into());
        assert_eq!(session.name(), "kate@example.com");
        session.display_name = None;
        assert_eq!(session.name(), "kate@example.com");
    }

    #[test]
    fn expiry() {
        let mut session = Session::for_tests();
        assert!(!session.is_expired());
        session.expires_at = Utc::now() - chrono::Duration::seconds(1);
        assert!(session.is_expired());
    }
}
