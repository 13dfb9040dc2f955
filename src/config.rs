use rocket::figment::Figment;
use serde::{Deserialize, Serialize};

/// Which family of backend adapters to wire up at launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// SQLite database, files under `uploads_dir`, bcrypt users table.
    #[default]
    Local,
    /// Managed Postgres REST + object storage + auth service.
    Hosted,
}

/// Application settings, read from `Rocket.toml` / `ROCKET_*` env vars
/// alongside Rocket's own keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub backend: BackendKind,
    pub db_path: String,
    pub uploads_dir: String,
    pub admin_slug: String,
    pub site_name: String,
    pub max_upload_mb: u64,
    /// First-run admin account for the local backend.
    pub admin_email: String,
    pub admin_password: String,
    pub login_rate_limit: u64,
    pub session_expiry_hours: i64,
    /// Mark the session cookie `Secure`. Turn on when served over HTTPS.
    pub secure_cookies: bool,
    pub hosted: HostedConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostedConfig {
    pub url: String,
    pub anon_key: String,
    pub bucket: String,
    pub timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            backend: BackendKind::Local,
            db_path: "website/db/basecamp.db".to_string(),
            uploads_dir: "website/uploads".to_string(),
            admin_slug: "admin".to_string(),
            site_name: "Basecamp".to_string(),
            max_upload_mb: 50,
            admin_email: String::new(),
            admin_password: String::new(),
            login_rate_limit: 5,
            session_expiry_hours: 24,
            secure_cookies: false,
            hosted: HostedConfig::default(),
        }
    }
}

impl Default for HostedConfig {
    fn default() -> Self {
        HostedConfig {
            url: String::new(),
            anon_key: String::new(),
            bucket: "images".to_string(),
            timeout_secs: 15,
        }
    }
}

impl AppConfig {
    pub fn from_figment(figment: &Figment) -> Result<Self, String> {
        let config: AppConfig = figment.extract().map_err(|e| e.to_string())?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.admin_slug.trim_matches('/').is_empty() {
            return Err("admin_slug must not be empty".into());
        }
        if self.max_upload_mb == 0 {
            return Err("max_upload_mb must be at least 1".into());
        }
        if self.backend == BackendKind::Hosted {
            if self.hosted.url.is_empty() || self.hosted.anon_key.is_empty() {
                return Err("hosted backend needs hosted.url and hosted.anon_key".into());
            }
            url::Url::parse(&self.hosted.url)
                .map_err(|e| format!("hosted.url is not a valid URL: {}", e))?;
        }
        Ok(())
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_mb * 1024 * 1024
    }

    /// Effective upload cap in MiB; storage never takes more than 50.
    pub fn upload_cap_mb(&self) -> u64 {
        self.max_upload_mb.min(crate::images::MAX_UPLOAD_BYTES / (1024 * 1024))
    }

    pub fn admin_base(&self) -> String {
        format!("/{}", self.admin_slug.trim_matches('/'))
    }
}
