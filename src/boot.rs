use log::{error, info, warn};
use std::fs;
use std::path::Path;
use std::process;

use crate::config::{AppConfig, BackendKind};

/// Template directories that will be created if missing
const TEMPLATE_DIRS: &[&str] = &[
    "website/templates",
    "website/templates/admin",
    "website/templates/admin/posts",
    "website/templates/admin/media",
];

/// Admin templates; the panel cannot render without these
const CRITICAL_TEMPLATES: &[&str] = &[
    "website/templates/admin/base.html.tera",
    "website/templates/admin/login.html.tera",
    "website/templates/admin/posts/list.html.tera",
    "website/templates/admin/posts/edit.html.tera",
    "website/templates/admin/media/list.html.tera",
    "website/templates/admin/media/edit.html.tera",
];

/// Directories the configured backend writes into.
fn required_dirs(config: &AppConfig) -> Vec<String> {
    let mut dirs: Vec<String> = TEMPLATE_DIRS.iter().map(|d| d.to_string()).collect();
    if config.backend == BackendKind::Local {
        if let Some(parent) = Path::new(&config.db_path).parent() {
            let parent = parent.to_string_lossy().to_string();
            if !parent.is_empty() {
                dirs.push(parent);
            }
        }
        dirs.push(config.uploads_dir.clone());
    }
    dirs
}

fn check_writable(dir: &str, what: &str) -> bool {
    let path = Path::new(dir);
    if !path.exists() {
        return true;
    }
    let test_file = path.join(".write_test");
    match fs::write(&test_file, "test") {
        Ok(_) => {
            let _ = fs::remove_file(&test_file);
            true
        }
        Err(e) => {
            warn!("  {} directory not writable: {} ({})", what, dir, e);
            false
        }
    }
}

/// Run all boot checks. Call this before Rocket launches.
/// Creates missing directories, warns about missing templates, and
/// aborts if a directory cannot be created.
pub fn run(config: &AppConfig) {
    info!("Basecamp boot check starting ({:?} backend)...", config.backend);

    let mut warnings = 0u32;
    let mut errors = 0u32;

    // ── 1. Directories ─────────────────────────────────
    for dir in required_dirs(config) {
        let path = Path::new(&dir);
        if !path.exists() {
            match fs::create_dir_all(path) {
                Ok(_) => info!("  Created directory: {}", dir),
                Err(e) => {
                    error!("  FAILED to create directory {}: {}", dir, e);
                    errors += 1;
                }
            }
        }
    }

    // ── 2. Admin templates ─────────────────────────────
    for file in CRITICAL_TEMPLATES {
        if !Path::new(file).exists() {
            warn!("  MISSING template: {} (admin pages using it will fail)", file);
            warnings += 1;
        }
    }

    // ── 3. Local storage writable ──────────────────────
    if config.backend == BackendKind::Local {
        if !check_writable(&config.uploads_dir, "Uploads") {
            warnings += 1;
        }
        if let Some(parent) = Path::new(&config.db_path).parent() {
            if !check_writable(&parent.to_string_lossy(), "Database") {
                errors += 1;
            }
        }
        if config.admin_email.trim().is_empty() {
            warn!("  admin_email not set; no admin account will be seeded on an empty database");
            warnings += 1;
        }
    }

    // ── 4. Rocket.toml exists ───────────────────────────
    if !Path::new("Rocket.toml").exists() {
        warn!("  Rocket.toml not found, using defaults and ROCKET_* variables");
        warnings += 1;
    }

    // ── Summary ─────────────────────────────────────────
    if errors > 0 {
        error!(
            "Boot check FAILED: {} error(s), {} warning(s). Aborting.",
            errors, warnings
        );
        process::exit(1);
    }

    if warnings > 0 {
        warn!(
            "Boot check passed with {} warning(s). Some features may not work correctly.",
            warnings
        );
    } else {
        info!("Boot check passed. All systems go.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_backend_needs_db_and_upload_dirs() {
        let config = AppConfig {
            db_path: "data/db/site.db".into(),
            uploads_dir: "data/uploads".into(),
            ..AppConfig::default()
        };
        let dirs = required_dirs(&config);
        assert!(dirs.contains(&"data/db".to_string()));
        assert!(dirs.contains(&"data/uploads".to_string()));
        assert!(dirs.contains(&"website/templates/admin/posts".to_string()));
    }

    #[test]
    fn hosted_backend_only_needs_templates() {
        let config = AppConfig {
            backend: BackendKind::Hosted,
            ..AppConfig::default()
        };
        assert_eq!(required_dirs(&config).len(), TEMPLATE_DIRS.len());
    }
}
