#[macro_use]
extern crate rocket;

use std::path::Path;
use std::process;
use std::sync::Arc;

use log::{error, info};
use rocket::data::{Limits, ToByteUnit};
use rocket::fairing::{Fairing, Info, Kind};
use rocket::figment::Figment;
use rocket::fs::FileServer;
use rocket::http::Header;
use rocket::response::content::RawHtml;
use rocket::response::{Flash, Redirect};
use rocket::{Build, Request, Rocket};
use rocket_dyn_templates::Template;
use serde_json::json;

mod attribution;
mod auth;
mod body;
mod boot;
mod config;
mod db;
mod embed;
mod error;
mod hosted;
mod images;
mod models;
mod posts;
mod rate_limit;
mod render;
mod routes;
mod security;
mod storage;
mod store;
mod tasks;

#[cfg(test)]
mod tests;

use auth::{AuthProvider, SessionRegistry};
use config::{AppConfig, BackendKind};
use rate_limit::RateLimiter;
use storage::ObjectStorage;
use store::Store;

/// The three adapters the routes talk to. Both families are chosen
/// together from `AppConfig::backend`.
pub struct Backends {
    pub store: Arc<dyn Store>,
    pub storage: Arc<dyn ObjectStorage>,
    pub auth: Arc<dyn AuthProvider>,
}

pub fn build_backends(config: &AppConfig) -> Result<Backends, String> {
    match config.backend {
        BackendKind::Local => {
            let pool = db::init_pool_at(&config.db_path)?;
            let store = store::sqlite::SqliteStore::new(pool.clone());
            store
                .run_migrations()
                .map_err(|e| format!("Failed to run database migrations: {}", e))?;
            auth::local::seed_admin(&pool, &config.admin_email, &config.admin_password)?;
            Ok(Backends {
                store: Arc::new(store),
                storage: Arc::new(storage::local::LocalStorage::new(&config.uploads_dir)),
                auth: Arc::new(auth::local::LocalAuth::new(pool, config.session_expiry_hours)),
            })
        }
        BackendKind::Hosted => {
            let client = hosted::HostedClient::new(&config.hosted)?;
            let store = store::hosted::HostedStore::new(client.clone());
            store
                .run_migrations()
                .map_err(|e| format!("Hosted backend is not reachable: {}", e))?;
            Ok(Backends {
                store: Arc::new(store),
                storage: Arc::new(storage::hosted::HostedStorage::new(client.clone(), &config.hosted.bucket)),
                auth: Arc::new(auth::hosted::HostedAuth::new(client)),
            })
        }
    }
}

pub struct NoCacheAdmin;

#[rocket::async_trait]
impl Fairing for NoCacheAdmin {
    fn info(&self) -> Info {
        Info { name: "No-Cache Admin Pages", kind: Kind::Response }
    }

    async fn on_response<'r>(&self, req: &'r rocket::Request<'_>, res: &mut rocket::Response<'r>) {
        let prefix = req
            .rocket()
            .state::<AppConfig>()
            .map(|c| c.admin_base())
            .unwrap_or_else(|| "/admin".to_string());
        if req.uri().path().starts_with(&*prefix) {
            res.set_header(Header::new("Cache-Control", "no-store, no-cache, must-revalidate, max-age=0"));
            res.set_header(Header::new("Pragma", "no-cache"));
        }
    }
}

fn site_name(req: &Request<'_>) -> String {
    req.rocket()
        .state::<AppConfig>()
        .map(|c| c.site_name.clone())
        .unwrap_or_else(|| "Basecamp".to_string())
}

#[catch(404)]
fn not_found(req: &Request<'_>) -> RawHtml<String> {
    RawHtml(render::render_page("404", &json!({ "site_name": site_name(req) })))
}

#[catch(500)]
fn server_error() -> RawHtml<String> {
    RawHtml("<html><body style='font-family:sans-serif;text-align:center;padding:80px'><h1>500</h1><p>Internal server error.</p><a href='/'>← Home</a></body></html>".to_string())
}

/// Admin requests that failed the session guard and matched no fallback.
#[catch(401)]
fn unauthorized(req: &Request<'_>) -> Redirect {
    let base = req
        .rocket()
        .state::<AppConfig>()
        .map(|c| c.admin_base())
        .unwrap_or_else(|| "/admin".to_string());
    Redirect::to(format!("{}/login", base))
}

/// Bodies over the form limits, which never reach a handler. An upload
/// goes back to the media library with the same message the size check uses.
#[catch(413)]
fn payload_too_large(req: &Request<'_>) -> Flash<Redirect> {
    let config = req.rocket().state::<AppConfig>();
    let base = config.map(|c| c.admin_base()).unwrap_or_else(|| "/admin".to_string());
    if req.uri().path().starts_with(&*format!("{}/media", base)) {
        let max_mb = config.map(AppConfig::upload_cap_mb).unwrap_or(images::MAX_UPLOAD_BYTES / (1024 * 1024));
        Flash::error(
            Redirect::to(format!("{}/media", base)),
            format!("File is too large (max {} MB)", max_mb),
        )
    } else {
        Flash::error(Redirect::to(format!("{}/posts", base)), "The form is too large")
    }
}

/// Size the form limits to the upload cap. The file limit carries a MiB of
/// headroom so a slightly oversized file still reaches `validate_upload`.
fn with_upload_limits(figment: Figment, config: &AppConfig) -> Figment {
    let file_mb = config.upload_cap_mb() + 1;
    let limits = Limits::default()
        .limit("file", file_mb.mebibytes())
        .limit("data-form", (file_mb + 1).mebibytes())
        .limit("form", 1.mebibytes());
    figment.merge(("limits", limits))
}

pub fn build_rocket(figment: Figment, config: AppConfig, backends: Backends) -> Rocket<Build> {
    let admin_mount = config.admin_base();
    let admin_api_mount = format!("{}/api", admin_mount);
    info!("Admin panel mounted at: {}", admin_mount);

    let mut rocket = rocket::custom(with_upload_limits(figment, &config))
        .manage(backends.store)
        .manage(backends.storage)
        .manage(backends.auth)
        .manage(SessionRegistry::new())
        .manage(RateLimiter::new())
        .attach(Template::fairing())
        .attach(NoCacheAdmin)
        .attach(tasks::BackgroundTasks)
        .mount("/", routes::public::routes())
        .mount("/api", routes::api::routes())
        .mount(&admin_mount, routes::admin::routes())
        .mount(&admin_mount, routes::auth::routes())
        .mount(&admin_api_mount, routes::admin::api::routes())
        .register("/", catchers![not_found, server_error])
        .register(&admin_mount, catchers![unauthorized, payload_too_large]);

    if config.backend == BackendKind::Local && Path::new(&config.uploads_dir).is_dir() {
        rocket = rocket.mount("/uploads", FileServer::from(&config.uploads_dir));
    }
    if Path::new("website/static").is_dir() {
        rocket = rocket.mount("/static", FileServer::from("website/static"));
    }

    rocket.manage(config)
}

#[launch]
fn rocket() -> _ {
    env_logger::init();

    let figment = rocket::Config::figment();
    let config = match AppConfig::from_figment(&figment) {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            process::exit(1);
        }
    };

    // Boot check: create directories, warn about missing templates
    boot::run(&config);

    // The hosted adapters use blocking HTTP, which must stay off the runtime.
    let built = std::thread::scope(|s| s.spawn(|| build_backends(&config)).join());
    let backends = match built {
        Ok(Ok(backends)) => backends,
        Ok(Err(e)) => {
            error!("Failed to initialize {:?} backend: {}", config.backend, e);
            process::exit(1);
        }
        Err(_) => {
            error!("Backend initialization panicked");
            process::exit(1);
        }
    };

    build_rocket(figment, config, backends)
}
