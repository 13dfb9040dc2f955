use rocket::response::Redirect;
use rocket::State;

use crate::config::AppConfig;
use crate::security::auth::AdminSession;

pub mod api;
pub mod media;
pub mod posts;

pub fn routes() -> Vec<rocket::Route> {
    let mut routes = routes![dashboard];
    routes.extend(posts::routes());
    routes.extend(media::routes());
    routes
}

/// Helper: the admin base path from managed config
pub(crate) fn admin_base(config: &AppConfig) -> String {
    config.admin_base()
}

/// The post list is the admin landing page.
#[get("/")]
pub fn dashboard(_admin: AdminSession, config: &State<AppConfig>) -> Redirect {
    Redirect::to(format!("{}/posts", admin_base(config)))
}
