use std::sync::Arc;

use log::error;
use rocket::http::Status;
use rocket::response::content::RawHtml;
use rocket::State;
use serde_json::json;

use super::blocking;
use crate::attribution;
use crate::body;
use crate::config::AppConfig;
use crate::error::AppError;
use crate::models::post::Category;
use crate::posts;
use crate::render;
use crate::storage::ObjectStorage;
use crate::store::Store;

pub fn routes() -> Vec<rocket::Route> {
    routes![post_list, post_detail]
}

fn to_status(err: AppError) -> Status {
    if let AppError::Backend { .. } = err {
        error!("{}", err);
    }
    err.status()
}

/// Home page. An unknown `category` shows every post.
#[get("/?<category>")]
pub async fn post_list(
    store: &State<Arc<dyn Store>>,
    config: &State<AppConfig>,
    category: Option<String>,
) -> Result<RawHtml<String>, Status> {
    let active = category.as_deref().and_then(|c| c.parse::<Category>().ok());
    let store = Arc::clone(store.inner());
    let posts = blocking(move || posts::list(store.as_ref(), active))
        .await
        .map_err(to_status)?;

    let context = json!({
        "site_name": config.site_name,
        "active_category": active.map(|c| c.as_str()),
        "posts": posts,
    });
    Ok(RawHtml(render::render_page("post_list", &context)))
}

#[get("/posts/<id>")]
pub async fn post_detail(
    store: &State<Arc<dyn Store>>,
    storage: &State<Arc<dyn ObjectStorage>>,
    config: &State<AppConfig>,
    id: String,
) -> Result<RawHtml<String>, Status> {
    let store = Arc::clone(store.inner());
    let prefix = storage.public_prefix();
    let (post, index) = blocking(move || {
        let post = posts::find(store.as_ref(), &id)?;
        let index = posts::image_index(store.as_ref(), &prefix, &post)?;
        Ok((post, index))
    })
    .await
    .map_err(to_status)?;

    let credits = attribution::credits(&post, &index);
    let context = json!({
        "site_name": config.site_name,
        "post": post,
        "content_html": body::to_html(&post.content),
        "credits": credits,
    });
    Ok(RawHtml(render::render_page("post_single", &context)))
}
