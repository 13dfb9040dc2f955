use std::sync::Arc;

use rocket::serde::json::Json;
use rocket::State;

use super::blocking;
use crate::error::AppError;
use crate::models::post::{AppPost, Category};
use crate::posts;
use crate::store::Store;

pub fn routes() -> Vec<rocket::Route> {
    routes![posts_index, post_show]
}

#[get("/posts?<category>")]
pub async fn posts_index(
    store: &State<Arc<dyn Store>>,
    category: Option<String>,
) -> Result<Json<Vec<AppPost>>, AppError> {
    let category = match category.as_deref().filter(|c| !c.is_empty()) {
        Some(raw) => Some(raw.parse::<Category>().map_err(AppError::Validation)?),
        None => None,
    };
    let store = Arc::clone(store.inner());
    let posts = blocking(move || posts::list(store.as_ref(), category)).await?;
    Ok(Json(posts))
}

#[get("/posts/<id>")]
pub async fn post_show(
    store: &State<Arc<dyn Store>>,
    id: String,
) -> Result<Json<AppPost>, AppError> {
    let store = Arc::clone(store.inner());
    let post = blocking(move || posts::find(store.as_ref(), &id)).await?;
    Ok(Json(post))
}
