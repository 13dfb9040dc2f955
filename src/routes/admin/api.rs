use std::path::PathBuf;
use std::sync::Arc;

use rocket::serde::json::Json;
use rocket::State;
use serde::{Deserialize, Serialize};

use crate::embed::{self, ParsedEmbed, SizeVariants};
use crate::error::AppError;
use crate::models::image::UploadedImage;
use crate::routes::blocking;
use crate::security::auth::AdminSession;
use crate::store::Store;

pub fn routes() -> Vec<rocket::Route> {
    routes![embed_preview, media_index, fallback_get, fallback_post]
}

#[derive(Debug, Deserialize)]
pub struct EmbedRequest {
    pub snippet: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbedPreview {
    #[serde(flatten)]
    pub embed: ParsedEmbed,
    pub sizes: SizeVariants,
}

/// Parse a pasted embed for the editor preview. The photographer is not
/// part of the answer; the editor asks for it separately.
#[post("/embed", format = "json", data = "<body>")]
pub fn embed_preview(_admin: AdminSession, body: Json<EmbedRequest>) -> Result<Json<EmbedPreview>, AppError> {
    let embed = embed::parse(&body.snippet).ok_or(AppError::InvalidEmbed)?;
    let sizes = embed::size_variants(&embed.image_url);
    Ok(Json(EmbedPreview { embed, sizes }))
}

/// Uploaded images for the editor's picker, newest first.
#[get("/media")]
pub async fn media_index(
    _admin: AdminSession,
    store: &State<Arc<dyn Store>>,
) -> Result<Json<Vec<UploadedImage>>, AppError> {
    let store = Arc::clone(store.inner());
    let images = blocking(move || store.image_list().map_err(AppError::backend("load images"))).await?;
    Ok(Json(images))
}

/// Anything under the admin API that no handler took. Without a session
/// that is a JSON 401; the admin pages' login redirect never applies here.
fn unmatched(admin: Option<AdminSession>) -> AppError {
    match admin {
        Some(_) => AppError::NotFound,
        None => AppError::Unauthorized,
    }
}

#[get("/<_path..>", rank = 90)]
pub fn fallback_get(_path: PathBuf, admin: Option<AdminSession>) -> AppError {
    unmatched(admin)
}

#[post("/<_path..>", rank = 90)]
pub fn fallback_post(_path: PathBuf, admin: Option<AdminSession>) -> AppError {
    unmatched(admin)
}
