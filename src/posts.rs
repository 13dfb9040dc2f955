//! Post workflows shared by the admin pages and the JSON API.
//!
//! Everything here validates before touching the store, so a rejected form
//! never costs a backend round trip.

use log::info;

use crate::attribution::UploadedImageIndex;
use crate::auth::Session;
use crate::embed::{self, ParsedEmbed};
use crate::error::AppError;
use crate::models::attribution::Attribution;
use crate::models::post::{AppPost, Category, PostForm, MAX_GALLERY_IMAGES};
use crate::store::Store;

/// Check a submitted form. The first problem found is reported.
pub fn validate(form: &PostForm) -> Result<(), AppError> {
    if form.title.trim().is_empty() {
        return Err(AppError::validation("Title is required"));
    }
    if form.image.trim().is_empty() {
        return Err(AppError::validation("A primary image is required"));
    }
    if form.excerpt.trim().is_empty() {
        return Err(AppError::validation("Excerpt is required"));
    }
    if form.content.trim().is_empty() {
        return Err(AppError::validation("Content is required"));
    }
    let images = form.images.iter().filter(|u| !u.trim().is_empty()).count();
    if images > MAX_GALLERY_IMAGES {
        return Err(AppError::validation(format!(
            "A post can have at most {} additional images",
            MAX_GALLERY_IMAGES
        )));
    }

    for (url, attribution) in &form.image_metadata {
        let used = form.image.trim() == url || form.images.iter().any(|u| u.trim() == url);
        if !used {
            return Err(AppError::validation(format!(
                "Attribution given for an image the post does not use: {}",
                url
            )));
        }
        if attribution.is_embed() && attribution.photographer().trim().is_empty() {
            return Err(AppError::validation(
                "Photographer name is required for Flickr photos",
            ));
        }
    }
    Ok(())
}

/// Validate then insert. Returns the new post's id.
pub fn create(store: &dyn Store, session: &Session, form: &PostForm) -> Result<String, AppError> {
    validate(form)?;
    let post = store
        .post_create(session, &form.to_storage())
        .map_err(AppError::backend("create post"))?;
    info!("Post created: {} ({})", post.title, post.id);
    Ok(post.id)
}

pub fn update(
    store: &dyn Store,
    session: &Session,
    id: &str,
    form: &PostForm,
) -> Result<(), AppError> {
    validate(form)?;
    match store
        .post_update(session, id, &form.to_storage())
        .map_err(AppError::backend("update post"))?
    {
        Some(post) => {
            info!("Post updated: {} ({})", post.title, post.id);
            Ok(())
        }
        None => Err(AppError::NotFound),
    }
}

pub fn delete(store: &dyn Store, session: &Session, id: &str) -> Result<(), AppError> {
    if store
        .post_delete(session, id)
        .map_err(AppError::backend("delete post"))?
    {
        info!("Post deleted: {}", id);
        Ok(())
    } else {
        Err(AppError::NotFound)
    }
}

pub fn list(store: &dyn Store, category: Option<Category>) -> Result<Vec<AppPost>, AppError> {
    let posts = store
        .post_list(category)
        .map_err(AppError::backend("load posts"))?;
    Ok(posts.into_iter().map(AppPost::from).collect())
}

pub fn find(store: &dyn Store, id: &str) -> Result<AppPost, AppError> {
    store
        .post_find_by_id(id)
        .map_err(AppError::backend("load post"))?
        .map(AppPost::from)
        .ok_or(AppError::NotFound)
}

/// Image records for the post's storage-hosted images. Other hosts are
/// never looked up, and a post with none of ours costs no query.
pub fn image_index(
    store: &dyn Store,
    storage_prefix: &str,
    post: &AppPost,
) -> Result<UploadedImageIndex, AppError> {
    let ours: Vec<String> = post
        .gallery()
        .into_iter()
        .filter(|u| u.starts_with(storage_prefix))
        .map(str::to_string)
        .collect();
    let records = if ours.is_empty() {
        Vec::new()
    } else {
        store
            .image_find_by_urls(&ours)
            .map_err(AppError::backend("load image credits"))?
    };
    Ok(UploadedImageIndex::new(storage_prefix, records))
}

/// Drop attributions for images the form no longer uses, e.g. after an
/// image was removed in the editor.
pub fn prune_attribution(form: &mut PostForm) {
    let used: Vec<String> = std::iter::once(&form.image)
        .chain(form.images.iter())
        .map(|u| u.trim().to_string())
        .collect();
    form.image_metadata.retain(|url, _| used.contains(url));
}

/// Record upload provenance for storage-hosted images that have none yet,
/// copied from their image records.
pub fn attach_upload_attribution(
    store: &dyn Store,
    storage_prefix: &str,
    form: &mut PostForm,
) -> Result<(), AppError> {
    let missing: Vec<String> = std::iter::once(&form.image)
        .chain(form.images.iter())
        .map(|u| u.trim())
        .filter(|u| u.starts_with(storage_prefix) && !form.image_metadata.contains_key(*u))
        .map(str::to_string)
        .collect();
    if missing.is_empty() {
        return Ok(());
    }
    let records = store
        .image_find_by_urls(&missing)
        .map_err(AppError::backend("load image records"))?;
    for record in records {
        form.image_metadata
            .insert(record.public_url.clone(), record.attribution());
    }
    Ok(())
}

/// Add a pasted Flickr embed to the form: the image becomes the primary
/// image if there is none yet, otherwise it joins the gallery. The
/// photographer is required and recorded with the attribution.
pub fn attach_embed(
    form: &mut PostForm,
    snippet: &str,
    photographer: &str,
) -> Result<ParsedEmbed, AppError> {
    let parsed = embed::parse(snippet).ok_or(AppError::InvalidEmbed)?;
    let provenance = parsed.clone().into_attribution(photographer)?;
    let url = parsed.image_url.clone();

    if form.image.trim().is_empty() {
        form.image = url.clone();
    } else if form.image.trim() != url && !form.images.iter().any(|u| u.trim() == url) {
        let images = form.images.iter().filter(|u| !u.trim().is_empty()).count();
        if images >= MAX_GALLERY_IMAGES {
            return Err(AppError::validation(format!(
                "A post can have at most {} additional images",
                MAX_GALLERY_IMAGES
            )));
        }
        form.images.push(url.clone());
    }
    form.image_metadata.insert(url, Attribution::Embed(provenance));
    Ok(parsed)
}
