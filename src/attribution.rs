//! Who gets credit for a gallery image.

use std::collections::HashMap;

use serde::Serialize;

use crate::embed::is_flickr_url;
use crate::models::attribution::{AttributionMap, DEFAULT_PHOTOGRAPHER};
use crate::models::image::UploadedImage;
use crate::models::post::AppPost;

/// Shown for a Flickr image whose post carries no photographer for it.
pub const UNATTRIBUTED_EMBED: &str = "Flickr photographer";

/// Uploaded images by exact public URL, plus the URL prefix our object
/// storage serves from.
#[derive(Debug, Clone, Default)]
pub struct UploadedImageIndex {
    storage_prefix: String,
    by_url: HashMap<String, UploadedImage>,
}

impl UploadedImageIndex {
    pub fn new(storage_prefix: impl Into<String>, images: Vec<UploadedImage>) -> Self {
        UploadedImageIndex {
            storage_prefix: storage_prefix.into(),
            by_url: images
                .into_iter()
                .map(|img| (img.public_url.clone(), img))
                .collect(),
        }
    }

    /// True when the URL points into our own object storage.
    pub fn is_storage_url(&self, url: &str) -> bool {
        !self.storage_prefix.is_empty() && url.starts_with(&self.storage_prefix)
    }

    pub fn get(&self, url: &str) -> Option<&UploadedImage> {
        self.by_url.get(url)
    }

    pub fn len(&self) -> usize {
        self.by_url.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_url.is_empty()
    }
}

/// Display name for an image.
///
/// Flickr URLs take the photographer from the post's attribution map (or the
/// unattributed label). Storage URLs take it from the uploaded-image record.
/// Anything else is credited to the site owner without a lookup.
pub fn resolve_display_name(
    image_url: &str,
    post_attribution: &AttributionMap,
    index: &UploadedImageIndex,
) -> String {
    if is_flickr_url(image_url) {
        return post_attribution
            .get(image_url)
            .map(|a| a.photographer().trim())
            .filter(|name| !name.is_empty())
            .unwrap_or(UNATTRIBUTED_EMBED)
            .to_string();
    }

    if index.is_storage_url(image_url) {
        if let Some(record) = index.get(image_url) {
            return record.photographer.clone();
        }
        if let Some(attribution) = post_attribution.get(image_url) {
            let name = attribution.photographer().trim();
            if !name.is_empty() {
                return name.to_string();
            }
        }
    }

    DEFAULT_PHOTOGRAPHER.to_string()
}

/// Everything the gallery shows under one image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageCredit {
    pub url: String,
    pub photographer: String,
    pub title: Option<String>,
    pub alt: String,
    pub page_url: Option<String>,
    pub copyright: Option<String>,
}

/// One credit per gallery image, primary image first.
pub fn credits(post: &AppPost, index: &UploadedImageIndex) -> Vec<ImageCredit> {
    post.gallery()
        .into_iter()
        .map(|url| {
            let photographer = resolve_display_name(url, &post.image_metadata, index);
            let from_post = post.image_metadata.get(url);
            let record = if index.is_storage_url(url) { index.get(url) } else { None };

            // A live record wins over the snapshot the editor saved.
            let title = match record {
                Some(r) => r.caption.clone(),
                None => from_post.and_then(|a| a.title().map(str::to_string)),
            };
            let alt = record
                .and_then(|r| r.alt_text.clone())
                .or_else(|| title.clone())
                .unwrap_or_else(|| post.title.clone());
            let copyright = record
                .map(|r| r.copyright.clone())
                .or_else(|| from_post.and_then(|a| a.copyright().map(str::to_string)));

            ImageCredit {
                url: url.to_string(),
                photographer,
                title,
                alt,
                page_url: from_post.and_then(|a| a.page_url().map(str::to_string)),
                copyright,
            }
        })
        .collect()
}
