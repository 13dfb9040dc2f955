use std::sync::Arc;

use rocket::form::Form;
use rocket::fs::TempFile;
use rocket::request::FlashMessage;
use rocket::response::{Flash, Redirect};
use rocket::tokio::io::AsyncReadExt;
use rocket::State;
use rocket_dyn_templates::Template;
use serde_json::json;

use super::admin_base;
use crate::config::AppConfig;
use crate::error::AppError;
use crate::images::{self, UploadRequest};
use crate::models::image::{human_size, ImageMetadataForm, UploadedImage};
use crate::routes::blocking;
use crate::security::auth::AdminSession;
use crate::storage::ObjectStorage;
use crate::store::Store;

pub fn routes() -> Vec<rocket::Route> {
    routes![media_list, media_upload, media_edit, media_update, media_delete]
}

// ── Media Library ───────────────────────────────────────

fn media_row(image: &UploadedImage) -> serde_json::Value {
    json!({
        "id": image.id,
        "url": image.public_url,
        "original_filename": image.original_filename,
        "photographer": image.photographer,
        "alt_text": image.alt_text,
        "caption": image.caption,
        "size_human": image.size_human(),
        "dimensions": match (image.width, image.height) {
            (Some(w), Some(h)) => format!("{} × {}", w, h),
            _ => String::new(),
        },
        "mime_type": image.mime_type,
        "created_at": image.created_at.format("%Y-%m-%d %H:%M").to_string(),
    })
}

#[get("/media")]
pub async fn media_list(
    _admin: AdminSession,
    store: &State<Arc<dyn Store>>,
    config: &State<AppConfig>,
    flash: Option<FlashMessage<'_>>,
) -> Template {
    let store = Arc::clone(store.inner());
    let (list, error) = match blocking(move || {
        store.image_list().map_err(AppError::backend("load images"))
    })
    .await
    {
        Ok(list) => (list, None),
        Err(e) => {
            log::error!("{}", e);
            (Vec::new(), Some(e.to_string()))
        }
    };
    let total: u64 = list.iter().map(|i| i.size_bytes).sum();

    Template::render(
        "admin/media/list",
        json!({
            "page_title": "Media",
            "admin_slug": config.admin_slug,
            "site_name": config.site_name,
            "images": list.iter().map(media_row).collect::<Vec<_>>(),
            "total_size": human_size(total),
            "max_upload_mb": config.upload_cap_mb(),
            "error": error,
            "flash": flash.map(|f| json!({ "kind": f.kind().to_string(), "message": f.message().to_string() })),
        }),
    )
}

#[derive(FromForm)]
pub struct UploadForm<'f> {
    pub file: TempFile<'f>,
    pub alt_text: Option<String>,
    pub caption: Option<String>,
    pub photographer: Option<String>,
    pub copyright: Option<String>,
}

async fn read_upload(file: &TempFile<'_>) -> Result<Vec<u8>, AppError> {
    let mut bytes = Vec::with_capacity(file.len() as usize);
    let reader = file
        .open()
        .await
        .map_err(|e| AppError::backend("read upload")(e.to_string()))?;
    rocket::tokio::pin!(reader);
    reader
        .read_to_end(&mut bytes)
        .await
        .map_err(|e| AppError::backend("read upload")(e.to_string()))?;
    Ok(bytes)
}

#[post("/media/upload", data = "<form>")]
pub async fn media_upload(
    admin: AdminSession,
    store: &State<Arc<dyn Store>>,
    storage: &State<Arc<dyn ObjectStorage>>,
    config: &State<AppConfig>,
    form: Form<UploadForm<'_>>,
) -> Flash<Redirect> {
    let to = Redirect::to(format!("{}/media", admin_base(config)));
    let form = form.into_inner();

    // Try original filename first, then the sanitized name
    let original_filename = form
        .file
        .raw_name()
        .map(|rn| rn.dangerous_unsafe_unsanitized_raw().as_str().to_string())
        .or_else(|| form.file.name().map(str::to_string))
        .unwrap_or_else(|| "upload".to_string());
    let content_type = form.file.content_type().map(|ct| ct.to_string());

    // Reject before reading anything into memory.
    let max_bytes = config.max_upload_bytes();
    if let Err(e) = images::validate_upload(
        &original_filename,
        content_type.as_deref(),
        form.file.len(),
        max_bytes,
    ) {
        return Flash::error(to, e.to_string());
    }

    let bytes = match read_upload(&form.file).await {
        Ok(b) => b,
        Err(e) => return Flash::error(to, e.to_string()),
    };
    let request = UploadRequest {
        original_filename,
        content_type,
        bytes,
        alt_text: form.alt_text,
        caption: form.caption,
        photographer: form.photographer,
        copyright: form.copyright,
    };

    let store = Arc::clone(store.inner());
    let storage = Arc::clone(storage.inner());
    let session = admin.session;
    match blocking(move || {
        images::upload(store.as_ref(), storage.as_ref(), &session, request, max_bytes)
    })
    .await
    {
        Ok(image) => Flash::success(to, format!("Uploaded {}", image.original_filename)),
        Err(e) => {
            if !e.is_validation() {
                log::error!("{}", e);
            }
            Flash::error(to, e.to_string())
        }
    }
}

#[get("/media/<id>/edit")]
pub async fn media_edit(
    _admin: AdminSession,
    store: &State<Arc<dyn Store>>,
    config: &State<AppConfig>,
    id: String,
) -> Result<Option<Template>, Flash<Redirect>> {
    let store = Arc::clone(store.inner());
    let image = blocking(move || {
        store
            .image_find_by_id(&id)
            .map_err(AppError::backend("load image"))
    })
    .await
    .map_err(|e| Flash::error(Redirect::to(format!("{}/media", admin_base(config))), e.to_string()))?;

    Ok(image.map(|image| {
        Template::render(
            "admin/media/edit",
            json!({
                "page_title": "Edit Image",
                "admin_slug": config.admin_slug,
                "site_name": config.site_name,
                "image": media_row(&image),
                "form": image.metadata_form(),
            }),
        )
    }))
}

#[derive(FromForm)]
pub struct MetadataForm {
    pub alt_text: Option<String>,
    pub caption: Option<String>,
    pub photographer: String,
    pub copyright: String,
}

#[post("/media/<id>", data = "<form>")]
pub async fn media_update(
    admin: AdminSession,
    store: &State<Arc<dyn Store>>,
    config: &State<AppConfig>,
    id: String,
    form: Form<MetadataForm>,
) -> Flash<Redirect> {
    let form = form.into_inner();
    let metadata = ImageMetadataForm {
        alt_text: form.alt_text,
        caption: form.caption,
        photographer: form.photographer,
        copyright: form.copyright,
    };
    let store = Arc::clone(store.inner());
    let session = admin.session;
    let to = Redirect::to(format!("{}/media", admin_base(config)));
    match blocking(move || images::update_metadata(store.as_ref(), &session, &id, &metadata)).await {
        Ok(image) => Flash::success(to, format!("Saved {}", image.original_filename)),
        Err(e) => {
            log::error!("{}", e);
            Flash::error(to, e.to_string())
        }
    }
}

#[post("/media/<id>/delete")]
pub async fn media_delete(
    admin: AdminSession,
    store: &State<Arc<dyn Store>>,
    storage: &State<Arc<dyn ObjectStorage>>,
    config: &State<AppConfig>,
    id: String,
) -> Flash<Redirect> {
    let store = Arc::clone(store.inner());
    let storage = Arc::clone(storage.inner());
    let session = admin.session;
    let to = Redirect::to(format!("{}/media", admin_base(config)));
    match blocking(move || images::delete(store.as_ref(), storage.as_ref(), &session, &id)).await {
        Ok(()) => Flash::success(to, "Image deleted"),
        Err(e) => {
            log::error!("{}", e);
            Flash::error(to, e.to_string())
        }
    }
}
