use std::io::Cursor;
use std::path::Path;
use std::process::{Command, Stdio};

use log::{info, warn};

use crate::auth::Session;
use crate::error::AppError;
use crate::models::image::{non_blank, ImageMetadataForm, NewImage, UploadedImage};
use crate::models::attribution::{DEFAULT_COPYRIGHT, DEFAULT_PHOTOGRAPHER};
use crate::storage::ObjectStorage;
use crate::store::Store;

/// Object storage refuses anything larger.
pub const MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

/// Accepted MIME types and the extension each is stored under.
const ACCEPTED: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/webp", "webp"),
    ("image/gif", "gif"),
    ("image/heic", "heic"),
    ("image/heif", "heif"),
];

/// A file as it arrived from the upload form.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub original_filename: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
    pub alt_text: Option<String>,
    pub caption: Option<String>,
    pub photographer: Option<String>,
    pub copyright: Option<String>,
}

/// Type of an accepted upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadKind {
    pub mime: &'static str,
    pub ext: &'static str,
}

impl UploadKind {
    pub fn needs_conversion(&self) -> bool {
        matches!(self.ext, "heic" | "heif")
    }
}

fn kind_for_mime(mime: &str) -> Option<UploadKind> {
    let mime = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
    let mime = if mime == "image/jpg" { "image/jpeg".to_string() } else { mime };
    ACCEPTED
        .iter()
        .find(|(m, _)| *m == mime)
        .map(|&(mime, ext)| UploadKind { mime, ext })
}

fn kind_for_name(name: &str) -> Option<UploadKind> {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())?
        .to_ascii_lowercase();
    let ext = if ext == "jpeg" { "jpg".to_string() } else { ext };
    ACCEPTED
        .iter()
        .find(|(_, e)| *e == ext)
        .map(|&(mime, ext)| UploadKind { mime, ext })
}

/// Size within 1..=min(max_bytes, MAX_UPLOAD_BYTES).
fn check_size(len: u64, max_bytes: u64) -> Result<(), AppError> {
    if len == 0 {
        return Err(AppError::validation("The file is empty"));
    }
    let max_bytes = max_bytes.min(MAX_UPLOAD_BYTES);
    if len > max_bytes {
        return Err(AppError::validation(format!(
            "File is too large (max {} MB)",
            max_bytes / (1024 * 1024)
        )));
    }
    Ok(())
}

/// Accept or reject an upload before anything is stored. The declared MIME
/// type wins; browsers often send HEIC as `application/octet-stream`, so the
/// file extension is the fallback.
pub fn validate_upload(
    name: &str,
    content_type: Option<&str>,
    len: u64,
    max_bytes: u64,
) -> Result<UploadKind, AppError> {
    check_size(len, max_bytes)?;
    content_type
        .and_then(kind_for_mime)
        .or_else(|| kind_for_name(name))
        .ok_or_else(|| {
            AppError::validation("Unsupported file type. Use JPEG, PNG, WebP, GIF or HEIC.")
        })
}

/// Width and height, when the `image` crate recognises the format.
pub fn probe_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}

fn run_quietly(command: &mut Command) -> bool {
    command
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Convert HEIC/HEIF to JPEG using system tools (sips on macOS,
/// magick/heif-convert on Linux). First tool that succeeds wins.
fn convert_heic_to_jpg(src: &Path, dst: &Path) -> bool {
    let mut sips = Command::new("sips");
    sips.args(["-s", "format", "jpeg", "-s", "formatOptions", "85"])
        .arg(src)
        .arg("--out")
        .arg(dst);
    let mut magick = Command::new("magick");
    magick.arg(src).args(["-quality", "85"]).arg(dst);
    let mut heif_convert = Command::new("heif-convert");
    heif_convert.arg(src).arg(dst);

    [sips, magick, heif_convert]
        .iter_mut()
        .any(|tool| run_quietly(tool) && dst.exists())
}

fn heic_to_jpeg(bytes: &[u8], ext: &str) -> Result<Vec<u8>, AppError> {
    let dir = std::env::temp_dir();
    let stem = uuid::Uuid::new_v4().to_string();
    let src = dir.join(format!("{}.{}", stem, ext));
    let dst = dir.join(format!("{}.jpg", stem));

    let converted = std::fs::write(&src, bytes).is_ok() && convert_heic_to_jpg(&src, &dst);
    let result = if converted {
        std::fs::read(&dst).map_err(|e| e.to_string())
    } else {
        Err("no converter succeeded".to_string())
    };
    let _ = std::fs::remove_file(&src);
    let _ = std::fs::remove_file(&dst);

    result.map_err(|e| {
        warn!("HEIC conversion failed: {}", e);
        AppError::validation("Could not convert this HEIC image. Please upload a JPEG instead.")
    })
}

/// Store the bytes, then write the record. If the record write fails the
/// stored object is removed again.
pub fn upload(
    store: &dyn Store,
    storage: &dyn ObjectStorage,
    session: &Session,
    request: UploadRequest,
    max_bytes: u64,
) -> Result<UploadedImage, AppError> {
    let kind = validate_upload(
        &request.original_filename,
        request.content_type.as_deref(),
        request.bytes.len() as u64,
        max_bytes,
    )?;

    let (bytes, mime, ext) = if kind.needs_conversion() {
        let jpeg = heic_to_jpeg(&request.bytes, kind.ext)?;
        // The converted JPEG can come out larger than the HEIC it replaces.
        check_size(jpeg.len() as u64, max_bytes)?;
        (jpeg, "image/jpeg", "jpg")
    } else {
        (request.bytes, kind.mime, kind.ext)
    };
    let (width, height) = match probe_dimensions(&bytes) {
        Some((w, h)) => (Some(w), Some(h)),
        None => (None, None),
    };

    let filename = format!("{}.{}", uuid::Uuid::new_v4(), ext);
    let public_url = storage
        .upload(session, &filename, &bytes, mime)
        .map_err(AppError::backend("upload image"))?;

    let new_image = NewImage {
        filename: filename.clone(),
        original_filename: request.original_filename.trim().to_string(),
        storage_path: filename.clone(),
        public_url,
        size_bytes: bytes.len() as u64,
        mime_type: mime.to_string(),
        width,
        height,
        alt_text: non_blank(request.alt_text.as_deref()),
        caption: non_blank(request.caption.as_deref()),
        photographer: non_blank(request.photographer.as_deref())
            .unwrap_or_else(|| DEFAULT_PHOTOGRAPHER.to_string()),
        copyright: non_blank(request.copyright.as_deref())
            .unwrap_or_else(|| DEFAULT_COPYRIGHT.to_string()),
    };

    match store.image_create(session, &new_image) {
        Ok(image) => {
            info!("Image uploaded: {} ({})", image.original_filename, image.public_url);
            Ok(image)
        }
        Err(e) => {
            if let Err(cleanup) = storage.delete(session, &filename) {
                warn!("Could not remove orphaned object {}: {}", filename, cleanup);
            }
            Err(AppError::backend("save image record")(e))
        }
    }
}

pub fn update_metadata(
    store: &dyn Store,
    session: &Session,
    id: &str,
    form: &ImageMetadataForm,
) -> Result<UploadedImage, AppError> {
    store
        .image_update_metadata(session, id, &form.normalized())
        .map_err(AppError::backend("update image"))?
        .ok_or(AppError::NotFound)
}

/// Delete the record, then the object. A failed object delete leaves an
/// orphaned file, which is logged and otherwise ignored.
pub fn delete(
    store: &dyn Store,
    storage: &dyn ObjectStorage,
    session: &Session,
    id: &str,
) -> Result<(), AppError> {
    let image = store
        .image_find_by_id(id)
        .map_err(AppError::backend("load image"))?
        .ok_or(AppError::NotFound)?;
    if !store
        .image_delete(session, id)
        .map_err(AppError::backend("delete image"))?
    {
        return Err(AppError::NotFound);
    }
    if let Err(e) = storage.delete(session, &image.storage_path) {
        warn!("Image record {} deleted but object {} remains: {}", id, image.storage_path, e);
    }
    info!("Image deleted: {}", image.public_url);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MB: u64 = 1024 * 1024;

    #[test]
    fn accepts_known_types() {
        let kind = validate_upload("a.jpg", Some("image/jpeg"), 10, 50 * MB).unwrap();
        assert_eq!(kind, UploadKind { mime: "image/jpeg", ext: "jpg" });
        let kind = validate_upload("a", Some("image/png; charset=binary"), 10, 50 * MB).unwrap();
        assert_eq!(kind.ext, "png");
    }

    #[test]
    fn falls_back_to_extension() {
        let kind =
            validate_upload("IMG_0001.HEIC", Some("application/octet-stream"), 10, 50 * MB).unwrap();
        assert_eq!(kind.mime, "image/heic");
        assert!(kind.needs_conversion());
        let kind = validate_upload("photo.jpeg", None, 10, 50 * MB).unwrap();
        assert_eq!(kind.mime, "image/jpeg");
    }

    #[test]
    fn rejects_bad_uploads() {
        assert!(validate_upload("a.jpg", Some("image/jpeg"), 0, 50 * MB).is_err());
        assert!(validate_upload("a.jpg", Some("image/jpeg"), 50 * MB + 1, 50 * MB).is_err());
        assert!(validate_upload("a.jpg", Some("image/jpeg"), 50 * MB, 50 * MB).is_ok());
        // A larger configured limit still cannot exceed what storage accepts.
        assert!(validate_upload("a.jpg", Some("image/jpeg"), 51 * MB, 100 * MB).is_err());
        assert!(validate_upload("a.svg", Some("image/svg+xml"), 10, 50 * MB).is_err());
        assert!(validate_upload("a.txt", None, 10, 50 * MB).is_err());
    }

    #[test]
    fn converted_output_is_held_to_the_same_cap() {
        assert!(check_size(2 * MB, 2 * MB).is_ok());
        let err = check_size(2 * MB + 1, 2 * MB).unwrap_err();
        assert_eq!(err.to_string(), "File is too large (max 2 MB)");
        assert!(check_size(0, 2 * MB).unwrap_err().is_validation());
    }

    #[test]
    fn probes_png_dimensions() {
        let mut png = Vec::new();
        image::RgbImage::new(3, 2)
            .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();
        assert_eq!(probe_dimensions(&png), Some((3, 2)));
        assert_eq!(probe_dimensions(b"not an image"), None);
    }
}
