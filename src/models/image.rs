use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::attribution::{Attribution, UploadProvenance, DEFAULT_COPYRIGHT, DEFAULT_PHOTOGRAPHER};

/// Metadata row for an uploaded image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedImage {
    pub id: String,
    pub filename: String,
    pub original_filename: String,
    pub storage_path: String,
    pub public_url: String,
    pub size_bytes: u64,
    pub mime_type: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub alt_text: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    pub photographer: String,
    pub copyright: String,
    #[serde(default)]
    pub uploaded_by: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Insert payload, written after the bytes are in object storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewImage {
    pub filename: String,
    pub original_filename: String,
    pub storage_path: String,
    pub public_url: String,
    pub size_bytes: u64,
    pub mime_type: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub alt_text: Option<String>,
    pub caption: Option<String>,
    pub photographer: String,
    pub copyright: String,
}

/// The editable part of an image record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageMetadataForm {
    pub alt_text: Option<String>,
    pub caption: Option<String>,
    pub photographer: String,
    pub copyright: String,
}

impl ImageMetadataForm {
    /// Blank optional fields become `None`; blank photographer and copyright
    /// fall back to the site defaults.
    pub fn normalized(&self) -> ImageMetadataForm {
        ImageMetadataForm {
            alt_text: non_blank(self.alt_text.as_deref()),
            caption: non_blank(self.caption.as_deref()),
            photographer: non_blank(Some(&self.photographer))
                .unwrap_or_else(|| DEFAULT_PHOTOGRAPHER.to_string()),
            copyright: non_blank(Some(&self.copyright))
                .unwrap_or_else(|| DEFAULT_COPYRIGHT.to_string()),
        }
    }
}

impl UploadedImage {
    pub fn attribution(&self) -> Attribution {
        Attribution::Upload(UploadProvenance {
            photographer: self.photographer.clone(),
            copyright: self.copyright.clone(),
            alt: self.alt_text.clone(),
            caption: self.caption.clone(),
            original_filename: self.original_filename.clone(),
            size_bytes: self.size_bytes,
            mime_type: self.mime_type.clone(),
            width: self.width.unwrap_or(0),
            height: self.height.unwrap_or(0),
        }
        .with_defaults())
    }

    pub fn size_human(&self) -> String {
        human_size(self.size_bytes)
    }

    pub fn metadata_form(&self) -> ImageMetadataForm {
        ImageMetadataForm {
            alt_text: self.alt_text.clone(),
            caption: self.caption.clone(),
            photographer: self.photographer.clone(),
            copyright: self.copyright.clone(),
        }
    }
}

pub fn human_size(size: u64) -> String {
    if size >= 1_048_576 {
        format!("{:.1} MB", size as f64 / 1_048_576.0)
    } else if size >= 1024 {
        format!("{:.0} KB", size as f64 / 1024.0)
    } else {
        format!("{} B", size)
    }
}

pub(crate) fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
