use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const DEFAULT_PHOTOGRAPHER: &str = "Kate Goldenring";
pub const DEFAULT_COPYRIGHT: &str = "© Kate Goldenring. All rights reserved.";

/// Per-post attribution, keyed by image URL.
pub type AttributionMap = BTreeMap<String, Attribution>;

/// Where a gallery image came from and who gets credit for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum Attribution {
    Upload(UploadProvenance),
    Embed(EmbedProvenance),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadProvenance {
    pub photographer: String,
    pub copyright: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    pub original_filename: String,
    pub size_bytes: u64,
    pub mime_type: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedProvenance {
    pub owner_id: String,
    pub photo_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album_id: Option<String>,
    pub photographer: String,
    pub title: String,
    pub page_url: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

impl Attribution {
    pub fn photographer(&self) -> &str {
        match self {
            Attribution::Upload(u) => &u.photographer,
            Attribution::Embed(e) => &e.photographer,
        }
    }

    pub fn is_embed(&self) -> bool {
        matches!(self, Attribution::Embed(_))
    }

    /// Title shown under the image in the lightbox, if the source gave one.
    pub fn title(&self) -> Option<&str> {
        let title = match self {
            Attribution::Upload(u) => u.caption.as_deref().or(u.alt.as_deref()),
            Attribution::Embed(e) => Some(e.title.as_str()),
        };
        title.filter(|t| !t.trim().is_empty())
    }

    pub fn page_url(&self) -> Option<&str> {
        match self {
            Attribution::Upload(_) => None,
            Attribution::Embed(e) => Some(e.page_url.as_str()),
        }
    }

    pub fn copyright(&self) -> Option<&str> {
        match self {
            Attribution::Upload(u) => Some(u.copyright.as_str()),
            Attribution::Embed(_) => None,
        }
    }
}

impl UploadProvenance {
    /// Fill in the photographer and copyright defaults for blank values.
    pub fn with_defaults(mut self) -> Self {
        if self.photographer.trim().is_empty() {
            self.photographer = DEFAULT_PHOTOGRAPHER.to_string();
        }
        if self.copyright.trim().is_empty() {
            self.copyright = DEFAULT_COPYRIGHT.to_string();
        }
        self
    }
}
