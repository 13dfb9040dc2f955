use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::attribution::AttributionMap;

pub const MAX_GALLERY_IMAGES: usize = 10;
pub const WORDS_PER_MINUTE: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Hiking,
    Travel,
    Food,
    Mountaineering,
    Lifestyle,
}

impl Category {
    /// Filter-bar order.
    pub const ALL: [Category; 5] = [
        Category::Hiking,
        Category::Travel,
        Category::Food,
        Category::Mountaineering,
        Category::Lifestyle,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Hiking => "hiking",
            Category::Travel => "travel",
            Category::Food => "food",
            Category::Mountaineering => "mountaineering",
            Category::Lifestyle => "lifestyle",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::Hiking => "Hiking",
            Category::Travel => "Travel",
            Category::Food => "Food",
            Category::Mountaineering => "Mountaineering",
            Category::Lifestyle => "Lifestyle",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("Unknown category: {}", wanted))
    }
}

/// `max(1, ceil(words / 200))` minutes, as `"<N> min read"`.
pub fn reading_time_label(content: &str) -> String {
    let words = content.split_whitespace().count();
    let minutes = words.div_ceil(WORDS_PER_MINUTE).max(1);
    format!("{} min read", minutes)
}

// ── Storage shape ──────────────────────────────────────

/// A post row as the backend returns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredPost {
    pub id: String,
    pub title: String,
    pub category: Category,
    pub image_url: String,
    #[serde(default)]
    pub images: Option<Vec<String>>,
    pub excerpt: String,
    pub content: String,
    #[serde(default)]
    pub read_time: Option<String>,
    #[serde(default)]
    pub image_metadata: Option<AttributionMap>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_by: Option<String>,
}

/// Create/update payload. Identifier, reading time, timestamps and creator
/// are assigned by the backend, so this type has no fields for them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredPostInput {
    pub title: String,
    pub category: Category,
    pub image_url: String,
    pub images: Vec<String>,
    pub excerpt: String,
    pub content: String,
    pub image_metadata: AttributionMap,
}

impl StoredPostInput {
    /// The row a backend produces for this payload.
    pub fn into_stored(
        self,
        id: String,
        created_at: DateTime<Utc>,
        created_by: Option<String>,
    ) -> StoredPost {
        let read_time = reading_time_label(&self.content);
        StoredPost {
            id,
            title: self.title,
            category: self.category,
            image_url: self.image_url,
            images: Some(self.images),
            excerpt: self.excerpt,
            content: self.content,
            read_time: Some(read_time),
            image_metadata: Some(self.image_metadata),
            created_at,
            updated_at: Some(created_at),
            created_by,
        }
    }
}

// ── App shape ──────────────────────────────────────────

/// A post as pages and the JSON API see it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppPost {
    pub id: String,
    pub title: String,
    pub category: Category,
    pub image: String,
    pub images: Vec<String>,
    pub excerpt: String,
    pub content: String,
    /// `YYYY-MM-DD` (UTC) of the creation timestamp.
    pub date: String,
    pub read_time: String,
    pub image_metadata: AttributionMap,
}

impl From<StoredPost> for AppPost {
    fn from(stored: StoredPost) -> Self {
        AppPost {
            id: stored.id,
            title: stored.title,
            category: stored.category,
            image: stored.image_url,
            images: stored.images.unwrap_or_default(),
            excerpt: stored.excerpt,
            content: stored.content,
            date: stored.created_at.format("%Y-%m-%d").to_string(),
            read_time: stored.read_time.unwrap_or_default(),
            image_metadata: stored.image_metadata.unwrap_or_default(),
        }
    }
}

impl AppPost {
    /// Primary image first, then the secondary images, without repeats.
    pub fn gallery(&self) -> Vec<&str> {
        let mut urls: Vec<&str> = Vec::with_capacity(self.images.len() + 1);
        for url in std::iter::once(&self.image).chain(self.images.iter()) {
            if !url.is_empty() && !urls.contains(&url.as_str()) {
                urls.push(url);
            }
        }
        urls
    }
}

/// What the admin editor submits, in app field names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostForm {
    pub title: String,
    pub category: Category,
    pub image: String,
    #[serde(default)]
    pub images: Vec<String>,
    pub excerpt: String,
    pub content: String,
    #[serde(default)]
    pub image_metadata: AttributionMap,
}

impl PostForm {
    pub fn to_storage(&self) -> StoredPostInput {
        StoredPostInput {
            title: self.title.trim().to_string(),
            category: self.category,
            image_url: self.image.trim().to_string(),
            images: self
                .images
                .iter()
                .map(|u| u.trim())
                .filter(|u| !u.is_empty())
                .map(str::to_string)
                .collect(),
            excerpt: self.excerpt.trim().to_string(),
            content: self.content.trim_end().to_string(),
            image_metadata: self.image_metadata.clone(),
        }
    }

    pub fn empty() -> Self {
        PostForm {
            title: String::new(),
            category: Category::Hiking,
            image: String::new(),
            images: Vec::new(),
            excerpt: String::new(),
            content: String::new(),
            image_metadata: AttributionMap::new(),
        }
    }
}

impl From<&AppPost> for PostForm {
    fn from(post: &AppPost) -> Self {
        PostForm {
            title: post.title.clone(),
            category: post.category,
            image: post.image.clone(),
            images: post.images.clone(),
            excerpt: post.excerpt.clone(),
            content: post.content.clone(),
            image_metadata: post.image_metadata.clone(),
        }
    }
}
