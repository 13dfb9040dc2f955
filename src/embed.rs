//! Flickr embed snippets: parsing, host detection and size-variant URLs.
//!
//! A snippet as Flickr's "Share → Embed" dialog produces it:
//!
//! ```html
//! <a data-flickr-embed="true" href="https://www.flickr.com/photos/12345678@N00/53012345678/in/album-72177720301234567/"
//!    title="Sunrise over Half Dome"><img src="https://live.staticflickr.com/65535/53012345678_9f8e7d6c5b_z.jpg"
//!    width="640" height="427" alt="Sunrise over Half Dome"></a>
//! <script async src="//embedr.flickr.com/assets/client-code.js" charset="utf-8"></script>
//! ```

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::OnceLock;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use regex::Regex;
use serde::Serialize;

use crate::error::AppError;
use crate::models::attribution::EmbedProvenance;

/// Attribute Flickr puts on the anchor of every embed.
const EMBED_MARKER: &str = "data-flickr-embed";

const FLICKR_DOMAINS: &[&str] = &["flickr.com", "staticflickr.com"];

fn photo_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"/photos/([^/?#]+)/(\d+)").expect("valid photo regex"))
}

fn album_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"/album-(\d+)").expect("valid album regex"))
}

/// Structured metadata pulled out of an embed snippet. The photographer is
/// never part of it; it is collected from a person separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedEmbed {
    pub account_id: String,
    pub photo_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album_id: Option<String>,
    pub title: String,
    pub image_url: String,
    pub width: u32,
    pub height: u32,
    pub alt: String,
    pub embed_url: String,
    pub page_url: String,
}

impl ParsedEmbed {
    /// Attach the photographer and produce the attribution stored on a post.
    pub fn into_attribution(self, photographer: &str) -> Result<EmbedProvenance, AppError> {
        let photographer = photographer.trim();
        if photographer.is_empty() {
            return Err(AppError::validation(
                "Photographer name is required for Flickr photos",
            ));
        }
        Ok(EmbedProvenance {
            owner_id: self.account_id,
            photo_id: self.photo_id,
            album_id: self.album_id,
            photographer: photographer.to_string(),
            title: self.title,
            page_url: self.page_url,
            width: self.width,
            height: self.height,
        })
    }
}

#[derive(Default)]
struct Anchor {
    href: Option<String>,
    title: Option<String>,
}

#[derive(Default)]
struct Img {
    src: Option<String>,
    alt: Option<String>,
    width: Option<String>,
    height: Option<String>,
}

/// Parse an embed snippet. `None` means "not a Flickr embed we understand":
/// no marked anchor, no image inside it, or no photo id in the link.
pub fn parse(snippet: &str) -> Option<ParsedEmbed> {
    let (anchor, img) = scan(snippet)?;

    let href = anchor.href.unwrap_or_default();
    let photo = photo_pattern().captures(&href)?;
    let account_id = photo[1].to_string();
    let photo_id = photo[2].to_string();
    let album_id = album_pattern().captures(&href).map(|c| c[1].to_string());

    let title = non_empty(anchor.title)
        .or_else(|| non_empty(img.alt.clone()))
        .unwrap_or_default();
    let alt = non_empty(img.alt).unwrap_or_else(|| title.clone());

    Some(ParsedEmbed {
        account_id,
        photo_id,
        album_id,
        title,
        image_url: img.src.unwrap_or_default(),
        width: parse_dimension(img.width.as_deref()),
        height: parse_dimension(img.height.as_deref()),
        alt,
        embed_url: href.clone(),
        page_url: href,
    })
}

/// Walk the fragment and return the first marked anchor with the first image
/// inside it.
fn scan(snippet: &str) -> Option<(Anchor, Img)> {
    let mut reader = Reader::from_str(snippet);
    // Snippets are HTML, not XML: `<img ...>` is never closed.
    reader.config_mut().check_end_names = false;
    reader.config_mut().allow_unmatched_ends = true;

    let mut anchor: Option<Anchor> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                let tag = tag_name(e);
                if anchor.is_none() && tag == "a" && has_attribute(e, EMBED_MARKER) {
                    anchor = Some(Anchor {
                        href: attribute(e, "href"),
                        title: attribute(e, "title"),
                    });
                } else if anchor.is_some() && tag == "img" {
                    let img = Img {
                        src: attribute(e, "src"),
                        alt: attribute(e, "alt"),
                        width: attribute(e, "width"),
                        height: attribute(e, "height"),
                    };
                    return anchor.map(|a| (a, img));
                }
            }
            Ok(Event::End(ref e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_lowercase();
                if anchor.is_some() && name == "a" {
                    // Marked anchor closed without an image.
                    return None;
                }
            }
            Ok(Event::Eof) => return None,
            Ok(_) => {}
            Err(_) => return None,
        }
    }
}

fn tag_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.name().as_ref()).to_lowercase()
}

fn has_attribute(e: &BytesStart, name: &str) -> bool {
    e.html_attributes()
        .flatten()
        .any(|attr| attr.key.as_ref().eq_ignore_ascii_case(name.as_bytes()))
}

fn attribute(e: &BytesStart, name: &str) -> Option<String> {
    e.html_attributes()
        .flatten()
        .find(|attr| attr.key.as_ref().eq_ignore_ascii_case(name.as_bytes()))
        .map(|attr| {
            // Named HTML entities (&nbsp; and friends) are not XML; keep the raw text.
            let value = attr
                .unescape_value()
                .unwrap_or_else(|_| Cow::Owned(String::from_utf8_lossy(&attr.value).into_owned()));
            value.trim().to_string()
        })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn parse_dimension(value: Option<&str>) -> u32 {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(0)
}

// ── Host detection ─────────────────────────────────────

/// True when the URL is served by Flickr (pages or the static photo CDN).
pub fn is_flickr_url(raw: &str) -> bool {
    let raw = raw.trim();
    let normalized: Cow<str> = if raw.starts_with("//") {
        Cow::Owned(format!("https:{}", raw))
    } else {
        Cow::Borrowed(raw)
    };
    let host = match url::Url::parse(&normalized) {
        Ok(u) => match u.host_str() {
            Some(h) => h.to_ascii_lowercase(),
            None => return false,
        },
        Err(_) => return false,
    };
    FLICKR_DOMAINS
        .iter()
        .any(|d| host == *d || host.ends_with(&format!(".{}", d)))
}

// ── Size variants ──────────────────────────────────────

/// Named Flickr size suffixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotoSize {
    Square,
    Thumbnail,
    Small,
    Medium,
    Large,
}

impl PhotoSize {
    pub const ALL: [PhotoSize; 5] = [
        PhotoSize::Square,
        PhotoSize::Thumbnail,
        PhotoSize::Small,
        PhotoSize::Medium,
        PhotoSize::Large,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PhotoSize::Square => "square",
            PhotoSize::Thumbnail => "thumbnail",
            PhotoSize::Small => "small",
            PhotoSize::Medium => "medium",
            PhotoSize::Large => "large",
        }
    }

    /// 150px square, 100px, 240px, 640px and 1024px on the longest side.
    pub fn code(&self) -> &'static str {
        match self {
            PhotoSize::Square => "q",
            PhotoSize::Thumbnail => "t",
            PhotoSize::Small => "m",
            PhotoSize::Medium => "z",
            PhotoSize::Large => "b",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SizeVariants {
    pub original: String,
    /// Keyed by [`PhotoSize::name`]. Empty when the file name does not follow
    /// Flickr's `<id>_<secret>[_<size>].<ext>` convention.
    pub variants: BTreeMap<&'static str, String>,
}

impl SizeVariants {
    pub fn get(&self, size: PhotoSize) -> &str {
        self.variants
            .get(size.name())
            .map(String::as_str)
            .unwrap_or(&self.original)
    }
}

/// Derive the sibling URLs for every [`PhotoSize`] by swapping the size code
/// in the file name. Pure string work, nothing is fetched.
pub fn size_variants(image_url: &str) -> SizeVariants {
    let original = image_url.to_string();
    let mut variants = BTreeMap::new();

    let (path, suffix) = match image_url.find(['?', '#']) {
        Some(i) => image_url.split_at(i),
        None => (image_url, ""),
    };
    let (dir, file) = match path.rfind('/') {
        Some(i) => path.split_at(i + 1),
        None => ("", path),
    };
    let (stem, ext) = match file.rfind('.') {
        Some(i) => file.split_at(i),
        None => (file, ""),
    };
    let segments: Vec<&str> = stem.split('_').collect();

    if segments.len() >= 2 && segments.iter().all(|s| !s.is_empty()) {
        // `<id>_<secret>.jpg` is Flickr's unsuffixed default size; the code is appended.
        let base = if segments.len() == 2 {
            stem.to_string()
        } else {
            segments[..segments.len() - 1].join("_")
        };
        for size in PhotoSize::ALL {
            variants.insert(
                size.name(),
                format!("{}{}_{}{}{}", dir, base, size.code(), ext, suffix),
            );
        }
    }

    SizeVariants { original, variants }
}
