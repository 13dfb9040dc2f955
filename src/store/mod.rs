use crate::auth::Session;
use crate::models::image::{ImageMetadataForm, NewImage, UploadedImage};
use crate::models::post::{Category, StoredPost, StoredPostInput};

pub mod hosted;
pub mod sqlite;

/// Unified data-access trait. Every read and write of posts and image records
/// goes through here.
/// Implementations: `SqliteStore` (rusqlite/r2d2, local backend) and
/// `HostedStore` (PostgREST over reqwest, hosted backend).
///
/// Writes take the signed-in [`Session`]: it names the creator and, for the
/// hosted backend, carries the access token row-level security checks.
/// Identifiers, reading time and timestamps are always assigned here, never
/// by callers.
pub trait Store: Send + Sync {
    // ── Lifecycle ───────────────────────────────────────────────────
    fn run_migrations(&self) -> Result<(), String>;

    // ── Posts ────────────────────────────────────────────────────────
    /// Newest first, optionally filtered by category.
    fn post_list(&self, category: Option<Category>) -> Result<Vec<StoredPost>, String>;
    fn post_find_by_id(&self, id: &str) -> Result<Option<StoredPost>, String>;
    fn post_create(&self, session: &Session, input: &StoredPostInput) -> Result<StoredPost, String>;
    /// `Ok(None)` when no post has this id.
    fn post_update(
        &self,
        session: &Session,
        id: &str,
        input: &StoredPostInput,
    ) -> Result<Option<StoredPost>, String>;
    /// `Ok(false)` when no post has this id.
    fn post_delete(&self, session: &Session, id: &str) -> Result<bool, String>;

    // ── Images ──────────────────────────────────────────────────────
    /// Newest first.
    fn image_list(&self) -> Result<Vec<UploadedImage>, String>;
    fn image_find_by_id(&self, id: &str) -> Result<Option<UploadedImage>, String>;
    /// Records whose public URL is one of `urls` (exact match).
    fn image_find_by_urls(&self, urls: &[String]) -> Result<Vec<UploadedImage>, String>;
    fn image_create(&self, session: &Session, image: &NewImage) -> Result<UploadedImage, String>;
    fn image_update_metadata(
        &self,
        session: &Session,
        id: &str,
        form: &ImageMetadataForm,
    ) -> Result<Option<UploadedImage>, String>;
    fn image_delete(&self, session: &Session, id: &str) -> Result<bool, String>;
}
