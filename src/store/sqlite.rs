use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, OptionalExtension, Row};
use serde::de::DeserializeOwned;

use crate::auth::Session;
use crate::db::DbPool;
use crate::models::image::{ImageMetadataForm, NewImage, UploadedImage};
use crate::models::post::{reading_time_label, Category, StoredPost, StoredPostInput};

use super::Store;

/// SQLite-backed implementation of the Store trait.
/// Plays the part of the managed database for the local backend: it assigns
/// ids, timestamps and the reading-time label itself.
pub struct SqliteStore {
    pub pool: DbPool,
}

impl SqliteStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const POST_COLS: &str = "id, title, category, image_url, images, excerpt, content, read_time, \
     image_metadata, created_at, updated_at, created_by";

const IMAGE_COLS: &str = "id, filename, original_filename, storage_path, public_url, size_bytes, \
     mime_type, width, height, alt_text, caption, photographer, copyright, uploaded_by, \
     created_at, updated_at";

fn json_column<T: DeserializeOwned>(row: &Row, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn post_from_row(row: &Row) -> rusqlite::Result<StoredPost> {
    let category: String = row.get(2)?;
    let category = category.parse::<Category>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, Type::Text, e.into())
    })?;
    Ok(StoredPost {
        id: row.get(0)?,
        title: row.get(1)?,
        category,
        image_url: row.get(3)?,
        images: Some(json_column(row, 4)?),
        excerpt: row.get(5)?,
        content: row.get(6)?,
        read_time: Some(row.get(7)?),
        image_metadata: Some(json_column(row, 8)?),
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
        created_by: row.get(11)?,
    })
}

fn image_from_row(row: &Row) -> rusqlite::Result<UploadedImage> {
    Ok(UploadedImage {
        id: row.get(0)?,
        filename: row.get(1)?,
        original_filename: row.get(2)?,
        storage_path: row.get(3)?,
        public_url: row.get(4)?,
        size_bytes: row.get::<_, i64>(5)?.max(0) as u64,
        mime_type: row.get(6)?,
        width: row.get(7)?,
        height: row.get(8)?,
        alt_text: row.get(9)?,
        caption: row.get(10)?,
        photographer: row.get(11)?,
        copyright: row.get(12)?,
        uploaded_by: row.get(13)?,
        created_at: row.get(14)?,
        updated_at: row.get(15)?,
    })
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| e.to_string())
}

impl Store for SqliteStore {
    // ── Lifecycle ───────────────────────────────────────────────────

    fn run_migrations(&self) -> Result<(), String> {
        crate::db::run_migrations(&self.pool).map_err(|e| e.to_string())
    }

    // ── Posts ────────────────────────────────────────────────────────

    fn post_list(&self, category: Option<Category>) -> Result<Vec<StoredPost>, String> {
        let conn = self.pool.get().map_err(|e| e.to_string())?;
        let rows = match category {
            Some(c) => {
                let mut stmt = conn
                    .prepare(&format!(
                        "SELECT {} FROM posts WHERE category = ?1 ORDER BY created_at DESC",
                        POST_COLS
                    ))
                    .map_err(|e| e.to_string())?;
                let rows = stmt
                    .query_map(params![c.as_str()], post_from_row)
                    .map_err(|e| e.to_string())?
                    .collect::<rusqlite::Result<Vec<_>>>();
                rows
            }
            None => {
                let mut stmt = conn
                    .prepare(&format!(
                        "SELECT {} FROM posts ORDER BY created_at DESC",
                        POST_COLS
                    ))
                    .map_err(|e| e.to_string())?;
                let rows = stmt
                    .query_map([], post_from_row)
                    .map_err(|e| e.to_string())?
                    .collect::<rusqlite::Result<Vec<_>>>();
                rows
            }
        };
        rows.map_err(|e| e.to_string())
    }

    fn post_find_by_id(&self, id: &str) -> Result<Option<StoredPost>, String> {
        let conn = self.pool.get().map_err(|e| e.to_string())?;
        conn.query_row(
            &format!("SELECT {} FROM posts WHERE id = ?1", POST_COLS),
            params![id],
            post_from_row,
        )
        .optional()
        .map_err(|e| e.to_string())
    }

    fn post_create(&self, session: &Session, input: &StoredPostInput) -> Result<StoredPost, String> {
        let conn = self.pool.get().map_err(|e| e.to_string())?;
        let post = input.clone().into_stored(
            uuid::Uuid::new_v4().to_string(),
            Utc::now(),
            Some(session.user_id.clone()),
        );

        conn.execute(
            &format!(
                "INSERT INTO posts ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                POST_COLS
            ),
            params![
                post.id,
                post.title,
                post.category.as_str(),
                post.image_url,
                to_json(&input.images)?,
                post.excerpt,
                post.content,
                post.read_time,
                to_json(&input.image_metadata)?,
                post.created_at,
                post.updated_at,
                post.created_by,
            ],
        )
        .map_err(|e| e.to_string())?;

        Ok(post)
    }

    fn post_update(
        &self,
        _session: &Session,
        id: &str,
        input: &StoredPostInput,
    ) -> Result<Option<StoredPost>, String> {
        let conn = self.pool.get().map_err(|e| e.to_string())?;
        let now: DateTime<Utc> = Utc::now();

        let changed = conn
            .execute(
                "UPDATE posts SET title=?1, category=?2, image_url=?3, images=?4, excerpt=?5,
                 content=?6, read_time=?7, image_metadata=?8, updated_at=?9 WHERE id=?10",
                params![
                    input.title,
                    input.category.as_str(),
                    input.image_url,
                    to_json(&input.images)?,
                    input.excerpt,
                    input.content,
                    reading_time_label(&input.content),
                    to_json(&input.image_metadata)?,
                    now,
                    id,
                ],
            )
            .map_err(|e| e.to_string())?;

        if changed == 0 {
            return Ok(None);
        }
        drop(conn);
        self.post_find_by_id(id)
    }

    fn post_delete(&self, _session: &Session, id: &str) -> Result<bool, String> {
        let conn = self.pool.get().map_err(|e| e.to_string())?;
        let changed = conn
            .execute("DELETE FROM posts WHERE id = ?1", params![id])
            .map_err(|e| e.to_string())?;
        Ok(changed > 0)
    }

    // ── Images ──────────────────────────────────────────────────────

    fn image_list(&self) -> Result<Vec<UploadedImage>, String> {
        let conn = self.pool.get().map_err(|e| e.to_string())?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM images ORDER BY created_at DESC",
                IMAGE_COLS
            ))
            .map_err(|e| e.to_string())?;
        let rows = stmt
            .query_map([], image_from_row)
            .map_err(|e| e.to_string())?
            .collect::<rusqlite::Result<Vec<_>>>();
        rows.map_err(|e| e.to_string())
    }

    fn image_find_by_id(&self, id: &str) -> Result<Option<UploadedImage>, String> {
        let conn = self.pool.get().map_err(|e| e.to_string())?;
        conn.query_row(
            &format!("SELECT {} FROM images WHERE id = ?1", IMAGE_COLS),
            params![id],
            image_from_row,
        )
        .optional()
        .map_err(|e| e.to_string())
    }

    fn image_find_by_urls(&self, urls: &[String]) -> Result<Vec<UploadedImage>, String> {
        if urls.is_empty() {
            return Ok(vec![]);
        }
        let conn = self.pool.get().map_err(|e| e.to_string())?;
        let placeholders: Vec<String> = (1..=urls.len()).map(|i| format!("?{}", i)).collect();
        let sql = format!(
            "SELECT {} FROM images WHERE public_url IN ({})",
            IMAGE_COLS,
            placeholders.join(", ")
        );
        let mut stmt = conn.prepare(&sql).map_err(|e| e.to_string())?;
        let rows = stmt
            .query_map(params_from_iter(urls.iter()), image_from_row)
            .map_err(|e| e.to_string())?
            .collect::<rusqlite::Result<Vec<_>>>();
        rows.map_err(|e| e.to_string())
    }

    fn image_create(&self, session: &Session, image: &NewImage) -> Result<UploadedImage, String> {
        let conn = self.pool.get().map_err(|e| e.to_string())?;
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();

        conn.execute(
            &format!(
                "INSERT INTO images ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
                IMAGE_COLS
            ),
            params![
                id,
                image.filename,
                image.original_filename,
                image.storage_path,
                image.public_url,
                image.size_bytes as i64,
                image.mime_type,
                image.width,
                image.height,
                image.alt_text,
                image.caption,
                image.photographer,
                image.copyright,
                session.user_id,
                now,
                now,
            ],
        )
        .map_err(|e| e.to_string())?;

        Ok(UploadedImage {
            id,
            filename: image.filename.clone(),
            original_filename: image.original_filename.clone(),
            storage_path: image.storage_path.clone(),
            public_url: image.public_url.clone(),
            size_bytes: image.size_bytes,
            mime_type: image.mime_type.clone(),
            width: image.width,
            height: image.height,
            alt_text: image.alt_text.clone(),
            caption: image.caption.clone(),
            photographer: image.photographer.clone(),
            copyright: image.copyright.clone(),
            uploaded_by: Some(session.user_id.clone()),
            created_at: now,
            updated_at: Some(now),
        })
    }

    fn image_update_metadata(
        &self,
        _session: &Session,
        id: &str,
        form: &ImageMetadataForm,
    ) -> Result<Option<UploadedImage>, String> {
        let conn = self.pool.get().map_err(|e| e.to_string())?;
        let changed = conn
            .execute(
                "UPDATE images SET alt_text=?1, caption=?2, photographer=?3, copyright=?4,
                 updated_at=?5 WHERE id=?6",
                params![
                    form.alt_text,
                    form.caption,
                    form.photographer,
                    form.copyright,
                    Utc::now(),
                    id,
                ],
            )
            .map_err(|e| e.to_string())?;
        if changed == 0 {
            return Ok(None);
        }
        drop(conn);
        self.image_find_by_id(id)
    }

    fn image_delete(&self, _session: &Session, id: &str) -> Result<bool, String> {
        let conn = self.pool.get().map_err(|e| e.to_string())?;
        let changed = conn
            .execute("DELETE FROM images WHERE id = ?1", params![id])
            .map_err(|e| e.to_string())?;
        Ok(changed > 0)
    }
}
