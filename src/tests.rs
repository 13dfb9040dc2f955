#![cfg(test)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use rocket::figment::Figment;
use rocket::http::{ContentType, Status};
use rocket::local::blocking::Client;

use crate::attribution;
use crate::auth::local::{seed_admin, LocalAuth};
use crate::auth::Session;
use crate::config::AppConfig;
use crate::db::{test_pool, DbPool};
use crate::error::AppError;
use crate::images::{self, UploadRequest};
use crate::models::attribution::{Attribution, EmbedProvenance};
use crate::models::image::{ImageMetadataForm, NewImage, UploadedImage};
use crate::models::post::{AppPost, Category, PostForm, StoredPost, StoredPostInput};
use crate::posts;
use crate::storage::local::LocalStorage;
use crate::storage::ObjectStorage;
use crate::store::sqlite::SqliteStore;
use crate::store::Store;
use crate::{build_rocket, Backends};

const TEST_SECRET: &str =
    "DwUfsb2ymrX7+Wi1M84J9GtVeqpdGO2lqy2esrWJII8+wR4/zWdHHCwExRQLbCtT0PTAXH91TfleNqIBADuEKw==";
const ADMIN_EMAIL: &str = "kate@example.com";
const ADMIN_PASSWORD: &str = "summit-2026";

fn temp_dir() -> PathBuf {
    std::env::temp_dir().join(format!("basecamp-test-{}", uuid::Uuid::new_v4()))
}

fn files_in(dir: &PathBuf) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}

fn tiny_png() -> Vec<u8> {
    let img = image::RgbImage::new(3, 2);
    let mut out = std::io::Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

fn make_post_form(title: &str, category: Category) -> PostForm {
    PostForm {
        title: title.to_string(),
        category,
        image: "https://images.example.com/ridge.jpg".to_string(),
        images: Vec::new(),
        excerpt: "Up and over the ridge.".to_string(),
        content: "We left at dawn.\n\n## The ridge\n\nWindy, but clear.".to_string(),
        ..PostForm::empty()
    }
}

fn png_upload(name: &str, photographer: Option<&str>) -> UploadRequest {
    UploadRequest {
        original_filename: name.to_string(),
        content_type: Some("image/png".to_string()),
        bytes: tiny_png(),
        alt_text: None,
        caption: Some("Camp at dusk".to_string()),
        photographer: photographer.map(str::to_string),
        copyright: None,
    }
}

// ═══════════════════════════════════════════════════════════
// Recording store
// ═══════════════════════════════════════════════════════════

/// Records which store calls were made; image writes can be made to fail.
#[derive(Default)]
struct RecordingStore {
    calls: Mutex<Vec<String>>,
    created: Mutex<Vec<StoredPostInput>>,
    fail_image_create: bool,
}

impl RecordingStore {
    fn record(&self, call: &str) {
        self.calls.lock().unwrap().push(call.to_string());
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Store for RecordingStore {
    fn run_migrations(&self) -> Result<(), String> {
        Ok(())
    }

    fn post_list(&self, _category: Option<Category>) -> Result<Vec<StoredPost>, String> {
        self.record("post_list");
        Ok(Vec::new())
    }

    fn post_find_by_id(&self, _id: &str) -> Result<Option<StoredPost>, String> {
        self.record("post_find_by_id");
        Ok(None)
    }

    fn post_create(&self, session: &Session, input: &StoredPostInput) -> Result<StoredPost, String> {
        self.record("post_create");
        self.created.lock().unwrap().push(input.clone());
        Ok(input
            .clone()
            .into_stored("post-1".into(), chrono::Utc::now(), Some(session.user_id.clone())))
    }

    fn post_update(
        &self,
        _session: &Session,
        _id: &str,
        _input: &StoredPostInput,
    ) -> Result<Option<StoredPost>, String> {
        self.record("post_update");
        Ok(None)
    }

    fn post_delete(&self, _session: &Session, _id: &str) -> Result<bool, String> {
        self.record("post_delete");
        Ok(false)
    }

    fn image_list(&self) -> Result<Vec<UploadedImage>, String> {
        self.record("image_list");
        Ok(Vec::new())
    }

    fn image_find_by_id(&self, _id: &str) -> Result<Option<UploadedImage>, String> {
        self.record("image_find_by_id");
        Ok(None)
    }

    fn image_find_by_urls(&self, _urls: &[String]) -> Result<Vec<UploadedImage>, String> {
        self.record("image_find_by_urls");
        Ok(Vec::new())
    }

    fn image_create(&self, _session: &Session, image: &NewImage) -> Result<UploadedImage, String> {
        self.record("image_create");
        if self.fail_image_create {
            return Err("insert rejected".into());
        }
        Ok(UploadedImage {
            id: "img-1".into(),
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
            uploaded_by: None,
            created_at: chrono::Utc::now(),
            updated_at: None,
        })
    }

    fn image_update_metadata(
        &self,
        _session: &Session,
        _id: &str,
        _form: &ImageMetadataForm,
    ) -> Result<Option<UploadedImage>, String> {
        self.record("image_update_metadata");
        Ok(None)
    }

    fn image_delete(&self, _session: &Session, _id: &str) -> Result<bool, String> {
        self.record("image_delete");
        Ok(false)
    }
}

// ═══════════════════════════════════════════════════════════
// Post service
// ═══════════════════════════════════════════════════════════

#[test]
fn invalid_post_never_reaches_the_store() {
    let store = RecordingStore::default();
    let session = Session::for_tests();
    let form = make_post_form("   ", Category::Hiking);

    let err = posts::create(&store, &session, &form).unwrap_err();
    assert!(err.is_validation());
    assert!(store.calls().is_empty());
}

#[test]
fn valid_post_is_created_once_with_trimmed_fields() {
    let store = RecordingStore::default();
    let session = Session::for_tests();
    let mut form = make_post_form("  Dawn on the Ridge  ", Category::Mountaineering);
    form.images = vec!["  https://images.example.com/b.jpg ".into(), "".into()];

    let id = posts::create(&store, &session, &form).unwrap();
    assert_eq!(id, "post-1");
    assert_eq!(store.calls(), vec!["post_create".to_string()]);

    let created = store.created.lock().unwrap();
    assert_eq!(created[0].title, "Dawn on the Ridge");
    assert_eq!(created[0].images, vec!["https://images.example.com/b.jpg".to_string()]);
}

#[test]
fn updating_a_missing_post_is_not_found() {
    let store = RecordingStore::default();
    let session = Session::for_tests();
    let form = make_post_form("Ridge", Category::Hiking);
    assert!(matches!(
        posts::update(&store, &session, "missing", &form),
        Err(AppError::NotFound)
    ));
    assert!(matches!(
        posts::delete(&store, &session, "missing"),
        Err(AppError::NotFound)
    ));
}

#[test]
fn posts_without_storage_images_skip_the_lookup() {
    let store = RecordingStore::default();
    let post = AppPost::from(
        make_post_form("Ridge", Category::Hiking)
            .to_storage()
            .into_stored("p".into(), chrono::Utc::now(), None),
    );
    let index = posts::image_index(&store, "/uploads/", &post).unwrap();
    assert!(index.is_empty());
    assert!(store.calls().is_empty());
}

// ═══════════════════════════════════════════════════════════
// SQLite store
// ═══════════════════════════════════════════════════════════

#[test]
fn sqlite_post_crud() {
    let store = SqliteStore::new(test_pool());
    let session = Session::for_tests();

    let id = posts::create(&store, &session, &make_post_form("First Light", Category::Hiking)).unwrap();
    let post = posts::find(&store, &id).unwrap();
    assert_eq!(post.title, "First Light");
    assert_eq!(post.category, Category::Hiking);
    assert_eq!(post.read_time, "1 min read");
    assert_eq!(post.date, chrono::Utc::now().format("%Y-%m-%d").to_string());

    let mut form = PostForm::from(&post);
    form.title = "First Light, Revisited".into();
    form.category = Category::Travel;
    posts::update(&store, &session, &id, &form).unwrap();
    let post = posts::find(&store, &id).unwrap();
    assert_eq!(post.title, "First Light, Revisited");
    assert_eq!(post.category, Category::Travel);

    posts::delete(&store, &session, &id).unwrap();
    assert!(matches!(posts::find(&store, &id), Err(AppError::NotFound)));
}

#[test]
fn sqlite_lists_newest_first_and_filters() {
    let store = SqliteStore::new(test_pool());
    let session = Session::for_tests();

    posts::create(&store, &session, &make_post_form("Older", Category::Food)).unwrap();
    std::thread::sleep(std::time::Duration::from_millis(5));
    posts::create(&store, &session, &make_post_form("Newer", Category::Hiking)).unwrap();

    let all = posts::list(&store, None).unwrap();
    let titles: Vec<&str> = all.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, vec!["Newer", "Older"]);

    let food = posts::list(&store, Some(Category::Food)).unwrap();
    assert_eq!(food.len(), 1);
    assert_eq!(food[0].title, "Older");
    assert!(posts::list(&store, Some(Category::Lifestyle)).unwrap().is_empty());
}

#[test]
fn sqlite_keeps_attribution_json() {
    let store = SqliteStore::new(test_pool());
    let session = Session::for_tests();
    let flickr = "https://live.staticflickr.com/65535/53912345678_abcdef1234_b.jpg".to_string();

    let mut form = make_post_form("Aiguille", Category::Mountaineering);
    form.images = vec![flickr.clone()];
    form.image_metadata.insert(
        flickr.clone(),
        Attribution::Embed(EmbedProvenance {
            owner_id: "12345678@N00".into(),
            photo_id: "53912345678".into(),
            album_id: None,
            photographer: "Ines Roth".into(),
            title: "North face".into(),
            page_url: "https://www.flickr.com/photos/12345678@N00/53912345678".into(),
            width: 1024,
            height: 683,
        }),
    );

    let id = posts::create(&store, &session, &form).unwrap();
    let post = posts::find(&store, &id).unwrap();
    assert_eq!(post.image_metadata, form.image_metadata);
    assert_eq!(post.images, vec![flickr]);
}

// ═══════════════════════════════════════════════════════════
// Image service
// ═══════════════════════════════════════════════════════════

#[test]
fn failed_record_write_removes_the_stored_object() {
    let dir = temp_dir();
    let storage = LocalStorage::new(&dir);
    let store = RecordingStore {
        fail_image_create: true,
        ..RecordingStore::default()
    };
    let session = Session::for_tests();

    let err = images::upload(&store, &storage, &session, png_upload("camp.png", None), images::MAX_UPLOAD_BYTES)
        .unwrap_err();
    assert!(matches!(err, AppError::Backend { .. }));
    assert_eq!(store.calls(), vec!["image_create".to_string()]);
    assert_eq!(files_in(&dir), 0);
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn rejected_upload_touches_nothing() {
    let dir = temp_dir();
    let storage = LocalStorage::new(&dir);
    let store = RecordingStore::default();
    let session = Session::for_tests();

    let mut request = png_upload("notes.txt", None);
    request.content_type = Some("text/plain".into());
    let err = images::upload(&store, &storage, &session, request, images::MAX_UPLOAD_BYTES).unwrap_err();
    assert!(err.is_validation());
    assert!(store.calls().is_empty());
    assert!(!dir.exists());
}

#[test]
fn upload_records_dimensions_and_defaults() {
    let dir = temp_dir();
    let storage = LocalStorage::new(&dir);
    let store = SqliteStore::new(test_pool());
    let session = Session::for_tests();

    let image = images::upload(&store, &storage, &session, png_upload("camp.png", None), images::MAX_UPLOAD_BYTES)
        .unwrap();
    assert_eq!((image.width, image.height), (Some(3), Some(2)));
    assert_eq!(image.mime_type, "image/png");
    assert_eq!(image.photographer, crate::models::attribution::DEFAULT_PHOTOGRAPHER);
    assert_eq!(image.caption.as_deref(), Some("Camp at dusk"));
    assert!(image.public_url.starts_with("/uploads/"));
    assert!(image.filename.ends_with(".png"));
    assert_eq!(files_in(&dir), 1);

    let listed = store.image_list().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, image.id);

    images::delete(&store, &storage, &session, &image.id).unwrap();
    assert_eq!(files_in(&dir), 0);
    assert!(store.image_find_by_id(&image.id).unwrap().is_none());
    assert!(matches!(
        images::delete(&store, &storage, &session, &image.id),
        Err(AppError::NotFound)
    ));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn metadata_edit_changes_the_credit() {
    let dir = temp_dir();
    let storage = LocalStorage::new(&dir);
    let store = SqliteStore::new(test_pool());
    let session = Session::for_tests();

    let image = images::upload(&store, &storage, &session, png_upload("tent.png", Some("Sam")), images::MAX_UPLOAD_BYTES)
        .unwrap();
    let mut form = make_post_form("Tent Life", Category::Lifestyle);
    form.image = image.public_url.clone();
    let id = posts::create(&store, &session, &form).unwrap();

    let post = posts::find(&store, &id).unwrap();
    let index = posts::image_index(&store, &storage.public_prefix(), &post).unwrap();
    let credits = attribution::credits(&post, &index);
    assert_eq!(credits[0].photographer, "Sam");
    assert_eq!(credits[0].title.as_deref(), Some("Camp at dusk"));

    let edit = ImageMetadataForm {
        alt_text: Some("Orange tent under stars".into()),
        caption: None,
        photographer: "Alex".into(),
        copyright: "".into(),
    };
    images::update_metadata(&store, &session, &image.id, &edit).unwrap();

    let index = posts::image_index(&store, &storage.public_prefix(), &post).unwrap();
    let credits = attribution::credits(&post, &index);
    assert_eq!(credits[0].photographer, "Alex");
    assert_eq!(credits[0].alt, "Orange tent under stars");
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn library_edits_reach_posts_saved_from_the_editor() {
    let dir = temp_dir();
    let storage = LocalStorage::new(&dir);
    let store = SqliteStore::new(test_pool());
    let session = Session::for_tests();

    let image = images::upload(&store, &storage, &session, png_upload("camp.png", None), images::MAX_UPLOAD_BYTES)
        .unwrap();
    let mut form = make_post_form("Night at Camp", Category::Hiking);
    form.image = image.public_url.clone();
    posts::attach_upload_attribution(&store, &storage.public_prefix(), &mut form).unwrap();
    assert_eq!(
        form.image_metadata[&image.public_url].title(),
        Some("Camp at dusk")
    );
    let id = posts::create(&store, &session, &form).unwrap();

    let edit = ImageMetadataForm {
        alt_text: None,
        caption: Some("Moonrise over camp".into()),
        photographer: "Alex".into(),
        copyright: "".into(),
    };
    images::update_metadata(&store, &session, &image.id, &edit).unwrap();

    let post = posts::find(&store, &id).unwrap();
    let index = posts::image_index(&store, &storage.public_prefix(), &post).unwrap();
    let credits = attribution::credits(&post, &index);
    assert_eq!(credits[0].photographer, "Alex");
    assert_eq!(credits[0].title.as_deref(), Some("Moonrise over camp"));
    assert_eq!(credits[0].alt, "Moonrise over camp");

    // With the record gone, the snapshot saved with the post still credits it.
    images::delete(&store, &storage, &session, &image.id).unwrap();
    let index = posts::image_index(&store, &storage.public_prefix(), &post).unwrap();
    let credits = attribution::credits(&post, &index);
    assert_eq!(credits[0].title.as_deref(), Some("Camp at dusk"));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn unconvertible_heic_is_rejected_before_storage() {
    let dir = temp_dir();
    let storage = LocalStorage::new(&dir);
    let store = RecordingStore::default();
    let session = Session::for_tests();

    let request = UploadRequest {
        original_filename: "IMG_0042.HEIC".into(),
        content_type: Some("application/octet-stream".into()),
        bytes: b"definitely not a heic container".to_vec(),
        alt_text: None,
        caption: None,
        photographer: None,
        copyright: None,
    };
    let err = images::upload(&store, &storage, &session, request, images::MAX_UPLOAD_BYTES).unwrap_err();
    assert!(err.is_validation());
    assert!(err.to_string().contains("Could not convert this HEIC image"));
    assert!(store.calls().is_empty());
    assert!(!dir.exists());
}

// ═══════════════════════════════════════════════════════════
// HTTP
// ═══════════════════════════════════════════════════════════

struct TestSite {
    client: Client,
    store: Arc<dyn Store>,
    uploads: PathBuf,
}

impl TestSite {
    fn new() -> Self {
        Self::with_config(|_| {})
    }

    fn with_config(adjust: impl FnOnce(&mut AppConfig)) -> Self {
        let pool: DbPool = test_pool();
        seed_admin(&pool, ADMIN_EMAIL, ADMIN_PASSWORD).unwrap();
        let uploads = temp_dir();
        std::fs::create_dir_all(&uploads).unwrap();

        let mut config = AppConfig {
            uploads_dir: uploads.to_string_lossy().to_string(),
            site_name: "Trail Notes".into(),
            ..AppConfig::default()
        };
        adjust(&mut config);
        let store: Arc<dyn Store> = Arc::new(SqliteStore::new(pool.clone()));
        let backends = Backends {
            store: Arc::clone(&store),
            storage: Arc::new(LocalStorage::new(&uploads)),
            auth: Arc::new(LocalAuth::new(pool, config.session_expiry_hours)),
        };
        let figment = Figment::from(rocket::Config::debug_default())
            .merge(("secret_key", TEST_SECRET))
            .merge(("template_dir", "website/templates"))
            .merge(("log_level", "off"));

        let client = Client::tracked(build_rocket(figment, config, backends)).unwrap();
        TestSite { client, store, uploads }
    }

    fn add_post(&self, title: &str, category: Category) -> String {
        posts::create(self.store.as_ref(), &Session::for_tests(), &make_post_form(title, category)).unwrap()
    }

    fn sign_in(&self, password: &str) -> rocket::local::blocking::LocalResponse<'_> {
        self.client
            .post("/admin/login")
            .header(ContentType::Form)
            .body(format!("email={}&password={}", ADMIN_EMAIL, password))
            .dispatch()
    }
}

impl Drop for TestSite {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.uploads);
    }
}

fn location(response: &rocket::local::blocking::LocalResponse<'_>) -> String {
    response.headers().get_one("Location").unwrap_or_default().to_string()
}

fn form_body(fields: &[(&str, &str)]) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(fields)
        .finish()
}

const BOUNDARY: &str = "basecamp-test-boundary";

/// A multipart upload form: text fields, then the file part.
fn multipart(filename: &str, content_type: &str, bytes: &[u8], fields: &[(&str, &str)]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(
        format!(
            "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
            BOUNDARY, filename, content_type
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn multipart_type() -> ContentType {
    ContentType::new("multipart", "form-data").with_params(("boundary", BOUNDARY))
}

const FLICKR_SNIPPET: &str = r#"<a data-flickr-embed="true" href="https://www.flickr.com/photos/12345678@N00/53912345678/in/album-72177720312345678/" title="North face"><img src="https://live.staticflickr.com/65535/53912345678_abcdef1234_b.jpg" width="1024" height="683" alt="North face"/></a><script async src="//embedr.flickr.com/assets/client-code.js" charset="utf-8"></script>"#;
const FLICKR_IMAGE: &str = "https://live.staticflickr.com/65535/53912345678_abcdef1234_b.jpg";

#[test]
fn home_lists_posts_and_filters_by_category() {
    let site = TestSite::new();
    site.add_post("Pasta at Altitude", Category::Food);
    site.add_post("Crossing the Col", Category::Hiking);

    let body = site.client.get("/").dispatch().into_string().unwrap();
    assert!(body.contains("Trail Notes"));
    assert!(body.contains("Pasta at Altitude"));
    assert!(body.contains("Crossing the Col"));

    let body = site.client.get("/?category=food").dispatch().into_string().unwrap();
    assert!(body.contains("Pasta at Altitude"));
    assert!(!body.contains("Crossing the Col"));

    let body = site.client.get("/?category=lifestyle").dispatch().into_string().unwrap();
    assert!(body.contains("No lifestyle posts yet."));

    // Unknown categories fall back to everything.
    let body = site.client.get("/?category=skiing").dispatch().into_string().unwrap();
    assert!(body.contains("Crossing the Col"));
}

#[test]
fn post_page_renders_body_and_credits() {
    let site = TestSite::new();
    let id = site.add_post("Crossing the Col", Category::Hiking);

    let response = site.client.get(format!("/posts/{}", id)).dispatch();
    assert_eq!(response.status(), Status::Ok);
    let body = response.into_string().unwrap();
    assert!(body.contains("<h3>The ridge</h3>"));
    assert!(body.contains(crate::models::attribution::DEFAULT_PHOTOGRAPHER));

    let response = site.client.get("/posts/no-such-post").dispatch();
    assert_eq!(response.status(), Status::NotFound);
}

#[test]
fn json_api_lists_and_validates_category() {
    let site = TestSite::new();
    let id = site.add_post("Crossing the Col", Category::Hiking);

    let response = site.client.get("/api/posts").dispatch();
    assert_eq!(response.status(), Status::Ok);
    let list: Vec<AppPost> = response.into_json().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].id, id);

    let response = site.client.get("/api/posts?category=skiing").dispatch();
    assert_eq!(response.status(), Status::BadRequest);

    let response = site.client.get(format!("/api/posts/{}", id)).dispatch();
    let post: AppPost = response.into_json().unwrap();
    assert_eq!(post.title, "Crossing the Col");

    let response = site.client.get("/api/posts/missing").dispatch();
    assert_eq!(response.status(), Status::NotFound);
}

#[test]
fn admin_requires_a_session() {
    let site = TestSite::new();

    let response = site.client.get("/admin/posts").dispatch();
    assert_eq!(response.status(), Status::SeeOther);
    assert_eq!(location(&response), "/admin/login");

    let response = site.client.post("/admin/posts/anything/delete").dispatch();
    assert_eq!(response.status(), Status::SeeOther);
    assert_eq!(location(&response), "/admin/login");

    let response = site.client.get("/admin/login").dispatch();
    assert_eq!(response.status(), Status::Ok);
    assert!(response
        .headers()
        .get_one("Cache-Control")
        .unwrap_or_default()
        .contains("no-store"));
}

#[test]
fn sign_in_opens_the_admin_and_sign_out_closes_it() {
    let site = TestSite::new();
    site.add_post("Crossing the Col", Category::Hiking);

    let response = site.sign_in("wrong");
    assert_eq!(response.status(), Status::Ok);
    assert!(response.into_string().unwrap().contains("Invalid credentials"));

    let response = site.sign_in(ADMIN_PASSWORD);
    assert_eq!(response.status(), Status::SeeOther);
    assert_eq!(location(&response), "/admin/posts");

    let response = site.client.get("/admin/posts").dispatch();
    assert_eq!(response.status(), Status::Ok);
    assert!(response.into_string().unwrap().contains("Crossing the Col"));

    let response = site.client.get("/admin/api/media").dispatch();
    assert_eq!(response.status(), Status::Ok);
    let media: Vec<UploadedImage> = response.into_json().unwrap();
    assert!(media.is_empty());

    let response = site.client.post("/admin/logout").dispatch();
    assert_eq!(response.status(), Status::SeeOther);
    let response = site.client.get("/admin/posts").dispatch();
    assert_eq!(response.status(), Status::SeeOther);
}

#[test]
fn sign_in_is_rate_limited() {
    let site = TestSite::new();
    for _ in 0..5 {
        let body = site.sign_in("wrong").into_string().unwrap();
        assert!(body.contains("Invalid credentials"));
    }
    let body = site.sign_in(ADMIN_PASSWORD).into_string().unwrap();
    assert!(body.contains("Too many login attempts"));
}

#[test]
fn admin_embed_preview() {
    let site = TestSite::new();
    site.sign_in(ADMIN_PASSWORD);

    let response = site
        .client
        .post("/admin/api/embed")
        .header(ContentType::JSON)
        .body(serde_json::json!({ "snippet": FLICKR_SNIPPET }).to_string())
        .dispatch();
    assert_eq!(response.status(), Status::Ok);
    let preview: serde_json::Value = response.into_json().unwrap();
    assert_eq!(preview["photoId"], "53912345678");
    assert_eq!(preview["albumId"], "72177720312345678");
    assert!(preview["sizes"]["variants"]["small"].as_str().unwrap().ends_with("_m.jpg"));

    let response = site
        .client
        .post("/admin/api/embed")
        .header(ContentType::JSON)
        .body(r#"{"snippet":"<p>nope</p>"}"#)
        .dispatch();
    assert_eq!(response.status(), Status::BadRequest);
    let body: serde_json::Value = response.into_json().unwrap();
    assert_eq!(body["error"], "Please paste valid embed code");
}

#[test]
fn admin_api_answers_json_without_a_session() {
    let site = TestSite::new();

    let response = site.client.get("/admin/api/media").dispatch();
    assert_eq!(response.status(), Status::Unauthorized);
    let body: serde_json::Value = response.into_json().unwrap();
    assert_eq!(body["error"], "Sign in required");

    let response = site
        .client
        .post("/admin/api/embed")
        .header(ContentType::JSON)
        .body(serde_json::json!({ "snippet": FLICKR_SNIPPET }).to_string())
        .dispatch();
    assert_eq!(response.status(), Status::Unauthorized);

    // Admin pages still send people to the login form.
    let response = site.client.get("/admin/media").dispatch();
    assert_eq!(location(&response), "/admin/login");

    site.sign_in(ADMIN_PASSWORD);
    let response = site.client.get("/admin/api/nothing-here").dispatch();
    assert_eq!(response.status(), Status::NotFound);
}

#[test]
fn media_upload_edit_and_delete() {
    let site = TestSite::new();
    site.sign_in(ADMIN_PASSWORD);

    let response = site
        .client
        .post("/admin/media/upload")
        .header(multipart_type())
        .body(multipart(
            "camp.png",
            "image/png",
            &tiny_png(),
            &[("caption", "Camp at dusk"), ("photographer", "Sam")],
        ))
        .dispatch();
    assert_eq!(response.status(), Status::SeeOther);
    assert_eq!(location(&response), "/admin/media");

    let listed = site.store.image_list().unwrap();
    assert_eq!(listed.len(), 1);
    let image = &listed[0];
    assert_eq!(image.original_filename, "camp.png");
    assert_eq!(image.photographer, "Sam");
    assert_eq!((image.width, image.height), (Some(3), Some(2)));
    assert_eq!(files_in(&site.uploads), 1);

    let body = site.client.get("/admin/media").dispatch().into_string().unwrap();
    assert!(body.contains("Uploaded camp.png"));

    let response = site
        .client
        .post(format!("/admin/media/{}", image.id))
        .header(ContentType::Form)
        .body(form_body(&[
            ("alt_text", "Tent under stars"),
            ("caption", ""),
            ("photographer", "Alex"),
            ("copyright", ""),
        ]))
        .dispatch();
    assert_eq!(response.status(), Status::SeeOther);
    let edited = site.store.image_find_by_id(&image.id).unwrap().unwrap();
    assert_eq!(edited.photographer, "Alex");
    assert_eq!(edited.alt_text.as_deref(), Some("Tent under stars"));
    assert_eq!(edited.caption, None);

    let response = site
        .client
        .post(format!("/admin/media/{}/delete", image.id))
        .dispatch();
    assert_eq!(response.status(), Status::SeeOther);
    assert!(site.store.image_list().unwrap().is_empty());
    assert_eq!(files_in(&site.uploads), 0);
}

#[test]
fn oversized_uploads_come_back_with_a_message() {
    let site = TestSite::with_config(|c| c.max_upload_mb = 1);
    site.sign_in(ADMIN_PASSWORD);
    let mib = 1024 * 1024;

    // Over the cap but within the form limit: the size check answers.
    let response = site
        .client
        .post("/admin/media/upload")
        .header(multipart_type())
        .body(multipart("big.png", "image/png", &vec![0u8; mib + 100], &[]))
        .dispatch();
    assert_eq!(response.status(), Status::SeeOther);
    assert_eq!(location(&response), "/admin/media");
    let body = site.client.get("/admin/media").dispatch().into_string().unwrap();
    assert!(body.contains("File is too large (max 1 MB)"));

    // Past the form limit: Rocket refuses the body and the catcher answers.
    let response = site
        .client
        .post("/admin/media/upload")
        .header(multipart_type())
        .body(multipart("huge.png", "image/png", &vec![0u8; 2 * mib + 100], &[]))
        .dispatch();
    assert_eq!(response.status(), Status::SeeOther);
    assert_eq!(location(&response), "/admin/media");
    let body = site.client.get("/admin/media").dispatch().into_string().unwrap();
    assert!(body.contains("File is too large (max 1 MB)"));

    assert!(site.store.image_list().unwrap().is_empty());
    assert_eq!(files_in(&site.uploads), 0);
}

#[test]
fn editor_saves_uploads_and_embeds() {
    let site = TestSite::new();
    site.sign_in(ADMIN_PASSWORD);

    site.client
        .post("/admin/media/upload")
        .header(multipart_type())
        .body(multipart("camp.png", "image/png", &tiny_png(), &[("caption", "Camp at dusk")]))
        .dispatch();
    let image = site.store.image_list().unwrap().remove(0);

    // "Add embed" brings the editor back with the Flickr photo attached.
    let draft = [
        ("title", "Night at Camp"),
        ("category", "hiking"),
        ("image", image.public_url.as_str()),
        ("images", ""),
        ("excerpt", "Moon over the tents."),
        ("content", "We pitched early."),
        ("attribution_json", ""),
        ("embed_code", FLICKR_SNIPPET),
        ("embed_photographer", "Ines Roth"),
        ("action", "attach_embed"),
    ];
    let response = site
        .client
        .post("/admin/posts")
        .header(ContentType::Form)
        .body(form_body(&draft))
        .dispatch();
    assert_eq!(response.status(), Status::Ok);
    let body = response.into_string().unwrap();
    // Tera escapes the slashes, so look for the file name.
    assert!(body.contains("53912345678_abcdef1234_b.jpg"));
    assert!(body.contains("Ines Roth"));
    assert!(site.store.post_list(None).unwrap().is_empty());

    // A missing photographer keeps the embed out of the post.
    let mut no_name = draft;
    no_name[8] = ("embed_photographer", " ");
    let body = site
        .client
        .post("/admin/posts")
        .header(ContentType::Form)
        .body(form_body(&no_name))
        .dispatch()
        .into_string()
        .unwrap();
    assert!(body.contains("Photographer name is required for Flickr photos"));

    // Saving carries the embed attribution; the upload gets its own from the record.
    let mut with_embed = PostForm::empty();
    posts::attach_embed(&mut with_embed, FLICKR_SNIPPET, "Ines Roth").unwrap();
    let attribution_json = serde_json::to_string(&with_embed.image_metadata).unwrap();
    let save = [
        ("title", "Night at Camp"),
        ("category", "hiking"),
        ("image", image.public_url.as_str()),
        ("images", FLICKR_IMAGE),
        ("excerpt", "Moon over the tents."),
        ("content", "We pitched early."),
        ("attribution_json", attribution_json.as_str()),
    ];
    let response = site
        .client
        .post("/admin/posts")
        .header(ContentType::Form)
        .body(form_body(&save))
        .dispatch();
    assert_eq!(response.status(), Status::SeeOther);
    assert_eq!(location(&response), "/admin/posts");

    let stored = site.store.post_list(None).unwrap().remove(0);
    let post = AppPost::from(stored);
    assert_eq!(post.images, vec![FLICKR_IMAGE.to_string()]);
    assert!(post.image_metadata[FLICKR_IMAGE].is_embed());
    assert!(!post.image_metadata[&image.public_url].is_embed());

    // A later caption edit in the library shows on the saved post.
    site.client
        .post(format!("/admin/media/{}", image.id))
        .header(ContentType::Form)
        .body(form_body(&[
            ("alt_text", ""),
            ("caption", "Moonrise over camp"),
            ("photographer", "Alex"),
            ("copyright", ""),
        ]))
        .dispatch();
    let body = site
        .client
        .get(format!("/posts/{}", post.id))
        .dispatch()
        .into_string()
        .unwrap();
    assert!(body.contains("Moonrise over camp"));
    assert!(!body.contains("Camp at dusk"));
    assert!(body.contains("Alex"));
    assert!(body.contains("Ines Roth"));

    // Updating drops the embed, and its attribution with it.
    let update = [
        ("title", "Night at Camp"),
        ("category", "hiking"),
        ("image", image.public_url.as_str()),
        ("images", ""),
        ("excerpt", "Moon over the tents."),
        ("content", "We pitched early."),
        ("attribution_json", attribution_json.as_str()),
    ];
    let response = site
        .client
        .post(format!("/admin/posts/{}", post.id))
        .header(ContentType::Form)
        .body(form_body(&update))
        .dispatch();
    assert_eq!(response.status(), Status::SeeOther);
    let post = posts::find(site.store.as_ref(), &post.id).unwrap();
    assert!(post.images.is_empty());
    assert!(!post.image_metadata.contains_key(FLICKR_IMAGE));
    assert!(post.image_metadata.contains_key(&image.public_url));
}
