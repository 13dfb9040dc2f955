use std::sync::Arc;

use rocket::form::Form;
use rocket::request::FlashMessage;
use rocket::response::{Flash, Redirect};
use rocket::State;
use rocket_dyn_templates::Template;
use serde::Serialize;
use serde_json::json;

use super::admin_base;
use crate::config::AppConfig;
use crate::error::AppError;
use crate::models::attribution::AttributionMap;
use crate::models::post::{Category, PostForm};
use crate::posts;
use crate::routes::blocking;
use crate::security::auth::AdminSession;
use crate::storage::ObjectStorage;
use crate::store::Store;

pub fn routes() -> Vec<rocket::Route> {
    routes![posts_list, posts_new, posts_create, posts_edit, posts_update, posts_delete]
}

// ── Editor form ─────────────────────────────────────────

/// What the post editor submits. Secondary images arrive one URL per line;
/// the attribution map rides along as JSON in a hidden field.
#[derive(Debug, FromForm)]
pub struct PostSubmission {
    pub title: String,
    pub category: String,
    pub image: String,
    pub images: String,
    pub excerpt: String,
    pub content: String,
    pub attribution_json: String,
    pub embed_code: Option<String>,
    pub embed_photographer: Option<String>,
    /// `attach_embed` adds the pasted embed and shows the editor again.
    pub action: Option<String>,
}

impl PostSubmission {
    fn to_form(&self) -> Result<PostForm, AppError> {
        let category = self.category.parse::<Category>().map_err(AppError::Validation)?;
        let image_metadata: AttributionMap = if self.attribution_json.trim().is_empty() {
            AttributionMap::new()
        } else {
            serde_json::from_str(&self.attribution_json)
                .map_err(|_| AppError::validation("Image attribution data is malformed"))?
        };
        Ok(PostForm {
            title: self.title.clone(),
            category,
            image: self.image.trim().to_string(),
            images: self
                .images
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect(),
            excerpt: self.excerpt.clone(),
            content: self.content.clone(),
            image_metadata,
        })
    }

    fn attaching_embed(&self) -> bool {
        self.action.as_deref() == Some("attach_embed")
    }
}

#[derive(Debug, Serialize)]
struct AttributionRow {
    url: String,
    photographer: String,
    source: &'static str,
}

/// Editor field values, from a stored post or echoed back from a submission.
#[derive(Debug, Serialize)]
struct EditorFields {
    title: String,
    category: String,
    image: String,
    images: String,
    excerpt: String,
    content: String,
    attribution_json: String,
    attributions: Vec<AttributionRow>,
    embed_code: String,
    embed_photographer: String,
}

impl EditorFields {
    fn from_form(form: &PostForm) -> Self {
        EditorFields {
            title: form.title.clone(),
            category: form.category.as_str().to_string(),
            image: form.image.clone(),
            images: form.images.join("\n"),
            excerpt: form.excerpt.clone(),
            content: form.content.clone(),
            attribution_json: serde_json::to_string(&form.image_metadata).unwrap_or_default(),
            attributions: form
                .image_metadata
                .iter()
                .map(|(url, a)| AttributionRow {
                    url: url.clone(),
                    photographer: a.photographer().to_string(),
                    source: if a.is_embed() { "Flickr" } else { "Upload" },
                })
                .collect(),
            embed_code: String::new(),
            embed_photographer: String::new(),
        }
    }

    fn from_submission(sub: &PostSubmission) -> Self {
        EditorFields {
            title: sub.title.clone(),
            category: sub.category.clone(),
            image: sub.image.clone(),
            images: sub.images.clone(),
            excerpt: sub.excerpt.clone(),
            content: sub.content.clone(),
            attribution_json: sub.attribution_json.clone(),
            attributions: Vec::new(),
            embed_code: sub.embed_code.clone().unwrap_or_default(),
            embed_photographer: sub.embed_photographer.clone().unwrap_or_default(),
        }
    }

    /// Keep the pasted embed in the form, e.g. after it failed to parse.
    fn with_embed(mut self, sub: &PostSubmission) -> Self {
        self.embed_code = sub.embed_code.clone().unwrap_or_default();
        self.embed_photographer = sub.embed_photographer.clone().unwrap_or_default();
        self
    }
}

fn editor(
    config: &AppConfig,
    post_id: Option<&str>,
    fields: EditorFields,
    error: Option<String>,
    notice: Option<&str>,
) -> Template {
    let categories: Vec<_> = Category::ALL
        .iter()
        .map(|c| json!({ "slug": c.as_str(), "label": c.label() }))
        .collect();
    let action = match post_id {
        Some(id) => format!("{}/posts/{}", admin_base(config), id),
        None => format!("{}/posts", admin_base(config)),
    };
    Template::render(
        "admin/posts/edit",
        json!({
            "page_title": if post_id.is_some() { "Edit Post" } else { "New Post" },
            "admin_slug": config.admin_slug,
            "site_name": config.site_name,
            "post_id": post_id,
            "form_action": action,
            "categories": categories,
            "post": fields,
            "error": error,
            "notice": notice,
        }),
    )
}

/// Apply the "add embed" button: no store call, the editor comes back with
/// the embed attached or with the reason it was not.
fn attach_embed_step(config: &AppConfig, post_id: Option<&str>, sub: &PostSubmission) -> Template {
    let mut form = match sub.to_form() {
        Ok(f) => f,
        Err(e) => {
            return editor(config, post_id, EditorFields::from_submission(sub), Some(e.to_string()), None)
        }
    };
    let snippet = sub.embed_code.as_deref().unwrap_or("");
    let photographer = sub.embed_photographer.as_deref().unwrap_or("");
    match posts::attach_embed(&mut form, snippet, photographer) {
        Ok(parsed) => {
            let notice = if parsed.title.is_empty() {
                "Flickr photo added".to_string()
            } else {
                format!("Added \u{201c}{}\u{201d}", parsed.title)
            };
            editor(config, post_id, EditorFields::from_form(&form), None, Some(&notice))
        }
        Err(e) => editor(
            config,
            post_id,
            EditorFields::from_form(&form).with_embed(sub),
            Some(e.to_string()),
            None,
        ),
    }
}

// ── Routes ──────────────────────────────────────────────

#[get("/posts")]
pub async fn posts_list(
    _admin: AdminSession,
    store: &State<Arc<dyn Store>>,
    config: &State<AppConfig>,
    flash: Option<FlashMessage<'_>>,
) -> Template {
    let store = Arc::clone(store.inner());
    let (posts, error) = match blocking(move || posts::list(store.as_ref(), None)).await {
        Ok(p) => (p, None),
        Err(e) => {
            log::error!("{}", e);
            (Vec::new(), Some(e.to_string()))
        }
    };

    Template::render(
        "admin/posts/list",
        json!({
            "page_title": "Posts",
            "admin_slug": config.admin_slug,
            "site_name": config.site_name,
            "posts": posts,
            "error": error,
            "flash": flash.map(|f| json!({ "kind": f.kind().to_string(), "message": f.message().to_string() })),
        }),
    )
}

#[get("/posts/new")]
pub fn posts_new(_admin: AdminSession, config: &State<AppConfig>) -> Template {
    editor(config, None, EditorFields::from_form(&PostForm::empty()), None, None)
}

#[post("/posts", data = "<form>")]
pub async fn posts_create(
    admin: AdminSession,
    store: &State<Arc<dyn Store>>,
    storage: &State<Arc<dyn ObjectStorage>>,
    config: &State<AppConfig>,
    form: Form<PostSubmission>,
) -> Result<Flash<Redirect>, Template> {
    let sub = form.into_inner();
    if sub.attaching_embed() {
        return Err(attach_embed_step(config, None, &sub));
    }
    let mut post_form = sub
        .to_form()
        .map_err(|e| editor(config, None, EditorFields::from_submission(&sub), Some(e.to_string()), None))?;
    posts::prune_attribution(&mut post_form);

    let store = Arc::clone(store.inner());
    let prefix = storage.public_prefix();
    let session = admin.session;
    let submitted = post_form.clone();
    let result = blocking(move || {
        posts::validate(&post_form)?;
        posts::attach_upload_attribution(store.as_ref(), &prefix, &mut post_form)?;
        posts::create(store.as_ref(), &session, &post_form)
    })
    .await;

    match result {
        Ok(_) => Ok(Flash::success(
            Redirect::to(format!("{}/posts", admin_base(config))),
            "Post created",
        )),
        Err(e) => Err(editor(
            config,
            None,
            EditorFields::from_form(&submitted).with_embed(&sub),
            Some(e.to_string()),
            None,
        )),
    }
}

#[get("/posts/<id>/edit")]
pub async fn posts_edit(
    _admin: AdminSession,
    store: &State<Arc<dyn Store>>,
    config: &State<AppConfig>,
    id: String,
) -> Option<Template> {
    let store = Arc::clone(store.inner());
    let lookup = id.clone();
    let post = match blocking(move || posts::find(store.as_ref(), &lookup)).await {
        Ok(p) => p,
        Err(AppError::NotFound) => return None,
        Err(e) => {
            log::error!("{}", e);
            return Some(editor(
                config,
                Some(&id),
                EditorFields::from_form(&PostForm::empty()),
                Some(e.to_string()),
                None,
            ));
        }
    };
    Some(editor(config, Some(&id), EditorFields::from_form(&PostForm::from(&post)), None, None))
}

#[post("/posts/<id>", data = "<form>")]
pub async fn posts_update(
    admin: AdminSession,
    store: &State<Arc<dyn Store>>,
    storage: &State<Arc<dyn ObjectStorage>>,
    config: &State<AppConfig>,
    id: String,
    form: Form<PostSubmission>,
) -> Result<Flash<Redirect>, Template> {
    let sub = form.into_inner();
    if sub.attaching_embed() {
        return Err(attach_embed_step(config, Some(&id), &sub));
    }
    let mut post_form = sub.to_form().map_err(|e| {
        editor(config, Some(&id), EditorFields::from_submission(&sub), Some(e.to_string()), None)
    })?;
    posts::prune_attribution(&mut post_form);

    let store = Arc::clone(store.inner());
    let prefix = storage.public_prefix();
    let session = admin.session;
    let submitted = post_form.clone();
    let post_id = id.clone();
    let result = blocking(move || {
        posts::validate(&post_form)?;
        posts::attach_upload_attribution(store.as_ref(), &prefix, &mut post_form)?;
        posts::update(store.as_ref(), &session, &post_id, &post_form)
    })
    .await;

    match result {
        Ok(()) => Ok(Flash::success(
            Redirect::to(format!("{}/posts", admin_base(config))),
            "Post updated",
        )),
        Err(e) => Err(editor(
            config,
            Some(&id),
            EditorFields::from_form(&submitted).with_embed(&sub),
            Some(e.to_string()),
            None,
        )),
    }
}

#[post("/posts/<id>/delete")]
pub async fn posts_delete(
    admin: AdminSession,
    store: &State<Arc<dyn Store>>,
    config: &State<AppConfig>,
    id: String,
) -> Flash<Redirect> {
    let store = Arc::clone(store.inner());
    let session = admin.session;
    let to = Redirect::to(format!("{}/posts", admin_base(config)));
    match blocking(move || posts::delete(store.as_ref(), &session, &id)).await {
        Ok(()) => Flash::success(to, "Post deleted"),
        Err(e) => {
            log::error!("{}", e);
            Flash::error(to, e.to_string())
        }
    }
}
