use reqwest::Method;
use serde_json::Value;

use crate::auth::Session;
use crate::hosted::{send_json, HostedClient};
use crate::models::image::{ImageMetadataForm, NewImage, UploadedImage};
use crate::models::post::{Category, StoredPost, StoredPostInput};

use super::Store;

/// Managed-Postgres implementation of the Store trait, spoken over its REST
/// interface. The database assigns ids, timestamps, creator columns and the
/// reading-time label (trigger on `posts`); row-level security decides who
/// may write.
pub struct HostedStore {
    client: HostedClient,
}

impl HostedStore {
    pub fn new(client: HostedClient) -> Self {
        Self { client }
    }
}

/// `column=eq.value` style filter value.
fn eq(value: &str) -> String {
    format!("eq.{}", value)
}

/// `in.("a","b")` filter value, quoting each item.
fn in_list(values: &[String]) -> String {
    let quoted: Vec<String> = values
        .iter()
        .map(|v| format!("\"{}\"", v.replace('\\', "\\\\").replace('"', "\\\"")))
        .collect();
    format!("in.({})", quoted.join(","))
}

fn post_list_query(category: Option<Category>) -> Vec<(&'static str, String)> {
    let mut query = vec![
        ("select", "*".to_string()),
        ("order", "created_at.desc".to_string()),
    ];
    if let Some(c) = category {
        query.push(("category", eq(c.as_str())));
    }
    query
}

impl HostedStore {
    fn token<'a>(session: &'a Session) -> Option<&'a str> {
        session.access_token.as_deref()
    }

    fn select<T: serde::de::DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, String> {
        let request = self
            .client
            .request(Method::GET, &self.client.rest_url(table), None)
            .query(query);
        send_json(request, table)
    }

    fn write<T: serde::de::DeserializeOwned, B: serde::Serialize>(
        &self,
        method: Method,
        table: &str,
        session: &Session,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<Vec<T>, String> {
        let mut request = self
            .client
            .request(method, &self.client.rest_url(table), Self::token(session))
            .header("Prefer", "return=representation")
            .query(query);
        if let Some(body) = body {
            request = request.json(body);
        }
        send_json(request, table)
    }
}

impl Store for HostedStore {
    fn run_migrations(&self) -> Result<(), String> {
        // Schema and policies are managed in the hosted project. Confirm the
        // tables answer so a bad URL or key fails at launch, not on first visit.
        self.select::<Value>("posts", &[("select", "id".into()), ("limit", "1".into())])?;
        self.select::<Value>("images", &[("select", "id".into()), ("limit", "1".into())])?;
        Ok(())
    }

    // ── Posts ────────────────────────────────────────────────────────

    fn post_list(&self, category: Option<Category>) -> Result<Vec<StoredPost>, String> {
        self.select("posts", &post_list_query(category))
    }

    fn post_find_by_id(&self, id: &str) -> Result<Option<StoredPost>, String> {
        let rows: Vec<StoredPost> =
            self.select("posts", &[("select", "*".into()), ("id", eq(id))])?;
        Ok(rows.into_iter().next())
    }

    fn post_create(&self, session: &Session, input: &StoredPostInput) -> Result<StoredPost, String> {
        let rows: Vec<StoredPost> = self.write(Method::POST, "posts", session, &[], Some(input))?;
        rows.into_iter()
            .next()
            .ok_or_else(|| "posts insert returned no row".to_string())
    }

    fn post_update(
        &self,
        session: &Session,
        id: &str,
        input: &StoredPostInput,
    ) -> Result<Option<StoredPost>, String> {
        let rows: Vec<StoredPost> =
            self.write(Method::PATCH, "posts", session, &[("id", eq(id))], Some(input))?;
        Ok(rows.into_iter().next())
    }

    fn post_delete(&self, session: &Session, id: &str) -> Result<bool, String> {
        let rows: Vec<Value> =
            self.write::<Value, ()>(Method::DELETE, "posts", session, &[("id", eq(id))], None)?;
        Ok(!rows.is_empty())
    }

    // ── Images ──────────────────────────────────────────────────────

    fn image_list(&self) -> Result<Vec<UploadedImage>, String> {
        self.select(
            "images",
            &[("select", "*".into()), ("order", "created_at.desc".into())],
        )
    }

    fn image_find_by_id(&self, id: &str) -> Result<Option<UploadedImage>, String> {
        let rows: Vec<UploadedImage> =
            self.select("images", &[("select", "*".into()), ("id", eq(id))])?;
        Ok(rows.into_iter().next())
    }

    fn image_find_by_urls(&self, urls: &[String]) -> Result<Vec<UploadedImage>, String> {
        if urls.is_empty() {
            return Ok(vec![]);
        }
        self.select(
            "images",
            &[("select", "*".into()), ("public_url", in_list(urls))],
        )
    }

    fn image_create(&self, session: &Session, image: &NewImage) -> Result<UploadedImage, String> {
        let rows: Vec<UploadedImage> =
            self.write(Method::POST, "images", session, &[], Some(image))?;
        rows.into_iter()
            .next()
            .ok_or_else(|| "images insert returned no row".to_string())
    }

    fn image_update_metadata(
        &self,
        session: &Session,
        id: &str,
        form: &ImageMetadataForm,
    ) -> Result<Option<UploadedImage>, String> {
        let rows: Vec<UploadedImage> =
            self.write(Method::PATCH, "images", session, &[("id", eq(id))], Some(form))?;
        Ok(rows.into_iter().next())
    }

    fn image_delete(&self, session: &Session, id: &str) -> Result<bool, String> {
        let rows: Vec<Value> =
            self.write::<Value, ()>(Method::DELETE, "images", session, &[("id", eq(id))], None)?;
        Ok(!rows.is_empty())
    }
}
