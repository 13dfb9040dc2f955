//! Thin client for the managed backend (Postgres REST, object storage, auth).
//!
//! One blocking `reqwest` client is built up front and shared by every
//! adapter, so adapter methods must run on a blocking thread (see
//! `routes::blocking`).

use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::Method;
use serde::de::DeserializeOwned;

use crate::config::HostedConfig;

#[derive(Debug, Clone)]
pub struct HostedClient {
    base_url: String,
    anon_key: String,
    timeout: Duration,
    http: Client,
}

impl HostedClient {
    pub fn new(config: &HostedConfig) -> Result<Self, String> {
        let timeout = Duration::from_secs(config.timeout_secs.max(1));
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| format!("HTTP client error: {}", e))?;
        Ok(HostedClient {
            base_url: config.url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
            timeout,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    pub fn storage_url(&self, path: &str) -> String {
        format!("{}/storage/v1/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Request with the project key, authorised as `token` (a user's access
    /// token) or anonymously.
    pub fn request(
        &self,
        method: Method,
        url: &str,
        token: Option<&str>,
    ) -> RequestBuilder {
        let bearer = token.unwrap_or(&self.anon_key);
        self.http
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer)
    }
}

/// Send and fail on any non-2xx status, keeping the backend's message.
pub fn send(request: RequestBuilder, what: &str) -> Result<Response, String> {
    let resp = request
        .send()
        .map_err(|e| format!("{} request failed: {}", what, e))?;
    if !resp.status().is_success() {
        let status = resp.status();
        let text = resp.text().unwrap_or_default();
        return Err(format!("{} returned {}: {}", what, status, error_message(&text)));
    }
    Ok(resp)
}

pub fn send_json<T: DeserializeOwned>(request: RequestBuilder, what: &str) -> Result<T, String> {
    send(request, what)?
        .json::<T>()
        .map_err(|e| format!("{} response was not understood: {}", what, e))
}

/// Pull the human-readable part out of a backend error body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            ["message", "msg", "error_description", "error"]
                .iter()
                .find_map(|k| v.get(*k).and_then(|m| m.as_str()).map(str::to_string))
        })
        .unwrap_or_else(|| body.trim().to_string())
}
