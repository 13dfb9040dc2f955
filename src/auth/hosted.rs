use chrono::{Duration, Utc};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::hosted::{send, HostedClient};

use super::{AuthProvider, Session};

/// Password grant against the managed auth service.
pub struct HostedAuth {
    client: HostedClient,
}

impl HostedAuth {
    pub fn new(client: HostedClient) -> Self {
        HostedAuth { client }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
    user: HostedUser,
}

#[derive(Debug, Deserialize)]
struct HostedUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: Value,
}

fn session_from_token(token: TokenResponse, fallback_email: &str) -> Session {
    let display_name = token
        .user
        .user_metadata
        .get("display_name")
        .or_else(|| token.user.user_metadata.get("full_name"))
        .and_then(|v| v.as_str())
        .map(str::to_string);
    Session {
        user_id: token.user.id,
        email: token
            .user
            .email
            .unwrap_or_else(|| fallback_email.trim().to_string()),
        display_name,
        access_token: Some(token.access_token),
        expires_at: Utc::now() + Duration::seconds(token.expires_in.max(60)),
    }
}

impl AuthProvider for HostedAuth {
    fn sign_in(&self, email: &str, password: &str) -> Result<Option<Session>, String> {
        let url = self.client.auth_url("token?grant_type=password");
        let resp = self
            .client
            .request(Method::POST, &url, None)
            .json(&json!({ "email": email.trim(), "password": password }))
            .send()
            .map_err(|e| format!("auth request failed: {}", e))?;

        // 400 is the auth service's answer to bad credentials.
        if resp.status() == StatusCode::BAD_REQUEST {
            return Ok(None);
        }
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().unwrap_or_default();
            return Err(format!("auth returned {}: {}", status, text.trim()));
        }
        let token: TokenResponse = resp
            .json()
            .map_err(|e| format!("auth response was not understood: {}", e))?;
        Ok(Some(session_from_token(token, email)))
    }

    fn sign_out(&self, session: &Session) -> Result<(), String> {
        let token = match session.access_token.as_deref() {
            Some(t) => t,
            None => return Ok(()),
        };
        let url = self.client.auth_url("logout");
        let request = self.client.request(Method::POST, &url, Some(token));
        send(request, "auth logout")?;
        Ok(())
    }
}
