use rocket::http::{Cookie, CookieJar, SameSite, Status};
use rocket::request::{FromRequest, Outcome, Request};
use rocket::State;
use sha2::{Digest, Sha256};

use crate::auth::{Session, SessionRegistry};

pub const SESSION_COOKIE: &str = "basecamp_session";

#[cfg(not(test))]
const BCRYPT_COST: u32 = bcrypt::DEFAULT_COST;
// DEFAULT_COST takes seconds per hash in debug builds.
#[cfg(test)]
const BCRYPT_COST: u32 = 4;

// ── Client IP request guard ──

/// Extracts the real client IP from the request.
/// Checks headers in priority order:
///   1. CF-Connecting-IP (Cloudflare)
///   2. X-Real-IP (nginx proxy_set_header)
///   3. X-Forwarded-For (first IP in the chain = original client)
///   4. Rocket's client_ip() (socket peer address)
pub struct ClientIp(pub String);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for ClientIp {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let headers = request.headers();

        for name in ["CF-Connecting-IP", "X-Real-IP"] {
            if let Some(ip) = headers.get_one(name) {
                let ip = ip.trim();
                if !ip.is_empty() {
                    return Outcome::Success(ClientIp(ip.to_string()));
                }
            }
        }

        // client, proxy1, proxy2: the leftmost is the original client
        if let Some(forwarded) = headers.get_one("X-Forwarded-For") {
            if let Some(ip) = forwarded.split(',').next() {
                let ip = ip.trim();
                if !ip.is_empty() {
                    return Outcome::Success(ClientIp(ip.to_string()));
                }
            }
        }

        let ip = request
            .client_ip()
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        Outcome::Success(ClientIp(ip))
    }
}

// ── Admin session guard ──

/// Guard: a signed-in admin with an unexpired session.
/// Forwards with 401 otherwise, which the catcher turns into a login redirect.
pub struct AdminSession {
    pub session: Session,
    /// Registry key held in the cookie, needed to close the session.
    pub key: String,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AdminSession {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match resolve_session(request).await {
            Some((key, session)) => Outcome::Success(AdminSession { session, key }),
            None => Outcome::Forward(Status::Unauthorized),
        }
    }
}

async fn resolve_session(request: &Request<'_>) -> Option<(String, Session)> {
    let registry = request
        .guard::<&State<SessionRegistry>>()
        .await
        .succeeded()?;
    let cookies = request.cookies();
    let key = cookies.get_private(SESSION_COOKIE)?.value().to_string();

    match registry.get(&key) {
        Some(session) => Some((key, session)),
        None => {
            cookies.remove_private(Cookie::from(SESSION_COOKIE));
            None
        }
    }
}

// ── Cookies ──

/// Set the session cookie. `secure` should be true whenever the site is
/// served over HTTPS.
pub fn set_session_cookie(cookies: &CookieJar<'_>, key: &str, secure: bool) {
    let mut cookie = Cookie::new(SESSION_COOKIE, key.to_string());
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Strict);
    cookie.set_path("/");
    if secure {
        cookie.set_secure(true);
    }
    cookies.add_private(cookie);
}

pub fn clear_session_cookie(cookies: &CookieJar<'_>) {
    cookies.remove_private(Cookie::from(SESSION_COOKIE));
}

// ── Password utilities ──

pub fn hash_password(password: &str) -> Result<String, String> {
    bcrypt::hash(password, BCRYPT_COST).map_err(|e| e.to_string())
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

pub fn hash_ip(ip: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(ip.as_bytes());
    hex::encode(hasher.finalize())
}
