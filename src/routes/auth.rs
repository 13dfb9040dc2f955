use std::sync::Arc;

use log::{info, warn};
use rocket::form::Form;
use rocket::http::CookieJar;
use rocket::response::Redirect;
use rocket::State;
use rocket_dyn_templates::Template;
use serde::Deserialize;
use serde_json::json;

use super::blocking;
use crate::auth::{AuthProvider, SessionRegistry};
use crate::config::AppConfig;
use crate::error::AppError;
use crate::rate_limit::{login_key, RateLimiter, LOGIN_WINDOW};
use crate::security::auth::{clear_session_cookie, set_session_cookie, AdminSession, ClientIp};

pub fn routes() -> Vec<rocket::Route> {
    routes![login_page, login_submit, logout, admin_redirect_to_login]
}

#[derive(Debug, FromForm, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

fn login_template(config: &AppConfig, email: &str, error: Option<&str>) -> Template {
    Template::render(
        "admin/login",
        json!({
            "page_title": "Sign in",
            "admin_slug": config.admin_slug,
            "site_name": config.site_name,
            "email": email,
            "error": error,
        }),
    )
}

#[get("/login")]
pub fn login_page(session: Option<AdminSession>, config: &State<AppConfig>) -> Result<Template, Redirect> {
    if session.is_some() {
        return Err(Redirect::to(format!("{}/posts", config.admin_base())));
    }
    Ok(login_template(config, "", None))
}

#[post("/login", data = "<form>")]
pub async fn login_submit(
    form: Form<LoginForm>,
    ip: ClientIp,
    provider: &State<Arc<dyn AuthProvider>>,
    registry: &State<SessionRegistry>,
    limiter: &State<RateLimiter>,
    config: &State<AppConfig>,
    cookies: &CookieJar<'_>,
) -> Result<Redirect, Template> {
    let form = form.into_inner();
    let rate_key = login_key(&ip.0);
    let max_attempts = config.login_rate_limit.max(1);

    // Check rate limit before processing
    if !limiter.check_and_record(&rate_key, max_attempts, LOGIN_WINDOW) {
        warn!("Sign-in rate limit hit for {}", form.email.trim());
        return Err(login_template(
            config,
            &form.email,
            Some("Too many login attempts. Please try again in 15 minutes."),
        ));
    }

    if form.email.trim().is_empty() || form.password.is_empty() {
        return Err(login_template(config, &form.email, Some("Email and password are required")));
    }

    let auth = Arc::clone(provider.inner());
    let (email, password) = (form.email.clone(), form.password);
    let outcome = blocking(move || {
        auth.sign_in(&email, &password)
            .map_err(AppError::backend("sign in"))
    })
    .await;

    match outcome {
        Ok(Some(session)) => {
            info!("Signed in: {}", session.email);
            limiter.reset(&rate_key);
            let key = registry.open(session);
            set_session_cookie(cookies, &key, config.secure_cookies);
            Ok(Redirect::to(format!("{}/posts", config.admin_base())))
        }
        Ok(None) => {
            warn!(
                "Failed sign-in for {} ({} attempt(s) left)",
                form.email.trim(),
                limiter.remaining(&rate_key, max_attempts, LOGIN_WINDOW)
            );
            Err(login_template(config, &form.email, Some("Invalid credentials")))
        }
        Err(e) => {
            log::error!("{}", e);
            Err(login_template(config, &form.email, Some(&e.to_string())))
        }
    }
}

#[post("/logout")]
pub async fn logout(
    admin: Option<AdminSession>,
    provider: &State<Arc<dyn AuthProvider>>,
    registry: &State<SessionRegistry>,
    config: &State<AppConfig>,
    cookies: &CookieJar<'_>,
) -> Redirect {
    if let Some(admin) = admin {
        registry.close(&admin.key);
        let auth = Arc::clone(provider.inner());
        let session = admin.session;
        let email = session.email.clone();
        let revoked = blocking(move || {
            auth.sign_out(&session)
                .map_err(AppError::backend("sign out"))
        })
        .await;
        match revoked {
            Ok(()) => info!("Signed out: {}", email),
            Err(e) => warn!("{}", e),
        }
    }
    clear_session_cookie(cookies);
    Redirect::to(format!("{}/login", config.admin_base()))
}

/// Catch-all for any GET under the admin mount that failed the
/// `AdminSession` guard.
#[get("/<_path..>", rank = 99)]
pub fn admin_redirect_to_login(_path: std::path::PathBuf, config: &State<AppConfig>) -> Redirect {
    Redirect::to(format!("{}/login", config.admin_base()))
}
