use log::error;
use rocket::http::Status;
use rocket::response::{self, Responder};
use rocket::serde::json::Json;
use rocket::Request;
use serde_json::json;
use thiserror::Error;

/// Errors surfaced to the person using the site or the admin panel.
///
/// Repositories report failures as plain `String`s; services wrap them with
/// [`AppError::backend`] so the message names the action that failed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AppError {
    /// Bad input. Nothing was sent to the backend.
    #[error("{0}")]
    Validation(String),

    /// A pasted snippet that is not a recognisable Flickr embed.
    #[error("Please paste valid embed code")]
    InvalidEmbed,

    #[error("Failed to {action}: {message}")]
    Backend {
        action: &'static str,
        message: String,
    },

    #[error("Not found")]
    NotFound,

    /// No signed-in admin behind an admin API call.
    #[error("Sign in required")]
    Unauthorized,
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    /// Adapter for `map_err` on repository results.
    pub fn backend(action: &'static str) -> impl FnOnce(String) -> AppError {
        move |message| AppError::Backend { action, message }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, AppError::Validation(_) | AppError::InvalidEmbed)
    }

    pub fn status(&self) -> Status {
        match self {
            AppError::Validation(_) | AppError::InvalidEmbed => Status::BadRequest,
            AppError::Backend { .. } => Status::InternalServerError,
            AppError::NotFound => Status::NotFound,
            AppError::Unauthorized => Status::Unauthorized,
        }
    }
}

/// JSON error body, `{ "error": "<message>" }`, for the API routes.
impl<'r> Responder<'r, 'static> for AppError {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        if let AppError::Backend { .. } = self {
            error!("{} {}: {}", req.method(), req.uri(), self);
        }
        (self.status(), Json(json!({ "error": self.to_string() }))).respond_to(req)
    }
}
