//! Application error type
//!
//! The first eight variants are things that happen to users (bad input,
//! wrong owner, not logged in...). They are turned into a flash message plus a
//! rendered page by the handlers, see `auth::RequestContext::reject`. The rest
//! are internal faults and render as a plain 500.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::database::StoreError;
use crate::flash::Page;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("not logged in, cannot {action}")]
    Unauthenticated { action: &'static str },

    #[error("cannot {action} a URL owned by someone else")]
    Forbidden { action: &'static str },

    #[error("short URL {0:?} does not exist")]
    NotFound(String),

    #[error("{message}")]
    Validation { page: Page, message: String },

    #[error("email already registered")]
    DuplicateEmail,

    #[error("username already taken")]
    DuplicateUsername,

    #[error("no user matches the login")]
    UserNotFound,

    #[error("password does not match")]
    InvalidCredentials,

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    #[error("session layer unavailable: {0}")]
    SessionUnavailable(&'static str),

    #[error("password hashing failed: {0}")]
    PasswordHash(argon2::password_hash::Error),
}

impl AppError {
    pub fn validation(page: Page, message: impl Into<String>) -> Self {
        Self::Validation {
            page,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            Self::Forbidden { .. } | Self::UserNotFound | Self::InvalidCredentials => {
                StatusCode::FORBIDDEN
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation { .. } | Self::DuplicateEmail | Self::DuplicateUsername => {
                StatusCode::BAD_REQUEST
            }
            Self::Store(_) | Self::Session(_) | Self::SessionUnavailable(_) | Self::PasswordHash(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            (status, "Something went wrong on our end.").into_response()
        } else {
            (status, self.to_string()).into_response()
        }
    }
}
