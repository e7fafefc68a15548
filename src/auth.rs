//! Sessions, password hashing and URL ownership checks

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Response},
};
use tower_sessions::Session;

use crate::database::{AppState, Store};
use crate::error::AppError;
use crate::flash::{Flash, Page};
use crate::model::{UrlRecord, User, UserView};
use crate::view::{self, PageContext};

/// Session key holding the logged-in user's id
pub const SESSION_USER_ID_KEY: &str = "user_id";

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(AppError::PasswordHash)
}

/// Checks `password` against a stored PHC string. An unparsable stored hash
/// counts as a mismatch.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(err) => {
            tracing::warn!(error = %err, "stored password hash is unreadable");
            false
        }
    }
}

/// Looks up `short_url` and checks that `user` may `action` it.
///
/// Checks run in a fixed order: the URL must exist, then someone must be
/// logged in, then that someone must own it.
pub fn authorize(
    store: &Store,
    user: Option<&User>,
    short_url: &str,
    action: &'static str,
) -> Result<UrlRecord, AppError> {
    let record = store
        .get_url(short_url)?
        .ok_or_else(|| AppError::NotFound(short_url.to_string()))?;

    let user = user.ok_or(AppError::Unauthenticated { action })?;

    if record.owner_id != user.id {
        return Err(AppError::Forbidden { action });
    }
    Ok(record)
}

/// Everything a handler needs to know about the visitor, built fresh for
/// every request.
pub struct RequestContext {
    pub session: Session,
    pub user: Option<User>,
    pub flash: Flash,
}

impl FromRequestParts<AppState> for RequestContext {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|(_, reason)| AppError::SessionUnavailable(reason))?;

        let user = match session.get::<String>(SESSION_USER_ID_KEY).await? {
            Some(user_id) => match state.store.get_user(&user_id)? {
                Some(user) => Some(user),
                None => {
                    // the session outlived its user
                    tracing::info!(user_id = %user_id, "dropping session for unknown user");
                    session.remove::<String>(SESSION_USER_ID_KEY).await?;
                    None
                }
            },
            None => None,
        };

        let flash = Flash::load(&session).await?;

        Ok(Self { session, user, flash })
    }
}

impl RequestContext {
    pub fn page(&self, page: Page) -> PageContext {
        PageContext::new(page, self.user_view(), &self.flash)
    }

    pub fn user_view(&self) -> Option<UserView> {
        self.user.as_ref().map(UserView::from)
    }

    /// Starts a session for `user`, issuing a fresh session id
    pub async fn log_in(&self, user: &User) -> Result<(), AppError> {
        self.session.cycle_id().await?;
        self.session.insert(SESSION_USER_ID_KEY, &user.id).await?;
        Ok(())
    }

    pub async fn log_out(&self) -> Result<(), AppError> {
        self.session.flush().await?;
        Ok(())
    }

    /// Records a flash message on the page and saves it to the session
    pub async fn flash_error(&mut self, page: Page, message: impl Into<String>) -> Result<(), AppError> {
        self.flash.add_error(page, message);
        self.flash.save(&self.session).await?;
        Ok(())
    }

    /// Turns a user-facing error into a flash message and renders the page it
    /// belongs on, with the matching status. Internal errors are passed through.
    pub async fn reject(mut self, state: &AppState, err: AppError) -> Result<Response, AppError> {
        let status = err.status();
        let page = match &err {
            AppError::Unauthenticated { action } => {
                self.flash.add_login_error(action);
                Some(Page::Login)
            }
            AppError::Forbidden { action } => {
                self.flash.add_permissions_error(action);
                Some(Page::UrlsIndex)
            }
            AppError::NotFound(short_url) => {
                self.flash.add_bad_url_error(short_url);
                Some(Page::BadUrl)
            }
            AppError::Validation { page, message } => {
                self.flash.add_error(*page, message.clone());
                Some(*page)
            }
            AppError::DuplicateEmail => {
                self.flash.add_registration_error("That email is already registered.");
                Some(Page::Register)
            }
            AppError::DuplicateUsername => {
                self.flash.add_registration_error("That username is already taken.");
                Some(Page::Register)
            }
            AppError::UserNotFound => {
                self.flash.add_login_validation_error("No user with that email or username.");
                Some(Page::Login)
            }
            AppError::InvalidCredentials => {
                self.flash.add_login_validation_error("Incorrect password.");
                Some(Page::Login)
            }
            _ => None,
        };
        let Some(page) = page else {
            return Err(err);
        };
        tracing::debug!(error = %err, "request rejected");
        self.flash.save(&self.session).await?;

        let ctx = self.page(page);
        let html = match page {
            Page::Home => view::home(&ctx),
            Page::About => view::about(&ctx),
            Page::Login => view::login(&ctx),
            Page::Register => view::register(&ctx),
            Page::UrlsNew => view::urls_new(&ctx),
            Page::BadUrl => view::bad_url(&ctx),
            Page::UrlsIndex | Page::UrlsShow => {
                let urls = match &self.user {
                    Some(user) => state.store.urls_for_owner(&user.id)?,
                    None => Vec::new(),
                };
                view::urls_index(&ctx, &urls)
            }
        };

        Ok((status, html).into_response())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::Request;
    use tower_sessions::MemoryStore;

    use super::*;
    use crate::config::Config;

    fn state() -> AppState {
        AppState::new(Store::in_memory(6).unwrap(), Config::default())
    }

    fn parts_with(session: &Session) -> Parts {
        let (mut parts, ()) = Request::builder().uri("/urls").body(()).unwrap().into_parts();
        parts.extensions.insert(session.clone());
        parts
    }

    #[tokio::test]
    async fn session_of_missing_user_is_logged_out() {
        let state = state();
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        session.insert(SESSION_USER_ID_KEY, "gone00").await.unwrap();

        let ctx = RequestContext::from_request_parts(&mut parts_with(&session), &state)
            .await
            .unwrap();

        assert!(ctx.user.is_none());
        assert_eq!(session.get::<String>(SESSION_USER_ID_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn session_of_existing_user_is_kept() {
        let state = state();
        let user = state.store.create_user("ren", "ren@example.com", "hash").unwrap();
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        session.insert(SESSION_USER_ID_KEY, &user.id).await.unwrap();

        let ctx = RequestContext::from_request_parts(&mut parts_with(&session), &state)
            .await
            .unwrap();

        assert_eq!(ctx.user, Some(user.clone()));
        assert_eq!(session.get::<String>(SESSION_USER_ID_KEY).await.unwrap(), Some(user.id));
    }

    #[tokio::test]
    async fn missing_session_layer_is_an_internal_error() {
        let (mut parts, ()) = Request::builder().body(()).unwrap().into_parts();
        let err = RequestContext::from_request_parts(&mut parts, &state()).await.err().unwrap();
        assert_eq!(err.status(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    }
}
