//! Route definitions for TinyApp
//!
//! This module configures all HTTP routes, the session layer and the flash
//! middleware, and maps each route to its handler.

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_sessions::cookie::SameSite;
use tower_sessions::{MemoryStore, SessionManagerLayer};

use crate::database::AppState;
use crate::handler::{
    about, create_url, delete_url, follow_short_url, home, list_urls, login, login_page, logout,
    new_url_page, override_url, register, register_page, show_url, template_vars_json,
    update_url, urls_json, users_json,
};
use crate::middleware::flash_middleware;

/// Creates and configures the Axum application router with all routes
///
/// # Route Definitions
///
/// - `GET /`, `GET /about` - static pages
/// - `GET|POST /login`, `GET|POST /register`, `POST /logout` - accounts
/// - `GET|POST /urls`, `GET /urls/new` - the current user's URLs
/// - `GET|PUT|DELETE /urls/{id}`, `POST /urls/{id}?_method=PUT|DELETE` - one URL
/// - `POST /urls/{id}/update`, `POST /urls/{id}/delete` - form-friendly aliases
/// - `GET /u/{id}` - public redirect to the long URL
/// - `GET /urls.json`, `/users.json`, `/templateVars.json` - debug dumps,
///   only when enabled in the config
///
/// Sessions are kept in memory and referenced by a cookie named after
/// `config.session_cookie`.
pub fn create_app(state: AppState) -> Router {
    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_name(state.config.session_cookie.clone())
        .with_secure(state.config.secure_cookie)
        .with_same_site(SameSite::Lax);

    let mut router = Router::new()
        .route("/", get(home))
        .route("/about", get(about))
        .route("/login", get(login_page).post(login))
        .route("/register", get(register_page).post(register))
        .route("/logout", post(logout))
        .route("/urls", get(list_urls).post(create_url))
        .route("/urls/new", get(new_url_page))
        .route(
            "/urls/{id}",
            get(show_url)
                .put(update_url)
                .delete(delete_url)
                .post(override_url),
        )
        .route("/urls/{id}/update", post(update_url))
        .route("/urls/{id}/delete", post(delete_url))
        .route("/u/{id}", get(follow_short_url));

    if state.config.debug_endpoints {
        router = router
            .route("/urls.json", get(urls_json))
            .route("/users.json", get(users_json))
            .route("/templateVars.json", get(template_vars_json));
    }

    router
        // runs on every request, inside the session layer
        .layer(middleware::from_fn(flash_middleware))
        .layer(session_layer)
        .with_state(state)
}
