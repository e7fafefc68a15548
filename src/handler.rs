//! HTTP request handlers for TinyApp
//!
//! Every handler extracts a [`RequestContext`] (session, current user and the
//! flash state after the middleware pass) and either renders a page or
//! redirects. User-facing failures go through [`RequestContext::reject`], which
//! records a flash message and renders the page that message belongs on.

use std::collections::BTreeMap;

use axum::{
    extract::{FromRequest, Path, Query, Request, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Form, Json,
};
use serde::Serialize;

use crate::auth::{authorize, hash_password, verify_password, RequestContext};
use crate::database::{AppState, StoreError};
use crate::error::AppError;
use crate::flash::{Flash, Page};
use crate::model::{LoginForm, MethodOverride, RegisterForm, UrlForm, UrlRecord, User, UserView};
use crate::view::{self, PageContext};

const INVALID_URL_MESSAGE: &str = "That doesn't look like a valid URL.";

pub async fn home(ctx: RequestContext) -> Html<String> {
    view::home(&ctx.page(Page::Home))
}

pub async fn about(ctx: RequestContext) -> Html<String> {
    view::about(&ctx.page(Page::About))
}

pub async fn login_page(ctx: RequestContext) -> Response {
    if ctx.user.is_some() {
        return Redirect::to("/urls").into_response();
    }
    view::login(&ctx.page(Page::Login)).into_response()
}

pub async fn register_page(ctx: RequestContext) -> Response {
    if ctx.user.is_some() {
        return Redirect::to("/urls").into_response();
    }
    view::register(&ctx.page(Page::Register)).into_response()
}

/// Creates an account and logs it in
///
/// - **303** to `/urls` on success
/// - **400** register page if a field is blank or the email or username is
///   taken
pub async fn register(
    State(state): State<AppState>,
    ctx: RequestContext,
    Form(form): Form<RegisterForm>,
) -> Result<Response, AppError> {
    match register_user(&state, &form) {
        Ok(user) => {
            ctx.log_in(&user).await?;
            tracing::info!(user_id = %user.id, email = %user.email, "registered new user");
            Ok(Redirect::to("/urls").into_response())
        }
        Err(err) => ctx.reject(&state, err).await,
    }
}

fn register_user(state: &AppState, form: &RegisterForm) -> Result<User, AppError> {
    let blank = [&form.email, &form.username, &form.password]
        .iter()
        .any(|field| field.trim().is_empty());
    if blank {
        return Err(AppError::validation(
            Page::Register,
            "Email, username and password are all required.",
        ));
    }

    // cheap checks before paying for a hash, the store checks again on insert
    if state.store.find_user_by_email(&form.email)?.is_some() {
        return Err(AppError::DuplicateEmail);
    }
    if state.store.find_user_by_username(&form.username)?.is_some() {
        return Err(AppError::DuplicateUsername);
    }

    let password_hash = hash_password(&form.password)?;
    state
        .store
        .create_user(&form.username, &form.email, &password_hash)
        .map_err(|err| match err {
            StoreError::EmailTaken => AppError::DuplicateEmail,
            StoreError::UsernameTaken => AppError::DuplicateUsername,
            other => other.into(),
        })
}

/// Logs in with an email or username
///
/// - **303** to `/urls` on success
/// - **403** login page for an unknown user or a wrong password
pub async fn login(
    State(state): State<AppState>,
    ctx: RequestContext,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    match check_credentials(&state, &form) {
        Ok(user) => {
            ctx.log_in(&user).await?;
            tracing::info!(user_id = %user.id, "user logged in");
            Ok(Redirect::to("/urls").into_response())
        }
        Err(err) => {
            tracing::warn!(login = %form.username, error = %err, "login failed");
            ctx.reject(&state, err).await
        }
    }
}

fn check_credentials(state: &AppState, form: &LoginForm) -> Result<User, AppError> {
    let user = state
        .store
        .find_user_by_login(&form.username)?
        .ok_or(AppError::UserNotFound)?;

    if !verify_password(&form.password, &user.password_hash) {
        return Err(AppError::InvalidCredentials);
    }
    Ok(user)
}

pub async fn logout(ctx: RequestContext) -> Result<Response, AppError> {
    if let Some(user) = &ctx.user {
        tracing::info!(user_id = %user.id, "user logged out");
    }
    ctx.log_out().await?;
    Ok(Redirect::to("/login").into_response())
}

/// Lists the current user's URLs
pub async fn list_urls(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> Result<Response, AppError> {
    let Some(user_id) = ctx.user.as_ref().map(|user| user.id.clone()) else {
        return ctx
            .reject(&state, AppError::Unauthenticated { action: "view your URLs" })
            .await;
    };

    let urls = state.store.urls_for_owner(&user_id)?;
    Ok(view::urls_index(&ctx.page(Page::UrlsIndex), &urls).into_response())
}

pub async fn new_url_page(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> Result<Response, AppError> {
    if ctx.user.is_none() {
        return ctx
            .reject(&state, AppError::Unauthenticated { action: "create new URLs" })
            .await;
    }
    Ok(view::urls_new(&ctx.page(Page::UrlsNew)).into_response())
}

/// Shortens a URL for the current user
///
/// - **303** to `/urls/{shortURL}` on success
/// - **401** login page when not logged in
/// - **400** new URL page when the long URL is blank or unparsable
pub async fn create_url(
    State(state): State<AppState>,
    ctx: RequestContext,
    Form(form): Form<UrlForm>,
) -> Result<Response, AppError> {
    match create_for(&state, ctx.user.as_ref(), &form) {
        Ok(record) => {
            tracing::info!(
                short_url = %record.short_url,
                long_url = %record.long_url,
                owner = %record.owner_id,
                "created short URL"
            );
            Ok(Redirect::to(&format!("/urls/{}", record.short_url)).into_response())
        }
        Err(err) => ctx.reject(&state, err).await,
    }
}

fn create_for(state: &AppState, user: Option<&User>, form: &UrlForm) -> Result<UrlRecord, AppError> {
    let user = user.ok_or(AppError::Unauthenticated { action: "create new URLs" })?;
    let long_url = match form.normalized() {
        Ok(Some(long_url)) => long_url,
        Ok(None) => return Err(AppError::validation(Page::UrlsNew, "Please enter a URL to shorten.")),
        Err(err) => {
            tracing::debug!(input = %form.long_url, error = %err, "rejected long URL");
            return Err(AppError::validation(Page::UrlsNew, INVALID_URL_MESSAGE));
        }
    };

    Ok(state.store.create_url(&long_url, &user.id)?)
}

pub async fn show_url(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(short_url): Path<String>,
) -> Result<Response, AppError> {
    match authorize(&state.store, ctx.user.as_ref(), &short_url, "view") {
        Ok(record) => Ok(view::urls_show(&ctx.page(Page::UrlsShow), &record).into_response()),
        Err(err) => ctx.reject(&state, err).await,
    }
}

/// Points a short URL at a new long URL
///
/// Reached through `PUT /urls/{id}`, `POST /urls/{id}/update` and
/// `POST /urls/{id}?_method=PUT`.
pub async fn update_url(
    State(state): State<AppState>,
    mut ctx: RequestContext,
    Path(short_url): Path<String>,
    Form(form): Form<UrlForm>,
) -> Result<Response, AppError> {
    let record = match authorize(&state.store, ctx.user.as_ref(), &short_url, "edit") {
        Ok(record) => record,
        Err(err) => return ctx.reject(&state, err).await,
    };

    let long_url = match form.normalized() {
        Ok(Some(long_url)) => long_url,
        rejected => {
            let message = match rejected {
                Err(err) => {
                    tracing::debug!(input = %form.long_url, error = %err, "rejected long URL");
                    INVALID_URL_MESSAGE
                }
                _ => "The new URL can't be blank.",
            };
            ctx.flash_error(Page::UrlsShow, message).await?;
            let html = view::urls_show(&ctx.page(Page::UrlsShow), &record);
            return Ok((StatusCode::BAD_REQUEST, html).into_response());
        }
    };

    if state.store.update_url(&short_url, &long_url)?.is_none() {
        // deleted between the ownership check and the write
        return ctx.reject(&state, AppError::NotFound(short_url)).await;
    }
    tracing::info!(short_url = %short_url, long_url = %long_url, "updated short URL");

    Ok(Redirect::to("/urls").into_response())
}

/// Deletes a short URL
///
/// Reached through `DELETE /urls/{id}`, `POST /urls/{id}/delete` and
/// `POST /urls/{id}?_method=DELETE`.
pub async fn delete_url(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(short_url): Path<String>,
) -> Result<Response, AppError> {
    if let Err(err) = authorize(&state.store, ctx.user.as_ref(), &short_url, "delete") {
        return ctx.reject(&state, err).await;
    }

    state.store.delete_url(&short_url)?;
    tracing::info!(short_url = %short_url, "deleted short URL");

    Ok(Redirect::to("/urls").into_response())
}

/// `POST /urls/{id}?_method=PUT|DELETE`, for HTML forms that can only POST
///
/// The body is only read as a form for `PUT`; a `DELETE` needs no body at all.
pub async fn override_url(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(short_url): Path<String>,
    Query(method): Query<MethodOverride>,
    request: Request,
) -> Result<Response, AppError> {
    match method.method.as_deref().map(str::to_ascii_uppercase).as_deref() {
        Some("PUT") => {
            let form = match Form::<UrlForm>::from_request(request, &state).await {
                Ok(form) => form,
                Err(rejection) => return Ok(rejection.into_response()),
            };
            update_url(State(state), ctx, Path(short_url), form).await
        }
        Some("DELETE") => delete_url(State(state), ctx, Path(short_url)).await,
        _ => Ok(StatusCode::METHOD_NOT_ALLOWED.into_response()),
    }
}

/// Follows a short URL
///
/// - **307** to the long URL, counting the visit
/// - **404** bad URL page for an unknown key
pub async fn follow_short_url(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(short_url): Path<String>,
) -> Result<Response, AppError> {
    match state.store.record_visit(&short_url)? {
        Some(record) => Ok(Redirect::temporary(&record.long_url).into_response()),
        None => ctx.reject(&state, AppError::NotFound(short_url)).await,
    }
}

pub async fn urls_json(State(state): State<AppState>) -> Result<Json<BTreeMap<String, UrlRecord>>, AppError> {
    let urls = state
        .store
        .all_urls()?
        .into_iter()
        .map(|record| (record.short_url.clone(), record))
        .collect();
    Ok(Json(urls))
}

pub async fn users_json(State(state): State<AppState>) -> Result<Json<BTreeMap<String, UserView>>, AppError> {
    let users = state
        .store
        .all_users()?
        .iter()
        .map(|user| (user.id.clone(), UserView::from(user)))
        .collect();
    Ok(Json(users))
}

#[derive(Serialize)]
pub struct TemplateVars {
    pub user: Option<UserView>,
    pub flash: Flash,
    pub pages: BTreeMap<Page, PageContext>,
}

/// The view model every page would be rendered with on this request
pub async fn template_vars_json(ctx: RequestContext) -> Json<TemplateVars> {
    let pages = Page::ALL
        .into_iter()
        .map(|page| (page, ctx.page(page)))
        .collect();

    Json(TemplateVars {
        user: ctx.user_view(),
        flash: ctx.flash.clone(),
        pages,
    })
}
