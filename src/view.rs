//! HTML rendering
//!
//! Each request builds its own [`PageContext`] from the session (current user
//! and flash messages) and hands it to one of the page functions below. Nothing
//! here is shared between requests.

use axum::response::Html;
use serde::Serialize;

use crate::flash::{Flash, Page};
use crate::model::{UrlRecord, UserView};

/// View model for a single render
#[derive(Debug, Clone, Serialize)]
pub struct PageContext {
    pub page: Page,
    pub title: String,
    pub user: Option<UserView>,
    #[serde(rename = "errorMsg")]
    pub error: Option<String>,
    #[serde(rename = "shortURL")]
    pub bad_url: Option<String>,
}

impl PageContext {
    pub fn new(page: Page, user: Option<UserView>, flash: &Flash) -> Self {
        Self {
            page,
            title: page.title(),
            user,
            error: flash.message(page).map(str::to_string),
            bad_url: match page {
                Page::BadUrl => flash.bad_url().map(str::to_string),
                _ => None,
            },
        }
    }
}

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(ctx: &PageContext, content: &str) -> Html<String> {
    let nav = match &ctx.user {
        Some(user) => format!(
            r#"<span class="user">Logged in as {}</span>
      <a href="/urls">My URLs</a> <a href="/urls/new">Create New URL</a>
      <form method="POST" action="/logout" class="inline"><button type="submit">Log Out</button></form>"#,
            escape(&user.username)
        ),
        None => r#"<a href="/login">Log In</a> <a href="/register">Register</a>"#.to_string(),
    };

    let error = ctx
        .error
        .as_deref()
        .map(|msg| format!(r#"<div class="alert" role="alert">{}</div>"#, escape(msg)))
        .unwrap_or_default();

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8">
    <title>{title}</title>
  </head>
  <body>
    <nav><a href="/">BabyURL</a> <a href="/about">About</a> {nav}</nav>
    {error}
    <main>
{content}
    </main>
  </body>
</html>
"#,
        title = escape(&ctx.title),
    ))
}

pub fn home(ctx: &PageContext) -> Html<String> {
    layout(
        ctx,
        r#"<h1>BabyURL</h1>
<p>Shrink long links into tiny ones. <a href="/urls/new">Make a new URL</a>.</p>"#,
    )
}

pub fn about(ctx: &PageContext) -> Html<String> {
    layout(
        ctx,
        r#"<h1>About</h1>
<p>BabyURL turns long URLs into six character codes you can share.</p>"#,
    )
}

pub fn login(ctx: &PageContext) -> Html<String> {
    layout(
        ctx,
        r#"<h1>Log In</h1>
<form method="POST" action="/login">
  <label>Email or username <input type="text" name="username"></label>
  <label>Password <input type="password" name="password"></label>
  <button type="submit">Log In</button>
</form>"#,
    )
}

pub fn register(ctx: &PageContext) -> Html<String> {
    layout(
        ctx,
        r#"<h1>Register</h1>
<form method="POST" action="/register">
  <label>Email <input type="email" name="email"></label>
  <label>Username <input type="text" name="username"></label>
  <label>Password <input type="password" name="password"></label>
  <button type="submit">Register</button>
</form>"#,
    )
}

pub fn urls_index(ctx: &PageContext, urls: &[UrlRecord]) -> Html<String> {
    let rows: String = urls
        .iter()
        .map(|url| {
            let short = escape(&url.short_url);
            format!(
                r#"  <tr>
    <td><a href="/u/{short}">{short}</a></td>
    <td>{long}</td>
    <td>{visits}</td>
    <td><a href="/urls/{short}">Edit</a></td>
    <td><form method="POST" action="/urls/{short}/delete"><button type="submit">Delete</button></form></td>
  </tr>
"#,
                long = escape(&url.long_url),
                visits = url.visits,
            )
        })
        .collect();

    let content = if urls.is_empty() {
        r#"<h1>My URLs</h1>
<p>You haven't shortened anything yet. <a href="/urls/new">Make one</a>.</p>"#
            .to_string()
    } else {
        format!(
            r#"<h1>My URLs</h1>
<table>
  <tr><th>Short URL</th><th>Long URL</th><th>Visits</th><th></th><th></th></tr>
{rows}</table>"#
        )
    };

    layout(ctx, &content)
}

pub fn urls_new(ctx: &PageContext) -> Html<String> {
    layout(
        ctx,
        r#"<h1>Make a New URL</h1>
<form method="POST" action="/urls">
  <label>Long URL <input type="text" name="longURL" placeholder="http://"></label>
  <button type="submit">Shorten</button>
</form>"#,
    )
}

pub fn urls_show(ctx: &PageContext, url: &UrlRecord) -> Html<String> {
    let short = escape(&url.short_url);
    let content = format!(
        r#"<h1>Short URL <a href="/u/{short}">{short}</a></h1>
<p>Points to <a href="{long}">{long}</a>, followed {visits} times.</p>
<form method="POST" action="/urls/{short}?_method=PUT">
  <label>New long URL <input type="text" name="longURL" value="{long}"></label>
  <button type="submit">Update</button>
</form>"#,
        long = escape(&url.long_url),
        visits = url.visits,
    );
    layout(ctx, &content)
}

pub fn bad_url(ctx: &PageContext) -> Html<String> {
    let content = match ctx.bad_url.as_deref() {
        Some(code) => format!(
            r#"<h1>Short URL Not Found</h1>
<p>There is no short URL called <code>{}</code>.</p>"#,
            escape(code)
        ),
        None => "<h1>Short URL Not Found</h1>".to_string(),
    };
    layout(ctx, &content)
}
