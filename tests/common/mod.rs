//! Shared helpers for the integration tests
//!
//! [`TestClient`] drives the router with `oneshot` and carries the session
//! cookie from one request to the next, like a browser would.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use tinyapp::config::Config;
use tinyapp::database::{AppState, Store};
use tinyapp::route::create_app;

pub struct TestResponse {
    pub status: StatusCode,
    pub location: Option<String>,
    pub body: String,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).expect("Failed to parse JSON")
    }
}

pub struct TestClient {
    app: Router,
    cookie: Option<String>,
}

impl TestClient {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let store = Store::in_memory(config.key_length).expect("Failed to create in-memory store");
        Self::from_app(create_app(AppState::new(store, config)))
    }

    /// A second visitor on the same app, without this client's cookie
    pub fn other_visitor(&self) -> Self {
        Self::from_app(self.app.clone())
    }

    fn from_app(app: Router) -> Self {
        Self { app, cookie: None }
    }

    pub fn has_session(&self) -> bool {
        self.cookie.is_some()
    }

    pub async fn get(&mut self, uri: &str) -> TestResponse {
        self.send(Method::GET, uri, None).await
    }

    pub async fn post_form(&mut self, uri: &str, fields: &[(&str, &str)]) -> TestResponse {
        self.send(Method::POST, uri, Some(encode_form(fields))).await
    }

    pub async fn put_form(&mut self, uri: &str, fields: &[(&str, &str)]) -> TestResponse {
        self.send(Method::PUT, uri, Some(encode_form(fields))).await
    }

    pub async fn delete(&mut self, uri: &str) -> TestResponse {
        self.send(Method::DELETE, uri, None).await
    }

    pub async fn send(&mut self, method: Method, uri: &str, form: Option<String>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = &self.cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let body = match form {
            Some(form) => {
                builder = builder.header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
                Body::from(form)
            }
            None => Body::empty(),
        };

        let response = self
            .app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        for value in response.headers().get_all(header::SET_COOKIE) {
            let value = value.to_str().unwrap();
            let pair = value.split(';').next().unwrap().trim();
            let removed = pair.ends_with('=') || value.to_ascii_lowercase().contains("max-age=0");
            self.cookie = if removed { None } else { Some(pair.to_string()) };
        }

        let status = response.status();
        let location = response
            .headers()
            .get(header::LOCATION)
            .map(|v| v.to_str().expect("Location header is not ASCII").to_string());
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read response body")
            .to_bytes();

        TestResponse {
            status,
            location,
            body: String::from_utf8(bytes.to_vec()).unwrap(),
        }
    }

    /// Registers and stays logged in
    pub async fn register(&mut self, email: &str, username: &str, password: &str) -> TestResponse {
        self.post_form(
            "/register",
            &[("email", email), ("username", username), ("password", password)],
        )
        .await
    }

    /// Creates a short URL and returns its key
    pub async fn create_url(&mut self, long_url: &str) -> String {
        let response = self.post_form("/urls", &[("longURL", long_url)]).await;
        assert_eq!(response.status, StatusCode::SEE_OTHER, "create failed: {}", response.body);
        response
            .location
            .expect("missing location")
            .trim_start_matches("/urls/")
            .to_string()
    }
}

fn encode_form(fields: &[(&str, &str)]) -> String {
    serde_urlencoded::to_string(fields).expect("Failed to encode form")
}
