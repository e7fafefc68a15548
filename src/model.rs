//! Data models for TinyApp
//!
//! Records stored in the database plus the form payloads posted by the
//! browser. Field names on the forms follow the HTML inputs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// A shortened URL stored in the database
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UrlRecord {
    /// The generated key (e.g. "b2xVn2")
    #[serde(rename = "shortURL")]
    pub short_url: String,

    /// Where `/u/{short_url}` redirects to
    #[serde(rename = "longURL")]
    pub long_url: String,

    /// Id of the user that created this URL
    #[serde(rename = "userID")]
    pub owner_id: String,

    pub created_at: DateTime<Utc>,

    /// Number of times `/u/{short_url}` has been followed
    #[serde(default)]
    pub visits: u64,
}

/// A registered user
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,

    /// Argon2 PHC string, never rendered or returned from the debug endpoints
    #[serde(rename = "passwordHash")]
    pub password_hash: String,

    pub created_at: DateTime<Utc>,
}

/// Public view of a [`User`]
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct UserView {
    pub id: String,
    pub username: String,
    pub email: String,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
        }
    }
}

/// Form posted to `POST /register`
#[derive(Deserialize, Debug, Default)]
pub struct RegisterForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Form posted to `POST /login`
///
/// `username` holds whatever the user typed, either an email or a username.
#[derive(Deserialize, Debug, Default)]
pub struct LoginForm {
    #[serde(default, alias = "email")]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Form posted when creating or editing a short URL
#[derive(Deserialize, Debug, Default)]
pub struct UrlForm {
    #[serde(default, rename = "longURL")]
    pub long_url: String,
}

impl UrlForm {
    /// Parses the typed long URL, prefixing `http://` when no scheme was
    /// typed. `Ok(None)` means the field was left blank.
    ///
    /// The result is the serialized [`Url`], percent-encoded ASCII, so it can
    /// go straight into a `Location` header.
    pub fn normalized(&self) -> Result<Option<String>, url::ParseError> {
        let input = self.long_url.trim();
        if input.is_empty() {
            return Ok(None);
        }

        let url = match Url::parse(input) {
            Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(&format!("http://{input}"))?,
            parsed => parsed?,
        };
        Ok(Some(url.into()))
    }
}

/// `?_method=` query used by HTML forms to reach `PUT`/`DELETE` routes
#[derive(Deserialize, Debug, Default)]
pub struct MethodOverride {
    #[serde(rename = "_method")]
    pub method: Option<String>,
}
