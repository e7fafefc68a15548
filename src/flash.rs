//! One-time error messages shown on rendered pages
//!
//! Handlers call [`Flash::add_error`] (or one of its helpers) when something
//! goes wrong for the user. A middleware pass runs [`Flash::tick`] on every
//! request before the handler:
//!
//! ```text
//! Clear --add_error--> Showing --tick--> PendingRemoval --tick--> Clear (messages wiped)
//! ```
//!
//! so a message added while handling request N is rendered in N, survives the
//! redirect or reload that makes up request N+1, and is gone by N+2.
//!
//! The state lives in the visitor's session, never in process-wide globals.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tower_sessions::Session;

/// Session key the flash state is stored under
pub const FLASH_KEY: &str = "flash";

const TITLE_BASE: &str = "BabyURL: ";

/// Every page the app renders
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Page {
    Home,
    About,
    Login,
    Register,
    UrlsIndex,
    UrlsNew,
    UrlsShow,
    BadUrl,
}

impl Page {
    pub const ALL: [Page; 8] = [
        Page::Home,
        Page::About,
        Page::Login,
        Page::Register,
        Page::UrlsIndex,
        Page::UrlsNew,
        Page::UrlsShow,
        Page::BadUrl,
    ];

    pub fn title(self) -> String {
        let name = match self {
            Page::Home => "A URL Shortener",
            Page::About => "About",
            Page::Login => "Log In",
            Page::Register => "Register",
            Page::UrlsIndex => "My URLs",
            Page::UrlsNew => "Make a New URL",
            Page::UrlsShow => "URL ID",
            Page::BadUrl => "Short URL Not Found",
        };
        format!("{TITLE_BASE}{name}")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlashState {
    #[default]
    Clear,
    Showing,
    PendingRemoval,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    state: FlashState,
    messages: BTreeMap<Page, String>,
    /// Unknown short URL reported on the bad URL page
    bad_url: Option<String>,
}

impl Flash {
    pub fn state(&self) -> FlashState {
        self.state
    }

    pub fn message(&self, page: Page) -> Option<&str> {
        self.messages.get(&page).map(String::as_str)
    }

    pub fn bad_url(&self) -> Option<&str> {
        self.bad_url.as_deref()
    }

    /// Puts `message` on `page` and restarts the show-once cycle. A pending
    /// removal is cancelled so the new message is not wiped on the next pass.
    pub fn add_error(&mut self, page: Page, message: impl Into<String>) {
        self.messages.insert(page, message.into());
        self.state = FlashState::Showing;
    }

    pub fn add_login_error(&mut self, action: &str) {
        self.add_error(Page::Login, format!("You have to log in to {action}!"));
    }

    pub fn add_permissions_error(&mut self, action: &str) {
        self.add_error(
            Page::UrlsIndex,
            format!("You can't {action} URLs that don't belong to you!"),
        );
    }

    pub fn add_registration_error(&mut self, message: impl Into<String>) {
        self.add_error(Page::Register, message);
    }

    pub fn add_login_validation_error(&mut self, message: impl Into<String>) {
        self.add_error(Page::Login, message);
    }

    pub fn add_bad_url_error(&mut self, short_url: &str) {
        self.bad_url = Some(short_url.to_string());
        self.state = FlashState::Showing;
    }

    /// Advances the state machine once. Returns `true` if anything changed.
    pub fn tick(&mut self) -> bool {
        match self.state {
            FlashState::Clear => false,
            FlashState::Showing => {
                self.state = FlashState::PendingRemoval;
                true
            }
            FlashState::PendingRemoval => {
                self.wipe();
                true
            }
        }
    }

    pub fn wipe(&mut self) {
        self.messages.clear();
        self.bad_url = None;
        self.state = FlashState::Clear;
    }

    pub async fn load(session: &Session) -> Result<Self, tower_sessions::session::Error> {
        Ok(session.get::<Self>(FLASH_KEY).await?.unwrap_or_default())
    }

    /// Writes the flash back to the session. A cleared flash is removed from
    /// the session instead so anonymous visitors don't get a cookie for it.
    pub async fn save(&self, session: &Session) -> Result<(), tower_sessions::session::Error> {
        if *self == Self::default() {
            session.remove::<Self>(FLASH_KEY).await?;
        } else {
            session.insert(FLASH_KEY, self).await?;
        }
        Ok(())
    }
}
