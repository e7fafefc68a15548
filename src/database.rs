//! Database initialization, table definitions and record access
//!
//! Everything lives in an embedded redb database. By default it uses redb's
//! in-memory backend, so like the rest of TinyApp the data disappears when the
//! process exits; a file path can be configured instead. Records are stored as
//! JSON strings, and every read-modify-write happens inside a single write
//! transaction.

use std::sync::Arc;

use chrono::Utc;
use redb::backends::InMemoryBackend;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use thiserror::Error;

use crate::config::Config;
use crate::keygen::random_key;
use crate::model::{UrlRecord, User};

/// Short URL records
///
/// Key: short URL key (e.g. "b2xVn2")
/// Value: JSON-serialized [`UrlRecord`]
pub const TABLE_URLS: TableDefinition<&str, &str> = TableDefinition::new("urls_v1");

/// Registered users
///
/// Key: user id
/// Value: JSON-serialized [`User`]
pub const TABLE_USERS: TableDefinition<&str, &str> = TableDefinition::new("users_v1");

/// Secondary index from lowercased email to user id
pub const TABLE_EMAIL_INDEX: TableDefinition<&str, &str> = TableDefinition::new("email_index_v1");

/// Secondary index from trimmed username to user id. Usernames are matched
/// exactly, case included.
pub const TABLE_USERNAME_INDEX: TableDefinition<&str, &str> = TableDefinition::new("username_index_v1");

/// Secondary index for listing a user's URLs
///
/// Key: composite "{owner_id}:{short_url}"
/// Value: short URL key
///
/// Ids and keys are alphanumeric, so ':' never appears inside either half.
pub const TABLE_OWNER_INDEX: TableDefinition<&str, &str> = TableDefinition::new("owner_index_v1");

/// How many fresh keys to try before giving up on an insert
const MAX_KEY_ATTEMPTS: usize = 16;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("email already registered")]
    EmailTaken,
    #[error("username already taken")]
    UsernameTaken,
    #[error("no free key found after {0} attempts")]
    KeysExhausted(usize),
    #[error(transparent)]
    Database(#[from] redb::DatabaseError),
    #[error(transparent)]
    Transaction(#[from] redb::TransactionError),
    #[error(transparent)]
    Table(#[from] redb::TableError),
    #[error(transparent)]
    Storage(#[from] redb::StorageError),
    #[error(transparent)]
    Commit(#[from] redb::CommitError),
    #[error(transparent)]
    Codec(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Application state shared across all request handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Store, config: Config) -> Self {
        Self {
            store: Arc::new(store),
            config: Arc::new(config),
        }
    }
}

/// Initializes the database and creates all tables
///
/// * `db_path` - `Some(path)` creates or opens a redb file, `None` keeps the
///   database in memory
pub fn init_db(db_path: Option<&str>) -> StoreResult<Database> {
    let db = match db_path {
        Some(path) => Database::create(path)?,
        None => Database::builder().create_with_backend(InMemoryBackend::new())?,
    };

    let write_txn = db.begin_write()?;
    {
        write_txn.open_table(TABLE_URLS)?;
        write_txn.open_table(TABLE_USERS)?;
        write_txn.open_table(TABLE_EMAIL_INDEX)?;
        write_txn.open_table(TABLE_USERNAME_INDEX)?;
        write_txn.open_table(TABLE_OWNER_INDEX)?;
    }
    write_txn.commit()?;

    Ok(db)
}

/// Typed access to the URL and user tables
pub struct Store {
    db: Database,
    key_length: usize,
}

impl Store {
    pub fn new(db: Database, key_length: usize) -> Self {
        Self { db, key_length }
    }

    /// Fresh in-memory store, mostly for tests
    pub fn in_memory(key_length: usize) -> StoreResult<Self> {
        Ok(Self::new(init_db(None)?, key_length))
    }

    pub fn key_length(&self) -> usize {
        self.key_length
    }

    /// Stores `long_url` under a newly generated key owned by `owner_id`.
    ///
    /// Generated keys are checked against existing ones, so a collision
    /// retries instead of overwriting another user's URL.
    pub fn create_url(&self, long_url: &str, owner_id: &str) -> StoreResult<UrlRecord> {
        let write_txn = self.db.begin_write()?;
        let record = {
            let mut urls = write_txn.open_table(TABLE_URLS)?;

            let mut short_url = None;
            for _ in 0..MAX_KEY_ATTEMPTS {
                let candidate = random_key(self.key_length);
                if urls.get(candidate.as_str())?.is_none() {
                    short_url = Some(candidate);
                    break;
                }
            }
            let short_url = short_url.ok_or(StoreError::KeysExhausted(MAX_KEY_ATTEMPTS))?;

            let record = UrlRecord {
                short_url,
                long_url: long_url.to_string(),
                owner_id: owner_id.to_string(),
                created_at: Utc::now(),
                visits: 0,
            };
            let record_json = serde_json::to_string(&record)?;
            urls.insert(record.short_url.as_str(), record_json.as_str())?;

            let mut owners = write_txn.open_table(TABLE_OWNER_INDEX)?;
            let index_key = owner_index_key(owner_id, &record.short_url);
            owners.insert(index_key.as_str(), record.short_url.as_str())?;

            record
        };
        write_txn.commit()?;

        Ok(record)
    }

    pub fn get_url(&self, short_url: &str) -> StoreResult<Option<UrlRecord>> {
        let read_txn = self.db.begin_read()?;
        let urls = read_txn.open_table(TABLE_URLS)?;

        let record = match urls.get(short_url)? {
            Some(value) => Some(serde_json::from_str(value.value())?),
            None => None,
        };
        Ok(record)
    }

    /// Points an existing short URL somewhere else. Returns `None` if the key
    /// does not exist.
    pub fn update_url(&self, short_url: &str, long_url: &str) -> StoreResult<Option<UrlRecord>> {
        self.modify_url(short_url, |record| record.long_url = long_url.to_string())
    }

    /// Bumps the visit counter of a short URL, returning the updated record
    pub fn record_visit(&self, short_url: &str) -> StoreResult<Option<UrlRecord>> {
        self.modify_url(short_url, |record| record.visits += 1)
    }

    fn modify_url<F>(&self, short_url: &str, change: F) -> StoreResult<Option<UrlRecord>>
    where
        F: FnOnce(&mut UrlRecord),
    {
        let write_txn = self.db.begin_write()?;
        let updated = {
            let mut urls = write_txn.open_table(TABLE_URLS)?;

            let existing = urls.get(short_url)?.map(|guard| guard.value().to_string());
            match existing {
                Some(json) => {
                    let mut record: UrlRecord = serde_json::from_str(&json)?;
                    change(&mut record);
                    let record_json = serde_json::to_string(&record)?;
                    urls.insert(short_url, record_json.as_str())?;
                    Some(record)
                }
                None => None,
            }
        };
        write_txn.commit()?;

        Ok(updated)
    }

    /// Removes a short URL and its owner index entry. Returns the deleted
    /// record, or `None` if the key did not exist.
    pub fn delete_url(&self, short_url: &str) -> StoreResult<Option<UrlRecord>> {
        let write_txn = self.db.begin_write()?;
        let deleted = {
            let mut urls = write_txn.open_table(TABLE_URLS)?;
            let removed = urls.remove(short_url)?.map(|guard| guard.value().to_string());

            match removed {
                Some(json) => {
                    let record: UrlRecord = serde_json::from_str(&json)?;
                    let mut owners = write_txn.open_table(TABLE_OWNER_INDEX)?;
                    owners.remove(owner_index_key(&record.owner_id, short_url).as_str())?;
                    Some(record)
                }
                None => None,
            }
        };
        write_txn.commit()?;

        Ok(deleted)
    }

    /// All URLs owned by `owner_id`, ordered by key
    pub fn urls_for_owner(&self, owner_id: &str) -> StoreResult<Vec<UrlRecord>> {
        let read_txn = self.db.begin_read()?;
        let owners = read_txn.open_table(TABLE_OWNER_INDEX)?;
        let urls = read_txn.open_table(TABLE_URLS)?;

        // "{owner}:" up to "{owner}:{" covers every key with that prefix,
        // '{' sorts right after the alphanumerics
        let start_key = format!("{owner_id}:");
        let end_key = format!("{owner_id}:{{");

        let mut records = Vec::new();
        for entry in owners.range(start_key.as_str()..end_key.as_str())? {
            let (_, short_url) = entry?;
            if let Some(value) = urls.get(short_url.value())? {
                records.push(serde_json::from_str(value.value())?);
            }
        }
        Ok(records)
    }

    pub fn all_urls(&self) -> StoreResult<Vec<UrlRecord>> {
        let read_txn = self.db.begin_read()?;
        let urls = read_txn.open_table(TABLE_URLS)?;

        let mut records = Vec::new();
        for entry in urls.iter()? {
            let (_, value) = entry?;
            records.push(serde_json::from_str(value.value())?);
        }
        Ok(records)
    }

    /// Registers a user. Fails with [`StoreError::EmailTaken`] if the email is
    /// already in use (compared case-insensitively) and with
    /// [`StoreError::UsernameTaken`] if the username is.
    pub fn create_user(&self, username: &str, email: &str, password_hash: &str) -> StoreResult<User> {
        let email_key = email.trim().to_lowercase();
        let username_key = username.trim();

        let write_txn = self.db.begin_write()?;
        let user = {
            let mut emails = write_txn.open_table(TABLE_EMAIL_INDEX)?;
            if emails.get(email_key.as_str())?.is_some() {
                return Err(StoreError::EmailTaken);
            }
            let mut usernames = write_txn.open_table(TABLE_USERNAME_INDEX)?;
            if usernames.get(username_key)?.is_some() {
                return Err(StoreError::UsernameTaken);
            }

            let mut users = write_txn.open_table(TABLE_USERS)?;
            let mut id = None;
            for _ in 0..MAX_KEY_ATTEMPTS {
                let candidate = random_key(self.key_length);
                if users.get(candidate.as_str())?.is_none() {
                    id = Some(candidate);
                    break;
                }
            }
            let id = id.ok_or(StoreError::KeysExhausted(MAX_KEY_ATTEMPTS))?;

            let user = User {
                id,
                username: username_key.to_string(),
                email: email.trim().to_string(),
                password_hash: password_hash.to_string(),
                created_at: Utc::now(),
            };
            let user_json = serde_json::to_string(&user)?;
            users.insert(user.id.as_str(), user_json.as_str())?;
            emails.insert(email_key.as_str(), user.id.as_str())?;
            usernames.insert(username_key, user.id.as_str())?;

            user
        };
        write_txn.commit()?;

        Ok(user)
    }

    pub fn get_user(&self, id: &str) -> StoreResult<Option<User>> {
        let read_txn = self.db.begin_read()?;
        let users = read_txn.open_table(TABLE_USERS)?;

        let user = match users.get(id)? {
            Some(value) => Some(serde_json::from_str(value.value())?),
            None => None,
        };
        Ok(user)
    }

    pub fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let email_key = email.trim().to_lowercase();

        let id = {
            let read_txn = self.db.begin_read()?;
            let emails = read_txn.open_table(TABLE_EMAIL_INDEX)?;
            let id = emails.get(email_key.as_str())?.map(|guard| guard.value().to_string());
            id
        };

        match id {
            Some(id) => self.get_user(&id),
            None => Ok(None),
        }
    }

    pub fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let id = {
            let read_txn = self.db.begin_read()?;
            let usernames = read_txn.open_table(TABLE_USERNAME_INDEX)?;
            let id = usernames.get(username.trim())?.map(|guard| guard.value().to_string());
            id
        };

        match id {
            Some(id) => self.get_user(&id),
            None => Ok(None),
        }
    }

    /// Looks a user up by the identifier typed into the login form: an email
    /// first, then an exact username match.
    pub fn find_user_by_login(&self, identifier: &str) -> StoreResult<Option<User>> {
        match self.find_user_by_email(identifier)? {
            Some(user) => Ok(Some(user)),
            None => self.find_user_by_username(identifier),
        }
    }

    pub fn all_users(&self) -> StoreResult<Vec<User>> {
        let read_txn = self.db.begin_read()?;
        let users = read_txn.open_table(TABLE_USERS)?;

        let mut records = Vec::new();
        for entry in users.iter()? {
            let (_, value) = entry?;
            records.push(serde_json::from_str(value.value())?);
        }
        Ok(records)
    }
}

fn owner_index_key(owner_id: &str, short_url: &str) -> String {
    format!("{owner_id}:{short_url}")
}
