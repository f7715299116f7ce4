//! Persistence surfaces shared by bootstrap, login and logout.
//!
//! Two independently writable stores exist. The cookie store is sent with every
//! backend request and holds the auth tokens under fixed names. The local
//! key/value store only ferries tokens across an OAuth redirect and must not
//! keep them once bootstrap has run. A third, tab-scoped key/value store is
//! wiped on logout. Nothing here coordinates across tabs: concurrent writers
//! are last-write-wins.

pub mod cookies;
mod file;
mod memory;

pub use file::{FileCookieJar, FileStorage};
pub use memory::{MemoryCookieJar, MemoryStorage};

use cookie::Cookie;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed storage contents: {0}")]
    Format(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Format(err.to_string())
    }
}

/// Cookie surface with `document.cookie` semantics.
///
/// `set` upserts the cookie identified by name, domain and path. A cookie whose
/// max-age is zero (or whose expiry lies in the past) deletes the stored cookie
/// with the same identity instead; a deletion with a different domain leaves the
/// original in place.
pub trait CookieStore: Send + Sync {
    fn get(&self, name: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, cookie: Cookie<'static>) -> Result<(), StorageError>;
}

/// String key/value surface with `localStorage` semantics.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
    fn clear(&self) -> Result<(), StorageError>;
}
