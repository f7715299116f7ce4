//! Host-application surfaces the auth subsystem drives but does not own:
//! page navigation, the cached server-data layer, and business-data stores
//! that must be emptied on logout.

use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Browser navigation.
pub trait Navigator: Send + Sync {
    /// Leaves the application for an external consent page.
    fn redirect(&self, url: &str);
    /// Opens `url` in a new tab, leaving the application in place.
    fn open_external(&self, url: &str);
    /// Full page load of `path` that replaces the current history entry.
    /// In-memory state does not survive it.
    fn replace(&self, path: &str);
}

/// Cached server-data query results.
pub trait QueryCache: Send + Sync {
    fn clear(&self);
}

/// Business-data store reset on logout (open flow, collections, ...).
pub trait ResettableStore: Send + Sync {
    fn name(&self) -> &str;
    fn reset(&self);
}

/// A navigation request as recorded by [`RecordingNavigator`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Navigation {
    Redirect(String),
    OpenExternal(String),
    Replace(String),
}

/// Navigator that records requests instead of performing them. The CLI uses it
/// to report where a browser would have gone.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    history: Mutex<Vec<Navigation>>,
}

impl RecordingNavigator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn history(&self) -> Vec<Navigation> {
        lock(&self.history).clone()
    }

    #[must_use]
    pub fn last(&self) -> Option<Navigation> {
        lock(&self.history).last().cloned()
    }
}

impl Navigator for RecordingNavigator {
    fn redirect(&self, url: &str) {
        debug!("redirect requested");
        lock(&self.history).push(Navigation::Redirect(url.to_string()));
    }

    fn open_external(&self, url: &str) {
        debug!(url, "external page requested");
        lock(&self.history).push(Navigation::OpenExternal(url.to_string()));
    }

    fn replace(&self, path: &str) {
        debug!(path, "hard navigation requested");
        lock(&self.history).push(Navigation::Replace(path.to_string()));
    }
}

/// Query cache that only counts how often it was cleared.
#[derive(Debug, Default)]
pub struct CountingQueryCache {
    clears: Mutex<usize>,
}

impl CountingQueryCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn clears(&self) -> usize {
        *lock(&self.clears)
    }
}

impl QueryCache for CountingQueryCache {
    fn clear(&self) {
        *lock(&self.clears) += 1;
    }
}

/// Named store that counts its resets.
#[derive(Debug)]
pub struct CountingStore {
    name: String,
    resets: Mutex<usize>,
}

impl CountingStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            resets: Mutex::new(0),
        }
    }

    #[must_use]
    pub fn resets(&self) -> usize {
        *lock(&self.resets)
    }
}

impl ResettableStore for CountingStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn reset(&self) {
        *lock(&self.resets) += 1;
    }
}
