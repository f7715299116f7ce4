use crate::wallet::Provider;
use std::{
    collections::HashSet,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

/// Per-provider "attempt in flight" flags driving the sign-in buttons.
#[derive(Clone, Debug, Default)]
pub struct LoadingFlags {
    active: Arc<Mutex<HashSet<Provider>>>,
}

impl LoadingFlags {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<Provider>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn is_loading(&self, provider: Provider) -> bool {
        self.lock().contains(&provider)
    }

    #[must_use]
    pub fn any(&self) -> bool {
        !self.lock().is_empty()
    }

    /// Raises the flag for `provider`, or returns `None` when it is already up.
    /// The flag drops with the returned guard.
    #[must_use]
    pub fn try_begin(&self, provider: Provider) -> Option<LoadingGuard> {
        if self.lock().insert(provider) {
            Some(LoadingGuard {
                flags: self.clone(),
                provider,
            })
        } else {
            None
        }
    }
}

#[must_use = "the loading flag is cleared when the guard drops"]
#[derive(Debug)]
pub struct LoadingGuard {
    flags: LoadingFlags,
    provider: Provider,
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.flags.lock().remove(&self.provider);
    }
}
