use super::{ExtensionError, SignatureOutput, WalletExtension, WalletHost};
use async_trait::async_trait;
use serde_json::Value;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Wallet handles keyed by their global path, as collected from the host page.
#[derive(Default)]
pub struct InjectedHandles {
    handles: HashMap<String, Arc<dyn WalletExtension>>,
}

impl InjectedHandles {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `extension` under `path` (for example `phantom.solana`).
    #[must_use]
    pub fn with(mut self, path: &str, extension: Arc<dyn WalletExtension>) -> Self {
        self.handles.insert(path.to_string(), extension);
        self
    }
}

impl WalletHost for InjectedHandles {
    fn handle(&self, path: &str) -> Option<Arc<dyn WalletExtension>> {
        self.handles.get(path).cloned()
    }
}

/// Extension that answers from a fixed script and records what it was asked
/// to sign. Stands in for a real wallet during development and tests.
pub struct ScriptedExtension {
    connect: Result<Value, ExtensionError>,
    sign: Result<SignatureOutput, ExtensionError>,
    flags: Vec<String>,
    consent_delay: Option<Duration>,
    connect_calls: Mutex<usize>,
    signed: Mutex<Vec<(Vec<u8>, Option<String>)>>,
}

impl ScriptedExtension {
    pub fn new(public_key: impl Into<Value>, signature: SignatureOutput) -> Self {
        Self {
            connect: Ok(public_key.into()),
            sign: Ok(signature),
            flags: Vec::new(),
            consent_delay: None,
            connect_calls: Mutex::new(0),
            signed: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn rejecting_connect(mut self, message: &str) -> Self {
        self.connect = Err(ExtensionError::rejected(message));
        self
    }

    #[must_use]
    pub fn rejecting_sign(mut self, message: &str) -> Self {
        self.sign = Err(ExtensionError::rejected(message));
        self
    }

    #[must_use]
    pub fn with_flag(mut self, flag: &str) -> Self {
        self.flags.push(flag.to_string());
        self
    }

    /// Keeps the consent prompt open for `delay` before answering.
    #[must_use]
    pub fn with_consent_delay(mut self, delay: Duration) -> Self {
        self.consent_delay = Some(delay);
        self
    }

    #[must_use]
    pub fn connect_calls(&self) -> usize {
        *lock(&self.connect_calls)
    }

    /// Messages passed to `signMessage`, with their display hint.
    #[must_use]
    pub fn signed_messages(&self) -> Vec<(Vec<u8>, Option<String>)> {
        lock(&self.signed).clone()
    }

    async fn wait_for_user(&self) {
        if let Some(delay) = self.consent_delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl WalletExtension for ScriptedExtension {
    async fn connect(&self) -> Result<Value, ExtensionError> {
        *lock(&self.connect_calls) += 1;
        self.wait_for_user().await;
        self.connect.clone()
    }

    async fn sign_message(
        &self,
        message: &[u8],
        display: Option<&str>,
    ) -> Result<SignatureOutput, ExtensionError> {
        lock(&self.signed).push((message.to_vec(), display.map(ToString::to_string)));
        self.wait_for_user().await;
        self.sign.clone()
    }

    fn has_flag(&self, flag: &str) -> bool {
        self.flags.iter().any(|known| known == flag)
    }
}
