//! Wallet extension capability layer.
//!
//! Browser wallets inject a global handle (`window.phantom.solana`,
//! `window.solflare`, `window.backpack`, ...) whose connect and sign calls
//! disagree on argument and result shapes. [`WalletAdapter`] hides those
//! differences behind one contract; the per-provider details live on the
//! tagged [`WalletProvider`] enum. Only the login flow consumes this module.

mod adapter;
mod host;
mod normalize;

pub use adapter::WalletAdapter;
pub use host::{InjectedHandles, ScriptedExtension};
pub use normalize::{normalize_public_key, normalize_signature};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{fmt, sync::Arc};

/// Browser wallet supported for challenge/response login.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletProvider {
    Phantom,
    Solflare,
    Backpack,
}

/// Where a provider's injected handle lives. An alias may require a marker
/// flag because several wallets compete for the same global.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HandlePath {
    pub path: &'static str,
    pub requires_flag: Option<&'static str>,
}

impl WalletProvider {
    pub const ALL: [Self; 3] = [Self::Phantom, Self::Solflare, Self::Backpack];

    /// Display name used in user-facing messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Phantom => "Phantom",
            Self::Solflare => "Solflare",
            Self::Backpack => "Backpack",
        }
    }

    /// Wire name sent to the verify endpoint.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Phantom => "phantom",
            Self::Solflare => "solflare",
            Self::Backpack => "backpack",
        }
    }

    /// Primary handle first, then the alias.
    #[must_use]
    pub const fn handle_paths(self) -> [HandlePath; 2] {
        match self {
            Self::Phantom => [
                HandlePath {
                    path: "phantom.solana",
                    requires_flag: None,
                },
                HandlePath {
                    path: "solana",
                    requires_flag: Some("isPhantom"),
                },
            ],
            Self::Solflare => [
                HandlePath {
                    path: "solflare",
                    requires_flag: None,
                },
                HandlePath {
                    path: "SolflareApp",
                    requires_flag: None,
                },
            ],
            Self::Backpack => [
                HandlePath {
                    path: "backpack",
                    requires_flag: None,
                },
                HandlePath {
                    path: "xnft.solana",
                    requires_flag: None,
                },
            ],
        }
    }

    #[must_use]
    pub const fn install_url(self) -> &'static str {
        match self {
            Self::Phantom => "https://phantom.app/",
            Self::Solflare => "https://solflare.com/",
            Self::Backpack => "https://backpack.app/",
        }
    }

    /// Display-encoding hint passed to `signMessage`; Backpack takes none.
    #[must_use]
    pub const fn sign_display(self) -> Option<&'static str> {
        match self {
            Self::Phantom | Self::Solflare => Some("utf8"),
            Self::Backpack => None,
        }
    }
}

impl fmt::Display for WalletProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Identity mechanism behind a sign-in button.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Provider {
    Google,
    Wallet(WalletProvider),
}

impl Provider {
    pub const ALL: [Self; 4] = [
        Self::Google,
        Self::Wallet(WalletProvider::Phantom),
        Self::Wallet(WalletProvider::Solflare),
        Self::Wallet(WalletProvider::Backpack),
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Google => "Google",
            Self::Wallet(wallet) => wallet.name(),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<WalletProvider> for Provider {
    fn from(wallet: WalletProvider) -> Self {
        Self::Wallet(wallet)
    }
}

/// Result of a successful `connect()`, one per attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WalletConnection {
    pub provider: WalletProvider,
    pub public_key: Option<String>,
    pub connected: bool,
}

/// Single-use message a wallet signs to prove key ownership. It lives for one
/// login attempt and is consumed by it.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Challenge {
    pub message: String,
    pub nonce: String,
}

/// Raw `signMessage` output before normalization.
#[derive(Clone, Debug, PartialEq)]
pub enum SignatureOutput {
    /// Typed byte buffer (`Uint8Array`, `Buffer`).
    Bytes(Vec<u8>),
    /// Anything that crossed the bridge as JSON: a numeric array, a serialized
    /// typed array, or a wrapper object exposing `signature`.
    Json(Value),
}

/// Failure reported by the extension itself, usually a declined prompt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtensionError {
    /// Provider error code; `4001` is the conventional user rejection.
    pub code: Option<i64>,
    pub message: String,
}

impl ExtensionError {
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            code: Some(4001),
            message: message.into(),
        }
    }
}

impl fmt::Display for ExtensionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "{} (code {code})", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// An injected wallet handle.
#[async_trait]
pub trait WalletExtension: Send + Sync {
    /// Opens the provider's consent UI; resolves with its public key output,
    /// either a string or an object holding one.
    async fn connect(&self) -> Result<Value, ExtensionError>;

    /// Signs raw message bytes.
    async fn sign_message(
        &self,
        message: &[u8],
        display: Option<&str>,
    ) -> Result<SignatureOutput, ExtensionError>;

    /// Marker flags such as `isPhantom`.
    fn has_flag(&self, _flag: &str) -> bool {
        false
    }
}

/// Lookup of injected globals (the `window` object in a browser).
pub trait WalletHost: Send + Sync {
    fn handle(&self, path: &str) -> Option<Arc<dyn WalletExtension>>;
}
