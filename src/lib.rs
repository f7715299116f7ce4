//! # wallet-session
//!
//! Client-side authentication and session lifecycle for a web application that
//! signs users in with browser wallet extensions (Phantom, Solflare, Backpack)
//! or a Google OAuth redirect.
//!
//! ## Flows
//!
//! ### Wallet challenge/response
//!
//! 1. **Connect:** the wallet extension shows its consent prompt and returns a public key.
//! 2. **Challenge:** the client fetches a single-use `{message, nonce}` from
//!    `/api/v1/oauth/phantom/message`.
//! 3. **Sign:** the extension signs the UTF-8 message; the signature is normalized to bytes.
//! 4. **Verify:** the client POSTs `{publicKey, signature, message, provider}` to
//!    `/api/v1/oauth/phantom/verify` and receives an access/refresh token pair.
//! 5. **Establish:** tokens are written as cookies and the in-memory session logs in.
//!
//! ### Google redirect
//!
//! The client asks `/api/v1/oauth/google/authorize` for a consent URL and navigates
//! away. Tokens come back on the next page load, either as query parameters or
//! pre-seeded into the local key/value store, and [`session::bootstrap`] promotes
//! them into cookies exactly once.
//!
//! ### Logout
//!
//! [`session::logout`] invalidates the server session (unless auto-login is on),
//! then purges every local trace of the session regardless of the network outcome
//! and forces a full page load of `/login`.
//!
//! Browser surfaces (extensions, cookies, `localStorage`, navigation) sit behind the
//! traits in [`wallet`], [`storage`] and [`host`], so the same logic runs in a wasm
//! frontend, in tests and in the bundled CLI. Tokens are kept as
//! [`secrecy::SecretString`] and must never be logged.

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod flow;
pub mod host;
pub mod notify;
pub mod session;
pub mod storage;
pub mod wallet;

pub use config::AuthConfig;
pub use error::AuthError;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
