//! User-facing error notifications raised by the login flows.

use crate::{
    error::AuthError,
    wallet::{Provider, WalletProvider},
};
use serde::Serialize;

pub const GOOGLE_NOT_CONFIGURED: &str = "Google OAuth is not configured by the administrator. \
     Please use username/password login or try a wallet.";

/// Title plus message lines, rendered by the host as an error alert.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub list: Vec<String>,
}

impl Notification {
    pub fn new(title: impl Into<String>, list: Vec<String>) -> Self {
        Self {
            title: title.into(),
            list,
        }
    }

    /// Maps a failed login attempt to the alert shown to the user.
    #[must_use]
    pub fn for_error(provider: Provider, err: &AuthError) -> Self {
        match provider {
            Provider::Google => Self::new("Google Sign-In Not Available", vec![google_message(err)]),
            Provider::Wallet(wallet) => match err {
                AuthError::NotInstalled(_) => Self::new(
                    format!("{} Wallet Not Found", wallet.name()),
                    vec![format!(
                        "Please install {} wallet extension and refresh the page.",
                        wallet.name()
                    )],
                ),
                _ => Self::new(
                    format!("{} Sign-In Error", wallet.name()),
                    vec![wallet_message(wallet, err)],
                ),
            },
        }
    }
}

fn google_message(err: &AuthError) -> String {
    match err {
        AuthError::ConfigurationMissing(_) => GOOGLE_NOT_CONFIGURED.to_string(),
        AuthError::ServerUnreachable(detail) => unreachable_message(detail),
        AuthError::InvalidResponse(detail) | AuthError::Server { detail, .. } => detail.clone(),
        other => other.to_string(),
    }
}

fn wallet_message(wallet: WalletProvider, err: &AuthError) -> String {
    match err {
        AuthError::NotInstalled(_) => format!(
            "Please install {} wallet extension and refresh the page.",
            wallet.name()
        ),
        AuthError::UserRejected(_) => {
            format!("The request was declined in {}. Please try again.", wallet.name())
        }
        AuthError::ConsentTimeout => format!(
            "{} did not respond in time. Please try again.",
            wallet.name()
        ),
        AuthError::ServerUnreachable(detail) => unreachable_message(detail),
        AuthError::ConfigurationMissing(detail) => {
            format!("Wallet sign-in is not configured: {detail}")
        }
        AuthError::InvalidSignatureFormat => format!(
            "{} returned a signature in an unsupported format.",
            wallet.name()
        ),
        // verify detail is shown verbatim
        AuthError::VerificationFailed(detail)
        | AuthError::InvalidResponse(detail)
        | AuthError::Server { detail, .. } => detail.clone(),
        AuthError::BootstrapParse(_) | AuthError::Storage(_) => {
            format!("Failed to sign in with {} wallet.", wallet.name())
        }
    }
}

fn unreachable_message(detail: &str) -> String {
    if detail.is_empty() {
        "Unable to reach the server. Please check your connection and try again.".to_string()
    } else {
        format!("Unable to reach the server. Please check your connection and try again. ({detail})")
    }
}
