use crate::storage::StorageError;
use crate::wallet::WalletProvider;
use thiserror::Error;

/// Failures of a login, bootstrap or logout step.
///
/// Every variant is caught at the flow boundary and turned into a
/// [`crate::notify::Notification`]; none of them escape as unhandled failures.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("{0} wallet is not installed")]
    NotInstalled(WalletProvider),
    #[error("request rejected by user: {0}")]
    UserRejected(String),
    #[error("wallet did not answer before the consent timeout")]
    ConsentTimeout,
    #[error("unable to reach the server: {0}")]
    ServerUnreachable(String),
    #[error("provider is not configured: {0}")]
    ConfigurationMissing(String),
    #[error("unsupported signature format")]
    InvalidSignatureFormat,
    #[error("{0}")]
    VerificationFailed(String),
    #[error("request failed ({status}): {detail}")]
    Server { status: u16, detail: String },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("unable to read persisted session: {0}")]
    BootstrapParse(String),
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<StorageError> for AuthError {
    fn from(err: StorageError) -> Self {
        Self::Storage(err.to_string())
    }
}
