//! Request and response payloads for the identity backend. Token responses
//! carry bearer credentials, so they are not `Debug` and must never be logged.

use crate::wallet::WalletProvider;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Debug, Deserialize)]
pub struct AuthorizeResponse {
    pub authorization_url: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct VerifyRequest {
    #[serde(rename = "publicKey")]
    pub public_key: String,
    pub signature: Vec<u8>,
    pub message: String,
    pub provider: WalletProvider,
}

#[derive(Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Tokens issued after a successful verification.
pub struct TokenPair {
    pub access_token: SecretString,
    pub refresh_token: Option<SecretString>,
}

impl From<TokenResponse> for TokenPair {
    fn from(response: TokenResponse) -> Self {
        Self {
            access_token: SecretString::from(response.access_token),
            refresh_token: response.refresh_token.map(SecretString::from),
        }
    }
}

/// Error body: `{"detail": "..."}` or `{"detail": {"message": "...", "configured": false}}`.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub detail: Option<Value>,
}

impl ErrorBody {
    pub fn message(&self) -> Option<String> {
        match self.detail.as_ref()? {
            Value::String(message) => Some(message.clone()),
            Value::Object(map) => map
                .get("message")
                .and_then(Value::as_str)
                .map(ToString::to_string),
            _ => None,
        }
    }

    /// True when the backend says the provider has not been set up.
    pub fn not_configured(&self) -> bool {
        let flagged = self
            .detail
            .as_ref()
            .and_then(|detail| detail.get("configured"))
            .and_then(Value::as_bool)
            == Some(false);
        flagged
            || self
                .message()
                .is_some_and(|message| message.to_lowercase().contains("not configured"))
    }
}
