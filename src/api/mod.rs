//! HTTP client for the identity backend with a uniform timeout and error
//! mapping. Network-layer failures become `ServerUnreachable`; non-2xx answers
//! keep the backend's `detail` so it can be shown to the user. The client
//! never stores tokens; it only returns them to the caller.

mod types;

pub use types::{AuthorizeResponse, TokenPair, VerifyRequest};

use self::types::{ErrorBody, TokenResponse};
use crate::{config::AuthConfig, error::AuthError, wallet::Challenge, APP_USER_AGENT};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info_span, Instrument};
use url::Url;

pub const GOOGLE_AUTHORIZE_PATH: &str = "/api/v1/oauth/google/authorize";
pub const WALLET_MESSAGE_PATH: &str = "/api/v1/oauth/phantom/message";
pub const WALLET_VERIFY_PATH: &str = "/api/v1/oauth/phantom/verify";
pub const LOGOUT_PATH: &str = "/api/v1/logout";

/// Maximum number of error body characters surfaced to the UI.
const MAX_ERROR_CHARS: usize = 200;

#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// # Errors
    /// Returns `ConfigurationMissing` if the HTTP client cannot be built.
    pub fn new(config: &AuthConfig) -> Result<Self, AuthError> {
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| {
                AuthError::ConfigurationMissing(format!("failed to build HTTP client: {err}"))
            })?;
        Ok(Self {
            client,
            base_url: config.api_base_url.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        build_url_with_base(self.base_url.as_str(), path)
    }

    /// Asks the backend for the Google consent URL.
    ///
    /// # Errors
    /// `ConfigurationMissing` when Google OAuth is not set up on the backend,
    /// `ServerUnreachable` on network failure.
    pub async fn google_authorization_url(&self) -> Result<String, AuthError> {
        let url = self.url(GOOGLE_AUTHORIZE_PATH);
        let span = info_span!("oauth.google_authorize", http.method = "GET", url = %url);
        let response = self
            .client
            .get(&url)
            .send()
            .instrument(span)
            .await
            .map_err(map_request_error)?;

        if !response.status().is_success() {
            let (status, body) = read_error(response).await;
            let detail = body
                .message()
                .unwrap_or_else(|| "Google OAuth is not configured".to_string());
            if body.not_configured() || status == StatusCode::NOT_IMPLEMENTED {
                return Err(AuthError::ConfigurationMissing(detail));
            }
            return Err(AuthError::Server {
                status: status.as_u16(),
                detail,
            });
        }

        let body: AuthorizeResponse = decode(response).await?;
        body.authorization_url
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| {
                AuthError::InvalidResponse("Failed to get Google authorization URL".to_string())
            })
    }

    /// Fetches a single-use challenge for wallet sign-in.
    ///
    /// # Errors
    /// `ServerUnreachable` on network failure, `Server` on a non-2xx response.
    pub async fn wallet_challenge(&self) -> Result<Challenge, AuthError> {
        let url = self.url(WALLET_MESSAGE_PATH);
        let span = info_span!("oauth.wallet_message", http.method = "GET", url = %url);
        let response = self
            .client
            .get(&url)
            .send()
            .instrument(span)
            .await
            .map_err(map_request_error)?;

        if !response.status().is_success() {
            let (status, body) = read_error(response).await;
            return Err(AuthError::Server {
                status: status.as_u16(),
                detail: body
                    .message()
                    .unwrap_or_else(|| "Failed to get a message to sign".to_string()),
            });
        }

        let challenge: Challenge = decode(response).await?;
        debug!(nonce = %challenge.nonce, "challenge received");
        Ok(challenge)
    }

    /// Submits a signed challenge and returns the issued tokens.
    ///
    /// # Errors
    /// `VerificationFailed` with the backend's detail on a non-2xx response,
    /// `ServerUnreachable` on network failure.
    pub async fn verify_signature(&self, request: &VerifyRequest) -> Result<TokenPair, AuthError> {
        let url = self.url(WALLET_VERIFY_PATH);
        let span = info_span!(
            "oauth.wallet_verify",
            http.method = "POST",
            url = %url,
            provider = %request.provider
        );
        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .instrument(span)
            .await
            .map_err(map_request_error)?;

        if !response.status().is_success() {
            let (_, body) = read_error(response).await;
            return Err(AuthError::VerificationFailed(
                body.message()
                    .unwrap_or_else(|| "Failed to verify wallet signature".to_string()),
            ));
        }

        let tokens: TokenResponse = decode(response).await?;
        Ok(tokens.into())
    }

    /// Invalidates the server-side session. The backend clears its own cookies
    /// through response headers.
    ///
    /// # Errors
    /// `ServerUnreachable` on network failure or timeout, `Server` on a non-2xx response.
    pub async fn logout(&self) -> Result<(), AuthError> {
        let url = self.url(LOGOUT_PATH);
        let span = info_span!("auth.logout", http.method = "POST", url = %url);
        let response = self
            .client
            .post(&url)
            .send()
            .instrument(span)
            .await
            .map_err(map_request_error)?;

        if response.status().is_success() {
            Ok(())
        } else {
            let (status, body) = read_error(response).await;
            Err(AuthError::Server {
                status: status.as_u16(),
                detail: body.message().unwrap_or_else(|| "Logout failed".to_string()),
            })
        }
    }
}

/// Builds a URL from an explicit base URL and the provided path.
fn build_url_with_base(base_url: &str, path: &str) -> String {
    let base = base_url.trim().trim_end_matches('/');
    let path = path.trim();

    if base.is_empty() {
        path.to_string()
    } else {
        format!("{}/{}", base, path.trim_start_matches('/'))
    }
}

/// Maps transport errors to `ServerUnreachable`, distinguishing timeouts.
fn map_request_error(err: reqwest::Error) -> AuthError {
    if err.is_timeout() {
        AuthError::ServerUnreachable("Request timed out. Please try again.".to_string())
    } else {
        AuthError::ServerUnreachable(err.to_string())
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, AuthError> {
    response
        .json::<T>()
        .await
        .map_err(|err| AuthError::InvalidResponse(format!("Failed to decode response: {err}")))
}

/// Reads a non-2xx body; bodies that are not JSON become a sanitized detail.
async fn read_error(response: Response) -> (StatusCode, ErrorBody) {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    let body = serde_json::from_str::<ErrorBody>(&text).unwrap_or_else(|_| ErrorBody {
        detail: sanitize_body(&text).map(serde_json::Value::String),
    });
    (status, body)
}

/// Trims and truncates an error body for display.
fn sanitize_body(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.chars().take(MAX_ERROR_CHARS).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::WalletProvider;
    use anyhow::{anyhow, Result};
    use secrecy::ExposeSecret;
    use serde_json::json;
    use std::{net::TcpListener, time::Duration};
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn can_bind_localhost() -> bool {
        TcpListener::bind("127.0.0.1:0").is_ok()
    }

    fn client_for(server: &MockServer) -> Result<ApiClient> {
        let config = AuthConfig::with_origin(Url::parse(&server.uri())?);
        Ok(ApiClient::new(&config)?)
    }

    #[test]
    fn build_url_joins_slashes() {
        assert_eq!(
            build_url_with_base("https://api.example.dev/", "/api/v1/logout"),
            "https://api.example.dev/api/v1/logout"
        );
        assert_eq!(
            build_url_with_base("https://api.example.dev/prefix", "api/v1/logout"),
            "https://api.example.dev/prefix/api/v1/logout"
        );
        assert_eq!(build_url_with_base("", "/api/v1/logout"), "/api/v1/logout");
    }

    #[test]
    fn sanitize_body_truncates() {
        assert_eq!(sanitize_body("   "), None);
        let long = "x".repeat(500);
        assert_eq!(sanitize_body(&long).map(|s| s.len()), Some(MAX_ERROR_CHARS));
    }

    #[tokio::test]
    async fn google_authorize_returns_url() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(GOOGLE_AUTHORIZE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "authorization_url": "https://accounts.google.com/o/oauth2/v2/auth?state=abc"
            })))
            .mount(&server)
            .await;

        let url = client_for(&server)?.google_authorization_url().await?;
        assert!(url.starts_with("https://accounts.google.com/"));
        Ok(())
    }

    #[tokio::test]
    async fn google_authorize_detects_missing_configuration() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(GOOGLE_AUTHORIZE_PATH))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "detail": {"message": "Google OAuth is not configured.", "configured": false}
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)?
            .google_authorization_url()
            .await
            .err()
            .ok_or_else(|| anyhow!("expected error"))?;
        assert_eq!(
            err,
            AuthError::ConfigurationMissing("Google OAuth is not configured.".to_string())
        );
        Ok(())
    }

    #[tokio::test]
    async fn wallet_challenge_decodes_message_and_nonce() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(WALLET_MESSAGE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "message": "Sign this message to authenticate.\n\nNonce: n-1",
                "nonce": "n-1"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let challenge = client_for(&server)?.wallet_challenge().await?;
        assert_eq!(challenge.nonce, "n-1");
        assert!(challenge.message.ends_with("Nonce: n-1"));
        Ok(())
    }

    #[tokio::test]
    async fn wallet_challenge_non_2xx_is_not_unreachable() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(WALLET_MESSAGE_PATH))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let err = client_for(&server)?
            .wallet_challenge()
            .await
            .err()
            .ok_or_else(|| anyhow!("expected error"))?;
        assert_eq!(
            err,
            AuthError::Server {
                status: 503,
                detail: "maintenance".to_string()
            }
        );
        Ok(())
    }

    #[tokio::test]
    async fn unreachable_server_maps_to_server_unreachable() -> Result<()> {
        // Port 9 (discard) on localhost is not expected to accept HTTP.
        let config = AuthConfig::with_origin(Url::parse("http://127.0.0.1:9")?);
        let err = ApiClient::new(&config)?
            .wallet_challenge()
            .await
            .err()
            .ok_or_else(|| anyhow!("expected error"))?;
        assert!(matches!(err, AuthError::ServerUnreachable(_)));
        Ok(())
    }

    #[tokio::test]
    async fn verify_posts_payload_and_returns_tokens() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(WALLET_VERIFY_PATH))
            .and(body_json(json!({
                "publicKey": "pk",
                "signature": [9, 8, 7],
                "message": "hello",
                "provider": "phantom"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "T1",
                "refresh_token": "R1",
                "token_type": "bearer"
            })))
            .mount(&server)
            .await;

        let tokens = client_for(&server)?
            .verify_signature(&VerifyRequest {
                public_key: "pk".to_string(),
                signature: vec![9, 8, 7],
                message: "hello".to_string(),
                provider: WalletProvider::Phantom,
            })
            .await?;
        assert_eq!(tokens.access_token.expose_secret(), "T1");
        assert_eq!(
            tokens.refresh_token.as_ref().map(|token| token.expose_secret()),
            Some("R1")
        );
        Ok(())
    }

    #[tokio::test]
    async fn logout_times_out() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(LOGOUT_PATH))
            .respond_with(ResponseTemplate::new(204).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let mut config = AuthConfig::with_origin(Url::parse(&server.uri())?);
        config.request_timeout = Duration::from_millis(100);
        let err = ApiClient::new(&config)?
            .logout()
            .await
            .err()
            .ok_or_else(|| anyhow!("expected error"))?;
        assert!(matches!(err, AuthError::ServerUnreachable(_)));
        Ok(())
    }
}
