//! Login attempts, one per button click.
//!
//! A wallet attempt walks `Connecting -> ChallengeRequested -> Signing ->
//! Verifying -> Established`; a Google attempt ends in `Redirected` once the
//! browser is sent to the consent page. Any failure ends the attempt in
//! `Errored` with a user-facing [`Notification`]. Nothing is retried.

mod loading;

pub use loading::{LoadingFlags, LoadingGuard};

use crate::{
    api::{ApiClient, VerifyRequest},
    config::AuthConfig,
    error::AuthError,
    host::Navigator,
    notify::Notification,
    session::{LoginSource, SessionStore},
    storage::{cookies::persist_tokens, CookieStore},
    wallet::{Provider, WalletAdapter, WalletHost, WalletProvider},
};
use std::{fmt, sync::Arc, time::Duration};
use tokio::sync::Mutex;
use tracing::{debug, info, info_span, warn, Instrument};
use ulid::Ulid;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlowState {
    Idle,
    Connecting,
    ChallengeRequested,
    Signing,
    Verifying,
    Established,
    Errored,
    Redirected,
}

impl FlowState {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Established | Self::Errored | Self::Redirected)
    }
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::ChallengeRequested => "challenge_requested",
            Self::Signing => "signing",
            Self::Verifying => "verifying",
            Self::Established => "established",
            Self::Errored => "errored",
            Self::Redirected => "redirected",
        };
        f.write_str(name)
    }
}

/// Record of one login attempt.
#[derive(Clone, Debug)]
pub struct FlowAttempt {
    pub id: Ulid,
    pub provider: Provider,
    /// Every state entered, starting with `Idle`.
    pub history: Vec<FlowState>,
    pub error: Option<AuthError>,
    pub notification: Option<Notification>,
}

impl FlowAttempt {
    fn new(provider: Provider) -> Self {
        Self {
            id: Ulid::new(),
            provider,
            history: vec![FlowState::Idle],
            error: None,
            notification: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> FlowState {
        self.history.last().copied().unwrap_or(FlowState::Idle)
    }

    fn advance(&mut self, state: FlowState) {
        debug!(from = %self.state(), to = %state, "login state changed");
        self.history.push(state);
    }

    fn fail(&mut self, err: AuthError) {
        self.notification = Some(Notification::for_error(self.provider, &err));
        self.error = Some(err);
        self.advance(FlowState::Errored);
    }
}

/// Runs login attempts against shared session state.
///
/// Clones share loading flags and the establish lock, so only one attempt
/// commits a session at a time.
#[derive(Clone)]
pub struct LoginFlow {
    api: ApiClient,
    wallets: Arc<dyn WalletHost>,
    session: Arc<SessionStore>,
    cookies: Arc<dyn CookieStore>,
    navigator: Arc<dyn Navigator>,
    consent_timeout: Option<Duration>,
    loading: LoadingFlags,
    establish: Arc<Mutex<()>>,
}

impl LoginFlow {
    pub fn new(
        config: &AuthConfig,
        api: ApiClient,
        wallets: Arc<dyn WalletHost>,
        session: Arc<SessionStore>,
        cookies: Arc<dyn CookieStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            api,
            wallets,
            session,
            cookies,
            navigator,
            consent_timeout: config.consent_timeout,
            loading: LoadingFlags::new(),
            establish: Arc::new(Mutex::new(())),
        }
    }

    #[must_use]
    pub fn loading(&self) -> &LoadingFlags {
        &self.loading
    }

    #[must_use]
    pub fn is_loading(&self, provider: Provider) -> bool {
        self.loading.is_loading(provider)
    }

    #[must_use]
    pub fn adapter(&self, wallet: WalletProvider) -> WalletAdapter {
        WalletAdapter::new(
            wallet,
            self.wallets.clone(),
            self.api.clone(),
            self.consent_timeout,
        )
    }

    /// Runs one login attempt for `provider`.
    ///
    /// A click while the provider's previous attempt is still running is
    /// ignored and returns an attempt that never left `Idle`.
    pub async fn sign_in(&self, provider: Provider) -> FlowAttempt {
        let mut attempt = FlowAttempt::new(provider);
        let span = info_span!("login.attempt", attempt_id = %attempt.id, provider = %provider);

        async {
            let Some(_loading) = self.loading.try_begin(provider) else {
                debug!("attempt already in flight, ignoring click");
                return;
            };

            let result = match provider {
                Provider::Google => self.google(&mut attempt).await,
                Provider::Wallet(wallet) => self.wallet(wallet, &mut attempt).await,
            };

            match result {
                Ok(()) => info!(state = %attempt.state(), "login attempt finished"),
                Err(err) => {
                    warn!(state = %attempt.state(), "login attempt failed: {err}");
                    if let AuthError::NotInstalled(wallet) = &err {
                        self.navigator.open_external(wallet.install_url());
                    }
                    attempt.fail(err);
                }
            }
        }
        .instrument(span)
        .await;

        attempt
    }

    async fn google(&self, attempt: &mut FlowAttempt) -> Result<(), AuthError> {
        let url = self.api.google_authorization_url().await?;
        self.navigator.redirect(&url);
        attempt.advance(FlowState::Redirected);
        Ok(())
    }

    async fn wallet(
        &self,
        wallet: WalletProvider,
        attempt: &mut FlowAttempt,
    ) -> Result<(), AuthError> {
        let adapter = self.adapter(wallet);

        attempt.advance(FlowState::Connecting);
        let connection = adapter.connect().await?;
        let public_key = connection
            .public_key
            .ok_or_else(|| AuthError::InvalidResponse("wallet returned no public key".to_string()))?;

        attempt.advance(FlowState::ChallengeRequested);
        let challenge = adapter.request_message().await?;

        attempt.advance(FlowState::Signing);
        let signature = adapter.sign(&challenge.message).await?;

        attempt.advance(FlowState::Verifying);
        let _establish = self.establish.lock().await;
        let tokens = self
            .api
            .verify_signature(&VerifyRequest {
                public_key,
                signature,
                message: challenge.message,
                provider: wallet,
            })
            .await?;

        persist_tokens(
            self.cookies.as_ref(),
            Some(&tokens.access_token),
            tokens.refresh_token.as_ref(),
        )?;
        self.session
            .login(tokens.access_token, LoginSource::Wallet(wallet), tokens.refresh_token);
        attempt.advance(FlowState::Established);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        api::{GOOGLE_AUTHORIZE_PATH, WALLET_MESSAGE_PATH, WALLET_VERIFY_PATH},
        host::{CountingQueryCache, Navigation, RecordingNavigator},
        storage::{
            cookies::{ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE},
            MemoryCookieJar,
        },
        wallet::{InjectedHandles, ScriptedExtension, SignatureOutput},
    };
    use anyhow::Result;
    use serde_json::json;
    use std::net::TcpListener;
    use url::Url;
    use wiremock::{
        matchers::{body_partial_json, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    const KEY: &str = "9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin";

    fn can_bind_localhost() -> bool {
        TcpListener::bind("127.0.0.1:0").is_ok()
    }

    struct Fixture {
        flow: LoginFlow,
        session: Arc<SessionStore>,
        cookies: Arc<MemoryCookieJar>,
        navigator: Arc<RecordingNavigator>,
    }

    fn fixture(config: &AuthConfig, wallets: InjectedHandles) -> Result<Fixture> {
        let session = Arc::new(SessionStore::new(Arc::new(CountingQueryCache::new())));
        let cookies = Arc::new(MemoryCookieJar::new());
        let navigator = Arc::new(RecordingNavigator::new());
        let flow = LoginFlow::new(
            config,
            ApiClient::new(config)?,
            Arc::new(wallets),
            session.clone(),
            cookies.clone(),
            navigator.clone(),
        );
        Ok(Fixture {
            flow,
            session,
            cookies,
            navigator,
        })
    }

    async fn mount_challenge(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path(WALLET_MESSAGE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "message": "Sign this message to authenticate.\n\nNonce: n-1",
                "nonce": "n-1"
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn wallet_login_walks_every_state() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        mount_challenge(&server).await;
        Mock::given(method("POST"))
            .and(path(WALLET_VERIFY_PATH))
            .and(body_partial_json(json!({
                "publicKey": KEY,
                "signature": [7, 8, 9],
                "provider": "solflare"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "T1",
                "refresh_token": "R1",
                "token_type": "bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let wallets = InjectedHandles::new().with(
            "solflare",
            Arc::new(ScriptedExtension::new(
                KEY,
                SignatureOutput::Json(json!({"signature": [7, 8, 9]})),
            )),
        );
        let f = fixture(&AuthConfig::with_origin(Url::parse(&server.uri())?), wallets)?;
        let provider = Provider::Wallet(WalletProvider::Solflare);
        let attempt = f.flow.sign_in(provider).await;

        assert_eq!(
            attempt.history,
            vec![
                FlowState::Idle,
                FlowState::Connecting,
                FlowState::ChallengeRequested,
                FlowState::Signing,
                FlowState::Verifying,
                FlowState::Established,
            ]
        );
        assert!(attempt.notification.is_none());
        assert!(f.session.is_authenticated());
        assert_eq!(f.cookies.get(ACCESS_TOKEN_COOKIE)?, Some("T1".to_string()));
        assert_eq!(f.cookies.get(REFRESH_TOKEN_COOKIE)?, Some("R1".to_string()));
        assert!(!f.flow.is_loading(provider));
        Ok(())
    }

    #[tokio::test]
    async fn google_redirects_to_consent_page() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        let consent = "https://accounts.google.com/o/oauth2/v2/auth?state=abc";
        Mock::given(method("GET"))
            .and(path(GOOGLE_AUTHORIZE_PATH))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"authorization_url": consent})),
            )
            .mount(&server)
            .await;

        let f = fixture(
            &AuthConfig::with_origin(Url::parse(&server.uri())?),
            InjectedHandles::new(),
        )?;
        let attempt = f.flow.sign_in(Provider::Google).await;

        assert_eq!(attempt.state(), FlowState::Redirected);
        assert_eq!(
            f.navigator.last(),
            Some(Navigation::Redirect(consent.to_string()))
        );
        assert!(!f.flow.is_loading(Provider::Google));
        Ok(())
    }

    #[tokio::test]
    async fn missing_wallet_opens_install_page() -> Result<()> {
        let f = fixture(&AuthConfig::try_default()?, InjectedHandles::new())?;
        let attempt = f.flow.sign_in(Provider::Wallet(WalletProvider::Backpack)).await;

        assert_eq!(attempt.state(), FlowState::Errored);
        assert_eq!(
            attempt.error,
            Some(AuthError::NotInstalled(WalletProvider::Backpack))
        );
        assert_eq!(
            f.navigator.last(),
            Some(Navigation::OpenExternal(
                WalletProvider::Backpack.install_url().to_string()
            ))
        );
        Ok(())
    }

    #[tokio::test]
    async fn click_during_attempt_is_ignored() -> Result<()> {
        let extension = Arc::new(
            ScriptedExtension::new(KEY, SignatureOutput::Bytes(vec![1]))
                .rejecting_connect("User rejected the request.")
                .with_consent_delay(Duration::from_millis(50)),
        );
        let wallets = InjectedHandles::new().with("phantom.solana", extension.clone());
        let f = fixture(&AuthConfig::try_default()?, wallets)?;
        let provider = Provider::Wallet(WalletProvider::Phantom);

        let (first, second) = tokio::join!(f.flow.sign_in(provider), f.flow.sign_in(provider));

        assert_eq!(first.state(), FlowState::Errored);
        assert_eq!(second.history, vec![FlowState::Idle]);
        assert!(!second.state().is_terminal());
        assert!(second.notification.is_none());
        assert_eq!(extension.connect_calls(), 1);
        assert!(!f.flow.is_loading(provider));
        Ok(())
    }
}
