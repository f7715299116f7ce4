use super::{
    normalize_public_key, normalize_signature, Challenge, ExtensionError, WalletConnection,
    WalletExtension, WalletHost, WalletProvider,
};
use crate::{api::ApiClient, error::AuthError};
use std::{future::Future, sync::Arc, time::Duration};
use tracing::{debug, instrument};

/// One contract over every supported wallet extension.
#[derive(Clone)]
pub struct WalletAdapter {
    provider: WalletProvider,
    host: Arc<dyn WalletHost>,
    api: ApiClient,
    consent_timeout: Option<Duration>,
}

impl WalletAdapter {
    pub fn new(
        provider: WalletProvider,
        host: Arc<dyn WalletHost>,
        api: ApiClient,
        consent_timeout: Option<Duration>,
    ) -> Self {
        Self {
            provider,
            host,
            api,
            consent_timeout,
        }
    }

    #[must_use]
    pub fn provider(&self) -> WalletProvider {
        self.provider
    }

    /// Resolves the injected handle, trying the primary path before the alias.
    fn extension(&self) -> Option<Arc<dyn WalletExtension>> {
        self.provider.handle_paths().iter().find_map(|candidate| {
            let handle = self.host.handle(candidate.path)?;
            match candidate.requires_flag {
                Some(flag) if !handle.has_flag(flag) => None,
                _ => Some(handle),
            }
        })
    }

    /// Reports whether the extension is installed. Never fails.
    #[must_use]
    pub fn detect(&self) -> bool {
        self.extension().is_some()
    }

    /// Opens the provider's consent prompt and returns the normalized public key.
    ///
    /// # Errors
    /// `NotInstalled` when no handle is injected, `UserRejected` when the prompt
    /// is declined, `ConsentTimeout` when a configured timeout elapses.
    #[instrument(skip(self), fields(provider = %self.provider))]
    pub async fn connect(&self) -> Result<WalletConnection, AuthError> {
        let extension = self
            .extension()
            .ok_or(AuthError::NotInstalled(self.provider))?;
        let output = self.await_consent(extension.connect()).await?;
        let public_key = normalize_public_key(&output)?;
        debug!(public_key = %public_key, "wallet connected");

        Ok(WalletConnection {
            provider: self.provider,
            public_key: Some(public_key),
            connected: true,
        })
    }

    /// Fetches a single-use challenge. The endpoint is shared by every wallet.
    ///
    /// # Errors
    /// `ServerUnreachable` on network failure, `Server` on a non-2xx response.
    pub async fn request_message(&self) -> Result<Challenge, AuthError> {
        self.api.wallet_challenge().await
    }

    /// UTF-8 encodes `message`, asks the extension to sign it and normalizes the
    /// returned signature to raw bytes.
    ///
    /// # Errors
    /// `NotInstalled`, `UserRejected`, `ConsentTimeout`, or
    /// `InvalidSignatureFormat` when the output shape is unknown.
    #[instrument(skip_all, fields(provider = %self.provider))]
    pub async fn sign(&self, message: &str) -> Result<Vec<u8>, AuthError> {
        let extension = self
            .extension()
            .ok_or(AuthError::NotInstalled(self.provider))?;
        let output = self
            .await_consent(extension.sign_message(message.as_bytes(), self.provider.sign_display()))
            .await?;
        let signature = normalize_signature(output)?;
        debug!(len = signature.len(), "message signed");
        Ok(signature)
    }

    async fn await_consent<T>(
        &self,
        prompt: impl Future<Output = Result<T, ExtensionError>>,
    ) -> Result<T, AuthError> {
        let answer = match self.consent_timeout {
            Some(limit) => tokio::time::timeout(limit, prompt)
                .await
                .map_err(|_| AuthError::ConsentTimeout)?,
            None => prompt.await,
        };
        answer.map_err(|err| AuthError::UserRejected(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AuthConfig,
        wallet::{InjectedHandles, ScriptedExtension, SignatureOutput},
    };
    use anyhow::Result;
    use serde_json::json;

    const KEY: &str = "9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin";

    fn adapter(provider: WalletProvider, host: InjectedHandles) -> Result<WalletAdapter> {
        let api = ApiClient::new(&AuthConfig::try_default()?)?;
        Ok(WalletAdapter::new(provider, Arc::new(host), api, None))
    }

    fn scripted() -> ScriptedExtension {
        ScriptedExtension::new(json!({"publicKey": KEY}), SignatureOutput::Bytes(vec![1, 2, 3]))
    }

    #[tokio::test]
    async fn absent_handle_is_not_installed() -> Result<()> {
        for provider in WalletProvider::ALL {
            let adapter = adapter(provider, InjectedHandles::new())?;
            assert!(!adapter.detect());
            assert_eq!(
                adapter.connect().await,
                Err(AuthError::NotInstalled(provider))
            );
        }
        Ok(())
    }

    #[tokio::test]
    async fn detects_alias_handle() -> Result<()> {
        let host = InjectedHandles::new().with("xnft.solana", Arc::new(scripted()));
        assert!(adapter(WalletProvider::Backpack, host)?.detect());
        Ok(())
    }

    #[tokio::test]
    async fn alias_requires_marker_flag() -> Result<()> {
        let unmarked = InjectedHandles::new().with("solana", Arc::new(scripted()));
        assert!(!adapter(WalletProvider::Phantom, unmarked)?.detect());

        let marked =
            InjectedHandles::new().with("solana", Arc::new(scripted().with_flag("isPhantom")));
        assert!(adapter(WalletProvider::Phantom, marked)?.detect());
        Ok(())
    }

    #[tokio::test]
    async fn connect_normalizes_public_key() -> Result<()> {
        let host = InjectedHandles::new().with("solflare", Arc::new(scripted()));
        let connection = adapter(WalletProvider::Solflare, host)?.connect().await?;
        assert_eq!(connection.public_key.as_deref(), Some(KEY));
        assert!(connection.connected);
        Ok(())
    }

    #[tokio::test]
    async fn sign_encodes_utf8_and_passes_display_hint() -> Result<()> {
        let extension = Arc::new(scripted());
        let host = InjectedHandles::new().with("phantom.solana", extension.clone());
        let signature = adapter(WalletProvider::Phantom, host)?
            .sign("Sign in ✓")
            .await?;

        assert_eq!(signature, vec![1, 2, 3]);
        assert_eq!(
            extension.signed_messages(),
            vec![("Sign in ✓".as_bytes().to_vec(), Some("utf8".to_string()))]
        );
        Ok(())
    }

    #[tokio::test]
    async fn declined_prompt_is_user_rejected() -> Result<()> {
        let host = InjectedHandles::new().with(
            "backpack",
            Arc::new(scripted().rejecting_connect("User rejected the request.")),
        );
        let err = adapter(WalletProvider::Backpack, host)?
            .connect()
            .await
            .err()
            .ok_or_else(|| anyhow::anyhow!("expected error"))?;
        assert!(matches!(err, AuthError::UserRejected(message) if message.contains("rejected")));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn consent_timeout_elapses() -> Result<()> {
        let extension = scripted().with_consent_delay(Duration::from_secs(600));
        let host: Arc<dyn WalletHost> =
            Arc::new(InjectedHandles::new().with("phantom.solana", Arc::new(extension)));
        let api = ApiClient::new(&AuthConfig::try_default()?)?;
        let adapter = WalletAdapter::new(
            WalletProvider::Phantom,
            host,
            api,
            Some(Duration::from_secs(30)),
        );
        assert_eq!(adapter.connect().await, Err(AuthError::ConsentTimeout));
        Ok(())
    }
}
