use crate::location::Location;
use crate::relay::{
    collaborators::IdentityProvider,
    config::RelayConfig,
    error::{ProviderError, RelayError},
    query::append_to_url,
    readiness::{Ready, ReadinessError},
    token::RelayToken,
};
use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use tracing::{debug, error, instrument, warn};

/// Issuer side of the relay: wraps credentials into tokens and links.
pub struct Minter<P> {
    provider: P,
    config: RelayConfig,
    issuer_origin: String,
}

impl<P: IdentityProvider> Minter<P> {
    #[must_use]
    pub fn new(provider: P, config: RelayConfig, issuer_origin: impl Into<String>) -> Self {
        Self {
            provider,
            config,
            issuer_origin: issuer_origin.into(),
        }
    }

    /// Build a minter whose issuer origin is the host of the current page.
    #[must_use]
    pub fn for_location(provider: P, config: RelayConfig, location: &impl Location) -> Self {
        let issuer_origin = location
            .href()
            .and_then(|url| url.host_str().map(str::to_string))
            .unwrap_or_default();
        Self::new(provider, config, issuer_origin)
    }

    #[must_use]
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    #[must_use]
    pub fn issuer_origin(&self) -> &str {
        &self.issuer_origin
    }

    /// Mint an encoded token issued now.
    ///
    /// # Errors
    ///
    /// Returns `RelayError::MissingCredential` if `credential` is empty.
    pub fn mint(&self, credential: &SecretString) -> Result<String, RelayError> {
        self.mint_at(credential, Utc::now().timestamp_millis())
    }

    /// Mint an encoded token issued at `issued_at` (ms since epoch).
    ///
    /// # Errors
    ///
    /// Returns `RelayError::MissingCredential` if `credential` is empty, or
    /// `RelayError::Encode` if serialization fails.
    pub fn mint_at(&self, credential: &SecretString, issued_at: i64) -> Result<String, RelayError> {
        if credential.expose_secret().is_empty() {
            return Err(RelayError::MissingCredential);
        }

        let token = RelayToken::new(
            credential.clone(),
            issued_at,
            self.config.validity_window_ms(),
            self.issuer_origin.clone(),
        );
        token.encode().map_err(RelayError::Encode)
    }

    /// Append a token minted from `credential` to `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if minting fails.
    pub fn link_with_credential(
        &self,
        url: &str,
        credential: &SecretString,
    ) -> Result<String, RelayError> {
        let encoded = self.mint(credential)?;
        Ok(append_to_url(url, self.config.param(), &encoded))
    }

    /// Fetch a fresh credential from the identity provider and append a token to `url`.
    ///
    /// # Errors
    ///
    /// Returns `RelayError::CredentialUnavailable` if no principal is signed in
    /// or the provider cannot produce a credential; nothing is appended then.
    #[instrument(skip(self))]
    pub async fn link(&self, url: &str) -> Result<String, RelayError> {
        if !self.provider.is_authenticated().await {
            warn!("No authenticated principal, relay aborted");
            return Err(ProviderError::Unauthenticated.into());
        }

        let credential = self.provider.fresh_credential().await.map_err(|err| {
            error!("Could not obtain credential: {err}");
            RelayError::CredentialUnavailable(err)
        })?;

        let link = self.link_with_credential(url, &credential)?;
        debug!("Relay link minted for {}", self.issuer_origin);
        Ok(link)
    }
}

impl<P: IdentityProvider> Minter<Arc<P>> {
    /// Wait for the identity provider to be initialized, then build a minter.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider is never resolved.
    pub async fn when_ready(
        ready: &Ready<P>,
        config: RelayConfig,
        issuer_origin: impl Into<String>,
    ) -> Result<Self, ReadinessError> {
        let provider = ready.wait().await?;
        Ok(Self::new(provider, config, issuer_origin))
    }
}
