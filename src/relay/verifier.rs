use crate::location::Location;
use crate::relay::{
    collaborators::{CredentialVerifier, Verification},
    config::RelayConfig,
    error::{DecodeError, HandoffError, RelayError},
    query::{extract_from, has_param, strip_param},
    readiness::{Ready, ReadinessError},
    token::RelayToken,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Terminal state of one verification pass.
#[derive(Debug)]
pub enum RelayOutcome {
    /// No relay parameter; the page continues with its normal sign-in.
    NoToken,
    DecodeFailed(DecodeError),
    Expired { expires_at: i64, now: i64 },
    /// The relying party accepted the forwarded credential.
    Verified(Verification),
    HandoffFailed(HandoffError),
}

impl RelayOutcome {
    #[must_use]
    pub fn verification(&self) -> Option<&Verification> {
        match self {
            Self::Verified(verification) => Some(verification),
            _ => None,
        }
    }

    /// `true` when the host should continue with its normal sign-in flow.
    #[must_use]
    pub fn falls_back(&self) -> bool {
        !matches!(self, Self::Verified(_))
    }

    /// `Ok(None)` for a normal page load, `Ok(Some(_))` on success.
    ///
    /// # Errors
    ///
    /// Returns the relay failure for every other outcome.
    pub fn into_result(self) -> Result<Option<Verification>, RelayError> {
        match self {
            Self::NoToken => Ok(None),
            Self::Verified(verification) => Ok(Some(verification)),
            Self::DecodeFailed(err) => Err(RelayError::Decode(err)),
            Self::Expired { expires_at, now } => Err(RelayError::Expired { expires_at, now }),
            Self::HandoffFailed(err) => Err(RelayError::HandoffFailed(err)),
        }
    }
}

/// Decode an encoded relay token without checking expiry.
///
/// # Errors
///
/// Returns a `DecodeError` for malformed, corrupted or incomplete tokens.
pub fn decode(encoded: &str) -> Result<RelayToken, DecodeError> {
    RelayToken::decode(encoded)
}

/// Check `token` against the verifier's clock. Valid through `expires_at` inclusive.
///
/// # Errors
///
/// Returns `RelayError::Expired` when `now_ms > token.expires_at()`.
pub fn validate(token: &RelayToken, now_ms: i64) -> Result<(), RelayError> {
    if token.is_expired_at(now_ms) {
        return Err(RelayError::Expired {
            expires_at: token.expires_at(),
            now: now_ms,
        });
    }
    Ok(())
}

/// Relying-party side of the relay.
pub struct Verifier<V> {
    backend: V,
    config: RelayConfig,
}

impl<V: CredentialVerifier> Verifier<V> {
    #[must_use]
    pub fn new(backend: V, config: RelayConfig) -> Self {
        Self { backend, config }
    }

    #[must_use]
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    // Tokens carry their own expiry, but only windows minted with this
    // deployment's configuration are honoured.
    fn check_window(&self, token: RelayToken) -> Result<RelayToken, DecodeError> {
        if token.window_ms() == Some(self.config.validity_window_ms()) {
            Ok(token)
        } else {
            Err(DecodeError::InvalidWindow)
        }
    }

    /// Run one verification pass against the verifier's wall clock.
    pub async fn consume<L: Location>(&self, location: &mut L) -> RelayOutcome {
        self.consume_at(location, Utc::now().timestamp_millis()).await
    }

    /// Run one verification pass at `now_ms`.
    ///
    /// When the parameter is present, even empty, it is stripped from the
    /// address before anything else, so every terminal state leaves a clean URL even
    /// if this future is dropped during the hand-off.
    #[instrument(skip_all)]
    pub async fn consume_at<L: Location>(&self, location: &mut L, now_ms: i64) -> RelayOutcome {
        let Some(current) = location.href() else {
            return RelayOutcome::NoToken;
        };
        if !has_param(&current, self.config.param()) {
            return RelayOutcome::NoToken;
        }

        location.replace(&strip_param(&current, self.config.param()));
        debug!("Relay parameter removed from address");

        let Some(encoded) = extract_from(&current, self.config.param()) else {
            return RelayOutcome::NoToken;
        };

        let token = match decode(&encoded).and_then(|token| self.check_window(token)) {
            Ok(token) => token,
            Err(err) => {
                warn!("Invalid relay token: {err}");
                return RelayOutcome::DecodeFailed(err);
            }
        };

        if let Err(err) = validate(&token, now_ms) {
            warn!("Relay token from {} rejected: {err}", token.issuer_origin());
            return RelayOutcome::Expired {
                expires_at: token.expires_at(),
                now: now_ms,
            };
        }

        match self
            .backend
            .verify(token.credential(), token.issuer_origin())
            .await
        {
            Ok(verification) => {
                info!(
                    principal_id = %verification.principal_id,
                    source_domain = %token.issuer_origin(),
                    "Relayed credential verified"
                );
                RelayOutcome::Verified(verification)
            }
            Err(err) => {
                warn!("Relayed credential verification failed: {err}");
                RelayOutcome::HandoffFailed(err)
            }
        }
    }
}

impl<V: CredentialVerifier> Verifier<Arc<V>> {
    /// Wait for the verification backend to be initialized, then build a verifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is never resolved.
    pub async fn when_ready(ready: &Ready<V>, config: RelayConfig) -> Result<Self, ReadinessError> {
        let backend = ready.wait().await?;
        Ok(Self::new(backend, config))
    }
}
