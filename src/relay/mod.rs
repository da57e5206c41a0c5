//! Cross-domain token relay: minting on the issuer, consuming on the relying party.

pub mod collaborators;
pub mod config;
pub mod error;
pub mod minter;
pub mod query;
pub mod readiness;
pub mod token;
pub mod verifier;

pub use collaborators::{
    BoxFuture, CredentialVerifier, IdentityProvider, Role, RoleStore, Verification,
};
pub use config::{RelayConfig, DEFAULT_PARAM, DEFAULT_VALIDITY_WINDOW_MS};
pub use error::{DecodeError, HandoffError, ProviderError, RelayError};
pub use minter::Minter;
pub use query::{append_to_url, extract, strip_param};
pub use token::RelayToken;
pub use verifier::{decode, validate, RelayOutcome, Verifier};
