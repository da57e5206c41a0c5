//! Interfaces of the services the relay depends on but does not own.
//!
//! Hosts pass implementations in explicitly; the relay never reaches for a
//! process-wide identity or database handle.

use crate::relay::error::{HandoffError, ProviderError};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::{fmt, future::Future, pin::Pin, sync::Arc};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Role name as stored by the role store (for example `admin`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(String);

impl Role {
    #[must_use]
    pub fn new(role: impl Into<String>) -> Self {
        Self(role.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Role {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

/// Outcome of the relying party's independent credential check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub principal_id: String,
    pub role: Option<Role>,
}

/// Session authority on the issuing origin.
pub trait IdentityProvider: Send + Sync {
    /// Fetch a fresh bearer credential for the current principal.
    fn fresh_credential(&self) -> BoxFuture<'_, Result<SecretString, ProviderError>>;

    fn is_authenticated(&self) -> BoxFuture<'_, bool>;
}

pub trait RoleStore: Send + Sync {
    fn role<'a>(&'a self, principal_id: &'a str)
        -> BoxFuture<'a, Result<Option<Role>, ProviderError>>;
}

/// Independent verification of a relayed credential, owned by the relying party.
pub trait CredentialVerifier: Send + Sync {
    fn verify<'a>(
        &'a self,
        credential: &'a SecretString,
        source_domain: &'a str,
    ) -> BoxFuture<'a, Result<Verification, HandoffError>>;
}

impl<T: IdentityProvider + ?Sized> IdentityProvider for Arc<T> {
    fn fresh_credential(&self) -> BoxFuture<'_, Result<SecretString, ProviderError>> {
        (**self).fresh_credential()
    }

    fn is_authenticated(&self) -> BoxFuture<'_, bool> {
        (**self).is_authenticated()
    }
}

impl<T: RoleStore + ?Sized> RoleStore for Arc<T> {
    fn role<'a>(
        &'a self,
        principal_id: &'a str,
    ) -> BoxFuture<'a, Result<Option<Role>, ProviderError>> {
        (**self).role(principal_id)
    }
}

impl<T: CredentialVerifier + ?Sized> CredentialVerifier for Arc<T> {
    fn verify<'a>(
        &'a self,
        credential: &'a SecretString,
        source_domain: &'a str,
    ) -> BoxFuture<'a, Result<Verification, HandoffError>> {
        (**self).verify(credential, source_domain)
    }
}
