use crate::relay::{BoxFuture, IdentityProvider, Minter, ProviderError, RelayConfig};
use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub credential: SecretString,
    pub url: String,
    pub domain: String,
    pub config: RelayConfig,
}

/// Identity provider for an operator-supplied credential.
struct OperatorCredential(SecretString);

impl IdentityProvider for OperatorCredential {
    fn fresh_credential(&self) -> BoxFuture<'_, Result<SecretString, ProviderError>> {
        let credential = self.0.clone();
        Box::pin(async move { Ok(credential) })
    }

    fn is_authenticated(&self) -> BoxFuture<'_, bool> {
        let authenticated = !self.0.expose_secret().trim().is_empty();
        Box::pin(async move { authenticated })
    }
}

async fn link(args: Args) -> Result<String> {
    let minter = Minter::new(
        OperatorCredential(args.credential),
        args.config,
        args.domain,
    );
    let link = minter
        .link(&args.url)
        .await
        .context("Could not mint relay link")?;

    info!(
        "Relay link for {} valid for {} ms",
        minter.issuer_origin(),
        minter.config().validity_window_ms()
    );
    Ok(link)
}

/// Print the destination URL with a freshly minted token appended.
/// # Errors
/// Returns an error if the credential is empty or the token cannot be encoded.
pub async fn execute(args: Args) -> Result<()> {
    println!("{}", link(args).await?);
    Ok(())
}
