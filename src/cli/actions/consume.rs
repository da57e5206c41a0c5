use crate::api::BackendVerifier;
use crate::location::MemoryLocation;
use crate::relay::{RelayConfig, Verification, Verifier};
use anyhow::{Context, Result};
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub url: String,
    pub backend_url: String,
    pub config: RelayConfig,
}

/// Run one verification pass over `args.url`.
///
/// Returns the cleaned address and the verified principal, `None` when the
/// URL carries no token.
async fn consume(args: &Args) -> Result<(Url, Option<Verification>)> {
    let url = Url::parse(args.url.trim()).with_context(|| format!("Invalid URL: {}", args.url))?;
    let mut location = MemoryLocation::new(url);

    let backend = BackendVerifier::new(&args.backend_url)?;
    let verifier = Verifier::new(backend, args.config.clone());
    let outcome = verifier.consume(&mut location).await;

    let cleaned = location
        .current()
        .cloned()
        .context("location lost its current entry")?;

    let verification = outcome
        .into_result()
        .with_context(|| format!("Relay failed, continue at {cleaned}"))?;
    Ok((cleaned, verification))
}

/// Consume a relay URL, printing the cleaned address and the verified principal.
/// # Errors
/// Returns an error if the token is invalid, expired or rejected by the backend.
pub async fn execute(args: Args) -> Result<()> {
    let (cleaned, verification) = consume(&args).await?;

    println!("url:       {cleaned}");
    match verification {
        Some(verification) => {
            println!("principal: {}", verification.principal_id);
            if let Some(role) = verification.role {
                println!("role:      {role}");
            }
        }
        None => println!("no relay token, normal sign-in applies"),
    }
    Ok(())
}
