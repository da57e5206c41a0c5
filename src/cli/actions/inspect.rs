use crate::relay::{decode, extract, validate, RelayConfig, RelayToken};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use std::fmt;
use tracing::{debug, warn};

#[derive(Debug)]
pub struct Args {
    pub input: String,
    pub config: RelayConfig,
}

/// Decoded view of a relay token, safe to print.
#[derive(Debug)]
struct Report {
    issuer_origin: String,
    issued_at: i64,
    expires_at: i64,
    window_ms: i64,
    credential_hint: String,
    valid: bool,
    /// Time left when valid, time since expiry otherwise; saturates.
    distance_ms: i64,
}

// Keep only enough of the credential to tell tokens apart.
fn credential_hint(credential: &str) -> String {
    let visible: String = credential.chars().take(4).collect();
    if credential.chars().count() > 8 {
        format!("{visible}… ({} chars)", credential.chars().count())
    } else {
        "****".to_string()
    }
}

fn format_ms(ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map_or_else(|| ms.to_string(), |at| format!("{} ({ms})", at.to_rfc3339()))
}

/// Pull the encoded token out of `input`, which is either a URL carrying the
/// relay parameter or the encoded token itself.
fn encoded_token(input: &str, config: &RelayConfig) -> Result<String> {
    let input = input.trim();
    if input.contains("://") {
        return extract(input, config.param()).with_context(|| {
            format!("URL does not carry a '{}' parameter", config.param())
        });
    }
    Ok(input.to_string())
}

fn report(token: &RelayToken, window_ms: i64, now: i64) -> Report {
    let valid = validate(token, now).is_ok();
    let distance_ms = if valid {
        token.expires_at().saturating_sub(now)
    } else {
        now.saturating_sub(token.expires_at())
    };

    Report {
        issuer_origin: token.issuer_origin().to_string(),
        issued_at: token.issued_at(),
        expires_at: token.expires_at(),
        window_ms,
        credential_hint: credential_hint(token.credential().expose_secret()),
        valid,
        distance_ms,
    }
}

fn inspect_at(args: &Args, now: i64) -> Result<Report> {
    let encoded = encoded_token(&args.input, &args.config)?;
    let token = decode(&encoded).context("Could not decode relay token")?;

    let window_ms = token
        .window_ms()
        .context("Relay token window is out of range")?;
    if window_ms != args.config.validity_window_ms() {
        warn!(
            "Token window is {window_ms} ms, verifiers expecting {} ms will refuse it",
            args.config.validity_window_ms()
        );
    }

    debug!("Decoded relay token from {}", token.issuer_origin());
    Ok(report(&token, window_ms, now))
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "issuer:     {}", self.issuer_origin)?;
        writeln!(f, "credential: {}", self.credential_hint)?;
        writeln!(f, "issued:     {}", format_ms(self.issued_at))?;
        writeln!(f, "expires:    {}", format_ms(self.expires_at))?;
        writeln!(f, "window:     {} ms", self.window_ms)?;
        if self.valid {
            write!(f, "status:     valid ({} ms left)", self.distance_ms)
        } else {
            write!(f, "status:     expired ({} ms ago)", self.distance_ms)
        }
    }
}

/// Print the decoded token fields and whether the token is still valid.
/// # Errors
/// Returns an error if no token is found or it cannot be decoded.
pub fn execute(args: Args) -> Result<()> {
    let report = inspect_at(&args, Utc::now().timestamp_millis())?;
    println!("{report}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::Minter;
    use crate::relay::{BoxFuture, IdentityProvider, ProviderError};
    use secrecy::SecretString;

    struct NoProvider;

    impl IdentityProvider for NoProvider {
        fn fresh_credential(&self) -> BoxFuture<'_, Result<SecretString, ProviderError>> {
            Box::pin(async { Err(ProviderError::Unauthenticated) })
        }

        fn is_authenticated(&self) -> BoxFuture<'_, bool> {
            Box::pin(async { false })
        }
    }

    fn minted(credential: &str) -> Result<String> {
        let minter = Minter::new(NoProvider, RelayConfig::new(), "a.example");
        Ok(minter.mint_at(&SecretString::from(credential.to_string()), 0)?)
    }

    fn args(input: String) -> Args {
        Args {
            input,
            config: RelayConfig::new(),
        }
    }

    #[test]
    fn inspect_bare_token() -> Result<()> {
        let report = inspect_at(&args(minted("abc")?), 100_000)?;
        assert_eq!(report.issuer_origin, "a.example");
        assert_eq!(report.expires_at, 300_000);
        assert!(report.valid);
        assert_eq!(report.credential_hint, "****");

        let printed = report.to_string();
        assert!(printed.contains("valid (200000 ms left)"));
        assert!(!printed.contains("abc"));
        Ok(())
    }

    #[test]
    fn inspect_url_reports_expiry() -> Result<()> {
        let url = format!("https://b.example/admin?authToken={}", minted("abc")?);
        let report = inspect_at(&args(url), 400_000)?;
        assert!(!report.valid);
        assert!(report.to_string().contains("expired (100000 ms ago)"));
        Ok(())
    }

    #[test]
    fn inspect_expiry_boundary_is_valid() -> Result<()> {
        let report = inspect_at(&args(minted("abc")?), 300_000)?;
        assert!(report.valid);
        Ok(())
    }

    fn encoded(issued_at: i64, window_ms: i64) -> Result<String> {
        let token = RelayToken::new(
            SecretString::from("abc".to_string()),
            issued_at,
            window_ms,
            "a.example",
        );
        Ok(token.encode()?)
    }

    #[test]
    fn inspect_extreme_timestamps_does_not_overflow() -> Result<()> {
        let report = inspect_at(&args(encoded(0, i64::MAX)?), -1)?;
        assert!(report.valid);
        assert_eq!(report.distance_ms, i64::MAX);
        assert!(report.to_string().contains("status:     valid"));

        let report = inspect_at(&args(encoded(i64::MIN, 1_000)?), i64::MAX)?;
        assert!(!report.valid);
        assert_eq!(report.distance_ms, i64::MAX);
        assert!(report.to_string().contains("window:     1000 ms"));
        Ok(())
    }

    #[test]
    fn inspect_url_without_parameter_fails() {
        let result = inspect_at(&args("https://b.example/admin?x=1".to_string()), 0);
        assert!(result
            .err()
            .is_some_and(|err| err.to_string().contains("authToken")));
    }

    #[test]
    fn inspect_garbage_fails() {
        assert!(inspect_at(&args("%%%not-a-token".to_string()), 0).is_err());
    }

    #[test]
    fn credential_hint_keeps_prefix_of_long_credentials() {
        assert_eq!(credential_hint("eyJhbGciOiJIUzI1NiJ9"), "eyJh… (20 chars)");
    }
}
