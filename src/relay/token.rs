//! Relay token envelope and its URL-safe text encoding.
//!
//! Wire form: `base64url_unpadded(json || sha256(json)[..8])` where `json` is
//! `{"token", "timestamp", "expiry", "domain"}`. The trailing tag is an
//! integrity check against corruption in transit, not a signature: anyone can
//! mint a well-formed token.

use crate::relay::error::DecodeError;
use base64ct::{Base64UrlUnpadded, Encoding};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

const TAG_LEN: usize = 8;

#[derive(Serialize)]
struct RecordRef<'a> {
    token: &'a str,
    timestamp: i64,
    expiry: i64,
    domain: &'a str,
}

#[derive(Deserialize)]
struct Record {
    token: String,
    timestamp: i64,
    expiry: i64,
    domain: String,
}

/// Short-lived envelope around a bearer credential.
#[derive(Debug, Clone)]
pub struct RelayToken {
    credential: SecretString,
    issued_at: i64,
    expires_at: i64,
    issuer_origin: String,
}

impl RelayToken {
    /// Wrap `credential` at `issued_at` (ms since epoch), expiring `window_ms` later.
    #[must_use]
    pub fn new(
        credential: SecretString,
        issued_at: i64,
        window_ms: i64,
        issuer_origin: impl Into<String>,
    ) -> Self {
        Self {
            credential,
            issued_at,
            expires_at: issued_at.saturating_add(window_ms),
            issuer_origin: issuer_origin.into(),
        }
    }

    #[must_use]
    pub fn credential(&self) -> &SecretString {
        &self.credential
    }

    #[must_use]
    pub fn issued_at(&self) -> i64 {
        self.issued_at
    }

    #[must_use]
    pub fn expires_at(&self) -> i64 {
        self.expires_at
    }

    #[must_use]
    pub fn issuer_origin(&self) -> &str {
        &self.issuer_origin
    }

    /// Length of the validity window, `None` if it cannot be represented.
    #[must_use]
    pub fn window_ms(&self) -> Option<i64> {
        self.expires_at.checked_sub(self.issued_at)
    }

    /// Expiry is inclusive: a token is still usable at `now == expires_at`.
    #[must_use]
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        now_ms > self.expires_at
    }

    /// Serialize and encode the token for transport in a URL.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON encoding fails.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        let record = RecordRef {
            token: self.credential.expose_secret(),
            timestamp: self.issued_at,
            expiry: self.expires_at,
            domain: &self.issuer_origin,
        };
        let mut bytes = serde_json::to_vec(&record)?;
        let tag = integrity_tag(&bytes);
        bytes.extend_from_slice(&tag);
        Ok(Base64UrlUnpadded::encode_string(&bytes))
    }

    /// Decode a token produced by [`RelayToken::encode`]. Expiry is not checked here.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the string is not unpadded base64url,
    /// - the integrity tag is missing or does not match,
    /// - the record is not valid JSON or lacks a required field,
    /// - the credential is empty, or `expiry` precedes `timestamp` or lies
    ///   further from it than an `i64` can hold.
    pub fn decode(encoded: &str) -> Result<Self, DecodeError> {
        let bytes =
            Base64UrlUnpadded::decode_vec(encoded.trim()).map_err(|_| DecodeError::Encoding)?;
        if bytes.len() <= TAG_LEN {
            return Err(DecodeError::TooShort);
        }

        let (payload, tag) = bytes.split_at(bytes.len() - TAG_LEN);
        if integrity_tag(payload) != tag {
            return Err(DecodeError::Integrity);
        }

        let record: Record = serde_json::from_slice(payload)?;
        if record.token.is_empty() {
            return Err(DecodeError::MissingCredential);
        }
        match record.expiry.checked_sub(record.timestamp) {
            Some(window) if window >= 0 => {}
            _ => return Err(DecodeError::InvalidWindow),
        }

        Ok(Self {
            credential: SecretString::from(record.token),
            issued_at: record.timestamp,
            expires_at: record.expiry,
            issuer_origin: record.domain,
        })
    }
}

fn integrity_tag(payload: &[u8]) -> [u8; TAG_LEN] {
    let digest = Sha256::digest(payload);
    let mut tag = [0u8; TAG_LEN];
    tag.copy_from_slice(&digest[..TAG_LEN]);
    tag
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::config::DEFAULT_VALIDITY_WINDOW_MS;

    fn token(credential: &str, issued_at: i64) -> RelayToken {
        RelayToken::new(
            SecretString::from(credential.to_string()),
            issued_at,
            DEFAULT_VALIDITY_WINDOW_MS,
            "a.example",
        )
    }

    fn encode_raw(payload: &[u8]) -> String {
        let mut bytes = payload.to_vec();
        bytes.extend_from_slice(&integrity_tag(payload));
        Base64UrlUnpadded::encode_string(&bytes)
    }

    #[test]
    fn decode_restores_every_field() -> Result<(), Box<dyn std::error::Error>> {
        let encoded = token("abc", 1_700_000_000_000).encode()?;
        let decoded = RelayToken::decode(&encoded)?;

        assert_eq!(decoded.credential().expose_secret(), "abc");
        assert_eq!(decoded.issued_at(), 1_700_000_000_000);
        assert_eq!(decoded.expires_at(), 1_700_000_300_000);
        assert_eq!(decoded.issuer_origin(), "a.example");
        Ok(())
    }

    #[test]
    fn decode_keeps_non_ascii_credentials() -> Result<(), Box<dyn std::error::Error>> {
        let credential = "eyJ.ünïcødé/+=?&#\"quoted\" 令牌";
        let encoded = token(credential, 42).encode()?;

        assert!(encoded
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert_eq!(
            RelayToken::decode(&encoded)?.credential().expose_secret(),
            credential
        );
        Ok(())
    }

    #[test]
    fn decode_rejects_invalid_encoding() {
        let result = RelayToken::decode("not-valid-encoding!");
        assert!(matches!(result, Err(DecodeError::Encoding)));
    }

    #[test]
    fn decode_rejects_plain_words() {
        // valid base64url alphabet, but no tag matches
        let result = RelayToken::decode("not-valid-encoding");
        assert!(matches!(
            result,
            Err(DecodeError::Encoding | DecodeError::TooShort | DecodeError::Integrity)
        ));
    }

    #[test]
    fn decode_rejects_empty_input() {
        assert!(matches!(RelayToken::decode(""), Err(DecodeError::TooShort)));
    }

    #[test]
    fn decode_rejects_corrupted_middle_character() -> Result<(), Box<dyn std::error::Error>> {
        let encoded = token("abc", 0).encode()?;
        let middle = encoded.len() / 2;
        let replacement = if encoded.as_bytes()[middle] == b'A' { "B" } else { "A" };
        let mut corrupted = encoded.clone();
        corrupted.replace_range(middle..=middle, replacement);

        assert_ne!(corrupted, encoded);
        assert!(matches!(
            RelayToken::decode(&corrupted),
            Err(DecodeError::Integrity | DecodeError::Encoding)
        ));
        Ok(())
    }

    #[test]
    fn decode_rejects_missing_fields() {
        let encoded = encode_raw(br#"{"token":"abc","timestamp":0,"domain":"a.example"}"#);
        assert!(matches!(
            RelayToken::decode(&encoded),
            Err(DecodeError::Record(_))
        ));
    }

    #[test]
    fn decode_rejects_non_record_payload() {
        let encoded = encode_raw(b"[1,2,3]");
        assert!(matches!(
            RelayToken::decode(&encoded),
            Err(DecodeError::Record(_))
        ));
    }

    #[test]
    fn decode_rejects_empty_credential() {
        let encoded =
            encode_raw(br#"{"token":"","timestamp":0,"expiry":300000,"domain":"a.example"}"#);
        assert!(matches!(
            RelayToken::decode(&encoded),
            Err(DecodeError::MissingCredential)
        ));
    }

    #[test]
    fn decode_rejects_inverted_window() {
        let encoded =
            encode_raw(br#"{"token":"abc","timestamp":10,"expiry":5,"domain":"a.example"}"#);
        assert!(matches!(
            RelayToken::decode(&encoded),
            Err(DecodeError::InvalidWindow)
        ));
    }

    #[test]
    fn decode_rejects_unrepresentable_window() {
        let encoded = encode_raw(
            br#"{"token":"abc","timestamp":-9223372036854775808,"expiry":9223372036854775807,"domain":"a.example"}"#,
        );
        assert!(matches!(
            RelayToken::decode(&encoded),
            Err(DecodeError::InvalidWindow)
        ));
    }

    #[test]
    fn window_is_expiry_minus_issue_time() {
        assert_eq!(token("abc", 1_000).window_ms(), Some(300_000));
    }

    #[test]
    fn expiry_is_inclusive() {
        let token = token("abc", 0);
        assert!(!token.is_expired_at(300_000));
        assert!(token.is_expired_at(300_001));
    }

    #[test]
    fn debug_output_redacts_credential() {
        let rendered = format!("{:?}", token("super-secret-credential", 0));
        assert!(!rendered.contains("super-secret-credential"));
    }
}
