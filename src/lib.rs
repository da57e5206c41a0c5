//! # Authrelay (Cross-Domain Token Relay)
//!
//! `authrelay` carries an already-authenticated principal from one origin (the
//! admin dashboard) to another (a relying party) through a short-lived token in
//! a URL query parameter.
//!
//! ## Relay Flow
//!
//! 1. **Mint:** The dashboard asks its identity provider for a fresh bearer
//!    credential and wraps it in a [`relay::RelayToken`] valid for five minutes.
//! 2. **Transport:** The encoded token is appended to the destination URL as
//!    `authToken=<token>`.
//! 3. **Consume:** The relying party extracts and decodes the token, checks its
//!    expiry, strips the parameter from the visible URL (history replace), and
//!    forwards the raw credential to its own backend for independent
//!    verification.
//!
//! The token is an envelope, not a proof of identity. It is neither encrypted
//! nor signed; an integrity tag only detects corruption in transit. Anyone who
//! captures the URL can replay it until it expires, and there is no clock-skew
//! tolerance.
//!
//! ## Relying-Party Backend
//!
//! The `server` command runs the `/api/verify-token` endpoint the verifier hands
//! off to: it checks the credential against an upstream verifier, resolves the
//! principal's role and optionally enforces a required role.

pub mod api;
pub mod cli;
pub mod location;
pub mod relay;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
