use crate::api::{self, StaticRoleStore, UpstreamVerifier, VerifyState};
use crate::relay::Role;
use anyhow::Result;
use std::{path::PathBuf, sync::Arc};
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub upstream_url: String,
    pub roles: PathBuf,
    pub required_role: Option<String>,
}

fn verify_state(args: &Args) -> Result<VerifyState> {
    let upstream = UpstreamVerifier::new(&args.upstream_url)?;
    let roles = StaticRoleStore::from_file(&args.roles)?;

    info!(
        "Loaded {} role assignment(s) from {}",
        roles.len(),
        args.roles.display()
    );

    Ok(
        VerifyState::new(Arc::new(upstream), Arc::new(roles))
            .with_required_role(args.required_role.as_deref().map(Role::new)),
    )
}

fn log_startup_args(args: &Args) {
    let short_hash = crate::GIT_COMMIT_HASH.get(0..7).unwrap_or(crate::GIT_COMMIT_HASH);
    info!(
        "{} {} - {}\n\n  listen:        tcp:{}\n  upstream_url:  {}\n  roles:         {}\n  required_role: {}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        short_hash,
        args.port,
        args.upstream_url,
        args.roles.display(),
        args.required_role.as_deref().unwrap_or("none"),
    );
}

/// Execute the server action.
/// # Errors
/// Returns an error if the roles file cannot be loaded or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let state = verify_state(&args)?;

    api::new(args.port, Arc::new(state)).await
}
