use crate::cli::actions::{consume, inspect, mint, server, Action};
use anyhow::Result;

/// Execute the provided action.
// Single dispatch point for all CLI actions.
/// # Errors
/// Returns an error if the action fails.
pub async fn execute(action: Action) -> Result<()> {
    match action {
        Action::Mint(args) => mint::execute(args).await,
        Action::Inspect(args) => inspect::execute(args),
        Action::Consume(args) => consume::execute(args).await,
        Action::Server(args) => server::execute(args).await,
    }
}
