//! Command dispatch and handlers.

pub mod bootstrap;
pub mod sync;

use std::env;
use std::path::PathBuf;

use crate::cli::Command;
use crate::config::Credentials;
use crate::context::ServiceContext;

/// Dispatch a parsed command to its handler.
///
/// When `DOCSYNC_CASSETTE` is set to a cassette file path, all port
/// interactions are replayed from it instead of hitting live services.
///
/// # Errors
///
/// Returns an error string if context construction or the selected
/// command handler fails.
pub fn dispatch(command: &Command) -> Result<(), String> {
    let ctx = if let Ok(path) = env::var("DOCSYNC_CASSETTE") {
        ServiceContext::replaying(&PathBuf::from(path))?
    } else {
        let credentials = Credentials::from_env()?;
        ServiceContext::live(&credentials)
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("Failed to start async runtime: {e}"))?;
    runtime.block_on(dispatch_with_context(command, &ctx))
}

/// Dispatch a command with the given service context.
pub async fn dispatch_with_context(command: &Command, ctx: &ServiceContext) -> Result<(), String> {
    match command {
        Command::Sync { event, config } => sync::run_with_context(ctx, event, config).await,
        Command::Bootstrap { owner, repo, branch, config } => {
            bootstrap::run_with_context(ctx, owner, repo, branch, config).await
        }
    }
}
