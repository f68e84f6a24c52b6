use crate::cli::ServeArgs;
use crate::config;
use crate::error::{Result, TrackerError};
use crate::server::{self, ServerSettings};

/// Run the HTTP API in the foreground until Ctrl-C.
///
/// # Errors
///
/// `NotInitialized` without a database, or an I/O error binding the address.
pub fn execute(args: &ServeArgs, cli: &config::CliOverrides) -> Result<()> {
    let config = config::load_config(cli)?;
    let settings = ServerSettings::from_config(&config)?;
    if !settings.db_path.exists() {
        return Err(TrackerError::NotInitialized);
    }
    let bind = args.bind.clone().unwrap_or_else(|| config.bind.clone());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(server::serve(settings, &bind))
}
