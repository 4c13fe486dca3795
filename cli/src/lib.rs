//! Command-line tools for vCenter and ESXi
//!
//! Provides the two binaries:
//! - `get-esxi-version`: product version of one or all ESXi hosts
//! - `vm-snapshot`: create a VM snapshot and wait for the task

pub mod args;
pub mod commands;
pub mod config;
pub mod error;

use std::process::ExitCode;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vsphere::{Credentials, VSphere};

pub use args::{ConnectionArgs, SnapshotArgs, VersionArgs, YesNo};
pub use config::{Config, ConfigError};
pub use error::{CliError, Result};

// =============================================================================
// Tracing Initialization
// =============================================================================

/// Initialize tracing/logging with the given filter level
///
/// Logs go to stderr so that stdout carries only the report.
pub fn init_tracing(filter: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

// =============================================================================
// Session Setup
// =============================================================================

/// Load config named by `--config` and start logging.
///
/// A `--config` path that does not exist falls back to defaults with a
/// warning, emitted once logging is up.
pub fn setup(args: &ConnectionArgs) -> Result<Config> {
    let config = args.load_config()?;
    init_tracing(args.log_filter(&config));
    if let Some(path) = missing_config(args) {
        tracing::warn!("Config file not found at {:?}, using defaults", path);
    }
    Ok(config)
}

/// The `--config` path when it names no file.
pub fn missing_config(args: &ConnectionArgs) -> Option<&std::path::Path> {
    args.config.as_deref().filter(|path| !path.exists())
}

/// Log in to the endpoint named on the command line.
pub fn connect(args: &ConnectionArgs, config: &Config) -> Result<VSphere> {
    let password = args.password()?;
    let credentials = Credentials::new(args.user.clone(), password);
    let endpoint = config.connection_config(&args.host, args.port);

    tracing::debug!(url = %endpoint.sdk_url(), user = %args.user, "connecting");
    let vsphere = VSphere::connect(endpoint, &credentials)?;
    Ok(vsphere.with_wait_config(config.wait_config()))
}

/// Map a tool's outcome to its exit status, printing failures.
pub fn report(result: Result<()>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = ?e, "exiting with failure");
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
