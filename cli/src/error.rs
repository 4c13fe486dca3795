use thiserror::Error;

use crate::config::ConfigError;

/// Anything that makes a tool exit with status 1.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Vsphere(#[from] vsphere::Error),

    #[error("Failed to read password: {0}")]
    Prompt(#[source] std::io::Error),

    #[error("Failed to write output: {0}")]
    Output(#[source] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CliError>;
