//! Command-line arguments shared by both tools.
//!
//! The tools accept a few multi-letter flags with a single dash (`-esxi`,
//! `-vm`, `-memory`, `-quiesce`). clap reads those as bundles of short flags,
//! so they are rewritten to their `--` form before parsing.

use std::ffi::OsString;
use std::path::PathBuf;

use clap::{Args, Parser, ValueEnum};

use crate::config::Config;
use crate::error::{CliError, Result};

/// Filter used by `-v/--verbose`.
pub const VERBOSE_FILTER: &str = "vsphere=debug,vsphere_cli=debug";

/// Connection flags common to both tools.
#[derive(Debug, Clone, Args)]
pub struct ConnectionArgs {
    /// Remote host to connect to
    #[arg(short = 's', long = "host")]
    pub host: String,

    /// Port to connect on
    #[arg(short = 'o', long, default_value_t = vsphere::vim::DEFAULT_PORT)]
    pub port: u16,

    /// User name to use when connecting to host
    #[arg(short = 'u', long)]
    pub user: String,

    /// Password to use when connecting to host (prompted when omitted)
    #[arg(short = 'p', long)]
    pub password: Option<String>,

    /// TOML configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

impl ConnectionArgs {
    /// Load the file named by `--config`, or defaults.
    pub fn load_config(&self) -> Result<Config> {
        Ok(Config::load_optional(self.config.as_deref())?)
    }

    /// Tracing filter: `--verbose` wins over the configured level.
    pub fn log_filter<'a>(&self, config: &'a Config) -> &'a str {
        if self.verbose {
            VERBOSE_FILTER
        } else {
            &config.logging.level
        }
    }

    /// The password from `-p`, or prompted without echo.
    pub fn password(&self) -> Result<String> {
        match self.password {
            Some(ref password) => Ok(password.clone()),
            None => rpassword::prompt_password(password_prompt(&self.host, &self.user))
                .map_err(CliError::Prompt),
        }
    }
}

/// Prompt shown when no password was given.
pub fn password_prompt(host: &str, user: &str) -> String {
    format!("Enter password for host {} and user {}: ", host, user)
}

/// A `yes`/`no` flag value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum YesNo {
    Yes,
    No,
}

impl From<YesNo> for bool {
    fn from(value: YesNo) -> Self {
        value == YesNo::Yes
    }
}

/// Arguments of `get-esxi-version`.
#[derive(Debug, Parser)]
#[command(
    name = "get-esxi-version",
    version,
    about = "Print the product version of ESXi hosts"
)]
pub struct VersionArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Only report the ESXi host with this name
    #[arg(long)]
    pub esxi: Option<String>,
}

impl VersionArgs {
    /// Flags also accepted with a single dash.
    pub const LEGACY_FLAGS: &'static [&'static str] = &["esxi"];
}

/// Arguments of `vm-snapshot`.
#[derive(Debug, Parser)]
#[command(
    name = "vm-snapshot",
    version,
    about = "Create a snapshot of a virtual machine"
)]
pub struct SnapshotArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Name of the virtual machine
    #[arg(long = "vmname", visible_alias = "vm")]
    pub vm: String,

    /// Name of the snapshot
    #[arg(short = 'n', long)]
    pub name: String,

    /// Description of the snapshot
    #[arg(short = 'd', long)]
    pub description: Option<String>,

    /// Include the VM's memory state
    #[arg(long, value_enum, default_value_t = YesNo::No)]
    pub memory: YesNo,

    /// Quiesce the guest file system
    #[arg(long, value_enum, default_value_t = YesNo::No)]
    pub quiesce: YesNo,
}

impl SnapshotArgs {
    /// Flags also accepted with a single dash.
    pub const LEGACY_FLAGS: &'static [&'static str] = &["vm", "memory", "quiesce"];
}

/// Rewrite `-flag` and `-flag=value` to `--flag` for each name in `legacy`.
///
/// Arguments after `--` are left alone.
pub fn normalize_legacy_flags<I, T>(argv: I, legacy: &[&str]) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut passthrough = false;
    argv.into_iter()
        .map(Into::into)
        .map(|arg| {
            if passthrough {
                return arg;
            }
            let Some(text) = arg.to_str() else {
                return arg;
            };
            if text == "--" {
                passthrough = true;
                return arg;
            }
            let Some(flag) = text.strip_prefix('-').filter(|rest| !rest.starts_with('-')) else {
                return arg;
            };
            let name = flag.split_once('=').map_or(flag, |(name, _)| name);
            if legacy.contains(&name) {
                OsString::from(format!("-{}", text))
            } else {
                arg
            }
        })
        .collect()
}

/// Parse `argv` after normalizing single-dash legacy flags.
pub fn try_parse_legacy<P, I, T>(argv: I, legacy: &[&str]) -> std::result::Result<P, clap::Error>
where
    P: Parser,
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    P::try_parse_from(normalize_legacy_flags(argv, legacy))
}
