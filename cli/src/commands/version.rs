//! `get-esxi-version`

use std::io::Write;

use vsphere::{VSphere, VimApi};

use crate::error::{CliError, Result};

/// One report line.
pub fn version_line(name: &str, version: &str) -> String {
    format!("###Name  : {}, Version : {}", name, version)
}

/// Print the product version of the host named `esxi`, or of every host.
///
/// A named host that does not exist is an error. Without a name, one line is
/// printed per host in inventory order followed by a blank line.
pub fn report_versions<A: VimApi, W: Write>(
    vsphere: &VSphere<A>,
    esxi: Option<&str>,
    out: &mut W,
) -> Result<()> {
    match esxi {
        Some(name) => {
            let host = vsphere.find_host(name)?;
            let version = vsphere.host_version(&host)?;
            writeln!(out, "{}", version_line(&host.name, &version)).map_err(CliError::Output)?;
        }
        None => {
            let hosts = vsphere.hosts()?;
            tracing::debug!(count = hosts.len(), "hosts found");
            for host in &hosts {
                let version = vsphere.host_version(host)?;
                writeln!(out, "{}", version_line(&host.name, &version))
                    .map_err(CliError::Output)?;
            }
            writeln!(out).map_err(CliError::Output)?;
        }
    }
    out.flush().map_err(CliError::Output)
}
