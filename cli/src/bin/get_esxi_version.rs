//! Print the product version of one or all ESXi hosts.

use std::process::ExitCode;

use vsphere_cli::args::try_parse_legacy;
use vsphere_cli::commands::report_versions;
use vsphere_cli::{connect, report, setup, Result, VersionArgs};

fn main() -> ExitCode {
    let args: VersionArgs = try_parse_legacy(std::env::args_os(), VersionArgs::LEGACY_FLAGS)
        .unwrap_or_else(|e| e.exit());
    report(run(&args))
}

fn run(args: &VersionArgs) -> Result<()> {
    let config = setup(&args.connection)?;
    let vsphere = connect(&args.connection, &config)?;

    let stdout = std::io::stdout();
    report_versions(&vsphere, args.esxi.as_deref(), &mut stdout.lock())
}
