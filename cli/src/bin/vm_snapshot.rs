//! Create a snapshot of a virtual machine and wait for it to finish.

use std::process::ExitCode;

use vsphere_cli::args::try_parse_legacy;
use vsphere_cli::commands::{snapshot_settings, take_snapshot};
use vsphere_cli::{connect, report, setup, Result, SnapshotArgs};

fn main() -> ExitCode {
    let args: SnapshotArgs = try_parse_legacy(std::env::args_os(), SnapshotArgs::LEGACY_FLAGS)
        .unwrap_or_else(|e| e.exit());
    report(run(&args))
}

fn run(args: &SnapshotArgs) -> Result<()> {
    let config = setup(&args.connection)?;
    let settings = snapshot_settings(args)?;
    let vsphere = connect(&args.connection, &config)?;

    let stdout = std::io::stdout();
    take_snapshot(&vsphere, &args.vm, &settings, &mut stdout.lock())
}
