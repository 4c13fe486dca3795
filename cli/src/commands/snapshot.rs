//! `vm-snapshot`

use std::io::Write;

use vsphere::{SnapshotSettings, VSphere, VimApi};

use crate::args::SnapshotArgs;
use crate::error::{CliError, Result};

/// Snapshot settings from the command line.
pub fn snapshot_settings(args: &SnapshotArgs) -> Result<SnapshotSettings> {
    let mut builder = SnapshotSettings::builder()
        .name(args.name.clone())
        .memory(args.memory.into())
        .quiesce(args.quiesce.into());
    if let Some(ref description) = args.description {
        builder = builder.description(description.clone());
    }
    Ok(builder.build()?)
}

/// Line printed once the snapshot task succeeded.
pub fn confirmation(snapshot: &str, vm: &str, memory: bool) -> String {
    if memory {
        format!("Snapshot {} is taken on VM {} with memory", snapshot, vm)
    } else {
        format!("Snapshot {} is taken on VM {} with no in-memory", snapshot, vm)
    }
}

/// Snapshot the VM named `vm_name` and wait for the task.
///
/// Nothing is created when the VM cannot be found.
pub fn take_snapshot<A: VimApi, W: Write>(
    vsphere: &VSphere<A>,
    vm_name: &str,
    settings: &SnapshotSettings,
    out: &mut W,
) -> Result<()> {
    let vm = vsphere.find_vm(vm_name)?;
    vsphere.create_snapshot(&vm, settings)?;

    writeln!(out, "{}", confirmation(&settings.name, &vm.name, settings.memory))
        .map_err(CliError::Output)?;
    out.flush().map_err(CliError::Output)
}
