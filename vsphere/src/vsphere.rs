use crate::error::{Error, Result};
use crate::inventory;
use crate::snapshot::SnapshotSettings;
use crate::vim::{
    ConnectionConfig, Credentials, Entity, EntityKind, TaskProgress, TaskWaitConfig, TaskWaiter,
    VimApi, VimConnection,
};

/// Main entry point for inventory lookups and snapshot operations.
pub struct VSphere<A: VimApi = VimConnection> {
    api: A,
    wait_config: TaskWaitConfig,
}

impl VSphere<VimConnection> {
    /// Connect and log in to an SDK endpoint.
    pub fn connect(config: ConnectionConfig, credentials: &Credentials) -> Result<Self> {
        Ok(Self::new(VimConnection::connect(config, credentials)?))
    }
}

impl<A: VimApi> VSphere<A> {
    /// Wrap an existing API implementation.
    pub fn new(api: A) -> Self {
        Self {
            api,
            wait_config: TaskWaitConfig::default(),
        }
    }

    /// Set how tasks are waited on.
    pub fn with_wait_config(mut self, config: TaskWaitConfig) -> Self {
        self.wait_config = config;
        self
    }

    /// Underlying API.
    pub fn api(&self) -> &A {
        &self.api
    }

    // ========== Host Operations ==========

    /// All hosts in inventory order.
    pub fn hosts(&self) -> Result<Vec<Entity>> {
        inventory::list(&self.api, self.api.root_folder(), &[EntityKind::HostSystem])
    }

    /// Get a host by display name.
    pub fn find_host(&self, name: &str) -> Result<Entity> {
        self.find(EntityKind::HostSystem, name)
    }

    /// Product full name of a host, read fresh from the server.
    pub fn host_version(&self, host: &Entity) -> Result<String> {
        self.api.host_product_full_name(&host.moref)
    }

    // ========== VM Operations ==========

    /// Get a VM by display name.
    pub fn find_vm(&self, name: &str) -> Result<Entity> {
        self.find(EntityKind::VirtualMachine, name)
    }

    /// Take a snapshot and wait for the task to finish.
    pub fn create_snapshot(&self, vm: &Entity, settings: &SnapshotSettings) -> Result<()> {
        if vm.kind != EntityKind::VirtualMachine {
            return Err(Error::Validation {
                field: "vm",
                message: format!("'{}' is a {}, not a VirtualMachine", vm.name, vm.kind),
            });
        }
        settings.validate()?;

        let task = self.api.create_snapshot_task(&vm.moref, settings)?;
        tracing::info!(vm = %vm.name, snapshot = %settings.name, %task, "snapshot task started");

        TaskWaiter::with_config(&self.api, self.wait_config.clone()).wait_for_tasks_with_callback(
            std::slice::from_ref(&task),
            |progress: &TaskProgress| {
                tracing::debug!(
                    task = %progress.task,
                    state = %progress.state,
                    elapsed = ?progress.elapsed,
                    "task progress"
                );
            },
        )
    }

    fn find(&self, kind: EntityKind, name: &str) -> Result<Entity> {
        inventory::resolve(&self.api, self.api.root_folder(), &[kind], Some(name))?
            .ok_or_else(|| Error::not_found(kind, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{InMemoryVim, TaskOutcome};
    use crate::vim::TaskFault;

    fn inventory() -> InMemoryVim {
        InMemoryVim::new()
            .with_host("esx1", "7.0.0")
            .with_host("esx2", "6.7.0")
            .with_vm("web01")
    }

    #[test]
    fn test_find_host_not_found() {
        let vim = inventory();
        let vsphere = VSphere::new(&vim);
        let err = vsphere.find_host("esx9").unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Unable to locate HostSystem 'esx9'");
    }

    #[test]
    fn test_hosts_and_versions() {
        let vim = inventory();
        let vsphere = VSphere::new(&vim);
        let versions: Vec<_> = vsphere
            .hosts()
            .unwrap()
            .iter()
            .map(|h| (h.name.clone(), vsphere.host_version(h).unwrap()))
            .collect();
        assert_eq!(
            versions,
            vec![
                ("esx1".to_string(), "7.0.0".to_string()),
                ("esx2".to_string(), "6.7.0".to_string())
            ]
        );
        assert_eq!(vim.full_name_reads(), 2);
    }

    #[test]
    fn test_create_snapshot_passes_flags() {
        let vim = inventory();
        let vsphere = VSphere::new(&vim);
        let vm = vsphere.find_vm("web01").unwrap();
        let settings = SnapshotSettings::builder()
            .name("snap1")
            .memory(true)
            .build()
            .unwrap();

        vsphere.create_snapshot(&vm, &settings).unwrap();

        let calls = vim.snapshot_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].vm, vm.moref);
        assert!(calls[0].settings.memory);
        assert!(!calls[0].settings.quiesce);
        assert_eq!(vim.open_filters(), 0);
        assert_eq!(vim.open_views(), 0);
    }

    #[test]
    fn test_create_snapshot_task_error() {
        let vim = inventory().with_snapshot_outcome(TaskOutcome::Error(TaskFault::new(
            "FileFault",
            "Unable to write snapshot file",
        )));
        let vsphere = VSphere::new(&vim);
        let vm = vsphere.find_vm("web01").unwrap();
        let settings = SnapshotSettings::builder().name("s").build().unwrap();

        let err = vsphere.create_snapshot(&vm, &settings).unwrap_err();
        assert!(err.is_task_failure());
        assert!(err.to_string().contains("FileFault"));
    }

    #[test]
    fn test_create_snapshot_rejects_host() {
        let vim = inventory();
        let vsphere = VSphere::new(&vim);
        let host = vsphere.find_host("esx1").unwrap();
        let settings = SnapshotSettings::builder().name("s").build().unwrap();
        assert!(matches!(
            vsphere.create_snapshot(&host, &settings),
            Err(Error::Validation { field: "vm", .. })
        ));
        assert!(vim.snapshot_calls().is_empty());
    }
}
