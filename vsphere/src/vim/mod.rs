mod connection;
mod property;
mod task;
mod types;
pub mod xml;

use std::time::Duration;

use crate::error::Result;
use crate::snapshot::SnapshotSettings;

pub use connection::{
    ConnectionConfig, Credentials, VimConnection, DEFAULT_API_VERSION, DEFAULT_PORT,
    DEFAULT_TIMEOUT,
};
pub use task::{TaskProgress, TaskWaitConfig, TaskWaiter, DEFAULT_MAX_WAIT};
pub use types::{
    AboutInfo, Entity, EntityKind, ManagedObjectReference, ServiceContent, TaskFault, TaskUpdate,
    UpdateSet,
};

/// The vim25 operations the inventory tools rely on.
///
/// [`VimConnection`] implements this over SOAP; [`crate::memory::InMemoryVim`]
/// implements it in memory for tests.
pub trait VimApi {
    /// Root folder of the inventory.
    fn root_folder(&self) -> &ManagedObjectReference;

    /// `ViewManager.CreateContainerView`.
    fn create_container_view(
        &self,
        container: &ManagedObjectReference,
        kinds: &[EntityKind],
        recursive: bool,
    ) -> Result<ManagedObjectReference>;

    /// Members of a container view with their display names, in view order.
    fn view_entities(&self, view: &ManagedObjectReference) -> Result<Vec<Entity>>;

    /// `View.DestroyView`.
    fn destroy_view(&self, view: &ManagedObjectReference) -> Result<()>;

    /// Current `summary.config.product.fullName` of a host.
    fn host_product_full_name(&self, host: &ManagedObjectReference) -> Result<String>;

    /// `VirtualMachine.CreateSnapshot_Task`; returns the task.
    fn create_snapshot_task(
        &self,
        vm: &ManagedObjectReference,
        settings: &SnapshotSettings,
    ) -> Result<ManagedObjectReference>;

    /// `PropertyCollector.CreateFilter` on `info.state` and `info.error` of the tasks.
    fn create_task_filter(&self, tasks: &[ManagedObjectReference]) -> Result<ManagedObjectReference>;

    /// `PropertyCollector.WaitForUpdatesEx`; `None` when the round timed out.
    fn wait_for_updates(&self, version: &str, max_wait: Duration) -> Result<Option<UpdateSet>>;

    /// `PropertyFilter.DestroyPropertyFilter`.
    fn destroy_filter(&self, filter: &ManagedObjectReference) -> Result<()>;
}

impl<T: VimApi + ?Sized> VimApi for &T {
    fn root_folder(&self) -> &ManagedObjectReference {
        (**self).root_folder()
    }

    fn create_container_view(
        &self,
        container: &ManagedObjectReference,
        kinds: &[EntityKind],
        recursive: bool,
    ) -> Result<ManagedObjectReference> {
        (**self).create_container_view(container, kinds, recursive)
    }

    fn view_entities(&self, view: &ManagedObjectReference) -> Result<Vec<Entity>> {
        (**self).view_entities(view)
    }

    fn destroy_view(&self, view: &ManagedObjectReference) -> Result<()> {
        (**self).destroy_view(view)
    }

    fn host_product_full_name(&self, host: &ManagedObjectReference) -> Result<String> {
        (**self).host_product_full_name(host)
    }

    fn create_snapshot_task(
        &self,
        vm: &ManagedObjectReference,
        settings: &SnapshotSettings,
    ) -> Result<ManagedObjectReference> {
        (**self).create_snapshot_task(vm, settings)
    }

    fn create_task_filter(&self, tasks: &[ManagedObjectReference]) -> Result<ManagedObjectReference> {
        (**self).create_task_filter(tasks)
    }

    fn wait_for_updates(&self, version: &str, max_wait: Duration) -> Result<Option<UpdateSet>> {
        (**self).wait_for_updates(version, max_wait)
    }

    fn destroy_filter(&self, filter: &ManagedObjectReference) -> Result<()> {
        (**self).destroy_filter(filter)
    }
}
