//! In-memory [`VimApi`] implementation.
//!
//! Holds a flat inventory of hosts and virtual machines, tracks open views and
//! property filters, and plays back scripted task transitions
//! (`queued`, `running`, an empty round, then the terminal state).
//!
//! ```
//! use vsphere::memory::InMemoryVim;
//! use vsphere::VSphere;
//!
//! let vim = InMemoryVim::new()
//!     .with_host("esx1", "VMware ESXi 7.0.0 build-15843807")
//!     .with_vm("web01");
//! let vsphere = VSphere::new(&vim);
//!
//! let host = vsphere.find_host("esx1").unwrap();
//! assert_eq!(vsphere.host_version(&host).unwrap(), "VMware ESXi 7.0.0 build-15843807");
//! assert_eq!(vim.open_views(), 0);
//! ```

use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;

use crate::error::{Error, Result, TaskState};
use crate::snapshot::SnapshotSettings;
use crate::vim::{
    Entity, EntityKind, ManagedObjectReference, TaskFault, TaskUpdate, UpdateSet, VimApi,
};

/// Terminal state a scripted task ends in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    Error(TaskFault),
}

/// A recorded `CreateSnapshot_Task` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotCall {
    pub vm: ManagedObjectReference,
    pub settings: SnapshotSettings,
    pub task: ManagedObjectReference,
}

#[derive(Debug)]
struct InMemoryEntity {
    entity: Entity,
    full_name: Option<String>,
}

#[derive(Debug, Default)]
struct State {
    next_id: u32,
    version: u64,
    open_views: HashMap<ManagedObjectReference, Vec<EntityKind>>,
    open_filters: HashSet<ManagedObjectReference>,
    filters_created: usize,
    rounds: VecDeque<Option<TaskUpdate>>,
    snapshots: Vec<SnapshotCall>,
    full_name_reads: usize,
}

impl State {
    fn next(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }
}

/// In-memory vSphere inventory.
#[derive(Debug)]
pub struct InMemoryVim {
    root: ManagedObjectReference,
    entities: Vec<InMemoryEntity>,
    snapshot_outcome: TaskOutcome,
    fail_view_reads: bool,
    state: RefCell<State>,
}

impl Default for InMemoryVim {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryVim {
    /// Create an empty inventory whose snapshot tasks succeed.
    pub fn new() -> Self {
        Self {
            root: ManagedObjectReference::new("Folder", "group-d1"),
            entities: Vec::new(),
            snapshot_outcome: TaskOutcome::Success,
            fail_view_reads: false,
            state: RefCell::new(State::default()),
        }
    }

    /// Add a host with its product full name.
    pub fn with_host(mut self, name: impl Into<String>, full_name: impl Into<String>) -> Self {
        let moref = ManagedObjectReference::new("HostSystem", format!("host-{}", self.entities.len() + 10));
        self.entities.push(InMemoryEntity {
            entity: Entity::new(moref, EntityKind::HostSystem, name),
            full_name: Some(full_name.into()),
        });
        self
    }

    /// Add a virtual machine.
    pub fn with_vm(mut self, name: impl Into<String>) -> Self {
        let moref = ManagedObjectReference::new("VirtualMachine", format!("vm-{}", self.entities.len() + 10));
        self.entities.push(InMemoryEntity {
            entity: Entity::new(moref, EntityKind::VirtualMachine, name),
            full_name: None,
        });
        self
    }

    /// Outcome of every snapshot task created afterwards.
    pub fn with_snapshot_outcome(mut self, outcome: TaskOutcome) -> Self {
        self.snapshot_outcome = outcome;
        self
    }

    /// Make reading view contents fail.
    pub fn with_failing_view_reads(mut self) -> Self {
        self.fail_view_reads = true;
        self
    }

    /// Create a task and script its transitions.
    pub fn submit_task(&self, outcome: TaskOutcome) -> ManagedObjectReference {
        let mut state = self.state.borrow_mut();
        let task = ManagedObjectReference::new("Task", state.next("task"));

        let update = |state: Option<TaskState>, fault: Option<TaskFault>| TaskUpdate {
            task: task.clone(),
            state,
            fault,
        };
        state.rounds.push_back(Some(update(Some(TaskState::Queued), None)));
        state.rounds.push_back(Some(update(Some(TaskState::Running), None)));
        state.rounds.push_back(None);
        let terminal = match outcome {
            TaskOutcome::Success => update(Some(TaskState::Success), None),
            TaskOutcome::Error(fault) => update(Some(TaskState::Error), Some(fault)),
        };
        state.rounds.push_back(Some(terminal));

        task
    }

    /// Container views created and not yet destroyed.
    pub fn open_views(&self) -> usize {
        self.state.borrow().open_views.len()
    }

    /// Property filters created and not yet destroyed.
    pub fn open_filters(&self) -> usize {
        self.state.borrow().open_filters.len()
    }

    /// Property filters created so far.
    pub fn filters_created(&self) -> usize {
        self.state.borrow().filters_created
    }

    /// Recorded snapshot calls.
    pub fn snapshot_calls(&self) -> Vec<SnapshotCall> {
        self.state.borrow().snapshots.clone()
    }

    /// Number of `summary.config.product.fullName` reads.
    pub fn full_name_reads(&self) -> usize {
        self.state.borrow().full_name_reads
    }

    fn lookup(&self, moref: &ManagedObjectReference) -> Option<&InMemoryEntity> {
        self.entities.iter().find(|e| &e.entity.moref == moref)
    }
}

fn not_found_fault(method: &'static str, moref: &ManagedObjectReference) -> Error {
    Error::Fault {
        method,
        fault: "ManagedObjectNotFound".to_string(),
        message: format!("The object '{moref}' has already been deleted or has not been completely created"),
    }
}

impl VimApi for InMemoryVim {
    fn root_folder(&self) -> &ManagedObjectReference {
        &self.root
    }

    fn create_container_view(
        &self,
        container: &ManagedObjectReference,
        kinds: &[EntityKind],
        _recursive: bool,
    ) -> Result<ManagedObjectReference> {
        if container != &self.root {
            return Err(not_found_fault("CreateContainerView", container));
        }
        let mut state = self.state.borrow_mut();
        let view = ManagedObjectReference::new("ContainerView", format!("session[0]{}", state.next("view")));
        state.open_views.insert(view.clone(), kinds.to_vec());
        Ok(view)
    }

    fn view_entities(&self, view: &ManagedObjectReference) -> Result<Vec<Entity>> {
        let state = self.state.borrow();
        let kinds = state
            .open_views
            .get(view)
            .ok_or_else(|| not_found_fault("RetrievePropertiesEx", view))?;
        if self.fail_view_reads {
            return Err(Error::Fault {
                method: "RetrievePropertiesEx",
                fault: "NotAuthenticated".to_string(),
                message: "The session is not authenticated.".to_string(),
            });
        }
        Ok(self
            .entities
            .iter()
            .filter(|e| kinds.contains(&e.entity.kind))
            .map(|e| e.entity.clone())
            .collect())
    }

    fn destroy_view(&self, view: &ManagedObjectReference) -> Result<()> {
        self.state
            .borrow_mut()
            .open_views
            .remove(view)
            .map(|_| ())
            .ok_or_else(|| not_found_fault("DestroyView", view))
    }

    fn host_product_full_name(&self, host: &ManagedObjectReference) -> Result<String> {
        self.state.borrow_mut().full_name_reads += 1;
        self.lookup(host)
            .and_then(|e| e.full_name.clone())
            .ok_or_else(|| not_found_fault("RetrievePropertiesEx", host))
    }

    fn create_snapshot_task(
        &self,
        vm: &ManagedObjectReference,
        settings: &SnapshotSettings,
    ) -> Result<ManagedObjectReference> {
        match self.lookup(vm) {
            Some(e) if e.entity.kind == EntityKind::VirtualMachine => {}
            _ => return Err(not_found_fault("CreateSnapshot_Task", vm)),
        }
        let task = self.submit_task(self.snapshot_outcome.clone());
        self.state.borrow_mut().snapshots.push(SnapshotCall {
            vm: vm.clone(),
            settings: settings.clone(),
            task: task.clone(),
        });
        Ok(task)
    }

    fn create_task_filter(&self, tasks: &[ManagedObjectReference]) -> Result<ManagedObjectReference> {
        if tasks.is_empty() {
            return Err(Error::Fault {
                method: "CreateFilter",
                fault: "InvalidArgument".to_string(),
                message: "A specified parameter was not correct: spec.objectSet".to_string(),
            });
        }
        let mut state = self.state.borrow_mut();
        let filter = ManagedObjectReference::new("PropertyFilter", format!("session[0]{}", state.next("filter")));
        state.open_filters.insert(filter.clone());
        state.filters_created += 1;
        Ok(filter)
    }

    fn wait_for_updates(&self, _version: &str, _max_wait: Duration) -> Result<Option<UpdateSet>> {
        let mut state = self.state.borrow_mut();
        if state.open_filters.is_empty() {
            return Err(Error::Fault {
                method: "WaitForUpdatesEx",
                fault: "InvalidState".to_string(),
                message: "no property filter registered".to_string(),
            });
        }
        let round = state.rounds.pop_front().ok_or_else(|| Error::Fault {
            method: "WaitForUpdatesEx",
            fault: "RequestCanceled".to_string(),
            message: "no scripted updates left".to_string(),
        })?;
        Ok(round.map(|update| {
            state.version += 1;
            UpdateSet {
                version: state.version.to_string(),
                updates: vec![update],
            }
        }))
    }

    fn destroy_filter(&self, filter: &ManagedObjectReference) -> Result<()> {
        if self.state.borrow_mut().open_filters.remove(filter) {
            Ok(())
        } else {
            Err(not_found_fault("DestroyPropertyFilter", filter))
        }
    }
}
