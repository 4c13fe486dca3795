//! # vsphere
//!
//! Typed vSphere inventory access over the vim25 SOAP API.
//!
//! This crate covers the small slice of the vSphere Web Services API needed
//! by the inventory tools: session login/logout, container-view lookups by
//! display name, host product versions and VM snapshot creation with
//! blocking task waits.
//!
//! ## Features
//!
//! - **Scoped server resources**: sessions, container views and property
//!   filters are released when their owner goes out of scope
//! - **Typed errors**: SOAP faults, task failures and lookups that found
//!   nothing are distinct variants
//! - **Pluggable transport**: everything above the wire goes through the
//!   [`VimApi`] trait, with [`memory::InMemoryVim`] for tests
//!
//! ## Example
//!
//! ```no_run
//! use vsphere::{ConnectionConfig, Credentials, SnapshotSettings, VSphere};
//!
//! fn main() -> vsphere::Result<()> {
//!     let config = ConnectionConfig::new("vcenter.lab.local");
//!     let credentials = Credentials::new("administrator@vsphere.local", "secret");
//!     let vsphere = VSphere::connect(config, &credentials)?;
//!
//!     for host in vsphere.hosts()? {
//!         println!("{}: {}", host.name, vsphere.host_version(&host)?);
//!     }
//!
//!     let vm = vsphere.find_vm("web01")?;
//!     let settings = SnapshotSettings::builder()
//!         .name("before-upgrade")
//!         .memory(true)
//!         .build()?;
//!     vsphere.create_snapshot(&vm, &settings)?;
//!
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod inventory;
pub mod memory;
pub mod snapshot;
pub mod vim;
mod vsphere;

// Re-export main types at crate root
pub use error::{Error, Result, TaskState};
pub use vsphere::VSphere;

pub use inventory::{list, resolve, ContainerView};
pub use snapshot::{SnapshotSettings, SnapshotSettingsBuilder};

pub use vim::{
    ConnectionConfig, Credentials, Entity, EntityKind, ManagedObjectReference, TaskProgress,
    TaskWaitConfig, TaskWaiter, VimApi, VimConnection,
};
