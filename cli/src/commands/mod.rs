//! The two tool flows, written against any [`vsphere::VimApi`].

pub mod snapshot;
pub mod version;

pub use snapshot::{snapshot_settings, take_snapshot};
pub use version::report_versions;
