use crate::error::{Error, Result};

/// Settings for `CreateSnapshot_Task`.
///
/// Use [`SnapshotSettingsBuilder`] to construct with validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotSettings {
    /// Snapshot name (required, not checked for uniqueness).
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Include the VM's memory state.
    pub memory: bool,
    /// Quiesce the guest file system through VMware Tools.
    pub quiesce: bool,
}

impl SnapshotSettings {
    /// Create a new builder.
    pub fn builder() -> SnapshotSettingsBuilder {
        SnapshotSettingsBuilder::default()
    }

    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation {
                field: "name",
                message: "Snapshot name cannot be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Builder for [`SnapshotSettings`].
#[derive(Debug, Default)]
pub struct SnapshotSettingsBuilder {
    name: Option<String>,
    description: Option<String>,
    memory: bool,
    quiesce: bool,
}

impl SnapshotSettingsBuilder {
    /// Set snapshot name (required).
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set description. Empty descriptions are dropped.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        let description = description.into();
        self.description = (!description.is_empty()).then_some(description);
        self
    }

    /// Include memory state.
    pub fn memory(mut self, memory: bool) -> Self {
        self.memory = memory;
        self
    }

    /// Quiesce the guest before snapshotting.
    pub fn quiesce(mut self, quiesce: bool) -> Self {
        self.quiesce = quiesce;
        self
    }

    /// Build and validate.
    pub fn build(self) -> Result<SnapshotSettings> {
        let settings = SnapshotSettings {
            name: self.name.ok_or(Error::Validation {
                field: "name",
                message: "Snapshot name is required".to_string(),
            })?,
            description: self.description,
            memory: self.memory,
            quiesce: self.quiesce,
        };
        settings.validate()?;
        Ok(settings)
    }
}
