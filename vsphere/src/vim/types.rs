use core::fmt;

use crate::error::{Error, Result, TaskState};
use crate::vim::xml::{escape, Element};

/// Reference to a server-side managed object (`{type, value}`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ManagedObjectReference {
    /// Managed object type, e.g. `HostSystem`.
    pub kind: String,
    /// Server-assigned identifier, e.g. `host-10`.
    pub value: String,
}

impl ManagedObjectReference {
    /// Create a new reference.
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            value: value.into(),
        }
    }

    /// Read a reference from an element carrying a `type` attribute.
    pub fn from_element(element: &Element, method: &'static str) -> Result<Self> {
        let kind = element.attr("type").ok_or_else(|| {
            Error::malformed(
                method,
                format!("<{}> is not a managed object reference", element.name),
            )
        })?;
        Ok(Self::new(kind, element.text()))
    }

    /// Render as `<tag type="kind">value</tag>`.
    pub fn to_xml(&self, tag: &str) -> String {
        format!(
            r#"<{tag} type="{}">{}</{tag}>"#,
            escape(&self.kind),
            escape(&self.value)
        )
    }
}

impl fmt::Display for ManagedObjectReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.value)
    }
}

/// Inventory entity kinds the tools look up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    HostSystem,
    VirtualMachine,
}

impl EntityKind {
    /// vim25 type name.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::HostSystem => "HostSystem",
            EntityKind::VirtualMachine => "VirtualMachine",
        }
    }

    /// Map a vim25 type name back to a kind.
    pub fn from_type(kind: &str) -> Option<Self> {
        match kind {
            "HostSystem" => Some(EntityKind::HostSystem),
            "VirtualMachine" => Some(EntityKind::VirtualMachine),
            _ => None,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An inventory entity: reference plus display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    pub moref: ManagedObjectReference,
    pub kind: EntityKind,
    /// Display name (not unique).
    pub name: String,
}

impl Entity {
    pub fn new(moref: ManagedObjectReference, kind: EntityKind, name: impl Into<String>) -> Self {
        Self {
            moref,
            kind,
            name: name.into(),
        }
    }
}

/// `AboutInfo` subset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AboutInfo {
    pub full_name: String,
    pub api_version: String,
}

/// The service content references the tools need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceContent {
    pub root_folder: ManagedObjectReference,
    pub property_collector: ManagedObjectReference,
    pub view_manager: ManagedObjectReference,
    pub session_manager: ManagedObjectReference,
    pub about: AboutInfo,
}

impl ServiceContent {
    const METHOD: &'static str = "RetrieveServiceContent";

    /// Read from a `RetrieveServiceContentResponse` element.
    pub fn from_response(response: &Element) -> Result<Self> {
        let content = response
            .child("returnval")
            .ok_or_else(|| Error::malformed(Self::METHOD, "missing returnval"))?;

        let moref = |name: &str| -> Result<ManagedObjectReference> {
            let element = content
                .child(name)
                .ok_or_else(|| Error::malformed(Self::METHOD, format!("missing {name}")))?;
            ManagedObjectReference::from_element(element, Self::METHOD)
        };

        let about = content
            .child("about")
            .map(|about| AboutInfo {
                full_name: about.child_text("fullName").unwrap_or_default().to_string(),
                api_version: about.child_text("apiVersion").unwrap_or_default().to_string(),
            })
            .unwrap_or_default();

        Ok(Self {
            root_folder: moref("rootFolder")?,
            property_collector: moref("propertyCollector")?,
            view_manager: moref("viewManager")?,
            session_manager: moref("sessionManager")?,
            about,
        })
    }
}

/// Fault recorded in `TaskInfo.error`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFault {
    /// Fault type, e.g. `InsufficientDisk`.
    pub fault: String,
    /// Localized message from the server.
    pub message: String,
}

impl TaskFault {
    pub fn new(fault: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            fault: fault.into(),
            message: message.into(),
        }
    }
}

/// Changes to a single task reported by one update round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskUpdate {
    pub task: ManagedObjectReference,
    /// New `info.state`, if it changed.
    pub state: Option<TaskState>,
    /// New `info.error`, if it was set.
    pub fault: Option<TaskFault>,
}

/// Result of one `WaitForUpdatesEx` round.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateSet {
    /// Version to pass to the next round.
    pub version: String,
    pub updates: Vec<TaskUpdate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moref_to_xml_escapes() {
        let moref = ManagedObjectReference::new("ContainerView", "session[a&b]view-1");
        assert_eq!(
            moref.to_xml("_this"),
            r#"<_this type="ContainerView">session[a&amp;b]view-1</_this>"#
        );
    }

    #[test]
    fn test_moref_from_element() {
        let element = Element::parse(r#"<returnval type="Task">task-9</returnval>"#).unwrap();
        let moref = ManagedObjectReference::from_element(&element, "CreateSnapshot_Task").unwrap();
        assert_eq!(moref, ManagedObjectReference::new("Task", "task-9"));
        assert_eq!(moref.to_string(), "Task:task-9");

        let untyped = Element::parse("<returnval>task-9</returnval>").unwrap();
        assert!(ManagedObjectReference::from_element(&untyped, "CreateSnapshot_Task").is_err());
    }

    #[test]
    fn test_entity_kind_round_trip() {
        for kind in [EntityKind::HostSystem, EntityKind::VirtualMachine] {
            assert_eq!(EntityKind::from_type(kind.as_str()), Some(kind));
        }
        assert_eq!(EntityKind::from_type("Datastore"), None);
    }

    #[test]
    fn test_service_content_from_response() {
        let response = Element::parse(
            r#"<RetrieveServiceContentResponse><returnval>
                <rootFolder type="Folder">group-d1</rootFolder>
                <propertyCollector type="PropertyCollector">propertyCollector</propertyCollector>
                <viewManager type="ViewManager">ViewManager</viewManager>
                <about><fullName>VMware vCenter Server 7.0.3</fullName><apiVersion>7.0.3.0</apiVersion></about>
                <sessionManager type="SessionManager">SessionManager</sessionManager>
            </returnval></RetrieveServiceContentResponse>"#,
        )
        .unwrap();

        let content = ServiceContent::from_response(&response).unwrap();
        assert_eq!(content.root_folder, ManagedObjectReference::new("Folder", "group-d1"));
        assert_eq!(content.view_manager.value, "ViewManager");
        assert_eq!(content.about.full_name, "VMware vCenter Server 7.0.3");
        assert_eq!(content.about.api_version, "7.0.3.0");
    }

    #[test]
    fn test_service_content_missing_view_manager() {
        let response = Element::parse(
            r#"<RetrieveServiceContentResponse><returnval>
                <rootFolder type="Folder">ha-folder-root</rootFolder>
            </returnval></RetrieveServiceContentResponse>"#,
        )
        .unwrap();
        assert!(ServiceContent::from_response(&response).is_err());
    }
}
