//! Property collector request rendering and response parsing.

use std::fmt::Write as _;

use crate::error::{Error, Result, TaskState};
use crate::vim::types::{ManagedObjectReference, TaskFault, TaskUpdate, UpdateSet};
use crate::vim::xml::{escape, Element};

/// Task properties watched while waiting.
pub(crate) const TASK_STATE_PATH: &str = "info.state";
pub(crate) const TASK_ERROR_PATH: &str = "info.error";

/// Which properties to fetch for objects of one type.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PropertySpec<'a> {
    pub kind: &'a str,
    pub paths: &'a [&'a str],
}

impl PropertySpec<'_> {
    fn render(&self, out: &mut String) {
        let _ = write!(out, "<propSet><type>{}</type>", escape(self.kind));
        for path in self.paths {
            let _ = write!(out, "<pathSet>{}</pathSet>", escape(path));
        }
        out.push_str("</propSet>");
    }
}

/// Render a `PropertyFilterSpec` body (without the enclosing tag).
pub(crate) fn render_filter_spec(
    props: &[PropertySpec<'_>],
    objects: &[ManagedObjectReference],
) -> String {
    let mut out = String::new();
    for prop in props {
        prop.render(&mut out);
    }
    for obj in objects {
        out.push_str("<objectSet>");
        out.push_str(&obj.to_xml("obj"));
        out.push_str("<skip>false</skip></objectSet>");
    }
    out
}

/// One object returned by `RetrievePropertiesEx`.
#[derive(Debug, Clone)]
pub(crate) struct ObjectContent {
    pub obj: ManagedObjectReference,
    pub props: Vec<(String, Element)>,
}

impl ObjectContent {
    /// Value element of a property, if it was returned.
    pub fn prop(&self, name: &str) -> Option<&Element> {
        self.props
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, val)| val)
    }
}

/// A page of `RetrievePropertiesEx` results.
#[derive(Debug, Default)]
pub(crate) struct RetrieveResult {
    pub objects: Vec<ObjectContent>,
    /// Continuation token for `ContinueRetrievePropertiesEx`.
    pub token: Option<String>,
}

impl RetrieveResult {
    /// Parse a `RetrievePropertiesExResponse` (or continuation) element.
    ///
    /// A response without `returnval` means no objects matched.
    pub fn from_response(response: &Element, method: &'static str) -> Result<Self> {
        let Some(returnval) = response.child("returnval") else {
            return Ok(Self::default());
        };

        let mut objects = Vec::new();
        for object in returnval.children_named("objects") {
            let obj_el = object
                .child("obj")
                .ok_or_else(|| Error::malformed(method, "object content without obj"))?;
            let obj = ManagedObjectReference::from_element(obj_el, method)?;

            let mut props = Vec::new();
            for prop in object.children_named("propSet") {
                let name = prop
                    .child_text("name")
                    .ok_or_else(|| Error::malformed(method, "property without name"))?;
                if let Some(val) = prop.child("val") {
                    props.push((name.to_string(), val.clone()));
                }
            }
            objects.push(ObjectContent { obj, props });
        }

        let token = returnval
            .child_text("token")
            .filter(|t| !t.is_empty())
            .map(str::to_string);

        Ok(Self { objects, token })
    }
}

/// Read the managed object references out of an `ArrayOfManagedObjectReference` value.
pub(crate) fn moref_array(val: &Element, method: &'static str) -> Result<Vec<ManagedObjectReference>> {
    val.children_named("ManagedObjectReference")
        .map(|el| ManagedObjectReference::from_element(el, method))
        .collect()
}

/// Parse a `WaitForUpdatesExResponse`.
///
/// Returns `None` when the round ended without changes.
pub(crate) fn parse_update_set(response: &Element) -> Result<Option<UpdateSet>> {
    const METHOD: &str = "WaitForUpdatesEx";

    let Some(returnval) = response.child("returnval") else {
        return Ok(None);
    };

    let version = returnval
        .child_text("version")
        .ok_or_else(|| Error::malformed(METHOD, "update set without version"))?
        .to_string();

    let mut updates = Vec::new();
    for filter in returnval.children_named("filterSet") {
        for object in filter.children_named("objectSet") {
            let obj_el = object
                .child("obj")
                .ok_or_else(|| Error::malformed(METHOD, "object update without obj"))?;
            let task = ManagedObjectReference::from_element(obj_el, METHOD)?;

            let mut update = TaskUpdate {
                task,
                state: None,
                fault: None,
            };
            for change in object.children_named("changeSet") {
                let Some(val) = change.child("val") else {
                    continue;
                };
                match change.child_text("name") {
                    Some(TASK_STATE_PATH) => update.state = Some(val.text().parse::<TaskState>()?),
                    Some(TASK_ERROR_PATH) => update.fault = Some(parse_fault(val)),
                    _ => {}
                }
            }
            updates.push(update);
        }
    }

    Ok(Some(UpdateSet { version, updates }))
}

/// Read a `LocalizedMethodFault` value.
fn parse_fault(val: &Element) -> TaskFault {
    let fault = val.child("fault");
    let kind = fault
        .and_then(Element::xsi_type)
        .unwrap_or("MethodFault")
        .to_string();
    let message = val
        .child_text("localizedMessage")
        .filter(|m| !m.is_empty())
        .or_else(|| fault.and_then(|f| f.path(&["faultMessage", "message"])).map(Element::text))
        .unwrap_or("no message provided")
        .to_string();
    TaskFault::new(kind, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_filter_spec() {
        let rendered = render_filter_spec(
            &[PropertySpec {
                kind: "Task",
                paths: &[TASK_STATE_PATH, TASK_ERROR_PATH],
            }],
            &[ManagedObjectReference::new("Task", "task-1")],
        );
        assert_eq!(
            rendered,
            "<propSet><type>Task</type><pathSet>info.state</pathSet><pathSet>info.error</pathSet></propSet>\
             <objectSet><obj type=\"Task\">task-1</obj><skip>false</skip></objectSet>"
        );
    }

    #[test]
    fn test_retrieve_result_with_token() {
        let response = Element::parse(
            r#"<RetrievePropertiesExResponse><returnval>
                <token>1</token>
                <objects><obj type="HostSystem">host-10</obj>
                    <propSet><name>name</name><val>esx1</val></propSet></objects>
                <objects><obj type="HostSystem">host-12</obj></objects>
            </returnval></RetrievePropertiesExResponse>"#,
        )
        .unwrap();

        let result = RetrieveResult::from_response(&response, "RetrievePropertiesEx").unwrap();
        assert_eq!(result.token.as_deref(), Some("1"));
        assert_eq!(result.objects.len(), 2);
        assert_eq!(result.objects[0].prop("name").unwrap().text(), "esx1");
        assert!(result.objects[1].prop("name").is_none());
    }

    #[test]
    fn test_retrieve_result_empty() {
        let response = Element::parse("<RetrievePropertiesExResponse/>").unwrap();
        let result = RetrieveResult::from_response(&response, "RetrievePropertiesEx").unwrap();
        assert!(result.objects.is_empty());
        assert!(result.token.is_none());
    }

    #[test]
    fn test_parse_update_set_with_fault() {
        let response = Element::parse(
            r#"<WaitForUpdatesExResponse xmlns:xsi="x"><returnval>
                <version>2</version>
                <filterSet><filter type="PropertyFilter">session[1]52</filter>
                  <objectSet><kind>modify</kind><obj type="Task">task-7</obj>
                    <changeSet><name>info.error</name><op>assign</op>
                      <val xsi:type="LocalizedMethodFault">
                        <fault xsi:type="InsufficientDisk"/>
                        <localizedMessage>Insufficient disk space on datastore.</localizedMessage>
                      </val></changeSet>
                    <changeSet><name>info.state</name><op>assign</op>
                      <val xsi:type="TaskInfoState">error</val></changeSet>
                  </objectSet></filterSet>
            </returnval></WaitForUpdatesExResponse>"#,
        )
        .unwrap();

        let set = parse_update_set(&response).unwrap().unwrap();
        assert_eq!(set.version, "2");
        assert_eq!(set.updates.len(), 1);
        let update = &set.updates[0];
        assert_eq!(update.task.value, "task-7");
        assert_eq!(update.state, Some(TaskState::Error));
        assert_eq!(
            update.fault,
            Some(TaskFault::new(
                "InsufficientDisk",
                "Insufficient disk space on datastore."
            ))
        );
    }

    #[test]
    fn test_parse_update_set_unset_error_is_ignored() {
        let response = Element::parse(
            r#"<WaitForUpdatesExResponse><returnval><version>1</version>
                <filterSet><objectSet><kind>enter</kind><obj type="Task">task-7</obj>
                  <changeSet><name>info.error</name><op>assign</op></changeSet>
                  <changeSet><name>info.state</name><op>assign</op><val>running</val></changeSet>
                </objectSet></filterSet>
            </returnval></WaitForUpdatesExResponse>"#,
        )
        .unwrap();

        let set = parse_update_set(&response).unwrap().unwrap();
        assert_eq!(set.updates[0].state, Some(TaskState::Running));
        assert_eq!(set.updates[0].fault, None);
    }

    #[test]
    fn test_parse_update_set_empty_round() {
        let response = Element::parse("<WaitForUpdatesExResponse/>").unwrap();
        assert_eq!(parse_update_set(&response).unwrap(), None);
    }
}
