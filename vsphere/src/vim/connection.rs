use std::cell::Cell;
use std::collections::HashMap;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;

use crate::error::{Error, Result};
use crate::snapshot::SnapshotSettings;
use crate::vim::property::{
    moref_array, parse_update_set, render_filter_spec, PropertySpec, RetrieveResult,
    TASK_ERROR_PATH, TASK_STATE_PATH,
};
use crate::vim::types::{
    EntityKind, Entity, ManagedObjectReference, ServiceContent, UpdateSet,
};
use crate::vim::xml::{escape, Element};
use crate::vim::VimApi;

/// Default HTTPS port of the SDK endpoint.
pub const DEFAULT_PORT: u16 = 443;

/// Default HTTP request timeout. Must exceed the long-poll wait of `WaitForUpdatesEx`.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// vim25 version announced in `SOAPAction`.
pub const DEFAULT_API_VERSION: &str = "6.7";

const SOAP_ENVELOPE_START: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8"?>"#,
    r#"<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/""#,
    r#" xmlns:xsd="http://www.w3.org/2001/XMLSchema""#,
    r#" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">"#,
    "<soapenv:Body>"
);
const SOAP_ENVELOPE_END: &str = "</soapenv:Body></soapenv:Envelope>";

/// Credentials for the session manager.
#[derive(Clone)]
pub struct Credentials {
    /// User name, e.g. `administrator@vsphere.local`.
    pub username: String,
    password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

impl Credentials {
    /// Create new credentials.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub(crate) fn password_str(&self) -> &str {
        &self.password
    }
}

/// SDK endpoint configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// vCenter or ESXi host name.
    pub host: String,
    /// HTTPS port.
    pub port: u16,
    /// vim25 version for `SOAPAction`.
    pub api_version: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Verify the server certificate.
    pub verify_tls: bool,
    /// Full SDK URL overriding `https://host:port/sdk`.
    pub endpoint: Option<String>,
}

impl ConnectionConfig {
    /// Create a config for `host` with default settings.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout: DEFAULT_TIMEOUT,
            verify_tls: false,
            endpoint: None,
        }
    }

    /// Set port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set vim25 API version.
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// Set timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enable or disable certificate verification.
    pub fn with_verify_tls(mut self, verify: bool) -> Self {
        self.verify_tls = verify;
        self
    }

    /// Use an explicit SDK URL.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// URL requests are posted to.
    pub fn sdk_url(&self) -> String {
        if let Some(ref endpoint) = self.endpoint {
            return endpoint.clone();
        }
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("https://[{}]:{}/sdk", self.host, self.port)
        } else {
            format!("https://{}:{}/sdk", self.host, self.port)
        }
    }
}

/// Authenticated vim25 SOAP session.
///
/// The session is logged out when the value is dropped.
pub struct VimConnection {
    http: Client,
    url: String,
    config: ConnectionConfig,
    content: ServiceContent,
    active: Cell<bool>,
}

impl std::fmt::Debug for VimConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VimConnection")
            .field("url", &self.url)
            .field("active", &self.active.get())
            .finish_non_exhaustive()
    }
}

impl VimConnection {
    /// Connect to the SDK endpoint and log in.
    pub fn connect(config: ConnectionConfig, credentials: &Credentials) -> Result<Self> {
        let url = config.sdk_url();

        let http = Client::builder()
            .cookie_store(true)
            .danger_accept_invalid_certs(!config.verify_tls)
            .timeout(config.timeout)
            .build()
            .map_err(|source| Error::Connection {
                endpoint: url.clone(),
                source,
            })?;

        let body = ManagedObjectReference::new("ServiceInstance", "ServiceInstance").to_xml("_this");
        let response = send(&http, &url, &config.api_version, "RetrieveServiceContent", &body)
            .map_err(|e| match e {
                Error::Transport { source, .. } => Error::Connection {
                    endpoint: url.clone(),
                    source,
                },
                other => other,
            })?;
        let content = ServiceContent::from_response(&response)?;
        tracing::debug!(
            server = %content.about.full_name,
            api_version = %content.about.api_version,
            "retrieved service content"
        );

        let connection = Self {
            http,
            url,
            config,
            content,
            active: Cell::new(false),
        };
        connection.login(credentials)?;
        Ok(connection)
    }

    fn login(&self, credentials: &Credentials) -> Result<()> {
        let body = format!(
            "{}<userName>{}</userName><password>{}</password>",
            self.content.session_manager.to_xml("_this"),
            escape(&credentials.username),
            escape(credentials.password_str()),
        );

        match self.invoke("Login", &body) {
            Ok(_) => {
                self.active.set(true);
                tracing::info!(
                    host = %self.config.host,
                    user = %credentials.username,
                    "session established"
                );
                Ok(())
            }
            Err(Error::Fault { fault, message, .. }) if fault == "InvalidLogin" => {
                Err(Error::AuthenticationFailed {
                    host: self.config.host.clone(),
                    username: credentials.username.clone(),
                    message,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Terminate the session. Called automatically on drop.
    pub fn logout(&self) -> Result<()> {
        if !self.active.get() {
            return Ok(());
        }
        self.active.set(false);
        self.invoke("Logout", &self.content.session_manager.to_xml("_this"))?;
        tracing::debug!(host = %self.config.host, "session closed");
        Ok(())
    }

    /// Whether the session is still logged in.
    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    /// The service content retrieved at connect time.
    pub fn service_content(&self) -> &ServiceContent {
        &self.content
    }

    /// Get connection configuration.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Invoke a vim25 method and return its `<method>Response` element.
    pub fn invoke(&self, method: &'static str, body: &str) -> Result<Element> {
        send(&self.http, &self.url, &self.config.api_version, method, body)
    }

    /// `RetrievePropertiesEx`, following continuation tokens.
    pub(crate) fn retrieve_properties(
        &self,
        props: &[PropertySpec<'_>],
        objects: &[ManagedObjectReference],
    ) -> Result<Vec<crate::vim::property::ObjectContent>> {
        let pc = self.content.property_collector.to_xml("_this");
        let body = format!(
            "{pc}<specSet>{}</specSet><options></options>",
            render_filter_spec(props, objects)
        );

        let response = self.invoke("RetrievePropertiesEx", &body)?;
        let mut page = RetrieveResult::from_response(&response, "RetrievePropertiesEx")?;
        let mut objects = std::mem::take(&mut page.objects);

        while let Some(token) = page.token.take() {
            let body = format!("{pc}<token>{}</token>", escape(&token));
            let response = self.invoke("ContinueRetrievePropertiesEx", &body)?;
            page = RetrieveResult::from_response(&response, "ContinueRetrievePropertiesEx")?;
            objects.append(&mut page.objects);
        }

        Ok(objects)
    }
}

impl Drop for VimConnection {
    fn drop(&mut self) {
        if let Err(e) = self.logout() {
            tracing::warn!(host = %self.config.host, error = %e, "logout failed");
        }
    }
}

impl VimApi for VimConnection {
    fn root_folder(&self) -> &ManagedObjectReference {
        &self.content.root_folder
    }

    fn create_container_view(
        &self,
        container: &ManagedObjectReference,
        kinds: &[EntityKind],
        recursive: bool,
    ) -> Result<ManagedObjectReference> {
        const METHOD: &str = "CreateContainerView";

        let mut body = self.content.view_manager.to_xml("_this");
        body.push_str(&container.to_xml("container"));
        for kind in kinds {
            body.push_str(&format!("<type>{}</type>", kind.as_str()));
        }
        body.push_str(&format!("<recursive>{recursive}</recursive>"));

        let response = self.invoke(METHOD, &body)?;
        let returnval = response
            .child("returnval")
            .ok_or_else(|| Error::malformed(METHOD, "missing returnval"))?;
        ManagedObjectReference::from_element(returnval, METHOD)
    }

    fn view_entities(&self, view: &ManagedObjectReference) -> Result<Vec<Entity>> {
        const METHOD: &str = "RetrievePropertiesEx";

        let contents = self.retrieve_properties(
            &[PropertySpec {
                kind: &view.kind,
                paths: &["view"],
            }],
            std::slice::from_ref(view),
        )?;
        let members = match contents.first().and_then(|c| c.prop("view")) {
            Some(val) => moref_array(val, METHOD)?,
            None => Vec::new(),
        };
        if members.is_empty() {
            return Ok(Vec::new());
        }

        let mut kinds: Vec<&str> = Vec::new();
        for member in &members {
            if !kinds.contains(&member.kind.as_str()) {
                kinds.push(&member.kind);
            }
        }
        let specs: Vec<PropertySpec<'_>> = kinds
            .iter()
            .map(|kind| PropertySpec {
                kind,
                paths: &["name"],
            })
            .collect();

        let mut names: HashMap<ManagedObjectReference, String> = self
            .retrieve_properties(&specs, &members)?
            .into_iter()
            .filter_map(|c| {
                let name = c.prop("name")?.text().to_string();
                Some((c.obj, name))
            })
            .collect();

        let mut entities = Vec::with_capacity(members.len());
        for moref in members {
            let Some(kind) = EntityKind::from_type(&moref.kind) else {
                tracing::debug!(%moref, "skipping view member of unexpected type");
                continue;
            };
            match names.remove(&moref) {
                Some(name) => entities.push(Entity::new(moref, kind, name)),
                None => tracing::debug!(%moref, "view member has no name, skipping"),
            }
        }
        Ok(entities)
    }

    fn destroy_view(&self, view: &ManagedObjectReference) -> Result<()> {
        self.invoke("DestroyView", &view.to_xml("_this"))?;
        Ok(())
    }

    fn host_product_full_name(&self, host: &ManagedObjectReference) -> Result<String> {
        const PATH: &str = "summary.config.product.fullName";

        let contents = self.retrieve_properties(
            &[PropertySpec {
                kind: &host.kind,
                paths: &[PATH],
            }],
            std::slice::from_ref(host),
        )?;
        contents
            .first()
            .and_then(|c| c.prop(PATH))
            .map(|val| val.text().to_string())
            .ok_or_else(|| Error::malformed("RetrievePropertiesEx", format!("{host} has no {PATH}")))
    }

    fn create_snapshot_task(
        &self,
        vm: &ManagedObjectReference,
        settings: &SnapshotSettings,
    ) -> Result<ManagedObjectReference> {
        const METHOD: &str = "CreateSnapshot_Task";

        let mut body = vm.to_xml("_this");
        body.push_str(&format!("<name>{}</name>", escape(&settings.name)));
        if let Some(ref description) = settings.description {
            body.push_str(&format!("<description>{}</description>", escape(description)));
        }
        body.push_str(&format!(
            "<memory>{}</memory><quiesce>{}</quiesce>",
            settings.memory, settings.quiesce
        ));

        let response = self.invoke(METHOD, &body)?;
        let returnval = response
            .child("returnval")
            .ok_or_else(|| Error::malformed(METHOD, "missing returnval"))?;
        ManagedObjectReference::from_element(returnval, METHOD)
    }

    fn create_task_filter(&self, tasks: &[ManagedObjectReference]) -> Result<ManagedObjectReference> {
        const METHOD: &str = "CreateFilter";

        let spec = render_filter_spec(
            &[PropertySpec {
                kind: "Task",
                paths: &[TASK_STATE_PATH, TASK_ERROR_PATH],
            }],
            tasks,
        );
        let body = format!(
            "{}<spec>{spec}</spec><partialUpdates>false</partialUpdates>",
            self.content.property_collector.to_xml("_this")
        );

        let response = self.invoke(METHOD, &body)?;
        let returnval = response
            .child("returnval")
            .ok_or_else(|| Error::malformed(METHOD, "missing returnval"))?;
        ManagedObjectReference::from_element(returnval, METHOD)
    }

    fn wait_for_updates(&self, version: &str, max_wait: Duration) -> Result<Option<UpdateSet>> {
        let mut body = self.content.property_collector.to_xml("_this");
        if !version.is_empty() {
            body.push_str(&format!("<version>{}</version>", escape(version)));
        }
        body.push_str(&format!(
            "<options><maxWaitSeconds>{}</maxWaitSeconds></options>",
            max_wait.as_secs()
        ));

        let response = self.invoke("WaitForUpdatesEx", &body)?;
        parse_update_set(&response)
    }

    fn destroy_filter(&self, filter: &ManagedObjectReference) -> Result<()> {
        self.invoke("DestroyPropertyFilter", &filter.to_xml("_this"))?;
        Ok(())
    }
}

/// Wrap a method body in a SOAP envelope.
pub(crate) fn envelope(method: &str, body: &str) -> String {
    format!(r#"{SOAP_ENVELOPE_START}<{method} xmlns="urn:vim25">{body}</{method}>{SOAP_ENVELOPE_END}"#)
}

fn send(
    http: &Client,
    url: &str,
    api_version: &str,
    method: &'static str,
    body: &str,
) -> Result<Element> {
    tracing::debug!(method, "invoking");

    let response = http
        .post(url)
        .header(CONTENT_TYPE, "text/xml; charset=utf-8")
        .header("SOAPAction", format!("urn:vim25/{api_version}"))
        .body(envelope(method, body))
        .send()
        .map_err(|source| Error::Transport { method, source })?;

    let status = response.status();
    let text = response
        .text()
        .map_err(|source| Error::Transport { method, source })?;

    let parsed = Element::parse(&text);
    if !status.is_success() {
        // Faults arrive as HTTP 500 with a SOAP body
        return match parsed.ok().and_then(|root| fault_from_envelope(&root, method)) {
            Some(fault) => Err(fault),
            None => Err(Error::HttpStatus {
                method,
                status: status.as_u16(),
            }),
        };
    }

    let root = parsed?;
    if let Some(fault) = fault_from_envelope(&root, method) {
        return Err(fault);
    }
    response_element(root, method)
}

fn fault_from_envelope(root: &Element, method: &'static str) -> Option<Error> {
    let fault = root.path(&["Body", "Fault"])?;
    let message = fault.child_text("faultstring").unwrap_or_default().to_string();
    let kind = fault
        .child("detail")
        .and_then(|detail| detail.children.first())
        .map(|detail| match detail.xsi_type() {
            Some(kind) => kind.to_string(),
            None => detail
                .name
                .strip_suffix("Fault")
                .unwrap_or(&detail.name)
                .to_string(),
        })
        .unwrap_or_else(|| "SystemError".to_string());
    Some(Error::Fault {
        method,
        fault: kind,
        message,
    })
}

fn response_element(root: Element, method: &'static str) -> Result<Element> {
    let expected = format!("{method}Response");
    root.children
        .into_iter()
        .find(|c| c.name == "Body")
        .and_then(|body| body.children.into_iter().find(|c| c.name == expected))
        .ok_or_else(|| Error::malformed(method, format!("missing {expected}")))
}
