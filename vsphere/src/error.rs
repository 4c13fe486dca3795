use core::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::vim::EntityKind;

/// vim25 `TaskInfoState` values for asynchronous operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    /// Task is queued and has not started.
    Queued,
    /// Task is running.
    Running,
    /// Task completed successfully.
    Success,
    /// Task failed; the fault is in `info.error`.
    Error,
}

impl TaskState {
    /// Wire representation of the state.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Queued => "queued",
            TaskState::Running => "running",
            TaskState::Success => "success",
            TaskState::Error => "error",
        }
    }

    /// Check if the task has reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Success | TaskState::Error)
    }

    /// Check if the task completed successfully.
    pub fn is_success(&self) -> bool {
        *self == TaskState::Success
    }

    /// Check if the task failed.
    pub fn is_failed(&self) -> bool {
        *self == TaskState::Error
    }
}

impl FromStr for TaskState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "queued" => Ok(TaskState::Queued),
            "running" => Ok(TaskState::Running),
            "success" => Ok(TaskState::Success),
            "error" => Ok(TaskState::Error),
            other => Err(Error::malformed(
                "WaitForUpdatesEx",
                format!("unknown task state '{other}'"),
            )),
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// vSphere operation errors with typed context.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The endpoint could not be reached at all.
    #[error("Unable to connect to host with supplied info ({endpoint}): {source}")]
    Connection {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// Login was rejected by the session manager.
    #[error("Authentication failed for user '{username}' on '{host}': {message}")]
    AuthenticationFailed {
        host: String,
        username: String,
        message: String,
    },

    /// HTTP transport failure after the session was established.
    #[error("HTTP request for {method} failed: {source}")]
    Transport {
        method: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// Non-success HTTP status without a SOAP fault body.
    #[error("{method} returned HTTP {status}")]
    HttpStatus { method: &'static str, status: u16 },

    /// The server answered with a SOAP fault.
    #[error("{method} failed with {fault}: {message}")]
    Fault {
        method: &'static str,
        fault: String,
        message: String,
    },

    /// The response could not be interpreted.
    #[error("Unexpected response to {method}: {message}")]
    MalformedResponse {
        method: &'static str,
        message: String,
    },

    /// The response was not well-formed XML.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// No entity of the requested kind carries the requested name.
    #[error("Unable to locate {kind} '{name}'")]
    NotFound { kind: EntityKind, name: String },

    /// A remote task reached the error state.
    #[error("Task {task} failed with {fault}: {message}")]
    TaskFailed {
        task: String,
        fault: String,
        message: String,
    },

    /// Waiting for tasks exceeded the configured timeout.
    #[error("Task {task} did not complete within {timeout:?} (last state {last_state})")]
    TaskTimeout {
        task: String,
        timeout: Duration,
        last_state: TaskState,
    },

    /// Settings validation failed.
    #[error("Validation failed for '{field}': {message}")]
    Validation {
        field: &'static str,
        message: String,
    },
}

impl Error {
    /// Create a malformed response error.
    pub fn malformed(method: &'static str, message: impl Into<String>) -> Self {
        Error::MalformedResponse {
            method,
            message: message.into(),
        }
    }

    /// Create a not-found error.
    pub fn not_found(kind: EntityKind, name: impl Into<String>) -> Self {
        Error::NotFound {
            kind,
            name: name.into(),
        }
    }

    /// Create a task failed error.
    pub fn task_failed(
        task: impl Into<String>,
        fault: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Error::TaskFailed {
            task: task.into(),
            fault: fault.into(),
            message: message.into(),
        }
    }

    /// Check if this is a missing-entity error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// Check if this error came from a remote task.
    pub fn is_task_failure(&self) -> bool {
        matches!(self, Error::TaskFailed { .. } | Error::TaskTimeout { .. })
    }
}

/// Result type for vSphere operations.
pub type Result<T> = core::result::Result<T, Error>;
