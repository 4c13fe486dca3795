//! Waiting on vim25 tasks.
//!
//! Mutating vSphere calls return a `Task` reference immediately. The waiter
//! subscribes to `info.state` / `info.error` through a property filter and
//! blocks on `WaitForUpdatesEx` long-polls until every task is terminal.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::error::{Error, Result, TaskState};
use crate::vim::types::{ManagedObjectReference, TaskFault};
use crate::vim::VimApi;

/// Default server-side wait per `WaitForUpdatesEx` round.
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(30);

/// Observed task state transition.
#[derive(Debug, Clone)]
pub struct TaskProgress {
    pub task: ManagedObjectReference,
    /// State after the transition.
    pub state: TaskState,
    /// Elapsed time since waiting started.
    pub elapsed: Duration,
}

impl TaskProgress {
    /// Check if the task reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Check if the task failed.
    pub fn is_failed(&self) -> bool {
        self.state.is_failed()
    }
}

/// Configuration for task waiting.
#[derive(Debug, Clone)]
pub struct TaskWaitConfig {
    /// Server-side wait per update round.
    pub max_wait: Duration,
    /// Overall limit; `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl Default for TaskWaitConfig {
    fn default() -> Self {
        Self {
            max_wait: DEFAULT_MAX_WAIT,
            timeout: None,
        }
    }
}

impl TaskWaitConfig {
    /// Create a configuration with an overall timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            ..Default::default()
        }
    }

    /// Set the server-side wait per round.
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }
}

/// Blocks until tasks reach a terminal state.
pub struct TaskWaiter<'a, A: VimApi + ?Sized> {
    api: &'a A,
    config: TaskWaitConfig,
}

impl<'a, A: VimApi + ?Sized> TaskWaiter<'a, A> {
    /// Create a new task waiter.
    pub fn new(api: &'a A) -> Self {
        Self {
            api,
            config: TaskWaitConfig::default(),
        }
    }

    /// Create a task waiter with custom configuration.
    pub fn with_config(api: &'a A, config: TaskWaitConfig) -> Self {
        Self { api, config }
    }

    /// Wait for a single task.
    pub fn wait_for_task(&self, task: &ManagedObjectReference) -> Result<()> {
        self.wait_for_tasks(std::slice::from_ref(task))
    }

    /// Wait for all tasks to succeed; fails on the first task error.
    pub fn wait_for_tasks(&self, tasks: &[ManagedObjectReference]) -> Result<()> {
        self.wait_for_tasks_with_callback(tasks, |_| {})
    }

    /// Wait for all tasks with a callback on every observed transition.
    pub fn wait_for_tasks_with_callback<F>(
        &self,
        tasks: &[ManagedObjectReference],
        callback: F,
    ) -> Result<()>
    where
        F: FnMut(&TaskProgress),
    {
        if tasks.is_empty() {
            return Ok(());
        }

        let filter = self.api.create_task_filter(tasks)?;
        let result = self.watch(tasks, callback);
        if let Err(e) = self.api.destroy_filter(&filter) {
            tracing::warn!(%filter, error = %e, "failed to destroy property filter");
        }
        result
    }

    fn watch<F>(&self, tasks: &[ManagedObjectReference], mut callback: F) -> Result<()>
    where
        F: FnMut(&TaskProgress),
    {
        let start = Instant::now();
        let mut states: HashMap<ManagedObjectReference, TaskState> = tasks
            .iter()
            .map(|task| (task.clone(), TaskState::Queued))
            .collect();
        let mut faults: HashMap<ManagedObjectReference, TaskFault> = HashMap::new();
        let mut version = String::new();

        loop {
            if let Some(timeout) = self.config.timeout {
                if start.elapsed() >= timeout {
                    let (task, last_state) = states
                        .iter()
                        .find(|(_, state)| !state.is_success())
                        .map(|(task, state)| (task.value.clone(), *state))
                        .unwrap_or_else(|| (String::new(), TaskState::Queued));
                    return Err(Error::TaskTimeout {
                        task,
                        timeout,
                        last_state,
                    });
                }
            }

            let Some(set) = self.api.wait_for_updates(&version, self.config.max_wait)? else {
                tracing::trace!("update round ended without changes");
                continue;
            };
            version = set.version;

            for update in set.updates {
                let Some(current) = states.get_mut(&update.task) else {
                    continue;
                };
                if let Some(fault) = update.fault {
                    faults.insert(update.task.clone(), fault);
                }
                let Some(state) = update.state else {
                    continue;
                };
                *current = state;

                let progress = TaskProgress {
                    task: update.task,
                    state,
                    elapsed: start.elapsed(),
                };
                callback(&progress);

                if progress.is_failed() {
                    let fault = faults.remove(&progress.task).unwrap_or_else(|| {
                        TaskFault::new("MethodFault", "task failed without a reported fault")
                    });
                    return Err(Error::task_failed(
                        progress.task.value,
                        fault.fault,
                        fault.message,
                    ));
                }
            }

            if states.values().all(TaskState::is_success) {
                return Ok(());
            }
        }
    }
}
