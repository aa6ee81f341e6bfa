// src/config/model.rs

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::types::Priority;

/// Scheduler settings, the `[scheduler]` section of a plan file.
///
/// ```toml
/// [scheduler]
/// name = "import"
/// workers = 4
/// default_priority = "utility"
/// ```
///
/// Every field is optional.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchedulerConfig {
    /// Name used in log output.
    pub name: String,

    /// Fixed size of the worker pool (must be >= 1).
    ///
    /// Defaults to the machine's available parallelism.
    pub workers: usize,

    /// Priority given to plan tasks that do not set one.
    pub default_priority: Priority,
}

impl SchedulerConfig {
    /// Default settings with a specific pool size.
    pub fn with_workers(workers: usize) -> Self {
        Self {
            workers,
            ..Self::default()
        }
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            name: "opqueue".to_string(),
            workers: default_workers(),
            default_priority: Priority::default(),
        }
    }
}

/// Plan file as read from TOML, before validation.
///
/// ```toml
/// [scheduler]
/// workers = 2
///
/// [task.op1]
/// duration = "1s"
///
/// [task.op2]
/// after = ["op1"]
/// priority = "user_initiated"
///
/// [[cancel]]
/// task = "op2"
/// at = "500ms"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPlanFile {
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// All tasks from `[task.<name>]`, keyed by task name.
    #[serde(default)]
    pub task: BTreeMap<String, RawPlanTask>,

    /// Cancellations to issue while the plan runs.
    #[serde(default)]
    pub cancel: Vec<RawCancel>,
}

/// `[task.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawPlanTask {
    /// Tasks that must complete before this one runs.
    #[serde(default)]
    pub after: Vec<String>,

    /// Falls back to `scheduler.default_priority`.
    #[serde(default)]
    pub priority: Option<Priority>,

    /// How long the simulated work runs (e.g. `"250ms"`, `"2s"`).
    #[serde(default = "default_task_duration")]
    pub duration: String,

    /// If set, the work fails with this message once it has run.
    #[serde(default)]
    pub fail: Option<String>,
}

fn default_task_duration() -> String {
    "100ms".to_string()
}

impl Default for RawPlanTask {
    fn default() -> Self {
        Self {
            after: Vec::new(),
            priority: None,
            duration: default_task_duration(),
            fail: None,
        }
    }
}

/// `[[cancel]]` entry: cancel `task` this long after the plan starts.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawCancel {
    pub task: String,
    pub at: String,
}

/// Validated task of a plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanTask {
    pub after: Vec<String>,
    pub priority: Priority,
    pub duration: Duration,
    pub fail: Option<String>,
}

/// Validated cancellation of a plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedCancel {
    pub task: String,
    pub at: Duration,
}

/// A validated plan: known dependencies, no cycles, parsed durations.
///
/// Build one with `PlanFile::try_from(raw)` or
/// [`load_and_validate`](crate::config::load_and_validate).
#[derive(Debug, Clone)]
pub struct PlanFile {
    pub scheduler: SchedulerConfig,
    pub tasks: BTreeMap<String, PlanTask>,
    pub cancels: Vec<PlannedCancel>,
    /// Task names in dependency order (dependencies first).
    order: Vec<String>,
}

impl PlanFile {
    pub(crate) fn new_unchecked(
        scheduler: SchedulerConfig,
        tasks: BTreeMap<String, PlanTask>,
        cancels: Vec<PlannedCancel>,
        order: Vec<String>,
    ) -> Self {
        Self {
            scheduler,
            tasks,
            cancels,
            order,
        }
    }

    /// Task names in an order where every task follows its dependencies.
    pub fn submission_order(&self) -> &[String] {
        &self.order
    }
}
