#![allow(dead_code)]

use std::collections::BTreeMap;

use opqueue::Priority;
use opqueue::config::{PlanFile, RawPlanFile, RawPlanTask, SchedulerConfig};
use opqueue::config::model::RawCancel;

/// Builder for `PlanFile` to simplify test setup.
pub struct PlanFileBuilder {
    plan: RawPlanFile,
}

impl PlanFileBuilder {
    pub fn new() -> Self {
        Self {
            plan: RawPlanFile {
                scheduler: SchedulerConfig::with_workers(2),
                task: BTreeMap::new(),
                cancel: Vec::new(),
            },
        }
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.plan.scheduler.workers = workers;
        self
    }

    pub fn default_priority(mut self, priority: Priority) -> Self {
        self.plan.scheduler.default_priority = priority;
        self
    }

    pub fn with_task(mut self, name: &str, task: RawPlanTask) -> Self {
        self.plan.task.insert(name.to_string(), task);
        self
    }

    pub fn cancel_at(mut self, task: &str, at: &str) -> Self {
        self.plan.cancel.push(RawCancel {
            task: task.to_string(),
            at: at.to_string(),
        });
        self
    }

    /// The raw plan, for tests that exercise validation failures.
    pub fn build_raw(self) -> RawPlanFile {
        self.plan
    }

    pub fn build(self) -> PlanFile {
        PlanFile::try_from(self.plan).expect("Failed to build valid plan from builder")
    }
}

impl Default for PlanFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `RawPlanTask`.
pub struct PlanTaskBuilder {
    task: RawPlanTask,
}

impl PlanTaskBuilder {
    pub fn new(duration: &str) -> Self {
        Self {
            task: RawPlanTask {
                duration: duration.to_string(),
                ..RawPlanTask::default()
            },
        }
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.task.after.push(dep.to_string());
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.task.priority = Some(priority);
        self
    }

    pub fn fail(mut self, message: &str) -> Self {
        self.task.fail = Some(message.to_string());
        self
    }

    pub fn build(self) -> RawPlanTask {
        self.task
    }
}
