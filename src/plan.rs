// src/plan.rs

//! Drive a validated [`PlanFile`] through a [`Scheduler`].

use std::collections::BTreeMap;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::PlanFile;
use crate::dag::TaskSpec;
use crate::engine::Scheduler;
use crate::errors::{OpqueueError, Result};
use crate::exec::SimulatedWork;
use crate::observe::{Interest, SubscriptionHandle};
use crate::types::{StateCounts, TaskId, TaskState};

/// Final state of every plan task after a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanReport {
    pub states: BTreeMap<String, TaskState>,
    /// Tasks left `Pending` behind a failed dependency.
    pub stalled: Vec<String>,
    pub counts: StateCounts,
}

impl PlanReport {
    pub fn state_of(&self, name: &str) -> Option<TaskState> {
        self.states.get(name).copied()
    }
}

/// Submit every plan task in dependency order and return name -> id.
pub fn submit_plan(scheduler: &Scheduler, plan: &PlanFile) -> Result<BTreeMap<String, TaskId>> {
    let mut ids = BTreeMap::new();

    for name in plan.submission_order() {
        let Some(task) = plan.tasks.get(name) else {
            continue;
        };

        let deps = task
            .after
            .iter()
            .map(|dep| {
                ids.get(dep).copied().ok_or_else(|| {
                    OpqueueError::ConfigError(format!(
                        "task '{name}' was ordered before its dependency '{dep}'"
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let work = match &task.fail {
            Some(message) => SimulatedWork::failing(task.duration, message.clone()),
            None => SimulatedWork::new(task.duration),
        };

        let spec = TaskSpec::new(work.into_work())
            .priority(task.priority)
            .after_all(deps)
            .label(name.clone());

        let id = scheduler.submit_task(spec)?;
        info!(task = %id, name = %name, priority = ?task.priority, "submitted plan task");
        ids.insert(name.clone(), id);
    }

    Ok(ids)
}

/// Log every transition at `info`.
pub fn log_transitions(scheduler: &Scheduler) -> SubscriptionHandle {
    scheduler.subscribe(Interest::All, |event| {
        let name = event.label.as_deref().unwrap_or("-");
        info!(task = %event.task, name, state = %event.state, "task transition");
    })
}

/// Spawn one timer per `[[cancel]]` entry.
pub fn schedule_cancels(
    scheduler: &Scheduler,
    plan: &PlanFile,
    ids: &BTreeMap<String, TaskId>,
) -> Vec<JoinHandle<()>> {
    plan.cancels
        .iter()
        .filter_map(|entry| {
            let Some(&id) = ids.get(&entry.task) else {
                warn!(name = %entry.task, "cancel names a task that was not submitted");
                return None;
            };
            let scheduler = scheduler.clone();
            let at = entry.at;
            let name = entry.task.clone();
            Some(tokio::spawn(async move {
                tokio::time::sleep(at).await;
                info!(task = %id, name = %name, after = ?at, "issuing planned cancel");
                scheduler.cancel(id);
            }))
        })
        .collect()
}

/// Run a plan to completion on an already started scheduler, then shut it
/// down.
pub async fn run_plan(scheduler: &Scheduler, plan: &PlanFile) -> Result<PlanReport> {
    let ids = submit_plan(scheduler, plan)?;
    let timers = schedule_cancels(scheduler, plan, &ids);

    scheduler.wait_idle().await;
    for timer in &timers {
        timer.abort();
    }
    scheduler.shutdown(true).await;

    Ok(collect_report(scheduler, &ids))
}

pub fn collect_report(scheduler: &Scheduler, ids: &BTreeMap<String, TaskId>) -> PlanReport {
    let states = ids
        .iter()
        .filter_map(|(name, id)| scheduler.status(*id).map(|state| (name.clone(), state)))
        .collect();

    let stalled_ids = scheduler.stalled();
    let stalled = ids
        .iter()
        .filter(|(_, id)| stalled_ids.contains(id))
        .map(|(name, _)| name.clone())
        .collect();

    PlanReport {
        states,
        stalled,
        counts: scheduler.counts(),
    }
}
