// src/config/validate.rs

use std::collections::BTreeMap;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::duration::parse_duration;
use crate::config::model::{
    PlanFile, PlanTask, PlannedCancel, RawPlanFile, SchedulerConfig,
};
use crate::errors::{OpqueueError, Result};

impl TryFrom<RawPlanFile> for PlanFile {
    type Error = OpqueueError;

    fn try_from(raw: RawPlanFile) -> std::result::Result<Self, Self::Error> {
        ensure_has_tasks(&raw)?;
        validate_scheduler_config(&raw.scheduler)?;
        validate_task_dependencies(&raw)?;
        let order = submission_order(&raw)?;
        let tasks = resolve_tasks(&raw)?;
        let cancels = resolve_cancels(&raw)?;

        Ok(PlanFile::new_unchecked(raw.scheduler, tasks, cancels, order))
    }
}

/// Checks that apply to every scheduler, whether or not it came from a file.
pub fn validate_scheduler_config(cfg: &SchedulerConfig) -> Result<()> {
    if cfg.workers == 0 {
        return Err(OpqueueError::ConfigError(
            "[scheduler].workers must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn ensure_has_tasks(raw: &RawPlanFile) -> Result<()> {
    if raw.task.is_empty() {
        return Err(OpqueueError::ConfigError(
            "plan must contain at least one [task.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_task_dependencies(raw: &RawPlanFile) -> Result<()> {
    for (name, task) in raw.task.iter() {
        for dep in task.after.iter() {
            if dep == name {
                return Err(OpqueueError::ConfigError(format!(
                    "task '{name}' cannot depend on itself in `after`"
                )));
            }
            if !raw.task.contains_key(dep) {
                return Err(OpqueueError::ConfigError(format!(
                    "task '{name}' has unknown dependency '{dep}' in `after`"
                )));
            }
        }
    }
    Ok(())
}

/// Topological order of the plan, dependencies first.
///
/// Edge direction is `dep -> task`, the same as the runtime graph.
fn submission_order(raw: &RawPlanFile) -> Result<Vec<String>> {
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in raw.task.keys() {
        graph.add_node(name.as_str());
    }
    for (name, task) in raw.task.iter() {
        for dep in task.after.iter() {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(order) => Ok(order.into_iter().map(str::to_string).collect()),
        Err(cycle) => Err(OpqueueError::ConfigError(format!(
            "cycle detected in plan involving task '{}'",
            cycle.node_id()
        ))),
    }
}

fn resolve_tasks(raw: &RawPlanFile) -> Result<BTreeMap<String, PlanTask>> {
    raw.task
        .iter()
        .map(|(name, task)| {
            let duration = parse_duration(&task.duration).map_err(|e| {
                OpqueueError::ConfigError(format!("task '{name}': invalid duration: {e}"))
            })?;
            let planned = PlanTask {
                after: task.after.clone(),
                priority: task.priority.unwrap_or(raw.scheduler.default_priority),
                duration,
                fail: task.fail.clone(),
            };
            Ok((name.clone(), planned))
        })
        .collect()
}

fn resolve_cancels(raw: &RawPlanFile) -> Result<Vec<PlannedCancel>> {
    raw.cancel
        .iter()
        .map(|entry| {
            if !raw.task.contains_key(&entry.task) {
                return Err(OpqueueError::ConfigError(format!(
                    "[[cancel]] names unknown task '{}'",
                    entry.task
                )));
            }
            let at = parse_duration(&entry.at).map_err(|e| {
                OpqueueError::ConfigError(format!(
                    "[[cancel]] for '{}': invalid `at`: {e}",
                    entry.task
                ))
            })?;
            Ok(PlannedCancel {
                task: entry.task.clone(),
                at,
            })
        })
        .collect()
}
