use std::collections::{HashMap, HashSet};

use proptest::prelude::*;

use opqueue::dag::TaskSpec;
use opqueue::engine::{CoreRuntime, NextTask};
use opqueue::{Priority, TaskError, TaskId, TaskState};

const PRIORITIES: [Priority; 5] = [
    Priority::Background,
    Priority::Utility,
    Priority::Default,
    Priority::UserInitiated,
    Priority::UserInteractive,
];

#[derive(Debug, Clone)]
struct PlannedTask {
    priority: Priority,
    /// Indices of earlier tasks; keeps the generated graph acyclic.
    deps: Vec<usize>,
    fails: bool,
}

fn plan_strategy(max_tasks: usize) -> impl Strategy<Value = Vec<PlannedTask>> {
    proptest::collection::vec(
        (
            0..PRIORITIES.len(),
            proptest::collection::vec(any::<usize>(), 0..3),
            proptest::bool::weighted(0.15),
        ),
        1..=max_tasks,
    )
    .prop_map(|raw| {
        raw.into_iter()
            .enumerate()
            .map(|(i, (p, deps, fails))| {
                let deps: HashSet<usize> = if i == 0 {
                    HashSet::new()
                } else {
                    deps.into_iter().map(|d| d % i).collect()
                };
                PlannedTask {
                    priority: PRIORITIES[p],
                    deps: deps.into_iter().collect(),
                    fails,
                }
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn single_worker_simulation_respects_scheduling_rules(
        plan in plan_strategy(12),
        cancels in proptest::collection::vec((0..40usize, any::<usize>()), 0..3),
    ) {
        let mut core = CoreRuntime::new(1);
        let mut ids: Vec<TaskId> = Vec::new();
        let mut fails: HashMap<TaskId, bool> = HashMap::new();

        for task in &plan {
            let deps: Vec<TaskId> = task.deps.iter().map(|&d| ids[d]).collect();
            let (id, _) = core
                .submit(TaskSpec::new(|_ctx| Ok(())).priority(task.priority).after_all(deps))
                .expect("submit succeeds");
            ids.push(id);
            fails.insert(id, task.fails);
        }

        let mut started: Vec<TaskId> = Vec::new();
        for step in 0.. {
            for (at, which) in &cancels {
                if *at == step {
                    core.cancel(ids[which % ids.len()]);
                }
            }

            let (next, _) = core.next_task();
            let task = match next {
                NextTask::Start(task) => task,
                NextTask::Wait | NextTask::Stop => break,
            };
            let graph = core.graph();

            // Every dependency finished successfully before the task started.
            for dep in graph.dependencies_of(task.id) {
                prop_assert_eq!(graph.status(dep), Some(TaskState::Completed));
            }
            // Nothing still ready outranks the task that was picked.
            for other in graph.task_ids() {
                if graph.status(other) == Some(TaskState::Ready) {
                    prop_assert!(graph.priority_of(other) <= Some(task.priority));
                }
            }

            started.push(task.id);
            let result = if fails[&task.id] {
                Err(TaskError::new("planned failure"))
            } else {
                Ok(())
            };
            core.finish(task.id, result);
        }

        let graph = core.graph();
        let counts = graph.counts();
        prop_assert_eq!(counts.ready, 0);
        prop_assert_eq!(counts.running, 0);
        prop_assert!(core.is_idle());
        prop_assert_eq!(counts.total(), ids.len());

        // Each task ran at most once.
        let unique: HashSet<TaskId> = started.iter().copied().collect();
        prop_assert_eq!(unique.len(), started.len());

        let stalled: HashSet<TaskId> = graph.stalled().into_iter().collect();
        for id in &ids {
            match graph.status(*id) {
                Some(TaskState::Completed) => {
                    for dep in graph.dependencies_of(*id) {
                        prop_assert_eq!(graph.status(dep), Some(TaskState::Completed));
                    }
                }
                // Anything left pending is waiting on a failure.
                Some(TaskState::Pending) => prop_assert!(stalled.contains(id)),
                Some(TaskState::Cancelled) | Some(TaskState::Failed) => {}
                other => prop_assert!(false, "unexpected final state {:?}", other),
            }
        }
    }

    #[test]
    fn cancellation_reaches_every_transitive_dependent(
        plan in plan_strategy(10),
        root in any::<usize>(),
    ) {
        let mut core = CoreRuntime::new(1);
        let mut ids: Vec<TaskId> = Vec::new();
        for task in &plan {
            let deps: Vec<TaskId> = task.deps.iter().map(|&d| ids[d]).collect();
            let (id, _) = core
                .submit(TaskSpec::new(|_ctx| Ok(())).priority(task.priority).after_all(deps))
                .expect("submit succeeds");
            ids.push(id);
        }

        let root = ids[root % ids.len()];
        core.cancel(root);
        let graph = core.graph();

        // Reachable set from root over dependency edges.
        let mut reachable = HashSet::from([root]);
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            for dependent in graph.dependents_of(id) {
                if reachable.insert(dependent) {
                    stack.push(dependent);
                }
            }
        }

        for id in &ids {
            let state = graph.status(*id);
            if reachable.contains(id) {
                prop_assert_eq!(state, Some(TaskState::Cancelled));
            } else {
                prop_assert_ne!(state, Some(TaskState::Cancelled));
            }
        }
        prop_assert_eq!(core.queue_len(), graph.counts().ready);
    }
}
