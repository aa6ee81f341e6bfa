mod common;
use crate::common::{TestResult, init_tracing};

use opqueue::dag::TaskSpec;
use opqueue::engine::{CoreRuntime, NextTask, Phase};
use opqueue::{OpqueueError, Priority, TaskId, TaskState};

fn spec(priority: Priority) -> TaskSpec {
    TaskSpec::new(|_ctx| Ok(())).priority(priority)
}

fn start_next(core: &mut CoreRuntime) -> Option<TaskId> {
    match core.next_task().0 {
        NextTask::Start(task) => Some(task.id),
        NextTask::Wait | NextTask::Stop => None,
    }
}

#[test]
fn dequeues_by_priority_then_promotion_order() -> TestResult {
    init_tracing();
    let mut core = CoreRuntime::new(1);

    let (low, _) = core.submit(spec(Priority::Background))?;
    let (mid1, _) = core.submit(spec(Priority::Default))?;
    let (high, _) = core.submit(spec(Priority::UserInteractive))?;
    let (mid2, _) = core.submit(spec(Priority::Default))?;
    assert_eq!(core.queue_len(), 4);

    let mut order = Vec::new();
    while let Some(id) = start_next(&mut core) {
        core.finish(id, Ok(()));
        order.push(id);
    }

    assert_eq!(order, vec![high, mid1, mid2, low]);
    assert!(core.is_idle());
    Ok(())
}

#[test]
fn promoted_dependent_competes_by_priority() -> TestResult {
    init_tracing();
    let mut core = CoreRuntime::new(1);

    let (blocker, _) = core.submit(spec(Priority::Default))?;
    let b = start_next(&mut core).expect("blocker starts");
    assert_eq!(b, blocker);

    let (l, _) = core.submit(spec(Priority::Utility))?;
    let (x, _) = core.submit(spec(Priority::Default))?;
    let (y, _) = core.submit(spec(Priority::UserInteractive).after(x))?;
    assert_eq!(core.graph().status(y), Some(TaskState::Pending));

    core.finish(blocker, Ok(()));
    let mut order = Vec::new();
    while let Some(id) = start_next(&mut core) {
        core.finish(id, Ok(()));
        order.push(id);
    }

    assert_eq!(order, vec![x, y, l]);
    Ok(())
}

#[test]
fn cancelled_queue_entries_are_never_started() -> TestResult {
    let mut core = CoreRuntime::new(1);
    let (a, _) = core.submit(spec(Priority::UserInteractive))?;
    let (b, _) = core.submit(spec(Priority::Default))?;

    core.cancel(a);
    assert_eq!(core.queue_len(), 1);
    assert_eq!(start_next(&mut core), Some(b));
    Ok(())
}

#[test]
fn running_count_tracks_starts_and_finishes() -> TestResult {
    let mut core = CoreRuntime::new(2);
    let (a, _) = core.submit(spec(Priority::Default))?;
    let (_b, _) = core.submit(spec(Priority::Default))?;

    assert_eq!(start_next(&mut core), Some(a));
    assert_eq!(core.running(), 1);
    assert!(!core.is_idle());

    core.finish(a, Ok(()));
    assert_eq!(core.running(), 0);
    assert_eq!(core.queue_len(), 1);
    Ok(())
}

#[test]
fn draining_shutdown_cancels_ready_and_later_promotions() -> TestResult {
    init_tracing();
    let mut core = CoreRuntime::new(2);

    let (a, _) = core.submit(spec(Priority::Default))?;
    let (b, _) = core.submit(spec(Priority::Default).after(a))?;
    let (c, _) = core.submit(spec(Priority::Default))?;
    let (d, _) = core.submit(spec(Priority::Default).after(c))?;
    assert_eq!(start_next(&mut core), Some(a));

    let step = core.shutdown(true);
    assert_eq!(core.phase(), Phase::Draining);
    let mut cancelled = step.newly_cancelled();
    cancelled.sort();
    assert_eq!(cancelled, vec![c, d]);
    assert_eq!(core.queue_len(), 0);

    // a keeps running and completes; b is promoted but cancelled right away.
    let step = core.finish(a, Ok(()));
    assert_eq!(core.graph().status(a), Some(TaskState::Completed));
    assert_eq!(core.graph().status(b), Some(TaskState::Cancelled));
    assert_eq!(step.newly_cancelled(), vec![b]);

    assert!(matches!(core.next_task().0, NextTask::Stop));
    assert!(matches!(
        core.submit(spec(Priority::Default)),
        Err(OpqueueError::ShutDown)
    ));
    Ok(())
}

#[test]
fn finishing_shutdown_runs_remaining_work() -> TestResult {
    init_tracing();
    let mut core = CoreRuntime::new(1);

    let (a, _) = core.submit(spec(Priority::Default))?;
    let (b, _) = core.submit(spec(Priority::Default).after(a))?;
    assert_eq!(start_next(&mut core), Some(a));

    assert!(core.shutdown(false).is_empty());
    assert_eq!(core.phase(), Phase::Finishing);
    assert!(matches!(
        core.submit(spec(Priority::Default)),
        Err(OpqueueError::ShutDown)
    ));

    // a is still running, so an idle worker must wait rather than stop.
    assert!(matches!(core.next_task().0, NextTask::Wait));

    core.finish(a, Ok(()));
    assert_eq!(start_next(&mut core), Some(b));
    core.finish(b, Ok(()));
    assert!(matches!(core.next_task().0, NextTask::Stop));
    Ok(())
}

#[test]
fn draining_upgrades_an_earlier_finishing_shutdown() -> TestResult {
    let mut core = CoreRuntime::new(1);
    let (a, _) = core.submit(spec(Priority::Default))?;

    core.shutdown(false);
    let step = core.shutdown(true);
    assert_eq!(core.phase(), Phase::Draining);
    assert_eq!(step.newly_cancelled(), vec![a]);

    assert!(core.shutdown(true).is_empty());
    assert!(core.shutdown(false).is_empty());
    assert_eq!(core.phase(), Phase::Draining);
    Ok(())
}

#[test]
fn late_dependency_removes_task_from_queue() -> TestResult {
    let mut core = CoreRuntime::new(1);
    let (a, _) = core.submit(spec(Priority::Default))?;
    let (b, _) = core.submit(spec(Priority::UserInteractive))?;
    assert_eq!(core.queue_len(), 2);

    core.add_dependency(b, a)?;
    assert_eq!(core.queue_len(), 1);
    assert_eq!(start_next(&mut core), Some(a));
    core.finish(a, Ok(()));
    assert_eq!(start_next(&mut core), Some(b));
    Ok(())
}

#[test]
fn worker_exit_is_counted() {
    let mut core = CoreRuntime::new(3);
    assert_eq!(core.live_workers(), 3);
    core.worker_exited();
    core.worker_exited();
    assert_eq!(core.live_workers(), 1);
}
