mod common;
use crate::common::builders::{PlanFileBuilder, PlanTaskBuilder};
use crate::common::{EventRecorder, TestResult, init_tracing, with_timeout};

use opqueue::plan::{collect_report, run_plan, submit_plan};
use opqueue::{Interest, Scheduler, TaskState};

#[tokio::test]
async fn plan_runs_to_completion_with_failure_and_cancel() -> TestResult {
    init_tracing();
    let plan = PlanFileBuilder::new()
        .workers(2)
        .with_task("fetch", PlanTaskBuilder::new("20ms").build())
        .with_task("parse", PlanTaskBuilder::new("10ms").after("fetch").fail("bad input").build())
        .with_task("store", PlanTaskBuilder::new("10ms").after("parse").build())
        .with_task("slow", PlanTaskBuilder::new("10s").build())
        .cancel_at("slow", "30ms")
        .build();

    let scheduler = Scheduler::new(plan.scheduler.clone())?;
    let report = with_timeout(run_plan(&scheduler, &plan)).await?;

    assert_eq!(report.state_of("fetch"), Some(TaskState::Completed));
    assert_eq!(report.state_of("parse"), Some(TaskState::Failed));
    assert_eq!(report.state_of("store"), Some(TaskState::Pending));
    assert_eq!(report.state_of("slow"), Some(TaskState::Cancelled));
    assert_eq!(report.stalled, vec!["store".to_string()]);
    assert_eq!(report.counts.completed, 1);
    assert_eq!(report.counts.failed, 1);
    assert_eq!(report.counts.cancelled, 1);
    assert_eq!(report.counts.pending, 1);
    assert!(scheduler.is_shut_down());
    Ok(())
}

#[tokio::test]
async fn submitted_plan_tasks_carry_names_and_dependencies() -> TestResult {
    init_tracing();
    let plan = PlanFileBuilder::new()
        .workers(1)
        .with_task("a", PlanTaskBuilder::new("1ms").build())
        .with_task("b", PlanTaskBuilder::new("1ms").after("a").build())
        .build();

    let scheduler = Scheduler::new(plan.scheduler.clone())?;
    let recorder = EventRecorder::new();
    recorder.attach(&scheduler, Interest::All);

    let ids = submit_plan(&scheduler, &plan)?;
    let (a, b) = (ids["a"], ids["b"]);
    assert_eq!(scheduler.label(a).as_deref(), Some("a"));
    assert_eq!(scheduler.dependencies_of(b), vec![a]);

    with_timeout(scheduler.wait_idle()).await;
    recorder.wait_for(b, TaskState::Completed).await;
    let labels: Vec<_> = recorder
        .events()
        .into_iter()
        .filter(|e| e.state == TaskState::Completed)
        .filter_map(|e| e.label.map(|l| l.to_string()))
        .collect();
    assert_eq!(labels, vec!["a", "b"]);

    scheduler.shutdown(true).await;
    let report = collect_report(&scheduler, &ids);
    assert_eq!(report.state_of("b"), Some(TaskState::Completed));
    assert!(report.stalled.is_empty());
    Ok(())
}
