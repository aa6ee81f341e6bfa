mod common;
use crate::common::builders::{PlanFileBuilder, PlanTaskBuilder};
use crate::common::{TestResult, init_tracing};

use std::io::Write;
use std::time::Duration;

use opqueue::config::{
    PlanFile, default_config_path, load_and_validate, load_from_path, parse_duration,
    parse_plan_str,
};
use opqueue::{OpqueueError, Priority};
use tempfile::NamedTempFile;

fn write_plan(contents: &str) -> Result<NamedTempFile, std::io::Error> {
    let mut file = NamedTempFile::new()?;
    file.write_all(contents.as_bytes())?;
    Ok(file)
}

fn config_error_message(err: OpqueueError) -> String {
    match err {
        OpqueueError::ConfigError(msg) => msg,
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn loads_a_full_plan_from_disk() -> TestResult {
    init_tracing();
    let file = write_plan(
        r#"
[scheduler]
name = "import"
workers = 3
default_priority = "utility"

[task.fetch]
duration = "250ms"

[task.parse]
after = ["fetch"]
priority = "user_initiated"
duration = "1s"

[task.store]
after = ["parse"]
fail = "disk full"

[[cancel]]
task = "store"
at = "2m"
"#,
    )?;

    let plan = load_and_validate(file.path())?;

    assert_eq!(plan.scheduler.name, "import");
    assert_eq!(plan.scheduler.workers, 3);
    assert_eq!(plan.tasks.len(), 3);

    let fetch = &plan.tasks["fetch"];
    assert_eq!(fetch.priority, Priority::Utility);
    assert_eq!(fetch.duration, Duration::from_millis(250));

    let parse = &plan.tasks["parse"];
    assert_eq!(parse.priority, Priority::UserInitiated);
    assert_eq!(parse.after, vec!["fetch".to_string()]);

    let store = &plan.tasks["store"];
    assert_eq!(store.duration, Duration::from_millis(100));
    assert_eq!(store.fail.as_deref(), Some("disk full"));

    assert_eq!(plan.cancels.len(), 1);
    assert_eq!(plan.cancels[0].task, "store");
    assert_eq!(plan.cancels[0].at, Duration::from_secs(120));

    assert_eq!(plan.submission_order(), ["fetch", "parse", "store"]);
    Ok(())
}

#[test]
fn scheduler_section_is_optional() -> TestResult {
    let plan = parse_plan_str(
        r#"
[task.only]
duration = "5ms"
"#,
    )?;
    assert_eq!(plan.scheduler.name, "opqueue");
    assert!(plan.scheduler.workers >= 1);
    assert_eq!(plan.tasks["only"].priority, Priority::Default);
    Ok(())
}

#[test]
fn plan_priorities_are_snake_case() -> TestResult {
    let plan = parse_plan_str(
        r#"
[task.a]
priority = "userInteractive"
"#,
    );
    // `FromStr` is more lenient than the TOML names.
    assert!(matches!(plan, Err(OpqueueError::TomlError(_))));
    assert_eq!("userInteractive".parse::<Priority>()?, Priority::UserInteractive);
    assert_eq!("user_interactive".parse::<Priority>()?, Priority::UserInteractive);
    Ok(())
}

#[test]
fn raw_load_does_not_validate() -> TestResult {
    let file = write_plan(
        r#"
[task.a]
after = ["ghost"]
"#,
    )?;

    let raw = load_from_path(file.path())?;
    assert_eq!(raw.task["a"].after, vec!["ghost".to_string()]);

    let err = PlanFile::try_from(raw).unwrap_err();
    assert!(config_error_message(err).contains("unknown dependency 'ghost'"));
    Ok(())
}

#[test]
fn missing_file_is_an_io_error() {
    let err = load_and_validate("/definitely/not/here/Opqueue.toml").unwrap_err();
    assert!(matches!(err, OpqueueError::IoError(_)));
}

#[test]
fn invalid_toml_is_a_toml_error() -> TestResult {
    let file = write_plan("[task.a\nduration = ")?;
    let err = load_and_validate(file.path()).unwrap_err();
    assert!(matches!(err, OpqueueError::TomlError(_)));
    Ok(())
}

#[test]
fn unknown_task_keys_are_rejected() {
    let err = parse_plan_str(
        r#"
[task.a]
cmd = "echo hi"
"#,
    )
    .unwrap_err();
    assert!(matches!(err, OpqueueError::TomlError(_)));
}

#[test]
fn empty_plan_is_rejected() {
    let err = parse_plan_str("[scheduler]\nworkers = 1\n").unwrap_err();
    assert!(config_error_message(err).contains("at least one"));
}

#[test]
fn zero_workers_is_rejected() {
    let raw = PlanFileBuilder::new()
        .workers(0)
        .with_task("a", PlanTaskBuilder::new("1ms").build())
        .build_raw();
    let err = PlanFile::try_from(raw).unwrap_err();
    assert!(config_error_message(err).contains("workers"));
}

#[test]
fn self_dependency_is_rejected() {
    let raw = PlanFileBuilder::new()
        .with_task("a", PlanTaskBuilder::new("1ms").after("a").build())
        .build_raw();
    let err = PlanFile::try_from(raw).unwrap_err();
    assert!(config_error_message(err).contains("cannot depend on itself"));
}

#[test]
fn cycles_are_rejected() {
    let raw = PlanFileBuilder::new()
        .with_task("a", PlanTaskBuilder::new("1ms").after("c").build())
        .with_task("b", PlanTaskBuilder::new("1ms").after("a").build())
        .with_task("c", PlanTaskBuilder::new("1ms").after("b").build())
        .build_raw();
    let err = PlanFile::try_from(raw).unwrap_err();
    assert!(config_error_message(err).contains("cycle"));
}

#[test]
fn bad_durations_are_rejected() {
    let raw = PlanFileBuilder::new()
        .with_task("a", PlanTaskBuilder::new("ten seconds").build())
        .build_raw();
    let err = PlanFile::try_from(raw).unwrap_err();
    assert!(config_error_message(err).contains("task 'a'"));

    let raw = PlanFileBuilder::new()
        .with_task("a", PlanTaskBuilder::new("999999999999999999h").build())
        .build_raw();
    let err = PlanFile::try_from(raw).unwrap_err();
    assert!(config_error_message(err).contains("too large"));

    let raw = PlanFileBuilder::new()
        .with_task("a", PlanTaskBuilder::new("1s").build())
        .cancel_at("a", "soon")
        .build_raw();
    let err = PlanFile::try_from(raw).unwrap_err();
    assert!(config_error_message(err).contains("invalid `at`"));
}

#[test]
fn cancel_must_name_a_known_task() {
    let raw = PlanFileBuilder::new()
        .with_task("a", PlanTaskBuilder::new("1s").build())
        .cancel_at("b", "10ms")
        .build_raw();
    let err = PlanFile::try_from(raw).unwrap_err();
    assert!(config_error_message(err).contains("unknown task 'b'"));
}

#[test]
fn submission_order_puts_dependencies_first() {
    let plan = PlanFileBuilder::new()
        .with_task("z_root", PlanTaskBuilder::new("1ms").build())
        .with_task("m", PlanTaskBuilder::new("1ms").after("z_root").build())
        .with_task("a_leaf", PlanTaskBuilder::new("1ms").after("m").build())
        .with_task("free", PlanTaskBuilder::new("1ms").build())
        .build();

    let order = plan.submission_order();
    let pos = |name: &str| order.iter().position(|n| n == name).expect("present");
    assert_eq!(order.len(), 4);
    assert!(pos("z_root") < pos("m"));
    assert!(pos("m") < pos("a_leaf"));
}

#[test]
fn default_priority_applies_to_unset_tasks() {
    let plan = PlanFileBuilder::new()
        .default_priority(Priority::Background)
        .with_task("a", PlanTaskBuilder::new("1ms").build())
        .with_task(
            "b",
            PlanTaskBuilder::new("1ms")
                .priority(Priority::UserInteractive)
                .build(),
        )
        .build();

    assert_eq!(plan.tasks["a"].priority, Priority::Background);
    assert_eq!(plan.tasks["b"].priority, Priority::UserInteractive);
}

#[test]
fn durations_parse_with_units() {
    assert_eq!(parse_duration("15ms"), Ok(Duration::from_millis(15)));
    assert_eq!(parse_duration(" 3s "), Ok(Duration::from_secs(3)));
    assert_eq!(parse_duration("2m"), Ok(Duration::from_secs(120)));
    assert_eq!(parse_duration("1h"), Ok(Duration::from_secs(3600)));
    assert_eq!(parse_duration("0ms"), Ok(Duration::ZERO));

    assert!(parse_duration("").is_err());
    assert!(parse_duration("10").is_err());
    assert!(parse_duration("s").is_err());
    assert!(parse_duration("5d").is_err());
}

#[test]
fn default_path_is_in_working_directory() {
    assert_eq!(default_config_path(), std::path::PathBuf::from("Opqueue.toml"));
}
