// src/config/mod.rs

//! Scheduler settings and the TOML plan format used by the `opqueue`
//! binary.

pub mod duration;
pub mod loader;
pub mod model;
pub mod validate;

pub use duration::parse_duration;
pub use loader::{default_config_path, load_and_validate, load_from_path, parse_plan_str};
pub use model::{PlanFile, PlanTask, PlannedCancel, RawPlanFile, RawPlanTask, SchedulerConfig};
