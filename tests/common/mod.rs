#![allow(dead_code)]

pub use opqueue_test_utils::builders;
pub use opqueue_test_utils::events::EventRecorder;
pub use opqueue_test_utils::work::{ExecutionLog, Gate, wait_for_state};
pub use opqueue_test_utils::{init_tracing, with_timeout};

pub type TestResult = Result<(), Box<dyn std::error::Error>>;
