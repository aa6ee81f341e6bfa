#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use opqueue::{Interest, Scheduler, SubscriptionHandle, TaskEvent, TaskId, TaskState};

/// Collects every event delivered to one subscription.
#[derive(Clone, Default)]
pub struct EventRecorder {
    events: Arc<Mutex<Vec<TaskEvent>>>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to `scheduler` and record into this recorder.
    pub fn attach(&self, scheduler: &Scheduler, interest: Interest) -> SubscriptionHandle {
        let events = Arc::clone(&self.events);
        scheduler.subscribe(interest, move |event| {
            events.lock().unwrap().push(event.clone());
        })
    }

    pub fn events(&self) -> Vec<TaskEvent> {
        self.events.lock().unwrap().clone()
    }

    /// States reported for one task, in delivery order.
    pub fn states_for(&self, id: TaskId) -> Vec<TaskState> {
        self.events()
            .into_iter()
            .filter(|e| e.task == id)
            .map(|e| e.state)
            .collect()
    }

    /// Wait until `id` has been reported in `state`. Panics after 5 seconds.
    pub async fn wait_for(&self, id: TaskId, state: TaskState) {
        crate::with_timeout(async {
            while !self.states_for(id).contains(&state) {
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
        .await
    }
}
