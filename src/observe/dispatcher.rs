// src/observe/dispatcher.rs

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::registry::{Sink, SubscriberRegistry};
use super::{EventHandler, Interest, SubscriptionHandle, TaskEvent};

/// Publishing side of the observation channel.
///
/// `publish` only enqueues; delivery happens on the dispatcher task spawned
/// by [`ObserverHub::spawn`].
#[derive(Debug, Clone)]
pub struct ObserverHub {
    registry: Arc<Mutex<SubscriberRegistry>>,
    tx: mpsc::UnboundedSender<TaskEvent>,
}

impl ObserverHub {
    /// Create a hub and spawn its dispatcher on `runtime`.
    ///
    /// The dispatcher exits once every clone of the hub has been dropped and
    /// the remaining events have been delivered.
    pub fn spawn(runtime: &Handle) -> (Self, JoinHandle<()>) {
        let registry = Arc::new(Mutex::new(SubscriberRegistry::new()));
        let (tx, rx) = mpsc::unbounded_channel::<TaskEvent>();
        let handle = runtime.spawn(dispatch_loop(Arc::clone(&registry), rx));
        (Self { registry, tx }, handle)
    }

    pub fn publish(&self, events: &[TaskEvent]) {
        for event in events {
            if self.tx.send(event.clone()).is_err() {
                debug!(task = %event.task, "dispatcher gone; dropping event");
                return;
            }
        }
    }

    pub fn subscribe(&self, interest: Interest, handler: EventHandler) -> SubscriptionHandle {
        let handle = self.registry().add(interest, Sink::Handler(handler));
        debug!(?interest, ?handle, "handler subscribed");
        handle
    }

    pub fn subscribe_channel(
        &self,
        interest: Interest,
    ) -> (SubscriptionHandle, mpsc::UnboundedReceiver<TaskEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = self.registry().add(interest, Sink::Channel(tx));
        debug!(?interest, ?handle, "channel subscribed");
        (handle, rx)
    }

    /// Returns whether the subscription existed.
    pub fn unsubscribe(&self, handle: SubscriptionHandle) -> bool {
        let removed = self.registry().remove(handle);
        debug!(?handle, removed, "unsubscribed");
        removed
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry().len()
    }

    fn registry(&self) -> std::sync::MutexGuard<'_, SubscriberRegistry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn dispatch_loop(
    registry: Arc<Mutex<SubscriberRegistry>>,
    mut rx: mpsc::UnboundedReceiver<TaskEvent>,
) {
    debug!("event dispatcher started");

    while let Some(event) = rx.recv().await {
        // Snapshot the sinks, then deliver without holding the lock.
        let sinks = registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .matching(&event);

        for (handle, sink) in sinks {
            // An earlier handler may have unsubscribed this one.
            let live = registry
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .contains(handle);
            if !live {
                continue;
            }

            match sink {
                Sink::Handler(handler) => {
                    if catch_unwind(AssertUnwindSafe(|| handler(&event))).is_err() {
                        warn!(task = %event.task, ?handle, "event handler panicked");
                    }
                }
                Sink::Channel(tx) => {
                    if tx.send(event.clone()).is_err() {
                        info!(?handle, "subscriber channel closed; removing subscription");
                        registry
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .remove(handle);
                    }
                }
            }
        }
    }

    debug!("event dispatcher finished (channel closed)");
}
