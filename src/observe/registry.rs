// src/observe/registry.rs

use std::fmt;

use tokio::sync::mpsc;

use super::{EventHandler, Interest, SubscriptionHandle, TaskEvent};

/// Where a subscriber's events go.
#[derive(Clone)]
pub enum Sink {
    Handler(EventHandler),
    Channel(mpsc::UnboundedSender<TaskEvent>),
}

impl fmt::Debug for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sink::Handler(_) => f.write_str("Handler"),
            Sink::Channel(tx) => f
                .debug_struct("Channel")
                .field("closed", &tx.is_closed())
                .finish(),
        }
    }
}

#[derive(Debug)]
struct Subscription {
    handle: SubscriptionHandle,
    interest: Interest,
    sink: Sink,
}

/// All live subscriptions of one scheduler.
#[derive(Debug, Default)]
pub struct SubscriberRegistry {
    next_handle: u64,
    subs: Vec<Subscription>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.subs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subs.is_empty()
    }

    pub fn add(&mut self, interest: Interest, sink: Sink) -> SubscriptionHandle {
        self.next_handle += 1;
        let handle = SubscriptionHandle(self.next_handle);
        self.subs.push(Subscription {
            handle,
            interest,
            sink,
        });
        handle
    }

    /// Returns whether the handle was registered.
    pub fn remove(&mut self, handle: SubscriptionHandle) -> bool {
        let before = self.subs.len();
        self.subs.retain(|s| s.handle != handle);
        self.subs.len() != before
    }

    pub fn contains(&self, handle: SubscriptionHandle) -> bool {
        self.subs.iter().any(|s| s.handle == handle)
    }

    /// Sinks interested in `event`, in subscription order.
    pub fn matching(&self, event: &TaskEvent) -> Vec<(SubscriptionHandle, Sink)> {
        self.subs
            .iter()
            .filter(|s| s.interest.matches(event))
            .map(|s| (s.handle, s.sink.clone()))
            .collect()
    }
}
