//! Publish-rate throttle.
//!
//! Channel deltas are enqueued as they are detected but only hit the bus
//! at a bounded rate: one flush per window, one message per topic per
//! flush. Later writes to the same topic overwrite earlier ones inside a
//! window, so a burst of changes collapses into the latest value.

use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};

pub struct PublishBatcher {
    queue: HashMap<String, Value>,
    next_flush: Instant,
    interval: Duration,
}

impl PublishBatcher {
    /// The first `tick` at or after `now` flushes immediately.
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self {
            queue: HashMap::new(),
            next_flush: now,
            interval,
        }
    }

    /// Queues `value` for `topic`, replacing any pending value.
    pub fn enqueue(&mut self, topic: String, value: Value) {
        self.queue.insert(topic, value);
    }

    /// Flushes the queue if the window has elapsed, scheduling the next
    /// flush at `now + interval`. Returns the drained entries; empty if
    /// the flush is not due yet or nothing is pending.
    pub fn tick(&mut self, now: Instant) -> Vec<(String, Value)> {
        if now < self.next_flush {
            return Vec::new();
        }
        self.next_flush = now + self.interval;
        self.queue.drain().collect()
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}
