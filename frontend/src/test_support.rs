//! In-memory doubles for the browser-facing seams.

use crate::composer::{Scheduler, TimerGuard};
use crate::transport::{SubscriptionId, Transport};
use shared::{AppDestination, OutboundMessage};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Subscribe {
        id: String,
        destination: String,
        receipt: Option<String>,
    },
    Unsubscribe(String),
    Send {
        destination: String,
        body: String,
    },
}

/// Transport that records every operation. Clones share the same log.
#[derive(Clone, Default)]
pub struct RecordingTransport {
    ops: Rc<RefCell<Vec<Op>>>,
    next_id: Rc<Cell<u32>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> Vec<Op> {
        self.ops.borrow().clone()
    }

    pub fn subscribed_destinations(&self) -> Vec<String> {
        self.ops
            .borrow()
            .iter()
            .filter_map(|op| match op {
                Op::Subscribe { destination, .. } => Some(destination.clone()),
                _ => None,
            })
            .collect()
    }

    /// Decoded payloads published to `destination`, oldest first.
    pub fn sent_to(&self, destination: AppDestination) -> Vec<OutboundMessage> {
        self.ops
            .borrow()
            .iter()
            .filter_map(|op| match op {
                Op::Send {
                    destination: d,
                    body,
                } if d == destination.path() => serde_json::from_str(body).ok(),
                _ => None,
            })
            .collect()
    }

    pub fn send_count(&self) -> usize {
        self.ops
            .borrow()
            .iter()
            .filter(|op| matches!(op, Op::Send { .. }))
            .count()
    }
}

impl Transport for RecordingTransport {
    fn subscribe(&mut self, destination: &str, receipt: Option<&str>) -> SubscriptionId {
        let id = format!("sub-{}", self.next_id.get());
        self.next_id.set(self.next_id.get() + 1);
        self.ops.borrow_mut().push(Op::Subscribe {
            id: id.clone(),
            destination: destination.to_string(),
            receipt: receipt.map(str::to_string),
        });
        id
    }

    fn unsubscribe(&mut self, id: &str) {
        self.ops.borrow_mut().push(Op::Unsubscribe(id.to_string()));
    }

    fn send(&mut self, destination: &str, body: String) {
        self.ops.borrow_mut().push(Op::Send {
            destination: destination.to_string(),
            body,
        });
    }
}

type Task = Box<dyn FnOnce()>;

#[derive(Default)]
struct Clock {
    now: u64,
    next_id: u64,
    tasks: Vec<(u64, u64, Task)>,
}

/// Scheduler driven by a virtual clock.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    clock: Rc<RefCell<Clock>>,
}

struct CancelOnDrop {
    id: u64,
    clock: Weak<RefCell<Clock>>,
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        if let Some(clock) = self.clock.upgrade() {
            clock.borrow_mut().tasks.retain(|(id, _, _)| *id != self.id);
        }
    }
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.clock.borrow().tasks.len()
    }

    /// Move the clock forward, running every task that falls due.
    pub fn advance(&self, ms: u64) {
        let target = self.clock.borrow().now + ms;
        loop {
            let due = {
                let mut clock = self.clock.borrow_mut();
                let next = clock
                    .tasks
                    .iter()
                    .enumerate()
                    .filter(|(_, (_, at, _))| *at <= target)
                    .min_by_key(|(_, (_, at, _))| *at)
                    .map(|(index, _)| index);
                match next {
                    Some(index) => {
                        let (_, at, task) = clock.tasks.remove(index);
                        clock.now = at;
                        Some(task)
                    }
                    None => {
                        clock.now = target;
                        None
                    }
                }
            };
            match due {
                Some(task) => task(),
                None => break,
            }
        }
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay_ms: u32, task: Box<dyn FnOnce()>) -> TimerGuard {
        let mut clock = self.clock.borrow_mut();
        let id = clock.next_id;
        clock.next_id += 1;
        let due = clock.now + u64::from(delay_ms);
        clock.tasks.push((id, due, task));
        TimerGuard::new(CancelOnDrop {
            id,
            clock: Rc::downgrade(&self.clock),
        })
    }
}
