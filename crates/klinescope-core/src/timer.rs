//! Cancellable one-shot timers that deliver events to a queue.
//!
//! A timer that already fired may have its event queued before `cancel` runs,
//! so receivers compare [`TimerId`]s and drop events from superseded timers.

use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

/// Identity of a scheduled timer, unique per queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// Owned handle to a pending timer.
#[derive(Debug)]
pub struct TimerHandle {
    id: TimerId,
    task: JoinHandle<()>,
}

impl TimerHandle {
    pub const fn id(&self) -> TimerId {
        self.id
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Schedules events onto an unbounded channel after a delay.
#[derive(Debug)]
pub struct TimerQueue<E> {
    tx: UnboundedSender<E>,
    next_id: u64,
}

impl<E: Send + 'static> TimerQueue<E> {
    pub fn new(tx: UnboundedSender<E>) -> Self {
        Self { tx, next_id: 0 }
    }

    /// Deliver the event built by `make_event` after `delay`.
    pub fn schedule<F>(&mut self, delay: Duration, make_event: F) -> TimerHandle
    where
        F: FnOnce(TimerId) -> E,
    {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        let event = make_event(id);
        let tx = self.tx.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Receiver gone means the session shut down.
            let _ = tx.send(event);
        });
        TimerHandle { id, task }
    }

    /// Abort a pending timer. Already-fired timers are unaffected.
    pub fn cancel(&self, handle: TimerHandle) {
        handle.task.abort();
    }
}
