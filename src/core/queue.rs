//! Bounded handoff queue between the source callback and the engine.
//!
//! `push` blocks the producer while the queue is full and `pop` blocks the
//! consumer while it is empty. Both return as soon as shutdown is requested.
//! A blocked `push` also gives up when acquisition stops or the session
//! changes; the batch is then dropped without an error.

use crate::collector::types::EventBatch;
use crate::control::state::SharedControl;
use crate::stats::SharedStats;
use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// Default capacity in batches.
///
/// At a few hundred events per batch this caps the backlog at well under
/// 100k events, a fraction of a second at nominal sensor rates.
pub const DEFAULT_MAX_QUEUE_SIZE: usize = 200;

/// What happened to a pushed batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Enqueued,
    /// Shutdown, acquisition stop or a session change intervened
    Dropped,
}

/// Capacity-bounded FIFO of event batches.
pub struct HandoffQueue {
    batches: Mutex<VecDeque<EventBatch>>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: usize,
    control: SharedControl,
    stats: SharedStats,
}

impl HandoffQueue {
    /// Create a queue holding at most `capacity` batches (minimum 1).
    pub fn new(capacity: usize, control: SharedControl, stats: SharedStats) -> Self {
        let capacity = capacity.max(1);
        Self {
            batches: Mutex::new(VecDeque::with_capacity(capacity)),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity,
            control,
            stats,
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<EventBatch>> {
        self.batches.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append `batch`, waiting for space if the queue is full.
    ///
    /// Wakes one waiting consumer.
    pub fn push(&self, batch: EventBatch) -> PushOutcome {
        let session = batch.session;
        let guard = self.lock();
        let mut guard = self
            .not_full
            .wait_while(guard, |queue| {
                self.control.accepts(session) && queue.len() >= self.capacity
            })
            .unwrap_or_else(PoisonError::into_inner);

        if !self.control.accepts(session) {
            drop(guard);
            self.stats.record_batches_dropped(1);
            return PushOutcome::Dropped;
        }

        guard.push_back(batch);
        drop(guard);
        self.stats.record_batch_enqueued();
        self.not_empty.notify_one();
        PushOutcome::Enqueued
    }

    /// Remove the oldest batch, waiting while the queue is empty.
    ///
    /// Returns `None` once shutdown has been requested.
    pub fn pop(&self) -> Option<EventBatch> {
        let guard = self.lock();
        let mut guard = self
            .not_empty
            .wait_while(guard, |queue| self.control.is_running() && queue.is_empty())
            .unwrap_or_else(PoisonError::into_inner);

        if !self.control.is_running() {
            return None;
        }
        let batch = guard.pop_front();
        drop(guard);
        self.not_full.notify_one();
        batch
    }

    /// Drop every queued batch and wake all waiters. Returns the number dropped.
    pub fn clear(&self) -> usize {
        let dropped = {
            let mut guard = self.lock();
            let n = guard.len();
            guard.clear();
            n
        };
        if dropped > 0 {
            self.stats.record_batches_dropped(dropped as u64);
        }
        self.wake_all();
        dropped
    }

    /// Wake every blocked producer and consumer so they re-check the
    /// control flags.
    pub fn wake_all(&self) {
        // Taking the lock orders the wake-up after any flag change made
        // before this call, so no waiter misses it.
        drop(self.lock());
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    /// Number of batches currently queued.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no batch is queued.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Maximum number of queued batches.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::types::{Event, Polarity};
    use crate::control::state::create_shared_control;
    use crate::stats::create_shared_stats;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn batch(session: u64, t: i64) -> EventBatch {
        EventBatch::new(session, vec![Event::new(0, 0, Polarity::On, t)])
    }

    fn acquiring_queue(capacity: usize) -> (Arc<HandoffQueue>, SharedControl, u64) {
        let control = create_shared_control();
        let session = control.begin_session();
        control.set_acquisition(true);
        let queue = Arc::new(HandoffQueue::new(capacity, control.clone(), create_shared_stats()));
        (queue, control, session)
    }

    #[test]
    fn test_fifo_order() {
        let (queue, _control, session) = acquiring_queue(8);
        for t in 0..5 {
            assert_eq!(queue.push(batch(session, t)), PushOutcome::Enqueued);
        }
        for t in 0..5 {
            assert_eq!(queue.pop().unwrap().first_timestamp(), Some(t));
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn test_producer_blocks_at_capacity() {
        let (queue, _control, session) = acquiring_queue(2);
        queue.push(batch(session, 0));
        queue.push(batch(session, 1));

        let producer = {
            let queue = queue.clone();
            thread::spawn(move || queue.push(batch(session, 2)))
        };
        thread::sleep(Duration::from_millis(50));
        assert!(!producer.is_finished());
        assert_eq!(queue.len(), 2);

        assert_eq!(queue.pop().unwrap().first_timestamp(), Some(0));
        assert_eq!(producer.join().unwrap(), PushOutcome::Enqueued);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_shutdown_releases_blocked_producer() {
        let (queue, control, session) = acquiring_queue(1);
        queue.push(batch(session, 0));

        let producer = {
            let queue = queue.clone();
            thread::spawn(move || queue.push(batch(session, 1)))
        };
        thread::sleep(Duration::from_millis(20));
        control.request_shutdown();
        queue.wake_all();
        assert_eq!(producer.join().unwrap(), PushOutcome::Dropped);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_shutdown_releases_blocked_consumer() {
        let (queue, control, _session) = acquiring_queue(4);
        let consumer = {
            let queue = queue.clone();
            thread::spawn(move || queue.pop())
        };
        thread::sleep(Duration::from_millis(20));
        control.request_shutdown();
        queue.wake_all();
        assert!(consumer.join().unwrap().is_none());
    }

    #[test]
    fn test_push_after_acquisition_stop_is_dropped() {
        let (queue, control, session) = acquiring_queue(4);
        control.set_acquisition(false);
        assert_eq!(queue.push(batch(session, 0)), PushOutcome::Dropped);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_stale_session_is_dropped() {
        let (queue, control, old) = acquiring_queue(4);
        control.begin_session();
        assert_eq!(queue.push(batch(old, 0)), PushOutcome::Dropped);
    }

    #[test]
    fn test_clear_drops_everything() {
        let (queue, _control, session) = acquiring_queue(4);
        queue.push(batch(session, 0));
        queue.push(batch(session, 1));
        assert_eq!(queue.clear(), 2);
        assert!(queue.is_empty());
    }
}
