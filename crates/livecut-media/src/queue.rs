// crates/livecut-media/src/queue.rs
//
// Bounded FIFO queue between a stage and its worker, built on
// crossbeam-channel. One producer and one consumer per queue in practice
// (the stage on one side, the worker on the other), though the handles are
// cheap clones of the same channel pair.
//
// Capacity 0 means unbounded. The drop policy is picked per queue:
//   drop_when_full = true  — try_push discards the new item when full
//   drop_when_full = false — push blocks until space frees up
// push_latest is the third flavour used by live video sources and feature
// vote outputs: when full, evict the oldest item and push the new one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TrySendError};

/// How long a blocking `push` waits between checks of the closed flag.
const PUSH_POLL: Duration = Duration::from_millis(20);

#[derive(Clone)]
pub struct Queue<T> {
    tx:             Sender<T>,
    rx:             Receiver<T>,
    drop_when_full: bool,
    closed:         Arc<AtomicBool>,
}

impl<T> Queue<T> {
    pub fn new(capacity: usize, drop_when_full: bool) -> Self {
        let (tx, rx) = if capacity == 0 { unbounded() } else { bounded(capacity) };
        Self {
            tx,
            rx,
            drop_when_full,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn drops_when_full(&self) -> bool {
        self.drop_when_full
    }

    /// Push respecting the queue's drop policy: discard-on-full when
    /// `drop_when_full`, otherwise block until space frees up or the queue
    /// closes. Returns false when the item was dropped or the queue is closed.
    pub fn push(&self, item: T) -> bool {
        if self.drop_when_full {
            return self.try_push(item);
        }
        let mut item = item;
        loop {
            if self.closed.load(Ordering::Relaxed) {
                return false;
            }
            match self.tx.send_timeout(item, PUSH_POLL) {
                Ok(()) => return true,
                Err(crossbeam_channel::SendTimeoutError::Timeout(back)) => item = back,
                Err(crossbeam_channel::SendTimeoutError::Disconnected(_)) => return false,
            }
        }
    }

    /// Non-blocking push; false when full or closed.
    pub fn try_push(&self, item: T) -> bool {
        if self.closed.load(Ordering::Relaxed) {
            return false;
        }
        match self.tx.try_send(item) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Push, evicting the oldest queued item when full.
    pub fn push_latest(&self, item: T) -> bool {
        if self.closed.load(Ordering::Relaxed) {
            return false;
        }
        match self.tx.try_send(item) {
            Ok(()) => true,
            Err(TrySendError::Full(back)) => {
                let _ = self.rx.try_recv();
                self.tx.try_send(back).is_ok()
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Non-blocking pop.
    pub fn try_pop(&self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// Drain everything currently queued, oldest first.
    pub fn pop_all(&self) -> Vec<T> {
        let mut items = Vec::new();
        while let Ok(item) = self.rx.try_recv() {
            items.push(item);
        }
        items
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Mark the queue closed. Pending items remain poppable; pushes fail and
    /// blocked pushers return. Workers treat a closed queue as a clean stop.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Relaxed);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn fifo_order_is_preserved() {
        let q: Queue<u32> = Queue::new(0, false);
        for i in 0..100 {
            assert!(q.push(i));
        }
        let popped = q.pop_all();
        assert_eq!(popped, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn bounded_queue_never_holds_more_than_capacity() {
        let q: Queue<u32> = Queue::new(3, true);
        for i in 0..10 {
            q.try_push(i);
            assert!(q.len() <= 3);
        }
        // Drop-new policy: the first 3 pushed survive.
        assert_eq!(q.pop_all(), vec![0, 1, 2]);
    }

    #[test]
    fn push_latest_evicts_the_oldest() {
        let q: Queue<u32> = Queue::new(2, true);
        for i in 0..5 {
            assert!(q.push_latest(i));
        }
        assert_eq!(q.pop_all(), vec![3, 4]);
    }

    #[test]
    fn try_pop_on_empty_is_none() {
        let q: Queue<u32> = Queue::new(1, true);
        assert_eq!(q.try_pop(), None);
    }

    #[test]
    fn blocking_push_waits_for_space() {
        let q: Queue<u32> = Queue::new(1, false);
        assert!(q.push(1));
        let q2 = q.clone();
        let handle = thread::spawn(move || q2.push(2));
        thread::sleep(Duration::from_millis(50));
        assert_eq!(q.try_pop(), Some(1));
        assert!(handle.join().unwrap());
        assert_eq!(q.try_pop(), Some(2));
    }

    #[test]
    fn close_unblocks_a_stuck_producer() {
        let q: Queue<u32> = Queue::new(1, false);
        assert!(q.push(1));
        let q2 = q.clone();
        let handle = thread::spawn(move || q2.push(2));
        thread::sleep(Duration::from_millis(30));
        q.close();
        assert!(!handle.join().unwrap());
    }

    #[test]
    fn closed_queue_rejects_pushes_but_drains() {
        let q: Queue<u32> = Queue::new(0, false);
        q.push(7);
        q.close();
        assert!(!q.try_push(8));
        assert_eq!(q.pop_all(), vec![7]);
    }
}
