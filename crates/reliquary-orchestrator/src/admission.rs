//! Back-pressure admission control (§4.1): a bounded priority queue in
//! front of the concurrent-decision slots. Requests wait ordered by
//! `priority` (1 highest, 10 lowest) then FIFO within a priority; beyond
//! `max_queue` waiters, admission is refused outright rather than
//! growing unbounded.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use parking_lot::Mutex;
use reliquary_core::{ReliquaryError, Result};
use tokio::sync::oneshot;

struct Waiter {
    priority: u8,
    seq: u64,
    tx: oneshot::Sender<()>,
}

impl PartialEq for Waiter {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}
impl Eq for Waiter {}

impl PartialOrd for Waiter {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Waiter {
    /// Reversed so `BinaryHeap::pop` (a max-heap) yields the *lowest*
    /// priority number first, breaking ties by earliest `seq`.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

struct Inner {
    active: usize,
    heap: BinaryHeap<Waiter>,
}

/// Gates concurrent `orchestrate` calls to `max_concurrent`, queuing
/// excess callers (up to `max_queue`) by priority.
pub struct AdmissionControl {
    inner: Mutex<Inner>,
    max_concurrent: usize,
    max_queue: usize,
    seq: AtomicU64,
}

impl AdmissionControl {
    pub fn new(max_concurrent: usize, max_queue: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                active: 0,
                heap: BinaryHeap::new(),
            }),
            max_concurrent,
            max_queue,
            seq: AtomicU64::new(0),
        }
    }

    /// Acquire a decision slot, waiting in priority order if every slot
    /// is occupied. Fails immediately with `CapacityExceeded` once the
    /// wait queue is itself full.
    pub async fn acquire(&self, priority: u8) -> Result<AdmissionGuard<'_>> {
        let rx = {
            let mut inner = self.inner.lock();
            if inner.active < self.max_concurrent && inner.heap.is_empty() {
                inner.active += 1;
                return Ok(AdmissionGuard { control: self });
            }
            if inner.heap.len() >= self.max_queue {
                return Err(ReliquaryError::capacity_exceeded("over_capacity"));
            }
            let (tx, rx) = oneshot::channel();
            let seq = self.seq.fetch_add(1, AtomicOrdering::Relaxed);
            inner.heap.push(Waiter { priority, seq, tx });
            rx
        };
        rx.await
            .map_err(|_| ReliquaryError::internal("admission control dropped while queued"))?;
        Ok(AdmissionGuard { control: self })
    }

    fn release(&self) {
        let mut inner = self.inner.lock();
        match inner.heap.pop() {
            Some(next) => {
                // Slot ownership transfers directly to the highest-priority
                // waiter; `active` is unchanged.
                let _ = next.tx.send(());
            }
            None => inner.active -= 1,
        }
    }

    pub fn active_count(&self) -> usize {
        self.inner.lock().active
    }

    pub fn queued_count(&self) -> usize {
        self.inner.lock().heap.len()
    }
}

/// RAII decision slot. Releasing hands the slot to the next queued
/// waiter (if any) rather than simply decrementing the active count.
pub struct AdmissionGuard<'a> {
    control: &'a AdmissionControl,
}

impl Drop for AdmissionGuard<'_> {
    fn drop(&mut self) {
        self.control.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn grants_immediately_under_capacity() {
        let admission = AdmissionControl::new(2, 10);
        let _g1 = admission.acquire(5).await.unwrap();
        assert_eq!(admission.active_count(), 1);
    }

    #[tokio::test]
    async fn rejects_once_queue_is_full() {
        let admission = AdmissionControl::new(1, 1);
        let _g1 = admission.acquire(5).await.unwrap();
        let _g2 = admission.acquire(5).await; // queues, doesn't resolve yet
        // third caller finds active full and queue at capacity (1)
        let g3 = admission.acquire(5).await;
        assert!(g3.is_err());
    }

    #[tokio::test]
    async fn higher_priority_waiter_is_served_first() {
        let admission = AdmissionControl::new(1, 10);
        let g1 = admission.acquire(5).await.unwrap();

        let admission = std::sync::Arc::new(admission);
        let a2 = admission.clone();
        let low = tokio::spawn(async move { a2.acquire(9).await });
        tokio::task::yield_now().await;
        let a3 = admission.clone();
        let high = tokio::spawn(async move { a3.acquire(1).await });
        tokio::task::yield_now().await;

        drop(g1);
        let (low_res, high_res) = tokio::join!(low, high);
        assert!(low_res.unwrap().is_ok());
        assert!(high_res.unwrap().is_ok());
    }
}
