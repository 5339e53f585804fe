//! 🪣 The batch buffer, where cars wait for a ride.
//!
//! Append at the tail, detach from the head, requeue at the tail. The lock is only
//! ever held for a push, a prefix drain or an extend. Never across an `.await`, so
//! the producer never waits on the network.
//!
//! A detached batch is a [`PendingBatch`]: it owns its records until someone settles
//! it. If nobody does (the flush future was dropped mid-send, a panic unwound through
//! it), the records walk back into the buffer on their own.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug)]
pub(crate) struct BatchBuffer<R> {
    records: Mutex<VecDeque<R>>,
}

impl<R> BatchBuffer<R> {
    pub(crate) fn new() -> Self {
        Self {
            records: Mutex::new(VecDeque::new()),
        }
    }

    // -- 🔒 a panic elsewhere doesn't make the Vec any less valid. keep going.
    fn lock(&self) -> MutexGuard<'_, VecDeque<R>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// ➕ Append to the tail. Returns the new length so the caller can check the size trigger.
    pub(crate) fn push(&self, record: R) -> usize {
        let mut records = self.lock();
        records.push_back(record);
        records.len()
    }

    /// ✂️ Remove up to `max` records from the head. `None` when there is nothing to take.
    pub(crate) fn detach(&self, max: usize) -> Option<PendingBatch<'_, R>> {
        let detached: Vec<R> = {
            let mut records = self.lock();
            let take = records.len().min(max);
            if take == 0 {
                return None;
            }
            records.drain(..take).collect()
        };
        Some(PendingBatch {
            buffer: self,
            records: detached,
        })
    }

    /// 🔁 Back of the line. Newer records stay ahead of the retried ones.
    pub(crate) fn requeue(&self, batch: Vec<R>) {
        self.lock().extend(batch);
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl<R: Clone> BatchBuffer<R> {
    pub(crate) fn snapshot(&self) -> Vec<R> {
        self.lock().iter().cloned().collect()
    }
}

/// 📦 Records detached for one delivery attempt. Exclusively owned until settled.
#[derive(Debug)]
pub(crate) struct PendingBatch<'a, R> {
    buffer: &'a BatchBuffer<R>,
    records: Vec<R>,
}

impl<R> PendingBatch<'_, R> {
    pub(crate) fn records(&self) -> &[R] {
        &self.records
    }

    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }

    /// ✅ The receiver has them now. Let them go.
    pub(crate) fn delivered(mut self) -> usize {
        let delivered = std::mem::take(&mut self.records);
        delivered.len()
    }

    /// 🔁 Didn't make it. Back into the buffer.
    pub(crate) fn requeue(mut self) -> usize {
        let undelivered = std::mem::take(&mut self.records);
        let count = undelivered.len();
        self.buffer.requeue(undelivered);
        count
    }
}

impl<R> Drop for PendingBatch<'_, R> {
    fn drop(&mut self) {
        // -- 🚑 unsettled batch: the flush was cancelled or panicked. nobody gets left behind.
        if !self.records.is_empty() {
            let orphans = std::mem::take(&mut self.records);
            self.buffer.requeue(orphans);
        }
    }
}
