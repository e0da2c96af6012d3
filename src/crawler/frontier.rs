//! Frontier queue shared by the worker pool
//!
//! This module handles:
//! - FIFO ordering of pending jobs
//! - Backpressure on producers once the queue holds `capacity` jobs
//! - Tracking outstanding work so the frontier closes itself when the crawl
//!   runs out of jobs
//! - Returning early from `push`/`pop` when the crawl is cancelled

use crate::crawler::job::Job;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// Why a job could not be pushed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FrontierError {
    #[error("frontier is closed")]
    Closed,

    #[error("crawl was cancelled")]
    Cancelled,
}

#[derive(Debug, Default)]
struct FrontierState {
    queue: VecDeque<Job>,

    /// Jobs pushed but not yet marked complete (queued + in progress)
    outstanding: usize,

    /// Workers currently waiting for queue space
    blocked_pushers: usize,

    /// Workers still able to drain the queue
    producers: usize,

    closed: bool,
}

/// Bounded multi-producer, multi-consumer job queue
///
/// The producers are the workers themselves, so a naive bounded queue could
/// deadlock with every worker stuck in `push` and nobody left to `pop`. A push
/// therefore only waits while at least one other worker is free to drain the
/// queue; the last worker to arrive is let through over capacity.
#[derive(Debug)]
pub struct Frontier {
    state: Mutex<FrontierState>,
    changed: Notify,
    capacity: usize,
}

impl Frontier {
    /// Creates a frontier sized for a pool of `capacity` workers
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            state: Mutex::new(FrontierState {
                producers: capacity,
                ..FrontierState::default()
            }),
            changed: Notify::new(),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, FrontierState> {
        // The state is plain data, so it stays consistent even if a holder panicked
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Enqueues the seed job without waiting
    ///
    /// Only valid before workers start pushing; the seed never competes for space.
    pub fn seed(&self, job: Job) -> Result<(), FrontierError> {
        {
            let mut state = self.lock();
            if state.closed {
                return Err(FrontierError::Closed);
            }
            state.queue.push_back(job);
            state.outstanding += 1;
        }
        self.changed.notify_waiters();
        Ok(())
    }

    /// Enqueues a job, waiting for space while the queue is full
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The job was queued
    /// * `Err(FrontierError::Closed)` - The frontier no longer accepts jobs
    /// * `Err(FrontierError::Cancelled)` - Cancellation fired before space opened up
    pub async fn push(&self, job: Job, cancel: &CancellationToken) -> Result<(), FrontierError> {
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.lock();
                if state.closed {
                    return Err(FrontierError::Closed);
                }
                if cancel.is_cancelled() {
                    return Err(FrontierError::Cancelled);
                }

                let has_space = state.queue.len() < self.capacity;
                let everyone_blocked = state.blocked_pushers + 1 >= state.producers;
                if has_space || everyone_blocked {
                    if !has_space {
                        tracing::debug!(
                            "All workers waiting on a full frontier, queueing {} over capacity",
                            job.location
                        );
                    }
                    state.queue.push_back(job);
                    state.outstanding += 1;
                    drop(state);
                    self.changed.notify_waiters();
                    return Ok(());
                }

                state.blocked_pushers += 1;
            }

            let cancelled = tokio::select! {
                biased;
                _ = cancel.cancelled() => true,
                _ = &mut notified => false,
            };

            self.lock().blocked_pushers -= 1;
            if cancelled {
                return Err(FrontierError::Cancelled);
            }
        }
    }

    /// Takes the next job, waiting while the queue is empty
    ///
    /// Returns `None` once the frontier is closed and drained, or as soon as
    /// `cancel` fires.
    pub async fn pop(&self, cancel: &CancellationToken) -> Option<Job> {
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if cancel.is_cancelled() {
                return None;
            }

            {
                let mut state = self.lock();
                if let Some(job) = state.queue.pop_front() {
                    drop(state);
                    self.changed.notify_waiters();
                    return Some(job);
                }
                if state.closed {
                    return None;
                }
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return None,
                _ = &mut notified => {}
            }
        }
    }

    /// Marks one popped job as finished
    ///
    /// Workers call this after publishing the job's result, and after pushing
    /// any children, so the outstanding count only reaches zero once no job
    /// can produce more work. At zero the frontier closes.
    pub fn complete(&self) {
        let closed_now = {
            let mut state = self.lock();
            state.outstanding = state.outstanding.saturating_sub(1);
            if state.outstanding == 0 && !state.closed {
                state.closed = true;
                true
            } else {
                false
            }
        };

        if closed_now {
            tracing::debug!("Frontier drained, closing");
        }
        self.changed.notify_waiters();
    }

    /// Removes an exiting worker from the producer count
    ///
    /// Blocked pushers re-check whether anyone is left to drain the queue.
    pub fn retire_producer(&self) {
        {
            let mut state = self.lock();
            state.producers = state.producers.saturating_sub(1);
        }
        self.changed.notify_waiters();
    }

    /// Stops accepting new jobs; queued jobs can still be popped
    pub fn close(&self) {
        self.lock().closed = true;
        self.changed.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Number of queued jobs
    pub fn len(&self) -> usize {
        self.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().queue.is_empty()
    }

    /// Queued plus in-progress jobs
    pub fn outstanding(&self) -> usize {
        self.lock().outstanding
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
