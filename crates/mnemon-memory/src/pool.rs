// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! FIFO counting semaphore bounding global extraction concurrency.
//!
//! At most `permits` acquisitions may be outstanding; further callers wait
//! in arrival order. Permits are RAII: dropping a [`PoolPermit`] hands the
//! slot to the oldest live waiter, so slots are released on success,
//! failure, and cancellation alike. A waiter whose future is dropped
//! before being served is skipped.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::oneshot;

struct PoolState {
    permits: usize,
    waiters: VecDeque<oneshot::Sender<PoolPermit>>,
}

/// Counting semaphore with FIFO fairness.
#[derive(Clone)]
pub struct FifoSemaphore {
    inner: Arc<Mutex<PoolState>>,
}

/// An acquired slot; dropping it releases the slot.
pub struct PoolPermit {
    inner: Arc<Mutex<PoolState>>,
}

impl FifoSemaphore {
    pub fn new(permits: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(PoolState {
                permits,
                waiters: VecDeque::new(),
            })),
        }
    }

    /// Acquire a slot, waiting in FIFO order when none are free.
    pub async fn acquire(&self) -> PoolPermit {
        let receiver = {
            let mut state = lock_state(&self.inner);
            if state.permits > 0 {
                state.permits -= 1;
                None
            } else {
                let (tx, rx) = oneshot::channel();
                state.waiters.push_back(tx);
                Some(rx)
            }
        };

        match receiver {
            None => PoolPermit {
                inner: Arc::clone(&self.inner),
            },
            Some(rx) => match rx.await {
                Ok(permit) => permit,
                // Senders are only dropped after a successful send, so this
                // branch is unreachable; constructing a permit keeps the
                // count honest regardless.
                Err(_) => PoolPermit {
                    inner: Arc::clone(&self.inner),
                },
            },
        }
    }

    /// Free slots at this instant (diagnostic only).
    pub fn available(&self) -> usize {
        lock_state(&self.inner).permits
    }

    /// Callers currently queued (diagnostic only).
    pub fn waiting(&self) -> usize {
        lock_state(&self.inner).waiters.len()
    }
}

impl Drop for PoolPermit {
    fn drop(&mut self) {
        release(&self.inner);
    }
}

/// Hand the slot to the oldest live waiter, or return it to the pool.
fn release(inner: &Arc<Mutex<PoolState>>) {
    let mut state = lock_state(inner);
    loop {
        match state.waiters.pop_front() {
            Some(tx) => {
                let permit = PoolPermit {
                    inner: Arc::clone(inner),
                };
                match tx.send(permit) {
                    Ok(()) => return,
                    Err(returned) => {
                        // The waiter was cancelled. Forget the returned
                        // permit (running its Drop here would deadlock on
                        // the held lock) and try the next waiter.
                        std::mem::forget(returned);
                    }
                }
            }
            None => {
                state.permits += 1;
                return;
            }
        }
    }
}

fn lock_state(inner: &Arc<Mutex<PoolState>>) -> std::sync::MutexGuard<'_, PoolState> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}
