// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-container read/write locking over container state.
//!
//! Each container tag owns an independent fair `RwLock`: many concurrent
//! readers or one writer per tag, and a waiting writer blocks new readers
//! until it has run (tokio's `RwLock` is FIFO-fair, which gives exactly
//! the drain-readers-then-write behavior). Operations on disjoint tags
//! never contend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

/// Tag-keyed map of fair read/write locks, created lazily per tag.
pub struct ContainerLocks<T> {
    locks: Mutex<HashMap<String, Arc<RwLock<T>>>>,
}

impl<T: Default> ContainerLocks<T> {
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Shared (read) access to one container's state.
    pub async fn read(&self, tag: &str) -> OwnedRwLockReadGuard<T> {
        self.entry(tag).read_owned().await
    }

    /// Exclusive (write) access to one container's state.
    pub async fn write(&self, tag: &str) -> OwnedRwLockWriteGuard<T> {
        self.entry(tag).write_owned().await
    }

    fn entry(&self, tag: &str) -> Arc<RwLock<T>> {
        let mut locks = self
            .locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            locks
                .entry(tag.to_string())
                .or_insert_with(|| Arc::new(RwLock::new(T::default()))),
        )
    }
}

impl<T: Default> Default for ContainerLocks<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn readers_share_access() {
        let locks: ContainerLocks<u32> = ContainerLocks::new();
        let r1 = locks.read("t").await;
        let r2 = locks.read("t").await;
        assert_eq!(*r1, *r2);
    }

    #[tokio::test]
    async fn writer_excludes_readers() {
        let locks: Arc<ContainerLocks<Vec<u32>>> = Arc::new(ContainerLocks::new());
        let observed_mid_write = Arc::new(AtomicUsize::new(0));

        let writer = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let mut state = locks.write("t").await;
                state.push(1);
                tokio::time::sleep(Duration::from_millis(20)).await;
                state.push(2);
            })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;

        let reader = {
            let locks = Arc::clone(&locks);
            let observed = Arc::clone(&observed_mid_write);
            tokio::spawn(async move {
                let state = locks.read("t").await;
                observed.store(state.len(), Ordering::SeqCst);
            })
        };

        writer.await.unwrap();
        reader.await.unwrap();
        // The reader must never see the half-written state [1].
        assert_eq!(observed_mid_write.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn disjoint_tags_do_not_block() {
        let locks: Arc<ContainerLocks<u32>> = Arc::new(ContainerLocks::new());
        let _writer_a = locks.write("a").await;

        // A write on "b" must proceed while "a" is held.
        let write_b = tokio::time::timeout(Duration::from_millis(100), locks.write("b")).await;
        assert!(write_b.is_ok(), "independent tags contended");
    }

    #[tokio::test]
    async fn waiting_writer_blocks_new_readers() {
        let locks: Arc<ContainerLocks<u32>> = Arc::new(ContainerLocks::new());
        let first_reader = locks.read("t").await;

        let writer = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let mut state = locks.write("t").await;
                *state = 7;
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        // A reader arriving behind the queued writer sees the written value.
        let late_reader = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move { *locks.read("t").await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        drop(first_reader);
        writer.await.unwrap();
        assert_eq!(late_reader.await.unwrap(), 7);
    }
}
