//! Per-user serialization of read-modify-write cycles.
//!
//! Each user id maps to a fair (FIFO) async mutex. Callers for the same user
//! run one at a time in the order they started waiting; callers for
//! different users never share a slot. A slot is dropped from the map as
//! soon as nobody holds or waits on it.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

type Slot = Arc<tokio::sync::Mutex<()>>;

#[derive(Debug, Default)]
struct Entry {
    slot: Slot,
    /// Holders plus waiters
    claims: usize,
}

#[derive(Debug, Default)]
pub struct UserLocks {
    slots: Mutex<HashMap<String, Entry>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `op` while holding the slot for `user_id`.
    ///
    /// The slot is released however `op` ends (error, panic, or the returned
    /// future being dropped), and its outcome is handed back unchanged.
    pub async fn run_exclusive<F, Fut, T>(&self, user_id: &str, op: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let lease = self.lease(user_id);
        let _guard = lease.slot.lock().await;
        op().await
    }

    /// Number of users with a holder or waiter right now
    pub fn active_slots(&self) -> usize {
        self.map().len()
    }

    fn lease(&self, user_id: &str) -> SlotLease<'_> {
        let mut map = self.map();
        let entry = map.entry(user_id.to_string()).or_default();
        entry.claims += 1;
        SlotLease {
            locks: self,
            user_id: user_id.to_string(),
            slot: Arc::clone(&entry.slot),
        }
    }

    fn map(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// A caller's claim on a slot; evicts the slot when the last claim goes away
struct SlotLease<'a> {
    locks: &'a UserLocks,
    user_id: String,
    slot: Slot,
}

impl Drop for SlotLease<'_> {
    fn drop(&mut self) {
        let mut map = self.locks.map();
        if let Some(entry) = map.get_mut(&self.user_id) {
            entry.claims = entry.claims.saturating_sub(1);
            if entry.claims == 0 {
                map.remove(&self.user_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn same_user_runs_in_issue_order() {
        let locks = UserLocks::new();
        let log = Mutex::new(Vec::new());

        let slow = locks.run_exclusive("u1", || async {
            log.lock().unwrap().push("slow:start");
            tokio::time::sleep(Duration::from_millis(30)).await;
            log.lock().unwrap().push("slow:end");
        });
        let fast = locks.run_exclusive("u1", || async {
            log.lock().unwrap().push("fast:start");
            log.lock().unwrap().push("fast:end");
        });
        tokio::join!(slow, fast);

        assert_eq!(
            *log.lock().unwrap(),
            vec!["slow:start", "slow:end", "fast:start", "fast:end"]
        );
        assert_eq!(locks.active_slots(), 0);
    }

    #[tokio::test]
    async fn different_users_do_not_block_each_other() {
        let locks = UserLocks::new();
        let (release_tx, release_rx) = oneshot::channel::<()>();
        let other_done = AtomicUsize::new(0);

        let blocked = locks.run_exclusive("u1", || async {
            release_rx.await.ok();
        });
        let other = async {
            locks
                .run_exclusive("u2", || async {
                    other_done.fetch_add(1, Ordering::SeqCst);
                })
                .await;
            // u1 still holds its slot at this point
            assert_eq!(locks.active_slots(), 1);
            release_tx.send(()).ok();
        };
        tokio::join!(blocked, other);

        assert_eq!(other_done.load(Ordering::SeqCst), 1);
        assert_eq!(locks.active_slots(), 0);
    }

    #[tokio::test]
    async fn failure_releases_the_slot() {
        let locks = UserLocks::new();
        let failed: Result<(), &str> = locks.run_exclusive("u1", || async { Err("boom") }).await;
        assert_eq!(failed, Err("boom"));

        let value = tokio::time::timeout(
            Duration::from_secs(1),
            locks.run_exclusive("u1", || async { 7 }),
        )
        .await
        .expect("slot was not released");
        assert_eq!(value, 7);
        assert_eq!(locks.active_slots(), 0);
    }

    #[tokio::test]
    async fn dropped_waiter_keeps_queue_moving() {
        let locks = UserLocks::new();
        let (release_tx, release_rx) = oneshot::channel::<()>();

        let holder = locks.run_exclusive("u1", || async {
            release_rx.await.ok();
            "holder"
        });
        let abandoned = tokio::time::timeout(
            Duration::from_millis(10),
            locks.run_exclusive("u1", || async { "abandoned" }),
        );
        let last = async {
            let abandoned = abandoned.await;
            assert!(abandoned.is_err());
            release_tx.send(()).ok();
            locks.run_exclusive("u1", || async { "last" }).await
        };

        let (holder, last) = tokio::join!(holder, last);
        assert_eq!(holder, "holder");
        assert_eq!(last, "last");
        assert_eq!(locks.active_slots(), 0);
    }
}
