//! Per-project async locks.
//!
//! Serializes the read-check-call-write sequences of one project inside
//! this process (acceptance, funding, release, submission). Cross-process
//! safety comes from the row locks taken by the store; this layer keeps two
//! requests from both calling the payment processor for the same project.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

#[derive(Default)]
pub struct ProjectLocks {
    slots: Mutex<HashMap<Uuid, Weak<AsyncMutex<()>>>>,
}

/// Held for the duration of a project operation.
pub struct ProjectGuard {
    _guard: OwnedMutexGuard<()>,
}

impl ProjectLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, project_id: Uuid) -> ProjectGuard {
        let slot = {
            let mut slots = self.slots.lock();
            slots.retain(|_, weak| weak.strong_count() > 0);
            match slots.get(&project_id).and_then(Weak::upgrade) {
                Some(slot) => slot,
                None => {
                    let slot = Arc::new(AsyncMutex::new(()));
                    slots.insert(project_id, Arc::downgrade(&slot));
                    slot
                }
            }
        };

        ProjectGuard {
            _guard: slot.lock_owned().await,
        }
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.slots
            .lock()
            .values()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_project_is_serialized() {
        let locks = Arc::new(ProjectLocks::new());
        let id = Uuid::new_v4();

        let guard = locks.acquire(id).await;
        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _g = locks.acquire(id).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn different_projects_do_not_block() {
        let locks = ProjectLocks::new();
        let _a = locks.acquire(Uuid::new_v4()).await;
        let _b = tokio::time::timeout(Duration::from_millis(50), locks.acquire(Uuid::new_v4()))
            .await
            .expect("second project lock should be free");
    }

    #[tokio::test]
    async fn released_slots_are_dropped() {
        let locks = ProjectLocks::new();
        {
            let _g = locks.acquire(Uuid::new_v4()).await;
            assert_eq!(locks.tracked(), 1);
        }
        assert_eq!(locks.tracked(), 0);
    }
}
