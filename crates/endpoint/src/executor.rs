//! Bounded concurrency for handler dispatch.

use {
    std::sync::Arc,
    tokio::sync::{OwnedSemaphorePermit, Semaphore},
};

/// Caps the number of concurrently running dispatches.
///
/// An executor may be shared by several polling endpoints to bound dispatch
/// concurrency process-wide.
pub struct DispatchExecutor {
    semaphore: Arc<Semaphore>,
}

impl DispatchExecutor {
    #[must_use]
    pub fn new(max_concurrency: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrency.max(1))),
        }
    }

    /// Wait for a dispatch slot. The slot is released when the permit drops.
    pub async fn acquire(&self) -> Option<OwnedSemaphorePermit> {
        // The semaphore is never closed, so this only returns `None` if that
        // invariant is ever broken; dispatch then proceeds unbounded.
        Arc::clone(&self.semaphore).acquire_owned().await.ok()
    }

    #[must_use]
    pub fn available_slots(&self) -> usize {
        self.semaphore.available_permits()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn permits_are_released_on_drop() {
        let executor = DispatchExecutor::new(2);
        let first = executor.acquire().await;
        let second = executor.acquire().await;
        assert_eq!(executor.available_slots(), 0);
        drop(first);
        drop(second);
        assert_eq!(executor.available_slots(), 2);
    }
}
