//! Transactional wrapping around a poll cycle.

use async_trait::async_trait;

/// A transactional boundary opened before each poll cycle and closed after
/// it: commit when every attempt succeeded, rollback when the cycle
/// surfaced an unrecovered error.
#[async_trait]
pub trait TransactionBoundary: Send + Sync {
    async fn begin(&self) -> anyhow::Result<()>;
    async fn commit(&self) -> anyhow::Result<()>;
    async fn rollback(&self) -> anyhow::Result<()>;
}
