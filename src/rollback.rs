use anyhow::{Context, Result};

use crate::retry::RetryPolicy;
use crate::store::{ObjectStore, StoreContext};

/// The store's per-call limit for batch deletion.
pub const DELETE_BATCH_LIMIT: usize = 1000;

/// Delete previously uploaded destination keys, in bounded batches.
///
/// Purely additive over the recorded `uploaded_paths` — the archive is never
/// re-read. Transient delete failures are retried per batch; a batch that
/// still fails aborts the rollback with the failing batch in context.
pub async fn rollback(
    store: &dyn ObjectStore,
    ctx: &StoreContext,
    uploaded_paths: &[String],
) -> Result<()> {
    if uploaded_paths.is_empty() {
        return Ok(());
    }

    let policy = RetryPolicy::default();
    let total_batches = uploaded_paths.len().div_ceil(DELETE_BATCH_LIMIT);

    for (index, batch) in uploaded_paths.chunks(DELETE_BATCH_LIMIT).enumerate() {
        policy
            .run("Rollback delete batch", || async {
                store.delete_batch(&ctx.bucket, batch).await
            })
            .await
            .with_context(|| {
                format!("Failed to roll back batch {}/{total_batches}", index + 1)
            })?;

        log::info!(
            "Rolled back {} object(s) (batch {}/{total_batches})",
            batch.len(),
            index + 1
        );
    }

    Ok(())
}
