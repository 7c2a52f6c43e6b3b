//! Retention of live result files.

use tracing::{debug, info, warn};

use crate::error::StorageResult;
use crate::result_store::ResultStore;

/// How many live results may accumulate before a sweep trims them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Sweep only when more than this many live results exist
    pub max_results: usize,
    /// Newest results kept after a sweep
    pub keep_results: usize,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_results: 100,
            keep_results: 50,
        }
    }
}

/// Delete all but the newest live results once the store exceeds the policy.
///
/// Returns the number of files removed. Individual delete failures are logged
/// and skipped; only a failure to list the directory is an error.
pub async fn sweep_live_results(store: &ResultStore, policy: &RetentionPolicy) -> StorageResult<usize> {
    let names = store.list_live_artifacts().await?;
    if names.len() <= policy.max_results {
        debug!(count = names.len(), max = policy.max_results, "Live results within retention");
        return Ok(0);
    }

    let excess = names.len().saturating_sub(policy.keep_results);
    let mut deleted = 0;
    for name in names.iter().take(excess) {
        match store.delete(name).await {
            Ok(()) => deleted += 1,
            Err(e) => warn!(name = %name, error = %e, "Failed to delete live result"),
        }
    }

    metrics::counter!("vtryon_artifacts_deleted_total").increment(deleted as u64);
    info!(
        found = names.len(),
        deleted,
        kept = names.len() - deleted,
        "Swept live results"
    );
    Ok(deleted)
}
