use crate::error::{SyncError, SyncResult};
use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};

/// Hard ceiling the store imposes on names per bulk delete call.
pub const DELETE_BATCH_CEILING: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncOptions {
    /// Account id used for document inclusion and key normalization.
    /// `None` disables account scoping entirely.
    #[serde(default)]
    pub account: Option<String>,

    /// Names per bulk delete call, kept below the store ceiling.
    #[serde(default = "default_delete_batch_size")]
    pub delete_batch_size: usize,

    /// Tally changes without writing to the store.
    #[serde(default)]
    pub dry_run: bool,

    #[serde(default = "default_retry_policy")]
    pub retry: RetryPolicy
}

fn default_delete_batch_size() -> usize {
    8
}

fn default_retry_policy() -> RetryPolicy {
    RetryPolicy::default()
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            account: None,
            delete_batch_size: default_delete_batch_size(),
            dry_run: false,
            retry: default_retry_policy()
        }
    }
}

impl SyncOptions {
    pub fn validate(&self) -> SyncResult<()> {
        if self.delete_batch_size == 0 || self.delete_batch_size > DELETE_BATCH_CEILING {
            return Err(SyncError::Config(format!(
                "delete_batch_size must be between 1 and {DELETE_BATCH_CEILING}, got {}",
                self.delete_batch_size
            )));
        }
        if self.retry.max_attempts == 0 {
            return Err(SyncError::Config(
                "retry.max_attempts must be at least 1".to_string()
            ));
        }
        Ok(())
    }
}
