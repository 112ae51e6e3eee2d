//! Reconciles YAML configuration trees into the AWS SSM Parameter Store.
//!
//! Documents under a config directory are flattened into path-scoped
//! string parameters, diffed against a snapshot of the store, then
//! applied: changed values written, orphaned names deleted in batches,
//! matching values left alone. Runs are idempotent and scoped to the
//! roots the loaded documents define.

pub mod config;
pub mod document;
pub mod error;
pub mod identity;
pub mod loader;
pub mod reconcile;
pub mod retry;
pub mod splitter;
pub mod store;
pub mod targets;

pub use config::{SyncOptions, DELETE_BATCH_CEILING};
pub use error::{SyncError, SyncResult};
pub use identity::{resolve_account, IdentityResolver, StsIdentityResolver};
pub use loader::{validate_store_root, ConfigGroup, ConfigLoader, FlattenedEntry};
pub use reconcile::{ReconcileEngine, ReconcileReport};
pub use retry::RetryPolicy;
pub use splitter::{split_at_depth, FilteredConfigGroup};
pub use store::{DeleteOutcome, ParameterStore, RemoteParameter, SsmParameterStore};
pub use targets::resolve_target_root;
