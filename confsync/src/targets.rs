use crate::error::{SyncError, SyncResult};
use crate::store::ParameterStore;
use tracing::debug;

/// Scope holding one parameter per deployment namespace, each valued with
/// the store root that namespace deploys under.
pub const DEPLOY_TARGETS_ROOT: &str = "/confsync/deploy-targets";

/// Fallback entry consulted when a namespace has no dedicated target.
pub const DEFAULT_TARGET: &str = "default";

/// Resolves the store root for a deployment namespace.
///
/// An exact entry under [`DEPLOY_TARGETS_ROOT`] wins. Otherwise the
/// `default` entry is treated as a shared base and the namespace is
/// appended to it. A namespace with neither mapping is a configuration
/// error, reported before anything is written.
pub async fn resolve_target_root(
    store: &dyn ParameterStore,
    namespace: &str
) -> SyncResult<String> {
    let targets = store.get_by_path(DEPLOY_TARGETS_ROOT).await?;

    let exact = format!("{DEPLOY_TARGETS_ROOT}/{namespace}");
    if let Some(target) = targets.iter().find(|parameter| parameter.name == exact) {
        debug!(namespace, root = %target.value, "Resolved dedicated deploy target");
        return Ok(target.value.clone());
    }

    let fallback = format!("{DEPLOY_TARGETS_ROOT}/{DEFAULT_TARGET}");
    if let Some(target) = targets.iter().find(|parameter| parameter.name == fallback) {
        let root = format!("{}/{namespace}", target.value);
        debug!(namespace, root = %root, "Resolved deploy target from default");
        return Ok(root);
    }

    Err(SyncError::TargetNotConfigured(namespace.to_string()))
}
