use crate::error::{SyncError, SyncResult};
use crate::retry::{RetryPolicy, retry_transient};
use crate::store::is_transient;
use async_trait::async_trait;
use aws_sdk_sts::config::Region;
use aws_sdk_sts::error::DisplayErrorContext;
use tracing::debug;

#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn current_account(&self) -> SyncResult<String>;
}

/// Resolves the account id through the caller identity, once per run. The
/// value is passed down to the loader and engine rather than cached in
/// process-wide state.
pub struct StsIdentityResolver {
    client: aws_sdk_sts::Client,
    retry: RetryPolicy
}

impl StsIdentityResolver {
    pub async fn connect(
        retry: RetryPolicy,
        region: Option<String>,
        endpoint: Option<String>
    ) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(Region::new(region));
        }
        let config = loader.load().await;

        let mut builder = aws_sdk_sts::config::Builder::from(&config)
            .retry_config(aws_sdk_sts::config::retry::RetryConfig::disabled());
        if let Some(endpoint) = endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        Self {
            client: aws_sdk_sts::Client::from_conf(builder.build()),
            retry
        }
    }
}

#[async_trait]
impl IdentityResolver for StsIdentityResolver {
    async fn current_account(&self) -> SyncResult<String> {
        let response = retry_transient(&self.retry, "get_caller_identity", is_transient, || {
            self.client.get_caller_identity().send()
        })
        .await
        .map_err(|e| SyncError::Identity(format!("{}", DisplayErrorContext(&e))))?;

        let account = response
            .account()
            .ok_or_else(|| SyncError::Identity("response carried no account id".to_string()))?;

        debug!(account, "Resolved caller account");
        Ok(account.to_string())
    }
}

/// Decides the account used for scoping: `None` when filtering is off, the
/// override when supplied, otherwise one resolver lookup.
pub async fn resolve_account(
    filter_enabled: bool,
    override_account: Option<String>,
    resolver: &dyn IdentityResolver
) -> SyncResult<Option<String>> {
    if !filter_enabled {
        return Ok(None);
    }
    if let Some(account) = override_account {
        return Ok(Some(account));
    }
    Ok(Some(resolver.current_account().await?))
}
