use crate::error::{SyncError, SyncResult};
use crate::retry::{RetryPolicy, retry_transient};
use async_trait::async_trait;
use aws_sdk_ssm::Client;
use aws_sdk_ssm::config::Region;
use aws_sdk_ssm::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_ssm::types::ParameterType;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Capability interface over the hierarchical parameter store. The engine
/// only talks to this trait; tests swap in an in-memory implementation.
#[async_trait]
pub trait ParameterStore: Send + Sync {
    /// Upsert with overwrite. Returns the stored version.
    async fn put(&self, name: &str, value: &str) -> SyncResult<i64>;

    /// Recursive listing under `root`, paginating until the cursor is
    /// exhausted.
    async fn get_by_path(&self, root: &str) -> SyncResult<Vec<RemoteParameter>>;

    /// Best-effort bulk delete. Callers chunk `names` to the store
    /// ceiling; names the store could not resolve come back in the
    /// outcome instead of failing the call.
    async fn delete_many(&self, names: &[String]) -> SyncResult<DeleteOutcome>;

    /// Single delete. Not-found is success: returns `false` when nothing
    /// existed under the name.
    async fn delete(&self, name: &str) -> SyncResult<bool>;
}

/// Entry as reported by the store (authoritative current state).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteParameter {
    pub name: String,
    pub value: String
}

#[derive(Debug, Clone, Default)]
pub struct DeleteOutcome {
    pub deleted: Vec<String>,
    pub unresolved: Vec<String>
}

/// SSM Parameter Store gateway. SDK-level retries are disabled; every
/// call runs under the injected policy so attempts stay bounded and
/// observable in one place.
pub struct SsmParameterStore {
    client: Client,
    retry: RetryPolicy
}

impl SsmParameterStore {
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

        let mut builder = aws_sdk_ssm::config::Builder::from(&config)
            .retry_config(aws_sdk_ssm::config::retry::RetryConfig::disabled());
        if let Some(endpoint) = endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        Self {
            client: Client::from_conf(builder.build()),
            retry
        }
    }
}

#[async_trait]
impl ParameterStore for SsmParameterStore {
    async fn put(&self, name: &str, value: &str) -> SyncResult<i64> {
        let response = retry_transient(&self.retry, "put_parameter", is_transient, || {
            self.client
                .put_parameter()
                .name(name)
                .value(value)
                .r#type(ParameterType::String)
                .overwrite(true)
                .send()
        })
        .await
        .map_err(|e| SyncError::StoreWrite {
            name: name.to_string(),
            reason: format!("{}", DisplayErrorContext(&e))
        })?;

        debug!(name, version = response.version(), "Wrote parameter");
        Ok(response.version())
    }

    async fn get_by_path(&self, root: &str) -> SyncResult<Vec<RemoteParameter>> {
        let mut parameters = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let token = next_token.clone();
            let response =
                retry_transient(&self.retry, "get_parameters_by_path", is_transient, || {
                    self.client
                        .get_parameters_by_path()
                        .path(root)
                        .recursive(true)
                        .set_next_token(token.clone())
                        .send()
                })
                .await
                .map_err(|e| SyncError::StoreRead(format!("{}", DisplayErrorContext(&e))))?;

            for parameter in response.parameters() {
                let Some(name) = parameter.name() else {
                    continue;
                };
                parameters.push(RemoteParameter {
                    name: name.to_string(),
                    value: parameter.value().unwrap_or_default().to_string()
                });
            }

            next_token = response.next_token().map(ToString::to_string);
            if next_token.is_none() {
                break;
            }
        }

        debug!(root, count = parameters.len(), "Listed parameters");
        Ok(parameters)
    }

    async fn delete_many(&self, names: &[String]) -> SyncResult<DeleteOutcome> {
        if names.is_empty() {
            return Ok(DeleteOutcome::default());
        }

        let response = retry_transient(&self.retry, "delete_parameters", is_transient, || {
            self.client
                .delete_parameters()
                .set_names(Some(names.to_vec()))
                .send()
        })
        .await
        .map_err(|e| SyncError::StoreDelete(format!("{}", DisplayErrorContext(&e))))?;

        let outcome = DeleteOutcome {
            deleted: response.deleted_parameters().to_vec(),
            unresolved: response.invalid_parameters().to_vec()
        };

        if !outcome.unresolved.is_empty() {
            warn!(
                unresolved = ?outcome.unresolved,
                "Bulk delete could not resolve some names"
            );
        }

        Ok(outcome)
    }

    async fn delete(&self, name: &str) -> SyncResult<bool> {
        let result = retry_transient(&self.retry, "delete_parameter", is_transient, || {
            self.client.delete_parameter().name(name).send()
        })
        .await;

        match result {
            Ok(_) => Ok(true),
            Err(e) => {
                let not_found = e
                    .as_service_error()
                    .map(|service| service.is_parameter_not_found())
                    .unwrap_or(false);
                if not_found {
                    debug!(name, "Parameter already absent");
                    Ok(false)
                } else {
                    Err(SyncError::StoreDelete(format!(
                        "{}",
                        DisplayErrorContext(&e)
                    )))
                }
            }
        }
    }
}

/// Timeouts, connection failures, and throttling-class service codes are
/// worth another attempt; everything else surfaces immediately.
pub(crate) fn is_transient<E>(err: &SdkError<E>) -> bool
where
    E: ProvideErrorMetadata
{
    match err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            true
        }
        SdkError::ServiceError(context) => matches!(
            context.err().code(),
            Some(
                "ThrottlingException"
                    | "InternalServerError"
                    | "ServiceUnavailable"
                    | "TooManyUpdates"
            )
        ),
        _ => false
    }
}
