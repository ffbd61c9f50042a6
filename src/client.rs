//! The boundary to the remote service.
//!
//! The mapping layer does no I/O. A [`RemoteClient`] implementation owns the
//! transport; [`read_state`] and [`write_plan`] glue it to the converters and
//! report every failure into a [`Diagnostics`] collector.
//!
//! # Example
//!
//! ```ignore
//! use hemmer_segment_state::client::{read_state, RemoteClient};
//! use hemmer_segment_state::resources::SourceResource;
//!
//! let mut diagnostics = Diagnostics::new();
//! let state = read_state::<SourceResource, _>(&client, "src_1", prior.as_ref(), &mut diagnostics).await;
//! ```

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::convert::ConvertContext;
use crate::diagnostics::Diagnostics;
use crate::error::ClientError;
use crate::resource::Resource;

/// Reads and writes one resource kind on the remote service.
#[async_trait]
pub trait RemoteClient<R: Resource>: Send + Sync
where
    R::Remote: Send,
{
    /// Read the resource with the given id.
    async fn read(&self, id: &str) -> Result<R::Remote, ClientError>;

    /// Create or update the resource, returning the service's view of it.
    async fn write(&self, remote: R::Remote) -> Result<R::Remote, ClientError>;
}

/// Read a resource and fill its state.
///
/// When `prior` is given, the fresh state is reconciled against it so that
/// semantically equal payloads keep their prior text. Returns `None` on any
/// failure; a resource that no longer exists also yields a warning.
pub async fn read_state<R, C>(
    client: &C,
    id: &str,
    prior: Option<&R::State>,
    diagnostics: &mut Diagnostics,
) -> Option<R::State>
where
    R: Resource,
    R::Remote: Send,
    C: RemoteClient<R> + ?Sized,
{
    debug!(resource = R::TYPE_NAME, id, "reading remote resource");
    let remote = match client.read(id).await {
        Ok(remote) => remote,
        Err(e) if e.is_not_found() => {
            warn!(resource = R::TYPE_NAME, id, "remote resource not found");
            diagnostics.warning(
                format!("{} not found", R::TYPE_NAME),
                format!("{} '{}' no longer exists on the remote service", R::TYPE_NAME, id),
            );
            return None;
        },
        Err(e) => {
            diagnostics.push(e.to_diagnostic(format!("Unable to read {}", R::TYPE_NAME)));
            return None;
        },
    };

    let fresh = match R::fill(&remote) {
        Ok(state) => state,
        Err(e) => {
            diagnostics.push_error(e);
            return None;
        },
    };

    Some(match prior {
        Some(prior) => R::reconcile(prior, fresh),
        None => fresh,
    })
}

/// Convert a plan, write it, and fill state from the service's response.
///
/// Nothing is sent when the conversion fails or reports any error, even an
/// error for a skipped collection element.
pub async fn write_plan<R, C>(
    client: &C,
    plan: &R::Plan,
    diagnostics: &mut Diagnostics,
) -> Option<R::State>
where
    R: Resource,
    R::Remote: Send,
    C: RemoteClient<R> + ?Sized,
{
    let remote = R::to_remote(plan, &mut ConvertContext::new(diagnostics));
    let remote = match remote {
        Some(remote) if !diagnostics.has_error() => remote,
        _ => {
            debug!(resource = R::TYPE_NAME, "conversion failed, not writing");
            return None;
        },
    };

    let written = match client.write(remote).await {
        Ok(written) => written,
        Err(e) => {
            diagnostics.push(e.to_diagnostic(format!("Unable to write {}", R::TYPE_NAME)));
            return None;
        },
    };

    match R::fill(&written) {
        Ok(state) => Some(state),
        Err(e) => {
            diagnostics.push_error(e);
            None
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api;
    use crate::diagnostics::DiagnosticSeverity;
    use crate::json::JsonPayload;
    use crate::resources::{LabelResource, WarehouseResource};
    use crate::testing::{assert_error_at, assert_error_contains, plan_from_json};
    use crate::value::Value;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct InMemoryLabels {
        labels: Mutex<HashMap<String, api::Label>>,
        writes: Mutex<usize>,
    }

    #[async_trait]
    impl RemoteClient<LabelResource> for InMemoryLabels {
        async fn read(&self, id: &str) -> Result<api::Label, ClientError> {
            self.labels
                .lock()
                .unwrap()
                .get(id)
                .cloned()
                .ok_or_else(|| ClientError::NotFound(format!("label {}", id)))
        }

        async fn write(&self, remote: api::Label) -> Result<api::Label, ClientError> {
            *self.writes.lock().unwrap() += 1;
            if remote.key.is_empty() {
                return Err(ClientError::InvalidRequest("key must not be empty".to_string()));
            }
            let id = format!("{}:{}", remote.key, remote.value);
            self.labels.lock().unwrap().insert(id, remote.clone());
            Ok(remote)
        }
    }

    struct FixedWarehouse(api::Warehouse);

    #[async_trait]
    impl RemoteClient<WarehouseResource> for FixedWarehouse {
        async fn read(&self, _id: &str) -> Result<api::Warehouse, ClientError> {
            Ok(self.0.clone())
        }

        async fn write(&self, _remote: api::Warehouse) -> Result<api::Warehouse, ClientError> {
            Err(ClientError::Unavailable("maintenance".to_string()))
        }
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let client = InMemoryLabels::default();
        let plan = plan_from_json::<LabelResource>(json!({"key": "env", "value": "prod"}));

        let mut diagnostics = Diagnostics::new();
        let written = write_plan::<LabelResource, _>(&client, &plan, &mut diagnostics).await.unwrap();
        assert!(diagnostics.is_empty());
        assert_eq!(written.key, Value::known("env".to_string()));

        let read = read_state::<LabelResource, _>(&client, "env:prod", None, &mut diagnostics)
            .await
            .unwrap();
        assert_eq!(read, written);
    }

    #[tokio::test]
    async fn test_failed_conversion_is_not_written() {
        let client = InMemoryLabels::default();
        let mut plan = plan_from_json::<LabelResource>(json!({"value": "prod"}));
        plan.key = Value::Unknown;

        let mut diagnostics = Diagnostics::new();
        let written = write_plan::<LabelResource, _>(&client, &plan, &mut diagnostics).await;
        assert!(written.is_none());
        assert_error_at(&diagnostics, "key");
        assert_eq!(*client.writes.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_client_errors_become_diagnostics() {
        let client = InMemoryLabels::default();
        let plan = plan_from_json::<LabelResource>(json!({"value": "prod"}));

        let mut diagnostics = Diagnostics::new();
        assert!(write_plan::<LabelResource, _>(&client, &plan, &mut diagnostics).await.is_none());
        assert_error_contains(&diagnostics, "Unable to write segment_label");
        assert_eq!(*client.writes.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_missing_resource_is_a_warning() {
        let client = InMemoryLabels::default();
        let mut diagnostics = Diagnostics::new();
        let state = read_state::<LabelResource, _>(&client, "nope", None, &mut diagnostics).await;
        assert!(state.is_none());
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics.as_slice()[0].severity, DiagnosticSeverity::Warning);
    }

    #[tokio::test]
    async fn test_read_reconciles_with_prior_state() {
        let remote = api::Warehouse {
            id: "wh_1".to_string(),
            enabled: true,
            settings: Some(serde_json::Map::from_iter([("a".to_string(), json!(1))])),
            ..Default::default()
        };
        let client = FixedWarehouse(remote.clone());

        let mut prior = crate::resources::warehouse::fill_warehouse(&remote).unwrap();
        prior.settings = JsonPayload::from(Value::known(r#"{ "a": 1.0 }"#.to_string()));

        let mut diagnostics = Diagnostics::new();
        let state = read_state::<WarehouseResource, _>(&client, "wh_1", Some(&prior), &mut diagnostics)
            .await
            .unwrap();
        assert_eq!(state.settings, prior.settings);

        let plan = WarehouseResource::to_plan(&state).unwrap();
        assert!(write_plan::<WarehouseResource, _>(&client, &plan, &mut diagnostics).await.is_none());
        assert_error_contains(&diagnostics, "maintenance");
    }
}
