//! Candidate broker pod discovery.

use std::collections::BTreeMap;

use async_trait::async_trait;
use error_stack::Report;
use error_stack::ResultExt;
use k8s_openapi::api::core::v1::Pod;
use kube::api::ListParams;
use kube::Api;
use kube::Client;
use tracing::debug;

use crate::k8s::QueryError;

/// A pod volume backed by a persistent volume claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimBinding {
    pub volume_name: String,
    pub claim_name: String,
}

/// A pod matching the caller's filters, before broker id and claim validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Candidate {
    pub pod_name: String,
    pub namespace: String,
    /// `None` while the pod is not yet scheduled.
    pub node_name: Option<String>,
    pub labels: BTreeMap<String, String>,
    /// Claim-backed volumes in declaration order.
    pub claims: Vec<ClaimBinding>,
}

impl From<Pod> for Candidate {
    fn from(pod: Pod) -> Self {
        let metadata = pod.metadata;
        let spec = pod.spec.unwrap_or_default();

        let claims = spec
            .volumes
            .unwrap_or_default()
            .into_iter()
            .filter_map(|volume| {
                volume.persistent_volume_claim.map(|pvc| ClaimBinding {
                    volume_name: volume.name,
                    claim_name: pvc.claim_name,
                })
            })
            .collect();

        Self {
            pod_name: metadata.name.unwrap_or_default(),
            namespace: metadata.namespace.unwrap_or_default(),
            node_name: spec.node_name.filter(|node| !node.is_empty()),
            labels: metadata.labels.unwrap_or_default(),
            claims,
        }
    }
}

/// Source of candidate pods.
#[async_trait]
pub trait PodLocator: Send + Sync {
    /// List every pod in `namespace` matching `label_selector`.
    ///
    /// Both filters are handed to the backend verbatim.
    ///
    /// # Errors
    ///
    /// - [`QueryError::ListFailed`] if the pods cannot be listed
    async fn list(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<Candidate>, Report<QueryError>>;
}

/// [`PodLocator`] backed by the Kubernetes API server.
#[derive(Clone)]
pub struct KubePodLocator {
    client: Client,
}

impl KubePodLocator {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PodLocator for KubePodLocator {
    #[tracing::instrument(skip(self))]
    async fn list(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<Candidate>, Report<QueryError>> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let params = ListParams::default().labels(label_selector);

        let pods = api
            .list(&params)
            .await
            .change_context(QueryError::ListFailed {
                namespace: namespace.to_string(),
                selector: label_selector.to_string(),
            })?;

        debug!(count = pods.items.len(), "Listed pods");

        Ok(pods.items.into_iter().map(Candidate::from).collect())
    }
}
