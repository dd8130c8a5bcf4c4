//! Node statistics fetching and claim correlation.
//!
//! There is no pod-level API for volume usage. Instead the kubelet of the node
//! a pod runs on reports usage for every volume of every pod on that node, and
//! the entry of interest is picked out by its claim reference. This needs
//! `get` permission on `nodes/proxy`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use error_stack::Report;
use error_stack::ResultExt;
use kube::Client;
use tokio::sync::Mutex;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::k8s::summary::Summary;
use crate::k8s::summary::VolumeStatsEntry;
use crate::k8s::StatsError;

/// Byte counters of a matched claim volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimUsage {
    pub capacity_bytes: u64,
    pub available_bytes: u64,
    pub used_bytes: u64,
}

impl VolumeStatsEntry {
    /// Counters of this entry, `None` if the kubelet left any of them out.
    pub fn usage(&self) -> Option<ClaimUsage> {
        Some(ClaimUsage {
            capacity_bytes: self.capacity_bytes?,
            available_bytes: self.available_bytes?,
            used_bytes: self.used_bytes?,
        })
    }
}

/// Source of per-node statistics snapshots.
#[async_trait]
pub trait NodeStatsSource: Send + Sync {
    /// Fetch the full statistics summary of `node_name`.
    ///
    /// # Errors
    ///
    /// - [`StatsError::ProxyError`] on transport failure, non-2xx responses or
    ///   an unparseable payload
    async fn fetch_summary(&self, node_name: &str) -> Result<Summary, Report<StatsError>>;
}

/// [`NodeStatsSource`] reading the kubelet summary through the API server node proxy.
#[derive(Clone)]
pub struct KubeletProxy {
    client: Client,
}

impl KubeletProxy {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn summary_path(node_name: &str) -> String {
        format!("/api/v1/nodes/{node_name}/proxy/stats/summary")
    }
}

/// Parse a raw kubelet summary body.
pub fn parse_summary(node_name: &str, body: &str) -> Result<Summary, Report<StatsError>> {
    serde_json::from_str(body)
        .change_context(StatsError::ProxyError {
            node: node_name.to_string(),
        })
        .attach_printable("Malformed stats summary payload")
}

#[async_trait]
impl NodeStatsSource for KubeletProxy {
    #[tracing::instrument(skip(self))]
    async fn fetch_summary(&self, node_name: &str) -> Result<Summary, Report<StatsError>> {
        let proxy_error = || StatsError::ProxyError {
            node: node_name.to_string(),
        };

        let request = http::Request::get(Self::summary_path(node_name))
            .body(Vec::new())
            .change_context_lazy(proxy_error)?;

        let body = self
            .client
            .request_text(request)
            .await
            .change_context_lazy(proxy_error)?;

        debug!(bytes = body.len(), "Fetched stats summary");

        parse_summary(node_name, &body)
    }
}

/// Find the volume entry of claim `claim_name` in `namespace`.
///
/// Every volume of every pod in the snapshot is scanned and the first entry
/// whose claim reference matches both fields exactly is returned.
///
/// # Errors
///
/// - [`StatsError::NotFound`] if no entry references the claim
pub fn find_claim_volume<'a>(
    summary: &'a Summary,
    namespace: &str,
    claim_name: &str,
) -> Result<&'a VolumeStatsEntry, Report<StatsError>> {
    summary
        .pods
        .iter()
        .flat_map(|pod| pod.volume_stats.iter())
        .find(|volume| volume.is_claim(namespace, claim_name))
        .ok_or_else(|| {
            Report::new(StatsError::NotFound {
                claim: claim_name.to_string(),
            })
            .attach_printable(format!(
                "Node {} reports no volume for claim {namespace}/{claim_name}",
                summary.node.node_name
            ))
        })
}

type SnapshotCell = Arc<OnceCell<Arc<Summary>>>;

/// Resolves claim usage for the candidates of a single query.
///
/// With snapshot caching enabled each node is fetched at most once for the
/// lifetime of the correlator. A failed fetch leaves the node uncached, so the
/// next candidate on that node issues its own request and records its own error.
pub struct NodeStatsCorrelator<'a, S: ?Sized> {
    source: &'a S,
    snapshots: Option<Mutex<HashMap<String, SnapshotCell>>>,
}

impl<'a, S> NodeStatsCorrelator<'a, S>
where
    S: NodeStatsSource + ?Sized,
{
    pub fn new(source: &'a S, cache_snapshots: bool) -> Self {
        Self {
            source,
            snapshots: cache_snapshots.then(|| Mutex::new(HashMap::new())),
        }
    }

    async fn snapshot(&self, node_name: &str) -> Result<Arc<Summary>, Report<StatsError>> {
        let Some(snapshots) = &self.snapshots else {
            return self.source.fetch_summary(node_name).await.map(Arc::new);
        };

        let cell = snapshots
            .lock()
            .await
            .entry(node_name.to_string())
            .or_default()
            .clone();

        cell.get_or_try_init(|| async {
            self.source.fetch_summary(node_name).await.map(Arc::new)
        })
        .await
        .cloned()
    }

    /// Usage of claim `claim_name` in `namespace`, read from `node_name`.
    ///
    /// # Errors
    ///
    /// - [`StatsError::ProxyError`] if the node snapshot cannot be fetched
    /// - [`StatsError::NotFound`] if the snapshot has no entry for the claim
    /// - [`StatsError::IncompleteStats`] if the entry lacks a byte counter
    pub async fn claim_usage(
        &self,
        node_name: &str,
        namespace: &str,
        claim_name: &str,
    ) -> Result<ClaimUsage, Report<StatsError>> {
        let summary = self.snapshot(node_name).await?;
        let volume = find_claim_volume(&summary, namespace, claim_name)?;

        volume.usage().ok_or_else(|| {
            Report::new(StatsError::IncompleteStats {
                claim: claim_name.to_string(),
            })
        })
    }
}
