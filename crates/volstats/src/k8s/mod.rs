//! Kubernetes integration module.
//!
//! Broker pods are found through the API server and their volume usage is read
//! from the kubelet `stats/summary` endpoint of the node they run on, reached
//! through the API server's node proxy.
//!
//! The main components are:
//! - [`PodLocator`]: lists candidate broker pods by namespace and label selector
//! - [`NodeStatsSource`]: fetches a node's full statistics [`Summary`]
//! - [`NodeStatsCorrelator`]: finds the volume entry belonging to a claim

use core::error::Error;
use std::path::PathBuf;
use std::time::Duration;

pub mod kube_client;
pub mod node_stats;
pub mod pod_locator;
pub mod summary;

pub use node_stats::find_claim_volume;
pub use node_stats::ClaimUsage;
pub use node_stats::KubeletProxy;
pub use node_stats::NodeStatsCorrelator;
pub use node_stats::NodeStatsSource;
pub use pod_locator::Candidate;
pub use pod_locator::ClaimBinding;
pub use pod_locator::KubePodLocator;
pub use pod_locator::PodLocator;
pub use summary::Summary;

/// Errors that can occur while setting up the Kubernetes client.
#[derive(Debug, derive_more::Display)]
pub enum KubernetesError {
    #[display("Failed to load kubeconfig {}", path.display())]
    Kubeconfig { path: PathBuf },
    #[display("Failed to set up Kubernetes client")]
    ClientSetup,
}

impl Error for KubernetesError {}

/// Failures that abort a whole volume statistics query.
#[derive(Debug, derive_more::Display)]
pub enum QueryError {
    #[display("Failed to list pods in namespace {namespace} with selector {selector:?}")]
    ListFailed { namespace: String, selector: String },
    #[display("Listing pods timed out after {timeout:?}")]
    Timeout { timeout: Duration },
    #[display("Query cancelled")]
    Cancelled,
}

impl Error for QueryError {}

/// Per-node statistics failures. These only disqualify the affected pod.
#[derive(Debug, derive_more::Display)]
pub enum StatsError {
    #[display("Failed to query stats summary of node {node}")]
    ProxyError { node: String },
    #[display("Could not find PersistentVolumeClaim {claim}")]
    NotFound { claim: String },
    #[display("Stats for PersistentVolumeClaim {claim} are missing byte counters")]
    IncompleteStats { claim: String },
}

impl Error for StatsError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let list_failed = QueryError::ListFailed {
            namespace: "kafka".to_string(),
            selector: "cluster=foo".to_string(),
        };
        assert_eq!(
            list_failed.to_string(),
            "Failed to list pods in namespace kafka with selector \"cluster=foo\""
        );

        let not_found = StatsError::NotFound {
            claim: "broker-1-claim".to_string(),
        };
        assert_eq!(
            not_found.to_string(),
            "Could not find PersistentVolumeClaim broker-1-claim"
        );

        let proxy_error = StatsError::ProxyError {
            node: "node-a".to_string(),
        };
        assert_eq!(
            proxy_error.to_string(),
            "Failed to query stats summary of node node-a"
        );
    }
}
