//! Subset of the kubelet `stats/summary` document (`stats/v1alpha1`).
//!
//! Only the parts needed to correlate volumes back to claims are modelled;
//! everything else in the payload (cpu, memory, network, containers) is ignored.

use serde::Deserialize;

/// Statistics for one node and every pod scheduled on it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    #[serde(default)]
    pub node: NodeStats,
    #[serde(default)]
    pub pods: Vec<PodStats>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeStats {
    #[serde(default)]
    pub node_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodStats {
    pub pod_ref: PodReference,
    #[serde(default, rename = "volume")]
    pub volume_stats: Vec<VolumeStatsEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PodReference {
    pub name: String,
    pub namespace: String,
    #[serde(default)]
    pub uid: String,
}

/// Filesystem usage of one mounted volume.
///
/// The kubelet omits counters it could not collect, so all three are optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeStatsEntry {
    pub name: String,
    /// Set only for volumes backed by a persistent volume claim.
    #[serde(default)]
    pub pvc_ref: Option<PvcReference>,
    #[serde(default)]
    pub capacity_bytes: Option<u64>,
    #[serde(default)]
    pub available_bytes: Option<u64>,
    #[serde(default)]
    pub used_bytes: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PvcReference {
    pub name: String,
    pub namespace: String,
}

impl VolumeStatsEntry {
    /// Whether this entry belongs to claim `name` in `namespace`.
    pub fn is_claim(&self, namespace: &str, name: &str) -> bool {
        self.pvc_ref
            .as_ref()
            .is_some_and(|pvc| pvc.namespace == namespace && pvc.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_kubelet_payload() {
        let payload = r#"{
            "node": {
                "nodeName": "node-a",
                "cpu": {"time": "2024-01-01T00:00:00Z", "usageNanoCores": 1},
                "fs": {"capacityBytes": 1, "availableBytes": 1, "usedBytes": 0}
            },
            "pods": [{
                "podRef": {"name": "broker-1", "namespace": "test-ns", "uid": "abc"},
                "startTime": "2024-01-01T00:00:00Z",
                "containers": [],
                "volume": [
                    {
                        "time": "2024-01-01T00:00:00Z",
                        "name": "broker-1-local",
                        "pvcRef": {"name": "broker-1-claim", "namespace": "test-ns"},
                        "capacityBytes": 1000,
                        "availableBytes": 600,
                        "usedBytes": 400,
                        "inodes": 10
                    },
                    {"name": "kube-api-access", "capacityBytes": 100}
                ]
            }]
        }"#;

        let summary: Summary = serde_json::from_str(payload).unwrap();

        assert_eq!(summary.node.node_name, "node-a");
        assert_eq!(summary.pods.len(), 1);
        let volumes = &summary.pods[0].volume_stats;
        assert_eq!(
            volumes[0],
            VolumeStatsEntry {
                name: "broker-1-local".to_string(),
                pvc_ref: Some(PvcReference {
                    name: "broker-1-claim".to_string(),
                    namespace: "test-ns".to_string(),
                }),
                capacity_bytes: Some(1000),
                available_bytes: Some(600),
                used_bytes: Some(400),
            }
        );
        assert_eq!(volumes[1].pvc_ref, None);
        assert_eq!(volumes[1].used_bytes, None);
    }

    #[test]
    fn pod_without_volumes() {
        let summary: Summary =
            serde_json::from_str(r#"{"pods": [{"podRef": {"name": "p", "namespace": "n"}}]}"#)
                .unwrap();
        assert!(summary.pods[0].volume_stats.is_empty());
    }
}
