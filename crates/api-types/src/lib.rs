//! Shared API type definitions
//!
//! This crate contains the result records produced by the volume statistics
//! reader, kept separate so that consumers (exporters, dashboards, scripts)
//! can deserialize them without pulling in the Kubernetes client stack.

use serde::Deserialize;
use serde::Serialize;

/// Usage of the persistent volume backing a single broker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeStats {
    /// Pod name
    pub pod: String,
    /// Node the pod is scheduled on
    pub node: String,
    /// Broker id taken from the pod's broker id label
    pub broker_id: u64,
    /// Name of the persistent volume claim mounted by the broker
    pub persistent_volume_claim: String,
    /// Bytes still available on the volume
    pub available_bytes: u64,
    /// Total capacity of the volume in bytes
    pub capacity_bytes: u64,
    /// Bytes in use on the volume
    pub used_bytes: u64,
}

impl VolumeStats {
    /// Used bytes as a percentage of capacity, `None` for a zero-capacity volume.
    pub fn used_percent(&self) -> Option<f64> {
        if self.capacity_bytes == 0 {
            return None;
        }
        Some(self.used_bytes as f64 / self.capacity_bytes as f64 * 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(capacity_bytes: u64, used_bytes: u64) -> VolumeStats {
        VolumeStats {
            pod: "broker-1".to_string(),
            node: "node-a".to_string(),
            broker_id: 101,
            persistent_volume_claim: "broker-1-claim".to_string(),
            available_bytes: capacity_bytes - used_bytes,
            capacity_bytes,
            used_bytes,
        }
    }

    #[test]
    fn used_percent_of_capacity() {
        assert_eq!(stats(1000, 400).used_percent(), Some(40.0));
        assert_eq!(stats(0, 0).used_percent(), None);
    }

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_value(stats(1000, 400)).unwrap();
        assert_eq!(json["brokerId"], 101);
        assert_eq!(json["persistentVolumeClaim"], "broker-1-claim");
        assert_eq!(json["availableBytes"], 600);
    }
}
