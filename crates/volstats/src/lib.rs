//! Broker volume statistics for Kafka-style clusters on Kubernetes.
//!
//! [`VolumeStatsReader::get`] lists the broker pods matching a label selector
//! and reports, per broker, the capacity and usage of its persistent volume as
//! seen by the kubelet of the broker's node.

pub mod config;
pub mod identity;
pub mod k8s;
pub mod output;
pub mod reader;

pub use api_types::VolumeStats;
pub use config::ReaderConfig;
pub use k8s::QueryError;
pub use reader::VolumeStatsReader;
