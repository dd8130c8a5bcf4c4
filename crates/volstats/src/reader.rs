//! Broker volume statistics query.
//!
//! Brokers cannot be asked for their disk usage directly. The reader lists the
//! broker pods, works out each pod's broker id and claim, and reads the claim's
//! usage from the kubelet of the pod's node.

use api_types::VolumeStats;
use error_stack::Report;
use futures::stream;
use futures::StreamExt;
use kube::Client;
use tokio::select;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::config::ReaderConfig;
use crate::identity::extract_broker_id;
use crate::identity::extract_claim_name;
use crate::identity::IdentityError;
use crate::k8s::Candidate;
use crate::k8s::KubePodLocator;
use crate::k8s::KubeletProxy;
use crate::k8s::NodeStatsCorrelator;
use crate::k8s::NodeStatsSource;
use crate::k8s::PodLocator;
use crate::k8s::QueryError;
use crate::k8s::StatsError;

/// Why a candidate pod was left out of the results.
#[derive(Debug)]
pub(crate) enum SkipReason {
    Identity(Report<IdentityError>),
    Unscheduled,
    Stats(Report<StatsError>),
}

impl SkipReason {
    /// Stable name of the failure kind, used as the `reason` log field.
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Self::Identity(report) => match report.current_context() {
                IdentityError::MissingLabel { .. } => "missing_label",
                IdentityError::InvalidFormat { .. } => "invalid_format",
                IdentityError::NoClaimVolume => "no_claim_volume",
            },
            Self::Unscheduled => "unscheduled",
            Self::Stats(report) => match report.current_context() {
                StatsError::ProxyError { .. } => "proxy_error",
                StatsError::NotFound { .. } => "not_found",
                StatsError::IncompleteStats { .. } => "incomplete_stats",
            },
        }
    }
}

/// Reads the volume usage of broker pods.
pub struct VolumeStatsReader<L, S> {
    locator: L,
    stats_source: S,
    config: ReaderConfig,
}

impl VolumeStatsReader<KubePodLocator, KubeletProxy> {
    /// Reader talking to the cluster behind `client`.
    pub fn from_client(client: Client, config: ReaderConfig) -> Self {
        Self::new(
            KubePodLocator::new(client.clone()),
            KubeletProxy::new(client),
            config,
        )
    }
}

impl<L, S> VolumeStatsReader<L, S>
where
    L: PodLocator,
    S: NodeStatsSource,
{
    pub fn new(locator: L, stats_source: S, config: ReaderConfig) -> Self {
        Self {
            locator,
            stats_source,
            config,
        }
    }

    pub fn stats_source(&self) -> &S {
        &self.stats_source
    }

    /// Volume usage of every broker pod in `namespace` matching `label_selector`.
    ///
    /// Pods that are not usable brokers, or whose node cannot report the
    /// volume, are logged and left out. The order of the results is unspecified.
    ///
    /// # Errors
    ///
    /// - [`QueryError::ListFailed`] or [`QueryError::Timeout`] if the pods cannot be listed
    pub async fn get(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<VolumeStats>, Report<QueryError>> {
        self.get_with_cancellation(namespace, label_selector, &CancellationToken::new())
            .await
    }

    /// Same as [`Self::get`], stopping early once `cancellation_token` fires.
    ///
    /// Cancellation while listing pods fails with [`QueryError::Cancelled`];
    /// cancellation while reading node stats returns the results gathered so far.
    #[tracing::instrument(skip(self, cancellation_token))]
    pub async fn get_with_cancellation(
        &self,
        namespace: &str,
        label_selector: &str,
        cancellation_token: &CancellationToken,
    ) -> Result<Vec<VolumeStats>, Report<QueryError>> {
        let candidates = select! {
            biased;
            _ = cancellation_token.cancelled() => {
                return Err(Report::new(QueryError::Cancelled));
            }
            listed = timeout(
                self.config.request_timeout,
                self.locator.list(namespace, label_selector),
            ) => match listed {
                Ok(candidates) => candidates?,
                Err(_) => {
                    return Err(Report::new(QueryError::Timeout {
                        timeout: self.config.request_timeout,
                    }));
                }
            }
        };

        info!(candidates = candidates.len(), "Found candidate pods");

        let correlator =
            NodeStatsCorrelator::new(&self.stats_source, self.config.cache_node_stats);

        let mut pending = stream::iter(&candidates)
            .map(|candidate| self.process_candidate(candidate, namespace, &correlator))
            .buffer_unordered(self.config.concurrency.max(1));

        let mut results = Vec::with_capacity(candidates.len());
        loop {
            let next = select! {
                biased;
                _ = cancellation_token.cancelled() => {
                    warn!(
                        completed = results.len(),
                        "Query cancelled, returning partial results"
                    );
                    break;
                }
                next = pending.next() => next,
            };

            match next {
                Some(Some(volume)) => results.push(volume),
                Some(None) => {}
                None => break,
            }
        }

        info!(volumes = results.len(), "Collected broker volume stats");
        Ok(results)
    }

    async fn process_candidate(
        &self,
        candidate: &Candidate,
        namespace: &str,
        correlator: &NodeStatsCorrelator<'_, S>,
    ) -> Option<VolumeStats> {
        match self.correlate(candidate, namespace, correlator).await {
            Ok(volume) => {
                debug!(
                    pod = %candidate.pod_name,
                    broker_id = volume.broker_id,
                    claim = %volume.persistent_volume_claim,
                    "Correlated broker volume"
                );
                Some(volume)
            }
            Err(skip) => {
                let error = match &skip {
                    SkipReason::Identity(report) => format!("{report:?}"),
                    SkipReason::Unscheduled => "pod is not scheduled on a node".to_string(),
                    SkipReason::Stats(report) => format!("{report:?}"),
                };
                warn!(
                    pod = %candidate.pod_name,
                    namespace = %candidate.namespace,
                    reason = skip.kind(),
                    %error,
                    "Skipping pod"
                );
                None
            }
        }
    }

    async fn correlate(
        &self,
        candidate: &Candidate,
        namespace: &str,
        correlator: &NodeStatsCorrelator<'_, S>,
    ) -> Result<VolumeStats, SkipReason> {
        let broker_id = extract_broker_id(candidate, &self.config.broker_id_label)
            .map_err(SkipReason::Identity)?;
        let claim_name = extract_claim_name(candidate).map_err(SkipReason::Identity)?;
        let node_name = candidate
            .node_name
            .as_deref()
            .ok_or(SkipReason::Unscheduled)?;

        let usage = timeout(
            self.config.request_timeout,
            correlator.claim_usage(node_name, namespace, claim_name),
        )
        .await
        .map_err(|_| {
            SkipReason::Stats(
                Report::new(StatsError::ProxyError {
                    node: node_name.to_string(),
                })
                .attach_printable(format!(
                    "Timed out after {:?}",
                    self.config.request_timeout
                )),
            )
        })?
        .map_err(SkipReason::Stats)?;

        Ok(VolumeStats {
            pod: candidate.pod_name.clone(),
            node: node_name.to_string(),
            broker_id,
            persistent_volume_claim: claim_name.to_string(),
            available_bytes: usage.available_bytes,
            capacity_bytes: usage.capacity_bytes,
            used_bytes: usage.used_bytes,
        })
    }
}
