use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use clap::ValueEnum;
use utils::version;

use crate::identity::BROKER_ID_LABEL;

/// Report how full each broker's persistent volume is.
#[derive(Parser, Debug, Clone)]
#[command(version = &**version::VERSION)]
pub struct Cli {
    #[arg(
        short,
        long,
        env = "VOLSTATS_NAMESPACE",
        default_value = "default",
        help = "Namespace the broker pods run in"
    )]
    pub namespace: String,

    #[arg(
        short = 'l',
        long,
        env = "VOLSTATS_SELECTOR",
        help = "Label selector matching the broker pods, e.g. cluster=foo"
    )]
    pub selector: String,

    #[arg(
        long,
        env = "KUBECONFIG",
        value_hint = clap::ValueHint::FilePath,
        help = "Path to kubeconfig file (uses in-cluster or ~/.kube/config when unset)"
    )]
    pub kubeconfig: Option<PathBuf>,

    #[arg(
        long,
        env = "VOLSTATS_BROKER_ID_LABEL",
        default_value = BROKER_ID_LABEL,
        help = "Pod label holding the integer broker id"
    )]
    pub broker_id_label: String,

    #[arg(
        long,
        default_value = "1",
        value_parser = clap::value_parser!(u16).range(1..),
        help = "Number of node stats requests in flight at once"
    )]
    pub concurrency: u16,

    #[arg(
        long,
        default_value = "30",
        value_parser = clap::value_parser!(u64).range(1..),
        help = "Timeout in seconds for listing pods and for each node stats request"
    )]
    pub request_timeout_secs: u64,

    #[arg(
        long,
        help = "Fetch each node's stats summary at most once per query",
        default_value_t = false,
        action = clap::ArgAction::Set
    )]
    pub cache_node_stats: bool,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    pub output: OutputFormat,

    #[arg(
        long,
        env = "VOLSTATS_LOG_FILE",
        value_hint = clap::ValueHint::FilePath,
        help = "Also write JSON logs to this file, e.g. /logs/volstats.log"
    )]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

/// Tunables of [`crate::VolumeStatsReader`].
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Pod label holding the broker id.
    pub broker_id_label: String,
    /// Maximum node stats requests in flight. `1` processes pods strictly one after another.
    pub concurrency: usize,
    /// Applied separately to the pod listing and to every node stats request.
    pub request_timeout: Duration,
    /// Reuse a node's summary for all its pods within one query.
    pub cache_node_stats: bool,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            broker_id_label: BROKER_ID_LABEL.to_string(),
            concurrency: 1,
            request_timeout: Duration::from_secs(30),
            cache_node_stats: false,
        }
    }
}

impl From<&Cli> for ReaderConfig {
    fn from(cli: &Cli) -> Self {
        Self {
            broker_id_label: cli.broker_id_label.clone(),
            concurrency: usize::from(cli.concurrency).max(1),
            request_timeout: Duration::from_secs(cli.request_timeout_secs),
            cache_node_stats: cli.cache_node_stats,
        }
    }
}
