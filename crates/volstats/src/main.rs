use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use utils::version;
use volstats::config::Cli;
use volstats::config::OutputFormat;
use volstats::k8s::kube_client::init_kube_client;
use volstats::output;
use volstats::ReaderConfig;
use volstats::VolumeStatsReader;

/// Sets up global panic hooks.
fn setup_global_hooks() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        default_hook(panic_info);
        tracing::error!("Thread panicked: {}", panic_info);
    }));
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_global_hooks();

    let cli = Cli::parse();
    let _guard = utils::logging::init(cli.log_file.as_ref())?;

    tracing::info!("Starting volstats {}", &**version::VERSION);

    let client = init_kube_client(cli.kubeconfig.as_deref())
        .await
        .map_err(|e| anyhow::anyhow!("Failed to initialize Kubernetes client: {e:?}"))?;

    let reader = VolumeStatsReader::from_client(client, ReaderConfig::from(&cli));

    let cancellation_token = CancellationToken::new();
    let ctrl_c_token = cancellation_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, cancelling query");
            ctrl_c_token.cancel();
        }
    });

    let volumes = reader
        .get_with_cancellation(&cli.namespace, &cli.selector, &cancellation_token)
        .await
        .map_err(|e| anyhow::anyhow!("{e:?}"))?;

    match cli.output {
        OutputFormat::Table => print!("{}", output::render_table(&volumes)),
        OutputFormat::Json => println!("{}", output::render_json(&volumes)?),
    }

    Ok(())
}
