use clap::Parser;
use sattrack::{
    actors::{
        aggregator::AggregatorHandle,
        ingest::{IngestHandle, IngestSettings},
        registry::EntityRegistry,
    },
    broker,
    config::{Config, read_config_file},
    util::get_config_path,
};
use tracing::{debug, info, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file (defaults to $SATTRACK_CONFIG or ./sattrack.json)
    #[arg(short)]
    file: Option<String>,

    /// Log every record instead of batches only
    #[arg(short, long)]
    verbose: bool,
}

fn init(verbose: bool) {
    let level = if verbose {
        LevelFilter::TRACE
    } else {
        LevelFilter::INFO
    };

    let filter = filter::Targets::new().with_targets(vec![("sattrack", level)]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let args = Args::parse();
    init(args.verbose);
    trace!("started with args: {args:?}");

    let path = args.file.unwrap_or_else(get_config_path);
    let mut config = read_config_file(&path)?;
    config.apply_env_overrides();

    run(config).await
}

async fn run(config: Config) -> anyhow::Result<()> {
    let aggregator = AggregatorHandle::spawn(config.routing.aggregation_address());
    let registry = EntityRegistry::new(aggregator.clone(), &config.routing.base_address);

    let source = broker::from_config(&config.broker)?;
    info!("ingesting from {}", source.describe());

    let ingest = IngestHandle::spawn(source, registry.clone(), IngestSettings::from(&config));

    #[cfg(feature = "api")]
    if let Some(settings) = &config.api {
        use sattrack::api::{ApiConfig, ApiState, spawn_api_server};

        let state = ApiState::new(registry.clone(), Some(ingest.clone()));
        spawn_api_server(ApiConfig::from(settings), state).await?;
    }

    tokio::signal::ctrl_c().await?;
    info!("shutting down");

    let stats = ingest.shutdown().await?;
    debug!("ingest stopped: {stats:?}");

    aggregator.shutdown().await;
    info!(
        "stopped after routing {} records to {} entities",
        stats.records_routed, stats.entities
    );

    Ok(())
}
