use anyhow::Context;
use clap::Parser;
use inkmark::api::RenderApi;
use inkmark::config::Config;
use inkmark::identity::IdentityResolver;
use inkmark::render::RenderService;
use inkmark::server::RenderServer;
use inkmark::watermark::WatermarkProvider;
use std::path::PathBuf;

/// Inkmark - watermarking render service for stored PDFs and images
#[derive(Parser, Debug)]
#[command(name = "inkmark")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Validate configuration and exit
    #[arg(long)]
    test: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = run(args).await {
        tracing::error!(error = format!("{:#}", e), "Inkmark exited with error");
        eprintln!("inkmark: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = Config::from_file(&args.config)
        .map_err(anyhow::Error::msg)
        .with_context(|| format!("Failed to load configuration from {}", args.config.display()))?;
    config
        .validate()
        .map_err(anyhow::Error::msg)
        .context("Invalid configuration")?;

    inkmark::logging::init_subscriber(config.server.log_format)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging subsystem: {}", e))?;

    tracing::info!(
        config_file = %args.config.display(),
        server_address = %config.server.address,
        server_port = config.server.port,
        storage_backend = ?config.storage.backend,
        jwt_enabled = config.identity.jwt.is_some(),
        directory_enabled = config.identity.directory.is_some(),
        "Configuration loaded successfully"
    );

    if args.test {
        tracing::info!("Configuration test passed");
        return Ok(());
    }

    let store = inkmark::store::connect(&config.storage)
        .await
        .context("Failed to initialize object store")?;
    let identity = IdentityResolver::from_config(&config.identity)?;
    let provider = WatermarkProvider::new(config.watermark.clone())?;
    let service = RenderService::new(store, identity, provider, config.render.clone());
    let api = RenderApi::new(service, &config.server);

    let server = RenderServer::new(api, &config.server);
    tracing::info!(address = %server.address(), "Starting Inkmark render service");
    server.run().await.context("Server failed")?;

    Ok(())
}
