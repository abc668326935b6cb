use std::path::PathBuf;

use ::tracing::{error, info_span};
use clap::Parser;
use service::Service;

mod blobs;
mod config;
mod http_objects;
mod integration_test;
mod metrics;
mod payload;
mod routes;
mod service;
mod tracing;
use tracing::setup_tracing;

#[cfg(test)]
mod testing;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[arg(short, long, value_name = "config file", help = "Path to config file")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = match config::ServerConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error loading config: {:?}", err);
            std::process::exit(1);
        }
    };

    setup_tracing(&config);

    let root_span = info_span!("blobgate", backend = %config.blob_storage.kind());
    let _guard = root_span.enter();

    let service = match Service::new(config).await {
        Ok(service) => service,
        Err(err) => {
            error!("Error creating service: {:?}", err);
            std::process::exit(1);
        }
    };
    if let Err(err) = service.start().await {
        error!("Error starting service: {:?}", err);
        std::process::exit(1);
    }
}
