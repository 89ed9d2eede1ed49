use clap::Parser;
use skpack_server::PackageStore;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "skpack-server", about = "Reference package repository for skpack")]
struct Cli {
    /// Port to listen on.
    #[arg(long, default_value_t = 7577)]
    port: u16,

    /// Address to bind.
    #[arg(long, default_value = "0.0.0.0")]
    bind: String,

    /// Directory to store packages and the metadata index.
    #[arg(long, default_value = "./skpack-repository")]
    data_dir: PathBuf,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = fs::create_dir_all(&cli.data_dir) {
        error!("failed to create data directory {}: {e}", cli.data_dir.display());
        return ExitCode::FAILURE;
    }

    let addr = format!("{}:{}", cli.bind, cli.port);
    info!("starting skpack-server on {addr} (API under /api)");
    info!("data directory: {}", cli.data_dir.display());

    let store = match PackageStore::new(cli.data_dir) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!("failed to open package store: {e}");
            return ExitCode::FAILURE;
        }
    };
    match skpack_server::run_server(&store, &addr) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("server error: {e}");
            ExitCode::FAILURE
        }
    }
}
