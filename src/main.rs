use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use privy_pin::config::Config;
use privy_pin::{http, BatchStatus, InMemorySpatialStore, PinRepository};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("privy_pin=info,tower_http=info")),
        )
        .init();

    let config = Config::parse();
    let store = InMemorySpatialStore::with_cell_size(config.grid_cell);
    let repo = Arc::new(PinRepository::new(store));

    if let Some(path) = &config.seed {
        let json = match tokio::fs::read_to_string(path).await {
            Ok(json) => json,
            Err(err) => {
                error!(path = %path.display(), error = %err, "cannot read seed file");
                return ExitCode::FAILURE;
            }
        };
        match repo.seed_from_json(&json) {
            Ok(outcome) => {
                let loaded = outcome.created().count();
                if outcome.status() == BatchStatus::AllSucceeded {
                    info!(loaded, "seeded pins");
                } else {
                    for (index, err) in outcome.failures() {
                        warn!(index, error = %err, "seed entry rejected");
                    }
                    info!(loaded, "seeded pins with rejections");
                }
            }
            Err(err) => {
                error!(path = %path.display(), error = %err, "invalid seed file");
                return ExitCode::FAILURE;
            }
        }
    }

    let shutdown = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "ctrl-c handler unavailable");
            std::future::pending::<()>().await;
        }
        info!("shutting down");
    };

    match http::serve(repo, &config.addr(), shutdown).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(addr = %config.addr(), error = %err, "server error");
            ExitCode::FAILURE
        }
    }
}
