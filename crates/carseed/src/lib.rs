//! 🚗 carseed synthesizes car listings forever and ships them to an ingestion endpoint
//! in batches, without ever letting a slow or dead receiver stall the production line.
//!
//! The interesting part is [`dispatcher::Dispatcher`]. Everything else is plumbing.

pub mod app_config;
pub mod backends;
pub mod common;
pub mod dispatcher;
pub mod errors;
pub mod generator;
pub mod stats;
mod supervisors;

use std::future::Future;

use anyhow::Result;
use tracing::{info, warn};

use crate::app_config::AppConfig;
use crate::stats::StatisticsSnapshot;
use crate::supervisors::Supervisor;

/// 🚀 Run until Ctrl-C, then drain the buffer and return the final numbers.
pub async fn run(app_config: AppConfig) -> Result<StatisticsSnapshot> {
    run_until(app_config, async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("🛑 Ctrl-C received"),
            Err(err) => {
                // -- 💀 no signal handler means no graceful exit; keep shipping until killed
                warn!(
                    "⚠️ Could not listen for Ctrl-C ({}). Running until the process is killed.",
                    err
                );
                std::future::pending::<()>().await;
            }
        }
    })
    .await
}

/// 🧵 Same as [`run`], with a caller-provided shutdown signal.
pub async fn run_until<F>(app_config: AppConfig, shutdown_signal: F) -> Result<StatisticsSnapshot>
where
    F: Future<Output = ()>,
{
    Supervisor::new(app_config).run(shutdown_signal).await
}
