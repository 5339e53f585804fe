//! 🚀 carseed-cli: the front door, the bouncer, the maitre d' of carseed.
//!
//! 🎬 *[narrator voice]* "It all started with a simple main() function..."
//! 📦 This binary crate is the thin CLI wrapper that loads config,
//! sets up logging, and then lets the real code do the heavy lifting.
//! Like a manager. 🦆

use std::path::PathBuf;

use anyhow::{Context, Result};
use carseed::stats::StatisticsSnapshot;
use clap::Parser;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table, presets::NOTHING};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// 🚗 Generates car listings and ships them to an ingestion endpoint in batches.
#[derive(Parser, Debug)]
#[command(name = "carseed", version, about)]
struct Cli {
    /// 🔧 TOML config file. Missing file = env vars (CARSEED_*) and defaults only.
    #[arg(default_value = "carseed.toml", env = "CARSEED_CONFIG")]
    config: PathBuf,
}

/// 🚀 main(), where it all begins.
///
/// 🔧 Steps:
/// 1. Init tracing (so we can see what goes wrong, and when)
/// 2. Parse args
/// 3. Load config (the moment of truth)
/// 4. Ship cars until Ctrl-C, then drain
/// 5. Print the scoreboard, or explain what broke
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    // 🔒 A missing file is allowed, an unreadable path is not
    let config_file_exists = cli.config.try_exists().with_context(|| {
        format!(
            "💀 Couldn't check whether the configuration file exists. Permissions? A cursed mount? Was checking here: '{}'",
            cli.config.display()
        )
    })?;
    let config_file = if config_file_exists {
        Some(cli.config.as_path())
    } else {
        info!(
            "🔧 No config file at '{}', running on CARSEED_* env vars and defaults",
            cli.config.display()
        );
        None
    };

    let app_config = carseed::app_config::load_config(config_file)
        .context("💀 In carseed-cli, main, we couldn't load the configuration. Check the file and the CARSEED_* env vars.")?;

    match carseed::run(app_config).await {
        Ok(statistics) => {
            println!("{}", render_summary(&statistics));
            Ok(())
        }
        Err(err) => {
            // -- 📡 an unreachable receiver never lands here: delivery failures are retried, not returned
            error!("💀 error: {}", err);
            for cause in err.chain().skip(1) {
                error!("⚠️  cause: {}", cause);
            }
            std::process::exit(1);
        }
    }
}

/// 🍽️ The final scoreboard, two columns, no borders.
fn render_summary(statistics: &StatisticsSnapshot) -> Table {
    let mut table = Table::new();
    table.load_preset(NOTHING);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    let rows = [
        ("delivered", format!("{} cars", statistics.delivered)),
        ("failed attempts", format!("{} cars", statistics.failed)),
        ("rate", format!("~{:.0} cars/min", statistics.rate_per_minute)),
        ("elapsed", format!("{:.1}s", statistics.elapsed.as_secs_f64())),
    ];
    for (label, value) in rows {
        table.add_row(vec![
            Cell::new(label).set_alignment(CellAlignment::Right),
            Cell::new(value).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}
