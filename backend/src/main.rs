use std::{fs::File, path::PathBuf};

use anyhow::Context;
use clap::Parser;
use import::{RowPolicy, import_csv};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};
use votes::{config::Config, open_log, start_server};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// CSV file to import, one `userId,action,target` row per vote
    #[arg(long)]
    import: Option<PathBuf>,

    /// Redis URL, overrides REDIS_URL
    #[arg(long)]
    redis: Option<String>,

    /// Log and skip malformed import rows instead of stopping at the first one
    #[arg(long)]
    skip_malformed: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let args = Args::parse();

    let mut config = Config::load()?;
    if let Some(redis_url) = args.redis {
        config.redis_url = redis_url;
    }

    info!("Connecting to {}", config.redis_url);
    let log = open_log(&config.redis_url).await?;

    if let Some(path) = args.import {
        let file = File::open(&path).with_context(|| format!("Could not open {path:?}"))?;
        let policy = if args.skip_malformed {
            RowPolicy::Skip
        } else {
            RowPolicy::Abort
        };

        let report = import_csv(log.as_ref(), file, policy).await?;
        info!(
            "Imported {} rows, skipped {}",
            report.imported, report.skipped
        );

        return Ok(());
    }

    start_server(config, log).await?;

    Ok(())
}
