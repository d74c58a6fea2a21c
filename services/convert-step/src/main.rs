//! Conversion job step.
//!
//! Works out which slice of the simulation this cycle covers, stages the
//! model output files for that slice, renders the conversion tool's
//! config, runs the tool and archives its logs.

mod config;
mod logs;
mod publish;
mod step;
mod template;
mod tool;

use anyhow::Result;
use chrono::Local;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use config::ConvertArgs;

/// Names this run's config and log files.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = ConvertArgs::parse();

    // Initialize tracing
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);
    if args.log_json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }

    info!("Conversion step starting");
    let timestamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
    info!(timestamp = %timestamp, "Using timestamp");

    let exit_code = step::run_step(&args, &timestamp).await?;
    std::process::exit(exit_code);
}
