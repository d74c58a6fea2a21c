//! Organise step.
//!
//! Moves converted output from `<cycle date>/<component>/` into
//! `<mip table>/<variable>/` for the concatenation window and writes the
//! concatenation setup config.

mod concat;

use std::path::PathBuf;

use anyhow::Result;
use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser};
use staging::{transpose, RemovalPolicy, TracingObserver};
use suite_common::TimeWindow;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use concat::ConcatenationSetup;

#[derive(Parser, Debug, Clone)]
#[command(name = "organise-files")]
#[command(about = "Reorganise converted output for concatenation")]
#[command(args_override_self = true)]
struct Args {
    /// First year of the concatenation window
    #[arg(long, env = "START_YEAR")]
    start_year: i32,

    /// Cycle directories up to 1 January of this year are included
    #[arg(long, env = "END_YEAR")]
    end_year: i32,

    /// Reference year for concatenation
    #[arg(long, env = "REF_YEAR")]
    ref_year: i32,

    /// Where the conversion tool wrote its output
    #[arg(long, env = "MIP_CONVERT_OUT_DIR")]
    mip_convert_out_dir: PathBuf,

    /// Destination of the reorganised files
    #[arg(long, env = "STAGING_DIR")]
    staging_dir: PathBuf,

    /// Where concatenation writes its final output
    #[arg(long, env = "OUTPUT_DIR")]
    output_dir: PathBuf,

    /// Processing directory
    #[arg(long, env = "PROC_DIR")]
    proc_dir: PathBuf,

    /// Sizing file for concatenation
    #[arg(long, env = "SIZING_FILE")]
    sizing_file: PathBuf,

    /// Stream being organised
    #[arg(long, env = "STREAM")]
    stream: String,

    /// Task database the concatenation setup writes
    #[arg(long, env = "TASK_DB_PATH")]
    task_db_path: PathBuf,

    /// Where to write the concatenation setup config
    #[arg(long, env = "CONCAT_CFG_PATH")]
    concat_cfg_path: PathBuf,

    /// Give up after this many directories fail to be removed
    #[arg(long, env = "MAX_REMOVAL_FAILURES", default_value = "3")]
    max_removal_failures: usize,

    /// Search the staging location recursively
    #[arg(
        long,
        action = ArgAction::Set,
        default_value = "true",
        value_parser = BoolishValueParser::new()
    )]
    recursive: bool,

    /// Calendar recorded in the concatenation setup
    #[arg(long, default_value = ConcatenationSetup::DEFAULT_CALENDAR)]
    calendar: String,

    /// Ask concatenation for JSON output
    #[arg(
        long,
        action = ArgAction::Set,
        default_value = "false",
        value_parser = BoolishValueParser::new()
    )]
    json: bool,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

impl Args {
    fn window(&self) -> TimeWindow {
        TimeWindow::from_years(self.start_year, self.end_year)
    }

    fn concatenation_setup(&self) -> ConcatenationSetup {
        ConcatenationSetup {
            sizing_file: self.sizing_file.clone(),
            staging_location: self.staging_dir.clone(),
            output_location: self.output_dir.clone(),
            reference_year: self.ref_year,
            start_year: self.start_year,
            end_year: self.end_year,
            recursive: self.recursive,
            output_file: self.task_db_path.clone(),
            calendar: self.calendar.clone(),
            json: self.json,
        }
    }
}

/// Organise the files and return the process exit code.
fn run(args: &Args) -> Result<i32> {
    info!(
        stream = %args.stream,
        start_year = args.start_year,
        end_year = args.end_year,
        proc_dir = %args.proc_dir.display(),
        "Organising files"
    );

    let observer = TracingObserver;
    let policy = RemovalPolicy::new(args.max_removal_failures);
    match transpose(
        &args.mip_convert_out_dir,
        &args.staging_dir,
        &args.window(),
        policy,
        &observer,
    ) {
        Ok(report) => info!(
            moved = report.files_moved,
            removed = report.removal.removed,
            removal_failures = report.removal.failures,
            "Transpose complete"
        ),
        Err(e) => {
            error!(kind = e.kind(), error = %e, "Transpose of data files failed");
            return Ok(1);
        }
    }

    args.concatenation_setup().write(&args.concat_cfg_path)?;
    info!("Organise files complete");
    Ok(0)
}

fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

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

    let exit_code = run(&args)?;
    std::process::exit(exit_code);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use test_utils::{converted_filename, entry_names, temp_test_dir, ConvertedOutputTree};

    fn args_for(tree: &ConvertedOutputTree, scratch: &std::path::Path, extra: &[&str]) -> Args {
        let path = |p: &str| scratch.join(p).display().to_string();
        let mut argv = vec![
            "organise-files".to_string(),
            "--start-year".to_string(), "1850".to_string(),
            "--end-year".to_string(), "1860".to_string(),
            "--ref-year".to_string(), "1850".to_string(),
            "--mip-convert-out-dir".to_string(), tree.root().display().to_string(),
            "--staging-dir".to_string(), path("staging"),
            "--output-dir".to_string(), path("output"),
            "--proc-dir".to_string(), path("proc"),
            "--sizing-file".to_string(), path("sizing.json"),
            "--stream".to_string(), "ap5".to_string(),
            "--task-db-path".to_string(), path("proc/tasks.db"),
            "--concat-cfg-path".to_string(), path("proc/mip_concatenate_setup.cfg"),
        ];
        argv.extend(extra.iter().map(|s| s.to_string()));
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let tree = ConvertedOutputTree::new();
        let scratch = temp_test_dir();
        let args = args_for(&tree, scratch.path(), &[]);
        assert_eq!(args.max_removal_failures, 3);
        assert!(args.recursive);
        assert!(!args.json);
        assert_eq!(args.calendar, "360_day");
    }

    #[test]
    fn test_run_organises_and_writes_config() {
        let tree = ConvertedOutputTree::new();
        tree.add("1850-01-01", "atmos", &converted_filename("tas", "Amon", "185001-185412"));
        tree.add("1855-01-01", "atmos", &converted_filename("tas", "Amon", "185501-185912"));
        let scratch = temp_test_dir();
        let args = args_for(&tree, scratch.path(), &[]);

        assert_eq!(run(&args).unwrap(), 0);

        assert_eq!(entry_names(&scratch.path().join("staging/Amon/tas")).len(), 2);
        assert!(entry_names(tree.root()).is_empty());
        let config = fs::read_to_string(scratch.path().join("proc/mip_concatenate_setup.cfg")).unwrap();
        assert!(config.contains("reference_year = 1850\n"));
        assert!(config.contains(&format!("output_file = {}", scratch.path().join("proc/tasks.db").display())));
    }

    #[test]
    fn test_removal_failures_exit_one_without_config() {
        let tree = ConvertedOutputTree::new();
        tree.add("1850-01-01", "atmos", "leftover.log");
        tree.add("1851-01-01", "atmos", "leftover.log");
        let scratch = temp_test_dir();
        let args = args_for(&tree, scratch.path(), &["--max-removal-failures", "2"]);

        assert_eq!(run(&args).unwrap(), 1);
        assert!(!scratch.path().join("proc/mip_concatenate_setup.cfg").exists());
    }

    #[test]
    fn test_missing_output_dir_exits_one() {
        let scratch = temp_test_dir();
        let tree = ConvertedOutputTree::new();
        let mut args = args_for(&tree, scratch.path(), &[]);
        args.mip_convert_out_dir = scratch.path().join("absent");

        assert_eq!(run(&args).unwrap(), 1);
    }
}
