//! Conversion step configuration.
//!
//! Every argument can also be set through the environment variable the
//! workflow scheduler exports for the task.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser};
use staging::{StageMode, StreamTable};
use suite_common::{Calendar, CalendarDate, Offset};

#[derive(Parser, Debug, Clone)]
#[command(name = "convert-step")]
#[command(about = "Stage model output for one cycle and run the conversion tool on it")]
#[command(args_override_self = true)]
pub struct ConvertArgs {
    /// Model component; selects the config template `mip_convert.cfg.<component>`
    #[arg(long, env = "COMPONENT")]
    pub component: String,

    /// Stream to process, e.g. ap4 or onm
    #[arg(long, env = "STREAM")]
    pub stream: String,

    /// Suite name; the run id is its last five characters
    #[arg(long, env = "SUITE_NAME")]
    pub suite_name: String,

    /// Cycle duration, e.g. P1Y
    #[arg(long, env = "CYCLE_DURATION")]
    pub cycle_duration: String,

    /// Additional offset applied after the cycle duration, e.g. -P1D
    #[arg(long, env = "CYCLE_OFFSET", allow_hyphen_values = true)]
    pub offset: Option<String>,

    /// Model calendar
    #[arg(long, env = "MODEL_CALENDAR", default_value = "360_day")]
    pub calendar: Calendar,

    /// Last year to process; processing stops at 1 January of the year after
    #[arg(long, env = "END_YEAR")]
    pub end_year: i32,

    /// `[<start year>, <end year>]` limits for this stream, or `None`
    #[arg(long, env = "STREAM_TIME_OVERRIDES", default_value = "None")]
    pub stream_time_overrides: String,

    /// Root of the archived suite output
    #[arg(long, env = "INPUT_DIR")]
    pub input_dir: PathBuf,

    /// Where converted output is finally written
    #[arg(long, env = "OUTPUT_DIR")]
    pub output_dir: PathBuf,

    /// Copy input into this directory instead of linking it into the work dir
    #[arg(long, env = "STAGING_DIR")]
    pub staging_dir: Option<PathBuf>,

    /// Directory holding the conversion config templates
    #[arg(long, env = "MIP_CONVERT_CONFIG_DIR")]
    pub mip_convert_config_dir: PathBuf,

    /// Processing directory; logs and critical issues are kept under `<dir>/log`
    #[arg(long, env = "CDDS_CONVERT_PROC_DIR")]
    pub proc_dir: PathBuf,

    /// Task name, recorded alongside critical issues
    #[arg(long, env = "CYLC_TASK_NAME")]
    pub task_name: String,

    /// Task try number, recorded alongside critical issues
    #[arg(long, env = "CYLC_TASK_TRY_NUMBER", default_value = "1")]
    pub task_try_number: String,

    /// Task work directory; the tool runs here
    #[arg(long, env = "CYLC_TASK_WORK_DIR")]
    pub work_dir: PathBuf,

    /// Cycle point of this task, e.g. 18500101T0000Z
    #[arg(long, env = "CYLC_TASK_CYCLE_POINT")]
    pub cycle_point: String,

    /// Log the tool command instead of running it
    #[arg(
        long,
        env = "DUMMY_RUN",
        action = ArgAction::Set,
        default_value = "false",
        value_parser = BoolishValueParser::new()
    )]
    pub dummy_run: bool,

    /// YAML stream table replacing the built-in one
    #[arg(long, env = "STREAMS_FILE")]
    pub streams_file: Option<PathBuf>,

    /// Conversion tool executable
    #[arg(long, env = "MIP_CONVERT_BIN", default_value = "mip_convert")]
    pub tool: String,

    /// Log level
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    pub log_json: bool,
}

impl ConvertArgs {
    /// 1 January of the year after the last year to process.
    pub fn simulation_end(&self) -> CalendarDate {
        CalendarDate::jan1(self.end_year + 1)
    }

    pub fn extra_offset(&self) -> Result<Option<Offset>> {
        self.offset
            .as_deref()
            .map(|s| s.parse::<Offset>())
            .transpose()
            .context("Invalid cycle offset")
    }

    pub fn stream_table(&self) -> Result<StreamTable> {
        match &self.streams_file {
            Some(path) => StreamTable::from_yaml_file(path)
                .with_context(|| format!("Failed to load stream table {}", path.display())),
            None => Ok(StreamTable::builtin()),
        }
    }

    pub fn layout(&self) -> StepLayout {
        StepLayout::new(&self.work_dir, &self.output_dir, self.staging_dir.as_deref())
    }
}

/// Where input is staged and where the tool writes, for one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepLayout {
    pub mode: StageMode,
    /// Directory the tool reads input from.
    pub input_dir: PathBuf,
    /// Directory the tool writes converted output to.
    pub tool_output_dir: PathBuf,
    /// Final output directory, when it differs from `tool_output_dir`.
    pub publish_dir: Option<PathBuf>,
}

impl StepLayout {
    pub fn new(work_dir: &Path, output_dir: &Path, staging_dir: Option<&Path>) -> Self {
        match staging_dir.filter(|dir| !dir.as_os_str().is_empty()) {
            Some(staging) => Self {
                mode: StageMode::Copy,
                input_dir: staging.join("input"),
                tool_output_dir: staging.join("output"),
                publish_dir: Some(output_dir.to_path_buf()),
            },
            None => Self {
                mode: StageMode::Link,
                input_dir: work_dir.to_path_buf(),
                tool_output_dir: output_dir.to_path_buf(),
                publish_dir: None,
            },
        }
    }
}
