//! One conversion job step from start to finish.

use std::fs;

use anyhow::{Context, Result};
use staging::{expected_files, run_id, FileIndex, RunBounds, Stager, TracingObserver, WorkStatus};
use suite_common::{parse_cycle_point, StreamOverride};
use tracing::{error, info, warn};

use crate::config::ConvertArgs;
use crate::logs::{archive_logs, archive_root};
use crate::publish::publish_components;
use crate::template::{setup_config_file, tool_log_name};
use crate::tool::{record_critical_issues, resolve_partial_failure, ToolCommand, ToolStatus};

/// Run the step and return the process exit code.
///
/// `timestamp` names this run's config and log files.
pub async fn run_step(args: &ConvertArgs, timestamp: &str) -> Result<i32> {
    let bounds = RunBounds::new(args.cycle_duration.parse()?, args.simulation_end())
        .with_extra_offset(args.extra_offset()?)
        .with_override(StreamOverride::parse(&args.stream_time_overrides)?)
        .with_calendar(args.calendar);
    let window = bounds.compute(parse_cycle_point(&args.cycle_point)?)?;
    info!(stream = %args.stream, window = %window, "Computed run bounds");

    if window.length_days() < 0 {
        warn!(start = %window.start, end = %window.end, "Job end date before start date");
    }
    if !window.has_work() {
        info!("No work for this job step");
        return Ok(0);
    }

    let layout = args.layout();
    info!(mode = ?layout.mode, input = %layout.input_dir.display(), "Staging input");
    fs::create_dir_all(&args.work_dir)
        .with_context(|| format!("Failed to create {}", args.work_dir.display()))?;

    let table = args.stream_table()?;
    let spec = table.get(&args.stream)?;
    let expected: Vec<_> = expected_files(spec, run_id(&args.suite_name), window).collect();

    let index = FileIndex::build(&args.input_dir.join(&args.suite_name))?;
    let stage_dir = layout.input_dir.join(&args.suite_name).join(&args.stream);
    let observer = TracingObserver;
    let summary = Stager::new(layout.mode, &stage_dir, &observer).stage_all(&index, &expected)?;

    match summary.work_status() {
        WorkStatus::Staged(count) => info!(count, "Number of processed files"),
        WorkStatus::NoExpectedFiles => {
            info!("No files expected for this job step");
            return Ok(0);
        }
        status => {
            error!(?status, expected = summary.expected, "No files staged for this job step, but work is still expected");
            return Ok(1);
        }
    }

    let config = setup_config_file(
        &args.mip_convert_config_dir,
        &args.component,
        &args.work_dir,
        &layout.input_dir,
        &layout.tool_output_dir,
        &window,
        timestamp,
    )?;

    let log = args.work_dir.join(tool_log_name(timestamp));
    let command = ToolCommand {
        program: args.tool.clone(),
        config,
        stream: args.stream.clone(),
        log: log.clone(),
        work_dir: args.work_dir.clone(),
    };
    let status = command.run(args.dummy_run).await?;

    let exit_code = match status {
        ToolStatus::PartialFailure => {
            let issues_file = args.proc_dir.join("log").join("critical_issues.log");
            let fields = [
                args.task_name.as_str(),
                args.cycle_point.as_str(),
                args.task_try_number.as_str(),
            ];
            match record_critical_issues(&log, &issues_file, &fields) {
                Ok(recorded) => resolve_partial_failure(recorded),
                Err(e) => {
                    warn!(error = %e, "Unable to record critical issues");
                    status.exit_code()
                }
            }
        }
        other => other.exit_code(),
    };

    if let Some(publish_dir) = &layout.publish_dir {
        let copied = publish_components(&layout.tool_output_dir, publish_dir)?;
        info!(files = copied, dest = %publish_dir.display(), "Copied output from staging directory");
    }

    // Logs are archived whatever the tool's outcome
    let archive = archive_root(&args.proc_dir, &args.stream, &args.component, &args.cycle_point);
    archive_logs(&args.work_dir, &archive)?;

    info!(exit_code, "Exiting");
    Ok(exit_code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use staging::StreamTable;
    use suite_common::TimeWindow;
    use test_utils::{
        assert_entry_count, entry_names, mkdir, suite, touch, write_file, SuiteOutputTree,
    };
    use tempfile::TempDir;

    const TEMPLATE: &str = "[request]\nrun_bounds = {{ start_date }} {{ end_date }}\ninput = {{ input_dir }}\noutput = {{ output_dir }}\ncmor_log = {{ cmor_log }}\n";

    struct Fixture {
        suite: SuiteOutputTree,
        scratch: TempDir,
    }

    impl Fixture {
        /// Suite output holding every ap4 file for 1850 under `<root>/<suite name>/ap4`.
        fn new() -> Self {
            let suite = SuiteOutputTree::new();
            let table = StreamTable::builtin();
            let spec = table.get("ap4").unwrap();
            for file in expected_files(spec, suite::RUN_ID, TimeWindow::from_years(1850, 1851)) {
                suite.add_stream_file(&format!("{}/ap4", suite::SUITE_NAME), &file.name);
            }
            let scratch = TempDir::new().unwrap();
            write_file(scratch.path(), "configs/mip_convert.cfg.atmos", TEMPLATE.as_bytes());
            Self { suite, scratch }
        }

        fn path(&self, relative: &str) -> String {
            self.scratch.path().join(relative).display().to_string()
        }

        fn args(&self, extra: &[&str]) -> ConvertArgs {
            let input = self.suite.root().display().to_string();
            let mut argv: Vec<String> = [
                "convert-step", "--component", "atmos", "--stream", "ap4",
                "--suite-name", suite::SUITE_NAME, "--cycle-duration", "P1Y",
                "--end-year", "1869", "--task-name", "mip_convert_ap4",
                "--cycle-point", suite::FIRST_CYCLE_POINT, "--dummy-run", "true",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect();
            argv.extend([
                "--input-dir".to_string(), input,
                "--output-dir".to_string(), self.path("output"),
                "--mip-convert-config-dir".to_string(), self.path("configs"),
                "--proc-dir".to_string(), self.path("proc"),
                "--work-dir".to_string(), self.path("work"),
            ]);
            argv.extend(extra.iter().map(|s| s.to_string()));
            ConvertArgs::try_parse_from(argv).unwrap()
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_link_mode_dummy_run() {
        let fixture = Fixture::new();
        let args = fixture.args(&[]);

        assert_eq!(run_step(&args, "ts").await.unwrap(), 0);

        let work = fixture.scratch.path().join("work");
        assert_entry_count!(work.join(suite::SUITE_NAME).join("ap4"), 14);
        assert_eq!(entry_names(&work), vec!["mip_convert.ts.cfg", suite::SUITE_NAME]);
        let config = fs::read_to_string(work.join("mip_convert.ts.cfg")).unwrap();
        assert!(config.contains("run_bounds = 1850-01-01-00-00-00 1851-01-01-00-00-00"));
        assert!(fixture.scratch.path().join("output/atmos").is_dir());

        let archived = fixture
            .scratch
            .path()
            .join("proc/log/ap4_atmos/18500101T0000Z/mip_convert_cfgs/mip_convert.ts.cfg.gz");
        assert!(archived.is_file());
    }

    #[tokio::test]
    async fn test_staging_mode_publishes_output() {
        let fixture = Fixture::new();
        let staging = fixture.path("staging");
        let args = fixture.args(&["--staging-dir", &staging]);
        touch(fixture.scratch.path(), "output/atmos/stale.nc");

        assert_eq!(run_step(&args, "ts").await.unwrap(), 0);

        assert_entry_count!(
            fixture.scratch.path().join("staging/input").join(suite::SUITE_NAME).join("ap4"),
            14
        );
        assert!(fixture.scratch.path().join("output/atmos").is_dir());
        assert!(entry_names(&fixture.scratch.path().join("output/atmos")).is_empty());
    }

    #[tokio::test]
    async fn test_override_outside_cycle_is_no_work() {
        let fixture = Fixture::new();
        let args = fixture.args(&["--stream-time-overrides", "[1900, 1910]"]);

        assert_eq!(run_step(&args, "ts").await.unwrap(), 0);
        assert!(!fixture.scratch.path().join("work").exists());
    }

    #[tokio::test]
    async fn test_nothing_found_exits_one() {
        let fixture = Fixture::new();
        let args = fixture.args(&["--cycle-point", "19000101T0000Z", "--end-year", "1950"]);

        assert_eq!(run_step(&args, "ts").await.unwrap(), 1);
        assert!(!fixture.scratch.path().join("work/mip_convert.ts.cfg").exists());
    }

    #[tokio::test]
    async fn test_every_copy_failing_exits_one() {
        let fixture = Fixture::new();
        let staging = fixture.path("staging");
        let table = StreamTable::builtin();
        let stage_dir = format!("staging/input/{}/ap4", suite::SUITE_NAME);
        for file in expected_files(table.get("ap4").unwrap(), suite::RUN_ID, TimeWindow::from_years(1850, 1851)) {
            mkdir(fixture.scratch.path(), &format!("{}/{}", stage_dir, file.name));
        }
        let args = fixture.args(&["--staging-dir", &staging]);

        assert_eq!(run_step(&args, "ts").await.unwrap(), 1);
        assert!(!fixture.scratch.path().join("work/mip_convert.ts.cfg").exists());
        assert!(!fixture.scratch.path().join("output/atmos").exists());
    }

    #[tokio::test]
    async fn test_unknown_stream_is_error() {
        let fixture = Fixture::new();
        let args = fixture.args(&["--stream", "xx1"]);
        assert!(run_step(&args, "ts").await.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_partial_failure_records_critical_issues() {
        use std::os::unix::fs::PermissionsExt;

        let fixture = Fixture::new();
        let tool = write_file(
            fixture.scratch.path(),
            "bin/fake_convert",
            b"#!/bin/sh\necho \"CRITICAL tas failed\" > \"$6\"\nexit 2\n",
        );
        fs::set_permissions(&tool, fs::Permissions::from_mode(0o755)).unwrap();
        let tool = tool.display().to_string();
        let args = fixture.args(&["--dummy-run", "false", "--tool", &tool]);

        assert_eq!(run_step(&args, "ts").await.unwrap(), 0);

        let issues =
            fs::read_to_string(fixture.scratch.path().join("proc/log/critical_issues.log")).unwrap();
        let expected_log = fixture.scratch.path().join("work/mip_convert.ts.log");
        assert_eq!(
            issues.trim_end(),
            format!(
                "mip_convert_ap4|18500101T0000Z|1|{}|CRITICAL tas failed",
                expected_log.file_name().unwrap().to_string_lossy()
            )
        );
        assert!(fixture
            .scratch
            .path()
            .join("proc/log/ap4_atmos/18500101T0000Z/mip_convert_logs/mip_convert.ts.log.gz")
            .is_file());
    }
}
