//! Running the conversion tool and interpreting its exit code.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::process::Command;
use tracing::{debug, error, info};

/// Exit code meaning "ran, but could not produce everything requested".
pub const PARTIAL_FAILURE_CODE: i32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolStatus {
    Success,
    PartialFailure,
    Failed(i32),
}

impl ToolStatus {
    pub fn from_exit_code(code: i32) -> Self {
        match code {
            0 => ToolStatus::Success,
            PARTIAL_FAILURE_CODE => ToolStatus::PartialFailure,
            other => ToolStatus::Failed(other),
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            ToolStatus::Success => 0,
            ToolStatus::PartialFailure => PARTIAL_FAILURE_CODE,
            ToolStatus::Failed(code) => *code,
        }
    }
}

/// One invocation of the conversion tool.
#[derive(Debug, Clone)]
pub struct ToolCommand {
    pub program: String,
    pub config: PathBuf,
    pub stream: String,
    pub log: PathBuf,
    pub work_dir: PathBuf,
}

impl ToolCommand {
    pub fn args(&self) -> Vec<String> {
        vec![
            self.config.display().to_string(),
            "-a".to_string(),
            "-s".to_string(),
            self.stream.clone(),
            "-l".to_string(),
            self.log.display().to_string(),
        ]
    }

    pub fn display(&self) -> String {
        format!("{} {}", self.program, self.args().join(" "))
    }

    /// Run the tool in `work_dir`, or only log the command when
    /// `dummy_run` is set.
    pub async fn run(&self, dummy_run: bool) -> Result<ToolStatus> {
        info!(command = %self.display(), work_dir = %self.work_dir.display(), "Command to execute");
        if dummy_run {
            info!("Performing dummy run");
            return Ok(ToolStatus::Success);
        }

        let output = Command::new(&self.program)
            .args(self.args())
            .current_dir(&self.work_dir)
            .output()
            .await
            .with_context(|| format!("Failed to launch {}", self.program))?;

        debug!(stdout = %String::from_utf8_lossy(&output.stdout), "Tool stdout");
        debug!(stderr = %String::from_utf8_lossy(&output.stderr), "Tool stderr");

        // Killed by a signal
        let code = output.status.code().unwrap_or(-1);
        let status = ToolStatus::from_exit_code(code);
        if status != ToolStatus::Success {
            error!(code, "Command failed");
        }
        Ok(status)
    }
}

/// Lines of `log` containing `CRITICAL`, trimmed.
pub fn critical_lines(log: &Path) -> Result<Vec<String>> {
    let contents = fs::read_to_string(log)
        .with_context(|| format!("Failed to read tool log {}", log.display()))?;
    Ok(contents
        .lines()
        .filter(|line| line.contains("CRITICAL"))
        .map(|line| line.trim().to_string())
        .collect())
}

/// Append every CRITICAL line of `tool_log` to `issues_file`, one per
/// line, prefixed by `fields` and the log name and joined with `|`.
///
/// Returns how many issues were recorded.
pub fn record_critical_issues(tool_log: &Path, issues_file: &Path, fields: &[&str]) -> Result<usize> {
    debug!(log = %tool_log.display(), "Searching for CRITICAL messages");
    let issues = critical_lines(tool_log)?;
    if issues.is_empty() {
        debug!("No CRITICAL messages found");
        return Ok(0);
    }

    if let Some(parent) = issues_file.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(issues_file)
        .with_context(|| format!("Failed to open {}", issues_file.display()))?;

    let log_name = tool_log
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    for issue in &issues {
        let mut parts: Vec<&str> = fields.to_vec();
        parts.push(&log_name);
        parts.push(issue);
        writeln!(file, "{}", parts.join("|"))
            .with_context(|| format!("Failed to write {}", issues_file.display()))?;
    }
    info!(count = issues.len(), file = %issues_file.display(), "Wrote critical issues");
    Ok(issues.len())
}

/// Exit code for the step after a partial failure: 0 when the issues
/// were recorded, otherwise the tool's own code.
pub fn resolve_partial_failure(recorded: usize) -> i32 {
    if recorded > 0 {
        0
    } else {
        PARTIAL_FAILURE_CODE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ToolStatus::from_exit_code(0), ToolStatus::Success);
        assert_eq!(ToolStatus::from_exit_code(2), ToolStatus::PartialFailure);
        assert_eq!(ToolStatus::from_exit_code(1), ToolStatus::Failed(1));
        assert_eq!(ToolStatus::Failed(137).exit_code(), 137);
    }

    #[test]
    fn test_command_line() {
        let command = ToolCommand {
            program: "mip_convert".to_string(),
            config: PathBuf::from("mip_convert.ts.cfg"),
            stream: "ap4".to_string(),
            log: PathBuf::from("mip_convert.ts.log"),
            work_dir: PathBuf::from("/work"),
        };
        assert_eq!(
            command.display(),
            "mip_convert mip_convert.ts.cfg -a -s ap4 -l mip_convert.ts.log"
        );
    }

    #[tokio::test]
    async fn test_dummy_run_does_not_launch() {
        let command = ToolCommand {
            program: "/definitely/not/a/program".to_string(),
            config: PathBuf::from("c.cfg"),
            stream: "ap4".to_string(),
            log: PathBuf::from("l.log"),
            work_dir: PathBuf::from("/"),
        };
        assert_eq!(command.run(true).await.unwrap(), ToolStatus::Success);
        assert!(command.run(false).await.is_err());
    }

    #[test]
    fn test_record_critical_issues() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("mip_convert.ts.log");
        fs::write(
            &log,
            "INFO fine\n  CRITICAL tas: missing variable  \nWARNING meh\nCRITICAL pr: bad units\n",
        )
        .unwrap();
        let issues_file = dir.path().join("proc/log/critical_issues.log");

        let count = record_critical_issues(&log, &issues_file, &["task", "18500101T0000Z", "1"]).unwrap();
        assert_eq!(count, 2);
        assert_eq!(resolve_partial_failure(count), 0);

        // Appends on a second run
        record_critical_issues(&log, &issues_file, &["task", "18500101T0000Z", "2"]).unwrap();
        let written = fs::read_to_string(&issues_file).unwrap();
        let lines: Vec<_> = written.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(
            lines[0],
            "task|18500101T0000Z|1|mip_convert.ts.log|CRITICAL tas: missing variable"
        );
    }

    #[test]
    fn test_no_critical_issues_keeps_exit_code() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("mip_convert.ts.log");
        fs::write(&log, "INFO all good\n").unwrap();
        let issues_file = dir.path().join("critical_issues.log");

        let count = record_critical_issues(&log, &issues_file, &[]).unwrap();
        assert_eq!(count, 0);
        assert_eq!(resolve_partial_failure(count), 2);
        assert!(!issues_file.exists());
    }
}
