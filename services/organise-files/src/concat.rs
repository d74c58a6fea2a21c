//! The concatenation setup config file.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

/// Settings for the concatenation batch task, written as a single
/// `[main]` section of `key = value` lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcatenationSetup {
    pub sizing_file: PathBuf,
    pub staging_location: PathBuf,
    pub output_location: PathBuf,
    pub reference_year: i32,
    pub start_year: i32,
    pub end_year: i32,
    pub recursive: bool,
    /// Task database written by the setup step.
    pub output_file: PathBuf,
    pub calendar: String,
    pub json: bool,
}

fn python_bool(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

impl ConcatenationSetup {
    pub const DEFAULT_CALENDAR: &'static str = "360_day";

    pub fn entries(&self) -> Vec<(&'static str, String)> {
        vec![
            ("sizing_file", self.sizing_file.display().to_string()),
            ("staging_location", self.staging_location.display().to_string()),
            ("output_location", self.output_location.display().to_string()),
            ("reference_year", self.reference_year.to_string()),
            ("start_year", self.start_year.to_string()),
            ("end_year", self.end_year.to_string()),
            ("recursive", python_bool(self.recursive).to_string()),
            ("output_file", self.output_file.display().to_string()),
            ("calendar", self.calendar.clone()),
            ("json", python_bool(self.json).to_string()),
        ]
    }

    pub fn render(&self) -> String {
        let mut out = String::from("[main]\n");
        for (key, value) in self.entries() {
            let _ = writeln!(out, "{} = {}", key, value);
        }
        out.push('\n');
        out
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        info!(path = %path.display(), "Writing concatenation setup config");
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(path, self.render()).with_context(|| format!("Failed to write {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> ConcatenationSetup {
        ConcatenationSetup {
            sizing_file: PathBuf::from("/etc/sizing.json"),
            staging_location: PathBuf::from("/data/staging"),
            output_location: PathBuf::from("/data/output"),
            reference_year: 1850,
            start_year: 1850,
            end_year: 1860,
            recursive: true,
            output_file: PathBuf::from("/data/proc/tasks.db"),
            calendar: ConcatenationSetup::DEFAULT_CALENDAR.to_string(),
            json: false,
        }
    }

    #[test]
    fn test_render() {
        let expected = "[main]\n\
            sizing_file = /etc/sizing.json\n\
            staging_location = /data/staging\n\
            output_location = /data/output\n\
            reference_year = 1850\n\
            start_year = 1850\n\
            end_year = 1860\n\
            recursive = True\n\
            output_file = /data/proc/tasks.db\n\
            calendar = 360_day\n\
            json = False\n\n";
        assert_eq!(setup().render(), expected);
    }

    #[test]
    fn test_write_creates_parent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("proc/mip_concatenate_setup.cfg");
        setup().write(&path).unwrap();
        assert!(fs::read_to_string(path).unwrap().starts_with("[main]\n"));
    }
}
