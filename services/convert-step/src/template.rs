//! Rendering the conversion tool's config file from a per-component
//! template.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use suite_common::{CalendarDate, TimeWindow};
use tracing::{info, warn};

/// Date format the conversion tool expects (`YYYY-MM-DD-HH-MM-SS`).
pub fn tool_date(date: &CalendarDate) -> String {
    format!("{:04}-{:02}-{:02}-00-00-00", date.year, date.month, date.day)
}

pub fn template_name(component: &str) -> String {
    format!("mip_convert.cfg.{}", component)
}

pub fn config_file_name(timestamp: &str) -> String {
    format!("mip_convert.{}.cfg", timestamp)
}

pub fn tool_log_name(timestamp: &str) -> String {
    format!("mip_convert.{}.log", timestamp)
}

pub fn cmor_log_name(timestamp: &str) -> String {
    format!("cmor.{}.log", timestamp)
}

/// Values substituted into a config template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interpolations {
    pub start_date: String,
    pub end_date: String,
    pub input_dir: String,
    pub output_dir: String,
    pub cmor_log: String,
}

impl Interpolations {
    pub fn new(window: &TimeWindow, input_dir: &Path, component_dir: &Path, timestamp: &str) -> Self {
        Self {
            start_date: tool_date(&window.start),
            end_date: tool_date(&window.end),
            input_dir: input_dir.display().to_string(),
            output_dir: component_dir.display().to_string(),
            cmor_log: cmor_log_name(timestamp),
        }
    }

    fn pairs(&self) -> [(&'static str, &str); 5] {
        [
            ("start_date", self.start_date.as_str()),
            ("end_date", self.end_date.as_str()),
            ("input_dir", self.input_dir.as_str()),
            ("output_dir", self.output_dir.as_str()),
            ("cmor_log", self.cmor_log.as_str()),
        ]
    }
}

/// Substitute `{{ name }}` (or `{{name}}`) placeholders.
///
/// Placeholders left over after substitution are an error.
pub fn render(template: &str, values: &Interpolations) -> Result<String> {
    let mut rendered = template.to_string();
    for (name, value) in values.pairs() {
        rendered = rendered
            .replace(&format!("{{{{ {} }}}}", name), value)
            .replace(&format!("{{{{{}}}}}", name), value);
    }

    if let Some(start) = rendered.find("{{") {
        let snippet: String = rendered[start..].chars().take(40).collect();
        bail!("Unknown placeholder in config template near '{}'", snippet);
    }
    Ok(rendered)
}

/// Render the component's template into `work_dir`, creating the output
/// and component directories the tool will write to.
///
/// Returns the path of the written config file.
pub fn setup_config_file(
    template_dir: &Path,
    component: &str,
    work_dir: &Path,
    input_dir: &Path,
    output_dir: &Path,
    window: &TimeWindow,
    timestamp: &str,
) -> Result<PathBuf> {
    info!("Setting up mip_convert config file");

    let component_dir = output_dir.join(component);
    if !component_dir.is_dir() {
        info!(dir = %component_dir.display(), "Creating component output directory");
        fs::create_dir_all(&component_dir)
            .with_context(|| format!("Failed to create {}", component_dir.display()))?;
    }

    let template_path = template_dir.join(template_name(component));
    let template = fs::read_to_string(&template_path)
        .with_context(|| format!("Failed to read template {}", template_path.display()))?;

    let values = Interpolations::new(window, input_dir, &component_dir, timestamp);
    for (name, value) in values.pairs() {
        info!(variable = name, value = value, "Interpolating");
    }
    let rendered = render(&template, &values)?;
    if rendered.trim().is_empty() {
        warn!(template = %template_path.display(), "Config template is empty");
    }

    let config_path = work_dir.join(config_file_name(timestamp));
    fs::write(&config_path, rendered)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;
    info!(path = %config_path.display(), "Config file written");
    Ok(config_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const TEMPLATE: &str = "[request]\n\
        run_bounds = {{ start_date }} {{ end_date }}\n\
        [stream_ap4]\n\
        input = {{input_dir}}\n\
        output = {{ output_dir }}\n\
        cmor_log = {{ cmor_log }}\n";

    fn decade() -> TimeWindow {
        TimeWindow::from_years(1850, 1860)
    }

    #[test]
    fn test_tool_date() {
        assert_eq!(tool_date(&CalendarDate::new(1850, 1, 1)), "1850-01-01-00-00-00");
        assert_eq!(tool_date(&CalendarDate::new(2014, 12, 30)), "2014-12-30-00-00-00");
    }

    #[test]
    fn test_render_all_placeholders() {
        let values = Interpolations::new(
            &decade(),
            Path::new("/work"),
            Path::new("/out/atmos"),
            "2019-05-23T10:00:00",
        );
        let rendered = render(TEMPLATE, &values).unwrap();
        assert!(rendered.contains("run_bounds = 1850-01-01-00-00-00 1860-01-01-00-00-00"));
        assert!(rendered.contains("input = /work\n"));
        assert!(rendered.contains("output = /out/atmos\n"));
        assert!(rendered.contains("cmor_log = cmor.2019-05-23T10:00:00.log"));
    }

    #[test]
    fn test_render_rejects_unknown_placeholder() {
        let values = Interpolations::new(&decade(), Path::new("/w"), Path::new("/o"), "ts");
        let err = render("x = {{ mystery }}", &values).unwrap_err();
        assert!(err.to_string().contains("mystery"));
    }

    #[test]
    fn test_setup_config_file() {
        let dir = TempDir::new().unwrap();
        let templates = dir.path().join("configs");
        fs::create_dir_all(&templates).unwrap();
        fs::write(templates.join("mip_convert.cfg.ocean"), TEMPLATE).unwrap();
        let work = dir.path().join("work");
        fs::create_dir_all(&work).unwrap();
        let output = dir.path().join("output");

        let cfg = setup_config_file(
            &templates,
            "ocean",
            &work,
            &work,
            &output,
            &decade(),
            "stamp",
        )
        .unwrap();

        assert_eq!(cfg, work.join("mip_convert.stamp.cfg"));
        assert!(output.join("ocean").is_dir());
        let written = fs::read_to_string(cfg).unwrap();
        assert!(written.contains(&format!("output = {}", output.join("ocean").display())));
    }

    #[test]
    fn test_missing_template() {
        let dir = TempDir::new().unwrap();
        let result = setup_config_file(
            dir.path(),
            "seaice",
            dir.path(),
            dir.path(),
            &dir.path().join("out"),
            &decade(),
            "stamp",
        );
        assert!(result.is_err());
    }
}
