//! Common test fixtures for suite staging tests.
//!
//! Builders here lay out directory trees in the shapes the real workflow
//! produces, inside a temporary directory that is removed on drop.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::paths::{mkdir, temp_test_dir, touch};

/// Suite identifiers used across tests.
pub mod suite {
    /// Name of the climate model suite.
    pub const SUITE_NAME: &str = "u-ar050";

    /// Run id derived from [`SUITE_NAME`] (its last five characters).
    pub const RUN_ID: &str = "ar050";

    /// First cycle point of a typical one-year run.
    pub const FIRST_CYCLE_POINT: &str = "18500101T0000Z";
}

/// Archived model output, as written by the suite.
///
/// Files are placed either by stream (`<root>/<stream>/<file>`) or by
/// cycle (`<root>/<cycle point>/<stream>/<file>`).
pub struct SuiteOutputTree {
    dir: TempDir,
}

impl SuiteOutputTree {
    pub fn new() -> Self {
        Self {
            dir: temp_test_dir(),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Add `<root>/<stream>/<name>`.
    pub fn add_stream_file(&self, stream: &str, name: &str) -> PathBuf {
        touch(self.root(), &format!("{}/{}", stream, name))
    }

    /// Add `<root>/<cycle_point>/<stream>/<name>`.
    pub fn add_cycle_file(&self, cycle_point: &str, stream: &str, name: &str) -> PathBuf {
        touch(self.root(), &format!("{}/{}/{}", cycle_point, stream, name))
    }

    /// Add every name under one stream directory.
    pub fn add_stream_files<'a>(
        &self,
        stream: &str,
        names: impl IntoIterator<Item = &'a str>,
    ) -> Vec<PathBuf> {
        names
            .into_iter()
            .map(|name| self.add_stream_file(stream, name))
            .collect()
    }
}

impl Default for SuiteOutputTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Output of the conversion tool: `<root>/<YYYY-MM-DD>/<component>/*.nc`.
pub struct ConvertedOutputTree {
    dir: TempDir,
}

impl ConvertedOutputTree {
    pub fn new() -> Self {
        Self {
            dir: temp_test_dir(),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Add one converted file for the cycle dated `cycle_date`
    /// (`YYYY-MM-DD`).
    pub fn add(&self, cycle_date: &str, component: &str, filename: &str) -> PathBuf {
        touch(
            self.root(),
            &format!("{}/{}/{}", cycle_date, component, filename),
        )
    }

    /// Add an empty component directory.
    pub fn add_component_dir(&self, cycle_date: &str, component: &str) -> PathBuf {
        mkdir(self.root(), &format!("{}/{}", cycle_date, component))
    }
}

impl Default for ConvertedOutputTree {
    fn default() -> Self {
        Self::new()
    }
}

/// A converted filename for `variable` in MIP table `table`.
pub fn converted_filename(variable: &str, table: &str, years: &str) -> String {
    format!("{}_{}_UKESM1-0-LL_piControl_r1i1p1f2_gn_{}.nc", variable, table, years)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suite_tree_layouts() {
        let tree = SuiteOutputTree::new();
        let by_stream = tree.add_stream_file("ap4", "x.pp");
        let by_cycle = tree.add_cycle_file(suite::FIRST_CYCLE_POINT, "ap5", "y.pp");

        assert!(by_stream.ends_with("ap4/x.pp"));
        assert!(by_cycle.ends_with("18500101T0000Z/ap5/y.pp"));
        assert!(by_cycle.is_file());
    }

    #[test]
    fn test_converted_tree() {
        let tree = ConvertedOutputTree::new();
        let name = converted_filename("tas", "Amon", "185001-185012");
        let path = tree.add("1850-01-01", "atmos-physics", &name);
        assert!(path.ends_with("1850-01-01/atmos-physics/tas_Amon_UKESM1-0-LL_piControl_r1i1p1f2_gn_185001-185012.nc"));
        assert!(tree.add_component_dir("1850-01-01", "ocean").is_dir());
    }

    #[test]
    fn test_run_id_matches_suite_name() {
        assert!(suite::SUITE_NAME.ends_with(suite::RUN_ID));
    }
}
