//! Output stream definitions.
//!
//! Each stream identifier (`ap4`, `inm`, `ond`, ...) maps to a naming
//! family chosen by its two-letter prefix, the number of files the model
//! writes per 30-day month, and for ocean streams the ordered list of
//! grid substreams written alongside each other.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use suite_common::calendar::DAYS_PER_MONTH;
use suite_common::{SuiteError, SuiteResult};

/// Ocean substreams, in output order.
pub const OCEAN_SUBSTREAMS: [&str; 6] = ["grid-T", "grid-U", "grid-V", "grid-W", "scalar", "diaptr"];

/// Filename family of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamFamily {
    /// Unified Model pp output (`ap*`)
    Atmosphere,
    /// CICE netCDF output (`in*`)
    SeaIce,
    /// NEMO netCDF output (`on*`)
    Ocean,
}

impl StreamFamily {
    /// Family for a stream identifier, from its two-letter prefix.
    pub fn from_stream(stream: &str) -> SuiteResult<Self> {
        match stream.get(..2) {
            Some("ap") => Ok(StreamFamily::Atmosphere),
            Some("in") => Ok(StreamFamily::SeaIce),
            Some("on") => Ok(StreamFamily::Ocean),
            _ => Err(SuiteError::UnrecognizedStream(stream.to_string())),
        }
    }
}

/// Everything needed to predict a stream's filenames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSpec {
    pub stream: String,
    pub family: StreamFamily,
    pub files_per_month: u32,
    /// Empty unless the family is [`StreamFamily::Ocean`].
    pub substreams: Vec<String>,
}

impl StreamSpec {
    pub fn new(stream: &str, files_per_month: u32) -> SuiteResult<Self> {
        let family = StreamFamily::from_stream(stream)?;
        let substreams = match family {
            StreamFamily::Ocean => OCEAN_SUBSTREAMS.iter().map(|s| s.to_string()).collect(),
            _ => Vec::new(),
        };
        Self::with_substreams(stream, files_per_month, substreams)
    }

    pub fn with_substreams(
        stream: &str,
        files_per_month: u32,
        substreams: Vec<String>,
    ) -> SuiteResult<Self> {
        let family = StreamFamily::from_stream(stream)?;
        if files_per_month == 0 || DAYS_PER_MONTH % files_per_month as i64 != 0 {
            return Err(SuiteError::Configuration(format!(
                "stream {}: {} files per month does not divide a 30-day month",
                stream, files_per_month
            )));
        }
        match family {
            StreamFamily::Ocean if substreams.is_empty() => {
                return Err(SuiteError::Configuration(format!(
                    "ocean stream {} needs at least one substream",
                    stream
                )));
            }
            StreamFamily::Atmosphere | StreamFamily::SeaIce if !substreams.is_empty() => {
                return Err(SuiteError::Configuration(format!(
                    "stream {} does not have substreams",
                    stream
                )));
            }
            _ => {}
        }
        Ok(Self {
            stream: stream.to_string(),
            family,
            files_per_month,
            substreams,
        })
    }

    /// Days covered by one output file.
    pub fn file_step_days(&self) -> i64 {
        DAYS_PER_MONTH / self.files_per_month as i64
    }

    /// Final character of the stream identifier, which selects the
    /// output frequency in filenames.
    pub fn sub_frequency(&self) -> char {
        self.stream.chars().last().unwrap_or('?')
    }
}

#[derive(Debug, Deserialize)]
struct StreamTableFile {
    streams: BTreeMap<String, StreamEntry>,
}

#[derive(Debug, Deserialize)]
struct StreamEntry {
    files_per_month: u32,
    #[serde(default)]
    substreams: Option<Vec<String>>,
}

/// Immutable lookup from stream identifier to [`StreamSpec`].
#[derive(Debug, Clone)]
pub struct StreamTable {
    specs: BTreeMap<String, StreamSpec>,
}

impl StreamTable {
    /// The streams produced by the standard coupled model configuration.
    pub fn builtin() -> Self {
        let entries: [(&str, u32); 11] = [
            // Monthly
            ("ap4", 1),
            ("ap5", 1),
            ("apu", 1),
            // Daily, 6hr, 3hr, 1hr
            ("ap6", 3),
            ("ap7", 3),
            ("ap8", 3),
            ("ap9", 3),
            // Sea ice and ocean, monthly and daily
            ("inm", 1),
            ("onm", 1),
            ("ind", 1),
            ("ond", 1),
        ];
        let specs = entries
            .iter()
            .filter_map(|(stream, files_per_month)| {
                StreamSpec::new(stream, *files_per_month)
                    .ok()
                    .map(|spec| (stream.to_string(), spec))
            })
            .collect();
        Self { specs }
    }

    /// Parse a YAML stream table:
    ///
    /// ```yaml
    /// streams:
    ///   ap4: { files_per_month: 1 }
    ///   onm: { files_per_month: 1, substreams: [grid-T, grid-U] }
    /// ```
    pub fn from_yaml_str(contents: &str) -> SuiteResult<Self> {
        let file: StreamTableFile = serde_yaml::from_str(contents)
            .map_err(|e| SuiteError::Configuration(format!("stream table: {}", e)))?;

        let mut specs = BTreeMap::new();
        for (stream, entry) in file.streams {
            let spec = match entry.substreams {
                Some(substreams) => {
                    StreamSpec::with_substreams(&stream, entry.files_per_month, substreams)?
                }
                None => StreamSpec::new(&stream, entry.files_per_month)?,
            };
            specs.insert(stream, spec);
        }
        Ok(Self { specs })
    }

    pub fn from_yaml_file(path: &Path) -> SuiteResult<Self> {
        let contents = fs::read_to_string(path).map_err(|e| SuiteError::io(path, e))?;
        Self::from_yaml_str(&contents)
    }

    pub fn get(&self, stream: &str) -> SuiteResult<&StreamSpec> {
        self.specs
            .get(stream)
            .ok_or_else(|| SuiteError::UnrecognizedStream(stream.to_string()))
    }

    pub fn streams(&self) -> impl Iterator<Item = &str> {
        self.specs.keys().map(String::as_str)
    }
}

impl Default for StreamTable {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Run id used in filenames: the last five characters of the suite name
/// (`u-ar050` gives `ar050`).
pub fn run_id(suite_name: &str) -> &str {
    let start = suite_name
        .char_indices()
        .rev()
        .nth(4)
        .map(|(i, _)| i)
        .unwrap_or(0);
    &suite_name[start..]
}
