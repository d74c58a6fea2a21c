//! Archiving tool logs and configs from the work directory.
//!
//! Files are gzipped into
//! `<proc_dir>/log/<stream>_<component>/<cycle point>/<category>/`.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use flate2::write::GzEncoder;
use flate2::Compression;
use tracing::{info, warn};

/// A class of file to archive: names starting with `prefix` and ending
/// with `suffix`.
#[derive(Debug, Clone, Copy)]
pub struct LogCategory {
    pub dir_name: &'static str,
    pub prefix: &'static str,
    pub suffix: &'static str,
}

impl LogCategory {
    pub fn matches(&self, file_name: &str) -> bool {
        file_name.len() >= self.prefix.len() + self.suffix.len()
            && file_name.starts_with(self.prefix)
            && file_name.ends_with(self.suffix)
    }
}

pub const LOG_CATEGORIES: [LogCategory; 3] = [
    LogCategory {
        dir_name: "cmor_logs",
        prefix: "cmor",
        suffix: ".log",
    },
    LogCategory {
        dir_name: "mip_convert_cfgs",
        prefix: "mip_convert.",
        suffix: ".cfg",
    },
    LogCategory {
        dir_name: "mip_convert_logs",
        prefix: "mip_convert",
        suffix: ".log",
    },
];

/// `<proc_dir>/log/<stream>_<component>/<cycle_point>`
pub fn archive_root(proc_dir: &Path, stream: &str, component: &str, cycle_point: &str) -> PathBuf {
    proc_dir
        .join("log")
        .join(format!("{}_{}", stream, component))
        .join(cycle_point)
}

fn gzip_file(src: &Path, dest: &Path) -> io::Result<()> {
    let mut reader = BufReader::new(File::open(src)?);
    let mut encoder = GzEncoder::new(BufWriter::new(File::create(dest)?), Compression::default());
    io::copy(&mut reader, &mut encoder)?;
    encoder.finish()?.flush()
}

fn ensure_archive_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        if !dir.is_dir() {
            bail!("Expected {} to be a directory", dir.display());
        }
        info!(dir = %dir.display(), "Log directory already exists");
        return Ok(());
    }
    info!(dir = %dir.display(), "Making log directory");
    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))
}

/// Gzip matching files from `work_dir` into the archive. Existing
/// archives are left alone; a file that cannot be compressed is skipped
/// with a warning.
///
/// Returns the number of files archived.
pub fn archive_logs(work_dir: &Path, archive_root: &Path) -> Result<usize> {
    info!(work_dir = %work_dir.display(), archive = %archive_root.display(), "Managing logs");

    let mut names: Vec<String> = fs::read_dir(work_dir)
        .with_context(|| format!("Failed to list {}", work_dir.display()))?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
        .collect();
    names.sort();

    let mut archived = 0;
    for category in &LOG_CATEGORIES {
        let destination = archive_root.join(category.dir_name);
        ensure_archive_dir(&destination)?;

        for name in names.iter().filter(|name| category.matches(name)) {
            let dest_file = destination.join(format!("{}.gz", name));
            if dest_file.exists() {
                continue;
            }
            match gzip_file(&work_dir.join(name), &dest_file) {
                Ok(()) => {
                    info!(src = %name, dest = %dest_file.display(), "Archived");
                    archived += 1;
                }
                Err(e) => {
                    warn!(file = %name, error = %e, "Failed to gzip");
                    let _ = fs::remove_file(&dest_file);
                }
            }
        }
    }
    Ok(archived)
}
