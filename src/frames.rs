use anyhow::{Context, Result};
use std::path::Path;
use tracing::debug;

/// First frame at or after `requested` with no rendered output in `job_dir`.
///
/// Output extensions depend on the renderer's file format, so a frame counts
/// as rendered when any non-directory entry starts with `<job>_<frame:04>.`.
/// With `overwrite` the directory is not read at all.
pub fn resolve_start(job_dir: &Path, job: &str, requested: u32, overwrite: bool) -> Result<u32> {
    if overwrite {
        return Ok(requested);
    }

    let mut names = Vec::new();
    let entries = std::fs::read_dir(job_dir)
        .with_context(|| format!("reading job dir: {}", job_dir.display()))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("reading job dir: {}", job_dir.display()))?;
        let file_type = entry
            .file_type()
            .with_context(|| format!("stat {}", entry.path().display()))?;
        if file_type.is_dir() {
            continue;
        }
        names.push(entry.file_name().to_string_lossy().into_owned());
    }

    let mut frame = requested;
    while frame_exists(&names, job, frame) {
        debug!("frame {frame} already rendered");
        frame += 1;
    }
    Ok(frame)
}

pub fn frame_exists(names: &[String], job: &str, frame: u32) -> bool {
    let prefix = frame_prefix(job, frame);
    names.iter().any(|n| n.starts_with(&prefix))
}

pub fn frame_prefix(job: &str, frame: u32) -> String {
    format!("{job}_{frame:04}.")
}

/// Frames left in `start..=end`.
pub fn remaining(start: u32, end: u32) -> u32 {
    if start > end { 0 } else { end - start + 1 }
}
