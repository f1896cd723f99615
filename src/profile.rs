//! Render profile generation.
//!
//! A profile template is a Blender Python script with `{token}` placeholders.
//! Substitution is plain find-and-replace: unknown tokens stay as written.

use crate::job::{JobConfig, JobPaths};
use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const PLACEHOLDERS: [&str; 6] = [
    "{outpath}",
    "{samples}",
    "{start}",
    "{end}",
    "{percent}",
    "{camera}",
];

/// Substitutes job values into `template`. `start` is the resolved start frame.
pub fn generate(template: &str, paths: &JobPaths, job: &JobConfig, start: u32) -> String {
    let outpath = paths.output_pattern.display().to_string();
    let camera = job.camera.as_deref().unwrap_or("");
    let values = [
        outpath,
        job.samples.to_string(),
        start.to_string(),
        job.end.to_string(),
        job.percent.to_string(),
        camera.to_string(),
    ];

    let mut out = template.to_string();
    for (token, value) in PLACEHOLDERS.iter().zip(values.iter()) {
        out = out.replace(token, value);
    }
    out
}

/// Writes `text` to `path` via a sibling temp file so a failed write never
/// leaves a truncated profile behind.
pub fn write(path: &Path, text: &str) -> Result<()> {
    let tmp = tmp_path(path);
    let res = write_tmp(&tmp, text).and_then(|_| {
        std::fs::rename(&tmp, path)
            .with_context(|| format!("rename {} -> {}", tmp.display(), path.display()))
    });
    if res.is_err() {
        let _ = std::fs::remove_file(&tmp);
    }
    res
}

fn write_tmp(tmp: &Path, text: &str) -> Result<()> {
    let mut f = std::fs::File::create(tmp)
        .with_context(|| format!("create profile: {}", tmp.display()))?;
    f.write_all(text.as_bytes())
        .with_context(|| format!("write profile: {}", tmp.display()))?;
    f.sync_all()
        .with_context(|| format!("sync profile: {}", tmp.display()))?;
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}
