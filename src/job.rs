use crate::{error::JobError, util::ensure_dir};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Blender's frame-number substitution token in output paths.
pub const FRAME_TOKEN: &str = "####";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    pub job: String,
    pub blend: PathBuf,
    pub profile: PathBuf,
    pub target: PathBuf,
    pub start: u32, // 1-based inclusive
    pub end: u32,   // 1-based inclusive
    pub samples: u32,
    pub camera: Option<String>,
    pub percent: u32,
    pub executable: PathBuf,
    pub overwrite: bool,
    pub dry_run: bool,
}

impl JobConfig {
    pub fn validate(&self) -> Result<()> {
        if self.job.trim().is_empty() {
            return Err(JobError::invalid("job name is empty").into());
        }
        if self.job.contains(['/', '\\']) {
            return Err(JobError::invalid(format!(
                "job name must not contain path separators: {}",
                self.job
            ))
            .into());
        }
        if self.start == 0 {
            return Err(JobError::invalid("start frame must be >= 1").into());
        }
        if self.start > self.end {
            return Err(JobError::invalid(format!(
                "start frame {} is after end frame {}",
                self.start, self.end
            ))
            .into());
        }
        if self.samples == 0 {
            return Err(JobError::invalid("samples must be >= 1").into());
        }
        if self.percent == 0 {
            return Err(JobError::invalid("percent must be >= 1").into());
        }
        if !self.blend.is_file() {
            return Err(
                JobError::invalid(format!("blend file not found: {}", self.blend.display())).into(),
            );
        }
        if !self.profile.is_file() {
            return Err(JobError::invalid(format!(
                "profile template not found: {}",
                self.profile.display()
            ))
            .into());
        }
        Ok(())
    }
}

/// Filesystem locations derived once per run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPaths {
    pub job_dir: PathBuf,
    pub profile: PathBuf,
    pub output_pattern: PathBuf,
}

impl JobPaths {
    pub fn derive(job: &str, target: &Path, profile_ext: &str) -> Result<Self> {
        let job_dir = std::path::absolute(target.join(job))
            .with_context(|| format!("path not valid: {}", target.display()))?;
        Ok(Self {
            profile: job_dir.join(format!("{job}.{profile_ext}")),
            output_pattern: job_dir.join(format!("{job}_{FRAME_TOKEN}")),
            job_dir,
        })
    }

    /// Derives the paths and creates the job directory with its parents.
    pub fn setup(job: &str, target: &Path, profile_ext: &str) -> Result<Self> {
        let paths = Self::derive(job, target, profile_ext)?;
        ensure_dir(&paths.job_dir)?;
        Ok(paths)
    }
}
