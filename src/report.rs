use crate::{job::JobConfig, pipeline::JobPlan, progress::ProgressUpdate};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Ok,
    DryRun,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobReport {
    pub job: String,
    pub blend: PathBuf,
    pub job_dir: PathBuf,
    pub profile: PathBuf,
    pub requested_start: u32,
    pub start: u32,
    pub end: u32,
    pub samples: u32,
    pub percent: u32,
    pub camera: Option<String>,
    pub status: JobStatus,
    pub frames_saved: Vec<String>,
    pub last_update: Option<ProgressUpdate>,
    pub started: String,
    pub finished: String,
}

impl JobReport {
    pub fn new(job: &JobConfig, plan: &JobPlan, started: String) -> Self {
        Self {
            job: job.job.clone(),
            blend: job.blend.clone(),
            job_dir: plan.paths.job_dir.clone(),
            profile: plan.paths.profile.clone(),
            requested_start: plan.requested_start,
            start: plan.start,
            end: plan.end,
            samples: job.samples,
            percent: job.percent,
            camera: job.camera.clone(),
            status: JobStatus::Ok,
            frames_saved: Vec::new(),
            last_update: None,
            finished: started.clone(),
            started,
        }
    }

    pub fn file_name(job: &str) -> String {
        format!("{job}.report.json")
    }
}
