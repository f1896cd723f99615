use crate::{
    config::Config,
    display::{JobHeader, ProgressSink},
    engine::{RenderInvocation, Renderer},
    error::JobError,
    frames,
    job::{JobConfig, JobPaths},
    profile,
    progress::{parse_line, saved_path},
    report::{JobReport, JobStatus},
    util::now_rfc3339,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Where a job stands before anything is rendered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPlan {
    pub job: String,
    pub paths: JobPaths,
    pub requested_start: u32,
    pub start: u32,
    pub end: u32,
    pub remaining: u32,
}

/// Creates the job directory and finds the first frame still to render.
pub fn plan_job(cfg: &Config, job: &JobConfig) -> Result<JobPlan> {
    let paths = JobPaths::setup(&job.job, &job.target, &cfg.renderer.profile_extension)?;
    let start = frames::resolve_start(&paths.job_dir, &job.job, job.start, job.overwrite)?;
    Ok(JobPlan {
        job: job.job.clone(),
        requested_start: job.start,
        start,
        end: job.end,
        remaining: frames::remaining(start, job.end),
        paths,
    })
}

pub struct Pipeline<E: Renderer> {
    cfg: Config,
    engine: E,
}

impl<E: Renderer> Pipeline<E> {
    pub fn new(cfg: &Config, engine: E) -> Self {
        Self {
            cfg: cfg.clone(),
            engine,
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Writes the profile for a planned job. Fails with
    /// [`JobError::NoFramesLeft`] when every frame already exists.
    pub fn prepare(&self, job: &JobConfig, plan: &JobPlan) -> Result<RenderInvocation> {
        if plan.start > plan.end {
            return Err(JobError::NoFramesLeft {
                start: plan.start,
                end: plan.end,
            }
            .into());
        }
        if plan.start != plan.requested_start {
            info!(
                "resuming {} at frame {} (requested {})",
                job.job, plan.start, plan.requested_start
            );
        }

        let template = std::fs::read_to_string(&job.profile)
            .with_context(|| format!("reading profile template: {}", job.profile.display()))?;
        let text = profile::generate(&template, &plan.paths, job, plan.start);
        profile::write(&plan.paths.profile, &text)?;
        info!("profile written: {}", plan.paths.profile.display());

        let inv = RenderInvocation {
            blend: job.blend.clone(),
            profile: plan.paths.profile.clone(),
        };
        Ok(inv)
    }

    pub fn run_job(&self, job: &JobConfig, sink: &mut dyn ProgressSink) -> Result<JobReport> {
        let plan = plan_job(&self.cfg, job)?;
        self.run_planned(job, &plan, sink)
    }

    /// Runs a job whose paths and start frame were already resolved.
    pub fn run_planned(
        &self,
        job: &JobConfig,
        plan: &JobPlan,
        sink: &mut dyn ProgressSink,
    ) -> Result<JobReport> {
        let started = now_rfc3339();
        let inv = self.prepare(job, plan)?;
        let mut report = JobReport::new(job, plan, started);

        if job.dry_run {
            info!("dry run; renderer not started");
            report.status = JobStatus::DryRun;
            report.finished = now_rfc3339();
            return Ok(report);
        }

        let header = JobHeader {
            job: job.job.clone(),
            start: plan.start,
            end: plan.end,
        };
        let mut frame = plan.start;
        let mut last_update = None;
        let mut frames_saved = Vec::new();

        info!("rendering {} frames {}-{}", job.job, plan.start, plan.end);
        self.engine.render(&inv, &mut |line| {
            debug!(target: "renderer", "{line}");
            if let Some(path) = saved_path(line) {
                info!("saved: {path}");
                frames_saved.push(path.to_string());
                return Ok(());
            }
            if let Some(update) = parse_line(line, &mut frame) {
                sink.update(&header, &update)?;
                last_update = Some(update);
            }
            Ok(())
        })?;

        report.frames_saved = frames_saved;
        report.last_update = last_update;
        report.finished = now_rfc3339();
        Ok(report)
    }
}
