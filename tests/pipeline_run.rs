use anyhow::Result;
use bender::{
    config::Config,
    display::{JobHeader, ProgressSink},
    engine::{RenderInvocation, Renderer, RendererDiag},
    error::JobError,
    job::JobConfig,
    pipeline::{plan_job, Pipeline},
    progress::ProgressUpdate,
    report::JobStatus,
};
use std::cell::RefCell;
use std::path::Path;

struct FakeRenderer {
    lines: Vec<&'static str>,
    calls: RefCell<Vec<RenderInvocation>>,
    fail_with: Option<i32>,
}

impl FakeRenderer {
    fn new(lines: Vec<&'static str>) -> Self {
        Self {
            lines,
            calls: RefCell::new(Vec::new()),
            fail_with: None,
        }
    }
}

impl Renderer for FakeRenderer {
    fn doctor(&self) -> Result<RendererDiag> {
        Ok(RendererDiag {
            executable: "fake".into(),
            version: Some("Blender 5.0.0".into()),
            ok: true,
            error: None,
        })
    }

    fn render(
        &self,
        inv: &RenderInvocation,
        on_line: &mut dyn FnMut(&str) -> Result<()>,
    ) -> Result<()> {
        self.calls.borrow_mut().push(inv.clone());
        for line in &self.lines {
            on_line(*line)?;
        }
        match self.fail_with {
            Some(code) => Err(JobError::RendererFailed { code }.into()),
            None => Ok(()),
        }
    }
}

#[derive(Default)]
struct Recorder {
    seen: Vec<(JobHeader, ProgressUpdate)>,
}

impl ProgressSink for Recorder {
    fn update(&mut self, header: &JobHeader, update: &ProgressUpdate) -> Result<()> {
        self.seen.push((header.clone(), update.clone()));
        Ok(())
    }
}

fn job_in(root: &Path, start: u32, end: u32) -> JobConfig {
    let blend = root.join("scene.blend");
    let template = root.join("profile.py");
    std::fs::write(&blend, b"BLENDER").unwrap();
    std::fs::write(
        &template,
        "scene.frame_start = {start}\nscene.frame_end = {end}\nscene.cycles.samples = {samples}\nscene.render.filepath = \"{outpath}\"\n",
    )
    .unwrap();
    JobConfig {
        job: "shot".into(),
        blend,
        profile: template,
        target: root.join("renders"),
        start,
        end,
        samples: 128,
        camera: None,
        percent: 100,
        executable: "blender".into(),
        overwrite: false,
        dry_run: false,
    }
}

#[test]
fn renders_fresh_job_once_with_generated_profile() {
    let dir = tempfile::tempdir().unwrap();
    let job = job_in(dir.path(), 1, 3);
    let engine = FakeRenderer::new(vec![
        "Blender 5.0.0",
        "00:04.845  render | Mem: 1614M | Sample 0/128 (Using optimized kernels)",
        "00:34.042  render | Remaining: 07:03.80 | Mem: 2007M | Sample 33/128",
        "01:10.000  render | Mem: 2007M | Finished",
        "Saved: '/x/shot_0001.png'",
        "00:02.000  render | Mem: 1614M | Sample 1/128",
    ]);
    let pipeline = Pipeline::new(&Config::default(), engine);
    let mut sink = Recorder::default();

    let report = pipeline.run_job(&job, &mut sink).unwrap();

    let calls = pipeline.engine().calls.borrow();
    assert_eq!(calls.len(), 1);
    let job_dir = std::path::absolute(dir.path().join("renders").join("shot")).unwrap();
    let profile_path = job_dir.join("shot.py");
    assert_eq!(calls[0].profile, profile_path);
    assert_eq!(calls[0].blend, job.blend);

    let profile = std::fs::read_to_string(&profile_path).unwrap();
    assert!(profile.contains("scene.frame_start = 1\n"));
    assert!(profile.contains("scene.frame_end = 3\n"));
    assert!(profile.contains("scene.cycles.samples = 128\n"));
    let outpath = job_dir.join("shot_####");
    assert!(profile.contains(&format!("\"{}\"", outpath.display())));

    let frames: Vec<u32> = sink.seen.iter().map(|(_, u)| u.frame).collect();
    assert_eq!(frames, vec![1, 1, 2]);
    assert_eq!(sink.seen[1].1.remaining.as_deref(), Some("07:03"));
    assert_eq!(sink.seen[0].0.start, 1);
    assert_eq!(sink.seen[0].0.end, 3);

    assert_eq!(report.status, JobStatus::Ok);
    assert_eq!(report.frames_saved, vec!["/x/shot_0001.png".to_string()]);
    assert_eq!(report.last_update.unwrap().sample, "1/128");
}

#[test]
fn resumes_after_existing_frames() {
    let dir = tempfile::tempdir().unwrap();
    let job = job_in(dir.path(), 1, 3);
    let job_dir = dir.path().join("renders").join("shot");
    std::fs::create_dir_all(&job_dir).unwrap();
    std::fs::write(job_dir.join("shot_0001.exr"), b"").unwrap();

    let pipeline = Pipeline::new(
        &Config::default(),
        FakeRenderer::new(vec!["00:01.000 render | Mem: 1M | Sample 1/128"]),
    );
    let mut sink = Recorder::default();
    let report = pipeline.run_job(&job, &mut sink).unwrap();

    assert_eq!(report.requested_start, 1);
    assert_eq!(report.start, 2);
    let profile = std::fs::read_to_string(job_dir.join("shot.py")).unwrap();
    assert!(profile.contains("scene.frame_start = 2\n"));
    assert_eq!(sink.seen[0].1.frame, 2);
    assert_eq!(sink.seen[0].0.start, 2);
}

#[test]
fn no_frames_left_never_launches() {
    let dir = tempfile::tempdir().unwrap();
    let job = job_in(dir.path(), 1, 2);
    let job_dir = dir.path().join("renders").join("shot");
    std::fs::create_dir_all(&job_dir).unwrap();
    std::fs::write(job_dir.join("shot_0001.png"), b"").unwrap();
    std::fs::write(job_dir.join("shot_0002.png"), b"").unwrap();

    let pipeline = Pipeline::new(&Config::default(), FakeRenderer::new(vec![]));
    let err = pipeline.run_job(&job, &mut Recorder::default()).unwrap_err();

    assert!(matches!(
        err.downcast_ref::<JobError>(),
        Some(JobError::NoFramesLeft { start: 3, end: 2 })
    ));
    assert!(pipeline.engine().calls.borrow().is_empty());
    assert!(!job_dir.join("shot.py").exists());
}

#[test]
fn overwrite_renders_from_requested_start() {
    let dir = tempfile::tempdir().unwrap();
    let mut job = job_in(dir.path(), 1, 1);
    job.overwrite = true;
    let job_dir = dir.path().join("renders").join("shot");
    std::fs::create_dir_all(&job_dir).unwrap();
    std::fs::write(job_dir.join("shot_0001.png"), b"").unwrap();

    let pipeline = Pipeline::new(&Config::default(), FakeRenderer::new(vec![]));
    let report = pipeline.run_job(&job, &mut Recorder::default()).unwrap();
    assert_eq!(report.start, 1);
    assert_eq!(pipeline.engine().calls.borrow().len(), 1);
}

#[test]
fn renderer_failure_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let job = job_in(dir.path(), 1, 1);
    let mut engine = FakeRenderer::new(vec!["Error: out of memory"]);
    engine.fail_with = Some(139);

    let pipeline = Pipeline::new(&Config::default(), engine);
    let err = pipeline.run_job(&job, &mut Recorder::default()).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<JobError>(),
        Some(JobError::RendererFailed { code: 139 })
    ));
}

#[test]
fn dry_run_writes_profile_but_does_not_launch() {
    let dir = tempfile::tempdir().unwrap();
    let mut job = job_in(dir.path(), 1, 3);
    job.dry_run = true;

    let pipeline = Pipeline::new(&Config::default(), FakeRenderer::new(vec![]));
    let report = pipeline.run_job(&job, &mut Recorder::default()).unwrap();

    assert_eq!(report.status, JobStatus::DryRun);
    assert!(report.profile.exists());
    assert!(pipeline.engine().calls.borrow().is_empty());
}

#[test]
fn plan_reports_remaining_frames() {
    let dir = tempfile::tempdir().unwrap();
    let job = job_in(dir.path(), 1, 5);
    let job_dir = dir.path().join("renders").join("shot");
    std::fs::create_dir_all(&job_dir).unwrap();
    std::fs::write(job_dir.join("shot_0001.png"), b"").unwrap();
    std::fs::write(job_dir.join("shot_0002.png"), b"").unwrap();

    let plan = plan_job(&Config::default(), &job).unwrap();
    assert_eq!(plan.start, 3);
    assert_eq!(plan.remaining, 3);
    assert!(!plan.paths.profile.exists());
}

#[test]
fn validate_rejects_bad_jobs() {
    let dir = tempfile::tempdir().unwrap();
    let good = job_in(dir.path(), 1, 3);
    assert!(good.validate().is_ok());

    let mut bad = good.clone();
    bad.start = 4;
    assert!(bad.validate().is_err());

    let mut bad = good.clone();
    bad.job = "a/b".into();
    assert!(bad.validate().is_err());

    let mut bad = good.clone();
    bad.blend = dir.path().join("missing.blend");
    let err = bad.validate().unwrap_err();
    assert!(matches!(err.downcast_ref::<JobError>(), Some(JobError::InvalidJob(_))));

    let mut bad = good;
    bad.start = 0;
    assert!(bad.validate().is_err());
}

#[test]
fn planned_run_keeps_the_planned_start() {
    let dir = tempfile::tempdir().unwrap();
    let job = job_in(dir.path(), 1, 3);
    let plan = plan_job(&Config::default(), &job).unwrap();
    // output appearing after planning does not move the resume point
    std::fs::write(plan.paths.job_dir.join("shot_0001.png"), b"").unwrap();

    let pipeline = Pipeline::new(&Config::default(), FakeRenderer::new(vec![]));
    let report = pipeline
        .run_planned(&job, &plan, &mut Recorder::default())
        .unwrap();

    assert_eq!(report.start, 1);
    assert_eq!(report.job_dir, plan.paths.job_dir);
    let calls = pipeline.engine().calls.borrow();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].profile, plan.paths.profile);
    let profile = std::fs::read_to_string(&plan.paths.profile).unwrap();
    assert!(profile.contains("scene.frame_start = 1\n"));
}
