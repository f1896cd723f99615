use crate::{
    config::Config,
    display::{NoDisplay, TerminalDisplay, TerminalStyle},
    engine::{
        blender::{resolve_executable, BlenderEngine},
        RenderInvocation, Renderer,
    },
    job::JobConfig,
    pipeline::{plan_job, Pipeline},
    report::{JobReport, JobStatus},
    util::ensure_dir,
};
use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    layer::SubscriberExt, registry::LookupSpan, util::SubscriberInitExt, EnvFilter, Layer,
};

type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync>;

#[derive(Parser, Debug)]
#[command(name = "bender")]
#[command(about = "Unattended Blender animation renderer (frame resume + live progress)")]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Path to config TOML. If omitted, uses ./bender.toml if present.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check that the Blender executable runs.
    Doctor {
        #[arg(short = 'x', long)]
        executable: Option<PathBuf>,
    },
    /// Show which frames a render would start from, without rendering.
    Plan {
        #[command(flatten)]
        job: JobArgs,
    },
    /// Render the remaining frames of a job.
    Render {
        #[command(flatten)]
        job: JobArgs,
        /// Write the profile and print the renderer command, but don't run it.
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(clap::Args, Debug, Clone)]
pub struct JobArgs {
    /// Job name.
    #[arg(short = 'j', long)]
    pub job: String,
    /// Blend file.
    #[arg(short = 'b', long)]
    pub blend: PathBuf,
    /// Profile python template.
    #[arg(short = 'p', long)]
    pub profile: PathBuf,
    /// Target directory; frames go to <target>/<job>.
    #[arg(short = 't', long)]
    pub target: PathBuf,
    /// Start frame.
    #[arg(short = 's', long)]
    pub start: u32,
    /// End frame.
    #[arg(short = 'e', long)]
    pub end: u32,
    /// Cycles samples count.
    #[arg(short = 'l', long)]
    pub samples: Option<u32>,
    /// Camera name.
    #[arg(short = 'c', long)]
    pub camera: Option<String>,
    /// Resolution percentage.
    #[arg(long)]
    pub percent: Option<u32>,
    /// Blender executable.
    #[arg(short = 'x', long)]
    pub executable: Option<PathBuf>,
    /// Render every frame even if output already exists.
    #[arg(long)]
    pub overwrite: bool,
}

impl JobArgs {
    pub fn to_job(&self, cfg: &Config, dry_run: bool) -> JobConfig {
        JobConfig {
            job: self.job.clone(),
            blend: self.blend.clone(),
            profile: self.profile.clone(),
            target: self.target.clone(),
            start: self.start,
            end: self.end,
            samples: self.samples.unwrap_or(cfg.defaults.samples),
            camera: self.camera.clone().filter(|c| !c.is_empty()),
            percent: self.percent.unwrap_or(cfg.defaults.percent),
            executable: self
                .executable
                .clone()
                .unwrap_or_else(|| resolve_executable(&cfg.renderer.executable)),
            overwrite: self.overwrite,
            dry_run,
        }
    }
}

pub fn dispatch(args: Args) -> Result<()> {
    let cfg = match resolve_config_path(args.config.as_deref()) {
        Some(path) => Config::load(&path)?,
        None => Config::default(),
    };

    match &args.cmd {
        Command::Doctor { executable } => {
            let _guard = init_logging(&args, &cfg, resolve_log_path(&cfg, None).as_deref())?;
            doctor(&cfg, executable.as_deref())
        }
        Command::Plan { job } => {
            let _guard = init_logging(&args, &cfg, resolve_log_path(&cfg, None).as_deref())?;
            plan(&cfg, &job.to_job(&cfg, true))
        }
        Command::Render { job, dry_run } => run(&args, &cfg, &job.to_job(&cfg, *dry_run)),
    }
}

fn resolve_config_path(user: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = user {
        return Some(p.to_path_buf());
    }
    let default = PathBuf::from("bender.toml");
    default.exists().then_some(default)
}

fn init_logging(args: &Args, cfg: &Config, file_path: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(cfg.logging.level.as_str());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let (file, guard) = match file_path {
        Some(path) => {
            let (layer, guard) = file_layer(path)?;
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer(cfg.logging.json))
        .with(file)
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(guard)
}

/// Logs go to stderr; stdout carries the progress table and summaries.
fn console_layer<S>(json: bool) -> BoxedLayer<S>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true);
    if json {
        layer.json().boxed()
    } else {
        layer.boxed()
    }
}

/// Appends so a resumed job keeps the history of earlier runs.
fn file_layer<S>(path: &Path) -> Result<(BoxedLayer<S>, WorkerGuard)>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    ensure_dir(path.parent().unwrap_or_else(|| Path::new(".")))?;
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open log file: {}", path.display()))?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file);
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .boxed();
    Ok((layer, guard))
}

fn doctor(cfg: &Config, executable: Option<&Path>) -> Result<()> {
    let exe = executable
        .map(Path::to_path_buf)
        .unwrap_or_else(|| resolve_executable(&cfg.renderer.executable));
    let engine = BlenderEngine::new(cfg, &exe);
    let diag = engine.doctor()?;
    println!("{}", serde_json::to_string_pretty(&diag)?);
    if !diag.ok {
        bail!("renderer check failed: {}", engine.executable().display());
    }
    Ok(())
}

fn plan(cfg: &Config, job: &JobConfig) -> Result<()> {
    job.validate()?;
    let plan = plan_job(cfg, job)?;
    println!("{}", serde_json::to_string_pretty(&plan)?);
    Ok(())
}

fn run(args: &Args, cfg: &Config, job: &JobConfig) -> Result<()> {
    job.validate()?;

    let plan = plan_job(cfg, job)?;
    let log_path = resolve_log_path(cfg, Some(&plan.paths.job_dir));
    let _guard = init_logging(args, cfg, log_path.as_deref())?;

    info!("job={} out={}", job.job, plan.paths.job_dir.display());

    let engine = BlenderEngine::new(cfg, &job.executable);
    let pipeline = Pipeline::new(cfg, engine);

    let report = if cfg.display.enabled && !job.dry_run {
        let stdout = std::io::stdout();
        let style = TerminalStyle::resolve(&cfg.display, stdout.is_terminal());
        let mut display = TerminalDisplay::new(stdout.lock(), style.color, style.clear_screen);
        pipeline.run_planned(job, &plan, &mut display)?
    } else {
        pipeline.run_planned(job, &plan, &mut NoDisplay)?
    };

    if report.status == JobStatus::DryRun {
        let inv = RenderInvocation {
            blend: report.blend.clone(),
            profile: report.profile.clone(),
        };
        println!("{}", command_line(pipeline.engine(), &inv));
    }

    if cfg.output.write_report_json {
        let path = report.job_dir.join(JobReport::file_name(&report.job));
        std::fs::write(&path, serde_json::to_string_pretty(&report)?)
            .with_context(|| format!("writing report: {}", path.display()))?;
    }

    if cfg.output.print_summary {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "job": report.job,
                "job_dir": report.job_dir,
                "start": report.start,
                "end": report.end,
                "frames_saved": report.frames_saved.len(),
                "status": report.status,
            }))?
        );
    }

    Ok(())
}

fn command_line(engine: &BlenderEngine, inv: &RenderInvocation) -> String {
    let mut parts = vec![engine.executable().display().to_string()];
    parts.extend(
        engine
            .render_args(inv)
            .iter()
            .map(|a| a.to_string_lossy().into_owned()),
    );
    parts.join(" ")
}

fn resolve_log_path(cfg: &Config, job_dir: Option<&Path>) -> Option<PathBuf> {
    if !cfg.logging.write_to_file {
        return None;
    }

    if !cfg.logging.file_path.is_empty() {
        return Some(PathBuf::from(&cfg.logging.file_path));
    }

    job_dir.map(|d| d.join("logs").join("bender.log"))
}
