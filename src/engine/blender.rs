use super::{types::*, Renderer};
use crate::{config::Config, error::JobError, util::expand_tilde};
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use tracing::{debug, info, warn};

#[cfg(target_os = "macos")]
const DEFAULT_EXECUTABLE: &str = "/Applications/Blender.app/Contents/MacOS/Blender";
#[cfg(target_os = "windows")]
const DEFAULT_EXECUTABLE: &str = r"C:\Program Files\Blender Foundation\Blender\blender.exe";
#[cfg(not(any(target_os = "macos", target_os = "windows")))]
const DEFAULT_EXECUTABLE: &str = "blender";

pub struct BlenderEngine {
    executable: PathBuf,
    extra_args: Vec<String>,
    env: BTreeMap<String, String>,
}

impl BlenderEngine {
    pub fn new(cfg: &Config, executable: &Path) -> Self {
        Self {
            executable: executable.to_path_buf(),
            extra_args: cfg.renderer.extra_args.clone(),
            env: cfg.renderer.env.clone(),
        }
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// `--background <blend> --python <profile> [extra..] --render-anim`
    pub fn render_args(&self, inv: &RenderInvocation) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "--background".into(),
            inv.blend.clone().into(),
            "--python".into(),
            inv.profile.clone().into(),
        ];
        args.extend(self.extra_args.iter().map(OsString::from));
        // must come after the profile script so its settings apply
        args.push("--render-anim".into());
        args
    }
}

/// Resolves the configured executable. `auto` (or empty) tries
/// `$BENDER_BLENDER` and then the platform's usual install location.
pub fn resolve_executable(raw: &str) -> PathBuf {
    resolve_from(raw, std::env::var("BENDER_BLENDER").ok().as_deref())
}

fn resolve_from(raw: &str, env_val: Option<&str>) -> PathBuf {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("auto") {
        if let Some(env_val) = env_val {
            let p = expand_tilde(env_val);
            if p.exists() {
                return p;
            }
            warn!("BENDER_BLENDER does not exist: {}", p.display());
        }
        return PathBuf::from(DEFAULT_EXECUTABLE);
    }
    expand_tilde(raw)
}

impl Renderer for BlenderEngine {
    fn doctor(&self) -> Result<RendererDiag> {
        let executable = self.executable.display().to_string();
        let output = match Command::new(&self.executable)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
        {
            Ok(o) => o,
            Err(e) => {
                return Ok(RendererDiag {
                    executable,
                    version: None,
                    ok: false,
                    error: Some(format!("launch failed: {e}")),
                });
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let version = stdout
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map(str::to_string);
        let error = if output.status.success() {
            None
        } else {
            Some(format!(
                "exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ))
        };
        Ok(RendererDiag {
            executable,
            ok: error.is_none() && version.is_some(),
            version,
            error,
        })
    }

    fn render(
        &self,
        inv: &RenderInvocation,
        on_line: &mut dyn FnMut(&str) -> Result<()>,
    ) -> Result<()> {
        // stdout and stderr share one pipe so lines keep the child's ordering
        let (reader, writer) = std::io::pipe().with_context(|| "creating output pipe")?;
        let writer_err = writer
            .try_clone()
            .with_context(|| "cloning output pipe")?;

        let mut cmd = Command::new(&self.executable);
        cmd.args(self.render_args(inv));
        cmd.stdin(Stdio::null());
        cmd.stdout(writer);
        cmd.stderr(writer_err);
        for (k, v) in &self.env {
            cmd.env(k, v);
        }

        debug!("spawn {:?}", cmd);
        let mut child = cmd
            .spawn()
            .with_context(|| format!("launching renderer: {}", self.executable.display()))?;
        // the command still owns write ends of the pipe; EOF needs them closed
        drop(cmd);
        info!("renderer started pid={}", child.id());

        if let Err(err) = pump_lines(BufReader::new(reader), on_line) {
            stop(&mut child);
            return Err(err);
        }

        let status = child.wait().with_context(|| "waiting for renderer")?;
        info!("renderer exited: {status}");
        if status.success() {
            return Ok(());
        }
        match status.code() {
            Some(code) => Err(JobError::RendererFailed { code }.into()),
            None => Err(JobError::RendererTerminated.into()),
        }
    }
}

/// Feeds newline-delimited lines to `on_line` until end of stream.
pub fn pump_lines<R: BufRead>(
    mut reader: R,
    on_line: &mut dyn FnMut(&str) -> Result<()>,
) -> Result<()> {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let n = reader
            .read_until(b'\n', &mut buf)
            .with_context(|| "reading renderer output")?;
        if n == 0 {
            return Ok(());
        }
        let line = String::from_utf8_lossy(&buf);
        on_line(line.trim_end_matches(['\n', '\r']))?;
    }
}

fn stop(child: &mut Child) {
    warn!("stopping renderer pid={}", child.id());
    if let Err(e) = child.kill() {
        warn!("kill failed: {e}");
    }
    if let Err(e) = child.wait() {
        warn!("wait after kill failed: {e}");
    }
}
