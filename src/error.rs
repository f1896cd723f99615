use thiserror::Error;

/// Failures that end a job for a reason other than plain I/O.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("no frames left to render (start {start} > end {end})")]
    NoFramesLeft { start: u32, end: u32 },

    #[error("invalid job: {0}")]
    InvalidJob(String),

    #[error("renderer exited with status {code}")]
    RendererFailed { code: i32 },

    #[error("renderer terminated without an exit code")]
    RendererTerminated,
}

impl JobError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidJob(msg.into())
    }
}
