use crate::{
    config::{self, ColorMode},
    progress::ProgressUpdate,
};
use anyhow::{Context, Result};
use std::io::Write;

const CLEAR: &str = "\x1b[2J\x1b[H";
const RESET: &str = "\x1b[0m";
const INVERT: &str = "\x1b[7m";
const GREEN: &str = "\x1b[0;32m";
const CYAN: &str = "\x1b[0;36m";
const YELLOW: &str = "\x1b[0;33m";

/// Static job facts shown next to every update.
#[derive(Debug, Clone)]
pub struct JobHeader {
    pub job: String,
    pub start: u32,
    pub end: u32,
}

pub trait ProgressSink {
    fn update(&mut self, header: &JobHeader, update: &ProgressUpdate) -> Result<()>;
}

/// Which escape sequences the table may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalStyle {
    pub color: bool,
    pub clear_screen: bool,
}

impl TerminalStyle {
    /// In `auto` mode output that is not a terminal gets no escapes at all.
    pub fn resolve(cfg: &config::Display, is_terminal: bool) -> Self {
        match cfg.color {
            ColorMode::Always => Self {
                color: true,
                clear_screen: cfg.clear_screen,
            },
            ColorMode::Never => Self {
                color: false,
                clear_screen: cfg.clear_screen,
            },
            ColorMode::Auto => Self {
                color: is_terminal,
                clear_screen: cfg.clear_screen && is_terminal,
            },
        }
    }
}

/// Redraws a one-row table on every update.
pub struct TerminalDisplay<W: Write> {
    out: W,
    color: bool,
    clear_screen: bool,
}

impl<W: Write> TerminalDisplay<W> {
    pub fn new(out: W, color: bool, clear_screen: bool) -> Self {
        Self {
            out,
            color,
            clear_screen,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ProgressSink for TerminalDisplay<W> {
    fn update(&mut self, header: &JobHeader, update: &ProgressUpdate) -> Result<()> {
        let table = render_table(header, update, self.color, self.clear_screen);
        self.out
            .write_all(table.as_bytes())
            .and_then(|_| self.out.flush())
            .with_context(|| "writing progress display")
    }
}

/// Discards updates; used when the display is disabled.
pub struct NoDisplay;

impl ProgressSink for NoDisplay {
    fn update(&mut self, _header: &JobHeader, _update: &ProgressUpdate) -> Result<()> {
        Ok(())
    }
}

pub fn render_table(
    header: &JobHeader,
    update: &ProgressUpdate,
    color: bool,
    clear: bool,
) -> String {
    let paint = |style: &str, text: String| {
        if color {
            format!("{style}{INVERT}{text}{RESET}")
        } else {
            text
        }
    };

    let mut s = String::new();
    if clear {
        s.push_str(CLEAR);
    }
    if color {
        s.push_str(&format!("\r\n{GREEN}Bender{RESET}\r\n\r\n"));
    } else {
        s.push_str("\r\nBender\r\n\r\n");
    }

    s.push_str(&paint("", format!("{:>16}", "job")));
    s.push_str(&paint(GREEN, format!("{:>8}", "start")));
    s.push_str(&paint(CYAN, format!("{:>8}", "frame")));
    s.push_str(&paint(YELLOW, format!("{:>8}", "end")));
    s.push_str(&paint(GREEN, format!("{:>12}", "sample")));
    s.push_str(&paint(YELLOW, format!("{:>12}", "time")));
    s.push_str(&paint("", format!("{:>12}", "remaining")));
    s.push('\n');

    s.push_str(&format!(
        "{:>16}{:>8}{:>8}{:>8}{:>12}{:>12}{:>12}\n\n",
        header.job,
        header.start,
        update.frame,
        header.end,
        update.sample,
        update.time,
        update.remaining.as_deref().unwrap_or(""),
    ));
    s
}
