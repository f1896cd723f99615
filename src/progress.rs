//! Parsing of Blender's render log into progress updates.
//!
//! Two single-line layouts are understood, told apart by the number of
//! `|`-separated fields:
//!
//! ```text
//! 00:04.845  render  | Mem: 1614M | Sample 0/512 (Using optimized kernels)
//! 00:34.042  render  | Remaining: 07:03.80 | Mem: 2007M | Sample 33/512 (Using optimized kernels)
//! 01:52.310  render  | Mem: 2007M | Finished
//! ```
//!
//! The three-field layout carries no frame number, so the caller keeps a
//! running frame counter that a `Finished` line advances. Everything else
//! the renderer prints is ignored.

use crate::util::before;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub frame: u32,
    pub sample: String,
    pub time: String,
    pub remaining: Option<String>,
}

enum LineShape<'a> {
    /// `time | mem | marker`
    Short { time: &'a str, marker: &'a str },
    /// `time | remaining | mem | marker`
    Long {
        time: &'a str,
        remaining: &'a str,
        marker: &'a str,
    },
}

impl<'a> LineShape<'a> {
    fn classify(line: &'a str) -> Option<Self> {
        let cols: Vec<&str> = line.split('|').map(str::trim).collect();
        match cols[..] {
            [time, _, marker] => Some(Self::Short { time, marker }),
            [time, remaining, _, marker] => Some(Self::Long {
                time,
                remaining,
                marker,
            }),
            _ => None,
        }
    }
}

/// Maps one log line to a progress update, advancing `frame` when the line
/// reports a finished frame. Unrecognized lines yield `None` and leave
/// `frame` untouched.
pub fn parse_line(line: &str, frame: &mut u32) -> Option<ProgressUpdate> {
    let (time, remaining, marker) = match LineShape::classify(line)? {
        LineShape::Short { time, marker } => {
            if marker.starts_with("Finished") {
                *frame += 1;
                return None;
            }
            (time, None, marker)
        }
        LineShape::Long {
            time,
            remaining,
            marker,
        } => (time, Some(clip_remaining(remaining)), marker),
    };

    let sample = marker.strip_prefix("Sample ")?;

    Some(ProgressUpdate {
        frame: *frame,
        sample: before(sample, ' ').to_string(),
        time: clip_time(time),
        remaining,
    })
}

/// Path from a `Saved: '<path>'` line, if the line is one.
pub fn saved_path(line: &str) -> Option<&str> {
    let (_, rest) = line.split_once("Saved: '")?;
    let (path, _) = rest.split_once('\'')?;
    Some(path)
}

// Times are cut to whole seconds so they fit the display columns.
fn clip_time(field: &str) -> String {
    let word = before(field, ' ');
    let word = word.strip_prefix("Time:").unwrap_or(word);
    before(word, '.').to_string()
}

fn clip_remaining(field: &str) -> String {
    let rest = field
        .strip_prefix("Remaining:")
        .map(str::trim_start)
        .unwrap_or(field);
    before(rest, '.').to_string()
}
