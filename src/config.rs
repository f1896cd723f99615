use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub renderer: Renderer,
    #[serde(default)]
    pub defaults: Defaults,
    #[serde(default)]
    pub display: Display,
    #[serde(default)]
    pub output: Output,
    #[serde(default)]
    pub logging: Logging,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        Ok(cfg)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Renderer {
    /// Path to the Blender binary, or `auto`.
    pub executable: String,
    pub profile_extension: String,
    /// Inserted after the profile script, before `--render-anim`.
    pub extra_args: Vec<String>,
    pub env: BTreeMap<String, String>,
}
impl Default for Renderer {
    fn default() -> Self {
        Self {
            executable: "auto".into(),
            profile_extension: "py".into(),
            extra_args: Vec::new(),
            env: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Defaults {
    pub samples: u32,
    pub percent: u32,
}
impl Default for Defaults {
    fn default() -> Self {
        Self {
            samples: 64,
            percent: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    Auto,
    Always,
    Never,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Display {
    pub enabled: bool,
    pub color: ColorMode,
    pub clear_screen: bool,
}
impl Default for Display {
    fn default() -> Self {
        Self {
            enabled: true,
            color: ColorMode::Auto,
            clear_screen: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Output {
    pub print_summary: bool,
    pub write_report_json: bool,
}
impl Default for Output {
    fn default() -> Self {
        Self {
            print_summary: true,
            write_report_json: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            write_to_file: true,
            file_path: "".into(),
        }
    }
}
