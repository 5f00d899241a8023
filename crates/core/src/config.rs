//! Layered configuration.
//!
//! Sources in order of precedence (later sources override earlier):
//! 1. Bundled defaults (`manimator.toml` shipped with the workspace)
//! 2. `~/.config/manimator/manimator.toml`
//! 3. `./manimator.toml`
//! 4. An explicit file passed on the command line
//! 5. `MANIMATOR__<SECTION>__<KEY>` environment variables

use std::path::{Path, PathBuf};

use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::error::Result;

const DEFAULT_CONFIG: &str = include_str!("../../../manimator.toml");

#[derive(Debug, Clone, Deserialize)]
pub struct ManimatorConfig {
    pub gemini: GeminiConfig,
    pub tts: TtsConfig,
    pub render: RenderConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiConfig {
    pub base_url: String,
    pub api_key_env: String,
    pub generate_model: String,
    pub fix_model: String,
    pub fix_temperature: f32,
    /// Ask for JSON matching a response schema instead of delimited text.
    pub structured_output: bool,
    /// Markdown file with Manim examples used to prime the model.
    pub guide_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TtsConfig {
    pub base_url: String,
    pub voice: String,
    pub speed: f32,
    pub words_per_line: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenderConfig {
    pub manim_bin: String,
    pub ffmpeg_bin: String,
    pub ffprobe_bin: String,
    pub quality: Quality,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    pub max_retries: u32,
    pub keep_work_dir: bool,
    /// Root for per-job work directories. Defaults to the user cache dir.
    #[serde(default)]
    pub work_root: Option<PathBuf>,
}

/// Manim render quality flag and the directory manim names after it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum Quality {
    #[serde(rename = "l")]
    Low,
    #[serde(rename = "m")]
    Medium,
    #[default]
    #[serde(rename = "h")]
    High,
    #[serde(rename = "p")]
    Production,
    #[serde(rename = "k")]
    FourK,
}

impl Quality {
    pub fn flag(&self) -> &'static str {
        match self {
            Quality::Low => "-ql",
            Quality::Medium => "-qm",
            Quality::High => "-qh",
            Quality::Production => "-qp",
            Quality::FourK => "-qk",
        }
    }

    pub fn output_dir_name(&self) -> &'static str {
        match self {
            Quality::Low => "480p15",
            Quality::Medium => "720p30",
            Quality::High => "1080p60",
            Quality::Production => "1440p60",
            Quality::FourK => "2160p60",
        }
    }
}

impl ManimatorConfig {
    /// Bundled defaults only, ignoring user files and the environment.
    pub fn defaults() -> Result<Self> {
        Ok(Config::builder()
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .build()?
            .try_deserialize()?)
    }

    /// Load every layer, with `explicit` (if any) just below the environment.
    #[instrument]
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        debug!("Loading configuration");

        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("manimator").join("manimator.toml");
            builder = builder.add_source(File::from(user_config).required(false));
        }

        builder = builder.add_source(File::with_name("manimator").required(false));

        if let Some(path) = explicit {
            builder = builder.add_source(File::from(path));
        }

        builder = builder.add_source(
            Environment::with_prefix("MANIMATOR")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        Ok(builder.build()?.try_deserialize()?)
    }
}
