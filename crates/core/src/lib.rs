pub mod cache;
pub mod config;
pub mod error;
pub mod ffmpeg;
pub mod format;
pub mod gemini;
pub mod generator;
pub mod pipeline;
pub mod prompt;
pub mod provider;
pub mod render;
pub mod script;
pub mod subtitle;
pub mod tts;
pub mod types;

pub use cache::{JobDir, get_root_cache_dir, get_subtitle_output_path};
pub use config::{ManimatorConfig, Quality};
pub use error::{ManimatorError, Result};
pub use format::{format_duration, format_outcome_readable};
pub use generator::{GeminiScriptGenerator, ScriptGenerator};
pub use pipeline::{
    PipelineEvent, PipelineOptions, ProgressSink, SilentProgress, VideoPipeline, fix_code,
};
pub use provider::{ModelRole, Provider};
pub use render::{ManimRenderer, VideoRenderer};
pub use tts::{KokoroSynthesizer, SpeechSynthesizer};
pub use types::{GeneratedScript, SpeechTrack, VideoOutcome, VideoSource, WordTiming};
