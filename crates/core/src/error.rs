use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ManimatorError {
    #[error("Missing API key: {env_var} environment variable is not set")]
    MissingApiKey { env_var: String },

    #[error("Either an idea or a PDF must be provided")]
    MissingSource,

    #[error("PDF file not found at: {0}")]
    PdfNotFound(PathBuf),

    #[error("Gemini API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Content generation blocked. Reason: {reason}")]
    Blocked { reason: String },

    #[error("Failed to generate content. The response was empty or malformed.")]
    EmptyResponse,

    #[error(
        "The response does not contain the expected '### NARRATION:' delimiter or a valid Python code block"
    )]
    ResponseFormat,

    #[error("Failed to generate initial script/code: the {missing} is empty")]
    IncompleteScript { missing: &'static str },

    #[error("Text for TTS cannot be empty")]
    EmptyNarration,

    #[error("Speech synthesis failed: {reason}")]
    SpeechFailed { reason: String },

    #[error("No Scene class found in generated code")]
    SceneNotFound,

    #[error("Manim failed for scene {scene}: {stderr}")]
    RenderFailed { scene: String, stderr: String },

    #[error("No rendered video found for scene {scene} at {path}")]
    RenderedVideoMissing { scene: String, path: PathBuf },

    #[error("ffprobe failed for {path}: {reason}")]
    ProbeFailed { path: PathBuf, reason: String },

    #[error("ffmpeg {stage} failed: {stderr}")]
    MuxFailed { stage: &'static str, stderr: String },

    #[error("Fallback failed to fix the code: {reason}")]
    FixFailed { reason: String },

    #[error("Manim failed after {attempts} attempts. Could not generate video.")]
    RetriesExhausted { attempts: u32, last_error: String },

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("API request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("WAV error: {0}")]
    WavError(#[from] hound::Error),

    #[error("Base64 decode error: {0}")]
    DecodeError(#[from] base64::DecodeError),
}

impl ManimatorError {
    /// Render-stage failures that the fix loop may recover from by asking for new code.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ManimatorError::RenderFailed { .. }
                | ManimatorError::RenderedVideoMissing { .. }
                | ManimatorError::SceneNotFound
                | ManimatorError::MuxFailed { .. }
                | ManimatorError::ProbeFailed { .. }
        )
    }

    /// Text handed back to the model when asking it to fix the code.
    pub fn render_output(&self) -> String {
        match self {
            ManimatorError::RenderFailed { stderr, .. } => stderr.clone(),
            ManimatorError::MuxFailed { stderr, .. } => stderr.clone(),
            ManimatorError::ProbeFailed { reason, .. } => reason.clone(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ManimatorError>;
