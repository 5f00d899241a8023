use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// One parsed model answer: the animation source and the narration that goes with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedScript {
    pub manim_code: String,
    pub narration: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum VideoSource {
    Idea(String),
    Pdf { path: PathBuf },
}

impl VideoSource {
    /// The request as the fix prompt describes it.
    pub fn original_context(&self) -> String {
        match self {
            VideoSource::Idea(idea) => idea.clone(),
            VideoSource::Pdf { path } => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| path.display().to_string());
                format!("Summary/concept from PDF: {}", name)
            }
        }
    }

    pub fn pdf_path(&self) -> Option<&Path> {
        match self {
            VideoSource::Pdf { path } => Some(path),
            VideoSource::Idea(_) => None,
        }
    }
}

/// A spoken word with absolute start/end seconds in the final audio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordTiming {
    pub text: String,
    pub start: f64,
    pub end: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpeechTrack {
    pub audio_path: PathBuf,
    pub subtitle_path: Option<PathBuf>,
    pub duration: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VideoOutcome {
    pub video_path: PathBuf,
    pub narration: String,
    pub subtitle_path: Option<PathBuf>,
    pub attempts: u32,
}
