//! Mock generator, synthesizer and renderer for pipeline tests.

use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use manimator_core::{
    GeneratedScript, ManimatorError, PipelineEvent, ProgressSink, Result, ScriptGenerator,
    SpeechSynthesizer, SpeechTrack, VideoRenderer, VideoSource,
    render::FINAL_VIDEO_NAME,
    tts::{AUDIO_FILE_NAME, SUBTITLE_FILE_NAME},
};

/// One scripted answer to a fix request.
#[derive(Debug, Clone)]
pub enum FixResponse {
    /// Return this code and narration
    Script { code: String, narration: String },
    /// Fail with an API error
    Error(String),
}

impl FixResponse {
    pub fn code(code: &str, narration: &str) -> Self {
        FixResponse::Script {
            code: code.to_string(),
            narration: narration.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FixCall {
    pub faulty_code: String,
    pub error_message: String,
    pub original_context: String,
}

/// Generator that returns a fixed first draft and then a sequence of fixes.
pub struct MockGenerator {
    script: GeneratedScript,
    fail_generate: bool,
    fixes: Vec<FixResponse>,
    fix_calls: Arc<Mutex<Vec<FixCall>>>,
}

impl MockGenerator {
    pub fn new(code: &str, narration: &str) -> Self {
        Self {
            script: GeneratedScript {
                manim_code: code.to_string(),
                narration: narration.to_string(),
            },
            fail_generate: false,
            fixes: Vec::new(),
            fix_calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_generate: true,
            ..Self::new("", "")
        }
    }

    pub fn with_fixes(mut self, fixes: Vec<FixResponse>) -> Self {
        self.fixes = fixes;
        self
    }

    /// Shared handle to the recorded fix requests.
    pub fn fix_calls(&self) -> Arc<Mutex<Vec<FixCall>>> {
        Arc::clone(&self.fix_calls)
    }
}

#[async_trait]
impl ScriptGenerator for MockGenerator {
    async fn generate(&self, _source: &VideoSource) -> Result<GeneratedScript> {
        if self.fail_generate {
            return Err(ManimatorError::EmptyResponse);
        }
        Ok(self.script.clone())
    }

    async fn fix(
        &self,
        faulty_code: &str,
        error_message: &str,
        original_context: &str,
    ) -> Result<GeneratedScript> {
        let mut calls = self.fix_calls.lock().unwrap();
        let index = calls.len();
        calls.push(FixCall {
            faulty_code: faulty_code.to_string(),
            error_message: error_message.to_string(),
            original_context: original_context.to_string(),
        });

        match self.fixes.get(index) {
            Some(FixResponse::Script { code, narration }) => Ok(GeneratedScript {
                manim_code: code.clone(),
                narration: narration.clone(),
            }),
            Some(FixResponse::Error(body)) => Err(ManimatorError::Api {
                status: 500,
                body: body.clone(),
            }),
            None => Ok(GeneratedScript {
                manim_code: format!("{}\n# fix {}", faulty_code, index + 1),
                narration: self.script.narration.clone(),
            }),
        }
    }
}

/// Synthesizer that writes placeholder audio and subtitle files.
pub struct MockSynthesizer {
    fail: bool,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockSynthesizer {
    pub fn new() -> Self {
        Self {
            fail: false,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn calls(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl SpeechSynthesizer for MockSynthesizer {
    async fn synthesize(&self, text: &str, out_dir: &Path) -> Result<SpeechTrack> {
        self.calls.lock().unwrap().push(text.to_string());
        if self.fail {
            return Err(ManimatorError::SpeechFailed {
                reason: "connection refused".to_string(),
            });
        }

        let audio_path = out_dir.join(AUDIO_FILE_NAME);
        let subtitle_path = out_dir.join(SUBTITLE_FILE_NAME);
        tokio::fs::write(&audio_path, b"RIFF").await?;
        tokio::fs::write(&subtitle_path, text).await?;

        Ok(SpeechTrack {
            audio_path,
            subtitle_path: Some(subtitle_path),
            duration: 3.5,
        })
    }
}

/// One scripted render outcome.
#[derive(Debug, Clone)]
pub enum RenderResponse {
    /// Write a video file and succeed
    Video,
    /// Manim exited with this stderr
    ManimError(String),
    /// Code without a Scene class
    NoScene,
    /// A failure the retry loop must not swallow
    Io(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderCall {
    pub code: String,
    pub narration: Option<String>,
}

/// Renderer that plays back a sequence of outcomes, then succeeds.
pub struct MockRenderer {
    responses: Vec<RenderResponse>,
    calls: Arc<Mutex<Vec<RenderCall>>>,
}

impl MockRenderer {
    pub fn new(responses: Vec<RenderResponse>) -> Self {
        Self {
            responses,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn always_failing(stderr: &str) -> Self {
        Self::new(vec![RenderResponse::ManimError(stderr.to_string()); 32])
    }

    pub fn calls(&self) -> Arc<Mutex<Vec<RenderCall>>> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl VideoRenderer for MockRenderer {
    async fn render(
        &self,
        manim_code: &str,
        speech: Option<&SpeechTrack>,
        work_dir: &Path,
    ) -> Result<PathBuf> {
        let narration = match speech.and_then(|track| track.subtitle_path.as_deref()) {
            Some(path) => Some(tokio::fs::read_to_string(path).await?),
            None => None,
        };

        let index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(RenderCall {
                code: manim_code.to_string(),
                narration,
            });
            calls.len() - 1
        };

        match self.responses.get(index).cloned().unwrap_or(RenderResponse::Video) {
            RenderResponse::Video => {
                let path = work_dir.join(FINAL_VIDEO_NAME);
                tokio::fs::write(&path, format!("video {}", index + 1)).await?;
                Ok(path)
            }
            RenderResponse::ManimError(stderr) => Err(ManimatorError::RenderFailed {
                scene: "TestScene".to_string(),
                stderr,
            }),
            RenderResponse::NoScene => Err(ManimatorError::SceneNotFound),
            RenderResponse::Io(message) => Err(ManimatorError::IoError(std::io::Error::other(
                message,
            ))),
        }
    }
}

/// Sink that keeps every event for later assertions.
#[derive(Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<PipelineEvent>>,
}

impl RecordingProgress {
    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ProgressSink for RecordingProgress {
    fn report(&self, event: PipelineEvent) {
        self.events.lock().unwrap().push(event);
    }
}
