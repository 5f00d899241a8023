//! Generate, narrate, render, and on render failure ask the model for a fix.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{error, info, instrument, warn};

use crate::{
    cache::{JobDir, get_subtitle_output_path},
    config::ManimatorConfig,
    error::{ManimatorError, Result},
    generator::ScriptGenerator,
    render::VideoRenderer,
    tts::SpeechSynthesizer,
    types::{GeneratedScript, SpeechTrack, VideoOutcome, VideoSource},
};

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    GeneratingScript,
    ScriptGenerated,
    SynthesizingSpeech,
    SpeechReady { duration: f64 },
    SpeechSkipped { reason: String },
    RenderStarted { attempt: u32 },
    RenderSucceeded { attempt: u32 },
    RenderFailed { attempt: u32, error: String },
    FixRequested { attempt: u32 },
    FixApplied { narration_changed: bool },
    FixFailed { reason: String },
}

pub trait ProgressSink: Send + Sync {
    fn report(&self, event: PipelineEvent);
}

/// Drops every event.
pub struct SilentProgress;

impl ProgressSink for SilentProgress {
    fn report(&self, _event: PipelineEvent) {}
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub max_retries: u32,
    pub work_root: PathBuf,
    pub keep_work_dir: bool,
}

impl PipelineOptions {
    pub fn from_config(config: &ManimatorConfig) -> Self {
        Self {
            max_retries: config.pipeline.max_retries,
            work_root: config
                .pipeline
                .work_root
                .clone()
                .unwrap_or_else(crate::cache::get_root_cache_dir),
            keep_work_dir: config.pipeline.keep_work_dir,
        }
    }
}

/// Result of the retry loop, with paths still inside the job directory.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedJob {
    pub video_path: PathBuf,
    pub narration: String,
    pub subtitle_path: Option<PathBuf>,
    pub attempts: u32,
}

pub struct VideoPipeline<G, S, R> {
    generator: G,
    synthesizer: S,
    renderer: R,
    options: PipelineOptions,
}

impl<G, S, R> VideoPipeline<G, S, R>
where
    G: ScriptGenerator,
    S: SpeechSynthesizer,
    R: VideoRenderer,
{
    pub fn new(generator: G, synthesizer: S, renderer: R, options: PipelineOptions) -> Self {
        Self {
            generator,
            synthesizer,
            renderer,
            options,
        }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Run a whole job and copy the video (and its subtitles) to `output`.
    #[instrument(skip_all, fields(output = %output.display()))]
    pub async fn run(
        &self,
        source: &VideoSource,
        output: &Path,
        progress: &dyn ProgressSink,
    ) -> Result<VideoOutcome> {
        let job = JobDir::create(&self.options.work_root, self.options.keep_work_dir).await?;
        info!(job_id = %job.id(), "Starting job");

        let rendered = self.render_with_fixes(source, job.path(), progress).await?;

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        fs::copy(&rendered.video_path, output).await?;

        let subtitle_path = match &rendered.subtitle_path {
            Some(subtitles) => {
                let target = get_subtitle_output_path(output);
                fs::copy(subtitles, &target).await?;
                Some(target)
            }
            None => None,
        };

        Ok(VideoOutcome {
            video_path: output.to_path_buf(),
            narration: rendered.narration,
            subtitle_path,
            attempts: rendered.attempts,
        })
    }

    /// The retry loop. Renders at most `max_retries + 1` times inside `work_dir`.
    pub async fn render_with_fixes(
        &self,
        source: &VideoSource,
        work_dir: &Path,
        progress: &dyn ProgressSink,
    ) -> Result<RenderedJob> {
        progress.report(PipelineEvent::GeneratingScript);
        let script = self.generator.generate(source).await?;
        progress.report(PipelineEvent::ScriptGenerated);

        let GeneratedScript {
            manim_code: mut code,
            mut narration,
        } = script;
        if code.trim().is_empty() {
            return Err(ManimatorError::IncompleteScript { missing: "code" });
        }
        if narration.trim().is_empty() {
            error!("Generated script came back without narration");
            return Err(ManimatorError::IncompleteScript {
                missing: "narration",
            });
        }
        let mut speech = self.speak(&narration, work_dir, progress).await;

        let context = source.original_context();
        let max_attempts = self.options.max_retries.saturating_add(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            info!(attempt, "Attempt to create Manim video");
            progress.report(PipelineEvent::RenderStarted { attempt });

            let failure = match self.renderer.render(&code, speech.as_ref(), work_dir).await {
                Ok(video_path) => {
                    info!(attempt, "Manim video creation successful");
                    progress.report(PipelineEvent::RenderSucceeded { attempt });
                    return Ok(RenderedJob {
                        video_path,
                        narration,
                        subtitle_path: speech.and_then(|track| track.subtitle_path),
                        attempts: attempt,
                    });
                }
                Err(e) if e.is_recoverable() => e,
                Err(e) => {
                    error!(attempt, error = %e, "Unexpected error during video creation");
                    return Err(e);
                }
            };

            let error_output = failure.render_output();
            error!(attempt, "Manim execution failed");
            progress.report(PipelineEvent::RenderFailed {
                attempt,
                error: error_output.clone(),
            });

            if attempt >= max_attempts {
                return Err(ManimatorError::RetriesExhausted {
                    attempts: attempt,
                    last_error: error_output,
                });
            }

            progress.report(PipelineEvent::FixRequested { attempt });
            let fixed = match self.generator.fix(&code, &error_output, &context).await {
                Ok(fixed) => fixed,
                Err(e) => {
                    error!(error = %e, "Fallback failed to fix the code");
                    progress.report(PipelineEvent::FixFailed {
                        reason: e.to_string(),
                    });
                    return Err(ManimatorError::FixFailed {
                        reason: e.to_string(),
                    });
                }
            };

            code = fixed.manim_code;
            let narration_changed = !fixed.narration.is_empty() && fixed.narration != narration;
            progress.report(PipelineEvent::FixApplied { narration_changed });

            if narration_changed {
                info!("Narration script was updated, regenerating audio and subtitles");
                narration = fixed.narration;
                speech = self.speak(&narration, work_dir, progress).await;
            } else {
                info!("Fallback kept the original narration");
            }
        }
    }

    /// Speech is optional: a failure is reported and the video goes out silent.
    async fn speak(
        &self,
        narration: &str,
        work_dir: &Path,
        progress: &dyn ProgressSink,
    ) -> Option<SpeechTrack> {
        progress.report(PipelineEvent::SynthesizingSpeech);
        match self.synthesizer.synthesize(narration, work_dir).await {
            Ok(track) => {
                progress.report(PipelineEvent::SpeechReady {
                    duration: track.duration,
                });
                Some(track)
            }
            Err(e) => {
                warn!(error = %e, "Could not generate audio, proceeding without audio/subtitles");
                progress.report(PipelineEvent::SpeechSkipped {
                    reason: e.to_string(),
                });
                None
            }
        }
    }
}

/// One-shot repair of code that failed elsewhere.
pub async fn fix_code<G>(
    generator: &G,
    faulty_code: &str,
    error_message: &str,
    original_context: &str,
) -> Result<GeneratedScript>
where
    G: ScriptGenerator + ?Sized,
{
    if faulty_code.trim().is_empty() {
        return Err(ManimatorError::FixFailed {
            reason: "no code to fix".to_string(),
        });
    }

    generator
        .fix(faulty_code, error_message, original_context)
        .await
        .map_err(|e| ManimatorError::FixFailed {
            reason: e.to_string(),
        })
}
