use std::{
    sync::Mutex,
    time::{Duration, Instant},
};

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use manimator_core::{PipelineEvent, ProgressSink, format_duration};

pub fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.cyan} {msg}")
            .unwrap(),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// Last non-empty line of a render error, which is usually the exception.
fn error_summary(error: &str) -> &str {
    error
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("unknown error")
}

struct Step {
    spinner: ProgressBar,
    started: Instant,
}

/// Spinner per pipeline stage, finished with a check mark or a cross.
pub struct SpinnerProgress {
    max_attempts: u32,
    step: Mutex<Option<Step>>,
}

impl SpinnerProgress {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_attempts: max_retries.saturating_add(1),
            step: Mutex::new(None),
        }
    }

    fn start(&self, msg: &str) {
        let mut step = self.step.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = step.take() {
            previous.spinner.finish_and_clear();
        }
        *step = Some(Step {
            spinner: create_spinner(msg),
            started: Instant::now(),
        });
    }

    fn finish(&self, mark: console::StyledObject<&str>, msg: &str) {
        let mut step = self.step.lock().unwrap_or_else(|e| e.into_inner());
        match step.take() {
            Some(Step { spinner, started }) => spinner.finish_with_message(format!(
                "{} {} {}",
                mark,
                msg,
                style(format!("[{}]", format_duration(started.elapsed()))).dim()
            )),
            None => println!("{} {}", mark, msg),
        }
    }

    fn succeed(&self, msg: &str) {
        self.finish(style("✓").green().bold(), msg);
    }

    fn warn(&self, msg: &str) {
        self.finish(style("!").yellow().bold(), msg);
    }

    fn fail(&self, msg: &str) {
        self.finish(style("✗").red().bold(), msg);
    }
}

impl ProgressSink for SpinnerProgress {
    fn report(&self, event: PipelineEvent) {
        match event {
            PipelineEvent::GeneratingScript => self.start("Generating script with Gemini..."),
            PipelineEvent::ScriptGenerated => self.succeed("Script generated"),
            PipelineEvent::SynthesizingSpeech => self.start("Synthesizing narration..."),
            PipelineEvent::SpeechReady { duration } => {
                self.succeed(&format!("Narration: {:.1}s of audio", duration))
            }
            PipelineEvent::SpeechSkipped { reason } => {
                self.warn(&format!("No narration audio: {}", reason))
            }
            PipelineEvent::RenderStarted { attempt } => self.start(&format!(
                "Rendering with Manim (attempt {}/{})...",
                attempt, self.max_attempts
            )),
            PipelineEvent::RenderSucceeded { attempt } => {
                self.succeed(&format!("Rendered on attempt {}", attempt))
            }
            PipelineEvent::RenderFailed { attempt, error } => {
                self.fail(&format!("Attempt {} failed", attempt));
                println!("  {}", style(error_summary(&error)).dim());
            }
            PipelineEvent::FixRequested { .. } => self.start("Asking Gemini to fix the code..."),
            PipelineEvent::FixApplied { narration_changed } => {
                if narration_changed {
                    self.succeed("Code fixed, narration updated");
                } else {
                    self.succeed("Code fixed");
                }
            }
            PipelineEvent::FixFailed { reason } => self.fail(&format!("Fix failed: {}", reason)),
        }
    }
}
