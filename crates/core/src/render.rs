use std::{
    path::{Path, PathBuf},
    sync::LazyLock,
};

use async_trait::async_trait;
use regex::Regex;
use tokio::{fs, process::Command};
use tracing::{error, info, instrument};

use crate::{
    config::{Quality, RenderConfig},
    error::{ManimatorError, Result},
    ffmpeg::{Ffmpeg, MuxInputs},
    types::SpeechTrack,
};

pub const SCRIPT_FILE_NAME: &str = "generated_video.py";
pub const MEDIA_DIR_NAME: &str = "media";
pub const EXTENDED_VIDEO_NAME: &str = "extended_video.mp4";
pub const FINAL_VIDEO_NAME: &str = "final_output.mp4";

static SCENE_CLASS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"class\s+(\w+)\s*\(\s*(?:ThreeD|Multi|MovingCamera|Zoomed)?[Ss]cene\s*\)")
        .expect("valid scene class regex")
});

/// Name of the first Scene subclass in `code`.
pub fn scene_name(code: &str) -> Result<String> {
    SCENE_CLASS
        .captures(code)
        .map(|captures| captures[1].to_string())
        .ok_or(ManimatorError::SceneNotFound)
}

/// Where manim leaves the rendered scene for a `--media_dir` of `media_dir`.
pub fn rendered_video_path(media_dir: &Path, quality: Quality, scene: &str) -> PathBuf {
    let script_stem = SCRIPT_FILE_NAME.trim_end_matches(".py");
    media_dir
        .join("videos")
        .join(script_stem)
        .join(quality.output_dir_name())
        .join(format!("{}.mp4", scene))
}

/// Turns animation source (plus optional narration) into a finished video file.
#[async_trait]
pub trait VideoRenderer: Send + Sync {
    async fn render(
        &self,
        manim_code: &str,
        speech: Option<&SpeechTrack>,
        work_dir: &Path,
    ) -> Result<PathBuf>;
}

pub struct ManimRenderer {
    manim_bin: String,
    quality: Quality,
    ffmpeg: Ffmpeg,
}

impl ManimRenderer {
    pub fn new(config: &RenderConfig) -> Self {
        Self {
            manim_bin: config.manim_bin.clone(),
            quality: config.quality,
            ffmpeg: Ffmpeg::new(&config.ffmpeg_bin, &config.ffprobe_bin),
        }
    }

    async fn run_manim(&self, work_dir: &Path, scene: &str) -> Result<PathBuf> {
        info!(
            "Running Manim with command: {} {} {} {} --media_dir {}",
            self.manim_bin,
            self.quality.flag(),
            SCRIPT_FILE_NAME,
            scene,
            MEDIA_DIR_NAME
        );

        let output = Command::new(&self.manim_bin)
            .current_dir(work_dir)
            .arg(self.quality.flag())
            .arg(SCRIPT_FILE_NAME)
            .arg(scene)
            .arg("--media_dir")
            .arg(MEDIA_DIR_NAME)
            .output()
            .await?;

        if !output.status.success() {
            // manim prints tracebacks through rich, which can land on stdout
            let mut report = String::from_utf8_lossy(&output.stderr).trim().to_string();
            if report.is_empty() {
                report = String::from_utf8_lossy(&output.stdout).trim().to_string();
            }
            error!(status = %output.status, "Manim failed:\n{}", report);
            return Err(ManimatorError::RenderFailed {
                scene: scene.to_string(),
                stderr: report,
            });
        }

        let video_path =
            rendered_video_path(&work_dir.join(MEDIA_DIR_NAME), self.quality, scene);
        if !video_path.exists() {
            error!(path = %video_path.display(), "No rendered video found");
            return Err(ManimatorError::RenderedVideoMissing {
                scene: scene.to_string(),
                path: video_path,
            });
        }

        Ok(video_path)
    }
}

#[async_trait]
impl VideoRenderer for ManimRenderer {
    #[instrument(skip_all, fields(work_dir = %work_dir.display()))]
    async fn render(
        &self,
        manim_code: &str,
        speech: Option<&SpeechTrack>,
        work_dir: &Path,
    ) -> Result<PathBuf> {
        info!("Starting to create Manim video");
        let script_path = work_dir.join(SCRIPT_FILE_NAME);
        fs::write(&script_path, manim_code).await?;

        let scene = scene_name(manim_code)?;
        info!(scene = %scene, "Identified scene name");

        let rendered = self.run_manim(work_dir, &scene).await?;

        let audio = speech
            .map(|track| track.audio_path.as_path())
            .filter(|path| path.exists());
        let subtitles = match speech
            .and_then(|track| track.subtitle_path.as_deref())
            .filter(|path| path.exists())
        {
            Some(path) => Some(std::path::absolute(path)?),
            None => None,
        };

        let extended_path = work_dir.join(EXTENDED_VIDEO_NAME);
        let input = match audio {
            Some(audio) => {
                info!(audio = %audio.display(), "Audio file found");
                self.ffmpeg
                    .extend_to_audio(&rendered, audio, &extended_path)
                    .await?
            }
            None => rendered,
        };

        let final_path = work_dir.join(FINAL_VIDEO_NAME);
        self.ffmpeg
            .mux(&MuxInputs {
                video: &input,
                audio,
                subtitles: subtitles.as_deref(),
                output: &final_path,
            })
            .await?;

        for leftover in [&extended_path, &script_path] {
            if leftover.exists() {
                fs::remove_file(leftover).await?;
            }
        }

        info!(path = %final_path.display(), "Final video created");
        Ok(final_path)
    }
}
