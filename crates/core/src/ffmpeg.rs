use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

use tokio::process::Command;
use tracing::{error, info, instrument};

use crate::error::{ManimatorError, Result};

/// Escape a path for use inside a single-quoted ffmpeg filter argument.
pub fn sanitize_filter_path(path: &str) -> String {
    if cfg!(windows) {
        sanitize_filter_path_windows(path)
    } else {
        sanitize_filter_path_unix(path)
    }
}

pub fn sanitize_filter_path_unix(path: &str) -> String {
    path.replace('\'', "'\\''")
        .replace(':', "\\:")
        .replace(',', "\\,")
        .replace('[', "\\[")
        .replace(']', "\\]")
}

pub fn sanitize_filter_path_windows(path: &str) -> String {
    path.replace('\\', "\\\\").replace(':', "\\:")
}

/// Freeze-frame filter that stretches the video to the audio length, if the audio is longer.
pub fn pad_filter(video_duration: f64, audio_duration: f64) -> Option<String> {
    (audio_duration > video_duration).then(|| {
        format!(
            "tpad=stop_mode=clone:stop_duration={}",
            audio_duration - video_duration
        )
    })
}

#[derive(Debug, Clone, Copy)]
pub struct MuxInputs<'a> {
    pub video: &'a Path,
    pub audio: Option<&'a Path>,
    /// Absolute path of the `.ass` subtitle file.
    pub subtitles: Option<&'a Path>,
    pub output: &'a Path,
}

pub fn mux_args(inputs: &MuxInputs<'_>) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["-y".into(), "-i".into(), inputs.video.into()];

    if let Some(audio) = inputs.audio {
        args.push("-i".into());
        args.push(audio.into());
    }

    if let Some(subtitles) = inputs.subtitles {
        let sanitized = sanitize_filter_path(&subtitles.to_string_lossy());
        args.push("-vf".into());
        args.push(format!("ass='{}'", sanitized).into());
    }

    args.push("-map".into());
    args.push("0:v:0".into());
    if inputs.audio.is_some() {
        args.push("-map".into());
        args.push("1:a:0".into());
    }

    for arg in ["-c:v", "libx264", "-c:a", "aac", "-shortest"] {
        args.push(arg.into());
    }
    args.push(inputs.output.into());
    args
}

#[derive(Debug, Clone)]
pub struct Ffmpeg {
    ffmpeg_bin: String,
    ffprobe_bin: String,
}

impl Ffmpeg {
    pub fn new(ffmpeg_bin: impl Into<String>, ffprobe_bin: impl Into<String>) -> Self {
        Self {
            ffmpeg_bin: ffmpeg_bin.into(),
            ffprobe_bin: ffprobe_bin.into(),
        }
    }

    /// Container duration in seconds
    pub async fn probe_duration(&self, path: &Path) -> Result<f64> {
        let output = Command::new(&self.ffprobe_bin)
            .arg("-v")
            .arg("error")
            .arg("-show_entries")
            .arg("format=duration")
            .arg("-of")
            .arg("default=noprint_wrappers=1:nokey=1")
            .arg(path)
            .output()
            .await?;

        if !output.status.success() {
            return Err(ManimatorError::ProbeFailed {
                path: path.to_path_buf(),
                reason: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        stdout
            .trim()
            .parse::<f64>()
            .map_err(|e| ManimatorError::ProbeFailed {
                path: path.to_path_buf(),
                reason: format!("cannot parse duration {:?}: {}", stdout.trim(), e),
            })
    }

    /// Pad `video` with its last frame when `audio` runs longer. Returns the
    /// path ffmpeg should mux from.
    #[instrument(skip(self))]
    pub async fn extend_to_audio(
        &self,
        video: &Path,
        audio: &Path,
        extended: &Path,
    ) -> Result<PathBuf> {
        let video_duration = self.probe_duration(video).await?;
        let audio_duration = self.probe_duration(audio).await?;
        info!(video_duration, audio_duration, "Probed durations");

        let Some(filter) = pad_filter(video_duration, audio_duration) else {
            return Ok(video.to_path_buf());
        };

        info!("Audio is longer than video, extending video with freeze frame");
        self.pad_video(video, &filter, extended).await?;
        Ok(extended.to_path_buf())
    }

    pub async fn pad_video(&self, video: &Path, filter: &str, extended: &Path) -> Result<()> {
        let output = Command::new(&self.ffmpeg_bin)
            .arg("-y")
            .arg("-i")
            .arg(video)
            .arg("-vf")
            .arg(filter)
            .arg("-c:v")
            .arg("libx264")
            .arg(extended)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            error!(stderr = %stderr, "Extending video failed");
            return Err(ManimatorError::MuxFailed {
                stage: "pad",
                stderr,
            });
        }

        Ok(())
    }

    #[instrument(skip(self, inputs), fields(output = %inputs.output.display()))]
    pub async fn mux(&self, inputs: &MuxInputs<'_>) -> Result<()> {
        let args = mux_args(inputs);
        info!(
            "Merging with command: {} {}",
            self.ffmpeg_bin,
            args.iter()
                .map(|a| a.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ")
        );

        let output = Command::new(&self.ffmpeg_bin).args(&args).output().await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            error!(stderr = %stderr, "Merging failed");
            return Err(ManimatorError::MuxFailed {
                stage: "merge",
                stderr,
            });
        }

        Ok(())
    }
}
