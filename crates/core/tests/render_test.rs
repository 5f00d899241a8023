//! Tests for scene detection and the manim renderer, using stand-in tool scripts.

use std::path::{Path, PathBuf};

use manimator_core::{
    ManimRenderer, ManimatorError, Quality, SpeechTrack, VideoRenderer,
    config::RenderConfig,
    ffmpeg::sanitize_filter_path_unix,
    render::{
        EXTENDED_VIDEO_NAME, FINAL_VIDEO_NAME, SCRIPT_FILE_NAME, rendered_video_path, scene_name,
    },
};
use tempfile::TempDir;

fn missing_binaries() -> RenderConfig {
    RenderConfig {
        manim_bin: "manimator-missing-manim".to_string(),
        ffmpeg_bin: "manimator-missing-ffmpeg".to_string(),
        ffprobe_bin: "manimator-missing-ffprobe".to_string(),
        quality: Quality::Low,
    }
}

#[test]
fn test_scene_name_variants() {
    assert_eq!(scene_name("class Intro(Scene):").unwrap(), "Intro");
    assert_eq!(scene_name("class Cube( ThreeDScene ):").unwrap(), "Cube");
    assert_eq!(
        scene_name("class Pan(MovingCameraScene):").unwrap(),
        "Pan"
    );
    assert_eq!(scene_name("class Lower(scene):").unwrap(), "Lower");
}

#[test]
fn test_scene_name_picks_first_scene() {
    let code = "class Helper(VGroup):\n    pass\n\nclass First(Scene):\n    pass\n\nclass Second(Scene):\n    pass";
    assert_eq!(scene_name(code).unwrap(), "First");
}

#[test]
fn test_scene_name_missing() {
    let result = scene_name("class Helper(VMobject):\n    pass");
    assert!(matches!(result, Err(ManimatorError::SceneNotFound)));
}

#[test]
fn test_rendered_video_path_uses_quality_dir() {
    assert_eq!(
        rendered_video_path(Path::new("media"), Quality::High, "Intro"),
        PathBuf::from("media/videos/generated_video/1080p60/Intro.mp4")
    );
    assert_eq!(
        rendered_video_path(Path::new("media"), Quality::Low, "Intro"),
        PathBuf::from("media/videos/generated_video/480p15/Intro.mp4")
    );
}

#[tokio::test]
async fn test_render_without_scene_writes_script_and_fails() {
    let dir = TempDir::new().unwrap();
    let renderer = ManimRenderer::new(&missing_binaries());

    let result = renderer
        .render("print('no scene here')", None, dir.path())
        .await;

    assert!(matches!(result, Err(ManimatorError::SceneNotFound)));
    assert_eq!(
        std::fs::read_to_string(dir.path().join(SCRIPT_FILE_NAME)).unwrap(),
        "print('no scene here')"
    );
}

#[tokio::test]
async fn test_render_with_missing_manim_is_not_recoverable() {
    let dir = TempDir::new().unwrap();
    let renderer = ManimRenderer::new(&missing_binaries());

    let result = renderer
        .render("class Intro(Scene):\n    pass", None, dir.path())
        .await;

    let error = result.unwrap_err();
    assert!(matches!(error, ManimatorError::IoError(_)));
    assert!(!error.is_recoverable());
}

/// Write an executable shell script standing in for an external tool.
#[cfg(unix)]
fn fake_tool(dir: &Path, name: &str, body: &str) -> String {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path.to_string_lossy().to_string()
}

#[cfg(unix)]
#[tokio::test]
async fn test_render_pads_to_audio_and_burns_subtitles() {
    let tools = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let log = tools.path().join("ffmpeg.log");

    // argv: -ql generated_video.py <Scene> --media_dir media
    let manim = fake_tool(
        tools.path(),
        "manim",
        "mkdir -p \"$5/videos/generated_video/480p15\"\n\
         echo video > \"$5/videos/generated_video/480p15/$3.mp4\"",
    );
    let ffprobe = fake_tool(
        tools.path(),
        "ffprobe",
        "for last; do :; done\n\
         case \"$last\" in *.wav) echo 12.5 ;; *) echo 10.0 ;; esac",
    );
    let ffmpeg = fake_tool(
        tools.path(),
        "ffmpeg",
        &format!(
            "echo \"$@\" >> '{}'\nfor last; do :; done\necho muxed > \"$last\"",
            log.display()
        ),
    );

    let audio_path = work.path().join("narration.wav");
    let subtitle_path = work.path().join("narration.ass");
    std::fs::write(&audio_path, b"wav").unwrap();
    std::fs::write(&subtitle_path, b"ass").unwrap();
    let speech = SpeechTrack {
        audio_path,
        subtitle_path: Some(subtitle_path.clone()),
        duration: 12.5,
    };

    let renderer = ManimRenderer::new(&RenderConfig {
        manim_bin: manim,
        ffmpeg_bin: ffmpeg,
        ffprobe_bin: ffprobe,
        quality: Quality::Low,
    });
    let final_path = renderer
        .render("class Intro(Scene):\n    pass", Some(&speech), work.path())
        .await
        .expect("render succeeds");

    assert_eq!(final_path, work.path().join(FINAL_VIDEO_NAME));
    assert_eq!(std::fs::read_to_string(&final_path).unwrap().trim(), "muxed");
    assert!(!work.path().join(SCRIPT_FILE_NAME).exists());
    assert!(!work.path().join(EXTENDED_VIDEO_NAME).exists());
    assert!(rendered_video_path(&work.path().join("media"), Quality::Low, "Intro").exists());

    let calls = std::fs::read_to_string(&log).unwrap();
    let calls: Vec<&str> = calls.lines().collect();
    assert_eq!(calls.len(), 2);

    let pad = calls[0];
    assert!(pad.contains("-vf tpad=stop_mode=clone:stop_duration=2.5"));
    assert!(pad.ends_with(EXTENDED_VIDEO_NAME));

    let subtitles = std::path::absolute(&subtitle_path).unwrap();
    let mux = calls[1];
    assert!(mux.contains(EXTENDED_VIDEO_NAME));
    assert!(mux.contains(&format!(
        "ass='{}'",
        sanitize_filter_path_unix(&subtitles.to_string_lossy())
    )));
    assert!(mux.contains("-map 1:a:0"));
    assert!(mux.contains("-shortest"));
}

#[cfg(unix)]
#[tokio::test]
async fn test_failing_manim_reports_its_output() {
    let tools = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();

    let manim = fake_tool(
        tools.path(),
        "manim",
        "echo \"NameError: name 'Circel' is not defined\"\nexit 1",
    );
    let mut config = missing_binaries();
    config.manim_bin = manim;

    let result = ManimRenderer::new(&config)
        .render("class Intro(Scene):\n    pass", None, work.path())
        .await;

    match result {
        Err(error @ ManimatorError::RenderFailed { .. }) => {
            assert!(error.is_recoverable());
            assert_eq!(
                error.render_output(),
                "NameError: name 'Circel' is not defined"
            );
        }
        other => panic!("expected RenderFailed, got {:?}", other),
    }
}
