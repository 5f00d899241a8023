//! Tests for narration chunking, WAV handling and the captioned-speech client.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use hound::{SampleFormat, WavSpec, WavWriter};
use manimator_core::{
    KokoroSynthesizer, ManimatorConfig, ManimatorError, SpeechSynthesizer, WordTiming,
    tts::{SpeechChunk, concat_chunks, decode_wav, encode_wav, split_chunks},
};
use serde_json::json;
use tempfile::TempDir;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_partial_json, method, path},
};

fn mono(sample_rate: u32) -> WavSpec {
    WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    }
}

fn chunk(sample_rate: u32, seconds: f64, words: Vec<WordTiming>) -> SpeechChunk {
    SpeechChunk {
        spec: mono(sample_rate),
        samples: vec![0; (f64::from(sample_rate) * seconds) as usize],
        words,
    }
}

fn word(text: &str, start: f64, end: f64) -> WordTiming {
    WordTiming {
        text: text.to_string(),
        start,
        end,
    }
}

#[test]
fn test_split_chunks_on_newlines() {
    let text = "First line.\n\n  Second line.  \n\n\nThird.\n";
    assert_eq!(
        split_chunks(text),
        vec!["First line.", "Second line.", "Third."]
    );
    assert!(split_chunks(" \n \n").is_empty());
}

#[test]
fn test_concat_offsets_word_timings() {
    let chunks = vec![
        chunk(24_000, 0.5, vec![word("Hello", 0.0, 0.4)]),
        chunk(24_000, 1.0, vec![word("again", 0.1, 0.3)]),
    ];

    let (spec, samples, words) = concat_chunks(chunks).unwrap();
    assert_eq!(spec.sample_rate, 24_000);
    assert_eq!(samples.len(), 36_000);
    assert_eq!(words[0], word("Hello", 0.0, 0.4));
    assert!((words[1].start - 0.6).abs() < 1e-9);
    assert!((words[1].end - 0.8).abs() < 1e-9);
}

#[test]
fn test_concat_rejects_mixed_sample_rates() {
    let chunks = vec![chunk(24_000, 0.1, vec![]), chunk(22_050, 0.1, vec![])];
    assert!(matches!(
        concat_chunks(chunks),
        Err(ManimatorError::SpeechFailed { .. })
    ));
}

#[test]
fn test_concat_of_nothing() {
    assert!(matches!(
        concat_chunks(Vec::new()),
        Err(ManimatorError::EmptyNarration)
    ));
}

#[test]
fn test_encoded_wav_decodes_to_same_samples() {
    let samples: Vec<i16> = vec![0, 1200, -1200, i16::MAX, i16::MIN];
    let bytes = encode_wav(mono(16_000), &samples).unwrap();

    let (spec, decoded) = decode_wav(&bytes).unwrap();
    assert_eq!(spec, mono(16_000));
    assert_eq!(decoded, samples);
}

#[test]
fn test_float_wav_is_converted_to_pcm16() {
    let spec = WavSpec {
        channels: 1,
        sample_rate: 24_000,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut buffer = std::io::Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut buffer, spec).unwrap();
        for sample in [0.0f32, 1.0, -1.0, 2.0] {
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();
    }

    let (decoded_spec, samples) = decode_wav(&buffer.into_inner()).unwrap();
    assert_eq!(decoded_spec.bits_per_sample, 16);
    assert_eq!(decoded_spec.sample_format, SampleFormat::Int);
    assert_eq!(samples, vec![0, i16::MAX, -i16::MAX, i16::MAX]);
}

#[test]
fn test_chunk_duration() {
    let stereo = SpeechChunk {
        spec: WavSpec {
            channels: 2,
            ..mono(10)
        },
        samples: vec![0; 40],
        words: Vec::new(),
    };
    assert!((stereo.duration() - 2.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_empty_narration_is_rejected_without_request() {
    let dir = TempDir::new().unwrap();
    let synthesizer = KokoroSynthesizer::new(&ManimatorConfig::defaults().unwrap().tts);

    let result = synthesizer.synthesize(" \n ", dir.path()).await;
    assert!(matches!(result, Err(ManimatorError::EmptyNarration)));
}

fn synthesizer_for(server: &MockServer) -> KokoroSynthesizer {
    let mut config = ManimatorConfig::defaults().unwrap().tts;
    config.base_url = server.uri();
    KokoroSynthesizer::new(&config)
}

/// Half a second of silence at 24 kHz, base64 encoded.
fn half_second_audio() -> String {
    let samples = vec![0i16; 12_000];
    STANDARD.encode(encode_wav(mono(24_000), &samples).unwrap())
}

#[tokio::test]
async fn test_captioned_speech_fills_missing_timestamps() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/dev/captioned_speech"))
        .and(body_partial_json(
            json!({ "input": "Hello.", "return_timestamps": true }),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "audio": half_second_audio(),
            "timestamps": [{ "word": " Hello." }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/dev/captioned_speech"))
        .and(body_partial_json(json!({ "input": "Second line." })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "audio": half_second_audio(),
            "timestamps": [
                { "word": "Second", "start_time": 0.1, "end_time": 0.3 },
                { "word": "line.", "start_time": 0.3 }
            ]
        })))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let track = synthesizer_for(&server)
        .synthesize("Hello.\nSecond line.", dir.path())
        .await
        .expect("synthesis succeeds");

    assert!((track.duration - 1.0).abs() < 1e-9);
    assert_eq!(track.audio_path, dir.path().join("narration.wav"));

    let (spec, samples) = decode_wav(&std::fs::read(&track.audio_path).unwrap()).unwrap();
    assert_eq!(spec.sample_rate, 24_000);
    assert_eq!(samples.len(), 24_000);

    let subtitle_path = track.subtitle_path.expect("subtitles written");
    let subtitles = std::fs::read_to_string(subtitle_path).unwrap();
    assert!(subtitles.contains("Dialogue: 0,0:00:00.00,0:00:00.50,Default,,0,0,0,,Hello."));
    assert!(subtitles.contains("Dialogue: 0,0:00:00.60,0:00:01.00,Default,,0,0,0,,Second line."));
}

#[tokio::test]
async fn test_server_error_is_speech_failure_and_clears_stale_audio() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/dev/captioned_speech"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model not loaded"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let audio = dir.path().join("narration.wav");
    std::fs::write(&audio, b"left over from an earlier attempt").unwrap();

    let result = synthesizer_for(&server)
        .synthesize("Circles are everywhere.", dir.path())
        .await;

    match result {
        Err(ManimatorError::SpeechFailed { reason }) => {
            assert!(reason.contains("500"));
            assert!(reason.contains("model not loaded"));
        }
        other => panic!("expected SpeechFailed, got {:?}", other),
    }
    assert!(!audio.exists());
}

#[tokio::test]
async fn test_bad_base64_audio_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/dev/captioned_speech"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "audio": "not base64 at all!",
            "timestamps": []
        })))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let result = synthesizer_for(&server)
        .synthesize("Circles are everywhere.", dir.path())
        .await;

    assert!(matches!(result, Err(ManimatorError::DecodeError(_))));
    assert!(!dir.path().join("narration.wav").exists());
}
