//! Narration to speech through a Kokoro TTS server, plus word-timed subtitles.

use std::{
    io::Cursor,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use serde::Deserialize;
use tokio::fs;
use tracing::{error, info, instrument};

use crate::{
    config::TtsConfig,
    error::{ManimatorError, Result},
    subtitle::write_subtitle_file,
    types::{SpeechTrack, WordTiming},
};

pub const AUDIO_FILE_NAME: &str = "narration.wav";
pub const SUBTITLE_FILE_NAME: &str = "narration.ass";

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Write the narration audio (and subtitles, when timings are available) into `out_dir`.
    async fn synthesize(&self, text: &str, out_dir: &Path) -> Result<SpeechTrack>;
}

#[derive(Debug, Deserialize)]
struct CaptionedSpeech {
    audio: String,
    #[serde(default)]
    timestamps: Vec<KokoroTimestamp>,
}

#[derive(Debug, Deserialize)]
struct KokoroTimestamp {
    word: String,
    start_time: Option<f64>,
    end_time: Option<f64>,
}

/// Decoded audio of one narration chunk.
#[derive(Debug)]
pub struct SpeechChunk {
    pub spec: WavSpec,
    pub samples: Vec<i16>,
    pub words: Vec<WordTiming>,
}

impl SpeechChunk {
    pub fn duration(&self) -> f64 {
        let frames = self.samples.len() as f64 / f64::from(self.spec.channels.max(1));
        frames / f64::from(self.spec.sample_rate)
    }
}

/// Non-empty narration chunks, split on runs of newlines.
pub fn split_chunks(text: &str) -> Vec<&str> {
    text.split('\n')
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .collect()
}

/// Decode a WAV payload into 16-bit samples.
pub fn decode_wav(bytes: &[u8]) -> Result<(WavSpec, Vec<i16>)> {
    let mut reader = WavReader::new(Cursor::new(bytes))?;
    let spec = reader.spec();
    let samples = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Int, 16) => reader.samples::<i16>().collect::<hound::Result<Vec<_>>>()?,
        (SampleFormat::Float, _) => reader
            .samples::<f32>()
            .map(|s| s.map(|v| (v.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16))
            .collect::<hound::Result<Vec<_>>>()?,
        (SampleFormat::Int, bits) => {
            let shift = i32::from(bits) - 16;
            reader
                .samples::<i32>()
                .map(|s| {
                    s.map(|v| {
                        if shift > 0 {
                            (v >> shift) as i16
                        } else {
                            (v << -shift) as i16
                        }
                    })
                })
                .collect::<hound::Result<Vec<_>>>()?
        }
    };

    let spec = WavSpec {
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
        ..spec
    };
    Ok((spec, samples))
}

/// Join chunk audio end to end and shift each chunk's word timings by the
/// audio that precedes it.
pub fn concat_chunks(chunks: Vec<SpeechChunk>) -> Result<(WavSpec, Vec<i16>, Vec<WordTiming>)> {
    let Some(spec) = chunks.first().map(|chunk| chunk.spec) else {
        return Err(ManimatorError::EmptyNarration);
    };

    let mut samples = Vec::new();
    let mut words = Vec::new();
    let mut offset = 0.0;

    for chunk in chunks {
        if chunk.spec.sample_rate != spec.sample_rate || chunk.spec.channels != spec.channels {
            return Err(ManimatorError::SpeechFailed {
                reason: format!(
                    "chunk format {}Hz/{}ch does not match {}Hz/{}ch",
                    chunk.spec.sample_rate, chunk.spec.channels, spec.sample_rate, spec.channels
                ),
            });
        }

        let duration = chunk.duration();
        words.extend(chunk.words.into_iter().map(|word| WordTiming {
            text: word.text,
            start: offset + word.start,
            end: offset + word.end,
        }));
        samples.extend(chunk.samples);
        offset += duration;
    }

    Ok((spec, samples, words))
}

pub fn encode_wav(spec: WavSpec, samples: &[i16]) -> Result<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut buffer, spec)?;
        for sample in samples {
            writer.write_sample(*sample)?;
        }
        writer.finalize()?;
    }
    Ok(buffer.into_inner())
}

pub struct KokoroSynthesizer {
    http: reqwest::Client,
    base_url: String,
    voice: String,
    speed: f32,
    words_per_line: usize,
}

impl KokoroSynthesizer {
    pub fn new(config: &TtsConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            voice: config.voice.clone(),
            speed: config.speed,
            words_per_line: config.words_per_line,
        }
    }

    async fn speak_chunk(&self, chunk: &str) -> Result<SpeechChunk> {
        let response = self
            .http
            .post(format!("{}/dev/captioned_speech", self.base_url))
            .json(&serde_json::json!({
                "model": "kokoro",
                "input": chunk,
                "voice": &self.voice,
                "speed": self.speed,
                "response_format": "wav",
                "stream": false,
                "return_timestamps": true,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ManimatorError::SpeechFailed {
                reason: format!("{}: {}", status, response.text().await.unwrap_or_default()),
            });
        }

        let speech = response.json::<CaptionedSpeech>().await?;
        let (spec, samples) = decode_wav(&STANDARD.decode(speech.audio.trim())?)?;

        let mut chunk = SpeechChunk {
            spec,
            samples,
            words: Vec::new(),
        };
        let chunk_duration = chunk.duration();
        chunk.words = speech
            .timestamps
            .into_iter()
            .map(|ts| WordTiming {
                text: ts.word.trim().to_string(),
                start: ts.start_time.unwrap_or(0.0),
                end: ts.end_time.unwrap_or(chunk_duration),
            })
            .collect();

        Ok(chunk)
    }

    async fn synthesize_into(
        &self,
        text: &str,
        audio_path: &Path,
        out_dir: &Path,
    ) -> Result<SpeechTrack> {
        let mut chunks = Vec::new();
        for chunk in split_chunks(text) {
            chunks.push(self.speak_chunk(chunk).await?);
        }

        let (spec, samples, words) = concat_chunks(chunks)?;
        let duration = samples.len() as f64
            / f64::from(spec.channels.max(1))
            / f64::from(spec.sample_rate);
        fs::write(audio_path, encode_wav(spec, &samples)?).await?;

        let subtitle_path = if words.is_empty() {
            None
        } else {
            let path = out_dir.join(SUBTITLE_FILE_NAME);
            write_subtitle_file(&words, self.words_per_line, &path).await?;
            Some(path)
        };

        info!(duration, words = words.len(), "Synthesized narration");
        Ok(SpeechTrack {
            audio_path: audio_path.to_path_buf(),
            subtitle_path,
            duration,
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for KokoroSynthesizer {
    #[instrument(skip_all, fields(voice = %self.voice))]
    async fn synthesize(&self, text: &str, out_dir: &Path) -> Result<SpeechTrack> {
        if text.trim().is_empty() {
            return Err(ManimatorError::EmptyNarration);
        }

        let audio_path: PathBuf = out_dir.join(AUDIO_FILE_NAME);
        match self.synthesize_into(text, &audio_path, out_dir).await {
            Ok(track) => Ok(track),
            Err(e) => {
                error!(error = %e, "An error occurred during TTS or subtitle generation");
                if audio_path.exists() {
                    let _ = fs::remove_file(&audio_path).await;
                }
                Err(e)
            }
        }
    }
}
