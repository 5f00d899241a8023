//! Caption lines from word timings, written as an `.ass` file for ffmpeg's `ass` filter.

use std::path::Path;

use tokio::fs;

use crate::{error::Result, format::format_ass_timestamp, types::WordTiming};

#[derive(Debug, Clone, PartialEq)]
pub struct CaptionLine {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

const ASS_HEADER: &str = "[Script Info]
ScriptType: v4.00+
PlayResX: 1920
PlayResY: 1080
WrapStyle: 0
ScaledBorderAndShadow: yes

[V4+ Styles]
Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding
Style: Default,Arial,56,&H00FFFFFF,&H000000FF,&H00000000,&H80000000,0,0,0,0,100,100,0,0,1,3,0,2,60,60,60,1

[Events]
Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text
";

fn is_punctuation(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| c.is_ascii_punctuation() || c == '…')
}

fn ends_sentence(text: &str) -> bool {
    text.ends_with(['.', '!', '?'])
}

/// Group words into caption lines of at most `max_words` words, breaking early at
/// sentence ends. Punctuation tokens are glued onto the word before them.
pub fn group_captions(words: &[WordTiming], max_words: usize) -> Vec<CaptionLine> {
    let max_words = max_words.max(1);
    let mut lines: Vec<CaptionLine> = Vec::new();
    let mut current: Option<CaptionLine> = None;
    let mut count = 0;

    for word in words {
        let text = word.text.trim();
        if text.is_empty() {
            continue;
        }

        if current.is_none() && is_punctuation(text) {
            if let Some(last) = lines.last_mut() {
                last.text.push_str(text);
                last.end = last.end.max(word.end);
                continue;
            }
        }

        match current.as_mut() {
            Some(line) if is_punctuation(text) => {
                line.text.push_str(text);
                line.end = line.end.max(word.end);
            }
            Some(line) => {
                line.text.push(' ');
                line.text.push_str(text);
                line.end = line.end.max(word.end);
                count += 1;
            }
            None => {
                current = Some(CaptionLine {
                    start: word.start,
                    end: word.end,
                    text: text.to_string(),
                });
                count = 1;
            }
        }

        let full = count >= max_words;
        if full || current.as_ref().is_some_and(|line| ends_sentence(&line.text)) {
            lines.extend(current.take());
            count = 0;
        }
    }

    lines.extend(current);
    lines
}

fn escape_ass(text: &str) -> String {
    text.replace(['{', '}'], "")
        .replace("\r\n", "\\N")
        .replace('\n', "\\N")
}

pub fn render_ass(lines: &[CaptionLine]) -> String {
    let mut output = String::from(ASS_HEADER);
    for line in lines {
        output.push_str(&format!(
            "Dialogue: 0,{},{},Default,,0,0,0,,{}\n",
            format_ass_timestamp(line.start),
            format_ass_timestamp(line.end),
            escape_ass(&line.text)
        ));
    }
    output
}

pub async fn write_subtitle_file(
    words: &[WordTiming],
    max_words: usize,
    path: &Path,
) -> Result<()> {
    let lines = group_captions(words, max_words);
    fs::write(path, render_ass(&lines)).await?;
    Ok(())
}
