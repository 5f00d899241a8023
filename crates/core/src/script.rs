//! Pull code and narration back out of a model response.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, warn};

use crate::{
    error::{ManimatorError, Result},
    prompt::{CODE_DELIMITER, NARRATION_DELIMITER},
    types::GeneratedScript,
};

const MANIM_IMPORT: &str = "from manim import *";
const NUMPY_IMPORT: &str = "import numpy as np";

/// Narration recovered by the fence fallback is dropped when this short.
const MIN_FALLBACK_NARRATION: usize = 20;

static PYTHON_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```python(.*?)```").expect("valid python block regex"));

/// Parse a `### MANIM CODE:` / `### NARRATION:` response, falling back to the
/// first fenced python block when the narration delimiter is missing.
pub fn parse_delimited(content: &str) -> Result<GeneratedScript> {
    if let Some((code_part, narration_part)) = content.split_once(NARRATION_DELIMITER) {
        let manim_code = strip_fences(code_part);
        let narration = narration_part.trim().to_string();
        info!("Parsed code and narration using delimiter");

        return Ok(GeneratedScript {
            manim_code: ensure_imports(&manim_code),
            narration,
        });
    }

    warn!("Delimiter '{}' not found, trying fenced code block", NARRATION_DELIMITER);

    let Some(captures) = PYTHON_BLOCK.captures(content) else {
        debug!(content, "Response without a python code block");
        return Err(ManimatorError::ResponseFormat);
    };

    let manim_code = captures[1].trim().to_string();
    let narration = content
        .splitn(3, "```")
        .last()
        .map(str::trim)
        .filter(|rest| rest.chars().count() > MIN_FALLBACK_NARRATION)
        .unwrap_or_default()
        .to_string();

    if narration.is_empty() {
        warn!("Fallback narration extraction resulted in empty or very short text");
    }

    Ok(GeneratedScript {
        manim_code: ensure_imports(&manim_code),
        narration,
    })
}

/// Parse the JSON object requested through a response schema. Anything that is
/// not that object goes through [`parse_delimited`].
pub fn parse_structured(content: &str) -> Result<GeneratedScript> {
    let trimmed = content.trim();
    let json = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed);

    match serde_json::from_str::<GeneratedScript>(json) {
        Ok(script) => Ok(GeneratedScript {
            manim_code: ensure_imports(&strip_fences(&script.manim_code)),
            narration: script.narration.trim().to_string(),
        }),
        Err(e) => {
            warn!(error = %e, "Structured response was not valid JSON, parsing as text");
            parse_delimited(content)
        }
    }
}

/// Add the manim and numpy imports the model sometimes forgets.
pub fn ensure_imports(code: &str) -> String {
    if !code.contains(MANIM_IMPORT) {
        warn!("Adding missing '{}'", MANIM_IMPORT);
        return format!("{}\n{}\n{}", MANIM_IMPORT, NUMPY_IMPORT, code);
    }

    if code.contains(NUMPY_IMPORT) {
        return code.to_string();
    }

    warn!("Adding missing '{}'", NUMPY_IMPORT);
    let mut lines: Vec<&str> = code.lines().collect();
    if let Some(index) = lines.iter().position(|line| line.contains(MANIM_IMPORT)) {
        lines.insert(index + 1, NUMPY_IMPORT);
    }
    lines.join("\n")
}

fn strip_fences(code: &str) -> String {
    let code = code.replace("```python", "").replace("```", "");
    let code = code.trim();
    code.strip_prefix(CODE_DELIMITER)
        .unwrap_or(code)
        .trim()
        .to_string()
}
