use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{info, instrument, warn};

use crate::{
    config::GeminiConfig,
    error::{ManimatorError, Result},
    gemini::{
        Content, GeminiClient, GenerateContentRequest, GenerationConfig, Part, Tool, script_schema,
    },
    prompt::{
        FIX_SYSTEM_PROMPT, STRUCTURED_OUTPUT_NOTE, SYSTEM_PROMPT, examples_preamble, fix_prompt,
        idea_prompt, load_guide, pdf_prompt,
    },
    provider::{ModelRole, Provider},
    script::{parse_delimited, parse_structured},
    types::{GeneratedScript, VideoSource},
};

/// Produces animation code and narration, and repairs code the renderer rejected.
#[async_trait]
pub trait ScriptGenerator: Send + Sync {
    async fn generate(&self, source: &VideoSource) -> Result<GeneratedScript>;

    async fn fix(
        &self,
        faulty_code: &str,
        error_message: &str,
        original_context: &str,
    ) -> Result<GeneratedScript>;
}

pub struct GeminiScriptGenerator {
    client: GeminiClient,
    fix_temperature: f32,
    structured_output: bool,
    guide_path: Option<PathBuf>,
}

impl GeminiScriptGenerator {
    pub fn new(config: &GeminiConfig) -> Self {
        Self {
            client: GeminiClient::new(Provider::from_config(config)),
            fix_temperature: config.fix_temperature,
            structured_output: config.structured_output,
            guide_path: config.guide_path.clone(),
        }
    }

    pub fn provider(&self) -> &Provider {
        self.client.provider()
    }

    async fn build_parts(&self, source: &VideoSource) -> Result<Vec<Part>> {
        let mut parts = Vec::new();

        if let Some(path) = &self.guide_path {
            match load_guide(path).await {
                Some(guide) => parts.push(Part::text(examples_preamble(&guide))),
                None => warn!("No Manim examples were loaded, generating without them"),
            }
        }

        let mut prompt = match source {
            VideoSource::Idea(idea) => {
                if idea.trim().is_empty() {
                    return Err(ManimatorError::MissingSource);
                }
                let preview: String = idea.chars().take(50).collect();
                info!("Generating video based on idea: {}...", preview);
                idea_prompt(idea)
            }
            VideoSource::Pdf { path } => {
                if !path.exists() {
                    return Err(ManimatorError::PdfNotFound(path.clone()));
                }
                info!(path = %path.display(), "Reading PDF");
                let bytes = tokio::fs::read(path).await?;
                parts.push(Part::pdf(&bytes));
                pdf_prompt()
            }
        };

        if self.structured_output {
            prompt.push('\n');
            prompt.push_str(STRUCTURED_OUTPUT_NOTE);
        }
        parts.push(Part::text(prompt));

        Ok(parts)
    }
}

#[async_trait]
impl ScriptGenerator for GeminiScriptGenerator {
    #[instrument(skip_all)]
    async fn generate(&self, source: &VideoSource) -> Result<GeneratedScript> {
        let parts = self.build_parts(source).await?;

        let generation_config = self.structured_output.then(|| GenerationConfig {
            response_mime_type: Some("application/json".to_string()),
            response_schema: Some(script_schema()),
            ..Default::default()
        });

        let request = GenerateContentRequest {
            system_instruction: Content::system(SYSTEM_PROMPT),
            contents: vec![Content::user(parts)],
            generation_config,
            tools: Vec::new(),
        };

        let content = self
            .client
            .generate_content(ModelRole::Generate, &request)
            .await?;

        if self.structured_output {
            parse_structured(&content)
        } else {
            parse_delimited(&content)
        }
    }

    #[instrument(skip_all)]
    async fn fix(
        &self,
        faulty_code: &str,
        error_message: &str,
        original_context: &str,
    ) -> Result<GeneratedScript> {
        info!("Attempting to fix Manim code via fallback");

        let request = GenerateContentRequest {
            system_instruction: Content::system(FIX_SYSTEM_PROMPT),
            contents: vec![Content::user(vec![Part::text(fix_prompt(
                faulty_code,
                error_message,
                original_context,
            ))])],
            generation_config: Some(GenerationConfig {
                temperature: Some(self.fix_temperature),
                ..Default::default()
            }),
            tools: vec![Tool::google_search()],
        };

        let content = self.client.generate_content(ModelRole::Fix, &request).await?;
        let script = parse_delimited(&content)?;
        info!("Parsed fixed code and narration from fallback");
        Ok(script)
    }
}
