//! Minimal client for the Gemini `generateContent` REST endpoint.

use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, instrument};

use crate::{
    error::{ManimatorError, Result},
    provider::{ModelRole, Provider},
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub system_instruction: Content,
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Tool>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<Blob>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct Tool {
    pub google_search: Value,
}

impl Tool {
    pub fn google_search() -> Self {
        Self {
            google_search: serde_json::json!({}),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

impl Content {
    pub fn system(text: &str) -> Self {
        Self {
            role: None,
            parts: vec![Part::text(text)],
        }
    }

    pub fn user(parts: Vec<Part>) -> Self {
        Self {
            role: Some("user".to_string()),
            parts,
        }
    }
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    pub fn pdf(bytes: &[u8]) -> Self {
        Self {
            text: None,
            inline_data: Some(Blob {
                mime_type: "application/pdf".to_string(),
                data: STANDARD.encode(bytes),
            }),
        }
    }
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate.
    pub fn text(&self) -> Result<String> {
        if let Some(reason) = self
            .prompt_feedback
            .as_ref()
            .and_then(|feedback| feedback.block_reason.clone())
        {
            return Err(ManimatorError::Blocked { reason });
        }

        let text: String = self
            .candidates
            .first()
            .and_then(|candidate| candidate.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|part| part.text.as_deref())
                    .collect()
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(ManimatorError::EmptyResponse);
        }
        Ok(text)
    }
}

/// JSON schema for the structured-output variant of script generation.
pub fn script_schema() -> Value {
    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "manim_code": { "type": "STRING" },
            "narration": { "type": "STRING" }
        },
        "required": ["manim_code", "narration"]
    })
}

#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    provider: Provider,
}

impl GeminiClient {
    pub fn new(provider: Provider) -> Self {
        Self {
            http: reqwest::Client::new(),
            provider,
        }
    }

    pub fn provider(&self) -> &Provider {
        &self.provider
    }

    #[instrument(skip(self, request), fields(model = self.provider.model(role)))]
    pub async fn generate_content(
        &self,
        role: ModelRole,
        request: &GenerateContentRequest,
    ) -> Result<String> {
        let api_key = self.provider.validate_api_key()?;
        self.generate_content_with_key(role, request, &api_key).await
    }

    /// Same as [`GeminiClient::generate_content`] with an explicit API key.
    pub async fn generate_content_with_key(
        &self,
        role: ModelRole,
        request: &GenerateContentRequest,
        api_key: &str,
    ) -> Result<String> {
        info!("Sending request to {}", self.provider.name());
        let response = self
            .http
            .post(self.provider.endpoint(role))
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), "Gemini request failed");
            return Err(ManimatorError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let response = response.json::<GenerateContentResponse>().await?;
        let text = response.text()?;
        info!("Received response from {}", self.provider.name());
        Ok(text)
    }
}
