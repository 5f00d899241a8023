use crate::{
    config::GeminiConfig,
    error::{ManimatorError, Result},
};

/// Which model a request goes to: the first draft, or the grounded fixer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelRole {
    Generate,
    Fix,
}

#[derive(Clone, Debug)]
pub struct Provider {
    base_url: String,
    api_key_env: String,
    generate_model: String,
    fix_model: String,
}

impl Provider {
    pub fn from_config(config: &GeminiConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key_env: config.api_key_env.clone(),
            generate_model: config.generate_model.clone(),
            fix_model: config.fix_model.clone(),
        }
    }

    pub fn name(&self) -> &'static str {
        "Gemini"
    }

    pub fn model(&self, role: ModelRole) -> &str {
        match role {
            ModelRole::Generate => &self.generate_model,
            ModelRole::Fix => &self.fix_model,
        }
    }

    pub fn endpoint(&self, role: ModelRole) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url,
            self.model(role)
        )
    }

    /// Validate that the API key is set for this provider
    pub fn validate_api_key(&self) -> Result<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ManimatorError::MissingApiKey {
                env_var: self.api_key_env.clone(),
            })
    }
}
