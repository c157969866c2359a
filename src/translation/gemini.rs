use super::prompt::{parse_string_array, system_instruction, user_prompt};
use super::{send_json, TranslationBackend};
use crate::error::{GlossaError, GlossaResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

/// Google Gemini `generateContent` backend
#[derive(Debug, Clone)]
pub struct GeminiBackend {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    system_instruction: Content,
    contents: Vec<Content>,
    generation_config: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

impl GeminiBackend {
    pub fn new(
        client: reqwest::Client,
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl TranslationBackend for GeminiBackend {
    fn name(&self) -> &'static str {
        "Gemini"
    }

    async fn translate(&self, texts: &[String], target_language: &str) -> GlossaResult<Vec<String>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = GenerateRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: system_instruction().to_string(),
                }],
            },
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: user_prompt(texts, target_language)?,
                }],
            }],
            generation_config: json!({
                "responseMimeType": "application/json",
                "responseSchema": { "type": "ARRAY", "items": { "type": "STRING" } }
            }),
        };

        debug!(model = %self.model, texts = texts.len(), "calling Gemini");
        let builder = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request);
        let response: GenerateResponse = send_json(builder, self.name()).await?;

        let reply: String = response
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| content.parts.into_iter().map(|part| part.text).collect())
            .ok_or_else(|| GlossaError::Backend("Gemini response contained no candidates".to_string()))?;

        parse_string_array(&reply, texts.len(), self.name())
    }
}
