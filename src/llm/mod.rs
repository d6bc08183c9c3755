pub mod prompts;
pub mod repair;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

use crate::api::models::ItemList;
use crate::error::{AppError, Result};

pub use repair::parse_json_response;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Shape the model is asked to answer in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSchema {
    Suggestions,
    ItemList,
    /// JSON mode without a schema; item details carry dynamic property keys.
    Details,
}

impl ResponseSchema {
    fn to_gemini(self) -> Option<Value> {
        let string_array = json!({"type": "ARRAY", "items": {"type": "STRING"}});
        match self {
            ResponseSchema::Suggestions => Some(json!({
                "type": "OBJECT",
                "properties": {"suggestions": string_array},
                "required": ["suggestions"]
            })),
            ResponseSchema::ItemList => Some(json!({
                "type": "OBJECT",
                "properties": {"items": string_array.clone(), "properties": string_array},
                "required": ["items", "properties"]
            })),
            ResponseSchema::Details => None,
        }
    }
}

/// A hosted text model that answers a prompt with JSON-shaped text.
#[async_trait]
pub trait TextModel: Send + Sync {
    async fn generate(&self, prompt: &str, schema: ResponseSchema) -> Result<String>;
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<Value>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl Candidate {
    fn into_text(self) -> Option<String> {
        let text: String = self
            .content?
            .parts
            .into_iter()
            .filter_map(|part| part.text)
            .collect();
        if text.trim().is_empty() { None } else { Some(text) }
    }
}

/// Google Gemini `generateContent` over REST.
pub struct GeminiClient {
    http: Client,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| AppError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            model: model.into(),
        })
    }
}

#[async_trait]
impl TextModel for GeminiClient {
    async fn generate(&self, prompt: &str, schema: ResponseSchema) -> Result<String> {
        let body = GenerateRequest {
            contents: [Content {
                role: "user",
                parts: [Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: schema.to_gemini(),
            },
        };

        let url = format!("{}/{}:generateContent", GEMINI_BASE_URL, self.model);
        debug!(model = %self.model, ?schema, prompt_chars = prompt.len(), "Calling Gemini");
        let res = self
            .http
            .post(&url)
            .header("x-goog-api-key", self.api_key.as_str())
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::LlmError(format!("request failed: {}", e)))?;

        let status = res.status();
        if !status.is_success() {
            let detail = res.text().await.unwrap_or_default();
            return Err(AppError::LlmError(format!("Gemini returned {}: {}", status, detail)));
        }

        let reply: GenerateResponse = res
            .json()
            .await
            .map_err(|e| AppError::LlmError(format!("Invalid response format from LLM: {}", e)))?;
        let text = reply
            .candidates
            .into_iter()
            .find_map(Candidate::into_text)
            .ok_or_else(|| AppError::LlmError("LLM response did not contain any text".to_string()))?;

        info!(model = %self.model, ?schema, reply_chars = text.len(), "Gemini reply received");
        Ok(text)
    }
}

#[derive(Deserialize)]
struct SuggestionsReply {
    #[serde(default)]
    suggestions: Vec<String>,
}

pub async fn generate_suggestions(model: &dyn TextModel) -> Result<Vec<String>> {
    let text = model
        .generate(&prompts::suggestions_prompt(), ResponseSchema::Suggestions)
        .await?;
    let reply: SuggestionsReply = serde_json::from_str(&text)?;
    Ok(reply.suggestions)
}

pub async fn generate_item_list(
    model: &dyn TextModel,
    category: &str,
    count: u32,
    language_instruction: &str,
) -> Result<ItemList> {
    let prompt = prompts::item_list_prompt(category, count, language_instruction);
    let text = model.generate(&prompt, ResponseSchema::ItemList).await?;
    let list: ItemList = serde_json::from_str(&text)?;
    Ok(list)
}

/// Asks for the description and property values of one item. The reply is
/// free-form JSON and goes through [`parse_json_response`].
pub async fn generate_item_details(
    model: &dyn TextModel,
    item: &str,
    category: &str,
    properties: &[String],
    language: &str,
    language_instruction: &str,
) -> Result<Value> {
    let prompt =
        prompts::item_details_prompt(item, category, properties, language, language_instruction);
    let text = model.generate(&prompt, ResponseSchema::Details).await?;
    let value = parse_json_response(&text)?;
    if !value.is_object() {
        return Err(AppError::ParseError(
            "expected a JSON object describing the item".to_string(),
        ));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_uses_gemini_field_names() {
        let body = GenerateRequest {
            contents: [Content {
                role: "user",
                parts: [Part { text: "hi" }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: ResponseSchema::Suggestions.to_gemini(),
            },
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(value["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(
            value["generationConfig"]["responseSchema"]["required"][0],
            "suggestions"
        );
    }

    #[test]
    fn details_mode_sends_no_schema() {
        let config = GenerationConfig {
            response_mime_type: "application/json",
            response_schema: ResponseSchema::Details.to_gemini(),
        };
        let value = serde_json::to_value(&config).unwrap();
        assert!(value.get("responseSchema").is_none());
    }

    #[test]
    fn candidate_text_joins_parts() {
        let reply: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"{\"a\":"},{"text":"1}"}]}}]}"#,
        )
        .unwrap();
        let text = reply.candidates.into_iter().find_map(Candidate::into_text);
        assert_eq!(text.as_deref(), Some("{\"a\":1}"));
    }
}
