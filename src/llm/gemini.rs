use async_trait::async_trait;
use log::{ info, warn };
use serde::{ Deserialize, Serialize };
use std::time::Duration;

use super::{ CompletionClient, CompletionError, CompletionRequest };
use crate::cli::Args;
use crate::prompt::build_support_prompt;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const DEFAULT_MODEL: &str = "gemini-1.5-pro-latest";

const HARM_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
    #[serde(rename = "safetySettings")]
    safety_settings: Vec<SafetySetting>,
}

#[derive(Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f64,
    top_k: u32,
    top_p: f64,
    max_output_tokens: u32,
}

#[derive(Serialize)]
struct SafetySetting {
    category: String,
    threshold: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Content,
}

fn safety_settings() -> Vec<SafetySetting> {
    HARM_CATEGORIES.iter()
        .map(|category| SafetySetting {
            category: category.to_string(),
            threshold: "BLOCK_MEDIUM_AND_ABOVE".to_string(),
        })
        .collect()
}

fn generation_config() -> GenerationConfig {
    GenerationConfig {
        temperature: 0.2,
        top_k: 40,
        top_p: 0.95,
        max_output_tokens: 1024,
    }
}

/// Single-shot client for the Gemini `generateContent` endpoint. The
/// API key travels as a query parameter; the request carries a
/// deterministic-leaning generation config and medium-and-above safety
/// thresholds across all four harm categories.
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(
        api_key: String,
        model: Option<String>,
        base_url: Option<String>,
        timeout: Duration
    ) -> Result<Self, CompletionError> {
        if api_key.trim().is_empty() {
            warn!("No Gemini API key configured. Every chat turn will use the fallback reply.");
        }

        let http = reqwest::Client
            ::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CompletionError::Unavailable(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        })
    }

    pub fn from_args(args: &Args) -> Result<Self, CompletionError> {
        Self::new(
            args.gemini_api_key.clone(),
            args.chat_model.clone(),
            args.chat_base_url.clone(),
            Duration::from_secs(args.completion_timeout_secs)
        )
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/{}:generateContent?key={}",
            self.base_url.trim_end_matches('/'),
            self.model,
            self.api_key
        )
    }
}

#[async_trait]
impl CompletionClient for GeminiClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        if self.api_key.trim().is_empty() {
            return Err(CompletionError::Unavailable("Gemini API key not configured".to_string()));
        }

        let prompt = build_support_prompt(&request.history, &request.message);
        let payload = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: generation_config(),
            safety_settings: safety_settings(),
        };

        info!("GeminiClient::complete() → model={}", self.model);

        let response = self.http
            .post(self.endpoint())
            .json(&payload)
            .send().await
            .map_err(|e| CompletionError::Unavailable(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(
                CompletionError::Unavailable(format!("Gemini API error {}: {}", status, body))
            );
        }

        let body: GenerateResponse = response
            .json().await
            .map_err(|e| CompletionError::Unavailable(format!("unreadable response body: {}", e)))?;

        body.candidates
            .first()
            .and_then(|candidate| candidate.content.parts.first())
            .map(|part| part.text.clone())
            .ok_or_else(|| {
                CompletionError::Unavailable("no candidates in Gemini response".to_string())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client(api_key: &str) -> GeminiClient {
        GeminiClient::new(
            api_key.to_string(),
            None,
            None,
            Duration::from_secs(5)
        ).unwrap()
    }

    #[test]
    fn endpoint_carries_key_as_query_parameter() {
        let client = test_client("test-key");
        let url = client.endpoint();
        assert!(url.starts_with(DEFAULT_BASE_URL));
        assert!(url.contains(":generateContent?key=test-key"));
        assert!(url.contains(DEFAULT_MODEL));
    }

    #[test]
    fn request_body_has_bounded_generation_and_safety_settings() {
        let payload = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: "prompt".to_string() }],
            }],
            generation_config: generation_config(),
            safety_settings: safety_settings(),
        };
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["generationConfig"]["temperature"], 0.2);
        assert_eq!(json["generationConfig"]["topK"], 40);
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 1024);

        let settings = json["safetySettings"].as_array().unwrap();
        assert_eq!(settings.len(), 4);
        for setting in settings {
            assert_eq!(setting["threshold"], "BLOCK_MEDIUM_AND_ABOVE");
        }
        assert!(
            settings.iter().any(|s| s["category"] == "HARM_CATEGORY_DANGEROUS_CONTENT")
        );
    }

    #[test]
    fn first_candidate_text_is_extracted() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"first"}]}},{"content":{"parts":[{"text":"second"}]}}]}"#;
        let parsed: GenerateResponse = serde_json::from_str(body).unwrap();
        let text = parsed.candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.clone());
        assert_eq!(text.as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn missing_api_key_is_unavailable_without_a_network_call() {
        let client = test_client("");
        let request = CompletionRequest {
            history: String::new(),
            message: "hello".to_string(),
        };
        let err = client.complete(&request).await.unwrap_err();
        assert!(err.to_string().contains("API key not configured"));
    }
}
