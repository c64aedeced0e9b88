//! reqwest backend for the hosted `generateContent` endpoint.

use super::{GenerateReply, GenerateRequest, GenerativeBackend};
use crate::errors::{AppError, AppResult};
use async_trait::async_trait;
use serde::Deserialize;

const GENERATE_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";

pub struct GeminiBackend {
    client: reqwest::Client,
    api_key: String,
}

impl GeminiBackend {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Deserialize)]
struct GroundingChunk {
    web: Option<WebSource>,
}

#[derive(Debug, Deserialize)]
struct WebSource {
    uri: Option<String>,
}

#[async_trait]
impl GenerativeBackend for GeminiBackend {
    async fn generate(&self, request: GenerateRequest) -> AppResult<GenerateReply> {
        let mut body = serde_json::json!({
            "contents": [{ "parts": [{ "text": request.prompt }] }]
        });
        if request.json_output {
            body["generationConfig"] = serde_json::json!({ "responseMimeType": "application/json" });
        }
        if request.web_search {
            body["tools"] = serde_json::json!([{ "googleSearch": {} }]);
        }

        let url = format!(
            "{}/{}:generateContent?key={}",
            GENERATE_ENDPOINT, request.model, self.api_key
        );
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|error| AppError::Ai(format!("transport: {}", error)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::Ai(format!("status {}: {}", status, text)));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|error| AppError::Ai(format!("malformed-reply: {}", error)))?;

        let Some(candidate) = parsed.candidates.into_iter().next() else {
            return Ok(GenerateReply::default());
        };
        let text = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();
        let grounding_uris = candidate
            .grounding_metadata
            .map(|metadata| {
                metadata
                    .grounding_chunks
                    .into_iter()
                    .filter_map(|chunk| chunk.web.and_then(|web| web.uri))
                    .collect()
            })
            .unwrap_or_default();

        Ok(GenerateReply {
            text,
            grounding_uris,
        })
    }
}
