pub mod gemini;
pub mod structured;

use crate::errors::AppResult;
use crate::models::{LeadInsight, LeadStatus, MarketIntel};
use crate::redaction::Scrubber;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub json_output: bool,
    pub web_search: bool,
}

#[derive(Debug, Clone, Default)]
pub struct GenerateReply {
    pub text: String,
    pub grounding_uris: Vec<String>,
}

/// Seam in front of the hosted text-generation service. Production uses the
/// reqwest backend; tests inject failure modes.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    async fn generate(&self, request: GenerateRequest) -> AppResult<GenerateReply>;
}

static INSIGHT_SCHEMA: Lazy<serde_json::Value> = Lazy::new(|| {
    serde_json::json!({
        "type": "object",
        "properties": {
            "insight": { "type": "string" },
            "nextStep": { "type": "string" }
        },
        "required": ["insight", "nextStep"]
    })
});

/// One-shot request/response functions against the hosted model. Single
/// attempt, no timeout, no cancellation; every failure class degrades to a
/// fixed fallback value so the caller never observes an error.
pub struct InsightGateway {
    backend: Arc<dyn GenerativeBackend>,
    scrubber: Scrubber,
}

impl InsightGateway {
    pub fn new(backend: Arc<dyn GenerativeBackend>, scrubber: Scrubber) -> Self {
        Self { backend, scrubber }
    }

    pub async fn lead_insight(
        &self,
        model: &str,
        name: &str,
        status: LeadStatus,
        context: &str,
    ) -> LeadInsight {
        let prompt = format!(
            "Expert Sales Manager analysis:\n\
             Lead Name: {}\n\
             Status: {}\n\
             Context: {}\n\
             Return a JSON with two fields: 'insight' and 'nextStep'. \
             Ensure the values are in the language requested in the Context.",
            name,
            status.as_str(),
            context
        );
        let request = GenerateRequest {
            model: model.to_string(),
            prompt,
            json_output: true,
            web_search: false,
        };

        let reply = match self.backend.generate(request).await {
            Ok(reply) => reply,
            Err(error) => {
                tracing::warn!(
                    cause = "service",
                    error = %self.scrubber.scrub(&error.to_string()),
                    "lead insight degraded to fallback"
                );
                return fallback_insight();
            }
        };

        let Some(value) = structured::extract_json(&reply.text) else {
            tracing::warn!(cause = "malformed-json", "lead insight degraded to fallback");
            return fallback_insight();
        };
        if let Err(error) = structured::validate(&value, &INSIGHT_SCHEMA) {
            tracing::warn!(cause = "schema", error = %error, "lead insight degraded to fallback");
            return fallback_insight();
        }
        match serde_json::from_value(value) {
            Ok(insight) => insight,
            Err(error) => {
                tracing::warn!(cause = "schema", error = %error, "lead insight degraded to fallback");
                fallback_insight()
            }
        }
    }

    pub async fn market_intel(&self, model: &str, query: &str, language_name: &str) -> MarketIntel {
        let prompt = format!(
            "Perform professional market research for: \"{}\". \
             Provide strategic insights for a business owner. Language: {}.",
            query, language_name
        );
        let request = GenerateRequest {
            model: model.to_string(),
            prompt,
            json_output: false,
            web_search: true,
        };

        match self.backend.generate(request).await {
            Ok(reply) => MarketIntel {
                text: reply.text,
                sources: dedup_sources(reply.grounding_uris),
            },
            Err(error) => {
                tracing::warn!(
                    cause = "service",
                    error = %self.scrubber.scrub(&error.to_string()),
                    "market intel degraded to fallback"
                );
                fallback_intel()
            }
        }
    }
}

pub(crate) fn fallback_insight() -> LeadInsight {
    LeadInsight {
        insight: "Analysis unavailable.".to_string(),
        next_step: "Perform standard follow-up.".to_string(),
    }
}

pub(crate) fn fallback_intel() -> MarketIntel {
    MarketIntel {
        text: "Failed to perform market intelligence at this time.".to_string(),
        sources: Vec::new(),
    }
}

/// First occurrence wins; anything that does not parse as a URL is dropped.
fn dedup_sources(uris: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    uris.into_iter()
        .filter(|uri| url::Url::parse(uri).is_ok())
        .filter(|uri| seen.insert(uri.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{GenerateReply, GenerateRequest, GenerativeBackend, InsightGateway};
    use crate::errors::{AppError, AppResult};
    use crate::models::LeadStatus;
    use crate::redaction::Scrubber;
    use async_trait::async_trait;
    use std::sync::Arc;

    enum MockBehavior {
        Reply(GenerateReply),
        Fail(String),
    }

    struct MockBackend {
        behavior: MockBehavior,
    }

    #[async_trait]
    impl GenerativeBackend for MockBackend {
        async fn generate(&self, _request: GenerateRequest) -> AppResult<GenerateReply> {
            match &self.behavior {
                MockBehavior::Reply(reply) => Ok(reply.clone()),
                MockBehavior::Fail(message) => Err(AppError::Ai(message.clone())),
            }
        }
    }

    fn gateway(behavior: MockBehavior) -> InsightGateway {
        InsightGateway::new(Arc::new(MockBackend { behavior }), Scrubber::new(true))
    }

    fn text_reply(text: &str) -> MockBehavior {
        MockBehavior::Reply(GenerateReply {
            text: text.to_string(),
            grounding_uris: Vec::new(),
        })
    }

    #[tokio::test]
    async fn insight_parses_well_formed_reply() {
        let gateway = gateway(text_reply(
            "{\"insight\": \"warm lead\", \"nextStep\": \"schedule a demo\"}",
        ));
        let insight = gateway
            .lead_insight("model", "Avi", LeadStatus::New, "Language: English.")
            .await;
        assert_eq!(insight.insight, "warm lead");
        assert_eq!(insight.next_step, "schedule a demo");
    }

    #[tokio::test]
    async fn insight_accepts_fenced_reply() {
        let gateway = gateway(text_reply(
            "```json\n{\"insight\": \"a\", \"nextStep\": \"b\"}\n```",
        ));
        let insight = gateway
            .lead_insight("model", "Avi", LeadStatus::InProgress, "ctx")
            .await;
        assert_eq!(insight.insight, "a");
    }

    #[tokio::test]
    async fn insight_falls_back_on_service_error() {
        let gateway = gateway(MockBehavior::Fail("transport: connection refused".to_string()));
        let insight = gateway
            .lead_insight("model", "Avi", LeadStatus::New, "ctx")
            .await;
        assert_eq!(insight.insight, "Analysis unavailable.");
        assert_eq!(insight.next_step, "Perform standard follow-up.");
    }

    #[tokio::test]
    async fn insight_falls_back_on_malformed_json() {
        let gateway = gateway(text_reply("sorry, here is prose instead of JSON"));
        let insight = gateway
            .lead_insight("model", "Avi", LeadStatus::New, "ctx")
            .await;
        assert_eq!(insight.insight, "Analysis unavailable.");
    }

    #[tokio::test]
    async fn insight_falls_back_on_schema_violation() {
        let gateway = gateway(text_reply("{\"insight\": \"only half\"}"));
        let insight = gateway
            .lead_insight("model", "Avi", LeadStatus::New, "ctx")
            .await;
        assert_eq!(insight.insight, "Analysis unavailable.");
    }

    #[tokio::test]
    async fn intel_dedups_and_validates_sources() {
        let gateway = gateway(MockBehavior::Reply(GenerateReply {
            text: "market summary".to_string(),
            grounding_uris: vec![
                "https://example.com/a".to_string(),
                "not a url".to_string(),
                "https://example.com/b".to_string(),
                "https://example.com/a".to_string(),
            ],
        }));
        let intel = gateway.market_intel("model", "crm market", "English").await;
        assert_eq!(intel.text, "market summary");
        assert_eq!(
            intel.sources,
            vec![
                "https://example.com/a".to_string(),
                "https://example.com/b".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn intel_falls_back_on_service_error() {
        let gateway = gateway(MockBehavior::Fail("status 500: boom".to_string()));
        let intel = gateway.market_intel("model", "crm market", "Hebrew").await;
        assert_eq!(intel.text, "Failed to perform market intelligence at this time.");
        assert!(intel.sources.is_empty());
    }

    #[tokio::test]
    async fn intel_with_no_grounding_has_empty_sources() {
        let gateway = gateway(text_reply("summary without grounding"));
        let intel = gateway.market_intel("model", "q", "English").await;
        assert!(intel.sources.is_empty());
    }
}
