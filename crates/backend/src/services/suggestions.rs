//! AI suggestion generation.
//!
//! The poller and the suggestion routes talk to the language model through
//! the `SuggestionGenerator` trait; the production implementation calls the
//! Google Generative Language REST API.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use shared_types::{EventDaySuggestion, SuggestionContent};
use thiserror::Error;

use crate::config::AppConfig;

const SYSTEM_PROMPT: &str = "You are a health AI assistant. \
Your goal is to help users achieve their health objectives by analyzing their daily health data and schedule. \
Use the provided context to understand the user's health objectives, today's health data, and today's schedule. \
Based on this information, generate personalized insights and recommendations to help the user improve their health and productivity. \
If necessary, you can also propose events for the user's calendar to help them stay on track with their health goals.";

const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// AI call failure. Aborts the cycle's dispatch, never the poll loop.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generator request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("generator returned {0}: {1}")]
    Status(reqwest::StatusCode, String),
    #[error("generator response had no content")]
    EmptyResponse,
    #[error("generator not configured: {0}")]
    NotConfigured(String),
}

/// Capability contract for AI suggestion generation.
#[async_trait]
pub trait SuggestionGenerator: Send + Sync {
    /// Generate a suggestion for a user given descriptions of today's
    /// calendar changes.
    async fn generate(
        &self,
        user_id: &str,
        change_descriptions: &[String],
    ) -> Result<SuggestionContent, GenerationError>;
}

/// Generator backed by the Google Generative Language API.
#[derive(Clone)]
pub struct GeminiSuggestionGenerator {
    http: reqwest::Client,
    api_key: Option<String>,
    model: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

impl GeminiSuggestionGenerator {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
            api_key: config.gemini_api_key.clone(),
            model: config.gemini_model.clone(),
        }
    }

    async fn invoke(&self, prompt: &str) -> Result<String, GenerationError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| GenerationError::NotConfigured("GEMINI_API_KEY not set".into()))?;

        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
            self.model
        );

        let body = json!({
            "system_instruction": { "parts": [{ "text": SYSTEM_PROMPT }] },
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
        });

        let response = self
            .http
            .post(&url)
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(GenerationError::Status(status, detail));
        }

        let parsed: GenerateContentResponse = response.json().await?;
        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(GenerationError::EmptyResponse);
        }
        Ok(text)
    }

    /// Suggestion for the whole day, backing GET /event-day-suggestion.
    pub async fn event_day_suggestion(
        &self,
        user_id: &str,
    ) -> Result<SuggestionContent, GenerationError> {
        let prompt = format!(
            "Generate one event suggestion for user {user_id}'s day that supports \
             their health objectives. Respond with a JSON object with fields \
             start_time, end_time, title, description if you can propose a \
             concrete event, otherwise respond with plain text."
        );
        let text = self.invoke(&prompt).await?;
        Ok(normalize_suggestion(&text))
    }

    /// Free-text insights for GET /health/insights.
    pub async fn health_insights(&self, user_id: &str) -> Result<String, GenerationError> {
        let prompt = format!(
            "Generate personalized health insights for user {user_id} based on \
             their objectives, today's health data, and schedule."
        );
        self.invoke(&prompt).await
    }
}

#[async_trait]
impl SuggestionGenerator for GeminiSuggestionGenerator {
    async fn generate(
        &self,
        user_id: &str,
        change_descriptions: &[String],
    ) -> Result<SuggestionContent, GenerationError> {
        let prompt = format!(
            "The following changes were detected in user {user_id}'s calendar \
             today:\n{}\nSuggest how the user should adapt their day. Respond \
             with a JSON object with fields start_time, end_time, title, \
             description if you propose a concrete event, otherwise plain text.",
            change_descriptions.join("\n")
        );
        let text = self.invoke(&prompt).await?;
        Ok(normalize_suggestion(&text))
    }
}

/// Normalize raw model output into structured-or-text form. Models often
/// wrap JSON in markdown fences; strip them before attempting a parse.
fn normalize_suggestion(text: &str) -> SuggestionContent {
    let trimmed = text.trim();
    let candidate = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|s| s.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed);

    match serde_json::from_str::<EventDaySuggestion>(candidate) {
        Ok(structured) => SuggestionContent::Structured(structured),
        Err(_) => SuggestionContent::Text(trimmed.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_plain_text() {
        let content = normalize_suggestion("Drink more water today.");
        assert_eq!(
            content,
            SuggestionContent::Text("Drink more water today.".to_string())
        );
    }

    #[test]
    fn test_normalize_structured_json() {
        let content = normalize_suggestion(
            r#"{"start_time": "18:00", "end_time": "19:00", "title": "Evening run", "description": "Easy pace"}"#,
        );
        match content {
            SuggestionContent::Structured(s) => {
                assert_eq!(s.title, "Evening run");
                assert_eq!(s.start_time.as_deref(), Some("18:00"));
            }
            other => panic!("expected structured suggestion, got {other:?}"),
        }
    }

    #[test]
    fn test_normalize_fenced_json() {
        let content = normalize_suggestion(
            "```json\n{\"title\": \"Stretch\", \"description\": \"10 minutes\"}\n```",
        );
        assert!(matches!(content, SuggestionContent::Structured(_)));
    }

    #[test]
    fn test_normalize_invalid_json_falls_back_to_text() {
        let content = normalize_suggestion("{not json");
        assert_eq!(content, SuggestionContent::Text("{not json".to_string()));
    }
}
