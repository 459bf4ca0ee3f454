//! Supabase client: user-profile store (PostgREST) and realtime broadcast.
//!
//! Both sides share the same base URL and service key. The profile store is
//! required by the user routes; the broadcast is best-effort and missing
//! credentials downgrade it to a warning.

use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use serde_json::json;
use shared_types::{SuggestionPayload, UpdateUserProfileRequest, UserProfile};
use thiserror::Error;

use crate::config::AppConfig;
use crate::error::{ApiError, ApiResult};

const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

/// Realtime broadcast failure. Never escalated past a log line.
#[derive(Debug, Error)]
pub enum BroadcastError {
    #[error("broadcast request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("broadcast endpoint returned {0}")]
    Status(reqwest::StatusCode),
}

#[derive(Clone)]
pub struct SupabaseClient {
    http: reqwest::Client,
    url: Option<String>,
    key: Option<String>,
    broadcast_topic: String,
    broadcast_event: String,
    default_user_id: Option<String>,
}

impl SupabaseClient {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
            url: config
                .supabase_url
                .as_ref()
                .map(|u| u.trim_end_matches('/').to_string()),
            key: config.supabase_key.clone(),
            broadcast_topic: config.broadcast_topic.clone(),
            broadcast_event: config.broadcast_event.clone(),
            default_user_id: config.default_user_id.clone(),
        }
    }

    fn credentials(&self) -> ApiResult<(&str, &str)> {
        let url = self
            .url
            .as_deref()
            .ok_or_else(|| ApiError::missing_env("SUPABASE_URL"))?;
        let key = self
            .key
            .as_deref()
            .ok_or_else(|| ApiError::missing_env("SUPABASE_KEY"))?;
        Ok((url, key))
    }

    /// Resolve the user suggestions are attributed to.
    ///
    /// The poller runs with no request context, so resolution falls back to
    /// the configured default user.
    pub fn current_user_id(&self) -> ApiResult<String> {
        self.default_user_id
            .clone()
            .ok_or_else(|| ApiError::missing_env("DEFAULT_USER_ID"))
    }

    // -- Profile store ------------------------------------------------------

    pub async fn get_user_profile(&self, user_id: &str) -> ApiResult<UserProfile> {
        let (url, key) = self.credentials()?;

        let rows: Vec<UserProfile> = self
            .http
            .get(format!("{url}/rest/v1/users"))
            .header("apikey", key)
            .bearer_auth(key)
            .query(&[("id", format!("eq.{user_id}")), ("select", "*".to_string())])
            .send()
            .await?
            .error_for_status()
            .map_err(|e| ApiError::upstream(format!("Error fetching user profile: {e}")))?
            .json()
            .await?;

        rows.into_iter()
            .next()
            .ok_or_else(|| ApiError::not_found("User profile"))
    }

    pub async fn create_user_profile(&self, profile: &UserProfile) -> ApiResult<UserProfile> {
        let (url, key) = self.credentials()?;

        let rows: Vec<UserProfile> = self
            .http
            .post(format!("{url}/rest/v1/users"))
            .header("apikey", key)
            .bearer_auth(key)
            .header("Prefer", "return=representation")
            .json(profile)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| ApiError::upstream(format!("Error creating user profile: {e}")))?
            .json()
            .await?;

        rows.into_iter()
            .next()
            .ok_or_else(|| ApiError::upstream("Profile store returned no row"))
    }

    pub async fn update_user_profile(
        &self,
        user_id: &str,
        changes: &UpdateUserProfileRequest,
    ) -> ApiResult<UserProfile> {
        let (url, key) = self.credentials()?;

        let rows: Vec<UserProfile> = self
            .http
            .patch(format!("{url}/rest/v1/users"))
            .header("apikey", key)
            .bearer_auth(key)
            .header("Prefer", "return=representation")
            .query(&[("id", format!("eq.{user_id}"))])
            .json(changes)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| ApiError::upstream(format!("Error updating user profile: {e}")))?
            .json()
            .await?;

        rows.into_iter()
            .next()
            .ok_or_else(|| ApiError::not_found("User profile"))
    }

    // -- Realtime broadcast -------------------------------------------------

    /// Notify the realtime channel about an updated suggestion payload.
    ///
    /// Missing credentials skip the broadcast with a warning and are not an
    /// error; HTTP failures surface as `BroadcastError` for the caller to
    /// log.
    pub async fn broadcast_suggestion(
        &self,
        payload: &SuggestionPayload,
    ) -> Result<(), BroadcastError> {
        let (url, key) = match (self.url.as_deref(), self.key.as_deref()) {
            (Some(url), Some(key)) => (url, key),
            _ => {
                tracing::warn!("Supabase credentials missing; skipping realtime broadcast");
                return Ok(());
            }
        };

        let message = BroadcastEnvelope {
            messages: vec![BroadcastMessage {
                topic: &self.broadcast_topic,
                event: &self.broadcast_event,
                payload: json!(payload),
            }],
        };

        let response = self
            .http
            .post(format!("{url}/realtime/v1/api/broadcast"))
            .header("apikey", key)
            .header(CONTENT_TYPE, "application/json")
            .json(&message)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(BroadcastError::Status(status));
        }

        tracing::info!("Supabase broadcast succeeded");
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct BroadcastEnvelope<'a> {
    messages: Vec<BroadcastMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct BroadcastMessage<'a> {
    topic: &'a str,
    event: &'a str,
    payload: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shared_types::SuggestionContent;

    #[test]
    fn test_broadcast_envelope_shape() {
        let payload = SuggestionPayload {
            user_id: "u1".to_string(),
            generated_at: Utc::now(),
            changes: vec!["Added event 'Gym' (ID: 1)".to_string()],
            suggestion: SuggestionContent::Text("take water".to_string()),
        };
        let envelope = BroadcastEnvelope {
            messages: vec![BroadcastMessage {
                topic: "event-changes",
                event: "shout",
                payload: json!(&payload),
            }],
        };

        let value = serde_json::to_value(&envelope).unwrap();
        let message = &value["messages"][0];
        assert_eq!(message["topic"], "event-changes");
        assert_eq!(message["event"], "shout");
        assert_eq!(message["payload"]["user_id"], "u1");
        assert_eq!(message["payload"]["suggestion"], "take water");
    }
}
