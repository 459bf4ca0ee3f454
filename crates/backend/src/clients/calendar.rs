//! Calendar provider REST client (Nylas v3 API).
//!
//! All calendar reads and writes go through a single grant and calendar,
//! both configured via environment. The provider returns event objects in a
//! `{data: [...]}` envelope.

use chrono::Local;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use shared_types::{CreateEventRequest, EventRecord};

use crate::config::AppConfig;
use crate::error::{ApiError, ApiResult};
use crate::utils::timestamp::ensure_unix_timestamp;

const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct EventListEnvelope {
    #[serde(default)]
    data: Vec<EventRecord>,
}

#[derive(Debug, Deserialize)]
struct EventEnvelope {
    data: EventRecord,
}

/// Client for the calendar SaaS provider.
#[derive(Clone)]
pub struct CalendarClient {
    http: reqwest::Client,
    api_uri: String,
    api_key: String,
    grant_id: String,
    calendar_id: Option<String>,
}

impl CalendarClient {
    pub fn from_config(config: &AppConfig) -> ApiResult<Self> {
        let api_key = config
            .nylas_api_key
            .clone()
            .ok_or_else(|| ApiError::missing_env("NYLAS_API_KEY"))?;
        let grant_id = config
            .nylas_grant_id
            .clone()
            .ok_or_else(|| ApiError::missing_env("NYLAS_GRANT_ID"))?;

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ApiError::upstream(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_uri: config.nylas_api_uri.trim_end_matches('/').to_string(),
            api_key,
            grant_id,
            calendar_id: config.calendar_id.clone(),
        })
    }

    fn events_url(&self) -> String {
        format!("{}/v3/grants/{}/events", self.api_uri, self.grant_id)
    }

    fn calendar_id(&self, explicit: Option<&str>) -> ApiResult<String> {
        explicit
            .map(str::to_string)
            .or_else(|| self.calendar_id.clone())
            .ok_or_else(|| ApiError::missing_env("CALENDAR_ID"))
    }

    /// List events, optionally bounded by Unix-second start/end filters.
    pub async fn list_events(
        &self,
        start: Option<i64>,
        end: Option<i64>,
        limit: u32,
    ) -> ApiResult<Vec<EventRecord>> {
        let calendar_id = self.calendar_id(None)?;

        let mut query: Vec<(&str, String)> = vec![
            ("calendar_id", calendar_id),
            ("limit", limit.to_string()),
        ];
        if let Some(start) = start {
            query.push(("start", start.to_string()));
        }
        if let Some(end) = end {
            query.push(("end", end.to_string()));
        }

        let response = self
            .http
            .get(self.events_url())
            .bearer_auth(&self.api_key)
            .query(&query)
            .send()
            .await?;

        let envelope = check_status(response).await?.json::<EventListEnvelope>().await?;
        tracing::debug!("Retrieved {} events", envelope.data.len());
        Ok(envelope.data)
    }

    /// List today's events, from local midnight through 23:59:59.
    pub async fn today_events(&self) -> ApiResult<Vec<EventRecord>> {
        let today = Local::now().date_naive();
        let start = today
            .and_hms_opt(0, 0, 0)
            .and_then(|naive| naive.and_local_timezone(Local).earliest())
            .map(|dt| dt.timestamp());
        let end = today
            .and_hms_opt(23, 59, 59)
            .and_then(|naive| naive.and_local_timezone(Local).latest())
            .map(|dt| dt.timestamp());

        self.list_events(start, end, 100).await
    }

    /// Create an event. Start and end times may arrive as Unix seconds or
    /// ISO-8601 strings; they are normalized before hitting the provider.
    pub async fn create_event(&self, request: &CreateEventRequest) -> ApiResult<EventRecord> {
        let calendar_id = self.calendar_id(request.calendar_id.as_deref())?;

        let start = ensure_unix_timestamp(&request.start_time)
            .map_err(|e| ApiError::bad_request(e.to_string()))?;
        let end = ensure_unix_timestamp(&request.end_time)
            .map_err(|e| ApiError::bad_request(e.to_string()))?;

        let mut body = json!({
            "title": request.title,
            "busy": request.busy,
            "description": request.description.clone().unwrap_or_default(),
            "location": request.location.clone().unwrap_or_default(),
        });

        if let (Some(start), Some(end)) = (start, end) {
            body["when"] = json!({
                "start_time": start,
                "end_time": end,
                "start_timezone": request.start_timezone,
                "end_timezone": request.end_timezone,
            });
        }
        if !request.participants.is_empty() {
            body["participants"] = json!(request.participants);
        }
        if let Some(recurrence) = &request.recurrence {
            body["recurrence"] = json!(recurrence);
        }

        let response = self
            .http
            .post(self.events_url())
            .bearer_auth(&self.api_key)
            .query(&[("calendar_id", calendar_id)])
            .json(&body)
            .send()
            .await?;

        let envelope = check_status(response).await?.json::<EventEnvelope>().await?;
        tracing::info!("Event created: {}", envelope.data.id);
        Ok(envelope.data)
    }
}

async fn check_status(response: reqwest::Response) -> ApiResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    if status == StatusCode::NOT_FOUND {
        return Err(ApiError::not_found("Calendar resource"));
    }
    Err(ApiError::upstream(format!(
        "Calendar provider returned {status}: {body}"
    )))
}
