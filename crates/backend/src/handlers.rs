//! HTTP handlers. Thin proxies over the calendar provider, the profile
//! store, and the AI generator; all real logic lives in the clients and
//! services.

use axum::extract::{Json, Query, State};
use serde::{Deserialize, Serialize};
use serde_json::json;
use shared_types::{
    CreateEventRequest, EventRecord, EventsListResponse, HealthInsightsResponse,
    HealthOverviewResponse, UpdateUserProfileRequest, UserProfile,
};
use uuid::Uuid;

use crate::clients::calendar::CalendarClient;
use crate::clients::supabase::SupabaseClient;
use crate::error::{ApiError, ApiResult};
use crate::services::health::HealthDataGenerator;
use crate::services::suggestions::GeminiSuggestionGenerator;
use crate::utils::timestamp::parse_iso_timestamp;

#[derive(Clone)]
pub struct AppState {
    pub calendar: Option<CalendarClient>,
    pub supabase: SupabaseClient,
    pub generator: GeminiSuggestionGenerator,
}

impl AppState {
    fn calendar(&self) -> ApiResult<&CalendarClient> {
        self.calendar
            .as_ref()
            .ok_or_else(|| ApiError::missing_env("NYLAS_API_KEY"))
    }
}

pub async fn root() -> Json<serde_json::Value> {
    Json(json!({ "Hello": "World", "message": "Calendar API is running" }))
}

// Calendar handlers

fn default_limit() -> u32 {
    100
}

#[derive(Debug, Deserialize)]
pub struct ListEventsQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// ISO 8601, e.g. "2025-10-25T00:00:00+07:00"
    pub timestamp_start: Option<String>,
    pub timestamp_end: Option<String>,
}

pub async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<ListEventsQuery>,
) -> ApiResult<Json<EventsListResponse>> {
    let start = query
        .timestamp_start
        .as_deref()
        .map(parse_iso_timestamp)
        .transpose()
        .map_err(|e| ApiError::bad_request(format!("Invalid timestamp format: {e}")))?;
    let end = query
        .timestamp_end
        .as_deref()
        .map(parse_iso_timestamp)
        .transpose()
        .map_err(|e| ApiError::bad_request(format!("Invalid timestamp format: {e}")))?;

    let events = state.calendar()?.list_events(start, end, query.limit).await?;
    let count = events.len();
    Ok(Json(EventsListResponse { events, count }))
}

pub async fn today_events(
    State(state): State<AppState>,
) -> ApiResult<Json<EventsListResponse>> {
    let events = state.calendar()?.today_events().await?;
    let count = events.len();
    Ok(Json(EventsListResponse { events, count }))
}

#[derive(Debug, Serialize)]
pub struct CreateEventResponse {
    pub message: String,
    pub event: EventRecord,
}

pub async fn create_event(
    State(state): State<AppState>,
    Json(payload): Json<CreateEventRequest>,
) -> ApiResult<Json<CreateEventResponse>> {
    let event = state.calendar()?.create_event(&payload).await?;
    Ok(Json(CreateEventResponse {
        message: "Event created successfully".to_string(),
        event,
    }))
}

// Health handlers

pub async fn health_overview() -> Json<HealthOverviewResponse> {
    Json(HealthDataGenerator::overview())
}

pub async fn health_insights(
    State(state): State<AppState>,
) -> ApiResult<Json<HealthInsightsResponse>> {
    let user_id = state.supabase.current_user_id()?;
    let ai_insights = state
        .generator
        .health_insights(&user_id)
        .await
        .map_err(|e| ApiError::Generation(e.to_string()))?;
    Ok(Json(HealthInsightsResponse { ai_insights }))
}

// Suggestion handlers

pub async fn event_day_suggestion(
    State(state): State<AppState>,
) -> ApiResult<Json<serde_json::Value>> {
    let user_id = state.supabase.current_user_id()?;
    let suggestion = state
        .generator
        .event_day_suggestion(&user_id)
        .await
        .map_err(|e| ApiError::Generation(e.to_string()))?;
    Ok(Json(json!({ "suggestion": suggestion })))
}

// User profile handlers

#[derive(Debug, Deserialize)]
pub struct CreateUserProfileRequest {
    pub id: Option<String>,
    pub email: String,
    pub full_name: String,
    #[serde(default)]
    pub custom_goals: Option<String>,
    #[serde(default)]
    pub activity_level: Option<String>,
    #[serde(default)]
    pub step_goal: Option<i32>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub weight: Option<i32>,
    #[serde(default)]
    pub height: Option<i32>,
}

pub async fn get_current_profile(
    State(state): State<AppState>,
) -> ApiResult<Json<UserProfile>> {
    let user_id = state.supabase.current_user_id()?;
    let profile = state.supabase.get_user_profile(&user_id).await?;
    Ok(Json(profile))
}

pub async fn update_current_profile(
    State(state): State<AppState>,
    Json(changes): Json<UpdateUserProfileRequest>,
) -> ApiResult<Json<UserProfile>> {
    let user_id = state.supabase.current_user_id()?;
    let profile = state.supabase.update_user_profile(&user_id, &changes).await?;
    Ok(Json(profile))
}

pub async fn create_profile(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserProfileRequest>,
) -> ApiResult<Json<UserProfile>> {
    let profile = UserProfile {
        id: payload.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
        email: payload.email,
        full_name: payload.full_name,
        custom_goals: payload.custom_goals,
        activity_level: payload.activity_level,
        step_goal: payload.step_goal,
        dob: None,
        gender: payload.gender,
        weight: payload.weight,
        height: payload.height,
    };
    let created = state.supabase.create_user_profile(&profile).await?;
    Ok(Json(created))
}
