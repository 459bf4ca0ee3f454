use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A point in time as it arrives from the calendar provider.
///
/// The provider mixes representations: epoch seconds for confirmed events,
/// ISO-8601 strings for all-day / tentative ones, and omits the field
/// entirely in some payloads. Handlers and the poller normalize at the
/// boundary instead of guessing downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum TimeValue {
    Numeric(f64),
    Textual(String),
    #[default]
    Absent,
}

impl TimeValue {
    pub fn is_absent(&self) -> bool {
        matches!(self, TimeValue::Absent)
            || matches!(self, TimeValue::Textual(s) if s.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub name: String,
    pub email: String,
}

/// Time window of a calendar event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EventWhen {
    #[serde(default)]
    pub start_time: TimeValue,
    #[serde(default)]
    pub end_time: TimeValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_timezone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_timezone: Option<String>,
}

/// A calendar event as returned by the provider.
///
/// Everything but the identifier is optional; provider payloads are sparse
/// and unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub updated_at: TimeValue,
    #[serde(default)]
    pub when: Option<EventWhen>,
    #[serde(default)]
    pub participants: Vec<Participant>,
    #[serde(default)]
    pub busy: Option<bool>,
}

/// `{events, count}` envelope used by the calendar routes and consumed by
/// the event poller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsListResponse {
    pub events: Vec<EventRecord>,
    pub count: usize,
}

fn default_timezone() -> String {
    "America/New_York".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEventRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub start_time: TimeValue,
    #[serde(default)]
    pub end_time: TimeValue,
    #[serde(default = "default_timezone")]
    pub start_timezone: String,
    #[serde(default = "default_timezone")]
    pub end_timezone: String,
    #[serde(default)]
    pub participants: Vec<Participant>,
    #[serde(default = "default_busy")]
    pub busy: bool,
    #[serde(default)]
    pub recurrence: Option<Vec<String>>,
    #[serde(default)]
    pub calendar_id: Option<String>,
}

fn default_busy() -> bool {
    true
}

/// Structured suggestion the AI generator may return for a changed day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDaySuggestion {
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    pub title: String,
    pub description: String,
}

/// Generator output: a structured suggestion when the model produced one,
/// otherwise its raw text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SuggestionContent {
    Structured(EventDaySuggestion),
    Text(String),
}

/// Record persisted and broadcast after a poll cycle detects changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionPayload {
    pub user_id: String,
    pub generated_at: DateTime<Utc>,
    pub changes: Vec<String>,
    pub suggestion: SuggestionContent,
}

// ---------------------------------------------------------------------------
// User profile

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub full_name: String,
    #[serde(default)]
    pub custom_goals: Option<String>,
    #[serde(default)]
    pub activity_level: Option<String>,
    #[serde(default)]
    pub step_goal: Option<i32>,
    #[serde(default)]
    pub dob: Option<NaiveDate>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub weight: Option<i32>,
    #[serde(default)]
    pub height: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUserProfileRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_goals: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_goal: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<i32>,
}

// ---------------------------------------------------------------------------
// Health data

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workout {
    pub date: NaiveDate,
    pub sport: String,
    pub duration_minutes: u32,
    pub calories: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthData {
    pub steps: u32,
    pub distance_meters: u32,
    pub calories_burned: u32,
    pub sleep_duration: f64,
    pub sleep_quality: u32,
    pub heart_rate: u32,
    pub stress_score: u32,
    pub bp_systolic: u32,
    pub bp_diastolic: u32,
    pub blood_pressure: String,
    pub blood_glucose: u32,
    pub blood_oxygen: u32,
    pub timestamp: DateTime<Utc>,
    pub weekly_workouts: Vec<Workout>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthOverviewResponse {
    pub sleep_hours: f64,
    pub sleep_score: u32,
    pub steps_count: u32,
    pub heart_rate: u32,
    pub emotional_wellbeing_state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_insights: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthInsightsResponse {
    pub ai_insights: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_value_from_number() {
        let v: TimeValue = serde_json::from_str("1674604800").unwrap();
        assert_eq!(v, TimeValue::Numeric(1674604800.0));
    }

    #[test]
    fn test_time_value_from_string() {
        let v: TimeValue = serde_json::from_str("\"2025-10-25T00:00:00+07:00\"").unwrap();
        assert_eq!(v, TimeValue::Textual("2025-10-25T00:00:00+07:00".to_string()));
    }

    #[test]
    fn test_time_value_from_null() {
        let v: TimeValue = serde_json::from_str("null").unwrap();
        assert_eq!(v, TimeValue::Absent);
    }

    #[test]
    fn test_time_value_missing_field_defaults_absent() {
        let when: EventWhen = serde_json::from_str(r#"{"start_time": 10}"#).unwrap();
        assert_eq!(when.start_time, TimeValue::Numeric(10.0));
        assert_eq!(when.end_time, TimeValue::Absent);
    }

    #[test]
    fn test_time_value_serializes_to_same_shapes() {
        assert_eq!(
            serde_json::to_string(&TimeValue::Numeric(5.0)).unwrap(),
            "5.0"
        );
        assert_eq!(
            serde_json::to_string(&TimeValue::Textual("t".into())).unwrap(),
            "\"t\""
        );
        assert_eq!(serde_json::to_string(&TimeValue::Absent).unwrap(), "null");
    }

    #[test]
    fn test_event_record_sparse_payload() {
        let event: EventRecord = serde_json::from_str(
            r#"{"id": "ev-1", "title": "Gym", "unknown_field": 42}"#,
        )
        .unwrap();
        assert_eq!(event.id, "ev-1");
        assert_eq!(event.title.as_deref(), Some("Gym"));
        assert!(event.when.is_none());
        assert!(event.participants.is_empty());
    }

    #[test]
    fn test_suggestion_content_prefers_structured() {
        let json = r#"{"title": "Walk", "description": "Take a walk", "start_time": null, "end_time": null}"#;
        let content: SuggestionContent = serde_json::from_str(json).unwrap();
        assert!(matches!(content, SuggestionContent::Structured(_)));

        let content: SuggestionContent = serde_json::from_str("\"free text\"").unwrap();
        assert_eq!(content, SuggestionContent::Text("free text".to_string()));
    }
}
