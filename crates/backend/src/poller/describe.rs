//! Rendering of detected event changes into sentences for the AI pipeline.

use shared_types::{EventRecord, TimeValue};

use super::diff::{ChangeSet, Snapshot};
use crate::utils::timestamp::format_local_iso;

const UNSPECIFIED_TIME: &str = "unspecified time";
const UNSPECIFIED_LOCATION: &str = "Unspecified location";

fn format_time(value: &TimeValue) -> String {
    match value {
        TimeValue::Absent => UNSPECIFIED_TIME.to_string(),
        TimeValue::Textual(s) if s.is_empty() => UNSPECIFIED_TIME.to_string(),
        TimeValue::Textual(s) => s.clone(),
        TimeValue::Numeric(secs) => format_local_iso(*secs),
    }
}

fn event_times(event: &EventRecord) -> (String, String) {
    match &event.when {
        Some(when) => (format_time(&when.start_time), format_time(&when.end_time)),
        None => (UNSPECIFIED_TIME.to_string(), UNSPECIFIED_TIME.to_string()),
    }
}

fn title_of(event: &EventRecord) -> &str {
    event.title.as_deref().unwrap_or("Untitled")
}

fn id_of(event: &EventRecord) -> &str {
    if event.id.is_empty() {
        "unknown"
    } else {
        &event.id
    }
}

fn location_of(event: &EventRecord) -> &str {
    match event.location.as_deref() {
        Some(loc) if !loc.is_empty() => loc,
        _ => UNSPECIFIED_LOCATION,
    }
}

pub fn describe_added(event: &EventRecord) -> String {
    let (start, end) = event_times(event);
    format!(
        "Added event '{}' (ID: {}) scheduled from {} to {} at {}.",
        title_of(event),
        id_of(event),
        start,
        end,
        location_of(event),
    )
}

pub fn describe_removed(event: &EventRecord) -> String {
    let (start, end) = event_times(event);
    format!(
        "Removed event '{}' (ID: {}) that was scheduled from {} to {}.",
        title_of(event),
        id_of(event),
        start,
        end,
    )
}

/// Describe an updated event by the fields that actually moved. Only start,
/// end and location get explicit clauses; a title- or description-only
/// change falls back to a fixed clause.
pub fn describe_updated(event: &EventRecord, prev_event: Option<&EventRecord>) -> String {
    let (new_start, new_end) = event_times(event);
    let (old_start, old_end) = prev_event
        .map(event_times)
        .unwrap_or_else(|| (UNSPECIFIED_TIME.to_string(), UNSPECIFIED_TIME.to_string()));

    let old_location = prev_event.map(location_of).unwrap_or(UNSPECIFIED_LOCATION);
    let new_location = location_of(event);

    let mut changes: Vec<String> = Vec::new();
    if old_start != new_start {
        changes.push(format!("start {old_start} -> {new_start}"));
    }
    if old_end != new_end {
        changes.push(format!("end {old_end} -> {new_end}"));
    }
    if old_location != new_location {
        changes.push(format!("location '{old_location}' -> '{new_location}'"));
    }

    if changes.is_empty() {
        changes.push("details were updated without time or location changes".to_string());
    }

    format!(
        "Updated event '{}' (ID: {}); {}.",
        title_of(event),
        id_of(event),
        changes.join(", ")
    )
}

/// One sentence per changed event, in added/updated/removed order, with
/// blank descriptions filtered out.
pub fn build_change_descriptions(changes: &ChangeSet, prev: &Snapshot) -> Vec<String> {
    let mut descriptions = Vec::new();

    for event in &changes.added {
        descriptions.push(describe_added(event));
    }
    for event in &changes.updated {
        descriptions.push(describe_updated(event, prev.get(&event.id)));
    }
    for event in &changes.removed {
        descriptions.push(describe_removed(event));
    }

    descriptions
        .into_iter()
        .filter(|d| !d.trim().is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::EventWhen;

    fn event(id: &str, title: &str) -> EventRecord {
        EventRecord {
            id: id.to_string(),
            title: Some(title.to_string()),
            description: None,
            location: None,
            updated_at: TimeValue::Absent,
            when: None,
            participants: Vec::new(),
            busy: None,
        }
    }

    fn with_when(mut e: EventRecord, start: &str, end: &str) -> EventRecord {
        e.when = Some(EventWhen {
            start_time: TimeValue::Textual(start.to_string()),
            end_time: TimeValue::Textual(end.to_string()),
            ..Default::default()
        });
        e
    }

    #[test]
    fn test_describe_added() {
        let mut e = with_when(event("1", "Gym"), "08:00", "09:00");
        e.location = Some("Park".to_string());
        assert_eq!(
            describe_added(&e),
            "Added event 'Gym' (ID: 1) scheduled from 08:00 to 09:00 at Park."
        );
    }

    #[test]
    fn test_describe_added_defaults() {
        let e = EventRecord {
            id: "1".to_string(),
            title: None,
            description: None,
            location: None,
            updated_at: TimeValue::Absent,
            when: None,
            participants: Vec::new(),
            busy: None,
        };
        assert_eq!(
            describe_added(&e),
            "Added event 'Untitled' (ID: 1) scheduled from unspecified time \
             to unspecified time at Unspecified location."
        );
    }

    #[test]
    fn test_describe_removed() {
        let e = with_when(event("7", "Standup"), "09:00", "09:15");
        let desc = describe_removed(&e);
        assert!(desc.starts_with("Removed event"));
        assert_eq!(
            desc,
            "Removed event 'Standup' (ID: 7) that was scheduled from 09:00 to 09:15."
        );
    }

    #[test]
    fn test_describe_updated_location_change() {
        let mut prev = event("1", "Gym");
        prev.location = Some("Park".to_string());
        let mut curr = event("1", "Gym");
        curr.location = Some("Downtown".to_string());

        let desc = describe_updated(&curr, Some(&prev));
        assert!(desc.contains("location 'Park' -> 'Downtown'"));
        assert!(desc.starts_with("Updated event 'Gym' (ID: 1); "));
    }

    #[test]
    fn test_describe_updated_time_changes() {
        let prev = with_when(event("1", "Gym"), "08:00", "09:00");
        let curr = with_when(event("1", "Gym"), "10:00", "11:00");

        let desc = describe_updated(&curr, Some(&prev));
        assert!(desc.contains("start 08:00 -> 10:00"));
        assert!(desc.contains("end 09:00 -> 11:00"));
    }

    #[test]
    fn test_describe_updated_details_only() {
        let prev = event("1", "Gym");
        let curr = event("1", "Gym session");

        assert_eq!(
            describe_updated(&curr, Some(&prev)),
            "Updated event 'Gym session' (ID: 1); details were updated \
             without time or location changes."
        );
    }

    #[test]
    fn test_numeric_times_render_as_local_iso() {
        let mut e = event("1", "Gym");
        e.when = Some(EventWhen {
            start_time: TimeValue::Numeric(1674604800.0),
            end_time: TimeValue::Absent,
            ..Default::default()
        });
        let desc = describe_added(&e);
        // Local rendering; assert shape, not the zone-dependent value.
        assert!(desc.contains("scheduled from 20"));
        assert!(desc.contains("to unspecified time"));
        assert!(!desc.contains("1674604800"));
    }

    #[test]
    fn test_build_descriptions_order_and_filtering() {
        let prev: Snapshot = [("2".to_string(), event("2", "Lunch"))].into();
        let changes = ChangeSet {
            added: vec![event("1", "Gym")],
            updated: vec![event("2", "Lunch v2")],
            removed: vec![event("3", "Old")],
            snapshot: Snapshot::new(),
        };

        let descriptions = build_change_descriptions(&changes, &prev);
        assert_eq!(descriptions.len(), 3);
        assert!(descriptions[0].starts_with("Added event"));
        assert!(descriptions[1].starts_with("Updated event"));
        assert!(descriptions[2].starts_with("Removed event"));
    }
}
