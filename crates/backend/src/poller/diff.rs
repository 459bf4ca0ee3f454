//! Structural diff between the previous event snapshot and a freshly
//! fetched event list.

use std::collections::HashMap;

use shared_types::EventRecord;

/// All of "today's" events as of the last successful poll, keyed by id.
pub type Snapshot = HashMap<String, EventRecord>;

/// Result of one diff: the change partition plus the replacement snapshot.
#[derive(Debug, Default)]
pub struct ChangeSet {
    pub added: Vec<EventRecord>,
    pub updated: Vec<EventRecord>,
    pub removed: Vec<EventRecord>,
    pub snapshot: Snapshot,
}

impl ChangeSet {
    pub fn has_changes(&self) -> bool {
        !self.added.is_empty() || !self.updated.is_empty() || !self.removed.is_empty()
    }
}

/// Compare the previous snapshot against the current event list.
///
/// An event present in both counts as updated when any of updated_at,
/// title, description or location differs; the time window and participant
/// list do not trigger updates on their own. Duplicate ids in the current
/// list resolve last-wins. The returned snapshot is always the keyed form
/// of `current`, regardless of `prev`.
pub fn diff_events(prev: &Snapshot, current: &[EventRecord]) -> ChangeSet {
    let mut snapshot: Snapshot = HashMap::with_capacity(current.len());
    for event in current {
        snapshot.insert(event.id.clone(), event.clone());
    }

    let mut added = Vec::new();
    let mut updated = Vec::new();

    // Walk the input list (not the map) so output order follows the source.
    let mut seen = std::collections::HashSet::with_capacity(current.len());
    for event in current {
        if !seen.insert(event.id.as_str()) {
            continue;
        }
        // Last-wins: diff against the record that made it into the snapshot.
        let event = &snapshot[&event.id];
        match prev.get(&event.id) {
            None => added.push(event.clone()),
            Some(prev_event) => {
                if event.updated_at != prev_event.updated_at
                    || event.title != prev_event.title
                    || event.description != prev_event.description
                    || event.location != prev_event.location
                {
                    updated.push(event.clone());
                }
            }
        }
    }

    let removed = prev
        .values()
        .filter(|event| !snapshot.contains_key(&event.id))
        .cloned()
        .collect();

    ChangeSet {
        added,
        updated,
        removed,
        snapshot,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{EventWhen, TimeValue};

    fn event(id: &str, title: &str, updated_at: &str) -> EventRecord {
        EventRecord {
            id: id.to_string(),
            title: Some(title.to_string()),
            description: None,
            location: None,
            updated_at: TimeValue::Textual(updated_at.to_string()),
            when: None,
            participants: Vec::new(),
            busy: None,
        }
    }

    fn snapshot_of(events: &[EventRecord]) -> Snapshot {
        events.iter().map(|e| (e.id.clone(), e.clone())).collect()
    }

    #[test]
    fn test_added_events() {
        let prev = snapshot_of(&[event("1", "Gym", "t0")]);
        let current = vec![event("1", "Gym", "t0"), event("2", "Lunch", "t0")];

        let changes = diff_events(&prev, &current);
        assert_eq!(changes.added.len(), 1);
        assert_eq!(changes.added[0].id, "2");
        assert!(changes.updated.is_empty());
        assert!(changes.removed.is_empty());
    }

    #[test]
    fn test_removed_events() {
        let prev = snapshot_of(&[event("1", "Gym", "t0")]);

        let changes = diff_events(&prev, &[]);
        assert!(changes.added.is_empty());
        assert!(changes.updated.is_empty());
        assert_eq!(changes.removed.len(), 1);
        assert_eq!(changes.removed[0].id, "1");
        assert!(changes.snapshot.is_empty());
    }

    #[test]
    fn test_updated_on_trigger_fields_only() {
        let prev = snapshot_of(&[event("1", "Gym", "t0")]);

        // updated_at change triggers
        let changes = diff_events(&prev, &[event("1", "Gym", "t1")]);
        assert_eq!(changes.updated.len(), 1);

        // title change triggers
        let changes = diff_events(&prev, &[event("1", "Yoga", "t0")]);
        assert_eq!(changes.updated.len(), 1);

        // location change triggers
        let mut moved = event("1", "Gym", "t0");
        moved.location = Some("Downtown".to_string());
        let changes = diff_events(&prev, &[moved]);
        assert_eq!(changes.updated.len(), 1);

        // time-window change alone does not trigger
        let mut shifted = event("1", "Gym", "t0");
        shifted.when = Some(EventWhen {
            start_time: TimeValue::Numeric(1000.0),
            ..Default::default()
        });
        let changes = diff_events(&prev, &[shifted]);
        assert!(changes.updated.is_empty());

        // participants change alone does not trigger
        let mut joined = event("1", "Gym", "t0");
        joined.participants = vec![shared_types::Participant {
            name: "Leyah".to_string(),
            email: "leyah@example.com".to_string(),
        }];
        let changes = diff_events(&prev, &[joined]);
        assert!(changes.updated.is_empty());
    }

    #[test]
    fn test_idempotent_when_nothing_changed() {
        let events = vec![event("1", "Gym", "t0"), event("2", "Lunch", "t0")];
        let prev = snapshot_of(&events);

        let changes = diff_events(&prev, &events);
        assert!(!changes.has_changes());
        assert_eq!(changes.snapshot, prev);
    }

    #[test]
    fn test_snapshot_is_keyed_current_regardless_of_prev() {
        let prev = snapshot_of(&[event("9", "Old", "t0")]);
        let current = vec![event("1", "Gym", "t0")];

        let changes = diff_events(&prev, &current);
        assert_eq!(changes.snapshot.len(), 1);
        assert_eq!(changes.snapshot["1"].title.as_deref(), Some("Gym"));
    }

    #[test]
    fn test_duplicate_ids_last_wins() {
        let prev = Snapshot::new();
        let current = vec![event("1", "First", "t0"), event("1", "Second", "t0")];

        let changes = diff_events(&prev, &current);
        assert_eq!(changes.added.len(), 1);
        assert_eq!(changes.added[0].title.as_deref(), Some("Second"));
        assert_eq!(changes.snapshot.len(), 1);
    }

    #[test]
    fn test_does_not_mutate_prev() {
        let prev = snapshot_of(&[event("1", "Gym", "t0")]);
        let before = prev.clone();
        let _ = diff_events(&prev, &[event("1", "Gym", "t9")]);
        assert_eq!(prev, before);
    }
}
