use serde::Serialize;

use crate::events::{EventSink, IngestEvent};
use crate::types::{EventWindow, GroupedSensorFileSet, TimeRange};

#[derive(Debug, Clone, Serialize)]
pub struct EventSelection {
    pub selected: Vec<GroupedSensorFileSet>,
    /// Span covered by every group that was considered, selected or not.
    pub available: Option<TimeRange>,
}

pub fn available_range(groups: &[GroupedSensorFileSet]) -> Option<TimeRange> {
    groups
        .iter()
        .map(GroupedSensorFileSet::window)
        .reduce(|acc, window| acc.union(&window))
}

/// Keeps the groups whose window touches at least one event window.
///
/// An empty selection is a valid outcome: the available range is reported so a mismatched
/// event window can be spotted, and the run continues with nothing to do.
pub fn select_groups(
    groups: Vec<GroupedSensorFileSet>,
    events: &[EventWindow],
    sink: &dyn EventSink,
) -> EventSelection {
    let available = available_range(&groups);

    let mut selected = Vec::new();
    for group in groups {
        let window = group.window();
        let matching: Vec<String> = events
            .iter()
            .filter(|event| event.window().overlaps(&window))
            .map(|event| event.event.clone())
            .collect();
        if matching.is_empty() {
            continue;
        }
        sink.emit(IngestEvent::GroupSelected {
            prefix: group.prefix.clone(),
            events: matching,
        });
        selected.push(group);
    }

    if selected.is_empty() {
        sink.emit(IngestEvent::NoMatchingGroups {
            available,
            requested: events.to_vec(),
        });
    }

    EventSelection {
        selected,
        available,
    }
}
