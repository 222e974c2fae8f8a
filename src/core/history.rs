//! Bounded "all seen" working set and closure detection.
//!
//! The history window holds at most `active.len() + max_closed` rows. Under a
//! churn burst larger than that window, a connection can be evicted before it
//! is ever reported as closed. This is a known limitation of the bound.

use std::collections::HashSet;

use crate::core::connection::DerivedConnection;

/// Union `active` into `all` by id, keeping existing entries in place and
/// appending unseen ones in order, then keep only the newest
/// `active.len() + max_closed` rows.
pub fn merge_history(
    mut all: Vec<DerivedConnection>,
    active: &[DerivedConnection],
    max_closed: usize,
) -> Vec<DerivedConnection> {
    let mut known: HashSet<String> = all.iter().map(|c| c.record.id.clone()).collect();
    for conn in active {
        if known.insert(conn.record.id.clone()) {
            all.push(conn.clone());
        }
    }

    let window = active.len().saturating_add(max_closed);
    if all.len() > window {
        let evicted = all.len() - window;
        tracing::trace!("History window full, evicting {evicted} oldest rows");
        all.drain(..evicted);
    }
    all
}

/// Rows of `all` whose id is not in `active`, limited to the newest `max_closed`.
pub fn detect_closed(
    all: &[DerivedConnection],
    active: &[DerivedConnection],
    max_closed: usize,
) -> Vec<DerivedConnection> {
    let active_ids: HashSet<&str> = active.iter().map(|c| c.id()).collect();
    let mut closed: Vec<DerivedConnection> = all
        .iter()
        .filter(|c| !active_ids.contains(c.id()))
        .cloned()
        .collect();
    if closed.len() > max_closed {
        closed.drain(..closed.len() - max_closed);
    }
    closed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::connection::RawConnectionRecord;
    use serde_json::Map;

    fn conn(id: &str, upload: u64) -> DerivedConnection {
        DerivedConnection {
            record: RawConnectionRecord {
                id: id.to_string(),
                chains: Vec::new(),
                upload: Some(upload),
                download: Some(0),
                metadata: Map::new(),
            },
            upload_speed: 0,
            download_speed: 0,
            preserve: None,
        }
    }

    fn ids(rows: &[DerivedConnection]) -> Vec<&str> {
        rows.iter().map(|c| c.id()).collect()
    }

    #[test]
    fn test_merge_appends_new_and_retains_existing_entry() {
        let all = vec![conn("a", 1), conn("b", 1)];
        let active = vec![conn("b", 50), conn("c", 1)];
        let merged = merge_history(all, &active, 10);
        assert_eq!(ids(&merged), vec!["a", "b", "c"]);
        // The historical row for "b" is not overwritten by the fresher active row.
        assert_eq!(merged[1].record.upload, Some(1));
    }

    #[test]
    fn test_merge_truncates_to_active_plus_max_closed() {
        let all: Vec<_> = (0..10).map(|i| conn(&format!("old{i}"), 0)).collect();
        let active = vec![conn("x", 0), conn("y", 0)];
        let merged = merge_history(all, &active, 3);
        assert_eq!(merged.len(), 5);
        assert_eq!(ids(&merged), vec!["old7", "old8", "old9", "x", "y"]);
    }

    #[test]
    fn test_merge_can_evict_unreported_closures() {
        // Burst of churn larger than the window: "gone" never makes it to the closed view.
        let all = vec![conn("gone", 0)];
        let active: Vec<_> = (0..4).map(|i| conn(&format!("n{i}"), 0)).collect();
        let merged = merge_history(all, &active, 0);
        assert!(!ids(&merged).contains(&"gone"));
        assert!(detect_closed(&merged, &active, 10).is_empty());
    }

    #[test]
    fn test_detect_closed_is_set_difference_by_id() {
        let all = vec![conn("a", 0), conn("b", 0), conn("c", 0)];
        let active = vec![conn("b", 0)];
        assert_eq!(ids(&detect_closed(&all, &active, 10)), vec!["a", "c"]);
    }

    #[test]
    fn test_detect_closed_keeps_most_recent_rows() {
        let all: Vec<_> = (0..6).map(|i| conn(&format!("c{i}"), 0)).collect();
        let closed = detect_closed(&all, &[], 2);
        assert_eq!(ids(&closed), vec!["c4", "c5"]);
    }

    #[test]
    fn test_detect_closed_nothing_when_all_active() {
        let all = vec![conn("a", 0)];
        assert!(detect_closed(&all, &all, 5).is_empty());
    }
}
