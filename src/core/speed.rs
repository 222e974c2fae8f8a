//! Speed derivation: diff each record's cumulative counters against the
//! previous snapshot's row with the same id.

use std::collections::{HashMap, HashSet};

use crate::core::connection::{DerivedConnection, RawConnectionRecord};

/// Produce one [`DerivedConnection`] per raw record, in input order.
///
/// A record with no previous row, or whose previous counters were not
/// numeric, gets speed 0. A counter that went backwards is clamped to 0.
/// Duplicate ids within `records` keep only the first occurrence.
pub fn derive_speeds(
    records: Vec<RawConnectionRecord>,
    previous: &[DerivedConnection],
) -> Vec<DerivedConnection> {
    let prev_by_id: HashMap<&str, &DerivedConnection> =
        previous.iter().map(|c| (c.id(), c)).collect();
    let mut seen: HashSet<String> = HashSet::with_capacity(records.len());

    let mut derived = Vec::with_capacity(records.len());
    for mut record in records {
        if !seen.insert(record.id.clone()) {
            tracing::warn!("Duplicate connection id {} in snapshot, keeping first", record.id);
            continue;
        }

        let (upload_speed, download_speed) = match prev_by_id.get(record.id.as_str()) {
            Some(prev) => (
                counter_delta(&record.id, prev.record.upload, record.upload),
                counter_delta(&record.id, prev.record.download, record.download),
            ),
            None => (0, 0),
        };

        record.strip_derived_fields();
        derived.push(DerivedConnection {
            record,
            upload_speed,
            download_speed,
            preserve: None,
        });
    }
    derived
}

fn counter_delta(id: &str, prev: Option<u64>, current: Option<u64>) -> u64 {
    match (prev, current) {
        (Some(prev), Some(current)) => {
            if current < prev {
                tracing::debug!("Counter rollback on {id}: {prev} -> {current}, clamped to 0");
            }
            current.saturating_sub(prev)
        }
        _ => 0,
    }
}
