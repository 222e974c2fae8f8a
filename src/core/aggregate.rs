//! Folds active connections into the two persistent bucket rows.
//!
//! Bucket totals cannot be recomputed from members alone since closed members
//! take their history with them. Each snapshot starts from the previous rows:
//! the first member folded into a bucket seeds the row from the previous
//! cumulative value plus its own speed; every later member in the same
//! snapshot adds its cumulative counters and its speed.

use std::collections::btree_map::Entry;

use crate::core::connection::{Bucket, DerivedConnection, VirtualConnection, VirtualConnections};

/// Tag each active connection with its bucket and compute the next bucket rows.
///
/// Buckets without members this snapshot keep their previous row unchanged.
pub fn aggregate_buckets(
    active: &mut [DerivedConnection],
    previous: &VirtualConnections,
) -> VirtualConnections {
    let mut folded = VirtualConnections::new();

    for conn in active.iter_mut() {
        let bucket = Bucket::classify(&conn.record.chains);
        conn.preserve = Some(bucket);

        match folded.entry(bucket) {
            Entry::Vacant(slot) => {
                let baseline = previous
                    .get(&bucket)
                    .copied()
                    .unwrap_or_else(|| VirtualConnection::empty(bucket));
                slot.insert(VirtualConnection {
                    bucket,
                    upload: baseline.upload.saturating_add(conn.upload_speed),
                    download: baseline.download.saturating_add(conn.download_speed),
                    upload_speed: conn.upload_speed,
                    download_speed: conn.download_speed,
                });
            }
            Entry::Occupied(mut slot) => {
                let row = slot.get_mut();
                row.upload = row.upload.saturating_add(conn.record.upload.unwrap_or(0));
                row.download = row.download.saturating_add(conn.record.download.unwrap_or(0));
                row.upload_speed = row.upload_speed.saturating_add(conn.upload_speed);
                row.download_speed = row.download_speed.saturating_add(conn.download_speed);
            }
        }
    }

    let mut next = previous.clone();
    next.extend(folded);
    next
}
