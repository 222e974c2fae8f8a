//! Connection reconciliation store.
//!
//! `ConnectionTracker` owns the active, historical, and bucket state and
//! recomputes all of it from each incoming snapshot. The computation always
//! runs; the pause gate only decides whether the result is published.

use std::sync::Arc;

use crate::config::EngineConfig;
use crate::core::aggregate::aggregate_buckets;
use crate::core::connection::{
    ConnectionViews, DerivedConnection, SnapshotMessage, VirtualConnections,
};
use crate::core::history::{detect_closed, merge_history};
use crate::core::pause::PauseGate;
use crate::core::speed::derive_speeds;

/// Single-owner engine state. Snapshots must be ingested in arrival order.
pub struct ConnectionTracker {
    config: EngineConfig,
    pause: PauseGate,
    /// Last internally processed active set; the speed baseline.
    active: Vec<DerivedConnection>,
    /// Bounded "all seen" window used for closure detection.
    all: Vec<DerivedConnection>,
    virtual_connections: VirtualConnections,
    published: Arc<ConnectionViews>,
}

impl ConnectionTracker {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_pause_gate(config, PauseGate::new())
    }

    pub fn with_pause_gate(config: EngineConfig, pause: PauseGate) -> Self {
        Self {
            config,
            pause,
            active: Vec::new(),
            all: Vec::new(),
            virtual_connections: VirtualConnections::new(),
            published: Arc::new(ConnectionViews::default()),
        }
    }

    /// Handle for toggling publication from outside the engine.
    pub fn pause_gate(&self) -> PauseGate {
        self.pause.clone()
    }

    /// Takes effect from the next ingested snapshot on.
    pub fn set_paused(&self, paused: bool) {
        self.pause.set_paused(paused);
    }

    /// Recompute all derived state from one snapshot.
    ///
    /// Returns the newly published views, or `None` when the message carried no
    /// connection list or publication is paused.
    pub fn ingest(&mut self, message: SnapshotMessage) -> Option<Arc<ConnectionViews>> {
        let Some(records) = message.connections else {
            tracing::trace!("Snapshot without connection list, skipping");
            return None;
        };

        let mut active = derive_speeds(records, &self.active);
        let virtual_connections = aggregate_buckets(&mut active, &self.virtual_connections);
        let all = std::mem::take(&mut self.all);
        self.all = merge_history(all, &active, self.config.max_closed_rows);
        self.active = active;
        self.virtual_connections = virtual_connections;

        if self.pause.is_paused() {
            tracing::trace!("Publication paused, holding {} active rows", self.active.len());
            return None;
        }

        let closed = detect_closed(&self.all, &self.active, self.config.max_closed_rows);
        let views = Arc::new(ConnectionViews {
            active: self.active.clone(),
            closed,
            virtual_connections: self.virtual_connections.clone(),
            upload_total: message.upload_total,
            download_total: message.download_total,
        });
        tracing::debug!(
            "Published {} active / {} closed connections",
            views.active.len(),
            views.closed.len()
        );
        self.published = Arc::clone(&views);
        Some(views)
    }

    /// The most recently published views.
    pub fn views(&self) -> Arc<ConnectionViews> {
        Arc::clone(&self.published)
    }

    /// Internal history window, exposed for cross-view consistency checks.
    pub fn all_connections(&self) -> &[DerivedConnection] {
        &self.all
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::connection::{Bucket, VirtualConnection};
    use serde_json::json;

    fn snapshot(connections: serde_json::Value) -> SnapshotMessage {
        serde_json::from_value(json!({ "connections": connections })).unwrap()
    }

    fn ids(rows: &[DerivedConnection]) -> Vec<&str> {
        rows.iter().map(|c| c.id()).collect()
    }

    fn tracker(max_closed_rows: usize) -> ConnectionTracker {
        ConnectionTracker::new(EngineConfig { max_closed_rows })
    }

    #[test]
    fn test_end_to_end_open_update_close() {
        let mut t = tracker(10);

        let v1 = t
            .ingest(snapshot(json!([
                { "id": "a", "chains": ["Proxy"], "upload": 0, "download": 0 }
            ])))
            .unwrap();
        assert_eq!(ids(&v1.active), vec!["a"]);
        assert_eq!((v1.active[0].upload_speed, v1.active[0].download_speed), (0, 0));
        assert!(v1.closed.is_empty());
        assert_eq!(
            v1.virtual_connections[&Bucket::Proxy],
            VirtualConnection::empty(Bucket::Proxy)
        );

        let v2 = t
            .ingest(snapshot(json!([
                { "id": "a", "chains": ["Proxy"], "upload": 10, "download": 20 }
            ])))
            .unwrap();
        assert_eq!((v2.active[0].upload_speed, v2.active[0].download_speed), (10, 20));
        let proxy = v2.virtual_connections[&Bucket::Proxy];
        assert_eq!((proxy.upload, proxy.download), (10, 20));
        assert_eq!((proxy.upload_speed, proxy.download_speed), (10, 20));

        let v3 = t.ingest(snapshot(json!([]))).unwrap();
        assert!(v3.active.is_empty());
        assert_eq!(ids(&v3.closed), vec!["a"]);
        assert_eq!(v3.virtual_connections[&Bucket::Proxy], proxy);
    }

    #[test]
    fn test_message_without_connections_is_noop() {
        let mut t = tracker(10);
        t.ingest(snapshot(json!([{ "id": "a", "upload": 5, "download": 5 }])));
        let before = t.views();

        assert!(t.ingest(SnapshotMessage::default()).is_none());
        assert_eq!(t.views(), before);
        assert_eq!(ids(t.all_connections()), vec!["a"]);
    }

    #[test]
    fn test_pause_freezes_views_but_keeps_speed_baseline() {
        let mut t = tracker(10);
        let gate = t.pause_gate();
        t.ingest(snapshot(json!([
            { "id": "a", "chains": ["Proxy"], "upload": 0, "download": 0 }
        ])));
        let frozen = t.views();

        gate.set_paused(true);
        for step in 1..=5u64 {
            let counters = step * 100;
            let out = t.ingest(snapshot(json!([
                { "id": "a", "chains": ["Proxy"], "upload": counters, "download": counters }
            ])));
            assert!(out.is_none());
            assert_eq!(t.views(), frozen);
        }

        t.set_paused(false);
        let resumed = t
            .ingest(snapshot(json!([
                { "id": "a", "chains": ["Proxy"], "upload": 530, "download": 510 }
            ])))
            .unwrap();
        // Delta is against the last processed snapshot (500), not the last published one (0).
        assert_eq!(resumed.active[0].upload_speed, 30);
        assert_eq!(resumed.active[0].download_speed, 10);
    }

    #[test]
    fn test_closures_while_paused_appear_after_resume() {
        let mut t = tracker(10);
        let gate = t.pause_gate();
        t.ingest(snapshot(json!([{ "id": "a" }, { "id": "b" }])));

        gate.set_paused(true);
        t.ingest(snapshot(json!([{ "id": "b" }])));
        assert!(t.views().closed.is_empty());

        gate.set_paused(false);
        let views = t.ingest(snapshot(json!([{ "id": "b" }]))).unwrap();
        assert_eq!(ids(&views.closed), vec!["a"]);
    }

    #[test]
    fn test_bounds_hold_under_churn() {
        let max_closed = 3;
        let mut t = tracker(max_closed);
        for round in 0..20 {
            let conns: Vec<_> = (0..4)
                .map(|i| json!({ "id": format!("r{round}-{i}"), "upload": 1, "download": 1 }))
                .collect();
            let views = t.ingest(snapshot(json!(conns))).unwrap();
            assert!(views.closed.len() <= max_closed);
            assert!(t.all_connections().len() <= views.active.len() + max_closed);
        }
    }

    #[test]
    fn test_active_ids_are_unique() {
        let mut t = tracker(10);
        let views = t
            .ingest(snapshot(json!([{ "id": "a" }, { "id": "b" }, { "id": "a" }])))
            .unwrap();
        assert_eq!(ids(&views.active), vec!["a", "b"]);
    }

    #[test]
    fn test_totals_pass_through() {
        let mut t = tracker(10);
        let msg: SnapshotMessage = serde_json::from_value(json!({
            "connections": [],
            "uploadTotal": 123,
            "downloadTotal": 456
        }))
        .unwrap();
        let views = t.ingest(msg).unwrap();
        assert_eq!((views.upload_total, views.download_total), (123, 456));
    }

    #[test]
    fn test_buckets_split_by_chain() {
        let mut t = tracker(10);
        t.ingest(snapshot(json!([
            { "id": "p", "chains": ["Proxy"], "upload": 0, "download": 0 },
            { "id": "d", "chains": ["DIRECT"], "upload": 0, "download": 0 }
        ])));
        let views = t
            .ingest(snapshot(json!([
                { "id": "p", "chains": ["Proxy"], "upload": 8, "download": 4 },
                { "id": "d", "chains": ["DIRECT"], "upload": 3, "download": 1 }
            ])))
            .unwrap();
        assert_eq!(views.virtual_connections[&Bucket::Proxy].upload_speed, 8);
        assert_eq!(views.virtual_connections[&Bucket::Direct].upload_speed, 3);
        assert_eq!(views.active[0].preserve, Some(Bucket::Proxy));
        assert_eq!(views.active[1].preserve, Some(Bucket::Direct));
    }
}
