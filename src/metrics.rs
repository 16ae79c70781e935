//=====================================================
// File: metrics.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Telemetry for traffic crossing the bridge
// Objective: Count bridge events by kind and keep timestamped records for
//            later inspection
//=====================================================

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use parking_lot::Mutex;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BridgeEventKind {
    Convert,
    Wrap,
    /// One argument list pushed onto the guest stack.
    Push,
    Call,
    TailCollapse,
    Failure,
}

/// JSON-serialisable view of one bridge event.
#[derive(Debug, Clone, Serialize)]
pub struct BridgeRecord {
    pub kind: BridgeEventKind,
    pub detail: Option<String>,
    pub timestamp_utc: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BridgeCounters {
    pub conversions: u64,
    pub wraps: u64,
    pub pushes: u64,
    pub calls: u64,
    pub tail_collapses: u64,
    pub failures: u64,
}

#[derive(Debug, Default)]
struct TelemetryState {
    counters: BridgeCounters,
    records: Vec<BridgeRecord>,
}

/// Collects bridge telemetry. Clones share one buffer.
#[derive(Debug, Clone, Default)]
pub struct BridgeTelemetry {
    state: Arc<Mutex<TelemetryState>>,
}

impl BridgeTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, kind: BridgeEventKind) {
        let mut state = self.state.lock();
        let counters = &mut state.counters;
        match kind {
            BridgeEventKind::Convert => counters.conversions += 1,
            BridgeEventKind::Wrap => counters.wraps += 1,
            BridgeEventKind::Push => counters.pushes += 1,
            BridgeEventKind::Call => counters.calls += 1,
            BridgeEventKind::TailCollapse => counters.tail_collapses += 1,
            BridgeEventKind::Failure => counters.failures += 1,
        }
    }

    /// Counts the event and keeps a timestamped record of it.
    pub fn record(&self, kind: BridgeEventKind, detail: Option<String>) {
        self.count(kind);
        self.state.lock().records.push(BridgeRecord {
            kind,
            detail,
            timestamp_utc: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        });
    }

    pub fn counters(&self) -> BridgeCounters {
        self.state.lock().counters
    }

    pub fn snapshot(&self) -> Vec<BridgeRecord> {
        self.state.lock().records.clone()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        let state = self.state.lock();
        serde_json::to_string(&serde_json::json!({
            "counters": state.counters,
            "records": state.records,
        }))
    }
}


//=====================================================
// End of file
//=====================================================
