// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use chrono::Utc;
use openwork_core::{PersistedState, ServiceRecord};

use super::*;

fn record(pid: u32) -> ServiceRecord {
    ServiceRecord {
        pid,
        port: 7483,
        base_url: "http://127.0.0.1:7483".to_string(),
        started_at: Utc::now(),
    }
}

#[test]
fn alive_and_answering_is_fresh() {
    assert!(service_is_fresh(Liveness { pid_alive: true, health_ok: true }));
}

#[test]
fn alive_but_silent_is_stale() {
    // A pid can be recycled by an unrelated process; only a health answer
    // makes the record authoritative.
    assert!(!service_is_fresh(Liveness { pid_alive: true, health_ok: false }));
    assert!(!service_is_fresh(Liveness { pid_alive: false, health_ok: true }));
    assert!(!service_is_fresh(Liveness::DEAD));
}

#[test]
fn stale_records_are_cleared() {
    let mut state = PersistedState::default();
    state.daemon = Some(record(100));
    state.engine = Some(record(101));

    let changed = clear_stale_services(&mut state, Some(Liveness::DEAD), None);
    assert!(changed);
    assert!(state.daemon.is_none());
    assert!(state.engine.is_none());
}

#[test]
fn fresh_records_survive() {
    let fresh = Liveness { pid_alive: true, health_ok: true };
    let mut state = PersistedState::default();
    state.daemon = Some(record(100));
    state.engine = Some(record(101));

    let changed = clear_stale_services(&mut state, Some(fresh), Some(fresh));
    assert!(!changed);
    assert!(state.daemon.is_some());
    assert!(state.engine.is_some());
}

#[test]
fn absent_records_do_not_mark_change() {
    let mut state = PersistedState::default();
    assert!(!clear_stale_services(&mut state, None, None));
}
