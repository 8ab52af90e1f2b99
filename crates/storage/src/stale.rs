// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Staleness rules for persisted service records.
//!
//! A `daemon` or `engine` record is only authoritative while the recorded
//! pid is alive *and* its `/health` endpoint answers. The probing itself is
//! IO the caller performs; this module owns the decision so the rule is
//! testable without processes.

use std::time::Duration;

use openwork_core::PersistedState;

/// Budget for the health probe backing a staleness check.
pub const STALE_PROBE_TIMEOUT: Duration = Duration::from_millis(1500);

/// Observed liveness of a recorded service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Liveness {
    pub pid_alive: bool,
    pub health_ok: bool,
}

impl Liveness {
    pub const DEAD: Self = Self { pid_alive: false, health_ok: false };
}

/// A record is fresh only when the process is alive and answering.
pub fn service_is_fresh(liveness: Liveness) -> bool {
    liveness.pid_alive && liveness.health_ok
}

/// Drop stale `daemon`/`engine` records from `state`.
///
/// Returns true when anything changed, i.e. the caller should save.
pub fn clear_stale_services(
    state: &mut PersistedState,
    daemon_liveness: Option<Liveness>,
    engine_liveness: Option<Liveness>,
) -> bool {
    let mut changed = false;
    if state.daemon.is_some() && !daemon_liveness.map(service_is_fresh).unwrap_or(false) {
        state.daemon = None;
        changed = true;
    }
    if state.engine.is_some() && !engine_liveness.map(service_is_fresh).unwrap_or(false) {
        state.engine = None;
        changed = true;
    }
    changed
}

#[cfg(test)]
#[path = "stale_tests.rs"]
mod tests;
