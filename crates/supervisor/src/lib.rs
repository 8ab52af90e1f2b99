// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Child process supervision and run-level utilities.
//!
//! Owns every child for the lifetime of a run: ordered start, stdio line
//! streaming into the log stream, graceful-then-force stop, idempotent
//! fan-out shutdown, and detach. Also carries the small run utilities the
//! rest of the workspace leans on: port allocation, health polling, command
//! execution with timeouts, and the two log output formats.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod child;
pub mod cmd;
pub mod health;
pub mod logfmt;
pub mod port;
pub mod process;
pub mod run;

pub use child::{ChildExit, ChildSpec, SuperviseError, Supervisor};
pub use health::{probe_ok, wait_for_healthy, HealthError};
pub use logfmt::{is_otel_record, LogFormat, LogOptions};
pub use run::{RunOutcome, RunState};

/// Environment variable carrying the run id into every child.
pub const RUN_ID_ENV: &str = "OPENWORK_RUN_ID";
