// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process liveness and signaling.

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;

/// Check whether a process with the given pid exists.
///
/// Signal 0 probes without delivering anything; EPERM still means the
/// process is there.
pub fn process_alive(pid: u32) -> bool {
    let pid = Pid::from_raw(pid as i32);
    match kill(pid, None) {
        Ok(()) => true,
        Err(nix::errno::Errno::EPERM) => true,
        Err(_) => false,
    }
}

/// Request graceful termination.
pub fn send_term(pid: u32) -> bool {
    kill(Pid::from_raw(pid as i32), Signal::SIGTERM).is_ok()
}

/// Force-kill.
pub fn send_kill(pid: u32) -> bool {
    kill(Pid::from_raw(pid as i32), Signal::SIGKILL).is_ok()
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
