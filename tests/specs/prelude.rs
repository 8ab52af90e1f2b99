//! Test helpers for behavioral specifications.
//!
//! Provides a small DSL for running the openwork binary against an
//! isolated data dir. Daemon autostart is disabled by default so specs
//! exercise the CLI's direct state path; daemon behavior has its own
//! in-crate tests.

#![allow(dead_code)]

use std::path::PathBuf;
use std::process::{Command, Output};

use tempfile::TempDir;

/// An isolated home for one spec: its own data dir and workspace root.
pub struct Sandbox {
    root: TempDir,
}

impl Sandbox {
    pub fn new() -> Self {
        Self { root: tempfile::tempdir().expect("create sandbox tempdir") }
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.path().join("data")
    }

    pub fn workspace(&self, name: &str) -> PathBuf {
        self.root.path().join(name)
    }

    pub fn state_json(&self) -> serde_json::Value {
        let raw = std::fs::read_to_string(self.data_dir().join("state.json"))
            .expect("state.json should exist");
        serde_json::from_str(&raw).expect("state.json should parse")
    }

    /// Command builder for the openwork binary inside this sandbox.
    pub fn openwork(&self) -> Cli {
        let mut cmd = Command::new(openwork_binary());
        cmd.env("OPENWORK_DATA_DIR", self.data_dir())
            .env("OPENWORK_DAEMON_AUTOSTART", "0")
            .env("NO_COLOR", "1")
            .arg("--color")
            .arg("never");
        Cli { cmd }
    }
}

pub struct Cli {
    cmd: Command,
}

impl Cli {
    pub fn args(mut self, args: &[&str]) -> Self {
        self.cmd.args(args);
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.cmd.env(key, value);
        self
    }

    pub fn run(mut self) -> Run {
        let output = self.cmd.output().expect("spawn openwork");
        Run { output }
    }

    pub fn passes(self) -> Run {
        let run = self.run();
        assert!(
            run.output.status.success(),
            "expected success, got {:?}\nstdout: {}\nstderr: {}",
            run.output.status.code(),
            run.stdout(),
            run.stderr()
        );
        run
    }

    pub fn fails(self) -> Run {
        let run = self.run();
        assert!(
            !run.output.status.success(),
            "expected failure\nstdout: {}\nstderr: {}",
            run.stdout(),
            run.stderr()
        );
        run
    }
}

pub struct Run {
    output: Output,
}

impl Run {
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.output.stdout).into_owned()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.output.stderr).into_owned()
    }

    pub fn code(&self) -> i32 {
        self.output.status.code().unwrap_or(-1)
    }
}

/// Path to the built openwork binary.
fn openwork_binary() -> PathBuf {
    assert_cmd::cargo::cargo_bin("openwork")
}
