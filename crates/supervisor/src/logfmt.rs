// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Log output formats.
//!
//! Two renderings of the same event stream: `pretty` for humans
//! (`[component] LEVEL message`, colorized on a TTY) and `json` emitting
//! OpenTelemetry-logs-shaped records. Both are implemented as
//! tracing-subscriber layers over the workspace-wide `tracing` events, so
//! orchestrator code logs exactly one way regardless of the output format.
//!
//! `timeUnixNano` is monotonically encoded: a record never carries a
//! timestamp less than or equal to its predecessor's, even when the wall
//! clock stalls within a nanosecond tick.

use std::collections::BTreeMap;
use std::io::{IsTerminal, Write};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{json, Map, Value};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Component attributed to events that carry no `component` field.
pub const DEFAULT_COMPONENT: &str = "orchestrator";

/// Output format selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format {other:?} (expected pretty or json)")),
        }
    }
}

/// Logger configuration for one run.
///
/// `color` arrives fully resolved (the CLI folds `auto` against the TTY
/// check via [`stdout_is_tty`]).
#[derive(Debug, Clone)]
pub struct LogOptions {
    pub format: LogFormat,
    pub color: bool,
    pub run_id: String,
    pub verbose: bool,
}

/// TTY check for resolving `--color auto`.
pub fn stdout_is_tty() -> bool {
    std::io::stdout().is_terminal()
}

type Sink = Arc<dyn Fn(String) + Send + Sync>;

fn stdout_sink() -> Sink {
    Arc::new(|line| {
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "{line}");
    })
}

/// Install the global subscriber for a foreground run.
///
/// `RUST_LOG` still overrides the level filter, matching the daemon's file
/// logger.
pub fn init(opts: &LogOptions) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if opts.verbose { "debug" } else { "info" }));
    let registry = tracing_subscriber::registry().with(filter);
    match opts.format {
        LogFormat::Pretty => {
            let _ = registry.with(PrettyLayer::new(opts.color, stdout_sink())).try_init();
        }
        LogFormat::Json => {
            let _ = registry
                .with(OtelJsonLayer::new(&opts.run_id, stdout_sink()))
                .try_init();
        }
    }
}

/// Does this child output line already parse as an OTEL log record?
///
/// Used by the supervisor to pass structured sidecar logs through verbatim
/// in json mode instead of re-wrapping them.
pub fn is_otel_record(line: &str) -> bool {
    let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(line.trim()) else {
        return false;
    };
    obj.contains_key("timeUnixNano")
        && (obj.contains_key("body") || obj.contains_key("severityText"))
}

/// Print a child's already-OTEL-shaped line unchanged.
pub fn emit_passthrough(line: &str) {
    let mut out = std::io::stdout().lock();
    let _ = writeln!(out, "{line}");
}

// --- field capture ---

#[derive(Default)]
struct FieldVisitor {
    message: Option<String>,
    fields: BTreeMap<String, Value>,
}

impl FieldVisitor {
    fn record(&mut self, field: &Field, value: Value) {
        if field.name() == "message" {
            self.message = Some(match value {
                Value::String(s) => s,
                other => other.to_string(),
            });
        } else {
            self.fields.insert(field.name().to_string(), value);
        }
    }
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.record(field, Value::String(value.to_string()));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.record(field, json!(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.record(field, json!(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.record(field, json!(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.record(field, json!(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.record(field, Value::String(format!("{value:?}")));
    }
}

/// Render one event into (component, message, remaining attributes).
fn split_event(event: &Event<'_>) -> (String, String, BTreeMap<String, Value>) {
    let mut visitor = FieldVisitor::default();
    event.record(&mut visitor);
    let component = match visitor.fields.remove("component") {
        Some(Value::String(s)) => s,
        Some(other) => other.to_string(),
        None => DEFAULT_COMPONENT.to_string(),
    };
    (component, visitor.message.unwrap_or_default(), visitor.fields)
}

// --- pretty ---

struct PrettyLayer {
    color: bool,
    sink: Sink,
}

impl PrettyLayer {
    fn new(color: bool, sink: Sink) -> Self {
        Self { color, sink }
    }
}

fn level_color(level: &Level) -> &'static str {
    match *level {
        Level::ERROR => "\x1b[31m",
        Level::WARN => "\x1b[33m",
        Level::INFO => "\x1b[32m",
        Level::DEBUG => "\x1b[36m",
        Level::TRACE => "\x1b[90m",
    }
}

/// `[component] LEVEL message key=value ...`
fn format_pretty(
    level: &Level,
    component: &str,
    message: &str,
    fields: &BTreeMap<String, Value>,
    color: bool,
) -> String {
    let mut line = String::new();
    if color {
        line.push_str(&format!(
            "\x1b[90m[{component}]\x1b[0m {}{level}\x1b[0m {message}",
            level_color(level)
        ));
    } else {
        line.push_str(&format!("[{component}] {level} {message}"));
    }
    for (key, value) in fields {
        let rendered = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        line.push_str(&format!(" {key}={rendered}"));
    }
    line
}

impl<S: Subscriber> Layer<S> for PrettyLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let (component, message, fields) = split_event(event);
        let line =
            format_pretty(event.metadata().level(), &component, &message, &fields, self.color);
        (self.sink)(line);
    }
}

// --- OTEL json ---

fn severity_number(level: &Level) -> u32 {
    match *level {
        Level::TRACE => 1,
        Level::DEBUG => 5,
        Level::INFO => 9,
        Level::WARN => 13,
        Level::ERROR => 17,
    }
}

/// Resource attributes common to every record of a run.
fn resource_attributes(run_id: &str) -> Map<String, Value> {
    let mut resource = Map::new();
    resource.insert("service.name".to_string(), json!("openwork"));
    resource.insert("service.instance.id".to_string(), json!(run_id));
    let host = nix::unistd::gethostname()
        .map(|h| h.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "unknown".to_string());
    resource.insert("host.name".to_string(), json!(host));

    // Caller-supplied resource attributes win on key collision.
    if let Ok(extra) = std::env::var("OTEL_RESOURCE_ATTRIBUTES") {
        for pair in extra.split(',') {
            if let Some((key, value)) = pair.split_once('=') {
                let key = key.trim();
                if !key.is_empty() {
                    resource.insert(key.to_string(), json!(value.trim()));
                }
            }
        }
    }
    resource
}

struct OtelJsonLayer {
    resource: Map<String, Value>,
    last_nanos: AtomicU64,
    sink: Sink,
}

impl OtelJsonLayer {
    fn new(run_id: &str, sink: Sink) -> Self {
        Self { resource: resource_attributes(run_id), last_nanos: AtomicU64::new(0), sink }
    }

    fn next_nanos(&self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        let mut last = self.last_nanos.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(last.saturating_add(1));
            match self.last_nanos.compare_exchange_weak(
                last,
                candidate,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return candidate,
                Err(actual) => last = actual,
            }
        }
    }

    fn render(&self, level: &Level, component: &str, message: &str, fields: BTreeMap<String, Value>) -> Value {
        let mut attributes = Map::new();
        attributes.insert("component".to_string(), json!(component));
        for (key, value) in fields {
            attributes.insert(key, value);
        }
        json!({
            "timeUnixNano": self.next_nanos().to_string(),
            "severityText": level.as_str(),
            "severityNumber": severity_number(level),
            "body": message,
            "attributes": Value::Object(attributes),
            "resource": Value::Object(self.resource.clone()),
        })
    }
}

impl<S: Subscriber> Layer<S> for OtelJsonLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let (component, message, fields) = split_event(event);
        let record = self.render(event.metadata().level(), &component, &message, fields);
        (self.sink)(record.to_string());
    }
}

#[cfg(test)]
#[path = "logfmt_tests.rs"]
mod tests;
