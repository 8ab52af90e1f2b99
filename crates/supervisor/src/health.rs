// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP health polling.

use std::time::{Duration, Instant};

use thiserror::Error;

/// Default budget for a health gate.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default interval between probes.
pub const DEFAULT_POLL: Duration = Duration::from_millis(250);

/// Budget for slow boots (host-start, bootstrap-local).
pub const EXTENDED_TIMEOUT: Duration = Duration::from_secs(180);

#[derive(Debug, Error)]
pub enum HealthError {
    #[error("health check timed out after {timeout:.1}s at {url} (last error: {last_error})",
        timeout = .timeout.as_secs_f64())]
    Timeout { url: String, timeout: Duration, last_error: String },
}

/// Poll `url` with GET until the first 2xx response.
///
/// On timeout the last observed failure (connect error or non-2xx status)
/// is carried in the error.
pub async fn wait_for_healthy(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
    poll: Duration,
) -> Result<(), HealthError> {
    let deadline = Instant::now() + timeout;
    let mut last_error = "no probe completed".to_string();

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(HealthError::Timeout {
                url: url.to_string(),
                timeout,
                last_error,
            });
        }

        let per_probe = remaining.min(Duration::from_secs(2));
        match client.get(url).timeout(per_probe).send().await {
            Ok(resp) if resp.status().is_success() => return Ok(()),
            Ok(resp) => last_error = format!("status {}", resp.status()),
            Err(e) => last_error = e.to_string(),
        }

        tokio::time::sleep(poll).await;
    }
}

/// Single probe: does `url` answer 2xx within `timeout`?
pub async fn probe_ok(client: &reqwest::Client, url: &str, timeout: Duration) -> bool {
    match client.get(url).timeout(timeout).send().await {
        Ok(resp) => resp.status().is_success(),
        Err(_) => false,
    }
}

#[cfg(test)]
#[path = "health_tests.rs"]
mod tests;
