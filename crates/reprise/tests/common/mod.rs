//! Common test utilities for reprise integration tests
//!
//! - Scripted operations that fail a fixed number of times
//! - Event recorders for session subscriptions
//! - Timing helpers

#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;

/// Operation that fails a scripted number of times, counting every call
#[derive(Debug, Clone, Default)]
pub struct ScriptedOperation {
    calls: Arc<AtomicU32>,
    failures: u32,
}

impl ScriptedOperation {
    /// Fail `failures` times with "NOPE", then succeed
    pub fn failing(failures: u32) -> Self {
        Self {
            calls: Arc::new(AtomicU32::new(0)),
            failures,
        }
    }

    /// Never succeed; every call fails with "ERR"
    pub fn always_failing() -> Self {
        Self::failing(u32::MAX)
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// The callable handed to a session
    ///
    /// Succeeds with the bound argument echoed back.
    pub fn callable(
        &self,
    ) -> impl Fn(&'static str) -> std::future::Ready<Result<String, String>> {
        let calls = Arc::clone(&self.calls);
        let failures = self.failures;
        move |arg| {
            let call = calls.fetch_add(1, Ordering::SeqCst) + 1;
            let outcome = if failures == u32::MAX {
                Err("ERR".to_string())
            } else if call <= failures {
                Err("NOPE".to_string())
            } else {
                Ok(arg.to_string())
            };
            std::future::ready(outcome)
        }
    }
}

/// Shared log of formatted events
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    entries: Arc<Mutex<Vec<String>>>,
    stamps: Arc<Mutex<Vec<Instant>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: impl Into<String>) {
        self.entries.lock().unwrap().push(entry.into());
        self.stamps.lock().unwrap().push(Instant::now());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    pub fn stamps(&self) -> Vec<Instant> {
        self.stamps.lock().unwrap().clone()
    }
}

/// Check `measured` is within `tolerance` (a fraction) of `expected`
pub fn within_tolerance(measured: Duration, expected: Duration, tolerance: f64) -> bool {
    let measured = measured.as_secs_f64();
    let expected = expected.as_secs_f64();
    measured >= expected * (1.0 - tolerance) && measured <= expected * (1.0 + tolerance)
}
