// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The fundamental state cell of the report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

fn unfinished() -> i64 {
    -1
}

/// One observable unit of work. An event is *done* exactly when
/// `seconds > 0`; a finished event never reports zero seconds, so a
/// zero-duration run is indistinguishable from an unfinished one only
/// if the floor were removed. Existing report documents rely on the
/// floor, so it stays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(default)]
    pub name: String,
    /// Loop that produced the current terminal state; absent before the
    /// first attempt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loop_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
    #[serde(default = "unfinished")]
    pub seconds: i64,
    #[serde(default)]
    pub error_msg: String,
}

impl Default for Event {
    fn default() -> Event {
        Event {
            name: String::new(),
            loop_id: None,
            init: None,
            end: None,
            seconds: -1,
            error_msg: String::new(),
        }
    }
}

impl Event {
    pub fn named(name: &str) -> Event {
        Event {
            name: name.to_string(),
            ..Event::default()
        }
    }

    /// Done events are never re-initialised within the same loop.
    pub fn is_done(&self) -> bool {
        self.seconds > 0
    }

    /// Start (or restart) the event in the given loop.
    pub fn begin(&mut self, loop_id: u32, now: DateTime<Utc>) {
        self.init = Some(now);
        self.seconds = -1;
        self.loop_id = Some(loop_id);
    }

    /// Terminate the event. Duration is floored to one second so a
    /// finished event always satisfies `is_done`. On success the error
    /// message is cleared; on failure it is recorded.
    pub fn finish(&mut self, ok: bool, error_msg: Option<String>, now: DateTime<Utc>) {
        self.end = Some(now);
        let elapsed = self
            .init
            .map(|init| (now - init).num_seconds())
            .unwrap_or(0);
        self.seconds = elapsed.max(1);

        self.error_msg = if ok {
            String::new()
        } else {
            match error_msg {
                Some(msg) if !msg.is_empty() => msg,
                _ => "unknown error".to_string(),
            }
        };
    }

    /// Record an error without terminating the event: the failure shows
    /// up in the report, and the next loop re-attempts the work.
    pub fn mark_error(&mut self, loop_id: u32, msg: &str) {
        self.loop_id = Some(loop_id);
        self.seconds = -1;
        self.error_msg = msg.to_string();
    }

    /// Lightweight projection of the event.
    pub fn state(&self) -> EventState {
        let done = self.is_done();
        EventState {
            done,
            loop_id: self.loop_id,
            date: if done { self.end } else { self.init },
            seconds: self.seconds,
            error_msg: if self.error_msg.is_empty() {
                None
            } else {
                Some(self.error_msg.clone())
            },
        }
    }
}

/// Projected event state handed to callers.
#[derive(Debug, Clone, PartialEq)]
pub struct EventState {
    pub done: bool,
    pub loop_id: Option<u32>,
    pub date: Option<DateTime<Utc>>,
    pub seconds: i64,
    pub error_msg: Option<String>,
}

/// Log a terminal event state.
pub fn log_state(state: &EventState, msg: &str) {
    if !state.done {
        return;
    }

    let date = state
        .date
        .map(|d| d.format("%y %b %d %H:%M:%S").to_string())
        .unwrap_or_else(|| "No date".to_string());

    match &state.error_msg {
        None => info!(
            "{}. {} ({} seconds) Loop: {}",
            msg,
            date,
            state.seconds,
            state.loop_id.unwrap_or(0)
        ),
        Some(err) => error!(
            "{}. {} '{}' Loop: {}",
            msg,
            date,
            err,
            state.loop_id.unwrap_or(0)
        ),
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
