// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use chrono::{DateTime, FixedOffset};
use cts_metadata::TestStatus;

/// The recorded outcome of a single scheduled test.
///
/// An outcome is created as [`TestStatus::NotExecuted`] when the test is scheduled, and moved to a
/// terminal status exactly once through [`finish`](Self::finish).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExecutionOutcome {
    status: TestStatus,
    start_time: DateTime<FixedOffset>,
    end_time: DateTime<FixedOffset>,
    message: Option<String>,
    stack_trace: Option<String>,
}

impl ExecutionOutcome {
    /// Creates a new, not-yet-executed outcome, scheduled at the given time.
    pub fn not_executed(scheduled_at: DateTime<FixedOffset>) -> Self {
        Self {
            status: TestStatus::NotExecuted,
            start_time: scheduled_at,
            end_time: scheduled_at,
            message: None,
            stack_trace: None,
        }
    }

    /// Returns the current status.
    pub fn status(&self) -> TestStatus {
        self.status
    }

    /// Returns the time at which the test started (or was scheduled, if it never started).
    pub fn start_time(&self) -> DateTime<FixedOffset> {
        self.start_time
    }

    /// Returns the time at which the test ended.
    pub fn end_time(&self) -> DateTime<FixedOffset> {
        self.end_time
    }

    /// Returns the failure message: the first line of the sanitized diagnostic text.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Returns the full sanitized diagnostic text.
    pub fn stack_trace(&self) -> Option<&str> {
        self.stack_trace.as_deref()
    }

    /// Records the time at which the test started.
    pub fn set_started(&mut self, start_time: DateTime<FixedOffset>) -> &mut Self {
        self.start_time = start_time;
        self.end_time = start_time;
        self
    }

    /// Records the time at which the test ended, without changing its status.
    pub fn set_end_time(&mut self, end_time: DateTime<FixedOffset>) -> &mut Self {
        self.end_time = end_time;
        self
    }

    /// Sets the diagnostic text for a failure.
    ///
    /// The text is sanitized first, and the message is derived from its first line.
    pub fn set_stack_trace(&mut self, stack_trace: &str) -> &mut Self {
        let stack_trace = sanitize_xml_text(stack_trace);
        // `lines` also drops the `\r` of a CRLF line ending.
        let message = stack_trace.lines().next().unwrap_or_default().to_owned();
        self.message = Some(message);
        self.stack_trace = Some(stack_trace);
        self
    }

    /// Moves this outcome to a terminal status.
    ///
    /// Returns false and leaves the outcome untouched if it is already terminal, or if `status` is
    /// not itself terminal.
    pub fn finish(&mut self, status: TestStatus, end_time: DateTime<FixedOffset>) -> bool {
        if self.status.is_terminal() || !status.is_terminal() {
            return false;
        }
        self.status = status;
        self.end_time = end_time;
        true
    }
}

/// Strips every character that may not appear in an XML 1.0 document.
///
/// Tab, newline and carriage return are preserved, as is everything in the `Char` production of the
/// XML specification: `#x20-#xD7FF`, `#xE000-#xFFFD` and `#x10000-#x10FFFF`.
pub fn sanitize_xml_text(text: &str) -> String {
    text.chars().filter(|&c| is_xml_char(c)).collect()
}

fn is_xml_char(c: char) -> bool {
    matches!(c,
        '\u{9}' | '\u{A}' | '\u{D}'
        | '\u{20}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FFFD}'
        | '\u{10000}'..='\u{10FFFF}'
    )
}
