// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Events for the test harness.
//!
//! These types are emitted by test adapters such as [`DeqpTest`](crate::deqp::DeqpTest), and
//! consumed by any [`TestEventSink`].

use chrono::{DateTime, FixedOffset, Local};
use cts_metadata::{TestIdentifier, TestStatus};
use indexmap::IndexMap;
use std::time::Duration;

/// A test event.
///
/// Events are produced by a test adapter and consumed by a [`TestEventSink`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TestEvent {
    /// The time at which the event was generated, including the offset from UTC.
    pub timestamp: DateTime<FixedOffset>,

    /// The kind of test event this is.
    pub kind: TestEventKind,
}

impl TestEvent {
    /// Creates a new event, timestamped with the current local time.
    pub fn now(kind: TestEventKind) -> Self {
        Self {
            timestamp: Local::now().fixed_offset(),
            kind,
        }
    }
}

/// The kind of test event this is.
///
/// Forms part of [`TestEvent`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TestEventKind {
    /// A test run started.
    RunStarted {
        /// The name of the run: the package's application package name, or the dEQP URI.
        run_name: String,

        /// The number of tests that are expected to run.
        test_count: usize,
    },

    /// A test started running.
    TestStarted {
        /// The test that started.
        test: TestIdentifier,
    },

    /// A test failed.
    ///
    /// Always followed by [`TestEnded`](Self::TestEnded) for the same test.
    TestFailed {
        /// The test that failed.
        test: TestIdentifier,

        /// Whether this was a failure or an error.
        failure: FailureKind,

        /// The diagnostic text. The first line is used as the failure message.
        trace: String,
    },

    /// A test finished running.
    TestEnded {
        /// The test that finished.
        test: TestIdentifier,

        /// Metrics reported by the test.
        metrics: IndexMap<String, String>,
    },

    /// A test was scheduled, but the run ended before it completed.
    TestNotExecuted {
        /// The test that was not executed.
        test: TestIdentifier,
    },

    /// The run failed as a whole, for example because the instrumentation crashed.
    RunFailed {
        /// A description of the failure.
        message: String,
    },

    /// A test run ended.
    RunEnded {
        /// The amount of time the run took.
        elapsed: Duration,

        /// Metrics reported for the run as a whole.
        metrics: IndexMap<String, String>,
    },
}

/// The kind of failure recorded by [`TestEventKind::TestFailed`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum FailureKind {
    /// An expected failure mode, such as a failed assertion.
    Failure,

    /// An unexpected failure mode, such as a crash or a bad result code.
    Error,
}

impl FailureKind {
    /// Returns the terminal status a test with this failure ends in.
    pub fn status(self) -> TestStatus {
        match self {
            Self::Failure => TestStatus::Fail,
            Self::Error => TestStatus::Error,
        }
    }
}

/// Consumes test events.
pub trait TestEventSink {
    /// Handles a single event.
    fn handle_event(&mut self, event: TestEvent);
}

impl<T: TestEventSink + ?Sized> TestEventSink for &mut T {
    fn handle_event(&mut self, event: TestEvent) {
        (**self).handle_event(event)
    }
}

impl TestEventSink for Vec<TestEvent> {
    fn handle_event(&mut self, event: TestEvent) {
        self.push(event);
    }
}
