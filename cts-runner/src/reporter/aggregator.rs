// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Accumulates test events into per-run results.

use super::events::{TestEvent, TestEventKind, TestEventSink};
use chrono::{DateTime, FixedOffset};
use cts_metadata::{TestIdentifier, TestStatus};
use cts_result_xml::{ExecutionOutcome, Summary};
use indexmap::IndexMap;
use std::time::Duration;
use tracing::{debug, info, warn};

/// The results of every run in an invocation, in the order runs started.
///
/// `RunResults` is a [`TestEventSink`]: pass it (or a mutable reference to it) to a test adapter to
/// collect that adapter's results.
#[derive(Clone, Debug, Default)]
pub struct RunResults {
    runs: Vec<TestRunResult>,
}

impl RunResults {
    /// Creates a new, empty set of results.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every run, in start order.
    pub fn runs(&self) -> &[TestRunResult] {
        &self.runs
    }

    /// Returns the first run with the given name.
    pub fn find_run(&self, name: &str) -> Option<&TestRunResult> {
        self.runs.iter().find(|run| run.name == name)
    }

    /// Returns counts across every run.
    pub fn summary(&self) -> Summary {
        let mut summary = Summary::default();
        for run in &self.runs {
            summary.add(&run.summary());
        }
        summary
    }

    fn current_run(&mut self) -> Option<&mut TestRunResult> {
        self.runs.last_mut().filter(|run| !run.complete)
    }

    fn start_run(&mut self, run_name: String, test_count: usize) {
        // Results for a run that is restarted before it ends are merged.
        if let Some(run) = self.current_run().filter(|run| run.name == run_name) {
            debug!("run {run_name} restarted, merging results");
            run.expected_count += test_count;
            return;
        }
        self.runs.push(TestRunResult::new(run_name, test_count));
    }
}

impl TestEventSink for RunResults {
    fn handle_event(&mut self, event: TestEvent) {
        let TestEvent { timestamp, kind } = event;
        if let TestEventKind::RunStarted {
            run_name,
            test_count,
        } = kind
        {
            self.start_run(run_name, test_count);
            return;
        }

        let Some(run) = self.current_run() else {
            warn!("ignoring event outside of a test run: {kind:?}");
            return;
        };
        run.handle_event_kind(kind, timestamp);
    }
}

/// The results of a single run: one package on one ABI.
#[derive(Clone, Debug)]
pub struct TestRunResult {
    name: String,
    expected_count: usize,
    results: IndexMap<TestIdentifier, ExecutionOutcome>,
    run_metrics: IndexMap<String, String>,
    run_failure: Option<String>,
    elapsed: Duration,
    complete: bool,
}

impl TestRunResult {
    fn new(name: String, expected_count: usize) -> Self {
        Self {
            name,
            expected_count,
            results: IndexMap::new(),
            run_metrics: IndexMap::new(),
            run_failure: None,
            elapsed: Duration::ZERO,
            complete: false,
        }
    }

    /// Returns the run name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of tests the run announced.
    pub fn expected_count(&self) -> usize {
        self.expected_count
    }

    /// Returns the recorded outcomes, in the order tests were first reported.
    pub fn results(&self) -> impl ExactSizeIterator<Item = (&TestIdentifier, &ExecutionOutcome)> {
        self.results.iter()
    }

    /// Returns the outcome of one test.
    pub fn get(&self, test: &TestIdentifier) -> Option<&ExecutionOutcome> {
        self.results.get(test)
    }

    /// Returns the metrics reported when the run ended.
    pub fn run_metrics(&self) -> &IndexMap<String, String> {
        &self.run_metrics
    }

    /// Returns a single run metric.
    pub fn metric(&self, key: &str) -> Option<&str> {
        self.run_metrics.get(key).map(String::as_str)
    }

    /// Returns the reason the run failed as a whole, if it did.
    pub fn run_failure(&self) -> Option<&str> {
        self.run_failure.as_deref()
    }

    /// Returns the total time the run took.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Returns true once the run has ended.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Returns counts for this run.
    pub fn summary(&self) -> Summary {
        let mut summary = Summary::default();
        for outcome in self.results.values() {
            match outcome.status() {
                TestStatus::Pass => summary.pass += 1,
                TestStatus::Fail => summary.fail += 1,
                TestStatus::Error => summary.error += 1,
                TestStatus::NotExecuted => summary.not_executed += 1,
            }
        }
        summary
    }

    fn outcome_mut(
        &mut self,
        test: TestIdentifier,
        timestamp: DateTime<FixedOffset>,
    ) -> &mut ExecutionOutcome {
        self.results
            .entry(test)
            .or_insert_with(|| ExecutionOutcome::not_executed(timestamp))
    }

    fn handle_event_kind(&mut self, kind: TestEventKind, timestamp: DateTime<FixedOffset>) {
        match kind {
            TestEventKind::RunStarted { .. } => {}
            TestEventKind::TestStarted { test } => {
                let outcome = self.outcome_mut(test, timestamp);
                if outcome.status().is_terminal() {
                    // A rerun replaces the earlier result.
                    *outcome = ExecutionOutcome::not_executed(timestamp);
                }
                outcome.set_started(timestamp);
            }
            TestEventKind::TestFailed {
                test,
                failure,
                trace,
            } => {
                info!("test {test}: {}\n{trace}", failure.status());
                let outcome = self.outcome_mut(test, timestamp);
                outcome.set_stack_trace(&trace);
                outcome.finish(failure.status(), timestamp);
            }
            TestEventKind::TestEnded { test, metrics: _ } => {
                let description = test.to_string();
                let outcome = self.outcome_mut(test, timestamp);
                if !outcome.finish(TestStatus::Pass, timestamp) {
                    outcome.set_end_time(timestamp);
                }
                info!("{description} {}", outcome.status());
            }
            TestEventKind::TestNotExecuted { test } => {
                debug!("test {test} was not executed");
                self.outcome_mut(test, timestamp);
            }
            TestEventKind::RunFailed { message } => {
                warn!("run {} failed: {message}", self.name);
                self.run_failure = Some(message);
            }
            TestEventKind::RunEnded { elapsed, metrics } => {
                self.elapsed += elapsed;
                self.run_metrics.extend(metrics);
                self.complete = true;
                let summary = self.summary();
                info!(
                    "{} complete: Passed {}, Failed {}, Not Executed {}",
                    self.name,
                    summary.pass,
                    summary.failed(),
                    summary.not_executed,
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::FailureKind;
    use chrono::TimeZone;
    use maplit::hashmap;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn at(secs: i64) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(3600)
            .unwrap()
            .timestamp_opt(1_400_000_000 + secs, 0)
            .unwrap()
    }

    fn event(secs: i64, kind: TestEventKind) -> TestEvent {
        TestEvent {
            timestamp: at(secs),
            kind,
        }
    }

    fn test(method: &str) -> TestIdentifier {
        TestIdentifier::new("android.app.cts.ActivityTest", method)
    }

    fn run_started(name: &str, test_count: usize) -> TestEventKind {
        TestEventKind::RunStarted {
            run_name: name.to_owned(),
            test_count,
        }
    }

    fn run_ended(metrics: IndexMap<String, String>) -> TestEventKind {
        TestEventKind::RunEnded {
            elapsed: Duration::from_secs(3),
            metrics,
        }
    }

    #[test]
    fn collects_outcomes() {
        let mut results = RunResults::new();
        let events = [
            event(0, run_started("android.app", 4)),
            event(1, TestEventKind::TestStarted { test: test("testPass") }),
            event(2, TestEventKind::TestEnded {
                test: test("testPass"),
                metrics: IndexMap::new(),
            }),
            event(3, TestEventKind::TestStarted { test: test("testFail") }),
            event(4, TestEventKind::TestFailed {
                test: test("testFail"),
                failure: FailureKind::Failure,
                trace: "junit.framework.AssertionFailedError: boom\n\tat Foo".to_owned(),
            }),
            event(5, TestEventKind::TestEnded {
                test: test("testFail"),
                metrics: IndexMap::new(),
            }),
            event(6, TestEventKind::TestStarted { test: test("testError") }),
            event(7, TestEventKind::TestFailed {
                test: test("testError"),
                failure: FailureKind::Error,
                trace: "Crash:".to_owned(),
            }),
            event(8, TestEventKind::TestEnded {
                test: test("testError"),
                metrics: IndexMap::new(),
            }),
            event(9, TestEventKind::TestNotExecuted { test: test("testSkipped") }),
            event(10, run_ended([("packageName".to_owned(), "CtsAppTestCases".to_owned())].into())),
        ];
        for event in events {
            results.handle_event(event);
        }

        assert_eq!(results.runs().len(), 1);
        let run = results.find_run("android.app").unwrap();
        assert!(run.is_complete());
        assert_eq!(run.expected_count(), 4);
        assert_eq!(run.metric("packageName"), Some("CtsAppTestCases"));
        assert_eq!(run.elapsed(), Duration::from_secs(3));

        let statuses: HashMap<String, TestStatus> = run
            .results()
            .map(|(id, outcome)| (id.method_name().to_owned(), outcome.status()))
            .collect();
        assert_eq!(
            statuses,
            hashmap! {
                "testPass".to_owned() => TestStatus::Pass,
                "testFail".to_owned() => TestStatus::Fail,
                "testError".to_owned() => TestStatus::Error,
                "testSkipped".to_owned() => TestStatus::NotExecuted,
            }
        );

        let failed = run.get(&test("testFail")).unwrap();
        assert_eq!(failed.message(), Some("junit.framework.AssertionFailedError: boom"));
        assert_eq!(failed.start_time(), at(3));
        assert_eq!(failed.end_time(), at(5));

        let summary = results.summary();
        assert_eq!(
            (summary.pass, summary.fail, summary.error, summary.not_executed),
            (1, 1, 1, 1)
        );
        assert_eq!(summary.failed(), 2);
    }

    #[test]
    fn run_boundaries() {
        let mut results = RunResults::new();
        results.handle_event(event(0, TestEventKind::TestStarted { test: test("orphan") }));
        assert!(results.runs().is_empty());

        results.handle_event(event(1, run_started("dEQP-GLES3", 1)));
        results.handle_event(event(2, run_started("dEQP-GLES3", 2)));
        results.handle_event(event(3, TestEventKind::RunFailed {
            message: "Process crashed.".to_owned(),
        }));
        results.handle_event(event(4, run_ended(IndexMap::new())));
        assert_eq!(results.runs().len(), 1);
        assert_eq!(results.runs()[0].expected_count(), 3);
        assert_eq!(results.runs()[0].run_failure(), Some("Process crashed."));

        // A run with the same name after the first ended is a separate run.
        results.handle_event(event(5, run_started("dEQP-GLES3", 1)));
        assert_eq!(results.runs().len(), 2);
        assert!(!results.runs()[1].is_complete());
    }

    #[test]
    fn rerun_replaces_result() {
        let mut results = RunResults::new();
        results.handle_event(event(0, run_started("android.app", 1)));
        results.handle_event(event(1, TestEventKind::TestFailed {
            test: test("testFlaky"),
            failure: FailureKind::Failure,
            trace: "first".to_owned(),
        }));
        results.handle_event(event(2, TestEventKind::TestStarted { test: test("testFlaky") }));
        results.handle_event(event(3, TestEventKind::TestEnded {
            test: test("testFlaky"),
            metrics: IndexMap::new(),
        }));

        let outcome = results.runs()[0].get(&test("testFlaky")).unwrap();
        assert_eq!(outcome.status(), TestStatus::Pass);
        assert_eq!(outcome.message(), None);
        assert_eq!(outcome.start_time(), at(2));
    }
}
