// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Running dEQP test cases on a device.
//!
//! dEQP cases are selected by pushing a [trie-encoded](encode_case_trie) case list to the device,
//! then launching the dEQP instrumentation. Its output is decoded by a [`StatusDecoder`] into
//! test events.

mod status;
mod trie;

pub use status::*;
pub use trie::*;

use crate::{
    config::DeqpConfig,
    device::Device,
    errors::{DeqpRunError, DeviceError},
    package_def::PackageDefinition,
    reporter::{TestEvent, TestEventKind, TestEventSink},
};
use cts_metadata::TestIdentifier;
use indexmap::{IndexMap, IndexSet};
use std::time::Instant;
use tracing::{debug, info, warn};

/// The run metric holding the package name.
pub static PACKAGE_NAME_METRIC: &str = "packageName";

/// The run metric holding the package's content digest.
pub static PACKAGE_DIGEST_METRIC: &str = "packageDigest";

/// The run metric holding the package's ABI.
pub static PACKAGE_ABI_METRIC: &str = "packageAbi";

/// A single dEQP run: a set of test cases under one URI, such as `dEQP-GLES3`.
#[derive(Clone, Debug)]
pub struct DeqpTest {
    run_name: String,
    tests: IndexSet<TestIdentifier>,
    config: DeqpConfig,
    run_metrics: IndexMap<String, String>,
}

impl DeqpTest {
    /// Creates a new run of `tests` under the given URI, with the default device paths.
    pub fn new(run_name: impl Into<String>, tests: impl IntoIterator<Item = TestIdentifier>) -> Self {
        Self {
            run_name: run_name.into(),
            tests: tests.into_iter().collect(),
            config: DeqpConfig::default(),
            run_metrics: IndexMap::new(),
        }
    }

    /// Creates a new run of every test in a dEQP package.
    ///
    /// The run is named after the application package name (the dEQP URI), and carries the
    /// package's name, ABI and `digest` as run metrics.
    pub fn for_package(def: &PackageDefinition, digest: Option<&str>) -> Self {
        let run_name = def.app_package_name().unwrap_or(def.name());
        let mut test = Self::new(run_name, def.tests().map(|(id, _)| id.clone()));
        test.add_run_metric(PACKAGE_NAME_METRIC, def.name());
        test.add_run_metric(PACKAGE_ABI_METRIC, def.abi().name());
        if let Some(digest) = digest {
            test.add_run_metric(PACKAGE_DIGEST_METRIC, digest);
        }
        test
    }

    /// Sets the device paths and instrumentation component to use.
    pub fn with_config(mut self, config: DeqpConfig) -> Self {
        self.config = config;
        self
    }

    /// Adds a metric that is reported when the run ends.
    pub fn add_run_metric(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.run_metrics.insert(key.into(), value.into());
        self
    }

    /// Returns the run name.
    pub fn run_name(&self) -> &str {
        &self.run_name
    }

    /// Returns the tests in this run.
    pub fn tests(&self) -> impl ExactSizeIterator<Item = &TestIdentifier> + '_ {
        self.tests.iter()
    }

    /// Returns the contents of the case-list file: the encoded trie, wrapped in one brace pair.
    ///
    /// Tests without a class name have no case path and are left out.
    pub fn case_list(&self) -> String {
        let paths: Vec<String> = self
            .tests
            .iter()
            .filter(|test| {
                let has_class = !test.class_name().is_empty();
                if !has_class {
                    warn!("skipping dEQP test {test} without a class name");
                }
                has_class
            })
            .map(TestIdentifier::case_path)
            .collect();
        let trie = encode_case_trie(paths.iter().map(String::as_str));
        format!("{{{trie}}}\n")
    }

    /// Returns the shell command that launches the instrumentation.
    pub fn instrumentation_command(&self) -> String {
        format!(
            "am instrument -w -e deqpLogFileName \"{}\" -e deqpCmdLine \"--deqp-caselist-file={}\" {}",
            self.config.log_file(),
            self.config.case_list_file(),
            self.config.instrumentation(),
        )
    }

    /// Runs the tests on `device`, reporting events to `sink`.
    ///
    /// The run is always started and ended on `sink`, and tests that didn't complete are reported
    /// as not executed, even if an error is returned.
    pub fn run<S: TestEventSink>(
        &self,
        device: &mut dyn Device,
        mut sink: S,
    ) -> Result<(), DeqpRunError> {
        info!(
            "running {} dEQP tests for {} on {}",
            self.tests.len(),
            self.run_name,
            device.serial()
        );
        let start = Instant::now();
        sink.handle_event(TestEvent::now(TestEventKind::RunStarted {
            run_name: self.run_name.clone(),
            test_count: self.tests.len(),
        }));

        let mut decoder = StatusDecoder::new(&self.tests, &mut sink);
        let result = self.execute(device, &mut decoder);
        let mut metrics = decoder.finish();
        metrics.extend(
            self.run_metrics
                .iter()
                .map(|(key, value)| (key.clone(), value.clone())),
        );

        sink.handle_event(TestEvent::now(TestEventKind::RunEnded {
            elapsed: start.elapsed(),
            metrics,
        }));
        result
    }

    fn execute<S: TestEventSink>(
        &self,
        device: &mut dyn Device,
        decoder: &mut StatusDecoder<S>,
    ) -> Result<(), DeqpRunError> {
        self.prepare(device)
            .map_err(|error| DeqpRunError::Prepare {
                serial: device.serial().to_owned(),
                run_name: self.run_name.clone(),
                error,
            })?;

        let command = self.instrumentation_command();
        debug!("launching dEQP: {command}");
        device
            .execute_shell_command_streaming(&command, decoder)
            .map_err(|error| DeqpRunError::Instrumentation {
                serial: device.serial().to_owned(),
                run_name: self.run_name.clone(),
                error,
            })
    }

    fn prepare(&self, device: &mut dyn Device) -> Result<(), DeviceError> {
        device.execute_shell_command(&format!("rm {}", self.config.case_list_file()))?;
        device.execute_shell_command(&format!("rm {}", self.config.log_file()))?;
        device.push_string(&self.case_list(), self.config.case_list_file())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::ShellOutputReceiver;
    use pretty_assertions::assert_eq;
    use std::io;

    static CASE_LIST_FILE: &str = "/sdcard/dEQP-TestCaseList.txt";
    static LOG_FILE: &str = "/sdcard/TestLog.qpa";
    static INSTRUMENTATION_COMMAND: &str = "am instrument -w -e deqpLogFileName \"/sdcard/TestLog.qpa\" \
         -e deqpCmdLine \"--deqp-caselist-file=/sdcard/dEQP-TestCaseList.txt\" \
         com.drawelements.deqp/com.drawelements.deqp.testercore.DeqpInstrumentation";

    #[derive(Debug, Eq, PartialEq)]
    enum Call {
        Shell(String),
        Push { contents: String, remote_path: String },
        Stream(String),
    }

    #[derive(Debug, Default)]
    struct MockDevice {
        output: String,
        fail_push: bool,
        fail_stream_after: Option<usize>,
        calls: Vec<Call>,
    }

    impl Device for MockDevice {
        fn serial(&self) -> &str {
            "emulator-5554"
        }

        fn execute_shell_command(&mut self, command: &str) -> Result<String, DeviceError> {
            self.calls.push(Call::Shell(command.to_owned()));
            Ok(String::new())
        }

        fn execute_shell_command_streaming(
            &mut self,
            command: &str,
            receiver: &mut dyn ShellOutputReceiver,
        ) -> Result<(), DeviceError> {
            self.calls.push(Call::Stream(command.to_owned()));
            let bytes = self.output.as_bytes();
            match self.fail_stream_after {
                Some(len) => {
                    receiver.add_output(&bytes[..len]);
                    Err(DeviceError::CommandFailed {
                        command: command.to_owned(),
                        error: io::Error::new(io::ErrorKind::ConnectionReset, "device went away"),
                    })
                }
                None => {
                    for chunk in bytes.chunks(100) {
                        receiver.add_output(chunk);
                    }
                    receiver.flush();
                    Ok(())
                }
            }
        }

        fn push_string(&mut self, contents: &str, remote_path: &str) -> Result<(), DeviceError> {
            self.calls.push(Call::Push {
                contents: contents.to_owned(),
                remote_path: remote_path.to_owned(),
            });
            if self.fail_push {
                return Err(DeviceError::PushFailed {
                    remote_path: remote_path.to_owned(),
                    error: io::Error::other("read-only file system"),
                });
            }
            Ok(())
        }
    }

    fn info_tests(names: &[&str]) -> Vec<TestIdentifier> {
        names
            .iter()
            .map(|name| TestIdentifier::new("dEQP-GLES3.info", *name))
            .collect()
    }

    fn expected_calls(case_list: &str) -> Vec<Call> {
        vec![
            Call::Shell(format!("rm {CASE_LIST_FILE}")),
            Call::Shell(format!("rm {LOG_FILE}")),
            Call::Push {
                contents: case_list.to_owned(),
                remote_path: CASE_LIST_FILE.to_owned(),
            },
            Call::Stream(INSTRUMENTATION_COMMAND.to_owned()),
        ]
    }

    /// Returns the event kinds, with the run-ended event's elapsed time zeroed out.
    fn kinds(events: Vec<TestEvent>) -> Vec<TestEventKind> {
        events
            .into_iter()
            .map(|event| match event.kind {
                TestEventKind::RunEnded { metrics, .. } => TestEventKind::RunEnded {
                    elapsed: Default::default(),
                    metrics,
                },
                other => other,
            })
            .collect()
    }

    #[test]
    fn case_list_skips_tests_without_class_name() {
        let deqp = DeqpTest::new(
            "dEQP-GLES3",
            [
                TestIdentifier::new("", "orphan"),
                TestIdentifier::new("dEQP-GLES3.info", "version"),
            ],
        );
        assert_eq!(deqp.case_list(), "{dEQP-GLES3{info{version}}}\n");
    }

    #[test]
    fn single_failing_test() {
        let tests = info_tests(&["version"]);
        let deqp = DeqpTest::new("dEQP-GLES3", tests.clone());
        let mut device = MockDevice {
            output: status::tests::session(&[("dEQP-GLES3.info.version", "Fail", "DetailFail")]),
            ..Default::default()
        };
        let mut events = Vec::new();
        deqp.run(&mut device, &mut events).unwrap();

        assert_eq!(device.calls, expected_calls("{dEQP-GLES3{info{version}}}\n"));

        let events = kinds(events);
        assert_eq!(
            events[..4],
            [
                TestEventKind::RunStarted {
                    run_name: "dEQP-GLES3".to_owned(),
                    test_count: 1
                },
                TestEventKind::TestStarted {
                    test: tests[0].clone()
                },
                TestEventKind::TestFailed {
                    test: tests[0].clone(),
                    failure: crate::reporter::FailureKind::Error,
                    trace: "Fail:DetailFail".to_owned(),
                },
                TestEventKind::TestEnded {
                    test: tests[0].clone(),
                    metrics: IndexMap::new()
                },
            ]
        );
        let TestEventKind::RunEnded { metrics, .. } = &events[4] else {
            panic!("expected run ended, found {:?}", events[4]);
        };
        assert_eq!(metrics.get("releaseName").map(String::as_str), Some("2014.x"));
        assert_eq!(events.len(), 5);
    }

    #[test]
    fn multiple_passing_tests() {
        let names = [
            "vendor",
            "renderer",
            "version",
            "shading_language_version",
            "extensions",
            "render_target",
        ];
        let tests = info_tests(&names);
        let cases: Vec<(String, &str, &str)> = tests
            .iter()
            .map(|test| (test.case_path(), "Pass", "Pass"))
            .collect();
        let cases: Vec<(&str, &str, &str)> = cases
            .iter()
            .map(|(path, code, details)| (path.as_str(), *code, *details))
            .collect();

        let deqp = DeqpTest::new("dEQP-GLES3", tests.clone());
        let mut device = MockDevice {
            output: status::tests::session(&cases),
            ..Default::default()
        };
        let mut events = Vec::new();
        deqp.run(&mut device, &mut events).unwrap();

        assert_eq!(
            device.calls,
            expected_calls(
                "{dEQP-GLES3{info{vendor,renderer,version,shading_language_version,extensions,render_target}}}\n"
            )
        );

        let events = kinds(events);
        assert_eq!(events.len(), 2 + 2 * names.len());
        for (i, test) in tests.iter().enumerate() {
            assert_eq!(
                events[1 + 2 * i],
                TestEventKind::TestStarted { test: test.clone() }
            );
            assert!(
                matches!(&events[2 + 2 * i], TestEventKind::TestEnded { test: ended, .. } if ended == test)
            );
        }
    }

    #[test]
    fn device_failure_mid_stream() {
        let tests = info_tests(&["vendor", "renderer"]);
        let output = status::tests::session(&[
            ("dEQP-GLES3.info.vendor", "Pass", "Pass"),
            ("dEQP-GLES3.info.renderer", "Pass", "Pass"),
        ]);
        // Cut the stream off right after the second test case begins.
        let cutoff = output
            .match_indices("INSTRUMENTATION_STATUS: dEQP-TestCaseResult-Code")
            .nth(1)
            .map(|(index, _)| index)
            .unwrap();

        let mut deqp = DeqpTest::new("dEQP-GLES3", tests.clone());
        deqp.add_run_metric(PACKAGE_NAME_METRIC, "CtsDeqpTestCases");
        let mut device = MockDevice {
            output,
            fail_stream_after: Some(cutoff),
            ..Default::default()
        };
        let mut events = Vec::new();
        let error = deqp.run(&mut device, &mut events).unwrap_err();
        assert!(
            matches!(error, DeqpRunError::Instrumentation { ref serial, .. } if serial == "emulator-5554"),
            "unexpected error: {error:?}"
        );

        let events = kinds(events);
        assert_eq!(
            events[3..5],
            [
                TestEventKind::TestStarted {
                    test: tests[1].clone()
                },
                TestEventKind::TestNotExecuted {
                    test: tests[1].clone()
                },
            ]
        );
        let TestEventKind::RunEnded { metrics, .. } = &events[5] else {
            panic!("expected run ended, found {:?}", events[5]);
        };
        assert_eq!(
            metrics.get(PACKAGE_NAME_METRIC).map(String::as_str),
            Some("CtsDeqpTestCases")
        );
    }

    #[test]
    fn prepare_failure_reports_all_not_executed() {
        let tests = info_tests(&["vendor", "renderer"]);
        let deqp = DeqpTest::new("dEQP-GLES3", tests.clone());
        let mut device = MockDevice {
            fail_push: true,
            ..Default::default()
        };
        let mut events = Vec::new();
        let error = deqp.run(&mut device, &mut events).unwrap_err();
        assert!(
            matches!(error, DeqpRunError::Prepare { .. }),
            "unexpected error: {error:?}"
        );
        assert_eq!(device.calls.len(), 3, "instrumentation is never launched");

        let events = kinds(events);
        assert_eq!(
            events[1..3],
            [
                TestEventKind::TestNotExecuted {
                    test: tests[0].clone()
                },
                TestEventKind::TestNotExecuted {
                    test: tests[1].clone()
                },
            ]
        );
        assert!(matches!(events[3], TestEventKind::RunEnded { .. }));
    }
}
