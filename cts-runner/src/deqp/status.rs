// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Decoding of the dEQP instrumentation status stream.
//!
//! The executor reports progress as CRLF-terminated lines:
//!
//! ```text
//! INSTRUMENTATION_STATUS: dEQP-EventType=BeginTestCase
//! INSTRUMENTATION_STATUS: dEQP-BeginTestCase-TestCasePath=dEQP-GLES3.info.version
//! INSTRUMENTATION_STATUS_CODE: 0
//! ...
//! INSTRUMENTATION_CODE: 0
//! ```
//!
//! `INSTRUMENTATION_STATUS` lines accumulate key/value pairs into a record, and
//! `INSTRUMENTATION_STATUS_CODE` terminates the record. Each record's `dEQP-EventType` drives the
//! session state machine. A line with no recognized prefix continues the previous value.

use crate::{
    device::ShellOutputReceiver,
    reporter::{FailureKind, TestEvent, TestEventKind, TestEventSink},
};
use bstr::ByteSlice;
use cts_metadata::TestIdentifier;
use indexmap::{IndexMap, IndexSet};
use tracing::{debug, warn};

static STATUS_PREFIX: &str = "INSTRUMENTATION_STATUS: ";
static STATUS_CODE_PREFIX: &str = "INSTRUMENTATION_STATUS_CODE: ";
static RESULT_PREFIX: &str = "INSTRUMENTATION_RESULT: ";
static CODE_PREFIX: &str = "INSTRUMENTATION_CODE: ";

static EVENT_TYPE_KEY: &str = "dEQP-EventType";
static SESSION_INFO_NAME_KEY: &str = "dEQP-SessionInfo-Name";
static SESSION_INFO_VALUE_KEY: &str = "dEQP-SessionInfo-Value";
static TEST_CASE_PATH_KEY: &str = "dEQP-BeginTestCase-TestCasePath";
static RESULT_FIELD_PREFIX: &str = "dEQP-TestCaseResult-";
static RESULT_CODE_KEY: &str = "dEQP-TestCaseResult-Code";
static RESULT_DETAILS_KEY: &str = "dEQP-TestCaseResult-Details";
static TERMINATE_REASON_KEY: &str = "dEQP-TerminateTestCase-Reason";
static SHORT_MSG_KEY: &str = "shortMsg";

/// Result codes that count as a pass.
pub static SUCCESS_CODES: &[&str] = &[
    "Pass",
    "NotSupported",
    "QualityWarning",
    "CompatibilityWarning",
];

/// Returns true if a dEQP result code counts as a pass.
///
/// Every other code, including codes this harness doesn't know about, is a failure.
pub fn is_success_code(code: &str) -> bool {
    SUCCESS_CODES.contains(&code)
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum SessionState {
    Idle,
    SessionOpen,
    SessionClosed,
}

#[derive(Debug)]
struct OpenTestCase {
    test: TestIdentifier,
    has_result: bool,
    // Reported only once the case ends, so a truncated case stays not executed.
    failure: Option<String>,
    metrics: IndexMap<String, String>,
}

#[derive(Debug)]
enum LastValue {
    Status(String),
    Result(String),
}

/// Decodes the dEQP instrumentation stream into [`TestEvent`]s.
///
/// The decoder is created with the list of requested tests. Case paths that were not requested are
/// ignored. Once output ends, [`finish`](Self::finish) must be called: every requested test that
/// didn't complete is reported as not executed.
///
/// Only test-level events and [`TestEventKind::RunFailed`] are emitted; the caller is responsible
/// for starting and ending the run.
#[derive(Debug)]
pub struct StatusDecoder<S> {
    sink: S,
    pending: IndexSet<TestIdentifier>,
    state: SessionState,
    open_case: Option<OpenTestCase>,
    buffer: Vec<u8>,
    record: IndexMap<String, String>,
    last_value: Option<LastValue>,
    session_info: IndexMap<String, String>,
    instrumentation_result: IndexMap<String, String>,
    instrumentation_code: Option<i32>,
}

impl<S: TestEventSink> StatusDecoder<S> {
    /// Creates a new decoder for the given requested tests.
    pub fn new<'a>(tests: impl IntoIterator<Item = &'a TestIdentifier>, sink: S) -> Self {
        Self {
            sink,
            pending: tests.into_iter().cloned().collect(),
            state: SessionState::Idle,
            open_case: None,
            buffer: Vec::new(),
            record: IndexMap::new(),
            last_value: None,
            session_info: IndexMap::new(),
            instrumentation_result: IndexMap::new(),
            instrumentation_code: None,
        }
    }

    /// Returns the session info pairs reported so far, such as `releaseName`.
    pub fn session_info(&self) -> &IndexMap<String, String> {
        &self.session_info
    }

    /// Returns the `INSTRUMENTATION_RESULT` fields reported so far.
    pub fn instrumentation_result(&self) -> &IndexMap<String, String> {
        &self.instrumentation_result
    }

    /// Returns the instrumentation exit code, if it was reported.
    pub fn instrumentation_code(&self) -> Option<i32> {
        self.instrumentation_code
    }

    /// Returns true once the session has been ended by the executor.
    pub fn is_session_complete(&self) -> bool {
        self.state == SessionState::SessionClosed
    }

    /// Decodes a complete block of output.
    pub fn process_output(&mut self, output: &str) {
        self.add_output(output.as_bytes());
        self.flush();
    }

    /// Ends decoding, reporting every requested test that didn't complete as not executed.
    ///
    /// Returns the session info pairs, to be used as run metrics.
    pub fn finish(mut self) -> IndexMap<String, String> {
        self.flush();
        if let Some(open) = self.open_case.take() {
            warn!("test {} was still running when output ended", open.test);
        }
        if self.state != SessionState::SessionClosed {
            debug!("dEQP session did not end cleanly");
        }
        for test in std::mem::take(&mut self.pending) {
            self.emit(TestEventKind::TestNotExecuted { test });
        }
        self.session_info
    }

    fn emit(&mut self, kind: TestEventKind) {
        self.sink.handle_event(TestEvent::now(kind));
    }

    fn process_line(&mut self, line: &str) {
        if let Some(pair) = line.strip_prefix(STATUS_PREFIX) {
            let (key, value) = split_pair(pair);
            self.last_value = Some(LastValue::Status(key.to_owned()));
            self.record.insert(key.to_owned(), value.to_owned());
        } else if line.starts_with(STATUS_CODE_PREFIX) {
            self.last_value = None;
            let record = std::mem::take(&mut self.record);
            self.process_record(record);
        } else if let Some(pair) = line.strip_prefix(RESULT_PREFIX) {
            let (key, value) = split_pair(pair);
            self.last_value = Some(LastValue::Result(key.to_owned()));
            self.instrumentation_result
                .insert(key.to_owned(), value.to_owned());
        } else if let Some(code) = line.strip_prefix(CODE_PREFIX) {
            self.last_value = None;
            self.process_instrumentation_code(code.trim());
        } else {
            let target = match &self.last_value {
                Some(LastValue::Status(key)) => self.record.get_mut(key),
                Some(LastValue::Result(key)) => self.instrumentation_result.get_mut(key),
                None => None,
            };
            match target {
                Some(value) => {
                    value.push('\n');
                    value.push_str(line);
                }
                None if line.is_empty() => {}
                None => debug!("ignoring unexpected instrumentation output: {line}"),
            }
        }
    }

    fn process_record(&mut self, mut record: IndexMap<String, String>) {
        let Some(event_type) = record.shift_remove(EVENT_TYPE_KEY) else {
            debug!("ignoring status record without an event type");
            return;
        };
        match event_type.as_str() {
            "SessionInfo" => self.handle_session_info(&record),
            "BeginSession" => self.state = SessionState::SessionOpen,
            "BeginTestCase" => self.handle_begin_test_case(&record),
            "TestCaseResult" => self.handle_test_case_result(record),
            "EndTestCase" => self.handle_end_test_case(),
            "TerminateTestCase" => self.handle_terminate_test_case(&record),
            "EndSession" => self.state = SessionState::SessionClosed,
            other => debug!("ignoring unknown dEQP event type `{other}`"),
        }
    }

    fn handle_session_info(&mut self, record: &IndexMap<String, String>) {
        match (
            record.get(SESSION_INFO_NAME_KEY),
            record.get(SESSION_INFO_VALUE_KEY),
        ) {
            (Some(name), Some(value)) => {
                self.session_info.insert(name.clone(), value.clone());
            }
            _ => debug!("ignoring incomplete session info record"),
        }
    }

    fn handle_begin_test_case(&mut self, record: &IndexMap<String, String>) {
        if self.state == SessionState::Idle {
            debug!("test case started before the session began");
        }
        if let Some(open) = self.open_case.take() {
            warn!(
                "test {} was still running when the next test case began",
                open.test
            );
        }
        let Some(path) = record.get(TEST_CASE_PATH_KEY) else {
            debug!("ignoring BeginTestCase record without a case path");
            return;
        };
        let test = match TestIdentifier::from_case_path(path) {
            Ok(test) if self.pending.contains(&test) => test,
            _ => {
                debug!("ignoring unrequested test case `{path}`");
                return;
            }
        };
        self.emit(TestEventKind::TestStarted { test: test.clone() });
        self.open_case = Some(OpenTestCase {
            test,
            has_result: false,
            failure: None,
            metrics: IndexMap::new(),
        });
    }

    fn handle_test_case_result(&mut self, record: IndexMap<String, String>) {
        let Some(mut open) = self.open_case.take() else {
            debug!("ignoring TestCaseResult outside of a requested test case");
            return;
        };

        let code = record.get(RESULT_CODE_KEY).map_or("", String::as_str);
        let details = record.get(RESULT_DETAILS_KEY).map_or("", String::as_str);
        open.failure = (!is_success_code(code)).then(|| format!("{code}:{details}"));

        for (key, value) in &record {
            if key == RESULT_CODE_KEY || key == RESULT_DETAILS_KEY {
                continue;
            }
            if let Some(name) = key.strip_prefix(RESULT_FIELD_PREFIX) {
                if value.trim().parse::<f64>().is_ok() {
                    open.metrics.insert(name.to_owned(), value.trim().to_owned());
                }
            }
        }
        open.has_result = true;
        self.open_case = Some(open);
    }

    fn handle_end_test_case(&mut self) {
        let Some(open) = self.open_case.take() else {
            return;
        };
        let trace = match open.failure {
            Some(trace) => Some(trace),
            None if !open.has_result => {
                Some("Incomplete:Test case ended without a result".to_owned())
            }
            None => None,
        };
        if let Some(trace) = trace {
            self.emit(TestEventKind::TestFailed {
                test: open.test.clone(),
                failure: FailureKind::Error,
                trace,
            });
        }
        self.pending.shift_remove(&open.test);
        self.emit(TestEventKind::TestEnded {
            test: open.test,
            metrics: open.metrics,
        });
    }

    fn handle_terminate_test_case(&mut self, record: &IndexMap<String, String>) {
        let Some(open) = self.open_case.take() else {
            return;
        };
        let reason = record.get(TERMINATE_REASON_KEY).map_or("", String::as_str);
        self.emit(TestEventKind::TestFailed {
            test: open.test.clone(),
            failure: FailureKind::Error,
            trace: format!("Terminated:{reason}"),
        });
        self.pending.shift_remove(&open.test);
        self.emit(TestEventKind::TestEnded {
            test: open.test,
            metrics: open.metrics,
        });
    }

    fn process_instrumentation_code(&mut self, code: &str) {
        match code.parse::<i32>() {
            Ok(code) => self.instrumentation_code = Some(code),
            Err(_) => debug!("ignoring invalid instrumentation code `{code}`"),
        }
        if let Some(message) = self.instrumentation_result.get(SHORT_MSG_KEY) {
            let message = message.clone();
            warn!("instrumentation failed: {message}");
            self.emit(TestEventKind::RunFailed { message });
        }
    }
}

impl<S: TestEventSink> ShellOutputReceiver for StatusDecoder<S> {
    fn add_output(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
        let mut consumed = 0;
        while let Some(newline) = self.buffer[consumed..].find_byte(b'\n') {
            let end = consumed + newline;
            let line = self.buffer[consumed..end].to_vec();
            consumed = end + 1;
            let line = line.strip_suffix(b"\r").unwrap_or(&line);
            self.process_line(&line.to_str_lossy());
        }
        self.buffer.drain(..consumed);
    }

    fn flush(&mut self) {
        if !self.buffer.is_empty() {
            let line = std::mem::take(&mut self.buffer);
            let line = line.strip_suffix(b"\r").unwrap_or(&line);
            self.process_line(&line.to_str_lossy());
        }
    }
}

fn split_pair(pair: &str) -> (&str, &str) {
    pair.split_once('=').unwrap_or((pair, ""))
}
