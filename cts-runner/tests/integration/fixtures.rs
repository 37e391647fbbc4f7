// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino::Utf8Path;
use camino_tempfile::Utf8TempDir;
use cts_runner::{
    device::{Device, ShellOutputReceiver},
    errors::DeviceError,
};
use indoc::indoc;
use std::{collections::HashMap, fmt::Write};

pub(crate) static DEQP_SUITE: &str = indoc! {r#"
    <?xml version="1.0" encoding="UTF-8"?>
    <TestPackage name="CtsDeqpTestCases" appPackageName="dEQP-GLES3" testType="deqpTest">
        <TestSuite name="dEQP-GLES3">
            <TestCase name="info">
                <Test name="vendor" />
                <Test name="renderer" />
                <Test name="version" />
                <Test name="extensions" expectation="failure" />
            </TestCase>
        </TestSuite>
    </TestPackage>
"#};

pub(crate) static APP_SUITE: &str = indoc! {r#"
    <?xml version="1.0" encoding="UTF-8"?>
    <TestPackage name="CtsAppTestCases" appPackageName="android.app"
                 runner="android.test.InstrumentationTestRunner">
        <TestSuite name="android"><TestSuite name="app"><TestSuite name="cts">
            <TestCase name="ActivityTest">
                <Test name="testLaunch" abis="armeabi-v7a" />
            </TestCase>
        </TestSuite></TestSuite></TestSuite>
    </TestPackage>
"#};

/// A harness root on disk, with a testcases directory and presentation resources.
pub(crate) struct HarnessRoot {
    dir: Utf8TempDir,
}

impl HarnessRoot {
    pub(crate) fn new() -> Self {
        let dir = Utf8TempDir::new().expect("created temp dir");
        let testcases = dir.path().join("repository/testcases");
        std::fs::create_dir_all(&testcases).expect("created testcases dir");
        std::fs::write(testcases.join("CtsDeqpTestCases.xml"), DEQP_SUITE).expect("wrote suite");
        std::fs::write(testcases.join("CtsDeqpTestCases.apk"), b"deqp apk").expect("wrote apk");
        std::fs::write(testcases.join("CtsAppTestCases.xml"), APP_SUITE).expect("wrote suite");

        let resources = dir.path().join("resource");
        std::fs::create_dir_all(&resources).expect("created resource dir");
        for name in ["cts_result.xsl", "cts_result.css"] {
            std::fs::write(resources.join(name), name).expect("wrote resource");
        }
        Self { dir }
    }

    pub(crate) fn path(&self) -> &Utf8Path {
        self.dir.path()
    }
}

/// Renders the status stream for a session in which each case reports the given result code.
pub(crate) fn deqp_session(cases: &[(&str, &str)]) -> String {
    let mut out = String::from(
        "INSTRUMENTATION_STATUS: dEQP-SessionInfo-Name=releaseName\r\n\
         INSTRUMENTATION_STATUS: dEQP-EventType=SessionInfo\r\n\
         INSTRUMENTATION_STATUS: dEQP-SessionInfo-Value=2014.x\r\n\
         INSTRUMENTATION_STATUS_CODE: 0\r\n\
         INSTRUMENTATION_STATUS: dEQP-EventType=BeginSession\r\n\
         INSTRUMENTATION_STATUS_CODE: 0\r\n",
    );
    for (path, code) in cases {
        write!(
            out,
            "INSTRUMENTATION_STATUS: dEQP-EventType=BeginTestCase\r\n\
             INSTRUMENTATION_STATUS: dEQP-BeginTestCase-TestCasePath={path}\r\n\
             INSTRUMENTATION_STATUS_CODE: 0\r\n\
             INSTRUMENTATION_STATUS: dEQP-TestCaseResult-Code={code}\r\n\
             INSTRUMENTATION_STATUS: dEQP-TestCaseResult-Details=Detail{code}\r\n\
             INSTRUMENTATION_STATUS: dEQP-EventType=TestCaseResult\r\n\
             INSTRUMENTATION_STATUS_CODE: 0\r\n\
             INSTRUMENTATION_STATUS: dEQP-EventType=EndTestCase\r\n\
             INSTRUMENTATION_STATUS_CODE: 0\r\n"
        )
        .expect("writing to a String succeeds");
    }
    out.push_str(
        "INSTRUMENTATION_STATUS: dEQP-EventType=EndSession\r\n\
         INSTRUMENTATION_STATUS_CODE: 0\r\n\
         INSTRUMENTATION_CODE: 0\r\n",
    );
    out
}

/// A device that replays canned output for streaming commands and records everything else.
#[derive(Debug, Default)]
pub(crate) struct ScriptedDevice {
    pub(crate) stream_output: String,
    pub(crate) chunk_size: usize,
    pub(crate) files: HashMap<String, String>,
    pub(crate) commands: Vec<String>,
}

impl Device for ScriptedDevice {
    fn serial(&self) -> &str {
        "0123456789ABCDEF"
    }

    fn execute_shell_command(&mut self, command: &str) -> Result<String, DeviceError> {
        self.commands.push(command.to_owned());
        if let Some(path) = command.strip_prefix("rm ") {
            self.files.remove(path);
        }
        Ok(String::new())
    }

    fn execute_shell_command_streaming(
        &mut self,
        command: &str,
        receiver: &mut dyn ShellOutputReceiver,
    ) -> Result<(), DeviceError> {
        self.commands.push(command.to_owned());
        for chunk in self.stream_output.as_bytes().chunks(self.chunk_size.max(1)) {
            if receiver.is_cancelled() {
                break;
            }
            receiver.add_output(chunk);
        }
        receiver.flush();
        Ok(())
    }

    fn push_string(&mut self, contents: &str, remote_path: &str) -> Result<(), DeviceError> {
        self.files.insert(remote_path.to_owned(), contents.to_owned());
        Ok(())
    }
}
