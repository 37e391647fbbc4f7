// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{Deserialize, Serialize};
use std::fmt;

/// The status of a single test in a run.
///
/// Every scheduled test starts out as [`NotExecuted`](Self::NotExecuted) and is moved to one of
/// the other statuses exactly once, when it ends.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TestStatus {
    /// The test was scheduled but never completed.
    #[default]
    NotExecuted,

    /// The test passed.
    Pass,

    /// The test failed in an expected way (an assertion failure).
    Fail,

    /// The test failed in an unexpected way, such as a crash or a remote error.
    Error,
}

impl TestStatus {
    /// Returns true if this status is terminal, i.e. anything other than `NotExecuted`.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::NotExecuted)
    }

    /// Returns true if this status counts as a failure in summaries.
    pub fn is_failure(self) -> bool {
        matches!(self, Self::Fail | Self::Error)
    }

    /// The value written to the `result` attribute of the report document.
    ///
    /// Errors are reported as `fail`: the report format has no separate error status.
    pub fn report_value(self) -> &'static str {
        match self {
            Self::NotExecuted => "notExecuted",
            Self::Pass => "pass",
            Self::Fail | Self::Error => "fail",
        }
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotExecuted => "not executed",
            Self::Pass => "pass",
            Self::Fail => "fail",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}
