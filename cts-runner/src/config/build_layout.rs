// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::errors::BuildLayoutError;
use camino::{Utf8Path, Utf8PathBuf};
use tracing::debug;

/// A validated harness root: the directories that suite loading and reporting rely on.
///
/// Obtained through [`HarnessConfig::build_layout`](super::HarnessConfig::build_layout).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BuildLayout {
    root: Utf8PathBuf,
    testcases_dir: Utf8PathBuf,
    results_dir: Utf8PathBuf,
}

impl BuildLayout {
    pub(super) fn validate(
        root: &Utf8Path,
        testcases_dir: &Utf8Path,
        results_dir: &Utf8Path,
    ) -> Result<Self, BuildLayoutError> {
        if !root.is_dir() {
            return Err(BuildLayoutError::RootNotFound {
                path: root.to_owned(),
            });
        }
        if !testcases_dir.is_dir() {
            return Err(BuildLayoutError::TestCasesDirNotFound {
                path: testcases_dir.to_owned(),
            });
        }
        if results_dir.exists() {
            if !results_dir.is_dir() {
                return Err(BuildLayoutError::ResultsNotDir {
                    path: results_dir.to_owned(),
                });
            }
        } else {
            debug!("creating results directory `{results_dir}`");
            std::fs::create_dir_all(results_dir).map_err(|error| {
                BuildLayoutError::CreateResultsDir {
                    path: results_dir.to_owned(),
                    error,
                }
            })?;
        }

        Ok(Self {
            root: root.to_owned(),
            testcases_dir: testcases_dir.to_owned(),
            results_dir: results_dir.to_owned(),
        })
    }

    /// Returns the harness root.
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Returns the directory holding suite definitions and test artifacts.
    pub fn testcases_dir(&self) -> &Utf8Path {
        &self.testcases_dir
    }

    /// Returns the directory under which per-run result directories are created.
    pub fn results_dir(&self) -> &Utf8Path {
        &self.results_dir
    }
}
