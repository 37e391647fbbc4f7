// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by the harness.

use camino::Utf8PathBuf;
use config::ConfigError;
use cts_result_xml::{DuplicateTestError, SerializeError};
use std::io;
use thiserror::Error;

/// An error that occurred while parsing the harness config.
#[derive(Debug, Error)]
#[error("failed to parse harness config at `{config_file}`")]
#[non_exhaustive]
pub struct ConfigParseError {
    config_file: Utf8PathBuf,
    #[source]
    kind: ConfigParseErrorKind,
}

impl ConfigParseError {
    pub(crate) fn new(config_file: impl Into<Utf8PathBuf>, kind: ConfigParseErrorKind) -> Self {
        Self {
            config_file: config_file.into(),
            kind,
        }
    }

    /// Returns the config file for this error.
    pub fn config_file(&self) -> &Utf8PathBuf {
        &self.config_file
    }

    /// Returns the kind of error this is.
    pub fn kind(&self) -> &ConfigParseErrorKind {
        &self.kind
    }
}

/// The kind of error that occurred while parsing the harness config.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigParseErrorKind {
    /// An error occurred while building the config.
    #[error(transparent)]
    BuildError(Box<ConfigError>),

    /// An error occurred while deserializing the config.
    #[error(transparent)]
    DeserializeError(Box<serde_path_to_error::Error<ConfigError>>),
}

/// The harness root on disk does not have the expected shape.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BuildLayoutError {
    /// The harness root is missing or is not a directory.
    #[error("harness root `{path}` does not exist or is not a directory")]
    RootNotFound {
        /// The path that was checked.
        path: Utf8PathBuf,
    },

    /// The testcases directory is missing or is not a directory.
    #[error("testcases directory `{path}` does not exist or is not a directory")]
    TestCasesDirNotFound {
        /// The path that was checked.
        path: Utf8PathBuf,
    },

    /// The results path exists but is not a directory.
    #[error("results path `{path}` exists but is not a directory")]
    ResultsNotDir {
        /// The path that was checked.
        path: Utf8PathBuf,
    },

    /// The results directory could not be created.
    #[error("error creating results directory `{path}`")]
    CreateResultsDir {
        /// The directory that could not be created.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: io::Error,
    },
}

/// A suite definition document could not be parsed at all.
///
/// Problems with individual elements are reported as [`SuiteElementError`]s instead, and do not
/// stop parsing.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SuiteDefinitionParseError {
    /// The document could not be read.
    #[error("error reading suite definition `{path}`")]
    Read {
        /// The path to the document.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// The document is not well-formed XML.
    #[error("malformed suite definition `{source_name}` at byte {position}")]
    Xml {
        /// The name of the document, typically its path.
        source_name: String,

        /// The byte offset at which the error was detected.
        position: u64,

        /// The underlying error.
        #[source]
        error: quick_xml::Error,
    },
}

/// A non-fatal problem with a single element of a suite definition.
///
/// The element is skipped and parsing continues.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[non_exhaustive]
pub enum SuiteElementError {
    /// A `Test` element appeared before any `TestPackage` element.
    #[error("`Test` element at byte {position} appears outside of a `TestPackage`")]
    TestOutsidePackage {
        /// The byte offset of the element.
        position: u64,
    },

    /// An element that requires a name did not have one.
    #[error("`{element}` element at byte {position} is missing a `name` attribute")]
    MissingName {
        /// The element name.
        element: String,

        /// The byte offset of the element.
        position: u64,
    },

    /// A `Test` element has a timeout that is not an integer.
    #[error("test `{test}` has an invalid timeout `{value}`")]
    InvalidTimeout {
        /// The class and method name of the test, as `class#method`.
        test: String,

        /// The attribute value.
        value: String,
    },
}

/// An error that occurred while loading suite definitions into a repository.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PackageRepoError {
    /// The testcases directory could not be read.
    #[error("error reading testcases directory `{dir}`")]
    ReadDir {
        /// The directory being read.
        dir: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: walkdir::Error,
    },

    /// A path in the testcases directory is not valid UTF-8.
    #[error("testcases directory `{dir}` contains a non-UTF-8 path: {path}")]
    NonUtf8Path {
        /// The directory being read.
        dir: Utf8PathBuf,

        /// A lossy rendering of the path.
        path: String,
    },
}

/// An error that occurred while computing the content digest of a package artifact.
#[derive(Debug, Error)]
#[error("error computing digest of `{path}`")]
pub struct PackageDigestError {
    path: Utf8PathBuf,
    #[source]
    error: io::Error,
}

impl PackageDigestError {
    pub(crate) fn new(path: impl Into<Utf8PathBuf>, error: io::Error) -> Self {
        Self {
            path: path.into(),
            error,
        }
    }
}

/// An error returned by a [`Device`](crate::device::Device) implementation.
///
/// Unlike most errors in this crate, these are constructed outside it, so every variant is public.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DeviceError {
    /// The device is not connected or not responding.
    #[error("device `{serial}` is not available")]
    NotAvailable {
        /// The device serial.
        serial: String,
    },

    /// A shell command could not be run, or its output could not be read.
    #[error("shell command `{command}` failed")]
    CommandFailed {
        /// The command that was run.
        command: String,

        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// A file could not be pushed to the device.
    #[error("error pushing `{remote_path}` to the device")]
    PushFailed {
        /// The path on the device.
        remote_path: String,

        /// The underlying error.
        #[source]
        error: io::Error,
    },
}

/// An error that occurred during a dEQP run.
///
/// The run is always finished, with unresolved tests reported as not executed, before this error
/// is returned.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DeqpRunError {
    /// The device could not be prepared for the run.
    #[error("error preparing device `{serial}` for dEQP run `{run_name}`")]
    Prepare {
        /// The device serial.
        serial: String,

        /// The run name.
        run_name: String,

        /// The underlying error.
        #[source]
        error: DeviceError,
    },

    /// The instrumentation failed while tests were running.
    #[error("dEQP instrumentation failed on device `{serial}` during run `{run_name}`")]
    Instrumentation {
        /// The device serial.
        serial: String,

        /// The run name.
        run_name: String,

        /// The underlying error.
        #[source]
        error: DeviceError,
    },
}

/// A trie-encoded case list could not be decoded.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error("invalid case trie at byte {position}: {reason}")]
pub struct TrieParseError {
    position: usize,
    reason: &'static str,
}

impl TrieParseError {
    pub(crate) fn new(position: usize, reason: &'static str) -> Self {
        Self { position, reason }
    }

    /// Returns the byte offset at which the error was detected.
    pub fn position(&self) -> usize {
        self.position
    }
}

/// An error that occurred while writing the result document.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WriteReportError {
    /// [`ResultXmlReporter::invocation_ended`](crate::reporter::ResultXmlReporter::invocation_ended)
    /// was called before the invocation was started.
    #[error("result document written before the invocation was started")]
    NotStarted,

    /// The per-run result directory could not be created.
    #[error("error creating result directory `{path}`")]
    CreateDir {
        /// The directory.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// The same test was recorded twice within one package.
    #[error("error building results for package `{package}`")]
    DuplicateTest {
        /// The run name of the package.
        package: String,

        /// The underlying error.
        #[source]
        error: DuplicateTestError,
    },

    /// The result document could not be created.
    #[error("error creating result document `{path}`")]
    Create {
        /// The document path.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// The result document could not be flushed to disk.
    #[error("error writing result document `{path}`")]
    Write {
        /// The document path.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// The result document could not be serialized.
    #[error("error serializing result document `{path}`")]
    Serialize {
        /// The document path.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: SerializeError,
    },
}

/// An error that occurred while archiving a result directory.
///
/// Archiving is best-effort, so this error is only logged.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ArchiveError {
    /// An I/O error occurred.
    #[error("error archiving `{path}`")]
    Io {
        /// The path being archived.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// The zip writer failed.
    #[error("error writing zip archive `{path}`")]
    Zip {
        /// The archive path.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: zip::result::ZipError,
    },

    /// The result directory could not be walked.
    #[error("error walking `{path}`")]
    Walk {
        /// The directory being archived.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: walkdir::Error,
    },
}
