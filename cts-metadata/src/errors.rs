// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::{error, fmt};

/// An error that occurs while splitting a dotted case path into a
/// [`TestIdentifier`](crate::TestIdentifier).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TestIdentifierParseError {
    input: String,
}

impl TestIdentifierParseError {
    pub(crate) fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }

    /// Returns the input that failed to parse.
    pub fn input(&self) -> &str {
        &self.input
    }
}

impl fmt::Display for TestIdentifierParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "case path `{}` must be of the form `<class>.<method>`",
            self.input
        )
    }
}

impl error::Error for TestIdentifierParseError {}

/// An error that occurs while parsing a composite package id of the form `"<abi> <name>"`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PackageIdParseError {
    input: String,
}

impl PackageIdParseError {
    pub(crate) fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }
}

impl fmt::Display for PackageIdParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "package id `{}` must be of the form `<abi> <name>`",
            self.input
        )
    }
}

impl error::Error for PackageIdParseError {}
