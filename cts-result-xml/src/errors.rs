// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use cts_metadata::TestIdentifier;
use thiserror::Error;

/// An error that occurs while serializing a [`Report`](crate::Report).
///
/// Returned by [`Report::serialize`](crate::Report::serialize) and
/// [`Report::to_string`](crate::Report::to_string).
#[derive(Debug, Error)]
#[error("error serializing test result document")]
pub struct SerializeError {
    #[from]
    inner: quick_xml::Error,
}

/// The same test was inserted into a [`ResultTree`](crate::ResultTree) twice.
///
/// This indicates a duplicate identifier upstream, typically in a suite definition.
#[derive(Clone, Debug, Error)]
#[error("test `{id}` was inserted into the result tree more than once")]
pub struct DuplicateTestError {
    id: TestIdentifier,
}

impl DuplicateTestError {
    pub(crate) fn new(id: TestIdentifier) -> Self {
        Self { id }
    }

    /// Returns the identifier that was inserted twice.
    pub fn id(&self) -> &TestIdentifier {
        &self.id
    }
}
