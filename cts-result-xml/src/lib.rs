// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Data model and serializer for compatibility test result documents.
//!
//! A result document (`testResult.xml`, format version [`RESULT_FILE_VERSION`]) describes one
//! completed run: the test plan, device and host metadata, summary counts, and a hierarchical view
//! of every package's tests.
//!
//! Test results are recorded flat, keyed by [`TestIdentifier`](cts_metadata::TestIdentifier). The
//! hierarchy is only reconstructed for serialization, by inserting each result into a
//! [`ResultTree`].

mod errors;
mod outcome;
mod report;
mod serialize;
mod tree;

pub use errors::*;
pub use outcome::*;
pub use report::*;
pub use tree::*;
