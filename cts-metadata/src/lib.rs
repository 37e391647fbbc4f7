// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Shared vocabulary for the compatibility test harness.
//!
//! This crate holds the small, stable types that every other part of the harness passes around:
//!
//! * [`TestIdentifier`]: the identity of a single test, a (qualified class name, method name)
//!   pair.
//! * [`TestStatus`]: the terminal (or not-yet-terminal) status of one test.
//! * [`Abi`] and the ABI helpers: the target architectures a package is fanned out to.
//!
//! None of these types carry behavior beyond parsing and formatting.

mod abi;
mod errors;
mod status;
mod test_id;

pub use abi::*;
pub use errors::*;
pub use status::*;
pub use test_id::*;
