// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration support for the harness.
//!
//! Configuration is layered, lowest priority first:
//!
//! 1. The default config embedded in the harness ([`HarnessConfig::DEFAULT_CONFIG`]).
//! 2. `.config/cts-harness.toml` under the harness root, or an explicitly provided file.
//! 3. Environment variables prefixed with [`HarnessConfig::ENVIRONMENT_PREFIX`].
//!
//! Once loaded, [`HarnessConfig::build_layout`] checks that the harness root on disk matches the
//! configuration before any tests are run.

mod build_layout;
mod harness;

pub use build_layout::*;
pub use harness::*;
