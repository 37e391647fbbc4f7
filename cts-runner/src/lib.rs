// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Core functionality for the compatibility test harness.
//!
//! The basic flow of an invocation is:
//!
//! 1. Load a [`HarnessConfig`](config::HarnessConfig) and validate the harness root with
//!    [`build_layout`](config::HarnessConfig::build_layout).
//! 2. Load suite definitions into a [`PackageRepository`](package_def::PackageRepository). Each
//!    package is fanned out to every configured ABI.
//! 3. Run packages on a [`Device`](device::Device). dEQP packages are run by
//!    [`DeqpTest`](deqp::DeqpTest), which reports [`TestEvent`](reporter::TestEvent)s.
//! 4. Collect events into [`RunResults`](reporter::RunResults), then write the result document
//!    with [`ResultXmlReporter`](reporter::ResultXmlReporter).
//!
//! Talking to devices is out of scope: callers supply a [`Device`](device::Device) implementation.

pub mod config;
pub mod deqp;
pub mod device;
pub mod errors;
pub mod output;
pub mod package_def;
pub mod reporter;
