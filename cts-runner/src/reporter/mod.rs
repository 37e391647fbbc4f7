// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collecting test events and reporting results.
//!
//! Test adapters emit [`TestEvent`]s to a [`TestEventSink`]. [`RunResults`] accumulates them per
//! run, and [`ResultXmlReporter`] turns the accumulated results into a result document.

mod aggregator;
mod device_info;
pub mod events;
mod result_xml;

pub use aggregator::*;
pub use device_info::*;
pub use events::{FailureKind, TestEvent, TestEventKind, TestEventSink};
pub use result_xml::*;
