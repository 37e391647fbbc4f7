// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the harness: suite loading through to the archived result document.

mod basic;
mod fixtures;
