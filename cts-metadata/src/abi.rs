// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::PackageIdParseError;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt;

/// A target ABI (instruction-set architecture) that test packages are fanned out to.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Abi {
    name: SmolStr,
}

impl Abi {
    /// Creates a new ABI from its name, e.g. `arm64-v8a`.
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self { name: name.into() }
    }

    /// Returns the name of this ABI.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the bitness of this ABI: `"64"` for 64-bit ABIs, `"32"` otherwise.
    pub fn bitness(&self) -> &'static str {
        if self.name.contains("64") { "64" } else { "32" }
    }
}

impl fmt::Display for Abi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Creates the composite package id `"<abi> <name>"`.
pub fn create_package_id(abi: &str, name: &str) -> String {
    format!("{abi} {name}")
}

/// Parses a composite package id back into its ABI and package name.
pub fn parse_package_id(id: &str) -> Result<(Abi, &str), PackageIdParseError> {
    match id.split_once(' ') {
        Some((abi, name)) if !abi.is_empty() && !name.is_empty() => Ok((Abi::new(abi), name)),
        _ => Err(PackageIdParseError::new(id)),
    }
}
