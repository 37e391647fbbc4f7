// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::TestIdentifierParseError;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt;

/// The identity of a single test: a qualified class name and a method name.
///
/// The class name is a dot-separated path such as `android.app.cts.ActivityTest` or
/// `dEQP-GLES3.info`. No structure beyond "dot-separated" is assumed.
///
/// Identifiers are ordered by class name, then method name.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct TestIdentifier {
    class_name: SmolStr,
    method_name: SmolStr,
}

impl TestIdentifier {
    /// Creates a new identifier.
    pub fn new(class_name: impl Into<SmolStr>, method_name: impl Into<SmolStr>) -> Self {
        Self {
            class_name: class_name.into(),
            method_name: method_name.into(),
        }
    }

    /// Splits a fully dotted case path (`dEQP-GLES3.info.version`) at its last dot.
    ///
    /// Everything before the last dot becomes the class name, and the final segment the method
    /// name.
    pub fn from_case_path(path: &str) -> Result<Self, TestIdentifierParseError> {
        match path.rsplit_once('.') {
            Some((class_name, method_name)) if !class_name.is_empty() && !method_name.is_empty() => {
                Ok(Self::new(class_name, method_name))
            }
            _ => Err(TestIdentifierParseError::new(path)),
        }
    }

    /// Returns the qualified class name.
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Returns the method name.
    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    /// Returns the dotted case path, `<class>.<method>`.
    pub fn case_path(&self) -> String {
        format!("{}.{}", self.class_name, self.method_name)
    }

    /// Returns the segments of the class name, split on `.`.
    pub fn class_segments(&self) -> impl Iterator<Item = &str> + '_ {
        self.class_name.split('.')
    }
}

impl fmt::Display for TestIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.class_name, self.method_name)
    }
}

#[cfg(feature = "proptest1")]
mod proptest_impls {
    use super::*;
    use proptest::prelude::*;

    impl Arbitrary for TestIdentifier {
        type Parameters = ();
        type Strategy = BoxedStrategy<Self>;

        fn arbitrary_with(_: ()) -> Self::Strategy {
            (
                prop::collection::vec("[a-zA-Z][a-zA-Z0-9_-]{0,6}", 1..5),
                "[a-z][a-zA-Z0-9_]{0,8}",
            )
                .prop_map(|(segments, method)| TestIdentifier::new(segments.join("."), method))
                .boxed()
        }
    }
}
