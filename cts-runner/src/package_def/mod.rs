// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test package definitions.
//!
//! A suite definition document describes one test package. It is loaded by a
//! [`SuiteDefinitionLoader`], which produces one [`PackageDefinition`] per requested ABI. Loaded
//! definitions are collected into a [`PackageRepository`].

mod repo;
mod xml_parser;

pub use repo::*;
pub use xml_parser::*;

use crate::errors::PackageDigestError;
use camino::{Utf8Path, Utf8PathBuf};
use cts_metadata::{Abi, TestIdentifier, create_package_id};
use indexmap::IndexMap;
use sha2::{Digest, Sha256};
use std::{fmt, fs, io};

/// A test timeout of `-1` means that no timeout was specified.
pub const TIMEOUT_UNSET: i64 = -1;

/// How the tests in a package are run.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum TestType {
    /// Tests run entirely on the host (`hostSideOnly="true"`).
    HostSideOnly,

    /// Tests run in a VM driven from the host (`vmHostTest="true"`).
    VmHostTest,

    /// The `testType` attribute, for example `deqpTest` or `instrumentation`.
    Named(String),

    /// No test type was specified.
    Unspecified,
}

impl TestType {
    /// The `testType` value for dEQP packages.
    pub const DEQP: &'static str = "deqpTest";

    /// Returns the string form of this test type.
    pub fn as_str(&self) -> &str {
        match self {
            Self::HostSideOnly => "hostSideOnly",
            Self::VmHostTest => "vmHostTest",
            Self::Named(name) => name,
            Self::Unspecified => "",
        }
    }

    /// Returns true if this package's tests are dEQP cases.
    pub fn is_deqp(&self) -> bool {
        matches!(self, Self::Named(name) if name == Self::DEQP)
    }
}

impl fmt::Display for TestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One test package on one ABI.
///
/// Created by [`SuiteDefinitionLoader`]; immutable once loading is complete.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PackageDefinition {
    pub(crate) name: String,
    pub(crate) abi: Abi,
    pub(crate) app_package_name: Option<String>,
    pub(crate) app_namespace: Option<String>,
    pub(crate) runner: Option<String>,
    pub(crate) jar_path: Option<String>,
    pub(crate) test_type: TestType,
    pub(crate) java_package_filter: Option<String>,
    pub(crate) target_binary_name: Option<String>,
    pub(crate) target_namespace: Option<String>,
    pub(crate) runtime_args: Option<String>,
    pub(crate) signature_check: bool,
    pub(crate) tests: IndexMap<TestIdentifier, i64>,
}

impl PackageDefinition {
    /// Returns the composite id of this definition, `"<abi> <name>"`.
    pub fn id(&self) -> String {
        create_package_id(self.abi.name(), &self.name)
    }

    /// Returns the package name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the ABI this definition runs on.
    pub fn abi(&self) -> &Abi {
        &self.abi
    }

    /// Returns the application package name the tests run under.
    pub fn app_package_name(&self) -> Option<&str> {
        self.app_package_name.as_deref()
    }

    /// Returns the application namespace.
    pub fn app_namespace(&self) -> Option<&str> {
        self.app_namespace.as_deref()
    }

    /// Returns the instrumentation runner.
    pub fn runner(&self) -> Option<&str> {
        self.runner.as_deref()
    }

    /// Returns the path of the package's jar, relative to the testcases directory.
    pub fn jar_path(&self) -> Option<&str> {
        self.jar_path.as_deref()
    }

    /// Returns how this package's tests are run.
    pub fn test_type(&self) -> &TestType {
        &self.test_type
    }

    /// Returns the java package filter, if one was set.
    ///
    /// An empty `javaPackageFilter` attribute is treated as unset.
    pub fn java_package_filter(&self) -> Option<&str> {
        self.java_package_filter.as_deref()
    }

    /// Returns the name of the binary under test.
    pub fn target_binary_name(&self) -> Option<&str> {
        self.target_binary_name.as_deref()
    }

    /// Returns the namespace of the package under test.
    pub fn target_namespace(&self) -> Option<&str> {
        self.target_namespace.as_deref()
    }

    /// Returns extra runtime arguments.
    pub fn runtime_args(&self) -> Option<&str> {
        self.runtime_args.as_deref()
    }

    /// Returns true if this is a signature check package.
    pub fn is_signature_check(&self) -> bool {
        self.signature_check
    }

    /// Returns the scheduled tests in definition order, along with their timeouts in milliseconds.
    ///
    /// A timeout of [`TIMEOUT_UNSET`] means that the default should be used.
    pub fn tests(&self) -> impl ExactSizeIterator<Item = (&TestIdentifier, i64)> + '_ {
        self.tests.iter().map(|(id, timeout)| (id, *timeout))
    }

    /// Returns the timeout for a test, or `None` if the test is not part of this package.
    pub fn timeout_for(&self, test: &TestIdentifier) -> Option<i64> {
        self.tests.get(test).copied()
    }

    /// Returns true if this package has a test with the given class name.
    pub fn has_class(&self, class_name: &str) -> bool {
        self.tests.keys().any(|id| id.class_name() == class_name)
    }

    pub(crate) fn add_test(&mut self, id: TestIdentifier, timeout: i64) {
        // Re-adding a test keeps its position and takes the latest timeout.
        self.tests.insert(id, timeout);
    }

    /// Returns the path of the artifact this package was built into, if it has one.
    ///
    /// Host-side packages use their jar; all others use `<name>.apk`.
    pub fn artifact_path(&self, testcases_dir: &Utf8Path) -> Option<Utf8PathBuf> {
        match self.jar_path.as_deref() {
            Some(jar_path) if !jar_path.is_empty() => Some(testcases_dir.join(jar_path)),
            _ if !self.name.is_empty() => Some(testcases_dir.join(format!("{}.apk", self.name))),
            _ => None,
        }
    }

    /// Computes the content digest of this package's artifact: the lowercase hex SHA-256 of its
    /// bytes.
    ///
    /// Returns `Ok(None)` if the package has no artifact.
    pub fn compute_digest(
        &self,
        testcases_dir: &Utf8Path,
    ) -> Result<Option<String>, PackageDigestError> {
        let Some(path) = self.artifact_path(testcases_dir) else {
            return Ok(None);
        };
        let mut file =
            fs::File::open(&path).map_err(|error| PackageDigestError::new(&path, error))?;
        let mut hasher = Sha256::new();
        io::copy(&mut file, &mut hasher).map_err(|error| PackageDigestError::new(&path, error))?;
        Ok(Some(hex::encode(hasher.finalize())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino_tempfile::Utf8TempDir;
    use pretty_assertions::assert_eq;

    fn definition(name: &str, jar_path: Option<&str>) -> PackageDefinition {
        PackageDefinition {
            name: name.to_owned(),
            abi: Abi::new("arm64-v8a"),
            app_package_name: None,
            app_namespace: None,
            runner: None,
            jar_path: jar_path.map(str::to_owned),
            test_type: TestType::Unspecified,
            java_package_filter: None,
            target_binary_name: None,
            target_namespace: None,
            runtime_args: None,
            signature_check: false,
            tests: IndexMap::new(),
        }
    }

    #[test]
    fn id_and_tests() {
        let mut def = definition("android.app", None);
        assert_eq!(def.id(), "arm64-v8a android.app");

        let first = TestIdentifier::new("android.app.cts.ActivityTest", "testLaunch");
        let second = TestIdentifier::new("android.app.cts.ActivityTest", "testFinish");
        def.add_test(first.clone(), TIMEOUT_UNSET);
        def.add_test(second.clone(), 1000);
        def.add_test(first.clone(), 500);

        let tests: Vec<_> = def.tests().collect();
        assert_eq!(tests, vec![(&first, 500), (&second, 1000)]);
        assert_eq!(def.timeout_for(&second), Some(1000));
        assert!(def.has_class("android.app.cts.ActivityTest"));
        assert!(!def.has_class("android.app.cts"));
    }

    #[test]
    fn digest_of_artifact() {
        let dir = Utf8TempDir::new().unwrap();
        std::fs::write(dir.path().join("android.app.apk"), b"hello").unwrap();

        let apk = definition("android.app", None);
        assert_eq!(
            apk.compute_digest(dir.path()).unwrap().as_deref(),
            Some("2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824")
        );

        let jar = definition("android.host", Some("host.jar"));
        assert_eq!(
            jar.artifact_path(dir.path()),
            Some(dir.path().join("host.jar"))
        );
        jar.compute_digest(dir.path())
            .expect_err("missing artifact is an error");
    }

    #[test]
    fn test_type_strings() {
        assert_eq!(TestType::HostSideOnly.as_str(), "hostSideOnly");
        assert_eq!(TestType::VmHostTest.as_str(), "vmHostTest");
        assert!(TestType::Named("deqpTest".to_owned()).is_deqp());
        assert!(!TestType::Named("instrumentation".to_owned()).is_deqp());
        assert_eq!(TestType::Unspecified.to_string(), "");
    }
}
