// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{PackageDefinition, TIMEOUT_UNSET, TestType};
use crate::{
    config::SuiteConfig,
    errors::{SuiteDefinitionParseError, SuiteElementError},
};
use camino::Utf8Path;
use cts_metadata::{Abi, TestIdentifier};
use indexmap::IndexMap;
use quick_xml::{
    Reader,
    events::{BytesStart, Event},
};
use tracing::{debug, warn};

static TEST_PACKAGE_TAG: &[u8] = b"TestPackage";
static TEST_SUITE_TAG: &[u8] = b"TestSuite";
static TEST_CASE_TAG: &[u8] = b"TestCase";
static TEST_TAG: &[u8] = b"Test";

/// Loads suite definition documents, fanning each package out to the requested ABIs.
///
/// Expected structure:
///
/// ```xml
/// <TestPackage name="..." appPackageName="..." ...>
///     <TestSuite name="android">
///         <TestSuite name="app">
///             <TestCase name="ActivityTest">
///                 <Test name="testLaunch" timeout="60000" />
///                 <Test name="testFinish" expectation="failure" abis="x86, arm64-v8a" />
///             </TestCase>
///         </TestSuite>
///     </TestSuite>
/// </TestPackage>
/// ```
///
/// Loading is tolerant: problems with individual elements are logged, collected as
/// [`SuiteElementError`]s, and the element is skipped. Only a document that isn't well-formed XML
/// fails to load.
#[derive(Clone, Debug)]
pub struct SuiteDefinitionLoader {
    abis: Vec<Abi>,
    include_known_failures: bool,
}

impl SuiteDefinitionLoader {
    /// Creates a new loader for the given ABIs.
    ///
    /// Duplicate ABIs are ignored.
    pub fn new(abis: impl IntoIterator<Item = Abi>, include_known_failures: bool) -> Self {
        let mut deduped: Vec<Abi> = Vec::new();
        for abi in abis {
            if !deduped.contains(&abi) {
                deduped.push(abi);
            }
        }
        Self {
            abis: deduped,
            include_known_failures,
        }
    }

    /// Creates a new loader from the suite section of the harness config.
    pub fn from_config(config: &SuiteConfig) -> Self {
        Self::new(
            config.abis().iter().cloned(),
            config.include_known_failures(),
        )
    }

    /// Returns the ABIs that packages are fanned out to.
    pub fn abis(&self) -> &[Abi] {
        &self.abis
    }

    /// Reads and parses the suite definition at `path`.
    pub fn load_file(&self, path: &Utf8Path) -> Result<LoadedSuite, SuiteDefinitionParseError> {
        let contents =
            std::fs::read_to_string(path).map_err(|error| SuiteDefinitionParseError::Read {
                path: path.to_owned(),
                error,
            })?;
        self.load_str(path.as_str(), &contents)
    }

    /// Parses a suite definition from a string. `source_name` is used in errors and logs.
    pub fn load_str(
        &self,
        source_name: &str,
        xml: &str,
    ) -> Result<LoadedSuite, SuiteDefinitionParseError> {
        let mut state = LoadState::new(self, source_name);

        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        loop {
            let position = reader.buffer_position() as u64;
            let xml_error = |error: quick_xml::Error| SuiteDefinitionParseError::Xml {
                source_name: source_name.to_owned(),
                position,
                error,
            };

            match reader.read_event().map_err(xml_error)? {
                Event::Start(e) => {
                    state.start_element(&e, position).map_err(xml_error)?;
                }
                Event::Empty(e) => {
                    state.start_element(&e, position).map_err(xml_error)?;
                    state.end_element(e.local_name().as_ref());
                }
                Event::End(e) => {
                    state.end_element(e.local_name().as_ref());
                }
                Event::Eof => break,
                _ => {}
            }
        }

        Ok(state.finish())
    }
}

/// The result of loading one suite definition document.
#[derive(Clone, Debug, Default)]
pub struct LoadedSuite {
    /// One definition per package and requested ABI, in document order then ABI order.
    pub packages: Vec<PackageDefinition>,

    /// Problems with individual elements. Each affected element was skipped.
    pub element_errors: Vec<SuiteElementError>,
}

struct LoadState<'a> {
    loader: &'a SuiteDefinitionLoader,
    source_name: &'a str,
    // Definitions for the package being parsed, one per ABI.
    current: IndexMap<Abi, PackageDefinition>,
    in_package: bool,
    // Set when the current TestPackage was rejected: its tests are dropped without further errors.
    skipping_package: bool,
    class_name_stack: Vec<String>,
    // Whether each open TestSuite/TestCase pushed a segment, so the end tag knows whether to pop.
    pushed_stack: Vec<bool>,
    // The number of open TestSuite/TestCase elements without a name. Tests beneath them are dropped.
    unnamed_depth: usize,
    out: LoadedSuite,
}

impl<'a> LoadState<'a> {
    fn new(loader: &'a SuiteDefinitionLoader, source_name: &'a str) -> Self {
        Self {
            loader,
            source_name,
            current: IndexMap::new(),
            in_package: false,
            skipping_package: false,
            class_name_stack: Vec::new(),
            pushed_stack: Vec::new(),
            unnamed_depth: 0,
            out: LoadedSuite::default(),
        }
    }

    fn start_element(&mut self, e: &BytesStart<'_>, position: u64) -> Result<(), quick_xml::Error> {
        let local_name = e.local_name();
        match local_name.as_ref() {
            tag if tag == TEST_PACKAGE_TAG => self.start_package(e, position),
            tag if tag == TEST_SUITE_TAG || tag == TEST_CASE_TAG => {
                match attr(e, "name")? {
                    Some(segment) => {
                        self.class_name_stack.push(segment);
                        self.pushed_stack.push(true);
                    }
                    None => {
                        let element = String::from_utf8_lossy(tag).into_owned();
                        self.element_error(SuiteElementError::MissingName { element, position });
                        self.pushed_stack.push(false);
                        self.unnamed_depth += 1;
                    }
                }
                Ok(())
            }
            tag if tag == TEST_TAG => self.start_test(e, position),
            _ => Ok(()),
        }
    }

    fn end_element(&mut self, local_name: &[u8]) {
        if local_name == TEST_PACKAGE_TAG {
            self.flush_package();
            self.in_package = false;
            self.skipping_package = false;
        } else if local_name == TEST_SUITE_TAG || local_name == TEST_CASE_TAG {
            match self.pushed_stack.pop() {
                Some(true) => {
                    self.class_name_stack.pop();
                }
                Some(false) => self.unnamed_depth = self.unnamed_depth.saturating_sub(1),
                None => {}
            }
        }
    }

    fn start_package(&mut self, e: &BytesStart<'_>, position: u64) -> Result<(), quick_xml::Error> {
        self.flush_package();
        self.class_name_stack.clear();
        self.pushed_stack.clear();
        self.unnamed_depth = 0;
        self.in_package = true;

        let Some(name) = attr(e, "name")? else {
            self.element_error(SuiteElementError::MissingName {
                element: "TestPackage".to_owned(),
                position,
            });
            self.skipping_package = true;
            return Ok(());
        };
        self.skipping_package = false;

        let test_type = if parse_bool(attr(e, "hostSideOnly")?.as_deref()) {
            TestType::HostSideOnly
        } else if parse_bool(attr(e, "vmHostTest")?.as_deref()) {
            TestType::VmHostTest
        } else {
            match attr(e, "testType")? {
                Some(test_type) => TestType::Named(test_type),
                None => TestType::Unspecified,
            }
        };

        let template = PackageDefinition {
            name,
            abi: Abi::new(""),
            app_package_name: attr(e, "appPackageName")?,
            app_namespace: attr(e, "appNameSpace")?,
            runner: attr(e, "runner")?,
            jar_path: attr(e, "jarPath")?,
            test_type,
            java_package_filter: attr(e, "javaPackageFilter")?.filter(|filter| !filter.is_empty()),
            target_binary_name: attr(e, "targetBinaryName")?,
            target_namespace: attr(e, "targetNameSpace")?,
            runtime_args: attr(e, "runtimeArgs")?,
            signature_check: parse_bool(attr(e, "signatureCheck")?.as_deref()),
            tests: IndexMap::new(),
        };

        for abi in &self.loader.abis {
            let mut def = template.clone();
            def.abi = abi.clone();
            self.current.insert(abi.clone(), def);
        }
        Ok(())
    }

    fn start_test(&mut self, e: &BytesStart<'_>, position: u64) -> Result<(), quick_xml::Error> {
        if !self.in_package {
            self.element_error(SuiteElementError::TestOutsidePackage { position });
            return Ok(());
        }
        if self.skipping_package {
            return Ok(());
        }
        if self.unnamed_depth > 0 {
            debug!(
                "{}: skipping test at byte {position} under an unnamed group",
                self.source_name
            );
            return Ok(());
        }
        let Some(method_name) = attr(e, "name")? else {
            self.element_error(SuiteElementError::MissingName {
                element: "Test".to_owned(),
                position,
            });
            return Ok(());
        };
        let id = TestIdentifier::new(self.class_name_stack.join("."), method_name);

        let timeout = match attr(e, "timeout")? {
            Some(value) => match value.trim().parse::<i64>() {
                Ok(timeout) => timeout,
                Err(_) => {
                    self.element_error(SuiteElementError::InvalidTimeout {
                        test: id.to_string(),
                        value,
                    });
                    return Ok(());
                }
            },
            None => TIMEOUT_UNSET,
        };

        let is_known_failure = attr(e, "expectation")?.as_deref() == Some("failure");
        if is_known_failure && !self.loader.include_known_failures {
            debug!("{}: skipping known failure {id}", self.source_name);
            return Ok(());
        }

        let applicable = applicable_abis(attr(e, "abis")?.as_deref(), &self.loader.abis);
        for abi in applicable {
            if let Some(def) = self.current.get_mut(abi) {
                def.add_test(id.clone(), timeout);
            }
        }
        Ok(())
    }

    fn flush_package(&mut self) {
        self.out
            .packages
            .extend(std::mem::take(&mut self.current).into_values());
    }

    fn element_error(&mut self, error: SuiteElementError) {
        warn!("{}: invalid suite definition: {error}", self.source_name);
        self.out.element_errors.push(error);
    }

    fn finish(mut self) -> LoadedSuite {
        self.flush_package();
        self.out
    }
}

/// Returns the requested ABIs that a test applies to.
///
/// `abis` is a comma- or space-separated list. If it is absent or empty, the test applies to every
/// requested ABI.
fn applicable_abis<'a>(abis: Option<&str>, requested: &'a [Abi]) -> Vec<&'a Abi> {
    let listed: Vec<&str> = abis
        .map(|list| {
            list.split(|c: char| c == ',' || c.is_whitespace())
                .filter(|abi| !abi.is_empty())
                .collect()
        })
        .unwrap_or_default();
    if listed.is_empty() {
        return requested.iter().collect();
    }
    requested
        .iter()
        .filter(|abi| listed.contains(&abi.name()))
        .collect()
}

fn attr(e: &BytesStart<'_>, name: &str) -> Result<Option<String>, quick_xml::Error> {
    match e.try_get_attribute(name)? {
        Some(attribute) => Ok(Some(attribute.unescape_value()?.into_owned())),
        None => Ok(None),
    }
}

fn parse_bool(value: Option<&str>) -> bool {
    value.is_some_and(|value| value.eq_ignore_ascii_case("true"))
}
