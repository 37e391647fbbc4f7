// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{ResultTree, SerializeError, serialize::serialize_report};
use chrono::{DateTime, FixedOffset};
use indexmap::IndexMap;
use std::io;

/// The version of the result document format written by this crate.
pub static RESULT_FILE_VERSION: &str = "1.11";

/// The format used for every timestamp in a result document, e.g. `Tue May 13 12:00:00 +00:00 2014`.
pub static TIMESTAMP_FORMAT: &str = "%a %b %d %H:%M:%S %Z %Y";

/// Formats a timestamp the way it appears in a result document.
pub fn format_timestamp(time: &DateTime<FixedOffset>) -> String {
    time.format(TIMESTAMP_FORMAT).to_string()
}

/// The root element of a result document.
#[derive(Clone, Debug)]
pub struct Report<'a> {
    /// The name of the test plan that was run.
    pub test_plan: String,

    /// The time at which the run started.
    pub start_time: DateTime<FixedOffset>,

    /// The time at which the run ended.
    pub end_time: DateTime<FixedOffset>,

    /// Information collected from the device, if the device info package ran.
    ///
    /// If this is `None`, an empty `DeviceInfo` element is written.
    pub device_info: Option<DeviceInfo>,

    /// Information about the host the harness ran on.
    pub host_info: HostInfo,

    /// Counts across every package.
    pub summary: Summary,

    /// The packages that were run, in run order.
    pub test_packages: Vec<TestPackage<'a>>,
}

impl<'a> Report<'a> {
    /// Creates a new report with no packages and an empty summary.
    pub fn new(
        test_plan: impl Into<String>,
        start_time: DateTime<FixedOffset>,
        end_time: DateTime<FixedOffset>,
        host_info: HostInfo,
    ) -> Self {
        Self {
            test_plan: test_plan.into(),
            start_time,
            end_time,
            device_info: None,
            host_info,
            summary: Summary::default(),
            test_packages: Vec::new(),
        }
    }

    /// Sets the device info section.
    pub fn set_device_info(&mut self, device_info: DeviceInfo) -> &mut Self {
        self.device_info = Some(device_info);
        self
    }

    /// Adds a package to this report. The summary is not updated.
    pub fn add_test_package(&mut self, package: TestPackage<'a>) -> &mut Self {
        self.test_packages.push(package);
        self
    }

    /// Serializes this report to the given writer.
    pub fn serialize(&self, writer: impl io::Write) -> Result<(), SerializeError> {
        serialize_report(self, writer).map_err(SerializeError::from)
    }

    /// Serializes this report to a string.
    pub fn to_string(&self) -> Result<String, SerializeError> {
        let mut buf: Vec<u8> = vec![];
        self.serialize(&mut buf)?;
        String::from_utf8(buf)
            .map_err(|utf8_err| quick_xml::Error::from(utf8_err.utf8_error()).into())
    }
}

/// Device properties collected by the device info package.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DeviceInfo {
    /// Screen geometry.
    pub screen: Screen,

    /// The subscriber id (phone number), if any.
    pub subscriber_id: Option<String>,

    /// Remaining build properties, written as attributes of `BuildInfo` in insertion order.
    pub build_info: IndexMap<String, String>,

    /// The serial of the device the run was made on, written as `deviceID`.
    pub device_id: String,

    /// System features reported by the device.
    pub features: Vec<Feature>,

    /// Processes of interest that were found running as root.
    pub processes: Vec<Process>,
}

/// Screen geometry for a device.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Screen {
    /// Width in pixels.
    pub width: Option<String>,
    /// Height in pixels.
    pub height: Option<String>,
    /// Density in dpi.
    pub density: Option<String>,
    /// The density bucket, e.g. `xhdpi`.
    pub density_bucket: Option<String>,
    /// The screen size class, e.g. `normal`.
    pub size: Option<String>,
}

impl Screen {
    /// Returns the resolution in `<width>x<height>` form.
    ///
    /// A missing dimension renders as `null`, matching documents written by older harnesses.
    pub fn resolution(&self) -> String {
        format!(
            "{}x{}",
            self.width.as_deref().unwrap_or("null"),
            self.height.as_deref().unwrap_or("null"),
        )
    }
}

/// A system feature reported by the device.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Feature {
    /// The feature name, e.g. `android.hardware.camera`.
    pub name: String,
    /// The kind of feature, e.g. `sdk` or `other`.
    pub feature_type: String,
    /// Whether the feature is available, as reported.
    pub available: String,
}

impl Feature {
    /// Parses a feature list of the form `name:type:available;name:type:available;...`.
    ///
    /// Entries with fewer than three fields are skipped.
    pub fn parse_list(data: &str) -> Vec<Self> {
        data.split(';')
            .filter_map(|entry| {
                let mut fields = entry.split(':');
                let name = fields.next()?;
                let feature_type = fields.next()?;
                let available = fields.next()?;
                Some(Self {
                    name: name.to_owned(),
                    feature_type: feature_type.to_owned(),
                    available: available.to_owned(),
                })
            })
            .collect()
    }
}

/// A process found running on the device.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Process {
    /// The process name.
    pub name: String,
    /// The uid the process runs as.
    pub uid: u32,
}

impl Process {
    /// Parses a list of root process names of the form `name;name;...`.
    ///
    /// Names are trimmed and empty entries are skipped. Every process is recorded with uid 0.
    pub fn parse_list(data: &str) -> Vec<Self> {
        data.split(';')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(|name| Self {
                name: name.to_owned(),
                uid: 0,
            })
            .collect()
    }
}

/// Information about the host the harness ran on.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HostInfo {
    /// The host name.
    pub hostname: String,

    /// The operating system name.
    pub os_name: String,

    /// The operating system version.
    pub os_version: String,

    /// The CPU architecture.
    pub os_arch: String,

    /// The runtime the harness was built with.
    pub runtime_name: String,

    /// The version of that runtime.
    pub runtime_version: String,

    /// The harness version, written as `Cts version`.
    pub harness_version: String,
}

/// Counts across a run.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Summary {
    /// The number of tests that passed.
    pub pass: usize,

    /// The number of tests that failed with an assertion failure.
    pub fail: usize,

    /// The number of tests that failed with an error.
    pub error: usize,

    /// The number of tests that were scheduled but did not complete.
    pub not_executed: usize,
}

impl Summary {
    /// The value of the `failed` attribute: failures and errors are counted together.
    pub fn failed(&self) -> usize {
        self.fail + self.error
    }

    /// Adds another set of counts to this one.
    pub fn add(&mut self, other: &Summary) {
        self.pass += other.pass;
        self.fail += other.fail;
        self.error += other.error;
        self.not_executed += other.not_executed;
    }
}

/// The results for one package on one ABI.
#[derive(Clone, Debug)]
pub struct TestPackage<'a> {
    /// The package's display name.
    pub name: String,

    /// The application package name the tests ran under.
    pub app_package_name: String,

    /// The ABI the package ran on, if known.
    pub abi: Option<String>,

    /// The content digest of the package artifact.
    pub digest: Option<String>,

    /// The package's tests.
    pub tree: ResultTree<'a>,
}
