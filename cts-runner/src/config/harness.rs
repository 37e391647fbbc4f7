// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::BuildLayout;
use crate::errors::{BuildLayoutError, ConfigParseError, ConfigParseErrorKind};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, builder::DefaultState};
use cts_metadata::Abi;
use serde::Deserialize;
use std::collections::BTreeSet;
use tracing::warn;

/// Overall configuration for the harness.
///
/// All paths are absolute: relative paths in config files are resolved against the harness root.
#[derive(Clone, Debug)]
pub struct HarnessConfig {
    root: Utf8PathBuf,
    suite: SuiteConfig,
    report: ReportConfig,
    deqp: DeqpConfig,
}

impl HarnessConfig {
    /// The default location of the config within the harness root.
    pub const CONFIG_PATH: &'static str = ".config/cts-harness.toml";

    /// Contains the default config as a TOML file.
    ///
    /// Harness-specific configuration is layered on top of the default config.
    pub const DEFAULT_CONFIG: &'static str = include_str!("../../default-config.toml");

    /// Environment configuration uses this prefix, plus a _.
    ///
    /// Sections are separated from keys by a double underscore, and underscores in keys map to
    /// dashes: `CTS_HARNESS_SUITE__INCLUDE_KNOWN_FAILURES=true`.
    pub const ENVIRONMENT_PREFIX: &'static str = "CTS_HARNESS";

    /// Reads the harness config from the given file, or if not specified from
    /// [`CONFIG_PATH`](Self::CONFIG_PATH) under the harness root, then applies overrides from the
    /// process environment.
    ///
    /// If the file isn't specified and the harness root doesn't have `.config/cts-harness.toml`,
    /// uses the default config options.
    pub fn from_sources(
        root: impl Into<Utf8PathBuf>,
        file: Option<&Utf8Path>,
    ) -> Result<Self, ConfigParseError> {
        Self::from_sources_with_env(root, file, std::env::vars())
    }

    /// Like [`from_sources`](Self::from_sources), but reads environment overrides from the given
    /// iterator rather than the process environment.
    pub fn from_sources_with_env(
        root: impl Into<Utf8PathBuf>,
        file: Option<&Utf8Path>,
        env: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Self, ConfigParseError> {
        let root = root.into();
        let (config_file, source) = match file {
            Some(file) => (file.to_owned(), File::new(file.as_str(), FileFormat::Toml)),
            None => {
                let config_file = root.join(Self::CONFIG_PATH);
                let source = File::new(config_file.as_str(), FileFormat::Toml).required(false);
                (config_file, source)
            }
        };

        let mut builder = Self::make_default_config().add_source(source);
        for (key, value) in env_overrides(env) {
            builder = builder
                .set_override(key, value)
                .map_err(|error| {
                    ConfigParseError::new(
                        &config_file,
                        ConfigParseErrorKind::BuildError(Box::new(error)),
                    )
                })?;
        }

        let (config, unknown) = Self::build_and_deserialize_config(&builder)
            .map_err(|kind| ConfigParseError::new(&config_file, kind))?;
        if !unknown.is_empty() {
            warn!(
                "ignoring unknown configuration keys in `{config_file}`: {}",
                unknown.into_iter().collect::<Vec<_>>().join(", ")
            );
        }

        Ok(config.into_config(root))
    }

    /// Returns the harness root.
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Returns suite loading options.
    pub fn suite(&self) -> &SuiteConfig {
        &self.suite
    }

    /// Returns report writing options.
    pub fn report(&self) -> &ReportConfig {
        &self.report
    }

    /// Returns dEQP execution options.
    pub fn deqp(&self) -> &DeqpConfig {
        &self.deqp
    }

    /// Validates the harness root against this configuration, creating the results directory if
    /// necessary.
    pub fn build_layout(&self) -> Result<BuildLayout, BuildLayoutError> {
        BuildLayout::validate(
            &self.root,
            &self.suite.testcases_dir,
            &self.report.results_dir,
        )
    }

    // ---
    // Helper methods
    // ---

    fn make_default_config() -> ConfigBuilder<DefaultState> {
        Config::builder().add_source(File::from_str(Self::DEFAULT_CONFIG, FileFormat::Toml))
    }

    /// This returns a tuple of (config, ignored paths).
    fn build_and_deserialize_config(
        builder: &ConfigBuilder<DefaultState>,
    ) -> Result<(HarnessConfigDeserialize, BTreeSet<String>), ConfigParseErrorKind> {
        let config = builder
            .build_cloned()
            .map_err(|error| ConfigParseErrorKind::BuildError(Box::new(error)))?;

        let mut ignored = BTreeSet::new();
        let mut cb = |path: serde_ignored::Path| {
            ignored.insert(path.to_string());
        };
        let ignored_de = serde_ignored::Deserializer::new(config, &mut cb);
        let config: HarnessConfigDeserialize = serde_path_to_error::deserialize(ignored_de)
            .map_err(|error| {
                // Both serde_path_to_error and the config crate report the key. Drop the key from
                // the config error for consistency.
                let path = error.path().clone();
                let config_error = error.into_inner();
                let error = match config_error {
                    ConfigError::At { error, .. } => *error,
                    other => other,
                };
                ConfigParseErrorKind::DeserializeError(Box::new(serde_path_to_error::Error::new(
                    path, error,
                )))
            })?;

        Ok((config, ignored))
    }
}

/// Converts `CTS_HARNESS_SECTION__SOME_KEY=value` pairs into `(section.some-key, value)` overrides.
///
/// Values for list-valued keys are split on commas.
fn env_overrides(
    env: impl IntoIterator<Item = (String, String)>,
) -> Vec<(String, config::Value)> {
    let prefix = format!("{}_", HarnessConfig::ENVIRONMENT_PREFIX);
    let mut overrides: Vec<_> = env
        .into_iter()
        .filter_map(|(name, value)| {
            let rest = name.strip_prefix(&prefix)?;
            let (section, key) = rest.split_once("__")?;
            if section.is_empty() || key.is_empty() {
                return None;
            }
            let key = format!(
                "{}.{}",
                section.to_ascii_lowercase(),
                key.to_ascii_lowercase().replace('_', "-"),
            );
            let value = if LIST_KEYS.contains(&key.as_str()) {
                let items: Vec<String> = value
                    .split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(str::to_owned)
                    .collect();
                config::Value::from(items)
            } else {
                config::Value::from(value)
            };
            Some((key, value))
        })
        .collect();
    // Environment iteration order is unspecified.
    overrides.sort_by(|(a, _), (b, _)| a.cmp(b));
    overrides
}

static LIST_KEYS: &[&str] = &["suite.abis", "report.resource-files"];

/// Suite loading options.
#[derive(Clone, Debug)]
pub struct SuiteConfig {
    testcases_dir: Utf8PathBuf,
    abis: Vec<Abi>,
    include_known_failures: bool,
}

impl SuiteConfig {
    /// The directory holding suite definitions and test artifacts.
    pub fn testcases_dir(&self) -> &Utf8Path {
        &self.testcases_dir
    }

    /// The ABIs each package is fanned out to.
    pub fn abis(&self) -> &[Abi] {
        &self.abis
    }

    /// Whether tests marked as known failures are scheduled.
    pub fn include_known_failures(&self) -> bool {
        self.include_known_failures
    }
}

/// Report writing options.
#[derive(Clone, Debug)]
pub struct ReportConfig {
    results_dir: Utf8PathBuf,
    resources_dir: Utf8PathBuf,
    resource_files: Vec<String>,
    plan_name: String,
    harness_version: String,
    device_info_package: String,
    archive: bool,
}

impl ReportConfig {
    /// The directory under which per-run result directories are created.
    pub fn results_dir(&self) -> &Utf8Path {
        &self.results_dir
    }

    /// The directory holding presentation resources.
    pub fn resources_dir(&self) -> &Utf8Path {
        &self.resources_dir
    }

    /// The names of the resources copied next to each result document.
    pub fn resource_files(&self) -> &[String] {
        &self.resource_files
    }

    /// The test plan name.
    pub fn plan_name(&self) -> &str {
        &self.plan_name
    }

    /// The harness version written to host info.
    pub fn harness_version(&self) -> &str {
        &self.harness_version
    }

    /// The run name of the device info package.
    pub fn device_info_package(&self) -> &str {
        &self.device_info_package
    }

    /// Whether result directories are archived.
    pub fn archive(&self) -> bool {
        self.archive
    }
}

/// dEQP execution options.
#[derive(Clone, Debug)]
pub struct DeqpConfig {
    case_list_file: String,
    log_file: String,
    instrumentation: String,
}

impl DeqpConfig {
    /// The path on the device that the case list is pushed to.
    pub fn case_list_file(&self) -> &str {
        &self.case_list_file
    }

    /// The path on the device that dEQP writes its log to.
    pub fn log_file(&self) -> &str {
        &self.log_file
    }

    /// The instrumentation component.
    pub fn instrumentation(&self) -> &str {
        &self.instrumentation
    }
}

impl Default for DeqpConfig {
    fn default() -> Self {
        Self {
            case_list_file: "/sdcard/dEQP-TestCaseList.txt".to_owned(),
            log_file: "/sdcard/TestLog.qpa".to_owned(),
            instrumentation:
                "com.drawelements.deqp/com.drawelements.deqp.testercore.DeqpInstrumentation"
                    .to_owned(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct HarnessConfigDeserialize {
    suite: SuiteConfigDeserialize,
    report: ReportConfigDeserialize,
    deqp: DeqpConfigDeserialize,
}

impl HarnessConfigDeserialize {
    fn into_config(self, root: Utf8PathBuf) -> HarnessConfig {
        let resolve = |path: Utf8PathBuf| {
            if path.is_absolute() {
                path
            } else {
                root.join(path)
            }
        };

        let suite = SuiteConfig {
            testcases_dir: resolve(self.suite.testcases_dir),
            abis: self.suite.abis,
            include_known_failures: self.suite.include_known_failures,
        };
        let report = ReportConfig {
            results_dir: resolve(self.report.results_dir),
            resources_dir: resolve(self.report.resources_dir),
            resource_files: self.report.resource_files,
            plan_name: self.report.plan_name,
            harness_version: self.report.harness_version,
            device_info_package: self.report.device_info_package,
            archive: self.report.archive,
        };
        let deqp = DeqpConfig {
            case_list_file: self.deqp.case_list_file,
            log_file: self.deqp.log_file,
            instrumentation: self.deqp.instrumentation,
        };

        HarnessConfig {
            root,
            suite,
            report,
            deqp,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct SuiteConfigDeserialize {
    testcases_dir: Utf8PathBuf,
    abis: Vec<Abi>,
    include_known_failures: bool,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ReportConfigDeserialize {
    results_dir: Utf8PathBuf,
    resources_dir: Utf8PathBuf,
    resource_files: Vec<String>,
    plan_name: String,
    harness_version: String,
    device_info_package: String,
    archive: bool,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct DeqpConfigDeserialize {
    case_list_file: String,
    log_file: String,
    instrumentation: String,
}
