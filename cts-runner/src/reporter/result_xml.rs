// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Writes the result document for an invocation.

use super::{RunResults, current_host_info, device_info_from_metrics};
use crate::{
    config::{BuildLayout, ReportConfig},
    deqp::{PACKAGE_ABI_METRIC, PACKAGE_DIGEST_METRIC, PACKAGE_NAME_METRIC},
    errors::{ArchiveError, WriteReportError},
};
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, FixedOffset};
use cts_result_xml::{Report, ResultTree, Summary, TestPackage};
use std::{
    fs::File,
    io::{self, BufWriter, Write},
};
use tracing::{info, warn};
use walkdir::WalkDir;
use zip::{CompressionMethod, ZipWriter, write::SimpleFileOptions};

/// The name of the result document within the result directory.
pub static RESULT_FILE_NAME: &str = "testResult.xml";

/// The `chrono` format of per-invocation result directory names, e.g. `2014.05.13_12.00.00`.
pub static RESULT_DIR_FORMAT: &str = "%Y.%m.%d_%H.%M.%S";

/// Writes `testResult.xml` and its supporting files for one invocation.
///
/// Each invocation gets its own timestamped directory under the results directory. Once the
/// invocation ends, the result document is written there along with presentation resources, and
/// the directory is archived into a sibling zip.
#[derive(Clone, Debug)]
pub struct ResultXmlReporter {
    config: ReportConfig,
    results_dir: Utf8PathBuf,
    started: Option<(Utf8PathBuf, DateTime<FixedOffset>)>,
}

impl ResultXmlReporter {
    /// Creates a new reporter writing under the layout's results directory.
    pub fn new(config: &ReportConfig, layout: &BuildLayout) -> Self {
        Self {
            config: config.clone(),
            results_dir: layout.results_dir().to_owned(),
            started: None,
        }
    }

    /// Starts an invocation, creating its result directory.
    pub fn invocation_started(
        &mut self,
        start_time: DateTime<FixedOffset>,
    ) -> Result<&Utf8Path, WriteReportError> {
        let report_dir = self
            .results_dir
            .join(start_time.format(RESULT_DIR_FORMAT).to_string());
        std::fs::create_dir_all(&report_dir).map_err(|error| WriteReportError::CreateDir {
            path: report_dir.clone(),
            error,
        })?;
        info!("using result directory {report_dir}");

        let (report_dir, _) = self.started.insert((report_dir, start_time));
        Ok(report_dir)
    }

    /// Returns the result directory of the current invocation, once it has started.
    pub fn report_dir(&self) -> Option<&Utf8Path> {
        self.started.as_ref().map(|(dir, _)| dir.as_path())
    }

    /// Saves a log attachment as `<name>.<ext>` in the result directory.
    ///
    /// Failures are logged and otherwise ignored.
    pub fn save_log(&self, name: &str, ext: &str, data: &[u8]) {
        let Some(report_dir) = self.report_dir() else {
            warn!("not saving log {name}: invocation not started");
            return;
        };
        let path = report_dir.join(format!("{name}.{ext}"));
        if let Err(error) = std::fs::write(&path, data) {
            warn!("failed to write log {path}: {error}");
        }
    }

    /// Builds the report for `results` without writing anything.
    ///
    /// The device info package only contributes the device info section. Every other run becomes
    /// a `TestPackage`.
    pub fn build_report<'a>(
        &self,
        results: &'a RunResults,
        device_serial: &str,
        start_time: DateTime<FixedOffset>,
        end_time: DateTime<FixedOffset>,
    ) -> Result<Report<'a>, WriteReportError> {
        let mut report = Report::new(
            self.config.plan_name(),
            start_time,
            end_time,
            current_host_info(self.config.harness_version()),
        );

        let device_info_package = self.config.device_info_package();
        match results.find_run(device_info_package) {
            Some(run) => {
                report.set_device_info(device_info_from_metrics(run.run_metrics(), device_serial));
            }
            None => warn!("could not find device info run {device_info_package}"),
        }

        let mut summary = Summary::default();
        for run in results.runs() {
            if run.name() == device_info_package {
                continue;
            }
            let tree = ResultTree::build(run.results()).map_err(|error| {
                WriteReportError::DuplicateTest {
                    package: run.name().to_owned(),
                    error,
                }
            })?;
            summary.add(&run.summary());
            report.add_test_package(TestPackage {
                name: run.metric(PACKAGE_NAME_METRIC).unwrap_or_default().to_owned(),
                app_package_name: run.name().to_owned(),
                abi: run.metric(PACKAGE_ABI_METRIC).map(str::to_owned),
                digest: run.metric(PACKAGE_DIGEST_METRIC).map(str::to_owned),
                tree,
            });
        }
        report.summary = summary;

        Ok(report)
    }

    /// Ends the invocation: writes the result document, copies presentation resources next to it
    /// and archives the result directory.
    ///
    /// Returns the path to the result document. Copying resources and archiving are best-effort.
    pub fn invocation_ended(
        &mut self,
        results: &RunResults,
        device_serial: &str,
        end_time: DateTime<FixedOffset>,
    ) -> Result<Utf8PathBuf, WriteReportError> {
        let (report_dir, start_time) = self
            .started
            .clone()
            .ok_or(WriteReportError::NotStarted)?;

        let report = self.build_report(results, device_serial, start_time, end_time)?;
        let report_path = report_dir.join(RESULT_FILE_NAME);
        write_report(&report, &report_path)?;

        let elapsed = end_time - start_time;
        info!(
            "XML test result file generated at {report_path}. Passed {}, Failed {}, Not Executed {}",
            report.summary.pass,
            report.summary.failed(),
            report.summary.not_executed,
        );
        info!("Time: {}s", elapsed.num_milliseconds() as f64 / 1000.0);

        self.copy_resources(&report_dir);
        if self.config.archive() {
            match archive_dir(&report_dir) {
                Ok(zip_path) => info!("archived results to {zip_path}"),
                Err(error) => warn!("failed to create zip for {report_dir}: {error}"),
            }
        }

        Ok(report_path)
    }

    fn copy_resources(&self, report_dir: &Utf8Path) {
        for file_name in self.config.resource_files() {
            let source = self.config.resources_dir().join(file_name);
            if !source.is_file() {
                warn!("failed to load resource {source}");
                continue;
            }
            if let Err(error) = std::fs::copy(&source, report_dir.join(file_name)) {
                warn!("failed to write {file_name} to result directory: {error}");
            }
        }
    }
}

fn write_report(report: &Report<'_>, path: &Utf8Path) -> Result<(), WriteReportError> {
    let file = File::create(path).map_err(|error| WriteReportError::Create {
        path: path.to_owned(),
        error,
    })?;
    let mut writer = BufWriter::new(file);
    report
        .serialize(&mut writer)
        .map_err(|error| WriteReportError::Serialize {
            path: path.to_owned(),
            error,
        })?;
    writer.flush().map_err(|error| WriteReportError::Write {
        path: path.to_owned(),
        error,
    })
}

/// Zips `dir` into `<dir>.zip` beside it. Entries are prefixed with the directory's name.
fn archive_dir(dir: &Utf8Path) -> Result<Utf8PathBuf, ArchiveError> {
    let dir_name = dir.file_name().unwrap_or("results");
    let zip_path = dir.with_file_name(format!("{dir_name}.zip"));
    let io_error = |path: &Utf8Path| {
        let path = path.to_owned();
        move |error: io::Error| ArchiveError::Io { path, error }
    };
    let zip_error = |error| ArchiveError::Zip {
        path: zip_path.clone(),
        error,
    };

    let file = File::create(&zip_path).map_err(io_error(&zip_path))?;
    let mut writer = ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|error| ArchiveError::Walk {
            path: dir.to_owned(),
            error,
        })?;
        let path = Utf8PathBuf::try_from(entry.path().to_path_buf())
            .map_err(|error| io_error(dir)(error.into_io_error()))?;
        let Ok(relative) = path.strip_prefix(dir) else {
            continue;
        };

        let mut name = dir_name.to_owned();
        for component in relative.components() {
            name.push('/');
            name.push_str(component.as_str());
        }

        if entry.file_type().is_dir() {
            writer
                .add_directory(format!("{name}/"), options)
                .map_err(zip_error)?;
        } else {
            writer.start_file(name, options).map_err(zip_error)?;
            let mut source = File::open(&path).map_err(io_error(&path))?;
            io::copy(&mut source, &mut writer).map_err(io_error(&path))?;
        }
    }

    let mut inner = writer.finish().map_err(zip_error)?;
    inner.flush().map_err(io_error(&zip_path))?;
    Ok(zip_path)
}
