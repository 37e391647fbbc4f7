// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::*;
use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use cts_metadata::{TestIdentifier, TestStatus};
use cts_runner::{
    config::HarnessConfig,
    deqp::DeqpTest,
    device::Device,
    package_def::{PackageRepository, SuiteDefinitionLoader},
    reporter::{ResultXmlReporter, RunResults, TestEvent, TestEventKind, TestEventSink},
};
use indexmap::IndexMap;
use pretty_assertions::assert_eq;
use std::{collections::BTreeSet, fs::File};

fn env(vars: &[(&str, &str)]) -> Vec<(String, String)> {
    vars.iter()
        .map(|(name, value)| ((*name).to_owned(), (*value).to_owned()))
        .collect()
}

fn start_time() -> DateTime<FixedOffset> {
    at(1_400_000_000)
}

fn at(secs: i64) -> DateTime<FixedOffset> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .expect("valid timestamp")
        .fixed_offset()
}

fn report_device_info(results: &mut RunResults) {
    let metrics: IndexMap<String, String> = [
        ("screen_width", "1080"),
        ("screen_height", "1920"),
        ("screen_density", "480"),
        ("screen_density_bucket", "xxhdpi"),
        ("screen_size", "normal"),
        ("build_model", "Nexus 5"),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_owned(), value.to_owned()))
    .collect();

    results.handle_event(TestEvent::now(TestEventKind::RunStarted {
        run_name: "android.tests.devicesetup".to_owned(),
        test_count: 0,
    }));
    results.handle_event(TestEvent::now(TestEventKind::RunEnded {
        elapsed: std::time::Duration::from_millis(10),
        metrics,
    }));
}

#[test]
fn load_suites_from_harness_root() {
    let root = HarnessRoot::new();
    let config = HarnessConfig::from_sources_with_env(
        root.path(),
        None,
        env(&[("CTS_HARNESS_SUITE__INCLUDE_KNOWN_FAILURES", "true")]),
    )
    .expect("config loaded");
    let layout = config.build_layout().expect("layout is valid");
    assert!(layout.results_dir().is_dir(), "results dir was created");

    let loader = SuiteDefinitionLoader::from_config(config.suite());
    let repo = PackageRepository::load_dir(layout.testcases_dir(), &loader)
        .expect("testcases dir loaded");

    assert_eq!(
        repo.package_names(),
        BTreeSet::from(["CtsAppTestCases", "CtsDeqpTestCases"])
    );

    let deqp = repo
        .get("arm64-v8a CtsDeqpTestCases")
        .expect("dEQP package fanned out to arm64-v8a");
    assert!(deqp.test_type().is_deqp());
    assert_eq!(deqp.tests().len(), 4, "known failures are included");

    assert_eq!(
        repo.find_package_ids_for_test("android.app.cts.ActivityTest"),
        BTreeSet::from(["armeabi-v7a CtsAppTestCases"])
    );
}

#[test]
fn deqp_run_to_archived_result() {
    let root = HarnessRoot::new();
    let config = HarnessConfig::from_sources_with_env(
        root.path(),
        None,
        env(&[("CTS_HARNESS_SUITE__ABIS", "arm64-v8a")]),
    )
    .expect("config loaded");
    let layout = config.build_layout().expect("layout is valid");
    let loader = SuiteDefinitionLoader::from_config(config.suite());
    let repo = PackageRepository::load_dir(layout.testcases_dir(), &loader)
        .expect("testcases dir loaded");

    let def = repo
        .get("arm64-v8a CtsDeqpTestCases")
        .expect("dEQP package loaded");
    let digest = def
        .compute_digest(layout.testcases_dir())
        .expect("digest computed")
        .expect("package has an artifact");
    assert_eq!(digest.len(), 64);

    let deqp = DeqpTest::for_package(def, Some(digest.as_str())).with_config(config.deqp().clone());
    assert_eq!(deqp.tests().len(), 3, "known failures are skipped by default");

    let mut device = ScriptedDevice {
        stream_output: deqp_session(&[
            ("dEQP-GLES3.info.vendor", "Pass"),
            ("dEQP-GLES3.info.renderer", "Fail"),
        ]),
        chunk_size: 37,
        ..Default::default()
    };
    let mut results = RunResults::new();
    report_device_info(&mut results);
    deqp.run(&mut device, &mut results).expect("run succeeded");

    assert_eq!(
        device.files.get(config.deqp().case_list_file()).map(String::as_str),
        Some("{dEQP-GLES3{info{vendor,renderer,version}}}\n"),
    );

    let run = results.find_run("dEQP-GLES3").expect("run recorded");
    assert!(run.is_complete());
    let status = |name: &str| {
        run.get(&TestIdentifier::new("dEQP-GLES3.info", name))
            .map(|outcome| outcome.status())
    };
    assert_eq!(status("vendor"), Some(TestStatus::Pass));
    assert_eq!(status("renderer"), Some(TestStatus::Error));
    assert_eq!(status("version"), Some(TestStatus::NotExecuted));

    let mut reporter = ResultXmlReporter::new(config.report(), &layout);
    let report_dir = reporter
        .invocation_started(start_time())
        .expect("result dir created")
        .to_owned();
    assert_eq!(report_dir.file_name(), Some("2014.05.13_16.53.20"));
    reporter.save_log("device_logcat", "txt", b"logcat output");

    let report_path = reporter
        .invocation_ended(&results, device.serial(), at(1_400_000_090))
        .expect("result written");
    assert_eq!(report_path, report_dir.join("testResult.xml"));

    let xml = std::fs::read_to_string(&report_path).expect("result document readable");
    assert!(xml.starts_with("<?xml"), "declaration present: {xml}");
    assert!(xml.contains(r#"href="cts_result.xsl""#), "stylesheet referenced");
    assert!(xml.contains(r#"testPlan="CTS""#));
    assert!(xml.contains(&format!(
        r#"<TestPackage name="CtsDeqpTestCases" appPackageName="dEQP-GLES3" abi="arm64-v8a" digest="{digest}">"#
    )));
    assert!(xml.contains(r#"<Test name="vendor" result="pass""#));
    assert!(xml.contains(r#"<Test name="renderer" result="fail""#));
    assert!(xml.contains(r#"<Test name="version" result="notExecuted""#));
    assert!(xml.contains(r#"deviceID="0123456789ABCDEF""#));
    assert!(xml.contains(r#"resolution="1080x1920""#));
    assert!(
        !xml.contains(r#"appPackageName="android.tests.devicesetup""#),
        "device info run is not a test package"
    );

    let summary_start = xml.find("<Summary ").expect("summary present");
    let summary_len = xml[summary_start..].find("/>").expect("summary closed");
    let summary = &xml[summary_start..summary_start + summary_len];
    for attr in [r#"failed="1""#, r#"notExecuted="1""#, r#"pass="1""#] {
        assert!(summary.contains(attr), "{attr} in {summary}");
    }

    for name in ["cts_result.xsl", "cts_result.css", "device_logcat.txt"] {
        assert!(report_dir.join(name).is_file(), "{name} in result dir");
    }

    let zip_path = layout.results_dir().join("2014.05.13_16.53.20.zip");
    let archive =
        zip::ZipArchive::new(File::open(&zip_path).expect("zip exists")).expect("zip readable");
    let entries: BTreeSet<&str> = archive.file_names().collect();
    for name in [
        "2014.05.13_16.53.20/",
        "2014.05.13_16.53.20/testResult.xml",
        "2014.05.13_16.53.20/cts_result.xsl",
        "2014.05.13_16.53.20/device_logcat.txt",
    ] {
        assert!(entries.contains(name), "{name} in {entries:?}");
    }
}

#[test]
fn invocation_must_start_before_ending() {
    let root = HarnessRoot::new();
    let config = HarnessConfig::from_sources_with_env(root.path(), None, Vec::new())
        .expect("config loaded");
    let layout = config.build_layout().expect("layout is valid");

    let mut reporter = ResultXmlReporter::new(config.report(), &layout);
    let error = reporter
        .invocation_ended(&RunResults::new(), "serial", start_time())
        .expect_err("invocation was never started");
    assert_eq!(error.to_string(), "result document written before the invocation was started");
}
