// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Serialize a `Report`.

use crate::{
    CaseNode, DeviceInfo, ExecutionOutcome, HostInfo, Report, ResultTree, SuiteNode, Summary,
    TestPackage, format_timestamp, report::RESULT_FILE_VERSION,
};
use quick_xml::{
    Writer,
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
};
use std::io::{self, Write};

static STYLESHEET_PI: &str = r#"xml-stylesheet type="text/xsl"  href="cts_result.xsl""#;

static TEST_RESULT_TAG: &str = "TestResult";
static DEVICE_INFO_TAG: &str = "DeviceInfo";
static SCREEN_TAG: &str = "Screen";
static PHONE_SUB_INFO_TAG: &str = "PhoneSubInfo";
static BUILD_INFO_TAG: &str = "BuildInfo";
static FEATURE_INFO_TAG: &str = "FeatureInfo";
static FEATURE_TAG: &str = "Feature";
static PROCESS_INFO_TAG: &str = "ProcessInfo";
static PROCESS_TAG: &str = "Process";
static HOST_INFO_TAG: &str = "HostInfo";
static OS_TAG: &str = "Os";
// The schema fixes this element name regardless of the host runtime.
static RUNTIME_TAG: &str = "Java";
static HARNESS_TAG: &str = "Cts";
static SUMMARY_TAG: &str = "Summary";
static TEST_PACKAGE_TAG: &str = "TestPackage";
static TEST_SUITE_TAG: &str = "TestSuite";
static TEST_CASE_TAG: &str = "TestCase";
static TEST_TAG: &str = "Test";
static FAILED_SCENE_TAG: &str = "FailedScene";
static STACK_TRACE_TAG: &str = "StackTrace";

pub(crate) fn serialize_report(report: &Report<'_>, writer: impl io::Write) -> quick_xml::Result<()> {
    let mut writer = Writer::new_with_indent(writer, b' ', 4);

    let decl = BytesDecl::new("1.0", Some("UTF-8"), None);
    writer.write_event(Event::Decl(decl))?;
    writer.write_event(Event::PI(BytesText::from_escaped(STYLESHEET_PI)))?;

    serialize_report_impl(report, &mut writer)?;

    // Add a trailing newline.
    writer.get_mut().write_all(b"\n")?;
    Ok(())
}

fn serialize_report_impl(
    report: &Report<'_>,
    writer: &mut Writer<impl io::Write>,
) -> quick_xml::Result<()> {
    // Use the destructuring syntax to ensure that all fields are handled.
    let Report {
        test_plan,
        start_time,
        end_time,
        device_info,
        host_info,
        summary,
        test_packages,
    } = report;

    let mut test_result_tag = BytesStart::new(TEST_RESULT_TAG);
    test_result_tag.push_attribute(("testPlan", test_plan.as_str()));
    test_result_tag.push_attribute(("starttime", format_timestamp(start_time).as_str()));
    test_result_tag.push_attribute(("endtime", format_timestamp(end_time).as_str()));
    test_result_tag.push_attribute(("version", RESULT_FILE_VERSION));
    writer.write_event(Event::Start(test_result_tag))?;

    match device_info {
        Some(device_info) => serialize_device_info(device_info, writer)?,
        None => writer.write_event(Event::Empty(BytesStart::new(DEVICE_INFO_TAG)))?,
    }
    serialize_host_info(host_info, writer)?;
    serialize_summary(summary, writer)?;

    for package in test_packages {
        serialize_test_package(package, writer)?;
    }

    serialize_end_tag(TEST_RESULT_TAG, writer)?;
    Ok(())
}

fn serialize_device_info(
    device_info: &DeviceInfo,
    writer: &mut Writer<impl io::Write>,
) -> quick_xml::Result<()> {
    let DeviceInfo {
        screen,
        subscriber_id,
        build_info,
        device_id,
        features,
        processes,
    } = device_info;

    serialize_empty_start_tag(DEVICE_INFO_TAG, writer)?;

    let mut screen_tag = BytesStart::new(SCREEN_TAG);
    screen_tag.push_attribute(("resolution", screen.resolution().as_str()));
    for (key, value) in [
        ("screen_density", &screen.density),
        ("screen_density_bucket", &screen.density_bucket),
        ("screen_size", &screen.size),
    ] {
        if let Some(value) = value {
            screen_tag.push_attribute((key, value.as_str()));
        }
    }
    writer.write_event(Event::Empty(screen_tag))?;

    let mut phone_tag = BytesStart::new(PHONE_SUB_INFO_TAG);
    if let Some(subscriber_id) = subscriber_id {
        phone_tag.push_attribute(("subscriberId", subscriber_id.as_str()));
    }
    writer.write_event(Event::Empty(phone_tag))?;

    let mut build_tag = BytesStart::new(BUILD_INFO_TAG);
    for (key, value) in build_info {
        build_tag.push_attribute((key.as_str(), value.as_str()));
    }
    build_tag.push_attribute(("deviceID", device_id.as_str()));
    writer.write_event(Event::Empty(build_tag))?;

    serialize_empty_start_tag(FEATURE_INFO_TAG, writer)?;
    for feature in features {
        let mut feature_tag = BytesStart::new(FEATURE_TAG);
        feature_tag.push_attribute(("name", feature.name.as_str()));
        feature_tag.push_attribute(("type", feature.feature_type.as_str()));
        feature_tag.push_attribute(("available", feature.available.as_str()));
        writer.write_event(Event::Empty(feature_tag))?;
    }
    serialize_end_tag(FEATURE_INFO_TAG, writer)?;

    serialize_empty_start_tag(PROCESS_INFO_TAG, writer)?;
    for process in processes {
        let mut process_tag = BytesStart::new(PROCESS_TAG);
        process_tag.push_attribute(("name", process.name.as_str()));
        process_tag.push_attribute(("uid", process.uid.to_string().as_str()));
        writer.write_event(Event::Empty(process_tag))?;
    }
    serialize_end_tag(PROCESS_INFO_TAG, writer)?;

    serialize_end_tag(DEVICE_INFO_TAG, writer)?;
    Ok(())
}

fn serialize_host_info(
    host_info: &HostInfo,
    writer: &mut Writer<impl io::Write>,
) -> quick_xml::Result<()> {
    let HostInfo {
        hostname,
        os_name,
        os_version,
        os_arch,
        runtime_name,
        runtime_version,
        harness_version,
    } = host_info;

    let mut host_tag = BytesStart::new(HOST_INFO_TAG);
    host_tag.push_attribute(("name", hostname.as_str()));
    writer.write_event(Event::Start(host_tag))?;

    let mut os_tag = BytesStart::new(OS_TAG);
    os_tag.push_attribute(("name", os_name.as_str()));
    os_tag.push_attribute(("version", os_version.as_str()));
    os_tag.push_attribute(("arch", os_arch.as_str()));
    writer.write_event(Event::Empty(os_tag))?;

    let mut runtime_tag = BytesStart::new(RUNTIME_TAG);
    runtime_tag.push_attribute(("name", runtime_name.as_str()));
    runtime_tag.push_attribute(("version", runtime_version.as_str()));
    writer.write_event(Event::Empty(runtime_tag))?;

    let mut harness_tag = BytesStart::new(HARNESS_TAG);
    harness_tag.push_attribute(("version", harness_version.as_str()));
    writer.write_event(Event::Empty(harness_tag))?;

    serialize_end_tag(HOST_INFO_TAG, writer)?;
    Ok(())
}

fn serialize_summary(summary: &Summary, writer: &mut Writer<impl io::Write>) -> quick_xml::Result<()> {
    let mut summary_tag = BytesStart::new(SUMMARY_TAG);
    summary_tag.push_attribute(("failed", summary.failed().to_string().as_str()));
    summary_tag.push_attribute(("notExecuted", summary.not_executed.to_string().as_str()));
    // Timeouts are reported as failures, so this is always zero.
    summary_tag.push_attribute(("timeout", "0"));
    summary_tag.push_attribute(("pass", summary.pass.to_string().as_str()));
    writer.write_event(Event::Empty(summary_tag))?;
    Ok(())
}

fn serialize_test_package(
    package: &TestPackage<'_>,
    writer: &mut Writer<impl io::Write>,
) -> quick_xml::Result<()> {
    let TestPackage {
        name,
        app_package_name,
        abi,
        digest,
        tree,
    } = package;

    let mut package_tag = BytesStart::new(TEST_PACKAGE_TAG);
    package_tag.push_attribute(("name", name.as_str()));
    package_tag.push_attribute(("appPackageName", app_package_name.as_str()));
    if let Some(abi) = abi {
        package_tag.push_attribute(("abi", abi.as_str()));
    }
    if let Some(digest) = digest {
        package_tag.push_attribute(("digest", digest.as_str()));
    }

    if tree.test_count() == 0 {
        writer.write_event(Event::Empty(package_tag))?;
        return Ok(());
    }
    writer.write_event(Event::Start(package_tag))?;
    serialize_tree(tree, writer)?;
    serialize_end_tag(TEST_PACKAGE_TAG, writer)?;
    Ok(())
}

fn serialize_tree(tree: &ResultTree<'_>, writer: &mut Writer<impl io::Write>) -> quick_xml::Result<()> {
    serialize_suite_contents(tree.root(), writer)
}

fn serialize_suite_contents(
    suite: &SuiteNode<'_>,
    writer: &mut Writer<impl io::Write>,
) -> quick_xml::Result<()> {
    for (name, child) in suite.suites() {
        let mut suite_tag = BytesStart::new(TEST_SUITE_TAG);
        suite_tag.push_attribute(("name", name));
        writer.write_event(Event::Start(suite_tag))?;
        serialize_suite_contents(child, writer)?;
        serialize_end_tag(TEST_SUITE_TAG, writer)?;
    }
    for case in suite.cases() {
        serialize_case(case, writer)?;
    }
    Ok(())
}

fn serialize_case(case: &CaseNode<'_>, writer: &mut Writer<impl io::Write>) -> quick_xml::Result<()> {
    let mut case_tag = BytesStart::new(TEST_CASE_TAG);
    case_tag.push_attribute(("name", case.name()));
    writer.write_event(Event::Start(case_tag))?;
    for (name, outcome) in case.tests() {
        serialize_test(name, outcome, writer)?;
    }
    serialize_end_tag(TEST_CASE_TAG, writer)?;
    Ok(())
}

fn serialize_test(
    name: &str,
    outcome: &ExecutionOutcome,
    writer: &mut Writer<impl io::Write>,
) -> quick_xml::Result<()> {
    let mut test_tag = BytesStart::new(TEST_TAG);
    test_tag.push_attribute(("name", name));
    test_tag.push_attribute(("result", outcome.status().report_value()));
    test_tag.push_attribute(("starttime", format_timestamp(&outcome.start_time()).as_str()));
    test_tag.push_attribute(("endtime", format_timestamp(&outcome.end_time()).as_str()));

    let Some(message) = outcome.message() else {
        writer.write_event(Event::Empty(test_tag))?;
        return Ok(());
    };

    writer.write_event(Event::Start(test_tag))?;
    let mut scene_tag = BytesStart::new(FAILED_SCENE_TAG);
    scene_tag.push_attribute(("message", message));
    match outcome.stack_trace() {
        Some(stack_trace) => {
            writer.write_event(Event::Start(scene_tag))?;
            serialize_empty_start_tag(STACK_TRACE_TAG, writer)?;
            writer.write_event(Event::Text(BytesText::new(stack_trace)))?;
            serialize_end_tag(STACK_TRACE_TAG, writer)?;
            serialize_end_tag(FAILED_SCENE_TAG, writer)?;
        }
        None => writer.write_event(Event::Empty(scene_tag))?,
    }
    serialize_end_tag(TEST_TAG, writer)?;
    Ok(())
}

fn serialize_empty_start_tag(
    tag_name: &'static str,
    writer: &mut Writer<impl io::Write>,
) -> quick_xml::Result<()> {
    let tag = BytesStart::new(tag_name);
    writer.write_event(Event::Start(tag))
}

fn serialize_end_tag(
    tag_name: &'static str,
    writer: &mut Writer<impl io::Write>,
) -> quick_xml::Result<()> {
    let end_tag = BytesEnd::new(tag_name);
    writer.write_event(Event::End(end_tag))
}
