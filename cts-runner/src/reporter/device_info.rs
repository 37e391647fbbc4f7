// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Device and host metadata for the result document.

use cts_result_xml::{DeviceInfo, Feature, HostInfo, Process, Screen};
use indexmap::IndexMap;
use tracing::debug;

static SCREEN_WIDTH: &str = "screen_width";
static SCREEN_HEIGHT: &str = "screen_height";
static SCREEN_DENSITY: &str = "screen_density";
static SCREEN_DENSITY_BUCKET: &str = "screen_density_bucket";
static SCREEN_SIZE: &str = "screen_size";
static PHONE_NUMBER: &str = "phoneNumber";
static FEATURES: &str = "features";
static PROCESSES: &str = "processes";

/// Builds the device info section out of the run metrics of the device info package.
///
/// Metrics with dedicated elements are extracted; every other metric is written to `BuildInfo`
/// as-is.
pub fn device_info_from_metrics(metrics: &IndexMap<String, String>, device_id: &str) -> DeviceInfo {
    let mut remaining = metrics.clone();
    let mut take = |key: &str| remaining.shift_remove(key);

    let screen = Screen {
        width: take(SCREEN_WIDTH),
        height: take(SCREEN_HEIGHT),
        density: take(SCREEN_DENSITY),
        density_bucket: take(SCREEN_DENSITY_BUCKET),
        size: take(SCREEN_SIZE),
    };
    let subscriber_id = take(PHONE_NUMBER);
    let features = take(FEATURES).map_or_else(Vec::new, |data| Feature::parse_list(&data));
    let processes = take(PROCESSES).map_or_else(Vec::new, |data| Process::parse_list(&data));

    DeviceInfo {
        screen,
        subscriber_id,
        build_info: remaining,
        device_id: device_id.to_owned(),
        features,
        processes,
    }
}

/// Collects information about the host the harness is running on.
pub fn current_host_info(harness_version: &str) -> HostInfo {
    let hostname = whoami::fallible::hostname().unwrap_or_else(|error| {
        debug!("unable to determine hostname: {error}");
        String::new()
    });
    HostInfo {
        hostname,
        os_name: std::env::consts::OS.to_owned(),
        os_version: whoami::distro(),
        os_arch: std::env::consts::ARCH.to_owned(),
        runtime_name: env!("CARGO_PKG_NAME").to_owned(),
        runtime_version: env!("CARGO_PKG_VERSION").to_owned(),
        harness_version: harness_version.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn extracts_dedicated_metrics() {
        let metrics: IndexMap<String, String> = [
            ("screen_width", "1080"),
            ("build_model", "Pixel"),
            ("screen_height", "1920"),
            ("screen_density", "420"),
            ("screen_density_bucket", "xxhdpi"),
            ("phoneNumber", "5551234"),
            ("features", "android.hardware.camera:sdk:true;android.software.vr:sdk:false;"),
            ("processes", "surfaceflinger; vold;;"),
            ("build_fingerprint", "google/pixel/1"),
        ]
        .into_iter()
        .map(|(key, value)| (key.to_owned(), value.to_owned()))
        .collect();

        let info = device_info_from_metrics(&metrics, "emulator-5554");
        assert_eq!(info.screen.resolution(), "1080x1920");
        assert_eq!(info.screen.density.as_deref(), Some("420"));
        assert_eq!(info.screen.size, None);
        assert_eq!(info.subscriber_id.as_deref(), Some("5551234"));
        assert_eq!(info.device_id, "emulator-5554");
        assert_eq!(
            info.build_info.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["build_model", "build_fingerprint"]
        );
        assert_eq!(info.features.len(), 2);
        assert_eq!(info.features[1].available, "false");
        assert_eq!(
            info.processes.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
            vec!["surfaceflinger", "vold"]
        );
    }

    #[test]
    fn host_info_describes_this_host() {
        let info = current_host_info("ICS_tradefed");
        assert_eq!(info.os_arch, std::env::consts::ARCH);
        assert_eq!(info.runtime_name, "cts-runner");
        assert_eq!(info.harness_version, "ICS_tradefed");
    }
}
