use crate::sysfs::read_scalar;
use blkreport_core::HostInfo;
use std::fs;
use std::path::Path;

/// Summary of the machine the inventory was taken on. Every field is
/// best-effort and falls back to `"unknown"`.
pub fn collect_host_info() -> HostInfo {
    let (os, os_version) = fs::read_to_string("/etc/os-release")
        .map(|data| parse_os_release(&data))
        .unwrap_or_else(|_| (unknown(), String::new()));
    let kernel = Path::new("/proc/sys/kernel");
    HostInfo {
        os,
        os_version,
        kernel_release: read_scalar(kernel, "osrelease").into_value().unwrap_or_else(unknown),
        hostname: read_scalar(kernel, "hostname").into_value().unwrap_or_else(unknown),
    }
}

fn unknown() -> String {
    "unknown".to_string()
}

/// Returns `NAME` and `VERSION` from os-release text; the first occurrence
/// of each key wins.
pub fn parse_os_release(data: &str) -> (String, String) {
    let mut name = None;
    let mut version = None;
    for line in data.lines() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim().trim_matches('"').to_string();
        match key.trim() {
            "NAME" if name.is_none() => name = Some(value),
            "VERSION" if version.is_none() => version = Some(value),
            _ => {}
        }
    }
    (name.unwrap_or_else(unknown), version.unwrap_or_default())
}
