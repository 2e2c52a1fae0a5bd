//! Best-effort scalar readers over a device's sysfs directory.
//!
//! Every reader resolves a missing, unreadable or malformed file to a
//! documented default. The reason is kept in [`Absence`] long enough to be
//! logged and is then dropped.

use blkreport_core::Rotational;
use lazy_regex::regex_is_match;
use std::fs;
use std::io;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

pub const MODEL: &str = "device/model";
pub const SIZE: &str = "size";
pub const HW_SECTOR_SIZE: &str = "queue/hw_sector_size";
pub const ROTATIONAL: &str = "queue/rotational";
pub const REMOVABLE: &str = "removable";
pub const START: &str = "start";
pub const HOLDERS: &str = "holders";
pub const DM_NAME: &str = "dm/name";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Absence {
    NotFound,
    PermissionDenied,
    Io(io::ErrorKind),
    Malformed(String),
}

impl From<io::ErrorKind> for Absence {
    fn from(kind: io::ErrorKind) -> Self {
        match kind {
            io::ErrorKind::NotFound => Absence::NotFound,
            io::ErrorKind::PermissionDenied => Absence::PermissionDenied,
            other => Absence::Io(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scalar {
    Value(String),
    Absent(Absence),
}

impl Scalar {
    pub fn into_value(self) -> Option<String> {
        match self {
            Scalar::Value(value) => Some(value),
            Scalar::Absent(_) => None,
        }
    }

    pub fn parse<T: FromStr>(self) -> Result<T, Absence> {
        match self {
            Scalar::Value(value) => value.parse::<T>().map_err(|_| Absence::Malformed(value)),
            Scalar::Absent(reason) => Err(reason),
        }
    }
}

/// Reads `dir/relative` and trims surrounding whitespace.
pub fn read_scalar(dir: &Path, relative: &str) -> Scalar {
    match fs::read_to_string(dir.join(relative)) {
        Ok(raw) => Scalar::Value(raw.trim().to_string()),
        Err(err) => Scalar::Absent(err.kind().into()),
    }
}

fn read_field(dir: &Path, relative: &str) -> Option<String> {
    match read_scalar(dir, relative) {
        Scalar::Value(value) => Some(value),
        Scalar::Absent(reason) => {
            debug!(dir = %dir.display(), field = relative, ?reason, "sysfs field unavailable");
            None
        }
    }
}

fn read_number<T: FromStr>(dir: &Path, relative: &str) -> Option<T> {
    match read_scalar(dir, relative).parse::<T>() {
        Ok(value) => Some(value),
        Err(reason) => {
            debug!(dir = %dir.display(), field = relative, ?reason, "sysfs field unavailable");
            None
        }
    }
}

pub fn read_model(dir: &Path) -> String {
    read_field(dir, MODEL).unwrap_or_default()
}

/// Count of 512-byte sectors, `0` when unreadable.
pub fn read_sectors(dir: &Path) -> u64 {
    read_number(dir, SIZE).unwrap_or(0)
}

pub fn read_sector_size(dir: &Path) -> Option<u32> {
    read_number(dir, HW_SECTOR_SIZE)
}

pub fn read_rotational(dir: &Path) -> Rotational {
    Rotational::from_flag(read_field(dir, ROTATIONAL).as_deref())
}

pub fn read_removable(dir: &Path) -> bool {
    read_field(dir, REMOVABLE).as_deref() == Some("1")
}

pub fn read_start(dir: &Path) -> Option<u64> {
    read_number(dir, START)
}

/// Lists `holders/`, showing device-mapper holders by their mapped name.
pub fn read_holders(dir: &Path) -> Vec<String> {
    let holders_dir = dir.join(HOLDERS);
    let entries = match fs::read_dir(&holders_dir) {
        Ok(entries) => entries,
        Err(err) => {
            debug!(dir = %holders_dir.display(), error = %err, "no holders directory");
            return Vec::new();
        }
    };
    let mut names: Vec<String> = entries
        .flatten()
        .map(|entry| entry.file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
        .into_iter()
        .map(|name| holder_display_name(&holders_dir, name))
        .collect()
}

fn holder_display_name(holders_dir: &Path, entry: String) -> String {
    if !regex_is_match!(r"^dm-\d+$", &entry) {
        return entry;
    }
    match read_field(&holders_dir.join(&entry), DM_NAME) {
        Some(name) if !name.is_empty() => name,
        _ => entry,
    }
}
