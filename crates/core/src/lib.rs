use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use time::format_description::well_known::Rfc3339;
use uuid::Uuid;

pub const INVENTORY_SCHEMA_VERSION: &str = "1.0.0";

/// Sysfs reports `size` and `start` in 512-byte units regardless of the
/// hardware sector size.
pub const SYSFS_SECTOR_BYTES: u64 = 512;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BlockInventory {
    pub inventory_id: Uuid,
    pub schema_version: String,
    pub host: HostInfo,
    pub devices: Vec<WholeDevice>,
    pub generated_at_utc: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct HostInfo {
    pub os: String,
    pub os_version: String,
    pub kernel_release: String,
    pub hostname: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotational {
    SpinningDisk,
    SolidState,
    #[default]
    Unknown,
}

impl Rotational {
    /// Maps the raw `queue/rotational` value; `None` means the file was unreadable.
    pub fn from_flag(raw: Option<&str>) -> Self {
        match raw {
            Some("1") => Rotational::SpinningDisk,
            Some(_) => Rotational::SolidState,
            None => Rotational::Unknown,
        }
    }
}

impl fmt::Display for Rotational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rotational::SpinningDisk => write!(f, "Spinning disk"),
            Rotational::SolidState => write!(f, "SSD"),
            Rotational::Unknown => write!(f, "Could not determine rotational"),
        }
    }
}

/// Fields shared by whole devices and partitions.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct DeviceInfo {
    pub sys_dir: PathBuf,
    pub name: String,
    pub holders: Vec<String>,
    pub sectors: u64,
    #[serde(default)]
    pub size_bytes: u64,
}

impl DeviceInfo {
    /// The name is the trailing segment of `sys_dir`.
    pub fn new(sys_dir: impl Into<PathBuf>) -> Self {
        let sys_dir = sys_dir.into();
        let name = sys_dir
            .file_name()
            .map(|value| value.to_string_lossy().to_string())
            .unwrap_or_else(|| sys_dir.to_string_lossy().to_string());
        Self {
            sys_dir,
            name,
            holders: Vec::new(),
            sectors: 0,
            size_bytes: 0,
        }
    }

    /// Sets the sector count and the byte size derived from it.
    pub fn set_sectors(&mut self, sectors: u64) {
        self.sectors = sectors;
        self.size_bytes = sectors.saturating_mul(SYSFS_SECTOR_BYTES);
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct WholeDevice {
    #[serde(flatten)]
    pub info: DeviceInfo,
    pub model: String,
    pub sector_size: Option<u32>,
    pub rotational: Rotational,
    pub removable: bool,
    pub host: String,
    pub partitions: Vec<Partition>,
}

impl WholeDevice {
    pub fn new(sys_dir: impl Into<PathBuf>) -> Self {
        Self {
            info: DeviceInfo::new(sys_dir),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct Partition {
    #[serde(flatten)]
    pub info: DeviceInfo,
    pub start: Option<u64>,
}

impl Partition {
    pub fn new(sys_dir: impl Into<PathBuf>) -> Self {
        Self {
            info: DeviceInfo::new(sys_dir),
            start: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }
}

impl BlockInventory {
    pub fn new(host: HostInfo, devices: Vec<WholeDevice>) -> Self {
        Self {
            inventory_id: Uuid::new_v4(),
            schema_version: INVENTORY_SCHEMA_VERSION.to_string(),
            host,
            devices,
            generated_at_utc: now_utc_rfc3339(),
        }
    }
}

pub fn now_utc_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}
