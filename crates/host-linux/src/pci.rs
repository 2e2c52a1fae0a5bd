use crate::error::{Error, Result};
use lazy_regex::regex_captures;
use regex::Regex;
use std::path::Path;
use std::process::Command;
use tracing::{debug, info};

pub const DEFAULT_PCI_TOOL: &str = "lspci";

/// Raw `lspci` output kept as one immutable lookup table.
#[derive(Debug, Clone, Default)]
pub struct PciTable {
    text: String,
}

impl PciTable {
    /// Runs `program` with no arguments and captures its standard output.
    pub fn load(program: &str) -> Result<Self> {
        let output = Command::new(program)
            .output()
            .map_err(|source| Error::PciToolUnavailable {
                program: program.to_string(),
                source,
            })?;
        if !output.status.success() {
            return Err(Error::PciToolFailed {
                program: program.to_string(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        let table = Self::from_text(String::from_utf8_lossy(&output.stdout));
        info!(program, entries = table.len(), "loaded PCI inventory");
        Ok(table)
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn len(&self) -> usize {
        self.text.lines().filter(|line| !line.trim().is_empty()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Description on the first line whose leading field is exactly `bus_id`.
    pub fn find(&self, bus_id: &str) -> Option<&str> {
        let pattern = format!(r"(?m)^{}[ \t]+(.*)$", regex::escape(bus_id));
        let re = Regex::new(&pattern).ok()?;
        re.captures(&self.text)
            .and_then(|captures| captures.get(1))
            .map(|found| found.as_str().trim())
    }

    /// Tries the full address first, then, for domain 0 only, the
    /// domain-less form `lspci` prints by default.
    pub fn describe(&self, address: &PciAddress) -> Option<&str> {
        self.find(&address.full()).or_else(|| {
            if address.is_primary_domain() {
                self.find(&address.slot)
            } else {
                None
            }
        })
    }
}

/// `domain:bus:device.function` of the controller a SCSI host hangs off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PciAddress {
    pub domain: String,
    pub slot: String,
}

impl PciAddress {
    /// Picks the address from the last `/<domain>:<bus>:<dev>.<fn>/host<N>/`
    /// run in a sysfs device path.
    pub fn from_sys_dir(sys_dir: &Path) -> Option<Self> {
        let path = sys_dir.to_string_lossy();
        let Some((_, domain, slot)) = regex_captures!(r"^.+/(\d+):(\w+:\w+\.\w)/host\d+/", &path)
        else {
            debug!(path = %path, "no PCI host in device path");
            return None;
        };
        Some(Self {
            domain: domain.to_string(),
            slot: slot.to_string(),
        })
    }

    pub fn is_primary_domain(&self) -> bool {
        self.domain.bytes().all(|byte| byte == b'0')
    }

    pub fn full(&self) -> String {
        format!("{}:{}", self.domain, self.slot)
    }
}

/// Controller description for a device, empty when none resolves.
pub fn resolve_host(sys_dir: &Path, pci: &PciTable) -> String {
    let Some(address) = PciAddress::from_sys_dir(sys_dir) else {
        return String::new();
    };
    match pci.describe(&address) {
        Some(description) => description.to_string(),
        None => {
            debug!(address = %address.full(), "PCI address not listed");
            String::new()
        }
    }
}
