//! Block device inventory for Linux hosts, read from sysfs and annotated
//! with the PCI controller each disk sits behind.

pub mod discovery;
pub mod error;
pub mod host;
pub mod pci;
pub mod sysfs;

#[cfg(test)]
mod testutil;

pub use discovery::{discover, DiscoveryOptions, DEFAULT_BLOCK_ROOT};
pub use error::{Error, Result};
pub use host::collect_host_info;
pub use pci::{PciAddress, PciTable, DEFAULT_PCI_TOOL};

use blkreport_core::BlockInventory;
use std::path::Path;

/// Runs discovery under `root` and wraps the result with a host summary.
pub fn build_inventory(root: &Path, pci: &PciTable, options: &DiscoveryOptions) -> Result<BlockInventory> {
    let devices = discover(root, pci, options)?;
    Ok(BlockInventory::new(collect_host_info(), devices))
}
