use crate::error::{Error, Result};
use crate::pci::{resolve_host, PciTable};
use crate::sysfs;
use blkreport_core::{Partition, WholeDevice};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const DEFAULT_BLOCK_ROOT: &str = "/sys/block";

#[derive(Debug, Clone, Default)]
pub struct DiscoveryOptions {
    /// Warn and skip a top-level entry that is not a resolvable link
    /// instead of failing the whole run.
    pub skip_unresolved: bool,
}

/// Walks `root` (normally `/sys/block`) and populates every non-virtual
/// device, sorted by entry name.
pub fn discover(root: &Path, pci: &PciTable, options: &DiscoveryOptions) -> Result<Vec<WholeDevice>> {
    let entries = fs::read_dir(root).map_err(|source| Error::ReadBlockRoot {
        path: root.to_path_buf(),
        source,
    })?;
    let mut names: Vec<String> = entries
        .flatten()
        .map(|entry| entry.file_name().to_string_lossy().to_string())
        .collect();
    names.sort();

    let mut devices = Vec::new();
    for name in names {
        let link = root.join(&name);
        let target = match fs::read_link(&link) {
            Ok(target) => target,
            Err(source) if options.skip_unresolved => {
                warn!(path = %link.display(), error = %source, "skipping unresolvable block entry");
                continue;
            }
            Err(source) => return Err(Error::UnresolvedLink { path: link, source }),
        };
        if is_virtual(&target) {
            debug!(device = %name, target = %target.display(), "skipping virtual device");
            continue;
        }
        let sys_dir = resolve_sys_dir(root, &target);
        devices.push(populate_whole_device(sys_dir, pci));
    }
    info!(root = %root.display(), devices = devices.len(), "block device discovery finished");
    Ok(devices)
}

fn resolve_sys_dir(root: &Path, target: &Path) -> PathBuf {
    let joined = root.join(target);
    match fs::canonicalize(&joined) {
        Ok(path) => path,
        Err(err) => {
            warn!(path = %joined.display(), error = %err, "block device link target missing");
            joined
        }
    }
}

/// Only the link target counts; the location of the block root does not.
fn is_virtual(target: &Path) -> bool {
    target.to_string_lossy().contains("virtual")
}

/// Fills a whole device in fixed order: name, holders, partitions,
/// removable, model, sectors, sector size, rotational, host.
pub fn populate_whole_device(sys_dir: PathBuf, pci: &PciTable) -> WholeDevice {
    let mut device = WholeDevice::new(sys_dir);
    let dir = device.info.sys_dir.clone();
    device.info.holders = sysfs::read_holders(&dir);
    device.partitions = partition_names(&dir, device.name())
        .into_iter()
        .map(|name| populate_partition(dir.join(name)))
        .collect();
    device.removable = sysfs::read_removable(&dir);
    device.model = sysfs::read_model(&dir);
    device.info.set_sectors(sysfs::read_sectors(&dir));
    device.sector_size = sysfs::read_sector_size(&dir);
    device.rotational = sysfs::read_rotational(&dir);
    device.host = resolve_host(&dir, pci);
    debug!(
        device = device.name(),
        partitions = device.partitions.len(),
        holders = device.info.holders.len(),
        "populated block device"
    );
    device
}

pub fn populate_partition(sys_dir: PathBuf) -> Partition {
    let mut partition = Partition::new(sys_dir);
    let dir = partition.info.sys_dir.clone();
    partition.info.holders = sysfs::read_holders(&dir);
    partition.info.set_sectors(sysfs::read_sectors(&dir));
    partition.start = sysfs::read_start(&dir);
    partition
}

fn partition_names(dir: &Path, disk_name: &str) -> Vec<String> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            debug!(dir = %dir.display(), error = %err, "cannot scan for partitions");
            return Vec::new();
        }
    };
    let mut names: Vec<String> = entries
        .flatten()
        .map(|entry| entry.file_name().to_string_lossy().to_string())
        .filter(|name| is_partition_name(name, disk_name))
        .collect();
    names.sort();
    names
}

/// `<disk><digits>` or `<disk>p<digits>` (nvme0n1p1, mmcblk0p2).
fn is_partition_name(entry: &str, disk_name: &str) -> bool {
    let Some(suffix) = entry.strip_prefix(disk_name) else {
        return false;
    };
    let digits = suffix.strip_prefix('p').unwrap_or(suffix);
    !digits.is_empty() && digits.bytes().all(|byte| byte.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::Fixture;
    use blkreport_core::Rotational;

    const SDA_DIR: &str = "devices/pci0000:00/0000:00:1f.2/host0/target0:0:0/0:0:0:0/block/sda";
    const NVME_DIR: &str = "devices/pci0000:00/0000:00:1d.0/0000:01:00.0/nvme/nvme0/nvme0n1";

    fn sata_fixture() -> Fixture {
        let fixture = Fixture::new();
        fixture.link_block("sda", SDA_DIR);
        fixture.write(&format!("{SDA_DIR}/device/model"), "Fake Disk\n");
        fixture.write(&format!("{SDA_DIR}/size"), "1000\n");
        fixture.write(&format!("{SDA_DIR}/sda1/start"), "2048\n");
        fixture.write(&format!("{SDA_DIR}/sda1/size"), "900\n");
        fixture
    }

    #[test]
    fn discovers_disk_with_partition() {
        let fixture = sata_fixture();
        let devices = discover(&fixture.block_root(), &PciTable::default(), &DiscoveryOptions::default()).unwrap();

        assert_eq!(devices.len(), 1);
        let sda = &devices[0];
        assert_eq!(sda.name(), "sda");
        assert_eq!(sda.model, "Fake Disk");
        assert_eq!(sda.info.sectors, 1000);
        assert_eq!(sda.info.size_bytes, 512_000);
        assert_eq!(sda.partitions.len(), 1);
        assert_eq!(sda.partitions[0].name(), "sda1");
        assert_eq!(sda.partitions[0].start, Some(2048));
        assert_eq!(sda.partitions[0].info.sectors, 900);
    }

    #[test]
    fn absent_flags_resolve_to_defaults() {
        let fixture = sata_fixture();
        let devices = discover(&fixture.block_root(), &PciTable::default(), &DiscoveryOptions::default()).unwrap();

        let sda = &devices[0];
        assert_eq!(sda.rotational, Rotational::Unknown);
        assert!(!sda.removable);
        assert_eq!(sda.sector_size, None);
        assert!(sda.info.holders.is_empty());
        assert_eq!(sda.host, "");
    }

    #[test]
    fn host_resolves_from_pci_table() {
        let fixture = sata_fixture();
        let pci = PciTable::from_text("0000:00:1f.2  Fake SATA Controller\n");
        let devices = discover(&fixture.block_root(), &pci, &DiscoveryOptions::default()).unwrap();
        assert_eq!(devices[0].host, "Fake SATA Controller");

        let other = PciTable::from_text("0000:00:1f.3  Some Other Controller\n");
        let devices = discover(&fixture.block_root(), &other, &DiscoveryOptions::default()).unwrap();
        assert_eq!(devices[0].host, "");
    }

    #[test]
    fn virtual_devices_are_excluded() {
        let fixture = sata_fixture();
        fixture.link_block("loop0", "devices/virtual/block/loop0");
        fixture.write("devices/virtual/block/loop0/size", "0\n");

        let devices = discover(&fixture.block_root(), &PciTable::default(), &DiscoveryOptions::default()).unwrap();
        let names: Vec<&str> = devices.iter().map(|device| device.name()).collect();
        assert_eq!(names, vec!["sda"]);
    }

    #[test]
    fn block_root_location_does_not_make_devices_virtual() {
        let fixture = Fixture::with_prefix("virtualenv");
        fixture.link_block("sda", SDA_DIR);
        fixture.write(&format!("{SDA_DIR}/size"), "1000\n");
        fixture.link_block("loop0", "devices/virtual/block/loop0");

        let devices = discover(&fixture.block_root(), &PciTable::default(), &DiscoveryOptions::default()).unwrap();
        let names: Vec<&str> = devices.iter().map(|device| device.name()).collect();
        assert_eq!(names, vec!["sda"]);
    }

    #[test]
    fn unresolvable_entry_is_fatal_by_default() {
        let fixture = sata_fixture();
        fixture.mkdir("block/sdb");

        let err = discover(&fixture.block_root(), &PciTable::default(), &DiscoveryOptions::default()).unwrap_err();
        assert!(matches!(err, Error::UnresolvedLink { .. }));
    }

    #[test]
    fn unresolvable_entry_can_be_skipped() {
        let fixture = sata_fixture();
        fixture.mkdir("block/sdb");

        let options = DiscoveryOptions { skip_unresolved: true };
        let devices = discover(&fixture.block_root(), &PciTable::default(), &options).unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].name(), "sda");
    }

    #[test]
    fn missing_root_is_fatal() {
        let fixture = Fixture::new();
        let err = discover(&fixture.root.join("nope"), &PciTable::default(), &DiscoveryOptions::default()).unwrap_err();
        assert!(matches!(err, Error::ReadBlockRoot { .. }));
    }

    #[test]
    fn devices_and_partitions_are_sorted() {
        let fixture = sata_fixture();
        fixture.write(&format!("{SDA_DIR}/sda2/start"), "4096\n");
        fixture.link_block("nvme0n1", NVME_DIR);
        fixture.write(&format!("{NVME_DIR}/nvme0n1p2/start"), "2099200\n");
        fixture.write(&format!("{NVME_DIR}/nvme0n1p1/start"), "2048\n");
        fixture.mkdir(&format!("{NVME_DIR}/queue"));

        let devices = discover(&fixture.block_root(), &PciTable::default(), &DiscoveryOptions::default()).unwrap();
        let names: Vec<&str> = devices.iter().map(|device| device.name()).collect();
        assert_eq!(names, vec!["nvme0n1", "sda"]);
        let nvme_parts: Vec<&str> = devices[0].partitions.iter().map(|part| part.name()).collect();
        assert_eq!(nvme_parts, vec!["nvme0n1p1", "nvme0n1p2"]);
        let sda_parts: Vec<&str> = devices[1].partitions.iter().map(|part| part.name()).collect();
        assert_eq!(sda_parts, vec!["sda1", "sda2"]);
    }

    #[test]
    fn partition_holders_are_populated() {
        let fixture = sata_fixture();
        fixture.write(&format!("{SDA_DIR}/sda1/holders/dm-0/dm/name"), "vg-lv0\n");
        fixture.mkdir(&format!("{SDA_DIR}/holders/md127"));

        let devices = discover(&fixture.block_root(), &PciTable::default(), &DiscoveryOptions::default()).unwrap();
        assert_eq!(devices[0].info.holders, vec!["md127"]);
        assert_eq!(devices[0].partitions[0].info.holders, vec!["vg-lv0"]);
        assert!(devices[0].partitions[0].info.sys_dir.ends_with("sda/sda1"));
    }

    #[test]
    fn partition_name_matching() {
        assert!(is_partition_name("sda1", "sda"));
        assert!(is_partition_name("sda15", "sda"));
        assert!(is_partition_name("nvme0n1p3", "nvme0n1"));
        assert!(!is_partition_name("sda", "sda"));
        assert!(!is_partition_name("sdap", "sda"));
        assert!(!is_partition_name("sdb1", "sda"));
        assert!(!is_partition_name("queue", "sda"));
        assert!(!is_partition_name("sda1x", "sda"));
    }
}
