use anyhow::Result;
use blkreport_core::{BlockInventory, Partition, WholeDevice};
use std::fmt;

/// Tab-indented listing of devices, partitions and holders, in the order given.
pub struct TextReport<'a> {
    devices: &'a [WholeDevice],
}

impl<'a> TextReport<'a> {
    pub fn new(devices: &'a [WholeDevice]) -> Self {
        Self { devices }
    }
}

impl fmt::Display for TextReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for device in self.devices {
            write_device(f, device)?;
        }
        Ok(())
    }
}

fn write_device(f: &mut fmt::Formatter<'_>, device: &WholeDevice) -> fmt::Result {
    writeln!(f, "{}", device.name())?;
    writeln!(f, "\tHost: {}", device.host)?;
    writeln!(f, "\tModel: {}", device.model)?;
    writeln!(f, "\tSector size: {}", optional(device.sector_size))?;
    writeln!(f, "\tSectors: {}", device.info.sectors)?;
    writeln!(f, "\tRemovable: {}", if device.removable { "Yes" } else { "No" })?;
    writeln!(f, "\tDisk type: {}", device.rotational)?;
    write_holders(f, &device.info.holders, 1)?;
    if !device.partitions.is_empty() {
        writeln!(f, "\tPartitions:")?;
        for partition in &device.partitions {
            write_partition(f, partition)?;
        }
    }
    Ok(())
}

fn write_partition(f: &mut fmt::Formatter<'_>, partition: &Partition) -> fmt::Result {
    writeln!(f, "\t\t{}", partition.name())?;
    writeln!(f, "\t\t\tStart: {}", optional(partition.start))?;
    writeln!(f, "\t\t\tSectors: {}", partition.info.sectors)?;
    write_holders(f, &partition.info.holders, 3)
}

fn write_holders(f: &mut fmt::Formatter<'_>, holders: &[String], depth: usize) -> fmt::Result {
    if holders.is_empty() {
        return Ok(());
    }
    let indent = "\t".repeat(depth);
    writeln!(f, "{indent}Holders:")?;
    for holder in holders {
        writeln!(f, "{indent}\t{holder}")?;
    }
    Ok(())
}

fn optional<T: ToString>(value: Option<T>) -> String {
    value.map(|value| value.to_string()).unwrap_or_default()
}

pub fn render_text(devices: &[WholeDevice]) -> String {
    TextReport::new(devices).to_string()
}

pub fn render_json(inventory: &BlockInventory, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(inventory)?
    } else {
        serde_json::to_string(inventory)?
    };
    Ok(json)
}
