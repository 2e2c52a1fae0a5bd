use anyhow::{Context, Result};
use blkreport_host_linux::{
    build_inventory, discover, DiscoveryOptions, PciTable, DEFAULT_BLOCK_ROOT, DEFAULT_PCI_TOOL,
};
use blkreport_report::{render_json, render_text};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing::{debug, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Lists block devices with their controller, geometry, partitions and holders
#[derive(Parser, Debug)]
#[command(name = "blkreport", version, about, long_about = None)]
struct Args {
    /// Directory of block device links
    #[arg(long, env = "BLKREPORT_BLOCK_ROOT", default_value = DEFAULT_BLOCK_ROOT)]
    block_root: PathBuf,

    /// PCI enumeration program, run without arguments
    #[arg(long, env = "BLKREPORT_LSPCI", default_value = DEFAULT_PCI_TOOL)]
    lspci: String,

    /// Do not run the PCI tool; host fields stay empty
    #[arg(long)]
    no_pci: bool,

    /// Warn and skip block entries that are not resolvable links
    #[arg(long)]
    skip_unresolved: bool,

    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Indent JSON output
    #[arg(long)]
    pretty: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "BLKREPORT_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, env = "BLKREPORT_LOG_JSON")]
    log_json: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args);
    debug!(?args, "starting");

    let pci = if args.no_pci {
        PciTable::default()
    } else {
        PciTable::load(&args.lspci).context("load PCI inventory")?
    };
    let options = DiscoveryOptions {
        skip_unresolved: args.skip_unresolved,
    };

    match args.format {
        Format::Text => {
            let devices = discover(&args.block_root, &pci, &options)
                .with_context(|| format!("discover block devices in {}", args.block_root.display()))?;
            print!("{}", render_text(&devices));
        }
        Format::Json => {
            let inventory = build_inventory(&args.block_root, &pci, &options)
                .with_context(|| format!("discover block devices in {}", args.block_root.display()))?;
            println!("{}", render_json(&inventory, args.pretty)?);
        }
    }
    Ok(())
}

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}
