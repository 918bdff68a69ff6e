//! `intel-reg` — register diagnostics for Intel i915 GPUs.
//!
//! ```text
//! USAGE:
//!   intel-reg list                       List Intel GPUs
//!   intel-reg info <dev>                 Platform, rings, display base
//!   intel-reg read <reg>...              Read registers
//!   intel-reg write <reg> <value>        Write one register (dangerous)
//!   intel-reg dump [--file <bar0>]       Dump the platform's register tables
//!   intel-reg decode <name|addr> <value> Decode a value offline
//!   intel-reg classify <reg>...          Display / non-display verdict
//! ```
//!
//! Register access maps BAR0 through sysfs and needs root. Set
//! `I915_PCI_ADDR` to pin a device; `RUST_LOG=debug` shows mapping details.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use i915_chip::tables::tables_for;
use i915_chip::{vlv, Platform};
use i915_driver::{
    decode_value, dump_table, parse_u32, pipe_clocks, GpuManager, MmioWindow, RegisterIo,
    Snapshot,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "intel-reg", about = "Intel i915 register tool", version)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// List Intel GPUs found in sysfs.
    List,
    /// Print platform details for one GPU.
    Info {
        /// PCI address (e.g. 0000:00:02.0) or device index (e.g. 0).
        #[arg(default_value = "0")]
        device: String,
    },
    /// Read one or more registers.
    Read {
        /// PCI address or device index.
        #[arg(short, long, default_value = "0")]
        device: String,
        /// Register offsets (hex with 0x, or decimal).
        #[arg(required = true, value_parser = parse_reg)]
        regs: Vec<u32>,
    },
    /// Write a register. Only for debugging.
    Write {
        /// PCI address or device index.
        #[arg(short, long, default_value = "0")]
        device: String,
        /// Register offset.
        #[arg(value_parser = parse_reg)]
        reg: u32,
        /// Value to write.
        #[arg(value_parser = parse_reg)]
        value: u32,
    },
    /// Dump the register tables for the platform.
    Dump {
        /// PCI address or device index.
        #[arg(short, long, default_value = "0")]
        device: String,
        /// Read from a captured BAR0 image instead of the hardware.
        #[arg(short, long)]
        file: Option<PathBuf>,
        /// PCI device id of the captured image (required with --file).
        #[arg(long, value_parser = parse_device_id, requires = "file")]
        device_id: Option<u16>,
    },
    /// Decode a value as a named register.
    Decode {
        /// Register name fragment or address.
        register: String,
        /// Register value.
        #[arg(value_parser = parse_reg)]
        value: u32,
        /// PCI device id selecting the platform (default: first GPU found).
        #[arg(long, value_parser = parse_device_id)]
        device_id: Option<u16>,
    },
    /// Show how offsets are classified on ValleyView.
    Classify {
        /// Register offsets.
        #[arg(required = true, value_parser = parse_reg)]
        regs: Vec<u32>,
    },
}

fn parse_reg(s: &str) -> std::result::Result<u32, String> {
    parse_u32(s).ok_or_else(|| format!("invalid number: {s}"))
}

fn parse_device_id(s: &str) -> std::result::Result<u16, String> {
    let hex = s.trim_start_matches("0x").trim_start_matches("0X");
    u16::from_str_radix(hex, 16).map_err(|e| format!("invalid device id {s}: {e}"))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Cmd::List => cmd_list()?,
        Cmd::Info { device } => cmd_info(&device)?,
        Cmd::Read { device, regs } => cmd_read(&device, &regs)?,
        Cmd::Write { device, reg, value } => cmd_write(&device, reg, value)?,
        Cmd::Dump {
            device,
            file,
            device_id,
        } => cmd_dump(&device, file, device_id)?,
        Cmd::Decode {
            register,
            value,
            device_id,
        } => cmd_decode(&register, value, device_id)?,
        Cmd::Classify { regs } => cmd_classify(&regs),
    }

    Ok(())
}

fn open_window(device: &str) -> Result<MmioWindow> {
    let mgr = GpuManager::discover()?;
    let info = mgr.select(device)?;
    MmioWindow::map(info).with_context(|| format!("mapping registers of {}", info.pcie_address))
}

fn cmd_list() -> Result<()> {
    let mgr = GpuManager::discover()?;

    println!("Intel GPUs: {}", mgr.device_count());
    println!();

    for info in mgr.devices() {
        println!(
            "[{}] {} @ {}  (device {:#06x}, driver {})",
            info.index,
            info.platform,
            info.pcie_address,
            info.device_id,
            info.driver.as_deref().unwrap_or("none")
        );
    }

    Ok(())
}

fn cmd_info(device: &str) -> Result<()> {
    let mgr = GpuManager::discover()?;
    let info = mgr.select(device)?;
    let p = info.platform;

    let yes_no = |b: bool| if b { "yes" } else { "no" };

    println!("PCI address  : {}", info.pcie_address);
    println!("Device id    : {:#06x}", info.device_id);
    println!("Platform     : {p}");
    println!("Generation   : {}", p.generation());
    println!("Mobile       : {}", yes_no(Platform::is_mobile(info.device_id)));
    println!("PCH split    : {}", yes_no(p.has_pch_split()));
    println!("BSD ring     : {}", yes_no(p.has_bsd_ring()));
    println!("BLT ring     : {}", yes_no(p.has_blt_ring()));
    match p.display_base() {
        Some(base) => println!("Display base : {base:#x}"),
        None => println!("Display base : none"),
    }
    println!("Driver       : {}", info.driver.as_deref().unwrap_or("none"));
    println!("BAR0         : {}", info.resource_path(0).display());

    Ok(())
}

fn cmd_read(device: &str, regs: &[u32]) -> Result<()> {
    let win = open_window(device)?;
    for &reg in regs {
        let value = win.read32(reg)?;
        println!("{reg:#x} : {value:#x}");
    }
    Ok(())
}

fn cmd_write(device: &str, reg: u32, value: u32) -> Result<()> {
    eprintln!(
        "WARNING: This is dangerous to you and your system's health.\n         \
         Only for use in debugging."
    );

    let mut win = open_window(device)?;
    println!("Value before: {:#X}", win.read32(reg)?);
    win.write32(reg, value)?;
    println!("Value after: {:#X}", win.read32(reg)?);
    Ok(())
}

fn cmd_dump(device: &str, file: Option<PathBuf>, device_id: Option<u16>) -> Result<()> {
    match file {
        Some(path) => {
            let Some(id) = device_id else {
                bail!("--device-id is required when dumping a file");
            };
            let snap = Snapshot::open(&path, Platform::from_device_id(id))
                .with_context(|| format!("loading {}", path.display()))?;
            dump_all(&snap)
        }
        None => dump_all(&open_window(device)?),
    }
}

fn dump_all(io: &impl RegisterIo) -> Result<()> {
    let platform = io.platform();
    tracing::info!("Dumping {platform} registers");

    for table in tables_for(platform) {
        for line in dump_table(io, table)? {
            println!("{line}");
        }
        println!();
    }

    if !platform.has_pch_split() {
        for (pipe, clock) in pipe_clocks(io)? {
            match clock {
                Some(clk) => println!("pipe {pipe} {clk}"),
                None => println!("pipe {pipe} clock: invalid divisors"),
            }
        }
    }

    Ok(())
}

fn cmd_decode(register: &str, value: u32, device_id: Option<u16>) -> Result<()> {
    let platform = match device_id {
        Some(id) => Platform::from_device_id(id),
        None => GpuManager::discover()
            .ok()
            .and_then(|mgr| mgr.devices().first().map(|d| d.platform))
            .unwrap_or(Platform::Unknown(0)),
    };

    let Some((table, line)) = decode_value(platform, register, value) else {
        bail!("unknown register: {register}");
    };
    println!("{table}: {}", line.long_form());
    Ok(())
}

fn cmd_classify(regs: &[u32]) {
    println!("{:>10}  {:<11}  {:<26}  vlv offset", "offset", "class", "rule");
    for &reg in regs {
        let c = vlv::classify(reg);
        let class = match c.class {
            vlv::RegionClass::Display => "display",
            vlv::RegionClass::NonDisplay => "non-display",
        };
        let rule = c.rule.map_or("(default)", |r| r.name);
        println!(
            "{reg:>#10x}  {class:<11}  {rule:<26}  {:#x}",
            vlv::display_offset(reg)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_hex_and_decimal() {
        assert_eq!(parse_reg("0x70008"), Ok(0x70008));
        assert_eq!(parse_reg("16"), Ok(16));
        assert!(parse_reg("nope").is_err());
        assert_eq!(parse_device_id("0x0f31"), Ok(0x0f31));
        assert_eq!(parse_device_id("0166"), Ok(0x0166));
    }

    #[test]
    fn dump_file_requires_device_id_flag_pairing() {
        let cli = Cli::try_parse_from(["intel-reg", "dump", "--file", "bar0.bin", "--device-id", "0x0f31"])
            .unwrap();
        match cli.command {
            Cmd::Dump { file, device_id, .. } => {
                assert_eq!(file, Some(PathBuf::from("bar0.bin")));
                assert_eq!(device_id, Some(0x0f31));
            }
            _ => panic!("expected dump"),
        }
        assert!(Cli::try_parse_from(["intel-reg", "dump", "--device-id", "0x0f31"]).is_err());
    }

    #[test]
    fn write_takes_two_numbers() {
        let cli = Cli::try_parse_from(["intel-reg", "write", "0x2030", "0"]).unwrap();
        assert!(matches!(cli.command, Cmd::Write { reg: 0x2030, value: 0, .. }));
    }
}
