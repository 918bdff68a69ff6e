//! Table dumps and single-register decode over any [`RegisterIo`].

use crate::error::Result;
use crate::mmio::RegisterIo;
use i915_chip::decode::PllClock;
use i915_chip::regs;
use i915_chip::tables::{self, RegDesc, RegTable};
use i915_chip::Platform;

/// One printed register line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpLine {
    /// Register name
    pub name: &'static str,
    /// Legacy offset
    pub offset: u32,
    /// Raw value
    pub value: u32,
    /// Decoder output (empty when the register has no decoder)
    pub decoded: String,
}

impl DumpLine {
    fn new(reg: &RegDesc, platform: Platform, value: u32) -> Self {
        Self {
            name: reg.name,
            offset: reg.offset,
            value,
            decoded: reg.decode(platform, value),
        }
    }

    /// Decode-mode line: `NAME (0xaddr): 0x%08x (decoded)`.
    #[must_use]
    pub fn long_form(&self) -> String {
        format!(
            "{} ({:#x}): 0x{:08x} ({})",
            self.name, self.offset, self.value, self.decoded
        )
    }
}

impl std::fmt::Display for DumpLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:>30.30}: 0x{:08x} ({})", self.name, self.value, self.decoded)
    }
}

/// Read and decode every register of `table`.
///
/// # Errors
///
/// Returns the first read error.
pub fn dump_table(io: &impl RegisterIo, table: &RegTable) -> Result<Vec<DumpLine>> {
    let platform = io.platform();
    table
        .regs
        .iter()
        .map(|reg| Ok(DumpLine::new(reg, platform, io.read32(reg.offset)?)))
        .collect()
}

/// Parse `0x`-prefixed hex or decimal.
#[must_use]
pub fn parse_u32(s: &str) -> Option<u32> {
    let s = s.trim();
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => s.parse().ok(),
    }
}

/// Decode `value` as the register named or addressed by `query`.
///
/// A query that parses as a non-zero number is an address; anything else
/// is a case-insensitive name fragment. The platform's own tables are
/// searched before the rest. Returns the table name with the line.
#[must_use]
pub fn decode_value(
    platform: Platform,
    query: &str,
    value: u32,
) -> Option<(&'static str, DumpLine)> {
    let ordered = tables::tables_for(platform)
        .into_iter()
        .chain(tables::known_tables().iter().copied());

    let found = match parse_u32(query).filter(|&addr| addr != 0) {
        Some(addr) => tables::find_by_address(ordered, addr),
        None => tables::find_by_name(ordered, query),
    };

    found.map(|(table, reg)| (table.name, DumpLine::new(reg, platform, value)))
}

/// Dot clock of pipe A and B on non-PCH platforms.
///
/// # Errors
///
/// Returns the first read error.
pub fn pipe_clocks(io: &impl RegisterIo) -> Result<Vec<(char, Option<PllClock>)>> {
    let platform = io.platform();
    let lvds = io.read32(regs::LVDS)?;
    let mut out = Vec::with_capacity(2);
    for (pipe, dpll, fp, pipe_b) in [
        ('A', regs::DPLL_A, regs::FPA0, false),
        ('B', regs::DPLL_B, regs::FPB0, true),
    ] {
        let dpll_val = io.read32(dpll)?;
        let fp_val = io.read32(fp)?;
        out.push((
            pipe,
            PllClock::from_registers(platform, dpll_val, fp_val, lvds, pipe_b),
        ));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::Snapshot;
    use i915_chip::tables::GEN6;

    fn snapshot(platform: Platform, words: &[(u32, u32)]) -> Snapshot {
        let mut data = vec![0u8; 0x10_0000];
        for &(at, v) in words {
            let at = at as usize;
            data[at..at + 4].copy_from_slice(&v.to_le_bytes());
        }
        Snapshot::new(data, platform)
    }

    #[test]
    fn dump_line_format() {
        let line = DumpLine {
            name: "HTOTAL_A",
            offset: 0x60000,
            value: 0x053f_03ff,
            decoded: "1024 active, 1344 total".into(),
        };
        assert_eq!(
            line.to_string(),
            "                      HTOTAL_A: 0x053f03ff (1024 active, 1344 total)"
        );
        assert_eq!(
            line.long_form(),
            "HTOTAL_A (0x60000): 0x053f03ff (1024 active, 1344 total)"
        );
    }

    #[test]
    fn long_names_are_truncated_to_thirty() {
        let line = DumpLine {
            name: "A_VERY_LONG_REGISTER_NAME_THAT_OVERFLOWS",
            offset: 0,
            value: 0,
            decoded: String::new(),
        };
        assert!(line.to_string().starts_with("A_VERY_LONG_REGISTER_NAME_THAT: "));
    }

    #[test]
    fn dumps_every_register_of_a_table() {
        let io = snapshot(Platform::SandyBridge, &[(regs::GEN6_RP_CONTROL, 1 << 7)]);
        let lines = dump_table(&io, &GEN6).unwrap();
        assert_eq!(lines.len(), GEN6.regs.len());
        let rp = lines.iter().find(|l| l.name == "GEN6_RP_CONTROL").unwrap();
        assert_eq!(rp.decoded, "enabled");
    }

    #[test]
    fn dump_propagates_read_errors() {
        let io = Snapshot::new(vec![0u8; 16], Platform::SandyBridge);
        assert!(dump_table(&io, &GEN6).is_err());
    }

    #[test]
    fn decode_by_name_and_address() {
        let (table, line) = decode_value(Platform::I965, "htotal_a", 0x053f_03ff).unwrap();
        assert_eq!(table, "Gen2");
        assert_eq!(line.decoded, "1024 active, 1344 total");

        // 0x61100 resolves per platform.
        let (_, line) = decode_value(Platform::I945, "0x61100", 0).unwrap();
        assert_eq!(line.name, "ADPA");
        let (_, line) = decode_value(Platform::IvyBridge, "0x61100", 0).unwrap();
        assert_eq!(line.name, "FDI_TX_CTL_B");

        assert!(decode_value(Platform::I965, "0x12345", 0).is_none());
        assert!(decode_value(Platform::I965, "bogus", 0).is_none());
    }

    #[test]
    fn number_parsing() {
        assert_eq!(parse_u32("0x70008"), Some(0x70008));
        assert_eq!(parse_u32("0X10"), Some(16));
        assert_eq!(parse_u32("42"), Some(42));
        assert_eq!(parse_u32("zz"), None);
        assert_eq!(parse_u32("0x1_0000_0000"), None);
    }

    #[test]
    fn pipe_clock_summary() {
        let io = snapshot(
            Platform::I965,
            &[
                (regs::DPLL_A, 1 << 16),
                (regs::FPA0, (2 << 16) | (12 << 8) | 5),
            ],
        );
        let clocks = pipe_clocks(&io).unwrap();
        assert_eq!(clocks[0].0, 'A');
        assert_eq!(clocks[0].1.unwrap().dot_khz, 96_000 * 77 / 4 / 10);
        // Pipe B registers are zero: undefined p1.
        assert_eq!(clocks[1], ('B', None));
    }
}
