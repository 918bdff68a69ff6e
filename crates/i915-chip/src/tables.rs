//! Named register tables for dumping and single-register decode.
//!
//! A table is a static list of [`RegDesc`]. Which tables a live dump prints
//! depends on the platform ([`tables_for`]); name and address lookups walk
//! every table in [`known_tables`] order.

use crate::decode::{self, Decoder};
use crate::pcie::Platform;
use crate::regs::*;

/// One register: where it lives, what it is called, how to explain it.
#[derive(Debug, Clone, Copy)]
pub struct RegDesc {
    /// Legacy MMIO offset.
    pub offset: u32,
    /// Register name as printed in dumps.
    pub name: &'static str,
    /// Optional value decoder.
    pub decoder: Option<Decoder>,
}

impl RegDesc {
    const fn new(offset: u32, name: &'static str, decoder: Decoder) -> Self {
        Self {
            offset,
            name,
            decoder: Some(decoder),
        }
    }

    const fn raw(offset: u32, name: &'static str) -> Self {
        Self {
            offset,
            name,
            decoder: None,
        }
    }

    /// Decoded form of `value`, empty when the register has no decoder.
    #[must_use]
    pub fn decode(&self, platform: Platform, value: u32) -> String {
        self.decoder.map(|f| f(platform, value)).unwrap_or_default()
    }
}

/// A named group of registers.
#[derive(Debug, Clone, Copy)]
pub struct RegTable {
    /// Table name (`"Gen2"`, `"Gen5"`, `"Gen6"`).
    pub name: &'static str,
    /// Registers in print order.
    pub regs: &'static [RegDesc],
}

/// i9xx display engine: pipes, planes, PLLs, ports and panel.
pub static GEN2: RegTable = RegTable {
    name: "Gen2",
    regs: &[
        RegDesc::new(DSPACNTR, "DSPACNTR", decode::dspcntr),
        RegDesc::new(DSPASTRIDE, "DSPASTRIDE", decode::stride),
        RegDesc::new(DSPAPOS, "DSPAPOS", decode::xy),
        RegDesc::new(DSPASIZE, "DSPASIZE", decode::xy_minus1),
        RegDesc::raw(DSPABASE, "DSPABASE"),
        RegDesc::raw(DSPASURF, "DSPASURF"),
        RegDesc::new(DSPATILEOFF, "DSPATILEOFF", decode::xy),
        RegDesc::new(PIPEACONF, "PIPEACONF", decode::pipeconf),
        RegDesc::new(PIPEASRC, "PIPEASRC", decode::yx_minus1),
        RegDesc::new(PIPEASTAT, "PIPEASTAT", decode::pipestat),
        RegDesc::raw(PIPEA_GMCH_DATA_M, "PIPEA_GMCH_DATA_M"),
        RegDesc::raw(PIPEA_GMCH_DATA_N, "PIPEA_GMCH_DATA_N"),
        RegDesc::raw(PIPEA_DP_LINK_M, "PIPEA_DP_LINK_M"),
        RegDesc::raw(PIPEA_DP_LINK_N, "PIPEA_DP_LINK_N"),
        RegDesc::raw(CURSOR_A_BASE, "CURSOR_A_BASE"),
        RegDesc::raw(CURSOR_A_CONTROL, "CURSOR_A_CONTROL"),
        RegDesc::raw(CURSOR_A_POSITION, "CURSOR_A_POSITION"),
        RegDesc::new(DSPBCNTR, "DSPBCNTR", decode::dspcntr),
        RegDesc::new(DSPBSTRIDE, "DSPBSTRIDE", decode::stride),
        RegDesc::new(DSPBPOS, "DSPBPOS", decode::xy),
        RegDesc::new(DSPBSIZE, "DSPBSIZE", decode::xy_minus1),
        RegDesc::raw(DSPBBASE, "DSPBBASE"),
        RegDesc::raw(DSPBSURF, "DSPBSURF"),
        RegDesc::new(DSPBTILEOFF, "DSPBTILEOFF", decode::xy),
        RegDesc::new(PIPEBCONF, "PIPEBCONF", decode::pipeconf),
        RegDesc::new(PIPEBSRC, "PIPEBSRC", decode::yx_minus1),
        RegDesc::new(PIPEBSTAT, "PIPEBSTAT", decode::pipestat),
        RegDesc::raw(PIPEB_GMCH_DATA_M, "PIPEB_GMCH_DATA_M"),
        RegDesc::raw(PIPEB_GMCH_DATA_N, "PIPEB_GMCH_DATA_N"),
        RegDesc::raw(PIPEB_DP_LINK_M, "PIPEB_DP_LINK_M"),
        RegDesc::raw(PIPEB_DP_LINK_N, "PIPEB_DP_LINK_N"),
        RegDesc::raw(CURSOR_B_BASE, "CURSOR_B_BASE"),
        RegDesc::raw(CURSOR_B_CONTROL, "CURSOR_B_CONTROL"),
        RegDesc::raw(CURSOR_B_POSITION, "CURSOR_B_POSITION"),
        RegDesc::new(VGACNTRL, "VGACNTRL", decode::vgacntrl),
        RegDesc::new(PP_STATUS, "PP_STATUS", decode::pp_status),
        RegDesc::new(PP_CONTROL, "PP_CONTROL", decode::pp_control),
        RegDesc::raw(PP_ON_DELAYS, "PP_ON_DELAYS"),
        RegDesc::raw(PP_OFF_DELAYS, "PP_OFF_DELAYS"),
        RegDesc::raw(PP_DIVISOR, "PP_DIVISOR"),
        RegDesc::raw(PFIT_CONTROL, "PFIT_CONTROL"),
        RegDesc::raw(PFIT_PGM_RATIOS, "PFIT_PGM_RATIOS"),
        RegDesc::raw(PORT_HOTPLUG_EN, "PORT_HOTPLUG_EN"),
        RegDesc::raw(PORT_HOTPLUG_STAT, "PORT_HOTPLUG_STAT"),
        RegDesc::new(DVOA, "DVOA", decode::dvo),
        RegDesc::new(SDVOB, "SDVOB", decode::sdvo),
        RegDesc::new(SDVOC, "SDVOC", decode::sdvo),
        RegDesc::new(LVDS, "LVDS", decode::lvds),
        RegDesc::new(ADPA, "ADPA", decode::adpa),
        RegDesc::raw(BLC_PWM_CTL, "BLC_PWM_CTL"),
        RegDesc::raw(BLC_PWM_CTL2, "BLC_PWM_CTL2"),
        RegDesc::new(FPA0, "FPA0", decode::fp),
        RegDesc::new(FPA1, "FPA1", decode::fp),
        RegDesc::new(DPLL_A, "DPLL_A", decode::dpll_a),
        RegDesc::raw(DPLL_A_MD, "DPLL_A_MD"),
        RegDesc::new(HTOTAL_A, "HTOTAL_A", decode::hvtotal),
        RegDesc::new(HBLANK_A, "HBLANK_A", decode::hvsyncblank),
        RegDesc::new(HSYNC_A, "HSYNC_A", decode::hvsyncblank),
        RegDesc::new(VTOTAL_A, "VTOTAL_A", decode::hvtotal),
        RegDesc::new(VBLANK_A, "VBLANK_A", decode::hvsyncblank),
        RegDesc::new(VSYNC_A, "VSYNC_A", decode::hvsyncblank),
        RegDesc::raw(BCLRPAT_A, "BCLRPAT_A"),
        RegDesc::raw(VSYNCSHIFT_A, "VSYNCSHIFT_A"),
        RegDesc::new(FPB0, "FPB0", decode::fp),
        RegDesc::new(FPB1, "FPB1", decode::fp),
        RegDesc::new(DPLL_B, "DPLL_B", decode::dpll_b),
        RegDesc::raw(DPLL_B_MD, "DPLL_B_MD"),
        RegDesc::new(HTOTAL_B, "HTOTAL_B", decode::hvtotal),
        RegDesc::new(HBLANK_B, "HBLANK_B", decode::hvsyncblank),
        RegDesc::new(HSYNC_B, "HSYNC_B", decode::hvsyncblank),
        RegDesc::new(VTOTAL_B, "VTOTAL_B", decode::hvtotal),
        RegDesc::new(VBLANK_B, "VBLANK_B", decode::hvsyncblank),
        RegDesc::new(VSYNC_B, "VSYNC_B", decode::hvsyncblank),
        RegDesc::raw(BCLRPAT_B, "BCLRPAT_B"),
        RegDesc::raw(VSYNCSHIFT_B, "VSYNCSHIFT_B"),
        RegDesc::raw(DSPARB, "DSPARB"),
        RegDesc::raw(DSPFW1, "DSPFW1"),
        RegDesc::raw(DSPFW2, "DSPFW2"),
        RegDesc::raw(DSPFW3, "DSPFW3"),
        RegDesc::new(D_STATE, "D_STATE", decode::bits16),
        RegDesc::raw(DSPCLK_GATE_D, "DSPCLK_GATE_D"),
        RegDesc::raw(RENCLK_GATE_D1, "RENCLK_GATE_D1"),
        RegDesc::raw(RENCLK_GATE_D2, "RENCLK_GATE_D2"),
        RegDesc::new(FENCE_REG_965_0, "FENCE_START_0", decode::fence_965_start),
        RegDesc::new(FENCE_REG_965_0 + 4, "FENCE_END_0", decode::fence_965_end),
        RegDesc::new(FENCE_REG_965_0 + 8, "FENCE_START_1", decode::fence_965_start),
        RegDesc::new(FENCE_REG_965_0 + 12, "FENCE_END_1", decode::fence_965_end),
        RegDesc::new(FENCE_REG_965_0 + 16, "FENCE_START_2", decode::fence_965_start),
        RegDesc::new(FENCE_REG_965_0 + 20, "FENCE_END_2", decode::fence_965_end),
        RegDesc::new(FENCE_REG_965_0 + 24, "FENCE_START_3", decode::fence_965_start),
        RegDesc::new(FENCE_REG_965_0 + 28, "FENCE_END_3", decode::fence_965_end),
    ],
};

/// PCH-split display (Ironlake and later).
pub static GEN5: RegTable = RegTable {
    name: "Gen5",
    regs: &[
        RegDesc::new(PIPEACONF, "PIPEACONF", decode::pipeconf),
        RegDesc::new(PIPEBCONF, "PIPEBCONF", decode::pipeconf),
        RegDesc::new(PIPEASRC, "PIPEASRC", decode::yx_minus1),
        RegDesc::new(PIPEBSRC, "PIPEBSRC", decode::yx_minus1),
        RegDesc::new(DSPACNTR, "DSPACNTR", decode::dspcntr),
        RegDesc::new(DSPASTRIDE, "DSPASTRIDE", decode::stride),
        RegDesc::raw(DSPASURF, "DSPASURF"),
        RegDesc::new(DSPATILEOFF, "DSPATILEOFF", decode::xy),
        RegDesc::new(DSPBCNTR, "DSPBCNTR", decode::dspcntr),
        RegDesc::new(DSPBSTRIDE, "DSPBSTRIDE", decode::stride),
        RegDesc::raw(DSPBSURF, "DSPBSURF"),
        RegDesc::new(DSPBTILEOFF, "DSPBTILEOFF", decode::xy),
        RegDesc::new(HTOTAL_A, "HTOTAL_A", decode::hvtotal),
        RegDesc::new(HBLANK_A, "HBLANK_A", decode::hvsyncblank),
        RegDesc::new(HSYNC_A, "HSYNC_A", decode::hvsyncblank),
        RegDesc::new(VTOTAL_A, "VTOTAL_A", decode::hvtotal),
        RegDesc::new(VBLANK_A, "VBLANK_A", decode::hvsyncblank),
        RegDesc::new(VSYNC_A, "VSYNC_A", decode::hvsyncblank),
        RegDesc::new(HTOTAL_B, "HTOTAL_B", decode::hvtotal),
        RegDesc::new(HBLANK_B, "HBLANK_B", decode::hvsyncblank),
        RegDesc::new(HSYNC_B, "HSYNC_B", decode::hvsyncblank),
        RegDesc::new(VTOTAL_B, "VTOTAL_B", decode::hvtotal),
        RegDesc::new(VBLANK_B, "VBLANK_B", decode::hvsyncblank),
        RegDesc::new(VSYNC_B, "VSYNC_B", decode::hvsyncblank),
        RegDesc::raw(PIPEA_DP_LINK_M, "PIPEA_DATA_M1"),
        RegDesc::raw(PIPEA_DP_LINK_N, "PIPEA_DATA_N1"),
        RegDesc::raw(FDI_TX_CTL_A, "FDI_TX_CTL_A"),
        RegDesc::raw(FDI_TX_CTL_B, "FDI_TX_CTL_B"),
        RegDesc::raw(FDI_RX_CTL_A, "FDI_RX_CTL_A"),
        RegDesc::raw(FDI_RX_CTL_B, "FDI_RX_CTL_B"),
        RegDesc::new(PCH_DPLL_A, "PCH_DPLL_A", decode::dpll_a),
        RegDesc::new(PCH_DPLL_B, "PCH_DPLL_B", decode::dpll_b),
        RegDesc::new(PCH_FPA0, "PCH_FPA0", decode::fp),
        RegDesc::new(PCH_FPB0, "PCH_FPB0", decode::fp),
        RegDesc::new(TRANS_HTOTAL_A, "TRANS_HTOTAL_A", decode::hvtotal),
        RegDesc::raw(TRANSACONF, "TRANSACONF"),
        RegDesc::raw(TRANSBCONF, "TRANSBCONF"),
        RegDesc::new(PCH_ADPA, "PCH_ADPA", decode::adpa),
        RegDesc::new(PCH_LVDS, "PCH_LVDS", decode::lvds),
        RegDesc::new(PCH_PP_STATUS, "PCH_PP_STATUS", decode::pp_status),
        RegDesc::new(PCH_PP_CONTROL, "PCH_PP_CONTROL", decode::pp_control),
    ],
};

/// Render P-state and RC6 control (Sandybridge and later).
pub static GEN6: RegTable = RegTable {
    name: "Gen6",
    regs: &[
        RegDesc::raw(GEN6_RPNSWREQ, "GEN6_RPNSWREQ"),
        RegDesc::raw(GEN6_RC_VIDEO_FREQ, "GEN6_RC_VIDEO_FREQ"),
        RegDesc::raw(GEN6_RP_DOWN_TIMEOUT, "GEN6_RP_DOWN_TIMEOUT"),
        RegDesc::raw(GEN6_RP_INTERRUPT_LIMITS, "GEN6_RP_INTERRUPT_LIMITS"),
        RegDesc::new(GEN6_RP_CONTROL, "GEN6_RP_CONTROL", decode::gen6_rp_control),
        RegDesc::raw(GEN6_RP_UP_THRESHOLD, "GEN6_RP_UP_THRESHOLD"),
        RegDesc::raw(GEN6_RP_UP_EI, "GEN6_RP_UP_EI"),
        RegDesc::raw(GEN6_RP_DOWN_EI, "GEN6_RP_DOWN_EI"),
        RegDesc::raw(GEN6_RP_IDLE_HYSTERSIS, "GEN6_RP_IDLE_HYSTERSIS"),
        RegDesc::raw(GEN6_RC_STATE, "GEN6_RC_STATE"),
        RegDesc::raw(GEN6_RC_CONTROL, "GEN6_RC_CONTROL"),
        RegDesc::raw(GEN6_RC1_WAKE_RATE_LIMIT, "GEN6_RC1_WAKE_RATE_LIMIT"),
        RegDesc::raw(GEN6_RC6_WAKE_RATE_LIMIT, "GEN6_RC6_WAKE_RATE_LIMIT"),
        RegDesc::raw(GEN6_RC_EVALUATION_INTERVAL, "GEN6_RC_EVALUATION_INTERVAL"),
        RegDesc::raw(GEN6_RC_IDLE_HYSTERSIS, "GEN6_RC_IDLE_HYSTERSIS"),
        RegDesc::raw(GEN6_RC_SLEEP, "GEN6_RC_SLEEP"),
        RegDesc::raw(GEN6_RC1E_THRESHOLD, "GEN6_RC1E_THRESHOLD"),
        RegDesc::raw(GEN6_RC6_THRESHOLD, "GEN6_RC6_THRESHOLD"),
        RegDesc::raw(GEN6_PMIER, "GEN6_PMIER"),
        RegDesc::raw(GEN6_PMIMR, "GEN6_PMIMR"),
        RegDesc::raw(GEN6_PMINTRMSK, "GEN6_PMINTRMSK"),
    ],
};

static KNOWN: [&RegTable; 3] = [&GEN5, &GEN2, &GEN6];

/// Every table, in lookup order.
#[must_use]
pub fn known_tables() -> &'static [&'static RegTable] {
    &KNOWN
}

/// Tables a dump of `platform` prints, in print order.
#[must_use]
pub fn tables_for(platform: Platform) -> Vec<&'static RegTable> {
    let mut tables = Vec::with_capacity(2);
    if platform.has_pch_split() {
        tables.push(&GEN5);
    } else {
        tables.push(&GEN2);
    }
    if platform.generation() >= 6 {
        tables.push(&GEN6);
    }
    tables
}

/// First register with exactly this offset, searching `tables` in order.
#[must_use]
pub fn find_by_address<'a>(
    tables: impl IntoIterator<Item = &'a RegTable>,
    offset: u32,
) -> Option<(&'a RegTable, &'a RegDesc)> {
    tables
        .into_iter()
        .find_map(|t| t.regs.iter().find(|r| r.offset == offset).map(|r| (t, r)))
}

/// First register whose name contains `pattern`, ignoring case.
#[must_use]
pub fn find_by_name<'a>(
    tables: impl IntoIterator<Item = &'a RegTable>,
    pattern: &str,
) -> Option<(&'a RegTable, &'a RegDesc)> {
    let pattern = pattern.to_ascii_uppercase();
    tables.into_iter().find_map(|t| {
        t.regs
            .iter()
            .find(|r| r.name.to_ascii_uppercase().contains(&pattern))
            .map(|r| (t, r))
    })
}

/// [`find_by_address`] over [`known_tables`].
#[must_use]
pub fn lookup_by_address(offset: u32) -> Option<(&'static RegTable, &'static RegDesc)> {
    find_by_address(KNOWN.iter().copied(), offset)
}

/// [`find_by_name`] over [`known_tables`].
#[must_use]
pub fn lookup_by_name(pattern: &str) -> Option<(&'static RegTable, &'static RegDesc)> {
    find_by_name(KNOWN.iter().copied(), pattern)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_names() {
        let names: Vec<_> = known_tables().iter().map(|t| t.name).collect();
        assert_eq!(names, ["Gen5", "Gen2", "Gen6"]);
    }

    #[test]
    fn offsets_unique_within_a_table() {
        for table in known_tables() {
            for (i, a) in table.regs.iter().enumerate() {
                for b in &table.regs[i + 1..] {
                    assert_ne!(a.offset, b.offset, "{}: {} / {}", table.name, a.name, b.name);
                }
            }
        }
    }

    #[test]
    fn name_lookup_is_case_insensitive_substring() {
        let (table, reg) = lookup_by_name("dspacntr").unwrap();
        assert_eq!(table.name, "Gen5");
        assert_eq!(reg.offset, DSPACNTR);
        let (_, reg) = lookup_by_name("rp_cont").unwrap();
        assert_eq!(reg.name, "GEN6_RP_CONTROL");
        assert!(lookup_by_name("NO_SUCH_REGISTER").is_none());
    }

    #[test]
    fn address_lookup_is_exact() {
        let (table, reg) = lookup_by_address(0xa024).unwrap();
        assert_eq!(table.name, "Gen6");
        assert_eq!(reg.name, "GEN6_RP_CONTROL");
        assert!(lookup_by_address(0xa025).is_none());
        // Only in the i9xx table.
        let (table, reg) = lookup_by_address(LVDS).unwrap();
        assert_eq!((table.name, reg.name), ("Gen2", "LVDS"));
    }

    #[test]
    fn platform_table_selection() {
        let names = |p| tables_for(p).iter().map(|t| t.name).collect::<Vec<_>>();
        assert_eq!(names(Platform::I945), ["Gen2"]);
        assert_eq!(names(Platform::Ironlake), ["Gen5"]);
        assert_eq!(names(Platform::SandyBridge), ["Gen5", "Gen6"]);
        assert_eq!(names(Platform::ValleyView), ["Gen2", "Gen6"]);
    }

    #[test]
    fn decode_through_descriptor() {
        let (_, reg) = lookup_by_name("HTOTAL_A").unwrap();
        assert_eq!(reg.decode(Platform::I965, 0x053f_03ff), "1024 active, 1344 total");
        let (_, raw) = lookup_by_name("DSPASURF").unwrap();
        assert_eq!(raw.decode(Platform::I965, 1), "");
    }

    #[test]
    fn search_order_is_caller_controlled() {
        // 0x61100 is FDI_TX_CTL_B on PCH parts and ADPA on i9xx.
        let (_, reg) = lookup_by_address(ADPA).unwrap();
        assert_eq!(reg.name, "FDI_TX_CTL_B");
        let (_, reg) = find_by_address([&GEN2], ADPA).unwrap();
        assert_eq!(reg.name, "ADPA");
    }
}
