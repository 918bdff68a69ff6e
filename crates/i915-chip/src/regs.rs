//! MMIO register map for i915-class GPUs.
//!
//! Offsets are legacy (pre-ValleyView) offsets. On ValleyView the display
//! block lives at `+0x180000`; see [`crate::vlv`] for the rules that decide
//! which offsets move.
//!
//! ```text
//! 0x02000  render ring          0x60000  pipe A timings
//! 0x04000  HWS / fault regs     0x61000  ports, panel, pfit
//! 0x06000  DPLLs, clock gating  0x70000  pipe / plane A
//! 0x09000  MBC / UCG            0x71000  pipe / plane B
//! 0x0a000  RPS / RC6            0x100000 fences (gen6+)
//! 0x12000  bsd ring             0x130000 force-wake (vlv)
//! 0x22000  blt ring             0x180000 vlv display base
//! ```

// ── Engines ──────────────────────────────────────────────────────────────────

/// Render ring register block.
pub const RENDER_RING_BASE: u32 = 0x02000;
/// BSD (video decode) ring register block.
pub const GEN6_BSD_RING_BASE: u32 = 0x12000;
/// Blitter ring register block.
pub const BLT_RING_BASE: u32 = 0x22000;

/// Render ring control, relative to [`RENDER_RING_BASE`] it is `+0x3c`.
pub const RENDER_RING_CTL: u32 = RENDER_RING_BASE + 0x3c;

pub const PGTBL_ER: u32 = 0x02024;
pub const IPEIR_I965: u32 = 0x02064;
pub const HWSTAM: u32 = 0x02098;
pub const MI_MODE: u32 = 0x0209c;
pub const _3D_CHICKEN3: u32 = 0x02090;
pub const GFX_MODE_GEN7: u32 = 0x0229c;

/// Hardware status page address, one per ring.
pub const RENDER_HWS_PGA_GEN7: u32 = 0x04080;
pub const BSD_HWS_PGA_GEN7: u32 = 0x04180;
pub const BLT_HWS_PGA_GEN7: u32 = 0x04280;

pub const GEN6_BSD_SLEEP_PSMI_CONTROL: u32 = 0x12050;
pub const GEN6_BSD_RNCID: u32 = 0x12198;
pub const GEN6_BLITTER_ECOSKPD: u32 = 0x221d0;

// ── Interrupts ───────────────────────────────────────────────────────────────

/// Gunit master interrupt enable.
pub const VLV_MASTER_IER: u32 = 0x4400c;
pub const GEN6_PMIMR: u32 = 0x44024;
pub const GEN6_PMIER: u32 = 0x4402c;
pub const VLV_IIR_RW: u32 = 0x18_2084;
pub const VLV_ISR: u32 = 0x18_20ac;

// ── Power and reset ──────────────────────────────────────────────────────────

pub const FORCEWAKE_VLV: u32 = 0x13_00b0;
pub const FORCEWAKE_ACK_VLV: u32 = 0x13_00b4;
/// Unnamed register next to the force-wake pair; accessed without the
/// display base.
pub const FORCEWAKE_VLV_AUX: u32 = 0x13_0090;
pub const GEN6_GDRST: u32 = 0x941c;

// ── Chicken bits, L3, MBC, UCG ───────────────────────────────────────────────

pub const IVB_CHICKEN3: u32 = 0x4200c;
/// IVB GT1 and VLV.
pub const GEN7_HALF_SLICE_CHICKEN1: u32 = 0xe100;
pub const GEN7_COMMON_SLICE_CHICKEN1: u32 = 0x7010;
pub const GEN7_L3CNTLREG1: u32 = 0xb01c;
pub const GEN7_L3_CHICKEN_MODE_REGISTER: u32 = 0xb030;
pub const GEN7_L3SQCREG4: u32 = 0xb034;
pub const GEN7_ROW_CHICKEN2: u32 = 0xe4f4;
pub const GEN7_SQ_CHICKEN_MBCUNIT_CONFIG: u32 = 0x9030;
pub const GEN6_MBCTL: u32 = 0x0907c;
pub const GEN6_UCGCTL2: u32 = 0x9404;
pub const GEN7_UCGCTL4: u32 = 0x940c;

// ── Fences ───────────────────────────────────────────────────────────────────

/// First of sixteen 64-bit fence registers on Sandybridge and later.
pub const FENCE_REG_SANDYBRIDGE_0: u32 = 0x10_0000;
/// First of sixteen 64-bit fence registers on 965.
pub const FENCE_REG_965_0: u32 = 0x03000;

// ── Clocks ───────────────────────────────────────────────────────────────────

pub const D_STATE: u32 = 0x6104;
pub const DSPCLK_GATE_D: u32 = 0x6200;
pub const RENCLK_GATE_D1: u32 = 0x6204;
pub const RENCLK_GATE_D2: u32 = 0x6208;

pub const DPLL_A: u32 = 0x6014;
pub const DPLL_B: u32 = 0x6018;
pub const DPLL_A_MD: u32 = 0x601c;
pub const DPLL_B_MD: u32 = 0x6020;
pub const FPA0: u32 = 0x6040;
pub const FPA1: u32 = 0x6044;
pub const FPB0: u32 = 0x6048;
pub const FPB1: u32 = 0x604c;

// ── Pipe timings ─────────────────────────────────────────────────────────────

pub const HTOTAL_A: u32 = 0x60000;
pub const HBLANK_A: u32 = 0x60004;
pub const HSYNC_A: u32 = 0x60008;
pub const VTOTAL_A: u32 = 0x6000c;
pub const VBLANK_A: u32 = 0x60010;
pub const VSYNC_A: u32 = 0x60014;
pub const PIPEASRC: u32 = 0x6001c;
pub const BCLRPAT_A: u32 = 0x60020;
pub const VSYNCSHIFT_A: u32 = 0x60028;

pub const HTOTAL_B: u32 = 0x61000;
pub const HBLANK_B: u32 = 0x61004;
pub const HSYNC_B: u32 = 0x61008;
pub const VTOTAL_B: u32 = 0x6100c;
pub const VBLANK_B: u32 = 0x61010;
pub const VSYNC_B: u32 = 0x61014;
pub const PIPEBSRC: u32 = 0x6101c;
pub const BCLRPAT_B: u32 = 0x61020;
pub const VSYNCSHIFT_B: u32 = 0x61028;

// ── Ports and panel ──────────────────────────────────────────────────────────

pub const ADPA: u32 = 0x61100;
pub const PORT_HOTPLUG_EN: u32 = 0x61110;
pub const PORT_HOTPLUG_STAT: u32 = 0x61114;
pub const DVOA: u32 = 0x61120;
pub const DVOB: u32 = 0x61140;
pub const DVOC: u32 = 0x61160;
pub const SDVOB: u32 = DVOB;
pub const SDVOC: u32 = DVOC;
pub const LVDS: u32 = 0x61180;

pub const PP_STATUS: u32 = 0x61200;
pub const PP_CONTROL: u32 = 0x61204;
pub const PP_ON_DELAYS: u32 = 0x61208;
pub const PP_OFF_DELAYS: u32 = 0x6120c;
pub const PP_DIVISOR: u32 = 0x61210;
pub const PFIT_CONTROL: u32 = 0x61230;
pub const PFIT_PGM_RATIOS: u32 = 0x61234;
pub const BLC_PWM_CTL2: u32 = 0x61250;
pub const BLC_PWM_CTL: u32 = 0x61254;

// ── Pipe, plane and cursor ───────────────────────────────────────────────────

pub const DSPARB: u32 = 0x70030;
pub const DSPFW1: u32 = 0x70034;
pub const DSPFW2: u32 = 0x70038;
pub const DSPFW3: u32 = 0x7003c;

pub const PIPEACONF: u32 = 0x70008;
pub const PIPEASTAT: u32 = 0x70024;
pub const PIPEA_GMCH_DATA_M: u32 = 0x70050;
pub const PIPEA_GMCH_DATA_N: u32 = 0x70054;
pub const PIPEA_DP_LINK_M: u32 = 0x70060;
pub const PIPEA_DP_LINK_N: u32 = 0x70064;
pub const CURSOR_A_CONTROL: u32 = 0x70080;
pub const CURSOR_A_BASE: u32 = 0x70084;
pub const CURSOR_A_POSITION: u32 = 0x70088;
pub const DSPACNTR: u32 = 0x70180;
pub const DSPABASE: u32 = 0x70184;
pub const DSPASTRIDE: u32 = 0x70188;
pub const DSPAPOS: u32 = 0x7018c;
pub const DSPASIZE: u32 = 0x70190;
pub const DSPASURF: u32 = 0x7019c;
pub const DSPATILEOFF: u32 = 0x701a4;

pub const PIPEBCONF: u32 = 0x71008;
pub const PIPEBSTAT: u32 = 0x71024;
pub const PIPEB_GMCH_DATA_M: u32 = 0x71050;
pub const PIPEB_GMCH_DATA_N: u32 = 0x71054;
pub const PIPEB_DP_LINK_M: u32 = 0x71060;
pub const PIPEB_DP_LINK_N: u32 = 0x71064;
pub const CURSOR_B_CONTROL: u32 = 0x700c0;
pub const CURSOR_B_BASE: u32 = 0x700c4;
pub const CURSOR_B_POSITION: u32 = 0x700c8;
pub const DSPBCNTR: u32 = 0x71180;
pub const DSPBBASE: u32 = 0x71184;
pub const DSPBSTRIDE: u32 = 0x71188;
pub const DSPBPOS: u32 = 0x7118c;
pub const DSPBSIZE: u32 = 0x71190;
pub const DSPBSURF: u32 = 0x7119c;
pub const DSPBTILEOFF: u32 = 0x711a4;

pub const VGACNTRL: u32 = 0x71400;

// ── PCH (Ironlake and later) ─────────────────────────────────────────────────

pub const FDI_TX_CTL_A: u32 = 0x60100;
pub const FDI_TX_CTL_B: u32 = 0x61100;
pub const PCH_DPLL_A: u32 = 0xc6014;
pub const PCH_DPLL_B: u32 = 0xc6018;
pub const PCH_FPA0: u32 = 0xc6040;
pub const PCH_FPB0: u32 = 0xc6048;
pub const PCH_PP_STATUS: u32 = 0xc7200;
pub const PCH_PP_CONTROL: u32 = 0xc7204;
pub const TRANS_HTOTAL_A: u32 = 0xe0000;
pub const PCH_ADPA: u32 = 0xe1100;
pub const PCH_LVDS: u32 = 0xe1180;
pub const TRANSACONF: u32 = 0xf0008;
pub const TRANSBCONF: u32 = 0xf1008;
pub const FDI_RX_CTL_A: u32 = 0xf000c;
pub const FDI_RX_CTL_B: u32 = 0xf100c;

// ── RPS / RC6 (Gen6+) ────────────────────────────────────────────────────────

pub const GEN6_RPNSWREQ: u32 = 0xa008;
pub const GEN6_RC_VIDEO_FREQ: u32 = 0xa00c;
pub const GEN6_RP_DOWN_TIMEOUT: u32 = 0xa010;
pub const GEN6_RP_INTERRUPT_LIMITS: u32 = 0xa014;
pub const GEN6_RP_CONTROL: u32 = 0xa024;
pub const GEN6_RP_UP_THRESHOLD: u32 = 0xa02c;
pub const GEN6_RP_UP_EI: u32 = 0xa068;
pub const GEN6_RP_DOWN_EI: u32 = 0xa06c;
pub const GEN6_RP_IDLE_HYSTERSIS: u32 = 0xa070;
pub const GEN6_RC_CONTROL: u32 = 0xa090;
pub const GEN6_RC_STATE: u32 = 0xa094;
pub const GEN6_RC1_WAKE_RATE_LIMIT: u32 = 0xa098;
pub const GEN6_RC6_WAKE_RATE_LIMIT: u32 = 0xa09c;
pub const GEN6_RC_EVALUATION_INTERVAL: u32 = 0xa0a8;
pub const GEN6_RC_IDLE_HYSTERSIS: u32 = 0xa0ac;
pub const GEN6_RC_SLEEP: u32 = 0xa0b0;
pub const GEN6_RC1E_THRESHOLD: u32 = 0xa0b4;
pub const GEN6_RC6_THRESHOLD: u32 = 0xa0b8;
pub const GEN6_PMINTRMSK: u32 = 0xa168;

// ── Bit definitions ──────────────────────────────────────────────────────────

pub mod dpll {
    pub const VCO_ENABLE: u32 = 1 << 31;
    pub const DVO_HIGH_SPEED: u32 = 1 << 30;
    pub const VGA_MODE_DIS: u32 = 1 << 28;
    pub const MODE_MASK: u32 = 3 << 26;
    pub const MODE_DAC_SERIAL: u32 = 1 << 26;
    pub const MODE_LVDS: u32 = 2 << 26;
    /// Shares the bit with `LVDS_P2_CLOCK_DIV_7`.
    pub const DAC_SERIAL_P2_CLOCK_DIV_5: u32 = 1 << 24;
    pub const LVDS_P2_CLOCK_DIV_7: u32 = 1 << 24;
    pub const P1_POST_DIV_MASK: u32 = 0x00ff_0000;
    pub const P1_POST_DIV_SHIFT: u32 = 16;
    pub const P1_POST_DIV_MASK_IGD: u32 = 0x00ff_8000;
    pub const P1_POST_DIV_SHIFT_IGD: u32 = 15;
    pub const REF_INPUT_MASK: u32 = 3 << 13;
    pub const REF_INPUT_DREFCLK: u32 = 0;
    pub const REF_INPUT_TVCLKINA: u32 = 1 << 13;
    pub const REF_INPUT_TVCLKINBC: u32 = 2 << 13;
    pub const REF_INPUT_SPREADSPECTRUMIN: u32 = 3 << 13;
    pub const RATE_SELECT_FPA1: u32 = 1 << 8;
    pub const SDVO_MULTIPLIER_MASK: u32 = 0xff;
    pub const SDVO_MULTIPLIER_SHIFT_HIRES: u32 = 4;

    // i830
    pub const P1_DIVIDE_BY_TWO: u32 = 1 << 21;
    pub const P2_DIVIDE_BY_4: u32 = 1 << 23;
    pub const P1_POST_DIV_MASK_I830: u32 = 0x001f_0000;
    pub const P1_POST_DIV_MASK_I830_LVDS: u32 = 0x003f_0000;
}

pub mod fp {
    pub const N_DIV_MASK: u32 = 0x003f_0000;
    pub const N_IGD_DIV_MASK: u32 = 0x00ff_0000;
    pub const N_DIV_SHIFT: u32 = 16;
    pub const M1_DIV_MASK: u32 = 0x0000_3f00;
    pub const M1_DIV_SHIFT: u32 = 8;
    pub const M2_DIV_MASK: u32 = 0x0000_003f;
    pub const M2_IGD_DIV_MASK: u32 = 0x0000_00ff;
    pub const M2_DIV_SHIFT: u32 = 0;
}

pub mod pipeconf {
    pub const ENABLE: u32 = 1 << 31;
    /// Gen4+: pipe is running.
    pub const I965_ACTIVE: u32 = 1 << 30;
    /// Pre-Gen4: same bit selects double-wide.
    pub const DOUBLE_WIDE: u32 = 1 << 30;
    pub const BPC_MASK: u32 = 7 << 5;
    pub const BPC_8: u32 = 0;
    pub const BPC_10: u32 = 1 << 5;
    pub const BPC_6: u32 = 2 << 5;
    pub const BPC_12: u32 = 3 << 5;
}

pub mod dspcntr {
    pub const PLANE_ENABLE: u32 = 1 << 31;
    pub const SEL_PIPE_B: u32 = 1 << 24;
}

/// `PIPExSTAT` bits, high half enables and low half status, in the order
/// the dumper prints them.
pub const PIPESTAT_BITS: &[(u32, &str)] = &[
    (1 << 31, "FIFO_UNDERRUN"),
    (1 << 29, "CRC_ERROR_ENABLE"),
    (1 << 28, "CRC_DONE_ENABLE"),
    (1 << 27, "GMBUS_EVENT_ENABLE"),
    (1 << 25, "VSYNC_INT_ENABLE"),
    (1 << 24, "DLINE_COMPARE_ENABLE"),
    (1 << 23, "DPST_EVENT_ENABLE"),
    (1 << 22, "LBLC_EVENT_ENABLE"),
    (1 << 21, "OFIELD_INT_ENABLE"),
    (1 << 20, "EFIELD_INT_ENABLE"),
    (1 << 18, "SVBLANK_INT_ENABLE"),
    (1 << 17, "VBLANK_INT_ENABLE"),
    (1 << 16, "OREG_UPDATE_ENABLE"),
    (1 << 13, "CRC_ERROR_INT_STATUS"),
    (1 << 12, "CRC_DONE_INT_STATUS"),
    (1 << 11, "GMBUS_INT_STATUS"),
    (1 << 9, "VSYNC_INT_STATUS"),
    (1 << 8, "DLINE_COMPARE_STATUS"),
    (1 << 7, "DPST_EVENT_STATUS"),
    (1 << 6, "LBLC_EVENT_STATUS"),
    (1 << 5, "OFIELD_INT_STATUS"),
    (1 << 4, "EFIELD_INT_STATUS"),
    (1 << 2, "SVBLANK_INT_STATUS"),
    (1 << 1, "VBLANK_INT_STATUS"),
    (1 << 0, "OREG_UPDATE_STATUS"),
];

pub const VGA_DISP_DISABLE: u32 = 1 << 31;

pub mod pp {
    pub const ON: u32 = 1 << 31;
    pub const READY: u32 = 1 << 30;
    pub const SEQUENCE_MASK: u32 = 3 << 28;
    pub const SEQUENCE_NONE: u32 = 0;
    pub const SEQUENCE_ON: u32 = 1 << 28;
    pub const SEQUENCE_OFF: u32 = 2 << 28;
    pub const POWER_TARGET_ON: u32 = 1 << 0;
}

pub mod adpa {
    pub const DAC_ENABLE: u32 = 1 << 31;
    pub const PIPE_B_SELECT: u32 = 1 << 30;
    pub const VSYNC_ACTIVE_HIGH: u32 = 1 << 4;
    pub const HSYNC_ACTIVE_HIGH: u32 = 1 << 3;
}

pub mod lvds {
    pub const PORT_EN: u32 = 1 << 31;
    pub const PIPEB_SELECT: u32 = 1 << 30;
    pub const A3_POWER_MASK: u32 = 3 << 6;
    pub const A3_POWER_UP: u32 = 3 << 6;
    pub const CLKB_POWER_MASK: u32 = 3 << 4;
    pub const CLKB_POWER_UP: u32 = 3 << 4;
    pub const B0B3_POWER_MASK: u32 = 3 << 2;
    pub const B0B3_POWER_UP: u32 = 3 << 2;
}

pub mod dvo {
    pub const ENABLE: u32 = 1 << 31;
    pub const PIPE_B_SELECT: u32 = 1 << 30;
    pub const PIPE_STALL_MASK: u32 = 3 << 28;
    pub const PIPE_STALL_UNUSED: u32 = 0;
    pub const PIPE_STALL: u32 = 1 << 28;
    pub const PIPE_STALL_TV: u32 = 2 << 28;
    pub const VSYNC_ACTIVE_HIGH: u32 = 1 << 4;
    pub const HSYNC_ACTIVE_HIGH: u32 = 1 << 3;
}

pub mod sdvo {
    pub const ENABLE: u32 = 1 << 31;
    pub const PIPE_B_SELECT: u32 = 1 << 30;
    pub const STALL_SELECT: u32 = 1 << 29;
    /// SDVOC only; same bit position as `STALL_SELECT`.
    pub const GANG_MODE: u32 = 1 << 29;
    pub const PORT_MULTIPLY_MASK: u32 = 15 << 23;
    pub const PORT_MULTIPLY_SHIFT: u32 = 23;
    pub const DETECTED: u32 = 1 << 2;
}

pub mod fence {
    pub const VALID: u32 = 1 << 0;
    pub const I965_Y_MAJOR: u32 = 1 << 1;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_blocks_do_not_overlap() {
        assert!(RENDER_RING_BASE + 0xff < GEN6_BSD_RING_BASE);
        assert!(GEN6_BSD_RING_BASE + 0xff < BLT_RING_BASE);
        assert_eq!(RENDER_RING_CTL, 0x203c);
    }

    #[test]
    fn pipe_b_mirrors_pipe_a() {
        assert_eq!(PIPEBCONF - PIPEACONF, 0x1000);
        assert_eq!(DSPBCNTR - DSPACNTR, 0x1000);
        assert_eq!(HTOTAL_B - HTOTAL_A, 0x1000);
        assert_eq!(VSYNC_B - VSYNC_A, 0x1000);
    }

    #[test]
    fn pipestat_bits_are_distinct() {
        let mut seen = 0u32;
        for &(bit, name) in PIPESTAT_BITS {
            assert_eq!(bit.count_ones(), 1, "{name}");
            assert_eq!(seen & bit, 0, "{name}");
            seen |= bit;
        }
    }
}
