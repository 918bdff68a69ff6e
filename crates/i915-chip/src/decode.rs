//! Human-readable decoders for individual register values.
//!
//! Every decoder has the same shape, [`Decoder`], so the register tables in
//! [`crate::tables`] can store them as plain function pointers. Output
//! follows the classic dumper format, e.g. `"enabled, pipe A"` or
//! `"1024 active, 1344 total"`.

use crate::pcie::Platform;
use crate::regs::{adpa, dpll, dspcntr, dvo, fence, fp, lvds, pipeconf, pp, sdvo};
use crate::regs::{PIPESTAT_BITS, VGA_DISP_DISABLE};

/// Decoder function: platform and raw value in, description out.
pub type Decoder = fn(Platform, u32) -> String;

const fn on_off(set: bool) -> &'static str {
    if set {
        "en"
    } else {
        "dis"
    }
}

const fn pipe_letter(pipe_b: bool) -> char {
    if pipe_b {
        'B'
    } else {
        'A'
    }
}

const fn sync_sign(active_high: bool) -> char {
    if active_high {
        '+'
    } else {
        '-'
    }
}

/// 1-based index of the lowest set bit, 0 when no bit is set.
const fn ffs(v: u32) -> u32 {
    if v == 0 {
        0
    } else {
        v.trailing_zeros() + 1
    }
}

fn lo16(v: u32) -> u32 {
    v & 0xffff
}

fn hi16(v: u32) -> u32 {
    (v & 0xffff_0000) >> 16
}

pub fn bits16(_: Platform, val: u32) -> String {
    format!("0x{:04x}", val & 0xffff)
}

pub fn xy(_: Platform, val: u32) -> String {
    format!("{}, {}", lo16(val), hi16(val))
}

pub fn xy_minus1(_: Platform, val: u32) -> String {
    format!("{}, {}", lo16(val) + 1, hi16(val) + 1)
}

pub fn yx_minus1(_: Platform, val: u32) -> String {
    format!("{}, {}", hi16(val) + 1, lo16(val) + 1)
}

pub fn stride(_: Platform, val: u32) -> String {
    format!("{val} bytes")
}

pub fn hvtotal(_: Platform, val: u32) -> String {
    format!("{} active, {} total", lo16(val) + 1, hi16(val) + 1)
}

pub fn hvsyncblank(_: Platform, val: u32) -> String {
    format!("{} start, {} end", lo16(val) + 1, hi16(val) + 1)
}

pub fn vgacntrl(_: Platform, val: u32) -> String {
    if val & VGA_DISP_DISABLE != 0 {
        "disabled".into()
    } else {
        "enabled".into()
    }
}

pub fn dspcntr(platform: Platform, val: u32) -> String {
    let enabled = if val & dspcntr::PLANE_ENABLE != 0 {
        "enabled"
    } else {
        "disabled"
    };
    if platform.has_pch_split() {
        enabled.to_string()
    } else {
        format!(
            "{enabled}, pipe {}",
            pipe_letter(val & dspcntr::SEL_PIPE_B != 0)
        )
    }
}

pub fn pipeconf(platform: Platform, val: u32) -> String {
    let enabled = if val & pipeconf::ENABLE != 0 {
        "enabled"
    } else {
        "disabled"
    };
    let bit30 = if platform.is_965() {
        if val & pipeconf::I965_ACTIVE != 0 {
            "active"
        } else {
            "inactive"
        }
    } else if val & pipeconf::DOUBLE_WIDE != 0 {
        "double-wide"
    } else {
        "single-wide"
    };

    if platform.has_pch_split() {
        let interlace = match (val >> 21) & 7 {
            0 => "pf-pd",
            1 => "pf-id",
            3 => "if-id",
            4 => "if-id-dbl",
            5 => "pf-id-dbl",
            _ => "rsvd",
        };
        let rotation = match (val >> 14) & 3 {
            0 => "rotate 0",
            1 => "rotate 90",
            2 => "rotate 180",
            _ => "rotate 270",
        };
        let bpc = match val & pipeconf::BPC_MASK {
            pipeconf::BPC_8 => "8bpc",
            pipeconf::BPC_10 => "10bpc",
            pipeconf::BPC_6 => "6bpc",
            pipeconf::BPC_12 => "12bpc",
            _ => "invalid bpc",
        };
        format!("{enabled}, {bit30}, {interlace}, {rotation}, {bpc}")
    } else if platform.generation() == 4 {
        let interlace = match (val >> 21) & 7 {
            0..=3 => "progressive",
            4 => "interlaced embedded",
            5 => "interlaced",
            6 => "interlaced sdvo",
            _ => "interlaced legacy",
        };
        format!("{enabled}, {bit30}, {interlace}")
    } else {
        format!("{enabled}, {bit30}")
    }
}

pub fn pipestat(_: Platform, val: u32) -> String {
    let mut out = String::from("status:");
    for &(bit, name) in PIPESTAT_BITS {
        if val & bit != 0 {
            out.push(' ');
            out.push_str(name);
        }
    }
    out
}

pub fn fp(platform: Platform, val: u32) -> String {
    let m1 = (val & fp::M1_DIV_MASK) >> fp::M1_DIV_SHIFT;
    if platform.is_igd() {
        let n = ffs((val & fp::N_IGD_DIV_MASK) >> fp::N_DIV_SHIFT).saturating_sub(1);
        let m2 = (val & fp::M2_IGD_DIV_MASK) >> fp::M2_DIV_SHIFT;
        format!("n = {n}, m1 = {m1}, m2 = {m2}")
    } else {
        let n = (val & fp::N_DIV_MASK) >> fp::N_DIV_SHIFT;
        let m2 = (val & fp::M2_DIV_MASK) >> fp::M2_DIV_SHIFT;
        format!("n = {n}, m1 = {m1}, m2 = {m2}")
    }
}

fn dpll_common(platform: Platform, val: u32, is_pipe_b: bool) -> String {
    let enabled = if val & dpll::VCO_ENABLE != 0 {
        "enabled"
    } else {
        "disabled"
    };
    let dvomode = if val & dpll::DVO_HIGH_SPEED != 0 {
        "dvo"
    } else {
        "non-dvo"
    };
    let vgamode = if val & dpll::VGA_MODE_DIS != 0 { "" } else { ", VGA" };
    let fpextra = if val & dpll::RATE_SELECT_FPA1 != 0 {
        ", using FPx1!"
    } else {
        ""
    };

    let (mode, p1, p2) = if platform.generation() == 2 {
        let p1 = if val & dpll::P1_DIVIDE_BY_TWO != 0 {
            2
        } else {
            ((val & dpll::P1_POST_DIV_MASK_I830) >> dpll::P1_POST_DIV_SHIFT) + 2
        };
        let p2 = if val & dpll::P2_DIVIDE_BY_4 != 0 { 4 } else { 2 };
        ("DAC/serial", p1, p2)
    } else {
        let p1 = if platform.is_igd() {
            ffs((val & dpll::P1_POST_DIV_MASK_IGD) >> dpll::P1_POST_DIV_SHIFT_IGD)
        } else {
            ffs((val & dpll::P1_POST_DIV_MASK) >> dpll::P1_POST_DIV_SHIFT)
        };
        match val & dpll::MODE_MASK {
            dpll::MODE_DAC_SERIAL => {
                let p2 = if val & dpll::DAC_SERIAL_P2_CLOCK_DIV_5 != 0 { 5 } else { 10 };
                ("DAC/serial", p1, p2)
            }
            dpll::MODE_LVDS => {
                let p2 = if val & dpll::LVDS_P2_CLOCK_DIV_7 != 0 { 7 } else { 14 };
                ("LVDS", p1, p2)
            }
            _ => ("unknown", p1, 0),
        }
    };

    let clock = match val & dpll::REF_INPUT_MASK {
        dpll::REF_INPUT_DREFCLK => "default",
        dpll::REF_INPUT_TVCLKINA => "TV A",
        dpll::REF_INPUT_TVCLKINBC => "TV B/C",
        _ if is_pipe_b => "spread spectrum",
        _ => "unknown",
    };

    let sdvoextra = if matches!(platform, Platform::I945) {
        format!(
            ", SDVO mult {}",
            ((val & dpll::SDVO_MULTIPLIER_MASK) >> dpll::SDVO_MULTIPLIER_SHIFT_HIRES) + 1
        )
    } else {
        String::new()
    };

    format!(
        "{enabled}, {dvomode}{vgamode}, {clock} clock, {mode} mode, p1 = {p1}, p2 = {p2}{fpextra}{sdvoextra}"
    )
}

pub fn dpll_a(platform: Platform, val: u32) -> String {
    dpll_common(platform, val, false)
}

pub fn dpll_b(platform: Platform, val: u32) -> String {
    dpll_common(platform, val, true)
}

pub fn pp_status(_: Platform, val: u32) -> String {
    let status = if val & pp::ON != 0 { "on" } else { "off" };
    let ready = if val & pp::READY != 0 {
        "ready"
    } else {
        "not ready"
    };
    let seq = match val & pp::SEQUENCE_MASK {
        pp::SEQUENCE_NONE => "idle",
        pp::SEQUENCE_ON => "on",
        pp::SEQUENCE_OFF => "off",
        _ => "unknown",
    };
    format!("{status}, {ready}, sequencing {seq}")
}

pub fn pp_control(_: Platform, val: u32) -> String {
    let target = if val & pp::POWER_TARGET_ON != 0 {
        "on"
    } else {
        "off"
    };
    format!("power target: {target}")
}

pub fn adpa(platform: Platform, val: u32) -> String {
    let enable = if val & adpa::DAC_ENABLE != 0 {
        "enabled"
    } else {
        "disabled"
    };
    let hsync = sync_sign(val & adpa::HSYNC_ACTIVE_HIGH != 0);
    let vsync = sync_sign(val & adpa::VSYNC_ACTIVE_HIGH != 0);
    if platform.has_pch_split() {
        // CPT moved the transcoder select to bit 29.
        let pipe = pipe_letter(val & (1 << 29) != 0);
        format!("{enable}, transcoder {pipe}, {hsync}hsync, {vsync}vsync")
    } else {
        let pipe = pipe_letter(val & adpa::PIPE_B_SELECT != 0);
        format!("{enable}, pipe {pipe}, {hsync}hsync, {vsync}vsync")
    }
}

pub fn lvds(platform: Platform, val: u32) -> String {
    let enable = if val & lvds::PORT_EN != 0 {
        "enabled"
    } else {
        "disabled"
    };
    let pipe = if platform.has_pch_split() {
        pipe_letter(val & (1 << 29) != 0)
    } else {
        pipe_letter(val & lvds::PIPEB_SELECT != 0)
    };
    let depth = if val & lvds::A3_POWER_MASK == lvds::A3_POWER_UP {
        24
    } else {
        18
    };
    let channels = if val & lvds::B0B3_POWER_MASK == lvds::B0B3_POWER_UP {
        "2 channels"
    } else {
        "1 channel"
    };
    format!("{enable}, pipe {pipe}, {depth} bit, {channels}")
}

pub fn dvo(_: Platform, val: u32) -> String {
    let enable = if val & dvo::ENABLE != 0 {
        "enabled"
    } else {
        "disabled"
    };
    let pipe = pipe_letter(val & dvo::PIPE_B_SELECT != 0);
    let stall = match val & dvo::PIPE_STALL_MASK {
        dvo::PIPE_STALL_UNUSED => "no stall",
        dvo::PIPE_STALL => "stall",
        dvo::PIPE_STALL_TV => "TV stall",
        _ => "unknown stall",
    };
    let hsync = sync_sign(val & dvo::HSYNC_ACTIVE_HIGH != 0);
    let vsync = sync_sign(val & dvo::VSYNC_ACTIVE_HIGH != 0);
    format!("{enable}, pipe {pipe}, {stall}, {hsync}hsync, {vsync}vsync")
}

pub fn sdvo(platform: Platform, val: u32) -> String {
    let enable = if val & sdvo::ENABLE != 0 {
        "enabled"
    } else {
        "disabled"
    };
    let pipe = pipe_letter(val & sdvo::PIPE_B_SELECT != 0);
    let stall = on_off(val & sdvo::STALL_SELECT != 0);
    let detected = if val & sdvo::DETECTED != 0 { "" } else { "not " };
    let mult = if matches!(platform, Platform::I915) {
        format!(
            ", SDVO mult {}",
            ((val & sdvo::PORT_MULTIPLY_MASK) >> sdvo::PORT_MULTIPLY_SHIFT) + 1
        )
    } else {
        String::new()
    };
    format!("{enable}, pipe {pipe}, stall {stall}abled, {detected}detected{mult}")
}

pub fn gen6_rp_control(_: Platform, val: u32) -> String {
    if val & (1 << 7) != 0 {
        "enabled".into()
    } else {
        "disabled".into()
    }
}

/// Low dword of a 965-style fence.
pub fn fence_965_start(platform: Platform, val: u32) -> String {
    if !platform.is_965() {
        return String::new();
    }
    let enable = if val & fence::VALID != 0 {
        " enabled"
    } else {
        "disabled"
    };
    let format = if val & fence::I965_Y_MAJOR != 0 { 'Y' } else { 'X' };
    let pitch = ((val & 0xffc) >> 2) * 128 + 128;
    let offset = val & 0xffff_f000;
    format!("{enable}, {format} tile walk, {pitch:4} pitch, 0x{offset:08x} start")
}

/// High dword of a 965-style fence.
pub fn fence_965_end(platform: Platform, val: u32) -> String {
    if !platform.is_965() {
        return String::new();
    }
    format!("{:>35}0x{:08x} end", "", val & 0xffff_f000)
}

/// Dot clock derived from a pipe's DPLL and FP registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PllClock {
    /// Reference clock in kHz.
    pub reference_khz: u32,
    pub n: u32,
    pub m1: u32,
    pub m2: u32,
    pub p1: u32,
    pub p2: u32,
    /// Resulting dot clock in kHz.
    pub dot_khz: u32,
}

impl PllClock {
    /// Derive the dot clock for a Gen3/Gen4 pipe.
    ///
    /// `lvds` is the LVDS port register and `pipe_b` selects which pipe the
    /// DPLL feeds; an LVDS port on the same pipe decides P2. Returns `None`
    /// when a field holds a value the hardware does not define.
    #[must_use]
    pub fn from_registers(
        platform: Platform,
        dpll_val: u32,
        fp_val: u32,
        lvds_val: u32,
        pipe_b: bool,
    ) -> Option<Self> {
        let lvds_on_pipe = lvds_val & lvds::PORT_EN != 0
            && (lvds_val & lvds::PIPEB_SELECT != 0) == pipe_b;
        let p2 = if lvds_on_pipe {
            if lvds_val & lvds::CLKB_POWER_MASK == lvds::CLKB_POWER_UP {
                7
            } else {
                14
            }
        } else {
            match (dpll_val >> 24) & 0x3 {
                0 => 10,
                1 => 5,
                _ => return None,
            }
        };

        let p1_field = if platform.is_igd() {
            (dpll_val >> dpll::P1_POST_DIV_SHIFT_IGD) & 0x1ff
        } else {
            (dpll_val >> dpll::P1_POST_DIV_SHIFT) & 0xff
        };
        if !p1_field.is_power_of_two() {
            return None;
        }
        let p1 = ffs(p1_field);

        let reference_khz = match (dpll_val >> 13) & 0x3 {
            0 => 96_000,
            3 => 100_000,
            _ => return None,
        };

        let m1 = (fp_val >> 8) & 0x3f;
        let (n, m2, dot_khz) = if platform.is_igd() {
            let n = ffs((fp_val & fp::N_IGD_DIV_MASK) >> fp::N_DIV_SHIFT).checked_sub(1)?;
            let m2 = (fp_val & fp::M2_IGD_DIV_MASK) >> fp::M2_DIV_SHIFT;
            if n == 0 {
                return None;
            }
            (n, m2, reference_khz * (m2 + 2) / n / (p1 * p2))
        } else {
            let n = (fp_val >> 16) & 0x3f;
            let m2 = fp_val & 0x3f;
            let m = 5 * (m1 + 2) + (m2 + 2);
            (n, m2, reference_khz * m / (n + 2) / (p1 * p2))
        };

        Some(Self {
            reference_khz,
            n,
            m1,
            m2,
            p1,
            p2,
            dot_khz,
        })
    }
}

impl std::fmt::Display for PllClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "dot {} n {} m1 {} m2 {} p1 {} p2 {}",
            self.dot_khz, self.n, self.m1, self.m2, self.p1, self.p2
        )
    }
}
