//! ValleyView MMIO region classifier.
//!
//! ValleyView moved the display engine registers up by a fixed
//! [`DISPLAY_BASE`] while leaving the render, media and blitter registers
//! at their legacy offsets. Tools written against the legacy register map
//! therefore have to decide, per offset, whether to add the display base
//! before touching the mapped BAR.
//!
//! The decision is an ordered rule table. Rules are evaluated in
//! declaration order and the first match wins; an offset matching no rule
//! is a display register.
//!
//! ```text
//! 0x000000 ─┬─ render / bsd / blt ring windows, fences,   → NonDisplay (offset as-is)
//!           │  interrupts, force-wake, chicken bits
//!           ├─ anything else below 0x180000               → Display    (+ 0x180000)
//! 0x180000 ─┴─ already inside the display aperture        → Display    (offset as-is)
//! ```

use crate::regs;

/// Offset of the display aperture inside the ValleyView MMIO BAR.
pub const DISPLAY_BASE: u32 = 0x18_0000;

/// Which aperture a register offset belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionClass {
    /// Display engine register.
    Display,
    /// Render, media, blitter, fence, interrupt or power-management register.
    NonDisplay,
}

/// How a rule tests an offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Matcher {
    /// Inclusive range `first..=last`.
    Range {
        /// First matching offset.
        first: u32,
        /// Last matching offset.
        last: u32,
    },
    /// One of a fixed set of offsets.
    Exact(&'static [u32]),
}

impl Matcher {
    /// Whether `offset` is matched.
    #[must_use]
    pub fn matches(&self, offset: u32) -> bool {
        match *self {
            Self::Range { first, last } => offset >= first && offset <= last,
            Self::Exact(values) => values.contains(&offset),
        }
    }
}

/// One entry of the classification table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionRule {
    /// Short name shown by `intel-reg classify`.
    pub name: &'static str,
    /// Offsets covered by this rule.
    pub matcher: Matcher,
    /// Class assigned on match.
    pub class: RegionClass,
}

impl RegionRule {
    const fn range(name: &'static str, first: u32, last: u32, class: RegionClass) -> Self {
        Self {
            name,
            matcher: Matcher::Range { first, last },
            class,
        }
    }

    const fn non_display(name: &'static str, first: u32, last: u32) -> Self {
        Self::range(name, first, last, RegionClass::NonDisplay)
    }

    const fn exact(name: &'static str, values: &'static [u32]) -> Self {
        Self {
            name,
            matcher: Matcher::Exact(values),
            class: RegionClass::NonDisplay,
        }
    }
}

// Window size shared by the three ring register blocks.
const RING_WINDOW: u32 = 0xff;

const FENCE_COUNT: u32 = 16;
const FENCE_STRIDE: u32 = 8;

/// The classification table, in evaluation order.
///
/// Several entries are shadowed by earlier ones (the ring-internal error
/// registers by the render ring window, the VLV interrupt range by the
/// display-base rule). They stay in place so that edits to earlier rules
/// cannot silently change what later ones mean.
static RULES: &[RegionRule] = &[
    RegionRule::range("display aperture", DISPLAY_BASE, u32::MAX, RegionClass::Display),
    RegionRule::non_display(
        "render ring",
        regs::RENDER_RING_BASE,
        regs::RENDER_RING_BASE + RING_WINDOW,
    ),
    RegionRule::non_display(
        "bsd ring",
        regs::GEN6_BSD_RING_BASE,
        regs::GEN6_BSD_RING_BASE + RING_WINDOW,
    ),
    RegionRule::non_display(
        "blt ring",
        regs::BLT_RING_BASE,
        regs::BLT_RING_BASE + RING_WINDOW,
    ),
    RegionRule::exact("PGTBL_ER", &[regs::PGTBL_ER]),
    RegionRule::non_display("IPEIR..HWSTAM", regs::IPEIR_I965, regs::HWSTAM - 1),
    RegionRule::exact("MI_MODE", &[regs::MI_MODE]),
    RegionRule::exact("GFX_MODE_GEN7", &[regs::GFX_MODE_GEN7]),
    RegionRule::exact(
        "hardware status page",
        &[
            regs::RENDER_HWS_PGA_GEN7,
            regs::BSD_HWS_PGA_GEN7,
            regs::BLT_HWS_PGA_GEN7,
        ],
    ),
    RegionRule::exact(
        "bsd sleep / rncid",
        &[regs::GEN6_BSD_SLEEP_PSMI_CONTROL, regs::GEN6_BSD_RNCID],
    ),
    RegionRule::exact("GEN6_BLITTER_ECOSKPD", &[regs::GEN6_BLITTER_ECOSKPD]),
    RegionRule::non_display("0x4000c window", 0x4000c, 0x4002c),
    RegionRule::non_display("0x4f000 window", 0x4f000, 0x4f08f),
    RegionRule::non_display("0x4f100 window", 0x4f100, 0x4f11f),
    RegionRule::non_display("master / pm IER", regs::VLV_MASTER_IER, regs::GEN6_PMIER),
    RegionRule::non_display(
        "fence registers",
        regs::FENCE_REG_SANDYBRIDGE_0,
        regs::FENCE_REG_SANDYBRIDGE_0 + FENCE_COUNT * FENCE_STRIDE - 1,
    ),
    RegionRule::non_display("VLV IIR..ISR", regs::VLV_IIR_RW, regs::VLV_ISR),
    RegionRule::exact(
        "force-wake",
        &[regs::FORCEWAKE_VLV, regs::FORCEWAKE_ACK_VLV, regs::FORCEWAKE_VLV_AUX],
    ),
    RegionRule::exact("GEN6_GDRST", &[regs::GEN6_GDRST]),
    // Lower bound is exclusive.
    RegionRule::non_display("clock gating", 0x9401, 0x9418),
    RegionRule::exact(
        "chicken / L3 / MBC / UCG",
        &[
            regs::_3D_CHICKEN3,
            regs::IVB_CHICKEN3,
            regs::GEN7_HALF_SLICE_CHICKEN1,
            regs::GEN7_COMMON_SLICE_CHICKEN1,
            regs::GEN7_L3CNTLREG1,
            regs::GEN7_L3_CHICKEN_MODE_REGISTER,
            regs::GEN7_ROW_CHICKEN2,
            regs::GEN7_L3SQCREG4,
            regs::GEN7_SQ_CHICKEN_MBCUNIT_CONFIG,
            regs::GEN6_MBCTL,
            regs::GEN6_UCGCTL2,
            regs::GEN7_UCGCTL4,
        ],
    ),
];

/// Result of classifying one offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    /// Aperture the offset belongs to.
    pub class: RegionClass,
    /// Rule that decided, or `None` when no rule matched.
    pub rule: Option<&'static RegionRule>,
}

impl Classification {
    /// Whether the display base must be added before dereferencing.
    ///
    /// Only offsets that fell through to the default branch are legacy
    /// display offsets; the high range is already based.
    #[must_use]
    pub const fn needs_display_base(&self) -> bool {
        self.rule.is_none()
    }
}

/// The rule table in evaluation order.
#[must_use]
pub fn rules() -> &'static [RegionRule] {
    RULES
}

/// Classify a raw (not base-adjusted) register offset.
#[must_use]
pub fn classify(offset: u32) -> Classification {
    RULES
        .iter()
        .find(|rule| rule.matcher.matches(offset))
        .map_or(
            Classification {
                class: RegionClass::Display,
                rule: None,
            },
            |rule| Classification {
                class: rule.class,
                rule: Some(rule),
            },
        )
}

/// `true` when `offset` is not a display register and must be accessed
/// without the display base.
#[must_use]
pub fn is_non_display_register(offset: u32) -> bool {
    classify(offset).class == RegionClass::NonDisplay
}

/// Offset to dereference on ValleyView for a legacy register offset.
#[must_use]
pub fn display_offset(offset: u32) -> u32 {
    if classify(offset).needs_display_base() {
        offset + DISPLAY_BASE
    } else {
        offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_ring_window_is_non_display() {
        for reg in 0x2000..=0x20ff {
            assert!(is_non_display_register(reg), "{reg:#x}");
        }
        assert!(!is_non_display_register(0x1fff));
    }

    #[test]
    fn bsd_and_blt_ring_windows() {
        assert!(is_non_display_register(0x12000));
        assert!(is_non_display_register(0x120ff));
        assert!(is_non_display_register(0x22000));
        assert!(is_non_display_register(0x2203c));
        assert!(!is_non_display_register(0x22100));
    }

    #[test]
    fn high_range_is_display_and_checked_first() {
        assert!(!is_non_display_register(DISPLAY_BASE));
        assert!(!is_non_display_register(u32::MAX));
        // Inside the VLV interrupt rule, but the display-base rule comes first.
        let c = classify(0x18_2090);
        assert_eq!(c.class, RegionClass::Display);
        assert_eq!(c.rule.map(|r| r.name), Some("display aperture"));
        assert!(!c.needs_display_base());
    }

    #[test]
    fn fence_array_bounds() {
        assert!(is_non_display_register(0x10_0000));
        assert!(is_non_display_register(0x10_0000 + 15 * 8));
        assert!(is_non_display_register(0x10_0000 + 15 * 8 + 4));
        assert!(!is_non_display_register(0x10_0000 + 16 * 8));
    }

    #[test]
    fn force_wake_registers() {
        assert!(is_non_display_register(0x13_00b0));
        assert!(is_non_display_register(0x13_00b4));
        assert!(is_non_display_register(0x13_0090));
        assert!(!is_non_display_register(0x13_00b8));
    }

    #[test]
    fn chicken_bit_exact_matches() {
        assert!(is_non_display_register(0x02090));
        assert!(is_non_display_register(0xb034));
        assert!(!is_non_display_register(0xb035));
        assert!(is_non_display_register(0x4200c));
        assert!(is_non_display_register(0x7010));
        assert!(is_non_display_register(0x907c));
    }

    #[test]
    fn clock_gating_window_excludes_lower_bound() {
        assert!(!is_non_display_register(0x9400));
        assert!(is_non_display_register(0x9401));
        assert!(is_non_display_register(0x9418));
        assert!(!is_non_display_register(0x9419));
        assert!(is_non_display_register(0x941c));
    }

    #[test]
    fn small_windows_are_inclusive() {
        assert!(!is_non_display_register(0x4000b));
        assert!(is_non_display_register(0x4000c));
        assert!(is_non_display_register(0x4002c));
        assert!(is_non_display_register(0x4f08f));
        assert!(!is_non_display_register(0x4f090));
        assert!(is_non_display_register(0x4f11f));
        assert!(is_non_display_register(0x4400c));
        assert!(is_non_display_register(0x4402c));
        assert!(!is_non_display_register(0x44030));
    }

    #[test]
    fn engine_singletons() {
        for reg in [0x229c, 0x4080, 0x4180, 0x4280, 0x12050, 0x12198, 0x221d0] {
            assert!(is_non_display_register(reg), "{reg:#x}");
        }
    }

    #[test]
    fn unmatched_offsets_default_to_display() {
        for reg in [0x0, 0x6014, 0x60000, 0x70008, 0x71400, 0xa024, 0xe4f0] {
            let c = classify(reg);
            assert_eq!(c.class, RegionClass::Display, "{reg:#x}");
            assert!(c.rule.is_none());
        }
    }

    #[test]
    fn first_match_names_the_ring_window() {
        // PGTBL_ER and MI_MODE sit inside the render ring window.
        assert_eq!(classify(0x2024).rule.map(|r| r.name), Some("render ring"));
        assert_eq!(classify(0x209c).rule.map(|r| r.name), Some("render ring"));
    }

    #[test]
    fn display_offset_adjusts_only_legacy_display_registers() {
        assert_eq!(display_offset(0x70008), 0x1f_0008);
        assert_eq!(display_offset(0x2030), 0x2030);
        assert_eq!(display_offset(0x18_0010), 0x18_0010);
        assert_eq!(display_offset(0x13_00b0), 0x13_00b0);
    }

    #[test]
    fn classification_is_pure() {
        let mut state = 0x2545_f491_u32;
        for _ in 0..4096 {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            let reg = state % 0x20_0000;
            assert_eq!(classify(reg), classify(reg));
            assert_eq!(is_non_display_register(reg), is_non_display_register(reg));
        }
    }

    #[test]
    fn rule_table_starts_with_display_base() {
        let first = rules()[0];
        assert_eq!(first.class, RegionClass::Display);
        assert_eq!(first.matcher, Matcher::Range { first: DISPLAY_BASE, last: u32::MAX });
        assert!(rules()[1..].iter().all(|r| r.class == RegionClass::NonDisplay));
    }
}
