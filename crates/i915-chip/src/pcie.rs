//! PCI identifiers and the platform table.
//!
//! The platform is derived from the PCI device id alone. It decides which
//! register tables a dump prints, how a few decoders interpret shared bits,
//! which rings exist, and whether the display block sits behind a separate
//! base ([`Platform::display_base`]).

use crate::vlv;

/// Intel vendor ID (PCI-SIG assigned).
pub const INTEL_VENDOR_ID: u16 = 0x8086;

/// PCI base class for display controllers (`/sys/.../class >> 16`).
pub const PCI_CLASS_DISPLAY: u32 = 0x03;

/// Device IDs per family.
pub mod device_id {
    pub const I830: &[u16] = &[0x3577, 0x2562, 0x3582, 0x2572];
    pub const I915: &[u16] = &[0x2582, 0x258a, 0x2592];
    pub const I945: &[u16] = &[0x2772, 0x27a2, 0x27ae];
    pub const G33: &[u16] = &[0x29b2, 0x29c2, 0x29d2];
    pub const PINEVIEW: &[u16] = &[0xa001, 0xa011];
    pub const I965: &[u16] = &[0x2972, 0x2982, 0x2992, 0x29a2, 0x2a02, 0x2a12];
    pub const G4X: &[u16] = &[0x2a42, 0x2e02, 0x2e12, 0x2e22, 0x2e32, 0x2e42, 0x2e92];
    pub const IRONLAKE: &[u16] = &[0x0042, 0x0046];
    pub const SANDYBRIDGE: &[u16] = &[0x0102, 0x0106, 0x010a, 0x0112, 0x0116, 0x0122, 0x0126];
    pub const IVYBRIDGE: &[u16] = &[0x0152, 0x0156, 0x015a, 0x0162, 0x0166, 0x016a];
    pub const VALLEYVIEW: &[u16] = &[0x0f30, 0x0f31, 0x0f32, 0x0f33, 0x0155, 0x0157];
    pub const HASWELL: &[u16] = &[
        0x0402, 0x0406, 0x040a, 0x0412, 0x0416, 0x041a, 0x0422, 0x0426, 0x042a,
    ];

    /// Mobile parts, used by decoders that only apply to mobile chipsets.
    pub const MOBILE: &[u16] = &[
        0x3577, 0x3582, 0x2592, 0x27a2, 0x27ae, 0xa011, 0x2a02, 0x2a12, 0x2a42, 0x0046,
        0x0106, 0x0116, 0x0126, 0x0156, 0x0166,
    ];
}

/// GPU platform, one variant per display/engine generation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    /// 830 / 845 / 855 / 865.
    I830,
    /// 915G / 915GM.
    I915,
    /// 945G / 945GM.
    I945,
    /// G33 / Q33 / Q35.
    G33,
    /// Pineview (IGD).
    Pineview,
    /// 965G / 965GM.
    I965,
    /// G45 / GM45.
    G4x,
    /// Ironlake (first PCH split).
    Ironlake,
    /// Sandybridge.
    SandyBridge,
    /// Ivybridge.
    IvyBridge,
    /// ValleyView, the only platform with a relocated display block.
    ValleyView,
    /// Haswell.
    Haswell,
    /// Device id not in any table.
    Unknown(u16),
}

impl Platform {
    /// Every known platform, oldest first.
    pub const ALL: &'static [Self] = &[
        Self::I830,
        Self::I915,
        Self::I945,
        Self::G33,
        Self::Pineview,
        Self::I965,
        Self::G4x,
        Self::Ironlake,
        Self::SandyBridge,
        Self::IvyBridge,
        Self::ValleyView,
        Self::Haswell,
    ];

    /// Identify the platform from a PCI device id.
    #[must_use]
    pub fn from_device_id(id: u16) -> Self {
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.device_ids().contains(&id))
            .unwrap_or(Self::Unknown(id))
    }

    /// Device ids belonging to this platform.
    #[must_use]
    pub const fn device_ids(&self) -> &'static [u16] {
        match self {
            Self::I830 => device_id::I830,
            Self::I915 => device_id::I915,
            Self::I945 => device_id::I945,
            Self::G33 => device_id::G33,
            Self::Pineview => device_id::PINEVIEW,
            Self::I965 => device_id::I965,
            Self::G4x => device_id::G4X,
            Self::Ironlake => device_id::IRONLAKE,
            Self::SandyBridge => device_id::SANDYBRIDGE,
            Self::IvyBridge => device_id::IVYBRIDGE,
            Self::ValleyView => device_id::VALLEYVIEW,
            Self::Haswell => device_id::HASWELL,
            Self::Unknown(_) => &[],
        }
    }

    /// Hardware generation (2–7). Unknown devices report 0.
    #[must_use]
    pub const fn generation(&self) -> u8 {
        match self {
            Self::I830 => 2,
            Self::I915 | Self::I945 | Self::G33 | Self::Pineview => 3,
            Self::I965 | Self::G4x => 4,
            Self::Ironlake => 5,
            Self::SandyBridge => 6,
            Self::IvyBridge | Self::ValleyView | Self::Haswell => 7,
            Self::Unknown(_) => 0,
        }
    }

    /// Whether `id` is a mobile part.
    #[must_use]
    pub fn is_mobile(id: u16) -> bool {
        device_id::MOBILE.contains(&id)
    }

    /// 965-style fences, pipe config and DPLL layout (Gen4+).
    #[must_use]
    pub const fn is_965(&self) -> bool {
        self.generation() >= 4
    }

    /// Pineview uses the IGD divisor layout.
    #[must_use]
    pub const fn is_igd(&self) -> bool {
        matches!(self, Self::Pineview)
    }

    /// Display outputs live in a separate PCH.
    #[must_use]
    pub const fn has_pch_split(&self) -> bool {
        matches!(
            self,
            Self::Ironlake | Self::SandyBridge | Self::IvyBridge | Self::Haswell
        )
    }

    /// Video decode ring present.
    #[must_use]
    pub const fn has_bsd_ring(&self) -> bool {
        matches!(self, Self::G4x) || self.generation() >= 5
    }

    /// Blitter ring present.
    #[must_use]
    pub const fn has_blt_ring(&self) -> bool {
        self.generation() >= 6
    }

    /// Base of the relocated display block, if this platform has one.
    #[must_use]
    pub const fn display_base(&self) -> Option<u32> {
        match self {
            Self::ValleyView => Some(vlv::DISPLAY_BASE),
            _ => None,
        }
    }

    /// Offset to dereference for a legacy register offset.
    #[must_use]
    pub fn resolve_offset(&self, offset: u32) -> u32 {
        if self.display_base().is_some() {
            vlv::display_offset(offset)
        } else {
            offset
        }
    }

    /// Short marketing-ish name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::I830 => "i830",
            Self::I915 => "i915",
            Self::I945 => "i945",
            Self::G33 => "G33",
            Self::Pineview => "Pineview",
            Self::I965 => "i965",
            Self::G4x => "G4x",
            Self::Ironlake => "Ironlake",
            Self::SandyBridge => "Sandybridge",
            Self::IvyBridge => "Ivybridge",
            Self::ValleyView => "Valleyview",
            Self::Haswell => "Haswell",
            Self::Unknown(_) => "unknown",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown(id) => write!(f, "unknown ({id:#06x})"),
            other => f.write_str(other.name()),
        }
    }
}
