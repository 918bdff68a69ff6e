//! Silicon model for Intel i915-class GPUs (Gen2 through Gen7).
//!
//! This crate has **no dependencies** and **no hardware access**. It is a
//! pure model of the silicon: PCI identifiers, the register map, the
//! ValleyView display-aperture classifier, batch command encodings and the
//! register decoders used by the dump tooling.
//!
//! # Crate organisation
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`pcie`] | Vendor/device IDs, [`pcie::Platform`] and its capabilities |
//! | [`regs`] | MMIO register offsets and bit definitions |
//! | [`vlv`] | MMIO region classifier (display vs. engine aperture) |
//! | [`mi`] | `MI_*` and blitter command encodings, GEM domains, rings |
//! | [`decode`] | Per-register value decoders and the PLL dot clock |
//! | [`tables`] | Named register tables and name/address lookup |

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod decode;
pub mod mi;
pub mod pcie;
pub mod regs;
pub mod tables;
pub mod vlv;

pub use pcie::Platform;
pub use vlv::{classify, display_offset, is_non_display_register, RegionClass};
