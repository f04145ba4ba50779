// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared types for the Intel display clock and FDI drivers.
//!
//! This crate holds the register port abstraction used by `drv/intel-dpll`
//! and `drv/intel-fdi`, the per-device [`HardwareProfile`], and the error
//! types of both drivers. It is factored out so that neither driver depends
//! on the other.

#![cfg_attr(not(any(test, feature = "fake")), no_std)]

mod error;
mod profile;

#[cfg(any(test, feature = "fake"))]
pub mod fake;

pub use error::{DpllError, FdiError};
pub use profile::{Generation, HardwareProfile, PchKind};

/// Polling interval used by [`GfxRw::wait_for_set`] and
/// [`GfxRw::wait_for_clear`], in microseconds.
pub const WAIT_INTERVAL_US: u32 = 50;

/// Logical register blocks. The register port translates a block and offset
/// into an MMIO address; on PCH platforms several of these move around.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RegisterBlock {
    NorthPipeAndPort,
    NorthPlaneControl,
    NorthShared,
    SouthShared,
    SouthTranscoderAndPort,
}

/// A 32-bit display register, named by block and offset within it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Register {
    pub block: RegisterBlock,
    pub offset: u32,
}

impl Register {
    pub const fn new(block: RegisterBlock, offset: u32) -> Self {
        Self { block, offset }
    }

    /// Returns the register `stride * n` bytes further into the same block.
    pub const fn nth(self, n: u32, stride: u32) -> Self {
        Self {
            block: self.block,
            offset: self.offset + n * stride,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Pipe {
    A,
    B,
    C,
}

impl Pipe {
    pub const fn index(self) -> u32 {
        match self {
            Pipe::A => 0,
            Pipe::B => 1,
            Pipe::C => 2,
        }
    }
}

/// The kind of output a PLL drives, which picks divider limits and the
/// post-divider regime.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LinkKind {
    LvdsSingle,
    LvdsDual,
    /// VGA DAC or SDVO.
    Analog,
    DisplayPort,
    Hdmi,
}

impl LinkKind {
    pub fn is_lvds(self) -> bool {
        matches!(self, LinkKind::LvdsSingle | LinkKind::LvdsDual)
    }
}

/// Register access for the display engine.
///
/// Display MMIO cannot fail, so unlike a bus-attached device none of these
/// return a `Result`; timeouts are reported by the polling helpers.
pub trait GfxRw {
    fn read32(&self, reg: Register) -> u32;

    fn write32(&self, reg: Register, value: u32);

    /// Busy-waits for at least `us` microseconds.
    fn spin(&self, us: u32);

    /// Performs a read-modify-write, writing `f(old)`.
    fn modify32<F>(&self, reg: Register, f: F)
    where
        F: FnOnce(u32) -> u32,
    {
        let v = self.read32(reg);
        self.write32(reg, f(v));
    }

    /// Flushes posted writes to the block containing `reg`.
    fn posting_read(&self, reg: Register) {
        let _ = self.read32(reg);
    }

    /// Waits until any bit of `mask` reads as set, checking every
    /// [`WAIT_INTERVAL_US`] up to `timeout_us`. Returns `false` on timeout.
    fn wait_for_set(&self, reg: Register, mask: u32, timeout_us: u32) -> bool {
        let mut waited = 0;
        while waited <= timeout_us {
            self.spin(WAIT_INTERVAL_US);
            if self.read32(reg) & mask != 0 {
                return true;
            }
            waited += WAIT_INTERVAL_US;
        }
        false
    }

    /// Waits until every bit of `mask` reads as clear; see
    /// [`GfxRw::wait_for_set`].
    fn wait_for_clear(
        &self,
        reg: Register,
        mask: u32,
        timeout_us: u32,
    ) -> bool {
        let mut waited = 0;
        while waited <= timeout_us {
            self.spin(WAIT_INTERVAL_US);
            if self.read32(reg) & mask == 0 {
                return true;
            }
            waited += WAIT_INTERVAL_US;
        }
        false
    }
}
