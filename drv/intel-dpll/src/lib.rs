// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Display PLL divisor search and programming for Intel graphics.
//!
//! Every generation synthesizes the pixel clock differently, so there are
//! four search strategies behind the [`DpllSolve`] trait:
//!
//! | Strategy | Generations | Output |
//! |----------|-------------|--------|
//! | [`ClassicMnp`] | 85x through Ivy Bridge | `ref * m / n / (p1 * p2)` |
//! | [`HswWrpll`] | Haswell, Broadwell | `LCPLL * n2 / (r2 * p)` |
//! | [`SklWrpll`] | Skylake | DCO near a central frequency |
//! | [`TglCentered`] | TigerLake | DCO nearest the middle of its range |
//!
//! The searches are pure functions of the target clock and the
//! [`HardwareProfile`]; only [`program`] touches registers.

#![cfg_attr(not(test), no_std)]

use drv_intel_gfx_api::{DpllError, Generation, HardwareProfile, LinkKind};
use ringbuf::*;

mod classic;
mod hsw;
pub mod limits;
mod program;
mod skl;
mod tgl;

pub use classic::{ClassicMnp, DividerSet, MFormula, SearchOrder};
pub use hsw::{HswWrpll, WrpllParams};
pub use program::{dp_link_rate_khz, program, DpllId, SklLinkRate};
pub use skl::{SklWrpll, SklWrpllParams};
pub use tgl::{TglCentered, TglPllParams};

#[derive(Copy, Clone, Debug, PartialEq)]
enum Trace {
    None,
    Solve { target_khz: u32, generation: Generation },
    PostDivider { p2: u32, post2_high: bool },
    Classic { n: u32, m1: u32, m2: u32, p1: u32 },
    Wrpll { r2: u32, n2: u32, p: u32 },
    SklDivider { p: u32, central_mhz: u32, deviation: u32 },
    TglDivider { div: u32, dco_khz: u32 },
    NoSolution(u32),
    SearchExhausted(u32),
    PoweredOn(u8),
    PowerTimeout(u8),
    Enabled(u8),
    Locked(u8),
    LockTimeout(u8),
}
ringbuf!(Trace, 32, Trace::None);

/// The divider values produced by one of the strategies.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DividerValues {
    Classic(DividerSet),
    Wrpll(WrpllParams),
    Skl(SklWrpllParams),
    Tgl(TglPllParams),
}

impl DividerValues {
    /// The pixel clock these dividers produce, in kHz.
    pub fn output_khz(&self, profile: &HardwareProfile) -> u32 {
        match self {
            DividerValues::Classic(s) => s.synth_khz(profile.reference_khz),
            DividerValues::Wrpll(w) => w.output_khz(),
            DividerValues::Skl(s) => s.output_khz(),
            DividerValues::Tgl(t) => t.output_khz(),
        }
    }
}

pub trait DpllSolve {
    /// Finds dividers for `target_khz`, which the caller has already checked
    /// against the profile's synthesizable range.
    fn solve(
        &self,
        target_khz: u32,
        link: LinkKind,
    ) -> Result<DividerValues, DpllError>;
}

pub enum Strategy {
    ClassicMnp(ClassicMnp),
    HswWrpll(HswWrpll),
    SklWrpll(SklWrpll),
    TglCentered(TglCentered),
}

impl Strategy {
    pub fn for_profile(profile: &HardwareProfile) -> Self {
        match profile.generation {
            Generation::I85x
            | Generation::I9xx
            | Generation::Pineview
            | Generation::G4x
            | Generation::Ironlake
            | Generation::SandyBridge
            | Generation::IvyBridge => {
                Strategy::ClassicMnp(ClassicMnp::new(profile))
            }
            Generation::Haswell | Generation::Broadwell => {
                Strategy::HswWrpll(HswWrpll)
            }
            Generation::Skylake => {
                Strategy::SklWrpll(SklWrpll::new(profile.reference_khz))
            }
            Generation::TigerLake => Strategy::TglCentered(TglCentered),
        }
    }
}

impl DpllSolve for Strategy {
    fn solve(
        &self,
        target_khz: u32,
        link: LinkKind,
    ) -> Result<DividerValues, DpllError> {
        match self {
            Strategy::ClassicMnp(s) => s.solve(target_khz, link),
            Strategy::HswWrpll(s) => s.solve(target_khz, link),
            Strategy::SklWrpll(s) => s.solve(target_khz, link),
            Strategy::TglCentered(s) => s.solve(target_khz, link),
        }
    }
}

/// Picks the strategy for `profile` and runs it.
pub fn solve(
    target_khz: u32,
    profile: &HardwareProfile,
    link: LinkKind,
) -> Result<DividerValues, DpllError> {
    ringbuf_entry!(Trace::Solve {
        target_khz,
        generation: profile.generation
    });
    Strategy::for_profile(profile).solve(target_khz, link)
}
