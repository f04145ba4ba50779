// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Skylake DPLL (WRPLL mode) divider search.
//!
//! The DCO must run at `p * afe`, where `afe` is five times the pixel clock
//! and `p = p0 * p1 * p2`, within +1% / -6% of one of three central
//! frequencies.

use drv_intel_gfx_api::{DpllError, LinkKind};
use ringbuf::ringbuf_entry_root as ringbuf_entry;

use crate::{DividerValues, DpllSolve, Trace};

/// Central DCO frequencies in MHz, in search order.
const CENTRAL_MHZ: [u64; 3] = [8400, 9000, 9600];

const EVEN_DIVIDERS: [u32; 36] = [
    4, 6, 8, 10, 12, 14, 16, 18, 20, 24, 28, 30, 32, 36, 40, 42, 44, 48, 52,
    54, 56, 60, 64, 66, 68, 70, 72, 76, 78, 80, 84, 88, 90, 92, 96, 98,
];
const ODD_DIVIDERS: [u32; 7] = [3, 5, 7, 9, 15, 21, 35];

/// Deviation limits, in 0.01% units, above and below the central frequency.
const MAX_POS_DEVIATION: u64 = 100;
const MAX_NEG_DEVIATION: u64 = 600;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SklWrpllParams {
    pub p0: u32,
    pub p1: u32,
    pub p2: u32,
    pub dco_khz: u32,
    pub dco_integer: u32,
    pub dco_fraction: u32,
    pub central_mhz: u32,
    /// HDMI/DVI mode; DisplayPort keeps the link rate already selected.
    pub hdmi_mode: bool,
}

impl SklWrpllParams {
    pub fn divider(&self) -> u32 {
        self.p0 * self.p1 * self.p2
    }

    pub fn output_khz(&self) -> u32 {
        self.dco_khz / self.divider() / 5
    }

    pub fn central_freq_id(&self) -> u32 {
        match self.central_mhz {
            9600 => 0,
            9000 => 1,
            _ => 3,
        }
    }

    fn pdiv(&self) -> u32 {
        match self.p0 {
            1 => 0,
            2 => 1,
            3 => 2,
            _ => 4,
        }
    }

    fn kdiv(&self) -> u32 {
        match self.p2 {
            5 => 0,
            2 => 1,
            3 => 2,
            _ => 3,
        }
    }

    /// This PLL's 6-bit field of DPLL_CTRL1, before shifting into place.
    pub fn ctrl1_bits(&self) -> u32 {
        const OVERRIDE: u32 = 1 << 0;
        const HDMI_MODE: u32 = 1 << 5;
        if self.hdmi_mode {
            OVERRIDE | HDMI_MODE
        } else {
            OVERRIDE
        }
    }

    pub fn cfgcr1_value(&self) -> u32 {
        const FREQ_ENABLE: u32 = 1 << 31;
        FREQ_ENABLE | (self.dco_fraction << 9) | self.dco_integer
    }

    pub fn cfgcr2_value(&self) -> u32 {
        let qdiv_mode = u32::from(self.p1 != 1);
        (self.p1 << 8)
            | (qdiv_mode << 7)
            | (self.kdiv() << 5)
            | (self.pdiv() << 2)
            | self.central_freq_id()
    }
}

/// Splits a total divider into `(p0, p1, p2)`.
pub fn multipliers(p: u32) -> Option<(u32, u32, u32)> {
    if p % 2 == 0 {
        let half = p / 2;
        match half {
            1 | 2 | 3 | 5 => Some((2, 1, half)),
            _ if half % 2 == 0 => Some((2, half / 2, 2)),
            _ if half % 3 == 0 => Some((3, half / 3, 2)),
            _ if half % 7 == 0 => Some((7, half / 7, 2)),
            _ => None,
        }
    } else {
        match p {
            3 | 9 => Some((3, 1, p / 3)),
            5 | 7 => Some((p, 1, 1)),
            15 => Some((3, 1, 5)),
            21 => Some((7, 1, 3)),
            35 => Some((7, 1, 5)),
            _ => None,
        }
    }
}

#[derive(Copy, Clone, Debug)]
struct Candidate {
    p: u32,
    central_mhz: u64,
    deviation: u64,
}

fn try_divider(
    best: &mut Option<Candidate>,
    central_hz: u64,
    dco_hz: u64,
    p: u32,
) {
    let deviation = 10_000 * dco_hz.abs_diff(central_hz) / central_hz;
    let limit = if dco_hz >= central_hz {
        MAX_POS_DEVIATION
    } else {
        MAX_NEG_DEVIATION
    };
    let min = best.map_or(u64::MAX, |b| b.deviation);
    if deviation < limit && deviation < min {
        *best = Some(Candidate {
            p,
            central_mhz: central_hz / 1_000_000,
            deviation,
        });
    }
}

pub struct SklWrpll {
    reference_khz: u32,
}

impl SklWrpll {
    pub fn new(reference_khz: u32) -> Self {
        Self { reference_khz }
    }

    fn find_divider(&self, afe_hz: u64) -> Option<Candidate> {
        let mut best = None;
        for dividers in [&EVEN_DIVIDERS[..], &ODD_DIVIDERS[..]] {
            'central: for central in CENTRAL_MHZ {
                for &p in dividers {
                    try_divider(
                        &mut best,
                        central * 1_000_000,
                        u64::from(p) * afe_hz,
                        p,
                    );
                    if matches!(best, Some(Candidate { deviation: 0, .. })) {
                        break 'central;
                    }
                }
            }
            // Even dividers win if they found anything at all.
            if best.is_some() {
                break;
            }
        }
        best
    }

    pub fn search(
        &self,
        target_khz: u32,
        link: LinkKind,
    ) -> Option<SklWrpllParams> {
        let afe_hz = u64::from(target_khz) * 1000 * 5;
        let best = self.find_divider(afe_hz)?;
        let (p0, p1, p2) = multipliers(best.p)?;
        ringbuf_entry!(Trace::SklDivider {
            p: best.p,
            central_mhz: best.central_mhz as u32,
            deviation: best.deviation as u32,
        });

        let ref_khz = u64::from(self.reference_khz);
        let dco_hz = u64::from(p0 * p1 * p2) * afe_hz;
        let dco_integer = dco_hz / (ref_khz * 1000);
        let dco_fraction =
            (dco_hz / (ref_khz / 1000) - dco_integer * 1_000_000) * 0x8000
                / 1_000_000;

        Some(SklWrpllParams {
            p0,
            p1,
            p2,
            dco_khz: (dco_hz / 1000) as u32,
            dco_integer: dco_integer as u32,
            dco_fraction: dco_fraction as u32,
            central_mhz: best.central_mhz as u32,
            hdmi_mode: link != LinkKind::DisplayPort,
        })
    }
}

impl DpllSolve for SklWrpll {
    fn solve(
        &self,
        target_khz: u32,
        link: LinkKind,
    ) -> Result<DividerValues, DpllError> {
        match self.search(target_khz, link) {
            Some(params) => Ok(DividerValues::Skl(params)),
            None => {
                ringbuf_entry!(Trace::NoSolution(target_khz));
                Err(DpllError::NoSolution)
            }
        }
    }
}
