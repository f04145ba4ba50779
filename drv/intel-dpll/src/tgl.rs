// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! TigerLake combo PHY DPLL divider selection.
//!
//! The DCO runs at `afe * P * Q * K` and must stay within 7998-10000 MHz;
//! among the dividers that fit, the one landing closest to 8999 MHz wins.

use drv_intel_gfx_api::{DpllError, LinkKind};
use ringbuf::ringbuf_entry_root as ringbuf_entry;

use crate::{DividerValues, DpllSolve, Trace};

const DCO_MIN_KHZ: u64 = 7_998_000;
const DCO_MID_KHZ: u64 = 8_999_000;
const DCO_MAX_KHZ: u64 = 10_000_000;

/// DisplayPort runs the DCO at a fixed rate.
const DP_DCO_KHZ: u32 = 8_090_000;

const DIVIDERS: [u32; 46] = [
    2, 4, 6, 8, 10, 12, 14, 16, 18, 20, 24, 28, 30, 32, 36, 40, 42, 44, 48,
    50, 52, 54, 56, 60, 64, 66, 68, 70, 72, 76, 78, 80, 84, 88, 90, 92, 96,
    98, 100, 102, 3, 5, 7, 9, 15, 21,
];

pub const CFGCR1_QDIV_RATIO_SHIFT: u32 = 10;
pub const CFGCR1_QDIV_RATIO_MASK: u32 = 0xff << CFGCR1_QDIV_RATIO_SHIFT;
pub const CFGCR1_QDIV_MODE: u32 = 1 << 9;
pub const CFGCR1_KDIV_MASK: u32 = 0b111 << 6;
pub const CFGCR1_PDIV_MASK: u32 = 0b1111 << 2;
/// Every divider field of DPLL_CFGCR1.
pub const CFGCR1_DIV_MASK: u32 = CFGCR1_QDIV_RATIO_MASK
    | CFGCR1_QDIV_MODE
    | CFGCR1_KDIV_MASK
    | CFGCR1_PDIV_MASK;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TglPllParams {
    pub pdiv: u32,
    pub qdiv: u32,
    pub kdiv: u32,
    pub dco_khz: u32,
}

impl TglPllParams {
    pub fn divider(&self) -> u32 {
        self.pdiv * self.qdiv * self.kdiv
    }

    pub fn output_khz(&self) -> u32 {
        self.dco_khz / self.divider() / 5
    }

    /// DPLL_CFGCR0 for the given reference clock. A 38.4 MHz reference is
    /// divided by two inside the PLL.
    pub fn cfgcr0_value(&self, reference_khz: u32) -> u32 {
        let ref_khz = match reference_khz {
            38_400 => 19_200,
            r => r,
        };
        let dco = (u64::from(self.dco_khz) << 15) / u64::from(ref_khz);
        let integer = (dco >> 15) as u32;
        let fraction = (dco & 0x7fff) as u32;
        (fraction << 10) | integer
    }

    /// Divider fields of DPLL_CFGCR1; everything outside
    /// [`CFGCR1_DIV_MASK`] is zero.
    pub fn cfgcr1_bits(&self) -> u32 {
        let pdiv = match self.pdiv {
            2 => 0b0001,
            3 => 0b0010,
            5 => 0b0100,
            _ => 0b1000,
        };
        let kdiv = match self.kdiv {
            1 => 0b001,
            2 => 0b010,
            _ => 0b100,
        };
        let qdiv = if self.qdiv == 1 {
            0
        } else {
            (self.qdiv << CFGCR1_QDIV_RATIO_SHIFT) | CFGCR1_QDIV_MODE
        };
        qdiv | (kdiv << 6) | (pdiv << 2)
    }
}

/// Splits a divider into `(P, Q, K)`.
pub fn decompose(div: u32) -> (u32, u32, u32) {
    if div % 2 == 0 {
        if div == 2 {
            (2, 1, 1)
        } else if div % 4 == 0 {
            (2, div / 4, 2)
        } else if div % 6 == 0 {
            (3, div / 6, 2)
        } else if div % 5 == 0 {
            (5, div / 10, 2)
        } else {
            (7, div / 14, 2)
        }
    } else if matches!(div, 3 | 5 | 7) {
        (div, 1, 1)
    } else {
        (div / 3, 1, 3)
    }
}

#[derive(Copy, Clone, Debug, Default)]
pub struct TglCentered;

impl TglCentered {
    pub fn search(
        &self,
        target_khz: u32,
        link: LinkKind,
    ) -> Option<TglPllParams> {
        if link == LinkKind::DisplayPort {
            return Some(TglPllParams {
                pdiv: 3,
                qdiv: 1,
                kdiv: 2,
                dco_khz: DP_DCO_KHZ,
            });
        }

        let afe_khz = u64::from(target_khz) * 5;
        let mut best: Option<(u32, u64)> = None;
        let mut best_centrality = u64::MAX;
        for div in DIVIDERS {
            let dco = afe_khz * u64::from(div);
            if !(DCO_MIN_KHZ..=DCO_MAX_KHZ).contains(&dco) {
                continue;
            }
            let centrality = dco.abs_diff(DCO_MID_KHZ);
            if centrality < best_centrality {
                best_centrality = centrality;
                best = Some((div, dco));
            }
        }

        let (div, dco) = best?;
        ringbuf_entry!(Trace::TglDivider {
            div,
            dco_khz: dco as u32
        });
        let (pdiv, qdiv, kdiv) = decompose(div);
        Some(TglPllParams {
            pdiv,
            qdiv,
            kdiv,
            dco_khz: dco as u32,
        })
    }
}

impl DpllSolve for TglCentered {
    fn solve(
        &self,
        target_khz: u32,
        link: LinkKind,
    ) -> Result<DividerValues, DpllError> {
        match self.search(target_khz, link) {
            Some(p) => Ok(DividerValues::Tgl(p)),
            None => {
                ringbuf_entry!(Trace::NoSolution(target_khz));
                Err(DpllError::NoSolution)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hdmi_148_5_mhz() {
        let p = TglCentered.search(148_500, LinkKind::Hdmi).unwrap();
        assert_eq!((p.pdiv, p.qdiv, p.kdiv), (2, 3, 2));
        assert_eq!(p.dco_khz, 8_910_000);
        assert_eq!(p.output_khz(), 148_500);
    }

    #[test]
    fn displayport_is_fixed() {
        let p = TglCentered.search(270_000, LinkKind::DisplayPort).unwrap();
        assert_eq!((p.pdiv, p.qdiv, p.kdiv, p.dco_khz), (3, 1, 2, 8_090_000));
    }

    #[test]
    fn nothing_fits_very_slow_clocks() {
        // 5 MHz * 5 * 102 = 2550 MHz, far below the DCO range.
        assert!(TglCentered.search(5_000, LinkKind::Hdmi).is_none());
    }

    #[test]
    fn every_divider_decomposes() {
        for div in DIVIDERS {
            let (p, q, k) = decompose(div);
            assert_eq!(p * q * k, div, "divider {div}");
            assert!([2, 3, 5, 7].contains(&p));
            assert!([1, 2, 3].contains(&k));
            assert!((1..=255).contains(&q));
        }
    }

    #[test]
    fn cfgcr0_halves_38_4_mhz_reference() {
        let p = TglCentered.search(148_500, LinkKind::Hdmi).unwrap();
        // 8910 / 19.2 = 464.0625
        let expected = (2048 << 10) | 464;
        assert_eq!(p.cfgcr0_value(38_400), expected);
        assert_eq!(p.cfgcr0_value(19_200), expected);
    }

    #[test]
    fn cfgcr1_fields() {
        let p = TglPllParams {
            pdiv: 2,
            qdiv: 3,
            kdiv: 2,
            dco_khz: 8_910_000,
        };
        assert_eq!(
            p.cfgcr1_bits(),
            (3 << 10) | (1 << 9) | (0b010 << 6) | (0b0001 << 2)
        );
        assert_eq!(p.cfgcr1_bits() & !CFGCR1_DIV_MASK, 0);
    }
}
