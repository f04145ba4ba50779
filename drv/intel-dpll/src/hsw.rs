// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Haswell/Broadwell WRPLL divider search.
//!
//! The WRPLL runs off the 2700 MHz LCPLL: `out = 2700 * n2 / (r2 * p) / 2`
//! (n2 and r2 are in half units). Each target clock has a ppm budget; a
//! handful of CEA/VESA clocks must be hit exactly.

use drv_intel_gfx_api::{DpllError, LinkKind};
use ringbuf::ringbuf_entry_root as ringbuf_entry;
use static_assertions::const_assert;

use crate::{DividerValues, DpllSolve, Trace};

const LC_FREQ: u64 = 2700;
const LC_FREQ_2K: u64 = LC_FREQ * 2000;

const P_MIN: u32 = 2;
const P_MAX: u32 = 64;
const P_INC: usize = 2;

// Constraints for the PLL reference (MHz)
const REF_MIN: u64 = 48;
const REF_MAX: u64 = 400;
// VCO range (MHz)
const VCO_MIN: u64 = 2400;
const VCO_MAX: u64 = 4800;

const_assert!(REF_MIN < REF_MAX && VCO_MIN < VCO_MAX);

/// Clock (Hz) that takes the no-search path.
const LC_CLOCK_HZ: u64 = 540_000_000;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct WrpllParams {
    pub r2: u32,
    pub n2: u32,
    pub p: u32,
}

impl WrpllParams {
    pub fn output_khz(&self) -> u32 {
        let den = u64::from(self.p) * u64::from(self.r2);
        (540_000 * u64::from(self.n2) / den) as u32
    }

    /// WRPLL_CTL value selecting the LCPLL reference.
    pub fn ctl_value(&self) -> u32 {
        const ENABLE: u32 = 1 << 31;
        const REF_LCPLL: u32 = 3 << 28;
        ENABLE | REF_LCPLL | (self.n2 << 16) | (self.p << 8) | self.r2
    }
}

/// Allowed deviation in ppm for a clock in Hz.
fn budget_ppm(clock_hz: u64) -> u64 {
    match clock_hz {
        25_175_000 | 25_200_000 | 27_000_000 | 27_027_000 | 37_762_500
        | 37_800_000 | 40_500_000 | 40_541_000 | 54_000_000 | 54_054_000
        | 59_341_000 | 59_400_000 | 72_000_000 | 74_176_000 | 74_250_000
        | 81_000_000 | 81_081_000 | 89_012_000 | 89_100_000 | 108_000_000
        | 108_108_000 | 111_264_000 | 111_375_000 | 148_352_000
        | 148_500_000 | 162_000_000 | 162_162_000 | 222_525_000
        | 222_750_000 | 296_703_000 | 297_000_000 => 0,
        233_500_000 | 245_250_000 | 247_750_000 | 253_250_000
        | 298_000_000 => 1500,
        169_128_000 | 169_500_000 | 179_500_000 | 202_000_000 => 2000,
        256_250_000 | 262_500_000 | 270_000_000 | 272_500_000
        | 273_750_000 | 280_750_000 | 281_250_000 | 286_000_000
        | 291_750_000 => 4000,
        267_250_000 | 268_500_000 => 5000,
        _ => 1000,
    }
}

/// Folds candidate `(r2, n2, p)` into `best`.
///
/// A candidate within budget beats one outside it. Two outside the budget
/// compare by distance; two inside it compare by `n2 / (p * r2²)` and the
/// larger wins. Ties keep the earlier candidate.
fn update_rnp(
    freq2k: u64,
    budget: u64,
    cand: WrpllParams,
    best: &mut Option<WrpllParams>,
) {
    let Some(b) = best else {
        *best = Some(cand);
        return;
    };
    let (r2, n2, p) =
        (u64::from(cand.r2), u64::from(cand.n2), u64::from(cand.p));
    let (br2, bn2, bp) = (u64::from(b.r2), u64::from(b.n2), u64::from(b.p));

    let a = freq2k * budget * p * r2;
    let bb = freq2k * budget * bp * br2;
    let diff = (freq2k * p * r2).abs_diff(LC_FREQ_2K * n2);
    let diff_best = (freq2k * bp * br2).abs_diff(LC_FREQ_2K * bn2);
    let c = 1_000_000 * diff;
    let d = 1_000_000 * diff_best;

    let take = if a < c && bb < d {
        bp * br2 * diff < p * r2 * diff_best
    } else if a >= c && bb < d {
        true
    } else if a >= c && bb >= d {
        n2 * bp * br2 * br2 > bn2 * p * r2 * r2
    } else {
        false
    };
    if take {
        *best = Some(cand);
    }
}

#[derive(Copy, Clone, Debug, Default)]
pub struct HswWrpll;

impl HswWrpll {
    pub fn search(&self, target_khz: u32) -> Option<WrpllParams> {
        let clock_hz = u64::from(target_khz) * 1000;
        if clock_hz == LC_CLOCK_HZ {
            return Some(WrpllParams { r2: 2, n2: 2, p: 1 });
        }

        let freq2k = clock_hz / 100;
        let budget = budget_ppm(clock_hz);
        let mut best = None;

        for r2 in (LC_FREQ * 2 / REF_MAX + 1)..=(LC_FREQ * 2 / REF_MIN) {
            let n2_min = VCO_MIN * r2 / LC_FREQ + 1;
            let n2_max = VCO_MAX * r2 / LC_FREQ;
            for n2 in n2_min..=n2_max {
                for p in (P_MIN..=P_MAX).step_by(P_INC) {
                    let cand = WrpllParams {
                        r2: r2 as u32,
                        n2: n2 as u32,
                        p,
                    };
                    update_rnp(freq2k, budget, cand, &mut best);
                }
            }
        }
        best
    }
}

impl DpllSolve for HswWrpll {
    fn solve(
        &self,
        target_khz: u32,
        _link: LinkKind,
    ) -> Result<DividerValues, DpllError> {
        match self.search(target_khz) {
            Some(w) => {
                ringbuf_entry!(Trace::Wrpll {
                    r2: w.r2,
                    n2: w.n2,
                    p: w.p
                });
                Ok(DividerValues::Wrpll(w))
            }
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

    fn ppm_off(w: &WrpllParams, khz: u32) -> u64 {
        // Compare in 100 Hz units to avoid rounding the output.
        let freq2k = u64::from(khz) * 10;
        let diff = (freq2k * u64::from(w.p) * u64::from(w.r2))
            .abs_diff(LC_FREQ_2K * u64::from(w.n2));
        1_000_000 * diff / (freq2k * u64::from(w.p) * u64::from(w.r2))
    }

    #[test]
    fn lc_clock_skips_search() {
        assert_eq!(
            HswWrpll.search(540_000),
            Some(WrpllParams { r2: 2, n2: 2, p: 1 })
        );
    }

    #[test]
    fn zero_budget_clocks_are_exact() {
        for khz in [25_200, 74_250, 148_500, 297_000] {
            let w = HswWrpll.search(khz).unwrap();
            assert_eq!(ppm_off(&w, khz), 0, "{khz} kHz gave {w:?}");
            assert_eq!(w.output_khz(), khz);
        }
    }

    #[test]
    fn default_budget_is_respected() {
        for khz in [65_000, 106_500, 193_250] {
            let w = HswWrpll.search(khz).unwrap();
            assert!(ppm_off(&w, khz) <= 1000, "{khz} kHz gave {w:?}");
            assert_eq!(w.p % 2, 0);
        }
    }

    #[test]
    fn in_budget_prefers_higher_reference() {
        let mut best = Some(WrpllParams { r2: 40, n2: 44, p: 4 });
        // Same ratio, smaller r2: n2/(p * r2²) is larger.
        update_rnp(
            1_485_000,
            0,
            WrpllParams { r2: 20, n2: 22, p: 4 },
            &mut best,
        );
        assert_eq!(best, Some(WrpllParams { r2: 20, n2: 22, p: 4 }));
    }

    #[test]
    fn in_budget_weighs_post_divider() {
        // Both exact for 108 MHz. n2/r2² favours the second, but once p
        // is counted the first has the larger score.
        let low_p = WrpllParams { r2: 10, n2: 4, p: 2 };
        let high_p = WrpllParams { r2: 15, n2: 24, p: 8 };

        let mut best = Some(low_p);
        update_rnp(1_080_000, 0, high_p, &mut best);
        assert_eq!(best, Some(low_p));

        let mut best = Some(high_p);
        update_rnp(1_080_000, 0, low_p, &mut best);
        assert_eq!(best, Some(low_p));
    }

    #[test]
    fn in_budget_tie_keeps_first() {
        // Equal n2/(p * r2²): a larger n2 and p alone do not win.
        let first = WrpllParams { r2: 20, n2: 22, p: 4 };
        let mut best = Some(first);
        update_rnp(
            1_485_000,
            0,
            WrpllParams { r2: 20, n2: 33, p: 6 },
            &mut best,
        );
        assert_eq!(best, Some(first));
    }

    #[test]
    fn common_modes() {
        for (khz, expected) in [
            (25_200, WrpllParams { r2: 15, n2: 14, p: 20 }),
            (108_000, WrpllParams { r2: 15, n2: 18, p: 6 }),
            (148_500, WrpllParams { r2: 20, n2: 22, p: 4 }),
        ] {
            assert_eq!(HswWrpll.search(khz), Some(expected), "{khz} kHz");
        }
    }

    #[test]
    fn ctl_encoding() {
        let w = WrpllParams { r2: 20, n2: 22, p: 4 };
        assert_eq!(w.ctl_value(), 0xb016_0414);
    }
}
