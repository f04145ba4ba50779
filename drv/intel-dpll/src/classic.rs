// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Exhaustive M/N/P search for the pre-DDI PLLs.
//!
//! The PLL output is `ref * m / n / (p1 * p2)`. There are two loop orders,
//! and since a candidate only replaces the best one when its error is
//! strictly smaller, the order decides which of several equally good
//! divider sets is returned:
//!
//! - **Legacy** (85x, 9xx, Pineview): m1, m2, n and p1 all ascending, so the
//!   smallest m1 (then m2, n, p1) wins a tie.
//! - **G4x** (G4x through Ivy Bridge): n ascending, then m1, m2 and p1
//!   descending. Once any candidate is found at some n, larger n are not
//!   tried, so the smallest workable n always wins.

use drv_intel_gfx_api::{DpllError, Generation, HardwareProfile, LinkKind};
use ringbuf::ringbuf_entry_root as ringbuf_entry;

use crate::limits::DividerLimits;
use crate::{DividerValues, DpllSolve, Trace};

/// How the feedback divider `m` follows from `m1` and `m2`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MFormula {
    /// `m = 5 * m1 + m2`
    Classic,
    /// `m = m2`; Pineview has a single feedback divider.
    Pineview,
}

impl MFormula {
    pub fn m(self, m1: u32, m2: u32) -> u32 {
        match self {
            MFormula::Classic => 5 * m1 + m2,
            MFormula::Pineview => m2,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SearchOrder {
    Legacy,
    G4x,
}

/// A complete set of classic PLL dividers. `m` and `p` are derived by
/// [`DividerSet::new`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DividerSet {
    pub n: u32,
    pub m: u32,
    pub m1: u32,
    pub m2: u32,
    pub p: u32,
    pub p1: u32,
    pub p2: u32,
    pub post2_high: bool,
}

impl DividerSet {
    pub fn new(
        formula: MFormula,
        n: u32,
        m1: u32,
        m2: u32,
        p1: u32,
        p2: u32,
        post2_high: bool,
    ) -> Self {
        Self {
            n,
            m: formula.m(m1, m2),
            m1,
            m2,
            p: p1 * p2,
            p1,
            p2,
            post2_high,
        }
    }

    pub fn vco_khz(&self, reference_khz: u32) -> u32 {
        reference_khz * self.m / self.n
    }

    pub fn synth_khz(&self, reference_khz: u32) -> u32 {
        self.vco_khz(reference_khz) / self.p
    }

    /// Value for the FP0/FP1 divisor register.
    pub fn fp_value(&self, generation: Generation) -> u32 {
        match generation {
            Generation::Pineview => ((1 << self.n) << 16) | (self.m2 - 2),
            _ => ((self.n - 2) << 16) | ((self.m1 - 2) << 8) | (self.m2 - 2),
        }
    }

    /// Post divider fields of the DPLL control register.
    pub fn dpll_post_bits(
        &self,
        generation: Generation,
        link: LinkKind,
    ) -> u32 {
        const P2_FAST: u32 = 1 << 24;
        const P2_DIVIDE_BY_4: u32 = 1 << 23;
        const P1_DIVIDE_BY_TWO: u32 = 1 << 21;

        let one_hot = 1 << (self.p1 - 1);
        match generation {
            Generation::I85x => {
                let p1 = if link.is_lvds() {
                    one_hot << 16
                } else if self.p1 == 2 {
                    P1_DIVIDE_BY_TWO
                } else {
                    (self.p1 - 2) << 16
                };
                let p2 = if self.p2 == 4 { P2_DIVIDE_BY_4 } else { 0 };
                p1 | p2
            }
            _ => {
                let p1 = if generation == Generation::Pineview {
                    one_hot << 15
                } else {
                    one_hot << 16
                };
                let fast = if link.is_lvds() {
                    self.p2 == 7
                } else {
                    self.p2 == 5
                };
                p1 | if fast { P2_FAST } else { 0 }
            }
        }
    }
}

/// Distance from the target as the exact fraction `num / den` kHz.
#[derive(Copy, Clone)]
struct Offset {
    num: u64,
    den: u64,
}

impl Offset {
    fn is_exact(&self) -> bool {
        self.num == 0
    }

    fn less_than(&self, other: &Offset) -> bool {
        self.num * other.den < other.num * self.den
    }
}

pub struct ClassicMnp {
    generation: Generation,
    reference_khz: u32,
    min_synth_khz: u32,
    max_synth_khz: u32,
}

impl ClassicMnp {
    pub fn new(profile: &HardwareProfile) -> Self {
        Self {
            generation: profile.generation,
            reference_khz: profile.reference_khz,
            min_synth_khz: profile.min_synth_khz,
            max_synth_khz: profile.max_synth_khz,
        }
    }

    pub fn formula(&self) -> MFormula {
        match self.generation {
            Generation::Pineview => MFormula::Pineview,
            _ => MFormula::Classic,
        }
    }

    pub fn order(&self) -> SearchOrder {
        match self.generation {
            Generation::I85x | Generation::I9xx | Generation::Pineview => {
                SearchOrder::Legacy
            }
            _ => SearchOrder::G4x,
        }
    }

    fn is_valid(&self, limits: &DividerLimits, set: &DividerSet) -> bool {
        if !limits.p.contains(set.p) || !limits.m.contains(set.m) {
            return false;
        }
        if !limits.vco.contains(set.vco_khz(self.reference_khz)) {
            return false;
        }
        let synth = set.synth_khz(self.reference_khz);
        (self.min_synth_khz..=self.max_synth_khz).contains(&synth)
    }

    fn error(&self, target_khz: u32, set: &DividerSet) -> Offset {
        let den = u64::from(set.n) * u64::from(set.p);
        let wanted = u64::from(target_khz) * den;
        let got = u64::from(self.reference_khz) * u64::from(set.m);
        Offset {
            num: wanted.abs_diff(got),
            den,
        }
    }

    fn search_legacy(
        &self,
        limits: &DividerLimits,
        target_khz: u32,
        p2: u32,
        post2_high: bool,
    ) -> Option<DividerSet> {
        let formula = self.formula();
        // Anything worse than missing by the whole target is useless.
        let mut best_err = Offset {
            num: u64::from(target_khz),
            den: 1,
        };
        let mut best = None;

        for m1 in limits.m1.iter() {
            for m2 in limits.m2.iter() {
                if formula == MFormula::Classic && m2 >= m1 {
                    break;
                }
                for n in limits.n.iter() {
                    for p1 in limits.p1.iter() {
                        let set = DividerSet::new(
                            formula, n, m1, m2, p1, p2, post2_high,
                        );
                        if !self.is_valid(limits, &set) {
                            continue;
                        }
                        let err = self.error(target_khz, &set);
                        if err.less_than(&best_err) {
                            best_err = err;
                            best = Some(set);
                            if err.is_exact() {
                                break;
                            }
                        }
                    }
                }
            }
        }
        best
    }

    fn search_g4x(
        &self,
        limits: &DividerLimits,
        target_khz: u32,
        p2: u32,
        post2_high: bool,
    ) -> Option<DividerSet> {
        let formula = self.formula();
        let mut best_err = Offset {
            num: u64::from(target_khz),
            den: 1,
        };
        let mut best = None;
        let mut max_n = limits.n.max;

        let mut n = limits.n.min;
        while n <= max_n {
            for m1 in limits.m1.iter().rev() {
                for m2 in limits.m2.iter().rev() {
                    for p1 in limits.p1.iter().rev() {
                        let set = DividerSet::new(
                            formula, n, m1, m2, p1, p2, post2_high,
                        );
                        if !self.is_valid(limits, &set) {
                            continue;
                        }
                        let err = self.error(target_khz, &set);
                        if err.less_than(&best_err) {
                            best_err = err;
                            best = Some(set);
                            max_n = n;
                            if err.is_exact() {
                                break;
                            }
                        }
                    }
                }
            }
            n += 1;
        }
        best
    }
}

impl DpllSolve for ClassicMnp {
    fn solve(
        &self,
        target_khz: u32,
        link: LinkKind,
    ) -> Result<DividerValues, DpllError> {
        let limits = DividerLimits::for_link(self.generation, link)
            .ok_or(DpllError::NoSolution)?;
        let (p2, post2_high) = limits.post_divider(target_khz, link);
        ringbuf_entry!(Trace::PostDivider { p2, post2_high });

        let found = match self.order() {
            SearchOrder::Legacy => {
                self.search_legacy(limits, target_khz, p2, post2_high)
            }
            SearchOrder::G4x => {
                self.search_g4x(limits, target_khz, p2, post2_high)
            }
        };

        match found {
            Some(set) => {
                ringbuf_entry!(Trace::Classic {
                    n: set.n,
                    m1: set.m1,
                    m2: set.m2,
                    p1: set.p1,
                });
                Ok(DividerValues::Classic(set))
            }
            None if self.order() == SearchOrder::Legacy => {
                ringbuf_entry!(Trace::SearchExhausted(target_khz));
                Err(DpllError::SearchExhausted)
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

    fn solve(gen: Generation, khz: u32, link: LinkKind) -> DividerSet {
        let profile = HardwareProfile::for_generation(gen);
        match ClassicMnp::new(&profile).solve(khz, link) {
            Ok(DividerValues::Classic(set)) => set,
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn i9xx_sdvo_hits_75_2_mhz() {
        let set = solve(Generation::I9xx, 75_200, LinkKind::Analog);
        assert!(set.synth_khz(96_000).abs_diff(75_200) <= 5);
        assert_eq!(set.p2, 5);
        assert!(!set.post2_high);
        assert!(set.m2 < set.m1);
        assert_eq!(set.m, 5 * set.m1 + set.m2);
        assert_eq!(set.p, set.p1 * set.p2);
    }

    #[test]
    fn legacy_order_keeps_first_exact_match() {
        // 75.2 MHz is hit exactly by m1 17, m2 9 with either (n 4, p1 6) or
        // (n 6, p1 4); n ascends, so the first one stays.
        let set = solve(Generation::I9xx, 75_200, LinkKind::Analog);
        assert_eq!((set.m1, set.m2, set.n, set.p1), (17, 9, 4, 6));
    }

    #[test]
    fn g4x_order_stops_at_smallest_n() {
        // n 4 would reach 108 MHz exactly, but n 3 already has a valid
        // candidate, so the search never gets there.
        let set = solve(Generation::G4x, 108_000, LinkKind::Hdmi);
        assert_eq!((set.n, set.m1, set.m2, set.p1), (3, 19, 9, 6));
        assert_eq!(set.synth_khz(96_000), 110_933);
    }

    #[test]
    fn pineview_uses_m2_alone() {
        let set = solve(Generation::Pineview, 65_000, LinkKind::Analog);
        assert_eq!(set.m, set.m2);
        // (n 6, m2 122) ties with (n 3, m2 61); m2 ascends first.
        assert_eq!((set.n, set.m2, set.p1), (3, 61, 6));
        assert!(set.synth_khz(96_000).abs_diff(65_000) <= 100);
    }

    #[test]
    fn dual_lvds_takes_fast_post_divider() {
        let set = solve(Generation::Ironlake, 150_000, LinkKind::LvdsDual);
        assert_eq!(set.p2, 7);
        assert!(!set.post2_high);
    }

    #[test]
    fn g4x_family_reports_no_solution() {
        // Dual-channel LVDS on G4x cannot go below ~41 MHz.
        let mut profile = HardwareProfile::for_generation(Generation::G4x);
        profile.max_synth_khz = 30_000;
        assert_eq!(
            ClassicMnp::new(&profile).solve(25_000, LinkKind::LvdsDual),
            Err(DpllError::NoSolution)
        );
    }

    #[test]
    fn legacy_family_reports_exhaustion() {
        let mut profile = HardwareProfile::for_generation(Generation::I9xx);
        // The SDVO limits cannot go below 35 MHz.
        profile.max_synth_khz = 20_100;
        assert_eq!(
            ClassicMnp::new(&profile).solve(20_050, LinkKind::Analog),
            Err(DpllError::SearchExhausted)
        );
    }

    #[test]
    fn fp_encoding() {
        let set = DividerSet::new(MFormula::Classic, 6, 17, 9, 4, 5, false);
        assert_eq!(set.fp_value(Generation::I9xx), (4 << 16) | (15 << 8) | 7);

        let pnv = DividerSet::new(MFormula::Pineview, 4, 0, 130, 2, 10, true);
        assert_eq!(pnv.fp_value(Generation::Pineview), (1 << 20) | 128);
    }

    #[test]
    fn post_divider_encoding() {
        let set = DividerSet::new(MFormula::Classic, 6, 17, 9, 4, 5, false);
        assert_eq!(
            set.dpll_post_bits(Generation::I9xx, LinkKind::Analog),
            (1 << 19) | (1 << 24)
        );
        let lvds = DividerSet::new(MFormula::Classic, 3, 20, 9, 2, 14, true);
        assert_eq!(
            lvds.dpll_post_bits(Generation::G4x, LinkKind::LvdsSingle),
            1 << 17
        );
    }
}
