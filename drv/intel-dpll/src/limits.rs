// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Divider limits for the classic M/N/P PLLs.
//!
//! All values are actual divider values, not register encodings: the
//! hardware offsets (n - 2, m1 - 2, ...) are applied by
//! [`crate::DividerSet::fp_value`].

use drv_intel_gfx_api::{Generation, LinkKind};
use static_assertions::const_assert;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Range {
    pub min: u32,
    pub max: u32,
}

impl Range {
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, v: u32) -> bool {
        (self.min..=self.max).contains(&v)
    }

    pub fn iter(&self) -> core::ops::RangeInclusive<u32> {
        self.min..=self.max
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DividerLimits {
    pub n: Range,
    pub m: Range,
    pub m1: Range,
    pub m2: Range,
    pub p: Range,
    pub p1: Range,
    /// Post divider 2 used for fast clocks (and dual-channel LVDS).
    pub p2_low: u32,
    /// Post divider 2 used for slow clocks (and single-channel LVDS).
    pub p2_high: u32,
    /// Non-LVDS targets at or above this use `p2_high`.
    pub dot_limit_khz: u32,
    /// VCO range in kHz.
    pub vco: Range,
}

pub const I85X_DAC: DividerLimits = DividerLimits {
    n: Range::new(4, 18),
    m: Range::new(96, 140),
    m1: Range::new(20, 28),
    m2: Range::new(8, 18),
    p: Range::new(4, 128),
    p1: Range::new(2, 33),
    p2_low: 2,
    p2_high: 4,
    dot_limit_khz: 165_000,
    vco: Range::new(908_000, 1_512_000),
};

pub const I85X_LVDS: DividerLimits = DividerLimits {
    p1: Range::new(1, 6),
    p2_low: 7,
    p2_high: 14,
    ..I85X_DAC
};

pub const I9XX_SDVO: DividerLimits = DividerLimits {
    n: Range::new(3, 8),
    m: Range::new(70, 120),
    m1: Range::new(10, 20),
    m2: Range::new(5, 9),
    p: Range::new(5, 80),
    p1: Range::new(1, 8),
    p2_low: 5,
    p2_high: 10,
    dot_limit_khz: 200_000,
    vco: Range::new(1_400_000, 2_800_000),
};

pub const I9XX_LVDS: DividerLimits = DividerLimits {
    p: Range::new(7, 98),
    p2_low: 7,
    p2_high: 14,
    dot_limit_khz: 112_000,
    ..I9XX_SDVO
};

pub const PINEVIEW_SDVO: DividerLimits = DividerLimits {
    n: Range::new(3, 6),
    m: Range::new(2, 256),
    // m1 is unused, the feedback divider is m2 alone
    m1: Range::new(0, 0),
    m2: Range::new(2, 256),
    p: Range::new(5, 80),
    p1: Range::new(1, 8),
    p2_low: 5,
    p2_high: 10,
    dot_limit_khz: 200_000,
    vco: Range::new(1_700_000, 3_500_000),
};

pub const PINEVIEW_LVDS: DividerLimits = DividerLimits {
    p: Range::new(28, 112),
    p1: Range::new(2, 8),
    p2_low: 14,
    p2_high: 14,
    dot_limit_khz: 112_000,
    ..PINEVIEW_SDVO
};

pub const G4X_SDVO: DividerLimits = DividerLimits {
    n: Range::new(3, 6),
    m: Range::new(104, 138),
    m1: Range::new(19, 25),
    m2: Range::new(7, 13),
    p: Range::new(10, 30),
    p1: Range::new(1, 3),
    p2_low: 10,
    p2_high: 10,
    dot_limit_khz: 270_000,
    vco: Range::new(1_750_000, 3_500_000),
};

pub const G4X_HDMI: DividerLimits = DividerLimits {
    m1: Range::new(18, 25),
    p: Range::new(5, 80),
    p1: Range::new(1, 8),
    p2_low: 5,
    p2_high: 10,
    dot_limit_khz: 165_000,
    ..G4X_SDVO
};

pub const G4X_LVDS_SINGLE: DividerLimits = DividerLimits {
    n: Range::new(3, 5),
    p: Range::new(28, 112),
    p1: Range::new(2, 8),
    p2_low: 14,
    p2_high: 14,
    dot_limit_khz: 0,
    ..G4X_SDVO
};

pub const G4X_LVDS_DUAL: DividerLimits = DividerLimits {
    p: Range::new(14, 42),
    p1: Range::new(2, 6),
    p2_low: 7,
    p2_high: 7,
    ..G4X_LVDS_SINGLE
};

pub const ILK_DAC: DividerLimits = DividerLimits {
    n: Range::new(3, 7),
    m: Range::new(79, 127),
    m1: Range::new(14, 24),
    m2: Range::new(7, 11),
    p: Range::new(5, 80),
    p1: Range::new(1, 8),
    p2_low: 5,
    p2_high: 10,
    dot_limit_khz: 225_000,
    vco: Range::new(1_760_000, 3_510_000),
};

pub const ILK_LVDS_SINGLE: DividerLimits = DividerLimits {
    n: Range::new(3, 5),
    m: Range::new(79, 118),
    p: Range::new(28, 112),
    p1: Range::new(2, 8),
    p2_low: 14,
    p2_high: 14,
    ..ILK_DAC
};

pub const ILK_LVDS_DUAL: DividerLimits = DividerLimits {
    m: Range::new(79, 127),
    p: Range::new(14, 56),
    p2_low: 7,
    p2_high: 7,
    ..ILK_LVDS_SINGLE
};

macro_rules! check_limits {
    ($($l:ident),*) => {
        $(
            const_assert!($l.p2_low <= $l.p2_high);
            const_assert!($l.n.min > 0 && $l.n.min <= $l.n.max);
            const_assert!($l.p1.min > 0 && $l.p1.min <= $l.p1.max);
            const_assert!($l.vco.min < $l.vco.max);
        )*
    };
}

check_limits!(
    I85X_DAC,
    I85X_LVDS,
    I9XX_SDVO,
    I9XX_LVDS,
    PINEVIEW_SDVO,
    PINEVIEW_LVDS,
    G4X_SDVO,
    G4X_HDMI,
    G4X_LVDS_SINGLE,
    G4X_LVDS_DUAL,
    ILK_DAC,
    ILK_LVDS_SINGLE,
    ILK_LVDS_DUAL
);

// The register encodings subtract 2 from these.
const_assert!(I85X_DAC.m2.min >= 2 && I9XX_SDVO.m2.min >= 2);
const_assert!(G4X_SDVO.m2.min >= 2 && ILK_DAC.m2.min >= 2);

impl DividerLimits {
    /// Returns the limits for a classic PLL driving `link`, or `None` for
    /// generations whose ports use DDI PLLs.
    pub fn for_link(
        generation: Generation,
        link: LinkKind,
    ) -> Option<&'static DividerLimits> {
        use Generation::*;
        let l = match (generation, link) {
            (I85x, LinkKind::LvdsSingle | LinkKind::LvdsDual) => &I85X_LVDS,
            (I85x, _) => &I85X_DAC,
            (I9xx, LinkKind::LvdsSingle | LinkKind::LvdsDual) => &I9XX_LVDS,
            (I9xx, _) => &I9XX_SDVO,
            (Pineview, LinkKind::LvdsSingle | LinkKind::LvdsDual) => {
                &PINEVIEW_LVDS
            }
            (Pineview, _) => &PINEVIEW_SDVO,
            (G4x, LinkKind::LvdsSingle) => &G4X_LVDS_SINGLE,
            (G4x, LinkKind::LvdsDual) => &G4X_LVDS_DUAL,
            (G4x, LinkKind::Hdmi | LinkKind::DisplayPort) => &G4X_HDMI,
            (G4x, LinkKind::Analog) => &G4X_SDVO,
            (Ironlake | SandyBridge | IvyBridge, LinkKind::LvdsSingle) => {
                &ILK_LVDS_SINGLE
            }
            (Ironlake | SandyBridge | IvyBridge, LinkKind::LvdsDual) => {
                &ILK_LVDS_DUAL
            }
            (Ironlake | SandyBridge | IvyBridge, _) => &ILK_DAC,
            (Haswell | Broadwell | Skylake | TigerLake, _) => return None,
        };
        Some(l)
    }

    /// Picks post divider 2 for `target_khz`, returning the divider and
    /// whether the high (slow) value was chosen.
    pub fn post_divider(&self, target_khz: u32, link: LinkKind) -> (u32, bool) {
        match link {
            LinkKind::LvdsDual => (self.p2_low, false),
            LinkKind::LvdsSingle => (self.p2_high, true),
            _ if target_khz < self.dot_limit_khz => (self.p2_low, false),
            _ => (self.p2_high, true),
        }
    }
}
