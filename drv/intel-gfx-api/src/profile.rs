// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-device hardware description.
//!
//! A [`HardwareProfile`] is built once when the device is identified, either
//! from [`HardwareProfile::for_generation`] or from a board description:
//!
//! ```toml
//! generation = "ivy-bridge"
//! reference-khz = 120000
//! fdi-lanes = 2
//! ```
//!
//! Fields left out of a board description take the generation's defaults.

use serde::Deserialize;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Generation {
    I85x,
    I9xx,
    Pineview,
    G4x,
    Ironlake,
    SandyBridge,
    IvyBridge,
    Haswell,
    Broadwell,
    Skylake,
    TigerLake,
}

impl Generation {
    /// Display generation number as used in Intel documentation.
    pub fn number(self) -> u8 {
        match self {
            Generation::I85x => 2,
            Generation::I9xx | Generation::Pineview => 3,
            Generation::G4x => 4,
            Generation::Ironlake => 5,
            Generation::SandyBridge => 6,
            Generation::IvyBridge | Generation::Haswell => 7,
            Generation::Broadwell => 8,
            Generation::Skylake => 9,
            Generation::TigerLake => 12,
        }
    }

    /// Ports are driven through DDI buffers with their own PLLs.
    pub fn has_ddi(self) -> bool {
        self >= Generation::Haswell
    }

    /// The CPU reaches the PCH transcoders through an FDI link.
    pub fn has_fdi(self) -> bool {
        (Generation::Ironlake..=Generation::Broadwell).contains(&self)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PchKind {
    None,
    IbexPeak,
    CougarPoint,
    PantherPoint,
    LynxPoint,
    WildcatPoint,
    SunrisePoint,
    TigerPoint,
}

impl PchKind {
    /// CPT-style PCHs move the receiver training pattern field.
    pub fn uses_cpt_training(self) -> bool {
        matches!(self, PchKind::CougarPoint | PchKind::PantherPoint)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(from = "ProfileDesc")]
pub struct HardwareProfile {
    pub generation: Generation,
    pub reference_khz: u32,
    pub min_synth_khz: u32,
    pub max_synth_khz: u32,
    pub pch: PchKind,
    /// FDI link clock; zero when there is no FDI.
    pub fdi_link_mhz: u32,
    /// FDI lanes wired to the transcoder; zero when there is no FDI.
    pub fdi_lanes: u8,
}

impl HardwareProfile {
    pub const fn for_generation(generation: Generation) -> Self {
        use Generation::*;
        let (reference_khz, min_synth_khz, max_synth_khz) = match generation {
            I85x => (48_000, 25_000, 350_000),
            I9xx | Pineview | G4x => (96_000, 20_000, 400_000),
            Ironlake | SandyBridge | IvyBridge => (120_000, 25_000, 350_000),
            Haswell | Broadwell => (135_000, 25_000, 540_000),
            Skylake => (24_000, 25_000, 594_000),
            TigerLake => (38_400, 25_000, 594_000),
        };
        let (pch, fdi_link_mhz, fdi_lanes) = match generation {
            I85x | I9xx | Pineview | G4x => (PchKind::None, 0, 0),
            Ironlake => (PchKind::IbexPeak, 2700, 4),
            SandyBridge => (PchKind::CougarPoint, 2700, 4),
            IvyBridge => (PchKind::PantherPoint, 2700, 4),
            Haswell => (PchKind::LynxPoint, 2700, 2),
            Broadwell => (PchKind::WildcatPoint, 2700, 2),
            Skylake => (PchKind::SunrisePoint, 0, 0),
            TigerLake => (PchKind::TigerPoint, 0, 0),
        };
        Self {
            generation,
            reference_khz,
            min_synth_khz,
            max_synth_khz,
            pch,
            fdi_link_mhz,
            fdi_lanes,
        }
    }

    pub fn has_pch(&self) -> bool {
        self.pch != PchKind::None
    }

    /// Checks the caller-side precondition of every solver.
    pub fn can_synthesize(&self, khz: u32) -> bool {
        (self.min_synth_khz..=self.max_synth_khz).contains(&khz)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct ProfileDesc {
    generation: Generation,
    reference_khz: Option<u32>,
    min_synth_khz: Option<u32>,
    max_synth_khz: Option<u32>,
    pch: Option<PchKind>,
    fdi_link_mhz: Option<u32>,
    fdi_lanes: Option<u8>,
}

impl From<ProfileDesc> for HardwareProfile {
    fn from(d: ProfileDesc) -> Self {
        let base = Self::for_generation(d.generation);
        Self {
            generation: d.generation,
            reference_khz: d.reference_khz.unwrap_or(base.reference_khz),
            min_synth_khz: d.min_synth_khz.unwrap_or(base.min_synth_khz),
            max_synth_khz: d.max_synth_khz.unwrap_or(base.max_synth_khz),
            pch: d.pch.unwrap_or(base.pch),
            fdi_link_mhz: d.fdi_link_mhz.unwrap_or(base.fdi_link_mhz),
            fdi_lanes: d.fdi_lanes.unwrap_or(base.fdi_lanes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn board_description_overrides_defaults() {
        let p: HardwareProfile = toml::from_str(
            r#"
            generation = "ivy-bridge"
            fdi-lanes = 2
            "#,
        )
        .unwrap();
        assert_eq!(p.generation, Generation::IvyBridge);
        assert_eq!(p.fdi_lanes, 2);
        assert_eq!(p.reference_khz, 120_000);
        assert_eq!(p.pch, PchKind::PantherPoint);
        assert!(p.has_pch());
    }

    #[test]
    fn board_description_can_drop_pch() {
        let p: HardwareProfile = toml::from_str(
            r#"
            generation = "tiger-lake"
            reference-khz = 19200
            pch = "none"
            "#,
        )
        .unwrap();
        assert_eq!(p.reference_khz, 19_200);
        assert!(!p.has_pch());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let r: Result<HardwareProfile, _> = toml::from_str(
            r#"
            generation = "skylake"
            refclk = 24000
            "#,
        );
        assert!(r.is_err());
    }

    #[test]
    fn fdi_generations() {
        assert!(!Generation::G4x.has_fdi());
        assert!(Generation::Ironlake.has_fdi());
        assert!(Generation::Broadwell.has_fdi());
        assert!(!Generation::Skylake.has_fdi());
        assert!(Generation::Haswell.has_ddi());
        assert!(!Generation::IvyBridge.has_ddi());
    }

    #[test]
    fn synth_range_is_inclusive() {
        let p = HardwareProfile::for_generation(Generation::I9xx);
        assert!(p.can_synthesize(20_000));
        assert!(p.can_synthesize(400_000));
        assert!(!p.can_synthesize(400_001));
    }
}
