// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Programming of the DCO-based DPLLs (Skylake and TigerLake).

use drv_intel_gfx_api::{
    DpllError, GfxRw, HardwareProfile, Register, RegisterBlock,
};
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use ringbuf::ringbuf_entry_root as ringbuf_entry;

use crate::skl::SklWrpllParams;
use crate::tgl::{TglPllParams, CFGCR1_DIV_MASK};
use crate::{DividerValues, Trace};

const fn reg(offset: u32) -> Register {
    Register::new(RegisterBlock::NorthShared, offset)
}

const SKL_DPLL_CTRL1: Register = reg(0x6c058);
const SKL_DPLL_STATUS: Register = reg(0x6c060);
const SKL_CTRL1_LINK_RATE_MASK: u32 = 0b111 << 1;
const SKL_LOCK_TIMEOUT_US: u32 = 5000;

const PLL_ENABLE: u32 = 1 << 31;
const TGL_PLL_LOCK: u32 = 1 << 30;
const TGL_POWER_ENABLE: u32 = 1 << 27;
const TGL_POWER_STATE: u32 = 1 << 26;
const TGL_TIMEOUT_US: u32 = 1000;

/// A DPLL that [`program`] can drive. DPLL0 on Skylake also clocks CDCLK
/// and is left to firmware.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DpllId {
    SklDpll1,
    SklDpll2,
    SklDpll3,
    TglDpll0,
    TglDpll1,
    TglDpll4,
}

impl DpllId {
    /// Hardware index, as used in DPLL_CTRL1/DPLL_STATUS field positions.
    pub fn index(self) -> u8 {
        match self {
            DpllId::TglDpll0 => 0,
            DpllId::SklDpll1 | DpllId::TglDpll1 => 1,
            DpllId::SklDpll2 => 2,
            DpllId::SklDpll3 => 3,
            DpllId::TglDpll4 => 4,
        }
    }

    fn enable_reg(self) -> Register {
        match self {
            DpllId::TglDpll0 => reg(0x46010),
            DpllId::SklDpll1 | DpllId::TglDpll1 => reg(0x46014),
            DpllId::TglDpll4 => reg(0x46018),
            DpllId::SklDpll2 => reg(0x46040),
            DpllId::SklDpll3 => reg(0x46060),
        }
    }

    /// CFGCR1/CFGCR2 on Skylake, CFGCR0/CFGCR1 on TigerLake.
    fn cfgcr(self) -> (Register, Register) {
        match self {
            DpllId::SklDpll1 | DpllId::SklDpll2 | DpllId::SklDpll3 => {
                let n = u32::from(self.index()) - 1;
                (reg(0x6c040).nth(n, 8), reg(0x6c044).nth(n, 8))
            }
            DpllId::TglDpll0 => (reg(0x164284), reg(0x164288)),
            DpllId::TglDpll1 => (reg(0x16428c), reg(0x164290)),
            DpllId::TglDpll4 => (reg(0x164294), reg(0x164298)),
        }
    }
}

/// DisplayPort link rates selectable in DPLL_CTRL1.
#[derive(Copy, Clone, Debug, PartialEq, Eq, FromPrimitive)]
pub enum SklLinkRate {
    Rate2700 = 0,
    Rate1350 = 1,
    Rate810 = 2,
    Rate1620 = 3,
    Rate1080 = 4,
    Rate2160 = 5,
}

impl SklLinkRate {
    /// Link symbol clock in kHz.
    pub fn symbol_khz(self) -> u32 {
        let mhz = match self {
            SklLinkRate::Rate2700 => 2700,
            SklLinkRate::Rate1350 => 1350,
            SklLinkRate::Rate810 => 810,
            SklLinkRate::Rate1620 => 1620,
            SklLinkRate::Rate1080 => 1080,
            SklLinkRate::Rate2160 => 2160,
        };
        mhz * 1000 / 5
    }
}

/// Reads back the DP link symbol clock a Skylake DPLL was set up for, or
/// `None` for a reserved encoding or a non-Skylake PLL.
pub fn dp_link_rate_khz(rw: &impl GfxRw, which: DpllId) -> Option<u32> {
    if !matches!(
        which,
        DpllId::SklDpll1 | DpllId::SklDpll2 | DpllId::SklDpll3
    ) {
        return None;
    }
    let shift = 1 + 6 * u32::from(which.index());
    let raw = (rw.read32(SKL_DPLL_CTRL1) >> shift) & 0b111;
    SklLinkRate::from_u32(raw).map(SklLinkRate::symbol_khz)
}

/// Writes `values` into the PLL `which` and waits for it to lock.
pub fn program(
    rw: &impl GfxRw,
    profile: &HardwareProfile,
    which: DpllId,
    values: &DividerValues,
) -> Result<(), DpllError> {
    match (which, values) {
        (
            DpllId::SklDpll1 | DpllId::SklDpll2 | DpllId::SklDpll3,
            DividerValues::Skl(p),
        ) => program_skl(rw, which, p),
        (
            DpllId::TglDpll0 | DpllId::TglDpll1 | DpllId::TglDpll4,
            DividerValues::Tgl(p),
        ) => program_tgl(rw, profile.reference_khz, which, p),
        _ => Err(DpllError::NotProgrammable),
    }
}

fn program_skl(
    rw: &impl GfxRw,
    which: DpllId,
    p: &SklWrpllParams,
) -> Result<(), DpllError> {
    let id = which.index();
    let shift = 6 * u32::from(id);
    // DP keeps whatever link rate firmware selected.
    let cleared = if p.hdmi_mode {
        0x3f
    } else {
        0x3f & !SKL_CTRL1_LINK_RATE_MASK
    };
    rw.modify32(SKL_DPLL_CTRL1, |v| {
        (v & !(cleared << shift)) | (p.ctrl1_bits() << shift)
    });
    rw.posting_read(SKL_DPLL_CTRL1);

    let (cfgcr1, cfgcr2) = which.cfgcr();
    rw.write32(cfgcr1, p.cfgcr1_value());
    rw.write32(cfgcr2, p.cfgcr2_value());
    rw.posting_read(cfgcr1);
    rw.posting_read(cfgcr2);

    rw.modify32(which.enable_reg(), |v| v | PLL_ENABLE);
    ringbuf_entry!(Trace::Enabled(id));

    let lock = 1 << (u32::from(id) * 8);
    if !rw.wait_for_set(SKL_DPLL_STATUS, lock, SKL_LOCK_TIMEOUT_US) {
        ringbuf_entry!(Trace::LockTimeout(id));
        return Err(DpllError::LockTimeout(id));
    }
    ringbuf_entry!(Trace::Locked(id));
    Ok(())
}

fn program_tgl(
    rw: &impl GfxRw,
    reference_khz: u32,
    which: DpllId,
    p: &TglPllParams,
) -> Result<(), DpllError> {
    let id = which.index();
    let enable = which.enable_reg();

    rw.modify32(enable, |v| v | TGL_POWER_ENABLE);
    if !rw.wait_for_set(enable, TGL_POWER_STATE, TGL_TIMEOUT_US) {
        ringbuf_entry!(Trace::PowerTimeout(id));
        return Err(DpllError::PowerTimeout(id));
    }
    ringbuf_entry!(Trace::PoweredOn(id));

    let (cfgcr0, cfgcr1) = which.cfgcr();
    rw.write32(cfgcr0, p.cfgcr0_value(reference_khz));
    rw.modify32(cfgcr1, |v| (v & !CFGCR1_DIV_MASK) | p.cfgcr1_bits());
    rw.posting_read(cfgcr0);
    rw.posting_read(cfgcr1);

    rw.modify32(enable, |v| v | PLL_ENABLE);
    ringbuf_entry!(Trace::Enabled(id));

    if !rw.wait_for_set(enable, TGL_PLL_LOCK, TGL_TIMEOUT_US) {
        ringbuf_entry!(Trace::LockTimeout(id));
        return Err(DpllError::LockTimeout(id));
    }
    ringbuf_entry!(Trace::Locked(id));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skl::SklWrpll;
    use crate::tgl::TglCentered;
    use drv_intel_gfx_api::fake::FakeGfx;
    use drv_intel_gfx_api::{Generation, LinkKind};

    fn skl_values() -> DividerValues {
        DividerValues::Skl(
            SklWrpll::new(24_000)
                .search(148_500, LinkKind::Hdmi)
                .unwrap(),
        )
    }

    fn tgl_values() -> DividerValues {
        DividerValues::Tgl(
            TglCentered.search(148_500, LinkKind::Hdmi).unwrap(),
        )
    }

    #[test]
    fn skylake_dpll2_locks() {
        let gfx = FakeGfx::new();
        let profile = HardwareProfile::for_generation(Generation::Skylake);
        // Firmware left DPLL1 in DP mode at 1620.
        gfx.set(SKL_DPLL_CTRL1, (0b0111 << 6) | 0x3f);
        gfx.set(SKL_DPLL_STATUS, 1 << 16);

        program(&gfx, &profile, DpllId::SklDpll2, &skl_values()).unwrap();

        let ctrl1 = gfx.get(SKL_DPLL_CTRL1);
        assert_eq!((ctrl1 >> 12) & 0x3f, 0b10_0001);
        assert_eq!((ctrl1 >> 6) & 0x3f, 0b0111);
        assert_eq!(gfx.get(reg(0x6c048)), (1 << 31) | (0x2000 << 9) | 371);
        assert_eq!(gfx.get(reg(0x46040)) & PLL_ENABLE, PLL_ENABLE);
        assert_eq!(gfx.reads_of(SKL_DPLL_STATUS), 1);
    }

    #[test]
    fn skylake_lock_timeout() {
        let gfx = FakeGfx::new();
        let profile = HardwareProfile::for_generation(Generation::Skylake);
        assert_eq!(
            program(&gfx, &profile, DpllId::SklDpll1, &skl_values()),
            Err(DpllError::LockTimeout(1))
        );
        assert_eq!(gfx.reads_of(SKL_DPLL_STATUS), 101);
    }

    #[test]
    fn tigerlake_power_then_lock() {
        let gfx = FakeGfx::new();
        let profile = HardwareProfile::for_generation(Generation::TigerLake);
        let enable = reg(0x46014);
        gfx.on_write(enable, |v| {
            let mut v = v;
            if v & TGL_POWER_ENABLE != 0 {
                v |= TGL_POWER_STATE;
            }
            if v & PLL_ENABLE != 0 {
                v |= TGL_PLL_LOCK;
            }
            v
        });
        // Bits outside the divider fields must survive.
        gfx.set(reg(0x164290), 1 << 31);

        program(&gfx, &profile, DpllId::TglDpll1, &tgl_values()).unwrap();

        assert_eq!(gfx.get(reg(0x16428c)), (2048 << 10) | 464);
        let cfgcr1 = gfx.get(reg(0x164290));
        assert_eq!(cfgcr1 & (1 << 31), 1 << 31);
        assert_eq!(
            cfgcr1 & CFGCR1_DIV_MASK,
            (3 << 10) | (1 << 9) | (2 << 6) | (1 << 2)
        );
    }

    #[test]
    fn tigerlake_power_timeout_skips_dividers() {
        let gfx = FakeGfx::new();
        let profile = HardwareProfile::for_generation(Generation::TigerLake);
        assert_eq!(
            program(&gfx, &profile, DpllId::TglDpll4, &tgl_values()),
            Err(DpllError::PowerTimeout(4))
        );
        assert!(gfx.writes_to(reg(0x164294)).is_empty());
    }

    #[test]
    fn mismatched_values_are_refused() {
        let gfx = FakeGfx::new();
        let profile = HardwareProfile::for_generation(Generation::TigerLake);
        assert_eq!(
            program(&gfx, &profile, DpllId::SklDpll1, &tgl_values()),
            Err(DpllError::NotProgrammable)
        );
        assert!(gfx.ops().is_empty());
    }

    #[test]
    fn link_rate_readback() {
        let gfx = FakeGfx::new();
        gfx.set(SKL_DPLL_CTRL1, (3 << 7) | (7 << 13));
        assert_eq!(dp_link_rate_khz(&gfx, DpllId::SklDpll1), Some(324_000));
        assert_eq!(dp_link_rate_khz(&gfx, DpllId::SklDpll2), None);
        assert_eq!(dp_link_rate_khz(&gfx, DpllId::SklDpll3), Some(540_000));
        assert_eq!(dp_link_rate_khz(&gfx, DpllId::TglDpll0), None);
    }
}
