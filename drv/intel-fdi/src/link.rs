// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use drv_intel_gfx_api::{FdiError, GfxRw};
use num_traits::FromPrimitive;
use ringbuf::ringbuf_entry_root as ringbuf_entry;

use crate::regs::{self, Bpc};
use crate::{FdiLink, Trace, MAX_LANES};

/// Largest value the M and N registers hold.
const MN_MAX: u64 = 0xff_ffff;
/// Cap on the initial power-of-two N.
const N_CAP: u64 = 0x80_0000;

/// Lanes needed to carry `pixel_khz` at `bpp` over links running at
/// `link_khz`, with 5% headroom for framing. Rounds up.
pub fn lanes_required(pixel_khz: u32, bpp: u32, link_khz: u32) -> u32 {
    let bps = u64::from(pixel_khz) * u64::from(bpp) * 21 / 20;
    let per_lane = u64::from(link_khz) * 8;
    if per_lane == 0 {
        return u32::MAX;
    }
    u32::try_from(bps.div_ceil(per_lane)).unwrap_or(u32::MAX)
}

/// What the hardware offers for a mode, from [`FdiLink::pre_train`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LinkConfig {
    pub link_khz: u32,
    pub bits_per_pixel: u32,
    pub lanes_available: u8,
    pub lanes_needed: u8,
}

/// Data and link M/N ratios for one transcoder.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MnValues {
    pub data_m: u32,
    pub data_n: u32,
    pub link_m: u32,
    pub link_n: u32,
}

fn ratio(num: u64, linkspeed: u64) -> (u32, u32) {
    let linkspeed = linkspeed.max(1);
    let mut n = linkspeed.next_power_of_two().min(N_CAP);
    let mut m = num * n / linkspeed;
    while m > MN_MAX || n > MN_MAX {
        m >>= 1;
        n >>= 1;
    }
    // Both fit 24 bits here.
    (m as u32, n as u32)
}

impl MnValues {
    pub fn compute(pixel_khz: u32, bpp: u32, lanes: u8, link_khz: u32) -> Self {
        let pixel = u64::from(pixel_khz);
        let link = u64::from(link_khz);
        let (data_m, data_n) = ratio(
            pixel * u64::from(bpp),
            u64::from(lanes) * link * 8,
        );
        let (link_m, link_n) = ratio(pixel, link);
        Self {
            data_m,
            data_n,
            link_m,
            link_n,
        }
    }
}

impl<R: GfxRw> FdiLink<'_, R> {
    /// Reads back the link parameters firmware or an earlier mode set left
    /// and works out how many lanes `pixel_khz` needs.
    pub fn pre_train(&self, pixel_khz: u32) -> Result<LinkConfig, FdiError> {
        let link_khz = self.profile.fdi_link_mhz * 1000 / 10;

        let rx = self.rw.read32(regs::rx_ctl(self.pipe));
        let raw = (rx & regs::RX_BPC_MASK) >> regs::RX_BPC_SHIFT;
        let bits_per_pixel = Bpc::from_u32(raw)
            .ok_or(FdiError::BadBpc(raw))?
            .bits_per_pixel();

        let tx = self.rw.read32(regs::tx_ctl(self.pipe));
        let width = (tx & regs::PORT_WIDTH_MASK) >> regs::PORT_WIDTH_SHIFT;
        // Field is three bits, so this is at most 8.
        let lanes_available = (width as u8 + 1).min(MAX_LANES);

        let needed = lanes_required(pixel_khz, bits_per_pixel, link_khz);
        let lanes_needed = u8::try_from(needed.max(1)).unwrap_or(u8::MAX);
        ringbuf_entry!(Trace::LanesNeeded {
            needed: lanes_needed,
            available: lanes_available
        });
        if lanes_needed > lanes_available {
            return Err(FdiError::TooManyLanes {
                needed: lanes_needed,
                available: lanes_available,
            });
        }

        Ok(LinkConfig {
            link_khz,
            bits_per_pixel,
            lanes_available,
            lanes_needed,
        })
    }

    /// Programs the transcoder's M/N registers. Link N goes last; writing
    /// it latches all four.
    pub fn set_m_n(&self, mn: &MnValues) {
        ringbuf_entry!(Trace::MN {
            data_m: mn.data_m,
            data_n: mn.data_n,
            link_m: mn.link_m,
            link_n: mn.link_n
        });
        self.rw
            .write32(regs::data_m1(self.pipe), mn.data_m | regs::TU_SIZE_MASK);
        self.rw.write32(regs::data_n1(self.pipe), mn.data_n);
        self.rw.write32(regs::link_m1(self.pipe), mn.link_m);
        self.rw.write32(regs::link_n1(self.pipe), mn.link_n);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drv_intel_gfx_api::fake::{FakeGfx, Op};
    use drv_intel_gfx_api::{Generation, HardwareProfile, Pipe};

    #[test]
    fn lanes() {
        // 1080p60 at 24bpp over a 270 MHz link.
        assert_eq!(lanes_required(148_500, 24, 270_000), 2);
        assert_eq!(lanes_required(65_000, 24, 270_000), 1);
        assert_eq!(lanes_required(60_000, 24, 270_000), 1);
        assert_eq!(lanes_required(300_000, 36, 270_000), 6);
        assert_eq!(lanes_required(1, 24, 0), u32::MAX);
    }

    #[test]
    fn mn_1080p_two_lanes() {
        let mn = MnValues::compute(148_500, 24, 2, 270_000);
        // 148500 * 24 / (2 * 270000 * 8) = 0.825
        assert_eq!(mn.data_n, 0x80_0000);
        assert_eq!(mn.data_m, 6_920_601);
        assert_eq!(mn.link_n, 0x8_0000);
        assert_eq!(mn.link_m, 288_358);
    }

    #[test]
    fn mn_fits_24_bits() {
        for (pixel, bpp, lanes) in
            [(25_000, 18, 1), (148_500, 24, 4), (594_000, 36, 4), (1, 36, 1)]
        {
            let mn = MnValues::compute(pixel, bpp, lanes, 270_000);
            for v in [mn.data_m, mn.data_n, mn.link_m, mn.link_n] {
                assert!(v <= 0xff_ffff, "{mn:?}");
            }
            assert!(mn.data_n.is_power_of_two());
        }
        // Ratios above one force both down.
        let mn = MnValues::compute(600_000, 36, 1, 100);
        assert!(mn.data_m <= 0xff_ffff && mn.link_m <= 0xff_ffff);
    }

    #[test]
    fn pre_train_reads_back_link() {
        let rw = FakeGfx::new();
        let p = HardwareProfile::for_generation(Generation::IvyBridge);
        rw.set(regs::rx_ctl(Pipe::A), 0); // 8 bpc
        rw.set(regs::tx_ctl(Pipe::A), 3 << regs::PORT_WIDTH_SHIFT);
        let link = FdiLink::new(&rw, &p, Pipe::A);
        assert_eq!(
            link.pre_train(148_500),
            Ok(LinkConfig {
                link_khz: 270_000,
                bits_per_pixel: 24,
                lanes_available: 4,
                lanes_needed: 2,
            })
        );
    }

    #[test]
    fn pre_train_errors() {
        let rw = FakeGfx::new();
        let p = HardwareProfile::for_generation(Generation::SandyBridge);
        let link = FdiLink::new(&rw, &p, Pipe::B);

        // 12 bpc on one lane.
        rw.set(regs::rx_ctl(Pipe::B), 3 << regs::RX_BPC_SHIFT);
        assert_eq!(
            link.pre_train(148_500),
            Err(FdiError::TooManyLanes {
                needed: 3,
                available: 1
            })
        );

        rw.set(regs::rx_ctl(Pipe::B), 5 << regs::RX_BPC_SHIFT);
        assert_eq!(link.pre_train(65_000), Err(FdiError::BadBpc(5)));
    }

    #[test]
    fn m_n_write_order() {
        let rw = FakeGfx::new();
        let p = HardwareProfile::for_generation(Generation::IvyBridge);
        let link = FdiLink::new(&rw, &p, Pipe::B);
        let mn = MnValues {
            data_m: 1,
            data_n: 2,
            link_m: 3,
            link_n: 4,
        };
        link.set_m_n(&mn);
        assert_eq!(
            rw.ops(),
            [
                Op::Write(regs::data_m1(Pipe::B), 1 | regs::TU_SIZE_MASK),
                Op::Write(regs::data_n1(Pipe::B), 2),
                Op::Write(regs::link_m1(Pipe::B), 3),
                Op::Write(regs::link_n1(Pipe::B), 4),
            ]
        );
        assert_eq!(regs::link_n1(Pipe::B).offset, 0x61044);
    }
}
