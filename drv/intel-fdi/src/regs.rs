// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! FDI transmitter/receiver registers and their fields.

use bitflags::bitflags;
use drv_intel_gfx_api::{Pipe, Register, RegisterBlock};
use num_derive::FromPrimitive;

const PIPE_STRIDE: u32 = 0x1000;

const fn north(offset: u32, pipe: Pipe) -> Register {
    Register::new(RegisterBlock::NorthPipeAndPort, offset)
        .nth(pipe.index(), PIPE_STRIDE)
}

const fn south(offset: u32, pipe: Pipe) -> Register {
    Register::new(RegisterBlock::SouthTranscoderAndPort, offset)
        .nth(pipe.index(), PIPE_STRIDE)
}

pub const fn tx_ctl(pipe: Pipe) -> Register {
    north(0x60100, pipe)
}

pub const fn pipe_conf(pipe: Pipe) -> Register {
    north(0x70008, pipe)
}

pub const fn data_m1(pipe: Pipe) -> Register {
    north(0x60030, pipe)
}

pub const fn data_n1(pipe: Pipe) -> Register {
    north(0x60034, pipe)
}

pub const fn link_m1(pipe: Pipe) -> Register {
    north(0x60040, pipe)
}

pub const fn link_n1(pipe: Pipe) -> Register {
    north(0x60044, pipe)
}

pub const fn rx_ctl(pipe: Pipe) -> Register {
    south(0xf000c, pipe)
}

pub const fn rx_misc(pipe: Pipe) -> Register {
    south(0xf0010, pipe)
}

pub const fn rx_iir(pipe: Pipe) -> Register {
    south(0xf0014, pipe)
}

pub const fn rx_imr(pipe: Pipe) -> Register {
    south(0xf0018, pipe)
}

/// Ironlake receiver chicken bits (phase sync pointer workaround).
pub const fn rx_chicken(pipe: Pipe) -> Register {
    Register::new(RegisterBlock::SouthShared, 0xc2000).nth(pipe.index(), 4)
}

bitflags! {
    /// Single-bit controls in FDI_TX_CTL.
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct TxCtl: u32 {
        const ENABLE = 1 << 31;
        const ENHANCED_FRAME = 1 << 18;
        const PLL_ENABLE = 1 << 14;
        const AUTO_TRAINING = 1 << 10;
        const AUTO_TRAIN_DONE = 1 << 1;

        const _ = !0;
    }
}

bitflags! {
    /// Single-bit controls in FDI_RX_CTL.
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct RxCtl: u32 {
        const ENABLE = 1 << 31;
        const FS_ERRC = 1 << 27;
        const FE_ERRC = 1 << 26;
        const PLL_ENABLE = 1 << 13;
        const ENHANCED_FRAME = 1 << 6;
        const PCDCLK = 1 << 4;

        const _ = !0;
    }
}

bitflags! {
    /// FDI_RX_IIR / FDI_RX_IMR lock bits. Write one to clear in the IIR.
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct RxLock: u32 {
        const BIT_LOCK = 1 << 9;
        const SYMBOL_LOCK = 1 << 8;

        const _ = !0;
    }
}

pub const PORT_WIDTH_SHIFT: u32 = 19;
pub const PORT_WIDTH_MASK: u32 = 0b111 << PORT_WIDTH_SHIFT;
pub const RX_BPC_SHIFT: u32 = 16;
pub const RX_BPC_MASK: u32 = 0b111 << RX_BPC_SHIFT;
pub const PIPE_BPC_MASK: u32 = 0b111 << 5;

/// Sandy Bridge voltage swing / pre-emphasis field of FDI_TX_CTL.
pub const VOL_EMP_MASK: u32 = 0x3f << 22;

/// Voltage swing / pre-emphasis levels, tried in order.
pub const VOL_EMP_LEVELS: [u32; 4] = [
    0x00 << 22, // 400mV, 0dB
    0x3a << 22, // 400mV, 6dB
    0x39 << 22, // 600mV, 3.5dB
    0x38 << 22, // 800mV, 0dB
];

pub const RX_MISC_TP1_TO_TP2_48: u32 = 2 << 20;
pub const RX_MISC_FDI_DELAY_90: u32 = 0x90;

pub const CHICKEN_PHASE_SYNC_OVR: u32 = 1 << 1;
pub const CHICKEN_PHASE_SYNC_EN: u32 = 1 << 0;

/// Data M/N transfer unit size, left at the maximum.
pub const TU_SIZE_MASK: u32 = 0x3f << 25;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TrainPattern {
    One = 0,
    Two = 1,
    Idle = 2,
    /// Normal operation; "NONE" on the transmitter, "NORMAL" on CPT.
    None = 3,
}

/// Where a link-train pattern field sits in its control register.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PatternField {
    /// Bits 29:28, used before Ivy Bridge and by IBX receivers.
    High,
    /// Bits 9:8, used by the Ivy Bridge transmitter and CPT receivers.
    Low,
}

impl PatternField {
    const fn shift(self) -> u32 {
        match self {
            PatternField::High => 28,
            PatternField::Low => 8,
        }
    }

    pub const fn mask(self) -> u32 {
        0b11 << self.shift()
    }

    pub fn set(self, v: u32, pattern: TrainPattern) -> u32 {
        (v & !self.mask()) | ((pattern as u32) << self.shift())
    }

    pub fn get(self, v: u32) -> u32 {
        (v & self.mask()) >> self.shift()
    }
}

/// Bits per color as encoded in FDI_RX_CTL (and PIPECONF).
#[derive(Copy, Clone, Debug, PartialEq, Eq, FromPrimitive)]
pub enum Bpc {
    Eight = 0,
    Ten = 1,
    Six = 2,
    Twelve = 3,
}

impl Bpc {
    pub fn bits_per_pixel(self) -> u32 {
        match self {
            Bpc::Six => 18,
            Bpc::Eight => 24,
            Bpc::Ten => 30,
            Bpc::Twelve => 36,
        }
    }
}

pub fn with_lanes(v: u32, lanes: u8) -> u32 {
    (v & !PORT_WIDTH_MASK) | (u32::from(lanes - 1) << PORT_WIDTH_SHIFT)
}
