// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bring-up of the Flexible Display Interface between the CPU's display
//! pipes and the PCH transcoders.
//!
//! [`FdiLink`] wraps one pipe's transmitter/receiver pair. A mode set calls
//! [`FdiLink::pre_train`] to find out how many lanes the mode needs,
//! [`FdiLink::set_m_n`] with the matching [`MnValues`], and finally
//! [`FdiLink::train`]. Which handshake `train` performs depends on the
//! generation; see [`TrainPath`].

#![cfg_attr(not(test), no_std)]

use drv_intel_gfx_api::{FdiError, Generation, GfxRw, HardwareProfile, Pipe};
use ringbuf::*;

mod link;
pub mod regs;
mod train;

pub use link::{lanes_required, LinkConfig, MnValues};

#[derive(Copy, Clone, Debug, PartialEq)]
enum Trace {
    None,
    Train { pipe: Pipe, lanes: u8, path: TrainPath },
    State(TrainState),
    Locked { lock: u32, polls: u32 },
    Level(u32),
    AutoAttempt { level: u32, attempt: u32 },
    LanesNeeded { needed: u8, available: u8 },
    MN { data_m: u32, data_n: u32, link_m: u32, link_n: u32 },
    Failed(FdiError),
}
ringbuf!(Trace, 32, Trace::None);

/// Maximum lanes an FDI link can carry.
pub const MAX_LANES: u8 = 4;

/// The handshake used to train a link.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TrainPath {
    /// No PCH: switch straight to the normal pattern.
    Normal,
    /// Ironlake: software walks both patterns, fixed drive level.
    IronlakeManual,
    /// Sandy Bridge: software walks both patterns across the drive levels.
    SandyBridgeManual,
    /// Ivy Bridge and later: the transmitter trains itself.
    Auto,
}

impl TrainPath {
    pub fn for_profile(profile: &HardwareProfile) -> Result<Self, FdiError> {
        if !profile.has_pch() {
            return Ok(TrainPath::Normal);
        }
        match profile.generation {
            Generation::Ironlake => Ok(TrainPath::IronlakeManual),
            Generation::SandyBridge => Ok(TrainPath::SandyBridgeManual),
            g if g.has_fdi() => Ok(TrainPath::Auto),
            _ => Err(FdiError::NoFdi),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TrainState {
    Idle,
    RxPllEnabled,
    RxClockSwitched,
    TxPllEnabled,
    TrainPattern1Sent,
    BitLocked,
    TrainPattern2Sent,
    SymbolLocked,
    Normal,
    Failed,
}

impl TrainState {
    /// Whether `self -> to` is a legal step of the bring-up sequence.
    pub fn can_advance(self, to: TrainState) -> bool {
        use TrainState::*;
        matches!(
            (self, to),
            (Idle, RxPllEnabled)
                | (RxPllEnabled, RxClockSwitched)
                | (RxClockSwitched, TxPllEnabled)
                | (TxPllEnabled, TrainPattern1Sent)
                | (TxPllEnabled, Normal)
                | (TrainPattern1Sent, BitLocked)
                | (TrainPattern1Sent, SymbolLocked)
                | (TrainPattern1Sent, Failed)
                | (BitLocked, TrainPattern2Sent)
                | (TrainPattern2Sent, SymbolLocked)
                | (TrainPattern2Sent, Failed)
                | (SymbolLocked, Normal)
        )
    }
}

/// Progress of one `train` call.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LinkTrainState {
    pub state: TrainState,
    pub lanes: u8,
    /// Lock polls or auto-train attempts so far.
    pub attempts: u32,
    pub last_error: Option<FdiError>,
}

impl LinkTrainState {
    pub fn new(lanes: u8) -> Self {
        Self {
            state: TrainState::Idle,
            lanes,
            attempts: 0,
            last_error: None,
        }
    }

    pub fn advance(&mut self, to: TrainState) {
        debug_assert!(
            self.state.can_advance(to),
            "bad FDI transition {:?} -> {:?}",
            self.state,
            to
        );
        ringbuf_entry!(Trace::State(to));
        self.state = to;
    }

    /// Records `err`, moves to `Failed` and hands `err` back.
    pub fn fail(&mut self, err: FdiError) -> FdiError {
        ringbuf_entry!(Trace::Failed(err));
        self.last_error = Some(err);
        self.advance(TrainState::Failed);
        err
    }
}

/// Outcome of a successful `train`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Trained {
    pub lanes: u8,
    pub attempts: u32,
}

/// One pipe's FDI transmitter and the PCH receiver it feeds.
pub struct FdiLink<'a, R: GfxRw> {
    rw: &'a R,
    profile: &'a HardwareProfile,
    pipe: Pipe,
}

impl<'a, R: GfxRw> FdiLink<'a, R> {
    pub fn new(rw: &'a R, profile: &'a HardwareProfile, pipe: Pipe) -> Self {
        Self { rw, profile, pipe }
    }

    pub fn pipe(&self) -> Pipe {
        self.pipe
    }

    /// Brings the link up on `lanes` lanes and leaves it carrying pixels.
    pub fn train(&self, lanes: u8) -> Result<Trained, FdiError> {
        let path = TrainPath::for_profile(self.profile)?;
        if lanes == 0
            || lanes > MAX_LANES
            || (path != TrainPath::Normal && lanes > self.profile.fdi_lanes)
        {
            return Err(FdiError::BadLaneCount(lanes));
        }
        ringbuf_entry!(Trace::Train {
            pipe: self.pipe,
            lanes,
            path
        });

        let mut st = LinkTrainState::new(lanes);
        self.enable_clocks(&mut st);

        match path {
            TrainPath::Normal => {
                self.normal_train();
                st.advance(TrainState::Normal);
            }
            TrainPath::IronlakeManual => {
                self.train_ironlake(&mut st)?;
                self.finish(&mut st);
            }
            TrainPath::SandyBridgeManual => {
                self.train_sandybridge(&mut st)?;
                self.finish(&mut st);
            }
            TrainPath::Auto => {
                self.train_auto(&mut st)?;
                self.finish(&mut st);
            }
        }

        Ok(Trained {
            lanes,
            attempts: st.attempts,
        })
    }
}
