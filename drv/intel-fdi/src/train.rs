// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use drv_intel_gfx_api::{FdiError, Generation, GfxRw};
use ringbuf::ringbuf_entry_root as ringbuf_entry;

use crate::regs::{self, PatternField, RxCtl, RxLock, TrainPattern, TxCtl};
use crate::{FdiLink, LinkTrainState, Trace, TrainState};

const PLL_SETTLE_US: u32 = 200;
const TX_PLL_SETTLE_US: u32 = 100;
const PATTERN_SETTLE_US: u32 = 150;
const LEVEL_SETTLE_US: u32 = 500;
const LOCK_RETRY_US: u32 = 50;
const AUTO_TRAIN_US: u32 = 1;
const AUTO_RETRY_US: u32 = 31;
const NORMAL_SETTLE_US: u32 = 1000;

const LOCK_POLLS: u32 = 5;
const AUTO_ATTEMPTS_PER_LEVEL: u32 = 2;

impl<R: GfxRw> FdiLink<'_, R> {
    fn tx_pattern_field(&self) -> PatternField {
        if self.profile.generation >= Generation::IvyBridge {
            PatternField::Low
        } else {
            PatternField::High
        }
    }

    fn rx_pattern_field(&self) -> PatternField {
        if self.profile.pch.uses_cpt_training() {
            PatternField::Low
        } else {
            PatternField::High
        }
    }

    fn set_patterns(&self, pattern: TrainPattern) {
        let (tx_field, rx_field) =
            (self.tx_pattern_field(), self.rx_pattern_field());
        self.rw
            .modify32(regs::tx_ctl(self.pipe), |v| tx_field.set(v, pattern));
        self.rw
            .modify32(regs::rx_ctl(self.pipe), |v| rx_field.set(v, pattern));
    }

    /// Receiver PLL, receiver clock switch, then transmitter PLL.
    pub(crate) fn enable_clocks(&self, st: &mut LinkTrainState) {
        let rx = regs::rx_ctl(self.pipe);
        let tx = regs::tx_ctl(self.pipe);

        let v = self.rw.read32(rx);
        if !RxCtl::from_bits_retain(v).contains(RxCtl::PLL_ENABLE) {
            let bpc = self.rw.read32(regs::pipe_conf(self.pipe))
                & regs::PIPE_BPC_MASK;
            let v = regs::with_lanes(v & !regs::RX_BPC_MASK, st.lanes)
                | (bpc << 11)
                | RxCtl::PLL_ENABLE.bits();
            self.rw.write32(rx, v);
            self.rw.posting_read(rx);
            self.rw.spin(PLL_SETTLE_US);
        }
        st.advance(TrainState::RxPllEnabled);

        self.rw.modify32(rx, |v| v | RxCtl::PCDCLK.bits());
        self.rw.posting_read(rx);
        self.rw.spin(PLL_SETTLE_US);
        st.advance(TrainState::RxClockSwitched);

        let v = self.rw.read32(tx);
        if !TxCtl::from_bits_retain(v).contains(TxCtl::PLL_ENABLE) {
            self.rw.write32(tx, v | TxCtl::PLL_ENABLE.bits());
            self.rw.posting_read(tx);
            self.rw.spin(TX_PLL_SETTLE_US);
        }
        st.advance(TrainState::TxPllEnabled);
    }

    pub(crate) fn normal_train(&self) {
        let rx = regs::rx_ctl(self.pipe);
        self.set_patterns(TrainPattern::None);
        self.rw.modify32(regs::tx_ctl(self.pipe), |v| {
            v | TxCtl::ENHANCED_FRAME.bits()
        });
        self.rw.modify32(rx, |v| v | RxCtl::ENHANCED_FRAME.bits());
        self.rw.posting_read(rx);
        self.rw.spin(NORMAL_SETTLE_US);
    }

    /// Normal pattern, then frame start/end error correction.
    pub(crate) fn finish(&self, st: &mut LinkTrainState) {
        let rx = regs::rx_ctl(self.pipe);
        self.normal_train();
        self.rw.modify32(rx, |v| {
            v | (RxCtl::FS_ERRC | RxCtl::FE_ERRC).bits()
        });
        self.rw.posting_read(rx);
        st.advance(TrainState::Normal);
    }

    fn unmask_locks(&self) {
        let imr = regs::rx_imr(self.pipe);
        self.rw.modify32(imr, |v| {
            v & !(RxLock::BIT_LOCK | RxLock::SYMBOL_LOCK).bits()
        });
        self.rw.posting_read(imr);
        self.rw.spin(PATTERN_SETTLE_US);
    }

    /// Polls the IIR for `lock` up to `polls` times, sleeping `retry_us`
    /// after every miss. A seen lock is acknowledged.
    fn poll_lock(
        &self,
        st: &mut LinkTrainState,
        lock: RxLock,
        polls: u32,
        retry_us: u32,
    ) -> bool {
        let iir = regs::rx_iir(self.pipe);
        for _ in 0..polls {
            st.attempts += 1;
            let v = RxLock::from_bits_retain(self.rw.read32(iir));
            if v.contains(lock) {
                self.rw.write32(iir, (v | lock).bits());
                ringbuf_entry!(Trace::Locked {
                    lock: lock.bits(),
                    polls: st.attempts
                });
                return true;
            }
            if retry_us != 0 {
                self.rw.spin(retry_us);
            }
        }
        false
    }

    pub(crate) fn train_ironlake(
        &self,
        st: &mut LinkTrainState,
    ) -> Result<(), FdiError> {
        let tx = regs::tx_ctl(self.pipe);
        let rx = regs::rx_ctl(self.pipe);

        self.unmask_locks();

        let lanes = st.lanes;
        self.rw.modify32(tx, |v| {
            let v = regs::with_lanes(v, lanes);
            PatternField::High.set(v, TrainPattern::One) | TxCtl::ENABLE.bits()
        });
        self.rw.modify32(rx, |v| {
            PatternField::High.set(v, TrainPattern::One) | RxCtl::ENABLE.bits()
        });
        self.rw.posting_read(rx);
        self.rw.spin(PATTERN_SETTLE_US);

        // Phase sync pointer: override first, then enable.
        let chicken = regs::rx_chicken(self.pipe);
        self.rw.write32(chicken, regs::CHICKEN_PHASE_SYNC_OVR);
        self.rw.write32(
            chicken,
            regs::CHICKEN_PHASE_SYNC_OVR | regs::CHICKEN_PHASE_SYNC_EN,
        );
        st.advance(TrainState::TrainPattern1Sent);

        if !self.poll_lock(st, RxLock::BIT_LOCK, LOCK_POLLS, 0) {
            return Err(st.fail(FdiError::PatternOneTimeout));
        }
        st.advance(TrainState::BitLocked);

        self.set_patterns(TrainPattern::Two);
        self.rw.posting_read(rx);
        self.rw.spin(PATTERN_SETTLE_US);
        st.advance(TrainState::TrainPattern2Sent);

        if !self.poll_lock(st, RxLock::SYMBOL_LOCK, LOCK_POLLS, 0) {
            return Err(st.fail(FdiError::PatternTwoTimeout));
        }
        st.advance(TrainState::SymbolLocked);
        Ok(())
    }

    /// Steps through the drive levels until `lock` shows up.
    fn sweep_levels(&self, st: &mut LinkTrainState, lock: RxLock) -> bool {
        let tx = regs::tx_ctl(self.pipe);
        for level in regs::VOL_EMP_LEVELS {
            ringbuf_entry!(Trace::Level(level));
            self.rw
                .modify32(tx, |v| (v & !regs::VOL_EMP_MASK) | level);
            self.rw.posting_read(tx);
            self.rw.spin(LEVEL_SETTLE_US);
            if self.poll_lock(st, lock, LOCK_POLLS, LOCK_RETRY_US) {
                return true;
            }
        }
        false
    }

    pub(crate) fn train_sandybridge(
        &self,
        st: &mut LinkTrainState,
    ) -> Result<(), FdiError> {
        let tx = regs::tx_ctl(self.pipe);
        let rx = regs::rx_ctl(self.pipe);
        let rx_field = self.rx_pattern_field();

        self.unmask_locks();

        let lanes = st.lanes;
        self.rw.modify32(tx, |v| {
            let v = regs::with_lanes(v, lanes) & !regs::VOL_EMP_MASK;
            PatternField::High.set(v, TrainPattern::One)
                | regs::VOL_EMP_LEVELS[0]
                | TxCtl::ENABLE.bits()
        });
        self.rw.modify32(rx, |v| {
            rx_field.set(v, TrainPattern::One) | RxCtl::ENABLE.bits()
        });
        self.rw.posting_read(rx);
        self.rw.spin(PATTERN_SETTLE_US);
        st.advance(TrainState::TrainPattern1Sent);

        if !self.sweep_levels(st, RxLock::BIT_LOCK) {
            return Err(st.fail(FdiError::PatternOneTimeout));
        }
        st.advance(TrainState::BitLocked);

        self.set_patterns(TrainPattern::Two);
        self.rw.posting_read(rx);
        self.rw.spin(PATTERN_SETTLE_US);
        st.advance(TrainState::TrainPattern2Sent);

        if !self.sweep_levels(st, RxLock::SYMBOL_LOCK) {
            return Err(st.fail(FdiError::PatternTwoTimeout));
        }
        st.advance(TrainState::SymbolLocked);
        Ok(())
    }

    pub(crate) fn train_auto(
        &self,
        st: &mut LinkTrainState,
    ) -> Result<(), FdiError> {
        let tx = regs::tx_ctl(self.pipe);
        let rx = regs::rx_ctl(self.pipe);
        let tx_field = self.tx_pattern_field();

        let lanes = st.lanes;
        self.rw.modify32(tx, |v| {
            tx_field.set(regs::with_lanes(v, lanes), TrainPattern::One)
        });
        self.rw.write32(
            regs::rx_misc(self.pipe),
            regs::RX_MISC_TP1_TO_TP2_48 | regs::RX_MISC_FDI_DELAY_90,
        );
        st.advance(TrainState::TrainPattern1Sent);

        for level in regs::VOL_EMP_LEVELS {
            for attempt in 0..AUTO_ATTEMPTS_PER_LEVEL {
                st.attempts += 1;
                ringbuf_entry!(Trace::AutoAttempt { level, attempt });

                self.rw.modify32(tx, |v| {
                    (v & !regs::VOL_EMP_MASK)
                        | level
                        | (TxCtl::AUTO_TRAINING | TxCtl::ENABLE).bits()
                });
                self.rw.posting_read(tx);
                self.rw.modify32(rx, |v| v | RxCtl::ENABLE.bits());
                self.rw.posting_read(rx);
                self.rw.spin(AUTO_TRAIN_US);

                let v = TxCtl::from_bits_retain(self.rw.read32(tx));
                if v.contains(TxCtl::AUTO_TRAIN_DONE) {
                    st.advance(TrainState::SymbolLocked);
                    return Ok(());
                }

                self.rw.modify32(tx, |v| v & !TxCtl::ENABLE.bits());
                self.rw.modify32(rx, |v| v & !RxCtl::ENABLE.bits());
                self.rw.posting_read(rx);
                self.rw.spin(AUTO_RETRY_US);
            }
        }

        Err(st.fail(FdiError::AutoTrainTimeout))
    }
}
