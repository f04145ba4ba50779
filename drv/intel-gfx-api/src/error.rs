// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/// Errors from the PLL divisor search and from PLL programming.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DpllError {
    /// No divider combination satisfies the limits for this clock.
    NoSolution,
    /// The legacy (pre-G4x) search found nothing better than its starting
    /// sentinel. This means the limit table and the profile disagree about
    /// the achievable range, and the mode set must not proceed.
    SearchExhausted,
    /// The values do not belong to a PLL that `program` can drive, or do not
    /// match the requested PLL.
    NotProgrammable,
    /// The PLL (by hardware index) never reported power-up.
    PowerTimeout(u8),
    /// The PLL (by hardware index) never reported lock.
    LockTimeout(u8),
}

/// Errors from FDI link bring-up.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FdiError {
    /// This generation has no FDI between CPU and PCH.
    NoFdi,
    /// Lane count outside 1..=4 or above what the profile wires up.
    BadLaneCount(u8),
    TooManyLanes {
        needed: u8,
        available: u8,
    },
    /// Reserved encoding in the receiver's bits-per-color field.
    BadBpc(u32),
    /// Bit lock never reported while sending training pattern 1.
    PatternOneTimeout,
    /// Symbol lock never reported while sending training pattern 2.
    PatternTwoTimeout,
    /// Hardware auto-training never reported done.
    AutoTrainTimeout,
}
