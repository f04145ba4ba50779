// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A scripted register file for exercising drivers on the host.
//!
//! Unset registers read as zero. Every access is logged in order, and hooks
//! can rewrite the value a register returns on read or stores on write, which
//! is how tests make lock bits appear (or never appear).

use std::boxed::Box;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::vec::Vec;

use crate::{GfxRw, Register};

type Hook = Box<dyn FnMut(u32) -> u32>;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Op {
    Read(Register, u32),
    Write(Register, u32),
    Spin(u32),
}

#[derive(Default)]
pub struct FakeGfx {
    regs: RefCell<BTreeMap<Register, u32>>,
    read_hooks: RefCell<BTreeMap<Register, Hook>>,
    write_hooks: RefCell<BTreeMap<Register, Hook>>,
    log: RefCell<Vec<Op>>,
    spun: Cell<u64>,
}

impl FakeGfx {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the stored value without logging a write.
    pub fn set(&self, reg: Register, value: u32) {
        self.regs.borrow_mut().insert(reg, value);
    }

    /// Returns the stored value without logging a read or running hooks.
    pub fn get(&self, reg: Register) -> u32 {
        self.regs.borrow().get(&reg).copied().unwrap_or(0)
    }

    /// Every read of `reg` returns `f(stored)` instead of the stored value.
    pub fn on_read(&self, reg: Register, f: impl FnMut(u32) -> u32 + 'static) {
        self.read_hooks.borrow_mut().insert(reg, Box::new(f));
    }

    /// Every write to `reg` stores `f(written)`.
    pub fn on_write(&self, reg: Register, f: impl FnMut(u32) -> u32 + 'static) {
        self.write_hooks.borrow_mut().insert(reg, Box::new(f));
    }

    pub fn ops(&self) -> Vec<Op> {
        self.log.borrow().clone()
    }

    pub fn reads_of(&self, reg: Register) -> usize {
        self.log
            .borrow()
            .iter()
            .filter(|op| matches!(op, Op::Read(r, _) if *r == reg))
            .count()
    }

    /// Values written to `reg`, in order, before write hooks ran.
    pub fn writes_to(&self, reg: Register) -> Vec<u32> {
        self.log
            .borrow()
            .iter()
            .filter_map(|op| match op {
                Op::Write(r, v) if *r == reg => Some(*v),
                _ => None,
            })
            .collect()
    }

    pub fn total_spin_us(&self) -> u64 {
        self.spun.get()
    }
}

impl GfxRw for FakeGfx {
    fn read32(&self, reg: Register) -> u32 {
        let stored = self.get(reg);
        let v = match self.read_hooks.borrow_mut().get_mut(&reg) {
            Some(hook) => hook(stored),
            None => stored,
        };
        self.log.borrow_mut().push(Op::Read(reg, v));
        v
    }

    fn write32(&self, reg: Register, value: u32) {
        self.log.borrow_mut().push(Op::Write(reg, value));
        let stored = match self.write_hooks.borrow_mut().get_mut(&reg) {
            Some(hook) => hook(value),
            None => value,
        };
        self.set(reg, stored);
    }

    fn spin(&self, us: u32) {
        self.log.borrow_mut().push(Op::Spin(us));
        self.spun.set(self.spun.get() + u64::from(us));
    }
}
