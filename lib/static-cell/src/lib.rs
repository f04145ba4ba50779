// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#![cfg_attr(not(test), no_std)]
use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicBool, Ordering};

/// A RefCell-style container that can be used in a static for cases where only
/// a single borrow needs to happen at any given time.
///
/// Only `mut` access is provided. There is no many-reader one-writer mode as
/// in `RefCell`, only the one-writer part.
#[derive(Default)]
pub struct StaticCell<T> {
    borrowed: AtomicBool,
    cell: UnsafeCell<T>,
}

impl<T> StaticCell<T> {
    /// Creates a `StaticCell` containing `contents`.
    pub const fn new(contents: T) -> Self {
        Self {
            borrowed: AtomicBool::new(false),
            cell: UnsafeCell::new(contents),
        }
    }

    /// Gets mutable access to the contents of `self`.
    ///
    /// If a `StaticRef` for `self` still exists anywhere in the program, this
    /// will panic.
    #[track_caller]
    pub fn borrow_mut(&self) -> StaticRef<'_, T> {
        match self.try_borrow_mut() {
            Some(r) => r,
            None => panic!(),
        }
    }

    /// Gets mutable access to the contents of `self`, or `None` if another
    /// `StaticRef` is live.
    ///
    /// Trace recording uses this so that two register ports driven from
    /// different threads (as in host tests) lose an entry rather than panic.
    pub fn try_borrow_mut(&self) -> Option<StaticRef<'_, T>> {
        if self.borrowed.swap(true, Ordering::Acquire) {
            return None;
        }
        // Safety: the swap above ensures that we are not producing an
        // aliasing &mut to our contents.
        unsafe {
            Some(StaticRef {
                contents: &mut *self.cell.get(),
                borrow: &self.borrowed,
            })
        }
    }
}

unsafe impl<T> Sync for StaticCell<T> where for<'a> &'a mut T: Send {}

pub struct StaticRef<'a, T> {
    contents: &'a mut T,
    borrow: &'a AtomicBool,
}

impl<T> Drop for StaticRef<'_, T> {
    fn drop(&mut self) {
        self.borrow.store(false, Ordering::Release);
    }
}

impl<T> core::ops::Deref for StaticRef<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &*self.contents
    }
}

impl<T> core::ops::DerefMut for StaticRef<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.contents
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_borrow_is_refused() {
        let cell = StaticCell::new(7u32);
        let mut first = cell.borrow_mut();
        *first += 1;
        assert!(cell.try_borrow_mut().is_none());
        drop(first);

        let second = cell.try_borrow_mut().unwrap();
        assert_eq!(*second, 8);
    }

    #[test]
    #[should_panic]
    fn borrow_mut_panics_when_held() {
        let cell = StaticCell::new(0u8);
        let _held = cell.borrow_mut();
        let _ = cell.borrow_mut();
    }
}
