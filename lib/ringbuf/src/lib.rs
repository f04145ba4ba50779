// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Ring buffer for tracing display drivers
//!
//! This contains an implementation for a static ring buffer designed to be
//! used to instrument register-level driver code: every PLL search decision,
//! programming step and link-training transition lands in a small, fixed-size
//! buffer that can be read back from a debugger or, on the host, from tests.
//!
//! ## Constraints
//!
//! The type in the ring buffer must implement both `Copy` and `PartialEq`.
//!
//! If you use the variants of the `ringbuf!` macro that leave the name of the
//! data structure implicit, you can only have one per module. (You can lift
//! this constraint by providing a name.)
//!
//! ## Creating a ring buffer
//!
//! Ring buffers are instantiated with the [`ringbuf!`] macro, to which one
//! must provide the type of per-entry payload, the number of entries, and a
//! static initializer:
//!
//! ```
//! ringbuf!(Trace, 32, Trace::None);
//! ```
//!
//! Entries are generated with [`ringbuf_entry!`]:
//!
//! ```
//! ringbuf_entry!(Trace::Locked { lock, polls });
//! ```
//!
//! Submodules of a crate usually record into the buffer declared at the crate
//! root, by importing [`ringbuf_entry_root!`] under the shorter name:
//!
//! ```
//! use ringbuf::ringbuf_entry_root as ringbuf_entry;
//! ```
//!
//! ## Inspecting a ring buffer via GDB
//!
//! Assuming symbols are loaded, the buffer is an ordinary static named
//! `__RINGBUF` (or the name given to the macro) in the declaring crate:
//!
//! ```console
//! (gdb) set print pretty on
//! (gdb) print drv_intel_fdi::__RINGBUF
//! ```
//!
//! When an entry repeats the most recent one (same `line` and `payload`), its
//! `count` is bumped instead of consuming a new slot, so polling loops do not
//! flush out the interesting history.

#![cfg_attr(not(test), no_std)]

/// Re-export the bits we use from `static_cell` so that code generated by the
/// macros is guaranteed to be able to find them.
pub use static_cell::StaticCell;

/// Declares a ringbuffer in the current module or context.
///
/// `ringbuf!(NAME, Type, N, expr)` makes a ringbuffer named `NAME`,
/// containing entries of type `Type`, with room for `N` such entries, all of
/// which are initialized to `expr`.
///
/// The actual type of `name` will be `StaticCell<Ringbuf<T, N>>`.
///
/// To support the common case of having one quickly-installed ringbuffer per
/// module, if you omit the name, it will default to `__RINGBUF`.
#[cfg(not(feature = "disabled"))]
#[macro_export]
macro_rules! ringbuf {
    ($name:ident, $t:ty, $n:expr, $init:expr) => {
        #[used]
        static $name: $crate::StaticCell<$crate::Ringbuf<$t, $n>> =
            $crate::StaticCell::new($crate::Ringbuf {
                last: None,
                buffer: [$crate::RingbufEntry {
                    line: 0,
                    generation: 0,
                    count: 0,
                    payload: $init,
                }; $n],
            });
    };
    ($t:ty, $n:expr, $init:expr) => {
        $crate::ringbuf!(__RINGBUF, $t, $n, $init);
    };
}

#[cfg(feature = "disabled")]
#[macro_export]
macro_rules! ringbuf {
    ($name:ident, $t:ty, $n:expr, $init:expr) => {
        #[allow(dead_code)]
        const _: $t = $init;
    };
    ($t:ty, $n:expr, $init:expr) => {
        #[allow(dead_code)]
        const _: $t = $init;
    };
}

/// Inserts data into a named ringbuffer (which should have been declared with
/// the `ringbuf!` macro).
///
/// `ringbuf_entry!(NAME, expr)` will insert `expr` into the ringbuffer called
/// `NAME`. If the buffer is already borrowed (two drivers tracing from
/// different threads), the entry is dropped.
///
/// If you declared your ringbuffer without a name, you can also use this
/// without a name, and it will default to `__RINGBUF`.
#[cfg(not(feature = "disabled"))]
#[macro_export]
macro_rules! ringbuf_entry {
    ($buf:expr, $payload:expr) => {{
        // Evaluate both buf and payload, without letting them access each
        // other, by evaluating them in a tuple where each cannot
        // accidentally use the other's binding.
        let (p, buf) = ($payload, &$buf);
        if let Some(mut rb) = $crate::StaticCell::try_borrow_mut(buf) {
            $crate::Ringbuf::entry(&mut *rb, line!() as u16, p);
        }
    }};
    ($payload:expr) => {
        $crate::ringbuf_entry!(__RINGBUF, $payload);
    };
}

#[cfg(feature = "disabled")]
#[macro_export]
macro_rules! ringbuf_entry {
    ($buf:expr, $payload:expr) => {{
        let _ = &$buf;
        let _ = &$payload;
    }};
    ($payload:expr) => {{
        let _ = &$payload;
    }};
}

/// Inserts data into a ringbuffer at the root of this crate.
#[cfg(not(feature = "disabled"))]
#[allow(clippy::crate_in_macro_def)]
#[macro_export]
macro_rules! ringbuf_entry_root {
    ($buf:ident, $payload:expr) => {
        $crate::ringbuf_entry!(crate::$buf, $payload);
    };
    ($payload:expr) => {
        $crate::ringbuf_entry!(crate::__RINGBUF, $payload);
    };
}

#[cfg(feature = "disabled")]
#[macro_export]
macro_rules! ringbuf_entry_root {
    ($buf:ident, $payload:expr) => {{
        let _ = &$payload;
    }};
    ($payload:expr) => {{
        let _ = &$payload;
    }};
}

/// A single [`Ringbuf`] entry, carrying a payload of arbitrary type.
#[derive(Debug, Copy, Clone)]
pub struct RingbufEntry<T: Copy + PartialEq> {
    pub line: u16,
    pub generation: u16,
    pub count: u32,
    pub payload: T,
}

/// A ring buffer of parametrized type and size. In practice, instantiating
/// this directly is strange; see the [`ringbuf!`] macro.
#[derive(Debug)]
pub struct Ringbuf<T: Copy + PartialEq, const N: usize> {
    pub last: Option<usize>,
    pub buffer: [RingbufEntry<T>; N],
}

impl<T: Copy + PartialEq, const N: usize> Ringbuf<T, { N }> {
    pub fn entry(&mut self, line: u16, payload: T) {
        // None is treated as an out-of-range index, which lands the first
        // entry in slot 0 without touching any count.
        let last = self.last.unwrap_or(usize::MAX);

        if let Some(ent) = self.buffer.get_mut(last) {
            if ent.line == line && ent.payload == payload {
                if let Some(new_count) = ent.count.checked_add(1) {
                    ent.count = new_count;
                    return;
                }
            }
        }

        // wrapping_add turns the usize::MAX starting point into 0
        let ndx = {
            let last_plus_1 = last.wrapping_add(1);
            if last_plus_1 >= self.buffer.len() {
                0
            } else {
                last_plus_1
            }
        };

        let ent = &mut self.buffer[ndx];
        *ent = RingbufEntry {
            line,
            payload,
            count: 1,
            generation: ent.generation.wrapping_add(1),
        };

        self.last = Some(ndx);
    }

    /// Iterates over the recorded entries, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &RingbufEntry<T>> + '_ {
        let start = match self.last {
            Some(last) if last + 1 < N => last + 1,
            _ => 0,
        };
        self.buffer[start..]
            .iter()
            .chain(self.buffer[..start].iter())
            .filter(|e| e.count != 0)
    }
}
