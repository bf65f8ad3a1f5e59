// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Ring buffer for tracing drivers and servers.
//!
//! Each module that wants tracing declares a `Trace` payload type (which must
//! be `Copy + PartialEq`) and instantiates a static ring buffer for it with
//! the [`ringbuf!`] macro:
//!
//! ```ignore
//! ringbuf!(Trace, 64, Trace::None);
//! ```
//!
//! Entries are recorded with [`ringbuf_entry!`]:
//!
//! ```ignore
//! ringbuf_entry!(Trace::Interrupt(hmer));
//! ```
//!
//! Consecutive recordings of the same payload from the same source line are
//! coalesced into one entry with an incremented count, so a polling loop that
//! observes the same state many times costs one slot.
//!
//! The buffers are plain statics and can be read out of a dump or over a
//! debug probe; nothing in this crate formats or transmits them. Fault paths
//! that record entries can run concurrently on several hardware threads, so
//! the buffer interior sits behind a spinlock.
//!
//! If you use the form of [`ringbuf!`] that leaves the name of the static
//! implicit, you can only have one per module. (You can lift this constraint
//! by providing a name.)

#![no_std]

pub use spin::Mutex;

/// One recorded trace entry.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RingbufEntry<T: Copy + PartialEq> {
    /// Source line that recorded this entry.
    pub line: u16,
    /// How many times the buffer had wrapped when this entry was written.
    pub generation: u16,
    /// Number of consecutive identical recordings coalesced here.
    pub count: u32,
    pub payload: T,
}

/// A fixed-size trace buffer holding the most recent `N` distinct entries.
#[derive(Debug)]
pub struct Ringbuf<T: Copy + PartialEq, const N: usize> {
    /// Index of the most recently written entry, or `None` before the first
    /// recording.
    pub last: Option<usize>,
    pub generation: u16,
    pub buffer: [RingbufEntry<T>; N],
}

impl<T: Copy + PartialEq, const N: usize> Ringbuf<T, N> {
    pub const fn new(initial: T) -> Self {
        Self {
            last: None,
            generation: 0,
            buffer: [RingbufEntry {
                line: 0,
                generation: 0,
                count: 0,
                payload: initial,
            }; N],
        }
    }

    /// Records `payload` from source line `line`, coalescing with the
    /// previous entry when both line and payload match.
    pub fn entry(&mut self, line: u16, payload: T) {
        if let Some(last) = self.last {
            let e = &mut self.buffer[last];
            if e.line == line && e.payload == payload && e.count < u32::MAX {
                e.count += 1;
                return;
            }
        }

        let ndx = match self.last {
            Some(last) if last + 1 < N => last + 1,
            Some(_) => {
                self.generation = self.generation.wrapping_add(1);
                0
            }
            None => 0,
        };

        self.buffer[ndx] = RingbufEntry {
            line,
            generation: self.generation,
            count: 1,
            payload,
        };
        self.last = Some(ndx);
    }
}

/// Declares a static ring buffer in the current module.
///
/// `ringbuf!(NAME, Type, N, expr)` makes a ring buffer named `NAME`,
/// containing entries of type `Type`, with room for `N` such entries, all of
/// which are initialized to `expr`. If you omit the name, it will default to
/// `__RINGBUF`.
#[macro_export]
macro_rules! ringbuf {
    ($name:ident, $t:ty, $n:expr, $init:expr) => {
        #[used]
        static $name: $crate::Mutex<$crate::Ringbuf<$t, $n>> =
            $crate::Mutex::new($crate::Ringbuf::new($init));
    };
    ($t:ty, $n:expr, $init:expr) => {
        $crate::ringbuf!(__RINGBUF, $t, $n, $init);
    };
}

/// Inserts data into a ring buffer declared with [`ringbuf!`].
///
/// `ringbuf_entry!(NAME, expr)` inserts `expr` into the ring buffer called
/// `NAME`; without a name it records into `__RINGBUF`.
#[macro_export]
macro_rules! ringbuf_entry {
    ($name:ident, $payload:expr) => {{
        // Evaluate the payload before taking the lock so a payload expression
        // that itself records an entry cannot deadlock.
        let p = $payload;
        $crate::Ringbuf::entry(&mut *$name.lock(), line!() as u16, p);
    }};
    ($payload:expr) => {
        $crate::ringbuf_entry!(__RINGBUF, $payload)
    };
}
