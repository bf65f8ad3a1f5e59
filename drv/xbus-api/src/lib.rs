// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Access to the chip-to-chip debug/service bus.
//!
//! Every per-chip hardware register in this workspace is reached through a
//! single primitive: an atomic 64-bit read or write at a (chip, address)
//! pair. The bus engine itself lives elsewhere; this crate defines the
//! contract, so servers can be driven against a simulated bus in tests and
//! bound to the real engine on hardware.
//!
//! Register layouts on this bus use big-endian bit numbering: bit 0 is the
//! most significant bit of the 64-bit value. [`ppc_bit`] converts from that
//! numbering to a mask.

#![cfg_attr(not(test), no_std)]

/// Mask for big-endian-numbered `bit` of a 64-bit register.
pub const fn ppc_bit(bit: u32) -> u64 {
    1 << (63 - bit)
}

/// Errors reported by the bus engine.
///
/// These are opaque I/O failures: the caller can't do anything more specific
/// than abort the operation at hand, but distinguishing them gives upstack
/// software some context.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum XbusError {
    /// The target chip did not respond in time.
    Timeout,
    /// The bus engine reported an error on the transaction.
    BusFault,
    /// The address is not mapped on the target chip.
    BadAddress,
}

/// Atomic 64-bit register access at a (chip, address) pair.
///
/// Implementations must make each call a single bus transaction; callers
/// needing a larger atomic unit (read-modify-write across calls) must
/// serialize at their own level.
pub trait Xbus {
    fn read(&self, chip: u32, addr: u64) -> Result<u64, XbusError>;
    fn write(&self, chip: u32, addr: u64, value: u64) -> Result<(), XbusError>;
}
