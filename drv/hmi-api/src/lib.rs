// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Types for the maintenance interrupt path, shared between the fault
//! monitor and its host-facing event format.
//!
//! The maintenance exception status register (HMER) is a sticky 64-bit
//! bit-field: a bit stays set until software writes the desired final value
//! back. The monitor reads it once per interrupt, clears the bits it
//! recognizes from a working copy, and writes that copy back in a single
//! store. Bits it does not recognize must survive the round trip.

#![cfg_attr(not(test), no_std)]

use drv_xbus_api::ppc_bit;
use static_assertions::const_assert_eq;
use zerocopy::{Immutable, IntoBytes, KnownLayout};

bitflags::bitflags! {
    /// Maintenance exception status register layout.
    ///
    /// Big-endian bit numbering, per the bus convention. Only the bits the
    /// monitor reacts to are named here; the hardware defines others (bus
    /// trap status, overflow warnings) that firmware leaves enabled-masked
    /// and passes through untouched.
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct Hmer: u64 {
        /// A core somewhere in the system failed recovery and requested
        /// sparing; broadcast to every chip.
        const MALFUNCTION_ALERT = ppc_bit(0);
        /// A core went through recovery for an unmasked error.
        const PROC_RECV_DONE = ppc_bit(2);
        /// A core went through recovery for an error that is masked for
        /// reporting.
        const PROC_RECV_ERROR_MASKED = ppc_bit(3);
        /// The timer facility saw an error; details are in TFMR.
        const TFAC_ERROR = ppc_bit(4);
        /// TFMR itself is corrupted.
        const TFMR_PARITY_ERROR = ppc_bit(5);
        /// Recovery fired again before an earlier PROC_RECV_DONE was
        /// acknowledged.
        const PROC_RECV_AGAIN = ppc_bit(11);
        /// Parity error on a hypervisor resource (SPRC0:3, SPR_Modereg or
        /// the enable mask itself).
        const HYP_RESOURCE_ERR = ppc_bit(20);
    }
}

/// Aggregate outcome of one classification pass.
///
/// `Indeterminate` means the condition was never actually classified; no
/// event may be surfaced for it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RecoveryVerdict {
    Recovered,
    NotRecovered,
    Indeterminate,
}

/// Event severity, ordered least to most severe.
#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    IntoBytes,
    Immutable,
    KnownLayout,
)]
#[repr(u8)]
pub enum Severity {
    NoError = 0,
    Warning = 1,
    /// An error synchronous to the interrupted instruction stream.
    SyncError = 2,
    Fatal = 3,
}

/// The recognized fault conditions, one per classifier step.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, IntoBytes, Immutable, KnownLayout,
)]
#[repr(u8)]
pub enum FaultKind {
    MalfunctionAlert = 0,
    ProcRecoveryDone = 1,
    ProcRecoveryDoneAgain = 2,
    ProcRecoveryMasked = 3,
    TimerFacility = 4,
    TfmrParity = 5,
    HypResource = 6,
    /// A malfunction alert that resolved through host-bridge accelerator
    /// recovery.
    BridgeRecovery = 7,
}

/// How the condition was left, as reported to the host.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, IntoBytes, Immutable, KnownLayout,
)]
#[repr(u8)]
pub enum Disposition {
    Recovered = 0,
    NotRecovered = 1,
}

/// One fault event record, delivered to the host as three opaque 64-bit
/// words.
///
/// The record is stack-scoped: created per interrupt, populated during
/// classification, handed to the event queue, then discarded.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, IntoBytes, Immutable, KnownLayout,
)]
#[repr(C)]
pub struct FaultEvent {
    pub version: u8,
    pub severity: Severity,
    pub kind: FaultKind,
    pub disposition: Disposition,
    reserved: [u8; 4],
    /// Snapshot of the raw exception status register as read at entry.
    pub status: u64,
    /// Snapshot of TFMR, populated only for timer-facility conditions.
    pub tfmr: u64,
}

// The host ABI is three 64-bit words; keep the record exactly that big.
const_assert_eq!(core::mem::size_of::<FaultEvent>(), 24);

impl FaultEvent {
    pub const VERSION_1: u8 = 1;

    pub fn new() -> Self {
        Self {
            version: Self::VERSION_1,
            severity: Severity::NoError,
            kind: FaultKind::MalfunctionAlert,
            disposition: Disposition::Recovered,
            reserved: [0; 4],
            status: 0,
            tfmr: 0,
        }
    }

    /// The record viewed as the three words the host queue carries.
    pub fn as_words(&self) -> [u64; 3] {
        let mut words = [0u64; 3];
        words.as_mut_bytes().copy_from_slice(self.as_bytes());
        words
    }
}

impl Default for FaultEvent {
    fn default() -> Self {
        Self::new()
    }
}

/// Access to the interrupted core's special-purpose registers.
///
/// The exception status and timer registers are per-thread hardware state;
/// this trait is the seam that lets tests substitute simulated registers.
pub trait CoreSprs {
    fn read_hmer(&self) -> u64;
    fn write_hmer(&self, value: u64);
    fn read_tfmr(&self) -> u64;
}

/// The external timer-facility recovery routine.
pub trait TimebaseRecovery {
    /// Attempts to recover the timebase after a timer facility error;
    /// reports whether the facility is usable again.
    fn recover_tb_errors(&self) -> bool;
}
