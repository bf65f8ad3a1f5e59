// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Types for talking to and about the on-chip controller (OCC).
//!
//! The OCC is a per-chip microcontroller that owns power and thermal
//! management. It exchanges data with firmware through a table at a fixed
//! offset inside the chip's HOMER shared-memory window, and its firmware
//! image is loaded, started and stopped on behalf of the service processor
//! through host-service calls. This crate holds the shared-memory layout,
//! the lifecycle message types, and the traits the lifecycle server is
//! driven through.

#![cfg_attr(not(test), no_std)]

use num_derive::FromPrimitive;
use platform_api::HomerWindow;
use static_assertions::const_assert_eq;
use zerocopy::{FromBytes, FromZeros, Immutable, IntoBytes, KnownLayout};

/// Byte offset of the firmware data area within a chip's HOMER window.
pub const OCC_DATA_OFFSET: usize = 0x1F_8000;

/// Fixed capacity of the operating-point array in shared memory. The number
/// of *usable* entries is derived from the min/max ids and is much smaller.
pub const MAX_PSTATES: usize = 256;

/// One operating point published by the controller.
#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    FromBytes,
    IntoBytes,
    Immutable,
    KnownLayout,
)]
#[repr(C)]
pub struct PstateEntry {
    /// Operating-point identifier; ids run from `pstate_min` up to
    /// `pstate_max` and may be negative.
    pub id: i8,
    pub flags: u8,
    /// Core voltage-domain reading.
    pub vdd: u8,
    /// Cache voltage-domain reading.
    pub vcs: u8,
    pub freq_khz: u32,
}

/// The controller's operating-point table, resident in shared memory.
///
/// The controller owns this memory. While `valid` is zero the rest of the
/// table is undefined and must not be interpreted; `valid` goes 0 → 1 once
/// during controller boot and firmware treats the table as read-only ever
/// after. (The window is cleared before the controller image runs, so a
/// zero `valid` reliably means "not ready yet".)
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct PstateTable {
    pub valid: u8,
    pub version: u8,
    pub throttle: u8,
    pub pstate_min: i8,
    pub pstate_nom: i8,
    pub pstate_max: i8,
    pub spare: [u8; 2],
    pub reserved: u64,
    pub pstates: [PstateEntry; MAX_PSTATES],
}

const_assert_eq!(core::mem::size_of::<PstateEntry>(), 8);
const_assert_eq!(core::mem::offset_of!(PstateTable, pstates), 16);
const_assert_eq!(
    core::mem::size_of::<PstateTable>(),
    16 + MAX_PSTATES * core::mem::size_of::<PstateEntry>()
);

impl PstateTable {
    /// Copies the table out of the chip's controller data area. The copy is
    /// taken from live shared memory; check `valid` before using the rest.
    pub fn read_from(window: &dyn HomerWindow) -> Self {
        let mut table = Self::new_zeroed();
        window.read(OCC_DATA_OFFSET, table.as_mut_bytes());
        table
    }

    /// Cheap readiness probe: reads only the validity flag.
    pub fn read_valid(window: &dyn HomerWindow) -> bool {
        let mut flag = [0u8; 1];
        window.read(OCC_DATA_OFFSET, &mut flag);
        flag[0] == 1
    }

    /// Count of usable entries, `max - min + 1`. Can be zero or negative if
    /// the controller published garbage; the exporter rejects anything
    /// outside [2, 128].
    pub fn nr_pstates(&self) -> i16 {
        self.pstate_max as i16 - self.pstate_min as i16 + 1
    }
}

/// Lifecycle commands the service processor can send us.
#[derive(Copy, Clone, Debug, PartialEq, Eq, FromPrimitive)]
#[repr(u32)]
pub enum SpOccCommand {
    /// Load (and start) the controller firmware image.
    Load = 0x00cd,
    /// Stop the controller and leave it stopped; the service processor
    /// sends a fresh load later.
    Reset = 0x00ce,
}

/// A lifecycle request as decoded from the transport.
///
/// `scope` says whether the request addresses one chip group or the whole
/// system; `seq_id` correlates the eventual status reply with the request.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LifecycleRequest {
    pub scope: u8,
    pub group_id: u32,
    pub seq_id: u32,
}

/// Request scope: one chip group.
pub const SCOPE_CHIP_GROUP: u8 = 0x01;
/// Request scope: every chip in the system.
pub const SCOPE_SYSTEM: u8 = 0x02;

/// Error code appended to an acknowledgment for a request with a scope we
/// don't understand.
pub const ERR_INVALID_SCOPE: u8 = 0x22;

/// Replies sent back over the service-processor transport. Wire framing is
/// the transport's problem; these are the command/status pairs it carries.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SpReply {
    /// Immediate acknowledgment of a load request; `err` is zero unless the
    /// request itself was malformed.
    LoadAck { err: u8 },
    /// Immediate acknowledgment of a reset request.
    ResetAck { err: u8 },
    /// Aggregated outcome of a load request.
    LoadStatus { status: u32, seq_id: u32 },
    /// Outcome of a reset request (one per failing chip on failure).
    ResetStatus { status: u32, seq_id: u32 },
}

/// Errors queuing a reply toward the service processor.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SpSendError {
    /// No message buffers available.
    NoBuffers,
}

/// Outbound half of the service-processor transport.
pub trait SpTransport {
    fn send(&self, reply: SpReply) -> Result<(), SpSendError>;
}

/// Failures from the host-service lifecycle calls.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum HostServiceError {
    /// The host has no loadable controller image. Distinct from other
    /// failures because a resident preloaded image makes this survivable.
    NotFound,
    /// Generic failure, with the host's status code.
    Failed(i32),
}

/// Host-service calls that actually move controller firmware around. The
/// implementations live outside this control plane.
pub trait HostServices {
    fn occ_load(&self) -> Result<(), HostServiceError>;
    fn occ_start(&self) -> Result<(), HostServiceError>;
    fn occ_stop(&self) -> Result<(), HostServiceError>;
}

/// Errors from controller bring-up, split along the taxonomy the callers
/// care about: configuration errors are final, timeouts are per-boot.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OccError {
    /// The chip has no shared-memory window. Configuration error; no
    /// amount of waiting will fix it.
    MissingHomer { chip: u32 },
    /// The chip's table never became valid within the allotted attempts.
    TableTimeout { chip: u32 },
    /// The representative chip's table is not valid.
    TableInvalid,
    /// Usable entry count out of range.
    BadPstateRange { count: i16 },
    /// The platform configuration anchor node is missing.
    MissingConfigAnchor,
}
