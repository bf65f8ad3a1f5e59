// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Platform collaborator interfaces shared by the fault and power servers.
//!
//! The servers in `drv/hmi-server` and `drv/occ-server` are pure control
//! logic; everything they need from the surrounding platform (chip topology,
//! shared-memory windows, the host event queue, configuration publication,
//! timing) comes in through the traits defined here. On hardware these bind
//! to the real platform services; in tests they bind to fakes.

#![no_std]

/// One processor chip in the platform.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Chip {
    /// Flat platform chip id.
    pub id: u32,
    /// The chip group this chip belongs to, as named in service processor
    /// lifecycle requests.
    pub group_id: u32,
    /// Identity of this chip in service processor status words.
    pub sp_id: u32,
}

/// A chip-local shared memory window used for data exchange with the on-chip
/// controller (the HOMER region).
///
/// The window is owned by the controller; firmware only ever reads it. Reads
/// are of live shared memory and may observe concurrent controller writes,
/// which is why access is expressed as a copy-out rather than a borrow.
pub trait HomerWindow {
    /// Copies `out.len()` bytes starting at `offset` within the window.
    fn read(&self, offset: usize, out: &mut [u8]);
}

/// A PCI host bridge instance, resolved through [`Topology`].
pub trait HostBridge {
    /// Starts the bridge's accelerator-unit recovery sequence.
    ///
    /// Implementations serialize internally with a bridge-local lock; the
    /// caller does not hold any bridge lock across this call.
    fn start_accel_recovery(&self);
}

/// Enumeration of the processor complex.
pub trait Topology {
    /// All chips, in fixed platform order. The first chip is the
    /// representative chip for platform-wide data owned per-chip.
    fn chips(&self) -> &[Chip];

    /// Ids of the available cores on `chip`.
    fn cores(&self, chip: &Chip) -> &[u32];

    /// The chip's OCC shared-memory window, if one was configured at boot.
    fn homer(&self, chip: &Chip) -> Option<&dyn HomerWindow>;

    /// Resolves a host bridge by (chip id, bridge index).
    fn host_bridge(&self, chip_id: u32, index: u32) -> Option<&dyn HostBridge>;
}

/// Message classes understood by the host event queue.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum MessageType {
    /// A hardware fault event record (three 64-bit words).
    FaultEvent = 2,
}

/// Errors from the host event queue.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EventSinkError {
    /// The queue has no room for the event right now.
    QueueFull,
}

/// Asynchronous message queue toward the host.
///
/// Submission is fire-and-forget: delivery happens later, and a submission
/// failure only tells the caller the event was dropped.
pub trait EventSink {
    fn submit(
        &self,
        msg_type: MessageType,
        words: &[u64; 3],
    ) -> Result<(), EventSinkError>;
}

/// Append-only property publication under the platform's power-management
/// configuration node.
pub trait PowerConfig {
    /// Reports whether the anchor node exists. Publication without an anchor
    /// is a configuration error, detected before any property is written.
    fn ready(&self) -> bool;

    /// Appends a byte-array property under the anchor.
    fn add_bytes(&mut self, name: &str, value: &[u8]);

    /// Appends a scalar cell property under the anchor.
    fn add_cell(&mut self, name: &str, value: u32);
}

/// Platform-level tuning knobs.
pub trait PlatformPolicy {
    /// Retry multiplier for controller readiness, in seconds-equivalent
    /// units; the readiness poller makes `occ_timeout() * 10`
    /// hundred-millisecond attempts per chip. The default policy allows no
    /// retries beyond the immediate check.
    fn occ_timeout(&self) -> u32 {
        0
    }
}

/// Blocking delay. This is a true busy/blocked wait, not a yield point.
pub trait Delay {
    /// Blocks the calling thread for at least `ms` milliseconds.
    fn sleep_for(&self, ms: u64);
}
