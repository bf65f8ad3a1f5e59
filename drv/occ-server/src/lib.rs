// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Server for the on-chip controller (OCC).
//!
//! Three jobs live here:
//!
//! - boot-time bring-up: wait for every chip's controller to publish a valid
//!   operating-point table, export that table to platform configuration, and
//!   hand each core over to direct pstate control ([`pstates`]);
//! - lifecycle: answer load/reset requests from the service processor by
//!   driving the host-service calls that move controller firmware around
//!   ([`lifecycle`]);
//! - interrupts: demultiplex the controller's single interrupt line into its
//!   logical sources.
//!
//! Bring-up runs once, early, before general concurrency; the lifecycle and
//! interrupt paths run on demand afterward.

#![cfg_attr(not(test), no_std)]

mod lifecycle;
mod pstates;

use drv_xbus_api::{ppc_bit, Xbus, XbusError};
use platform_api::{Delay, PlatformPolicy, PowerConfig, Topology};
use ringbuf::*;

use drv_occ_api::{HostServices, SpTransport};

/// Controller miscellaneous/interrupt register, plus its write-AND and
/// write-OR aliases.
pub(crate) const OCB_OCI_OCCMISC: u64 = 0x6a020;
pub(crate) const OCB_OCI_OCCMISC_AND: u64 = 0x6a021;
pub(crate) const OCB_OCI_OCCMISC_OR: u64 = 0x6a022;

/// Interrupt present.
pub(crate) const OCCMISC_IRQ: u64 = ppc_bit(0);
/// Thermal-management interrupt source.
pub(crate) const OCCMISC_IRQ_TMGT: u64 = ppc_bit(1);
/// Source reserved for firmware-injected dummy interrupts.
pub(crate) const OCCMISC_IRQ_HOST_DUMMY: u64 = ppc_bit(15);

#[derive(Copy, Clone, Debug, PartialEq)]
enum Trace {
    None,
    Irq(u16),
    IrqReadFailed(XbusError),
    IrqClearFailed(XbusError),
    ThermalIrq(u32),
    DummyIrqFailed(XbusError),
}

ringbuf!(Trace, 32, Trace::None);

/// The controller manager. One instance serves the whole platform; all
/// hardware and platform services come in as trait references so the
/// manager can run against fakes.
pub struct OccManager<'a> {
    xbus: &'a dyn Xbus,
    topology: &'a dyn Topology,
    policy: &'a dyn PlatformPolicy,
    config: &'a mut dyn PowerConfig,
    sp: &'a dyn SpTransport,
    host: &'a dyn HostServices,
    delay: &'a dyn Delay,
}

impl<'a> OccManager<'a> {
    pub fn new(
        xbus: &'a dyn Xbus,
        topology: &'a dyn Topology,
        policy: &'a dyn PlatformPolicy,
        config: &'a mut dyn PowerConfig,
        sp: &'a dyn SpTransport,
        host: &'a dyn HostServices,
        delay: &'a dyn Delay,
    ) -> Self {
        Self {
            xbus,
            topology,
            policy,
            config,
            sp,
            host,
            delay,
        }
    }

    /// Handles the controller interrupt on `chip`. The single line muxes up
    /// to 15 sources; read the cause word, acknowledge everything it
    /// indicates, and dispatch the sources we recognize. Unrecognized bits
    /// are absorbed by the acknowledge.
    pub fn handle_interrupt(&self, chip: u32) {
        let cause = match self.xbus.read(chip, OCB_OCI_OCCMISC) {
            Ok(v) => v,
            Err(e) => {
                // We could mask the interrupt at its source here, but
                // deliberately don't: a bus that can't read the cause word
                // probably can't mask it either.
                ringbuf_entry!(Trace::IrqReadFailed(e));
                return;
            }
        };
        ringbuf_entry!(Trace::Irq((cause >> 48) as u16));

        // Acknowledge every indicated bit through the write-AND alias.
        if let Err(e) = self.xbus.write(chip, OCB_OCI_OCCMISC_AND, !cause) {
            ringbuf_entry!(Trace::IrqClearFailed(e));
        }

        if cause & OCCMISC_IRQ_TMGT != 0 {
            self.thermal_interrupt(chip);
        }
    }

    /// Raises a dummy controller interrupt on `chip` through the write-OR
    /// alias, to kick the interrupt path during handoff.
    pub fn send_dummy_interrupt(&self, chip: u32) {
        if let Err(e) = self.xbus.write(
            chip,
            OCB_OCI_OCCMISC_OR,
            OCCMISC_IRQ | OCCMISC_IRQ_HOST_DUMMY,
        ) {
            ringbuf_entry!(Trace::DummyIrqFailed(e));
        }
    }

    fn thermal_interrupt(&self, chip: u32) {
        // Not currently expected; record it and move on.
        ringbuf_entry!(Trace::ThermalIrq(chip));
    }
}

#[cfg(test)]
mod tests;
