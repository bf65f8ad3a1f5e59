// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Malfunction-alert decode.
//!
//! A malfunction alert is broadcast to every chip when a core somewhere in
//! the system fails recovery and requests sparing. The alert register on the
//! local chip has one bit per chip in the system; each set bit names a chip
//! that raised the alert. For each one we check whether the fault is the
//! recoverable accelerator-bridge case and, if so, kick the primary host
//! bridge on that chip into its recovery sequence.

use drv_hmi_api::{FaultEvent, FaultKind, RecoveryVerdict, Severity};
use drv_xbus_api::{ppc_bit, XbusError};
use ringbuf::*;

use crate::FaultMonitor;

/// System malfunction-alert register, mirrored on every chip.
pub(crate) const MALF_ALERT_REG: u64 = 0x0202_0011;

/// Accelerator-bridge error status/control register; bit 0 reports the unit
/// recoverable.
pub(crate) const ACCEL_ERR_STATUS_CTRL: u64 = 0x0201_000e;

#[derive(Copy, Clone, Debug, PartialEq)]
enum Trace {
    None,
    AlertWord(u64),
    AlertReadFailed(XbusError),
    AlertClearFailed(XbusError),
    AccelStatusReadFailed(XbusError),
    BridgeMissing(u32),
    BridgeRecovery(u32),
    NotRecoverable(u32),
}

ringbuf!(Trace, 32, Trace::None);

impl FaultMonitor<'_> {
    /// Decodes the malfunction-alert register as seen from `chip` (the chip
    /// the interrupted thread lives on), scanning set bits low to high and
    /// clearing each processed bit.
    ///
    /// The verdict is that of the last bit processed; a register that reads
    /// all-zero yields `Indeterminate`, meaning there was nothing to
    /// classify and no event should be surfaced.
    pub fn decode_malfunction(
        &self,
        chip: u32,
        event: &mut FaultEvent,
    ) -> RecoveryVerdict {
        let alert = match self.xbus.read(chip, MALF_ALERT_REG) {
            Ok(v) => v,
            Err(e) => {
                ringbuf_entry!(Trace::AlertReadFailed(e));
                return RecoveryVerdict::Indeterminate;
            }
        };
        ringbuf_entry!(Trace::AlertWord(alert));

        let mut verdict = RecoveryVerdict::Indeterminate;
        for bit in 0..64 {
            if alert & ppc_bit(bit) == 0 {
                continue;
            }

            verdict = self.decode_one_malfunction(bit, event);

            // Clear the processed bit by writing its complement. When
            // several alert bits are set in the same pass this store also
            // clears the not-yet-processed ones; that preserves historical
            // (possibly unintended) clear semantics, which are part of the
            // external contract. Revisit if this decoder ever grows more
            // fault sources.
            if let Err(e) = self.xbus.write(chip, MALF_ALERT_REG, !ppc_bit(bit))
            {
                ringbuf_entry!(Trace::AlertClearFailed(e));
            }
        }

        verdict
    }

    /// Decodes one alert bit. `alert_chip` is the flat id of the chip that
    /// raised the alert (the register assigns one bit per chip).
    ///
    /// The event defaults to a fatal malfunction alert; only a successful
    /// bridge recovery downgrades it.
    fn decode_one_malfunction(
        &self,
        alert_chip: u32,
        event: &mut FaultEvent,
    ) -> RecoveryVerdict {
        event.severity = Severity::Fatal;
        event.kind = FaultKind::MalfunctionAlert;

        if self.accel_recoverable(alert_chip) {
            if !self.recover_accel_bridge(alert_chip) {
                return RecoveryVerdict::NotRecovered;
            }
            event.severity = Severity::NoError;
            event.kind = FaultKind::BridgeRecovery;
            return RecoveryVerdict::Recovered;
        }

        // Only the accelerator-bridge unit is decoded today; any other
        // malfunction source stays a fatal alert. This is a known gap, not
        // an oversight.
        ringbuf_entry!(Trace::NotRecoverable(alert_chip));
        RecoveryVerdict::NotRecovered
    }

    fn accel_recoverable(&self, chip: u32) -> bool {
        match self.xbus.read(chip, ACCEL_ERR_STATUS_CTRL) {
            Ok(reg) => reg & ppc_bit(0) != 0,
            Err(e) => {
                ringbuf_entry!(Trace::AccelStatusReadFailed(e));
                false
            }
        }
    }

    /// Runs accelerator recovery through the primary host bridge (index 0)
    /// on `chip`. The bridge serializes the operation behind its own lock;
    /// the monitor lock is never held against a bridge lock in the other
    /// order, so there is no ordering hazard.
    fn recover_accel_bridge(&self, chip: u32) -> bool {
        let Some(bridge) = self.topology.host_bridge(chip, 0) else {
            ringbuf_entry!(Trace::BridgeMissing(chip));
            return false;
        };
        bridge.start_accel_recovery();
        ringbuf_entry!(Trace::BridgeRecovery(chip));
        true
    }
}
