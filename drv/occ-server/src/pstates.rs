// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Controller bring-up: readiness polling, table export, core handoff.
//!
//! The controller publishes its operating-point table into the chip's
//! shared-memory window asynchronously during its own boot. We wait for
//! that with a bounded poll, publish the table to platform configuration,
//! and then walk every core switching it from controller-driven to direct
//! pstate control at the nominal operating point.
//!
//! Two different failure policies coexist here on purpose. The readiness
//! wait aborts on the first chip that never comes ready (a platform with a
//! half-ready controller set is not usable), while the core walk continues
//! past individual core failures (a core left under controller control is
//! better than abandoning bring-up). Keep them as separate loops; they are
//! not the same operation with a flag.

use drv_occ_api::{OccError, PstateTable};
use drv_xbus_api::{ppc_bit, XbusError};
use platform_api::Chip;
use ringbuf::*;
use zerocopy::IntoBytes;

use crate::OccManager;

/// Per-core power-management registers hang off the core's EX slave.
pub(crate) const fn ex_slave_addr(core: u32, reg: u64) -> u64 {
    0x1000_0000 | ((core as u64 & 0xf) << 24) | reg
}

/// Write-OR alias of the PM GP1 register.
pub(crate) const EX_PM_SET_GP1: u64 = 0x0104;
/// Write-AND alias of the PM GP1 register.
pub(crate) const EX_PM_CLEAR_GP1: u64 = 0x0105;
/// Pstate mode control register; the pstate request sits in the top 16
/// bits as two 8-bit subfields.
pub(crate) const EX_PM_PPMCR: u64 = 0x0106;
/// Pstate mode status register, read back for diagnostics only.
pub(crate) const EX_PM_PPMSR: u64 = 0x0108;

/// GP1 bit granting pstate control to direct register writes instead of
/// the controller.
pub(crate) const PM_GP1_SPR_OVERRIDE_EN: u64 = ppc_bit(2);

/// Poll interval for the readiness wait.
const POLL_INTERVAL_MS: u64 = 100;

#[derive(Copy, Clone, Debug, PartialEq)]
enum Trace {
    None,
    NoHomer(u32),
    TableValid(u32),
    TableTimeout(u32),
    TableInvalid,
    PstateRange {
        min: i8,
        nom: i8,
        max: i8,
        count: i16,
    },
    Published(i16),
    CoreSetupFailed {
        chip: u32,
        core: u32,
        err: XbusError,
    },
    CorePstateStatus {
        core: u32,
        status: u64,
    },
    InitFailed(OccError),
}

ringbuf!(Trace, 64, Trace::None);

impl OccManager<'_> {
    /// Boot-time bring-up. Logs and gives up at each failure boundary; a
    /// platform without working pstates still boots.
    pub fn pstates_init(&mut self) {
        let Some(chip) = self.topology.chips().first() else {
            return;
        };
        if self.topology.homer(chip).is_none() {
            // No shared-memory window on the representative chip: assume
            // this platform simply has no pstate support.
            ringbuf_entry!(Trace::NoHomer(chip.id));
            return;
        }

        if let Err(e) = self.wait_all_ready() {
            ringbuf_entry!(Trace::InitFailed(e));
            return;
        }

        let nominal = match self.export_pstates() {
            Ok(n) => n,
            Err(e) => {
                ringbuf_entry!(Trace::InitFailed(e));
                return;
            }
        };

        self.activate_cores(nominal);
    }

    /// Waits for every chip's controller to mark its table valid.
    ///
    /// A chip without a window fails immediately: that is a configuration
    /// error, and no amount of polling will grow one. A chip whose table
    /// stays invalid after `occ_timeout() * 10` hundred-millisecond
    /// attempts aborts the whole wait; there is no partial success.
    pub fn wait_all_ready(&self) -> Result<(), OccError> {
        let timeout = self.policy.occ_timeout();

        for chip in self.topology.chips() {
            let window = match self.topology.homer(chip) {
                Some(w) => w,
                None => {
                    ringbuf_entry!(Trace::NoHomer(chip.id));
                    return Err(OccError::MissingHomer { chip: chip.id });
                }
            };

            // The window is cleared before the controller image runs, so
            // a zero flag reliably means "still booting".
            let mut tries = timeout * 10;
            loop {
                if PstateTable::read_valid(window) {
                    break;
                }
                if tries == 0 {
                    ringbuf_entry!(Trace::TableTimeout(chip.id));
                    return Err(OccError::TableTimeout { chip: chip.id });
                }
                tries -= 1;
                self.delay.sleep_for(POLL_INTERVAL_MS);
            }
            ringbuf_entry!(Trace::TableValid(chip.id));
        }

        Ok(())
    }

    /// Validates the representative chip's table and publishes it to
    /// platform configuration; returns the nominal operating point for the
    /// core handoff.
    ///
    /// Frequencies are published in MHz, truncated from the controller's
    /// kHz. All scratch is stack-local and gone on return, on every path.
    pub fn export_pstates(&mut self) -> Result<i8, OccError> {
        // The table is per-chip but identical across the platform, so the
        // first chip speaks for all of them.
        let Some(chip) = self.topology.chips().first() else {
            return Err(OccError::TableInvalid);
        };
        let Some(window) = self.topology.homer(chip) else {
            return Err(OccError::MissingHomer { chip: chip.id });
        };

        let table = PstateTable::read_from(window);
        if table.valid != 1 {
            ringbuf_entry!(Trace::TableInvalid);
            return Err(OccError::TableInvalid);
        }

        let count = table.nr_pstates();
        ringbuf_entry!(Trace::PstateRange {
            min: table.pstate_min,
            nom: table.pstate_nom,
            max: table.pstate_max,
            count,
        });
        if !(2..=128).contains(&count) {
            return Err(OccError::BadPstateRange { count });
        }
        if !self.config.ready() {
            return Err(OccError::MissingConfigAnchor);
        }

        let count = count as usize;
        let mut ids = [0u32; 128];
        let mut freqs_mhz = [0u32; 128];
        let mut vdds = [0u8; 128];
        let mut vcss = [0u8; 128];
        for (i, entry) in table.pstates[..count].iter().enumerate() {
            ids[i] = entry.id as u32;
            freqs_mhz[i] = entry.freq_khz / 1000;
            vdds[i] = entry.vdd;
            vcss[i] = entry.vcs;
        }

        self.config.add_bytes("pstate-ids", ids[..count].as_bytes());
        self.config
            .add_bytes("pstate-frequencies-mhz", freqs_mhz[..count].as_bytes());
        self.config.add_bytes("pstate-vdds", &vdds[..count]);
        self.config.add_bytes("pstate-vcss", &vcss[..count]);
        self.config.add_cell("pstate-min", table.pstate_min as u32);
        self.config.add_cell("pstate-nominal", table.pstate_nom as u32);
        self.config.add_cell("pstate-max", table.pstate_max as u32);
        ringbuf_entry!(Trace::Published(count as i16));

        Ok(table.pstate_nom)
    }

    /// Hands every core in the platform over to direct pstate control,
    /// continuing past individual failures.
    pub fn activate_cores(&self, nominal: i8) {
        for chip in self.topology.chips() {
            for &core in self.topology.cores(chip) {
                if let Err(err) = self.prepare_core(chip, core, nominal) {
                    ringbuf_entry!(Trace::CoreSetupFailed {
                        chip: chip.id,
                        core,
                        err,
                    });
                }
            }
        }
    }

    /// Switches one core from controller-driven to direct pstate control
    /// at `nominal`.
    fn prepare_core(
        &self,
        chip: &Chip,
        core: u32,
        nominal: i8,
    ) -> Result<(), XbusError> {
        // The controller may be manipulating GP1 concurrently, so use the
        // write-OR alias to touch only the override-enable bit.
        self.xbus.write(
            chip.id,
            ex_slave_addr(core, EX_PM_SET_GP1),
            PM_GP1_SPR_OVERRIDE_EN,
        )?;

        // Encode the nominal pstate into both request subfields in the top
        // 16 bits of PPMCR, leaving the rest of the register alone.
        let addr = ex_slave_addr(core, EX_PM_PPMCR);
        let mut val = self.xbus.read(chip.id, addr)?;
        val &= !0xFFFF_0000_0000_0000;
        let pstate = (nominal as u64) & 0xff;
        val |= (pstate << 56) | (pstate << 48);
        self.xbus.write(chip.id, addr, val)?;

        // Let the power state machine settle at the new operating point
        // before taking the override away; switching over mid-transition
        // can wedge it.
        self.delay.sleep_for(1);

        // Write-AND alias to clear just the override bit.
        self.xbus.write(
            chip.id,
            ex_slave_addr(core, EX_PM_CLEAR_GP1),
            !PM_GP1_SPR_OVERRIDE_EN,
        )?;

        // Status readback is diagnostic only; a failed read is not a
        // failed handoff.
        if let Ok(status) =
            self.xbus.read(chip.id, ex_slave_addr(core, EX_PM_PPMSR))
        {
            ringbuf_entry!(Trace::CorePstateStatus { core, status });
        }

        Ok(())
    }
}
