// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Server for the maintenance interrupt.
//!
//! Any hardware thread can take the maintenance interrupt; every one of them
//! funnels into [`FaultMonitor::handle_interrupt`], which classifies the
//! exception status register bit by bit in a fixed priority order, queues a
//! fault event to the host for each recognized condition, and writes the
//! cleared status back in a single store (the register is sticky, so an
//! unwritten bit would re-raise the interrupt forever).
//!
//! Conditions are evaluated strictly in the order below, and each recognized
//! condition overwrites the running verdict. When several bits are set at
//! once the verdict of the *last* condition in this order wins; that
//! override-by-order rule is part of the external contract and must not be
//! collapsed into a worst-of reduction.
//!
//! 1. processor recovery done
//! 2. processor recovery done, error masked
//! 3. processor recovery fired again before acknowledgment
//! 4. malfunction alert (delegated to the decoder in [`malf`])
//! 5. hypervisor resource error
//! 6. timer facility error (delegated to the timebase recovery routine)
//! 7. timer facility register parity error

#![cfg_attr(not(test), no_std)]

mod malf;

use drv_hmi_api::{
    CoreSprs, Disposition, FaultEvent, FaultKind, Hmer, RecoveryVerdict,
    Severity, TimebaseRecovery,
};
use drv_xbus_api::Xbus;
use platform_api::{EventSink, EventSinkError, MessageType, Topology};
use ringbuf::*;

#[derive(Copy, Clone, Debug, PartialEq)]
enum Trace {
    None,
    Interrupt(u64),
    ProcRecoveryDone,
    ProcRecoveryMasked,
    ProcRecoveryAgain,
    MalfunctionAlert,
    HypResourceError,
    TimerFacilityError { recovered: bool },
    TfmrParityError,
    EventDropped(EventSinkError),
    WriteBack(u64),
}

ringbuf!(Trace, 64, Trace::None);

/// The maintenance-interrupt fault monitor.
///
/// One instance serves the whole platform. All collaborators come in as
/// trait references so the monitor can run against simulated hardware.
pub struct FaultMonitor<'a> {
    xbus: &'a dyn Xbus,
    sprs: &'a dyn CoreSprs,
    timebase: &'a dyn TimebaseRecovery,
    topology: &'a dyn Topology,
    events: &'a dyn EventSink,
    /// Serializes the entire read-classify-clear-write sequence across all
    /// hardware threads. The status register is shared hardware state, so
    /// the read-modify-write must be atomic across the whole decode, not
    /// just per access. Held across delegated recovery calls, with no
    /// timeout: a stuck thread blocks the others, which is acceptable in a
    /// checkstop scenario where there is no other forward-progress
    /// requirement.
    lock: spin::Mutex<()>,
}

impl<'a> FaultMonitor<'a> {
    pub fn new(
        xbus: &'a dyn Xbus,
        sprs: &'a dyn CoreSprs,
        timebase: &'a dyn TimebaseRecovery,
        topology: &'a dyn Topology,
        events: &'a dyn EventSink,
    ) -> Self {
        Self {
            xbus,
            sprs,
            timebase,
            topology,
            events,
            lock: spin::Mutex::new(()),
        }
    }

    /// Entry point for the maintenance interrupt, called on the faulting
    /// thread with `chip` naming the chip that thread lives on.
    pub fn handle_interrupt(&self, chip: u32) -> RecoveryVerdict {
        let _guard = self.lock.lock();
        let hmer = self.sprs.read_hmer();
        let mut event = FaultEvent::new();
        self.handle_exception(chip, hmer, Some(&mut event))
    }

    /// Classifies `hmer` and writes the cleared value back.
    ///
    /// If `event` is supplied, one fault event per recognized condition is
    /// populated in it and queued to the host. Without an event record
    /// nothing is queued, and a malfunction alert is left unclassified as
    /// not-recovered.
    ///
    /// The caller is responsible for serialization; `handle_interrupt` holds
    /// the monitor lock around this.
    pub fn handle_exception(
        &self,
        chip: u32,
        hmer: u64,
        mut event: Option<&mut FaultEvent>,
    ) -> RecoveryVerdict {
        ringbuf_entry!(Trace::Interrupt(hmer));

        let mut status = Hmer::from_bits_retain(hmer);
        let mut verdict = RecoveryVerdict::Recovered;

        if let Some(ev) = event.as_deref_mut() {
            ev.status = hmer;
        }

        if status.contains(Hmer::PROC_RECV_DONE) {
            status.remove(Hmer::PROC_RECV_DONE);
            ringbuf_entry!(Trace::ProcRecoveryDone);
            if let Some(ev) = event.as_deref_mut() {
                ev.severity = Severity::NoError;
                ev.kind = FaultKind::ProcRecoveryDone;
                self.queue_event(ev, verdict);
            }
        }

        if status.contains(Hmer::PROC_RECV_ERROR_MASKED) {
            status.remove(Hmer::PROC_RECV_ERROR_MASKED);
            ringbuf_entry!(Trace::ProcRecoveryMasked);
            if let Some(ev) = event.as_deref_mut() {
                ev.severity = Severity::NoError;
                ev.kind = FaultKind::ProcRecoveryMasked;
                self.queue_event(ev, verdict);
            }
        }

        if status.contains(Hmer::PROC_RECV_AGAIN) {
            status.remove(Hmer::PROC_RECV_AGAIN);
            ringbuf_entry!(Trace::ProcRecoveryAgain);
            if let Some(ev) = event.as_deref_mut() {
                ev.severity = Severity::NoError;
                ev.kind = FaultKind::ProcRecoveryDoneAgain;
                self.queue_event(ev, verdict);
            }
        }

        if status.contains(Hmer::MALFUNCTION_ALERT) {
            status.remove(Hmer::MALFUNCTION_ALERT);
            ringbuf_entry!(Trace::MalfunctionAlert);
            verdict = RecoveryVerdict::NotRecovered;
            if let Some(ev) = event.as_deref_mut() {
                verdict = self.decode_malfunction(chip, ev);
                self.queue_event(ev, verdict);
            }
        }

        if status.contains(Hmer::HYP_RESOURCE_ERR) {
            status.remove(Hmer::HYP_RESOURCE_ERR);
            ringbuf_entry!(Trace::HypResourceError);
            verdict = RecoveryVerdict::NotRecovered;
            if let Some(ev) = event.as_deref_mut() {
                ev.severity = Severity::Fatal;
                ev.kind = FaultKind::HypResource;
                self.queue_event(ev, verdict);
            }
        }

        if status.contains(Hmer::TFAC_ERROR) {
            // Snapshot TFMR before anyone touches the facility.
            let tfmr = self.sprs.read_tfmr();
            status.remove(Hmer::TFAC_ERROR);
            verdict = if self.timebase.recover_tb_errors() {
                RecoveryVerdict::Recovered
            } else {
                RecoveryVerdict::NotRecovered
            };
            ringbuf_entry!(Trace::TimerFacilityError {
                recovered: verdict == RecoveryVerdict::Recovered,
            });
            if let Some(ev) = event.as_deref_mut() {
                ev.severity = Severity::SyncError;
                ev.kind = FaultKind::TimerFacility;
                ev.tfmr = tfmr;
                self.queue_event(ev, verdict);
            }
        }

        if status.contains(Hmer::TFMR_PARITY_ERROR) {
            let tfmr = self.sprs.read_tfmr();
            status.remove(Hmer::TFMR_PARITY_ERROR);
            ringbuf_entry!(Trace::TfmrParityError);
            verdict = RecoveryVerdict::NotRecovered;
            if let Some(ev) = event.as_deref_mut() {
                ev.severity = Severity::Fatal;
                ev.kind = FaultKind::TfmrParity;
                ev.tfmr = tfmr;
                self.queue_event(ev, verdict);
            }
        }

        // The status bits are sticky: they stay set until written to zero,
        // and an unwritten bit re-raises the interrupt. Write the working
        // copy back in one store, leaving unrecognized bits exactly as we
        // found them.
        ringbuf_entry!(Trace::WriteBack(status.bits()));
        self.sprs.write_hmer(status.bits());

        verdict
    }

    /// Sets the event's disposition from `verdict` and submits it to the
    /// host queue. An `Indeterminate` verdict means the condition was never
    /// classified, and no event is surfaced at all. Submission failure is
    /// traced and swallowed; it never fails the classifier.
    fn queue_event(&self, event: &mut FaultEvent, verdict: RecoveryVerdict) {
        event.disposition = match verdict {
            RecoveryVerdict::Recovered => Disposition::Recovered,
            RecoveryVerdict::NotRecovered => Disposition::NotRecovered,
            RecoveryVerdict::Indeterminate => return,
        };

        let words = event.as_words();
        if let Err(e) = self.events.submit(MessageType::FaultEvent, &words) {
            ringbuf_entry!(Trace::EventDropped(e));
        }
    }
}
