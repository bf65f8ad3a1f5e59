// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Controller lifecycle: load and reset requests from the service
//! processor.
//!
//! Each request moves through Received → Acked → Dispatched → Replied. The
//! acknowledgment always goes out first and unconditionally; the requester
//! expects a fast ack regardless of what happens afterward, and a malformed
//! request carries its error code in that ack and goes no further. The
//! actual work is host-service calls; the outcome goes back as one or more
//! status replies correlated by the request's sequence id.
//!
//! Failure reporting is deliberately asymmetric: a failed load sends one
//! aggregated status naming the first in-scope chip, while a failed reset
//! sends one status per in-scope chip. Both shapes are fixed by the
//! protocol; do not unify them.

use drv_occ_api::{
    HostServiceError, LifecycleRequest, SpOccCommand, SpReply, SpSendError,
    ERR_INVALID_SCOPE, SCOPE_CHIP_GROUP, SCOPE_SYSTEM,
};
use num_traits::FromPrimitive;
use platform_api::Chip;
use ringbuf::*;

use crate::OccManager;

/// Vendor status word bases; the low byte carries the failing chip's
/// service-processor identity.
pub(crate) const STATUS_LOAD_FAILURE: u32 = 0xB500;
pub(crate) const STATUS_RESET_FAILURE: u32 = 0xFE00;
pub(crate) const STATUS_SUCCESS: u32 = 0;

#[derive(Copy, Clone, Debug, PartialEq)]
enum Trace {
    None,
    LoadRequest { scope: u8, seq_id: u32 },
    ResetRequest { scope: u8, seq_id: u32 },
    InvalidScope(u8),
    Acked(u32),
    AckSendFailed(SpSendError),
    Dispatched(u32),
    LoadFallback,
    ResetFallback,
    LoadFailed(HostServiceError),
    ResetFailed(HostServiceError),
    StatusSendFailed(SpSendError),
    Replied(u32),
}

ringbuf!(Trace, 64, Trace::None);

impl OccManager<'_> {
    /// Dispatches one inbound service-processor command. Returns whether
    /// the command word was one of ours; the transport keeps looking for
    /// another client when it wasn't.
    pub fn handle_sp_command(&self, cmd: u32, req: LifecycleRequest) -> bool {
        match SpOccCommand::from_u32(cmd) {
            Some(SpOccCommand::Load) => {
                ringbuf_entry!(Trace::LoadRequest {
                    scope: req.scope,
                    seq_id: req.seq_id,
                });
                self.do_load(req);
                true
            }
            Some(SpOccCommand::Reset) => {
                ringbuf_entry!(Trace::ResetRequest {
                    scope: req.scope,
                    seq_id: req.seq_id,
                });
                self.do_reset(req);
                true
            }
            None => false,
        }
    }

    fn do_load(&self, req: LifecycleRequest) {
        let err = scope_error(req.scope);

        if self.send_ack(SpReply::LoadAck { err }, req.seq_id).is_err() {
            return;
        }
        if err != 0 {
            return;
        }

        ringbuf_entry!(Trace::Dispatched(req.seq_id));
        let rc = match self.host.occ_load() {
            // The host has no image to offer, but one was preloaded into
            // the shared-memory window before we got here: that will do.
            Err(HostServiceError::NotFound)
                if self.preloaded_image_resident() =>
            {
                ringbuf_entry!(Trace::LoadFallback);
                Ok(())
            }
            Ok(()) => self.host.occ_start(),
            Err(e) => Err(e),
        };

        let mut status = STATUS_SUCCESS;
        if let Err(e) = rc {
            ringbuf_entry!(Trace::LoadFailed(e));
            // One chip stands in for the whole request: the first one in
            // topology order that the request's scope covers.
            if let Some(chip) = self.first_chip_in_scope(&req) {
                status = STATUS_LOAD_FAILURE | (chip.sp_id & 0xff);
            }
        }

        // A single aggregated reply covers every chip in scope.
        if let Err(e) = self.sp.send(SpReply::LoadStatus {
            status,
            seq_id: req.seq_id,
        }) {
            ringbuf_entry!(Trace::StatusSendFailed(e));
        }
        ringbuf_entry!(Trace::Replied(req.seq_id));
    }

    fn do_reset(&self, req: LifecycleRequest) {
        let err = scope_error(req.scope);

        if self.send_ack(SpReply::ResetAck { err }, req.seq_id).is_err() {
            return;
        }
        if err != 0 {
            return;
        }

        // Stop the controller and leave it stopped; the service processor
        // follows up with a fresh load when it wants it back.
        ringbuf_entry!(Trace::Dispatched(req.seq_id));
        let rc = match self.host.occ_stop() {
            Err(HostServiceError::NotFound)
                if self.preloaded_image_resident() =>
            {
                ringbuf_entry!(Trace::ResetFallback);
                Ok(())
            }
            other => other,
        };

        match rc {
            Ok(()) => {
                // One success reply covers all chips.
                if let Err(e) = self.sp.send(SpReply::ResetStatus {
                    status: STATUS_SUCCESS,
                    seq_id: req.seq_id,
                }) {
                    ringbuf_entry!(Trace::StatusSendFailed(e));
                }
            }
            Err(e) => {
                ringbuf_entry!(Trace::ResetFailed(e));
                // Unlike load, a failed reset reports every chip the
                // request's scope covers.
                for chip in self.topology.chips() {
                    if !chip_in_scope(chip, &req) {
                        continue;
                    }
                    if let Err(e) = self.sp.send(SpReply::ResetStatus {
                        status: STATUS_RESET_FAILURE | (chip.sp_id & 0xff),
                        seq_id: req.seq_id,
                    }) {
                        ringbuf_entry!(Trace::StatusSendFailed(e));
                    }
                }
            }
        }
        ringbuf_entry!(Trace::Replied(req.seq_id));
    }

    /// Sends the immediate acknowledgment. A transport that can't even
    /// queue the ack gets no further processing of the request.
    fn send_ack(&self, ack: SpReply, seq_id: u32) -> Result<(), SpSendError> {
        match self.sp.send(ack) {
            Ok(()) => {
                ringbuf_entry!(Trace::Acked(seq_id));
                Ok(())
            }
            Err(e) => {
                ringbuf_entry!(Trace::AckSendFailed(e));
                Err(e)
            }
        }
    }

    /// First chip in topology order that `req`'s scope covers.
    fn first_chip_in_scope(&self, req: &LifecycleRequest) -> Option<&Chip> {
        self.topology.chips().iter().find(|c| chip_in_scope(c, req))
    }

    /// A preloaded controller image leaves the representative chip's
    /// shared-memory window configured.
    fn preloaded_image_resident(&self) -> bool {
        self.topology
            .chips()
            .first()
            .is_some_and(|chip| self.topology.homer(chip).is_some())
    }
}

fn scope_error(scope: u8) -> u8 {
    if scope == SCOPE_CHIP_GROUP || scope == SCOPE_SYSTEM {
        0
    } else {
        ringbuf_entry!(Trace::InvalidScope(scope));
        ERR_INVALID_SCOPE
    }
}

fn chip_in_scope(chip: &Chip, req: &LifecycleRequest) -> bool {
    req.scope != SCOPE_CHIP_GROUP || chip.group_id == req.group_id
}
