// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};

use drv_occ_api::{
    HostServiceError, HostServices, LifecycleRequest, OccError, PstateEntry,
    PstateTable, SpReply, SpSendError, SpTransport, ERR_INVALID_SCOPE,
    OCC_DATA_OFFSET, SCOPE_CHIP_GROUP, SCOPE_SYSTEM,
};
use drv_xbus_api::{ppc_bit, Xbus, XbusError};
use platform_api::{
    Chip, Delay, HomerWindow, HostBridge, PlatformPolicy, PowerConfig,
    Topology,
};
use zerocopy::{FromZeros, IntoBytes};

use crate::lifecycle::{
    STATUS_LOAD_FAILURE, STATUS_RESET_FAILURE, STATUS_SUCCESS,
};
use crate::pstates::{
    ex_slave_addr, EX_PM_CLEAR_GP1, EX_PM_PPMCR, EX_PM_PPMSR, EX_PM_SET_GP1,
    PM_GP1_SPR_OVERRIDE_EN,
};
use crate::{
    OccManager, OCB_OCI_OCCMISC, OCB_OCI_OCCMISC_AND, OCB_OCI_OCCMISC_OR,
    OCCMISC_IRQ, OCCMISC_IRQ_HOST_DUMMY, OCCMISC_IRQ_TMGT,
};

#[derive(Default)]
struct FakeBus {
    regs: RefCell<HashMap<(u32, u64), u64>>,
    writes: RefCell<Vec<(u32, u64, u64)>>,
    fail_reads: Cell<bool>,
    /// Addresses whose writes fail, for fault-injection.
    fail_writes: RefCell<HashSet<u64>>,
}

impl FakeBus {
    fn set(&self, chip: u32, addr: u64, value: u64) {
        self.regs.borrow_mut().insert((chip, addr), value);
    }

    fn writes_to(&self, addr: u64) -> Vec<(u32, u64)> {
        self.writes
            .borrow()
            .iter()
            .filter(|(_, a, _)| *a == addr)
            .map(|(c, _, v)| (*c, *v))
            .collect()
    }
}

impl Xbus for FakeBus {
    fn read(&self, chip: u32, addr: u64) -> Result<u64, XbusError> {
        if self.fail_reads.get() {
            return Err(XbusError::BusFault);
        }
        Ok(*self.regs.borrow().get(&(chip, addr)).unwrap_or(&0))
    }

    fn write(&self, chip: u32, addr: u64, value: u64) -> Result<(), XbusError> {
        if self.fail_writes.borrow().contains(&addr) {
            return Err(XbusError::BusFault);
        }
        self.writes.borrow_mut().push((chip, addr, value));
        self.regs.borrow_mut().insert((chip, addr), value);
        Ok(())
    }
}

/// A fake HOMER window whose table can flip to valid after a configurable
/// number of validity probes, emulating a controller that is still booting.
struct FakeWindow {
    table: RefCell<PstateTable>,
    becomes_valid: Cell<Option<u32>>,
    probes: Cell<u32>,
}

impl FakeWindow {
    fn new(table: PstateTable) -> Self {
        Self {
            table: RefCell::new(table),
            becomes_valid: Cell::new(None),
            probes: Cell::new(0),
        }
    }
}

impl HomerWindow for FakeWindow {
    fn read(&self, offset: usize, out: &mut [u8]) {
        assert!(offset >= OCC_DATA_OFFSET, "read outside the data area");
        if out.len() == 1 && offset == OCC_DATA_OFFSET {
            // Validity probe.
            let n = self.probes.get() + 1;
            self.probes.set(n);
            if let Some(k) = self.becomes_valid.get() {
                if n > k {
                    self.table.borrow_mut().valid = 1;
                }
            }
            out[0] = self.table.borrow().valid;
            return;
        }
        let table = self.table.borrow();
        let base = offset - OCC_DATA_OFFSET;
        out.copy_from_slice(&table.as_bytes()[base..base + out.len()]);
    }
}

#[derive(Default)]
struct FakeTopology {
    chips: Vec<Chip>,
    cores: Vec<u32>,
    windows: HashMap<u32, FakeWindow>,
}

impl Topology for FakeTopology {
    fn chips(&self) -> &[Chip] {
        &self.chips
    }

    fn cores(&self, _chip: &Chip) -> &[u32] {
        &self.cores
    }

    fn homer(&self, chip: &Chip) -> Option<&dyn HomerWindow> {
        self.windows.get(&chip.id).map(|w| w as &dyn HomerWindow)
    }

    fn host_bridge(
        &self,
        _chip_id: u32,
        _index: u32,
    ) -> Option<&dyn HostBridge> {
        None
    }
}

struct FakePolicy {
    timeout: u32,
}

impl PlatformPolicy for FakePolicy {
    fn occ_timeout(&self) -> u32 {
        self.timeout
    }
}

#[derive(Default)]
struct FakeConfig {
    ready: bool,
    bytes_props: Vec<(String, Vec<u8>)>,
    cells: Vec<(String, u32)>,
}

impl PowerConfig for FakeConfig {
    fn ready(&self) -> bool {
        self.ready
    }

    fn add_bytes(&mut self, name: &str, value: &[u8]) {
        self.bytes_props.push((name.to_string(), value.to_vec()));
    }

    fn add_cell(&mut self, name: &str, value: u32) {
        self.cells.push((name.to_string(), value));
    }
}

#[derive(Default)]
struct FakeSp {
    replies: RefCell<Vec<SpReply>>,
    fail: Cell<bool>,
}

impl SpTransport for FakeSp {
    fn send(&self, reply: SpReply) -> Result<(), SpSendError> {
        if self.fail.get() {
            return Err(SpSendError::NoBuffers);
        }
        self.replies.borrow_mut().push(reply);
        Ok(())
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
enum HostCall {
    Load,
    Start,
    Stop,
}

struct FakeHost {
    load: Cell<Result<(), HostServiceError>>,
    start: Cell<Result<(), HostServiceError>>,
    stop: Cell<Result<(), HostServiceError>>,
    calls: RefCell<Vec<HostCall>>,
}

impl Default for FakeHost {
    fn default() -> Self {
        Self {
            load: Cell::new(Ok(())),
            start: Cell::new(Ok(())),
            stop: Cell::new(Ok(())),
            calls: RefCell::new(Vec::new()),
        }
    }
}

impl HostServices for FakeHost {
    fn occ_load(&self) -> Result<(), HostServiceError> {
        self.calls.borrow_mut().push(HostCall::Load);
        self.load.get()
    }

    fn occ_start(&self) -> Result<(), HostServiceError> {
        self.calls.borrow_mut().push(HostCall::Start);
        self.start.get()
    }

    fn occ_stop(&self) -> Result<(), HostServiceError> {
        self.calls.borrow_mut().push(HostCall::Stop);
        self.stop.get()
    }
}

#[derive(Default)]
struct FakeDelay {
    sleeps: RefCell<Vec<u64>>,
}

impl Delay for FakeDelay {
    fn sleep_for(&self, ms: u64) {
        self.sleeps.borrow_mut().push(ms);
    }
}

struct Rig {
    bus: FakeBus,
    topology: FakeTopology,
    policy: FakePolicy,
    config: FakeConfig,
    sp: FakeSp,
    host: FakeHost,
    delay: FakeDelay,
}

impl Rig {
    fn new() -> Self {
        Self {
            bus: FakeBus::default(),
            topology: FakeTopology::default(),
            policy: FakePolicy { timeout: 0 },
            config: FakeConfig {
                ready: true,
                ..FakeConfig::default()
            },
            sp: FakeSp::default(),
            host: FakeHost::default(),
            delay: FakeDelay::default(),
        }
    }

    fn manager(&mut self) -> OccManager<'_> {
        OccManager::new(
            &self.bus,
            &self.topology,
            &self.policy,
            &mut self.config,
            &self.sp,
            &self.host,
            &self.delay,
        )
    }

    fn add_chip(&mut self, id: u32, group_id: u32, sp_id: u32) {
        self.topology.chips.push(Chip {
            id,
            group_id,
            sp_id,
        });
    }

    fn add_window(&mut self, chip_id: u32, table: PstateTable) {
        self.topology.windows.insert(chip_id, FakeWindow::new(table));
    }
}

/// A valid table whose entries run `min..=max` with plausible frequencies.
fn valid_table(min: i8, nom: i8, max: i8) -> PstateTable {
    let mut table = PstateTable::new_zeroed();
    table.valid = 1;
    table.version = 1;
    table.pstate_min = min;
    table.pstate_nom = nom;
    table.pstate_max = max;
    let count = (max as i16 - min as i16 + 1).clamp(0, 256) as usize;
    for i in 0..count {
        table.pstates[i] = PstateEntry {
            id: (min as i16 + i as i16) as i8,
            flags: 0,
            vdd: 0x40u8.wrapping_add(i as u8),
            vcs: 0x50u8.wrapping_add(i as u8),
            freq_khz: 2_000_000 + i as u32 * 125_500,
        };
    }
    table
}

fn request(scope: u8, group_id: u32, seq_id: u32) -> LifecycleRequest {
    LifecycleRequest {
        scope,
        group_id,
        seq_id,
    }
}

// ---- readiness poller ----

#[test]
fn poller_fails_immediately_without_a_window() {
    let mut rig = Rig::new();
    rig.add_chip(0, 7, 0x11);

    let result = { rig.manager().wait_all_ready() };

    assert_eq!(result, Err(OccError::MissingHomer { chip: 0 }));
    // A missing window is a configuration error; no point sleeping on it.
    assert!(rig.delay.sleeps.borrow().is_empty());
}

#[test]
fn poller_succeeds_with_zero_sleeps_when_all_tables_valid() {
    let mut rig = Rig::new();
    rig.add_chip(0, 7, 0x11);
    rig.add_chip(2, 7, 0x12);
    rig.add_window(0, valid_table(9, 9, 10));
    rig.add_window(2, valid_table(9, 9, 10));

    let result = { rig.manager().wait_all_ready() };

    assert_eq!(result, Ok(()));
    assert!(rig.delay.sleeps.borrow().is_empty());
}

#[test]
fn poller_times_out_after_ten_attempts_per_timeout_unit() {
    let mut rig = Rig::new();
    rig.policy.timeout = 1;
    rig.add_chip(0, 7, 0x11);
    rig.add_window(0, PstateTable::new_zeroed());

    let result = { rig.manager().wait_all_ready() };

    assert_eq!(result, Err(OccError::TableTimeout { chip: 0 }));
    assert_eq!(rig.delay.sleeps.borrow().as_slice(), &[100; 10]);
}

#[test]
fn poller_aborts_the_whole_wait_on_first_unready_chip() {
    let mut rig = Rig::new();
    rig.add_chip(0, 7, 0x11);
    rig.add_chip(1, 7, 0x12);
    rig.add_chip(2, 7, 0x13);
    rig.add_window(0, valid_table(9, 9, 10));
    rig.add_window(1, PstateTable::new_zeroed());
    rig.add_window(2, valid_table(9, 9, 10));

    let result = { rig.manager().wait_all_ready() };

    assert_eq!(result, Err(OccError::TableTimeout { chip: 1 }));
    // No partial success: the chip after the failure is never probed.
    assert_eq!(rig.topology.windows[&2].probes.get(), 0);
}

#[test]
fn poller_waits_out_a_slow_controller() {
    let mut rig = Rig::new();
    rig.policy.timeout = 1;
    rig.add_chip(0, 7, 0x11);
    rig.add_window(0, PstateTable::new_zeroed());
    rig.topology.windows[&0].becomes_valid.set(Some(3));

    let result = { rig.manager().wait_all_ready() };

    assert_eq!(result, Ok(()));
    assert_eq!(rig.delay.sleeps.borrow().as_slice(), &[100; 3]);
}

// ---- pstate table exporter ----

#[test]
fn export_publishes_table_and_returns_nominal() {
    let mut rig = Rig::new();
    rig.add_chip(0, 7, 0x11);
    rig.add_window(0, valid_table(9, 9, 10));

    let nominal = { rig.manager().export_pstates() };

    assert_eq!(nominal, Ok(9));

    let expected_ids: [u32; 2] = [9, 10];
    let expected_mhz: [u32; 2] = [2000, 2125];
    assert_eq!(
        rig.config.bytes_props,
        vec![
            ("pstate-ids".to_string(), expected_ids.as_bytes().to_vec()),
            (
                "pstate-frequencies-mhz".to_string(),
                expected_mhz.as_bytes().to_vec()
            ),
            ("pstate-vdds".to_string(), vec![0x40, 0x41]),
            ("pstate-vcss".to_string(), vec![0x50, 0x51]),
        ]
    );
    assert_eq!(
        rig.config.cells,
        vec![
            ("pstate-min".to_string(), 9),
            ("pstate-nominal".to_string(), 9),
            ("pstate-max".to_string(), 10),
        ]
    );
}

#[test]
fn export_rejects_an_inverted_range() {
    let mut rig = Rig::new();
    rig.add_chip(0, 7, 0x11);
    rig.add_window(0, valid_table(10, 10, 9));

    let result = { rig.manager().export_pstates() };

    assert_eq!(result, Err(OccError::BadPstateRange { count: 0 }));
    assert!(rig.config.bytes_props.is_empty());
}

#[test]
fn export_rejects_an_oversized_range() {
    let mut rig = Rig::new();
    rig.add_chip(0, 7, 0x11);
    rig.add_window(0, valid_table(-100, 0, 99));

    let result = { rig.manager().export_pstates() };

    assert_eq!(result, Err(OccError::BadPstateRange { count: 200 }));
}

#[test]
fn export_accepts_the_minimum_usable_range() {
    let mut rig = Rig::new();
    rig.add_chip(0, 7, 0x11);
    rig.add_window(0, valid_table(9, 10, 10));

    assert_eq!({ rig.manager().export_pstates() }, Ok(10));
}

#[test]
fn export_rejects_an_invalid_table() {
    let mut rig = Rig::new();
    rig.add_chip(0, 7, 0x11);
    let mut table = valid_table(9, 9, 10);
    table.valid = 0;
    rig.add_window(0, table);

    assert_eq!(
        { rig.manager().export_pstates() },
        Err(OccError::TableInvalid)
    );
}

#[test]
fn export_requires_the_config_anchor() {
    let mut rig = Rig::new();
    rig.config.ready = false;
    rig.add_chip(0, 7, 0x11);
    rig.add_window(0, valid_table(9, 9, 10));

    assert_eq!(
        { rig.manager().export_pstates() },
        Err(OccError::MissingConfigAnchor)
    );
    assert!(rig.config.bytes_props.is_empty());
}

// ---- core pstate activator ----

#[test]
fn core_handoff_runs_the_register_sequence() {
    let mut rig = Rig::new();
    rig.add_chip(0, 7, 0x11);
    rig.topology.cores = vec![3];
    rig.bus
        .set(0, ex_slave_addr(3, EX_PM_PPMCR), 0xAAAA_BBBB_CCCC_DDDD);
    rig.bus.set(0, ex_slave_addr(3, EX_PM_PPMSR), 0x55);

    { rig.manager().activate_cores(-1) };

    // OR-set the override, encode the pstate into PPMCR's top sixteen
    // bits, then AND-clear the override.
    assert_eq!(
        rig.bus.writes.borrow().as_slice(),
        &[
            (0, ex_slave_addr(3, EX_PM_SET_GP1), PM_GP1_SPR_OVERRIDE_EN),
            (0, ex_slave_addr(3, EX_PM_PPMCR), 0xFFFF_BBBB_CCCC_DDDD),
            (0, ex_slave_addr(3, EX_PM_CLEAR_GP1), !PM_GP1_SPR_OVERRIDE_EN),
        ]
    );
    // The settle delay sits between the encode and the clear.
    assert_eq!(rig.delay.sleeps.borrow().as_slice(), &[1]);
}

#[test]
fn core_handoff_continues_past_a_failing_core() {
    let mut rig = Rig::new();
    rig.add_chip(0, 7, 0x11);
    rig.topology.cores = vec![0, 1, 2];
    rig.bus
        .fail_writes
        .borrow_mut()
        .insert(ex_slave_addr(1, EX_PM_SET_GP1));

    { rig.manager().activate_cores(5) };

    // Core 1 aborts at its first register write; cores 0 and 2 complete.
    let set_writes: Vec<u64> = rig
        .bus
        .writes
        .borrow()
        .iter()
        .filter(|(_, a, _)| *a & 0xffff == EX_PM_SET_GP1)
        .map(|(_, a, _)| *a)
        .collect();
    assert_eq!(
        set_writes,
        vec![ex_slave_addr(0, EX_PM_SET_GP1), ex_slave_addr(2, EX_PM_SET_GP1)]
    );
    assert_eq!(rig.delay.sleeps.borrow().as_slice(), &[1, 1]);
}

#[test]
fn pstates_init_brings_up_every_core() {
    let mut rig = Rig::new();
    rig.add_chip(0, 7, 0x11);
    rig.add_chip(4, 7, 0x12);
    rig.add_window(0, valid_table(9, 10, 10));
    rig.add_window(4, valid_table(9, 10, 10));
    rig.topology.cores = vec![0, 1];

    { rig.manager().pstates_init() };

    assert_eq!(rig.config.cells.last(), Some(&("pstate-max".to_string(), 10)));
    // Two chips times two cores, one GP1 set each.
    let set_writes = rig
        .bus
        .writes
        .borrow()
        .iter()
        .filter(|(_, a, _)| *a & 0xffff == EX_PM_SET_GP1)
        .count();
    assert_eq!(set_writes, 4);
}

#[test]
fn pstates_init_without_a_window_does_nothing() {
    let mut rig = Rig::new();
    rig.add_chip(0, 7, 0x11);

    { rig.manager().pstates_init() };

    assert!(rig.config.bytes_props.is_empty());
    assert!(rig.bus.writes.borrow().is_empty());
}

// ---- lifecycle: load ----

#[test]
fn load_with_invalid_scope_acks_the_error_and_stops() {
    let mut rig = Rig::new();
    rig.add_chip(0, 7, 0x11);

    let handled = {
        rig.manager()
            .handle_sp_command(0x00cd, request(0x05, 0, 0x1234))
    };

    assert!(handled);
    assert_eq!(
        rig.sp.replies.borrow().as_slice(),
        &[SpReply::LoadAck {
            err: ERR_INVALID_SCOPE
        }]
    );
    // No host-service call, no status reply.
    assert!(rig.host.calls.borrow().is_empty());
}

#[test]
fn load_success_acks_then_reports_aggregate_success() {
    let mut rig = Rig::new();
    rig.add_chip(0, 7, 0x11);

    let handled = {
        rig.manager()
            .handle_sp_command(0x00cd, request(SCOPE_SYSTEM, 0, 7))
    };

    assert!(handled);
    assert_eq!(
        rig.host.calls.borrow().as_slice(),
        &[HostCall::Load, HostCall::Start]
    );
    assert_eq!(
        rig.sp.replies.borrow().as_slice(),
        &[
            SpReply::LoadAck { err: 0 },
            SpReply::LoadStatus {
                status: STATUS_SUCCESS,
                seq_id: 7
            },
        ]
    );
}

#[test]
fn load_falls_back_to_a_preloaded_image() {
    let mut rig = Rig::new();
    rig.add_chip(0, 7, 0x11);
    rig.add_window(0, valid_table(9, 9, 10));
    rig.host.load.set(Err(HostServiceError::NotFound));

    {
        rig.manager()
            .handle_sp_command(0x00cd, request(SCOPE_SYSTEM, 0, 8))
    };

    // The preloaded image is already running; start is not attempted.
    assert_eq!(rig.host.calls.borrow().as_slice(), &[HostCall::Load]);
    assert_eq!(
        rig.sp.replies.borrow().last(),
        Some(&SpReply::LoadStatus {
            status: STATUS_SUCCESS,
            seq_id: 8
        })
    );
}

#[test]
fn load_not_found_without_preload_is_a_failure() {
    let mut rig = Rig::new();
    rig.add_chip(0, 7, 0x11);
    rig.host.load.set(Err(HostServiceError::NotFound));

    {
        rig.manager()
            .handle_sp_command(0x00cd, request(SCOPE_SYSTEM, 0, 9))
    };

    assert_eq!(
        rig.sp.replies.borrow().last(),
        Some(&SpReply::LoadStatus {
            status: STATUS_LOAD_FAILURE | 0x11,
            seq_id: 9
        })
    );
}

#[test]
fn load_failure_names_the_first_chip_in_scope() {
    let mut rig = Rig::new();
    rig.add_chip(0, 7, 0x11);
    rig.add_chip(1, 9, 0x22);
    rig.add_chip(2, 9, 0x33);
    rig.host.start.set(Err(HostServiceError::Failed(-5)));

    {
        rig.manager()
            .handle_sp_command(0x00cd, request(SCOPE_CHIP_GROUP, 9, 10))
    };

    // One aggregated reply; the first group-9 chip stands in for all.
    assert_eq!(
        rig.sp.replies.borrow().as_slice(),
        &[
            SpReply::LoadAck { err: 0 },
            SpReply::LoadStatus {
                status: STATUS_LOAD_FAILURE | 0x22,
                seq_id: 10
            },
        ]
    );
}

#[test]
fn ack_send_failure_aborts_the_request() {
    let mut rig = Rig::new();
    rig.add_chip(0, 7, 0x11);
    rig.sp.fail.set(true);

    let handled = {
        rig.manager()
            .handle_sp_command(0x00cd, request(SCOPE_SYSTEM, 0, 11))
    };

    assert!(handled);
    assert!(rig.host.calls.borrow().is_empty());
}

// ---- lifecycle: reset ----

#[test]
fn reset_success_sends_one_reply_for_all_chips() {
    let mut rig = Rig::new();
    rig.add_chip(0, 7, 0x11);
    rig.add_chip(1, 7, 0x22);

    let handled = {
        rig.manager()
            .handle_sp_command(0x00ce, request(SCOPE_SYSTEM, 0, 12))
    };

    assert!(handled);
    assert_eq!(rig.host.calls.borrow().as_slice(), &[HostCall::Stop]);
    assert_eq!(
        rig.sp.replies.borrow().as_slice(),
        &[
            SpReply::ResetAck { err: 0 },
            SpReply::ResetStatus {
                status: STATUS_SUCCESS,
                seq_id: 12
            },
        ]
    );
}

#[test]
fn reset_failure_reports_every_chip_in_scope() {
    let mut rig = Rig::new();
    rig.add_chip(0, 9, 0x11);
    rig.add_chip(1, 7, 0x22);
    rig.add_chip(2, 9, 0x33);
    rig.host.stop.set(Err(HostServiceError::Failed(-6)));

    {
        rig.manager()
            .handle_sp_command(0x00ce, request(SCOPE_CHIP_GROUP, 9, 13))
    };

    // Unlike load, every matching chip gets its own failure status.
    assert_eq!(
        rig.sp.replies.borrow().as_slice(),
        &[
            SpReply::ResetAck { err: 0 },
            SpReply::ResetStatus {
                status: STATUS_RESET_FAILURE | 0x11,
                seq_id: 13
            },
            SpReply::ResetStatus {
                status: STATUS_RESET_FAILURE | 0x33,
                seq_id: 13
            },
        ]
    );
}

#[test]
fn reset_with_invalid_scope_acks_the_error_and_stops() {
    let mut rig = Rig::new();
    rig.add_chip(0, 7, 0x11);

    {
        rig.manager()
            .handle_sp_command(0x00ce, request(0xff, 0, 14))
    };

    assert_eq!(
        rig.sp.replies.borrow().as_slice(),
        &[SpReply::ResetAck {
            err: ERR_INVALID_SCOPE
        }]
    );
    assert!(rig.host.calls.borrow().is_empty());
}

#[test]
fn unrecognized_commands_are_not_ours() {
    let mut rig = Rig::new();
    rig.add_chip(0, 7, 0x11);

    let handled = {
        rig.manager()
            .handle_sp_command(0x9999, request(SCOPE_SYSTEM, 0, 15))
    };

    assert!(!handled);
    assert!(rig.sp.replies.borrow().is_empty());
}

// ---- interrupt multiplexer ----

#[test]
fn interrupt_acknowledges_every_indicated_bit() {
    let mut rig = Rig::new();
    let cause = OCCMISC_IRQ | OCCMISC_IRQ_TMGT | ppc_bit(7);
    rig.bus.set(0, OCB_OCI_OCCMISC, cause);

    { rig.manager().handle_interrupt(0) };

    // One write-AND of the complement clears everything indicated,
    // including sources we don't recognize.
    assert_eq!(rig.bus.writes_to(OCB_OCI_OCCMISC_AND), vec![(0, !cause)]);
}

#[test]
fn interrupt_read_failure_leaves_the_cause_register_alone() {
    let mut rig = Rig::new();
    rig.bus.fail_reads.set(true);

    { rig.manager().handle_interrupt(0) };

    assert!(rig.bus.writes.borrow().is_empty());
}

#[test]
fn dummy_interrupt_sets_the_host_source_bits() {
    let mut rig = Rig::new();

    { rig.manager().send_dummy_interrupt(3) };

    assert_eq!(
        rig.bus.writes_to(OCB_OCI_OCCMISC_OR),
        vec![(3, OCCMISC_IRQ | OCCMISC_IRQ_HOST_DUMMY)]
    );
}
