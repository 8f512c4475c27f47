//! Node service-cycle tests: sleep planning, clock repair, hooks and
//! inbound dispatch, driven through `Node::update` with sim adapters.

use std::sync::atomic::{AtomicU8, Ordering};

use sensornode::adapters::sim::{MemoryStorage, RecordingNetwork, SimClock};
use sensornode::config::NodeConfig;
use sensornode::message::{DataType, Message};
use sensornode::ports::{ClockPort, Edge, NodeIo, SleepRequest, WakeLine, WakeSource};
use sensornode::scheduler::{CycleReport, Node};
use sensornode::sensors::presentation::PresentationMetaSensor;
use sensornode::sensors::{Deadline, Readiness};

use crate::mock_hw::{ScriptedSensor, SensorCall, call_log};

struct Rig {
    net: RecordingNetwork,
    clock: SimClock,
    storage: MemoryStorage,
}

impl Rig {
    fn at(now: u32) -> Self {
        Self {
            net: RecordingNetwork::new(),
            clock: SimClock::at(now),
            storage: MemoryStorage::new(),
        }
    }

    fn cycle(&mut self, node: &mut Node<'_>) -> CycleReport {
        let mut io = NodeIo::new(&mut self.net, &mut self.clock, &mut self.storage);
        node.update(&mut io)
    }

    fn present_all(&mut self, node: &mut Node<'_>) {
        let mut io = NodeIo::new(&mut self.net, &mut self.clock, &mut self.storage);
        node.present_all(&mut io, false);
    }
}

fn line(n: u8) -> WakeLine {
    WakeLine::new(n).unwrap()
}

// ── Sleep planning ────────────────────────────────────────────

#[test]
fn sleep_target_is_earliest_deadline() {
    let log = call_log();
    let mut a = ScriptedSensor::waiting_until("a", &log, 1000);
    let mut b = ScriptedSensor::waiting_until("b", &log, 500);
    let mut c = ScriptedSensor::waiting_until("c", &log, 2000);
    let mut node = Node::new();
    node.add_sensor(&mut a).unwrap();
    node.add_sensor(&mut b).unwrap();
    node.add_sensor(&mut c).unwrap();

    let mut rig = Rig::at(100);
    let report = rig.cycle(&mut node);

    let plan = report.plan.unwrap();
    assert_eq!(plan.until, 500);
    assert_eq!(plan.length(), Some(400));
    assert_eq!(report.wake, Some(WakeSource::Timer));
    assert_eq!(rig.clock.sleeps[0].request, SleepRequest::For(400));
    assert!(rig.clock.sleeps[0].arms.is_empty());
    // Timer wake restores exactly the target.
    assert_eq!(rig.clock.millis(), 500);
}

#[test]
fn ready_sensor_suppresses_sleep() {
    let log = call_log();
    let mut busy = ScriptedSensor::new("busy", &log).then(Readiness::Ready);
    let mut idle = ScriptedSensor::waiting_until("idle", &log, 1000);
    let mut node = Node::new();
    node.add_sensor(&mut busy).unwrap();
    node.add_sensor(&mut idle).unwrap();

    let mut rig = Rig::at(0);
    let report = rig.cycle(&mut node);

    assert_eq!(report.sensors_ready, 1);
    assert_eq!(report.reports_sent, 1);
    assert!(report.plan.is_none());
    assert!(!report.slept());
    assert!(rig.clock.sleeps.is_empty());
    assert_eq!(
        log.borrow()
            .iter()
            .filter(|(name, _)| *name == "busy")
            .map(|(_, c)| *c)
            .collect::<Vec<_>>(),
        [SensorCall::Ready, SensorCall::Sense, SensorCall::Report]
    );
}

#[test]
fn nothing_new_means_no_report() {
    let log = call_log();
    let mut quiet = ScriptedSensor::new("quiet", &log).then(Readiness::Ready).without_data();
    let mut node = Node::new();
    node.add_sensor(&mut quiet).unwrap();

    let mut rig = Rig::at(0);
    let report = rig.cycle(&mut node);

    assert_eq!(report.sensors_ready, 1);
    assert_eq!(report.reports_sent + report.reports_failed, 0);
    assert!(rig.net.sent.is_empty());
}

#[test]
fn interrupt_lines_aggregate_into_indefinite_sleep() {
    let log = call_log();
    let mut door = ScriptedSensor::new("door", &log).with_line(0);
    let mut window = ScriptedSensor::new("window", &log).with_line(1);
    let mut node = Node::new();
    node.add_sensor(&mut door).unwrap();
    node.add_sensor(&mut window).unwrap();

    let mut rig = Rig::at(7000);
    let report = rig.cycle(&mut node);

    let sleep = &rig.clock.sleeps[0];
    assert_eq!(sleep.request, SleepRequest::Indefinite);
    let lines: Vec<_> = sleep.arms.iter().map(|a| a.line).collect();
    assert_eq!(lines, [line(0), line(1)]);
    assert!(sleep.arms.iter().all(|a| a.edge == Edge::Change));
    assert!(report.wake.is_some_and(WakeSource::is_interrupt));
    // Interrupt wake moves the clock minimally forward.
    assert_eq!(rig.clock.millis(), 7001);
}

#[test]
fn interrupt_during_timed_sleep_advances_clock_minimally() {
    let log = call_log();
    let mut pir = ScriptedSensor::waiting_until("pir", &log, 5000).with_line(1);
    let mut node = Node::new();
    node.add_sensor(&mut pir).unwrap();

    let mut rig = Rig::at(100);
    rig.clock.script_wake(WakeSource::Interrupt(line(1)));
    let report = rig.cycle(&mut node);

    assert_eq!(rig.clock.sleeps[0].request, SleepRequest::For(4900));
    assert_eq!(rig.clock.sleeps[0].arms.len(), 1);
    assert_eq!(report.wake, Some(WakeSource::Interrupt(line(1))));
    let now = rig.clock.millis();
    assert!(now > 100 && now <= 101);
}

#[test]
fn clock_stays_monotonic_across_cycles() {
    let log = call_log();
    let mut s = ScriptedSensor::new("s", &log)
        .then(Readiness::Wait(Deadline::At(300)))
        .then(Readiness::Wait(Deadline::At(900)))
        .then(Readiness::Wait(Deadline::At(950)))
        .with_line(0);
    let mut node = Node::new();
    node.add_sensor(&mut s).unwrap();

    let mut rig = Rig::at(0);
    rig.clock.script_wake(WakeSource::Timer);
    rig.clock.script_wake(WakeSource::Interrupt(line(0)));
    rig.clock.script_wake(WakeSource::Timer);

    let mut seen = Vec::new();
    for _ in 0..3 {
        rig.cycle(&mut node);
        seen.push(rig.clock.millis());
    }
    assert_eq!(seen, [300, 301, 950]);
}

#[test]
fn early_wake_advances_clock_minimally() {
    let log = call_log();
    let mut s = ScriptedSensor::waiting_until("s", &log, 90_000);
    let mut node = Node::new();
    node.add_sensor(&mut s).unwrap();

    let mut rig = Rig::at(200);
    rig.clock.script_wake(WakeSource::Early);
    let report = rig.cycle(&mut node);

    assert_eq!(report.wake, Some(WakeSource::Early));
    assert_eq!(rig.clock.millis(), 201);
}

#[test]
fn no_deadline_and_no_line_sleeps_longest() {
    let log = call_log();
    let mut orphan = ScriptedSensor::new("orphan", &log);
    let mut node = Node::new();
    node.add_sensor(&mut orphan).unwrap();

    let mut rig = Rig::at(10);
    let report = rig.cycle(&mut node);

    assert_eq!(report.plan.map(|p| p.until), Some(u32::MAX));
    assert_eq!(rig.clock.sleeps[0].request, SleepRequest::For(u32::MAX - 10));
}

// ── Hooks and repeater mode ───────────────────────────────────

fn stay_awake() -> bool {
    false
}

static WAKES: AtomicU8 = AtomicU8::new(0);

fn count_wake(source: WakeSource) {
    if source == WakeSource::Timer {
        WAKES.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn veto_cancels_sleep() {
    let log = call_log();
    let mut s = ScriptedSensor::waiting_until("s", &log, 1000);
    let mut node = Node::new();
    node.add_sensor(&mut s).unwrap();
    node.set_sleep_veto(Some(stay_awake));

    let mut rig = Rig::at(0);
    let report = rig.cycle(&mut node);

    assert!(report.vetoed);
    assert!(report.plan.is_some());
    assert!(!report.slept());
    assert!(rig.clock.sleeps.is_empty());
    assert_eq!(rig.clock.millis(), 0);
}

#[test]
fn wake_hook_runs_after_sleep() {
    let log = call_log();
    let mut s = ScriptedSensor::waiting_until("s", &log, 1000);
    let mut node = Node::new();
    node.add_sensor(&mut s).unwrap();
    node.set_wake_hook(Some(count_wake));

    let mut rig = Rig::at(0);
    let before = WAKES.load(Ordering::SeqCst);
    rig.cycle(&mut node);
    assert_eq!(WAKES.load(Ordering::SeqCst), before + 1);
}

#[test]
fn repeater_never_sleeps() {
    let log = call_log();
    let mut s = ScriptedSensor::waiting_until("s", &log, 1000);
    let mut node = Node::new();
    node.set_repeater(true);
    node.add_sensor(&mut s).unwrap();

    let mut rig = Rig::at(0);
    let report = rig.cycle(&mut node);

    assert!(node.is_repeater());
    assert!(report.plan.is_none());
    assert!(rig.clock.sleeps.is_empty());
}

// ── Inbound dispatch ──────────────────────────────────────────

#[test]
fn first_claiming_sensor_stops_dispatch() {
    let log = call_log();
    let mut a = ScriptedSensor::new("a", &log).claiming();
    let mut b = ScriptedSensor::new("b", &log).claiming();
    let mut c = ScriptedSensor::new("c", &log);
    let mut node = Node::new();
    node.add_sensor(&mut a).unwrap();
    node.add_sensor(&mut b).unwrap();
    node.add_sensor(&mut c).unwrap();
    node.set_sleep_veto(Some(stay_awake));

    let mut rig = Rig::at(0);
    rig.net.queue_inbound(Message::new(1, DataType::STATUS).with_bool(true));
    rig.net.queue_inbound(Message::new(9, DataType::STATUS).with_bool(true));
    let report = rig.cycle(&mut node);

    assert_eq!(report.messages_handled, 1);
    assert_eq!(report.messages_unhandled, 1);
    assert_eq!(rig.net.pending_inbound(), 0);

    let reacts: Vec<_> = log
        .borrow()
        .iter()
        .filter_map(|(name, call)| match call {
            SensorCall::React(id) => Some((*name, *id)),
            _ => None,
        })
        .collect();
    assert_eq!(reacts, [("a", 1), ("b", 1), ("a", 9), ("b", 9), ("c", 9)]);
}

// ── Presentation ──────────────────────────────────────────────

#[test]
fn present_all_announces_every_sub_device() {
    let log = call_log();
    let mut a = ScriptedSensor::new("a", &log);
    let mut b = ScriptedSensor::new("b", &log);
    let mut node = Node::new();
    node.add_sensor(&mut a).unwrap();
    node.add_sensor(&mut b).unwrap();

    let mut rig = Rig::at(0);
    rig.present_all(&mut node);

    let ids: Vec<_> = rig.net.presented.iter().map(|p| p.id).collect();
    assert_eq!(ids, [0, 1]);
    assert_eq!(rig.net.presented[1].description.as_deref(), Some("b"));
}

#[test]
fn meta_sensor_triggers_periodic_presentation() {
    let log = call_log();
    let mut meta = PresentationMetaSensor::new(1000, 0);
    let mut door = ScriptedSensor::new("door", &log).with_line(0);
    let mut node = Node::new();
    node.add_sensor(&mut meta).unwrap();
    node.add_sensor(&mut door).unwrap();

    let mut rig = Rig::at(0);
    // First expiry is skipped: boot already presented.
    rig.cycle(&mut node);
    assert!(rig.net.presented.is_empty());

    rig.clock.set_millis(1000);
    let report = rig.cycle(&mut node);
    assert_eq!(report.reports_sent, 1);
    let ids: Vec<_> = rig.net.presented.iter().map(|p| p.id).collect();
    assert_eq!(ids, [1]);
}

#[test]
fn disabled_meta_sensor_leaves_node_asleep() {
    let log = call_log();
    let cfg = NodeConfig {
        presentation_period_ms: 0,
        ..NodeConfig::default()
    };
    let mut meta = PresentationMetaSensor::from_config(&cfg, 0);
    let mut door = ScriptedSensor::new("door", &log).with_line(0);
    let mut node = Node::new();
    node.add_sensor(&mut meta).unwrap();
    node.add_sensor(&mut door).unwrap();

    let mut rig = Rig::at(0);
    let report = rig.cycle(&mut node);

    assert_eq!(report.sensors_ready, 0);
    assert_eq!(rig.clock.sleeps[0].request, SleepRequest::Indefinite);
    assert!(rig.net.presented.is_empty());
}
