//! Reference sensors driven through a `Node` with mock hardware.

use sensornode::adapters::sim::{MemoryStorage, RecordingNetwork, SimClock};
use sensornode::config::{NodeConfig, TemperatureUnit};
use sensornode::device::DeviceId;
use sensornode::drivers::icons;
use sensornode::error::ProbeError;
use sensornode::message::{DataType, Message, Payload, SensorType};
use sensornode::persistence::{aux_slot, slot};
use sensornode::ports::{ClockPort, NodeIo, SleepRequest, StoragePort, WakeLine};
use sensornode::scheduler::{CycleReport, Node};
use sensornode::sensors::climate::{ClimateProbe, ClimateReading, ClimateSensor};
use sensornode::sensors::heartbeat::HeartbeatSensor;
use sensornode::sensors::icon_matrix::{IconMatrix, MAX_INTENSITY};
use sensornode::sensors::light::DimmableLed;
use sensornode::sensors::presence::{PresenceSensor, PresenceState};

use crate::mock_hw::{DisplayCall, MockDisplay, MockPin, MockPwm};

struct Rig {
    net: RecordingNetwork,
    clock: SimClock,
    storage: MemoryStorage,
}

impl Rig {
    fn new() -> Self {
        Self {
            net: RecordingNetwork::new(),
            clock: SimClock::new(),
            storage: MemoryStorage::new(),
        }
    }

    fn cycle_at(&mut self, node: &mut Node<'_>, now: u32) -> CycleReport {
        self.clock.set_millis(now);
        let mut io = NodeIo::new(&mut self.net, &mut self.clock, &mut self.storage);
        node.update(&mut io)
    }

    fn cycle(&mut self, node: &mut Node<'_>) -> CycleReport {
        let mut io = NodeIo::new(&mut self.net, &mut self.clock, &mut self.storage);
        node.update(&mut io)
    }

    fn present_all(&mut self, node: &mut Node<'_>) {
        let mut io = NodeIo::new(&mut self.net, &mut self.clock, &mut self.storage);
        node.present_all(&mut io, false);
    }

    fn tripped_values(&self) -> Vec<bool> {
        self.net
            .sent
            .iter()
            .filter(|m| m.data_type == DataType::TRIPPED)
            .filter_map(|m| m.payload.as_bool())
            .collect()
    }
}

fn presence_config() -> NodeConfig {
    let mut cfg = NodeConfig::default();
    cfg.presence_warm_up_ms = 0;
    cfg.presence_off_delay_ms = 60_000;
    cfg
}

// ── Presence ──────────────────────────────────────────────────

#[test]
fn presence_hysteresis() {
    let pin = MockPin::default();
    let mut pir = PresenceSensor::new(pin.clone(), WakeLine::new(0), DeviceId::Auto, &presence_config(), 0);
    let mut node = Node::new();
    node.add_sensor(&mut pir).unwrap();
    let mut rig = Rig::new();

    // Low → high at t=0: immediate "on".
    pin.set_high(true);
    let r = rig.cycle_at(&mut node, 0);
    assert_eq!(r.reports_sent, 1);
    assert_eq!(rig.tripped_values(), [true]);

    // Back low at t=100: lingering, still ready, nothing new.
    pin.set_high(false);
    for t in [100, 1_000, 30_000, 59_999] {
        let r = rig.cycle_at(&mut node, t);
        assert_eq!(r.sensors_ready, 1, "lingering at t={t}");
        assert!(!r.slept());
    }
    assert_eq!(rig.tripped_values(), [true]);

    // Deadline passed: "off", timer disarmed.
    let r = rig.cycle_at(&mut node, 60_000);
    assert_eq!(r.reports_sent, 1);
    assert_eq!(rig.tripped_values(), [true, false]);

    // Idle again: sleeps on the wake line only.
    let r = rig.cycle_at(&mut node, 60_001);
    assert_eq!(r.sensors_ready, 0);
    assert_eq!(rig.clock.sleeps.last().map(|s| s.request), Some(SleepRequest::Indefinite));

    drop(node);
    assert_eq!(pir.state(), PresenceState::Idle);
}

#[test]
fn presence_off_report_is_retried_after_failure() {
    let pin = MockPin::default();
    let mut pir = PresenceSensor::new(pin.clone(), WakeLine::new(0), DeviceId::Auto, &presence_config(), 0);
    let mut node = Node::new();
    node.add_sensor(&mut pir).unwrap();
    let mut rig = Rig::new();

    pin.set_high(true);
    rig.cycle_at(&mut node, 0);
    pin.set_high(false);
    rig.cycle_at(&mut node, 100);

    rig.net.fail_next_sends(1);
    let r = rig.cycle_at(&mut node, 60_000);
    assert_eq!(r.reports_failed, 1);
    assert_eq!(rig.tripped_values(), [true]);

    // Very next cycle retries the lost "off".
    let r = rig.cycle_at(&mut node, 60_010);
    assert_eq!(r.reports_sent, 1);
    assert_eq!(rig.tripped_values(), [true, false]);
}

#[test]
fn presence_warm_up_keeps_line_disarmed() {
    let pin = MockPin::default();
    let mut cfg = presence_config();
    cfg.presence_warm_up_ms = 15_000;
    let mut pir = PresenceSensor::new(pin.clone(), WakeLine::new(1), DeviceId::Auto, &cfg, 0);
    let mut node = Node::new();
    node.add_sensor(&mut pir).unwrap();
    let mut rig = Rig::new();

    pin.set_high(true);
    let r = rig.cycle_at(&mut node, 0);
    assert_eq!(r.plan.map(|p| p.until), Some(15_000));
    assert!(rig.clock.sleeps[0].arms.is_empty());
    assert!(rig.net.sent.is_empty());

    // Woken by the timer at the end of warm-up; motion is now reported.
    assert_eq!(rig.clock.millis(), 15_000);
    let r = rig.cycle(&mut node);
    assert_eq!(r.reports_sent, 1);
    assert_eq!(rig.tripped_values(), [true]);
}

// ── Dimmable LED ──────────────────────────────────────────────

fn run_until_reported(rig: &mut Rig, node: &mut Node<'_>) {
    for _ in 0..64 {
        if rig.cycle(node).reports_sent > 0 {
            return;
        }
    }
    panic!("fade did not finish");
}

#[test]
fn dimmer_fades_from_10_to_90_within_step_bound() {
    let pwm = MockPwm::default();
    let cfg = NodeConfig::default();
    let mut led = DimmableLed::new(pwm.clone(), DeviceId::Assigned(3), &cfg);
    let mut node = Node::new();
    node.add_sensor(&mut led).unwrap();
    let mut rig = Rig::new();

    rig.net.queue_inbound(Message::new(3, DataType::PERCENTAGE).with_byte(10));
    run_until_reported(&mut rig, &mut node);
    assert_eq!(pwm.last(), Some(10));

    let before = pwm.history().len();
    rig.net.queue_inbound(Message::new(3, DataType::PERCENTAGE).with_byte(90));
    run_until_reported(&mut rig, &mut node);

    let steps = &pwm.history()[before..];
    assert!(steps.len() <= usize::from(cfg.fade_max_steps));
    assert_eq!(steps.last(), Some(&90));
    assert!(steps.iter().all(|&l| l <= 90));
    let mut prev = 10;
    for &level in steps {
        assert!(level > prev, "each step moves closer");
        prev = level;
    }

    let last_two: Vec<_> = rig.net.sent.iter().rev().take(2).collect();
    assert_eq!(last_two[1].payload, Payload::Byte(90));
    assert_eq!(last_two[0].data_type, DataType::STATUS);
    assert_eq!(last_two[0].payload, Payload::Bool(true));
}

#[test]
fn dimmer_fade_steps_sleep_between_steps() {
    let pwm = MockPwm::default();
    let mut cfg = NodeConfig::default();
    cfg.fade_step_ms = 25;
    let mut led = DimmableLed::new(pwm, DeviceId::Assigned(0), &cfg);
    let mut node = Node::new();
    node.add_sensor(&mut led).unwrap();
    let mut rig = Rig::new();

    rig.net.queue_inbound(Message::new(0, DataType::STATUS).with_bool(true));
    run_until_reported(&mut rig, &mut node);

    assert!(!rig.clock.sleeps.is_empty());
    assert!(
        rig.clock
            .sleeps
            .iter()
            .all(|s| s.request == SleepRequest::For(25))
    );
}

#[test]
fn dimmer_restores_persisted_level_on_presentation() {
    let mut rig = Rig::new();
    rig.storage.save_state(slot(4), 35);
    rig.storage.save_state(aux_slot(4), 80);

    let pwm = MockPwm::default();
    let mut led = DimmableLed::new(pwm.clone(), DeviceId::Assigned(4), &NodeConfig::default());
    let mut node = Node::new();
    node.add_sensor(&mut led).unwrap();

    rig.present_all(&mut node);
    assert_eq!(pwm.last(), Some(35));
    assert_eq!(rig.net.presented[0].sensor_type, SensorType::DIMMER);

    // The restored level is reported on the next cycle.
    let r = rig.cycle(&mut node);
    assert_eq!(r.reports_sent, 1);
    assert_eq!(rig.net.sent[0].payload, Payload::Byte(35));
}

// ── Icon matrix ───────────────────────────────────────────────

#[test]
fn matrix_presents_both_channels_with_initial_state() {
    let display = MockDisplay::default();
    let mut matrix = IconMatrix::new(display, DeviceId::Auto);
    let mut node = Node::new();
    node.add_sensor(&mut matrix).unwrap();
    let mut rig = Rig::new();

    rig.present_all(&mut node);

    let presented: Vec<_> = rig.net.presented.iter().map(|p| (p.id, p.sensor_type)).collect();
    assert_eq!(presented, [(0, SensorType::DIMMER), (1, SensorType::CUSTOM)]);
    let sent: Vec<_> = rig.net.sent.iter().map(|m| (m.sensor, m.data_type)).collect();
    assert_eq!(
        sent,
        [(0, DataType::PERCENTAGE), (0, DataType::STATUS), (1, DataType::VAR1)]
    );
}

#[test]
fn matrix_draws_icons_flipped_and_dims() {
    let display = MockDisplay::default();
    let mut matrix = IconMatrix::new(display.clone(), DeviceId::Assigned(10));
    let mut node = Node::new();
    node.add_sensor(&mut matrix).unwrap();
    let mut rig = Rig::new();
    display.clear();

    let heart = icons::find("heart").unwrap();
    rig.net.queue_inbound(Message::new(11, DataType::VAR1).with_byte(heart));
    rig.net.queue_inbound(Message::new(10, DataType::PERCENTAGE).with_byte(100));
    rig.net.queue_inbound(Message::new(10, DataType::STATUS).with_bool(false));
    rig.net.queue_inbound(Message::new(11, DataType::VAR1).with_byte(200));
    let r = rig.cycle(&mut node);
    assert_eq!(r.messages_handled, 4);

    let rows = icons::icon(heart).unwrap().rows;
    for (i, bits) in rows.iter().enumerate() {
        assert_eq!(display.row(7 - i as u8), Some(*bits));
    }
    let calls = display.calls();
    assert!(calls.contains(&DisplayCall::Intensity(MAX_INTENSITY)));
    assert_eq!(calls.last(), Some(&DisplayCall::Shutdown(true)));

    drop(node);
    assert_eq!(matrix.icon(), heart);
    assert!(!matrix.is_on());
}

// ── Climate ───────────────────────────────────────────────────

struct Probe {
    readings: Vec<Result<ClimateReading, ProbeError>>,
}

impl ClimateProbe for Probe {
    fn read(&mut self) -> Result<ClimateReading, ProbeError> {
        if self.readings.len() > 1 {
            self.readings.remove(0)
        } else {
            self.readings[0]
        }
    }

    fn min_sampling_period(&self) -> u32 {
        2000
    }
}

fn reading(celsius: f32, humidity: f32) -> Result<ClimateReading, ProbeError> {
    Ok(ClimateReading { celsius, humidity })
}

#[test]
fn climate_reports_only_changes() {
    let mut cfg = NodeConfig::default();
    cfg.temperature_unit = TemperatureUnit::Celsius;
    cfg.climate_interval_ms = 5000;
    let probe = Probe {
        readings: vec![
            reading(21.0, 40.0),
            reading(21.05, 40.0),
            Err(ProbeError::Checksum),
            reading(22.0, 40.0),
        ],
    };
    let mut climate = ClimateSensor::new(probe, DeviceId::Auto, &cfg, 0);
    let mut node = Node::new();
    node.add_sensor(&mut climate).unwrap();
    let mut rig = Rig::new();

    let sent: Vec<u8> = [0, 5000, 10_000, 15_000]
        .into_iter()
        .map(|t| rig.cycle_at(&mut node, t).reports_sent)
        .collect();
    assert_eq!(sent, [1, 0, 0, 1]);

    let temps: Vec<_> = rig.net.sent_by(0).map(|m| m.payload.clone()).collect();
    assert_eq!(
        temps,
        [
            Payload::Float { value: 21.0, decimals: 1 },
            Payload::Float { value: 22.0, decimals: 1 },
        ]
    );
    assert_eq!(rig.net.sent_by(1).count(), 2);
}

// ── Heartbeat ─────────────────────────────────────────────────

#[test]
fn heartbeat_alternates_and_sleeps_between_beats() {
    let mut hb = HeartbeatSensor::from_config(DeviceId::Auto, &NodeConfig::default(), 0);
    let mut node = Node::new();
    node.add_sensor(&mut hb).unwrap();
    let mut rig = Rig::new();

    for _ in 0..3 {
        rig.cycle(&mut node); // beat
        rig.cycle(&mut node); // sleep to next beat
    }
    let beats: Vec<_> = rig.net.sent.iter().filter_map(|m| m.payload.as_bool()).collect();
    assert_eq!(beats, [true, false, true]);
    assert_eq!(rig.clock.millis(), 15_000);
}
