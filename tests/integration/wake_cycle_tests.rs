//! End-to-end wake cycles: BOOT → ACTIVE → SLEEP against mock hardware.

use firenode::app::events::{AppEvent, CalibrationStatus};
use firenode::app::ports::{AlarmChannel, WakeCause};
use firenode::config::NodeConfig;
use firenode::engine::{DEFAULT_SUBSCRIPTION, EngineAdapter, SampleRate};
use firenode::error::{Error, RadioError};
use firenode::fsm::{DecisionAggregator, DecisionState, LatestReadings};
use firenode::scheduler::{ActiveOutcome, DutyCycle, Phase, TelemetryOutcome};
use firenode::telemetry::frame::{FrameDecoder, ReadingHistory};
use firenode::telemetry::message::TelemetryFormat;

use crate::mock_hw::{
    FakeClock, FakeEngine, FakeRadio, FakeSleep, MemStore, NoDelay, RadioCall, RecordingAlarms,
    RecordingSink, class_batch,
};

const BLOB: u8 = 221;
const PROFILE: &[u8] = b"fire-vs-air";

type Cycle = DutyCycle<FakeEngine, MemStore, FakeRadio>;

struct Rig {
    sleep: FakeSleep,
    clock: FakeClock,
    alarms: RecordingAlarms,
    delay: NoDelay,
    sink: RecordingSink,
}

impl Rig {
    fn new() -> Self {
        Self {
            sleep: FakeSleep::new(WakeCause::PowerOn),
            clock: FakeClock::new(0, 50),
            alarms: RecordingAlarms::default(),
            delay: NoDelay::default(),
            sink: RecordingSink::default(),
        }
    }
}

fn cycle(config: NodeConfig, engine: FakeEngine, mem: &MemStore) -> Cycle {
    DutyCycle::new(config, engine, mem.clone(), FakeRadio::new())
}

#[test]
fn fire_detected_from_erased_storage() {
    let mem = MemStore::erased();
    let mut dc = cycle(
        NodeConfig::default(),
        FakeEngine::new(BLOB).with_ticks(2, 0.85, 0.10),
        &mem,
    );
    let mut rig = Rig::new();

    dc.boot(PROFILE, &mut rig.sleep, &mut rig.sink).unwrap();
    assert!(rig.sink.events.iter().any(|e| matches!(
        e,
        AppEvent::Booted {
            calibration: CalibrationStatus::FactoryDefaults,
            ..
        }
    )));

    let report = dc
        .run_active(&rig.clock, &mut rig.alarms, &mut rig.delay, &mut rig.sink)
        .unwrap();

    match report.outcome {
        ActiveOutcome::Decided(d) => {
            assert!(d.fire);
            assert!(!d.ambient_air);
        }
        ActiveOutcome::TimedOut => panic!("expected a decision"),
    }
    assert_eq!(rig.alarms.calls, [(AlarmChannel::Fire, true)]);
    assert!(rig.alarms.is_on(AlarmChannel::Fire));
    assert!(!rig.alarms.is_on(AlarmChannel::AmbientAir));

    // First gate check after boot always saves.
    assert!(report.calibration_saved);
    assert_eq!(mem.snapshot()[0], BLOB);

    // Exactly one packet: temperature, pressure (Pa), humidity.
    assert_eq!(dc.relay().radio().payloads(), [b"23.50 100800.00 51.25".as_slice()]);
    assert_eq!(report.telemetry, Some(TelemetryOutcome::Sent { len: 21 }));
    assert_eq!(dc.engine().processed, 2);

    dc.sleep(&mut rig.sleep, &mut rig.delay, &mut rig.sink);
    assert_eq!(rig.sleep.armed, [2, 1]);
    assert!(rig.sleep.slept);
    assert_eq!(dc.phase(), Phase::Sleep);
    assert_eq!(dc.aggregator().state(), DecisionState::Waiting);
    // Pre-sleep pause is honoured.
    assert!(rig.delay.total_ns >= 2_000 * 1_000_000);
}

#[test]
fn calibration_saved_in_one_cycle_is_restored_in_the_next() {
    let mem = MemStore::erased();
    let first_engine = FakeEngine::new(BLOB).with_ticks(2, 0.2, 0.9);
    let learned = first_engine.state.clone();

    let mut rig = Rig::new();
    let mut dc = cycle(NodeConfig::default(), first_engine, &mem);
    dc.boot(PROFILE, &mut rig.sleep, &mut rig.sink).unwrap();
    let report = dc
        .run_active(&rig.clock, &mut rig.alarms, &mut rig.delay, &mut rig.sink)
        .unwrap();
    assert!(report.calibration_saved);
    assert_eq!(rig.alarms.calls, [(AlarmChannel::AmbientAir, true)]);

    let mut next_engine = FakeEngine::new(BLOB);
    next_engine.state = vec![0; BLOB as usize];
    let mut rig = Rig::new();
    rig.sleep.wake = WakeCause::Timer;
    let mut dc = cycle(NodeConfig::default(), next_engine, &mem);
    dc.boot(PROFILE, &mut rig.sleep, &mut rig.sink).unwrap();

    assert_eq!(dc.engine().installed.as_ref(), Some(&learned));
    assert!(rig.sink.events.iter().any(|e| matches!(
        e,
        AppEvent::Booted {
            wake: WakeCause::Timer,
            calibration: CalibrationStatus::Restored,
        }
    )));
}

#[test]
fn empty_batches_change_nothing() {
    let mem = MemStore::erased();
    let mut engine = FakeEngine::new(BLOB);
    engine.push_batch(Vec::new());
    engine.push_batch(class_batch(0.9, 0.1));
    engine.push_batch(Vec::new());
    engine.push_batch(class_batch(0.9, 0.1));

    let mut rig = Rig::new();
    let mut dc = cycle(NodeConfig::default(), engine, &mem);
    dc.boot(PROFILE, &mut rig.sleep, &mut rig.sink).unwrap();
    let report = dc
        .run_active(&rig.clock, &mut rig.alarms, &mut rig.delay, &mut rig.sink)
        .unwrap();

    assert!(matches!(report.outcome, ActiveOutcome::Decided(d) if d.fire));
    assert_eq!(dc.engine().processed, 4);
    let ticks = rig
        .sink
        .count(|e| matches!(e, AppEvent::ClassTick { .. }));
    assert_eq!(ticks, 2);
    // One actuation and one save, both after the second real batch.
    assert_eq!(rig.alarms.calls, [(AlarmChannel::Fire, true)]);
    assert!(report.calibration_saved);
    assert_eq!(mem.snapshot()[0], BLOB);
}

#[test]
fn empty_batch_leaves_aggregator_untouched() {
    let mut engine = FakeEngine::new(BLOB);
    engine.push_batch(class_batch(0.9, 0.1));
    engine.push_batch(Vec::new());
    let mut adapter = EngineAdapter::new(engine);
    adapter
        .subscribe(&DEFAULT_SUBSCRIPTION, SampleRate::Scan)
        .unwrap();
    let mut agg = DecisionAggregator::from_config(&NodeConfig::default());

    assert!(adapter.tick(0, &mut agg).unwrap());
    let (state, ticks, probs, readings) =
        (agg.state(), agg.ticks(), agg.probabilities(), *agg.readings());
    assert_eq!(ticks, 1);
    assert_eq!(state, DecisionState::Accumulating);

    assert!(adapter.tick(1, &mut agg).unwrap());
    assert_eq!(adapter.batches(), 2);
    assert_eq!(agg.ticks(), ticks);
    assert_eq!(agg.probabilities(), probs);
    assert_eq!(*agg.readings(), readings);
    assert_eq!(agg.state(), state);
    assert!(agg.take_decision().is_none());
}

#[test]
fn only_empty_batches_leave_alarms_and_calibration_alone() {
    let mem = MemStore::erased();
    let config = NodeConfig {
        max_active_secs: 1,
        ..NodeConfig::default()
    };
    let mut engine = FakeEngine::new(BLOB);
    for _ in 0..4 {
        engine.push_batch(Vec::new());
    }

    let mut rig = Rig::new();
    let mut dc = cycle(config, engine, &mem);
    dc.boot(PROFILE, &mut rig.sleep, &mut rig.sink).unwrap();
    let (after_boot, commits, writes) = (mem.snapshot(), mem.commits(), mem.writes());

    let report = dc
        .run_active(&rig.clock, &mut rig.alarms, &mut rig.delay, &mut rig.sink)
        .unwrap();

    assert_eq!(report.outcome, ActiveOutcome::TimedOut);
    assert!(dc.engine().processed >= 4);
    assert!(rig.alarms.calls.is_empty());
    assert_eq!(mem.snapshot(), after_boot);
    assert_eq!(mem.commits(), commits);
    assert_eq!(mem.writes(), writes);
    assert_eq!(dc.aggregator().ticks(), 0);
    assert_eq!(*dc.aggregator().readings(), LatestReadings::default());
    assert_eq!(
        rig.sink
            .count(|e| matches!(e, AppEvent::ClassTick { .. })),
        0
    );
}

#[test]
fn no_decision_times_out_into_sleep() {
    let mem = MemStore::erased();
    let config = NodeConfig {
        max_active_secs: 1,
        ..NodeConfig::default()
    };
    // A single tick never reaches the warm-up of two.
    let mut dc = cycle(config, FakeEngine::new(BLOB).with_ticks(1, 0.99, 0.0), &mem);
    let mut rig = Rig::new();

    dc.boot(PROFILE, &mut rig.sleep, &mut rig.sink).unwrap();
    let report = dc
        .run_active(&rig.clock, &mut rig.alarms, &mut rig.delay, &mut rig.sink)
        .unwrap();

    assert_eq!(report.outcome, ActiveOutcome::TimedOut);
    assert!(!report.calibration_saved);
    assert!(report.telemetry.is_none());
    assert!(rig.alarms.calls.is_empty());
    assert!(dc.relay().radio().payloads().is_empty());
    assert_eq!(dc.phase(), Phase::Sleep);
    assert_eq!(
        rig.sink
            .count(|e| matches!(e, AppEvent::ActiveTimeout { .. })),
        1
    );
}

#[test]
fn rejected_radio_parameter_is_fatal_at_boot() {
    let mem = MemStore::erased();
    let mut radio = FakeRadio::new();
    radio.reject_frequency = true;
    let mut dc = DutyCycle::new(
        NodeConfig::default(),
        FakeEngine::new(BLOB).with_ticks(2, 0.9, 0.1),
        mem.clone(),
        radio,
    );
    let mut rig = Rig::new();

    let err = dc.boot(PROFILE, &mut rig.sleep, &mut rig.sink).unwrap_err();
    assert!(matches!(err, Error::Radio(RadioError::InvalidFrequency)));
    assert_eq!(dc.phase(), Phase::Boot);
    // Nothing after the failed parameter was attempted.
    assert_eq!(
        dc.relay().radio().calls,
        [RadioCall::Begin, RadioCall::Frequency(868.0)]
    );
    assert!(rig.sleep.armed.is_empty());
    assert!(matches!(
        dc.run_active(&rig.clock, &mut rig.alarms, &mut rig.delay, &mut rig.sink),
        Err(Error::Init(_))
    ));
}

#[test]
fn storage_failure_at_boot_disables_persistence_for_the_cycle() {
    let mut mem = MemStore::erased();
    mem.fail_write_at = Some(0);
    let mut dc = cycle(
        NodeConfig::default(),
        FakeEngine::new(BLOB).with_ticks(2, 0.9, 0.1),
        &mem,
    );
    let mut rig = Rig::new();

    dc.boot(PROFILE, &mut rig.sleep, &mut rig.sink).unwrap();
    assert!(!dc.persistence_ok());
    assert!(rig.sink.events.iter().any(|e| matches!(
        e,
        AppEvent::Booted {
            calibration: CalibrationStatus::Degraded,
            ..
        }
    )));

    let report = dc
        .run_active(&rig.clock, &mut rig.alarms, &mut rig.delay, &mut rig.sink)
        .unwrap();
    // Detection and telemetry still run; only the save is skipped.
    assert!(matches!(report.outcome, ActiveOutcome::Decided(d) if d.fire));
    assert!(!report.calibration_saved);
    assert!(matches!(report.telemetry, Some(TelemetryOutcome::Sent { .. })));
    assert_eq!(mem.writes(), 0);
}

#[test]
fn framed_payload_decodes_on_the_receiver() {
    let mem = MemStore::erased();
    let config = NodeConfig {
        telemetry_format: TelemetryFormat::FramedV2,
        ..NodeConfig::default()
    };
    let mut dc = cycle(config, FakeEngine::new(BLOB).with_ticks(2, 0.85, 0.10), &mem);
    let mut rig = Rig::new();

    dc.boot(PROFILE, &mut rig.sleep, &mut rig.sink).unwrap();
    dc.run_active(&rig.clock, &mut rig.alarms, &mut rig.delay, &mut rig.sink)
        .unwrap();

    let payloads = dc.relay().radio().payloads();
    assert_eq!(payloads, [b"DATA 23.50 51.25 85.00 ENDATA".as_slice()]);

    let mut decoder = FrameDecoder::new();
    let mut history = ReadingHistory::new();
    let mut stream = b"\x00\xffnoise ".to_vec();
    stream.extend_from_slice(payloads[0]);
    assert_eq!(decoder.feed(&stream, &mut history), 1);
    let reading = history.latest().unwrap();
    assert_eq!(reading.temperature_c, 23.5);
    assert_eq!(reading.humidity_percent, 51.25);
    assert_eq!(reading.fire_risk_percent, 85.0);
}

#[test]
fn failed_transmit_is_reported_and_radio_powered_down() {
    let mem = MemStore::erased();
    let mut radio = FakeRadio::new();
    radio.fail_start = Some(RadioError::Driver(-5));
    let mut dc = DutyCycle::new(
        NodeConfig::default(),
        FakeEngine::new(BLOB).with_ticks(2, 0.9, 0.1),
        mem.clone(),
        radio,
    );
    let mut rig = Rig::new();

    dc.boot(PROFILE, &mut rig.sleep, &mut rig.sink).unwrap();
    let report = dc
        .run_active(&rig.clock, &mut rig.alarms, &mut rig.delay, &mut rig.sink)
        .unwrap();

    assert_eq!(
        report.telemetry,
        Some(TelemetryOutcome::Failed(RadioError::Driver(-5)))
    );
    assert_eq!(dc.relay().radio().calls.last(), Some(&RadioCall::Finish));
    assert!(rig
        .sink
        .events
        .iter()
        .any(|e| matches!(e, AppEvent::TelemetryFailed(-5))));
}

#[test]
fn telemetry_disabled_keeps_the_radio_quiet() {
    let mem = MemStore::erased();
    let config = NodeConfig {
        telemetry_enabled: false,
        ..NodeConfig::default()
    };
    let mut dc = cycle(config, FakeEngine::new(BLOB).with_ticks(2, 0.9, 0.1), &mem);
    let mut rig = Rig::new();

    dc.boot(PROFILE, &mut rig.sleep, &mut rig.sink).unwrap();
    let report = dc
        .run_active(&rig.clock, &mut rig.alarms, &mut rig.delay, &mut rig.sink)
        .unwrap();

    assert!(report.telemetry.is_none());
    assert!(dc.relay().radio().payloads().is_empty());
    assert!(!dc.relay().has_sent());
}

#[test]
fn rejected_engine_profile_is_not_fatal() {
    let mem = MemStore::erased();
    let mut engine = FakeEngine::new(BLOB).with_ticks(2, 0.1, 0.1);
    engine.reject_profile = true;
    let mut dc = cycle(NodeConfig::default(), engine, &mem);
    let mut rig = Rig::new();

    dc.boot(PROFILE, &mut rig.sleep, &mut rig.sink).unwrap();
    let report = dc
        .run_active(&rig.clock, &mut rig.alarms, &mut rig.delay, &mut rig.sink)
        .unwrap();

    // Neither class above 70 %: decided, but no alarm.
    assert!(matches!(report.outcome, ActiveOutcome::Decided(d) if !d.any()));
    assert!(rig.alarms.calls.is_empty());
}
