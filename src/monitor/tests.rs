use super::{Monitor, MonitorExit, MonitorNotice};
use crate::audio::{
    rms_from_dbfs, transfer_queue, BlockProducer, CaptureDiagnostics, LoudnessSample,
};
use crate::clock::{CapturedAt, MonoTime};
use crate::detector::{DetectorParams, DetectorPhase, LevelStatus, TrainEvent};
use crate::report::{EventSink, LevelRecord};
use anyhow::{anyhow, Result};
use std::sync::atomic::AtomicBool;
use std::time::{Duration, SystemTime};

const BLOCK_S: f64 = 0.1;
const SILENCE_DBFS: f64 = -90.0;

type TestMonitor = Monitor<Vec<TrainEvent>, Vec<LevelRecord>>;

// 2024-11-03T11:30:00Z
const BASE_UNIX_S: u64 = 1_730_633_400;

fn at(secs: f64) -> CapturedAt {
    let offset = Duration::from_millis((secs * 1000.0).round() as u64);
    CapturedAt {
        wall: SystemTime::UNIX_EPOCH + Duration::from_secs(BASE_UNIX_S) + offset,
        mono: MonoTime::from_secs_f64(secs),
    }
}

fn params(min_s: u64, hold_s: u64) -> DetectorParams {
    DetectorParams {
        min_duration: Duration::from_secs(min_s),
        stop_hold: Duration::from_secs(hold_s),
        ..DetectorParams::default()
    }
}

fn monitor(params: DetectorParams, with_levels: bool) -> TestMonitor {
    Monitor::new(params, 3.0, Vec::new(), with_levels.then(Vec::new))
}

/// Scripted input: `(dbfs, seconds)` segments played back in 100 ms blocks.
struct Script {
    t: f64,
}

impl Script {
    fn new() -> Self {
        Self { t: 0.0 }
    }

    fn play(&mut self, monitor: &mut TestMonitor, dbfs: f64, seconds: f64) -> Vec<TrainEvent> {
        let blocks = (seconds / BLOCK_S).round() as usize;
        let mut closed = Vec::new();
        for _ in 0..blocks {
            let sample = LoudnessSample {
                rms: rms_from_dbfs(dbfs),
                block_duration_s: BLOCK_S,
                captured_at: at(self.t),
            };
            if let Some(event) = monitor.process_sample(&sample).expect("in-memory sinks") {
                closed.push(event);
            }
            self.t += BLOCK_S;
        }
        closed
    }

    fn skip(&mut self, seconds: f64) {
        self.t += seconds;
    }
}

fn assert_well_formed(event: &TrainEvent) {
    assert!(event.end_wall > event.start_wall);
    assert!(event.avg_dbfs <= event.peak_dbfs);
    assert!(event.block_count >= 1);
}

#[test]
fn sustained_loud_signal_yields_one_event() {
    let mut monitor = monitor(params(30, 5), false);
    let mut script = Script::new();
    script.play(&mut monitor, -10.0, 40.0);
    script.play(&mut monitor, SILENCE_DBFS, 20.0);

    let events = monitor.event_sink();
    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_well_formed(event);
    assert_eq!(event.threshold_dbfs, -15.0);
    // Forty loud seconds plus the smoothing decay and the stop-hold tail.
    assert!(
        (40.0..48.0).contains(&event.duration_s),
        "duration {}",
        event.duration_s
    );
    assert!((event.peak_dbfs + 10.0).abs() < 0.05);
    assert_eq!(event.start_wall, at(0.0).wall_time());
}

#[test]
fn short_burst_yields_nothing() {
    let mut monitor = monitor(params(30, 5), false);
    let mut script = Script::new();
    script.play(&mut monitor, -5.0, 5.0);
    script.play(&mut monitor, SILENCE_DBFS, 60.0);
    assert!(monitor.event_sink().is_empty());
    assert_eq!(monitor.phase(), DetectorPhase::Idle);
}

#[test]
fn dip_to_low_threshold_keeps_one_event() {
    let mut monitor = monitor(params(30, 5), false);
    let mut script = Script::new();
    let mut closed = script.play(&mut monitor, -10.0, 35.0);
    closed.extend(script.play(&mut monitor, -17.0, 3.0));
    closed.extend(script.play(&mut monitor, -10.0, 10.0));
    assert!(closed.is_empty(), "event closed during the dip");
    script.play(&mut monitor, SILENCE_DBFS, 20.0);

    let events = monitor.event_sink();
    assert_eq!(events.len(), 1);
    assert_well_formed(&events[0]);
    assert!(events[0].duration_s >= 48.0);
}

#[test]
fn dip_below_low_shorter_than_stop_hold_is_bridged() {
    let mut monitor = monitor(params(30, 5), false);
    let mut script = Script::new();
    script.play(&mut monitor, -10.0, 35.0);
    script.play(&mut monitor, SILENCE_DBFS, 3.0);
    script.play(&mut monitor, -10.0, 10.0);
    script.play(&mut monitor, SILENCE_DBFS, 20.0);
    assert_eq!(monitor.event_sink().len(), 1);
}

#[test]
fn long_quiet_gap_splits_events() {
    let mut monitor = monitor(params(5, 2), false);
    let mut script = Script::new();
    script.play(&mut monitor, -10.0, 10.0);
    script.play(&mut monitor, SILENCE_DBFS, 15.0);
    script.play(&mut monitor, -10.0, 10.0);
    script.play(&mut monitor, SILENCE_DBFS, 15.0);

    let events = monitor.event_sink();
    assert_eq!(events.len(), 2);
    assert!(events[0].end_wall <= events[1].start_wall);
}

#[test]
fn dropped_samples_do_not_block_confirmation() {
    let mut monitor = monitor(params(30, 5), false);
    let mut script = Script::new();
    script.play(&mut monitor, -10.0, 10.0);
    script.skip(15.0);
    script.play(&mut monitor, -10.0, 15.0);
    assert_eq!(monitor.phase(), DetectorPhase::Active);
    script.play(&mut monitor, SILENCE_DBFS, 20.0);
    assert_eq!(monitor.event_sink().len(), 1);
}

#[test]
fn queue_overflow_during_excursion_still_confirms() {
    let (tx, rx) = transfer_queue(64);
    let diagnostics = CaptureDiagnostics::new();
    let producer = BlockProducer::new(tx, 44_100, 1, diagnostics.clone());
    let mut monitor = monitor(params(30, 5), false);

    let loud = vec![rms_from_dbfs(-10.0) as f32; 4_410];
    let quiet = vec![0.0f32; 4_410];
    for i in 0..700usize {
        let block = if i < 400 { &loud } else { &quiet };
        producer.push_block_at(block, false, at(i as f64 * BLOCK_S), |s| s);
        // The consumer stalls for 15 s at a time while the excursion runs.
        if i >= 400 || i % 150 == 149 {
            for sample in rx.try_iter() {
                monitor.process_sample(&sample).expect("in-memory sinks");
            }
        }
    }

    assert!(diagnostics.peek().dropped > 0);
    let events = monitor.event_sink();
    assert_eq!(events.len(), 1);
    assert_well_formed(&events[0]);
}

#[test]
fn level_log_tags_every_sample() {
    let mut monitor = monitor(params(2, 1), true);
    let mut script = Script::new();
    script.play(&mut monitor, -10.0, 4.0);
    script.play(&mut monitor, SILENCE_DBFS, 6.0);

    let levels = monitor.level_sink().expect("level sink enabled");
    assert_eq!(levels.len(), 100);
    assert_eq!(monitor.stats().samples, 100);
    assert_eq!(levels[0].status, LevelStatus::Idle);
    assert_eq!(levels[25].status, LevelStatus::TrainActive);
    assert_eq!(levels[99].status, LevelStatus::Idle);
    assert!(levels.iter().all(|r| r.threshold_dbfs == -15.0));
}

#[test]
fn nan_samples_do_not_poison_the_detector() {
    let mut monitor = monitor(params(1, 1), false);
    let sample = LoudnessSample {
        rms: f64::NAN,
        block_duration_s: BLOCK_S,
        captured_at: at(0.0),
    };
    monitor.process_sample(&sample).expect("in-memory sinks");
    let mut script = Script { t: BLOCK_S };
    script.play(&mut monitor, -5.0, 5.0);
    assert_eq!(monitor.phase(), DetectorPhase::Active);
}

#[test]
fn run_drains_queue_until_source_closes() {
    let (tx, rx) = transfer_queue(1_000);
    for i in 0..200usize {
        let dbfs = if i < 60 { -10.0 } else { SILENCE_DBFS };
        tx.try_send(LoudnessSample {
            rms: rms_from_dbfs(dbfs),
            block_duration_s: BLOCK_S,
            captured_at: at(i as f64 * BLOCK_S),
        })
        .expect("queue has room");
    }
    drop(tx);

    let mut monitor = monitor(params(2, 1), false)
        .with_intervals(Duration::from_millis(10), Duration::from_secs(60));
    let stop = AtomicBool::new(false);
    let mut notices = Vec::new();
    let exit = monitor
        .run(&rx, &CaptureDiagnostics::new(), &stop, &mut |n| notices.push(n))
        .expect("run succeeds");

    assert_eq!(exit, MonitorExit::SourceClosed);
    assert_eq!(notices.len(), 1);
    assert!(matches!(notices[0], MonitorNotice::Event(_)));
    assert_eq!(monitor.stats().events, 1);
}

#[test]
fn stop_discards_open_event() {
    let mut monitor = monitor(params(1, 5), false);
    let mut script = Script::new();
    script.play(&mut monitor, -10.0, 3.0);
    assert_eq!(monitor.phase(), DetectorPhase::Active);

    let (_tx, rx) = transfer_queue(8);
    let stop = AtomicBool::new(true);
    let exit = monitor
        .run(&rx, &CaptureDiagnostics::new(), &stop, &mut |_| {})
        .expect("run succeeds");
    assert_eq!(exit, MonitorExit::Stopped);
    assert_eq!(monitor.phase(), DetectorPhase::Idle);
    assert!(monitor.event_sink().is_empty());
}

#[test]
fn reports_sample_loss_during_housekeeping() {
    let (tx, rx) = transfer_queue(8);
    drop(tx);
    let diagnostics = CaptureDiagnostics::new();
    diagnostics.record_overflow();
    diagnostics.record_drop();
    diagnostics.record_drop();

    let mut monitor =
        monitor(params(30, 5), false).with_intervals(Duration::from_millis(10), Duration::ZERO);
    let stop = AtomicBool::new(false);
    let mut notices = Vec::new();
    monitor
        .run(&rx, &diagnostics, &stop, &mut |n| notices.push(n))
        .expect("run succeeds");

    match notices.first() {
        Some(MonitorNotice::SampleLoss(counts)) => {
            assert_eq!(counts.overflows, 1);
            assert_eq!(counts.dropped, 2);
        }
        other => panic!("expected sample loss notice, got {other:?}"),
    }
    assert!(diagnostics.peek().is_empty());
}

#[test]
fn lost_device_fails_the_run() {
    let (_tx, rx) = transfer_queue(8);
    let diagnostics = CaptureDiagnostics::new();
    diagnostics.mark_device_lost();
    let mut monitor = monitor(params(30, 5), false);
    let stop = AtomicBool::new(false);
    let err = monitor
        .run(&rx, &diagnostics, &stop, &mut |_| {})
        .expect_err("device loss is fatal");
    assert!(err.to_string().contains("no longer available"));
}

struct FailingSink;

impl EventSink for FailingSink {
    fn write_event(&mut self, _event: &TrainEvent) -> Result<()> {
        Err(anyhow!("disk full"))
    }
}

#[test]
fn sink_failure_is_propagated() {
    let mut monitor: Monitor<FailingSink, Vec<LevelRecord>> =
        Monitor::new(params(1, 1), 3.0, FailingSink, None);
    let mut failed = false;
    for i in 0..60usize {
        let dbfs = if i < 20 { -10.0 } else { SILENCE_DBFS };
        let sample = LoudnessSample {
            rms: rms_from_dbfs(dbfs),
            block_duration_s: BLOCK_S,
            captured_at: at(i as f64 * BLOCK_S),
        };
        if let Err(err) = monitor.process_sample(&sample) {
            assert!(err.to_string().contains("disk full"));
            failed = true;
            break;
        }
    }
    assert!(failed);
}
