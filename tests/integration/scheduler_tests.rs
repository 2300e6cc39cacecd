//! Control loop mechanics: adaptive wait, wake flags, commands, telemetry
//! cadence, statistics persistence and suspend/resume.

use std::time::{Duration, Instant};

use super::mock_hw::{MockInputs, MockSensors, open_config, rig, rig_with_store};

use watering::Error;
use watering::adapters::nvs::NvsAdapter;
use watering::app::commands::Command;
use watering::app::events::NotifyCategory;
use watering::app::ports::{ConfigPort, PumpPort, StoragePort};
use watering::app::service::{EXTREMUMS_KEY, RUN_TIME_KEY, STORAGE_NAMESPACE};
use watering::clock::LocalTime;
use watering::config::{WateringConfig, WateringMode};
use watering::control::{DecisionReason, ScheduleWindow};
use watering::drivers::led_patterns::Indicator;
use watering::drivers::pump::PumpControl;
use watering::events::{COMMAND_PENDING, LEVEL_CHANGED, MINUTE_TICK, RESUME, SUSPEND};
use watering::scheduler::CyclePhase;
use watering::sensors::extremums::ExtremumScope;
use watering::sensors::{SensorGroup, SensorId};

/// Shortest period the parameter store accepts.
const MIN_PERIOD_MS: u32 = 1_000;

fn fast_config(period_ms: u32) -> WateringConfig {
    WateringConfig {
        cycle_period_ms: period_ms,
        ..open_config()
    }
}

// ── Cycle timing ──────────────────────────────────────────────

#[test]
fn wait_compensates_processing_time() {
    let mut r = rig(&open_config(), MockSensors::soil(40.0, 20.0), MockInputs::default());
    let clock = r.clock.clone();
    r.sensors().read_cost = Some((clock, 2));

    // Five sensor reads at 2 s each.
    let wait = r.ctl.run_cycle();
    assert_eq!(r.ctl.last_busy(), Duration::from_secs(10));
    assert_eq!(wait, Duration::from_secs(20));
    assert_eq!(r.ctl.phase(), CyclePhase::Idle);
}

#[test]
fn overrun_cycle_does_not_wait() {
    let mut r = rig(&open_config(), MockSensors::soil(40.0, 20.0), MockInputs::default());
    let clock = r.clock.clone();
    r.sensors().read_cost = Some((clock, 10));
    assert_eq!(r.ctl.run_cycle(), Duration::ZERO);
}

#[test]
fn idle_step_still_wakes_once_per_period() {
    let mut r = rig(
        &fast_config(MIN_PERIOD_MS),
        MockSensors::soil(40.0, 20.0),
        MockInputs::default(),
    );
    let started = Instant::now();
    r.ctl.step();
    assert!(started.elapsed() >= Duration::from_millis(900));
    assert_eq!(r.ctl.service().cycle_count(), 1);
}

#[test]
fn minute_tick_wakes_early_and_is_cleared() {
    let mut r = rig(&fast_config(60_000), MockSensors::soil(40.0, 20.0), MockInputs::default());
    r.signals.minute_tick();
    let started = Instant::now();
    r.ctl.step();
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(r.signals.get() & MINUTE_TICK, 0);
}

#[test]
fn level_edge_wakes_loop_and_stays_pending_until_sampled() {
    let mut r = rig(&fast_config(60_000), MockSensors::soil(20.0, 20.0), MockInputs::default());
    let signals = r.signals;

    std::thread::scope(|s| {
        s.spawn(|| {
            std::thread::sleep(Duration::from_millis(50));
            signals.level_edge(true);
        });
        let started = Instant::now();
        r.ctl.step();
        assert!(started.elapsed() < Duration::from_secs(5));
    });
    assert_ne!(signals.get() & LEVEL_CHANGED, 0, "wake must not consume the edge");

    r.cycle_after(1);
    assert_eq!(signals.get() & LEVEL_CHANGED, 0);
    assert_eq!(
        r.ctl.service().last_decision().unwrap().reason,
        DecisionReason::LevelLow
    );
}

// ── Commands ──────────────────────────────────────────────────

#[test]
fn mode_command_applies_in_the_same_cycle() {
    let mut r = rig(&open_config(), MockSensors::soil(20.0, 20.0), MockInputs::default());
    r.signals
        .send_command(Command::SetMode(WateringMode::Off))
        .unwrap();
    assert_ne!(r.signals.get() & COMMAND_PENDING, 0);

    r.cycle_after(30);
    assert!(!r.running());
    assert_eq!(
        r.ctl.service().last_decision().unwrap().reason,
        DecisionReason::ModeOff
    );
    assert_eq!(r.ctl.store().load().unwrap().mode, WateringMode::Off);
    assert_eq!(r.signals.get() & COMMAND_PENDING, 0);
}

#[test]
fn command_queue_is_bounded() {
    let r = rig(&open_config(), MockSensors::soil(40.0, 20.0), MockInputs::default());
    for _ in 0..watering::events::COMMAND_DEPTH {
        r.signals.send_command(Command::PublishNow).unwrap();
    }
    assert_eq!(
        r.signals.send_command(Command::PublishNow),
        Err(Error::CommandQueueFull)
    );
}

#[test]
fn invalid_config_update_is_rejected() {
    let mut r = rig(&open_config(), MockSensors::soil(40.0, 20.0), MockInputs::default());
    let bad = WateringConfig {
        moisture_min: 60.0,
        moisture_max: 50.0,
        ..open_config()
    };
    r.signals.send_command(Command::UpdateConfig(bad)).unwrap();
    r.cycle_after(30);
    assert_eq!(r.ctl.store().load().unwrap(), open_config());
}

#[test]
fn reset_extremums_clears_only_the_addressed_group() {
    let mut r = rig(&open_config(), MockSensors::soil(25.0, 20.0), MockInputs::default());
    r.sensors().set(SensorId::IndoorTemperature, 21.0);
    r.cycle_after(30);
    r.sensors().set(SensorId::SoilMoisture, 40.0);
    r.cycle_after(30);
    let moisture = r.ctl.service().extremums().get(SensorId::SoilMoisture).all_time;
    assert_eq!((moisture.min, moisture.max), (Some(25.0), Some(40.0)));

    r.sensors().set(SensorId::SoilMoisture, 33.0);
    r.sensors().set(SensorId::IndoorTemperature, 19.0);
    r.signals
        .send_command(Command::ResetExtremums {
            sensor: Some(SensorGroup::Soil),
            scope: ExtremumScope::All,
        })
        .unwrap();
    r.cycle_after(30);

    let stats = r.ctl.service().extremums();
    let moisture = stats.get(SensorId::SoilMoisture).all_time;
    assert_eq!((moisture.min, moisture.max), (Some(33.0), Some(33.0)));
    let indoor = stats.get(SensorId::IndoorTemperature).all_time;
    assert_eq!((indoor.min, indoor.max), (Some(19.0), Some(21.0)));
}

// ── Telemetry ─────────────────────────────────────────────────

#[test]
fn telemetry_follows_its_own_interval_and_publish_now() {
    let mut r = rig(&open_config(), MockSensors::soil(40.0, 20.0), MockInputs::default());
    r.cycle_after(30);
    assert_eq!(r.out().publish_count("soil"), 1);

    r.cycle_after(30);
    assert_eq!(r.out().publish_count("soil"), 1);

    r.signals.send_command(Command::PublishNow).unwrap();
    r.cycle_after(1);
    assert_eq!(r.out().publish_count("soil"), 2);

    r.cycle_after(60);
    assert_eq!(r.out().publish_count("soil"), 3);
}

#[test]
fn telemetry_payloads() {
    let mut r = rig(&open_config(), MockSensors::soil(25.0, 20.0), MockInputs::default());
    r.cycle_after(30);
    let out = r.out();

    assert_eq!(
        out.last_payload("soil"),
        Some(r#"{"moisture":25.0,"temperature":20.0}"#)
    );
    assert_eq!(
        out.last_payload("indoor"),
        Some(r#"{"temperature":null,"humidity":null}"#)
    );
    assert_eq!(out.last_payload("heating"), Some(r#"{"temperature":null}"#));
    assert_eq!(
        out.last_payload("water_leak"),
        Some(r#"{"channel1":0,"channel2":0,"channel3":0}"#)
    );
    assert_eq!(out.last_payload("water_level"), Some(r#"{"status":1}"#));
    assert_eq!(
        out.last_payload("watering"),
        Some(concat!(
            r#"{"mode":"sensors","pump":1,"reason":"watering","last_on":1030,"last_off":null,"#,
            r#""run_time":{"day":0,"week":0,"month":0,"year":0,"total":0}}"#
        ))
    );
}

#[test]
fn leak_and_level_changes_publish_immediately() {
    let mut r = rig(&open_config(), MockSensors::soil(40.0, 20.0), MockInputs::default());
    r.cycle_after(30);
    assert_eq!(r.out().publish_count("water_leak"), 1);

    r.inputs().leaks[0] = true;
    r.cycle_after(5);
    assert_eq!(r.out().publish_count("water_leak"), 2);
    assert_eq!(
        r.out().last_payload("water_leak"),
        Some(r#"{"channel1":1,"channel2":0,"channel3":0}"#)
    );

    // A persisting leak waits for the interval again.
    r.cycle_after(5);
    assert_eq!(r.out().publish_count("water_leak"), 2);

    r.inputs().level_low = true;
    r.signals.level_edge(true);
    r.cycle_after(5);
    assert_eq!(r.out().publish_count("water_level"), 3);
    assert_eq!(r.out().last_payload("water_level"), Some(r#"{"status":0}"#));
}

#[test]
fn failed_publish_waits_for_next_interval() {
    let mut r = rig(&open_config(), MockSensors::soil(40.0, 20.0), MockInputs::default());
    r.ctl.out_mut().telemetry_down = true;
    r.cycle_after(30);
    r.ctl.out_mut().telemetry_down = false;

    r.cycle_after(30);
    assert_eq!(r.out().publish_count("soil"), 0);
    r.cycle_after(30);
    assert_eq!(r.out().publish_count("soil"), 1);
}

// ── Statistics persistence ────────────────────────────────────

#[test]
fn extremums_survive_a_restart() {
    let mut r = rig(&open_config(), MockSensors::soil(25.0, 20.0), MockInputs::default());
    r.cycle_after(30);

    let mut buf = [0u8; 256];
    let len = r
        .ctl
        .store()
        .read(STORAGE_NAMESPACE, EXTREMUMS_KEY, &mut buf)
        .unwrap();

    let mut store = NvsAdapter::new().unwrap();
    store
        .write(STORAGE_NAMESPACE, EXTREMUMS_KEY, &buf[..len])
        .unwrap();
    let restarted = rig_with_store(
        &open_config(),
        MockSensors::soil(40.0, 20.0),
        MockInputs::default(),
        store,
    );
    let moisture = restarted
        .ctl
        .service()
        .extremums()
        .get(SensorId::SoilMoisture)
        .all_time;
    assert_eq!(moisture.max, Some(25.0));
}

#[test]
fn corrupt_statistics_blob_starts_empty() {
    let mut store = NvsAdapter::new().unwrap();
    store
        .write(STORAGE_NAMESPACE, EXTREMUMS_KEY, &[0xff; 8])
        .unwrap();
    let r = rig_with_store(
        &open_config(),
        MockSensors::soil(40.0, 20.0),
        MockInputs::default(),
        store,
    );
    let moisture = r.ctl.service().extremums().get(SensorId::SoilMoisture).all_time;
    assert_eq!(moisture.max, None);
}

// ── Run-time counters ─────────────────────────────────────────

#[test]
fn run_time_is_published_and_survives_a_restart() {
    let mut r = rig(&open_config(), MockSensors::soil(20.0, 20.0), MockInputs::default());
    r.cycle_after(30);
    assert!(r.running());
    r.cycle_after(600);
    r.sensors().set(SensorId::SoilMoisture, 60.0);
    r.cycle_after(60);
    assert!(!r.running());
    assert_eq!(r.ctl.service().run_time().total, 660);
    assert!(
        r.out()
            .last_payload("watering")
            .is_some_and(|p| p.contains(r#""total":660"#))
    );

    let mut buf = [0u8; 64];
    let len = r
        .ctl
        .store()
        .read(STORAGE_NAMESPACE, RUN_TIME_KEY, &mut buf)
        .unwrap();
    let mut store = NvsAdapter::new().unwrap();
    store
        .write(STORAGE_NAMESPACE, RUN_TIME_KEY, &buf[..len])
        .unwrap();
    let restarted = rig_with_store(
        &open_config(),
        MockSensors::soil(40.0, 20.0),
        MockInputs::default(),
        store,
    );
    assert_eq!(restarted.ctl.service().run_time().total, 660);
}

#[test]
fn suspend_counts_the_interrupted_session() {
    let mut r = rig(
        &fast_config(MIN_PERIOD_MS),
        MockSensors::soil(20.0, 20.0),
        MockInputs::default(),
    );
    r.ctl.run_cycle();
    r.clock.advance(90);
    let signals = r.signals;
    signals.request_suspend();

    std::thread::scope(|s| {
        let ctl = &mut r.ctl;
        let worker = s.spawn(move || ctl.step());
        std::thread::sleep(Duration::from_millis(100));
        signals.request_resume();
        worker.join().unwrap();
    });
    assert_eq!(r.ctl.service().run_time().total, 90);
}

// ── Status LED ────────────────────────────────────────────────

#[test]
fn status_led_follows_priority_and_silent_hours() {
    let mut r = rig(&open_config(), MockSensors::soil(20.0, 20.0), MockInputs::default());
    r.cycle_after(30);
    assert_eq!(r.led().shown, Indicator::Watering);
    assert!(r.led().enabled);

    r.inputs().level_low = true;
    r.signals.level_edge(true);
    r.cycle_after(5);
    assert_eq!(r.led().shown, Indicator::LevelLow);

    r.inputs().leaks[1] = true;
    r.cycle_after(5);
    assert_eq!(r.led().shown, Indicator::Leak);

    r.save_config(&WateringConfig {
        silent_window: ScheduleWindow::from_packed(22_000_700).ok(),
        ..open_config()
    });
    r.clock.set_local(LocalTime::from_civil(2024, 6, 1, 23, 15));
    r.cycle_after(5);
    assert_eq!(r.led().shown, Indicator::Leak);
    assert!(!r.led().enabled, "LED dark in silent hours");
}

// ── Suspend / resume ──────────────────────────────────────────

#[test]
fn stale_resume_does_not_cancel_a_later_suspend() {
    let mut r = rig(
        &fast_config(MIN_PERIOD_MS),
        MockSensors::soil(40.0, 20.0),
        MockInputs::default(),
    );
    let signals = r.signals;
    signals.request_resume();
    r.ctl.step();
    assert_eq!(signals.get() & RESUME, 0, "unpaired resume is dropped");

    signals.request_suspend();
    std::thread::scope(|s| {
        let ctl = &mut r.ctl;
        let worker = s.spawn(move || ctl.step());
        std::thread::sleep(Duration::from_millis(100));
        assert!(!worker.is_finished(), "loop must park on the new suspend");
        signals.request_resume();
        worker.join().unwrap();
    });
    assert_eq!(signals.get() & (SUSPEND | RESUME), 0);
}

#[test]
fn suspend_stops_pump_and_resume_resyncs() {
    let mut r = rig(
        &fast_config(MIN_PERIOD_MS),
        MockSensors::soil(20.0, 20.0),
        MockInputs::default(),
    );
    r.ctl.run_cycle();
    assert!(r.running());
    assert_eq!(r.out().publish_count("soil"), 1);
    let level_reads = r.ctl.hw().inputs.level_reads;

    let signals = r.signals;
    let observer = PumpControl::new(r.pump, r.clock.clone());
    signals.request_suspend();

    std::thread::scope(|s| {
        let ctl = &mut r.ctl;
        let worker = s.spawn(move || ctl.step());

        std::thread::sleep(Duration::from_millis(100));
        assert!(!observer.runtime_state().running, "pump must be off while parked");
        assert!(!worker.is_finished(), "loop must stay parked");

        signals.request_resume();
        worker.join().unwrap();
    });

    assert_eq!(signals.get() & (SUSPEND | RESUME), 0);
    assert!(r.ctl.hw().inputs.level_reads > level_reads, "level re-read on resume");
    assert!(r.running(), "full cycle runs right after resume");
    assert_eq!(r.out().publish_count("soil"), 2, "telemetry forced after resume");
    assert_eq!(
        r.out().messages(NotifyCategory::Watering).len(),
        3,
        "start, finish at suspend, start again"
    );
}
