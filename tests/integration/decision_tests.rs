//! End-to-end decision scenarios: sensors → WateringService → pump driver,
//! driven one cycle at a time through the real `ControlLoop`.

use super::mock_hw::{MockInputs, MockSensors, Rig, open_config, rig};

use watering::app::events::NotifyCategory;
use watering::clock::LocalTime;
use watering::config::{WateringConfig, WateringMode};
use watering::control::{DecisionReason, ScheduleWindow};
use watering::sensors::SensorId;

const CYCLE: u64 = 30;

fn reason(r: &Rig) -> DecisionReason {
    r.ctl.service().last_decision().unwrap().reason
}

fn sensors_rig(moisture: f32) -> Rig {
    rig(&open_config(), MockSensors::soil(moisture, 20.0), MockInputs::default())
}

// ── Moisture scenarios ────────────────────────────────────────

#[test]
fn moisture_above_min_does_not_start() {
    let mut r = sensors_rig(35.0);
    r.cycle_after(CYCLE);
    assert!(!r.running());
    assert_eq!(reason(&r), DecisionReason::MoistureSatisfied);
}

#[test]
fn moisture_at_min_starts_then_runs_until_max() {
    let mut r = sensors_rig(30.0);

    r.cycle_after(CYCLE);
    assert!(r.running(), "moisture == min must start");
    assert_eq!(reason(&r), DecisionReason::Watering);

    r.sensors().set(SensorId::SoilMoisture, 45.0);
    r.cycle_after(CYCLE);
    assert!(r.running(), "below max keeps watering");

    r.sensors().set(SensorId::SoilMoisture, 51.0);
    r.cycle_after(CYCLE);
    assert!(!r.running());
    assert_eq!(reason(&r), DecisionReason::MoistureSatisfied);

    let watering = r.out().messages(NotifyCategory::Watering);
    assert_eq!(
        watering,
        vec![
            "Watering started (moisture 30.0%, soil 20.0\u{00b0}C)",
            "Watering finished, ran 00:01:00",
        ]
    );
}

#[test]
fn moisture_inside_band_keeps_previous_state() {
    let mut r = sensors_rig(40.0);
    for _ in 0..5 {
        r.cycle_after(CYCLE);
        assert!(!r.running());
    }
}

#[test]
fn invalid_moisture_stops_watering() {
    let mut r = sensors_rig(20.0);
    r.cycle_after(CYCLE);
    assert!(r.running());

    r.sensors().invalidate(SensorId::SoilMoisture);
    r.cycle_after(CYCLE);
    assert!(!r.running());
    assert_eq!(reason(&r), DecisionReason::MoistureInvalid);
}

#[test]
fn cold_soil_blocks_start() {
    let mut r = rig(
        &open_config(),
        MockSensors::soil(20.0, 5.0),
        MockInputs::default(),
    );
    r.cycle_after(CYCLE);
    assert!(!r.running());
    assert_eq!(reason(&r), DecisionReason::TemperatureOutOfBand);
}

// ── Leak handling ─────────────────────────────────────────────

#[test]
fn leak_clears_only_after_full_debounce() {
    let mut r = sensors_rig(40.0);
    r.inputs().leaks[0] = true;
    r.cycle_after(CYCLE);
    assert_eq!(reason(&r), DecisionReason::Leak);
    assert_eq!(
        r.out().messages(NotifyCategory::Leak),
        vec!["Overflow detected on input #1"]
    );

    r.inputs().leaks[0] = false;
    for i in 1..100 {
        r.cycle_after(CYCLE);
        assert!(
            r.ctl.service().leaks().any_leak(),
            "leak must persist after {i} clean samples"
        );
    }
    r.cycle_after(CYCLE);
    assert!(!r.ctl.service().leaks().any_leak());
    assert_eq!(
        r.out().messages(NotifyCategory::Leak),
        vec!["Overflow detected on input #1", "Overflow on input #1 cleared"]
    );
}

#[test]
fn leak_overrides_forced_mode() {
    let cfg = WateringConfig {
        mode: WateringMode::Forced,
        ..open_config()
    };
    let mut r = rig(&cfg, MockSensors::soil(20.0, 20.0), MockInputs::default());
    r.cycle_after(CYCLE);
    assert!(r.running());

    r.inputs().leaks[2] = true;
    r.cycle_after(CYCLE);
    assert!(!r.running());
    assert_eq!(reason(&r), DecisionReason::Leak);
}

#[test]
fn disabled_leak_channel_is_not_sampled() {
    let mut cfg = open_config();
    cfg.leak_sensor_enabled = [true, false, true];
    let mut r = rig(&cfg, MockSensors::soil(20.0, 20.0), MockInputs::default());
    r.inputs().leaks[1] = true;
    r.cycle_after(CYCLE);
    assert!(r.running());
    assert_eq!(r.inputs().leak_reads, [1, 0, 1]);
}

#[test]
fn failed_leak_read_keeps_confirmed_state() {
    let mut r = sensors_rig(40.0);
    r.inputs().leaks[0] = true;
    r.cycle_after(CYCLE);
    assert!(r.ctl.service().leaks().any_leak());

    r.inputs().failing[0] = true;
    r.inputs().leaks[0] = false;
    for _ in 0..150 {
        r.cycle_after(CYCLE);
    }
    assert!(r.ctl.service().leaks().any_leak());
}

// ── Level switch ──────────────────────────────────────────────

#[test]
fn level_low_at_startup_blocks_and_notifies_with_sound() {
    let inputs = MockInputs {
        level_low: true,
        ..MockInputs::default()
    };
    let mut r = rig(&open_config(), MockSensors::soil(20.0, 20.0), inputs);
    let level: Vec<_> = r
        .out()
        .notifications
        .iter()
        .filter(|n| n.category == NotifyCategory::Level)
        .collect();
    assert_eq!(level.len(), 1);
    assert_eq!(level[0].message.as_str(), "Water level is low");
    assert!(level[0].sound);

    r.cycle_after(CYCLE);
    assert!(!r.running());
    assert_eq!(reason(&r), DecisionReason::LevelLow);
}

#[test]
fn level_edge_restores_watering() {
    let inputs = MockInputs {
        level_low: true,
        ..MockInputs::default()
    };
    let mut r = rig(&open_config(), MockSensors::soil(20.0, 20.0), inputs);
    r.cycle_after(CYCLE);
    assert!(!r.running());

    r.signals.level_edge(false);
    r.cycle_after(CYCLE);
    assert!(r.running());
    assert_eq!(
        r.out().messages(NotifyCategory::Level),
        vec!["Water level is low", "Water level restored"]
    );
}

#[test]
fn persistent_low_level_is_renotified_every_period() {
    let inputs = MockInputs {
        level_low: true,
        ..MockInputs::default()
    };
    let mut r = rig(&open_config(), MockSensors::soil(20.0, 20.0), inputs);
    r.cycle_after(CYCLE);
    assert_eq!(r.out().messages(NotifyCategory::Level).len(), 1);

    r.cycle_after(12 * 3600);
    assert_eq!(r.out().messages(NotifyCategory::Level).len(), 2);
    r.cycle_after(CYCLE);
    assert_eq!(r.out().messages(NotifyCategory::Level).len(), 2);
}

#[test]
fn disabled_level_sensor_consumes_edges_silently() {
    let cfg = WateringConfig {
        level_sensor_enabled: false,
        ..open_config()
    };
    let mut r = rig(&cfg, MockSensors::soil(20.0, 20.0), MockInputs::default());
    r.signals.level_edge(true);
    r.cycle_after(CYCLE);
    assert!(r.running());
    assert_eq!(r.signals.get() & watering::events::LEVEL_CHANGED, 0);
    assert!(r.out().messages(NotifyCategory::Level).is_empty());
}

// ── Mode, window, duration ────────────────────────────────────

#[test]
fn outside_window_blocks_and_unknown_time_is_open() {
    let cfg = WateringConfig {
        schedule_window: Some(ScheduleWindow::from_packed(21000600).unwrap()),
        ..open_config()
    };
    let mut r = rig(&cfg, MockSensors::soil(20.0, 20.0), MockInputs::default());

    // Clock not yet synchronised.
    r.cycle_after(CYCLE);
    assert!(r.running());

    r.clock.set_local(LocalTime::from_civil(2024, 6, 1, 12, 0));
    r.cycle_after(CYCLE);
    assert!(!r.running());
    assert_eq!(reason(&r), DecisionReason::OutsideWindow);

    r.clock.set_local(LocalTime::from_civil(2024, 6, 1, 23, 30));
    r.cycle_after(CYCLE);
    assert!(r.running());
}

#[test]
fn forced_mode_ignores_moisture() {
    let cfg = WateringConfig {
        mode: WateringMode::Forced,
        ..open_config()
    };
    let mut r = rig(&cfg, MockSensors::soil(90.0, 20.0), MockInputs::default());
    r.cycle_after(CYCLE);
    assert!(r.running());
    assert_eq!(reason(&r), DecisionReason::Forced);
}

/// The guard only cuts a running session; it never blocks a restart.
#[test]
fn duration_guard_stops_session_but_allows_restart() {
    let cfg = WateringConfig {
        mode: WateringMode::Forced,
        max_duration_minutes: 120,
        ..open_config()
    };
    let mut r = rig(&cfg, MockSensors::soil(20.0, 20.0), MockInputs::default());
    r.cycle_after(CYCLE);
    assert!(r.running());

    r.cycle_after(121 * 60);
    assert!(!r.running());
    assert_eq!(reason(&r), DecisionReason::DurationExceeded);

    r.cycle_after(CYCLE);
    assert!(r.running());
}

#[test]
fn mode_off_stops_running_pump() {
    let mut r = sensors_rig(20.0);
    r.cycle_after(CYCLE);
    assert!(r.running());

    r.save_config(&WateringConfig {
        mode: WateringMode::Off,
        ..open_config()
    });
    r.cycle_after(CYCLE);
    assert!(!r.running());
    assert_eq!(reason(&r), DecisionReason::ModeOff);
}
