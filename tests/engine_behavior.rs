//! Behavioral tests for the reconciliation loop.
//!
//! These drive the full engine against the scripted bus and the recording
//! notifier, covering device lifecycle edge cases (re-add before flush,
//! adjacent removals), the suppression rules, replace semantics and the
//! device filters.

use std::time::Duration;

use pwatch::device::{
    DeviceLevel, DeviceProperties, DeviceState, DeviceType, PropertySnapshot, PropertyUpdate,
};
use pwatch::engine::{Engine, EngineOptions};
use pwatch::notify::Severity;
use pwatch::notify::mock::{Delivery, MockNotifier};
use pwatch::source::BusEvent;
use pwatch::source::mock::MockSource;

fn battery(model: &str, percentage: f64) -> DeviceProperties {
    DeviceProperties {
        native_path: "BAT0".into(),
        model: model.into(),
        power_supply: true,
        device_type: DeviceType::Battery,
        snapshot: PropertySnapshot {
            online: false,
            percentage,
            state: DeviceState::Discharging,
            warning_level: DeviceLevel::None,
            battery_level: DeviceLevel::None,
        },
    }
}

fn line_power(native_path: &str) -> DeviceProperties {
    DeviceProperties {
        native_path: native_path.into(),
        model: String::new(),
        power_supply: true,
        device_type: DeviceType::LinePower,
        snapshot: PropertySnapshot {
            online: false,
            ..PropertySnapshot::default()
        },
    }
}

fn wireless_mouse(model: &str) -> DeviceProperties {
    DeviceProperties {
        native_path: "hidpp_battery_0".into(),
        model: model.into(),
        power_supply: false,
        device_type: DeviceType::Mouse,
        snapshot: PropertySnapshot {
            percentage: 70.0,
            state: DeviceState::Discharging,
            warning_level: DeviceLevel::None,
            battery_level: DeviceLevel::None,
            online: false,
        },
    }
}

fn state_update(state: DeviceState, percentage: f64) -> PropertyUpdate {
    PropertyUpdate {
        state: Some(state),
        percentage: Some(percentage),
        ..PropertyUpdate::default()
    }
}

fn warning_update(level: DeviceLevel) -> PropertyUpdate {
    PropertyUpdate {
        warning_level: Some(level),
        ..PropertyUpdate::default()
    }
}

/// Bootstrap the engine over the given devices and run one pass, so the
/// initial unknown-to-real transitions are dispatched and committed.
async fn settled_engine(
    devices: Vec<(&str, DeviceProperties)>,
    options: EngineOptions,
) -> Engine<MockSource, MockNotifier> {
    let mut source = MockSource::new();
    for (path, props) in devices {
        source.add_device(path, props);
    }
    let mut engine = Engine::new(source, MockNotifier::new(), options);
    engine.bootstrap().await.unwrap();
    engine.tick().await.unwrap();
    engine
}

/// Deliveries recorded after the given baseline count.
fn new_deliveries(engine: &Engine<MockSource, MockNotifier>, baseline: usize) -> &[Delivery] {
    &engine.notifier().sent()[baseline..]
}

#[tokio::test]
async fn bootstrap_announces_current_state() {
    let engine = settled_engine(
        vec![("/d1", battery("BAT0", 80.0))],
        EngineOptions::default(),
    )
    .await;

    let sent = engine.notifier().sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].note.category, "power.update");
    assert_eq!(sent[0].note.title, "Power status: BAT0");
    assert_eq!(sent[0].note.body, "Battery discharging\nCurrent level: 80%");
    assert_eq!(sent[0].note.severity, Severity::Normal);
}

#[tokio::test]
async fn battery_empty_is_critical_with_percentage() {
    let mut engine = settled_engine(
        vec![("/d1", battery("BAT0", 80.0))],
        EngineOptions::default(),
    )
    .await;
    let baseline = engine.notifier().sent().len();
    let first_handle = engine.notifier().sent()[0].handle;

    engine
        .source_mut()
        .push_changed("/d1", state_update(DeviceState::Empty, 12.0));
    engine.tick().await.unwrap();

    let sent = new_deliveries(&engine, baseline);
    assert_eq!(sent.len(), 1);
    let delivery = &sent[0];
    assert_eq!(delivery.note.category, "power.update");
    assert_eq!(delivery.note.severity, Severity::Critical);
    assert_eq!(delivery.note.title, "Power status: BAT0");
    assert!(delivery.note.body.contains("Battery empty"));
    assert!(delivery.note.body.contains("12%"));
    // Second state change replaces the first popup in place.
    assert_eq!(delivery.replaces, Some(first_handle));
}

#[tokio::test]
async fn power_supply_online_transition() {
    let mut engine = settled_engine(
        vec![("/d2", line_power("AC"))],
        EngineOptions::default(),
    )
    .await;
    // No model, nothing changed at bootstrap: nothing announced yet.
    assert!(engine.notifier().sent().is_empty());

    engine.source_mut().push_changed(
        "/d2",
        PropertyUpdate {
            online: Some(true),
            ..PropertyUpdate::default()
        },
    );
    engine.tick().await.unwrap();

    let sent = engine.notifier().sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].note.category, "power.online");
    assert_eq!(sent[0].note.body, "Power supply online");
    assert_eq!(sent[0].note.severity, Severity::Normal);
    assert_eq!(sent[0].note.title, "Power status: AC (line power)");
    assert_eq!(engine.notifier().count_category("power.update"), 0);
}

#[tokio::test]
async fn removal_notifies_once_and_forgets_the_device() {
    let mut engine = settled_engine(
        vec![("/d3", battery("BAT1", 50.0))],
        EngineOptions::default(),
    )
    .await;
    let baseline = engine.notifier().sent().len();

    engine.source_mut().push_removed("/d3");
    engine.tick().await.unwrap();

    let sent = new_deliveries(&engine, baseline);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].note.category, "device.removed");
    assert_eq!(sent[0].note.title, "Power status: BAT1");
    assert_eq!(sent[0].note.body, "Device disconnected");
    assert_eq!(sent[0].replaces, None);

    assert!(engine.registry().active().is_empty());
    assert!(engine.registry().removed().is_empty());
    assert!(!engine.source_mut().is_watched("/d3"));
}

#[tokio::test]
async fn readd_before_flush_keeps_record_and_handles() {
    let mut engine = settled_engine(
        vec![("/d1", battery("BAT0", 80.0))],
        EngineOptions::default(),
    )
    .await;
    let baseline = engine.notifier().sent().len();
    let original_handle = engine.notifier().sent()[0].handle;

    // Removed and re-added within the same pass: the device never really
    // left.
    engine.source_mut().push_removed("/d1");
    engine.source_mut().push_added("/d1");
    engine.tick().await.unwrap();

    assert_eq!(engine.notifier().count_category("device.removed"), 0);
    assert_eq!(engine.registry().active().len(), 1);
    assert!(engine.registry().removed().is_empty());
    assert_eq!(new_deliveries(&engine, baseline).len(), 0);

    // The next state change still replaces the pre-removal popup.
    engine
        .source_mut()
        .push_changed("/d1", state_update(DeviceState::Charging, 81.0));
    engine.tick().await.unwrap();
    assert_eq!(
        engine.notifier().last().unwrap().replaces,
        Some(original_handle)
    );
}

#[tokio::test]
async fn unknown_state_reading_is_dropped() {
    let mut engine = settled_engine(
        vec![("/d1", battery("BAT0", 80.0))],
        EngineOptions::default(),
    )
    .await;
    let baseline = engine.notifier().sent().len();

    engine
        .source_mut()
        .push_changed("/d1", state_update(DeviceState::Unknown, 79.0));
    engine.tick().await.unwrap();

    assert_eq!(new_deliveries(&engine, baseline).len(), 0);
    let record = engine.registry().find_active("/d1").unwrap();
    // The unknown reading is gone entirely; both snapshots keep the last
    // trustworthy state.
    assert_eq!(record.current.state, DeviceState::Discharging);
    assert_eq!(record.last.state, DeviceState::Discharging);
}

#[tokio::test]
async fn warning_startup_noise_is_suppressed() {
    let engine = settled_engine(
        vec![("/d1", battery("BAT0", 80.0))],
        EngineOptions::default(),
    )
    .await;

    // Bootstrap went unknown -> none for the warning level: no "cleared"
    // popup for a device that never warned.
    assert_eq!(engine.notifier().count_category("power.cleared"), 0);
}

#[tokio::test]
async fn warning_clears_with_normal_severity_after_a_real_warning() {
    let mut engine = settled_engine(
        vec![("/d1", battery("BAT0", 80.0))],
        EngineOptions::default(),
    )
    .await;

    engine
        .source_mut()
        .push_changed("/d1", warning_update(DeviceLevel::Low));
    engine.tick().await.unwrap();
    assert_eq!(engine.notifier().last().unwrap().note.category, "power.low");
    assert_eq!(
        engine.notifier().last().unwrap().note.severity,
        Severity::Critical
    );

    engine
        .source_mut()
        .push_changed("/d1", warning_update(DeviceLevel::None));
    engine.tick().await.unwrap();
    let cleared = engine.notifier().last().unwrap();
    assert_eq!(cleared.note.category, "power.cleared");
    assert_eq!(cleared.note.severity, Severity::Normal);
    assert_eq!(cleared.note.body, "Warning cleared");
}

#[tokio::test]
async fn warning_only_change_dispatches_one_notification() {
    let mut engine = settled_engine(
        vec![("/d1", battery("BAT0", 80.0))],
        EngineOptions::default(),
    )
    .await;
    let baseline = engine.notifier().sent().len();

    engine
        .source_mut()
        .push_changed("/d1", warning_update(DeviceLevel::Discharging));
    engine.tick().await.unwrap();

    let sent = new_deliveries(&engine, baseline);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].note.category, "power.discharging");
}

#[tokio::test]
async fn adjacent_removals_flush_in_one_pass() {
    let mut engine = settled_engine(
        vec![
            ("/d1", battery("BAT0", 80.0)),
            ("/d2", battery("BAT1", 60.0)),
            ("/d3", battery("BAT2", 40.0)),
        ],
        EngineOptions::default(),
    )
    .await;
    let baseline = engine.notifier().sent().len();

    // Two adjacent devices removed in the same pass must both flush; a
    // remove-by-index loop would skip the second.
    engine.source_mut().push_removed("/d1");
    engine.source_mut().push_removed("/d2");
    engine.tick().await.unwrap();

    let removals: Vec<_> = new_deliveries(&engine, baseline)
        .iter()
        .filter(|d| d.note.category == "device.removed")
        .map(|d| d.note.title.clone())
        .collect();
    assert_eq!(
        removals,
        vec!["Power status: BAT0", "Power status: BAT1"]
    );
    assert_eq!(engine.registry().active().len(), 1);
    assert!(engine.registry().removed().is_empty());
}

#[tokio::test]
async fn skip_initial_mutes_startup_state_only() {
    let mut source = MockSource::new();
    source.add_device("/d1", battery("BAT0", 80.0));
    // Arrives on a wake after the settle window is over.
    source.push_later(vec![BusEvent::PropertiesChanged {
        path: "/d1".into(),
        update: warning_update(DeviceLevel::Low),
    }]);

    let options = EngineOptions {
        skip_initial: true,
        settle_delay: Duration::ZERO,
        ..EngineOptions::default()
    };
    let mut engine = Engine::new(source, MockNotifier::new(), options);

    // Runs until the script is exhausted and the transport "dies".
    let err = engine.run().await.unwrap_err();
    assert!(err.is_fatal());

    let sent = engine.notifier().sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].note.category, "power.low");
}

#[tokio::test]
async fn power_supplies_only_filters_peripherals() {
    let options = EngineOptions {
        power_supplies_only: true,
        ..EngineOptions::default()
    };
    let mut engine = settled_engine(
        vec![
            ("/d1", battery("BAT0", 80.0)),
            ("/mouse", wireless_mouse("MX Anywhere")),
        ],
        options,
    )
    .await;

    // Only the power-supply battery announced itself.
    assert_eq!(engine.notifier().sent().len(), 1);
    assert_eq!(engine.notifier().sent()[0].note.title, "Power status: BAT0");

    // Peripheral changes and removals stay silent.
    engine
        .source_mut()
        .push_changed("/mouse", warning_update(DeviceLevel::Low));
    engine.source_mut().push_removed("/mouse");
    engine.tick().await.unwrap();
    assert_eq!(engine.notifier().sent().len(), 1);
    assert!(engine.registry().find_active("/mouse").is_none());
}

#[tokio::test]
async fn ignored_types_stay_silent() {
    let options = EngineOptions {
        ignored_types: vec![DeviceType::LinePower],
        ..EngineOptions::default()
    };
    let mut engine = settled_engine(vec![("/ac", line_power("AC"))], options).await;

    engine.source_mut().push_changed(
        "/ac",
        PropertyUpdate {
            online: Some(true),
            ..PropertyUpdate::default()
        },
    );
    engine.source_mut().push_removed("/ac");
    engine.tick().await.unwrap();

    assert!(engine.notifier().sent().is_empty());
}

#[tokio::test]
async fn lookup_failure_keeps_the_loop_and_the_record() {
    let mut source = MockSource::new();
    source.add_device("/flaky", battery("FLAKY", 10.0));
    source.add_device("/d1", battery("BAT0", 80.0));
    source.fail_queries_for("/flaky");

    let mut engine = Engine::new(source, MockNotifier::new(), EngineOptions::default());
    engine.bootstrap().await.unwrap();
    engine.tick().await.unwrap();

    // Both records exist; only the healthy one had data to announce.
    assert_eq!(engine.registry().active().len(), 2);
    assert_eq!(engine.notifier().sent().len(), 1);
    assert_eq!(engine.notifier().sent()[0].note.title, "Power status: BAT0");
}

#[tokio::test]
async fn notifier_failure_is_fatal() {
    let mut source = MockSource::new();
    source.add_device("/d1", battery("BAT0", 80.0));
    let mut notifier = MockNotifier::new();
    notifier.inject_failure("notification service gone");

    let mut engine = Engine::new(source, notifier, EngineOptions::default());
    engine.bootstrap().await.unwrap();

    let err = engine.tick().await.unwrap_err();
    assert!(err.is_fatal());
}
