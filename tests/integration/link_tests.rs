//! Integration tests: ConnectionManager task against a scripted transport.
//!
//! These drive the real async loop (bus, reactor timers, follow-up
//! events) with short timings, and assert on the transport call history
//! and what the observer saw.

use std::sync::Arc;
use std::time::Duration;

use futures_lite::future::{block_on, zip};

use voltsentry::adapters::store::MemoryStore;
use voltsentry::adapters::time::SystemClock;
use voltsentry::alert::AlertCoordinator;
use voltsentry::app::ports::KeyValueStore;
use voltsentry::config::{AlertConfig, LinkConfig, LinkMode};
use voltsentry::error::TransportError;
use voltsentry::link::bus::LinkBus;
use voltsentry::link::manager::ConnectionManager;
use voltsentry::link::{ConnectionState, DeviceId, LAST_DEVICE_KEY, LinkEvent, ScannedDevice};
use voltsentry::protocol::{VoltageLevel, encode};

use crate::mock_ports::{RecordingObserver, ScriptedTransport, TransportCall};

use ConnectionState::{Connected, Connecting, Disconnected, Scanning};

type Manager = ConnectionManager<ScriptedTransport, MemoryStore, SystemClock>;

fn fast_config() -> LinkConfig {
    LinkConfig {
        scan_settle_ms: 5,
        retry_delay_ms: 5,
        rescan_delay_ms: 5,
        ..LinkConfig::default()
    }
}

fn advert(id: &str, rssi: i16, payload: Vec<u8>) -> LinkEvent {
    LinkEvent::Advertisement {
        device: ScannedDevice {
            id: id.into(),
            name: Some("ESSYSTEM-01".into()),
            rssi,
            services: vec![],
        },
        payload,
    }
}

fn manager(cfg: &LinkConfig, transport: ScriptedTransport, store: MemoryStore) -> Manager {
    let alerts = Arc::new(AlertCoordinator::new(vec![], None, &AlertConfig::default()));
    ConnectionManager::new(cfg, transport, store, SystemClock::new(), alerts).unwrap()
}

fn run(m: &mut Manager, bus: &LinkBus) -> RecordingObserver {
    let mut observer = RecordingObserver::default();
    block_on(m.run(bus, &mut observer));
    observer
}

/// Run, posting `Shutdown` after `after`.
fn run_for(m: &mut Manager, bus: &LinkBus, after: Duration) -> RecordingObserver {
    let mut observer = RecordingObserver::default();
    block_on(zip(m.run(bus, &mut observer), async {
        async_io_mini::Timer::after(after).await;
        bus.post(LinkEvent::Shutdown);
    }));
    observer
}

#[test]
fn scan_connect_read_shutdown() {
    let bus = Arc::new(LinkBus::new());
    let transport = ScriptedTransport::new(bus.clone()).on_subscribe(vec![
        LinkEvent::Notification(encode(VoltageLevel::Kv154, 42).to_vec()),
        LinkEvent::Shutdown,
    ]);
    let log = transport.log.clone();
    let mut m = manager(&fast_config(), transport, MemoryStore::new());

    bus.post(LinkEvent::StartScan);
    bus.post(advert("A", -50, vec![]));
    let seen = run(&mut m, &bus);

    assert_eq!(seen.states, [Scanning, Connecting, Connected, Disconnected]);
    assert_eq!(seen.readings.len(), 1);
    assert_eq!(seen.readings[0].voltage(), VoltageLevel::Kv154);
    assert_eq!(seen.readings[0].sequence_number(), 42);
    assert_eq!(seen.cleared, 1);

    assert_eq!(
        *log.borrow(),
        [
            TransportCall::StartScan,
            TransportCall::StopScan,
            TransportCall::Connect(DeviceId::from("A")),
            TransportCall::Subscribe,
            TransportCall::Disconnect,
        ]
    );
    assert_eq!(m.store().get(LAST_DEVICE_KEY).as_deref(), Some("A"));
    assert_eq!(m.machine().pending_timers(), 0);
    assert!(!m.has_session());
    assert_eq!(bus.latest().state, Disconnected);
}

#[test]
fn remembered_device_is_tried_first() {
    let bus = Arc::new(LinkBus::new());
    let transport = ScriptedTransport::new(bus.clone()).on_subscribe(vec![LinkEvent::Shutdown]);
    let log = transport.log.clone();
    let mut store = MemoryStore::new();
    store.put(LAST_DEVICE_KEY, "B").unwrap();
    let mut m = manager(&fast_config(), transport, store);

    bus.post(LinkEvent::StartScan);
    bus.post(advert("A", -40, vec![]));
    bus.post(advert("B", -80, vec![]));
    run(&mut m, &bus);

    let connects: Vec<TransportCall> = log
        .borrow()
        .iter()
        .filter(|c| matches!(c, TransportCall::Connect(_)))
        .cloned()
        .collect();
    assert_eq!(connects, [TransportCall::Connect(DeviceId::from("B"))]);
}

#[test]
fn failed_attempts_are_retried_without_reentering_connecting() {
    let bus = Arc::new(LinkBus::new());
    let transport = ScriptedTransport::new(bus.clone())
        .with_connect_results(vec![
            Err(TransportError::Timeout),
            Err(TransportError::ConnectFailed),
        ])
        .on_subscribe(vec![LinkEvent::Shutdown]);
    let log = transport.log.clone();
    let mut m = manager(&fast_config(), transport, MemoryStore::new());

    bus.post(LinkEvent::StartScan);
    bus.post(advert("A", -50, vec![]));
    let seen = run(&mut m, &bus);

    let connects = log
        .borrow()
        .iter()
        .filter(|c| matches!(c, TransportCall::Connect(_)))
        .count();
    assert_eq!(connects, 3);
    assert_eq!(seen.states, [Scanning, Connecting, Connected, Disconnected]);
}

#[test]
fn exhausted_cycle_gives_up_with_no_timers() {
    let bus = Arc::new(LinkBus::new());
    let transport = ScriptedTransport::new(bus.clone())
        .with_connect_results(vec![Err(TransportError::ConnectFailed)]);
    let cfg = LinkConfig {
        connect_attempts: 1,
        max_failed_cycles: 1,
        ..fast_config()
    };
    let mut m = manager(&cfg, transport, MemoryStore::new());

    bus.post(LinkEvent::StartScan);
    bus.post(advert("A", -50, vec![]));
    let seen = run_for(&mut m, &bus, Duration::from_millis(150));

    assert_eq!(seen.states, [Scanning, Connecting, Disconnected]);
    assert_eq!(m.machine().error_count(), 1);
    assert_eq!(m.machine().pending_timers(), 0);
}

#[test]
fn silence_clears_reading_once() {
    let bus = Arc::new(LinkBus::new());
    let transport = ScriptedTransport::new(bus.clone()).on_subscribe(vec![
        LinkEvent::Notification(encode(VoltageLevel::Kv500, 1).to_vec()),
    ]);
    let cfg = LinkConfig {
        reading_timeout_ms: 20,
        ..fast_config()
    };
    let mut m = manager(&cfg, transport, MemoryStore::new());

    bus.post(LinkEvent::StartScan);
    bus.post(advert("A", -50, vec![]));
    let seen = run_for(&mut m, &bus, Duration::from_millis(200));

    assert_eq!(seen.readings.len(), 1);
    assert_eq!(seen.cleared, 1);
    assert_eq!(seen.states, [Scanning, Connecting, Connected, Disconnected]);
}

#[test]
fn broadcast_mode_never_opens_a_session() {
    let bus = Arc::new(LinkBus::new());
    let transport = ScriptedTransport::new(bus.clone());
    let log = transport.log.clone();
    let cfg = LinkConfig {
        mode: LinkMode::Broadcast,
        ..fast_config()
    };
    let mut m = manager(&cfg, transport, MemoryStore::new());

    bus.post(LinkEvent::StartScan);
    bus.post(advert("A", -50, encode(VoltageLevel::Kv765, 9).to_vec()));
    bus.post(LinkEvent::Shutdown);
    let seen = run(&mut m, &bus);

    assert_eq!(seen.states, [Scanning, Connecting, Connected, Disconnected]);
    assert_eq!(seen.readings[0].voltage(), VoltageLevel::Kv765);
    assert_eq!(*log.borrow(), [TransportCall::StartScan, TransportCall::StopScan]);
}

#[test]
fn deliberate_stop_does_not_rescan() {
    let bus = Arc::new(LinkBus::new());
    let transport = ScriptedTransport::new(bus.clone()).on_subscribe(vec![LinkEvent::Stop]);
    let log = transport.log.clone();
    let mut m = manager(&fast_config(), transport, MemoryStore::new());

    bus.post(LinkEvent::StartScan);
    bus.post(advert("A", -50, vec![]));
    let seen = run_for(&mut m, &bus, Duration::from_millis(150));

    assert_eq!(seen.states, [Scanning, Connecting, Connected, Disconnected]);
    let scans = log
        .borrow()
        .iter()
        .filter(|c| **c == TransportCall::StartScan)
        .count();
    assert_eq!(scans, 1);
}

#[test]
fn stop_gets_through_a_flooded_bus() {
    let bus = Arc::new(LinkBus::new());
    let transport = ScriptedTransport::new(bus.clone());
    let log = transport.log.clone();
    let mut m = manager(&fast_config(), transport, MemoryStore::new());

    bus.post(LinkEvent::StartScan);
    let stranger = LinkEvent::Advertisement {
        device: ScannedDevice {
            id: "Z".into(),
            name: Some("Speaker".into()),
            rssi: -40,
            services: vec![],
        },
        payload: vec![],
    };
    while bus.post(stranger.clone()) {}

    assert!(bus.post(LinkEvent::Stop));
    assert!(bus.post(LinkEvent::Shutdown));
    let seen = run(&mut m, &bus);

    assert_eq!(seen.states, [Scanning, Disconnected]);
    assert!(log.borrow().contains(&TransportCall::StopScan));
    assert_eq!(m.machine().pending_timers(), 0);
}
