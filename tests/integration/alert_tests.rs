//! Integration tests: AlertCoordinator against recording output mocks.

use std::sync::{Arc, Mutex};
use std::thread;

use voltsentry::alert::AlertCoordinator;
use voltsentry::alert::coordinator::TriggerOutcome;
use voltsentry::alert::ChannelKind;
use voltsentry::app::ports::AlertChannel;
use voltsentry::config::AlertConfig;
use voltsentry::protocol::VoltageLevel;

use crate::mock_ports::{CallLog, ChannelCall, MockChannel, MockWake, mock_outputs, starts};

fn coordinator(log: &CallLog) -> AlertCoordinator {
    AlertCoordinator::new(
        mock_outputs(log),
        Some(Box::new(MockWake::new(log))),
        &AlertConfig::default(),
    )
}

fn new_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

#[test]
fn every_safe_or_diagnostic_level_is_ignored() {
    let log = new_log();
    let a = coordinator(&log);
    for v in VoltageLevel::ALL.into_iter().filter(|v| !v.is_dangerous()) {
        assert_eq!(a.trigger(v), TriggerOutcome::Ignored, "{v}");
    }
    assert!(!a.is_active());
    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn triggers_then_stop_all_leaves_inactive() {
    let log = new_log();
    let a = coordinator(&log);
    for _ in 0..5 {
        a.trigger(VoltageLevel::Kv765);
    }
    assert_eq!(starts(&log), 3);
    a.stop_all();
    assert!(!a.is_active());

    let calls = log.lock().unwrap().clone();
    for kind in [ChannelKind::Audible, ChannelKind::Haptic, ChannelKind::Visual] {
        assert!(calls.contains(&ChannelCall::Stop(kind)), "{kind} not stopped");
    }
    assert_eq!(calls.last(), Some(&ChannelCall::Release));
}

#[test]
fn stop_all_without_alert_touches_nothing() {
    let log = new_log();
    let a = coordinator(&log);
    assert!(!a.stop_all());
    assert!(!a.stop_all());
    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn degraded_when_an_output_is_missing() {
    let log = new_log();
    let channels: Vec<Box<dyn AlertChannel>> = vec![
        Box::new(MockChannel::unavailable(ChannelKind::Audible, &log)),
        Box::new(MockChannel::new(ChannelKind::Haptic, &log)),
        Box::new(MockChannel::new(ChannelKind::Visual, &log)),
    ];
    let a = AlertCoordinator::new(channels, None, &AlertConfig::default());
    assert_eq!(
        a.trigger(VoltageLevel::Kv154),
        TriggerOutcome::Started {
            channels: 2,
            degraded: 1
        }
    );
    assert!(a.is_active());
    assert!(a.stop_all());
    assert!(!a.is_active());
}

#[test]
fn no_outputs_at_all_is_not_active() {
    let a = AlertCoordinator::new(Vec::new(), None, &AlertConfig::default());
    assert_eq!(
        a.trigger(VoltageLevel::Kv154),
        TriggerOutcome::Unavailable { degraded: 0 }
    );
    assert!(!a.is_active());
}

#[test]
fn every_output_failing_leaves_wake_untouched() {
    let log = new_log();
    let channels: Vec<Box<dyn AlertChannel>> = vec![
        Box::new(MockChannel::unavailable(ChannelKind::Audible, &log)),
        Box::new(MockChannel::unavailable(ChannelKind::Haptic, &log)),
        Box::new(MockChannel::unavailable(ChannelKind::Visual, &log)),
    ];
    let a = AlertCoordinator::new(
        channels,
        Some(Box::new(MockWake::new(&log))),
        &AlertConfig::default(),
    );
    assert_eq!(
        a.trigger(VoltageLevel::Kv500),
        TriggerOutcome::Unavailable { degraded: 3 }
    );
    assert!(!a.is_active());
    assert!(
        !log.lock()
            .unwrap()
            .iter()
            .any(|c| matches!(c, ChannelCall::Acquire(_)))
    );
}

#[test]
fn concurrent_trigger_and_stop_paths() {
    let log = new_log();
    let a = Arc::new(coordinator(&log));

    let workers: Vec<_> = (0..4)
        .map(|i| {
            let a = a.clone();
            thread::spawn(move || {
                for _ in 0..50 {
                    if i % 2 == 0 {
                        a.trigger(VoltageLevel::Kv345);
                    } else {
                        a.stop_all();
                    }
                }
            })
        })
        .collect();
    for w in workers {
        w.join().unwrap();
    }

    // Starts and stops per channel must alternate: never two starts in a row.
    let calls = log.lock().unwrap().clone();
    for kind in [ChannelKind::Audible, ChannelKind::Haptic, ChannelKind::Visual] {
        let mut running = false;
        for c in &calls {
            match c {
                ChannelCall::Start(k, _) if *k == kind => {
                    assert!(!running, "{kind} double-started");
                    running = true;
                }
                ChannelCall::Stop(k) if *k == kind => {
                    assert!(running, "{kind} stopped while idle");
                    running = false;
                }
                _ => {}
            }
        }
    }

    a.stop_all();
    assert!(!a.is_active());
}
