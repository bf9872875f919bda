//! Integration tests: decoder → Pipeline → journal + alert coordinator.

use std::sync::{Arc, Mutex};

use voltsentry::alert::AlertCoordinator;
use voltsentry::app::ports::{Clock, LinkObserver};
use voltsentry::app::{AppCommand, Pipeline, PipelineEvent};
use voltsentry::config::{AlertConfig, JournalConfig};
use voltsentry::link::LinkEvent;
use voltsentry::link::bus::{BUS_DEPTH, LinkBus};
use voltsentry::protocol::{PacketDecoder, PayloadSource, Reading, VoltageLevel, encode};

use crate::mock_ports::{
    CallLog, ChannelCall, FlakyLogSink, ManualClock, MockWake, RecordingEvents, mock_outputs,
    starts,
};

struct Rig {
    pipeline: Pipeline<FlakyLogSink, RecordingEvents>,
    alerts: Arc<AlertCoordinator>,
    log: CallLog,
    clock: ManualClock,
    decoder: PacketDecoder,
}

impl Rig {
    fn new() -> Self {
        let log: CallLog = Arc::new(Mutex::new(Vec::new()));
        let alerts = Arc::new(AlertCoordinator::new(
            mock_outputs(&log),
            Some(Box::new(MockWake::new(&log))),
            &AlertConfig::default(),
        ));
        Self {
            pipeline: Pipeline::new(
                FlakyLogSink::default(),
                RecordingEvents::default(),
                alerts.clone(),
                JournalConfig::default(),
            ),
            alerts,
            log,
            clock: ManualClock::new(),
            decoder: PacketDecoder::default(),
        }
    }

    /// Decode a long packet one second after the previous one and feed it.
    fn inject(&mut self, voltage: VoltageLevel, seq: u16) -> Reading {
        let at = self.clock.advance(1000).wall;
        let reading = self
            .decoder
            .decode(&encode(voltage, seq), PayloadSource::Session, at)
            .unwrap();
        self.pipeline.on_reading(&reading);
        reading
    }

    fn lines(&self) -> Vec<String> {
        self.pipeline.visible_lines().unwrap()
    }

    fn raised(&self) -> usize {
        self.pipeline
            .events()
            .count(|e| matches!(e, PipelineEvent::AlertRaised(_)))
    }
}

// ── End-to-end: 154KV seq 42, then three repeats ─────────────

#[test]
fn danger_packet_logs_once_and_alerts_once() {
    let mut rig = Rig::new();
    let first = rig.inject(VoltageLevel::Kv154, 42);

    let stamp = first.timestamp().format("%Y/%m/%d %H:%M:%S");
    assert_eq!(rig.lines(), [format!("1. {stamp} 154KV")]);
    assert_eq!(rig.alerts.trigger_count(), 1);
    assert_eq!(starts(&rig.log), 3);
    assert!(rig.alerts.is_active());
    assert!(
        rig.log
            .lock()
            .unwrap()
            .contains(&ChannelCall::Acquire(std::time::Duration::from_secs(600)))
    );

    for seq in 43..=45 {
        rig.inject(VoltageLevel::Kv154, seq);
    }

    // Entries 1..3 visible, the 4th stored but suppressed.
    let lines = rig.lines();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("3. "));
    let stored = rig.pipeline.journal().sink().inner.entries();
    assert_eq!(stored.len(), 4);
    assert!(stored[3].is_suppressed);
    assert_eq!(stored[3].sequence_number, 45);

    // Already active: no second trigger, no channel restarted.
    assert_eq!(rig.alerts.trigger_count(), 1);
    assert_eq!(starts(&rig.log), 3);
    assert_eq!(rig.raised(), 1);
}

#[test]
fn same_second_repeat_is_not_journaled() {
    let mut rig = Rig::new();
    let at = rig.clock.advance(1000).wall;
    let pkt = encode(VoltageLevel::V220, 1);
    let r = rig.decoder.decode(&pkt, PayloadSource::Session, at).unwrap();
    rig.pipeline.on_reading(&r);
    rig.pipeline.on_reading(&r);
    assert_eq!(rig.lines().len(), 1);
    assert_eq!(rig.pipeline.journal().sink().inner.entries().len(), 1);
}

#[test]
fn alternating_levels_never_suppress() {
    let mut rig = Rig::new();
    for i in 0..10u16 {
        let v = if i % 2 == 0 { VoltageLevel::V220 } else { VoltageLevel::V380 };
        rig.inject(v, i);
    }
    assert_eq!(rig.lines().len(), 10);
}

#[test]
fn journal_is_capped_at_99() {
    let mut rig = Rig::new();
    for i in 0..120u16 {
        let v = if i % 2 == 0 { VoltageLevel::V220 } else { VoltageLevel::V380 };
        rig.inject(v, i);
    }
    let stored = rig.pipeline.journal().sink().inner.entries();
    assert_eq!(stored.len(), 99);
    assert_eq!(stored[0].sequence_number, 21);
    assert!(rig.lines()[0].starts_with("99. "));
}

#[test]
fn lost_reading_stops_alerts_and_rearms() {
    let mut rig = Rig::new();
    rig.inject(VoltageLevel::Kv345, 1);
    assert!(rig.alerts.is_active());

    rig.pipeline.on_reading_cleared();
    assert!(!rig.alerts.is_active());
    assert!(rig.pipeline.current_reading().is_none());
    assert!(rig.log.lock().unwrap().contains(&ChannelCall::Release));

    rig.inject(VoltageLevel::Kv345, 2);
    assert_eq!(rig.alerts.trigger_count(), 2);
    assert_eq!(rig.raised(), 2);
}

#[test]
fn new_danger_level_retargets_instead_of_restarting() {
    let mut rig = Rig::new();
    rig.inject(VoltageLevel::Kv154, 1);
    rig.inject(VoltageLevel::Kv765, 2);
    assert_eq!(starts(&rig.log), 3);
    assert_eq!(rig.alerts.active_voltage(), Some(VoltageLevel::Kv765));
    let retargets = rig
        .log
        .lock()
        .unwrap()
        .iter()
        .filter(|c| matches!(c, ChannelCall::Retarget(_, VoltageLevel::Kv765)))
        .count();
    assert_eq!(retargets, 3);
}

#[test]
fn safe_reading_never_alerts() {
    let mut rig = Rig::new();
    rig.inject(VoltageLevel::V220, 1);
    rig.inject(VoltageLevel::V380, 2);
    assert!(!rig.alerts.is_active());
    assert_eq!(rig.alerts.trigger_count(), 0);
}

#[test]
fn storage_failure_is_reported_and_alert_still_raised() {
    let mut rig = Rig::new();
    // Rig owns the sink through the pipeline; rebuild with a failing one.
    let mut sink = FlakyLogSink::default();
    sink.fail_inserts = true;
    let mut pipeline = Pipeline::new(
        sink,
        RecordingEvents::default(),
        rig.alerts.clone(),
        JournalConfig::default(),
    );
    let r = rig
        .decoder
        .decode(&encode(VoltageLevel::Kv500, 3), PayloadSource::Session, rig.clock.now().wall)
        .unwrap();
    pipeline.on_reading(&r);

    assert_eq!(
        pipeline
            .events()
            .count(|e| matches!(e, PipelineEvent::StorageFailed(_))),
        1
    );
    assert!(rig.alerts.is_active());
    rig.pipeline.on_reading_cleared();
    assert!(!rig.alerts.is_active());
}

// ── Commands ──────────────────────────────────────────────────

#[test]
fn test_alert_and_live_path_share_one_coordinator() {
    let mut rig = Rig::new();
    let bus = LinkBus::new();

    rig.pipeline
        .handle_command(AppCommand::TestAlert(VoltageLevel::Kv22_9), &bus);
    assert!(rig.alerts.is_active());

    // Live danger while the test alert runs: nothing double-started.
    rig.inject(VoltageLevel::Kv22_9, 7);
    assert_eq!(starts(&rig.log), 3);

    rig.pipeline.handle_command(AppCommand::StopAlerts, &bus);
    assert!(!rig.alerts.is_active());
}

#[test]
fn stop_alerts_holds_while_the_same_level_streams() {
    let mut rig = Rig::new();
    let bus = LinkBus::new();
    rig.inject(VoltageLevel::Kv154, 1);
    assert!(rig.alerts.is_active());

    rig.pipeline.handle_command(AppCommand::StopAlerts, &bus);
    rig.inject(VoltageLevel::Kv154, 2);
    rig.inject(VoltageLevel::Kv154, 3);
    assert!(!rig.alerts.is_active());
    assert_eq!(rig.alerts.trigger_count(), 1);

    // A different dangerous level is news again.
    rig.inject(VoltageLevel::Kv345, 4);
    assert!(rig.alerts.is_active());
    assert_eq!(rig.alerts.trigger_count(), 2);
}

#[test]
fn stop_alerts_then_safe_reading_rearms() {
    let mut rig = Rig::new();
    let bus = LinkBus::new();
    rig.inject(VoltageLevel::Kv154, 1);
    rig.pipeline.handle_command(AppCommand::StopAlerts, &bus);
    rig.inject(VoltageLevel::V220, 2);
    rig.inject(VoltageLevel::Kv154, 3);
    assert!(rig.alerts.is_active());
    assert_eq!(rig.raised(), 2);
}

#[test]
fn link_commands_survive_a_radio_backlog() {
    let mut rig = Rig::new();
    let bus = LinkBus::new();
    while bus.post(LinkEvent::Notification(encode(VoltageLevel::V220, 0).to_vec())) {}

    assert!(rig.pipeline.handle_command(AppCommand::StopMonitoring, &bus));
    assert!(rig.pipeline.handle_command(AppCommand::Shutdown, &bus));

    let drained: Vec<_> = std::iter::from_fn(|| bus.try_receive()).collect();
    assert_eq!(drained.last(), Some(&LinkEvent::Shutdown));
    assert!(drained.contains(&LinkEvent::Stop));
}

#[test]
fn link_command_on_a_full_bus_is_reported() {
    let mut rig = Rig::new();
    let bus = LinkBus::new();
    for _ in 0..BUS_DEPTH {
        assert!(bus.post(LinkEvent::StartScan));
    }

    assert!(!rig.pipeline.handle_command(AppCommand::Shutdown, &bus));
    assert_eq!(
        rig.pipeline
            .events()
            .count(|e| *e == PipelineEvent::CommandDropped(AppCommand::Shutdown)),
        1
    );
    // Local commands never touch the bus.
    assert!(rig.pipeline.handle_command(AppCommand::StopAlerts, &bus));
}

#[test]
fn test_alert_with_no_outputs_is_reported() {
    let alerts = Arc::new(AlertCoordinator::new(Vec::new(), None, &AlertConfig::default()));
    let mut pipeline = Pipeline::new(
        FlakyLogSink::default(),
        RecordingEvents::default(),
        alerts.clone(),
        JournalConfig::default(),
    );
    pipeline.handle_command(AppCommand::TestAlert(VoltageLevel::Kv765), &LinkBus::new());
    assert!(!alerts.is_active());
    assert_eq!(
        pipeline
            .events()
            .count(|e| *e == PipelineEvent::AlertUnavailable(VoltageLevel::Kv765)),
        1
    );
}

#[test]
fn test_alert_with_safe_level_does_nothing() {
    let mut rig = Rig::new();
    rig.pipeline
        .handle_command(AppCommand::TestAlert(VoltageLevel::V380), &LinkBus::new());
    assert!(!rig.alerts.is_active());
    assert_eq!(starts(&rig.log), 0);
}

#[test]
fn reset_duplicate_filter_command() {
    let mut rig = Rig::new();
    for seq in 0..5 {
        rig.inject(VoltageLevel::V220, seq);
    }
    assert_eq!(rig.lines().len(), 3);
    rig.pipeline
        .handle_command(AppCommand::ResetDuplicateFilter, &LinkBus::new());
    rig.inject(VoltageLevel::V220, 5);
    assert_eq!(rig.lines().len(), 4);
}

#[test]
fn export_contains_event_and_debug_sections() {
    let mut rig = Rig::new();
    rig.inject(VoltageLevel::Kv154, 42);
    let now = rig.clock.now().wall;
    let doc = rig
        .pipeline
        .export(&["14:30:00.000 connected A".to_string()], now)
        .unwrap()
        .unwrap();
    assert_eq!(doc.file_name, "HVPA#20260615_143001.log");
    assert!(doc.contents.starts_with("=== Event Log ===\n1. 2026/06/15 14:30:01 154KV\n"));
    assert!(doc.contents.contains("\n\n=== Link Debug Log ===\n14:30:00.000 connected A\n"));
}

#[test]
fn empty_export_is_none() {
    let rig = Rig::new();
    assert!(rig.pipeline.export(&[], rig.clock.now().wall).unwrap().is_none());
}
