//! VoltSentry host runner.
//!
//! Wires the pipeline to host adapters and a simulated sensor, runs one
//! scenario to completion, then writes the log export.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  SimulatedSensor   LogEventSink   JsonFileStore   SystemClock  │
//! │  (Transport)       (EventSink)    (KeyValueStore) (Clock)      │
//! │  Console* alerts   MemoryLogSink                               │
//! │  (AlertChannel)    (LogSink)                                   │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │ ConnectionManager ──▶ Pipeline ──▶ AlertCoordinator     │    │
//! │  │ (LinkMachine)         (Journal)                         │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Usage: `voltsentry [config.json|-] [safe|danger|mixed|duplicate|all]`

use std::cell::RefCell;
use std::fs;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono::Local;
use env_logger::Env;
use log::{error, info};

use voltsentry::adapters::console_alert::{ConsoleWakeLock, console_channels};
use voltsentry::adapters::log_sink::LogEventSink;
use voltsentry::adapters::memory_log::MemoryLogSink;
use voltsentry::adapters::sim_sensor::{Scenario, SimulatedSensor};
use voltsentry::adapters::store::JsonFileStore;
use voltsentry::adapters::time::SystemClock;
use voltsentry::alert::AlertCoordinator;
use voltsentry::app::{AppCommand, Pipeline};
use voltsentry::config::PipelineConfig;
use voltsentry::error::Error;
use voltsentry::link::bus::LinkBus;
use voltsentry::link::manager::ConnectionManager;

const STORE_PATH: &str = "voltsentry-store.json";
const PACKET_INTERVAL: Duration = Duration::from_millis(1000);

fn load_config(path: Option<&str>) -> Result<PipelineConfig> {
    let Some(path) = path.filter(|p| *p != "-") else {
        info!("config: defaults");
        return Ok(PipelineConfig::default());
    };
    let text = fs::read_to_string(path).with_context(|| format!("reading config {path}"))?;
    let config: PipelineConfig =
        serde_json::from_str(&text).with_context(|| format!("parsing config {path}"))?;
    info!("config: {}", path);
    Ok(config)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = load_config(args.first().map(String::as_str))?;
    config.validate().context("invalid configuration")?;
    let scenario = match args.get(1) {
        Some(name) => name.parse::<Scenario>().context("scenario")?,
        None => Scenario::Mixed,
    };
    info!("VoltSentry v{} | scenario={:?} | mode={:?}", env!("CARGO_PKG_VERSION"), scenario, config.link.mode);

    // ── Wiring ────────────────────────────────────────────────
    let bus = Arc::new(LinkBus::new());
    let alerts = Arc::new(AlertCoordinator::new(
        console_channels(),
        Some(Box::new(ConsoleWakeLock::new())),
        &config.alert,
    ));
    let pipeline = Rc::new(RefCell::new(Pipeline::new(
        MemoryLogSink::new(),
        LogEventSink::new(),
        alerts.clone(),
        config.journal.clone(),
    )));
    let (transport, radio) = SimulatedSensor::new(bus.clone(), scenario, config.link.mode);
    let mut manager = ConnectionManager::new(
        &config.link,
        transport,
        JsonFileStore::open(STORE_PATH),
        SystemClock::new(),
        alerts.clone(),
    )
    .context("link configuration")?;

    // ── Run ───────────────────────────────────────────────────
    {
        let mut observer = pipeline.clone();
        let executor: edge_executor::LocalExecutor<'_, 8> = edge_executor::LocalExecutor::new();

        // Let the last reading time out before shutting down.
        let linger = Duration::from_millis(config.link.reading_timeout_ms + 500);
        let operator = {
            let pipeline = pipeline.clone();
            let bus = bus.clone();
            async move {
                radio.run(PACKET_INTERVAL).await;
                async_io_mini::Timer::after(linger).await;
                if !pipeline
                    .borrow_mut()
                    .handle_command(AppCommand::Shutdown, &bus)
                {
                    error!("shutdown could not be queued");
                }
            }
        };
        executor.spawn(operator).detach();

        if !pipeline
            .borrow_mut()
            .handle_command(AppCommand::StartMonitoring, &bus)
        {
            bail!("link bus refused the start command");
        }

        futures_lite::future::block_on(executor.run(manager.run(&bus, &mut observer)));
    }

    // ── Export ────────────────────────────────────────────────
    let snapshot = manager.snapshot();
    info!(
        "done | state={} | errors={} | alerts raised={}",
        snapshot.state,
        snapshot.error_count,
        alerts.trigger_count()
    );

    let trail = manager.trail();
    let export = pipeline
        .borrow()
        .export(&trail, Local::now().naive_local())
        .map_err(Error::from)?;
    match export {
        Some(doc) => {
            fs::write(&doc.file_name, &doc.contents)
                .with_context(|| format!("writing {}", doc.file_name))?;
            info!("export: {}", doc.file_name);
        }
        None => info!("export: nothing to write"),
    }
    Ok(())
}
