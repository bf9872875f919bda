//! Link bus — the single inbox of the connection manager task.
//!
//! Uses an `embassy-sync` bounded MPMC channel so that radio callbacks,
//! operator commands and timers all funnel into one consumer.  The
//! manager publishes its latest [`LinkSnapshot`] back through a
//! critical-section mutex so any thread can read status without
//! touching the machine.
//!
//! ```text
//! ┌──────────────┐            ┌──────────────────┐
//! │ radio adapter│──┐         │                  │
//! └──────────────┘  │LinkEvent│ ConnectionManager│
//! ┌──────────────┐  ├────────▶│  (single task)   │
//! │ app commands │──┘         │                  │
//! └──────────────┘            └────────┬─────────┘
//!         ▲          LinkSnapshot       │
//!         └─────────────────────────────┘
//! ```

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::warn;

use super::{LinkEvent, LinkSnapshot};

/// Queue depth for link events.
pub const BUS_DEPTH: usize = 32;

/// Slots only operator control events may take, so a flood of radio
/// traffic can never crowd out a stop or a shutdown.
pub const CONTROL_RESERVE: usize = 8;

fn is_control(event: &LinkEvent) -> bool {
    matches!(
        event,
        LinkEvent::StartScan | LinkEvent::Stop | LinkEvent::Select(_) | LinkEvent::Shutdown
    )
}

pub struct LinkBus {
    events: Channel<CriticalSectionRawMutex, LinkEvent, BUS_DEPTH>,
    snapshot: Mutex<CriticalSectionRawMutex, RefCell<LinkSnapshot>>,
}

impl Default for LinkBus {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkBus {
    pub fn new() -> Self {
        Self {
            events: Channel::new(),
            snapshot: Mutex::new(RefCell::new(LinkSnapshot::default())),
        }
    }

    /// Non-blocking post.  Returns `false` (and drops the event) when the
    /// queue is full.  Radio and transport events stop at
    /// `BUS_DEPTH - CONTROL_RESERVE`; control events may use every slot.
    pub fn post(&self, event: LinkEvent) -> bool {
        let control = is_control(&event);
        if !control && self.events.len() >= BUS_DEPTH - CONTROL_RESERVE {
            warn!("bus: radio backlog, dropping {:?}", event);
            return false;
        }
        match self.events.try_send(event) {
            Ok(()) => true,
            Err(_) => {
                let kind = if control { "control" } else { "radio" };
                warn!("bus: event queue full, dropping {} event", kind);
                false
            }
        }
    }

    pub async fn receive(&self) -> LinkEvent {
        self.events.receive().await
    }

    pub fn try_receive(&self) -> Option<LinkEvent> {
        self.events.try_receive().ok()
    }

    pub fn pending(&self) -> usize {
        self.events.len()
    }

    /// Latest snapshot published by the manager.
    pub fn latest(&self) -> LinkSnapshot {
        self.snapshot.lock(|s| s.borrow().clone())
    }

    pub fn publish(&self, snapshot: LinkSnapshot) {
        self.snapshot.lock(|s| *s.borrow_mut() = snapshot);
    }
}
