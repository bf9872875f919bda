//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter         | Implements         | Connects to                 |
//! |-----------------|--------------------|-----------------------------|
//! | `console_alert` | AlertChannel       | Log lines (siren, haptic,   |
//! |                 | WakeLock           | screen, keep-awake)         |
//! | `log_sink`      | EventSink          | `log` facade                |
//! | `memory_log`    | LogSink            | In-memory journal           |
//! | `sim_sensor`    | Transport          | Scripted fake sensor        |
//! | `store`         | KeyValueStore      | `HashMap` / JSON file       |
//! | `time`          | Clock              | `Instant` + local wall time |

pub mod console_alert;
pub mod log_sink;
pub mod memory_log;
pub mod sim_sensor;
pub mod store;
pub mod time;
