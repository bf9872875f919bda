//! Integration test driver for the `tests/integration/` submodules.
//!
//! Each `mod` below maps to a file that exercises one subsystem against
//! recording mock adapters.  Everything runs on the host with no radio,
//! speaker or database.

mod alert_tests;
mod link_tests;
mod mock_ports;
mod pipeline_tests;
