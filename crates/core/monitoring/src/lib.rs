//! Logging setup shared by the ServiceX harness crates.

pub mod logging;
