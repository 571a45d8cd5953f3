//! Transport and process-table plumbing for fuzzctl.
//!
//! Everything here talks to the device through the [`runner::CommandRunner`]
//! capability, so the controller can be driven against an in-memory runner
//! in tests.

pub mod clock;
pub mod device;
pub mod runner;
pub mod ssh;

pub type HashMap<K, V> = ahash::AHashMap<K, V>;
