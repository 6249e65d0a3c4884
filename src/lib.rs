//! Powerwatch daemon library - UPower battery and power-supply notifications.
//!
//! This library exposes the core of the `pwatch` daemon for use in tests
//! and potentially other applications.
//!
//! # Modules
//!
//! - `device`: Power device model mirroring the UPower device schema
//! - `registry`: Active/removed device bookkeeping
//! - `diff`: Pure change detection over device snapshots
//! - `router`: Change-to-notification mapping with replace semantics
//! - `engine`: The reconciliation loop tying the above together
//! - `source`: Abstract bus event source plus UPower and mock adapters
//! - `notify`: Abstract notifier plus desktop and mock adapters
//! - `error`: Error taxonomy for transport, lookup, protocol and config
#![forbid(unsafe_code)]

pub mod cli;
pub mod device;
pub mod diff;
pub mod engine;
pub mod error;
pub mod logging;
pub mod notify;
pub mod registry;
pub mod router;
pub mod source;
