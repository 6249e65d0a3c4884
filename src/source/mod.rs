//! Bus event source abstraction.
//!
//! The reconciliation engine consumes power-device events through this
//! trait, keeping it independent of the concrete bus. The real adapter
//! lives in [`upower`]; a scripted implementation for tests lives in
//! [`mock`].

pub mod mock;
pub mod upower;

pub use upower::UPowerSource;

use crate::device::{DeviceProperties, PropertyUpdate};
use crate::error::Result;

/// One discrete event delivered by the bus.
#[derive(Debug, Clone, PartialEq)]
pub enum BusEvent {
    DeviceAdded {
        path: String,
    },
    DeviceRemoved {
        path: String,
    },
    /// Property change for a single device; carries only the fields that
    /// actually changed.
    PropertiesChanged {
        path: String,
        update: PropertyUpdate,
    },
}

/// Outcome of a blocking wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    /// Events are buffered and ready to drain.
    Ready,
    /// The wait elapsed without anything arriving.
    Idle,
}

/// Abstract source of power-device events.
///
/// Contract: [`Self::next_event`] never blocks; [`Self::wait`] is the only
/// suspension point and returns once events are pending (or the wait
/// elapses). Losing the underlying transport is an error from `wait`, not a
/// silent end of stream.
#[allow(async_fn_in_trait)]
pub trait EventSource {
    /// Full device enumeration, used once at bootstrap.
    async fn enumerate(&mut self) -> Result<Vec<String>>;

    /// Query the full current properties of one device.
    async fn query(&mut self, path: &str) -> Result<DeviceProperties>;

    /// Start delivering property-change events for one device.
    async fn watch(&mut self, path: &str) -> Result<()>;

    /// Stop delivering property-change events for one device.
    fn unwatch(&mut self, path: &str);

    /// Pop the next buffered event, if any. Never blocks.
    fn next_event(&mut self) -> Option<BusEvent>;

    /// Block until events are pending or the wait elapses.
    async fn wait(&mut self) -> Result<Wake>;
}
