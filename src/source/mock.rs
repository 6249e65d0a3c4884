//! Scripted event source for unit and integration testing.
//!
//! Devices are seeded up front; lifecycle and property events are queued and
//! drained exactly like the real adapter's channel. `wait` reports `Ready`
//! while scripted events remain and fails with a transport error once the
//! script is exhausted, which makes `Engine::run` terminate the way a lost
//! bus connection would.
//!
//! # Example
//!
//! ```rust,ignore
//! use pwatch::source::mock::MockSource;
//!
//! let mut source = MockSource::new();
//! source.add_device("/d0", battery("BAT0", 80.0));
//! source.push_changed("/d0", discharge_update());
//! // ... drive the engine ...
//! assert!(source.is_watched("/d0"));
//! ```

use std::collections::{BTreeSet, HashSet, VecDeque};

use super::{BusEvent, EventSource, Wake};
use crate::device::{DeviceProperties, PropertyUpdate};
use crate::error::{PwError, Result};

/// In-memory scripted bus.
#[derive(Debug, Default)]
pub struct MockSource {
    devices: Vec<(String, DeviceProperties)>,
    queue: VecDeque<BusEvent>,
    deferred: VecDeque<Vec<BusEvent>>,
    watched: BTreeSet<String>,
    query_failures: HashSet<String>,
    query_log: Vec<String>,
}

impl MockSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a device visible to `enumerate` and `query`.
    pub fn add_device(&mut self, path: impl Into<String>, props: DeviceProperties) {
        let path = path.into();
        if let Some(entry) = self.devices.iter_mut().find(|(p, _)| *p == path) {
            entry.1 = props;
        } else {
            self.devices.push((path, props));
        }
    }

    /// Mutate the scripted query result for a device, e.g. to change what a
    /// re-add will observe.
    pub fn update_device(&mut self, path: &str, f: impl FnOnce(&mut DeviceProperties)) {
        if let Some(entry) = self.devices.iter_mut().find(|(p, _)| p == path) {
            f(&mut entry.1);
        }
    }

    /// Make queries for this path fail with a lookup error.
    pub fn fail_queries_for(&mut self, path: impl Into<String>) {
        self.query_failures.insert(path.into());
    }

    pub fn push_added(&mut self, path: impl Into<String>) {
        self.queue.push_back(BusEvent::DeviceAdded { path: path.into() });
    }

    pub fn push_removed(&mut self, path: impl Into<String>) {
        self.queue.push_back(BusEvent::DeviceRemoved { path: path.into() });
    }

    pub fn push_changed(&mut self, path: impl Into<String>, update: PropertyUpdate) {
        self.queue.push_back(BusEvent::PropertiesChanged {
            path: path.into(),
            update,
        });
    }

    /// Queue a batch of events that only "arrives" during a later wait,
    /// after everything queued so far has been drained. Each call scripts
    /// one wake-up.
    pub fn push_later(&mut self, batch: Vec<BusEvent>) {
        self.deferred.push_back(batch);
    }

    /// Whether a property watch is currently registered for the path.
    #[must_use]
    pub fn is_watched(&self, path: &str) -> bool {
        self.watched.contains(path)
    }

    /// Paths queried so far, in order.
    #[must_use]
    pub fn queries(&self) -> &[String] {
        &self.query_log
    }
}

impl EventSource for MockSource {
    async fn enumerate(&mut self) -> Result<Vec<String>> {
        Ok(self.devices.iter().map(|(path, _)| path.clone()).collect())
    }

    async fn query(&mut self, path: &str) -> Result<DeviceProperties> {
        self.query_log.push(path.to_string());
        if self.query_failures.contains(path) {
            return Err(PwError::lookup(path, "scripted query failure"));
        }
        self.devices
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, props)| props.clone())
            .ok_or_else(|| PwError::lookup(path, "no such device"))
    }

    async fn watch(&mut self, path: &str) -> Result<()> {
        self.watched.insert(path.to_string());
        Ok(())
    }

    fn unwatch(&mut self, path: &str) {
        self.watched.remove(path);
    }

    fn next_event(&mut self) -> Option<BusEvent> {
        self.queue.pop_front()
    }

    async fn wait(&mut self) -> Result<Wake> {
        if self.queue.is_empty() {
            match self.deferred.pop_front() {
                Some(batch) => self.queue.extend(batch),
                None => {
                    return Err(PwError::transport(
                        "wait for bus events",
                        "mock event script exhausted",
                    ));
                }
            }
        }
        Ok(Wake::Ready)
    }
}
