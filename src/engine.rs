//! The reconciliation loop.
//!
//! One pass: drain buffered bus events into the registry, evaluate every
//! active device (differ + router), flush removal notifications, then block
//! for the next wake. Bootstrap runs the initial enumeration through the
//! same add path the live events use.
//!
//! Snapshot commit happens at the end of every evaluation, dispatched or
//! not, which keeps change detection edge-triggered: a filter that skips a
//! device today must not cause a stale notification tomorrow.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::device::DeviceType;
use crate::diff;
use crate::error::Result;
use crate::notify::Notifier;
use crate::registry::Registry;
use crate::router;
use crate::source::{BusEvent, EventSource};

/// How long after startup events still count as pre-existing state for
/// `--skip-initial`. UPower replays current state when the daemon attaches;
/// half a second covers the replay without eating real changes.
const STARTUP_SETTLE: Duration = Duration::from_millis(500);

/// Device and event filtering applied by the loop.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Suppress notifications observed during the startup settle window.
    pub skip_initial: bool,
    /// Only notify for devices flagged as power supplies.
    pub power_supplies_only: bool,
    /// Device types excluded from notifications entirely.
    pub ignored_types: Vec<DeviceType>,
    /// Settle window length; tests shrink this to zero.
    pub settle_delay: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            skip_initial: false,
            power_supplies_only: false,
            ignored_types: Vec::new(),
            settle_delay: STARTUP_SETTLE,
        }
    }
}

impl EngineOptions {
    fn filters_out(&self, device_type: DeviceType, power_supply: bool) -> bool {
        self.ignored_types.contains(&device_type) || (self.power_supplies_only && !power_supply)
    }
}

/// The top-level driver owning the registry and both bus adapters.
pub struct Engine<S, N> {
    source: S,
    notifier: N,
    registry: Registry,
    options: EngineOptions,
    started: Instant,
    settled: bool,
}

impl<S: EventSource, N: Notifier> Engine<S, N> {
    #[must_use]
    pub fn new(source: S, notifier: N, options: EngineOptions) -> Self {
        Self {
            source,
            notifier,
            registry: Registry::new(),
            options,
            started: Instant::now(),
            settled: false,
        }
    }

    /// The registry, for inspection in tests.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The notifier, for inspection in tests.
    #[must_use]
    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// The event source, for scripting in tests.
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// One-time initial enumeration. Per-device lookup failures are
    /// reported and tolerated; losing the bus is not.
    pub async fn bootstrap(&mut self) -> Result<()> {
        let paths = self.source.enumerate().await?;
        info!(count = paths.len(), "enumerated devices");
        for path in paths {
            if let Err(e) = self.registry.device_added(&mut self.source, &path).await {
                if e.is_fatal() {
                    return Err(e);
                }
                warn!(%path, error = %e, "device added with incomplete data");
            }
        }
        Ok(())
    }

    /// Run until the transport fails. There is no other way out; shutdown
    /// arrives as a signal that kills the process.
    pub async fn run(&mut self) -> Result<()> {
        self.bootstrap().await?;
        loop {
            self.tick().await?;
            self.source.wait().await?;
            if !self.settled && self.started.elapsed() >= self.options.settle_delay {
                debug!("startup settle window over");
                self.settled = true;
            }
        }
    }

    /// One full loop pass: drain, evaluate, flush removals.
    pub async fn tick(&mut self) -> Result<()> {
        self.drain().await?;
        self.evaluate().await?;
        self.flush_removals().await?;
        Ok(())
    }

    /// Apply all buffered events through the registry operations.
    async fn drain(&mut self) -> Result<()> {
        while let Some(event) = self.source.next_event() {
            match event {
                BusEvent::DeviceAdded { path } => {
                    if let Err(e) = self.registry.device_added(&mut self.source, &path).await {
                        if e.is_fatal() {
                            return Err(e);
                        }
                        warn!(%path, error = %e, "device added with incomplete data");
                    }
                }
                BusEvent::DeviceRemoved { path } => {
                    self.registry.device_removed(&path);
                }
                BusEvent::PropertiesChanged { path, update } => {
                    if !self.registry.properties_changed(&path, &update) {
                        debug!(%path, "change event for untracked device");
                    }
                }
            }
        }
        Ok(())
    }

    /// Diff and dispatch every active device, then commit its snapshot.
    async fn evaluate(&mut self) -> Result<()> {
        let suppress_initial = self.options.skip_initial && !self.settled;
        for record in self.registry.active_mut() {
            let skipped = suppress_initial
                || self
                    .options
                    .filters_out(record.device_type, record.power_supply);

            if !skipped {
                let eval = diff::evaluate(record.device_type, &record.last, &record.current);
                if eval.retain_state {
                    record.current.state = record.last.state;
                }
                for change in &eval.changes {
                    router::dispatch(&mut self.notifier, record, change).await?;
                }
            }

            // Edge-triggered detection: every pass starts from here.
            record.last = record.current;
        }
        Ok(())
    }

    /// Dispatch removal notifications for everything that left, release
    /// their watches, and drop the records.
    async fn flush_removals(&mut self) -> Result<()> {
        for record in self.registry.drain_removed() {
            self.source.unwatch(&record.path);
            if self
                .options
                .filters_out(record.device_type, record.power_supply)
            {
                debug!(path = %record.path, "removal filtered out");
                continue;
            }
            router::dispatch_removal(&mut self.notifier, &record).await?;
        }
        Ok(())
    }
}
