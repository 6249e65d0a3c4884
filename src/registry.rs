//! Device registry: the set of tracked power devices.
//!
//! Two collections, keyed by bus path: `active` holds devices currently
//! present (insertion order is discovery order), `removed` holds devices the
//! bus reported gone but whose removal notification has not been flushed
//! yet. A path lives in at most one of the two at any time.
//!
//! A device that is re-added while still parked in `removed` moves back to
//! `active` with its snapshots and notification handles intact - it never
//! really left, so no removal notification is owed for it.

use tracing::{debug, info};

use crate::device::{DeviceRecord, PropertyUpdate};
use crate::error::Result;
use crate::source::EventSource;

/// Owned collection of active and recently removed device records.
#[derive(Debug, Default)]
pub struct Registry {
    active: Vec<DeviceRecord>,
    removed: Vec<DeviceRecord>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Active records in discovery order.
    #[must_use]
    pub fn active(&self) -> &[DeviceRecord] {
        &self.active
    }

    /// Mutable iteration over active records, for the evaluation pass.
    pub fn active_mut(&mut self) -> impl Iterator<Item = &mut DeviceRecord> {
        self.active.iter_mut()
    }

    /// Records awaiting a removal notification.
    #[must_use]
    pub fn removed(&self) -> &[DeviceRecord] {
        &self.removed
    }

    /// Find an active record by exact path.
    #[must_use]
    pub fn find_active(&self, path: &str) -> Option<&DeviceRecord> {
        self.active.iter().find(|r| r.path == path)
    }

    /// Handle a device-added event (also used for initial enumeration).
    ///
    /// Resolution order: an already-active path is a refresh; a path parked
    /// in `removed` is a re-add and moves back with state and handles
    /// intact; anything else is a fresh device that gets registered for
    /// property changes and queried.
    ///
    /// A watch or query failure surfaces as a `Lookup` error, but the record
    /// is kept with whatever data it has - the device may start answering
    /// later.
    pub async fn device_added<S: EventSource>(
        &mut self,
        source: &mut S,
        path: &str,
    ) -> Result<()> {
        if let Some(record) = self.active.iter_mut().find(|r| r.path == path) {
            debug!(%path, "refreshing already-tracked device");
            let props = source.query(path).await?;
            record.apply_refresh(&props);
            return Ok(());
        }

        if let Some(idx) = self.removed.iter().position(|r| r.path == path) {
            debug!(%path, "device re-added before removal flush");
            let record = self.removed.remove(idx);
            self.active.push(record);
            let props = source.query(path).await?;
            if let Some(record) = self.active.iter_mut().find(|r| r.path == path) {
                record.apply_refresh(&props);
            }
            return Ok(());
        }

        info!(%path, "tracking new device");
        self.active.push(DeviceRecord::new(path));
        source.watch(path).await?;
        let props = source.query(path).await?;
        if let Some(record) = self.active.iter_mut().find(|r| r.path == path) {
            record.apply_refresh(&props);
        }
        Ok(())
    }

    /// Handle a device-removed event. Removal of an unknown or already
    /// removed path is not an error.
    pub fn device_removed(&mut self, path: &str) -> bool {
        match self.active.iter().position(|r| r.path == path) {
            Some(idx) => {
                info!(%path, "device removed, awaiting flush");
                let record = self.active.remove(idx);
                self.removed.push(record);
                true
            }
            None => {
                debug!(%path, "removal for untracked device ignored");
                false
            }
        }
    }

    /// Apply a property-change event. Only active devices accept updates; a
    /// device mid-removal keeps its last-known values for the removal
    /// notification. Returns whether a record was found.
    pub fn properties_changed(&mut self, path: &str, update: &PropertyUpdate) -> bool {
        match self.active.iter_mut().find(|r| r.path == path) {
            Some(record) => {
                record.apply_update(update);
                true
            }
            None => false,
        }
    }

    /// Take the whole removed set for flushing. The caller iterates the
    /// returned records and drops them; nothing is left behind to re-flush.
    #[must_use]
    pub fn drain_removed(&mut self) -> Vec<DeviceRecord> {
        std::mem::take(&mut self.removed)
    }
}
