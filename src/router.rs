//! Maps detected changes to concrete desktop notifications.
//!
//! Titles, bodies and category tags come from fixed tables; the only moving
//! parts are the device identity in the title and the charge level in the
//! state body. Each change category owns one replace slot on the record, so
//! consecutive updates of the same category reuse the same popup.

use tracing::debug;

use crate::device::{DeviceLevel, DeviceRecord};
use crate::diff::Change;
use crate::error::Result;
use crate::notify::{Notification, Notifier, Severity};

/// Category tag for state transitions.
const CATEGORY_STATE: &str = "power.update";
/// Category tag for removal notifications.
const CATEGORY_REMOVED: &str = "device.removed";

/// Title for status and removal notifications.
fn status_title(record: &DeviceRecord) -> String {
    if record.model.is_empty() {
        format!("Power status: {} ({})", record.location(), record.device_type)
    } else {
        format!("Power status: {}", record.model)
    }
}

/// Title for warning notifications.
fn warning_title(record: &DeviceRecord) -> String {
    if record.model.is_empty() {
        format!(
            "Power warning: {} ({})",
            record.location(),
            record.device_type
        )
    } else {
        format!("Power warning: {}", record.model)
    }
}

/// Body for a state transition. Devices that report discrete charge buckets
/// show the bucket name; everything else shows the percentage.
fn state_body(record: &DeviceRecord) -> String {
    if record.current.battery_level == DeviceLevel::None {
        format!(
            "Battery {}\nCurrent level: {:.0}%",
            record.current.state, record.current.percentage
        )
    } else {
        format!(
            "Battery {}\nCurrent level: {}",
            record.current.state, record.current.battery_level
        )
    }
}

/// Fixed message and category per warning level.
const fn warning_text(level: DeviceLevel) -> (&'static str, &'static str) {
    match level {
        DeviceLevel::None => ("Warning cleared", "power.cleared"),
        DeviceLevel::Discharging => ("Warning: system discharging", "power.discharging"),
        DeviceLevel::Low => ("Warning: power level low", "power.low"),
        DeviceLevel::Critical => ("Warning: power level critical", "power.critical"),
        DeviceLevel::Action => ("Warning: power level at action threshold", "power.action"),
        DeviceLevel::Unknown
        | DeviceLevel::Normal
        | DeviceLevel::High
        | DeviceLevel::Full => ("Warning: unknown warning level", "power.unknown"),
    }
}

/// Build the notification content for one change.
fn render(record: &DeviceRecord, change: &Change) -> Notification {
    match change {
        Change::State { .. } => Notification {
            title: status_title(record),
            body: state_body(record),
            category: CATEGORY_STATE,
            severity: change.severity(),
        },
        Change::Warning { level, .. } => {
            let (body, category) = warning_text(*level);
            Notification {
                title: warning_title(record),
                body: body.to_string(),
                category,
                severity: change.severity(),
            }
        }
        Change::Online { online } => Notification {
            title: status_title(record),
            body: if *online {
                "Power supply online".to_string()
            } else {
                "Power supply offline".to_string()
            },
            category: if *online {
                "power.online"
            } else {
                "power.offline"
            },
            severity: Severity::Normal,
        },
    }
}

/// Dispatch one change for a device, replacing the previous notification in
/// the same slot when one exists. The returned handle is stored back on the
/// record for the next update. Errors propagate unmodified; retrying is the
/// caller's problem (and the caller's policy is to not retry).
pub async fn dispatch<N: Notifier>(
    notifier: &mut N,
    record: &mut DeviceRecord,
    change: &Change,
) -> Result<()> {
    let note = render(record, change);
    let slot = change.slot();
    let handle = notifier.send(&note, record.handle(slot)).await?;
    record.set_handle(slot, handle);
    debug!(path = %record.path, category = note.category, "dispatched change");
    Ok(())
}

/// Dispatch a one-shot removal notification. No replace slot is involved:
/// the record is discarded right after this call.
pub async fn dispatch_removal<N: Notifier>(
    notifier: &mut N,
    record: &DeviceRecord,
) -> Result<()> {
    let note = Notification {
        title: status_title(record),
        body: "Device disconnected".to_string(),
        category: CATEGORY_REMOVED,
        severity: Severity::Normal,
    };
    notifier.send(&note, None).await?;
    debug!(path = %record.path, "dispatched removal");
    Ok(())
}
