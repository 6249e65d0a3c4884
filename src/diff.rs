//! Pure change detection over device snapshots.
//!
//! Given a device's previous and current snapshot, decide per category
//! whether a notification-worthy change occurred, applying the suppression
//! rules. No I/O and no mutation happens here; the engine applies the
//! returned decisions.

use crate::device::{DeviceLevel, DeviceState, DeviceType, NotifySlot, PropertySnapshot};
use crate::notify::Severity;

/// One notification-worthy change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    State {
        state: DeviceState,
        severity: Severity,
    },
    Warning {
        level: DeviceLevel,
        severity: Severity,
    },
    Online {
        online: bool,
    },
}

impl Change {
    /// The replace slot this change updates.
    #[must_use]
    pub const fn slot(&self) -> NotifySlot {
        match self {
            Self::State { .. } => NotifySlot::State,
            Self::Warning { .. } => NotifySlot::Warning,
            Self::Online { .. } => NotifySlot::Online,
        }
    }

    /// Urgency for this change. Online transitions are always routine.
    #[must_use]
    pub const fn severity(&self) -> Severity {
        match self {
            Self::State { severity, .. } | Self::Warning { severity, .. } => *severity,
            Self::Online { .. } => Severity::Normal,
        }
    }
}

/// Result of evaluating one device.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Evaluation {
    /// Changes to dispatch, in category order (state, warning, online).
    pub changes: Vec<Change>,
    /// The current state reading was `unknown` and must be discarded: the
    /// caller writes the previous state back into the current snapshot
    /// before committing, so the next real reading still diffs against the
    /// last trustworthy value.
    pub retain_state: bool,
}

/// Severity of a state transition: running empty is the only state worth an
/// urgent popup.
#[must_use]
pub const fn state_severity(state: DeviceState) -> Severity {
    match state {
        DeviceState::Empty => Severity::Critical,
        _ => Severity::Normal,
    }
}

/// Severity of a warning transition: everything except the all-clear is
/// urgent.
#[must_use]
pub const fn warning_severity(level: DeviceLevel) -> Severity {
    match level {
        DeviceLevel::None => Severity::Normal,
        _ => Severity::Critical,
    }
}

/// Evaluate one device's snapshots.
///
/// Battery-powered devices report charge state and warning level; everything
/// else only reports whether it is online. The two groups never mix, so a
/// mouse going offline cannot produce a state notification and a battery's
/// `online` flag is ignored.
#[must_use]
pub fn evaluate(
    device_type: DeviceType,
    last: &PropertySnapshot,
    current: &PropertySnapshot,
) -> Evaluation {
    let mut eval = Evaluation::default();

    if device_type.is_battery_powered() {
        if current.state != last.state {
            if current.state == DeviceState::Unknown {
                // Transient noise near state boundaries; drop the reading.
                eval.retain_state = true;
            } else {
                eval.changes.push(Change::State {
                    state: current.state,
                    severity: state_severity(current.state),
                });
            }
        }

        if current.warning_level != last.warning_level {
            let startup_noise = current.warning_level == DeviceLevel::None
                && last.warning_level == DeviceLevel::Unknown;
            if !startup_noise {
                eval.changes.push(Change::Warning {
                    level: current.warning_level,
                    severity: warning_severity(current.warning_level),
                });
            }
        }
    } else if current.online != last.online {
        eval.changes.push(Change::Online {
            online: current.online,
        });
    }

    eval
}
