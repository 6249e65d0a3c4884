//! Notification delivery abstraction.
//!
//! The daemon only ever needs one operation: deliver a titled message with a
//! category tag and an urgency, optionally replacing an earlier message in
//! place. The trait keeps the reconciliation engine testable without a
//! running notification service.

pub mod desktop;
pub mod mock;

pub use desktop::DesktopNotifier;

use crate::error::Result;

/// Notification urgency, mapped to the freedesktop urgency hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Normal,
    Critical,
}

impl Severity {
    /// The `urgency` hint byte defined by the notification spec.
    #[must_use]
    pub const fn urgency(self) -> u8 {
        match self {
            Self::Normal => 1,
            Self::Critical => 2,
        }
    }
}

/// Opaque id of a previously delivered notification, used to request an
/// in-place update instead of a new popup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotifyHandle(u32);

impl NotifyHandle {
    pub(crate) const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// The raw id as understood by the notification service.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// Content of one outgoing notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub category: &'static str,
    pub severity: Severity,
}

/// Abstract notification sender.
#[allow(async_fn_in_trait)]
pub trait Notifier {
    /// Deliver a notification, optionally replacing an earlier one.
    ///
    /// Returns the handle to pass back for the next in-place update.
    /// Errors are propagated unmodified; there is no retry here.
    async fn send(
        &mut self,
        note: &Notification,
        replaces: Option<NotifyHandle>,
    ) -> Result<NotifyHandle>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urgency_hint_bytes() {
        assert_eq!(Severity::Normal.urgency(), 1);
        assert_eq!(Severity::Critical.urgency(), 2);
    }

    #[test]
    fn handle_round_trips_raw_id() {
        assert_eq!(NotifyHandle::new(42).raw(), 42);
    }
}
