//! Mock notifier for unit and integration testing.
//!
//! Records every delivery for later assertion and can simulate a failing
//! notification service.
//!
//! # Example
//!
//! ```rust,ignore
//! use pwatch::notify::mock::MockNotifier;
//!
//! let mut mock = MockNotifier::new();
//! // ... drive the engine ...
//! assert_eq!(mock.sent().len(), 1);
//! assert_eq!(mock.sent()[0].note.category, "power.update");
//! ```

use super::{Notification, Notifier, NotifyHandle};
use crate::error::{PwError, Result};

/// One recorded delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub note: Notification,
    pub replaces: Option<NotifyHandle>,
    /// Handle returned to the caller for this delivery.
    pub handle: NotifyHandle,
}

/// In-memory notification sink.
///
/// Mirrors the replace behavior of a real notification service: a delivery
/// that replaces an existing notification keeps its id, a fresh delivery is
/// assigned the next id.
#[derive(Debug, Default)]
pub struct MockNotifier {
    sent: Vec<Delivery>,
    next_id: u32,
    fail_next: Option<String>,
}

impl MockNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next send fail with a transport error.
    pub fn inject_failure(&mut self, reason: impl Into<String>) {
        self.fail_next = Some(reason.into());
    }

    /// All recorded deliveries, oldest first.
    #[must_use]
    pub fn sent(&self) -> &[Delivery] {
        &self.sent
    }

    /// The most recent delivery.
    #[must_use]
    pub fn last(&self) -> Option<&Delivery> {
        self.sent.last()
    }

    /// Deliveries with the given category tag.
    pub fn with_category(&self, category: &str) -> impl Iterator<Item = &Delivery> {
        self.sent.iter().filter(move |d| d.note.category == category)
    }

    /// Number of deliveries with the given category tag.
    #[must_use]
    pub fn count_category(&self, category: &str) -> usize {
        self.with_category(category).count()
    }
}

impl Notifier for MockNotifier {
    async fn send(
        &mut self,
        note: &Notification,
        replaces: Option<NotifyHandle>,
    ) -> Result<NotifyHandle> {
        if let Some(reason) = self.fail_next.take() {
            return Err(PwError::transport("notification call", reason));
        }

        let handle = replaces.unwrap_or_else(|| {
            self.next_id += 1;
            NotifyHandle::new(self.next_id)
        });
        self.sent.push(Delivery {
            note: note.clone(),
            replaces,
            handle,
        });
        Ok(handle)
    }
}
