//! Desktop notification adapter for `org.freedesktop.Notifications`.
//!
//! Talks to the user's notification service on the session bus. The call
//! signature (app name, replaces id, icon, summary, body, actions, hints,
//! expire timeout) is owned by the notification spec and preserved exactly.

use std::collections::HashMap;

use tracing::{debug, trace};
use zbus::Connection;
use zbus::proxy;
use zbus::zvariant::Value;

use super::{Notification, Notifier, NotifyHandle};
use crate::error::{PwError, Result};

/// Application name reported to the notification service.
const APP_NAME: &str = "pwatch";

/// Never expire on our own; the service applies its defaults.
const NO_EXPIRE: i32 = -1;

#[proxy(
    interface = "org.freedesktop.Notifications",
    default_service = "org.freedesktop.Notifications",
    default_path = "/org/freedesktop/Notifications"
)]
trait Notifications {
    /// Notify method
    #[allow(clippy::too_many_arguments)]
    fn notify(
        &self,
        app_name: &str,
        replaces_id: u32,
        app_icon: &str,
        summary: &str,
        body: &str,
        actions: Vec<&str>,
        hints: HashMap<&str, Value<'_>>,
        expire_timeout: i32,
    ) -> zbus::Result<u32>;
}

/// Session-bus notification sender.
pub struct DesktopNotifier {
    proxy: NotificationsProxy<'static>,
}

impl DesktopNotifier {
    /// Connect to the session bus and bind the notification service.
    pub async fn connect() -> Result<Self> {
        let conn = Connection::session()
            .await
            .map_err(|e| PwError::transport("connect session bus", e))?;
        let proxy = NotificationsProxy::new(&conn)
            .await
            .map_err(|e| PwError::transport("bind notification service", e))?;
        debug!("connected to notification service");
        Ok(Self { proxy })
    }
}

impl Notifier for DesktopNotifier {
    async fn send(
        &mut self,
        note: &Notification,
        replaces: Option<NotifyHandle>,
    ) -> Result<NotifyHandle> {
        let hints = HashMap::from([
            ("urgency", Value::U8(note.severity.urgency())),
            ("category", Value::from(note.category)),
        ]);

        let id = self
            .proxy
            .notify(
                APP_NAME,
                replaces.map_or(0, NotifyHandle::raw),
                "",
                &note.title,
                &note.body,
                Vec::new(),
                hints,
                NO_EXPIRE,
            )
            .await
            .map_err(|e| PwError::transport("notification call", e))?;

        trace!(id, category = note.category, "notification delivered");
        Ok(NotifyHandle::new(id))
    }
}
