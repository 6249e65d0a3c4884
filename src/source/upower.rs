//! UPower event source adapter.
//!
//! Binds `org.freedesktop.UPower` on the system bus. Signal streams are
//! forwarded into a single event channel by lightweight tasks on the same
//! runtime, so the engine sees one ordered queue regardless of how many
//! devices are watched.
//!
//! Property names and signal shapes here belong to the UPower schema
//! (<https://upower.freedesktop.org/docs/Device.html>) and must not drift.

use std::collections::{HashMap, VecDeque};

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use zbus::Connection;
use zbus::fdo::PropertiesProxy;
use zbus::proxy;
use zbus::zvariant::{ObjectPath, OwnedObjectPath, Value};

use super::{BusEvent, EventSource, Wake};
use crate::device::{
    DeviceLevel, DeviceProperties, DeviceState, DeviceType, PropertySnapshot, PropertyUpdate,
};
use crate::error::{PwError, Result};

const UPOWER_SERVICE: &str = "org.freedesktop.UPower";
const DEVICE_INTERFACE: &str = "org.freedesktop.UPower.Device";

#[proxy(
    interface = "org.freedesktop.UPower",
    default_service = "org.freedesktop.UPower",
    default_path = "/org/freedesktop/UPower"
)]
trait UPower {
    /// EnumerateDevices method
    fn enumerate_devices(&self) -> zbus::Result<Vec<OwnedObjectPath>>;

    /// DeviceAdded signal
    #[zbus(signal)]
    fn device_added(&self, device: ObjectPath<'_>) -> zbus::Result<()>;

    /// DeviceRemoved signal
    #[zbus(signal)]
    fn device_removed(&self, device: ObjectPath<'_>) -> zbus::Result<()>;
}

#[proxy(
    interface = "org.freedesktop.UPower.Device",
    default_service = "org.freedesktop.UPower",
    assume_defaults = false
)]
trait UPowerDevice {
    /// NativePath property
    #[zbus(property)]
    fn native_path(&self) -> zbus::Result<String>;

    /// Model property
    #[zbus(property)]
    fn model(&self) -> zbus::Result<String>;

    /// PowerSupply property
    #[zbus(property)]
    fn power_supply(&self) -> zbus::Result<bool>;

    /// Type property
    #[zbus(property, name = "Type")]
    fn device_type(&self) -> zbus::Result<u32>;

    /// Online property
    #[zbus(property)]
    fn online(&self) -> zbus::Result<bool>;

    /// State property
    #[zbus(property)]
    fn state(&self) -> zbus::Result<u32>;

    /// WarningLevel property
    #[zbus(property)]
    fn warning_level(&self) -> zbus::Result<u32>;

    /// BatteryLevel property
    #[zbus(property)]
    fn battery_level(&self) -> zbus::Result<u32>;

    /// Percentage property
    #[zbus(property)]
    fn percentage(&self) -> zbus::Result<f64>;
}

/// System-bus UPower event source.
pub struct UPowerSource {
    conn: Connection,
    upower: UPowerProxy<'static>,
    sender: mpsc::UnboundedSender<BusEvent>,
    events: mpsc::UnboundedReceiver<BusEvent>,
    pending: VecDeque<BusEvent>,
    lifecycle_tasks: Vec<JoinHandle<()>>,
    watch_tasks: HashMap<String, JoinHandle<()>>,
}

impl UPowerSource {
    /// Connect to the system bus and subscribe to device lifecycle signals.
    pub async fn connect() -> Result<Self> {
        let conn = Connection::system()
            .await
            .map_err(|e| PwError::transport("connect system bus", e))?;
        Self::with_connection(conn).await
    }

    /// Bind UPower on an existing connection.
    pub async fn with_connection(conn: Connection) -> Result<Self> {
        let upower = UPowerProxy::new(&conn)
            .await
            .map_err(|e| PwError::transport("bind UPower service", e))?;

        let (sender, events) = mpsc::unbounded_channel();

        let mut added = upower
            .receive_device_added()
            .await
            .map_err(|e| PwError::transport("subscribe DeviceAdded", e))?;
        let tx = sender.clone();
        let added_task = tokio::spawn(async move {
            while let Some(signal) = added.next().await {
                match signal.args() {
                    Ok(args) => {
                        let _ = tx.send(BusEvent::DeviceAdded {
                            path: args.device().to_string(),
                        });
                    }
                    Err(e) => warn!(error = %PwError::protocol(e), "dropping DeviceAdded signal"),
                }
            }
        });

        let mut removed = upower
            .receive_device_removed()
            .await
            .map_err(|e| PwError::transport("subscribe DeviceRemoved", e))?;
        let tx = sender.clone();
        let removed_task = tokio::spawn(async move {
            while let Some(signal) = removed.next().await {
                match signal.args() {
                    Ok(args) => {
                        let _ = tx.send(BusEvent::DeviceRemoved {
                            path: args.device().to_string(),
                        });
                    }
                    Err(e) => warn!(error = %PwError::protocol(e), "dropping DeviceRemoved signal"),
                }
            }
        });

        debug!("connected to UPower");
        Ok(Self {
            conn,
            upower,
            sender,
            events,
            pending: VecDeque::new(),
            lifecycle_tasks: vec![added_task, removed_task],
            watch_tasks: HashMap::new(),
        })
    }
}

impl EventSource for UPowerSource {
    async fn enumerate(&mut self) -> Result<Vec<String>> {
        let paths = self
            .upower
            .enumerate_devices()
            .await
            .map_err(|e| PwError::transport("EnumerateDevices call", e))?;
        Ok(paths.into_iter().map(|p| p.to_string()).collect())
    }

    async fn query(&mut self, path: &str) -> Result<DeviceProperties> {
        let proxy = UPowerDeviceProxy::builder(&self.conn)
            .path(path.to_owned())
            .map_err(|e| PwError::lookup(path, e))?
            .build()
            .await
            .map_err(|e| PwError::lookup(path, e))?;

        let snapshot = PropertySnapshot {
            online: proxy.online().await.map_err(|e| PwError::lookup(path, e))?,
            percentage: proxy
                .percentage()
                .await
                .map_err(|e| PwError::lookup(path, e))?,
            state: DeviceState::from_u32(
                proxy.state().await.map_err(|e| PwError::lookup(path, e))?,
            ),
            warning_level: DeviceLevel::from_u32(
                proxy
                    .warning_level()
                    .await
                    .map_err(|e| PwError::lookup(path, e))?,
            ),
            battery_level: DeviceLevel::from_u32(
                proxy
                    .battery_level()
                    .await
                    .map_err(|e| PwError::lookup(path, e))?,
            ),
        };

        Ok(DeviceProperties {
            native_path: proxy
                .native_path()
                .await
                .map_err(|e| PwError::lookup(path, e))?,
            model: proxy.model().await.map_err(|e| PwError::lookup(path, e))?,
            power_supply: proxy
                .power_supply()
                .await
                .map_err(|e| PwError::lookup(path, e))?,
            device_type: DeviceType::from_u32(
                proxy
                    .device_type()
                    .await
                    .map_err(|e| PwError::lookup(path, e))?,
            ),
            snapshot,
        })
    }

    async fn watch(&mut self, path: &str) -> Result<()> {
        if self.watch_tasks.contains_key(path) {
            return Ok(());
        }

        let props = PropertiesProxy::builder(&self.conn)
            .destination(UPOWER_SERVICE)
            .map_err(|e| PwError::lookup(path, e))?
            .path(path.to_owned())
            .map_err(|e| PwError::lookup(path, e))?
            .build()
            .await
            .map_err(|e| PwError::lookup(path, e))?;
        let mut changes = props
            .receive_properties_changed()
            .await
            .map_err(|e| PwError::lookup(path, e))?;

        let tx = self.sender.clone();
        let owned_path = path.to_string();
        let task = tokio::spawn(async move {
            while let Some(signal) = changes.next().await {
                let args = match signal.args() {
                    Ok(args) => args,
                    Err(e) => {
                        warn!(
                            path = %owned_path,
                            error = %PwError::protocol(e),
                            "dropping PropertiesChanged signal",
                        );
                        continue;
                    }
                };
                if args.interface_name().as_str() != DEVICE_INTERFACE {
                    continue;
                }
                match collect_update(args.changed_properties()) {
                    Ok(update) if update.is_empty() => {}
                    Ok(update) => {
                        let _ = tx.send(BusEvent::PropertiesChanged {
                            path: owned_path.clone(),
                            update,
                        });
                    }
                    Err(e) => {
                        warn!(path = %owned_path, error = %e, "dropping PropertiesChanged signal");
                    }
                }
            }
        });

        self.watch_tasks.insert(path.to_string(), task);
        debug!(%path, "watching device properties");
        Ok(())
    }

    fn unwatch(&mut self, path: &str) {
        if let Some(task) = self.watch_tasks.remove(path) {
            task.abort();
            debug!(%path, "released device property watch");
        }
    }

    fn next_event(&mut self) -> Option<BusEvent> {
        if let Some(event) = self.pending.pop_front() {
            return Some(event);
        }
        self.events.try_recv().ok()
    }

    async fn wait(&mut self) -> Result<Wake> {
        match self.events.recv().await {
            Some(event) => {
                self.pending.push_back(event);
                Ok(Wake::Ready)
            }
            None => Err(PwError::transport(
                "wait for bus events",
                "event channel closed",
            )),
        }
    }
}

impl Drop for UPowerSource {
    fn drop(&mut self) {
        for task in self.lifecycle_tasks.drain(..) {
            task.abort();
        }
        for task in self.watch_tasks.values() {
            task.abort();
        }
    }
}

/// Decode the monitored fields out of a PropertiesChanged payload.
///
/// Unknown field names are skipped for forward compatibility; a known field
/// with the wrong type poisons the whole event.
fn collect_update<K: std::borrow::Borrow<str>>(
    changed: &HashMap<K, Value<'_>>,
) -> Result<PropertyUpdate> {
    let mut update = PropertyUpdate::default();
    for (name, value) in changed {
        let name = name.borrow();
        match name {
            "Online" => update.online = Some(read_bool(name, value)?),
            "Percentage" => update.percentage = Some(read_f64(name, value)?),
            "State" => update.state = Some(DeviceState::from_u32(read_u32(name, value)?)),
            "WarningLevel" => {
                update.warning_level = Some(DeviceLevel::from_u32(read_u32(name, value)?));
            }
            "BatteryLevel" => {
                update.battery_level = Some(DeviceLevel::from_u32(read_u32(name, value)?));
            }
            _ => {}
        }
    }
    Ok(update)
}

fn read_u32(name: &str, value: &Value<'_>) -> Result<u32> {
    u32::try_from(value).map_err(|_| PwError::protocol(format!("field {name} is not a u32")))
}

fn read_bool(name: &str, value: &Value<'_>) -> Result<bool> {
    bool::try_from(value).map_err(|_| PwError::protocol(format!("field {name} is not a bool")))
}

fn read_f64(name: &str, value: &Value<'_>) -> Result<f64> {
    f64::try_from(value).map_err(|_| PwError::protocol(format!("field {name} is not a double")))
}
