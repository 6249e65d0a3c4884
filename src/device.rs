//! Power device model mirroring the `org.freedesktop.UPower.Device` schema.
//!
//! The numeric values of [`DeviceState`], [`DeviceLevel`] and [`DeviceType`]
//! are fixed by UPower (<https://upower.freedesktop.org/docs/Device.html>);
//! out-of-range values decode to the unknown variant so newer daemons cannot
//! break the loop.

use std::fmt;

use crate::notify::NotifyHandle;

/// Charge state of a battery-powered device (`State` property).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeviceState {
    #[default]
    Unknown,
    Charging,
    Discharging,
    Empty,
    FullyCharged,
    PendingCharge,
    PendingDischarge,
}

impl DeviceState {
    /// Decode the raw property value.
    #[must_use]
    pub const fn from_u32(raw: u32) -> Self {
        match raw {
            1 => Self::Charging,
            2 => Self::Discharging,
            3 => Self::Empty,
            4 => Self::FullyCharged,
            5 => Self::PendingCharge,
            6 => Self::PendingDischarge,
            _ => Self::Unknown,
        }
    }

    /// Human-readable label used in notification bodies.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Charging => "charging",
            Self::Discharging => "discharging",
            Self::Empty => "empty",
            Self::FullyCharged => "fully charged",
            Self::PendingCharge => "pending charge",
            Self::PendingDischarge => "pending discharge",
        }
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Coarse level scale shared by the `WarningLevel` and `BatteryLevel`
/// properties.
///
/// `None` carries two meanings, matching UPower: as a warning level it means
/// "no warning in effect"; as a battery level it means "this device reports a
/// percentage instead of discrete buckets".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeviceLevel {
    #[default]
    Unknown,
    None,
    Discharging,
    Low,
    Critical,
    Action,
    Normal,
    High,
    Full,
}

impl DeviceLevel {
    /// Decode the raw property value.
    #[must_use]
    pub const fn from_u32(raw: u32) -> Self {
        match raw {
            1 => Self::None,
            2 => Self::Discharging,
            3 => Self::Low,
            4 => Self::Critical,
            5 => Self::Action,
            6 => Self::Normal,
            7 => Self::High,
            8 => Self::Full,
            _ => Self::Unknown,
        }
    }

    /// Human-readable label used in notification bodies.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::None => "none",
            Self::Discharging => "discharging",
            Self::Low => "low",
            Self::Critical => "critical",
            Self::Action => "action",
            Self::Normal => "normal",
            Self::High => "high",
            Self::Full => "full",
        }
    }
}

impl fmt::Display for DeviceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Device category (`Type` property).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeviceType {
    #[default]
    Unknown,
    LinePower,
    Battery,
    Ups,
    Monitor,
    Mouse,
    Keyboard,
    Pda,
    Phone,
    MediaPlayer,
    Tablet,
    Computer,
    GamingInput,
    Pen,
    Touchpad,
    Modem,
    Network,
    Headset,
    Speakers,
    Headphones,
    Video,
    OtherAudio,
    RemoteControl,
    Printer,
    Scanner,
    Camera,
    Wearable,
    Toy,
    BluetoothGeneric,
}

/// All variants in schema order, paired with their labels. Shared by the
/// decoder, the display impl and CLI label parsing.
const TYPE_TABLE: [(DeviceType, &str); 29] = [
    (DeviceType::Unknown, "unknown"),
    (DeviceType::LinePower, "line power"),
    (DeviceType::Battery, "battery"),
    (DeviceType::Ups, "ups"),
    (DeviceType::Monitor, "monitor"),
    (DeviceType::Mouse, "mouse"),
    (DeviceType::Keyboard, "keyboard"),
    (DeviceType::Pda, "pda"),
    (DeviceType::Phone, "phone"),
    (DeviceType::MediaPlayer, "media player"),
    (DeviceType::Tablet, "tablet"),
    (DeviceType::Computer, "computer"),
    (DeviceType::GamingInput, "gaming input"),
    (DeviceType::Pen, "pen"),
    (DeviceType::Touchpad, "touchpad"),
    (DeviceType::Modem, "modem"),
    (DeviceType::Network, "network"),
    (DeviceType::Headset, "headset"),
    (DeviceType::Speakers, "speakers"),
    (DeviceType::Headphones, "headphones"),
    (DeviceType::Video, "video"),
    (DeviceType::OtherAudio, "other audio"),
    (DeviceType::RemoteControl, "remote control"),
    (DeviceType::Printer, "printer"),
    (DeviceType::Scanner, "scanner"),
    (DeviceType::Camera, "camera"),
    (DeviceType::Wearable, "wearable"),
    (DeviceType::Toy, "toy"),
    (DeviceType::BluetoothGeneric, "bluetooth generic"),
];

impl DeviceType {
    /// Decode the raw property value.
    #[must_use]
    pub fn from_u32(raw: u32) -> Self {
        TYPE_TABLE
            .get(raw as usize)
            .map_or(Self::Unknown, |(variant, _)| *variant)
    }

    /// Look up a type by its display label. Accepts `-` and `_` as word
    /// separators in addition to spaces, so shells don't need quoting.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        let normalized = label.trim().to_ascii_lowercase().replace(['-', '_'], " ");
        TYPE_TABLE
            .iter()
            .find(|(_, name)| *name == normalized)
            .map(|(variant, _)| *variant)
    }

    /// Human-readable label, e.g. for title fallbacks.
    #[must_use]
    pub fn label(self) -> &'static str {
        TYPE_TABLE[self as usize].1
    }

    /// Whether this device carries its own charge and therefore reports
    /// `state` and `warning_level`. Line power and unknown devices only
    /// report `online`.
    #[must_use]
    pub const fn is_battery_powered(self) -> bool {
        !matches!(self, Self::Unknown | Self::LinePower)
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Monitored property values for one device at one observation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PropertySnapshot {
    pub online: bool,
    pub percentage: f64,
    pub state: DeviceState,
    pub warning_level: DeviceLevel,
    pub battery_level: DeviceLevel,
}

/// Subset of monitored properties carried by a change event. Only fields
/// present in the event are set; everything else stays untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PropertyUpdate {
    pub online: Option<bool>,
    pub percentage: Option<f64>,
    pub state: Option<DeviceState>,
    pub warning_level: Option<DeviceLevel>,
    pub battery_level: Option<DeviceLevel>,
}

impl PropertyUpdate {
    /// True when no monitored field is present.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.online.is_none()
            && self.percentage.is_none()
            && self.state.is_none()
            && self.warning_level.is_none()
            && self.battery_level.is_none()
    }
}

/// Full property readout returned by a device query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceProperties {
    pub native_path: String,
    pub model: String,
    pub power_supply: bool,
    pub device_type: DeviceType,
    pub snapshot: PropertySnapshot,
}

/// Independent notification slot per change category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifySlot {
    State,
    Warning,
    Online,
}

impl NotifySlot {
    pub const COUNT: usize = 3;

    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::State => 0,
            Self::Warning => 1,
            Self::Online => 2,
        }
    }
}

/// A tracked power device and its observation history.
///
/// `current` is refined in place by property-change events; `last` is the
/// snapshot as of the previous loop pass. The differ compares the two and
/// the engine commits `last = current` at the end of every pass.
#[derive(Debug, Clone)]
pub struct DeviceRecord {
    pub path: String,
    pub native_path: String,
    pub model: String,
    pub device_type: DeviceType,
    pub power_supply: bool,
    pub current: PropertySnapshot,
    pub last: PropertySnapshot,
    handles: [Option<NotifyHandle>; NotifySlot::COUNT],
}

impl DeviceRecord {
    /// Create an empty record for a newly seen path. All properties start
    /// at their "never reported" defaults until the first query lands.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            native_path: String::new(),
            model: String::new(),
            device_type: DeviceType::Unknown,
            power_supply: false,
            current: PropertySnapshot::default(),
            last: PropertySnapshot::default(),
            handles: [None; NotifySlot::COUNT],
        }
    }

    /// Overwrite static properties and `current` from a full query.
    /// `last` and the notification handles are deliberately untouched, so a
    /// refresh or re-add keeps its change baseline and replace slots.
    pub fn apply_refresh(&mut self, props: &DeviceProperties) {
        self.native_path = props.native_path.clone();
        self.model = props.model.clone();
        self.power_supply = props.power_supply;
        self.device_type = props.device_type;
        self.current = props.snapshot;
    }

    /// Overwrite only the fields present in a change event.
    pub fn apply_update(&mut self, update: &PropertyUpdate) {
        if let Some(online) = update.online {
            self.current.online = online;
        }
        if let Some(percentage) = update.percentage {
            self.current.percentage = percentage;
        }
        if let Some(state) = update.state {
            self.current.state = state;
        }
        if let Some(level) = update.warning_level {
            self.current.warning_level = level;
        }
        if let Some(level) = update.battery_level {
            self.current.battery_level = level;
        }
    }

    /// Whether this device reports charge state and warnings.
    #[must_use]
    pub const fn is_battery_powered(&self) -> bool {
        self.device_type.is_battery_powered()
    }

    /// Best available location string: the native path when the device
    /// reported one, the bus path otherwise.
    #[must_use]
    pub fn location(&self) -> &str {
        if self.native_path.is_empty() {
            &self.path
        } else {
            &self.native_path
        }
    }

    /// Handle stored for a notification slot, if any.
    #[must_use]
    pub const fn handle(&self, slot: NotifySlot) -> Option<NotifyHandle> {
        self.handles[slot.index()]
    }

    /// Store the handle returned by a notify call for later replacement.
    pub fn set_handle(&mut self, slot: NotifySlot, handle: NotifyHandle) {
        self.handles[slot.index()] = Some(handle);
    }
}
