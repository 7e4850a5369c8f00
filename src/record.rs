//! Decoded records.

use serde_json::{Map, Value};

use crate::df::DiskSpace;
use crate::fileset::Fileset;
use crate::fs::Device;
use crate::quota::Quota;

/// Attribute map of a record, as handed to event publishing.
pub type Attributes = Map<String, Value>;

/// Capabilities shared by all records.
pub trait Event {
    /// Returns the event type name.
    fn event_type(&self) -> &'static str;

    /// Flattens the record into an attribute map.
    fn to_event(&self) -> Attributes;

    /// Associates the record with the device whose output it was decoded
    /// from. Records that already identify their device ignore this, as do
    /// records that are tagged already.
    fn tag_device(&mut self, device: &str);
}

/// Any decoded record.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum Record {
    /// `mmrepquota` entry.
    Quota(Quota),

    /// `mmlsfs` device.
    Device(Device),

    /// `mmdf` entry.
    DiskSpace(DiskSpace),

    /// `mmlsfileset` entry.
    Fileset(Fileset),
}

impl Event for Record {
    fn event_type(&self) -> &'static str {
        match self {
            Self::Quota(r) => r.event_type(),
            Self::Device(r) => r.event_type(),
            Self::DiskSpace(r) => r.event_type(),
            Self::Fileset(r) => r.event_type(),
        }
    }

    fn to_event(&self) -> Attributes {
        match self {
            Self::Quota(r) => r.to_event(),
            Self::Device(r) => r.to_event(),
            Self::DiskSpace(r) => r.to_event(),
            Self::Fileset(r) => r.to_event(),
        }
    }

    fn tag_device(&mut self, device: &str) {
        match self {
            Self::Quota(r) => r.tag_device(device),
            Self::Device(r) => r.tag_device(device),
            Self::DiskSpace(r) => r.tag_device(device),
            Self::Fileset(r) => r.tag_device(device),
        }
    }
}

impl From<Quota> for Record {
    fn from(r: Quota) -> Self {
        Self::Quota(r)
    }
}

impl From<Device> for Record {
    fn from(r: Device) -> Self {
        Self::Device(r)
    }
}

impl From<DiskSpace> for Record {
    fn from(r: DiskSpace) -> Self {
        Self::DiskSpace(r)
    }
}

impl From<Fileset> for Record {
    fn from(r: Fileset) -> Self {
        Self::Fileset(r)
    }
}

/// Sets `slot` to `device` unless it is set already.
pub(crate) fn tag_once(slot: &mut Option<String>, device: &str) {
    if slot.is_none() {
        *slot = Some(device.into());
    }
}

/// Collects `(key, value)` pairs into an attribute map.
pub(crate) fn attributes<const N: usize>(
    pairs: [(&str, Value); N],
) -> Attributes {
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_owned(), value))
        .collect()
}
