//! `mmlsfs` decoding, i.e. device enumeration.

use std::collections::HashSet;

use serde_json::json;

use crate::error::DecodeError;
use crate::parse::Row;
use crate::record::{Attributes, Event, Record, attributes};

/// Arguments to `mmlsfs` that list every attribute of every device.
pub const ARGS: [&str; 2] = ["all", "-Y"];

/// A file system device.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct Device {
    name: String,
}

impl Device {
    /// Returns the device name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the device name.
    #[must_use]
    pub fn into_name(self) -> String {
        self.name
    }
}

impl Event for Device {
    fn event_type(&self) -> &'static str {
        "device"
    }

    fn to_event(&self) -> Attributes {
        attributes([("name", json!(self.name))])
    }

    fn tag_device(&mut self, _device: &str) {}
}

/// Removes repeated devices, keeping the first occurrence of each name.
///
/// `mmlsfs` prints one line per attribute, so every device shows up many
/// times. Records other than devices are kept as they are.
#[must_use]
pub fn dedup(records: Vec<Record>) -> Vec<Record> {
    let mut seen = HashSet::new();

    records
        .into_iter()
        .filter(|record| match record {
            Record::Device(device) => seen.insert(device.name.clone()),
            _ => true,
        })
        .collect()
}

// ----------------------------------------------------------------------------
// boiler-platy parsing
// ----------------------------------------------------------------------------

pub(crate) fn decode(row: &Row<'_, '_>) -> Result<Record, DecodeError> {
    let name = row.string("deviceName")?;

    Ok(Device { name }.into())
}

// ----------------------------------------------------------------------------
// tests
// ----------------------------------------------------------------------------
