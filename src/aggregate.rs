//! Merging decoded output of several devices.
//!
//! Every call decodes with its own header registry, so devices can be decoded
//! in any order or in parallel.

use tracing::debug;

use crate::parse::{self, Command, Decoded};
use crate::record::{Event, Record};

/// Decodes the `-Y` output of `command` run against `device`.
///
/// Every record is tagged with `device`, as is every failure.
#[must_use]
pub fn decode_for_device(
    command: Command,
    device: &str,
    output: &str,
) -> Decoded {
    let mut decoded = parse::decode(command, output);

    for record in &mut decoded.records {
        record.tag_device(device);
    }

    for failure in &mut decoded.failures {
        failure.device = Some(device.into());
    }

    debug!(
        %command,
        device,
        records = decoded.records.len(),
        failures = decoded.failures.len(),
        "decoded device output"
    );

    decoded
}

/// Decodes device enumeration output.
///
/// Each device appears once, in order of first appearance.
#[must_use]
pub fn decode_devices(output: &str) -> Decoded {
    let mut decoded = parse::decode(Command::LsFs, output);
    decoded.records = crate::fs::dedup(decoded.records);
    decoded
}

/// Concatenates the results of several devices.
#[must_use]
pub fn merge<I>(per_device: I) -> Decoded
where
    I: IntoIterator<Item = Decoded>,
{
    per_device.into_iter().collect()
}

/// Returns the names of all device records.
#[must_use]
pub fn device_names(records: &[Record]) -> Vec<String> {
    records
        .iter()
        .filter_map(|record| match record {
            Record::Device(device) => Some(device.name().to_owned()),
            _ => None,
        })
        .collect()
}

// ----------------------------------------------------------------------------
// tests
// ----------------------------------------------------------------------------
