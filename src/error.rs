//! Decoding errors.

use thiserror::Error;

/// Failure to decode a single `-Y` data row.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// The row's record kind never had a header line in this invocation.
    #[error("no header for record kind {identifier:?}")]
    MissingHeader {
        /// The record-kind identifier of the row.
        identifier: String,
    },

    /// A named column is missing or its value cannot be coerced.
    ///
    /// `value` is `None` if either the header does not name the column or the
    /// row is shorter than the column position.
    #[error("cannot decode column {column:?} from value {value:?}")]
    FieldDecode {
        /// The column name as announced by the header.
        column: String,

        /// The raw token, if the row has one at the column position.
        value: Option<String>,
    },
}

impl DecodeError {
    pub(crate) fn field(column: &str, value: Option<&str>) -> Self {
        Self::FieldDecode {
            column: column.into(),
            value: value.map(Into::into),
        }
    }
}

/// A [`DecodeError`] together with the offending line.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{}line {number}: {source}: {line}", device_prefix(.device.as_deref()))]
pub struct RowError {
    /// The device whose output contained the line, once known.
    pub device: Option<String>,

    /// One-based line number within the command output.
    pub number: usize,

    /// The raw line content.
    pub line: String,

    /// What went wrong.
    #[source]
    pub source: DecodeError,
}

fn device_prefix(device: Option<&str>) -> String {
    device.map_or_else(String::new, |device| format!("device {device}: "))
}
