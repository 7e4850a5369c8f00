//! Event publishing.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Value, json};

use crate::record::{Attributes, Event};

/// Wraps the attributes of `record` into a complete event.
///
/// The attributes are nested under the event type, next to the `@timestamp`,
/// the `type` and the poll cycle `counter`.
#[must_use]
pub fn envelope<E: Event>(
    record: &E,
    timestamp: DateTime<Utc>,
    counter: u64,
) -> Attributes {
    let kind = record.event_type();

    let mut event = Attributes::new();
    event.insert(
        "@timestamp".into(),
        json!(timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)),
    );
    event.insert("type".into(), json!(kind));
    event.insert("counter".into(), json!(counter));
    event.insert(kind.into(), Value::Object(record.to_event()));

    event
}

/// Writes events as JSON lines.
pub struct Publisher<Output: Write> {
    output: Output,
}

impl<Output: Write> Publisher<Output> {
    /// Returns a publisher writing to `output`.
    pub const fn new(output: Output) -> Self {
        Self { output }
    }

    /// Publishes all `records` of poll cycle `counter`. Returns the number of
    /// published events.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to the output fails.
    pub fn publish<'r, E, I>(&mut self, records: I, counter: u64) -> Result<usize>
    where
        E: Event + 'r,
        I: IntoIterator<Item = &'r E>,
    {
        let timestamp = Utc::now();
        let mut published = 0;

        for record in records {
            let event = envelope(record, timestamp, counter);

            serde_json::to_writer(&mut self.output, &event)
                .context("writing event")?;
            writeln!(self.output).context("writing event")?;

            published += 1;
        }

        self.output.flush().context("flushing events")?;

        Ok(published)
    }

    /// Returns the underlying output.
    pub fn into_inner(self) -> Output {
        self.output
    }
}

// ----------------------------------------------------------------------------
// tests
// ----------------------------------------------------------------------------
