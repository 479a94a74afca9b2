use crate::domain::event::FlightEvent;
use crate::error::{FlightError, Result};
use std::io::Read;

/// Reads simulation events from a CSV source.
///
/// Wraps `csv::Reader`, trimming whitespace and accepting rows that leave
/// trailing optional columns out.
pub struct EventReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> EventReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily deserializes events; a malformed row yields an error without
    /// ending the stream.
    pub fn events(self) -> impl Iterator<Item = Result<FlightEvent>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(FlightError::from))
    }
}
