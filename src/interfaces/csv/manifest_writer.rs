use crate::domain::flight::Flight;
use crate::error::Result;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;

/// One passenger line of the output manifest.
#[derive(Debug, Serialize, PartialEq)]
pub struct ManifestRow {
    pub flight: String,
    pub pnr: String,
    pub last_name: String,
    pub insured: bool,
    pub paid: bool,
    pub payout_amount: Option<Decimal>,
    pub status: String,
}

impl ManifestRow {
    /// Flattens flights into passenger rows, in flight then booking order.
    pub fn from_flights(flights: &[Flight]) -> Vec<Self> {
        flights
            .iter()
            .flat_map(|flight| {
                let status = flight.current_status.state().to_string();
                flight
                    .current_status
                    .passengers
                    .iter()
                    .map(move |passenger| ManifestRow {
                        flight: flight.flight_number.clone(),
                        pnr: passenger.pnr.to_string(),
                        last_name: passenger.last_name.clone(),
                        insured: passenger.has_insurance,
                        paid: passenger.payout_processed,
                        payout_amount: passenger.payout_amount.map(|a| a.value().normalize()),
                        status: status.clone(),
                    })
            })
            .collect()
    }
}

/// Writes the passenger manifest as CSV.
pub struct ManifestWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> ManifestWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_manifest(&mut self, rows: Vec<ManifestRow>) -> Result<()> {
        if rows.is_empty() {
            self.writer.write_record([
                "flight",
                "pnr",
                "last_name",
                "insured",
                "paid",
                "payout_amount",
                "status",
            ])?;
        }
        for row in rows {
            self.writer.serialize(row)?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
