use crate::application::monitor::AutoPayMonitor;
use crate::application::registry::FlightRegistry;
use crate::domain::event::{EventType, FlightEvent};
use crate::domain::flight::{Flight, Pnr, Route, flight_key};
use crate::domain::payout::{Amount, DEFAULT_PREMIUM_AMOUNT};
use crate::error::{FlightError, Result};
use crate::infrastructure::contract::MockContract;
use crate::interfaces::csv::manifest_writer::ManifestRow;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::debug;

/// Wallet address used for policies bought through the simulator.
pub const DEMO_POLICYHOLDER: &str = "0x0000000000000000000000000000000000demo";

/// Replays admin-panel actions against a registry and its contract.
pub struct Simulator {
    registry: Arc<FlightRegistry>,
    contract: MockContract,
    monitor: AutoPayMonitor,
}

impl Simulator {
    pub fn new(
        registry: Arc<FlightRegistry>,
        contract: MockContract,
        monitor: AutoPayMonitor,
    ) -> Self {
        Self {
            registry,
            contract,
            monitor,
        }
    }

    pub fn monitor(&self) -> &AutoPayMonitor {
        &self.monitor
    }

    pub async fn process_event(&self, event: FlightEvent) -> Result<()> {
        debug!(?event, "processing event");
        let flight = event.flight.as_str();
        match event.r#type {
            EventType::AddFlight => {
                let departure = required(event.departure.as_deref(), "departure")?;
                let arrival = required(event.arrival.as_deref(), "arrival")?;
                let new_flight = Flight::new(
                    flight,
                    "Demo Air",
                    Route::new(departure, arrival),
                    Utc::now() + Duration::hours(24),
                );
                self.registry.add_flight(new_flight).await
            }
            EventType::AddPassenger => {
                let pnr = required(event.pnr.as_deref(), "pnr")?;
                let last_name = required(event.last_name.as_deref(), "last_name")?;
                self.registry.add_passenger(flight, pnr, last_name).await
            }
            EventType::RemovePassenger => {
                let pnr = required(event.pnr.as_deref(), "pnr")?;
                self.registry.remove_passenger(flight, pnr).await
            }
            EventType::Insure => {
                let pnr = Pnr::parse(required(event.pnr.as_deref(), "pnr")?)?;
                self.insure(flight, pnr).await
            }
            EventType::Delay => {
                let minutes = event.minutes.ok_or_else(|| missing("minutes"))?;
                self.registry.delay_flight(flight, minutes).await
            }
            EventType::Cancel => self.registry.cancel_flight(flight).await,
            EventType::Payout => self.monitor.confirm_payouts(flight).await.map(|_| ()),
        }
    }

    /// Buys a policy for a booked passenger, then flags them insured. The
    /// passenger is only flagged once the contract has accepted the policy.
    async fn insure(&self, flight: &str, pnr: Pnr) -> Result<()> {
        let status = self
            .registry
            .flight_status(flight)
            .await?
            .ok_or_else(|| FlightError::UnknownFlight(flight_key(flight)))?;
        if status.passenger(&pnr).is_none() {
            return Err(FlightError::PassengerNotFound {
                flight: flight_key(flight),
                pnr: pnr.to_string(),
            });
        }

        let premium = Amount::new(DEFAULT_PREMIUM_AMOUNT)?;
        let policy = self
            .contract
            .purchase_policy(
                flight,
                pnr.clone(),
                DEMO_POLICYHOLDER,
                premium,
                self.monitor.config().payout_amount,
            )
            .await?;

        if let Err(error) = self.registry.mark_insured(flight, pnr.as_str()).await {
            // Passenger vanished between the check and the write.
            self.contract.cancel_policy(policy.id).await?;
            return Err(error);
        }
        Ok(())
    }

    pub async fn manifest(&self) -> Result<Vec<ManifestRow>> {
        let flights = self.registry.all_flights().await?;
        Ok(ManifestRow::from_flights(&flights))
    }
}

fn required<'a>(value: Option<&'a str>, column: &str) -> Result<&'a str> {
    value.filter(|v| !v.is_empty()).ok_or_else(|| missing(column))
}

fn missing(column: &str) -> FlightError {
    FlightError::ValidationError(format!("event is missing the {column} column"))
}
