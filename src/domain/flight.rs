use crate::domain::payout::Amount;
use crate::error::FlightError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const PNR_LENGTH: usize = 6;

/// A passenger name record: a 6 character alphanumeric booking reference.
///
/// Stored uppercased, so `abc123` and `ABC123` name the same booking.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pnr(String);

impl Pnr {
    pub fn parse(value: &str) -> Result<Self, FlightError> {
        let value = value.trim();
        if value.len() != PNR_LENGTH || !value.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(FlightError::ValidationError(format!(
                "PNR must be {PNR_LENGTH} alphanumeric characters, got {value:?}"
            )));
        }
        Ok(Self(value.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Pnr {
    type Error = FlightError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Pnr> for String {
    fn from(pnr: Pnr) -> Self {
        pnr.0
    }
}

impl fmt::Display for Pnr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalizes a flight number into its registry key.
pub fn flight_key(flight_number: &str) -> String {
    flight_number.trim().to_ascii_uppercase()
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct Route {
    pub departure: String,
    pub arrival: String,
}

impl Route {
    pub fn new(departure: &str, arrival: &str) -> Self {
        Self {
            departure: departure.trim().to_ascii_uppercase(),
            arrival: arrival.trim().to_ascii_uppercase(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlightState {
    OnTime,
    Delayed,
    Cancelled,
}

impl fmt::Display for FlightState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FlightState::OnTime => "ON_TIME",
            FlightState::Delayed => "DELAYED",
            FlightState::Cancelled => "CANCELLED",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Passenger {
    pub pnr: Pnr,
    pub last_name: String,
    pub has_insurance: bool,
    pub payout_processed: bool,
    pub payout_amount: Option<Amount>,
}

impl Passenger {
    pub fn new(pnr: Pnr, last_name: &str) -> Result<Self, FlightError> {
        let last_name = last_name.trim();
        if last_name.is_empty() {
            return Err(FlightError::ValidationError(
                "Last name must not be empty".to_string(),
            ));
        }
        Ok(Self {
            pnr,
            last_name: last_name.to_string(),
            has_insurance: false,
            payout_processed: false,
            payout_amount: None,
        })
    }

    /// Whether this passenger is still owed a payout.
    pub fn awaiting_payout(&self) -> bool {
        self.has_insurance && !self.payout_processed
    }

    /// Marks the passenger as paid. Returns false if already paid; a paid
    /// passenger is never paid again and never reverts to unpaid.
    pub fn mark_paid(&mut self, amount: Amount) -> bool {
        if self.payout_processed {
            return false;
        }
        self.payout_processed = true;
        self.payout_amount = Some(amount);
        true
    }
}

/// Live status of a flight as reported by the mock flight data source.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct FlightStatus {
    pub delay_minutes: u32,
    pub is_cancelled: bool,
    pub actual_departure: Option<DateTime<Utc>>,
    pub passengers: Vec<Passenger>,
    pub last_updated: DateTime<Utc>,
}

impl FlightStatus {
    pub fn state(&self) -> FlightState {
        if self.is_cancelled {
            FlightState::Cancelled
        } else if self.delay_minutes > 0 {
            FlightState::Delayed
        } else {
            FlightState::OnTime
        }
    }

    /// Cancelled flights qualify regardless of delay.
    pub fn qualifies_for_payout(&self, threshold_minutes: u32) -> bool {
        self.is_cancelled || self.delay_minutes >= threshold_minutes
    }

    pub fn passenger(&self, pnr: &Pnr) -> Option<&Passenger> {
        self.passengers.iter().find(|p| &p.pnr == pnr)
    }

    pub fn passenger_mut(&mut self, pnr: &Pnr) -> Option<&mut Passenger> {
        self.passengers.iter_mut().find(|p| &p.pnr == pnr)
    }

    pub fn insured_count(&self) -> usize {
        self.passengers.iter().filter(|p| p.has_insurance).count()
    }

    pub fn paid_count(&self) -> usize {
        self.passengers.iter().filter(|p| p.payout_processed).count()
    }

    pub fn awaiting_payout_count(&self) -> usize {
        self.passengers.iter().filter(|p| p.awaiting_payout()).count()
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Flight {
    pub flight_number: String,
    pub airline: String,
    pub route: Route,
    pub scheduled_departure: DateTime<Utc>,
    pub current_status: FlightStatus,
}

impl Flight {
    pub fn new(
        flight_number: &str,
        airline: &str,
        route: Route,
        scheduled_departure: DateTime<Utc>,
    ) -> Self {
        Self {
            flight_number: flight_key(flight_number),
            airline: airline.to_string(),
            route,
            scheduled_departure,
            current_status: FlightStatus {
                delay_minutes: 0,
                is_cancelled: false,
                actual_departure: Some(scheduled_departure),
                passengers: Vec::new(),
                last_updated: Utc::now(),
            },
        }
    }

    /// Sets the delay to an absolute number of minutes.
    pub fn set_delay(&mut self, minutes: u32) {
        let status = &mut self.current_status;
        status.delay_minutes = minutes;
        if !status.is_cancelled {
            status.actual_departure =
                Some(self.scheduled_departure + Duration::minutes(i64::from(minutes)));
        }
        status.last_updated = Utc::now();
    }

    pub fn cancel(&mut self) {
        let status = &mut self.current_status;
        status.is_cancelled = true;
        status.actual_departure = None;
        status.last_updated = Utc::now();
    }

    pub fn add_passenger(&mut self, passenger: Passenger) -> Result<(), FlightError> {
        if self.current_status.passenger(&passenger.pnr).is_some() {
            return Err(FlightError::DuplicatePnr {
                flight: self.flight_number.clone(),
                pnr: passenger.pnr.to_string(),
            });
        }
        self.current_status.passengers.push(passenger);
        self.current_status.last_updated = Utc::now();
        Ok(())
    }

    pub fn remove_passenger(&mut self, pnr: &Pnr) -> Result<Passenger, FlightError> {
        let passengers = &mut self.current_status.passengers;
        let index = passengers
            .iter()
            .position(|p| &p.pnr == pnr)
            .ok_or_else(|| FlightError::PassengerNotFound {
                flight: self.flight_number.clone(),
                pnr: pnr.to_string(),
            })?;
        let removed = passengers.remove(index);
        self.current_status.last_updated = Utc::now();
        Ok(removed)
    }
}
