use thiserror::Error;

pub type Result<T> = std::result::Result<T, FlightError>;

#[derive(Error, Debug)]
pub enum FlightError {
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Unknown flight: {0}")]
    UnknownFlight(String),
    #[error("Flight {0} already exists")]
    DuplicateFlight(String),
    #[error("Passenger {pnr} is already booked on flight {flight}")]
    DuplicatePnr { flight: String, pnr: String },
    #[error("Passenger {pnr} not found on flight {flight}")]
    PassengerNotFound { flight: String, pnr: String },
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Flight {0} does not qualify for a payout")]
    NotEligible(String),
    #[error("Contract is paused")]
    ContractPaused,
    #[error("Passenger {pnr} on flight {flight} is already covered by policy {policy_id}")]
    DuplicatePolicy {
        flight: String,
        pnr: String,
        policy_id: u64,
    },
    #[error("Policy {0} not found")]
    PolicyNotFound(u64),
    #[error("Policy {id} cannot move from {from} to {to}")]
    InvalidPolicyTransition {
        id: u64,
        from: &'static str,
        to: &'static str,
    },
    #[error("Auto-pay monitor is already running")]
    AlreadyRunning,
}
