use crate::error::FlightError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Minimum delay, in minutes, that qualifies a flight for a payout.
pub const DEFAULT_DELAY_THRESHOLD_MINUTES: u32 = 120;
pub const DEFAULT_PAYOUT_AMOUNT: Decimal = dec!(500);
pub const DEFAULT_MAX_PAYOUTS_PER_FLIGHT: usize = 10;
pub const DEFAULT_PREMIUM_AMOUNT: Decimal = dec!(25);

/// Represents a positive monetary amount in USDC.
///
/// Ensures that premiums and payouts are always positive, including when the
/// value comes from a config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, FlightError> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(FlightError::ValidationError(
                "Amount must be positive".to_string(),
            ))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = FlightError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

/// Thresholds applied when turning eligible flights into payouts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PayoutRules {
    pub threshold_minutes: u32,
    pub payout_amount: Amount,
    pub max_payouts_per_flight: usize,
}

impl Default for PayoutRules {
    fn default() -> Self {
        Self {
            threshold_minutes: DEFAULT_DELAY_THRESHOLD_MINUTES,
            payout_amount: Amount(DEFAULT_PAYOUT_AMOUNT),
            max_payouts_per_flight: DEFAULT_MAX_PAYOUTS_PER_FLIGHT,
        }
    }
}

/// A single passenger payout produced by a payout pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PayoutDetail {
    pub flight_number: String,
    pub pnr: String,
    pub last_name: String,
    pub amount: Amount,
}

/// Aggregate result of a payout pass.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PayoutSummary {
    pub processed: usize,
    pub total_amount: Decimal,
    pub details: Vec<PayoutDetail>,
}

impl PayoutSummary {
    pub fn record(&mut self, detail: PayoutDetail) {
        self.processed += 1;
        self.total_amount += detail.amount.value();
        self.details.push(detail);
    }

    pub fn merge(&mut self, other: PayoutSummary) {
        for detail in other.details {
            self.record(detail);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.processed == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_validation() {
        assert!(Amount::new(dec!(1.0)).is_ok());
        assert!(matches!(
            Amount::new(dec!(0.0)),
            Err(FlightError::ValidationError(_))
        ));
        assert!(matches!(
            Amount::new(dec!(-1.0)),
            Err(FlightError::ValidationError(_))
        ));
    }

    #[test]
    fn test_amount_rejects_non_positive_json() {
        let parsed: Result<Amount, _> = serde_json::from_str("0");
        assert!(parsed.is_err());
        let parsed: Amount = serde_json::from_str("250.5").unwrap();
        assert_eq!(parsed.value(), dec!(250.5));
    }

    #[test]
    fn test_summary_accumulates() {
        let mut summary = PayoutSummary::default();
        for pnr in ["ABC123", "XYZ789"] {
            summary.record(PayoutDetail {
                flight_number: "AB123".to_string(),
                pnr: pnr.to_string(),
                last_name: "Smith".to_string(),
                amount: Amount::new(dec!(500)).unwrap(),
            });
        }
        assert_eq!(summary.processed, 2);
        assert_eq!(summary.total_amount, dec!(1000));
        assert!(!summary.is_empty());
    }
}
