use crate::domain::flight::Pnr;
use crate::domain::payout::Amount;
use crate::error::FlightError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};

/// Lifecycle of a policy. Only `Active` policies can move, and every move is
/// final.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum PolicyStatus {
    Active,
    Claimed,
    Cancelled,
    Expired,
}

impl PolicyStatus {
    /// The numeric status code used by the insurance contract.
    pub fn code(self) -> u8 {
        match self {
            PolicyStatus::Active => 0,
            PolicyStatus::Claimed => 1,
            PolicyStatus::Cancelled => 2,
            PolicyStatus::Expired => 3,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(PolicyStatus::Active),
            1 => Some(PolicyStatus::Claimed),
            2 => Some(PolicyStatus::Cancelled),
            3 => Some(PolicyStatus::Expired),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PolicyStatus::Active => "active",
            PolicyStatus::Claimed => "claimed",
            PolicyStatus::Cancelled => "cancelled",
            PolicyStatus::Expired => "expired",
        }
    }
}

/// A purchased coverage record tied to one passenger on one flight.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    pub id: u64,
    pub flight_number: String,
    pub pnr: Pnr,
    /// Opaque wallet address of the buyer.
    pub policyholder: String,
    pub premium_amount: Amount,
    pub payout_amount: Amount,
    #[serde(
        serialize_with = "serialize_status",
        deserialize_with = "deserialize_status"
    )]
    pub status: PolicyStatus,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

fn serialize_status<S>(status: &PolicyStatus, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_u8(status.code())
}

fn deserialize_status<'de, D>(deserializer: D) -> Result<PolicyStatus, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let code = u8::deserialize(deserializer)?;
    PolicyStatus::from_code(code)
        .ok_or_else(|| serde::de::Error::custom(format!("unknown policy status {code}")))
}

impl Policy {
    pub fn is_active(&self) -> bool {
        self.status == PolicyStatus::Active
    }

    /// Claims the policy after its payout has been settled.
    pub fn claim(&mut self, resolved_at: DateTime<Utc>) -> Result<(), FlightError> {
        self.transition(PolicyStatus::Claimed, resolved_at)
    }

    pub fn cancel(&mut self, resolved_at: DateTime<Utc>) -> Result<(), FlightError> {
        self.transition(PolicyStatus::Cancelled, resolved_at)
    }

    pub fn expire(&mut self, resolved_at: DateTime<Utc>) -> Result<(), FlightError> {
        self.transition(PolicyStatus::Expired, resolved_at)
    }

    fn transition(
        &mut self,
        to: PolicyStatus,
        resolved_at: DateTime<Utc>,
    ) -> Result<(), FlightError> {
        if !self.is_active() {
            return Err(FlightError::InvalidPolicyTransition {
                id: self.id,
                from: self.status.as_str(),
                to: to.as_str(),
            });
        }
        self.status = to;
        self.resolved_at = Some(resolved_at);
        Ok(())
    }
}
