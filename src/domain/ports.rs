use super::flight::Flight;
use super::payout::PayoutDetail;
use super::policy::{Policy, PolicyStatus};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::fmt;
use std::sync::Arc;

#[async_trait]
pub trait FlightStore: Send + Sync {
    async fn store(&self, flight: Flight) -> Result<()>;
    async fn get(&self, flight_number: &str) -> Result<Option<Flight>>;
    async fn remove(&self, flight_number: &str) -> Result<Option<Flight>>;
    async fn get_all(&self) -> Result<Vec<Flight>>;

    async fn exists(&self, flight_number: &str) -> Result<bool> {
        Ok(self.get(flight_number).await?.is_some())
    }
}

pub type FlightStoreBox = Box<dyn FlightStore>;

/// The insurance contract the payouts are settled against.
#[async_trait]
pub trait ContractGateway: Send + Sync {
    async fn is_paused(&self) -> Result<bool>;
    async fn pause(&self) -> Result<()>;
    async fn unpause(&self) -> Result<()>;
    /// Records a processed payout on chain, claiming the matching policy.
    async fn settle_payout(&self, payout: &PayoutDetail) -> Result<()>;
    async fn update_policy_status(
        &self,
        policy_id: u64,
        status: PolicyStatus,
        payout_amount: Decimal,
        resolved_at: DateTime<Utc>,
    ) -> Result<Policy>;
}

pub type ContractGatewayRef = Arc<dyn ContractGateway>;

#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    PayoutsProcessed { processed: usize, total_amount: Decimal },
    AwaitingConfirmation { flights: Vec<String> },
    CycleFailed { attempts: u32, error: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Email,
    Sms,
    Push,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Channel::Email => "email",
            Channel::Sms => "sms",
            Channel::Push => "push",
        };
        f.write_str(name)
    }
}

/// User-facing feedback surface. Delivery is fire-and-forget.
pub trait Notifier: Send + Sync {
    fn notify(&self, channel: Channel, notification: &Notification);
}

pub type NotifierRef = Arc<dyn Notifier>;
