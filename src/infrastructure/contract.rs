use crate::domain::flight::{Pnr, flight_key};
use crate::domain::payout::{Amount, PayoutDetail};
use crate::domain::policy::{Policy, PolicyStatus};
use crate::domain::ports::ContractGateway;
use crate::error::{FlightError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

#[derive(Default)]
struct ContractState {
    paused: bool,
    next_policy_id: u64,
    policies: BTreeMap<u64, Policy>,
}

/// In-process stand-in for the insurance contract.
///
/// Keeps policies and the paused flag in memory. Clones share state.
#[derive(Default, Clone)]
pub struct MockContract {
    state: Arc<RwLock<ContractState>>,
}

impl MockContract {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an active policy for a passenger on a flight.
    ///
    /// A passenger holds at most one live policy per flight: purchasing again
    /// while an active or claimed policy exists fails with `DuplicatePolicy`.
    pub async fn purchase_policy(
        &self,
        flight_number: &str,
        pnr: Pnr,
        policyholder: &str,
        premium_amount: Amount,
        payout_amount: Amount,
    ) -> Result<Policy> {
        let mut state = self.state.write().await;
        if state.paused {
            return Err(FlightError::ContractPaused);
        }
        let flight_number = flight_key(flight_number);
        if let Some(existing) = state.policies.values().find(|p| {
            p.flight_number == flight_number
                && p.pnr == pnr
                && matches!(p.status, PolicyStatus::Active | PolicyStatus::Claimed)
        }) {
            return Err(FlightError::DuplicatePolicy {
                flight: flight_number,
                pnr: pnr.to_string(),
                policy_id: existing.id,
            });
        }
        state.next_policy_id += 1;
        let policy = Policy {
            id: state.next_policy_id,
            flight_number,
            pnr,
            policyholder: policyholder.to_string(),
            premium_amount,
            payout_amount,
            status: PolicyStatus::Active,
            created_at: Utc::now(),
            resolved_at: None,
        };
        info!(policy_id = policy.id, flight = %policy.flight_number, "policy purchased");
        state.policies.insert(policy.id, policy.clone());
        Ok(policy)
    }

    pub async fn policy(&self, policy_id: u64) -> Option<Policy> {
        self.state.read().await.policies.get(&policy_id).cloned()
    }

    pub async fn policies_for_flight(&self, flight_number: &str) -> Vec<Policy> {
        let key = flight_key(flight_number);
        self.state
            .read()
            .await
            .policies
            .values()
            .filter(|p| p.flight_number == key)
            .cloned()
            .collect()
    }

    pub async fn cancel_policy(&self, policy_id: u64) -> Result<Policy> {
        self.with_policy(policy_id, |policy| policy.cancel(Utc::now()))
            .await
    }

    pub async fn expire_policy(&self, policy_id: u64) -> Result<Policy> {
        self.with_policy(policy_id, |policy| policy.expire(Utc::now()))
            .await
    }

    async fn with_policy<F>(&self, policy_id: u64, apply: F) -> Result<Policy>
    where
        F: FnOnce(&mut Policy) -> Result<()>,
    {
        let mut state = self.state.write().await;
        let policy = state
            .policies
            .get_mut(&policy_id)
            .ok_or(FlightError::PolicyNotFound(policy_id))?;
        apply(policy)?;
        Ok(policy.clone())
    }
}

#[async_trait]
impl ContractGateway for MockContract {
    async fn is_paused(&self) -> Result<bool> {
        Ok(self.state.read().await.paused)
    }

    async fn pause(&self) -> Result<()> {
        self.state.write().await.paused = true;
        info!("contract paused");
        Ok(())
    }

    async fn unpause(&self) -> Result<()> {
        self.state.write().await.paused = false;
        info!("contract unpaused");
        Ok(())
    }

    async fn settle_payout(&self, payout: &PayoutDetail) -> Result<()> {
        let mut state = self.state.write().await;
        if state.paused {
            return Err(FlightError::ContractPaused);
        }
        let policy = state.policies.values_mut().find(|p| {
            p.is_active() && p.flight_number == payout.flight_number && p.pnr.as_str() == payout.pnr
        });
        match policy {
            Some(policy) => {
                policy.claim(Utc::now())?;
                info!(policy_id = policy.id, amount = %payout.amount, "policy claimed");
            }
            None => {
                warn!(
                    flight = %payout.flight_number,
                    pnr = %payout.pnr,
                    "no active policy for payout"
                );
            }
        }
        Ok(())
    }

    async fn update_policy_status(
        &self,
        policy_id: u64,
        status: PolicyStatus,
        payout_amount: Decimal,
        resolved_at: DateTime<Utc>,
    ) -> Result<Policy> {
        let payout_amount = Amount::new(payout_amount)?;
        self.with_policy(policy_id, |policy| {
            match status {
                PolicyStatus::Claimed => policy.claim(resolved_at)?,
                PolicyStatus::Cancelled => policy.cancel(resolved_at)?,
                PolicyStatus::Expired => policy.expire(resolved_at)?,
                PolicyStatus::Active => {
                    return Err(FlightError::InvalidPolicyTransition {
                        id: policy.id,
                        from: policy.status.as_str(),
                        to: PolicyStatus::Active.as_str(),
                    });
                }
            }
            policy.payout_amount = payout_amount;
            Ok(())
        })
        .await
    }
}
