use crate::domain::flight::{Flight, FlightState, FlightStatus, Passenger, Pnr, Route, flight_key};
use crate::domain::payout::{PayoutDetail, PayoutRules, PayoutSummary};
use crate::domain::ports::FlightStoreBox;
use crate::error::{FlightError, Result};
use crate::infrastructure::in_memory::InMemoryFlightStore;
use chrono::{Duration, Utc};
use rand::Rng;
use tracing::{debug, info};

/// An eligible flight as listed for manual payout.
#[derive(Debug, Clone, PartialEq)]
pub struct EligibleFlight {
    pub flight_number: String,
    pub state: FlightState,
    pub delay_minutes: u32,
    pub is_cancelled: bool,
    /// Insured passengers not yet paid.
    pub passenger_count: usize,
    /// Passengers already paid on this flight.
    pub paid_count: usize,
}

impl EligibleFlight {
    /// How many payouts a pass could still make under `max_payouts_per_flight`.
    pub fn payable(&self, max_payouts_per_flight: usize) -> usize {
        self.passenger_count
            .min(max_payouts_per_flight.saturating_sub(self.paid_count))
    }
}

/// A pseudo-random flight outcome for demos.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RandomOutcome {
    OnTime,
    Delayed(u32),
    Cancelled,
}

impl RandomOutcome {
    pub const MIN_DELAY_MINUTES: u32 = 15;
    pub const MAX_DELAY_MINUTES: u32 = 300;

    /// 10% cancelled, 45% on time, 45% delayed between 15 and 300 minutes.
    pub fn sample<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let roll: f64 = rng.r#gen();
        if roll < 0.10 {
            RandomOutcome::Cancelled
        } else if roll < 0.55 {
            RandomOutcome::OnTime
        } else {
            RandomOutcome::Delayed(
                rng.gen_range(Self::MIN_DELAY_MINUTES..=Self::MAX_DELAY_MINUTES),
            )
        }
    }
}

/// The authoritative mock flight state.
///
/// Every operation is a read-modify-write against the `FlightStore`; a
/// failing operation leaves the stored flight untouched.
pub struct FlightRegistry {
    store: FlightStoreBox,
    rules: PayoutRules,
}

impl FlightRegistry {
    /// Creates a registry over the given store with default payout rules.
    pub fn new(store: FlightStoreBox) -> Self {
        Self {
            store,
            rules: PayoutRules::default(),
        }
    }

    pub fn with_rules(mut self, rules: PayoutRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn rules(&self) -> &PayoutRules {
        &self.rules
    }

    /// Creates an in-memory registry seeded with the demo flights.
    pub async fn with_demo_flights() -> Result<Self> {
        let registry = Self::new(Box::new(InMemoryFlightStore::new()));
        for flight in demo_flights() {
            registry.add_flight(flight).await?;
        }
        Ok(registry)
    }

    pub async fn add_flight(&self, flight: Flight) -> Result<()> {
        if self.store.exists(&flight.flight_number).await? {
            return Err(FlightError::DuplicateFlight(flight.flight_number));
        }
        info!(flight = %flight.flight_number, "flight added");
        self.store.store(flight).await
    }

    pub async fn remove_flight(&self, flight_number: &str) -> Result<Flight> {
        let removed = self
            .store
            .remove(flight_number)
            .await?
            .ok_or_else(|| FlightError::UnknownFlight(flight_key(flight_number)))?;
        info!(flight = %removed.flight_number, "flight removed");
        Ok(removed)
    }

    pub async fn flight(&self, flight_number: &str) -> Result<Option<Flight>> {
        self.store.get(flight_number).await
    }

    pub async fn flight_status(&self, flight_number: &str) -> Result<Option<FlightStatus>> {
        Ok(self
            .store
            .get(flight_number)
            .await?
            .map(|flight| flight.current_status))
    }

    pub async fn all_flights(&self) -> Result<Vec<Flight>> {
        self.store.get_all().await
    }

    /// Sets the delay of a flight to `minutes`. Not cumulative.
    pub async fn delay_flight(&self, flight_number: &str, minutes: u32) -> Result<()> {
        self.update(flight_number, |flight| {
            flight.set_delay(minutes);
            Ok(())
        })
        .await?;
        info!(flight = %flight_key(flight_number), minutes, "flight delayed");
        Ok(())
    }

    pub async fn cancel_flight(&self, flight_number: &str) -> Result<()> {
        self.update(flight_number, |flight| {
            flight.cancel();
            Ok(())
        })
        .await?;
        info!(flight = %flight_key(flight_number), "flight cancelled");
        Ok(())
    }

    pub async fn add_passenger(
        &self,
        flight_number: &str,
        pnr: &str,
        last_name: &str,
    ) -> Result<()> {
        let passenger = Passenger::new(Pnr::parse(pnr)?, last_name)?;
        self.update(flight_number, |flight| flight.add_passenger(passenger))
            .await
    }

    pub async fn remove_passenger(&self, flight_number: &str, pnr: &str) -> Result<()> {
        let pnr = Pnr::parse(pnr)?;
        self.update(flight_number, |flight| flight.remove_passenger(&pnr).map(|_| ()))
            .await
    }

    /// Flags a passenger as covered by a purchased policy.
    pub async fn mark_insured(&self, flight_number: &str, pnr: &str) -> Result<()> {
        let pnr = Pnr::parse(pnr)?;
        self.update(flight_number, |flight| {
            let number = flight.flight_number.clone();
            let passenger = flight.current_status.passenger_mut(&pnr).ok_or_else(|| {
                FlightError::PassengerNotFound {
                    flight: number,
                    pnr: pnr.to_string(),
                }
            })?;
            passenger.has_insurance = true;
            Ok(())
        })
        .await
    }

    /// True iff the flight is cancelled or delayed by at least
    /// `threshold_minutes`. Unknown flights are never eligible.
    pub async fn check_payout_eligibility(
        &self,
        flight_number: &str,
        threshold_minutes: u32,
    ) -> Result<bool> {
        Ok(self
            .store
            .get(flight_number)
            .await?
            .is_some_and(|flight| flight.current_status.qualifies_for_payout(threshold_minutes)))
    }

    pub async fn flights_eligible_for_payout(
        &self,
        threshold_minutes: u32,
    ) -> Result<Vec<EligibleFlight>> {
        Ok(self
            .store
            .get_all()
            .await?
            .into_iter()
            .filter(|flight| flight.current_status.qualifies_for_payout(threshold_minutes))
            .map(|flight| EligibleFlight {
                state: flight.current_status.state(),
                delay_minutes: flight.current_status.delay_minutes,
                is_cancelled: flight.current_status.is_cancelled,
                passenger_count: flight.current_status.awaiting_payout_count(),
                paid_count: flight.current_status.paid_count(),
                flight_number: flight.flight_number,
            })
            .collect())
    }

    /// Pays every insured, unpaid passenger on every eligible flight using the
    /// registry's own rules.
    pub async fn process_automatic_payouts(&self) -> Result<PayoutSummary> {
        let rules = self.rules;
        self.process_payouts(&rules).await
    }

    pub async fn process_payouts(&self, rules: &PayoutRules) -> Result<PayoutSummary> {
        let mut summary = PayoutSummary::default();
        for flight in self.store.get_all().await? {
            if !flight.current_status.qualifies_for_payout(rules.threshold_minutes) {
                continue;
            }
            summary.merge(self.pay_flight(flight, rules).await?);
        }
        if !summary.is_empty() {
            info!(
                processed = summary.processed,
                total = %summary.total_amount,
                "automatic payouts processed"
            );
        }
        Ok(summary)
    }

    /// Manually triggers payouts for a single flight.
    pub async fn trigger_payouts_for_flight(&self, flight_number: &str) -> Result<PayoutSummary> {
        self.trigger_payouts_with(flight_number, &self.rules).await
    }

    pub async fn trigger_payouts_with(
        &self,
        flight_number: &str,
        rules: &PayoutRules,
    ) -> Result<PayoutSummary> {
        let flight = self.require(flight_number).await?;
        if !flight.current_status.qualifies_for_payout(rules.threshold_minutes) {
            return Err(FlightError::NotEligible(flight.flight_number));
        }
        self.pay_flight(flight, rules).await
    }

    pub async fn generate_random_status(&self, flight_number: &str) -> Result<RandomOutcome> {
        let outcome = RandomOutcome::sample(&mut rand::thread_rng());
        self.apply_outcome(flight_number, outcome).await
    }

    pub async fn generate_random_status_with<R: Rng + ?Sized>(
        &self,
        flight_number: &str,
        rng: &mut R,
    ) -> Result<RandomOutcome> {
        let outcome = RandomOutcome::sample(rng);
        self.apply_outcome(flight_number, outcome).await
    }

    async fn apply_outcome(
        &self,
        flight_number: &str,
        outcome: RandomOutcome,
    ) -> Result<RandomOutcome> {
        self.update(flight_number, |flight| {
            match outcome {
                RandomOutcome::OnTime => flight.set_delay(0),
                RandomOutcome::Delayed(minutes) => flight.set_delay(minutes),
                RandomOutcome::Cancelled => flight.cancel(),
            }
            Ok(())
        })
        .await?;
        debug!(flight = %flight_key(flight_number), ?outcome, "random status applied");
        Ok(outcome)
    }

    async fn pay_flight(&self, mut flight: Flight, rules: &PayoutRules) -> Result<PayoutSummary> {
        let mut summary = PayoutSummary::default();
        let mut remaining = rules
            .max_payouts_per_flight
            .saturating_sub(flight.current_status.paid_count());

        for passenger in flight.current_status.passengers.iter_mut() {
            if remaining == 0 {
                break;
            }
            if passenger.awaiting_payout() && passenger.mark_paid(rules.payout_amount) {
                remaining -= 1;
                summary.record(PayoutDetail {
                    flight_number: flight.flight_number.clone(),
                    pnr: passenger.pnr.to_string(),
                    last_name: passenger.last_name.clone(),
                    amount: rules.payout_amount,
                });
            }
        }

        if !summary.is_empty() {
            flight.current_status.last_updated = Utc::now();
            self.store.store(flight).await?;
        }
        Ok(summary)
    }

    async fn require(&self, flight_number: &str) -> Result<Flight> {
        self.store
            .get(flight_number)
            .await?
            .ok_or_else(|| FlightError::UnknownFlight(flight_key(flight_number)))
    }

    async fn update<F>(&self, flight_number: &str, apply: F) -> Result<()>
    where
        F: FnOnce(&mut Flight) -> Result<()>,
    {
        let mut flight = self.require(flight_number).await?;
        apply(&mut flight)?;
        self.store.store(flight).await
    }
}

/// The flights a fresh demo registry starts with.
pub fn demo_flights() -> Vec<Flight> {
    let base = Utc::now() + Duration::hours(24);
    [
        ("AA123", "American Airlines", "JFK", "LAX", 0),
        ("UA456", "United Airlines", "ORD", "SFO", 2),
        ("DL789", "Delta Air Lines", "ATL", "SEA", 4),
        ("SW101", "Southwest Airlines", "DAL", "DEN", 6),
        ("AB123", "Air Berlin Demo", "BER", "LHR", 8),
    ]
    .into_iter()
    .map(|(number, airline, from, to, offset_hours)| {
        Flight::new(
            number,
            airline,
            Route::new(from, to),
            base + Duration::hours(offset_hours),
        )
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::payout::{Amount, DEFAULT_DELAY_THRESHOLD_MINUTES};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rust_decimal_macros::dec;

    async fn registry() -> FlightRegistry {
        FlightRegistry::with_demo_flights().await.unwrap()
    }

    async fn insured(registry: &FlightRegistry, flight: &str, pnr: &str, last_name: &str) {
        registry.add_passenger(flight, pnr, last_name).await.unwrap();
        registry.mark_insured(flight, pnr).await.unwrap();
    }

    #[tokio::test]
    async fn test_demo_flights_seeded() {
        let registry = registry().await;
        let flights = registry.all_flights().await.unwrap();
        assert_eq!(flights.len(), 5);
        assert!(flights.iter().all(|f| f.current_status.state() == FlightState::OnTime));
    }

    #[tokio::test]
    async fn test_delay_past_threshold_makes_eligible() {
        let registry = registry().await;
        assert!(!registry.check_payout_eligibility("AB123", 120).await.unwrap());

        registry.delay_flight("AB123", 150).await.unwrap();
        assert!(registry.check_payout_eligibility("AB123", 120).await.unwrap());
        assert!(!registry.check_payout_eligibility("AB123", 151).await.unwrap());
    }

    #[tokio::test]
    async fn test_eligibility_boundary() {
        let registry = registry().await;
        registry.delay_flight("AB123", 119).await.unwrap();
        assert!(!registry
            .check_payout_eligibility("AB123", DEFAULT_DELAY_THRESHOLD_MINUTES)
            .await
            .unwrap());

        registry.delay_flight("AB123", 120).await.unwrap();
        assert!(registry
            .check_payout_eligibility("AB123", DEFAULT_DELAY_THRESHOLD_MINUTES)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_cancel_makes_eligible_regardless_of_delay() {
        let registry = registry().await;
        registry.cancel_flight("AB123").await.unwrap();
        registry.cancel_flight("AB123").await.unwrap();

        assert!(registry.check_payout_eligibility("AB123", 120).await.unwrap());
        assert!(registry.check_payout_eligibility("AB123", u32::MAX).await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_flight() {
        let registry = registry().await;
        assert!(matches!(
            registry.delay_flight("ZZ999", 30).await,
            Err(FlightError::UnknownFlight(_))
        ));
        assert!(matches!(
            registry.cancel_flight("ZZ999").await,
            Err(FlightError::UnknownFlight(_))
        ));
        assert!(!registry.check_payout_eligibility("ZZ999", 0).await.unwrap());
        assert!(registry.flight_status("ZZ999").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_pnr_leaves_state_untouched() {
        let registry = registry().await;
        registry.add_passenger("AB123", "ABC123", "Smith").await.unwrap();

        let before = registry.flight("AB123").await.unwrap();
        let result = registry.add_passenger("AB123", "abc123", "Jones").await;
        assert!(matches!(result, Err(FlightError::DuplicatePnr { .. })));
        assert_eq!(registry.flight("AB123").await.unwrap(), before);

        // Same PNR on another flight is fine.
        registry.add_passenger("AA123", "ABC123", "Jones").await.unwrap();
    }

    #[tokio::test]
    async fn test_remove_passenger() {
        let registry = registry().await;
        registry.add_passenger("AB123", "ABC123", "Smith").await.unwrap();
        registry.remove_passenger("AB123", "ABC123").await.unwrap();

        assert!(matches!(
            registry.remove_passenger("AB123", "ABC123").await,
            Err(FlightError::PassengerNotFound { .. })
        ));
        let status = registry.flight_status("AB123").await.unwrap().unwrap();
        assert!(status.passengers.is_empty());
    }

    #[tokio::test]
    async fn test_process_automatic_payouts_is_idempotent() {
        let registry = registry().await;
        insured(&registry, "AB123", "ABC123", "Smith").await;
        insured(&registry, "AB123", "DEF456", "Jones").await;
        registry.add_passenger("AB123", "GHI789", "Brown").await.unwrap();
        registry.delay_flight("AB123", 150).await.unwrap();

        let first = registry.process_automatic_payouts().await.unwrap();
        assert_eq!(first.processed, 2);
        assert_eq!(first.total_amount, dec!(1000));

        let second = registry.process_automatic_payouts().await.unwrap();
        assert_eq!(second.processed, 0);
        assert_eq!(second.total_amount, dec!(0));

        let status = registry.flight_status("AB123").await.unwrap().unwrap();
        assert_eq!(status.paid_count(), 2);
        let uninsured = status.passenger(&Pnr::parse("GHI789").unwrap()).unwrap();
        assert!(!uninsured.payout_processed);
    }

    #[tokio::test]
    async fn test_payout_flag_survives_status_changes() {
        let registry = registry().await;
        insured(&registry, "AB123", "ABC123", "Smith").await;
        registry.cancel_flight("AB123").await.unwrap();
        registry.process_automatic_payouts().await.unwrap();

        registry.delay_flight("AB123", 0).await.unwrap();
        registry.mark_insured("AB123", "ABC123").await.unwrap();
        registry.process_automatic_payouts().await.unwrap();

        let status = registry.flight_status("AB123").await.unwrap().unwrap();
        let passenger = status.passenger(&Pnr::parse("ABC123").unwrap()).unwrap();
        assert!(passenger.payout_processed);
        assert_eq!(passenger.payout_amount.map(|a| a.value()), Some(dec!(500)));
    }

    #[tokio::test]
    async fn test_max_payouts_per_flight() {
        let rules = PayoutRules {
            max_payouts_per_flight: 2,
            ..PayoutRules::default()
        };
        let registry = FlightRegistry::with_demo_flights().await.unwrap().with_rules(rules);
        for (pnr, name) in [("AAA111", "A"), ("BBB222", "B"), ("CCC333", "C")] {
            insured(&registry, "AB123", pnr, name).await;
        }
        registry.cancel_flight("AB123").await.unwrap();

        assert_eq!(registry.process_automatic_payouts().await.unwrap().processed, 2);
        assert_eq!(registry.process_automatic_payouts().await.unwrap().processed, 0);
    }

    #[tokio::test]
    async fn test_process_payouts_with_custom_rules() {
        let registry = registry().await;
        insured(&registry, "AB123", "ABC123", "Smith").await;
        registry.delay_flight("AB123", 60).await.unwrap();

        assert!(registry.process_automatic_payouts().await.unwrap().is_empty());

        let rules = PayoutRules {
            threshold_minutes: 45,
            payout_amount: Amount::new(dec!(250)).unwrap(),
            max_payouts_per_flight: 10,
        };
        let summary = registry.process_payouts(&rules).await.unwrap();
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.details[0].amount.value(), dec!(250));
    }

    #[tokio::test]
    async fn test_trigger_payouts_for_flight() {
        let registry = registry().await;
        insured(&registry, "AB123", "ABC123", "Smith").await;
        insured(&registry, "AA123", "XYZ789", "Jones").await;

        assert!(matches!(
            registry.trigger_payouts_for_flight("AB123").await,
            Err(FlightError::NotEligible(_))
        ));

        registry.cancel_flight("AB123").await.unwrap();
        registry.cancel_flight("AA123").await.unwrap();
        let summary = registry.trigger_payouts_for_flight("AB123").await.unwrap();
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.details[0].pnr, "ABC123");

        let other = registry.flight_status("AA123").await.unwrap().unwrap();
        assert_eq!(other.paid_count(), 0);
    }

    #[tokio::test]
    async fn test_flights_eligible_for_payout() {
        let registry = registry().await;
        insured(&registry, "AB123", "ABC123", "Smith").await;
        registry.delay_flight("AB123", 180).await.unwrap();
        registry.cancel_flight("UA456").await.unwrap();
        registry.delay_flight("DL789", 30).await.unwrap();

        let eligible = registry.flights_eligible_for_payout(120).await.unwrap();
        let numbers: Vec<&str> = eligible.iter().map(|f| f.flight_number.as_str()).collect();
        assert_eq!(numbers, vec!["AB123", "UA456"]);
        assert_eq!(eligible[0].passenger_count, 1);
        assert_eq!(eligible[0].state, FlightState::Delayed);
        assert!(eligible[1].is_cancelled);
    }

    #[tokio::test]
    async fn test_eligible_flight_payable_respects_cap() {
        let registry = registry().await;
        for pnr in ["AAA111", "BBB222", "CCC333"] {
            insured(&registry, "AB123", pnr, "Smith").await;
        }
        registry.cancel_flight("AB123").await.unwrap();

        let rules = PayoutRules {
            max_payouts_per_flight: 2,
            ..PayoutRules::default()
        };
        registry.process_payouts(&rules).await.unwrap();

        let eligible = registry.flights_eligible_for_payout(120).await.unwrap();
        assert_eq!(eligible[0].flight_number, "AB123");
        assert_eq!(eligible[0].passenger_count, 1);
        assert_eq!(eligible[0].paid_count, 2);
        assert_eq!(eligible[0].payable(2), 0);
        assert_eq!(eligible[0].payable(5), 1);
    }

    #[tokio::test]
    async fn test_add_and_remove_flight() {
        let registry = registry().await;
        let flight = Flight::new("NEW1", "Demo Air", Route::new("MIA", "BOS"), Utc::now());
        registry.add_flight(flight.clone()).await.unwrap();
        assert!(matches!(
            registry.add_flight(flight).await,
            Err(FlightError::DuplicateFlight(_))
        ));

        registry.remove_flight("new1").await.unwrap();
        assert!(matches!(
            registry.remove_flight("NEW1").await,
            Err(FlightError::UnknownFlight(_))
        ));
    }

    #[tokio::test]
    async fn test_random_status_is_bounded() {
        let registry = registry().await;
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let outcome = registry
                .generate_random_status_with("AA123", &mut rng)
                .await
                .unwrap();
            if let RandomOutcome::Delayed(minutes) = outcome {
                assert!(
                    (RandomOutcome::MIN_DELAY_MINUTES..=RandomOutcome::MAX_DELAY_MINUTES)
                        .contains(&minutes)
                );
            }
        }
        assert!(registry.generate_random_status("ZZ999").await.is_err());
    }
}
