use crate::domain::flight::{Flight, flight_key};
use crate::domain::ports::FlightStore;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory store for flights.
///
/// Uses `Arc<RwLock<HashMap<String, Flight>>>` so the registry and the
/// auto-pay monitor task can share it. Nothing is persisted.
#[derive(Default, Clone)]
pub struct InMemoryFlightStore {
    flights: Arc<RwLock<HashMap<String, Flight>>>,
}

impl InMemoryFlightStore {
    /// Creates a new, empty in-memory flight store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FlightStore for InMemoryFlightStore {
    async fn store(&self, flight: Flight) -> Result<()> {
        let mut flights = self.flights.write().await;
        flights.insert(flight.flight_number.clone(), flight);
        Ok(())
    }

    async fn get(&self, flight_number: &str) -> Result<Option<Flight>> {
        let flights = self.flights.read().await;
        Ok(flights.get(&flight_key(flight_number)).cloned())
    }

    async fn remove(&self, flight_number: &str) -> Result<Option<Flight>> {
        let mut flights = self.flights.write().await;
        Ok(flights.remove(&flight_key(flight_number)))
    }

    async fn get_all(&self) -> Result<Vec<Flight>> {
        let flights = self.flights.read().await;
        let mut all: Vec<Flight> = flights.values().cloned().collect();
        all.sort_by(|a, b| a.flight_number.cmp(&b.flight_number));
        Ok(all)
    }
}
