use flightpay::application::registry::FlightRegistry;
use flightpay::domain::flight::{Flight, Route};
use flightpay::domain::ports::FlightStoreBox;
use flightpay::infrastructure::in_memory::InMemoryFlightStore;
use std::sync::Arc;

#[tokio::test]
async fn test_store_as_trait_object() {
    let store: FlightStoreBox = Box::new(InMemoryFlightStore::new());
    let flight = Flight::new("AB123", "Demo Air", Route::new("JFK", "LAX"), chrono::Utc::now());

    // Verify Send + Sync by spawning tasks
    let handle = tokio::spawn(async move {
        store.store(flight).await.unwrap();
        store.get("AB123").await.unwrap().unwrap()
    });

    let retrieved = handle.await.unwrap();
    assert_eq!(retrieved.flight_number, "AB123");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_shared_registry_across_tasks() {
    let registry = Arc::new(FlightRegistry::with_demo_flights().await.unwrap());

    let mut handles = Vec::new();
    for (flight, pnr) in [("AA123", "AAA111"), ("UA456", "BBB222"), ("DL789", "CCC333")] {
        let registry = registry.clone();
        handles.push(tokio::spawn(async move {
            registry.add_passenger(flight, pnr, "Smith").await.unwrap();
            registry.mark_insured(flight, pnr).await.unwrap();
            registry.cancel_flight(flight).await.unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let summary = registry.process_automatic_payouts().await.unwrap();
    assert_eq!(summary.processed, 3);
    assert_eq!(registry.process_automatic_payouts().await.unwrap().processed, 0);
}
