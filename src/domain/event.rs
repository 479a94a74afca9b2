use serde::Deserialize;

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    AddFlight,
    AddPassenger,
    RemovePassenger,
    Insure,
    Delay,
    Cancel,
    Payout,
}

/// One simulated change to the flight registry.
///
/// Which optional columns are required depends on `type`: passenger events
/// need `pnr` (and `last_name` when adding), `delay` needs `minutes`,
/// `add_flight` needs `departure` and `arrival`.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct FlightEvent {
    pub r#type: EventType,
    pub flight: String,
    #[serde(default)]
    pub pnr: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub minutes: Option<u32>,
    #[serde(default)]
    pub departure: Option<String>,
    #[serde(default)]
    pub arrival: Option<String>,
}
