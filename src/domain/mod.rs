//! Domain model: flights, passengers, payouts and policies, plus the ports the
//! application layer talks through.

pub mod event;
pub mod flight;
pub mod payout;
pub mod policy;
pub mod ports;
