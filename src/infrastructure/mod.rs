pub mod contract;
pub mod in_memory;
pub mod notifier;
