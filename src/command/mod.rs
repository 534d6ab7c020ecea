//! Command execution pipeline
//!
//! Turns a routed instruction into a launched deep link:
//! ParsedRoute -> IntentResolver -> Action -> ActionDispatcher -> Device

pub mod executor;
pub mod resolver;

pub use executor::{ActionDispatcher, DispatchOutcome};
pub use resolver::{IntentResolution, IntentResolver};
