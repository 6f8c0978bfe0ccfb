//! Daily simulation of a perishable-goods supply chain: a producer, an
//! optional depot and its retailers, with shelf-life-bucketed stock.

pub mod error;
pub mod io;
pub mod logging;
pub mod model;
pub mod simulation;
pub mod strategy;

pub use error::{Result, SimError};
