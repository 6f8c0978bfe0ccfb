// src/error.rs

//! Error types for the simulator.
//!
//! Every variant is fatal: it points at a configuration or logic defect, so the
//! current day's step is aborted and the error is surfaced to the operator.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("delivery has {actual} shelf-life buckets, expected {expected}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("age {age} is outside the shelf life [0, {capacity})")]
    OutOfRange { age: usize, capacity: usize },

    #[error("cannot issue {requested} units at age {age}: only {available} on hand")]
    InsufficientStock {
        age: usize,
        requested: u32,
        available: u32,
    },

    #[error("invalid policy configuration: {0}")]
    InvalidPolicyConfiguration(String),

    #[error("invalid horizon of {days} days: {reason}")]
    InvalidHorizon { days: usize, reason: String },

    #[error("day {day} is past the {horizon}-day demand horizon")]
    HorizonExhausted { day: usize, horizon: usize },

    #[error("unknown unit '{0}'")]
    UnknownUnit(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SimError>;
