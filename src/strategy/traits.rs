// src/strategy/traits.rs

use crate::error::{Result, SimError};
use crate::model::echelon::Observation;
use std::fmt::Debug;
use std::str::FromStr;

/// End-of-day view of the whole network handed to a policy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Observations {
    pub depot: Option<Observation>,
    /// Retailers in declaration order; that order is also their dispatch priority.
    pub retailers: Vec<(String, Observation)>,
}

impl Observations {
    pub fn depot(&self) -> Result<&Observation> {
        self.depot
            .as_ref()
            .ok_or_else(|| SimError::UnknownUnit("depot".to_string()))
    }

    pub fn retailer(&self, name: &str) -> Result<&Observation> {
        self.retailers
            .iter()
            .find(|(retailer, _)| retailer == name)
            .map(|(_, obs)| obs)
            .ok_or_else(|| SimError::UnknownUnit(name.to_string()))
    }
}

/// A policy's answer for one day.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllocationDecision {
    /// Producer order by residual shelf life; only the freshest bucket is used.
    pub order_size: Vec<u32>,
    /// Per-retailer shipment indexed by residual shelf life on arrival.
    pub dispatched: Vec<(String, Vec<u32>)>,
}

impl AllocationDecision {
    pub fn dispatch_for(&self, retailer: &str) -> Result<&[u32]> {
        self.dispatched
            .iter()
            .find(|(name, _)| name == retailer)
            .map(|(_, quantities)| quantities.as_slice())
            .ok_or_else(|| SimError::UnknownUnit(retailer.to_string()))
    }

    pub fn total_ordered(&self) -> u32 {
        self.order_size.iter().sum()
    }

    pub fn total_dispatched(&self) -> u32 {
        self.dispatched
            .iter()
            .map(|(_, quantities)| quantities.iter().sum::<u32>())
            .sum()
    }
}

/// Constant (COP) or base-stock (BSP) replenishment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplenishmentRule {
    Constant,
    BaseStock,
}

impl FromStr for ReplenishmentRule {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "COP" => Ok(Self::Constant),
            "BSP" => Ok(Self::BaseStock),
            other => Err(SimError::InvalidPolicyConfiguration(format!(
                "unknown replenishment policy '{other}'"
            ))),
        }
    }
}

/// Which stock the depot hands out first when it dispatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssuingOrder {
    Fifo,
    Lifo,
}

impl FromStr for IssuingOrder {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "FIFO" => Ok(Self::Fifo),
            "LIFO" => Ok(Self::Lifo),
            other => Err(SimError::InvalidPolicyConfiguration(format!(
                "unknown issuing policy '{other}'"
            ))),
        }
    }
}

/// Box constraints on a policy's flat parameter vector.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterBounds {
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

impl ParameterBounds {
    pub fn dim(&self) -> usize {
        self.lower.len()
    }

    /// Out-of-bound values are rejected, never clamped.
    pub fn validate(&self, x: &[f64]) -> Result<()> {
        if x.len() != self.dim() {
            return Err(SimError::InvalidPolicyConfiguration(format!(
                "expected {} parameters, got {}",
                self.dim(),
                x.len()
            )));
        }
        for (i, value) in x.iter().enumerate() {
            if !(self.lower[i]..=self.upper[i]).contains(value) {
                return Err(SimError::InvalidPolicyConfiguration(format!(
                    "parameter {i} = {value} outside [{}, {}]",
                    self.lower[i], self.upper[i]
                )));
            }
        }
        Ok(())
    }
}

/// Decision logic for one simulated day across the whole network.
///
/// Implementations read observations only; they never touch unit state.
pub trait AllocationPolicy: Debug {
    /// Structured form of the flat parameter vector.
    type Params: Debug + Clone;

    fn name(&self) -> &str;

    fn decide(&self, observations: &Observations) -> Result<AllocationDecision>;

    fn bounds(&self) -> ParameterBounds;

    /// Validates `x` against `bounds()` and maps it into structured parameters.
    fn params_from_vector(&self, x: &[f64]) -> Result<Self::Params>;

    fn set_parameters(&mut self, params: Self::Params);

    fn set_parameters_from_vector(&mut self, x: &[f64]) -> Result<()> {
        let params = self.params_from_vector(x)?;
        self.set_parameters(params);
        Ok(())
    }
}

/// Rounds a continuous target to whole units, never below zero.
pub fn round_units(value: f64) -> u32 {
    value.round().max(0.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rule_names() {
        assert_eq!("COP".parse::<ReplenishmentRule>().unwrap(), ReplenishmentRule::Constant);
        assert_eq!("BSP".parse::<ReplenishmentRule>().unwrap(), ReplenishmentRule::BaseStock);
        assert_eq!("LIFO".parse::<IssuingOrder>().unwrap(), IssuingOrder::Lifo);
        assert!(matches!(
            "EOQ".parse::<ReplenishmentRule>(),
            Err(SimError::InvalidPolicyConfiguration(_))
        ));
        assert!("lifo".parse::<IssuingOrder>().is_err());
    }

    #[test]
    fn bounds_reject_instead_of_clamping() {
        let bounds = ParameterBounds {
            lower: vec![0.0, 0.0],
            upper: vec![10.0, 1.0],
        };
        assert!(bounds.validate(&[10.0, 0.5]).is_ok());
        assert!(bounds.validate(&[10.5, 0.5]).is_err());
        assert!(bounds.validate(&[-0.1, 0.5]).is_err());
        assert!(bounds.validate(&[1.0]).is_err());
    }

    #[test]
    fn rounding_clamps_negatives() {
        assert_eq!(round_units(-3.2), 0);
        assert_eq!(round_units(2.5), 3);
        assert_eq!(round_units(7.49), 7);
    }
}
