// src/model/issuing.rs

use crate::error::{Result, SimError};
use rand::Rng;
use rand_distr::{Beta, Binomial, Distribution};
use std::collections::BTreeMap;

/// Decides how many of today's customers pick the freshest stock (LIFO).
///
/// The LIFO share is binomial over the day's customers, with either a fixed
/// success probability or one drawn each day from a Beta distribution.
#[derive(Debug, Clone)]
pub enum IssuingSplit {
    Fixed { probability: f64 },
    BetaMixed { mix: Beta<f64> },
}

impl IssuingSplit {
    pub fn fixed(probability: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&probability) {
            return Err(SimError::InvalidPolicyConfiguration(format!(
                "LIFO probability {probability} is not in [0, 1]"
            )));
        }
        Ok(Self::Fixed { probability })
    }

    pub fn beta_mixed(alpha: f64, beta: f64) -> Result<Self> {
        let mix = Beta::new(alpha, beta).map_err(|err| {
            SimError::InvalidPolicyConfiguration(format!(
                "Beta({alpha}, {beta}) LIFO mix: {err}"
            ))
        })?;
        Ok(Self::BetaMixed { mix })
    }

    /// Builds the split from a configuration tag. `beta`/`LS` expects `alpha`
    /// and `beta` parameters, `fixed`/`LF` expects `dirac` (or `probability`).
    pub fn from_tag(kind: &str, params: &BTreeMap<String, f64>) -> Result<Self> {
        let param = |name: &str| {
            params.get(name).copied().ok_or_else(|| {
                SimError::InvalidPolicyConfiguration(format!(
                    "issuing split '{kind}' is missing parameter '{name}'"
                ))
            })
        };
        match kind {
            "beta" | "LS" => Self::beta_mixed(param("alpha")?, param("beta")?),
            "fixed" | "LF" => {
                let probability = param("dirac").or_else(|_| param("probability"))?;
                Self::fixed(probability)
            }
            other => Err(SimError::InvalidPolicyConfiguration(format!(
                "unknown issuing split type '{other}'"
            ))),
        }
    }

    /// Number of LIFO customers among `customers`.
    pub fn sample<R: Rng + ?Sized>(&self, customers: u32, rng: &mut R) -> Result<u32> {
        let probability = match self {
            IssuingSplit::Fixed { probability } => *probability,
            IssuingSplit::BetaMixed { mix } => mix.sample(rng),
        };
        let binomial = Binomial::new(u64::from(customers), probability).map_err(|err| {
            SimError::InvalidPolicyConfiguration(format!("LIFO split p={probability}: {err}"))
        })?;
        // Never above `customers`, so the narrowing cannot truncate.
        Ok(binomial.sample(rng) as u32)
    }
}
