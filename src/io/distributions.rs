// src/io/distributions.rs

//! Marginal demand distributions and the normal-distribution helpers the
//! copula needs.

use crate::error::{Result, SimError};

/// Rational approximation of the standard normal quantile (Abramowitz &
/// Stegun 26.2.23, |error| < 4.5e-4). Saturates at +/-5 outside (0, 1).
pub fn inverse_normal_cdf(p: f64) -> f64 {
    const NUM: [f64; 3] = [2.515_517, 0.802_853, 0.010_328];
    const DEN: [f64; 3] = [1.432_788, 0.189_269, 0.001_308];

    if p <= 0.0 {
        return -5.0;
    }
    if p >= 1.0 {
        return 5.0;
    }
    let tail = p.min(1.0 - p);
    let t = (-2.0 * tail.ln()).sqrt();
    let num = NUM[0] + t * (NUM[1] + t * NUM[2]);
    let den = 1.0 + t * (DEN[0] + t * (DEN[1] + t * DEN[2]));
    let z = t - num / den;
    if p < 0.5 {
        -z
    } else {
        z
    }
}

/// Standard normal CDF.
///
/// Abramowitz and Stegun formula 26.2.17, absolute error below 7.5e-8.
pub fn standard_normal_cdf(z: f64) -> f64 {
    let x = z.abs();
    let t = 1.0 / (1.0 + 0.231_641_9 * x);
    let density = (-0.5 * x * x).exp() / (2.0 * std::f64::consts::PI).sqrt();
    let poly = t
        * (0.319_381_530
            + t * (-0.356_563_782 + t * (1.781_477_937 + t * (-1.821_255_978 + t * 1.330_274_429))));
    let upper = 1.0 - density * poly;
    if z >= 0.0 {
        upper
    } else {
        1.0 - upper
    }
}

/// Daily demand marginal of one store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Marginal {
    Normal { mean: f64, std_dev: f64 },
    /// Failures before `size` successes with success probability `prob`.
    NegativeBinomial { size: f64, prob: f64 },
}

impl Marginal {
    /// Builds a marginal from its first two moments.
    pub fn from_moments(kind: &str, mean: f64, std_dev: f64) -> Result<Self> {
        match kind {
            "normal" | "Normal" => Ok(Self::Normal { mean, std_dev }),
            "negative_binomial" | "NB" => {
                let variance = std_dev * std_dev;
                if mean <= 0.0 || variance <= mean {
                    return Err(SimError::InvalidConfig(format!(
                        "negative binomial demand needs variance ({variance}) above a positive mean ({mean})"
                    )));
                }
                let prob = mean / variance;
                let size = mean * prob / (1.0 - prob);
                Ok(Self::NegativeBinomial { size, prob })
            }
            other => Err(SimError::InvalidConfig(format!(
                "unknown demand distribution '{other}'"
            ))),
        }
    }

    pub fn mean(&self) -> f64 {
        match self {
            Marginal::Normal { mean, .. } => *mean,
            Marginal::NegativeBinomial { size, prob } => size * (1.0 - prob) / prob,
        }
    }

    pub fn std_dev(&self) -> f64 {
        match self {
            Marginal::Normal { std_dev, .. } => *std_dev,
            Marginal::NegativeBinomial { size, prob } => (size * (1.0 - prob)).sqrt() / prob,
        }
    }

    /// Smallest demand whose CDF reaches `u`; never negative.
    pub fn quantile(&self, u: f64) -> f64 {
        match self {
            Marginal::Normal { mean, std_dev } => {
                (mean + std_dev * inverse_normal_cdf(u)).max(0.0)
            }
            Marginal::NegativeBinomial { size, prob } => {
                // Log space: prob^size underflows for large, low-dispersion means.
                // ln pmf(k + 1) = ln pmf(k) + ln((k + size) / (k + 1)) + ln(1 - prob)
                let limit = (self.mean() + 40.0 * self.std_dev()).ceil() as u64 + 100;
                let ln_fail = (1.0 - prob).ln();
                let mut ln_pmf = size * prob.ln();
                let mut cdf = ln_pmf.exp();
                let mut k = 0u64;
                while cdf < u && k < limit {
                    ln_pmf += ((k as f64 + size) / (k as f64 + 1.0)).ln() + ln_fail;
                    cdf += ln_pmf.exp();
                    k += 1;
                }
                k as f64
            }
        }
    }
}
