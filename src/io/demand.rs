// src/io/demand.rs

use crate::error::{Result, SimError};
use crate::io::distributions::{standard_normal_cdf, Marginal};
use crate::simulation::config::{SimulationConfig, WEEK};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Source of each unit's daily demand for an episode.
///
/// Sequences are read-only once handed out; units only index into them.
pub trait DemandProvider {
    /// `horizon_days` non-negative daily demands for `identity`.
    fn daily_demand(&mut self, horizon_days: usize, identity: &str) -> Result<Arc<[f64]>>;

    /// Reseeds the provider; `None` draws from entropy.
    fn set_seed(&mut self, _seed: Option<u64>) {}

    /// Called at every episode reset.
    fn new_episode(&mut self) {}
}

/// Rejects horizons that are not whole weeks.
pub fn check_weekly(horizon_days: usize) -> Result<()> {
    if horizon_days == 0 || horizon_days % WEEK != 0 {
        return Err(SimError::InvalidHorizon {
            days: horizon_days,
            reason: format!("demand is generated weekly; use a multiple of {WEEK}"),
        });
    }
    Ok(())
}

/// Every unit sees the exact same demand every day.
/// Useful for testing stability (e.g., step-response tests).
#[derive(Debug, Clone)]
pub struct ConstantDemand {
    value: f64,
}

impl ConstantDemand {
    pub fn new(value: f64) -> Self {
        Self { value }
    }
}

impl DemandProvider for ConstantDemand {
    fn daily_demand(&mut self, horizon_days: usize, _identity: &str) -> Result<Arc<[f64]>> {
        Ok(Arc::from(vec![self.value; horizon_days]))
    }
}

/// Hand-written demand per identity.
#[derive(Debug, Clone, Default)]
pub struct ScheduledDemand {
    schedules: HashMap<String, Vec<f64>>,
}

impl ScheduledDemand {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, identity: impl Into<String>, schedule: Vec<f64>) -> Self {
        self.schedules.insert(identity.into(), schedule);
        self
    }
}

impl DemandProvider for ScheduledDemand {
    fn daily_demand(&mut self, horizon_days: usize, identity: &str) -> Result<Arc<[f64]>> {
        let schedule = self
            .schedules
            .get(identity)
            .ok_or_else(|| SimError::UnknownUnit(identity.to_string()))?;
        if schedule.len() < horizon_days {
            return Err(SimError::InvalidHorizon {
                days: horizon_days,
                reason: format!("schedule for '{identity}' covers only {} days", schedule.len()),
            });
        }
        Ok(Arc::from(&schedule[..horizon_days]))
    }
}

#[derive(Debug, Clone)]
struct Scenario {
    horizon_days: usize,
    series: Vec<Arc<[f64]>>,
}

/// Correlated stochastic demand via a Gaussian copula.
///
/// The first identity anchors the common factor; every other identity is
/// correlated with it by `correlation`. Marginals are Normal or
/// Negative-Binomial. A scenario is generated once per seed, horizon and
/// episode, then shared by reference.
#[derive(Debug, Clone)]
pub struct CorrelatedDemand {
    marginals: Vec<(String, Marginal)>,
    correlation: f64,
    seed: Option<u64>,
    scenario: Option<Scenario>,
}

impl CorrelatedDemand {
    pub fn new(marginals: Vec<(String, Marginal)>, correlation: f64, seed: Option<u64>) -> Result<Self> {
        if marginals.is_empty() {
            return Err(SimError::InvalidConfig("no demand marginals".into()));
        }
        if !(-1.0..=1.0).contains(&correlation) {
            return Err(SimError::InvalidConfig(format!(
                "correlation {correlation} is not in [-1, 1]"
            )));
        }
        Ok(Self {
            marginals,
            correlation,
            seed,
            scenario: None,
        })
    }

    pub fn from_config(config: &SimulationConfig) -> Result<Self> {
        let marginals = config
            .stores
            .iter()
            .map(|store| {
                Marginal::from_moments(&store.distribution, store.mean_daily, store.std_daily)
                    .map(|marginal| (store.name.clone(), marginal))
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(marginals, config.correlation, config.seed)
    }

    fn generate(&self, horizon_days: usize) -> Scenario {
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let idiosyncratic = (1.0 - self.correlation * self.correlation).sqrt();
        let mut series: Vec<Vec<f64>> = vec![Vec::with_capacity(horizon_days); self.marginals.len()];

        for _ in 0..horizon_days {
            let anchor: f64 = StandardNormal.sample(&mut rng);
            for (i, (_, marginal)) in self.marginals.iter().enumerate() {
                let z = if i == 0 {
                    anchor
                } else {
                    let own: f64 = StandardNormal.sample(&mut rng);
                    self.correlation * anchor + idiosyncratic * own
                };
                let u = standard_normal_cdf(z).clamp(1e-12, 1.0 - 1e-12);
                series[i].push(marginal.quantile(u));
            }
        }

        debug!(horizon_days, seed = ?self.seed, units = self.marginals.len(), "demand scenario generated");
        Scenario {
            horizon_days,
            series: series.into_iter().map(Arc::from).collect(),
        }
    }
}

impl DemandProvider for CorrelatedDemand {
    fn daily_demand(&mut self, horizon_days: usize, identity: &str) -> Result<Arc<[f64]>> {
        check_weekly(horizon_days)?;
        let index = self
            .marginals
            .iter()
            .position(|(name, _)| name == identity)
            .ok_or_else(|| SimError::UnknownUnit(identity.to_string()))?;

        let stale = self
            .scenario
            .as_ref()
            .map_or(true, |scenario| scenario.horizon_days != horizon_days);
        if stale {
            self.scenario = Some(self.generate(horizon_days));
        }
        let scenario = self.scenario.as_ref().ok_or_else(|| {
            SimError::InvalidConfig("demand scenario was not generated".into())
        })?;
        Ok(Arc::clone(&scenario.series[index]))
    }

    fn set_seed(&mut self, seed: Option<u64>) {
        self.seed = seed;
        self.scenario = None;
    }

    fn new_episode(&mut self) {
        self.scenario = None;
    }
}
