// src/simulation/engine.rs

use crate::error::Result;
use crate::io::demand::{check_weekly, CorrelatedDemand, DemandProvider};
use crate::io::reporting::EpisodeSummary;
use crate::simulation::config::{SimulationConfig, WEEK};
use crate::simulation::network::Network;
use crate::simulation::stats::{ChannelDay, StatManager};
use crate::strategy::traits::{AllocationDecision, AllocationPolicy, Observations};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};

/// Progress is logged every this many simulated weeks.
const PROGRESS_WEEKS: usize = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub observations: Observations,
    /// Cash flow of the day (zero during the transient head).
    pub reward: f64,
    pub done: bool,
}

/// Episodic driver of one supply-chain network.
///
/// Each step is one day: the depot orders and dispatches, then every
/// retailer receives and sells, then statistics close the day. In learning
/// mode an episode also ends once the average profit has converged; in test
/// mode it always runs the full horizon.
#[derive(Debug)]
pub struct DailySimulation<D: DemandProvider> {
    network: Network,
    stats: StatManager,
    demand: D,
    horizon_days: usize,
    learn: bool,
    seed: Option<u64>,
    rng: StdRng,
    current_step: usize,
}

impl<D: DemandProvider> DailySimulation<D> {
    pub fn new(network: Network, mut stats: StatManager, demand: D, horizon_days: usize) -> Result<Self> {
        check_weekly(horizon_days)?;
        stats.set_horizon(horizon_days)?;
        Ok(Self {
            network,
            stats,
            demand,
            horizon_days,
            learn: true,
            seed: None,
            rng: StdRng::from_entropy(),
            current_step: 0,
        })
    }

    /// Network, statistics and driver settings from `config`, with an
    /// explicit demand provider.
    pub fn with_demand(config: &SimulationConfig, demand: D) -> Result<Self> {
        let network = Network::from_config(config)?;
        let mut stats = StatManager::new(network.channel_names(), network.has_depot());
        stats.set_head(config.transient_days());
        let mut simulation = Self::new(network, stats, demand, config.horizon_days())?;
        simulation.set_seed(config.seed);
        if !config.learn {
            simulation.set_test();
        }
        Ok(simulation)
    }

    /// Seeds both the demand provider and the issuing-split draws.
    pub fn set_seed(&mut self, seed: Option<u64>) {
        self.seed = seed;
        self.demand.set_seed(seed);
    }

    /// Run every episode to the full horizon.
    pub fn set_test(&mut self) {
        self.learn = false;
    }

    pub fn set_learn(&mut self) {
        self.learn = true;
    }

    pub fn is_learning(&self) -> bool {
        self.learn
    }

    /// Takes effect at the next [`reset`](Self::reset).
    pub fn update_horizon(&mut self, horizon_days: usize) -> Result<()> {
        check_weekly(horizon_days)?;
        self.stats.set_horizon(horizon_days)?;
        self.horizon_days = horizon_days;
        Ok(())
    }

    pub fn horizon_days(&self) -> usize {
        self.horizon_days
    }

    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn stats(&self) -> &StatManager {
        &self.stats
    }

    pub fn reset(&mut self) -> Result<Observations> {
        self.current_step = 0;
        self.rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        self.demand.new_episode();
        let observations = self.network.reset(&mut self.demand, self.horizon_days)?;
        self.stats.clear();
        Ok(observations)
    }

    pub fn step(&mut self, decision: &AllocationDecision) -> Result<StepOutcome> {
        self.current_step += 1;
        self.stats.tick()?;

        let depot_day = match self.network.depot.as_mut() {
            Some(depot) => Some((depot.name().to_string(), depot.step(decision, &mut self.rng)?)),
            None => None,
        };

        let with_depot = depot_day.is_some();
        for retailer in self.network.retailers.iter_mut() {
            let shipment = decision.dispatch_for(retailer.name())?;
            let cost = if with_depot { 0.0 } else { retailer.compute_cost(shipment)? };
            let day = retailer.step(shipment, &mut self.rng)?;
            self.stats.record_channel(
                retailer.name(),
                &ChannelDay {
                    profit: day.profit,
                    scrapped: day.scrapped,
                    sold: day.sold,
                    lost: day.lost,
                    cost,
                },
            )?;
        }

        let reward = match depot_day {
            Some((name, day)) => {
                self.stats.record_channel(
                    &name,
                    &ChannelDay {
                        profit: day.profit,
                        scrapped: day.scrapped,
                        sold: day.sold,
                        lost: day.lost,
                        cost: 0.0,
                    },
                )?;
                self.stats.close_day(day.cost)
            }
            None => self.stats.close_day(0.0),
        };

        let mut done = self.current_step + 1 >= self.horizon_days;
        if self.learn && !done {
            done = self.stats.check_if_done();
        }

        debug!(step = self.current_step, reward, done, "day simulated");
        if self.current_step % (PROGRESS_WEEKS * WEEK) == 0 {
            info!(
                week = self.current_step / WEEK,
                average_profit = format_args!("{:.3}", self.stats.average_profit()),
                "simulation progress"
            );
        }

        Ok(StepOutcome {
            observations: self.network.observations(),
            reward,
            done,
        })
    }

    /// Plays one full episode with `policy` and summarises it.
    pub fn run<P: AllocationPolicy>(&mut self, policy: &P) -> Result<EpisodeSummary> {
        let mut observations = self.reset()?;
        info!(
            policy = policy.name(),
            horizon_days = self.horizon_days,
            learn = self.learn,
            "episode started"
        );
        loop {
            let decision = policy.decide(&observations)?;
            let outcome = self.step(&decision)?;
            observations = outcome.observations;
            if outcome.done {
                break;
            }
        }
        Ok(self.summary())
    }

    pub fn summary(&self) -> EpisodeSummary {
        EpisodeSummary::from_stats(&self.stats)
    }

    pub fn average_profit(&self) -> f64 {
        self.stats.average_profit()
    }

    pub fn average_scrapped(&self) -> f64 {
        self.stats.average_scrapped()
    }

    pub fn average_unmet_clients(&self) -> f64 {
        self.stats.average_unmet()
    }
}

impl DailySimulation<CorrelatedDemand> {
    /// Everything from `config`, demand included.
    pub fn from_config(config: &SimulationConfig) -> Result<Self> {
        let demand = CorrelatedDemand::from_config(config)?;
        Self::with_demand(config, demand)
    }
}
