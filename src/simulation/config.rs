// src/simulation/config.rs

use crate::error::{Result, SimError};
use crate::model::echelon::Pricing;
use crate::model::issuing::IssuingSplit;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;
use tracing::warn;

/// Store name of the channel the depot serves itself.
pub const DEPOT_CHANNEL: &str = "OnLine";

/// Days per week; demand is generated in whole weeks.
pub const WEEK: usize = 7;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProducerSetting {
    /// Shelf life at production, in days.
    pub shelf_life: usize,
    /// Days from producer to depot (or to retailers when there is no depot).
    pub lead_time: usize,
    pub unit_cost: f64,
}

impl ProducerSetting {
    /// Shelf life left when the producer's stock lands downstream.
    pub fn delivered_shelf_life(&self) -> usize {
        self.shelf_life.saturating_sub(self.lead_time)
    }
}

/// Tagged issuing split, e.g. `{"kind": "beta", "params": {"alpha": 2, "beta": 5}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssuingSplitSetting {
    pub kind: String,
    #[serde(default)]
    pub params: BTreeMap<String, f64>,
}

impl IssuingSplitSetting {
    pub fn build(&self) -> Result<IssuingSplit> {
        IssuingSplit::from_tag(&self.kind, &self.params)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSetting {
    pub name: String,
    pub price: f64,
    /// Value per scrapped unit (zero or negative).
    pub markdown: f64,
    /// Days from depot to store; ignored without a depot.
    #[serde(default)]
    pub lead_time: usize,
    pub mean_daily: f64,
    pub std_daily: f64,
    /// `normal` or `negative_binomial`.
    #[serde(default = "default_distribution")]
    pub distribution: String,
    pub issuing: IssuingSplitSetting,
}

fn default_distribution() -> String {
    "negative_binomial".to_string()
}

impl StoreSetting {
    pub fn pricing(&self) -> Pricing {
        Pricing {
            price: self.price,
            markdown: self.markdown,
        }
    }

    /// Mean plus three standard deviations of daily demand.
    pub fn demand_ceiling(&self) -> f64 {
        self.mean_daily + 3.0 * self.std_daily
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// `COP` or `BSP` for producer orders (depot network only).
    pub order: String,
    /// `COP` or `BSP` for depot-to-retailer dispatch (depot network only).
    pub dispatch: String,
    /// `FIFO` or `LIFO` issuing when the depot ships.
    pub issuing: String,
    pub critical_reserve: bool,
    pub two_k: bool,
    /// Stores switched to base-stock in a network without depot.
    pub base_stock_stores: Vec<String>,
    pub parameters: Vec<f64>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            order: "BSP".to_string(),
            dispatch: "BSP".to_string(),
            issuing: "LIFO".to_string(),
            critical_reserve: true,
            two_k: false,
            base_stock_stores: Vec::new(),
            parameters: vec![800.0, 230.0, 30.0],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub weeks: usize,
    pub with_depot: bool,
    pub seed: Option<u64>,
    /// Copula correlation between the first store and every other store.
    pub correlation: f64,
    /// Days excluded from statistics; defaults to `3 * (shelf_life + lead_time)`.
    pub transient_days: Option<usize>,
    /// Stop early once the average profit converges.
    pub learn: bool,
    pub producer: ProducerSetting,
    pub stores: Vec<StoreSetting>,
    pub policy: PolicyConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            weeks: 500,
            with_depot: true,
            seed: Some(1),
            correlation: -0.5,
            transient_days: None,
            learn: true,
            producer: ProducerSetting {
                shelf_life: 6,
                lead_time: 1,
                unit_cost: 1.0,
            },
            stores: vec![
                StoreSetting {
                    name: DEPOT_CHANNEL.to_string(),
                    price: 3.0,
                    markdown: -0.2,
                    lead_time: 0,
                    mean_daily: 40.0,
                    std_daily: 15.0,
                    distribution: default_distribution(),
                    issuing: IssuingSplitSetting {
                        kind: "beta".to_string(),
                        params: BTreeMap::from([
                            ("alpha".to_string(), 2.0),
                            ("beta".to_string(), 5.0),
                        ]),
                    },
                },
                StoreSetting {
                    name: "OffLine".to_string(),
                    price: 2.5,
                    markdown: -0.2,
                    lead_time: 1,
                    mean_daily: 60.0,
                    std_daily: 20.0,
                    distribution: default_distribution(),
                    issuing: IssuingSplitSetting {
                        kind: "fixed".to_string(),
                        params: BTreeMap::from([("dirac".to_string(), 0.3)]),
                    },
                },
            ],
            policy: PolicyConfig::default(),
        }
    }
}

impl SimulationConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn horizon_days(&self) -> usize {
        self.weeks * WEEK
    }

    pub fn transient_days(&self) -> usize {
        self.transient_days
            .unwrap_or(3 * (self.producer.shelf_life + self.producer.lead_time))
    }

    pub fn store(&self, name: &str) -> Option<&StoreSetting> {
        self.stores.iter().find(|store| store.name == name)
    }

    /// Stores supplied by the depot, in declaration order.
    pub fn depot_fed_stores(&self) -> impl Iterator<Item = &StoreSetting> {
        self.stores
            .iter()
            .filter(|store| store.name != DEPOT_CHANNEL)
    }

    pub fn validate(&self) -> Result<()> {
        if self.weeks == 0 {
            return Err(SimError::InvalidConfig("weeks must be positive".into()));
        }
        if self.producer.shelf_life <= self.producer.lead_time {
            return Err(SimError::InvalidConfig(format!(
                "shelf life {} does not outlast producer lead time {}",
                self.producer.shelf_life, self.producer.lead_time
            )));
        }
        if !(-1.0..=1.0).contains(&self.correlation) {
            return Err(SimError::InvalidConfig(format!(
                "correlation {} is not in [-1, 1]",
                self.correlation
            )));
        }
        if self.stores.is_empty() {
            return Err(SimError::InvalidConfig("no stores configured".into()));
        }

        let mut seen = HashSet::new();
        for store in &self.stores {
            if !seen.insert(store.name.as_str()) {
                return Err(SimError::InvalidConfig(format!(
                    "store '{}' declared twice",
                    store.name
                )));
            }
            if store.mean_daily < 0.0 || store.std_daily < 0.0 {
                return Err(SimError::InvalidConfig(format!(
                    "store '{}' has negative demand moments",
                    store.name
                )));
            }
            if store.markdown > 0.0 {
                warn!(store = %store.name, markdown = store.markdown, "scrap carries positive value");
            }
        }

        if self.with_depot {
            if self.store(DEPOT_CHANNEL).is_none() {
                return Err(SimError::InvalidConfig(format!(
                    "a depot network needs a '{DEPOT_CHANNEL}' store for the depot's own channel"
                )));
            }
            let shelf_life = self.producer.delivered_shelf_life();
            if let Some(store) = self
                .depot_fed_stores()
                .find(|store| store.lead_time >= shelf_life)
            {
                return Err(SimError::InvalidConfig(format!(
                    "store '{}' lead time {} leaves no shelf life out of {}",
                    store.name, store.lead_time, shelf_life
                )));
            }
        } else if let Some(store) = self.stores.iter().find(|store| store.lead_time > 0) {
            warn!(store = %store.name, "store lead time is ignored without a depot");
        }
        Ok(())
    }
}
