// src/simulation/network.rs

use crate::error::{Result, SimError};
use crate::io::demand::DemandProvider;
use crate::model::depot::{Depot, RetailerLink};
use crate::model::retailer::Retailer;
use crate::simulation::config::{SimulationConfig, DEPOT_CHANNEL};
use crate::strategy::traits::Observations;
use tracing::info;

/// The physical units of one supply chain: an optional depot and its
/// retailers, in declaration order.
#[derive(Debug, Clone)]
pub struct Network {
    pub depot: Option<Depot>,
    pub retailers: Vec<Retailer>,
}

impl Network {
    pub fn new(depot: Option<Depot>, retailers: Vec<Retailer>) -> Result<Self> {
        if let Some(depot) = &depot {
            let linked = depot.links().iter().map(|link| link.name.as_str());
            let present = retailers.iter().map(Retailer::name);
            if !linked.eq(present) {
                return Err(SimError::InvalidConfig(
                    "depot links must list every retailer in declaration order".into(),
                ));
            }
        }
        Ok(Self { depot, retailers })
    }

    /// With a depot, the producer ships to the depot, which serves the
    /// `OnLine` channel itself and ships to every other store. Without one,
    /// every store orders straight from the producer.
    pub fn from_config(config: &SimulationConfig) -> Result<Self> {
        let producer = &config.producer;
        let shelf_life = producer.delivered_shelf_life();

        if !config.with_depot {
            let retailers = config
                .stores
                .iter()
                .map(|store| {
                    Ok(Retailer::producer_fed(
                        store.name.clone(),
                        shelf_life,
                        producer.lead_time,
                        store.pricing(),
                        store.issuing.build()?,
                        producer.unit_cost,
                    ))
                })
                .collect::<Result<Vec<_>>>()?;
            info!(retailers = retailers.len(), shelf_life, "network without depot built");
            return Self::new(None, retailers);
        }

        let online = config.store(DEPOT_CHANNEL).ok_or_else(|| {
            SimError::InvalidConfig(format!("no '{DEPOT_CHANNEL}' store for the depot"))
        })?;
        let mut links = Vec::new();
        let mut retailers = Vec::new();
        for store in config.depot_fed_stores() {
            let remaining = shelf_life.checked_sub(store.lead_time).filter(|&days| days > 0);
            let retailer_shelf_life = remaining.ok_or_else(|| {
                SimError::InvalidConfig(format!(
                    "store '{}' lead time {} leaves no shelf life",
                    store.name, store.lead_time
                ))
            })?;
            links.push(RetailerLink {
                name: store.name.clone(),
                lead_time: store.lead_time,
            });
            retailers.push(Retailer::depot_fed(
                store.name.clone(),
                retailer_shelf_life,
                store.lead_time,
                store.pricing(),
                store.issuing.build()?,
            ));
        }
        let depot = Depot::new(
            DEPOT_CHANNEL,
            shelf_life,
            producer.lead_time,
            online.pricing(),
            online.issuing.build()?,
            producer.unit_cost,
            links,
        )?;
        info!(retailers = retailers.len(), shelf_life, "network with depot built");
        Self::new(Some(depot), retailers)
    }

    pub fn has_depot(&self) -> bool {
        self.depot.is_some()
    }

    /// Statistic channels: the depot's own channel first, then the retailers.
    pub fn channel_names(&self) -> Vec<String> {
        self.depot
            .iter()
            .map(|depot| depot.name().to_string())
            .chain(self.retailers.iter().map(|retailer| retailer.name().to_string()))
            .collect()
    }

    pub fn retailer(&self, name: &str) -> Option<&Retailer> {
        self.retailers.iter().find(|retailer| retailer.name() == name)
    }

    /// Clears every unit and hands it a fresh demand view.
    pub fn reset<D: DemandProvider + ?Sized>(
        &mut self,
        demand: &mut D,
        horizon_days: usize,
    ) -> Result<Observations> {
        let depot = match self.depot.as_mut() {
            Some(depot) => {
                let view = demand.daily_demand(horizon_days, depot.name())?;
                Some(depot.reset(view))
            }
            None => None,
        };
        let mut retailers = Vec::with_capacity(self.retailers.len());
        for retailer in self.retailers.iter_mut() {
            let view = demand.daily_demand(horizon_days, retailer.name())?;
            let observation = retailer.reset(view);
            retailers.push((retailer.name().to_string(), observation));
        }
        Ok(Observations { depot, retailers })
    }

    pub fn observations(&self) -> Observations {
        Observations {
            depot: self.depot.as_ref().map(|depot| depot.unit().observation()),
            retailers: self
                .retailers
                .iter()
                .map(|retailer| (retailer.name().to_string(), retailer.unit().observation()))
                .collect(),
        }
    }
}
