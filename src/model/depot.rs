// src/model/depot.rs

use crate::error::{Result, SimError};
use crate::model::echelon::{EchelonUnit, Observation, Pricing, UnitTotals};
use crate::model::inventory::AgedInventory;
use crate::model::issuing::IssuingSplit;
use crate::model::queues::{PipelineShape, SupplyPipeline};
use crate::strategy::traits::AllocationDecision;
use rand::Rng;
use std::sync::Arc;
use tracing::debug;

/// A downstream retailer as the depot sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetailerLink {
    pub name: String,
    pub lead_time: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DepotStep {
    pub observation: Observation,
    pub cost: f64,
    pub profit: f64,
    pub scrapped: u32,
    pub sold: u32,
    pub lost: u32,
    pub dispatched: u32,
}

/// Upstream echelon: buys from the producer, ships aged stock to retailers and
/// serves its own (online) channel from what is left.
#[derive(Debug, Clone)]
pub struct Depot {
    unit: EchelonUnit,
    unit_cost: f64,
    links: Vec<RetailerLink>,
    total_cost: f64,
    dispatched_totals: Vec<Vec<u64>>,
}

impl Depot {
    pub fn new(
        name: impl Into<String>,
        shelf_life: usize,
        lead_time: usize,
        pricing: Pricing,
        issuing: IssuingSplit,
        unit_cost: f64,
        links: Vec<RetailerLink>,
    ) -> Result<Self> {
        if let Some(link) = links.iter().find(|link| link.lead_time >= shelf_life) {
            return Err(SimError::InvalidConfig(format!(
                "retailer '{}' lead time {} leaves no usable shelf life out of {}",
                link.name, link.lead_time, shelf_life
            )));
        }
        let unit = EchelonUnit::new(
            name,
            AgedInventory::new(shelf_life),
            SupplyPipeline::new(lead_time, PipelineShape::Aged { shelf_life }),
            pricing,
            issuing,
        );
        let dispatched_totals = links
            .iter()
            .map(|link| vec![0; shelf_life - link.lead_time])
            .collect();
        Ok(Self {
            unit,
            unit_cost,
            links,
            total_cost: 0.0,
            dispatched_totals,
        })
    }

    pub fn name(&self) -> &str {
        self.unit.name()
    }

    pub fn shelf_life(&self) -> usize {
        self.unit.shelf_life()
    }

    pub fn lead_time(&self) -> usize {
        self.unit.pipeline().lead_time()
    }

    pub fn links(&self) -> &[RetailerLink] {
        &self.links
    }

    pub fn unit(&self) -> &EchelonUnit {
        &self.unit
    }

    pub fn totals(&self) -> &UnitTotals {
        self.unit.totals()
    }

    pub fn total_cost(&self) -> f64 {
        self.total_cost
    }

    /// Per-retailer cumulative dispatch, indexed like the dispatch vectors.
    pub fn dispatched_totals(&self, retailer: &str) -> Option<&[u64]> {
        self.links
            .iter()
            .position(|link| link.name == retailer)
            .map(|index| self.dispatched_totals[index].as_slice())
    }

    pub fn reset(&mut self, demand: Arc<[f64]>) -> Observation {
        self.total_cost = 0.0;
        for totals in self.dispatched_totals.iter_mut() {
            totals.iter_mut().for_each(|total| *total = 0);
        }
        self.unit.reset(demand)
    }

    /// One simulated day: order, receive, pay, dispatch, then serve the own channel.
    pub fn step<R: Rng + ?Sized>(&mut self, decision: &AllocationDecision, rng: &mut R) -> Result<DepotStep> {
        let order = self
            .unit
            .pipeline()
            .shape()
            .shipment(&decision.order_size)?;
        let ordered = order.total();
        let cost = self.unit_cost * f64::from(ordered);
        let delivered = self.unit.receive_shipment(order)?;

        let dispatched = self.dispatch(decision)?;
        let sales = self.unit.sell_and_age(rng)?;
        self.total_cost += cost;

        debug!(
            depot = %self.name(),
            day = self.unit.day(),
            ordered,
            arrived = delivered.total(),
            dispatched,
            sold = sales.sold,
            lost = sales.lost,
            scrapped = sales.scrapped,
            cost,
            profit = sales.profit,
            "depot day closed"
        );

        Ok(DepotStep {
            observation: self.unit.observation(),
            cost,
            profit: sales.profit,
            scrapped: sales.scrapped,
            sold: sales.sold,
            lost: sales.lost,
            dispatched,
        })
    }

    /// Removes each retailer's shipment from the shelves. Entry `d` of a
    /// retailer's vector leaves from residual-life bucket `d + lead_time`, so
    /// it arrives with `d` days left; stock that would expire en route is
    /// never addressable.
    fn dispatch(&mut self, decision: &AllocationDecision) -> Result<u32> {
        let shelf_life = self.shelf_life();
        let mut shipped = 0;
        for (index, link) in self.links.iter().enumerate() {
            let quantities = decision.dispatch_for(&link.name)?;
            let usable = shelf_life - link.lead_time;
            if quantities.len() != usable {
                return Err(SimError::ShapeMismatch {
                    expected: usable,
                    actual: quantities.len(),
                });
            }
            for (residual, &quantity) in quantities.iter().enumerate() {
                if quantity == 0 {
                    continue;
                }
                let age = shelf_life - 1 - (residual + link.lead_time);
                self.unit.issue_at_age(age, quantity)?;
                self.dispatched_totals[index][residual] += u64::from(quantity);
                shipped += quantity;
            }
        }
        Ok(shipped)
    }
}
