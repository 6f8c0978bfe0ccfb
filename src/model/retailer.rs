// src/model/retailer.rs

use crate::error::{Result, SimError};
use crate::model::echelon::{EchelonUnit, Observation, Pricing, UnitTotals};
use crate::model::inventory::AgedInventory;
use crate::model::issuing::IssuingSplit;
use crate::model::queues::{PipelineShape, SupplyPipeline};
use rand::Rng;
use std::sync::Arc;
use tracing::debug;

/// A retailer's day, as reported to the driver and the statistics sink.
#[derive(Debug, Clone, PartialEq)]
pub struct RetailerStep {
    pub observation: Observation,
    pub profit: f64,
    pub scrapped: u32,
    pub sold: u32,
    pub lost: u32,
}

/// Downstream store. Fed either by a depot (aged shipments) or directly by
/// the producer (fresh orders, in which case it also pays for them).
#[derive(Debug, Clone)]
pub struct Retailer {
    unit: EchelonUnit,
    unit_cost: Option<f64>,
    total_shipped: u64,
}

impl Retailer {
    /// Receives mixed-age stock from a depot; purchase cost is the depot's.
    pub fn depot_fed(
        name: impl Into<String>,
        shelf_life: usize,
        lead_time: usize,
        pricing: Pricing,
        issuing: IssuingSplit,
    ) -> Self {
        let unit = EchelonUnit::new(
            name,
            AgedInventory::new(shelf_life),
            SupplyPipeline::new(lead_time, PipelineShape::Aged { shelf_life }),
            pricing,
            issuing,
        );
        Self {
            unit,
            unit_cost: None,
            total_shipped: 0,
        }
    }

    /// Orders straight from the producer; everything arrives at full freshness.
    pub fn producer_fed(
        name: impl Into<String>,
        shelf_life: usize,
        lead_time: usize,
        pricing: Pricing,
        issuing: IssuingSplit,
        unit_cost: f64,
    ) -> Self {
        let unit = EchelonUnit::new(
            name,
            AgedInventory::new(shelf_life),
            SupplyPipeline::new(lead_time, PipelineShape::Fresh),
            pricing,
            issuing,
        );
        Self {
            unit,
            unit_cost: Some(unit_cost),
            total_shipped: 0,
        }
    }

    pub fn name(&self) -> &str {
        self.unit.name()
    }

    pub fn lead_time(&self) -> usize {
        self.unit.pipeline().lead_time()
    }

    pub fn shelf_life(&self) -> usize {
        self.unit.shelf_life()
    }

    pub fn unit(&self) -> &EchelonUnit {
        &self.unit
    }

    pub fn totals(&self) -> &UnitTotals {
        self.unit.totals()
    }

    /// Units dispatched to (or ordered by) this retailer since the last reset.
    pub fn total_shipped(&self) -> u64 {
        self.total_shipped
    }

    pub fn reset(&mut self, demand: Arc<[f64]>) -> Observation {
        self.total_shipped = 0;
        self.unit.reset(demand)
    }

    /// One simulated day. `shipment` is indexed by residual shelf life on arrival.
    pub fn step<R: Rng + ?Sized>(&mut self, shipment: &[u32], rng: &mut R) -> Result<RetailerStep> {
        let order = self.unit.pipeline().shape().shipment(shipment)?;
        let shipped = order.total();
        let delivered = self.unit.receive_shipment(order)?;
        let sales = self.unit.sell_and_age(rng)?;
        self.total_shipped += u64::from(shipped);

        debug!(
            retailer = %self.name(),
            day = self.unit.day(),
            shipped,
            arrived = delivered.total(),
            lifo = sales.lifo_customers,
            fifo = sales.fifo_customers,
            sold = sales.sold,
            lost = sales.lost,
            scrapped = sales.scrapped,
            profit = sales.profit,
            "retailer day closed"
        );

        Ok(RetailerStep {
            observation: self.unit.observation(),
            profit: sales.profit,
            scrapped: sales.scrapped,
            sold: sales.sold,
            lost: sales.lost,
        })
    }

    /// Purchase cost of `shipment` for a producer-fed retailer.
    pub fn compute_cost(&self, shipment: &[u32]) -> Result<f64> {
        let unit_cost = self.unit_cost.ok_or_else(|| {
            SimError::InvalidConfig(format!(
                "retailer '{}' is supplied by a depot; the depot pays for its stock",
                self.name()
            ))
        })?;
        let units: u32 = shipment.iter().sum();
        Ok(unit_cost * f64::from(units))
    }
}
