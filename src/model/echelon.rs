// src/model/echelon.rs

use crate::error::{Result, SimError};
use crate::model::inventory::AgedInventory;
use crate::model::issuing::IssuingSplit;
use crate::model::queues::{Delivery, SupplyPipeline};
use rand::Rng;
use serde::Serialize;
use std::sync::Arc;

/// What a unit reports at the end of a day: stock on hand per residual shelf
/// life, and the pipeline slots that arrive on later days.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Observation {
    pub inventory: Vec<u32>,
    pub in_transit: Vec<Delivery>,
}

impl Observation {
    pub fn on_hand(&self) -> u32 {
        self.inventory.iter().sum()
    }

    pub fn total_in_transit(&self) -> u32 {
        self.in_transit.iter().map(Delivery::total).sum()
    }

    /// On hand plus everything already travelling towards the unit.
    pub fn position(&self) -> u32 {
        self.on_hand() + self.total_in_transit()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pricing {
    pub price: f64,
    /// Value of a scrapped unit; zero or negative (disposal cost).
    pub markdown: f64,
}

/// Running totals since the last reset.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UnitTotals {
    pub sold: u64,
    pub scrapped: u64,
    pub lost: u64,
    pub received: u64,
    pub profit: f64,
}

/// Outcome of serving one day of demand and aging the shelves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DaySales {
    pub lifo_customers: u32,
    pub fifo_customers: u32,
    pub sold: u32,
    pub lost: u32,
    pub scrapped: u32,
    pub profit: f64,
}

/// State shared by every echelon: shelves, pipeline, prices and the customer
/// issuing mix. `Retailer` and `Depot` drive it through their daily steps.
#[derive(Debug, Clone)]
pub struct EchelonUnit {
    name: String,
    inventory: AgedInventory,
    pipeline: SupplyPipeline,
    pricing: Pricing,
    issuing: IssuingSplit,
    demand: Arc<[f64]>,
    day: usize,
    totals: UnitTotals,
}

impl EchelonUnit {
    pub fn new(
        name: impl Into<String>,
        inventory: AgedInventory,
        pipeline: SupplyPipeline,
        pricing: Pricing,
        issuing: IssuingSplit,
    ) -> Self {
        Self {
            name: name.into(),
            inventory,
            pipeline,
            pricing,
            issuing,
            demand: Arc::from(Vec::new()),
            day: 0,
            totals: UnitTotals::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn inventory(&self) -> &AgedInventory {
        &self.inventory
    }

    pub fn pipeline(&self) -> &SupplyPipeline {
        &self.pipeline
    }

    pub fn pricing(&self) -> Pricing {
        self.pricing
    }

    pub fn totals(&self) -> &UnitTotals {
        &self.totals
    }

    /// Number of completed days in the current episode.
    pub fn day(&self) -> usize {
        self.day
    }

    pub fn shelf_life(&self) -> usize {
        self.inventory.capacity()
    }

    /// Zeroes every piece of state and installs this episode's demand view.
    pub fn reset(&mut self, demand: Arc<[f64]>) -> Observation {
        self.day = 0;
        self.inventory.clear();
        self.pipeline.clear();
        self.totals = UnitTotals::default();
        self.demand = demand;
        self.observation()
    }

    pub fn observation(&self) -> Observation {
        Observation {
            inventory: self.inventory.counts().to_vec(),
            in_transit: self.pipeline.in_transit(),
        }
    }

    /// Ordered + Delivered: today's shipment enters the pipeline and the
    /// slot due today lands on the shelves.
    pub(crate) fn receive_shipment(&mut self, shipment: Delivery) -> Result<Delivery> {
        self.pipeline.place_order(shipment)?;
        let delivered = self.pipeline.deliver();
        self.inventory.receive(&delivered)?;
        self.totals.received += u64::from(delivered.total());
        Ok(delivered)
    }

    /// Strict removal used for outbound dispatch.
    pub(crate) fn issue_at_age(&mut self, age: usize, quantity: u32) -> Result<u32> {
        self.inventory.issue_at_age(age, quantity)
    }

    /// DemandServed + Aged: serves today's customers, ages the shelves and
    /// books the day's revenue. Advances the unit's day counter.
    pub(crate) fn sell_and_age<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<DaySales> {
        let customers = self.todays_customers()?;
        let lifo_customers = self.issuing.sample(customers, rng)?;
        let fifo_customers = customers - lifo_customers;

        // No price differentiation by issuing order, so LIFO first is harmless.
        let lifo_sold = self.inventory.issue_lifo(lifo_customers);
        let fifo_sold = self.inventory.issue_fifo(fifo_customers);
        let sold = lifo_sold + fifo_sold;
        let lost = customers - sold;

        let scrapped = self.inventory.age();
        let profit = self.pricing.price * f64::from(sold) + self.pricing.markdown * f64::from(scrapped);

        self.totals.sold += u64::from(sold);
        self.totals.lost += u64::from(lost);
        self.totals.scrapped += u64::from(scrapped);
        self.totals.profit += profit;
        self.day += 1;

        Ok(DaySales {
            lifo_customers,
            fifo_customers,
            sold,
            lost,
            scrapped,
            profit,
        })
    }

    fn todays_customers(&self) -> Result<u32> {
        let raw = self
            .demand
            .get(self.day)
            .copied()
            .ok_or(SimError::HorizonExhausted {
                day: self.day,
                horizon: self.demand.len(),
            })?;
        // Demand samples may be continuous (normal marginals); customers are whole.
        Ok(raw.round().max(0.0) as u32)
    }
}
