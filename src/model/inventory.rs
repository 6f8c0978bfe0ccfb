// src/model/inventory.rs

use crate::error::{Result, SimError};
use crate::model::queues::Delivery;
use serde::Serialize;

/// On-hand stock bucketed by residual shelf life.
///
/// `counts[0]` expires at the end of today, `counts[capacity - 1]` is the
/// freshest stock. The capacity is the maximum shelf life and never changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgedInventory {
    counts: Vec<u32>,
}

impl AgedInventory {
    pub fn new(shelf_life: usize) -> Self {
        Self {
            counts: vec![0; shelf_life],
        }
    }

    pub fn capacity(&self) -> usize {
        self.counts.len()
    }

    pub fn counts(&self) -> &[u32] {
        &self.counts
    }

    pub fn total(&self) -> u32 {
        self.counts.iter().sum()
    }

    pub fn clear(&mut self) {
        self.counts.iter_mut().for_each(|count| *count = 0);
    }

    /// Vector deliveries keep their ages; scalar deliveries arrive as fresh as possible.
    pub fn receive(&mut self, delivery: &Delivery) -> Result<()> {
        delivery.add_into(&mut self.counts)
    }

    /// Removes exactly `quantity` units whose age (days since production,
    /// 0 = freshest) is `age`. Strict: fails instead of capping.
    pub fn issue_at_age(&mut self, age: usize, quantity: u32) -> Result<u32> {
        let capacity = self.capacity();
        if age >= capacity {
            return Err(SimError::OutOfRange { age, capacity });
        }
        let bucket = &mut self.counts[capacity - 1 - age];
        if *bucket < quantity {
            return Err(SimError::InsufficientStock {
                age,
                requested: quantity,
                available: *bucket,
            });
        }
        *bucket -= quantity;
        Ok(quantity)
    }

    /// Serves `demand` freshest-first. Returns the units actually sold.
    pub fn issue_lifo(&mut self, demand: u32) -> u32 {
        let capacity = self.capacity();
        self.issue_in_order(demand, (0..capacity).rev())
    }

    /// Serves `demand` closest-to-expiry first. Returns the units actually sold.
    pub fn issue_fifo(&mut self, demand: u32) -> u32 {
        let capacity = self.capacity();
        self.issue_in_order(demand, 0..capacity)
    }

    fn issue_in_order(&mut self, demand: u32, buckets: impl Iterator<Item = usize>) -> u32 {
        let sales = demand.min(self.total());
        let mut to_sell = sales;
        for bucket in buckets {
            if to_sell == 0 {
                break;
            }
            let taken = to_sell.min(self.counts[bucket]);
            self.counts[bucket] -= taken;
            to_sell -= taken;
        }
        sales
    }

    /// End-of-day aging. Returns the units that expired (scrap).
    pub fn age(&mut self) -> u32 {
        let Some(&scrapped) = self.counts.first() else {
            return 0;
        };
        self.counts.rotate_left(1);
        if let Some(freshest) = self.counts.last_mut() {
            *freshest = 0;
        }
        scrapped
    }

    pub fn availability(&self) -> Vec<bool> {
        self.counts.iter().map(|&count| count > 0).collect()
    }
}
