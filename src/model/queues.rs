// src/model/queues.rs

use crate::error::{Result, SimError};
use serde::Serialize;
use std::collections::VecDeque;

/// What a pipeline slot carries: a plain count that arrives at maximum
/// freshness, or a count per residual shelf-life bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Delivery {
    Fresh(u32),
    Aged(Vec<u32>),
}

impl Delivery {
    pub fn total(&self) -> u32 {
        match self {
            Delivery::Fresh(quantity) => *quantity,
            Delivery::Aged(buckets) => buckets.iter().sum(),
        }
    }

    /// Adds this delivery onto `buckets` (index = residual shelf life).
    /// Scalar deliveries land in the freshest bucket.
    pub fn add_into(&self, buckets: &mut [u32]) -> Result<()> {
        match self {
            Delivery::Fresh(quantity) => {
                if let Some(freshest) = buckets.last_mut() {
                    *freshest += quantity;
                }
                Ok(())
            }
            Delivery::Aged(ages) => {
                if ages.len() != buckets.len() {
                    return Err(SimError::ShapeMismatch {
                        expected: buckets.len(),
                        actual: ages.len(),
                    });
                }
                for (slot, quantity) in buckets.iter_mut().zip(ages) {
                    *slot += quantity;
                }
                Ok(())
            }
        }
    }
}

/// Fixed at construction: does the pipeline carry scalars or shelf-life vectors?
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineShape {
    Fresh,
    Aged { shelf_life: usize },
}

impl PipelineShape {
    pub fn empty(&self) -> Delivery {
        match self {
            PipelineShape::Fresh => Delivery::Fresh(0),
            PipelineShape::Aged { shelf_life } => Delivery::Aged(vec![0; *shelf_life]),
        }
    }

    /// Builds a delivery of this shape from a per-bucket shipment vector.
    /// A scalar pipeline collapses the vector into its total.
    pub fn shipment(&self, quantities: &[u32]) -> Result<Delivery> {
        match self {
            PipelineShape::Fresh => Ok(Delivery::Fresh(quantities.iter().sum())),
            PipelineShape::Aged { shelf_life } => {
                if quantities.len() != *shelf_life {
                    return Err(SimError::ShapeMismatch {
                        expected: *shelf_life,
                        actual: quantities.len(),
                    });
                }
                Ok(Delivery::Aged(quantities.to_vec()))
            }
        }
    }

    fn accepts(&self, delivery: &Delivery) -> Result<()> {
        match (self, delivery) {
            (PipelineShape::Fresh, Delivery::Fresh(_)) => Ok(()),
            (PipelineShape::Aged { shelf_life }, Delivery::Aged(ages)) => {
                if ages.len() == *shelf_life {
                    Ok(())
                } else {
                    Err(SimError::ShapeMismatch {
                        expected: *shelf_life,
                        actual: ages.len(),
                    })
                }
            }
            (PipelineShape::Fresh, Delivery::Aged(ages)) => Err(SimError::ShapeMismatch {
                expected: 1,
                actual: ages.len(),
            }),
            (PipelineShape::Aged { shelf_life }, Delivery::Fresh(_)) => {
                Err(SimError::ShapeMismatch {
                    expected: *shelf_life,
                    actual: 1,
                })
            }
        }
    }
}

/// Lead-time delay line. Slot 0 arrives today, slot `lead_time` was ordered today.
#[derive(Debug, Clone)]
pub struct SupplyPipeline {
    slots: VecDeque<Delivery>,
    lead_time: usize,
    shape: PipelineShape,
}

impl SupplyPipeline {
    pub fn new(lead_time: usize, shape: PipelineShape) -> Self {
        let mut slots = VecDeque::with_capacity(lead_time + 1);
        // Pre-fill with empties so orders take `lead_time` days to traverse the pipe
        for _ in 0..=lead_time {
            slots.push_back(shape.empty());
        }

        Self {
            slots,
            lead_time,
            shape,
        }
    }

    pub fn lead_time(&self) -> usize {
        self.lead_time
    }

    pub fn shape(&self) -> PipelineShape {
        self.shape
    }

    pub fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = self.shape.empty();
        }
    }

    /// Step 1: today's order enters the last slot.
    pub fn place_order(&mut self, order: Delivery) -> Result<()> {
        self.shape.accepts(&order)?;
        if let Some(last) = self.slots.back_mut() {
            *last = order;
        }
        Ok(())
    }

    /// Step 2: whatever sits in slot 0 arrives; everything moves one day closer.
    pub fn deliver(&mut self) -> Delivery {
        let arrived = self.slots.pop_front().unwrap_or_else(|| self.shape.empty());
        self.slots.push_back(self.shape.empty());
        arrived
    }

    /// Slots still travelling after today's delivery, nearest arrival first.
    pub fn in_transit(&self) -> Vec<Delivery> {
        self.slots.iter().take(self.lead_time).cloned().collect()
    }

    pub fn total_in_transit(&self) -> u32 {
        self.slots.iter().map(Delivery::total).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_arrives_exactly_after_lead_time() {
        let mut pipe = SupplyPipeline::new(3, PipelineShape::Fresh);
        let mut arrivals = Vec::new();
        for day in 0..7 {
            let order = if day == 1 { 9 } else { 0 };
            pipe.place_order(Delivery::Fresh(order)).unwrap();
            arrivals.push(pipe.deliver().total());
        }
        assert_eq!(arrivals, vec![0, 0, 0, 0, 9, 0, 0]);
    }

    #[test]
    fn zero_lead_time_delivers_same_day() {
        let mut pipe = SupplyPipeline::new(0, PipelineShape::Fresh);
        pipe.place_order(Delivery::Fresh(4)).unwrap();
        assert_eq!(pipe.deliver(), Delivery::Fresh(4));
        assert!(pipe.in_transit().is_empty());
    }

    #[test]
    fn in_transit_lists_pending_slots_nearest_first() {
        let mut pipe = SupplyPipeline::new(2, PipelineShape::Aged { shelf_life: 2 });
        pipe.place_order(Delivery::Aged(vec![1, 2])).unwrap();
        pipe.deliver();
        pipe.place_order(Delivery::Aged(vec![0, 5])).unwrap();
        pipe.deliver();
        assert_eq!(
            pipe.in_transit(),
            vec![Delivery::Aged(vec![1, 2]), Delivery::Aged(vec![0, 5])]
        );
        assert_eq!(pipe.total_in_transit(), 8);
    }

    #[test]
    fn rejects_wrong_shape() {
        let mut pipe = SupplyPipeline::new(1, PipelineShape::Aged { shelf_life: 3 });
        assert!(matches!(
            pipe.place_order(Delivery::Aged(vec![1, 2])),
            Err(SimError::ShapeMismatch { expected: 3, actual: 2 })
        ));
        assert!(pipe.place_order(Delivery::Fresh(2)).is_err());
    }

    #[test]
    fn clear_empties_every_slot() {
        let mut pipe = SupplyPipeline::new(2, PipelineShape::Fresh);
        pipe.place_order(Delivery::Fresh(7)).unwrap();
        pipe.clear();
        assert_eq!(pipe.total_in_transit(), 0);
    }

    #[test]
    fn scalar_shape_collapses_shipment_vector() {
        assert_eq!(
            PipelineShape::Fresh.shipment(&[0, 0, 6]).unwrap(),
            Delivery::Fresh(6)
        );
    }
}
