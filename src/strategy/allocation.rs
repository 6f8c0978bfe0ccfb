// src/strategy/allocation.rs

//! Greedy allocation of the depot's aging stock.
//!
//! `available` is always indexed by residual shelf life at the depot
//! (0 = expires today). A retailer with lead time `L` can only use buckets
//! `L..`, and depot bucket `d + L` arrives at the retailer as bucket `d`.

use crate::strategy::traits::IssuingOrder;

/// Holds back up to `quantity` units for the depot's own channel, walking the
/// shelves oldest-first under FIFO issuing and newest-first under LIFO.
/// Returns the units actually reserved.
pub fn reserve_critical(available: &mut [u32], quantity: u32, issuing: IssuingOrder) -> u32 {
    let buckets: Box<dyn Iterator<Item = usize>> = match issuing {
        IssuingOrder::Fifo => Box::new(0..available.len()),
        IssuingOrder::Lifo => Box::new((0..available.len()).rev()),
    };
    let mut remaining = quantity;
    for bucket in buckets {
        if remaining == 0 {
            break;
        }
        let held = remaining.min(available[bucket]);
        available[bucket] -= held;
        remaining -= held;
    }
    quantity - remaining
}

/// Fills up to `request` units for one retailer from the remaining stock and
/// returns its dispatch vector (length `available.len() - lead_time`).
pub fn allocate_request(
    available: &mut [u32],
    request: u32,
    lead_time: usize,
    issuing: IssuingOrder,
) -> Vec<u32> {
    let usable = available.len().saturating_sub(lead_time);
    let mut dispatched = vec![0; usable];
    let residuals: Box<dyn Iterator<Item = usize>> = match issuing {
        IssuingOrder::Fifo => Box::new(0..usable),
        IssuingOrder::Lifo => Box::new((0..usable).rev()),
    };
    let mut queue = request;
    for residual in residuals {
        if queue == 0 {
            break;
        }
        let bucket = residual + lead_time;
        let taken = queue.min(available[bucket]);
        dispatched[residual] = taken;
        available[bucket] -= taken;
        queue -= taken;
    }
    dispatched
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_walks_oldest_usable_first() {
        let mut available = vec![4, 1, 2, 6];
        let sent = allocate_request(&mut available, 5, 1, IssuingOrder::Fifo);
        // bucket 0 would expire in transit and is never touched
        assert_eq!(sent, vec![1, 2, 2]);
        assert_eq!(available, vec![4, 0, 0, 4]);
    }

    #[test]
    fn lifo_walks_freshest_first() {
        let mut available = vec![4, 1, 2, 6];
        let sent = allocate_request(&mut available, 7, 1, IssuingOrder::Lifo);
        assert_eq!(sent, vec![0, 1, 6]);
        assert_eq!(available, vec![4, 1, 1, 0]);
    }

    #[test]
    fn request_is_capped_by_usable_stock() {
        let mut available = vec![9, 1, 1];
        let sent = allocate_request(&mut available, 10, 1, IssuingOrder::Fifo);
        assert_eq!(sent.iter().sum::<u32>(), 2);
        assert_eq!(available, vec![9, 0, 0]);
    }

    #[test]
    fn reservation_follows_issuing_order() {
        let mut fifo = vec![2, 3, 5];
        assert_eq!(reserve_critical(&mut fifo, 4, IssuingOrder::Fifo), 4);
        assert_eq!(fifo, vec![0, 1, 5]);

        let mut lifo = vec![2, 3, 5];
        assert_eq!(reserve_critical(&mut lifo, 6, IssuingOrder::Lifo), 6);
        assert_eq!(lifo, vec![2, 2, 0]);

        let mut short = vec![1, 1];
        assert_eq!(reserve_critical(&mut short, 5, IssuingOrder::Fifo), 2);
    }
}
