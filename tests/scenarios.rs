use perishable_chain::model::echelon::Observation;
use perishable_chain::model::inventory::AgedInventory;
use perishable_chain::model::queues::{Delivery, PipelineShape, SupplyPipeline};
use perishable_chain::simulation::config::{
    IssuingSplitSetting, ProducerSetting, StoreSetting, DEPOT_CHANNEL,
};
use perishable_chain::strategy::allocation::allocate_request;
use perishable_chain::strategy::implementations::SingleRetailerDepotPolicy;
use perishable_chain::strategy::traits::{AllocationPolicy, IssuingOrder, Observations};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;

fn store(name: &str, lead_time: usize) -> StoreSetting {
    StoreSetting {
        name: name.to_string(),
        price: 2.0,
        markdown: 0.0,
        lead_time,
        mean_daily: 10.0,
        std_daily: 5.0,
        distribution: "negative_binomial".to_string(),
        issuing: IssuingSplitSetting {
            kind: "fixed".to_string(),
            params: BTreeMap::from([("dirac".to_string(), 0.0)]),
        },
    }
}

fn depot_observation(inventory: Vec<u32>) -> Observation {
    let shelf_life = inventory.len();
    Observation {
        inventory,
        in_transit: vec![Delivery::Aged(vec![0; shelf_life])],
    }
}

fn empty_retailer(shelf_life: usize, lead_time: usize) -> Observation {
    Observation {
        inventory: vec![0; shelf_life],
        in_transit: vec![Delivery::Aged(vec![0; shelf_life]); lead_time],
    }
}

#[test]
fn scenario_a_order_arrives_after_lead_time_and_ages() {
    let mut inventory = AgedInventory::new(3);
    let mut pipeline = SupplyPipeline::new(1, PipelineShape::Fresh);

    // Day 1
    pipeline.place_order(Delivery::Fresh(10)).unwrap();
    let arrived = pipeline.deliver();
    assert_eq!(arrived.total(), 0);
    inventory.receive(&arrived).unwrap();

    // Day 2
    pipeline.place_order(Delivery::Fresh(0)).unwrap();
    let arrived = pipeline.deliver();
    assert_eq!(arrived.total(), 10);
    inventory.receive(&arrived).unwrap();
    assert_eq!(inventory.counts(), &[0, 0, 10]);

    assert_eq!(inventory.issue_lifo(4), 4);
    assert_eq!(inventory.counts(), &[0, 0, 6]);
    assert_eq!(inventory.age(), 0);
    assert_eq!(inventory.counts(), &[0, 6, 0]);
}

#[test]
fn scenario_b_priority_retailer_takes_the_oldest_stock() {
    let mut available = vec![2, 3, 5];
    let first = allocate_request(&mut available, 4, 0, IssuingOrder::Fifo);
    let second = allocate_request(&mut available, 4, 0, IssuingOrder::Fifo);
    assert_eq!(first, vec![2, 2, 0]);
    assert_eq!(second, vec![0, 1, 3]);
    assert_eq!(available, vec![0, 0, 2]);
}

#[test]
fn scenario_b_through_the_depot_policy() {
    let producer = ProducerSetting {
        shelf_life: 4,
        lead_time: 1,
        unit_cost: 1.0,
    };
    let stores = vec![store(DEPOT_CHANNEL, 0), store("R1", 0), store("R2", 0)];
    let mut policy = SingleRetailerDepotPolicy::new(&producer, &stores).unwrap();
    // constant order of zero, constant requests of four, FIFO, no reserve
    policy.set_parameters_from_vector(&[0.0, 4.0, 4.0]).unwrap();

    let observations = Observations {
        depot: Some(depot_observation(vec![2, 3, 5])),
        retailers: vec![
            ("R1".to_string(), empty_retailer(3, 0)),
            ("R2".to_string(), empty_retailer(3, 0)),
        ],
    };
    let decision = policy.decide(&observations).unwrap();
    assert_eq!(decision.dispatch_for("R1").unwrap(), &[2, 2, 0]);
    assert_eq!(decision.dispatch_for("R2").unwrap(), &[0, 1, 3]);
    assert_eq!(decision.order_size, vec![0, 0, 0]);
}

#[test]
fn conservation_under_random_receipts() {
    let mut rng = StdRng::seed_from_u64(42);
    let mut inventory = AgedInventory::new(5);
    for _ in 0..200 {
        let before = inventory.total();
        let delivery = if rng.gen_bool(0.5) {
            Delivery::Fresh(rng.gen_range(0..20))
        } else {
            Delivery::Aged((0..5).map(|_| rng.gen_range(0..8)).collect())
        };
        inventory.receive(&delivery).unwrap();
        assert_eq!(inventory.total(), before + delivery.total());
        // keep totals bounded
        inventory.issue_fifo(rng.gen_range(0..30));
    }
}

#[test]
fn aging_shifts_every_bucket_by_one_day() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut inventory = AgedInventory::new(4);
    for _ in 0..50 {
        let ages: Vec<u32> = (0..4).map(|_| rng.gen_range(0..10)).collect();
        inventory.receive(&Delivery::Aged(ages)).unwrap();
        let before = inventory.counts().to_vec();
        let scrapped = inventory.age();
        let after = inventory.counts();
        assert_eq!(scrapped, before[0]);
        assert_eq!(&after[..3], &before[1..]);
        assert_eq!(after[3], 0);
    }
}

#[test]
fn bulk_issuance_caps_at_stock_on_hand() {
    let mut rng = StdRng::seed_from_u64(3);
    for _ in 0..100 {
        let ages: Vec<u32> = (0..4).map(|_| rng.gen_range(0..6)).collect();
        let demand = rng.gen_range(0..30);

        let mut lifo = AgedInventory::new(4);
        lifo.receive(&Delivery::Aged(ages.clone())).unwrap();
        let on_hand = lifo.total();
        let served = lifo.issue_lifo(demand);
        assert_eq!(served, demand.min(on_hand));
        assert_eq!(lifo.total(), on_hand - served);

        let mut fifo = AgedInventory::new(4);
        fifo.receive(&Delivery::Aged(ages)).unwrap();
        let served = fifo.issue_fifo(demand);
        assert_eq!(served, demand.min(on_hand));
        assert_eq!(fifo.total(), on_hand - served);
    }
}

#[test]
fn orders_arrive_exactly_lead_time_days_later() {
    let lead_time = 3;
    let mut pipeline = SupplyPipeline::new(lead_time, PipelineShape::Fresh);
    let orders = [5, 0, 7, 2, 0, 0, 9, 0, 0, 0, 0];
    for (day, &quantity) in orders.iter().enumerate() {
        pipeline.place_order(Delivery::Fresh(quantity)).unwrap();
        let arrived = pipeline.deliver();
        let expected = day.checked_sub(lead_time).map_or(0, |placed| orders[placed]);
        assert_eq!(arrived, Delivery::Fresh(expected), "day {day}");
    }
}

#[test]
fn stock_that_would_expire_in_transit_is_never_dispatched() {
    let producer = ProducerSetting {
        shelf_life: 6,
        lead_time: 1,
        unit_cost: 1.0,
    };
    let stores = vec![store(DEPOT_CHANNEL, 0), store("Far", 2)];
    let mut policy = SingleRetailerDepotPolicy::new(&producer, &stores).unwrap();
    policy.set_parameters_from_vector(&[0.0, 20.0]).unwrap();

    // Only residual lives 0 and 1 are stocked: none survives a two-day trip.
    let observations = Observations {
        depot: Some(depot_observation(vec![5, 5, 0, 0, 0])),
        retailers: vec![("Far".to_string(), empty_retailer(3, 2))],
    };
    let decision = policy.decide(&observations).unwrap();
    assert_eq!(decision.dispatch_for("Far").unwrap(), &[0, 0, 0]);

    let mut rng = StdRng::seed_from_u64(21);
    for _ in 0..100 {
        let inventory: Vec<u32> = (0..5).map(|_| rng.gen_range(0..15)).collect();
        let usable: u32 = inventory[2..].iter().sum();
        let observations = Observations {
            depot: Some(depot_observation(inventory)),
            retailers: vec![("Far".to_string(), empty_retailer(3, 2))],
        };
        let sent = policy.decide(&observations).unwrap().total_dispatched();
        assert!(sent <= usable);
        assert_eq!(sent, usable.min(20));
    }
}
