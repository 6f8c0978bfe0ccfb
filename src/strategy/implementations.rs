// src/strategy/implementations.rs

use crate::error::{Result, SimError};
use crate::simulation::config::{ProducerSetting, SimulationConfig, StoreSetting, DEPOT_CHANNEL};
use crate::strategy::allocation::{allocate_request, reserve_critical};
use crate::strategy::traits::{
    round_units, AllocationDecision, AllocationPolicy, IssuingOrder, Observations,
    ParameterBounds, ReplenishmentRule,
};

/// What a policy needs to know about one retailer.
#[derive(Debug, Clone, PartialEq)]
struct RetailerTarget {
    name: String,
    lead_time: usize,
    /// Mean + 3 sigma of daily demand; scales the parameter bounds.
    ceiling: f64,
}

impl RetailerTarget {
    fn from_store(store: &StoreSetting, lead_time: usize) -> Self {
        Self {
            name: store.name.clone(),
            lead_time,
            ceiling: store.demand_ceiling(),
        }
    }
}

// =========================================================================
// 1. Single Retailer Depot Policy
// =========================================================================

/// Two-threshold discount of a retailer's own stock: buckets below
/// `threshold` (closest to expiry) count with `near_expiry_weight`, the rest
/// with `fresh_weight`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TwoKAdjustment {
    pub threshold: usize,
    pub near_expiry_weight: f64,
    pub fresh_weight: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DepotPolicyParams {
    /// COP quantity or BSP target for the producer order.
    pub order: f64,
    /// COP quantity or BSP target per depot-fed retailer.
    pub dispatch: Vec<f64>,
    pub two_k: Vec<TwoKAdjustment>,
    /// Units held back for the depot's own channel.
    pub critical_reserve: Option<f64>,
}

/// Orders from the producer and splits the depot's stock among its retailers.
///
/// By default it is a full pull policy: constant orders, constant dispatch
/// requests, FIFO issuing at the depot. Retailer requests are served greedily
/// in declaration order, so earlier retailers win contested ages.
#[derive(Debug, Clone)]
pub struct SingleRetailerDepotPolicy {
    /// Shelf life at the depot (producer shelf life minus producer lead time).
    shelf_life: usize,
    producer_shelf_life: usize,
    retailers: Vec<RetailerTarget>,
    /// Sum of every store's ceiling, the depot's own channel included.
    network_ceiling: f64,
    online_mean: f64,
    order_rule: ReplenishmentRule,
    dispatch_rule: ReplenishmentRule,
    issuing: IssuingOrder,
    two_k: bool,
    critical: bool,
    params: DepotPolicyParams,
}

impl SingleRetailerDepotPolicy {
    pub fn new(producer: &ProducerSetting, stores: &[StoreSetting]) -> Result<Self> {
        let online = stores
            .iter()
            .find(|store| store.name == DEPOT_CHANNEL)
            .ok_or_else(|| {
                SimError::InvalidPolicyConfiguration(format!(
                    "the depot must serve the '{DEPOT_CHANNEL}' channel"
                ))
            })?;
        let retailers: Vec<RetailerTarget> = stores
            .iter()
            .filter(|store| store.name != DEPOT_CHANNEL)
            .map(|store| RetailerTarget::from_store(store, store.lead_time))
            .collect();
        let shelf_life = producer.delivered_shelf_life();
        if shelf_life == 0 {
            return Err(SimError::InvalidPolicyConfiguration(
                "producer lead time consumes the whole shelf life".into(),
            ));
        }

        Ok(Self {
            shelf_life,
            producer_shelf_life: producer.shelf_life,
            network_ceiling: stores.iter().map(StoreSetting::demand_ceiling).sum(),
            online_mean: online.mean_daily,
            params: DepotPolicyParams {
                dispatch: vec![0.0; retailers.len()],
                ..DepotPolicyParams::default()
            },
            retailers,
            order_rule: ReplenishmentRule::Constant,
            dispatch_rule: ReplenishmentRule::Constant,
            issuing: IssuingOrder::Fifo,
            two_k: false,
            critical: false,
        })
    }

    /// Builds the policy described by `config.policy` and loads its parameters.
    pub fn from_config(config: &SimulationConfig) -> Result<Self> {
        let mut policy = Self::new(&config.producer, &config.stores)?;
        policy.set_order_policy(config.policy.order.parse()?);
        policy.set_dispatch_policy(config.policy.dispatch.parse()?)?;
        policy.set_inner_issuing(config.policy.issuing.parse()?);
        if config.policy.two_k {
            policy.set_two_k()?;
        }
        if config.policy.critical_reserve {
            policy.set_critical_online();
        }
        policy.set_parameters_from_vector(&config.policy.parameters)?;
        Ok(policy)
    }

    pub fn set_order_policy(&mut self, rule: ReplenishmentRule) {
        self.order_rule = rule;
    }

    pub fn set_dispatch_policy(&mut self, rule: ReplenishmentRule) -> Result<()> {
        if self.two_k && rule == ReplenishmentRule::Constant {
            return Err(SimError::InvalidPolicyConfiguration(
                "the 2k adjustment needs base-stock dispatch".into(),
            ));
        }
        self.dispatch_rule = rule;
        Ok(())
    }

    pub fn set_inner_issuing(&mut self, issuing: IssuingOrder) {
        self.issuing = issuing;
    }

    /// Keeps a quantity on the depot's own shelves before any retailer is served.
    pub fn set_critical_online(&mut self) {
        self.critical = true;
    }

    pub fn set_two_k(&mut self) -> Result<()> {
        if self.dispatch_rule != ReplenishmentRule::BaseStock {
            return Err(SimError::InvalidPolicyConfiguration(
                "the 2k adjustment is only available for base-stock dispatch".into(),
            ));
        }
        self.two_k = true;
        Ok(())
    }

    pub fn params(&self) -> &DepotPolicyParams {
        &self.params
    }

    fn order_quantity(&self, observations: &Observations) -> Result<u32> {
        match self.order_rule {
            ReplenishmentRule::Constant => Ok(round_units(self.params.order)),
            ReplenishmentRule::BaseStock => {
                let mut position = observations.depot()?.position();
                for retailer in &self.retailers {
                    position += observations.retailer(&retailer.name)?.position();
                }
                Ok(round_units(self.params.order - f64::from(position)))
            }
        }
    }

    fn requests(&self, observations: &Observations) -> Result<Vec<u32>> {
        let mut requests = Vec::with_capacity(self.retailers.len());
        for (i, retailer) in self.retailers.iter().enumerate() {
            let target = self.params.dispatch.get(i).copied().unwrap_or(0.0);
            let request = match self.dispatch_rule {
                ReplenishmentRule::Constant => target,
                ReplenishmentRule::BaseStock => {
                    let obs = observations.retailer(&retailer.name)?;
                    let in_transit = f64::from(obs.total_in_transit());
                    if self.two_k {
                        let adjustment = self.params.two_k.get(i).ok_or_else(|| {
                            SimError::InvalidPolicyConfiguration(format!(
                                "no 2k parameters for retailer '{}'",
                                retailer.name
                            ))
                        })?;
                        let split = adjustment.threshold.min(obs.inventory.len());
                        let near_expiry: u32 = obs.inventory[..split].iter().sum();
                        let fresh: u32 = obs.inventory[split..].iter().sum();
                        target
                            - in_transit
                            - adjustment.near_expiry_weight * f64::from(near_expiry)
                            - adjustment.fresh_weight * f64::from(fresh)
                    } else {
                        target - in_transit - f64::from(obs.on_hand())
                    }
                }
            };
            requests.push(round_units(request));
        }
        Ok(requests)
    }
}

impl AllocationPolicy for SingleRetailerDepotPolicy {
    type Params = DepotPolicyParams;

    fn name(&self) -> &str {
        "single retailer depot"
    }

    fn decide(&self, observations: &Observations) -> Result<AllocationDecision> {
        let depot = observations.depot()?;
        let order = self.order_quantity(observations)?;
        let mut order_size = vec![0; self.shelf_life];
        if let Some(freshest) = order_size.last_mut() {
            *freshest = order;
        }

        let requests = self.requests(observations)?;

        // What the depot will hold when it dispatches tomorrow: today's shelves
        // (already aged) plus the next arrival.
        let mut available = depot.inventory.clone();
        match depot.in_transit.first() {
            Some(next) => next.add_into(&mut available)?,
            None => {
                if let Some(freshest) = available.last_mut() {
                    *freshest += order;
                }
            }
        }

        if self.critical {
            let critical = self.params.critical_reserve.ok_or_else(|| {
                SimError::InvalidPolicyConfiguration(
                    "critical reserve enabled but no reserve parameter set".into(),
                )
            })?;
            reserve_critical(&mut available, round_units(critical), self.issuing);
        }

        let dispatched = self
            .retailers
            .iter()
            .zip(requests)
            .map(|(retailer, request)| {
                let sent = allocate_request(&mut available, request, retailer.lead_time, self.issuing);
                (retailer.name.clone(), sent)
            })
            .collect();

        Ok(AllocationDecision {
            order_size,
            dispatched,
        })
    }

    fn bounds(&self) -> ParameterBounds {
        let mut upper = Vec::new();
        upper.push(match self.order_rule {
            ReplenishmentRule::Constant => self.network_ceiling,
            ReplenishmentRule::BaseStock => {
                (self.producer_shelf_life.saturating_sub(1)) as f64 * self.network_ceiling
            }
        });
        for retailer in &self.retailers {
            upper.push(match self.dispatch_rule {
                ReplenishmentRule::Constant => retailer.ceiling,
                ReplenishmentRule::BaseStock => {
                    (self.shelf_life - 1 + retailer.lead_time) as f64 * retailer.ceiling
                }
            });
        }
        if self.two_k {
            for retailer in &self.retailers {
                let deepest = self.shelf_life.saturating_sub(retailer.lead_time + 1);
                upper.extend([deepest as f64, 1.0, 1.0]);
            }
        }
        if self.critical {
            upper.push(self.online_mean);
        }
        ParameterBounds {
            lower: vec![0.0; upper.len()],
            upper,
        }
    }

    fn params_from_vector(&self, x: &[f64]) -> Result<DepotPolicyParams> {
        self.bounds().validate(x)?;
        let n = self.retailers.len();
        let mut cursor = 1 + n;
        let two_k = if self.two_k {
            let triples = x[cursor..cursor + 3 * n]
                .chunks_exact(3)
                .map(|triple| TwoKAdjustment {
                    threshold: triple[0] as usize,
                    near_expiry_weight: triple[1],
                    fresh_weight: triple[2],
                })
                .collect();
            cursor += 3 * n;
            triples
        } else {
            Vec::new()
        };
        let critical_reserve = self.critical.then(|| x[cursor]);

        Ok(DepotPolicyParams {
            order: x[0],
            dispatch: x[1..1 + n].to_vec(),
            two_k,
            critical_reserve,
        })
    }

    fn set_parameters(&mut self, params: DepotPolicyParams) {
        self.params = params;
    }
}

// =========================================================================
// 2. Constant Order / Base Stock Policy (no depot)
// =========================================================================

/// Every retailer orders straight from the producer, each with its own
/// constant or base-stock rule. All retailers start constant.
#[derive(Debug, Clone)]
pub struct ConstantOrderBaseStockPolicy {
    /// Shelf life on arrival (producer shelf life minus lead time).
    shelf_life: usize,
    producer_shelf_life: usize,
    retailers: Vec<RetailerTarget>,
    rules: Vec<ReplenishmentRule>,
    params: Vec<f64>,
}

impl ConstantOrderBaseStockPolicy {
    pub fn new(producer: &ProducerSetting, stores: &[StoreSetting]) -> Result<Self> {
        let shelf_life = producer.delivered_shelf_life();
        if shelf_life == 0 {
            return Err(SimError::InvalidPolicyConfiguration(
                "producer lead time consumes the whole shelf life".into(),
            ));
        }
        let retailers: Vec<RetailerTarget> = stores
            .iter()
            .map(|store| RetailerTarget::from_store(store, producer.lead_time))
            .collect();
        Ok(Self {
            shelf_life,
            producer_shelf_life: producer.shelf_life,
            rules: vec![ReplenishmentRule::Constant; retailers.len()],
            params: vec![0.0; retailers.len()],
            retailers,
        })
    }

    pub fn from_config(config: &SimulationConfig) -> Result<Self> {
        let mut policy = Self::new(&config.producer, &config.stores)?;
        for name in &config.policy.base_stock_stores {
            policy.set_base_stock(name)?;
        }
        policy.set_parameters_from_vector(&config.policy.parameters)?;
        Ok(policy)
    }

    pub fn set_base_stock(&mut self, retailer: &str) -> Result<()> {
        self.set_rule(retailer, ReplenishmentRule::BaseStock)
    }

    pub fn rule(&self, retailer: &str) -> Option<ReplenishmentRule> {
        self.index_of(retailer).ok().map(|index| self.rules[index])
    }

    fn set_rule(&mut self, retailer: &str, rule: ReplenishmentRule) -> Result<()> {
        let index = self.index_of(retailer)?;
        self.rules[index] = rule;
        Ok(())
    }

    fn index_of(&self, retailer: &str) -> Result<usize> {
        self.retailers
            .iter()
            .position(|target| target.name == retailer)
            .ok_or_else(|| {
                SimError::InvalidPolicyConfiguration(format!("retailer '{retailer}' does not exist"))
            })
    }
}

impl AllocationPolicy for ConstantOrderBaseStockPolicy {
    type Params = Vec<f64>;

    fn name(&self) -> &str {
        "single echelon COP/BSP"
    }

    fn decide(&self, observations: &Observations) -> Result<AllocationDecision> {
        let mut dispatched = Vec::with_capacity(self.retailers.len());
        for (i, retailer) in self.retailers.iter().enumerate() {
            let target = self.params.get(i).copied().unwrap_or(0.0);
            let units = match self.rules[i] {
                ReplenishmentRule::Constant => round_units(target),
                ReplenishmentRule::BaseStock => {
                    let position = observations.retailer(&retailer.name)?.position();
                    round_units(target - f64::from(position))
                }
            };
            // Producer stock always arrives as fresh as it can be.
            let mut order = vec![0; self.shelf_life];
            if let Some(freshest) = order.last_mut() {
                *freshest = units;
            }
            dispatched.push((retailer.name.clone(), order));
        }
        Ok(AllocationDecision {
            order_size: Vec::new(),
            dispatched,
        })
    }

    fn bounds(&self) -> ParameterBounds {
        let upper: Vec<f64> = self
            .retailers
            .iter()
            .zip(&self.rules)
            .map(|(retailer, rule)| match rule {
                ReplenishmentRule::Constant => retailer.ceiling,
                ReplenishmentRule::BaseStock => self.producer_shelf_life as f64 * retailer.ceiling,
            })
            .collect();
        ParameterBounds {
            lower: vec![0.0; upper.len()],
            upper,
        }
    }

    fn params_from_vector(&self, x: &[f64]) -> Result<Vec<f64>> {
        self.bounds().validate(x)?;
        Ok(x.to_vec())
    }

    fn set_parameters(&mut self, params: Vec<f64>) {
        self.params = params;
    }
}
