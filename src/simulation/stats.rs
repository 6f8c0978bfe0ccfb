// src/simulation/stats.rs

use crate::error::{Result, SimError};

/// Fewest recorded days before convergence is even considered (about 18 weeks).
pub const MIN_STEPS: usize = 120;

const DEFAULT_END_EPS: f64 = 0.0025;
const DEFAULT_END_WINDOW: usize = 35;

/// One unit's contribution to a day, as handed to [`StatManager::record_channel`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ChannelDay {
    pub profit: f64,
    pub scrapped: u32,
    pub sold: u32,
    pub lost: u32,
    /// Purchase cost paid by the unit itself; only used without a depot.
    pub cost: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelStats {
    pub sold: u64,
    pub scrapped: u64,
    pub profit: f64,
    pub lost: u64,
    pub stock_out_days: u64,
    day_profit: f64,
    pending_cost: f64,
}

/// Running statistics of an episode.
///
/// The first `head` days are a transient and are not recorded. Everything
/// else accumulates per channel (store name) and is folded into the daily
/// cash flow by [`StatManager::close_day`].
#[derive(Debug, Clone)]
pub struct StatManager {
    channels: Vec<(String, ChannelStats)>,
    with_depot: bool,
    horizon: usize,
    head: usize,
    clock: usize,
    n: usize,
    end_eps: f64,
    end_window: usize,
    total_cost: f64,
    cash_flow_history: Vec<f64>,
    average_profit_history: Vec<f64>,
}

impl StatManager {
    pub fn new(channels: Vec<String>, with_depot: bool) -> Self {
        Self {
            channels: channels
                .into_iter()
                .map(|name| (name, ChannelStats::default()))
                .collect(),
            with_depot,
            horizon: 0,
            head: 0,
            clock: 0,
            n: 0,
            end_eps: DEFAULT_END_EPS,
            end_window: DEFAULT_END_WINDOW,
            total_cost: 0.0,
            cash_flow_history: Vec::new(),
            average_profit_history: Vec::new(),
        }
    }

    pub fn clear(&mut self) {
        for (_, stats) in self.channels.iter_mut() {
            *stats = ChannelStats::default();
        }
        self.clock = 0;
        self.n = 0;
        self.total_cost = 0.0;
        self.cash_flow_history.clear();
        self.average_profit_history.clear();
    }

    pub fn set_horizon(&mut self, horizon_days: usize) -> Result<()> {
        if horizon_days <= MIN_STEPS {
            return Err(SimError::InvalidHorizon {
                days: horizon_days,
                reason: format!("need more than {MIN_STEPS} days for meaningful statistics"),
            });
        }
        self.horizon = horizon_days;
        Ok(())
    }

    /// Days at the start of an episode excluded from every statistic.
    pub fn set_head(&mut self, head: usize) {
        self.head = head;
    }

    /// Days over which the average profit must be flat to stop early.
    pub fn set_end_window(&mut self, window: usize) -> Result<()> {
        if window == 0 {
            return Err(SimError::InvalidConfig("convergence window must be positive".into()));
        }
        self.end_window = window;
        Ok(())
    }

    /// Allowed spread of the average profit relative to its mean.
    pub fn set_end_eps(&mut self, eps: f64) -> Result<()> {
        if !(eps > 0.0 && eps < 1.0) {
            return Err(SimError::InvalidConfig(format!(
                "convergence eps {eps} is not in (0, 1)"
            )));
        }
        self.end_eps = eps;
        Ok(())
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    pub fn head(&self) -> usize {
        self.head
    }

    pub fn clock(&self) -> usize {
        self.clock
    }

    /// Number of recorded (post-transient) days.
    pub fn steps(&self) -> usize {
        self.n
    }

    /// Advances the clock; call once at the start of every day.
    pub fn tick(&mut self) -> Result<()> {
        if self.horizon == 0 {
            return Err(SimError::InvalidHorizon {
                days: 0,
                reason: "no horizon set".into(),
            });
        }
        self.clock += 1;
        Ok(())
    }

    fn recording(&self) -> bool {
        self.clock > self.head && self.clock <= self.horizon
    }

    pub fn record_channel(&mut self, channel: &str, day: &ChannelDay) -> Result<()> {
        let recording = self.recording();
        let with_depot = self.with_depot;
        let stats = self
            .channels
            .iter_mut()
            .find(|(name, _)| name == channel)
            .map(|(_, stats)| stats)
            .ok_or_else(|| SimError::UnknownUnit(channel.to_string()))?;
        if !recording {
            return Ok(());
        }
        stats.sold += u64::from(day.sold);
        stats.scrapped += u64::from(day.scrapped);
        stats.profit += day.profit;
        stats.lost += u64::from(day.lost);
        if day.lost > 0 {
            stats.stock_out_days += 1;
        }
        stats.day_profit = day.profit;
        if !with_depot {
            stats.pending_cost += day.cost;
        }
        Ok(())
    }

    /// Folds the day's channel figures into the cash flow and returns it.
    ///
    /// `depot_cost` is the depot's purchase cost; without a depot the
    /// retailers' own pending costs are used instead. Outside the recorded
    /// window the cash flow is zero.
    pub fn close_day(&mut self, depot_cost: f64) -> f64 {
        if !self.recording() {
            return 0.0;
        }
        let cost = if self.with_depot {
            depot_cost
        } else {
            self.channels
                .iter_mut()
                .map(|(_, stats)| std::mem::take(&mut stats.pending_cost))
                .sum::<f64>()
        };
        self.total_cost += cost;
        let profits: f64 = self
            .channels
            .iter_mut()
            .map(|(_, stats)| std::mem::take(&mut stats.day_profit))
            .sum();

        let cash_flow = profits - cost;
        self.n += 1;
        self.average_profit_history.push(self.average_profit());
        self.cash_flow_history.push(cash_flow);
        cash_flow
    }

    pub fn channel(&self, name: &str) -> Option<&ChannelStats> {
        self.channels
            .iter()
            .find(|(channel, _)| channel == name)
            .map(|(_, stats)| stats)
    }

    pub fn channel_names(&self) -> impl Iterator<Item = &str> {
        self.channels.iter().map(|(name, _)| name.as_str())
    }

    pub fn total_revenue(&self) -> f64 {
        self.channels.iter().map(|(_, stats)| stats.profit).sum()
    }

    pub fn total_purchase_cost(&self) -> f64 {
        self.total_cost
    }

    pub fn cash_flow_history(&self) -> &[f64] {
        &self.cash_flow_history
    }

    pub fn average_profit_history(&self) -> &[f64] {
        &self.average_profit_history
    }

    pub fn stock_out_probability(&self, channel: &str) -> Result<f64> {
        let stats = self
            .channel(channel)
            .ok_or_else(|| SimError::UnknownUnit(channel.to_string()))?;
        Ok(self.per_step(stats.stock_out_days as f64))
    }

    pub fn average_profit(&self) -> f64 {
        self.per_step(self.total_revenue() - self.total_purchase_cost())
    }

    pub fn average_unmet(&self) -> f64 {
        self.per_step(self.channels.iter().map(|(_, stats)| stats.lost as f64).sum())
    }

    pub fn average_scrapped(&self) -> f64 {
        self.per_step(self.channels.iter().map(|(_, stats)| stats.scrapped as f64).sum())
    }

    fn per_step(&self, value: f64) -> f64 {
        if self.n == 0 {
            0.0
        } else {
            value / self.n as f64
        }
    }

    /// True once the running average profit has settled over the last window,
    /// or has stayed negative throughout it.
    pub fn check_if_done(&self) -> bool {
        if self.clock < MIN_STEPS || self.n < self.end_window {
            return false;
        }
        let window = &self.average_profit_history[self.n - self.end_window..self.n];
        if window.iter().all(|&profit| profit < 0.0) {
            return true;
        }
        let up = window.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let low = window.iter().copied().fold(f64::INFINITY, f64::min);
        let mean = self.average_profit_history.iter().sum::<f64>()
            / self.average_profit_history.len() as f64;
        up - low <= self.end_eps * mean
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager(with_depot: bool) -> StatManager {
        let mut stats = StatManager::new(vec!["OnLine".into(), "OffLine".into()], with_depot);
        stats.set_horizon(140).unwrap();
        stats
    }

    fn day(profit: f64, lost: u32, cost: f64) -> ChannelDay {
        ChannelDay {
            profit,
            scrapped: 1,
            sold: 5,
            lost,
            cost,
        }
    }

    #[test]
    fn short_horizons_and_bad_settings_are_rejected() {
        let mut stats = StatManager::new(vec!["OnLine".into()], true);
        assert!(matches!(stats.tick(), Err(SimError::InvalidHorizon { .. })));
        assert!(stats.set_horizon(MIN_STEPS).is_err());
        assert!(stats.set_end_window(0).is_err());
        assert!(stats.set_end_eps(1.0).is_err());
        assert!(stats.set_end_eps(0.01).is_ok());
    }

    #[test]
    fn head_days_are_not_recorded() {
        let mut stats = manager(true);
        stats.set_head(2);
        for _ in 0..2 {
            stats.tick().unwrap();
            stats.record_channel("OnLine", &day(10.0, 1, 0.0)).unwrap();
            assert_eq!(stats.close_day(4.0), 0.0);
        }
        assert_eq!(stats.steps(), 0);
        assert_eq!(stats.average_profit(), 0.0);

        stats.tick().unwrap();
        stats.record_channel("OnLine", &day(10.0, 0, 0.0)).unwrap();
        stats.record_channel("OffLine", &day(6.0, 3, 0.0)).unwrap();
        assert_eq!(stats.close_day(4.0), 12.0);
        assert_eq!(stats.steps(), 1);
        assert_eq!(stats.average_profit(), 12.0);
        assert_eq!(stats.average_unmet(), 3.0);
        assert_eq!(stats.average_scrapped(), 2.0);
        assert_eq!(stats.stock_out_probability("OffLine").unwrap(), 1.0);
        assert_eq!(stats.stock_out_probability("OnLine").unwrap(), 0.0);
    }

    #[test]
    fn without_depot_retailers_pay_their_own_orders() {
        let mut stats = manager(false);
        stats.tick().unwrap();
        stats.record_channel("OnLine", &day(10.0, 0, 3.0)).unwrap();
        stats.record_channel("OffLine", &day(8.0, 0, 2.0)).unwrap();
        // the depot cost argument is ignored
        assert_eq!(stats.close_day(100.0), 13.0);
        assert_eq!(stats.total_purchase_cost(), 5.0);
        assert_eq!(stats.cash_flow_history(), &[13.0]);
    }

    #[test]
    fn unknown_channel_is_rejected() {
        let mut stats = manager(true);
        stats.tick().unwrap();
        assert!(matches!(
            stats.record_channel("Depot", &ChannelDay::default()),
            Err(SimError::UnknownUnit(_))
        ));
    }

    #[test]
    fn stable_average_converges() {
        let mut stats = manager(true);
        for clock in 1..=MIN_STEPS {
            stats.tick().unwrap();
            stats.record_channel("OnLine", &day(10.0, 0, 0.0)).unwrap();
            stats.close_day(2.0);
            if clock < MIN_STEPS {
                assert!(!stats.check_if_done());
            }
        }
        assert!(stats.check_if_done());
    }

    #[test]
    fn losing_strategy_stops_early() {
        let mut stats = manager(true);
        for _ in 0..MIN_STEPS {
            stats.tick().unwrap();
            stats.record_channel("OnLine", &day(1.0, 0, 0.0)).unwrap();
            stats.close_day(5.0);
        }
        assert!(stats.check_if_done());
    }

    #[test]
    fn clear_resets_the_episode() {
        let mut stats = manager(true);
        stats.tick().unwrap();
        stats.record_channel("OnLine", &day(10.0, 2, 0.0)).unwrap();
        stats.close_day(1.0);
        stats.clear();
        assert_eq!(stats.clock(), 0);
        assert_eq!(stats.steps(), 0);
        assert_eq!(stats.channel("OnLine").unwrap(), &ChannelStats::default());
        assert!(stats.average_profit_history().is_empty());
    }
}
