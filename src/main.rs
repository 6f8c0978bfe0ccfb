use perishable_chain::io::demand::CorrelatedDemand;
use perishable_chain::io::reporting::{self, EpisodeSummary};
use perishable_chain::logging::setup_logging;
use perishable_chain::simulation::config::SimulationConfig;
use perishable_chain::simulation::engine::DailySimulation;
use perishable_chain::strategy::implementations::{
    ConstantOrderBaseStockPolicy, SingleRetailerDepotPolicy,
};
use perishable_chain::strategy::traits::AllocationPolicy;
use std::env;
use std::error::Error;
use tracing::info;

fn main() -> Result<(), Box<dyn Error>> {
    let level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let json = env::var("LOG_FORMAT").map_or(false, |format| format.eq_ignore_ascii_case("json"));
    setup_logging(&level, json);

    // 1. CONFIGURATION
    // Optional JSON file as the only argument; defaults otherwise.
    let config = match env::args().nth(1) {
        Some(path) => {
            info!(path = %path, "loading configuration");
            SimulationConfig::from_json_file(path)?
        }
        None => {
            info!("no configuration file given, using defaults");
            SimulationConfig::default()
        }
    };

    // 2. SIMULATION (network, statistics, correlated demand)
    let mut sim = DailySimulation::from_config(&config)?;

    // 3. POLICY AND RUN
    let summary = if config.with_depot {
        run(&mut sim, SingleRetailerDepotPolicy::from_config(&config)?)?
    } else {
        run(&mut sim, ConstantOrderBaseStockPolicy::from_config(&config)?)?
    };

    // 4. RESULTS
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn run<P: AllocationPolicy>(
    sim: &mut DailySimulation<CorrelatedDemand>,
    policy: P,
) -> Result<EpisodeSummary, Box<dyn Error>> {
    info!(policy = policy.name(), parameters = policy.bounds().dim(), "policy configured");
    let summary = sim.run(&policy)?;
    reporting::log_summary(policy.name(), &summary);
    Ok(summary)
}
