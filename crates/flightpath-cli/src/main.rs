//! fpcalc - run lateral flight path calculations on scenario files.
//!
//! Usage:
//!   fpcalc calc scenario.json [--from 0] [--vectors]
//!   fpcalc demo

mod scenario;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use flightpath_core::{
    CalculationOutcome, FlightPathCalculator, FlightPathCalculatorOptions, FlightPlan, PlanCalculationService,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::scenario::{LegSummary, PlanSummary, Scenario};

#[derive(Parser, Debug)]
#[command(author, version, about = "Lateral flight path calculator")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Calculate a scenario file and print the resulting geometry as JSON
    Calc {
        /// Scenario file (JSON)
        file: PathBuf,

        /// First leg to recalculate
        #[arg(long, default_value_t = 0)]
        from: usize,

        /// Include the flown vectors of every leg
        #[arg(long)]
        vectors: bool,
    },
    /// Calculate a built-in approach scenario
    Demo {
        #[arg(long)]
        vectors: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("flightpath=info".parse()?))
        .init();

    let args = Args::parse();
    let (scenario, from, vectors) = match args.command {
        Command::Calc { file, from, vectors } => {
            let raw = std::fs::read_to_string(&file).with_context(|| format!("reading {}", file.display()))?;
            let scenario: Scenario =
                serde_json::from_str(&raw).with_context(|| format!("parsing scenario {}", file.display()))?;
            (scenario, from, vectors)
        }
        Command::Demo { vectors } => (scenario::demo(), 0, vectors),
    };

    let summary = run(scenario, from, vectors).await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

async fn run(scenario: Scenario, from: usize, vectors: bool) -> Result<PlanSummary> {
    let mut options = FlightPathCalculatorOptions::from_env();
    if let Some(overrides) = scenario.options.clone() {
        options = overrides;
    }
    let calculator = FlightPathCalculator::new(
        Arc::new(scenario.facility_store()),
        Arc::new(scenario.mag_var_source()),
        options,
    );

    let mut plan = FlightPlan::new(0);
    for segment in &scenario.segments {
        let index = plan.add_segment(segment.segment_type);
        for leg in &segment.legs {
            plan.add_leg(index, leg.clone().into(), None)?;
        }
    }
    plan.set_lateral_leg_index(scenario.active_leg);
    plan.set_calculating_leg_index(scenario.active_leg);
    tracing::info!(legs = plan.length(), segments = scenario.segments.len(), "scenario loaded");

    let service = PlanCalculationService::new(plan, Arc::new(calculator));
    service.set_aircraft_state(scenario.aircraft.clone()).await;
    let generation = match service.calculate(from).await {
        CalculationOutcome::Completed { generation, .. } => generation,
        CalculationOutcome::Superseded { ticket } => anyhow::bail!("calculation {ticket} superseded"),
    };

    let plan = service.plan().await;
    let legs: Vec<LegSummary> = plan
        .legs()
        .enumerate()
        .map(|(index, leg)| LegSummary::from_leg(index, leg, vectors))
        .collect();
    let degraded = legs.iter().filter(|leg| leg.degraded).count();
    if degraded > 0 {
        tracing::warn!(degraded, "some legs use fallback geometry");
    }
    tracing::info!(generation, legs = legs.len(), "calculation complete");

    Ok(PlanSummary {
        generation,
        total_distance_nm: legs.last().map(|leg| leg.cumulative_distance_nm).unwrap_or(0.0),
        legs,
    })
}
