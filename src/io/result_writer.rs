use std::fs::File;
use std::io::{BufWriter, Write};

use anyhow::Context;
use serde::Serialize;

use crate::calibration::strategy::StrategyWeights;
use crate::calibration::CalibrationResult;
use crate::ledger::LedgerRow;
use crate::operators::{FleetOperator, TourOperator};
use crate::plan::comparison::PlanDistance;
use crate::plan::evaluation::PlanStatistics;
use crate::plan::TourPlan;
use crate::problem::{Capacity, ServiceId, VehicleId, VehicleTypeId};

#[derive(Serialize)]
struct TourRecord<'a> {
    vehicle: &'a VehicleId,
    vehicle_type: &'a VehicleTypeId,
    load: Capacity,
    services: Vec<&'a ServiceId>,
}

#[derive(Serialize)]
struct ResultRecord<'a> {
    instance: &'a str,
    carrier: &'a str,
    seed: i128,
    distance: f64,
    breakdown: &'a PlanDistance,
    statistics: &'a PlanStatistics,
    reference: &'a PlanStatistics,
    iterations: usize,
    number_of_improvements: usize,
    time_in_seconds: f64,
    outer_weights: Option<&'a StrategyWeights<FleetOperator>>,
    inner_weights: Option<&'a StrategyWeights<TourOperator>>,
    tours: Vec<TourRecord<'a>>,
}

fn tour_records(plan: &TourPlan) -> Vec<TourRecord> {
    plan.tours()
        .iter()
        .map(|scheduled| TourRecord {
            vehicle: &scheduled.vehicle.id,
            vehicle_type: scheduled.type_id(),
            load: scheduled.load(),
            services: scheduled.tour.services().map(|it| &it.id).collect(),
        })
        .collect()
}

/// Writes the best plan with its statistics and distance breakdown as JSON.
pub fn write_result<W: Write>(
    writer: W,
    instance: &str,
    seed: i128,
    reference: &PlanStatistics,
    result: &CalibrationResult,
) -> anyhow::Result<()> {
    let record = ResultRecord {
        instance,
        carrier: &result.best.plan().carrier().id,
        seed,
        distance: result.best_distance.total(),
        breakdown: &result.best_distance,
        statistics: result.best.statistics(),
        reference,
        iterations: result.iterations,
        number_of_improvements: result.number_of_improvements,
        time_in_seconds: result.time.as_std().as_secs_f64(),
        outer_weights: result.outer_weights.as_ref(),
        inner_weights: result.inner_weights.as_ref(),
        tours: tour_records(result.best.plan()),
    };
    serde_json::to_writer_pretty(writer, &record)?;
    Ok(())
}

pub fn write_result_file(
    path: impl Into<String>,
    instance: &str,
    seed: i128,
    reference: &PlanStatistics,
    result: &CalibrationResult,
) -> anyhow::Result<()> {
    let path = path.into();
    let f = File::create(path.as_str()).with_context(|| format!("creating {}", path))?;
    let mut file = BufWriter::new(&f);
    write_result(&mut file, instance, seed, reference, result)?;
    file.flush()?;
    Ok(())
}

pub fn write_ledger_file(path: impl Into<String>, rows: &[LedgerRow]) -> anyhow::Result<()> {
    let path = path.into();
    let f = File::create(path.as_str()).with_context(|| format!("creating {}", path))?;
    let mut file = BufWriter::new(&f);
    serde_json::to_writer(&mut file, rows)?;
    file.flush()?;
    Ok(())
}
