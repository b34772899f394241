//! Single-level calibration for carriers with one vehicle type: tour operators chosen uniformly,
//! a plain Metropolis walk against the global best, then a fleet-sizing sweep that adds one
//! vehicle per round.

use log::{debug, info, trace};

use crate::calibration::acceptance::{
    AcceptanceCriterion, GeometricCooling, MetropolisCriterion, TemperatureBounds,
};
use crate::calibration::{uniform_tour_operator, warmup, Calibration, SearchState, Trial};
use crate::error::Result;
use crate::ledger::IterationRecord;
use crate::utils::logging::format_log_evaluated;
#[cfg(feature = "search_assertions")]
use crate::utils::validator::assert_valid_plan;
use crate::utils::{AnnealProgress, DefaultProgress, Random};

pub(crate) fn run(
    calibration: &Calibration,
    state: &mut SearchState,
    initial_tours: usize,
    rng: &mut Random,
) -> Result<()> {
    let bounds = warmup::inner_bounds(calibration, &state.current, rng)?;
    info!("temperatures: {:.6} -> {:.6}", bounds.initial, bounds.end);

    anneal(calibration, state, bounds, rng)?;

    calibration.fleet_sizing_sweep(state, initial_tours, rng, |state, rng| {
        anneal(calibration, state, bounds, rng)
    })?;
    Ok(())
}

fn anneal(
    calibration: &Calibration,
    state: &mut SearchState,
    bounds: TemperatureBounds,
    rng: &mut Random,
) -> Result<()> {
    let mut cooling = GeometricCooling::new(
        bounds,
        calibration.params().cooling_factor,
        calibration.params().homogeneous_iterations_per_temperature,
    );
    let mut progress = DefaultProgress::with_length(cooling.expected_iterations());

    while cooling.is_active() && !calibration.tolerance_reached(state) && !state.stopped {
        let temperature = cooling.get_current_temperature();
        state.iteration += 1;
        // a single level, both temperatures are the same
        let mut record = IterationRecord::new(state.iteration, temperature, temperature);

        let op = uniform_tour_operator(rng);
        if let Some(Trial {
                        candidate: neighbor,
                        ..
                    }) = calibration.tour_trial(op, state.current.plan(), rng)?
        {
            trace!("{:?} -> {:.4}", op, neighbor.value());
            record.neighbor = state.snapshot(&neighbor);

            if neighbor.value() <= state.best.value() {
                debug!(
                    "new best {}",
                    format_log_evaluated(&neighbor.evaluated, neighbor.value())
                );
                record.best = state.snapshot(&neighbor);
                state.current = neighbor.clone();
                state.improve(neighbor);
            } else if MetropolisCriterion.check_acceptance(
                neighbor.value() - state.best.value(),
                temperature,
                rng,
            ) {
                state.current = neighbor;
            }
            #[cfg(feature = "search_assertions")]
            assert_valid_plan(state.current.plan());

            progress.report(temperature, &state.best, &state.current);
        }
        record.current = state.snapshot(&state.current);
        state.ledger.record(record);
        progress.step();
        cooling.update();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::calibration::tests::quick_parameters;
    use crate::construction::{first_fit_plan, VehicleRule};
    use crate::operators::FleetMode;
    use crate::plan::evaluation::compute_statistics;
    use crate::problem::router::DijkstraRouter;
    use crate::utils::create_seeded_rng;
    use crate::utils::test_utilities::{grid_network, single_type_carrier};
    use crate::utils::validator::assert_valid_plan;

    #[test]
    fn homogeneous_calibration_keeps_a_single_vehicle_type() -> anyhow::Result<()> {
        let network = grid_network(3);
        let router = DijkstraRouter::new(&network);
        let carrier = Rc::new(single_type_carrier(
            10,
            &[("s1", 3), ("s2", 4), ("s3", 2), ("s4", 5), ("s5", 3), ("s6", 4), ("s7", 2)],
        ));
        let services = carrier.services().to_vec();

        // reference packs the same services in reverse order
        let mut reversed = services.clone();
        reversed.reverse();
        let mut reference = first_fit_plan(carrier.clone(), &reversed, VehicleRule::Largest)?;
        reference.route_unrouted(&router)?;
        let reference = compute_statistics(&reference, &network)?;

        let mut initial = first_fit_plan(carrier.clone(), &services, VehicleRule::Largest)?;
        initial.route_unrouted(&router)?;

        let calibration = Calibration::new(
            &network,
            &router,
            &reference,
            quick_parameters(FleetMode::Homogeneous),
        );
        let initial_distance = calibration.evaluate_candidate(initial.clone())?.value();
        let result = calibration.run(initial, &mut create_seeded_rng(23))?;

        assert!(result.best_distance.total() <= initial_distance);
        assert!(result.outer_weights.is_none());
        assert!(result.best.plan().is_routed());
        assert_valid_plan(result.best.plan());
        assert!(result
            .best
            .plan()
            .tours()
            .iter()
            .all(|it| it.type_id() == &carrier.vehicle_types()[0].id));
        for record in result.ledger.records().iter().skip(1) {
            assert_eq!(record.inner_temperature, record.outer_temperature);
        }
        Ok(())
    }
}
