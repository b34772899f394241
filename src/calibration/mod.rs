use log::{debug, info, trace, warn};
use rand::Rng;
use took::{Timer, Took};

use crate::calibration::acceptance::{
    AcceptanceCriterion, GeometricCooling, MetropolisCriterion, TemperatureBounds,
};
use crate::calibration::strategy::StrategyWeights;
use crate::error::{CalibrationError, Result};
use crate::ledger::{IterationLedger, IterationRecord};
use crate::operators::{
    apply_tour_operator, fleet, fleet_neighbor_with_fallback, tour_neighbor_with_fallback,
    FleetMode, FleetOperator, OperatorContext, TourOperator,
};
use crate::plan::comparison::{compare, PlanDistance};
use crate::plan::evaluation::{evaluate, EvaluatedPlan, PlanStatistics};
#[cfg(feature = "search_assertions")]
use crate::plan::plans_equal;
use crate::plan::TourPlan;
use crate::problem::network::Network;
use crate::problem::router::Router;
#[cfg(feature = "search_assertions")]
use crate::utils::validator::assert_valid_plan;
use crate::utils::logging::{format_log_evaluated, format_log_plan};
use crate::utils::{AnnealProgress, DefaultProgress, Random};

pub mod acceptance;
pub mod homogeneous;
pub mod strategy;
mod warmup;

#[derive(Clone, Debug)]
pub struct Parameters {
    pub mode: FleetMode,
    pub cooling_factor: f64,
    pub outer_iterations_per_temperature: usize,
    pub inner_iterations_per_temperature: usize,
    /// iterations per temperature of the single-level homogeneous anneal
    pub homogeneous_iterations_per_temperature: usize,
    pub warmup_trials: usize,
    pub distance_tolerance: f64,
    /// a new best plan below this distance ends the fleet-sizing sweep
    pub sweep_tolerance: f64,
    pub fleet_sizing_sweep: bool,
    pub record_ledger: bool,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            mode: FleetMode::Heterogeneous,
            cooling_factor: 0.9,
            outer_iterations_per_temperature: 15,
            inner_iterations_per_temperature: 1,
            homogeneous_iterations_per_temperature: 10,
            warmup_trials: 100,
            distance_tolerance: 0.02,
            sweep_tolerance: 1.0,
            fleet_sizing_sweep: true,
            record_ledger: true,
        }
    }
}

impl Parameters {
    pub fn validate(&self) -> Result<()> {
        if !(self.cooling_factor > 0.0 && self.cooling_factor < 1.0) {
            return Err(CalibrationError::InvalidParameters(format!(
                "cooling factor {} is not in (0, 1)",
                self.cooling_factor
            )));
        }
        if self.warmup_trials == 0 {
            return Err(CalibrationError::InvalidParameters(
                "at least one warm-up trial is required".to_string(),
            ));
        }
        if self.outer_iterations_per_temperature == 0
            || self.inner_iterations_per_temperature == 0
            || self.homogeneous_iterations_per_temperature == 0
        {
            return Err(CalibrationError::InvalidParameters(
                "iterations per temperature must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

pub struct CalibrationResult {
    pub best: EvaluatedPlan,
    pub best_distance: PlanDistance,
    pub final_current: EvaluatedPlan,
    pub ledger: IterationLedger,
    /// `None` in homogeneous mode, which has no fleet level
    pub outer_weights: Option<StrategyWeights<FleetOperator>>,
    /// weight table of the last inner loop
    pub inner_weights: Option<StrategyWeights<TourOperator>>,
    pub number_of_improvements: usize,
    pub iterations: usize,
    pub time: Took,
}

/// An evaluated plan together with its distance to the reference.
#[derive(Clone, Debug)]
pub struct Candidate {
    pub evaluated: EvaluatedPlan,
    pub distance: PlanDistance,
}

impl Candidate {
    pub fn value(&self) -> f64 {
        self.distance.total()
    }

    pub fn plan(&self) -> &TourPlan {
        self.evaluated.plan()
    }
}

/// Neighbor produced by one operator application and the operator credited for it.
pub(crate) struct Trial<K> {
    pub(crate) candidate: Candidate,
    pub(crate) applied: Option<K>,
}

/// Turns a routing failure into a discarded trial, every other error is passed on.
pub(crate) fn discard_routing_failure<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_routing_failure() => {
            warn!("discarding trial: {}", err);
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

/// Mutable state shared by the annealing loops of one run.
pub(crate) struct SearchState {
    pub(crate) best: Candidate,
    pub(crate) current: Candidate,
    pub(crate) outer_weights: StrategyWeights<FleetOperator>,
    pub(crate) inner_weights: Option<StrategyWeights<TourOperator>>,
    pub(crate) ledger: IterationLedger,
    pub(crate) iteration: usize,
    pub(crate) number_of_improvements: usize,
    /// set during the fleet-sizing sweep
    pub(crate) stop_below: Option<f64>,
    pub(crate) stopped: bool,
}

impl SearchState {
    pub(crate) fn new(start: Candidate, record_ledger: bool) -> Self {
        Self {
            best: start.clone(),
            current: start,
            outer_weights: StrategyWeights::new(),
            inner_weights: None,
            ledger: IterationLedger::new(record_ledger),
            iteration: 0,
            number_of_improvements: 0,
            stop_below: None,
            stopped: false,
        }
    }

    pub(crate) fn snapshot(&self, candidate: &Candidate) -> Option<EvaluatedPlan> {
        self.ledger
            .is_enabled()
            .then(|| candidate.evaluated.clone())
    }

    /// Replaces the global best and checks the sweep stopping rule.
    pub(crate) fn improve(&mut self, candidate: Candidate) {
        self.number_of_improvements += 1;
        self.best = candidate;
        if let Some(limit) = self.stop_below {
            if self.best.value() < limit {
                info!("best distance {:.4} below {}, stopping", self.best.value(), limit);
                self.stopped = true;
            }
        }
    }

    fn into_result(self, time: Took) -> CalibrationResult {
        CalibrationResult {
            best_distance: self.best.distance,
            best: self.best.evaluated,
            final_current: self.current.evaluated,
            ledger: self.ledger,
            outer_weights: Some(self.outer_weights),
            inner_weights: self.inner_weights,
            number_of_improvements: self.number_of_improvements,
            iterations: self.iteration,
            time,
        }
    }
}

/// Calibrates a tour plan towards the statistics of a reference plan.
pub struct Calibration<'a> {
    network: &'a dyn Network,
    router: &'a dyn Router,
    reference: &'a PlanStatistics,
    params: Parameters,
}

impl<'a> Calibration<'a> {
    pub fn new(
        network: &'a dyn Network,
        router: &'a dyn Router,
        reference: &'a PlanStatistics,
        params: Parameters,
    ) -> Self {
        Self {
            network,
            router,
            reference,
            params,
        }
    }

    pub fn params(&self) -> &Parameters {
        &self.params
    }

    pub(crate) fn context(&self) -> OperatorContext<'a> {
        OperatorContext::new(self.router, self.params.mode)
    }

    /// Routes pending legs, evaluates the plan and compares it with the reference.
    pub fn evaluate_candidate(&self, mut plan: TourPlan) -> Result<Candidate> {
        plan.route_unrouted(self.router)?;
        let evaluated = evaluate(plan, self.network)?;
        let distance = compare(self.reference, evaluated.statistics())?;
        Ok(Candidate {
            evaluated,
            distance,
        })
    }

    pub(crate) fn tolerance_reached(&self, state: &SearchState) -> bool {
        state.best.value() < self.params.distance_tolerance
    }

    /// Applies a tour operator to a copy of `plan`, with fallbacks in heterogeneous mode, and
    /// evaluates the result after dropping empty tours.
    pub(crate) fn tour_trial(
        &self,
        op: TourOperator,
        plan: &TourPlan,
        rng: &mut Random,
    ) -> Result<Option<Trial<TourOperator>>> {
        let ctx = self.context();
        let neighbor = discard_routing_failure(if ctx.is_homogeneous() {
            let mut neighbor = plan.clone();
            apply_tour_operator(op, &mut neighbor, rng, &ctx)
                .map(|changed| (neighbor, changed.then_some(op)))
        } else {
            tour_neighbor_with_fallback(op, plan, rng, &ctx)
        })?;
        let Some((mut neighbor, applied)) = neighbor else {
            return Ok(None);
        };
        #[cfg(feature = "search_assertions")]
        assert!(applied.is_some() || plans_equal(&neighbor, plan));
        neighbor.remove_empty_tours();
        Ok(discard_routing_failure(self.evaluate_candidate(neighbor))?
            .map(|candidate| Trial { candidate, applied }))
    }

    pub(crate) fn fleet_trial(
        &self,
        op: FleetOperator,
        plan: &TourPlan,
        rng: &mut Random,
    ) -> Result<Option<Trial<FleetOperator>>> {
        let neighbor =
            discard_routing_failure(fleet_neighbor_with_fallback(op, plan, rng, &self.context()))?;
        let Some((neighbor, applied)) = neighbor else {
            return Ok(None);
        };
        #[cfg(feature = "search_assertions")]
        assert!(applied.is_some() || plans_equal(&neighbor, plan));
        Ok(discard_routing_failure(self.evaluate_candidate(neighbor))?
            .map(|candidate| Trial { candidate, applied }))
    }

    pub fn run(&self, initial: TourPlan, rng: &mut Random) -> Result<CalibrationResult> {
        self.params.validate()?;
        let timer = Timer::new();
        let initial_tours = initial.number_of_tours();
        let start = self.evaluate_candidate(initial)?;
        info!(
            "initial plan {}: {}",
            format_log_plan(start.plan()),
            format_log_evaluated(&start.evaluated, start.value())
        );

        let mut state = SearchState::new(start, self.params.record_ledger);
        let mut record = IterationRecord::new(0, 0.0, 0.0);
        record.current = state.snapshot(&state.current);
        record.best = state.snapshot(&state.best);
        state.ledger.record(record);

        if self.tolerance_reached(&state) {
            info!(
                "initial plan within tolerance ({:.4} < {})",
                state.best.value(),
                self.params.distance_tolerance
            );
        } else {
            match self.params.mode {
                FleetMode::Heterogeneous => self.run_nested(&mut state, initial_tours, rng)?,
                FleetMode::Homogeneous => homogeneous::run(self, &mut state, initial_tours, rng)?,
            }
        }

        let mut result = state.into_result(timer.took());
        if self.params.mode == FleetMode::Homogeneous {
            result.outer_weights = None;
        }
        self.log_summary(&result);
        Ok(result)
    }

    fn log_summary(&self, result: &CalibrationResult) {
        info!(
            "best plan {}: {} after {} iterations ({} improvements), took: {}",
            format_log_plan(result.best.plan()),
            format_log_evaluated(&result.best, result.best_distance.total()),
            result.iterations,
            result.number_of_improvements,
            result.time
        );
    }

    fn run_nested(
        &self,
        state: &mut SearchState,
        initial_tours: usize,
        rng: &mut Random,
    ) -> Result<()> {
        let inner_bounds = warmup::inner_bounds(self, &state.current, rng)?;
        info!(
            "inner temperatures: {:.6} -> {:.6}",
            inner_bounds.initial, inner_bounds.end
        );
        let outer_bounds = warmup::outer_bounds(self, &state.current, inner_bounds, rng)?;
        info!(
            "outer temperatures: {:.6} -> {:.6}",
            outer_bounds.initial, outer_bounds.end
        );

        self.nested_anneal(state, inner_bounds, outer_bounds, rng)?;
        self.fleet_sizing_sweep(state, initial_tours, rng, |state, rng| {
            self.nested_anneal(state, inner_bounds, outer_bounds, rng)
        })?;
        Ok(())
    }

    /// Runs up to `initial_tours` rounds, each adding a vehicle to the current plan and
    /// annealing again from there. A new best below the sweep tolerance ends the sweep.
    /// Returns the number of rounds that were annealed.
    pub(crate) fn fleet_sizing_sweep<F>(
        &self,
        state: &mut SearchState,
        initial_tours: usize,
        rng: &mut Random,
        mut anneal: F,
    ) -> Result<usize>
    where
        F: FnMut(&mut SearchState, &mut Random) -> Result<()>,
    {
        if !self.params.fleet_sizing_sweep || self.tolerance_reached(state) {
            return Ok(0);
        }
        state.stop_below = Some(self.params.sweep_tolerance);
        let mut rounds = 0;
        for round in 0..initial_tours {
            if state.stopped || self.tolerance_reached(state) {
                break;
            }
            let mut plan = state.current.plan().clone();
            match discard_routing_failure(fleet::add_vehicle(&mut plan, rng, &self.context()))? {
                Some(true) => {}
                Some(false) => {
                    info!("sweep: no further vehicle can be added");
                    break;
                }
                None => continue,
            }
            plan.remove_empty_tours();
            let Some(candidate) = discard_routing_failure(self.evaluate_candidate(plan))? else {
                continue;
            };
            info!(
                "sweep round {}: {} tours, distance {:.4}",
                round + 1,
                candidate.plan().number_of_tours(),
                candidate.value()
            );
            state.current = candidate;
            anneal(state, rng)?;
            rounds += 1;
        }
        debug!("sweep finished after {} rounds", rounds);
        Ok(rounds)
    }

    /// Fleet-level anneal with a full tour-level anneal after every fleet operator.
    fn nested_anneal(
        &self,
        state: &mut SearchState,
        inner_bounds: TemperatureBounds,
        outer_bounds: TemperatureBounds,
        rng: &mut Random,
    ) -> Result<()> {
        let mut outer = GeometricCooling::new(
            outer_bounds,
            self.params.cooling_factor,
            self.params.outer_iterations_per_temperature,
        );
        let mut progress = DefaultProgress::with_length(outer.expected_iterations());

        while outer.is_active() && !self.tolerance_reached(state) && !state.stopped {
            let t_outer = outer.get_current_temperature();
            let op = state.outer_weights.select(rng);
            if let Some(trial) = self.fleet_trial(op, state.current.plan(), rng)? {
                trace!("{:?} -> {:.4}", op, trial.candidate.value());
                let (inner_best, t_inner) = self.inner_anneal(
                    state,
                    trial.candidate,
                    trial.applied,
                    inner_bounds,
                    t_outer,
                    rng,
                )?;

                if inner_best.value() <= state.best.value() {
                    state.best = inner_best.clone();
                    state.current = inner_best;
                } else if MetropolisCriterion.check_acceptance(
                    inner_best.value() - state.best.value(),
                    t_inner,
                    rng,
                ) {
                    debug!(
                        "accepted inner best {:.4} at {:.6}",
                        inner_best.value(),
                        t_inner
                    );
                    state.current = inner_best;
                }
                #[cfg(feature = "search_assertions")]
                assert_valid_plan(state.current.plan());

                progress.report(t_outer, &state.best, &state.current);
            }
            progress.step();
            outer.update();
        }
        Ok(())
    }

    /// Tour-level anneal starting from `start`. Returns the best plan of this loop and the
    /// inner temperature it ended at.
    pub(crate) fn inner_anneal(
        &self,
        state: &mut SearchState,
        start: Candidate,
        outer_op: Option<FleetOperator>,
        bounds: TemperatureBounds,
        t_outer: f64,
        rng: &mut Random,
    ) -> Result<(Candidate, f64)> {
        let mut cooling = GeometricCooling::new(
            bounds,
            self.params.cooling_factor,
            self.params.inner_iterations_per_temperature,
        );
        let mut weights = StrategyWeights::<TourOperator>::new();
        let mut inner_best = start.clone();
        let mut inner_current = start;

        while cooling.is_active() && !state.stopped {
            let t_inner = cooling.get_current_temperature();
            state.iteration += 1;
            let mut record = IterationRecord::new(state.iteration, t_inner, t_outer);

            let op = weights.select(rng);
            if let Some(Trial {
                            candidate: neighbor,
                            applied,
                        }) = self.tour_trial(op, inner_current.plan(), rng)?
            {
                trace!("{:?} -> {:.4}", op, neighbor.value());
                record.neighbor = state.snapshot(&neighbor);

                if neighbor.value() <= state.best.value() {
                    debug!(
                        "new best {}",
                        format_log_evaluated(&neighbor.evaluated, neighbor.value())
                    );
                    if let Some(outer_op) = outer_op {
                        state.outer_weights.reward(outer_op);
                    }
                    if let Some(applied) = applied {
                        weights.reward(applied);
                    }
                    record.best = state.snapshot(&neighbor);
                    inner_best = neighbor.clone();
                    inner_current = neighbor.clone();
                    state.current = neighbor.clone();
                    state.improve(neighbor);
                } else if neighbor.value() <= inner_best.value() {
                    if let Some(applied) = applied {
                        weights.reward(applied);
                    }
                    inner_best = neighbor.clone();
                    inner_current = neighbor;
                } else if MetropolisCriterion.check_acceptance(
                    neighbor.value() - state.best.value(),
                    t_inner,
                    rng,
                ) {
                    inner_current = neighbor;
                }
            }
            record.current = state.snapshot(&inner_current);
            state.ledger.record(record);
            cooling.update();
        }

        state.inner_weights = Some(weights);
        Ok((inner_best, cooling.get_current_temperature()))
    }
}

/// Picks one of the tour operators with equal probability.
pub(crate) fn uniform_tour_operator(rng: &mut Random) -> TourOperator {
    use enum_map::Enum;
    TourOperator::from_usize(rng.gen_range(0..TourOperator::LENGTH))
}
