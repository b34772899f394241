use log::{debug, info};

use crate::calibration::acceptance::TemperatureBounds;
use crate::calibration::strategy::StrategyWeights;
use crate::calibration::{uniform_tour_operator, Calibration, Candidate, SearchState, Trial};
use crate::error::Result;
use crate::operators::TourOperator;
use crate::utils::Random;

/// Running best and current plan of a warm-up, collecting the disimprovements.
struct WarmUp {
    best: Candidate,
    current: Candidate,
    disimprovements: Vec<f64>,
}

impl WarmUp {
    fn new(start: &Candidate, trials: usize) -> Self {
        Self {
            best: start.clone(),
            current: start.clone(),
            disimprovements: Vec::with_capacity(trials),
        }
    }

    /// Records the disimprovement if `candidate` is worse than the running best, otherwise makes
    /// it the new best. Either way the walk continues from `candidate`.
    fn observe(&mut self, candidate: Candidate) -> bool {
        let improved = candidate.value() <= self.best.value();
        if improved {
            self.best = candidate.clone();
        } else {
            self.disimprovements.push(candidate.value() - self.best.value());
        }
        self.current = candidate;
        improved
    }

    fn bounds(self, level: &str) -> Result<TemperatureBounds> {
        debug!(
            "{} warm-up: {} disimprovements, best {:.4}",
            level,
            self.disimprovements.len(),
            self.best.value()
        );
        TemperatureBounds::from_disimprovements(&self.disimprovements)
    }
}

/// Calibrates the tour-level temperatures with tour operators only, starting from `start`.
/// Heterogeneous runs select operators by their own roulette wheel, homogeneous runs uniformly.
pub(crate) fn inner_bounds(
    calibration: &Calibration,
    start: &Candidate,
    rng: &mut Random,
) -> Result<TemperatureBounds> {
    let trials = calibration.params().warmup_trials;
    info!("inner warm-up with {} trials", trials);
    let homogeneous = calibration.context().is_homogeneous();
    let mut weights = StrategyWeights::<TourOperator>::new();
    let mut warmup = WarmUp::new(start, trials);

    for _ in 0..trials {
        let op = if homogeneous {
            uniform_tour_operator(rng)
        } else {
            weights.select(rng)
        };
        let Some(Trial { candidate, applied }) =
            calibration.tour_trial(op, warmup.current.plan(), rng)?
        else {
            continue;
        };
        if warmup.observe(candidate) {
            if let Some(applied) = applied {
                weights.reward(applied);
            }
        }
    }
    warmup.bounds("inner")
}

/// Calibrates the fleet-level temperatures: every fleet operator is followed by a full
/// tour-level anneal at `inner`, and the inner best is compared with the running best.
pub(crate) fn outer_bounds(
    calibration: &Calibration,
    start: &Candidate,
    inner: TemperatureBounds,
    rng: &mut Random,
) -> Result<TemperatureBounds> {
    let trials = calibration.params().warmup_trials;
    info!("outer warm-up with {} trials", trials);
    let mut warmup = WarmUp::new(start, trials);
    let mut scratch = SearchState::new(start.clone(), false);

    for _ in 0..trials {
        let op = scratch.outer_weights.select(rng);
        let Some(Trial { candidate, applied }) =
            calibration.fleet_trial(op, warmup.current.plan(), rng)?
        else {
            continue;
        };
        scratch.best = warmup.best.clone();
        let (inner_best, _) = calibration.inner_anneal(
            &mut scratch,
            candidate,
            None,
            inner,
            inner.initial,
            rng,
        )?;
        // the inner anneal may already have moved the running best
        if scratch.best.value() < warmup.best.value() {
            warmup.best = scratch.best.clone();
        }
        if warmup.observe(inner_best) {
            if let Some(applied) = applied {
                scratch.outer_weights.reward(applied);
            }
        }
    }
    warmup.bounds("outer")
}
