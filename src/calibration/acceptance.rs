use rand::Rng;

use crate::error::{CalibrationError, Result};
use crate::utils::Random;

/// Acceptance probability of the first warm-up trial at the initial temperature.
pub const INITIAL_ACCEPTANCE_PROBABILITY: f64 = 0.8;
/// Acceptance probability of an average disimprovement at the final temperature.
pub const FINAL_ACCEPTANCE_PROBABILITY: f64 = 0.01;

pub trait AcceptanceCriterion {
    fn check_acceptance(&self, delta: f64, temperature: f64, rng: &mut Random) -> bool;
}

/// Accepts every non-worsening candidate and a worse one with probability `exp(-delta / T)`.
#[derive(Clone, Copy, Debug, Default)]
pub struct MetropolisCriterion;

impl AcceptanceCriterion for MetropolisCriterion {
    fn check_acceptance(&self, delta: f64, temperature: f64, rng: &mut Random) -> bool {
        if delta <= 0.0 {
            return true;
        }
        rng.gen::<f64>() < (-delta / temperature).exp()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TemperatureBounds {
    pub initial: f64,
    pub end: f64,
}

impl TemperatureBounds {
    /// Bounds at which the average observed disimprovement is accepted with probability 0.8
    /// at the start and 0.01 at the end.
    pub fn from_average_disimprovement(average: f64) -> Result<Self> {
        if !(average > 0.0) || !average.is_finite() {
            return Err(CalibrationError::DegenerateMetric(format!(
                "average disimprovement {} cannot calibrate the temperature",
                average
            )));
        }
        Ok(Self {
            initial: -average / INITIAL_ACCEPTANCE_PROBABILITY.ln(),
            end: -average / FINAL_ACCEPTANCE_PROBABILITY.ln(),
        })
    }

    pub fn from_disimprovements(disimprovements: &[f64]) -> Result<Self> {
        if disimprovements.is_empty() {
            return Err(CalibrationError::DegenerateMetric(
                "no disimprovement observed during warm-up".to_string(),
            ));
        }
        Self::from_average_disimprovement(
            disimprovements.iter().sum::<f64>() / disimprovements.len() as f64,
        )
    }
}

/// Geometric cooling `T <- alpha * T` after every `iterations_per_temperature` steps.
#[derive(Clone, Debug)]
pub struct GeometricCooling {
    bounds: TemperatureBounds,
    current_temperature: f64,
    cooling_factor: f64,
    iterations_per_temperature: usize,
    iterations_at_current_temperature: usize,
}

impl GeometricCooling {
    pub fn new(bounds: TemperatureBounds, cooling_factor: f64, iterations_per_temperature: usize) -> Self {
        Self {
            bounds,
            current_temperature: bounds.initial,
            cooling_factor,
            iterations_per_temperature: iterations_per_temperature.max(1),
            iterations_at_current_temperature: 0,
        }
    }

    pub fn get_current_temperature(&self) -> f64 {
        self.current_temperature
    }

    pub fn is_active(&self) -> bool {
        self.current_temperature > self.bounds.end
    }

    /// Registers one iteration at the current temperature.
    pub fn update(&mut self) {
        self.iterations_at_current_temperature += 1;
        if self.iterations_at_current_temperature == self.iterations_per_temperature {
            self.iterations_at_current_temperature = 0;
            self.current_temperature *= self.cooling_factor;
        }
    }

    /// Number of iterations until the end temperature is reached, used to size progress bars.
    pub fn expected_iterations(&self) -> u64 {
        let ratio = self.bounds.end / self.bounds.initial;
        if !(ratio > 0.0 && ratio < 1.0) || !(self.cooling_factor > 0.0 && self.cooling_factor < 1.0) {
            return 0;
        }
        (ratio.ln() / self.cooling_factor.ln()).ceil() as u64 * self.iterations_per_temperature as u64
    }
}
