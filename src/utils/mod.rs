#[cfg(feature = "progressbar")]
use std::io::Stdout;

use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;

use crate::calibration::Candidate;

pub mod logging;
pub mod validator;

#[cfg(test)]
pub mod test_utilities;

pub type Random = Pcg64Mcg;

pub fn create_seeded_rng(seed: i128) -> Random {
    let mut rng = Pcg64Mcg::from_seed(seed.to_le_bytes());
    // discard the first three
    rng.next_u64();
    rng.next_u64();
    rng.next_u64();
    rng
}

/// Reports the state of an annealing loop once per temperature step.
pub trait AnnealProgress {
    fn report(&mut self, temperature: f64, best: &Candidate, current: &Candidate);
    fn step(&mut self);
}

pub struct SilentProgress;

impl SilentProgress {
    pub fn with_length(_steps: u64) -> Self {
        SilentProgress
    }
}

impl AnnealProgress for SilentProgress {
    fn report(&mut self, _: f64, _: &Candidate, _: &Candidate) {}
    fn step(&mut self) {}
}

#[cfg(feature = "progressbar")]
pub struct BarProgress {
    bar: pbr::ProgressBar<Stdout>,
}

#[cfg(feature = "progressbar")]
impl BarProgress {
    pub fn with_length(steps: u64) -> Self {
        let mut bar = pbr::ProgressBar::new(steps);
        bar.show_speed = false;
        Self { bar }
    }
}

#[cfg(feature = "progressbar")]
impl Drop for BarProgress {
    fn drop(&mut self) {
        self.bar.finish_println("");
    }
}

#[cfg(feature = "progressbar")]
impl AnnealProgress for BarProgress {
    fn report(&mut self, temperature: f64, best: &Candidate, current: &Candidate) {
        let text = format!(
            "T={temperature:.4} best {:.4} ({} tours) current {:.4} ({} tours) | ",
            best.value(),
            best.plan().number_of_tours(),
            current.value(),
            current.plan().number_of_tours(),
        );
        self.bar.message(&text);
    }

    fn step(&mut self) {
        self.bar.inc();
    }
}

#[cfg(feature = "progressbar")]
pub type DefaultProgress = BarProgress;

#[cfg(not(feature = "progressbar"))]
pub type DefaultProgress = SilentProgress;
