use clap::{Parser, ValueEnum};

use crate::calibration::Parameters;
use crate::operators::FleetMode;

#[derive(Parser, Debug)]
#[command(version)]
pub struct ProgramArguments {
    #[arg(long, help = "rng seed")]
    pub seed: Option<i128>,

    #[arg(short, long, help = "instance file path (TOML)")]
    pub instance: String,

    #[arg(short, long, help = "file to store the best plan (JSON)")]
    pub solution: Option<String>,

    #[arg(long, help = "file to store the iteration ledger summary (JSON)")]
    pub ledger: Option<String>,

    #[command(flatten)]
    pub calibration: CalibrationArguments,

    #[arg(long, help = "print summary to stdout", default_value = "false")]
    pub print_summary_to_stdout: bool,
}

#[derive(Clone, ValueEnum, Debug)]
pub enum Mode {
    Homogeneous,
    Heterogeneous,
}

#[derive(clap::Args, Debug)]
pub struct CalibrationArguments {
    #[arg(long, value_enum, default_value = "heterogeneous")]
    pub mode: Mode,
    #[arg(long, default_value = "0.9")]
    pub cooling_factor: f64,
    #[arg(long, default_value = "15")]
    pub outer_iterations_per_temperature: usize,
    #[arg(long, default_value = "1")]
    pub inner_iterations_per_temperature: usize,
    #[arg(
        long,
        default_value = "10",
        help = "iterations per temperature of the single-level homogeneous anneal"
    )]
    pub homogeneous_iterations_per_temperature: usize,
    #[arg(long, default_value = "100")]
    pub warmup_trials: usize,
    #[arg(
        long,
        default_value = "0.02",
        help = "stop once the best plan is closer to the reference than this"
    )]
    pub distance_tolerance: f64,
    #[arg(
        long,
        default_value = "1.0",
        help = "a new best plan below this distance ends the fleet-sizing sweep"
    )]
    pub sweep_tolerance: f64,
    #[arg(long, default_value = "false")]
    pub disable_fleet_sizing_sweep: bool,
    #[arg(long, default_value = "false")]
    pub disable_ledger: bool,
}

impl CalibrationArguments {
    pub(crate) fn fleet_mode(&self) -> FleetMode {
        match self.mode {
            Mode::Homogeneous => FleetMode::Homogeneous,
            Mode::Heterogeneous => FleetMode::Heterogeneous,
        }
    }

    pub(crate) fn to_parameters(&self) -> Parameters {
        Parameters {
            mode: self.fleet_mode(),
            cooling_factor: self.cooling_factor,
            outer_iterations_per_temperature: self.outer_iterations_per_temperature,
            inner_iterations_per_temperature: self.inner_iterations_per_temperature,
            homogeneous_iterations_per_temperature: self.homogeneous_iterations_per_temperature,
            warmup_trials: self.warmup_trials,
            distance_tolerance: self.distance_tolerance,
            sweep_tolerance: self.sweep_tolerance,
            fleet_sizing_sweep: !self.disable_fleet_sizing_sweep,
            record_ledger: !self.disable_ledger,
        }
    }
}
