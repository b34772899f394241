#![allow(dead_code)]

use clap::{CommandFactory, FromArgMatches};
use log::info;
use os_str_bytes::OsStrBytesExt;
use rand::random;
use took::Timer;

use crate::calibration::Calibration;
use crate::io::load_instance;
use crate::io::result_writer::{write_ledger_file, write_result_file};
use crate::plan::evaluation::compute_statistics;
use crate::problem::router::DijkstraRouter;
use crate::utils::create_seeded_rng;
use crate::utils::logging::format_log_plan;
#[cfg(feature = "search_assertions")]
use crate::utils::validator::assert_valid_plan;

mod calibration;
mod cli;
mod construction;
mod error;
mod io;
mod ledger;
mod operators;
mod plan;
mod problem;
mod utils;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = argfile::expand_args_from(
        std::env::args_os(),
        argfile::parse_fromfile,
        argfile::PREFIX,
    )?;
    let args = cli::ProgramArguments::from_arg_matches(
        &cli::ProgramArguments::command()
            .get_matches_from(args.iter().flat_map(|it| {
                it.split(" ").into_iter().collect::<Vec<_>>()
            }))
    )?;
    info!("{:?}", &args);

    let (seed_value, mut rng) = {
        let seed_value = args.seed.unwrap_or_else(|| random::<i128>().abs());
        info!("seed: {}", seed_value);
        (seed_value, create_seeded_rng(seed_value))
    };

    let load_timer = Timer::new();
    let instance = load_instance(&args.instance)?;
    let router = DijkstraRouter::new(&instance.network);

    let mut reference_plan = instance.reference_plan;
    reference_plan.route_unrouted(&router)?;
    let reference = compute_statistics(&reference_plan, &instance.network)?;
    info!(
        "reference plan {} loaded after {}",
        format_log_plan(&reference_plan),
        load_timer.took()
    );

    let params = args.calibration.to_parameters();
    let calibration = Calibration::new(&instance.network, &router, &reference, params);

    info!("starting calibration");
    let res = calibration.run(instance.initial_plan, &mut rng)?;

    info!("finished after {}", res.time);
    info!(
        "best plan found: {} with distance {:.4}",
        format_log_plan(res.best.plan()),
        res.best_distance.total()
    );

    #[cfg(feature = "search_assertions")]
    assert_valid_plan(res.best.plan());

    if args.print_summary_to_stdout {
        println!(
            "{},{},{},{}",
            res.best_distance.total(),
            res.best.plan().number_of_tours(),
            res.best.statistics().overall_length,
            res.time.as_std().as_secs()
        );
    }

    if let Some(solution_path) = args.solution {
        write_result_file(solution_path, &instance.name, seed_value, &reference, &res)?;
    }

    if let Some(ledger_path) = args.ledger {
        let rows = res.ledger.summarize(&reference)?;
        write_ledger_file(ledger_path, &rows)?;
    }

    Ok(())
}
