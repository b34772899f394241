//! Fleet-level neighborhoods: vehicles are added, removed, or change type.

use itertools::Itertools;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::Result;
use crate::operators::OperatorContext;
use crate::plan::{ScheduledTour, TourPlan};
use crate::problem::{Capacity, Service};
use crate::utils::Random;

/// Opens a new tour that takes services from the existing ones. Every tour with at least two
/// services gives up each service with probability `target / tours`, as long as the new
/// vehicle can still load it; `target` is the mean number of stops the fleet would have with
/// one more vehicle.
pub fn add_vehicle(plan: &mut TourPlan, rng: &mut Random, ctx: &OperatorContext) -> Result<bool> {
    let (vehicle_type, depot) = match plan.tours().first() {
        Some(first) => {
            let vehicle_type = if ctx.is_homogeneous() {
                first.vehicle.vehicle_type.clone()
            } else {
                match plan.carrier().vehicle_types().choose(rng) {
                    Some(it) => it.clone(),
                    None => return Ok(false),
                }
            };
            (vehicle_type, first.vehicle.depot.clone())
        }
        None => return Ok(false),
    };

    let tours = plan.number_of_tours() as f64;
    let mean_stops = plan.number_of_services() as f64 / tours;
    let target = (mean_stops * tours / (tours + 1.0)).floor();
    let probability = target / tours;

    let mut remaining = vehicle_type.capacity;
    let mut siphoned: Vec<Service> = vec![];
    let mut donors: Vec<(usize, Vec<Service>)> = vec![];

    for (idx, scheduled) in plan.tours().iter().enumerate() {
        if scheduled.tour.number_of_services() < 2 {
            continue;
        }
        let mut kept = vec![];
        let mut changed = false;
        for service in scheduled.tour.services() {
            if rng.gen::<f64>() < probability && service.capacity_demand <= remaining {
                remaining -= service.capacity_demand;
                siphoned.push(service.clone());
                changed = true;
            } else {
                kept.push(service.clone());
            }
        }
        if changed {
            donors.push((idx, kept));
        }
    }

    if siphoned.is_empty() {
        return Ok(false);
    }

    for (idx, kept) in donors {
        let rebuilt = plan.tours()[idx].rebuilt_with(kept);
        plan.tours_mut()[idx] = ctx.finish(rebuilt)?;
    }
    let vehicle = plan.create_vehicle(&vehicle_type, depot);
    let tour = ctx.finish(ScheduledTour::with_services(vehicle, siphoned))?;
    plan.tours_mut().push(tour);
    Ok(true)
}

/// Replaces the vehicle of one tour by a vehicle of another type that still has spare capacity
/// for the tour's load.
pub fn exchange_vehicle_type(
    plan: &mut TourPlan,
    rng: &mut Random,
    ctx: &OperatorContext,
) -> Result<bool> {
    let carrier = plan.carrier().clone();
    let candidates = plan
        .tours()
        .iter()
        .enumerate()
        .cartesian_product(carrier.vehicle_types())
        .filter(|((_, scheduled), vehicle_type)| {
            &vehicle_type.id != scheduled.type_id() && scheduled.load() < vehicle_type.capacity
        })
        .map(|((idx, _), vehicle_type)| (idx, vehicle_type))
        .collect_vec();

    let &(idx, vehicle_type) = match candidates.choose(rng) {
        Some(it) => it,
        None => return Ok(false),
    };

    let depot = plan.tours()[idx].vehicle.depot.clone();
    let vehicle = plan.create_vehicle(vehicle_type, depot);
    let services = plan.tours()[idx].tour.service_sequence();
    let rebuilt = ScheduledTour::with_services(vehicle, services);
    plan.tours_mut()[idx] = ctx.finish_always(rebuilt)?;
    Ok(true)
}

/// Places the services of `removed` into the other tours, largest demand first, each into the
/// tour with the least remaining capacity that still fits it. `None` if a service fits nowhere.
fn redistribute(plan: &TourPlan, removed: usize) -> Option<Vec<(usize, Service)>> {
    let mut hosts: Vec<(usize, Capacity)> = plan
        .tours()
        .iter()
        .enumerate()
        .filter(|(idx, _)| *idx != removed)
        .map(|(idx, it)| (idx, it.remaining_capacity()))
        .collect();

    let services = plan.tours()[removed]
        .tour
        .services()
        .cloned()
        .sorted_by(|a, b| b.capacity_demand.cmp(&a.capacity_demand));

    let mut assignment = vec![];
    for service in services {
        hosts.sort_by_key(|(_, remaining)| *remaining);
        let host = hosts
            .iter_mut()
            .find(|(_, remaining)| *remaining >= service.capacity_demand)?;
        host.1 -= service.capacity_demand;
        assignment.push((host.0, service));
    }
    Some(assignment)
}

/// Dissolves one tour whose services all fit into the remaining tours. Candidates are checked in
/// order of increasing load and one feasible candidate is chosen at random.
pub fn remove_vehicle(plan: &mut TourPlan, rng: &mut Random, ctx: &OperatorContext) -> Result<bool> {
    if plan.number_of_tours() < 2 {
        return Ok(false);
    }

    let feasible = plan
        .tours()
        .iter()
        .enumerate()
        .sorted_by_key(|(_, it)| it.load())
        .filter(|(_, it)| !it.tour.is_empty())
        .filter_map(|(idx, _)| redistribute(plan, idx).map(|assignment| (idx, assignment)))
        .collect_vec();

    let (removed, assignment) = match feasible.choose(rng) {
        Some(it) => it.clone(),
        None => return Ok(false),
    };

    let mut appended: Vec<(usize, Vec<Service>)> = vec![];
    for (host, service) in assignment {
        match appended.iter_mut().find(|(idx, _)| *idx == host) {
            Some((_, services)) => services.push(service),
            None => appended.push((host, vec![service])),
        }
    }
    for (host, services) in appended {
        let sequence = plan.tours()[host]
            .tour
            .services()
            .cloned()
            .chain(services)
            .collect_vec();
        let rebuilt = plan.tours()[host].rebuilt_with(sequence);
        plan.tours_mut()[host] = ctx.finish(rebuilt)?;
    }
    plan.tours_mut().remove(removed);
    Ok(true)
}
