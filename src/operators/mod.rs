use enum_map::Enum;
use log::debug;
use rand::Rng;
use serde::Serialize;

use crate::error::Result;
use crate::plan::{ScheduledTour, TourPlan};
use crate::problem::router::Router;
use crate::utils::Random;

pub mod fleet;
pub mod tour;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Enum, Serialize)]
pub enum TourOperator {
    SwapWithinTour,
    SwapBetweenTours,
    MoveToAnotherTour,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Enum, Serialize)]
pub enum FleetOperator {
    AddVehicle,
    ExchangeVehicleType,
    RemoveVehicle,
}

/// Homogeneous variants keep the vehicle type of the first tour and leave rebuilt legs unrouted;
/// heterogeneous variants draw from the whole catalog and route every rebuilt tour immediately.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FleetMode {
    Homogeneous,
    Heterogeneous,
}

#[derive(Clone, Copy)]
pub struct OperatorContext<'a> {
    pub router: &'a dyn Router,
    pub mode: FleetMode,
}

impl<'a> OperatorContext<'a> {
    pub fn new(router: &'a dyn Router, mode: FleetMode) -> Self {
        Self { router, mode }
    }

    pub fn is_homogeneous(&self) -> bool {
        self.mode == FleetMode::Homogeneous
    }

    /// Routes a rebuilt tour unless routing is deferred to the caller.
    pub(crate) fn finish(&self, tour: ScheduledTour) -> Result<ScheduledTour> {
        match self.mode {
            FleetMode::Heterogeneous => Ok(self.router.route(&tour)?),
            FleetMode::Homogeneous => Ok(tour),
        }
    }

    pub(crate) fn finish_always(&self, tour: ScheduledTour) -> Result<ScheduledTour> {
        Ok(self.router.route(&tour)?)
    }
}

pub fn apply_tour_operator(
    op: TourOperator,
    plan: &mut TourPlan,
    rng: &mut Random,
    ctx: &OperatorContext,
) -> Result<bool> {
    match op {
        TourOperator::SwapWithinTour => tour::swap_within_tour(plan, rng, ctx),
        TourOperator::SwapBetweenTours => tour::swap_between_tours(plan, rng, ctx),
        TourOperator::MoveToAnotherTour => tour::move_to_another_tour(plan, rng, ctx),
    }
}

pub fn apply_fleet_operator(
    op: FleetOperator,
    plan: &mut TourPlan,
    rng: &mut Random,
    ctx: &OperatorContext,
) -> Result<bool> {
    match op {
        FleetOperator::AddVehicle => fleet::add_vehicle(plan, rng, ctx),
        FleetOperator::ExchangeVehicleType => fleet::exchange_vehicle_type(plan, rng, ctx),
        FleetOperator::RemoveVehicle => fleet::remove_vehicle(plan, rng, ctx),
    }
}

/// Applies `op` to a copy of `plan`. If the operator finds nothing to do, falls back to
/// another operator: swap-between and move fall back to each other with probability 0.5 and to
/// swap-within otherwise, the second choice falls back to swap-within.
///
/// Returns the operator that produced the neighbor, or `None` if nothing changed.
pub fn tour_neighbor_with_fallback(
    op: TourOperator,
    plan: &TourPlan,
    rng: &mut Random,
    ctx: &OperatorContext,
) -> Result<(TourPlan, Option<TourOperator>)> {
    use TourOperator::*;

    let mut neighbor = plan.clone();
    if apply_tour_operator(op, &mut neighbor, rng, ctx)? {
        return Ok((neighbor, Some(op)));
    }

    let second = match op {
        SwapWithinTour => return Ok((neighbor, None)),
        SwapBetweenTours if rng.gen::<f64>() < 0.5 => MoveToAnotherTour,
        MoveToAnotherTour if rng.gen::<f64>() < 0.5 => SwapBetweenTours,
        _ => SwapWithinTour,
    };
    debug!("{:?} infeasible, falling back to {:?}", op, second);

    let mut neighbor = plan.clone();
    if apply_tour_operator(second, &mut neighbor, rng, ctx)? {
        return Ok((neighbor, Some(second)));
    }
    if second == SwapWithinTour {
        return Ok((neighbor, None));
    }

    debug!("{:?} infeasible, falling back to {:?}", second, SwapWithinTour);
    let mut neighbor = plan.clone();
    let changed = apply_tour_operator(SwapWithinTour, &mut neighbor, rng, ctx)?;
    Ok((neighbor, changed.then_some(SwapWithinTour)))
}

/// Applies `op` to a copy of `plan`. An infeasible removal falls back to adding a vehicle or
/// exchanging a vehicle type (probability 0.5 each), an infeasible exchange to adding or
/// removing; if that second choice fails too, a vehicle is added.
pub fn fleet_neighbor_with_fallback(
    op: FleetOperator,
    plan: &TourPlan,
    rng: &mut Random,
    ctx: &OperatorContext,
) -> Result<(TourPlan, Option<FleetOperator>)> {
    use FleetOperator::*;

    let mut neighbor = plan.clone();
    if apply_fleet_operator(op, &mut neighbor, rng, ctx)? {
        return Ok((neighbor, Some(op)));
    }

    let second = match op {
        AddVehicle => return Ok((neighbor, None)),
        RemoveVehicle | ExchangeVehicleType if rng.gen::<f64>() < 0.5 => AddVehicle,
        RemoveVehicle => ExchangeVehicleType,
        ExchangeVehicleType => RemoveVehicle,
    };
    debug!("{:?} infeasible, falling back to {:?}", op, second);

    let mut neighbor = plan.clone();
    if apply_fleet_operator(second, &mut neighbor, rng, ctx)? {
        return Ok((neighbor, Some(second)));
    }
    if second == AddVehicle {
        return Ok((neighbor, None));
    }

    debug!("{:?} infeasible, falling back to {:?}", second, AddVehicle);
    let mut neighbor = plan.clone();
    let changed = apply_fleet_operator(AddVehicle, &mut neighbor, rng, ctx)?;
    Ok((neighbor, changed.then_some(AddVehicle)))
}
