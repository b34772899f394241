use fixedbitset::FixedBitSet;

use crate::plan::{ScheduledTour, TourPlan};
use crate::problem::{Capacity, ServiceId, VehicleId};

#[derive(Debug, PartialEq)]
pub enum Violation {
    /// load above the vehicle's capacity
    Capacity(VehicleId, Capacity),
    UnknownService(ServiceId),
    DuplicateService(ServiceId),
    MissingServices(usize),
}

#[derive(Debug, PartialEq)]
pub enum ValidatorResult {
    Valid,
    ConstraintViolation(Violation),
}

impl ValidatorResult {
    pub fn is_valid(&self) -> bool {
        match self {
            Self::Valid => true,
            _ => false,
        }
    }

    pub fn assert_valid(&self) {
        match self {
            Self::Valid => {}
            Self::ConstraintViolation(violation) => {
                assert!(false, "{:?}", violation)
            }
        }
    }
}

pub fn validate_tour(scheduled: &ScheduledTour) -> ValidatorResult {
    let load = scheduled.load();
    if load > scheduled.capacity() {
        ValidatorResult::ConstraintViolation(Violation::Capacity(
            scheduled.vehicle.id.clone(),
            load - scheduled.capacity(),
        ))
    } else {
        ValidatorResult::Valid
    }
}

/// Every service of the carrier appears in exactly one tour and no tour exceeds its capacity.
pub fn validate_plan(plan: &TourPlan) -> ValidatorResult {
    use ValidatorResult::*;
    use Violation::*;

    let carrier = plan.carrier();
    let mut visited = FixedBitSet::with_capacity(carrier.services().len());

    for scheduled in plan.tours() {
        if let ConstraintViolation(violation) = validate_tour(scheduled) {
            return ConstraintViolation(violation);
        }
        for service in scheduled.tour.services() {
            let idx = match carrier.service_index(&service.id) {
                Some(idx) => idx,
                None => return ConstraintViolation(UnknownService(service.id.clone())),
            };
            if visited.put(idx) {
                return ConstraintViolation(DuplicateService(service.id.clone()));
            }
        }
    }

    let missing = carrier.services().len() - visited.count_ones(..);
    if missing > 0 {
        ConstraintViolation(MissingServices(missing))
    } else {
        Valid
    }
}

pub fn assert_valid_plan(plan: &TourPlan) {
    validate_plan(plan).assert_valid()
}
