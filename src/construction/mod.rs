use std::rc::Rc;

use fixedbitset::FixedBitSet;

use crate::error::{CalibrationError, Result};
use crate::plan::{ScheduledTour, TourPlan};
use crate::problem::{Carrier, Service, ServiceId, VehicleType, VehicleTypeId};
#[cfg(feature = "search_assertions")]
use crate::utils::validator::assert_valid_plan;

/// Vehicle type used for each tour opened by [`first_fit_plan`].
#[derive(Clone, Debug, PartialEq)]
pub enum VehicleRule {
    Smallest,
    Largest,
    Type(VehicleTypeId),
}

impl VehicleRule {
    fn choose<'a>(&self, carrier: &'a Carrier) -> Result<&'a VehicleType> {
        let types = carrier.vehicle_types().iter();
        match self {
            VehicleRule::Smallest => types.min_by_key(|it| it.capacity),
            VehicleRule::Largest => types.max_by_key(|it| it.capacity),
            VehicleRule::Type(id) => carrier.vehicle_type(id),
        }
        .ok_or_else(|| {
            CalibrationError::InvalidTour(format!(
                "carrier {} has no vehicle type for {:?}",
                carrier.id, self
            ))
        })
    }
}

/// Packs `services` in the given order into tours, opening a new tour whenever the next
/// service exceeds the remaining capacity of the open one. Legs are left unrouted.
pub fn first_fit_plan(
    carrier: Rc<Carrier>,
    services: &[Service],
    rule: VehicleRule,
) -> Result<TourPlan> {
    let vehicle_type = rule.choose(&carrier)?.clone();
    let mut bins: Vec<Vec<Service>> = vec![];
    let mut load = 0;
    for service in services {
        if service.capacity_demand > vehicle_type.capacity {
            return Err(CalibrationError::InvalidTour(format!(
                "service {} with demand {} exceeds capacity {} of {}",
                service.id, service.capacity_demand, vehicle_type.capacity, vehicle_type.id
            )));
        }
        match bins.last_mut() {
            Some(bin) if load + service.capacity_demand <= vehicle_type.capacity => {
                bin.push(service.clone());
                load += service.capacity_demand;
            }
            _ => {
                bins.push(vec![service.clone()]);
                load = service.capacity_demand;
            }
        }
    }

    let mut plan = TourPlan::new(carrier.clone(), vec![]);
    for bin in bins {
        let vehicle = plan.create_vehicle(&vehicle_type, carrier.depot.clone());
        plan.tours_mut().push(ScheduledTour::with_services(vehicle, bin));
    }

    #[cfg(feature = "search_assertions")]
    assert_valid_plan(&plan);
    Ok(plan)
}

/// Builds a plan from explicit tours, each a vehicle type and a service sequence. Every service
/// of the carrier must be assigned exactly once and no tour may exceed its capacity.
pub fn plan_from_assignment(
    carrier: Rc<Carrier>,
    assignment: &[(VehicleTypeId, Vec<ServiceId>)],
) -> Result<TourPlan> {
    let mut assigned = FixedBitSet::with_capacity(carrier.services().len());
    let mut plan = TourPlan::new(carrier.clone(), vec![]);

    for (type_id, service_ids) in assignment {
        let vehicle_type = carrier.vehicle_type(type_id).ok_or_else(|| {
            CalibrationError::InvalidTour(format!("unknown vehicle type {}", type_id))
        })?;
        let mut services = Vec::with_capacity(service_ids.len());
        for id in service_ids {
            let idx = carrier
                .service_index(id)
                .ok_or_else(|| CalibrationError::InvalidTour(format!("unknown service {}", id)))?;
            if assigned.put(idx) {
                return Err(CalibrationError::InvalidTour(format!(
                    "service {} is assigned twice",
                    id
                )));
            }
            services.push(carrier.services()[idx].clone());
        }
        let load: u32 = services.iter().map(|it| it.capacity_demand).sum();
        if load > vehicle_type.capacity {
            return Err(CalibrationError::InvalidTour(format!(
                "load {} exceeds capacity {} of {}",
                load, vehicle_type.capacity, vehicle_type.id
            )));
        }
        let vehicle = plan.create_vehicle(vehicle_type, carrier.depot.clone());
        plan.tours_mut()
            .push(ScheduledTour::with_services(vehicle, services));
    }

    let missing = carrier.services().len() - assigned.count_ones(..);
    if missing > 0 {
        return Err(CalibrationError::InvalidTour(format!(
            "{} services are not assigned to any tour",
            missing
        )));
    }
    plan.remove_empty_tours();
    Ok(plan)
}
