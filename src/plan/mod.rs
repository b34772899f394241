use std::rc::Rc;

#[cfg(test)]
use crate::error::{CalibrationError, Result};
use crate::error::RoutingFailure;
use crate::problem::router::Router;
#[cfg(test)]
use crate::problem::ServiceId;
use crate::problem::{Capacity, Carrier, LinkId, Service, Vehicle, VehicleId, VehicleType, VehicleTypeId};

pub mod comparison;
pub mod evaluation;

#[derive(Clone, Debug, PartialEq)]
pub struct Route {
    pub links: Vec<LinkId>,
    pub travel_time: f64,
}

/// Connection between two consecutive stops. `route` is `None` until a router filled it in.
#[derive(Clone, Debug, PartialEq)]
pub struct Leg {
    pub route: Option<Route>,
    pub departure_time: f64,
}

impl Leg {
    pub fn unrouted() -> Self {
        Self {
            route: None,
            departure_time: 0.0,
        }
    }

    pub fn is_routed(&self) -> bool {
        self.route.is_some()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ServiceActivity {
    pub service: Service,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TourElement {
    Start(LinkId),
    Leg(Leg),
    Service(ServiceActivity),
    End(LinkId),
}

/// `Start, Leg, (Service, Leg)*, End`
#[derive(Clone, Debug, PartialEq)]
pub struct Tour {
    elements: Vec<TourElement>,
}

impl Tour {
    pub fn from_services<I>(start: LinkId, services: I, end: LinkId) -> Self
        where
            I: IntoIterator<Item=Service>,
    {
        let mut elements = vec![TourElement::Start(start), TourElement::Leg(Leg::unrouted())];
        for service in services {
            elements.push(TourElement::Service(ServiceActivity { service }));
            elements.push(TourElement::Leg(Leg::unrouted()));
        }
        elements.push(TourElement::End(end));
        Self { elements }
    }

    #[cfg(test)]
    pub fn from_elements(elements: Vec<TourElement>) -> Result<Self> {
        if elements.len() < 3 || elements.len() % 2 == 0 {
            return Err(CalibrationError::InvalidTour(format!(
                "unexpected number of elements {}",
                elements.len()
            )));
        }
        let last = elements.len() - 1;
        for (idx, element) in elements.iter().enumerate() {
            let ok = match element {
                TourElement::Start(_) => idx == 0,
                TourElement::End(_) => idx == last,
                TourElement::Leg(_) => idx % 2 == 1,
                TourElement::Service(_) => idx % 2 == 0 && idx != 0 && idx != last,
            };
            if !ok {
                return Err(CalibrationError::InvalidTour(format!(
                    "unexpected element at position {}",
                    idx
                )));
            }
        }
        Ok(Self { elements })
    }

    pub fn elements(&self) -> &[TourElement] {
        &self.elements
    }

    pub fn start_link(&self) -> &LinkId {
        match &self.elements[0] {
            TourElement::Start(link) => link,
            _ => unreachable!("tour does not begin with a start element"),
        }
    }

    pub fn end_link(&self) -> &LinkId {
        match &self.elements[self.elements.len() - 1] {
            TourElement::End(link) => link,
            _ => unreachable!("tour does not finish with an end element"),
        }
    }

    pub fn services(&self) -> impl Iterator<Item=&Service> {
        self.elements.iter().filter_map(|it| match it {
            TourElement::Service(activity) => Some(&activity.service),
            _ => None,
        })
    }

    pub fn legs(&self) -> impl Iterator<Item=&Leg> {
        self.elements.iter().filter_map(|it| match it {
            TourElement::Leg(leg) => Some(leg),
            _ => None,
        })
    }

    pub(crate) fn legs_mut(&mut self) -> impl Iterator<Item=&mut Leg> {
        self.elements.iter_mut().filter_map(|it| match it {
            TourElement::Leg(leg) => Some(leg),
            _ => None,
        })
    }

    pub fn service_sequence(&self) -> Vec<Service> {
        self.services().cloned().collect()
    }

    pub fn number_of_services(&self) -> usize {
        (self.elements.len() - 3) / 2
    }

    pub fn load(&self) -> Capacity {
        self.services().map(|it| it.capacity_demand).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.number_of_services() == 0
    }

    pub fn is_routed(&self) -> bool {
        self.legs().all(Leg::is_routed)
    }
}

/// Same number of elements and the same service at every position.
#[cfg(any(test, feature = "search_assertions"))]
pub fn tours_equal(a: &Tour, b: &Tour) -> bool {
    a.elements.len() == b.elements.len()
        && a.elements.iter().zip(b.elements.iter()).all(|pair| match pair {
        (TourElement::Service(x), TourElement::Service(y)) => x.service.id == y.service.id,
        (TourElement::Service(_), _) | (_, TourElement::Service(_)) => false,
        _ => true,
    })
}

#[derive(Clone, Debug, PartialEq)]
pub struct ScheduledTour {
    pub tour: Tour,
    pub vehicle: Vehicle,
    pub departure: f64,
}

impl ScheduledTour {
    pub fn new(tour: Tour, vehicle: Vehicle) -> Self {
        let departure = vehicle.earliest_start;
        Self {
            tour,
            vehicle,
            departure,
        }
    }

    /// Unrouted depot-to-depot tour serving `services` in the given order.
    pub fn with_services<I>(vehicle: Vehicle, services: I) -> Self
        where
            I: IntoIterator<Item=Service>,
    {
        let tour = Tour::from_services(vehicle.depot.clone(), services, vehicle.depot.clone());
        Self::new(tour, vehicle)
    }

    /// Same vehicle and departure, new stop sequence, legs reset to unrouted.
    pub fn rebuilt_with<I>(&self, services: I) -> Self
        where
            I: IntoIterator<Item=Service>,
    {
        Self {
            tour: Tour::from_services(
                self.tour.start_link().clone(),
                services,
                self.tour.end_link().clone(),
            ),
            vehicle: self.vehicle.clone(),
            departure: self.departure,
        }
    }

    pub fn load(&self) -> Capacity {
        self.tour.load()
    }

    pub fn capacity(&self) -> Capacity {
        self.vehicle.capacity()
    }

    pub fn remaining_capacity(&self) -> Capacity {
        self.capacity().saturating_sub(self.load())
    }

    pub fn type_id(&self) -> &VehicleTypeId {
        self.vehicle.type_id()
    }
}

/// All tours of one carrier. Cloning produces an independent copy; the carrier itself is shared.
#[derive(Clone, Debug)]
pub struct TourPlan {
    carrier: Rc<Carrier>,
    tours: Vec<ScheduledTour>,
    vehicle_counter: usize,
}

impl TourPlan {
    pub fn new(carrier: Rc<Carrier>, tours: Vec<ScheduledTour>) -> Self {
        let vehicle_counter = tours.len();
        Self {
            carrier,
            tours,
            vehicle_counter,
        }
    }

    pub fn carrier(&self) -> &Rc<Carrier> {
        &self.carrier
    }

    pub fn tours(&self) -> &[ScheduledTour] {
        &self.tours
    }

    pub fn tours_mut(&mut self) -> &mut Vec<ScheduledTour> {
        &mut self.tours
    }

    pub fn number_of_tours(&self) -> usize {
        self.tours.len()
    }

    pub fn number_of_services(&self) -> usize {
        self.tours.iter().map(|it| it.tour.number_of_services()).sum()
    }

    pub fn total_load(&self) -> Capacity {
        self.tours.iter().map(ScheduledTour::load).sum()
    }

    #[cfg(test)]
    pub fn contains_service(&self, id: &ServiceId) -> bool {
        self.tours
            .iter()
            .any(|it| it.tour.services().any(|service| &service.id == id))
    }

    /// Fresh vehicle instance of the given type, operating within the carrier's hours.
    pub fn create_vehicle(&mut self, vehicle_type: &VehicleType, depot: LinkId) -> Vehicle {
        self.vehicle_counter += 1;
        let (earliest_start, latest_end) = self.carrier.operating_hours;
        Vehicle {
            id: VehicleId(format!("{}_{}", vehicle_type.id, self.vehicle_counter)),
            vehicle_type: vehicle_type.clone(),
            depot,
            earliest_start,
            latest_end,
        }
    }

    /// Removes tours without service activities; returns whether any were removed.
    pub fn remove_empty_tours(&mut self) -> bool {
        let before = self.tours.len();
        self.tours.retain(|it| !it.tour.is_empty());
        before != self.tours.len()
    }

    pub fn is_routed(&self) -> bool {
        self.tours.iter().all(|it| it.tour.is_routed())
    }

    /// Routes every tour that still has unrouted legs.
    pub fn route_unrouted(&mut self, router: &dyn Router) -> std::result::Result<(), RoutingFailure> {
        for scheduled in self.tours.iter_mut() {
            if !scheduled.tour.is_routed() {
                *scheduled = router.route(scheduled)?;
            }
        }
        Ok(())
    }
}

/// Tour-wise equality of two plans, ignoring empty tours.
#[cfg(any(test, feature = "search_assertions"))]
pub fn plans_equal(a: &TourPlan, b: &TourPlan) -> bool {
    let lhs: Vec<_> = a.tours.iter().filter(|it| !it.tour.is_empty()).collect();
    let rhs: Vec<_> = b.tours.iter().filter(|it| !it.tour.is_empty()).collect();
    lhs.len() == rhs.len()
        && lhs
        .iter()
        .zip(rhs.iter())
        .all(|(x, y)| x.type_id() == y.type_id() && tours_equal(&x.tour, &y.tour))
}
