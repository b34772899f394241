use std::cell::RefCell;
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap};

use crate::error::RoutingFailure;
use crate::plan::{Leg, Route, ScheduledTour, TourElement};
use crate::problem::network::{Link, LinkNetwork};
use crate::problem::{LinkId, NodeId, VehicleType, VehicleTypeId};

/// Fills in the legs of a tour. Routing the same stop sequence twice yields the same topology.
pub trait Router {
    fn route(&self, tour: &ScheduledTour) -> Result<ScheduledTour, RoutingFailure>;
}

#[derive(Clone, Copy, Debug)]
struct QueueEntry {
    cost: f64,
    link: Option<usize>,
    node_seq: usize,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cost
            .total_cmp(&other.cost)
            .then(self.node_seq.cmp(&other.node_seq))
    }
}

type PathKey = (LinkId, LinkId, VehicleTypeId);

/// Least-cost router over a [`LinkNetwork`] using free-speed travel times and the
/// vehicle type's distance and time cost rates as link disutility.
pub struct DijkstraRouter<'a> {
    network: &'a LinkNetwork,
    cache: RefCell<HashMap<PathKey, Route>>,
}

impl<'a> DijkstraRouter<'a> {
    pub fn new(network: &'a LinkNetwork) -> Self {
        Self {
            network,
            cache: RefCell::new(HashMap::new()),
        }
    }

    fn link(&self, id: &LinkId) -> Result<&'a Link, RoutingFailure> {
        self.network
            .link(id)
            .ok_or_else(|| RoutingFailure::UnknownLink(id.clone()))
    }

    fn disutility(link: &Link, vehicle_type: &VehicleType) -> f64 {
        if vehicle_type.cost_per_distance == 0.0 && vehicle_type.cost_per_time == 0.0 {
            link.travel_time()
        } else {
            link.travel_disutility(vehicle_type)
        }
    }

    /// Route from the end of `from` to the end of `to`. The links of `from` and `to` are not part
    /// of the route; the travel time includes traversing `to`.
    pub fn calc_route(
        &self,
        from: &LinkId,
        to: &LinkId,
        vehicle_type: &VehicleType,
    ) -> Result<Route, RoutingFailure> {
        let key = (from.clone(), to.clone(), vehicle_type.id.clone());
        if let Some(route) = self.cache.borrow().get(&key) {
            return Ok(route.clone());
        }

        let from_link = self.link(from)?;
        let to_link = self.link(to)?;
        let route = if from == to {
            Route {
                links: vec![],
                travel_time: 0.0,
            }
        } else {
            let links = self.least_cost_path(&from_link.to, &to_link.from, vehicle_type)?;
            let travel_time = links
                .iter()
                .map(|&idx| self.network.link_at(idx).travel_time())
                .sum::<f64>()
                + to_link.travel_time();
            Route {
                links: links
                    .into_iter()
                    .map(|idx| self.network.link_at(idx).id.clone())
                    .collect(),
                travel_time,
            }
        };

        self.cache.borrow_mut().insert(key, route.clone());
        Ok(route)
    }

    fn least_cost_path(
        &self,
        source: &NodeId,
        target: &NodeId,
        vehicle_type: &VehicleType,
    ) -> Result<Vec<usize>, RoutingFailure> {
        if source == target {
            return Ok(vec![]);
        }

        // node -> (cost, incoming link)
        let mut settled: HashMap<&NodeId, (f64, Option<usize>)> = HashMap::new();
        let mut nodes: Vec<&NodeId> = vec![source];
        let mut best: HashMap<&NodeId, f64> = HashMap::new();
        let mut queue = BinaryHeap::new();

        best.insert(source, 0.0);
        queue.push(Reverse(QueueEntry {
            cost: 0.0,
            link: None,
            node_seq: 0,
        }));

        while let Some(Reverse(entry)) = queue.pop() {
            let node = nodes[entry.node_seq];
            if settled.contains_key(node) {
                continue;
            }
            settled.insert(node, (entry.cost, entry.link));
            if node == target {
                break;
            }

            for (link_idx, link) in self.network.outgoing_links(node) {
                if settled.contains_key(&link.to) {
                    continue;
                }
                let cost = entry.cost + Self::disutility(link, vehicle_type);
                if best.get(&link.to).map_or(true, |&known| cost < known) {
                    best.insert(&link.to, cost);
                    nodes.push(&link.to);
                    queue.push(Reverse(QueueEntry {
                        cost,
                        link: Some(link_idx),
                        node_seq: nodes.len() - 1,
                    }));
                }
            }
        }

        if !settled.contains_key(target) {
            return Err(RoutingFailure::Unreachable {
                from: source.clone(),
                to: target.clone(),
            });
        }

        let mut path = vec![];
        let mut node = target;
        while let Some(&(_, Some(link_idx))) = settled.get(node) {
            path.push(link_idx);
            node = &self.network.link_at(link_idx).from;
        }
        path.reverse();
        Ok(path)
    }
}

impl<'a> Router for DijkstraRouter<'a> {
    fn route(&self, scheduled: &ScheduledTour) -> Result<ScheduledTour, RoutingFailure> {
        let elements = scheduled.tour.elements();
        let vehicle_type = &scheduled.vehicle.vehicle_type;

        let mut legs = Vec::with_capacity(elements.len() / 2);
        let mut time = scheduled.departure;
        let mut location = scheduled.tour.start_link();

        for (idx, element) in elements.iter().enumerate() {
            match element {
                TourElement::Leg(_) => {
                    let destination = match &elements[idx + 1] {
                        TourElement::Service(activity) => &activity.service.location,
                        TourElement::End(link) => link,
                        _ => unreachable!("leg must be followed by a service or the end"),
                    };
                    let route = self.calc_route(location, destination, vehicle_type)?;
                    let departure_time = time;
                    time += route.travel_time;
                    legs.push(Leg {
                        route: Some(route),
                        departure_time,
                    });
                }
                TourElement::Service(activity) => {
                    location = &activity.service.location;
                    time += activity.service.service_duration;
                }
                TourElement::Start(_) | TourElement::End(_) => {}
            }
        }

        let mut routed = scheduled.clone();
        for (leg, computed) in routed.tour.legs_mut().zip(legs) {
            *leg = computed;
        }
        Ok(routed)
    }
}
