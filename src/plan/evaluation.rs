use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{CalibrationError, Result};
use crate::plan::{ScheduledTour, TourElement, TourPlan};
use crate::problem::network::Network;
use crate::problem::VehicleTypeId;

/// Aggregate statistics of a tour plan, recomputed wholesale on every evaluation.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PlanStatistics {
    pub number_of_tours: usize,
    /// mean of load / capacity over all tours
    pub capacity_utilization: f64,
    pub stops_per_tour: f64,
    pub tour_length: f64,
    pub inter_stop_distance: f64,
    pub overall_length: f64,
    /// share of tours per vehicle type, shares sum to 1
    pub vehicle_shares: BTreeMap<VehicleTypeId, f64>,
}

#[derive(Clone, Debug)]
pub struct EvaluatedPlan {
    plan: TourPlan,
    statistics: PlanStatistics,
}

impl EvaluatedPlan {
    pub fn plan(&self) -> &TourPlan {
        &self.plan
    }

    pub fn into_plan(self) -> TourPlan {
        self.plan
    }

    pub fn statistics(&self) -> &PlanStatistics {
        &self.statistics
    }
}

struct TourMeasures {
    length: f64,
    // leg routes plus service links, without start and end link
    inter_stop_length: f64,
}

fn measure_tour(scheduled: &ScheduledTour, network: &dyn Network) -> Result<TourMeasures> {
    let mut length = 0.0;
    let mut inter_stop_length = 0.0;
    for element in scheduled.tour.elements() {
        match element {
            TourElement::Start(link) | TourElement::End(link) => {
                length += network.link_length(link)?;
            }
            TourElement::Leg(leg) => {
                let route = leg.route.as_ref().ok_or_else(|| {
                    CalibrationError::InvalidTour(format!(
                        "tour of vehicle {} contains an unrouted leg",
                        scheduled.vehicle.id
                    ))
                })?;
                for link in route.links.iter() {
                    let link_length = network.link_length(link)?;
                    length += link_length;
                    inter_stop_length += link_length;
                }
            }
            TourElement::Service(activity) => {
                let link_length = network.link_length(&activity.service.location)?;
                length += link_length;
                inter_stop_length += link_length;
            }
        }
    }
    Ok(TourMeasures {
        length,
        inter_stop_length,
    })
}

pub fn evaluate(plan: TourPlan, network: &dyn Network) -> Result<EvaluatedPlan> {
    let statistics = compute_statistics(&plan, network)?;
    Ok(EvaluatedPlan { plan, statistics })
}

pub fn compute_statistics(plan: &TourPlan, network: &dyn Network) -> Result<PlanStatistics> {
    let number_of_tours = plan.number_of_tours();
    if number_of_tours == 0 {
        return Err(CalibrationError::DegenerateMetric(
            "plan has no tours".to_string(),
        ));
    }

    let mut utilization_sum = 0.0;
    let mut stops = 0usize;
    let mut overall_length = 0.0;
    let mut inter_stop_length = 0.0;
    let mut type_counts: BTreeMap<VehicleTypeId, usize> = BTreeMap::new();

    for scheduled in plan.tours() {
        let capacity = scheduled.capacity();
        if capacity == 0 {
            return Err(CalibrationError::DegenerateMetric(format!(
                "vehicle {} has zero capacity",
                scheduled.vehicle.id
            )));
        }
        utilization_sum += scheduled.load() as f64 / capacity as f64;
        stops += scheduled.tour.number_of_services();

        let measures = measure_tour(scheduled, network)?;
        overall_length += measures.length;
        inter_stop_length += measures.inter_stop_length;

        *type_counts.entry(scheduled.type_id().clone()).or_default() += 1;
    }

    if stops == 0 {
        return Err(CalibrationError::DegenerateMetric(
            "plan has no service activities".to_string(),
        ));
    }

    let tours = number_of_tours as f64;
    Ok(PlanStatistics {
        number_of_tours,
        capacity_utilization: utilization_sum / tours,
        stops_per_tour: stops as f64 / tours,
        tour_length: overall_length / tours,
        inter_stop_distance: inter_stop_length / stops as f64,
        overall_length,
        vehicle_shares: type_counts
            .into_iter()
            .map(|(id, count)| (id, count as f64 / tours))
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::plan::ScheduledTour;
    use crate::problem::router::{DijkstraRouter, Router};
    use crate::utils::test_utilities::{grid_carrier, grid_network, vehicle_of_type};

    #[test]
    fn statistics_of_routed_plan() -> anyhow::Result<()> {
        let network = grid_network(3);
        let router = DijkstraRouter::new(&network);
        let carrier = Rc::new(grid_carrier());
        let services = carrier.services().to_vec();

        let tours = vec![
            ScheduledTour::with_services(
                vehicle_of_type(&carrier, "light", 0),
                services[0..2].to_vec(),
            ),
            ScheduledTour::with_services(
                vehicle_of_type(&carrier, "heavy", 1),
                services[2..].to_vec(),
            ),
        ];
        let mut plan = TourPlan::new(carrier.clone(), tours);
        plan.route_unrouted(&router)?;

        let evaluated = evaluate(plan, &network)?;
        let stats = evaluated.statistics();
        assert_eq!(stats.number_of_tours, 2);
        assert_eq!(stats.stops_per_tour, services.len() as f64 / 2.0);
        assert!((stats.vehicle_shares.values().sum::<f64>() - 1.0).abs() < 1e-12);
        assert_eq!(stats.vehicle_shares[&VehicleTypeId::from("light")], 0.5);
        assert!((stats.tour_length * 2.0 - stats.overall_length).abs() < 1e-9);
        assert!(stats.inter_stop_distance > 0.0);
        assert!(stats.capacity_utilization > 0.0 && stats.capacity_utilization <= 1.0);
        Ok(())
    }

    #[test]
    fn evaluation_is_idempotent() -> anyhow::Result<()> {
        let network = grid_network(3);
        let router = DijkstraRouter::new(&network);
        let carrier = Rc::new(grid_carrier());
        let mut plan = TourPlan::new(
            carrier.clone(),
            vec![ScheduledTour::with_services(
                vehicle_of_type(&carrier, "heavy", 0),
                carrier.services().to_vec(),
            )],
        );
        plan.route_unrouted(&router)?;
        let first = evaluate(plan.clone(), &network)?;
        let second = evaluate(first.plan().clone(), &network)?;
        assert_eq!(first.statistics(), second.statistics());

        let rerouted = router.route(&plan.tours()[0])?;
        assert_eq!(&rerouted, &plan.tours()[0]);
        Ok(())
    }

    #[test]
    fn tour_length_counts_start_service_and_end_links() -> anyhow::Result<()> {
        let network = grid_network(2);
        let router = DijkstraRouter::new(&network);
        let carrier = Rc::new(grid_carrier());
        // depot h_0_0 and a single service at the same link: no route links at all
        let depot_service = carrier
            .services()
            .iter()
            .find(|it| it.location.0 == "h_0_0")
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("fixture lacks depot service"))?;
        let mut plan = TourPlan::new(
            carrier.clone(),
            vec![ScheduledTour::with_services(
                vehicle_of_type(&carrier, "light", 0),
                vec![depot_service],
            )],
        );
        plan.route_unrouted(&router)?;
        let stats = compute_statistics(&plan, &network)?;
        assert_eq!(stats.overall_length, 300.0);
        assert_eq!(stats.inter_stop_distance, 100.0);
        Ok(())
    }

    #[test]
    fn degenerate_plans_are_rejected() {
        let network = grid_network(2);
        let carrier = Rc::new(grid_carrier());
        let empty = TourPlan::new(carrier.clone(), vec![]);
        assert!(matches!(
            compute_statistics(&empty, &network),
            Err(CalibrationError::DegenerateMetric(_))
        ));

        let mut no_stops = TourPlan::new(
            carrier.clone(),
            vec![ScheduledTour::with_services(
                vehicle_of_type(&carrier, "light", 0),
                vec![],
            )],
        );
        let router = DijkstraRouter::new(&network);
        assert!(no_stops.route_unrouted(&router).is_ok());
        assert!(matches!(
            compute_statistics(&no_stops, &network),
            Err(CalibrationError::DegenerateMetric(_))
        ));
    }

    #[test]
    fn unrouted_legs_are_rejected() {
        let network = grid_network(2);
        let carrier = Rc::new(grid_carrier());
        let plan = TourPlan::new(
            carrier.clone(),
            vec![ScheduledTour::with_services(
                vehicle_of_type(&carrier, "light", 0),
                carrier.services().to_vec(),
            )],
        );
        assert!(matches!(
            compute_statistics(&plan, &network),
            Err(CalibrationError::InvalidTour(_))
        ));
    }
}
