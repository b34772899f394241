//! Tour-level neighborhoods: the fleet stays untouched, services change position.

use itertools::Itertools;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::Result;
use crate::operators::OperatorContext;
use crate::plan::TourPlan;
use crate::problem::Service;
use crate::utils::Random;

fn eligible_tours(plan: &TourPlan, min_services: usize) -> Vec<usize> {
    plan.tours()
        .iter()
        .enumerate()
        .filter(|(_, it)| it.tour.number_of_services() >= min_services)
        .map(|(idx, _)| idx)
        .collect()
}

fn replace_services(
    plan: &mut TourPlan,
    tour_idx: usize,
    services: Vec<Service>,
    ctx: &OperatorContext,
) -> Result<()> {
    let rebuilt = plan.tours()[tour_idx].rebuilt_with(services);
    plan.tours_mut()[tour_idx] = ctx.finish(rebuilt)?;
    Ok(())
}

/// Exchanges two services of one tour with at least two services.
pub fn swap_within_tour(plan: &mut TourPlan, rng: &mut Random, ctx: &OperatorContext) -> Result<bool> {
    let candidates = eligible_tours(plan, 2);
    let tour_idx = match candidates.choose(rng) {
        Some(&idx) => idx,
        None => return Ok(false),
    };

    let mut services = plan.tours()[tour_idx].tour.service_sequence();
    let first = rng.gen_range(0..services.len());
    let mut second = rng.gen_range(0..services.len() - 1);
    if second >= first {
        second += 1;
    }
    services.swap(first, second);

    replace_services(plan, tour_idx, services, ctx)?;
    Ok(true)
}

/// (tour a, position in a, tour b, position in b) such that exchanging both services keeps
/// both tours within capacity.
fn feasible_swaps(plan: &TourPlan, a: usize, b: usize) -> Vec<(usize, usize, usize, usize)> {
    let lhs = &plan.tours()[a];
    let rhs = &plan.tours()[b];
    let (lhs_load, rhs_load) = (lhs.load() as i64, rhs.load() as i64);
    let (lhs_capacity, rhs_capacity) = (lhs.capacity() as i64, rhs.capacity() as i64);

    lhs.tour
        .services()
        .enumerate()
        .cartesian_product(rhs.tour.services().enumerate().collect_vec())
        .filter(|((_, x), (_, y))| {
            let delta = y.capacity_demand as i64 - x.capacity_demand as i64;
            lhs_load + delta <= lhs_capacity && rhs_load - delta <= rhs_capacity
        })
        .map(|((i, _), (j, _))| (a, i, b, j))
        .collect()
}

/// Exchanges a service of one tour with a service of another tour, both tours staying within
/// capacity. In homogeneous mode only a random pair of tours is considered; with a single
/// non-empty tour this degrades to [`swap_within_tour`].
pub fn swap_between_tours(
    plan: &mut TourPlan,
    rng: &mut Random,
    ctx: &OperatorContext,
) -> Result<bool> {
    let mut candidates = eligible_tours(plan, 1);

    let swaps = if ctx.is_homogeneous() {
        if candidates.len() < 2 {
            return swap_within_tour(plan, rng, ctx);
        }
        candidates.shuffle(rng);
        feasible_swaps(plan, candidates[0], candidates[1])
    } else {
        candidates
            .iter()
            .tuple_combinations()
            .flat_map(|(&a, &b)| feasible_swaps(plan, a, b))
            .collect_vec()
    };

    let &(a, i, b, j) = match swaps.choose(rng) {
        Some(swap) => swap,
        None => return Ok(false),
    };

    let mut lhs = plan.tours()[a].tour.service_sequence();
    let mut rhs = plan.tours()[b].tour.service_sequence();
    std::mem::swap(&mut lhs[i], &mut rhs[j]);

    replace_services(plan, a, lhs, ctx)?;
    replace_services(plan, b, rhs, ctx)?;
    Ok(true)
}

/// Moves one service (with its trailing leg) from a donor tour to a random position of another
/// tour that can take the extra demand. In homogeneous mode donor and service are drawn first;
/// with a single non-empty tour this degrades to [`swap_within_tour`].
pub fn move_to_another_tour(
    plan: &mut TourPlan,
    rng: &mut Random,
    ctx: &OperatorContext,
) -> Result<bool> {
    let donors = eligible_tours(plan, 1);
    let receivers_for = |plan: &TourPlan, donor: usize, demand: u32| {
        plan.tours()
            .iter()
            .enumerate()
            .filter(|(idx, it)| *idx != donor && it.load() + demand <= it.capacity())
            .map(|(idx, _)| idx)
            .collect_vec()
    };

    // (donor, position in donor, receiver)
    let moves = if ctx.is_homogeneous() {
        if plan.number_of_tours() < 2 {
            return swap_within_tour(plan, rng, ctx);
        }
        let donor = match donors.choose(rng) {
            Some(&idx) => idx,
            None => return Ok(false),
        };
        let position = rng.gen_range(0..plan.tours()[donor].tour.number_of_services());
        let demand = plan.tours()[donor].tour.service_sequence()[position].capacity_demand;
        receivers_for(plan, donor, demand)
            .into_iter()
            .map(|receiver| (donor, position, receiver))
            .collect_vec()
    } else {
        donors
            .iter()
            .flat_map(|&donor| {
                plan.tours()[donor]
                    .tour
                    .services()
                    .enumerate()
                    .flat_map(|(position, service)| {
                        receivers_for(plan, donor, service.capacity_demand)
                            .into_iter()
                            .map(move |receiver| (donor, position, receiver))
                    })
                    .collect_vec()
            })
            .collect_vec()
    };

    let &(donor, position, receiver) = match moves.choose(rng) {
        Some(it) => it,
        None => return Ok(false),
    };

    let mut donor_services = plan.tours()[donor].tour.service_sequence();
    let service = donor_services.remove(position);
    let mut receiver_services = plan.tours()[receiver].tour.service_sequence();
    // after the leg at `insert_at`, i.e. one of the n + 1 legs of the receiver
    let insert_at = rng.gen_range(0..=receiver_services.len());
    receiver_services.insert(insert_at, service);

    replace_services(plan, donor, donor_services, ctx)?;
    replace_services(plan, receiver, receiver_services, ctx)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::operators::FleetMode;
    use crate::plan::{tours_equal, ScheduledTour};
    use crate::problem::router::DijkstraRouter;
    use crate::problem::ServiceId;
    use crate::utils::create_seeded_rng;
    use crate::utils::test_utilities::{grid_network, single_type_carrier, vehicle};
    use crate::utils::validator::assert_valid_plan;

    fn ids(plan: &TourPlan, tour_idx: usize) -> Vec<ServiceId> {
        plan.tours()[tour_idx]
            .tour
            .services()
            .map(|it| it.id.clone())
            .collect()
    }

    #[test]
    fn swap_within_reverses_two_services() -> anyhow::Result<()> {
        let network = grid_network(3);
        let router = DijkstraRouter::new(&network);
        let ctx = OperatorContext::new(&router, FleetMode::Heterogeneous);
        let carrier = Rc::new(single_type_carrier(10, &[("s1", 4), ("s2", 4)]));
        let mut plan = TourPlan::new(
            carrier.clone(),
            vec![ScheduledTour::with_services(vehicle(&carrier, 0), carrier.services().to_vec())],
        );
        plan.route_unrouted(&router)?;
        let elements_before = plan.tours()[0].tour.elements().len();

        let mut rng = create_seeded_rng(1);
        assert!(swap_within_tour(&mut plan, &mut rng, &ctx)?);
        assert_eq!(ids(&plan, 0), vec![ServiceId::from("s2"), ServiceId::from("s1")]);
        assert_eq!(plan.tours()[0].load(), 8);
        assert_eq!(plan.tours()[0].tour.elements().len(), elements_before);
        assert!(plan.tours()[0].tour.is_routed());
        Ok(())
    }

    #[test]
    fn homogeneous_swap_within_leaves_legs_unrouted() -> anyhow::Result<()> {
        let network = grid_network(3);
        let router = DijkstraRouter::new(&network);
        let ctx = OperatorContext::new(&router, FleetMode::Homogeneous);
        let carrier = Rc::new(single_type_carrier(10, &[("s1", 4), ("s2", 4), ("s3", 1)]));
        let mut plan = TourPlan::new(
            carrier.clone(),
            vec![ScheduledTour::with_services(vehicle(&carrier, 0), carrier.services().to_vec())],
        );
        plan.route_unrouted(&router)?;

        let mut rng = create_seeded_rng(3);
        assert!(swap_within_tour(&mut plan, &mut rng, &ctx)?);
        assert!(!plan.is_routed());
        plan.route_unrouted(&router)?;
        assert!(plan.is_routed());
        Ok(())
    }

    #[test]
    fn infeasible_swaps_between_tours_are_never_selected() -> anyhow::Result<()> {
        // capacities 6/6, loads 5 and 1+4: only exchanging a and c keeps both loads within 6
        let network = grid_network(3);
        let router = DijkstraRouter::new(&network);
        let ctx = OperatorContext::new(&router, FleetMode::Heterogeneous);
        let carrier = Rc::new(single_type_carrier(6, &[("a", 5), ("b", 1), ("c", 4)]));
        let services = carrier.services().to_vec();
        let plan = TourPlan::new(
            carrier.clone(),
            vec![
                ScheduledTour::with_services(vehicle(&carrier, 0), vec![services[0].clone()]),
                ScheduledTour::with_services(
                    vehicle(&carrier, 1),
                    vec![services[1].clone(), services[2].clone()],
                ),
            ],
        );
        assert_eq!(feasible_swaps(&plan, 0, 1), vec![(0, 0, 1, 1)]);

        for seed in 0..20 {
            let mut neighbor = plan.clone();
            let mut rng = create_seeded_rng(seed);
            assert!(swap_between_tours(&mut neighbor, &mut rng, &ctx)?);
            assert_eq!(ids(&neighbor, 0), vec![ServiceId::from("c")]);
            assert_eq!(ids(&neighbor, 1), vec![ServiceId::from("b"), ServiceId::from("a")]);
            assert_valid_plan(&neighbor);
        }
        Ok(())
    }

    #[test]
    fn swap_between_without_feasible_pair_is_a_no_op() -> anyhow::Result<()> {
        let network = grid_network(3);
        let router = DijkstraRouter::new(&network);
        let ctx = OperatorContext::new(&router, FleetMode::Heterogeneous);
        let carrier = Rc::new(single_type_carrier(6, &[("a", 6), ("b", 1), ("c", 5)]));
        let services = carrier.services().to_vec();
        let mut plan = TourPlan::new(
            carrier.clone(),
            vec![
                ScheduledTour::with_services(vehicle(&carrier, 0), vec![services[0].clone()]),
                ScheduledTour::with_services(
                    vehicle(&carrier, 1),
                    vec![services[1].clone(), services[2].clone()],
                ),
            ],
        );
        let before = plan.clone();
        let mut rng = create_seeded_rng(5);
        assert!(!swap_between_tours(&mut plan, &mut rng, &ctx)?);
        assert!(tours_equal(&plan.tours()[0].tour, &before.tours()[0].tour));
        assert!(tours_equal(&plan.tours()[1].tour, &before.tours()[1].tour));
        Ok(())
    }

    #[test]
    fn move_respects_receiver_capacity() -> anyhow::Result<()> {
        let network = grid_network(3);
        let router = DijkstraRouter::new(&network);
        let ctx = OperatorContext::new(&router, FleetMode::Heterogeneous);
        // only "b" fits into the first tour (load 5 of 6)
        let carrier = Rc::new(single_type_carrier(6, &[("a", 5), ("b", 1), ("c", 4)]));
        let services = carrier.services().to_vec();
        let plan = TourPlan::new(
            carrier.clone(),
            vec![
                ScheduledTour::with_services(vehicle(&carrier, 0), vec![services[0].clone()]),
                ScheduledTour::with_services(
                    vehicle(&carrier, 1),
                    vec![services[1].clone(), services[2].clone()],
                ),
            ],
        );

        for seed in 0..20 {
            let mut neighbor = plan.clone();
            let mut rng = create_seeded_rng(seed);
            assert!(move_to_another_tour(&mut neighbor, &mut rng, &ctx)?);
            assert_eq!(neighbor.tours()[0].load(), 6);
            assert_eq!(ids(&neighbor, 1), vec![ServiceId::from("c")]);
            assert_eq!(neighbor.tours()[1].tour.elements().len(), 5);
            assert_valid_plan(&neighbor);
        }
        Ok(())
    }

    #[test]
    fn move_can_empty_a_donor() -> anyhow::Result<()> {
        let network = grid_network(3);
        let router = DijkstraRouter::new(&network);
        let ctx = OperatorContext::new(&router, FleetMode::Heterogeneous);
        let carrier = Rc::new(single_type_carrier(10, &[("a", 5), ("b", 1)]));
        let services = carrier.services().to_vec();
        let mut plan = TourPlan::new(
            carrier.clone(),
            vec![
                ScheduledTour::with_services(vehicle(&carrier, 0), vec![services[0].clone()]),
                ScheduledTour::with_services(vehicle(&carrier, 1), vec![services[1].clone()]),
            ],
        );
        let mut rng = create_seeded_rng(11);
        assert!(move_to_another_tour(&mut plan, &mut rng, &ctx)?);
        assert_eq!(plan.number_of_tours(), 2);
        assert!(plan.remove_empty_tours());
        assert_eq!(plan.number_of_tours(), 1);
        assert_eq!(plan.tours()[0].load(), 6);
        assert_valid_plan(&plan);
        Ok(())
    }

    #[test]
    fn homogeneous_tour_operators_keep_invariants() -> anyhow::Result<()> {
        let network = grid_network(3);
        let router = DijkstraRouter::new(&network);
        let ctx = OperatorContext::new(&router, FleetMode::Homogeneous);
        let carrier = Rc::new(single_type_carrier(
            8,
            &[("a", 3), ("b", 2), ("c", 4), ("d", 1), ("e", 2), ("f", 3)],
        ));
        let services = carrier.services().to_vec();
        let mut plan = TourPlan::new(
            carrier.clone(),
            vec![
                ScheduledTour::with_services(vehicle(&carrier, 0), services[0..3].to_vec()),
                ScheduledTour::with_services(vehicle(&carrier, 1), services[3..].to_vec()),
            ],
        );
        let mut rng = create_seeded_rng(2024);
        for _ in 0..50 {
            swap_between_tours(&mut plan, &mut rng, &ctx)?;
            move_to_another_tour(&mut plan, &mut rng, &ctx)?;
            swap_within_tour(&mut plan, &mut rng, &ctx)?;
            assert_valid_plan(&plan);
        }
        Ok(())
    }
}
