use std::collections::BTreeSet;

use serde::Serialize;

use crate::error::{CalibrationError, Result};
use crate::plan::evaluation::PlanStatistics;

/// Per-metric relative deviations of an entrant from an incumbent.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PlanDistance {
    pub tour_length: f64,
    /// Computed in floating point, so a change of a single tour is never truncated to zero.
    pub number_of_tours: f64,
    pub stops_per_tour: f64,
    pub capacity_utilization: f64,
    pub inter_stop_distance: f64,
    pub overall_length: f64,
    pub vehicle_composition: f64,
}

impl PlanDistance {
    pub fn total(&self) -> f64 {
        self.tour_length
            + self.number_of_tours
            + self.stops_per_tour
            + self.capacity_utilization
            + self.inter_stop_distance
            + self.overall_length
            + self.vehicle_composition
    }
}

fn relative_deviation(metric: &str, incumbent: f64, entrant: f64) -> Result<f64> {
    if incumbent == 0.0 {
        return Err(CalibrationError::DegenerateMetric(format!(
            "incumbent {} is zero",
            metric
        )));
    }
    Ok((incumbent - entrant).abs() / incumbent)
}

/// Compares `entrant` against `incumbent`; the incumbent's values serve as denominators,
/// so the measure is not symmetric.
pub fn compare(incumbent: &PlanStatistics, entrant: &PlanStatistics) -> Result<PlanDistance> {
    let types: BTreeSet<_> = incumbent
        .vehicle_shares
        .keys()
        .chain(entrant.vehicle_shares.keys())
        .collect();
    let vehicle_composition = types
        .into_iter()
        .map(|id| {
            let lhs = incumbent.vehicle_shares.get(id).cloned().unwrap_or(0.0);
            let rhs = entrant.vehicle_shares.get(id).cloned().unwrap_or(0.0);
            (rhs - lhs).abs()
        })
        .sum();

    Ok(PlanDistance {
        tour_length: relative_deviation("tour length", incumbent.tour_length, entrant.tour_length)?,
        number_of_tours: relative_deviation(
            "number of tours",
            incumbent.number_of_tours as f64,
            entrant.number_of_tours as f64,
        )?,
        stops_per_tour: relative_deviation(
            "stops per tour",
            incumbent.stops_per_tour,
            entrant.stops_per_tour,
        )?,
        capacity_utilization: relative_deviation(
            "capacity utilization",
            incumbent.capacity_utilization,
            entrant.capacity_utilization,
        )?,
        inter_stop_distance: relative_deviation(
            "inter-stop distance",
            incumbent.inter_stop_distance,
            entrant.inter_stop_distance,
        )?,
        overall_length: relative_deviation(
            "overall length",
            incumbent.overall_length,
            entrant.overall_length,
        )?,
        vehicle_composition,
    })
}

pub fn distance(incumbent: &PlanStatistics, entrant: &PlanStatistics) -> Result<f64> {
    compare(incumbent, entrant).map(|it| it.total())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::problem::VehicleTypeId;

    fn statistics(tours: usize, shares: &[(&str, f64)]) -> PlanStatistics {
        PlanStatistics {
            number_of_tours: tours,
            capacity_utilization: 0.8,
            stops_per_tour: 4.0,
            tour_length: 12_000.0,
            inter_stop_distance: 1_500.0,
            overall_length: 12_000.0 * tours as f64,
            vehicle_shares: shares
                .iter()
                .map(|(id, share)| (VehicleTypeId::from(*id), *share))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    #[test]
    fn identical_statistics_have_zero_distance() -> anyhow::Result<()> {
        let a = statistics(3, &[("light", 2.0 / 3.0), ("heavy", 1.0 / 3.0)]);
        let breakdown = compare(&a, &a.clone())?;
        assert_eq!(breakdown, PlanDistance::default());
        assert_eq!(breakdown.total(), 0.0);
        Ok(())
    }

    #[test]
    fn tour_count_deviation_is_fractional() -> anyhow::Result<()> {
        let reference = statistics(4, &[("light", 1.0)]);
        let mut entrant = reference.clone();
        entrant.number_of_tours = 5;
        let breakdown = compare(&reference, &entrant)?;
        assert_eq!(breakdown.number_of_tours, 0.25);
        assert_eq!(breakdown.total(), 0.25);
        Ok(())
    }

    #[test]
    fn vehicle_term_covers_types_missing_on_either_side() -> anyhow::Result<()> {
        let reference = statistics(2, &[("light", 0.5), ("heavy", 0.5)]);
        let entrant = statistics(2, &[("light", 0.5), ("medium", 0.5)]);
        let breakdown = compare(&reference, &entrant)?;
        assert!((breakdown.vehicle_composition - 1.0).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn distance_is_not_symmetric() -> anyhow::Result<()> {
        let a = statistics(2, &[("light", 1.0)]);
        let b = statistics(4, &[("light", 1.0)]);
        assert_ne!(distance(&a, &b)?, distance(&b, &a)?);
        Ok(())
    }

    #[test]
    fn zero_incumbent_metric_is_degenerate() {
        let mut reference = statistics(2, &[("light", 1.0)]);
        reference.capacity_utilization = 0.0;
        let entrant = statistics(2, &[("light", 1.0)]);
        assert!(matches!(
            compare(&reference, &entrant),
            Err(CalibrationError::DegenerateMetric(_))
        ));
    }
}
