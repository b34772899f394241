use crate::plan::evaluation::EvaluatedPlan;
use crate::plan::TourPlan;

pub fn format_log_plan(plan: &TourPlan) -> String {
    format!(
        "{}/{}/{}",
        plan.number_of_tours(),
        plan.number_of_services(),
        plan.total_load(),
    )
}

pub fn format_log_evaluated(evaluated: &EvaluatedPlan, distance: f64) -> String {
    let stats = evaluated.statistics();
    format!(
        "{}/{:.2}/{:.0} (distance: {:.4})",
        stats.number_of_tours, stats.stops_per_tour, stats.overall_length, distance,
    )
}
