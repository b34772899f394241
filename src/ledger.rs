use serde::Serialize;

use crate::error::Result;
use crate::plan::comparison::{compare, PlanDistance};
use crate::plan::evaluation::{EvaluatedPlan, PlanStatistics};

/// Snapshot of one inner iteration. Plans are independent copies taken at recording time.
#[derive(Clone, Debug)]
pub struct IterationRecord {
    pub number: usize,
    pub inner_temperature: f64,
    pub outer_temperature: f64,
    pub current: Option<EvaluatedPlan>,
    pub best: Option<EvaluatedPlan>,
    pub neighbor: Option<EvaluatedPlan>,
}

impl IterationRecord {
    pub fn new(number: usize, inner_temperature: f64, outer_temperature: f64) -> Self {
        Self {
            number,
            inner_temperature,
            outer_temperature,
            current: None,
            best: None,
            neighbor: None,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct LedgerRow {
    pub number: usize,
    pub inner_temperature: f64,
    pub outer_temperature: f64,
    pub current_distance: Option<f64>,
    pub neighbor_distance: Option<f64>,
    /// distance of the best plan known at this iteration
    pub best_distance: Option<f64>,
    pub best_breakdown: Option<PlanDistance>,
}

#[derive(Debug, Default)]
pub struct IterationLedger {
    enabled: bool,
    records: Vec<IterationRecord>,
}

impl IterationLedger {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            records: vec![],
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn record(&mut self, record: IterationRecord) {
        if self.enabled {
            self.records.push(record);
        }
    }

    pub fn records(&self) -> &[IterationRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// One row per record with distances to `reference`. Records without a best plan carry the
    /// last best plan forward.
    pub fn summarize(&self, reference: &PlanStatistics) -> Result<Vec<LedgerRow>> {
        let distance_of = |plan: &Option<EvaluatedPlan>| -> Result<Option<PlanDistance>> {
            plan.as_ref()
                .map(|it| compare(reference, it.statistics()))
                .transpose()
        };

        let mut best: Option<PlanDistance> = None;
        let mut rows = Vec::with_capacity(self.records.len());
        for record in self.records.iter() {
            if let Some(breakdown) = distance_of(&record.best)? {
                best = Some(breakdown);
            }
            rows.push(LedgerRow {
                number: record.number,
                inner_temperature: record.inner_temperature,
                outer_temperature: record.outer_temperature,
                current_distance: distance_of(&record.current)?.map(|it| it.total()),
                neighbor_distance: distance_of(&record.neighbor)?.map(|it| it.total()),
                best_distance: best.as_ref().map(PlanDistance::total),
                best_breakdown: best.clone(),
            });
        }
        Ok(rows)
    }
}
