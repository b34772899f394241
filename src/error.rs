use crate::problem::{LinkId, NodeId};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RoutingFailure {
    #[error("unknown link {0}")]
    UnknownLink(LinkId),

    #[error("no path from node {from} to node {to}")]
    Unreachable { from: NodeId, to: NodeId },
}

#[derive(Debug, thiserror::Error)]
pub enum CalibrationError {
    /// A statistic or comparison would divide by zero.
    #[error("degenerate metric: {0}")]
    DegenerateMetric(String),

    #[error(transparent)]
    Routing(#[from] RoutingFailure),

    #[error("unknown link {0}")]
    UnknownLink(LinkId),

    #[error("invalid tour: {0}")]
    InvalidTour(String),

    #[error("invalid network: {0}")]
    InvalidNetwork(String),

    #[error("invalid parameters: {0}")]
    InvalidParameters(String),
}

impl CalibrationError {
    pub fn is_routing_failure(&self) -> bool {
        matches!(self, Self::Routing(_))
    }
}

pub type Result<T> = core::result::Result<T, CalibrationError>;
