//! Road-graph error type.

use thiserror::Error;

/// Errors produced while building or querying a [`crate::RoadGraph`].
#[derive(Debug, Error)]
pub enum GraphError {
    /// No edges survived ingestion (all roads were filtered out, or the
    /// provider returned nothing). Fatal to the orchestrator: `graph_empty`.
    #[error("road graph has no edges after ingestion")]
    EmptyGraph,

    #[error("invalid edge: {reason}")]
    InvalidEdge { reason: String },
}

pub type GraphResult<T> = Result<T, GraphError>;
