//! Retrieval routing: structured path first, vector search as fallback.

mod grounding;
mod retrieval;

pub use grounding::{GroundingContext, NO_INFORMATION};
pub use retrieval::{RetrievalRouter, RouteOutcome, RouteState, RoutingMode};
