//! Flow/wait estimation for adaptive phase length.
//!
//! For one step index, the estimator looks at every intersection sharing the
//! program and compares the traffic currently allowed through green signals
//! (flow) with the traffic held by red ones (wait). Vehicle lengths are
//! normalized by each intersection's longest segment so large and small
//! intersections weigh alike.

pub mod estimator;


pub use estimator::{FlowWaitEstimator, FlowWaitSample};
