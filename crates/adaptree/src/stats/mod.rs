//! Online statistics kept at every live leaf.
//!
//! - [`RunningStat`]: count, mean and variance of a scalar stream
//! - [`SplitFilter`]: decayed evidence that two value streams differ

mod filter;
mod running;

pub use filter::{FilterParams, SplitFilter};
pub use running::RunningStat;
