//! Response parsing and result classification.

pub mod aggregator;
pub mod parser;

pub use aggregator::*;
