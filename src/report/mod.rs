//! Report rendering and persistence.

pub mod console;
pub mod generator;

pub use console::{render_results, render_structure};
pub use generator::*;
