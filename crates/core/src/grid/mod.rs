//! Grid modules

pub mod chamber_grid;

// Re-export main types
pub use chamber_grid::*;
