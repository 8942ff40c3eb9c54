//! capsim-report — turns a [`SimulationResult`](capsim_sim::SimulationResult)
//! into gap statistics, a console report, or JSON.

pub mod report;
pub mod stats;

pub use report::Report;
pub use stats::{GapSeries, Summary};
