//! Read-only views over the processed tables: loading, filters and the
//! per-tab summaries. Rendering lives in the terminal binary.

pub mod data;
pub mod filter;
pub mod state;

pub use data::{DashboardData, DashboardError, check_data, load_data};
pub use state::{DashboardState, DateBound, Tab};
