//! Tabula Chart - request planning and data shaping for scatter plots
//!
//! A scatter plot over a table either asks the server for a decimated
//! (binned) rendition of two column expressions or, for small tables, fetches
//! the raw columns together with sort and error-bar columns. This crate
//! decides which, and turns the fetched table into plot points and padded
//! axis boundaries.

mod boundaries;
mod data;
mod params;
mod planner;

pub use boundaries::*;
pub use data::*;
pub use params::*;
pub use planner::*;
