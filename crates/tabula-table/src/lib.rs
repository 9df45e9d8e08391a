//! Tabula Table - the client-resident half of the table engine
//!
//! Everything here is synchronous and operates on values the caller owns:
//!
//! - `SelectionSet` - which of N logical rows are selected, in O(min(selected, unselected)) memory
//! - `FilterExpression` - per-column predicate language (parse, serialize, validate, compile)
//! - `SortSpec` - `DIRECTION,col1,col2` ordering descriptor with toggle semantics
//! - `TableModel` - columns, the loaded page, pagination request, selection and status
//! - table operations - filter/sort/page a fully loaded table, page arithmetic, exports
//! - `structural_merge` - merge nested records while keeping unchanged subtrees shared

mod export;
pub mod filter;
mod merge;
mod model;
mod ops;
mod selection;
mod sort;
pub mod text;

pub use export::*;
pub use filter::{Condition, FilterExpression, FilterOp, Validation};
pub use merge::*;
pub use model::*;
pub use ops::*;
pub use selection::*;
pub use sort::*;
