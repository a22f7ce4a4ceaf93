//! Composable filters and query options.

mod builder;
mod options;

pub use builder::FilterBuilder;
pub use options::{Direction, FindOptions, ProjectionBuilder, SortBuilder};
