//! Named aggregation templates and the runner that executes them.

mod runner;
mod template;

pub(crate) use runner::split_facet;
pub use runner::AggregationRunner;
pub use template::{CUSTOMERS_WITH_SCANS_BETWEEN_DATES, Template, TemplateArgs, TemplateRegistry};
