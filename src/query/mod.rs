//! Request-to-pipeline compilation.
//!
//! - `parse`: the `value,value|op&op` field syntax and its operator conditions
//! - `compile`: list requests into `$match` + `$facet` pipelines
//! - `unique`: distinct-value pipelines with array unwinding

mod compile;
mod parse;
mod unique;

pub use compile::{
    CompiledQuery, METADATA_BRANCH, RESULTS_BRANCH, Window, build_match, compile_list_request,
    parse_order_by,
};
pub(crate) use compile::and_all;
pub use parse::{FieldItem, Operator, item_conditions, parse_field_value, type_name, typed_value};
pub use unique::{
    FilterValue, clean_field, decode_unique_values, key_to_string, rewrite_for_unwind,
    unique_value_pipeline,
};
