#[path = "filter/prop_builder.rs"]
mod builder_props;
#[path = "query/prop_range.rs"]
mod range_props;
#[path = "query/prop_pipelines.rs"]
mod pipeline_props;
