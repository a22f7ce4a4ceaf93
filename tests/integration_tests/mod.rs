// Aggregates per-module suites; layout mirrors src/
mod _support;
mod aggregation;
mod ops;
mod query;
mod utils;
