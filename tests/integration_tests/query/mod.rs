// List requests and distinct-value queries end to end.
#[path = "mod_search.rs"]
mod search_tests;
#[path = "mod_unique.rs"]
mod unique_tests;
