#[path = "mod_runner.rs"]
mod runner_tests;
