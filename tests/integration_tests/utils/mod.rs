// Mirror the ambient modules: config, logger, scope
#[path = "mod_config.rs"]
mod config_tests;
#[path = "mod_logger.rs"]
mod logger_tests;
#[path = "mod_scope.rs"]
mod scope_tests;
