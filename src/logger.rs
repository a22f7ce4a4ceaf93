use crate::config::LogConfig;
use crate::errors::DbError;
use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::append::rolling_file::RollingFileAppender;
use log4rs::append::rolling_file::policy::compound::{
    CompoundPolicy, roll::fixed_window::FixedWindowRoller, trigger::size::SizeTrigger,
};
use log4rs::config::{Appender, Config, Logger, Root};
use log4rs::encode::pattern::PatternEncoder;
use std::path::{Path, PathBuf};

/// Log target for tenant-level destructive operations.
pub const AUDIT_TARGET: &str = "configdb::audit";

const PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} [{l}] {t} - {m}{n}";
const ROLL_SIZE: u64 = 10 * 1024 * 1024;

pub fn parse_level(level: Option<&str>) -> LevelFilter {
    match level.unwrap_or("info").to_ascii_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}

fn rolling(base: &Path, stem: &str, keep: u32) -> Result<RollingFileAppender, DbError> {
    let roller = FixedWindowRoller::builder()
        .build(&format!("{}", base.join(format!("{stem}.{{}}.log")).display()), keep)
        .map_err(|e| DbError::Config(format!("log roller for {stem}: {e}")))?;
    let policy = CompoundPolicy::new(Box::new(SizeTrigger::new(ROLL_SIZE)), Box::new(roller));
    Ok(RollingFileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(PATTERN)))
        .build(base.join(format!("{stem}.log")), Box::new(policy))?)
}

/// Configure process-wide logging with rolling `app.log` and `audit.log` files under `dir`.
///
/// - dir: base directory for logs; current directory when `None`.
/// - level: error|warn|info|debug|trace
/// - retention: number of rolled files to keep (default 7)
///
/// A logger that is already installed is left in place.
///
/// # Errors
/// Returns an error when the directory or the appenders cannot be created.
pub fn configure_logging(
    dir: Option<&Path>,
    level: Option<&str>,
    retention: Option<usize>,
) -> Result<(), DbError> {
    let base = match dir {
        Some(d) => d.to_path_buf(),
        None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    };
    std::fs::create_dir_all(&base)?;
    let keep = u32::try_from(retention.unwrap_or(7)).unwrap_or(u32::MAX);
    let lvl = parse_level(level);
    let config = Config::builder()
        .appender(Appender::builder().build("app", Box::new(rolling(&base, "app", keep)?)))
        .appender(Appender::builder().build("audit", Box::new(rolling(&base, "audit", keep)?)))
        .logger(Logger::builder().appender("audit").additive(false).build(AUDIT_TARGET, LevelFilter::Info))
        .build(Root::builder().appender("app").build(lvl))
        .map_err(|e| DbError::Config(e.to_string()))?;
    if log4rs::init_config(config).is_err() {
        log::debug!("logger already initialised; keeping existing configuration");
    }
    Ok(())
}

/// Configure logging from environment variables if present:
/// - CONFIGDB_LOG_DIR
/// - CONFIGDB_LOG_LEVEL
/// - CONFIGDB_LOG_RETENTION
///
/// # Errors
/// See [`configure_logging`].
pub fn configure_from_env() -> Result<(), DbError> {
    configure_from_env_with(|k| std::env::var(k).ok())
}

/// Same as [`configure_from_env`] with an explicit environment lookup.
///
/// # Errors
/// See [`configure_logging`].
pub fn configure_from_env_with(env: impl Fn(&str) -> Option<String>) -> Result<(), DbError> {
    let dir = env("CONFIGDB_LOG_DIR").map(PathBuf::from);
    let level = env("CONFIGDB_LOG_LEVEL");
    let retention = env("CONFIGDB_LOG_RETENTION").and_then(|s| s.parse::<usize>().ok());
    configure_logging(dir.as_deref(), level.as_deref(), retention)
}

/// Configure logging from a loaded [`LogConfig`], which already folds in the environment.
///
/// # Errors
/// See [`configure_logging`].
pub fn configure_from_config(cfg: &LogConfig) -> Result<(), DbError> {
    configure_logging(cfg.dir.as_deref(), cfg.level.as_deref(), cfg.retention)
}

/// Console-only logging, for tools and tests.
///
/// # Errors
/// Returns an error when the log4rs config is invalid.
pub fn init_console(level: Option<&str>) -> Result<(), DbError> {
    let stdout = ConsoleAppender::builder().encoder(Box::new(PatternEncoder::new(PATTERN))).build();
    let config = Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(parse_level(level)))
        .map_err(|e| DbError::Config(e.to_string()))?;
    if log4rs::init_config(config).is_err() {
        log::debug!("logger already initialised; keeping existing configuration");
    }
    Ok(())
}

/// Emits a `trace` record on creation and another when dropped.
#[must_use = "the exit record is written when the guard is dropped"]
pub struct EnterExit {
    name: &'static str,
}

pub fn enter_exit(name: &'static str) -> EnterExit {
    log::trace!("enter {name}");
    EnterExit { name }
}

impl Drop for EnterExit {
    fn drop(&mut self) {
        log::trace!("exit {}", self.name);
    }
}
