use std::path::Path;
use std::str::FromStr;
use std::{env, fs, io};

use fern::colors::{Color, ColoredLevelConfig};
use log::LevelFilter;
use thiserror::Error;

/// Logging could not be set up
#[derive(Debug, Error)]
pub enum LoggingError {
    /// Not one of off, error, warn, info, debug, trace
    #[error("invalid log level: {0}")]
    InvalidLevel(String),
    /// The log file or its directory could not be created
    #[error("log file: {0}")]
    File(#[from] io::Error),
    /// A logger was already installed
    #[error("logger already set: {0}")]
    AlreadySet(#[from] log::SetLoggerError),
}

/// Parse a log level name.  `RUST_LOG`, if set, takes precedence over `level_arg`.
pub fn log_level(level_arg: &str) -> Result<LevelFilter, LoggingError> {
    let level = env::var("RUST_LOG").unwrap_or(level_arg.to_string());
    LevelFilter::from_str(&level).map_err(|_| LoggingError::InvalidLevel(level))
}

/// Log to the console and to `<datadir>/<who>.log`
pub fn setup_logging<P: AsRef<Path>>(
    datadir: P,
    who: &str,
    level_arg: &str,
) -> Result<(), LoggingError> {
    let level = log_level(level_arg)?;

    // file
    fs::create_dir_all(datadir.as_ref())?;
    let who_clone = who.to_string();
    let logfile = datadir.as_ref().join(format!("{}.log", who));
    let file_config = fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{} {}/{} {}] {}",
                tstamp(),
                who_clone,
                record.target(),
                record.level(),
                message
            ))
        })
        .level(level)
        .chain(fern::log_file(logfile)?);

    // console
    let who_clone = who.to_string();
    let colors = ColoredLevelConfig::new().info(Color::Green).error(Color::Red).warn(Color::Yellow);
    let console_config = fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{} {}/{} {}] {}",
                tstamp(),
                who_clone,
                record.target(),
                colors.color(record.level()),
                message
            ))
        })
        .level(level)
        .chain(io::stderr());

    fern::Dispatch::new().chain(console_config).chain(file_config).apply()?;
    Ok(())
}

/// UTC timestamp with millisecond precision
pub fn tstamp() -> String {
    use time::{macros::format_description, OffsetDateTime};

    OffsetDateTime::now_utc()
        .format(format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]"
        ))
        .unwrap_or_else(|_| "????-??-?? ??:??:??.???".to_string())
}
