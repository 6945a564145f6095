use std::path::PathBuf;

use anyhow::Result;
use directories::ProjectDirs;
use lazy_static::lazy_static;
use log::LevelFilter;
use tracing::info;
use tracing_error::ErrorLayer;
use tracing_subscriber::{self, layer::SubscriberExt, util::SubscriberInitExt, Layer};

use crate::cli::Options;

lazy_static! {
    pub static ref PROJECT_NAME: String = env!("CARGO_CRATE_NAME").to_uppercase().to_string();
    pub static ref DATA_FOLDER: Option<PathBuf> =
        std::env::var(format!("{}_DATA", PROJECT_NAME.clone()))
            .ok()
            .map(PathBuf::from);
    pub static ref LOG_ENV: String = format!("{}_LOGLEVEL", PROJECT_NAME.clone());
    pub static ref LOG_FILE: String = format!("{}.log", env!("CARGO_PKG_NAME"));
}

fn project_directory() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "gpsd", env!("CARGO_PKG_NAME"))
}

pub fn get_data_dir() -> PathBuf {
    if let Some(s) = DATA_FOLDER.clone() {
        s
    } else if let Some(proj_dirs) = project_directory() {
        proj_dirs.data_local_dir().to_path_buf()
    } else {
        PathBuf::from(".").join(".data")
    }
}

/// Level selected by `-D`.
pub fn level_for(debug_level: u8) -> LevelFilter {
    match debug_level {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Level for the in-monitor log pane, taken from the most verbose level
/// named in an `EnvFilter` directive string.
fn pane_level(filter: &str, fallback: LevelFilter) -> LevelFilter {
    filter
        .split(',')
        .filter_map(|directive| {
            let level = directive.rsplit('=').next()?.trim();
            match level.to_ascii_lowercase().as_str() {
                "off" => Some(LevelFilter::Off),
                "error" => Some(LevelFilter::Error),
                "warn" => Some(LevelFilter::Warn),
                "info" => Some(LevelFilter::Info),
                "debug" => Some(LevelFilter::Debug),
                "trace" => Some(LevelFilter::Trace),
                _ => None,
            }
        })
        .max()
        .unwrap_or(fallback)
}

/// Sets up `tracing`; returns the directory of the log file when one is
/// written.
pub fn initialize(options: &Options) -> Result<Option<PathBuf>> {
    let fallback = level_for(options.debug_level);
    let filter = std::env::var("RUST_LOG")
        .or_else(|_| std::env::var(LOG_ENV.clone()))
        .unwrap_or_else(|_| {
            let level = fallback.to_string().to_ascii_lowercase();
            format!("{}={level},sirf={level}", env!("CARGO_CRATE_NAME"))
        });
    std::env::set_var("RUST_LOG", &filter);

    let log_dir = if options.log_to_file {
        let directory = get_data_dir();
        std::fs::create_dir_all(directory.clone())?;
        let log_path = directory.join(LOG_FILE.clone());
        let log_file = std::fs::File::create(log_path)?;

        let file_subscriber = tracing_subscriber::fmt::layer()
            .with_file(true)
            .with_line_number(true)
            .with_writer(log_file)
            .with_target(false)
            .with_ansi(false)
            .with_filter(tracing_subscriber::filter::EnvFilter::from_default_env());
        tracing_subscriber::registry()
            .with(file_subscriber)
            .with(ErrorLayer::default())
            .with(tui_logger::TuiTracingSubscriberLayer)
            .init();
        info!("Full log available in: {}", directory.to_string_lossy());
        Some(directory)
    } else {
        tracing_subscriber::registry()
            .with(ErrorLayer::default())
            .with(tui_logger::TuiTracingSubscriberLayer)
            .init();
        None
    };

    let level = pane_level(&filter, fallback);
    tui_logger::init_logger(level)?;
    tui_logger::set_default_level(level);
    Ok(log_dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_levels() {
        assert_eq!(level_for(0), LevelFilter::Warn);
        assert_eq!(level_for(1), LevelFilter::Info);
        assert_eq!(level_for(2), LevelFilter::Debug);
        assert_eq!(level_for(9), LevelFilter::Trace);
    }

    #[test]
    fn pane_level_from_directives() {
        assert_eq!(pane_level("debug", LevelFilter::Warn), LevelFilter::Debug);
        assert_eq!(
            pane_level("sirfmon=info,sirf=trace", LevelFilter::Warn),
            LevelFilter::Trace
        );
        assert_eq!(pane_level("sirfmon", LevelFilter::Info), LevelFilter::Info);
    }
}
