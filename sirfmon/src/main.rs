use std::process::ExitCode;

use clap::error::ErrorKind;
use tracing::error;

mod cli;
mod connect;
mod display;
mod driver;
mod error;
mod family;
mod logging;
mod monitor;
mod session;
mod sirf_family;
mod source;
#[cfg(test)]
mod testing;
mod trace;
mod transport;
mod tui;

use error::MonitorError;
use monitor::{Exit, Monitor};
use sirf_family::SirfFamily;
use tui::TerminalDisplay;

fn exit_code_for(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<MonitorError>()
        .map(MonitorError::exit_code)
        .unwrap_or(1)
}

fn main() -> ExitCode {
    let matches = match cli::command().try_get_matches() {
        Ok(matches) => matches,
        Err(e) => {
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            let _ = e.print();
            return ExitCode::from(code);
        },
    };
    let options = cli::Options::from_matches(&matches);

    if let Err(e) = logging::initialize(&options) {
        eprintln!("sirfmon: cannot set up logging: {e:#}");
        return ExitCode::from(1);
    }

    let session = match connect::connect(&options) {
        Ok(session) => session,
        Err(e) => {
            error!("{e:#}");
            eprintln!("sirfmon: {e:#}");
            return ExitCode::from(exit_code_for(&e));
        },
    };

    let display = match TerminalDisplay::new() {
        Ok(display) => display,
        Err(e) => {
            eprintln!("sirfmon: {e}");
            return ExitCode::from(e.exit_code());
        },
    };

    let mut monitor = Monitor::new(Box::new(SirfFamily::new()), session, display);
    let outcome = monitor.run();
    // restores the terminal before anything is printed
    drop(monitor);

    match outcome {
        Ok(exit) => {
            if let Exit::DeviceFailure(e) = &exit {
                eprintln!("sirfmon: device I/O failure: {e}");
            }
            ExitCode::from(exit.code())
        },
        Err(e) => {
            eprintln!("sirfmon: {e}");
            ExitCode::from(e.exit_code())
        },
    }
}
