use std::path::PathBuf;

use clap::{value_parser, Arg, ArgMatches};
use indoc::indoc;

pub const DEFAULT_SERVER: &str = "127.0.0.1";
pub const DEFAULT_PORT: &str = "2947";
pub const DEFAULT_CONTROL_SOCKET: &str = "/var/run/gpsd.sock";

const COMMANDS_HELP: &str = indoc! {"
    Commands typed at the cmd> prompt:
      a          toggle 50 bps subframe reporting
      c<n>       set static navigation flag to n
      d<n>       set the tracking data rate to n seconds (0..30)
      n          switch the receiver to NMEA at the current speed and exit
      t          toggle the navigation parameter display (polled every 10s)
      b<baud>    change the line speed
      l[file]    stop logging, then log the trace to file when given
      s <hex>..  send the bytes as a control message
      q          quit
"};

/// Where the receiver is reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// A running daemon, optionally asked for a specific device
    Daemon {
        server: String,
        port: String,
        device: Option<String>,
    },
    /// A serial device opened directly
    Device(PathBuf),
}

impl Default for Endpoint {
    fn default() -> Self {
        Endpoint::Daemon {
            server: DEFAULT_SERVER.to_string(),
            port: DEFAULT_PORT.to_string(),
            device: None,
        }
    }
}

impl Endpoint {
    /// Parses `server[:port[:device]]`.
    ///
    /// An argument with a `/` and no `:` is a device path; empty parts take
    /// the defaults.
    pub fn parse(arg: Option<&str>) -> Self {
        let Some(arg) = arg else {
            return Endpoint::default();
        };
        let colon = arg.find(':');
        if colon.is_none() && arg.contains('/') {
            return Endpoint::Device(PathBuf::from(arg));
        }

        let (server, rest) = match colon {
            Some(i) => (&arg[..i], Some(&arg[i + 1..])),
            None => (arg, None),
        };
        let (port, device) = match rest {
            Some(rest) => match rest.find(':') {
                Some(j) => (&rest[..j], Some(&rest[j + 1..])),
                None => (rest, None),
            },
            None => ("", None),
        };

        let or_default = |s: &str, default: &str| {
            if s.is_empty() {
                default.to_string()
            } else {
                s.to_string()
            }
        };
        Endpoint::Daemon {
            server: or_default(server, DEFAULT_SERVER),
            port: or_default(port, DEFAULT_PORT),
            device: device.filter(|d| !d.is_empty()).map(str::to_string),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Options {
    pub debug_level: u8,
    pub control_socket: PathBuf,
    pub log_to_file: bool,
    pub endpoint: Endpoint,
}

impl Options {
    pub fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            debug_level: matches.get_one::<u8>("debug").copied().unwrap_or(0),
            control_socket: matches
                .get_one::<String>("control-socket")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONTROL_SOCKET)),
            log_to_file: matches.get_flag("log-file"),
            endpoint: Endpoint::parse(matches.get_one::<String>("endpoint").map(String::as_str)),
        }
    }
}

pub fn command() -> clap::Command {
    clap::Command::new("sirfmon")
        .version(clap::crate_version!())
        .author(clap::crate_authors!())
        .about("Monitor and control a SiRF binary protocol GPS receiver")
        .after_help(COMMANDS_HELP)
        .arg(
            Arg::new("debug")
                .value_name("level")
                .short('D')
                .required(false)
                .default_value("0")
                .value_parser(value_parser!(u8))
                .help("Diagnostic level: 0 warn, 1 info, 2 debug, 3 or more trace"),
        )
        .arg(
            Arg::new("control-socket")
                .value_name("controlsock")
                .short('F')
                .required(false)
                .help("Daemon control socket used to forward control messages")
                .default_value(DEFAULT_CONTROL_SOCKET),
        )
        .arg(
            Arg::new("log-file")
                .long("log-file")
                .action(clap::ArgAction::SetTrue)
                .help("Log to file besides showing partial logs in the monitor"),
        )
        .arg(
            Arg::new("endpoint")
                .value_name("server[:port[:device]]")
                .required(false)
                .help("Daemon to attach to, or a serial device path to open directly"),
        )
}
