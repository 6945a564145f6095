use std::{fmt, io};

/// Faults that end a monitor run.
///
/// Transport and decoding problems are reported inline and never become a
/// `MonitorError`; these are the ones the process exits on.
#[derive(Debug)]
pub enum MonitorError {
    /// Connecting, activating or identifying the device failed before the
    /// interactive loop started.
    Setup { code: u8, reason: String },
    TerminalTooSmall {
        need: (u16, u16),
        got: (u16, u16),
    },
    /// An invariant of the monitor itself was broken.
    Consistency(String),
    Io(io::Error),
}

impl MonitorError {
    pub fn setup(code: u8, reason: impl Into<String>) -> Self {
        MonitorError::Setup {
            code,
            reason: reason.into(),
        }
    }

    pub fn consistency(reason: impl Into<String>) -> Self {
        MonitorError::Consistency(reason.into())
    }

    /// Process exit status for this fault
    pub fn exit_code(&self) -> u8 {
        match self {
            MonitorError::Setup { code, .. } => *code,
            _ => 1,
        }
    }
}

impl fmt::Display for MonitorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorError::Setup { reason, .. } => f.write_str(reason),
            MonitorError::TerminalTooSmall { need, got } => write!(
                f,
                "Terminal too small, need {}x{}, got {}x{}",
                need.1, need.0, got.1, got.0
            ),
            MonitorError::Consistency(reason) => {
                write!(f, "Internal consistency failure, probable I/O error: {reason}")
            },
            MonitorError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for MonitorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MonitorError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for MonitorError {
    fn from(e: io::Error) -> Self {
        MonitorError::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes() {
        assert_eq!(MonitorError::setup(2, "activation failed").exit_code(), 2);
        assert_eq!(MonitorError::consistency("short write").exit_code(), 1);
        assert_eq!(
            MonitorError::from(io::Error::from(io::ErrorKind::BrokenPipe)).exit_code(),
            1
        );
        let small = MonitorError::TerminalTooSmall {
            need: (24, 80),
            got: (20, 70),
        };
        assert_eq!(small.exit_code(), 1);
        assert_eq!(small.to_string(), "Terminal too small, need 80x24, got 70x20");
    }
}
