//! The monitor loop: identify the receiver, then wait for device or
//! operator input, handle it, and repeat until told to stop.

use std::{
    io,
    path::Path,
    time::{Duration, Instant},
};

use sirf::{ControlMessage, PacketKind};
use tracing::{debug, info, warn};

use crate::{
    display::Display,
    error::MonitorError,
    family::{CommandStatus, DeviceFamily},
    session::MonitorSession,
    source::SourceEvent,
    trace::inbound_dump,
};

/// Longest the loop waits before repainting
const WAIT_BOUND: Duration = Duration::from_millis(250);
const WAIT_SLICE: Duration = Duration::from_millis(25);

/// What woke the loop up.
#[derive(Debug, Default)]
pub struct Ready {
    pub line: Option<String>,
    pub device: bool,
}

#[derive(Debug)]
pub enum Exit {
    /// The operator quit
    Quit,
    /// A family command ended the session
    Terminated,
    /// The device stream failed
    DeviceFailure(io::Error),
}

impl Exit {
    pub fn code(&self) -> u8 {
        match self {
            Exit::Quit | Exit::Terminated => 0,
            Exit::DeviceFailure(_) => 1,
        }
    }
}

#[derive(Debug)]
enum State {
    Identifying,
    Idle { operator_input: bool },
    Dispatching(Ready),
    Terminating(Exit),
}

pub struct Monitor<D: Display> {
    family: Box<dyn DeviceFamily>,
    session: MonitorSession,
    display: D,
}

impl<D: Display> Monitor<D> {
    pub fn new(family: Box<dyn DeviceFamily>, session: MonitorSession, display: D) -> Self {
        Self {
            family,
            session,
            display,
        }
    }

    #[cfg(test)]
    pub fn display(&self) -> &D {
        &self.display
    }

    #[cfg(test)]
    pub fn session(&self) -> &MonitorSession {
        &self.session
    }

    /// Runs until quit, termination or failure. The session is torn down on
    /// every way out, errors included.
    pub fn run(&mut self) -> Result<Exit, MonitorError> {
        let result = self.run_loop();
        self.session.teardown();
        result
    }

    fn run_loop(&mut self) -> Result<Exit, MonitorError> {
        let mut state = State::Identifying;
        loop {
            state = match state {
                State::Identifying => self.identify()?,
                State::Idle { operator_input } => self.idle(operator_input)?,
                State::Dispatching(ready) => self.dispatch(ready)?,
                State::Terminating(exit) => {
                    info!("Monitor stopping: {exit:?}");
                    return Ok(exit);
                },
            };
        }
    }

    fn identify(&mut self) -> Result<State, MonitorError> {
        let (min_rows, min_cols) = self.family.min_size();
        let (rows, cols) = self.display.size();
        // one row more for the status line
        if rows < min_rows + 1 || cols < min_cols {
            return Err(MonitorError::TerminalTooSmall {
                need: (min_rows + 1, min_cols),
                got: (rows, cols),
            });
        }

        self.family.layout(&mut self.display)?;
        info!("Monitoring {} as {}", self.session.device, self.family.name());
        self.family.identify(&mut self.session);
        Ok(State::Idle {
            operator_input: false,
        })
    }

    fn idle(&mut self, operator_input: bool) -> Result<State, MonitorError> {
        self.family
            .repaint(&mut self.session, &mut self.display, operator_input)?;
        self.display.status(&self.session.status_line());
        for line in self.session.trace.take() {
            self.display.trace(line);
        }
        self.display.refresh()?;

        let deadline = Instant::now() + WAIT_BOUND;
        loop {
            let device = match self.session.source.readable() {
                Ok(device) => device,
                Err(e) => return Ok(State::Terminating(Exit::DeviceFailure(e))),
            };
            let wait = if device {
                Duration::ZERO
            } else {
                WAIT_SLICE.min(deadline.saturating_duration_since(Instant::now()))
            };
            let line = self.display.poll_line(wait)?;
            if device || line.is_some() {
                return Ok(State::Dispatching(Ready { line, device }));
            }
            if Instant::now() >= deadline {
                return Ok(State::Idle {
                    operator_input: false,
                });
            }
        }
    }

    fn dispatch(&mut self, ready: Ready) -> Result<State, MonitorError> {
        let mut operator_input = false;
        if let Some(line) = ready.line {
            operator_input = true;
            if let Some(exit) = self.operator_line(line.trim())? {
                return Ok(State::Terminating(exit));
            }
        }

        if ready.device {
            match self.session.source.next_packet() {
                SourceEvent::Packet(PacketKind::Sirf, frame) => {
                    self.family
                        .analyze(&frame, &mut self.session, &mut self.display)?;
                },
                SourceEvent::Packet(kind, frame) => {
                    debug!("Ignoring {kind:?} packet of {} bytes", frame.len());
                    self.session.trace.line(inbound_dump(kind, &frame));
                },
                SourceEvent::Nothing => {},
                SourceEvent::Fatal(e) => {
                    warn!("Device stream failed: {e}");
                    return Ok(State::Terminating(Exit::DeviceFailure(e)));
                },
            }
        }

        Ok(State::Idle { operator_input })
    }

    /// Offers a line to the family, then to the loop's own commands.
    fn operator_line(&mut self, line: &str) -> Result<Option<Exit>, MonitorError> {
        if line.is_empty() {
            return Ok(None);
        }
        match self.family.command(line, &mut self.session)? {
            CommandStatus::Match => return Ok(None),
            CommandStatus::Terminate => return Ok(Some(Exit::Terminated)),
            CommandStatus::Unknown => {},
        }

        let mut chars = line.chars();
        let cmd = chars.next();
        let arg = chars.as_str().trim();
        match cmd {
            Some('q') => return Ok(Some(Exit::Quit)),
            Some('l') => self.toggle_log(arg),
            Some('b') => match arg.parse::<u32>() {
                Ok(baud) if baud > 0 => {
                    self.session.change_speed(self.family.driver(), baud);
                },
                _ => self.session.report(format!("Bad speed {arg:?}")),
            },
            Some('s') => self.send_hex(arg),
            _ => self.session.report(format!("Unknown command {line:?}")),
        }
        Ok(None)
    }

    fn toggle_log(&mut self, path: &str) {
        if let Some(closed) = self.session.trace.close_log() {
            info!("Stopped logging to {}", closed.display());
        }
        if path.is_empty() {
            return;
        }
        match self.session.trace.open_log(Path::new(path)) {
            Ok(()) => info!("Logging to {path}"),
            Err(e) => self.session.report(format!("Cannot open log {path}: {e}")),
        }
    }

    fn send_hex(&mut self, arg: &str) {
        let bytes: Result<Vec<u8>, _> = arg
            .split_whitespace()
            .map(|tok| u8::from_str_radix(tok, 16))
            .collect();
        let bytes = match bytes {
            Ok(bytes) if !bytes.is_empty() => bytes,
            Ok(_) => return self.session.report("Nothing to send"),
            Err(e) => return self.session.report(format!("Bad hex byte in {arg:?}: {e}")),
        };
        // bound check before anything is traced
        match ControlMessage::from_slice(&bytes) {
            Ok(msg) => {
                self.session
                    .control_send(self.family.driver(), msg.as_bytes());
            },
            Err(e) => self.session.report(format!("Cannot send: {e}")),
        }
    }
}
