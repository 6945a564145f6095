use chrono::{DateTime, Local, Utc};
use sirf::Parity;
use tracing::{info, warn};

use crate::{
    driver::ProtocolDriver,
    source::PacketSource,
    trace::{outbound_dump, outbound_text, TraceSink},
    transport::Transport,
};

/// Serial line configuration of the receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSettings {
    pub baud: u32,
    pub parity: Parity,
    pub stop_bits: u8,
}

impl Default for LineSettings {
    fn default() -> Self {
        Self {
            baud: 4800,
            parity: Parity::None,
            stop_bits: 1,
        }
    }
}

/// Wall clock used for rendering and the periodic poll.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;

    /// Local offset from UTC, in seconds.
    fn utc_offset(&self) -> i32;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn utc_offset(&self) -> i32 {
        Local::now().offset().local_minus_utc()
    }
}

/// Everything the monitor knows about the receiver it is attached to.
pub struct MonitorSession {
    pub device: String,
    pub source: PacketSource,
    pub transport: Transport,
    pub line: LineSettings,
    /// `server:port:device` for a daemon session
    pub endpoint: Option<String>,
    /// Navigation parameters are polled and shown while set
    pub nav_param_display: bool,
    pub subframes_enabled: bool,
    pub tracking_rate: u8,
    pub trace: TraceSink,
    clock: Box<dyn Clock>,
    torn_down: bool,
}

impl MonitorSession {
    pub fn new(device: impl Into<String>, source: PacketSource, transport: Transport) -> Self {
        Self {
            device: device.into(),
            source,
            transport,
            line: LineSettings::default(),
            endpoint: None,
            nav_param_display: false,
            subframes_enabled: false,
            tracking_rate: 1,
            trace: TraceSink::new(),
            clock: Box::new(SystemClock),
            torn_down: false,
        }
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn utc_offset(&self) -> i32 {
        self.clock.utc_offset()
    }

    pub fn status_line(&self) -> String {
        match (&self.transport, &self.endpoint) {
            (Transport::Proxied { .. }, Some(endpoint)) => endpoint.clone(),
            _ => format!(
                "{} {:4} {} {}",
                self.device,
                self.line.baud,
                self.line.parity.as_char(),
                self.line.stop_bits
            ),
        }
    }

    /// Reports a transport problem to the operator without ending the session.
    pub fn report(&mut self, text: impl Into<String>) {
        let text = text.into();
        warn!("{text}");
        self.trace.line(text);
    }

    /// Frames and sends a control message payload.
    ///
    /// The frame is traced before it is sent, whatever the outcome. Returns
    /// whether exactly the whole frame went out.
    pub fn control_send(&mut self, driver: &dyn ProtocolDriver, payload: &[u8]) -> bool {
        let frame = match driver.frame(payload) {
            Ok(frame) => frame,
            Err(e) => {
                self.report(format!("Control message rejected: {e}"));
                return false;
            },
        };
        self.trace.line(outbound_dump(&frame));

        match self.transport.send_control(driver, &frame) {
            Ok(n) if n == frame.len() => true,
            Ok(n) => {
                self.report(format!("Short control write, {n} of {} bytes", frame.len()));
                false
            },
            Err(e) => {
                self.report(format!("Control send failed: {e}"));
                false
            },
        }
    }

    /// Changes the line speed on both ends, keeping parity and stop bits.
    pub fn change_speed(&mut self, driver: &dyn ProtocolDriver, baud: u32) -> bool {
        let settings = LineSettings { baud, ..self.line };
        let result = match self.transport {
            Transport::Direct(_) => driver
                .speed_switch(baud, self.line.parity, self.line.stop_bits)
                .and_then(|request| {
                    self.trace.line(outbound_dump(&request));
                    self.transport.change_speed(driver, &request, &settings)
                }),
            Transport::Proxied { .. } => {
                let request = format!("B={baud}\r\n");
                self.trace.line(outbound_text(&request));
                self.source.send_raw(request.as_bytes())
            },
        };
        match result {
            Ok(()) => {
                info!("Line speed now {baud}");
                self.line = settings;
                true
            },
            Err(e) => {
                self.report(format!("Speed change to {baud} failed: {e}"));
                false
            },
        }
    }

    /// Closes the trace log and the control handles. Safe to call twice.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        if let Some(path) = self.trace.close_log() {
            info!("Trace log {} closed", path.display());
        }
        self.transport.close();
        info!("Session on {} closed", self.device);
    }
}
