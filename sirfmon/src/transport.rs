//! How control messages reach the receiver: straight down the serial line,
//! or through the daemon's control socket.

use std::{
    io::{self, Read, Write},
    thread,
    time::Duration,
};

use serialport::SerialPort;
use sirf::Parity;
use tracing::debug;

use crate::{driver::ProtocolDriver, session::LineSettings};

/// Room for the daemon's `ERROR\r\n` reply
const PROXY_REPLY_LEN: usize = 8;
const SPEED_SETTLE: Duration = Duration::from_millis(50);

/// Control handle on a directly opened device.
pub trait DeviceLine: Write {
    /// Waits until everything written has been transmitted.
    fn drain(&mut self) -> io::Result<()>;

    fn set_line(&mut self, settings: &LineSettings) -> io::Result<()>;
}

pub struct SerialLine(pub Box<dyn SerialPort>);

impl Write for SerialLine {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl DeviceLine for SerialLine {
    fn drain(&mut self) -> io::Result<()> {
        self.0.flush()
    }

    fn set_line(&mut self, settings: &LineSettings) -> io::Result<()> {
        let parity = match settings.parity {
            Parity::None => serialport::Parity::None,
            Parity::Odd => serialport::Parity::Odd,
            Parity::Even => serialport::Parity::Even,
        };
        let stop_bits = match settings.stop_bits {
            2 => serialport::StopBits::Two,
            _ => serialport::StopBits::One,
        };
        self.0.set_baud_rate(settings.baud)?;
        self.0.set_parity(parity)?;
        self.0.set_stop_bits(stop_bits)?;
        Ok(())
    }
}

/// The daemon's control socket.
pub trait ControlChannel: Read + Write {}

impl<T: Read + Write> ControlChannel for T {}

pub enum Transport {
    Direct(Box<dyn DeviceLine>),
    /// `control` is `None` when the control socket could not be opened;
    /// sends then fail without ending the session.
    Proxied {
        control: Option<Box<dyn ControlChannel>>,
        device: String,
    },
}

impl Transport {
    /// Sends a framed control message and returns the bytes the driver wrote.
    pub fn send_control(
        &mut self,
        driver: &dyn ProtocolDriver,
        frame: &[u8],
    ) -> io::Result<usize> {
        match self {
            Transport::Direct(line) => driver.control_send(line, frame),
            Transport::Proxied { control, device } => {
                let control = control.as_mut().ok_or_else(|| {
                    io::Error::new(io::ErrorKind::NotConnected, "no daemon control socket")
                })?;
                write!(control, "!{device}=")?;
                let written = driver.control_send(control, frame)?;

                let mut reply = [0u8; PROXY_REPLY_LEN];
                match control.read(&mut reply) {
                    Ok(n) => debug!(
                        "Daemon replied {:?}",
                        String::from_utf8_lossy(&reply[..n]).trim_end()
                    ),
                    Err(e) => debug!("No reply from daemon control socket: {e}"),
                }
                Ok(written)
            },
        }
    }

    /// Sends the receiver its speed-switch `request`, then moves the local
    /// port to the new settings.
    ///
    /// Only a directly opened device can be reconfigured here.
    pub fn change_speed(
        &mut self,
        driver: &dyn ProtocolDriver,
        request: &[u8],
        settings: &LineSettings,
    ) -> io::Result<()> {
        match self {
            Transport::Direct(line) => {
                driver.control_send(line, request)?;
                line.drain()?;
                thread::sleep(SPEED_SETTLE);
                line.set_line(settings)
            },
            Transport::Proxied { .. } => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "speed is changed through the daemon",
            )),
        }
    }

    pub fn close(&mut self) {
        match self {
            Transport::Direct(line) => {
                if let Err(e) = line.flush() {
                    debug!("Flushing device on close: {e}");
                }
            },
            Transport::Proxied { control, .. } => *control = None,
        }
    }
}
