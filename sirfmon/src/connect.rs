//! Attaching to the receiver, either through the daemon or directly.

use std::{
    io::{self, Read, Write},
    net::TcpStream,
    path::Path,
    time::{Duration, Instant},
};

use anyhow::Result;
use serialport::{ClearBuffer, SerialPort};
use sirf::{PacketKind, Parser};
use tracing::{debug, info, warn};

use crate::{
    cli::{Endpoint, Options},
    driver::{ProtocolDriver, SirfBinary},
    error::MonitorError,
    session::MonitorSession,
    source::{DaemonStream, PacketSource, SerialStream},
    trace::{outbound_dump, outbound_text, TraceSink},
    transport::{ControlChannel, SerialLine, Transport},
};

/// Speeds tried, in order, when hunting for the receiver
pub const SNIFF_BAUDS: [u32; 6] = [4800, 9600, 19200, 38400, 57600, 115200];
/// Packets read after an NMEA receiver is asked for binary mode
const REDIRECT_SNIFF: usize = 12;
const SNIFF_WINDOW: Duration = Duration::from_millis(1500);
const PORT_TIMEOUT: Duration = Duration::from_millis(100);
const DAEMON_TIMEOUT: Duration = Duration::from_secs(1);
const REPLY_LEN: usize = 512;

pub fn connect(options: &Options) -> Result<MonitorSession> {
    match &options.endpoint {
        Endpoint::Daemon {
            server,
            port,
            device,
        } => attach_daemon(server, port, device.as_deref(), &options.control_socket),
        Endpoint::Device(path) => open_device(path),
    }
}

fn attach_daemon(
    server: &str,
    port: &str,
    device: Option<&str>,
    control_socket: &Path,
) -> Result<MonitorSession> {
    let address = format!("{server}:{port}");
    let connection_failure =
        |e: io::Error| MonitorError::setup(1, format!("connection failure on {address}: {e}"));

    let mut stream = TcpStream::connect(&address).map_err(connection_failure)?;
    stream
        .set_read_timeout(Some(DAEMON_TIMEOUT))
        .map_err(connection_failure)?;
    let control = open_control(control_socket);

    let mut trace = TraceSink::new();
    let device = handshake(&mut stream, device, &mut trace).map_err(connection_failure)?;
    if device.is_empty() {
        return Err(MonitorError::setup(1, format!("{address} has no device to monitor")).into());
    }
    info!("Attached to {device} through {address}");

    stream.set_nonblocking(true).map_err(connection_failure)?;
    let mut session = MonitorSession::new(
        device.clone(),
        PacketSource::new(Box::new(DaemonStream(stream))),
        Transport::Proxied {
            control,
            device: device.clone(),
        },
    );
    session.endpoint = Some(format!("{address}:{device}"));
    session.trace = trace;
    Ok(session)
}

#[cfg(unix)]
fn open_control(path: &Path) -> Option<Box<dyn ControlChannel>> {
    use std::os::unix::net::UnixStream;

    let opened = UnixStream::connect(path).and_then(|socket| {
        socket.set_read_timeout(Some(DAEMON_TIMEOUT))?;
        Ok(socket)
    });
    match opened {
        Ok(socket) => Some(Box::new(socket)),
        Err(e) => {
            warn!("Control socket {} unavailable: {e}", path.display());
            None
        },
    }
}

#[cfg(not(unix))]
fn open_control(path: &Path) -> Option<Box<dyn ControlChannel>> {
    warn!("Control socket {} unsupported on this platform", path.display());
    None
}

/// Claims a device on the daemon and puts the connection in raw mode.
///
/// Returns the path of the device the daemon assigned.
pub fn handshake<S: Read + Write>(
    socket: &mut S,
    device: Option<&str>,
    trace: &mut TraceSink,
) -> io::Result<String> {
    match device {
        Some(device) => exchange(socket, &format!("F={device}\r\n"), trace)?,
        None => exchange(socket, "O\r\n", trace)?,
    };
    // GPSD,F=<path>
    let reply = exchange(socket, "F\r\n", trace)?;
    let device = reply.get(7..).unwrap_or_default().to_string();
    exchange(socket, "R=2\r\n", trace)?;
    Ok(device)
}

fn exchange<S: Read + Write>(
    socket: &mut S,
    request: &str,
    trace: &mut TraceSink,
) -> io::Result<String> {
    trace.line(outbound_text(request));
    socket.write_all(request.as_bytes())?;
    socket.flush()?;
    let mut reply = [0u8; REPLY_LEN];
    let n = socket.read(&mut reply)?;
    if n == 0 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "daemon closed the connection",
        ));
    }
    let reply = String::from_utf8_lossy(&reply[..n]).trim_end().to_string();
    debug!("{:?} -> {reply:?}", request.trim_end());
    Ok(reply)
}

fn open_device(path: &Path) -> Result<MonitorSession> {
    let name = path.to_string_lossy().into_owned();
    let activation_failure =
        |e: serialport::Error| MonitorError::setup(2, format!("activation of device {name} failed: {e}"));
    let autodetect_failure =
        |e: io::Error| MonitorError::setup(2, format!("autodetection failed on {name}: {e}"));

    let mut port = serialport::new(&name, SNIFF_BAUDS[0])
        .timeout(PORT_TIMEOUT)
        .open()
        .map_err(activation_failure)?;

    let mut found = None;
    for baud in SNIFF_BAUDS {
        port.set_baud_rate(baud).map_err(activation_failure)?;
        if let Err(e) = port.clear(ClearBuffer::Input) {
            debug!("Clearing input at {baud}: {e}");
        }
        let mut parser = Parser::new();
        let kinds = sniff(&mut port, &mut parser, 1, SNIFF_WINDOW).map_err(autodetect_failure)?;
        if let Some(kind) = kinds.first() {
            found = Some((*kind, baud));
            break;
        }
        debug!("Nothing recognizable from {name} at {baud}");
    }
    let Some((kind, baud)) = found else {
        return Err(MonitorError::setup(2, format!("autodetection failed on {name}")).into());
    };
    info!("{name} looks like a {kind:?} device at {baud}");

    let mut trace = TraceSink::new();
    match kind {
        PacketKind::Sirf => {},
        PacketKind::Nmea => {
            let driver = SirfBinary;
            info!("Switching {name} to {}", driver.name());
            send_mode_switch(&mut port, &driver, baud, &mut trace).map_err(autodetect_failure)?;
            if !await_sirf(&mut port, REDIRECT_SNIFF).map_err(autodetect_failure)? {
                return Err(MonitorError::setup(
                    1,
                    format!("{name} was not identified as a SiRF receiver"),
                )
                .into());
            }
        },
        PacketKind::Ubx => {
            return Err(
                MonitorError::setup(1, format!("cannot yet handle packet type {kind:?}")).into(),
            );
        },
    }
    info!("{name} identified as SiRF binary at {baud}");

    let control: Box<dyn SerialPort> = port.try_clone().map_err(activation_failure)?;
    let mut session = MonitorSession::new(
        name.clone(),
        PacketSource::new(Box::new(SerialStream(port))),
        Transport::Direct(Box::new(SerialLine(control))),
    );
    session.line.baud = baud;
    session.trace = trace;
    Ok(session)
}

/// Asks a receiver speaking NMEA to move to the driver's protocol.
fn send_mode_switch(
    port: &mut dyn Write,
    driver: &dyn ProtocolDriver,
    baud: u32,
    trace: &mut TraceSink,
) -> io::Result<()> {
    let request = driver.mode_switch_to_binary(baud);
    trace.line(outbound_dump(&request));
    port.write_all(&request)?;
    port.flush()
}

/// Reads until `wanted` packets were framed or `window` ran out,
/// returning the kinds seen.
pub fn sniff(
    reader: &mut dyn Read,
    parser: &mut Parser,
    wanted: usize,
    window: Duration,
) -> io::Result<Vec<PacketKind>> {
    let deadline = Instant::now() + window;
    let mut kinds = Vec::new();
    let mut chunk = [0u8; REPLY_LEN];

    while kinds.len() < wanted && Instant::now() < deadline {
        let n = match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                continue
            },
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        let mut it = parser.consume(&chunk[..n]);
        while let Some(framed) = it.next() {
            match framed {
                Ok(packet) => kinds.push(packet.kind()),
                Err(e) => debug!("Skipping malformed input: {e}"),
            }
        }
    }
    Ok(kinds)
}

/// Whether a SiRF frame shows up within the next `limit` packets.
fn await_sirf(reader: &mut dyn Read, limit: usize) -> io::Result<bool> {
    let mut parser = Parser::new();
    let kinds = sniff(reader, &mut parser, limit, SNIFF_WINDOW * 2)?;
    Ok(kinds.contains(&PacketKind::Sirf))
}
