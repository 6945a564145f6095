//! In-memory stand-ins for the device, the daemon and the clock.

use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
    io::{self, Read, Write},
    rc::Rc,
};

use chrono::{DateTime, TimeZone, Utc};

use crate::{
    session::{Clock, LineSettings, MonitorSession},
    source::{ByteStream, PacketSource},
    transport::{DeviceLine, Transport},
};

#[derive(Default)]
struct StreamState {
    input: VecDeque<u8>,
    written: Vec<u8>,
    reads: usize,
    closed: bool,
    fail: Option<io::ErrorKind>,
    blocked_writes: usize,
    write_chunk: Option<usize>,
}

/// Device data stream fed by the test.
#[derive(Clone, Default)]
pub struct FakeStream(Rc<RefCell<StreamState>>);

impl FakeStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&self, bytes: &[u8]) {
        self.0.borrow_mut().input.extend(bytes);
    }

    /// Reads report end of stream once the input is used up.
    pub fn close(&self) {
        self.0.borrow_mut().closed = true;
    }

    /// The next read fails with `kind`.
    pub fn fail_with(&self, kind: io::ErrorKind) {
        self.0.borrow_mut().fail = Some(kind);
    }

    pub fn reads(&self) -> usize {
        self.0.borrow().reads
    }

    /// The next `n` writes fail with `WouldBlock`.
    pub fn block_writes(&self, n: usize) {
        self.0.borrow_mut().blocked_writes = n;
    }

    /// Writes accept at most `max` bytes each.
    pub fn chunk_writes(&self, max: usize) {
        self.0.borrow_mut().write_chunk = Some(max);
    }

    pub fn written(&self) -> Vec<u8> {
        self.0.borrow().written.clone()
    }
}

impl Read for FakeStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.0.borrow_mut();
        state.reads += 1;
        if let Some(kind) = state.fail.take() {
            return Err(io::Error::from(kind));
        }
        if state.input.is_empty() {
            return if state.closed {
                Ok(0)
            } else {
                Err(io::Error::from(io::ErrorKind::WouldBlock))
            };
        }
        let n = buf.len().min(state.input.len());
        for (dst, src) in buf.iter_mut().zip(state.input.drain(..n)) {
            *dst = src;
        }
        Ok(n)
    }
}

impl Write for FakeStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.0.borrow_mut();
        if state.blocked_writes > 0 {
            state.blocked_writes -= 1;
            return Err(io::Error::from(io::ErrorKind::WouldBlock));
        }
        let n = state.write_chunk.map_or(buf.len(), |max| max.min(buf.len()));
        state.written.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl ByteStream for FakeStream {
    fn pending(&mut self) -> io::Result<usize> {
        let state = self.0.borrow();
        if state.fail.is_some() || (state.closed && state.input.is_empty()) {
            return Ok(1);
        }
        Ok(state.input.len())
    }
}

#[derive(Default)]
struct LineState {
    written: Vec<u8>,
    drains: usize,
    settings: Vec<LineSettings>,
}

/// Control handle of a directly opened device.
#[derive(Clone, Default)]
pub struct FakeLine(Rc<RefCell<LineState>>);

impl FakeLine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn written(&self) -> Vec<u8> {
        self.0.borrow().written.clone()
    }

    pub fn drains(&self) -> usize {
        self.0.borrow().drains
    }

    pub fn settings(&self) -> Vec<LineSettings> {
        self.0.borrow().settings.clone()
    }
}

impl Write for FakeLine {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().written.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl DeviceLine for FakeLine {
    fn drain(&mut self) -> io::Result<()> {
        self.0.borrow_mut().drains += 1;
        Ok(())
    }

    fn set_line(&mut self, settings: &LineSettings) -> io::Result<()> {
        self.0.borrow_mut().settings.push(*settings);
        Ok(())
    }
}

#[derive(Default)]
struct ControlState {
    written: Vec<u8>,
    replies: VecDeque<u8>,
}

/// Daemon socket: records what was written, answers with queued replies.
#[derive(Clone, Default)]
pub struct FakeControl(Rc<RefCell<ControlState>>);

impl FakeControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&self, bytes: &[u8]) {
        self.0.borrow_mut().replies.extend(bytes);
    }

    pub fn written(&self) -> Vec<u8> {
        self.0.borrow().written.clone()
    }

    pub fn unread(&self) -> Vec<u8> {
        self.0.borrow().replies.iter().copied().collect()
    }
}

impl Read for FakeControl {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.0.borrow_mut();
        if state.replies.is_empty() {
            return Err(io::Error::from(io::ErrorKind::WouldBlock));
        }
        let n = buf.len().min(state.replies.len());
        for (dst, src) in buf.iter_mut().zip(state.replies.drain(..n)) {
            *dst = src;
        }
        Ok(n)
    }
}

impl Write for FakeControl {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().written.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Clock the test moves by hand.
#[derive(Clone)]
pub struct ManualClock(Rc<Cell<DateTime<Utc>>>);

impl ManualClock {
    pub fn at(unix_seconds: i64) -> Self {
        let start = Utc
            .timestamp_opt(unix_seconds, 0)
            .single()
            .unwrap_or_default();
        Self(Rc::new(Cell::new(start)))
    }

    pub fn set(&self, unix_seconds: i64) {
        if let Some(t) = Utc.timestamp_opt(unix_seconds, 0).single() {
            self.0.set(t);
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.0.get()
    }

    fn utc_offset(&self) -> i32 {
        0
    }
}

/// A session on a directly opened device wired to the given fakes.
pub fn direct_session(stream: &FakeStream, line: &FakeLine, clock: &ManualClock) -> MonitorSession {
    MonitorSession::new(
        "/dev/ttyUSB0",
        PacketSource::new(Box::new(stream.clone())),
        Transport::Direct(Box::new(line.clone())),
    )
    .with_clock(Box::new(clock.clone()))
}

/// A session attached through the daemon, with `control` as its control
/// socket.
pub fn proxied_session(stream: &FakeStream, control: &FakeControl, clock: &ManualClock) -> MonitorSession {
    MonitorSession::new(
        "/dev/ttyUSB0",
        PacketSource::new(Box::new(stream.clone())),
        Transport::Proxied {
            control: Some(Box::new(control.clone())),
            device: "/dev/ttyUSB0".into(),
        },
    )
    .with_clock(Box::new(clock.clone()))
}
