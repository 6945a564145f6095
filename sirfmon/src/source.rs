//! Framed packets from the receiver's byte stream.

use std::{
    collections::VecDeque,
    io::{self, Read, Write},
    net::TcpStream,
    thread,
    time::{Duration, Instant},
};

use serialport::SerialPort;
use sirf::{PacketKind, Parser};
use tracing::debug;

const READ_CHUNK: usize = 2048;
/// Longest a write waits for a full non-blocking socket to drain
const WRITE_PATIENCE: Duration = Duration::from_secs(1);
const WRITE_RETRY: Duration = Duration::from_millis(1);

/// The receiver's data stream.
pub trait ByteStream: Read + Write {
    /// Bytes that can be read right now without blocking.
    fn pending(&mut self) -> io::Result<usize>;
}

/// A serial device opened directly.
pub struct SerialStream(pub Box<dyn SerialPort>);

impl Read for SerialStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

impl Write for SerialStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl ByteStream for SerialStream {
    fn pending(&mut self) -> io::Result<usize> {
        Ok(self.0.bytes_to_read()? as usize)
    }
}

/// Raw-mode data connection to the daemon, in non-blocking mode.
pub struct DaemonStream(pub TcpStream);

impl Read for DaemonStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

impl Write for DaemonStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl ByteStream for DaemonStream {
    fn pending(&mut self) -> io::Result<usize> {
        let mut peeked = [0u8; READ_CHUNK];
        match self.0.peek(&mut peeked) {
            // a closed connection reads as readable so the read reports it
            Ok(0) => Ok(1),
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(0),
            Err(e) => Err(e),
        }
    }
}

/// Outcome of [`PacketSource::next_packet`]
#[derive(Debug)]
pub enum SourceEvent {
    Packet(PacketKind, Vec<u8>),
    /// Bytes arrived but no packet is complete yet
    Nothing,
    /// The stream is gone; the session cannot continue
    Fatal(io::Error),
}

/// Turns the device stream into complete, checksum-validated frames.
pub struct PacketSource {
    stream: Box<dyn ByteStream>,
    parser: Parser,
    ready: VecDeque<(PacketKind, Vec<u8>)>,
}

impl PacketSource {
    pub fn new(stream: Box<dyn ByteStream>) -> Self {
        Self {
            stream,
            parser: Parser::default(),
            ready: VecDeque::new(),
        }
    }

    /// Whether `next_packet` has anything to work on.
    pub fn readable(&mut self) -> io::Result<bool> {
        if !self.ready.is_empty() {
            return Ok(true);
        }
        Ok(self.stream.pending()? > 0)
    }

    /// Reads what the stream has and returns the oldest complete packet.
    ///
    /// Only call this after [`readable`](Self::readable) said yes; a read
    /// returning no bytes means the stream was closed.
    pub fn next_packet(&mut self) -> SourceEvent {
        if let Some((kind, frame)) = self.ready.pop_front() {
            return SourceEvent::Packet(kind, frame);
        }

        let mut buf = [0u8; READ_CHUNK];
        let nbytes = match self.stream.read(&mut buf) {
            Ok(0) => {
                return SourceEvent::Fatal(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "device stream closed",
                ))
            },
            Ok(n) => n,
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                return SourceEvent::Nothing
            },
            Err(e) => return SourceEvent::Fatal(e),
        };

        let mut it = self.parser.consume(&buf[..nbytes]);
        while let Some(packet) = it.next() {
            match packet {
                Ok(packet) => self
                    .ready
                    .push_back((packet.kind(), packet.bytes().to_vec())),
                Err(e) => debug!("Malformed packet, ignore it; cause {e}"),
            }
        }

        match self.ready.pop_front() {
            Some((kind, frame)) => SourceEvent::Packet(kind, frame),
            None => SourceEvent::Nothing,
        }
    }

    /// Writes straight to the data stream. The stream may be
    /// non-blocking, so a full buffer is waited out for a short while.
    pub fn send_raw(&mut self, bytes: &[u8]) -> io::Result<()> {
        let deadline = Instant::now() + WRITE_PATIENCE;
        let mut rest = bytes;
        while !rest.is_empty() {
            match self.stream.write(rest) {
                Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
                Ok(n) => rest = &rest[n..],
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {},
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    if Instant::now() >= deadline {
                        return Err(e);
                    }
                    thread::sleep(WRITE_RETRY);
                },
                Err(e) => return Err(e),
            }
        }
        self.stream.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeStream;
    use sirf::{CommandBuilder, PollSoftwareVersion};

    #[test]
    fn zero_pending_is_not_readable() {
        let stream = FakeStream::new();
        let mut source = PacketSource::new(Box::new(stream.clone()));
        assert!(!source.readable().unwrap());
        assert_eq!(stream.reads(), 0);
    }

    #[test]
    fn frames_split_over_reads() {
        let stream = FakeStream::new();
        let mut source = PacketSource::new(Box::new(stream.clone()));
        let frame = PollSoftwareVersion.into_packet_bytes();

        stream.feed(&frame[..5]);
        assert!(source.readable().unwrap());
        assert!(matches!(source.next_packet(), SourceEvent::Nothing));

        stream.feed(&frame[5..]);
        match source.next_packet() {
            SourceEvent::Packet(PacketKind::Sirf, got) => assert_eq!(got, frame),
            other => panic!("unexpected {other:?}"),
        }
        assert!(!source.readable().unwrap());
    }

    #[test]
    fn packets_from_one_read_are_queued() {
        let stream = FakeStream::new();
        let mut source = PacketSource::new(Box::new(stream.clone()));
        let frame = PollSoftwareVersion.into_packet_bytes();
        let mut data = frame.clone();
        data.extend_from_slice(b"$GPGGA,1*4B\r\n");
        stream.feed(&data);

        assert!(matches!(source.next_packet(), SourceEvent::Packet(PacketKind::Sirf, _)));
        assert!(source.readable().unwrap());
        assert!(matches!(source.next_packet(), SourceEvent::Packet(PacketKind::Nmea, _)));
        assert_eq!(stream.reads(), 1);
    }

    #[test]
    fn closed_stream_is_fatal() {
        let stream = FakeStream::new();
        stream.close();
        let mut source = PacketSource::new(Box::new(stream.clone()));
        assert!(source.readable().unwrap());
        assert!(matches!(source.next_packet(), SourceEvent::Fatal(_)));
    }

    #[test]
    fn raw_writes_reach_the_stream() {
        let stream = FakeStream::new();
        let mut source = PacketSource::new(Box::new(stream.clone()));
        source.send_raw(b"B=9600\r\n").unwrap();
        assert_eq!(stream.written(), b"B=9600\r\n");
    }

    #[test]
    fn raw_writes_survive_a_full_socket() {
        let stream = FakeStream::new();
        stream.block_writes(3);
        stream.chunk_writes(3);
        let mut source = PacketSource::new(Box::new(stream.clone()));
        source.send_raw(b"B=9600\r\n").unwrap();
        assert_eq!(stream.written(), b"B=9600\r\n");
    }

    #[test]
    fn raw_writes_give_up_on_a_stuck_socket() {
        let stream = FakeStream::new();
        stream.block_writes(usize::MAX);
        let mut source = PacketSource::new(Box::new(stream.clone()));
        let err = source.send_raw(b"B=9600\r\n").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::WouldBlock);
        assert!(stream.written().is_empty());
    }
}
