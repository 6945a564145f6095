use std::fmt;

/// Error that possible during packets parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParserError {
    InvalidChecksum {
        expect: u16,
        got: u16,
    },
    InvalidTrailer {
        got: [u8; 2],
    },
    InvalidPacketLen {
        packet: &'static str,
        max: usize,
        got: usize,
    },
}

impl fmt::Display for ParserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParserError::InvalidChecksum { expect, got } => write!(
                f,
                "Not valid packet's checksum, expect {:x}, got {:x}",
                expect, got
            ),
            ParserError::InvalidTrailer { got } => write!(
                f,
                "Not valid packet's trailer, got {:02x} {:02x}",
                got[0], got[1]
            ),
            ParserError::InvalidPacketLen { packet, max, got } => write!(
                f,
                "Invalid packet({}) length, max {}, got {}",
                packet, max, got
            ),
        }
    }
}

impl std::error::Error for ParserError {}

/// Error raised while building an outbound control message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeError {
    /// The message would not fit in a single SiRF frame.
    TooLong { max: usize, got: usize },
    /// A frame needs at least the message id.
    Empty,
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeError::TooLong { max, got } => write!(
                f,
                "Control message too long, max {} bytes, got {}",
                max, got
            ),
            EncodeError::Empty => f.write_str("Control message is empty"),
        }
    }
}

impl std::error::Error for EncodeError {}
