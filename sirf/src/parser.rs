mod checksum;

pub use checksum::{nmea_checksum, sirf_checksum};

use crate::{
    constants::{
        MAX_PAYLOAD_LEN, NMEA_END_CHAR, NMEA_MAX_SENTENCE_LENGTH, NMEA_SYNC_CHAR, SIRF_END_CHAR_1,
        SIRF_END_CHAR_2, SIRF_FRAMING_LEN, SIRF_HEADER_LEN, SIRF_LENGTH_MASK, SIRF_SYNC_CHAR_1,
        SIRF_SYNC_CHAR_2, UBX_CHECKSUM_LEN, UBX_HEADER_LEN, UBX_MAX_PAYLOAD_LEN, UBX_SYNC_CHAR_1,
        UBX_SYNC_CHAR_2,
    },
    error::ParserError,
};
use checksum::{validate_nmea, SirfChecksumCalc, UbxChecksumCalc};

/// Wire protocol a framed packet belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketKind {
    Sirf,
    Nmea,
    Ubx,
}

/// One complete, checksum-validated packet, including all of its framing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Packet<'a> {
    /// `A0 A2` .. `B0 B3`
    Sirf(&'a [u8]),
    /// `$` .. `\n`
    Nmea(&'a [u8]),
    /// `B5 62` .. checksum
    Ubx(&'a [u8]),
}

impl<'a> Packet<'a> {
    fn new(kind: PacketKind, bytes: &'a [u8]) -> Self {
        match kind {
            PacketKind::Sirf => Packet::Sirf(bytes),
            PacketKind::Nmea => Packet::Nmea(bytes),
            PacketKind::Ubx => Packet::Ubx(bytes),
        }
    }

    pub fn kind(&self) -> PacketKind {
        match self {
            Packet::Sirf(_) => PacketKind::Sirf,
            Packet::Nmea(_) => PacketKind::Nmea,
            Packet::Ubx(_) => PacketKind::Ubx,
        }
    }

    pub fn bytes(&self) -> &'a [u8] {
        match *self {
            Packet::Sirf(b) | Packet::Nmea(b) | Packet::Ubx(b) => b,
        }
    }
}

/// Streaming framer for the byte stream coming from a receiver.
///
/// Bytes are handed over with `consume()`; the returned iterator yields
/// every complete packet found so far and keeps any partial packet buffered
/// for the next call. Bytes that cannot start a packet are skipped.
#[derive(Debug, Default)]
pub struct Parser {
    buf: Vec<u8>,
    packet: Vec<u8>,
}

impl Parser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_buffer_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn buffer_len(&self) -> usize {
        self.buf.len()
    }

    pub fn consume<'a>(&'a mut self, new_data: &[u8]) -> ParserIter<'a> {
        self.buf.extend_from_slice(new_data);
        ParserIter { parser: self }
    }
}

/// Iterator over the packets buffered in a [`Parser`]
pub struct ParserIter<'a> {
    parser: &'a mut Parser,
}

fn is_sync(b: u8) -> bool {
    b == SIRF_SYNC_CHAR_1 || b == NMEA_SYNC_CHAR || b == UBX_SYNC_CHAR_1
}

fn is_sentence_char(b: u8) -> bool {
    b.is_ascii_graphic() || b == b' ' || b == b'\r'
}

/// Outcome of looking at the head of the buffer.
enum Scan {
    Found(PacketKind, usize),
    Invalid(ParserError, usize),
    /// Drop this many bytes and look again
    Skip(usize),
    Incomplete,
}

fn scan_sirf(buf: &[u8]) -> Scan {
    if buf.len() < 2 {
        return Scan::Incomplete;
    }
    if buf[1] != SIRF_SYNC_CHAR_2 {
        return Scan::Skip(1);
    }
    if buf.len() < SIRF_HEADER_LEN {
        return Scan::Incomplete;
    }
    let pack_len = usize::from(u16::from_be_bytes([buf[2], buf[3]]) & SIRF_LENGTH_MASK);
    if pack_len > MAX_PAYLOAD_LEN {
        return Scan::Skip(2);
    }
    let total = pack_len + SIRF_FRAMING_LEN;
    if buf.len() < total {
        return Scan::Incomplete;
    }

    let payload = &buf[SIRF_HEADER_LEN..SIRF_HEADER_LEN + pack_len];
    let trailer = &buf[SIRF_HEADER_LEN + pack_len..total];
    let mut checksummer = SirfChecksumCalc::new();
    checksummer.update(payload);
    if let Err(e) = checksummer.validate_result(u16::from_be_bytes([trailer[0], trailer[1]])) {
        return Scan::Invalid(e, 2);
    }
    if trailer[2..] != [SIRF_END_CHAR_1, SIRF_END_CHAR_2] {
        return Scan::Invalid(
            ParserError::InvalidTrailer {
                got: [trailer[2], trailer[3]],
            },
            2,
        );
    }
    Scan::Found(PacketKind::Sirf, total)
}

fn scan_nmea(buf: &[u8]) -> Scan {
    let end = buf
        .iter()
        .skip(1)
        .position(|&b| !is_sentence_char(b))
        .map(|i| i + 1);
    match end {
        Some(i) if buf[i] == NMEA_END_CHAR => {
            let len = i + 1;
            if len > NMEA_MAX_SENTENCE_LENGTH {
                return Scan::Invalid(
                    ParserError::InvalidPacketLen {
                        packet: "NMEA",
                        max: NMEA_MAX_SENTENCE_LENGTH,
                        got: len,
                    },
                    1,
                );
            }
            match validate_nmea(&buf[..len]) {
                Ok(()) => Scan::Found(PacketKind::Nmea, len),
                Err(e) => Scan::Invalid(e, 1),
            }
        },
        // binary data that happened to contain a '$'
        Some(_) => Scan::Skip(1),
        None if buf.len() > NMEA_MAX_SENTENCE_LENGTH => Scan::Skip(1),
        None => Scan::Incomplete,
    }
}

fn scan_ubx(buf: &[u8]) -> Scan {
    if buf.len() < 2 {
        return Scan::Incomplete;
    }
    if buf[1] != UBX_SYNC_CHAR_2 {
        return Scan::Skip(1);
    }
    if buf.len() < UBX_HEADER_LEN {
        return Scan::Incomplete;
    }
    let pack_len = usize::from(u16::from_le_bytes([buf[4], buf[5]]));
    if pack_len > UBX_MAX_PAYLOAD_LEN {
        return Scan::Skip(2);
    }
    let total = UBX_HEADER_LEN + pack_len + UBX_CHECKSUM_LEN;
    if buf.len() < total {
        return Scan::Incomplete;
    }
    let mut checksummer = UbxChecksumCalc::new();
    checksummer.update(&buf[2..UBX_HEADER_LEN + pack_len]);
    match checksummer.validate_result(buf[total - 2], buf[total - 1]) {
        Ok(()) => Scan::Found(PacketKind::Ubx, total),
        Err(e) => Scan::Invalid(e, 2),
    }
}

impl ParserIter<'_> {
    fn advance(&mut self) -> Option<Result<PacketKind, ParserError>> {
        let buf = &mut self.parser.buf;
        loop {
            match buf.iter().position(|&b| is_sync(b)) {
                Some(pos) => {
                    buf.drain(..pos);
                },
                None => {
                    buf.clear();
                    return None;
                },
            }

            let scan = match buf[0] {
                SIRF_SYNC_CHAR_1 => scan_sirf(buf),
                UBX_SYNC_CHAR_1 => scan_ubx(buf),
                _ => scan_nmea(buf),
            };
            match scan {
                Scan::Found(kind, len) => {
                    self.parser.packet.clear();
                    self.parser.packet.extend(buf.drain(..len));
                    return Some(Ok(kind));
                },
                Scan::Invalid(err, skip) => {
                    buf.drain(..skip);
                    return Some(Err(err));
                },
                Scan::Skip(skip) => {
                    buf.drain(..skip);
                },
                Scan::Incomplete => return None,
            }
        }
    }

    #[allow(clippy::should_implement_trait)]
    /// Analog of `core::iter::Iterator::next`; the packet borrows from the
    /// parser, so this cannot be a real `Iterator`.
    pub fn next(&mut self) -> Option<Result<Packet<'_>, ParserError>> {
        match self.advance()? {
            Ok(kind) => Some(Ok(Packet::new(kind, &self.parser.packet))),
            Err(e) => Some(Err(e)),
        }
    }
}
