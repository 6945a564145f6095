//! Input messages sent to the receiver.
//!
//! Every builder turns into a [`ControlMessage`], the bare payload, or
//! straight into the framed bytes ready for the wire:
//! ```
//! use sirf::{CommandBuilder, SetMessageRate};
//!
//! let packet = SetMessageRate { message_id: 4, rate: 5 }.into_packet_bytes();
//! assert_eq!(&packet[..6], &[0xa0, 0xa2, 0x00, 0x08, 0xa6, 0x00]);
//! ```

use core::fmt;

use crate::{
    bits::{put_be_u16, put_be_u32, put_u8},
    constants::{
        CHANNELS, MAX_PAYLOAD_LEN, SIRF_END_CHAR_1, SIRF_END_CHAR_2, SIRF_FRAMING_LEN,
        SIRF_SYNC_CHAR_1, SIRF_SYNC_CHAR_2,
    },
    error::EncodeError,
    parser::{nmea_checksum, sirf_checksum},
};

/// Payload of one outbound SiRF message, message id first.
///
/// Never empty and never longer than [`MAX_PAYLOAD_LEN`]; anything that
/// would break either bound is refused rather than truncated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlMessage {
    bytes: Vec<u8>,
}

impl ControlMessage {
    pub const CAPACITY: usize = MAX_PAYLOAD_LEN;

    fn check_len(len: usize) -> Result<(), EncodeError> {
        if len == 0 {
            Err(EncodeError::Empty)
        } else if len > Self::CAPACITY {
            Err(EncodeError::TooLong {
                max: Self::CAPACITY,
                got: len,
            })
        } else {
            Ok(())
        }
    }

    /// `len` zero bytes, to be filled with the setters.
    pub fn zeroed(len: usize) -> Result<Self, EncodeError> {
        Self::check_len(len)?;
        Ok(Self {
            bytes: vec![0; len],
        })
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, EncodeError> {
        Self::check_len(bytes.len())?;
        Ok(Self {
            bytes: bytes.to_vec(),
        })
    }

    fn fixed<const N: usize>(bytes: [u8; N]) -> Self {
        const {
            assert!(N > 0 && N <= MAX_PAYLOAD_LEN);
        }
        Self {
            bytes: bytes.to_vec(),
        }
    }

    pub fn push_u8(&mut self, value: u8) -> Result<(), EncodeError> {
        Self::check_len(self.bytes.len() + 1)?;
        self.bytes.push(value);
        Ok(())
    }

    /// Overwrites one byte; `false` if `off` is past the end.
    pub fn set_u8(&mut self, off: usize, value: u8) -> bool {
        put_u8(&mut self.bytes, off, value)
    }

    pub fn set_be_u16(&mut self, off: usize, value: u16) -> bool {
        put_be_u16(&mut self.bytes, off, value)
    }

    pub fn set_be_u32(&mut self, off: usize, value: u32) -> bool {
        put_be_u32(&mut self.bytes, off, value)
    }

    pub fn id(&self) -> u8 {
        self.bytes[0]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Wraps the payload in `A0 A2`, length, checksum and `B0 B3`.
    pub fn into_packet_bytes(self) -> Vec<u8> {
        frame(&self.bytes)
    }
}

impl AsRef<[u8]> for ControlMessage {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

fn frame(payload: &[u8]) -> Vec<u8> {
    let len = payload.len() as u16;
    let mut out = Vec::with_capacity(payload.len() + SIRF_FRAMING_LEN);
    out.extend_from_slice(&[SIRF_SYNC_CHAR_1, SIRF_SYNC_CHAR_2]);
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(payload);
    out.extend_from_slice(&sirf_checksum(payload).to_be_bytes());
    out.extend_from_slice(&[SIRF_END_CHAR_1, SIRF_END_CHAR_2]);
    out
}

/// Frames an arbitrary payload, refusing ones no SiRF frame can carry.
pub fn frame_payload(payload: &[u8]) -> Result<Vec<u8>, EncodeError> {
    ControlMessage::check_len(payload.len())?;
    Ok(frame(payload))
}

/// Common conversions of the message builders below.
pub trait CommandBuilder: Sized {
    fn into_payload(self) -> ControlMessage;

    fn into_packet_bytes(self) -> Vec<u8> {
        self.into_payload().into_packet_bytes()
    }
}

/// Poll software version, MID 132
#[derive(Debug, Default, Clone, Copy)]
pub struct PollSoftwareVersion;

impl CommandBuilder for PollSoftwareVersion {
    fn into_payload(self) -> ControlMessage {
        ControlMessage::fixed([0x84, 0x00])
    }
}

/// Poll navigation parameters, MID 152. Answered by MID 19.
#[derive(Debug, Default, Clone, Copy)]
pub struct PollNavigationParameters;

impl CommandBuilder for PollNavigationParameters {
    fn into_payload(self) -> ControlMessage {
        ControlMessage::fixed([0x98, 0x00])
    }
}

const RESET_ENABLE_RAW_TRACK: u8 = 0x10;

/// Initialize data source, MID 128, without position or clock hints.
///
/// Only used to switch the 50 bps subframe and development output on or
/// off; the receiver keeps its navigation state.
#[derive(Debug, Clone, Copy)]
pub struct InitializeDataSource {
    pub enable_subframes: bool,
}

impl CommandBuilder for InitializeDataSource {
    fn into_payload(self) -> ControlMessage {
        let mut bytes = [0u8; 25];
        bytes[0] = 0x80;
        bytes[23] = CHANNELS as u8;
        bytes[24] = if self.enable_subframes {
            RESET_ENABLE_RAW_TRACK
        } else {
            0
        };
        ControlMessage::fixed(bytes)
    }
}

/// Static navigation, MID 143
#[derive(Debug, Clone, Copy)]
pub struct SetStaticNavigation {
    pub flag: u8,
}

impl CommandBuilder for SetStaticNavigation {
    fn into_payload(self) -> ControlMessage {
        ControlMessage::fixed([0x8f, self.flag])
    }
}

/// Set message rate, MID 166, for a single output message.
#[derive(Debug, Clone, Copy)]
pub struct SetMessageRate {
    pub message_id: u8,
    /// Seconds between messages, 0 turns the message off
    pub rate: u8,
}

impl CommandBuilder for SetMessageRate {
    fn into_payload(self) -> ControlMessage {
        ControlMessage::fixed([0xa6, 0x00, self.message_id, self.rate, 0, 0, 0, 0])
    }
}

/// Rate and checksum flag of one NMEA sentence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentenceRate {
    pub rate: u8,
    pub checksum: bool,
}

impl SentenceRate {
    pub const fn every(rate: u8) -> Self {
        Self {
            rate,
            checksum: true,
        }
    }

    const UNUSED: Self = Self {
        rate: 0,
        checksum: true,
    };
}

/// Switch to NMEA protocol, MID 129
#[derive(Debug, Clone, Copy)]
pub struct SwitchToNmea {
    pub gga: SentenceRate,
    pub gll: SentenceRate,
    pub gsa: SentenceRate,
    pub gsv: SentenceRate,
    pub rmc: SentenceRate,
    pub vtg: SentenceRate,
    pub baud: u16,
}

impl SwitchToNmea {
    /// GSV every five seconds, the rest every second.
    pub fn new(baud: u16) -> Self {
        Self {
            gga: SentenceRate::every(1),
            gll: SentenceRate::every(1),
            gsa: SentenceRate::every(1),
            gsv: SentenceRate::every(5),
            rmc: SentenceRate::every(1),
            vtg: SentenceRate::every(1),
            baud,
        }
    }
}

impl CommandBuilder for SwitchToNmea {
    fn into_payload(self) -> ControlMessage {
        let mut bytes = [0u8; 24];
        bytes[0] = 0x81;
        // mode: keep the current debug setting
        bytes[1] = 0x02;
        let rates = [
            self.gga,
            self.gll,
            self.gsa,
            self.gsv,
            self.rmc,
            self.vtg,
            SentenceRate::UNUSED,
            SentenceRate::UNUSED,
            SentenceRate::UNUSED,
            SentenceRate::UNUSED,
        ];
        for (i, r) in rates.iter().enumerate() {
            bytes[2 + 2 * i] = r.rate;
            bytes[3 + 2 * i] = u8::from(r.checksum);
        }
        bytes[22..24].copy_from_slice(&self.baud.to_be_bytes());
        ControlMessage::fixed(bytes)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    #[default]
    None = 0,
    Odd = 1,
    Even = 2,
}

impl Parity {
    pub fn as_char(self) -> char {
        match self {
            Parity::None => 'N',
            Parity::Odd => 'O',
            Parity::Even => 'E',
        }
    }
}

impl fmt::Display for Parity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Set main serial port, MID 134
#[derive(Debug, Clone, Copy)]
pub struct SetSerialPort {
    pub baud: u32,
    pub data_bits: u8,
    pub stop_bits: u8,
    pub parity: Parity,
}

impl CommandBuilder for SetSerialPort {
    fn into_payload(self) -> ControlMessage {
        let mut bytes = [0u8; 9];
        bytes[0] = 0x86;
        bytes[1..5].copy_from_slice(&self.baud.to_be_bytes());
        bytes[5] = self.data_bits;
        bytes[6] = self.stop_bits;
        bytes[7] = self.parity as u8;
        ControlMessage::fixed(bytes)
    }
}

/// `$PSRF100`: tells a receiver speaking NMEA to switch to SiRF binary.
#[derive(Debug, Clone, Copy)]
pub struct PsrfSetSerialPort {
    pub baud: u32,
}

impl PsrfSetSerialPort {
    pub fn into_sentence(self) -> Vec<u8> {
        let body = format!("PSRF100,0,{},8,1,0", self.baud);
        format!("${}*{:02X}\r\n", body, nmea_checksum(body.as_bytes())).into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn polls() {
        assert_eq!(
            PollSoftwareVersion.into_packet_bytes(),
            [0xa0, 0xa2, 0x00, 0x02, 0x84, 0x00, 0x00, 0x84, 0xb0, 0xb3]
        );
        assert_eq!(
            PollNavigationParameters.into_packet_bytes(),
            [0xa0, 0xa2, 0x00, 0x02, 0x98, 0x00, 0x00, 0x98, 0xb0, 0xb3]
        );
    }

    #[test]
    fn initialize_data_source_toggles_reset_config() {
        let on = InitializeDataSource {
            enable_subframes: true,
        }
        .into_payload();
        assert_eq!(on.len(), 25);
        assert_eq!(on.id(), 0x80);
        assert_eq!(on.as_bytes()[23], 12);
        assert_eq!(on.as_bytes()[24], 0x10);
        let off = InitializeDataSource {
            enable_subframes: false,
        }
        .into_payload();
        assert_eq!(off.as_bytes()[24], 0x00);
        assert!(off.as_bytes()[1..23].iter().all(|&b| b == 0));
    }

    #[test]
    fn message_rate() {
        let p = SetMessageRate {
            message_id: 4,
            rate: 30,
        }
        .into_payload();
        assert_eq!(p.as_bytes(), &[0xa6, 0x00, 0x04, 30, 0, 0, 0, 0]);
    }

    #[test]
    fn switch_to_nmea_layout() {
        let p = SwitchToNmea::new(4800).into_payload();
        assert_eq!(
            p.as_bytes(),
            &[
                0x81, 0x02, 1, 1, 1, 1, 1, 1, 5, 1, 1, 1, 1, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0x12,
                0xc0
            ]
        );
    }

    #[test]
    fn serial_port() {
        let packet = SetSerialPort {
            baud: 38400,
            data_bits: 8,
            stop_bits: 1,
            parity: Parity::None,
        }
        .into_packet_bytes();
        assert_eq!(
            packet,
            [
                0xa0, 0xa2, 0x00, 0x09, 0x86, 0x00, 0x00, 0x96, 0x00, 0x08, 0x01, 0x00, 0x00,
                0x01, 0x25, 0xb0, 0xb3
            ]
        );
    }

    #[test]
    fn psrf100_sentence() {
        assert_eq!(
            PsrfSetSerialPort { baud: 4800 }.into_sentence(),
            b"$PSRF100,0,4800,8,1,0*0F\r\n"
        );
        assert_eq!(
            PsrfSetSerialPort { baud: 38400 }.into_sentence(),
            b"$PSRF100,0,38400,8,1,0*3C\r\n"
        );
    }

    #[test]
    fn control_message_bounds() {
        assert_eq!(ControlMessage::from_slice(&[]), Err(EncodeError::Empty));
        assert!(ControlMessage::zeroed(MAX_PAYLOAD_LEN).is_ok());
        assert_eq!(
            ControlMessage::zeroed(MAX_PAYLOAD_LEN + 1),
            Err(EncodeError::TooLong {
                max: MAX_PAYLOAD_LEN,
                got: MAX_PAYLOAD_LEN + 1
            })
        );
        let mut full = ControlMessage::zeroed(MAX_PAYLOAD_LEN).unwrap();
        assert!(full.push_u8(1).is_err());
        assert_eq!(full.len(), MAX_PAYLOAD_LEN);
        assert!(frame_payload(&[0u8; 2000]).is_err());
    }

    #[test]
    fn setters_stay_in_bounds() {
        let mut msg = ControlMessage::zeroed(4).unwrap();
        assert!(msg.set_u8(0, 0xa6));
        assert!(msg.set_be_u16(2, 0x0102));
        assert!(!msg.set_be_u32(1, 7));
        assert_eq!(msg.as_bytes(), &[0xa6, 0, 1, 2]);
        assert_eq!(msg.into_packet_bytes()[2..4], [0x00, 0x04]);
    }
}
