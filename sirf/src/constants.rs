pub const SIRF_SYNC_CHAR_1: u8 = 0xa0;
pub const SIRF_SYNC_CHAR_2: u8 = 0xa2;
pub const SIRF_END_CHAR_1: u8 = 0xb0;
pub const SIRF_END_CHAR_2: u8 = 0xb3;
pub(crate) const SIRF_HEADER_LEN: usize = 4; // sync (2) + payload length (2)
pub(crate) const SIRF_TRAILER_LEN: usize = 4; // checksum (2) + end chars (2)
pub const SIRF_FRAMING_LEN: usize = SIRF_HEADER_LEN + SIRF_TRAILER_LEN;
pub(crate) const SIRF_LENGTH_MASK: u16 = 0x7fff;
pub(crate) const SIRF_CHECKSUM_MASK: u16 = 0x7fff;

/// Largest payload a SiRF frame may carry.
pub const MAX_PAYLOAD_LEN: usize = 1023;

/// Number of receiver channels reported by SiRF chipsets.
pub const CHANNELS: usize = 12;

pub const NMEA_SYNC_CHAR: u8 = b'$';
pub const NMEA_END_CHAR: u8 = b'\n';
pub(crate) const NMEA_MAX_SENTENCE_LENGTH: usize = 82;

pub const UBX_SYNC_CHAR_1: u8 = 0xb5;
pub const UBX_SYNC_CHAR_2: u8 = 0x62;
pub(crate) const UBX_HEADER_LEN: usize = 6; // sync (2) + class (1) + id (1) + length (2)
pub(crate) const UBX_CHECKSUM_LEN: usize = 2;
pub(crate) const UBX_MAX_PAYLOAD_LEN: usize = 1240;
