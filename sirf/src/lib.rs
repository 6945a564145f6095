//! # sirf
//!
//! Decoding and encoding of the binary protocol spoken by SiRF GPS chipsets.
//!
//! Parsing Packets
//! ===============
//!
//! Bytes read from the receiver go into a `Parser` through its `consume()`
//! method. It buffers partial packets between calls and hands out complete,
//! checksum-validated frames through an iterator-like object:
//! ```
//! use sirf::{Packet, Parser, SatelliteFixSummary};
//!
//! let mut parser = Parser::default();
//! let my_raw_data = [0xa0, 0xa2, 0x00, 0x02, 0x84, 0x00, 0x00, 0x84, 0xb0, 0xb3];
//! let mut it = parser.consume(&my_raw_data);
//! loop {
//!     match it.next() {
//!         Some(Ok(Packet::Sirf(frame))) => {
//!             let decoded = sirf::decode(frame, &SatelliteFixSummary::default());
//!             assert_eq!(decoded.id.id(), 0x84);
//!         }
//!         Some(Ok(_)) => {
//!             // NMEA or UBX, the receiver is not in SiRF binary mode
//!         }
//!         Some(Err(_)) => {
//!             // Received a malformed packet
//!         }
//!         None => {
//!             // The internal buffer is now empty
//!             break;
//!         }
//!     }
//! }
//! ```
//!
//! Constructing Packets
//! ====================
//!
//! Control messages are built from their builder structs:
//! ```
//! use sirf::{CommandBuilder, InitializeDataSource};
//!
//! let packet = InitializeDataSource { enable_subframes: true }.into_packet_bytes();
//! assert_eq!(packet.len(), 33);
//! ```

#[cfg(feature = "serde")]
extern crate serde;

pub use crate::{
    commands::{
        frame_payload, CommandBuilder, ControlMessage, InitializeDataSource, Parity,
        PollNavigationParameters, PollSoftwareVersion, PsrfSetSerialPort, SentenceRate,
        SetMessageRate, SetSerialPort, SetStaticNavigation, SwitchToNmea,
    },
    constants::{CHANNELS, MAX_PAYLOAD_LEN, SIRF_FRAMING_LEN},
    ecef::{ecef_to_geodetic, geodetic_to_ecef, Ellipsoid, GeoidModel, Geodetic},
    error::{EncodeError, ParserError},
    messages::{
        decode, decode_with_geoid, DecodedFrame, Decoder, Field, FieldValue, Message, MessageId,
        SatelliteFixSummary,
    },
    parser::{Packet, PacketKind, Parser, ParserIter},
    time::GpsTime,
};

pub mod bits;
pub mod commands;
pub mod constants;
pub mod ecef;
mod error;
pub mod messages;
pub mod parser;
pub mod time;
