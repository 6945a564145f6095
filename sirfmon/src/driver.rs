use std::io::{self, Write};

use sirf::{
    frame_payload, CommandBuilder, EncodeError, Parity, PsrfSetSerialPort, SetSerialPort,
};
use tracing::debug;

/// The part of a device family that knows how bytes go out on the wire.
pub trait ProtocolDriver {
    fn name(&self) -> &'static str;

    /// Wraps a control message payload into a complete frame.
    fn frame(&self, payload: &[u8]) -> Result<Vec<u8>, EncodeError>;

    /// Writes an already framed control message, returning the bytes written.
    fn control_send(&self, writer: &mut dyn Write, frame: &[u8]) -> io::Result<usize> {
        writer.write_all(frame)?;
        writer.flush()?;
        Ok(frame.len())
    }

    /// Request asking the receiver to change its line settings.
    fn speed_switch(&self, _baud: u32, _parity: Parity, _stop_bits: u8) -> io::Result<Vec<u8>> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            format!("{} cannot change speed", self.name()),
        ))
    }

    /// Request moving a receiver out of NMEA into this protocol.
    fn mode_switch_to_binary(&self, baud: u32) -> Vec<u8>;
}

/// SiRF binary protocol
#[derive(Debug, Default, Clone, Copy)]
pub struct SirfBinary;

impl ProtocolDriver for SirfBinary {
    fn name(&self) -> &'static str {
        "SiRF binary"
    }

    fn frame(&self, payload: &[u8]) -> Result<Vec<u8>, EncodeError> {
        frame_payload(payload)
    }

    fn speed_switch(&self, baud: u32, parity: Parity, stop_bits: u8) -> io::Result<Vec<u8>> {
        debug!("Switching receiver to {baud} {parity} {stop_bits}");
        Ok(SetSerialPort {
            baud,
            data_bits: 8,
            stop_bits,
            parity,
        }
        .into_packet_bytes())
    }

    fn mode_switch_to_binary(&self, baud: u32) -> Vec<u8> {
        debug!("Asking NMEA receiver for SiRF binary at {baud}");
        PsrfSetSerialPort { baud }.into_sentence()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_payloads() {
        assert_eq!(
            SirfBinary.frame(&[0x84, 0x00]).unwrap(),
            [0xa0, 0xa2, 0x00, 0x02, 0x84, 0x00, 0x00, 0x84, 0xb0, 0xb3]
        );
        assert_eq!(SirfBinary.frame(&[]), Err(EncodeError::Empty));
    }

    #[test]
    fn control_send_writes_whole_frame() {
        let mut out = Vec::new();
        let frame = SirfBinary.frame(&[0x98, 0x00]).unwrap();
        assert_eq!(SirfBinary.control_send(&mut out, &frame).unwrap(), 10);
        assert_eq!(out, frame);
    }

    #[test]
    fn speed_switch_is_set_serial_port() {
        let out = SirfBinary.speed_switch(9600, Parity::None, 1).unwrap();
        assert_eq!(&out[..4], [0xa0, 0xa2, 0x00, 0x09]);
        assert_eq!(&out[4..13], [0x86, 0x00, 0x00, 0x25, 0x80, 8, 1, 0, 0]);
        assert_eq!(&out[out.len() - 2..], [0xb0, 0xb3]);
    }

    #[test]
    fn mode_switch_is_a_psrf_sentence() {
        let out = SirfBinary.mode_switch_to_binary(4800);
        assert!(out.starts_with(b"$PSRF100,0,4800,8,1,0*"));
        assert!(out.ends_with(b"\r\n"));
    }

    struct Mute;

    impl ProtocolDriver for Mute {
        fn name(&self) -> &'static str {
            "mute"
        }

        fn frame(&self, payload: &[u8]) -> Result<Vec<u8>, EncodeError> {
            Ok(payload.to_vec())
        }

        fn mode_switch_to_binary(&self, _baud: u32) -> Vec<u8> {
            Vec::new()
        }
    }

    #[test]
    fn speed_switch_defaults_to_unsupported() {
        let err = Mute.speed_switch(9600, Parity::None, 1).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Unsupported);
    }
}
