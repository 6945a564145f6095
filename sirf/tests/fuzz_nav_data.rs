//! A proptest generator for SiRF measured navigation data (MID 2) frames.
//!
//! Payloads are serialized field by field with `byteorder`, framed with the
//! SiRF lead-in, length, checksum and trailer, pushed through the parser
//! and decoded.

use byteorder::{BigEndian, WriteBytesExt};
use proptest::prelude::*;
use sirf::{geodetic_to_ecef, Decoder, Ellipsoid, Message, Packet, Parser, CHANNELS};

#[derive(Debug, Clone)]
pub struct NavPayload {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub vx: i16,
    pub vy: i16,
    pub vz: i16,
    pub mode1: u8,
    pub hdop: u8,
    pub mode2: u8,
    pub week: u16,
    pub tow: u32,
    pub prns: Vec<u8>,
}

impl NavPayload {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut wtr = Vec::with_capacity(41);
        wtr.write_u8(0x02).unwrap();
        wtr.write_i32::<BigEndian>(self.x).unwrap();
        wtr.write_i32::<BigEndian>(self.y).unwrap();
        wtr.write_i32::<BigEndian>(self.z).unwrap();
        wtr.write_i16::<BigEndian>(self.vx).unwrap();
        wtr.write_i16::<BigEndian>(self.vy).unwrap();
        wtr.write_i16::<BigEndian>(self.vz).unwrap();
        wtr.write_u8(self.mode1).unwrap();
        wtr.write_u8(self.hdop).unwrap();
        wtr.write_u8(self.mode2).unwrap();
        wtr.write_u16::<BigEndian>(self.week).unwrap();
        wtr.write_u32::<BigEndian>(self.tow).unwrap();
        wtr.write_u8(self.prns.len() as u8).unwrap();
        for i in 0..CHANNELS {
            wtr.write_u8(self.prns.get(i).copied().unwrap_or(0)).unwrap();
        }
        wtr
    }
}

fn sirf_frame(payload: &[u8]) -> Vec<u8> {
    let sum = payload.iter().fold(0u16, |s, &b| s.wrapping_add(b.into())) & 0x7fff;
    let mut frame = vec![0xa0, 0xa2];
    frame.write_u16::<BigEndian>(payload.len() as u16).unwrap();
    frame.extend_from_slice(payload);
    frame.write_u16::<BigEndian>(sum).unwrap();
    frame.extend_from_slice(&[0xb0, 0xb3]);
    frame
}

fn nav_payload_strategy() -> impl Strategy<Value = NavPayload> {
    (
        (-90.0f64..90.0, -180.0f64..180.0, -500.0f64..9000.0),
        (any::<i16>(), any::<i16>(), any::<i16>()),
        (any::<u8>(), any::<u8>(), any::<u8>()),
        (any::<u16>(), 0u32..60_480_000),
        prop::collection::vec(1u8..=32, 0..=CHANNELS),
    )
        .prop_map(|((lat, lon, h), (vx, vy, vz), (mode1, hdop, mode2), (week, tow), prns)| {
            let [x, y, z] = geodetic_to_ecef(lat, lon, h);
            NavPayload {
                x: x.round() as i32,
                y: y.round() as i32,
                z: z.round() as i32,
                vx,
                vy,
                vz,
                mode1,
                hdop,
                mode2,
                week,
                tow,
                prns,
            }
        })
}

proptest! {
    #[test]
    fn generated_navigation_frames_decode(expected in nav_payload_strategy()) {
        let frame = sirf_frame(&expected.to_bytes());
        let mut parser = Parser::default();
        let mut decoder = Decoder::<Ellipsoid>::default();
        let mut it = parser.consume(&frame);

        let Some(Ok(Packet::Sirf(raw))) = it.next() else {
            panic!("Parser failed to frame a valid MID 2 packet");
        };
        let decoded = decoder.decode(raw);
        prop_assert!(!decoded.truncated);
        prop_assert_eq!(decoded.len, frame.len());

        let Message::Navigation(nav) = &decoded.message else {
            panic!("not decoded as navigation data");
        };
        prop_assert_eq!(nav.position, [expected.x, expected.y, expected.z]);
        prop_assert_eq!(nav.velocity[0], f64::from(expected.vx) / 8.0);
        prop_assert_eq!(nav.velocity[2], f64::from(expected.vz) / 8.0);
        prop_assert_eq!(nav.mode1.bits(), expected.mode1);
        prop_assert_eq!(nav.hdop, f64::from(expected.hdop) / 5.0);
        prop_assert_eq!(nav.mode2, expected.mode2);
        prop_assert_eq!(nav.time.week, expected.week);
        prop_assert_eq!(nav.time.tow, expected.tow as i32);
        prop_assert_eq!(&nav.prns, &expected.prns);
        prop_assert_eq!(decoder.fix().prns(), &expected.prns[..]);

        let heading = nav.geodetic.heading;
        prop_assert!((0.0..2.0 * std::f64::consts::PI).contains(&heading));
    }
}
