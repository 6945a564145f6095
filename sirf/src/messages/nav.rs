//! Measured navigation (MID 2) and measured tracking (MID 4) data.

use bitflags::bitflags;

use super::{Field, FieldValue, SatelliteFixSummary};
use crate::{
    bits::Fields,
    constants::CHANNELS,
    ecef::{ecef_to_geodetic, GeoidModel, Geodetic},
    time::GpsTime,
};

bitflags! {
    /// Mode 1 byte of the navigation solution, above the position mode bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize))]
    pub struct NavMode1: u8 {
        /// Trickle power solution
        const TRICKLE_POWER = 0x08;
        /// Altitude held from the Kalman filter
        const ALT_HOLD_FILTER = 0x10;
        /// Altitude held from user input
        const ALT_HOLD_USER = 0x20;
        const DOP_MASK_EXCEEDED = 0x40;
        const DGPS_USED = 0x80;

        const _ = !0;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum PositionMode {
    NoNavigation,
    OneSv,
    TwoSv,
    ThreeSv,
    FourOrMoreSv,
    TwoDLeastSquares,
    ThreeDLeastSquares,
    DeadReckoning,
}

impl NavMode1 {
    pub fn position_mode(self) -> PositionMode {
        match self.bits() & 0x07 {
            0 => PositionMode::NoNavigation,
            1 => PositionMode::OneSv,
            2 => PositionMode::TwoSv,
            3 => PositionMode::ThreeSv,
            4 => PositionMode::FourOrMoreSv,
            5 => PositionMode::TwoDLeastSquares,
            6 => PositionMode::ThreeDLeastSquares,
            _ => PositionMode::DeadReckoning,
        }
    }
}

/// Measured navigation data, MID 2
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct NavigationData {
    /// ECEF position, metres
    pub position: [i32; 3],
    /// ECEF velocity, m/s
    pub velocity: [f64; 3],
    pub mode1: NavMode1,
    pub hdop: f64,
    pub mode2: u8,
    pub time: GpsTime,
    /// Satellite count reported by the receiver
    pub in_fix: u8,
    /// Satellites used, at most [`CHANNELS`]
    pub prns: Vec<u8>,
    pub geodetic: Geodetic,
}

impl NavigationData {
    pub(crate) fn decode<G: GeoidModel + ?Sized>(f: &Fields<'_>, geoid: &G) -> Self {
        let position = [f.be_i32(1), f.be_i32(5), f.be_i32(9)];
        let velocity = [
            f64::from(f.be_i16(13)) / 8.0,
            f64::from(f.be_i16(15)) / 8.0,
            f64::from(f.be_i16(17)) / 8.0,
        ];
        let in_fix = f.u8(28);
        let used = usize::from(in_fix).min(CHANNELS);
        let prns = (0..used).map(|i| f.u8(29 + i)).collect();
        let geodetic = ecef_to_geodetic(position.map(f64::from), velocity, geoid);

        Self {
            position,
            velocity,
            mode1: NavMode1::from_bits_retain(f.u8(19)),
            hdop: f64::from(f.u8(20)) / 5.0,
            mode2: f.u8(21),
            time: GpsTime::new(f.be_u16(22), f.be_i32(24)),
            in_fix,
            prns,
            geodetic,
        }
    }

    pub(crate) fn fields(&self) -> Vec<Field> {
        let [x, y, z] = self.position;
        let [vx, vy, vz] = self.velocity;
        let g = &self.geodetic;
        vec![
            Field::new("x", FieldValue::Int(x.into())),
            Field::new("y", FieldValue::Int(y.into())),
            Field::new("z", FieldValue::Int(z.into())),
            Field::new("vx", FieldValue::Fixed(vx)),
            Field::new("vy", FieldValue::Fixed(vy)),
            Field::new("vz", FieldValue::Fixed(vz)),
            Field::new("latitude", FieldValue::Fixed(g.latitude)),
            Field::new("longitude", FieldValue::Fixed(g.longitude)),
            Field::new("altitude", FieldValue::Fixed(g.altitude)),
            Field::new("vel_north", FieldValue::Fixed(g.vel_north)),
            Field::new("vel_east", FieldValue::Fixed(g.vel_east)),
            Field::new("vel_up", FieldValue::Fixed(g.vel_up)),
            Field::new("heading", FieldValue::Fixed(g.heading.to_degrees())),
            Field::new("speed", FieldValue::Fixed(g.speed)),
            Field::new("week", FieldValue::UInt(self.time.week.into())),
            Field::new("tow", FieldValue::Fixed(self.time.tow_seconds())),
            Field::new("hdop", FieldValue::Fixed(self.hdop)),
            Field::new("mode1", FieldValue::UInt(self.mode1.bits().into())),
            Field::new("mode2", FieldValue::UInt(self.mode2.into())),
            Field::new("in_fix", FieldValue::UInt(self.in_fix.into())),
            Field::new(
                "prns",
                FieldValue::Text(
                    self.prns
                        .iter()
                        .map(|p| p.to_string())
                        .collect::<Vec<_>>()
                        .join(" "),
                ),
            ),
        ]
    }
}

/// How a tracked satellite relates to the current fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum TrackStatus {
    /// Used in the navigation solution
    InFix,
    /// Fully locked (state word `0x00bf`) but not in the solution
    Tracked,
    Idle,
}

impl TrackStatus {
    pub fn as_char(self) -> char {
        match self {
            TrackStatus::InFix => 'N',
            TrackStatus::Tracked => 'T',
            TrackStatus::Idle => ' ',
        }
    }
}

const STATE_FULL_LOCK: u16 = 0x00bf;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ChannelTrack {
    pub sv: u8,
    /// Degrees
    pub azimuth: u16,
    /// Degrees
    pub elevation: u8,
    pub state: u16,
    /// Mean C/N0 over the last ten measurements, dB-Hz
    pub cn0: f64,
    pub status: TrackStatus,
}

/// Measured tracking data, MID 4
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TrackingData {
    pub time: GpsTime,
    pub channels: Vec<ChannelTrack>,
}

impl TrackingData {
    pub(crate) fn decode(f: &Fields<'_>, fix: &SatelliteFixSummary) -> Self {
        let count = usize::from(f.u8(7)).min(CHANNELS);
        let channels = (0..count)
            .map(|i| {
                let off = 8 + 15 * i;
                let sv = f.u8(off);
                let state = f.be_u16(off + 3);
                let cn_sum: u32 = (0..10).map(|j| u32::from(f.u8(off + 5 + j))).sum();
                let status = if fix.contains(sv) {
                    TrackStatus::InFix
                } else if state == STATE_FULL_LOCK {
                    TrackStatus::Tracked
                } else {
                    TrackStatus::Idle
                };
                ChannelTrack {
                    sv,
                    azimuth: u16::from(f.u8(off + 1)) * 3 / 2,
                    elevation: f.u8(off + 2) / 2,
                    state,
                    cn0: f64::from(cn_sum) / 10.0,
                    status,
                }
            })
            .collect();

        Self {
            time: GpsTime::new(f.be_u16(1), f.be_i32(3)),
            channels,
        }
    }

    pub(crate) fn fields(&self) -> Vec<Field> {
        let mut fields = vec![
            Field::new("week", FieldValue::UInt(self.time.week.into())),
            Field::new("tow", FieldValue::Fixed(self.time.tow_seconds())),
            Field::new("channels", FieldValue::UInt(self.channels.len() as u64)),
        ];
        for ch in &self.channels {
            fields.push(Field::new("sv", FieldValue::UInt(ch.sv.into())));
            fields.push(Field::new("azimuth", FieldValue::UInt(ch.azimuth.into())));
            fields.push(Field::new("elevation", FieldValue::UInt(ch.elevation.into())));
            fields.push(Field::new("state", FieldValue::UInt(ch.state.into())));
            fields.push(Field::new("cn0", FieldValue::Fixed(ch.cn0)));
            fields.push(Field::new("status", FieldValue::Char(ch.status.as_char())));
        }
        fields
    }
}
