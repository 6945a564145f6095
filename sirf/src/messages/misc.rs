use super::{Field, FieldValue};
use crate::{bits::Fields, constants::CHANNELS, time::GpsTime};

/// Clock status data, MID 7
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ClockStatus {
    pub time: GpsTime,
    pub svs: u8,
    /// Hz
    pub drift: u32,
    /// ns
    pub bias: u32,
    /// Estimated GPS time, ms
    pub estimated_time: u32,
}

impl ClockStatus {
    pub(crate) fn decode(f: &Fields<'_>) -> Self {
        Self {
            time: GpsTime::new(f.be_u16(1), f.be_i32(3)),
            svs: f.u8(7),
            drift: f.be_u32(8),
            bias: f.be_u32(12),
            estimated_time: f.be_u32(16),
        }
    }

    pub(crate) fn fields(&self) -> Vec<Field> {
        vec![
            Field::new("week", FieldValue::UInt(self.time.week.into())),
            Field::new("tow", FieldValue::Fixed(self.time.tow_seconds())),
            Field::new("svs", FieldValue::UInt(self.svs.into())),
            Field::new("drift", FieldValue::UInt(self.drift.into())),
            Field::new("bias", FieldValue::UInt(self.bias.into())),
            Field::new("estimated_time", FieldValue::UInt(self.estimated_time.into())),
        ]
    }
}

/// Throughput, MID 9
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Throughput {
    pub seg_stat_max: f64,
    pub seg_stat_lat: f64,
    pub seg_stat_time: f64,
    pub last_millisecond: u16,
}

impl Throughput {
    pub(crate) fn decode(f: &Fields<'_>) -> Self {
        let seg = |off| f64::from(f.be_u16(off)) / 186.0;
        Self {
            seg_stat_max: seg(1),
            seg_stat_lat: seg(3),
            seg_stat_time: seg(5),
            last_millisecond: f.be_u16(7),
        }
    }

    pub(crate) fn fields(&self) -> Vec<Field> {
        vec![
            Field::new("seg_stat_max", FieldValue::Fixed(self.seg_stat_max)),
            Field::new("seg_stat_lat", FieldValue::Fixed(self.seg_stat_lat)),
            Field::new("seg_stat_time", FieldValue::Fixed(self.seg_stat_time)),
            Field::new("last_millisecond", FieldValue::UInt(self.last_millisecond.into())),
        ]
    }
}

/// Visible list, MID 13
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct VisibleList {
    /// Count as reported; may exceed `svs.len()`
    pub count: u8,
    pub svs: Vec<u8>,
}

impl VisibleList {
    pub(crate) fn decode(f: &Fields<'_>) -> Self {
        let count = f.u8(1);
        let shown = usize::from(count).min(CHANNELS);
        Self {
            count,
            svs: (0..shown).map(|i| f.u8(2 + 5 * i)).collect(),
        }
    }

    pub(crate) fn fields(&self) -> Vec<Field> {
        let mut fields = vec![Field::new("count", FieldValue::UInt(self.count.into()))];
        fields.extend(
            self.svs
                .iter()
                .map(|&sv| Field::new("sv", FieldValue::UInt(sv.into()))),
        );
        fields
    }
}

const DGPS_SOURCES: [&str; 5] = ["None", "SBAS", "Serial", "Beacon", "Software"];

/// DGPS status, MID 27
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DgpsStatus {
    pub source: u8,
    /// Occupied correction slots out of [`CHANNELS`]
    pub corrections: usize,
}

impl DgpsStatus {
    pub(crate) fn decode(f: &Fields<'_>) -> Self {
        Self {
            source: f.u8(1),
            corrections: (0..CHANNELS).filter(|i| f.u8(16 + 3 * i) != 0).count(),
        }
    }

    pub fn source_name(&self) -> &'static str {
        DGPS_SOURCES
            .get(usize::from(self.source))
            .copied()
            .unwrap_or("?")
    }

    pub(crate) fn fields(&self) -> Vec<Field> {
        vec![
            Field::new("source", FieldValue::UInt(self.source.into())),
            Field::new("source_name", FieldValue::Text(self.source_name().into())),
            Field::new("corrections", FieldValue::UInt(self.corrections as u64)),
        ]
    }
}

/// Chatter the receiver's development output repeats constantly.
const NOISY_PREFIXES: [&str; 7] = [
    "#Time:",
    "@R Time:",
    "CSTD: New almanac for",
    "NOTICE: DOP Q Boost",
    "RTC not set",
    "numOfSVs = 0",
    "rtcaj tow ",
];

/// Text of a development data message with trailing newlines, then
/// trailing spaces removed; `None` for the well known noisy lines.
pub fn development_text(payload: &[u8]) -> Option<String> {
    let mut text = Fields::new(payload).c_str(1);
    while let [rest @ .., b'\n'] = text {
        text = rest;
    }
    while let [rest @ .., b' '] = text {
        text = rest;
    }
    if NOISY_PREFIXES.iter().any(|p| text.starts_with(p.as_bytes())) {
        return None;
    }
    Some(String::from_utf8_lossy(text).into_owned())
}
