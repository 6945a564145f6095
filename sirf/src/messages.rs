//! Decoding of SiRF binary messages into displayable fields.

mod misc;
mod nav;
mod params;

use core::fmt;

pub use misc::{development_text, ClockStatus, DgpsStatus, Throughput, VisibleList};
pub use nav::{ChannelTrack, NavMode1, NavigationData, PositionMode, TrackStatus, TrackingData};
pub use params::NavigationParameters;

use crate::{
    bits::Fields,
    constants::{CHANNELS, SIRF_HEADER_LEN, SIRF_TRAILER_LEN},
    ecef::{Ellipsoid, GeoidModel},
};

/// Output message ids the monitor knows by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum MessageId {
    MeasuredNavigation,
    MeasuredTracking,
    SoftwareVersion,
    ClockStatus,
    Subframe50Bps,
    Throughput,
    CommandAck,
    CommandNak,
    VisibleList,
    NavigationParameters,
    DgpsStatus,
    NavLibMeasurement,
    NavLibDgps,
    NavLibSvState,
    NavLibInitialized,
    GeodeticNavigation,
    SbasParameters,
    PpsTime,
    Development,
    Other(u8),
}

impl From<u8> for MessageId {
    fn from(id: u8) -> Self {
        match id {
            0x02 => MessageId::MeasuredNavigation,
            0x04 => MessageId::MeasuredTracking,
            0x06 => MessageId::SoftwareVersion,
            0x07 => MessageId::ClockStatus,
            0x08 => MessageId::Subframe50Bps,
            0x09 => MessageId::Throughput,
            0x0b => MessageId::CommandAck,
            0x0c => MessageId::CommandNak,
            0x0d => MessageId::VisibleList,
            0x13 => MessageId::NavigationParameters,
            0x1b => MessageId::DgpsStatus,
            0x1c => MessageId::NavLibMeasurement,
            0x1d => MessageId::NavLibDgps,
            0x1e => MessageId::NavLibSvState,
            0x1f => MessageId::NavLibInitialized,
            0x29 => MessageId::GeodeticNavigation,
            0x32 => MessageId::SbasParameters,
            0x34 => MessageId::PpsTime,
            0xff => MessageId::Development,
            other => MessageId::Other(other),
        }
    }
}

impl MessageId {
    pub fn id(self) -> u8 {
        match self {
            MessageId::MeasuredNavigation => 0x02,
            MessageId::MeasuredTracking => 0x04,
            MessageId::SoftwareVersion => 0x06,
            MessageId::ClockStatus => 0x07,
            MessageId::Subframe50Bps => 0x08,
            MessageId::Throughput => 0x09,
            MessageId::CommandAck => 0x0b,
            MessageId::CommandNak => 0x0c,
            MessageId::VisibleList => 0x0d,
            MessageId::NavigationParameters => 0x13,
            MessageId::DgpsStatus => 0x1b,
            MessageId::NavLibMeasurement => 0x1c,
            MessageId::NavLibDgps => 0x1d,
            MessageId::NavLibSvState => 0x1e,
            MessageId::NavLibInitialized => 0x1f,
            MessageId::GeodeticNavigation => 0x29,
            MessageId::SbasParameters => 0x32,
            MessageId::PpsTime => 0x34,
            MessageId::Development => 0xff,
            MessageId::Other(id) => id,
        }
    }

    /// Short name used in the packet trace; empty for unknown ids.
    pub fn label(self) -> &'static str {
        match self {
            MessageId::MeasuredNavigation => "MND",
            MessageId::MeasuredTracking => "MTD",
            MessageId::SoftwareVersion => "FV",
            MessageId::ClockStatus => "CSD",
            MessageId::Subframe50Bps => "50B",
            MessageId::Throughput => "THR",
            MessageId::CommandAck => "ACK",
            MessageId::CommandNak => "NAK",
            MessageId::VisibleList => "VL",
            MessageId::NavigationParameters => "NP",
            MessageId::DgpsStatus => "DST",
            MessageId::NavLibMeasurement => "NLM",
            MessageId::NavLibDgps => "DGP",
            MessageId::NavLibSvState => "SVS",
            MessageId::NavLibInitialized => "NLI",
            MessageId::GeodeticNavigation => "GNM",
            MessageId::SbasParameters => "SBP",
            MessageId::PpsTime => "PPS",
            MessageId::Development => "DD",
            MessageId::Other(_) => "",
        }
    }

    /// Whether seeing this message means the receiver is already
    /// reporting 50 bps subframe data.
    pub fn implies_subframes(self) -> bool {
        matches!(
            self,
            MessageId::Subframe50Bps
                | MessageId::NavLibMeasurement
                | MessageId::NavLibDgps
                | MessageId::NavLibSvState
                | MessageId::NavLibInitialized
        )
    }
}

/// Typed content of a decoded message.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Message {
    Navigation(NavigationData),
    Tracking(TrackingData),
    SoftwareVersion(String),
    Clock(ClockStatus),
    Subframe { channel: u8 },
    Throughput(Throughput),
    Ack { id: u8 },
    Nak { id: u8 },
    VisibleList(VisibleList),
    NavigationParameters(NavigationParameters),
    Dgps(DgpsStatus),
    /// Development text, `None` when it was one of the noisy lines
    Development(Option<String>),
    /// Known message without decoded fields
    Labelled,
    Unknown,
}

/// Value of one decoded field.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum FieldValue {
    Int(i64),
    UInt(u64),
    Fixed(f64),
    Text(String),
    Flag(bool),
    Char(char),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Int(v) => write!(f, "{v}"),
            FieldValue::UInt(v) => write!(f, "{v}"),
            FieldValue::Fixed(v) => match f.precision() {
                Some(p) => write!(f, "{v:.p$}"),
                None => write!(f, "{v}"),
            },
            FieldValue::Text(v) => f.write_str(v),
            FieldValue::Flag(v) => f.write_str(if *v { "Y" } else { "N" }),
            FieldValue::Char(v) => write!(f, "{v}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Field {
    pub name: &'static str,
    pub value: FieldValue,
}

impl Field {
    pub fn new(name: &'static str, value: FieldValue) -> Self {
        Self { name, value }
    }
}

/// Satellites used in the most recent navigation solution.
///
/// Replaced as a whole by every navigation message, so channels are never
/// matched against satellites from an older solution.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SatelliteFixSummary {
    prns: Vec<u8>,
}

impl SatelliteFixSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, prns: &[u8]) {
        self.prns.clear();
        self.prns
            .extend_from_slice(&prns[..prns.len().min(CHANNELS)]);
    }

    pub fn contains(&self, prn: u8) -> bool {
        self.prns.contains(&prn)
    }

    pub fn prns(&self) -> &[u8] {
        &self.prns
    }

    pub fn len(&self) -> usize {
        self.prns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prns.is_empty()
    }
}

/// Result of decoding one raw frame.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DecodedFrame {
    pub id: MessageId,
    pub message: Message,
    /// Lowercase hex of the complete frame, framing included
    pub dump: String,
    /// Length of the complete frame
    pub len: usize,
    /// Some field lay beyond the end of the payload and decoded as zero
    pub truncated: bool,
}

impl DecodedFrame {
    pub fn label(&self) -> &'static str {
        self.id.label()
    }

    /// `"MND 0x02="`, the prefix of the trace line for this frame
    pub fn trace_tag(&self) -> String {
        format!("{:<3} 0x{:02x}=", self.label(), self.id.id())
    }

    /// `"MND 0x02=(41) a0a2..."`
    pub fn trace_line(&self) -> String {
        format!("{}({}) {}", self.trace_tag(), self.len, self.dump)
    }

    pub fn fields(&self) -> Vec<Field> {
        match &self.message {
            Message::Navigation(m) => m.fields(),
            Message::Tracking(m) => m.fields(),
            Message::SoftwareVersion(v) => vec![Field::new("version", FieldValue::Text(v.clone()))],
            Message::Clock(m) => m.fields(),
            Message::Subframe { channel } => {
                vec![Field::new("channel", FieldValue::UInt((*channel).into()))]
            },
            Message::Throughput(m) => m.fields(),
            Message::Ack { id } | Message::Nak { id } => {
                vec![Field::new("id", FieldValue::UInt((*id).into()))]
            },
            Message::VisibleList(m) => m.fields(),
            Message::NavigationParameters(m) => m.fields(),
            Message::Dgps(m) => m.fields(),
            Message::Development(_) | Message::Labelled | Message::Unknown => Vec::new(),
        }
    }

    /// Free text carried by a development message.
    pub fn text(&self) -> Option<&str> {
        match &self.message {
            Message::Development(Some(text)) => Some(text),
            _ => None,
        }
    }
}

/// Payload of a raw frame, best effort when the framing is short.
pub fn payload(raw: &[u8]) -> &[u8] {
    let start = SIRF_HEADER_LEN.min(raw.len());
    let end = raw.len().saturating_sub(SIRF_TRAILER_LEN).max(start);
    &raw[start..end]
}

pub fn hex_dump(raw: &[u8]) -> String {
    use fmt::Write;
    raw.iter().fold(String::with_capacity(raw.len() * 2), |mut s, b| {
        let _ = write!(s, "{b:02x}");
        s
    })
}

/// Decodes one complete frame (`A0 A2` .. `B0 B3`) with ellipsoidal heights.
pub fn decode(raw: &[u8], fix: &SatelliteFixSummary) -> DecodedFrame {
    decode_with_geoid(raw, fix, &Ellipsoid)
}

pub fn decode_with_geoid<G: GeoidModel + ?Sized>(
    raw: &[u8],
    fix: &SatelliteFixSummary,
    geoid: &G,
) -> DecodedFrame {
    let f = Fields::new(payload(raw));
    let id = MessageId::from(f.bytes().first().copied().unwrap_or(0));
    let message = match id {
        MessageId::MeasuredNavigation => Message::Navigation(NavigationData::decode(&f, geoid)),
        MessageId::MeasuredTracking => Message::Tracking(TrackingData::decode(&f, fix)),
        MessageId::SoftwareVersion => {
            Message::SoftwareVersion(String::from_utf8_lossy(f.c_str(1)).into_owned())
        },
        MessageId::ClockStatus => Message::Clock(ClockStatus::decode(&f)),
        MessageId::Subframe50Bps => Message::Subframe { channel: f.u8(1) },
        MessageId::Throughput => Message::Throughput(Throughput::decode(&f)),
        MessageId::CommandAck => Message::Ack { id: f.u8(1) },
        MessageId::CommandNak => Message::Nak { id: f.u8(1) },
        MessageId::VisibleList => Message::VisibleList(VisibleList::decode(&f)),
        MessageId::NavigationParameters => {
            Message::NavigationParameters(NavigationParameters::decode(&f))
        },
        MessageId::DgpsStatus => Message::Dgps(DgpsStatus::decode(&f)),
        MessageId::Development => Message::Development(development_text(f.bytes())),
        MessageId::NavLibMeasurement
        | MessageId::NavLibDgps
        | MessageId::NavLibSvState
        | MessageId::NavLibInitialized
        | MessageId::GeodeticNavigation
        | MessageId::SbasParameters
        | MessageId::PpsTime => Message::Labelled,
        MessageId::Other(_) => Message::Unknown,
    };

    DecodedFrame {
        id,
        message,
        dump: hex_dump(raw),
        len: raw.len(),
        truncated: f.overrun(),
    }
}

/// Stateful decoder that feeds each navigation solution back into the
/// tracking annotations.
#[derive(Debug, Default)]
pub struct Decoder<G: GeoidModel = Ellipsoid> {
    fix: SatelliteFixSummary,
    geoid: G,
}

impl<G: GeoidModel> Decoder<G> {
    pub fn with_geoid(geoid: G) -> Self {
        Self {
            fix: SatelliteFixSummary::default(),
            geoid,
        }
    }

    pub fn fix(&self) -> &SatelliteFixSummary {
        &self.fix
    }

    pub fn decode(&mut self, raw: &[u8]) -> DecodedFrame {
        let frame = decode_with_geoid(raw, &self.fix, &self.geoid);
        if let Message::Navigation(nav) = &frame.message {
            self.fix.update(&nav.prns);
        }
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::frame_payload;

    fn framed(payload: &[u8]) -> Vec<u8> {
        frame_payload(payload).unwrap()
    }

    fn nav_payload(pos: [i32; 3], prns: &[u8]) -> Vec<u8> {
        let mut p = vec![0u8; 41];
        p[0] = 0x02;
        p[1..5].copy_from_slice(&pos[0].to_be_bytes());
        p[5..9].copy_from_slice(&pos[1].to_be_bytes());
        p[9..13].copy_from_slice(&pos[2].to_be_bytes());
        p[20] = 10;
        p[22..24].copy_from_slice(&1400u16.to_be_bytes());
        p[24..28].copy_from_slice(&12_345i32.to_be_bytes());
        p[28] = prns.len() as u8;
        p[29..29 + prns.len()].copy_from_slice(prns);
        p
    }

    fn tracking_payload(channels: &[(u8, u16)]) -> Vec<u8> {
        let mut p = vec![0u8; 8 + 15 * channels.len()];
        p[0] = 0x04;
        p[7] = channels.len() as u8;
        for (i, (sv, state)) in channels.iter().enumerate() {
            let off = 8 + 15 * i;
            p[off] = *sv;
            p[off + 1] = 100;
            p[off + 2] = 90;
            p[off + 3..off + 5].copy_from_slice(&state.to_be_bytes());
            for j in 0..10 {
                p[off + 5 + j] = 40 + j as u8;
            }
        }
        p
    }

    #[test]
    fn navigation_solution() {
        let raw = framed(&nav_payload([-2_694_685, -4_293_642, 3_857_878], &[5, 9, 17]));
        let frame = decode(&raw, &SatelliteFixSummary::default());
        assert_eq!(frame.label(), "MND");
        assert!(!frame.truncated);
        let Message::Navigation(nav) = &frame.message else {
            panic!("not navigation: {:?}", frame.message);
        };
        assert!((nav.geodetic.latitude - 37.458).abs() < 0.01);
        assert!((nav.geodetic.longitude + 122.112).abs() < 0.01);
        assert_eq!(nav.hdop, 2.0);
        assert_eq!(nav.time.week, 1400);
        assert_eq!(nav.prns, vec![5, 9, 17]);
        assert_eq!(frame.fields()[0], Field::new("x", FieldValue::Int(-2_694_685)));
    }

    #[test]
    fn tracking_status_follows_latest_fix() {
        let mut decoder = Decoder::<Ellipsoid>::default();
        decoder.decode(&framed(&nav_payload([0; 3], &[5, 9])));
        let frame = decoder.decode(&framed(&tracking_payload(&[(5, 0xbf), (7, 0xbf), (8, 0x3f)])));
        let Message::Tracking(track) = &frame.message else {
            panic!("not tracking");
        };
        let status: Vec<_> = track.channels.iter().map(|c| c.status.as_char()).collect();
        assert_eq!(status, vec!['N', 'T', ' ']);
        assert_eq!(track.channels[0].azimuth, 150);
        assert_eq!(track.channels[0].elevation, 45);
        assert!((track.channels[0].cn0 - 44.5).abs() < 1e-9);

        // a newer solution without satellite 5 drops its N
        decoder.decode(&framed(&nav_payload([0; 3], &[9])));
        let frame = decoder.decode(&framed(&tracking_payload(&[(5, 0xbf)])));
        let Message::Tracking(track) = &frame.message else {
            panic!("not tracking");
        };
        assert_eq!(track.channels[0].status, TrackStatus::Tracked);
    }

    #[test]
    fn fix_summary_is_bounded() {
        let mut fix = SatelliteFixSummary::new();
        fix.update(&(1..=20).collect::<Vec<u8>>());
        assert_eq!(fix.len(), CHANNELS);
        assert!(!fix.contains(13));
    }

    #[test]
    fn tracking_channel_count_is_clamped() {
        let mut p = tracking_payload(&[(1, 0); 12]);
        p[7] = 200;
        let frame = decode(&framed(&p), &SatelliteFixSummary::default());
        let Message::Tracking(track) = &frame.message else {
            panic!("not tracking");
        };
        assert_eq!(track.channels.len(), CHANNELS);
        assert!(!frame.truncated);
    }

    #[test]
    fn unknown_id_dumps_whole_frame() {
        let raw = [0xa0, 0xa2, 0x00, 0x02, 0x5a, 0x01, 0x00, 0x5b, 0xb0, 0xb3];
        let frame = decode(&raw, &SatelliteFixSummary::default());
        assert_eq!(frame.message, Message::Unknown);
        assert_eq!(frame.dump, "a0a200025a01005bb0b3");
        assert_eq!(frame.trace_line(), "    0x5a=(10) a0a200025a01005bb0b3");
        assert!(frame.fields().is_empty());
    }

    #[test]
    fn short_payload_is_marked_truncated() {
        let frame = decode(&framed(&[0x07, 0x05, 0x00]), &SatelliteFixSummary::default());
        assert!(frame.truncated);
        let Message::Clock(clock) = &frame.message else {
            panic!("not clock status");
        };
        assert_eq!(clock.time.week, 0x0500);
        assert_eq!(clock.bias, 0);
    }

    #[test]
    fn frames_shorter_than_framing_still_decode() {
        let frame = decode(&[0xa0, 0xa2, 0x00], &SatelliteFixSummary::default());
        assert_eq!(frame.len, 3);
        assert_eq!(frame.dump, "a0a200");
        assert_eq!(frame.message, Message::Unknown);
    }

    #[test]
    fn software_version_text() {
        let frame = decode(&framed(b"\x06GSW3.2.4\0\0\0"), &SatelliteFixSummary::default());
        assert_eq!(frame.message, Message::SoftwareVersion("GSW3.2.4".into()));
        assert_eq!(frame.trace_tag(), "FV  0x06=");
    }

    #[test]
    fn development_text_filter() {
        assert_eq!(development_text(b"\xffRTC not set\n"), None);
        assert_eq!(
            development_text(b"\xffRTC not sat  \n\n").as_deref(),
            Some("RTC not sat")
        );
        assert_eq!(development_text(b"\xffrtcaj tow 1234"), None);
        assert_eq!(
            development_text(b"\xffrtcaj tow").as_deref(),
            Some("rtcaj tow")
        );
        assert_eq!(development_text(b"\xff").as_deref(), Some(""));
    }

    #[test]
    fn development_text_stops_at_nul() {
        assert_eq!(
            development_text(b"\xffNav init\0\x13garbage").as_deref(),
            Some("Nav init")
        );
        assert_eq!(development_text(b"\xffRTC not set\n\0junk"), None);
    }

    #[test]
    fn dgps_source_names() {
        let mut p = vec![0u8; 52];
        p[0] = 0x1b;
        p[1] = 1;
        p[16] = 4;
        p[19] = 11;
        let frame = decode(&framed(&p), &SatelliteFixSummary::default());
        let Message::Dgps(dgps) = &frame.message else {
            panic!("not dgps");
        };
        assert_eq!(dgps.source_name(), "SBAS");
        assert_eq!(dgps.corrections, 2);
        let bogus = DgpsStatus {
            source: 9,
            corrections: 0,
        };
        assert_eq!(bogus.source_name(), "?");
    }

    #[test]
    fn subframe_ids() {
        for id in [0x08, 0x1c, 0x1d, 0x1e, 0x1f] {
            assert!(MessageId::from(id).implies_subframes());
        }
        assert!(!MessageId::from(0x02).implies_subframes());
        assert_eq!(MessageId::from(0x77).id(), 0x77);
    }

    #[test]
    fn fixed_values_honour_precision() {
        assert_eq!(format!("{:.3}", FieldValue::Fixed(1.0 / 3.0)), "0.333");
        assert_eq!(FieldValue::Flag(true).to_string(), "Y");
    }
}
