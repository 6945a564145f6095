//! Panels and commands for SiRF binary receivers.

use sirf::{
    messages::{
        ChannelTrack, ClockStatus, DgpsStatus, NavigationData, NavigationParameters, Throughput,
        VisibleList,
    },
    CommandBuilder, Decoder, GpsTime, InitializeDataSource, Message, PollNavigationParameters,
    PollSoftwareVersion, SetMessageRate, SetStaticNavigation, SwitchToNmea, CHANNELS,
};
use strum::{EnumIter, IntoEnumIterator, IntoStaticStr};
use tracing::debug;

use crate::{
    display::{Display, Geometry},
    driver::{ProtocolDriver, SirfBinary},
    error::MonitorError,
    family::{CommandStatus, DeviceFamily},
    session::MonitorSession,
};

/// Highest tracking data rate the receiver accepts, seconds
const MAX_TRACKING_RATE: i64 = 30;
/// Navigation parameters are polled on wall-clock multiples of this
const NAV_PARAM_POLL_SECS: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum SirfPanel {
    Navigation,
    Tracking,
    Version,
    Clock,
    Throughput,
    Visible,
    NavParams,
    Dgps,
}

/// Panels sharing the right-hand column with the navigation parameters
const STATUS_GROUP: [SirfPanel; 5] = [
    SirfPanel::Version,
    SirfPanel::Clock,
    SirfPanel::Throughput,
    SirfPanel::Visible,
    SirfPanel::Dgps,
];

impl SirfPanel {
    pub fn name(self) -> &'static str {
        self.into()
    }

    pub fn geometry(self) -> Geometry {
        match self {
            SirfPanel::Navigation => Geometry::new(7, 80, 1, 0),
            SirfPanel::Tracking => Geometry::new(15, 30, 8, 0),
            SirfPanel::Version => Geometry::new(3, 50, 8, 30),
            SirfPanel::Clock => Geometry::new(4, 50, 11, 30),
            SirfPanel::Throughput => Geometry::new(3, 50, 15, 30),
            SirfPanel::Visible => Geometry::new(3, 50, 18, 30),
            SirfPanel::NavParams => Geometry::new(16, 50, 8, 30),
            SirfPanel::Dgps => Geometry::new(3, 50, 21, 30),
        }
    }

    fn labels(self) -> &'static [(u16, u16, &'static str)] {
        match self {
            SirfPanel::Navigation => &[
                (0, 12, " X "),
                (0, 21, " Y "),
                (0, 30, " Z "),
                (0, 43, " North "),
                (0, 54, " East "),
                (0, 65, " Alt "),
                (1, 1, "Pos:                            m                                    m"),
                (2, 1, "Vel:                            m/s                                  climb m/s"),
                (3, 1, "Time:                  GPS:                Heading:                  speed m/s"),
                (4, 1, "Skew:                   TZ:                HDOP:      M1:        M2:    "),
                (5, 1, "Fix:"),
                (6, 24, " Packet type 2 (0x02) "),
            ],
            SirfPanel::Tracking => &[
                (1, 1, " Ch SV  Az El Stat  C/N ? A"),
                (14, 4, " Packet Type 4 (0x04) "),
            ],
            SirfPanel::Version => &[(1, 1, "Version:"), (2, 8, " Packet Type 6 (0x06) ")],
            SirfPanel::Clock => &[
                (1, 1, "SVs: "),
                (1, 9, "Drift: "),
                (1, 23, "Bias: "),
                (2, 1, "Estimated GPS Time: "),
                (3, 8, " Packet type 7 (0x07) "),
            ],
            SirfPanel::Throughput => &[
                (1, 1, "Max: "),
                (1, 13, "Lat: "),
                (1, 25, "Time: "),
                (1, 39, "MS: "),
                (2, 8, " Packet type 9 (0x09) "),
            ],
            SirfPanel::Visible => &[(1, 1, "SVs: "), (1, 9, "="), (2, 8, " Packet type 13 (0x0D) ")],
            SirfPanel::NavParams => &[
                (1, 1, "Alt. hold mode:"),
                (2, 1, "Alt. hold source:"),
                (3, 1, "Alt. source input:"),
                (4, 1, "Degraded timeout:"),
                (5, 1, "DR timeout:"),
                (6, 1, "Track smooth mode:"),
                (7, 1, "Static Navigation:"),
                (8, 1, "3SV Least Squares:"),
                (9, 1, "DOP Mask mode:"),
                (10, 1, "Nav. Elev. mask:"),
                (11, 1, "Nav. Power mask:"),
                (12, 1, "DGPS Source:"),
                (13, 1, "DGPS Mode:"),
                (14, 1, "DGPS Timeout:"),
                (1, 26, "LP Push-to-Fix:"),
                (2, 26, "LP On Time:"),
                (3, 26, "LP Interval:"),
                (4, 26, "U. Tasks Enab.:"),
                (5, 26, "U. Task Inter.:"),
                (6, 26, "LP Pwr Cyc En:"),
                (7, 26, "LP Max Acq Srch:"),
                (8, 26, "LP Max Off Time:"),
                (9, 26, "APM enabled:"),
                (10, 26, "# of Fixes:"),
                (11, 26, "Time btw Fixes:"),
                (12, 26, "H/V Error Max:"),
                (13, 26, "Rsp Time Max:"),
                (14, 26, "Time/Accu:"),
                (15, 8, " Packet type 19 (0x13) "),
            ],
            SirfPanel::Dgps => &[
                (1, 1, "DGPS source: "),
                (1, 31, "Corrections: "),
                (2, 8, " Packet type 27 (0x1B) "),
            ],
        }
    }
}

fn put(
    display: &mut dyn Display,
    panel: SirfPanel,
    row: u16,
    col: u16,
    text: &str,
) -> Result<(), MonitorError> {
    display.put(panel.name(), row, col, text)
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Y"
    } else {
        "N"
    }
}

/// Leading integer of `s` after optional blanks and sign, 0 when there is
/// none. Saturates instead of overflowing.
fn leading_int(s: &str) -> i64 {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let value = digits
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0i64, |acc, d| acc.saturating_mul(10).saturating_add(i64::from(d - b'0')));
    if negative {
        -value
    } else {
        value
    }
}

/// The SiRF binary receiver family.
#[derive(Default)]
pub struct SirfFamily {
    decoder: Decoder,
    driver: SirfBinary,
    /// Display mode the right-hand column was last arranged for
    arranged_for: Option<bool>,
}

impl SirfFamily {
    pub fn new() -> Self {
        Self::default()
    }

    fn show_time(
        &self,
        time: &GpsTime,
        session: &MonitorSession,
        display: &mut dyn Display,
    ) -> Result<(), MonitorError> {
        let nav = SirfPanel::Navigation;
        put(display, nav, 3, 7, &time.to_string())?;
        put(display, nav, 3, 29, &time.week_day().to_string())?;
        put(display, nav, 4, 8, &format!("{:.6}", time.skew(session.now())))?;
        put(display, nav, 4, 29, &session.utc_offset().to_string())
    }

    fn show_navigation(
        &self,
        nav: &NavigationData,
        session: &MonitorSession,
        display: &mut dyn Display,
    ) -> Result<(), MonitorError> {
        let p = SirfPanel::Navigation;
        let [x, y, z] = nav.position;
        let [vx, vy, vz] = nav.velocity;
        put(display, p, 1, 6, &format!("{x:8} {y:8} {z:8}"))?;
        put(display, p, 2, 6, &format!("{vx:8.1} {vy:8.1} {vz:8.1}"))?;

        let g = &nav.geodetic;
        put(display, p, 1, 40, &format!("{:9.5} {:9.5}", g.latitude, g.longitude))?;
        put(display, p, 1, 49, "°")?;
        put(display, p, 1, 59, "°")?;
        put(display, p, 1, 61, &format!("{:8}", g.altitude as i64))?;
        put(display, p, 2, 40, &format!("{:9.1} {:9.1}", g.vel_north, g.vel_east))?;
        put(display, p, 2, 61, &format!("{:8.1}", g.vel_up))?;
        put(display, p, 3, 54, &format!("{:5.1}", g.heading.to_degrees()))?;
        put(display, p, 3, 59, "°")?;
        put(display, p, 3, 61, &format!("{:8.1}", g.speed))?;

        self.show_time(&nav.time, session, display)?;

        put(display, p, 4, 49, &format!("{:4.1}", nav.hdop))?;
        put(display, p, 4, 58, &format!("{:02x}", nav.mode1.bits()))?;
        put(display, p, 4, 70, &format!("{:02x}", nav.mode2))?;

        let mut fix = format!("{} = ", nav.in_fix);
        for i in 0..CHANNELS {
            match nav.prns.get(i) {
                Some(prn) => fix.push_str(&format!("{prn:3}")),
                None => fix.push_str("   "),
            }
        }
        put(display, p, 5, 7, &fix)
    }

    fn show_tracking(
        &self,
        channels: &[ChannelTrack],
        display: &mut dyn Display,
    ) -> Result<(), MonitorError> {
        let p = SirfPanel::Tracking;
        for (i, ch) in channels.iter().enumerate() {
            let mut row = format!(
                " {:3} {:3}{:3} {:04x}{:5.1} {}",
                ch.sv,
                ch.azimuth,
                ch.elevation,
                ch.state,
                ch.cn0,
                ch.status.as_char()
            );
            if ch.sv == 0 {
                row.push_str("   ");
            }
            put(display, p, i as u16 + 2, 3, &row)?;
        }
        // rows past the reported count belong to no satellite
        for i in channels.len()..CHANNELS {
            let row = i as u16 + 2;
            display.clear_row(p.name(), row)?;
            put(display, p, row, 1, &format!("{i:2}"))?;
        }
        Ok(())
    }

    fn show_clock(&self, clock: &ClockStatus, display: &mut dyn Display) -> Result<(), MonitorError> {
        let p = SirfPanel::Clock;
        put(display, p, 1, 5, &format!("{:2}", clock.svs))?;
        put(display, p, 1, 16, &clock.drift.to_string())?;
        put(display, p, 1, 29, &clock.bias.to_string())?;
        put(display, p, 2, 21, &clock.estimated_time.to_string())
    }

    fn show_throughput(&self, t: &Throughput, display: &mut dyn Display) -> Result<(), MonitorError> {
        let p = SirfPanel::Throughput;
        put(display, p, 1, 6, &format!("{:.3}", t.seg_stat_max))?;
        put(display, p, 1, 18, &format!("{:.3}", t.seg_stat_lat))?;
        put(display, p, 1, 31, &format!("{:.3}", t.seg_stat_time))?;
        put(display, p, 1, 42, &format!("{:3}", t.last_millisecond))
    }

    fn show_visible(&self, v: &VisibleList, display: &mut dyn Display) -> Result<(), MonitorError> {
        let p = SirfPanel::Visible;
        put(display, p, 1, 6, &v.count.to_string())?;
        let list: String = (0..CHANNELS)
            .map(|i| match v.svs.get(i) {
                Some(sv) => format!(" {sv:2}"),
                None => "   ".to_string(),
            })
            .collect();
        put(display, p, 1, 10, &list)
    }

    fn show_nav_params(
        &self,
        np: &NavigationParameters,
        display: &mut dyn Display,
    ) -> Result<(), MonitorError> {
        let left = [
            np.alt_hold_mode.to_string(),
            np.alt_hold_source.to_string(),
            format!("{}m", np.alt_source_input),
            match np.degraded_timeout {
                Some(t) => format!("{t}sec"),
                None => "N/A   ".to_string(),
            },
            format!("{}sec", np.dr_timeout),
            yes_no(np.track_smoothing).to_string(),
            yes_no(np.static_navigation).to_string(),
            format!("0x{:x}", np.three_sv_least_squares),
            format!("0x{:x}", np.dop_mask_mode),
            format!("0x{:x}", np.elevation_mask),
            format!("0x{:x}", np.power_mask),
            format!("0x{:x}", np.dgps_source),
            format!("0x{:x}", np.dgps_mode),
            format!("{}sec", np.dgps_timeout),
        ];
        let right = [
            yes_no(np.lp_push_to_fix).to_string(),
            format!("{}ms", np.lp_on_time),
            np.lp_interval.to_string(),
            yes_no(np.user_tasks).to_string(),
            np.user_task_interval.to_string(),
            yes_no(np.lp_power_cycling).to_string(),
            np.lp_max_acq_search_time.to_string(),
            np.lp_max_off_time.to_string(),
            yes_no(np.apm).to_string(),
            np.fixes.to_string(),
            np.time_between_fixes.to_string(),
            np.hv_error_max.to_string(),
            np.response_time_max.to_string(),
            np.time_accuracy_priority.to_string(),
        ];
        let p = SirfPanel::NavParams;
        for (row, (l, r)) in (1u16..).zip(left.iter().zip(right.iter())) {
            put(display, p, row, 20, l)?;
            put(display, p, row, 42, r)?;
        }
        Ok(())
    }

    fn show_dgps(&self, d: &DgpsStatus, display: &mut dyn Display) -> Result<(), MonitorError> {
        let p = SirfPanel::Dgps;
        put(display, p, 1, 14, &format!("{} ({})", d.source, d.source_name()))?;
        put(display, p, 1, 44, &d.corrections.to_string())
    }
}

impl DeviceFamily for SirfFamily {
    fn name(&self) -> &'static str {
        "SiRF"
    }

    fn identify(&mut self, session: &mut MonitorSession) {
        session.control_send(&self.driver, PollSoftwareVersion.into_payload().as_bytes());
    }

    fn analyze(
        &mut self,
        frame: &[u8],
        session: &mut MonitorSession,
        display: &mut dyn Display,
    ) -> Result<(), MonitorError> {
        let decoded = self.decoder.decode(frame);
        if decoded.truncated {
            debug!("{} frame too short for its fields ({} bytes)", decoded.trace_tag(), decoded.len);
        }
        if decoded.id.implies_subframes() {
            session.subframes_enabled = true;
        }

        match &decoded.message {
            Message::Navigation(nav) => self.show_navigation(nav, session, display)?,
            Message::Tracking(t) => {
                self.show_time(&t.time, session, display)?;
                self.show_tracking(&t.channels, display)?;
            },
            Message::SoftwareVersion(v) => put(display, SirfPanel::Version, 1, 10, v)?,
            Message::Clock(c) => {
                self.show_time(&c.time, session, display)?;
                self.show_clock(c, display)?;
            },
            Message::Subframe { channel } => {
                put(display, SirfPanel::Tracking, u16::from(*channel) + 2, 27, "Y")?
            },
            Message::Throughput(t) => self.show_throughput(t, display)?,
            Message::VisibleList(v) => self.show_visible(v, display)?,
            Message::NavigationParameters(np) => self.show_nav_params(np, display)?,
            Message::Dgps(d) => self.show_dgps(d, display)?,
            Message::Ack { .. }
            | Message::Nak { .. }
            | Message::Development(_)
            | Message::Labelled
            | Message::Unknown => {},
        }

        if let Some(text) = decoded.text() {
            session.trace.line(text);
        }
        session.trace.line(decoded.trace_line());
        Ok(())
    }

    fn layout(&mut self, display: &mut dyn Display) -> Result<(), MonitorError> {
        for panel in SirfPanel::iter() {
            display.create_panel(panel.name(), panel.geometry())?;
            for &(row, col, text) in panel.labels() {
                put(display, panel, row, col, text)?;
            }
        }
        for i in 0..CHANNELS {
            put(display, SirfPanel::Tracking, i as u16 + 2, 1, &format!("{i:2}"))?;
        }
        self.arranged_for = None;
        Ok(())
    }

    fn repaint(
        &mut self,
        session: &mut MonitorSession,
        display: &mut dyn Display,
        operator_input: bool,
    ) -> Result<(), MonitorError> {
        if session.nav_param_display && session.now().timestamp() % NAV_PARAM_POLL_SECS == 0 {
            session.control_send(&self.driver, PollNavigationParameters.into_payload().as_bytes());
        }

        let mode = session.nav_param_display;
        if operator_input || self.arranged_for != Some(mode) {
            if mode {
                display.raise(SirfPanel::NavParams.name())?;
            } else {
                for panel in STATUS_GROUP {
                    display.raise(panel.name())?;
                }
            }
            self.arranged_for = Some(mode);
        }
        Ok(())
    }

    fn command(
        &mut self,
        line: &str,
        session: &mut MonitorSession,
    ) -> Result<CommandStatus, MonitorError> {
        let mut chars = line.chars();
        let Some(cmd) = chars.next() else {
            return Ok(CommandStatus::Unknown);
        };
        let arg = chars.as_str();

        match cmd {
            'a' => {
                let enable = !session.subframes_enabled;
                let msg = InitializeDataSource {
                    enable_subframes: enable,
                };
                session.control_send(&self.driver, msg.into_payload().as_bytes());
                session.subframes_enabled = enable;
                Ok(CommandStatus::Match)
            },
            'c' => {
                let msg = SetStaticNavigation {
                    flag: leading_int(arg) as u8,
                };
                session.control_send(&self.driver, msg.into_payload().as_bytes());
                Ok(CommandStatus::Match)
            },
            'd' => {
                let rate = leading_int(arg);
                if !(0..=MAX_TRACKING_RATE).contains(&rate) {
                    debug!("Tracking rate {rate} out of range, ignored");
                    return Ok(CommandStatus::Match);
                }
                let rate = rate as u8;
                let msg = SetMessageRate {
                    message_id: 0x04,
                    rate,
                };
                session.control_send(&self.driver, msg.into_payload().as_bytes());
                session.tracking_rate = rate;
                Ok(CommandStatus::Match)
            },
            'n' => {
                let Ok(baud) = u16::try_from(session.line.baud) else {
                    session.report(format!(
                        "Cannot switch to NMEA at {} bps",
                        session.line.baud
                    ));
                    return Ok(CommandStatus::Match);
                };
                session.control_send(&self.driver, SwitchToNmea::new(baud).into_payload().as_bytes());
                Ok(CommandStatus::Terminate)
            },
            't' => {
                session.nav_param_display = !session.nav_param_display;
                Ok(CommandStatus::Match)
            },
            _ => Ok(CommandStatus::Unknown),
        }
    }

    fn driver(&self) -> &dyn ProtocolDriver {
        &self.driver
    }
}
