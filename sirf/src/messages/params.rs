use super::{Field, FieldValue};
use crate::bits::Fields;

/// Response to a navigation parameter poll, MID 19
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct NavigationParameters {
    pub alt_hold_mode: u8,
    pub alt_hold_source: u8,
    /// Metres
    pub alt_source_input: u16,
    /// Seconds, `None` when degraded mode is disabled
    pub degraded_timeout: Option<u8>,
    pub dr_timeout: u8,
    pub track_smoothing: bool,
    pub static_navigation: bool,
    pub three_sv_least_squares: u8,
    pub dop_mask_mode: u8,
    pub elevation_mask: u16,
    pub power_mask: u8,
    pub dgps_source: u8,
    pub dgps_mode: u8,
    pub dgps_timeout: u8,
    pub lp_push_to_fix: bool,
    /// Milliseconds
    pub lp_on_time: u32,
    pub lp_interval: u32,
    pub user_tasks: bool,
    pub user_task_interval: u32,
    pub lp_power_cycling: bool,
    pub lp_max_acq_search_time: u32,
    pub lp_max_off_time: u32,
    pub apm: bool,
    pub fixes: u16,
    pub time_between_fixes: u16,
    pub hv_error_max: u8,
    pub response_time_max: u8,
    pub time_accuracy_priority: u8,
}

impl NavigationParameters {
    pub(crate) fn decode(f: &Fields<'_>) -> Self {
        let yes = |off| f.u8(off) != 0;
        Self {
            alt_hold_mode: f.u8(5),
            alt_hold_source: f.u8(6),
            alt_source_input: f.be_u16(7),
            degraded_timeout: yes(9).then(|| f.u8(10)),
            dr_timeout: f.u8(11),
            track_smoothing: yes(12),
            static_navigation: yes(13),
            three_sv_least_squares: f.u8(14),
            dop_mask_mode: f.u8(19),
            elevation_mask: f.be_u16(20),
            power_mask: f.u8(22),
            dgps_source: f.u8(27),
            dgps_mode: f.u8(28),
            dgps_timeout: f.u8(29),
            lp_push_to_fix: yes(34),
            lp_on_time: f.be_u32(35),
            lp_interval: f.be_u32(39),
            user_tasks: yes(43),
            user_task_interval: f.be_u32(44),
            lp_power_cycling: yes(48),
            lp_max_acq_search_time: f.be_u32(49),
            lp_max_off_time: f.be_u32(53),
            apm: yes(57),
            fixes: f.be_u16(58),
            time_between_fixes: f.be_u16(60),
            hv_error_max: f.u8(62),
            response_time_max: f.u8(63),
            time_accuracy_priority: f.u8(64),
        }
    }

    pub(crate) fn fields(&self) -> Vec<Field> {
        use FieldValue::{Flag, UInt};
        let degraded = match self.degraded_timeout {
            Some(secs) => UInt(secs.into()),
            None => FieldValue::Text("N/A".into()),
        };
        vec![
            Field::new("alt_hold_mode", UInt(self.alt_hold_mode.into())),
            Field::new("alt_hold_source", UInt(self.alt_hold_source.into())),
            Field::new("alt_source_input", UInt(self.alt_source_input.into())),
            Field::new("degraded_timeout", degraded),
            Field::new("dr_timeout", UInt(self.dr_timeout.into())),
            Field::new("track_smoothing", Flag(self.track_smoothing)),
            Field::new("static_navigation", Flag(self.static_navigation)),
            Field::new("three_sv_least_squares", UInt(self.three_sv_least_squares.into())),
            Field::new("dop_mask_mode", UInt(self.dop_mask_mode.into())),
            Field::new("elevation_mask", UInt(self.elevation_mask.into())),
            Field::new("power_mask", UInt(self.power_mask.into())),
            Field::new("dgps_source", UInt(self.dgps_source.into())),
            Field::new("dgps_mode", UInt(self.dgps_mode.into())),
            Field::new("dgps_timeout", UInt(self.dgps_timeout.into())),
            Field::new("lp_push_to_fix", Flag(self.lp_push_to_fix)),
            Field::new("lp_on_time", UInt(self.lp_on_time.into())),
            Field::new("lp_interval", UInt(self.lp_interval.into())),
            Field::new("user_tasks", Flag(self.user_tasks)),
            Field::new("user_task_interval", UInt(self.user_task_interval.into())),
            Field::new("lp_power_cycling", Flag(self.lp_power_cycling)),
            Field::new("lp_max_acq_search_time", UInt(self.lp_max_acq_search_time.into())),
            Field::new("lp_max_off_time", UInt(self.lp_max_off_time.into())),
            Field::new("apm", Flag(self.apm)),
            Field::new("fixes", UInt(self.fixes.into())),
            Field::new("time_between_fixes", UInt(self.time_between_fixes.into())),
            Field::new("hv_error_max", UInt(self.hv_error_max.into())),
            Field::new("response_time_max", UInt(self.response_time_max.into())),
            Field::new("time_accuracy_priority", UInt(self.time_accuracy_priority.into())),
        ]
    }
}
