//! Buoy application packet dialect.
//!
//! Outbound: `PK001` location reports over the satellite link and `PK004`
//! beacon sentences over the radio. Inbound: the `PK005`..`PK007` command
//! family plus the `SUPPORT` maintenance escape.

use crate::gps::GpsState;
use crate::sentence::{self, SentenceSpec};
use tracing::warn;

/// Shortest report interval a command may set, seconds.
pub const MIN_REPORT_INTERVAL_S: u64 = 120;

/// Status byte flags carried in the `sta` field.
const STATUS_BEACON_ON: u8 = 0x01;

/// A command received over either link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuoyCommand {
    /// PK005: beacon transmitter on or off.
    Beacon(bool),
    /// PK006: new report interval, already clamped, in seconds.
    ReportInterval(u64),
    /// PK007: sleep immediately for this many seconds.
    SleepNow(u64),
    /// Hand the device over to the maintenance application.
    Support,
}

impl BuoyCommand {
    /// Decode one inbound `(type, fields)` record. Unknown types and
    /// unparsable arguments yield `None`.
    pub fn parse(pkt_type: &str, fields: &str) -> Option<Self> {
        match pkt_type {
            "PK005" => Some(Self::Beacon(fields.trim() == "1")),
            "PK006" => {
                let minutes: u64 = fields.trim().parse().ok()?;
                Some(Self::ReportInterval(
                    (minutes * 60).max(MIN_REPORT_INTERVAL_S),
                ))
            }
            "PK007" => {
                let seconds: u64 = fields.trim().parse().ok()?;
                if seconds == 0 {
                    warn!("zero-length sleep command ignored");
                    return None;
                }
                Some(Self::SleepNow(seconds))
            }
            "SUPPORT" => Some(Self::Support),
            _ => {
                warn!(pkt_type, "unknown command packet");
                None
            }
        }
    }
}

/// Device status byte for outbound reports.
pub fn status_byte(beacon_on: bool) -> u8 {
    if beacon_on {
        STATUS_BEACON_ON
    } else {
        0
    }
}

/// Receiver `hhmmss.ss` time as `hh:mm:ss`. Text too short to split is
/// passed through untouched.
pub fn format_utc(raw: &str) -> String {
    if raw.len() < 6 || !raw.is_char_boundary(6) {
        return raw.to_string();
    }
    format!("{}:{}:{}", &raw[0..2], &raw[2..4], &raw[4..6])
}

/// Compose a `PK001` satellite location report. Missing speed or course
/// is reported as zero.
pub fn location_report(gps: &GpsState, beacon_on: bool, battery: Option<f32>) -> String {
    let sog = if gps.ground_speed.is_empty() {
        "0"
    } else {
        &gps.ground_speed
    };
    let cog = if gps.t_course.is_empty() {
        "0"
    } else {
        &gps.t_course
    };
    let mut report = format!(
        "PK001;lat:{},NS:{},lon:{},EW:{},utc:{},sog:{},cog:{},sta:{:02X}",
        gps.latitude,
        gps.ns,
        gps.longitude,
        gps.ew,
        format_utc(&gps.utc),
        sog,
        cog,
        status_byte(beacon_on),
    );
    if let Some(volts) = battery {
        report.push_str(&format!(",batt:{volts:.2}"));
    }
    report
}

/// Compose a framed `PK004` beacon sentence for the radio link.
pub fn beacon_sentence(gps: &GpsState, beacon_on: bool, spec: &SentenceSpec) -> String {
    let sog = if gps.ground_speed.is_empty() {
        "0"
    } else {
        &gps.ground_speed
    };
    let cog = if gps.t_course.is_empty() {
        "0"
    } else {
        &gps.t_course
    };
    let fields = format!(
        "{},{},{},{},{},{},{},{:02}",
        gps.latitude,
        gps.ns,
        gps.longitude,
        gps.ew,
        sog,
        cog,
        gps.utc,
        status_byte(beacon_on),
    );
    sentence::create("PK", "004", Some(&fields), spec)
}
