//! Typed parsing of satellite modem response lines.
//!
//! The modem talks in prefixed text lines (`+SBDIX: 0, 12, 1, 3, 42, 0`).
//! Routing matches a line's leading characters against an ordered table of
//! prefixes, most specific first, and the first hit wins; an unmatched or
//! unparsable line yields no event. Per-response parse failures never
//! propagate: a garbled line is a dropped line.

use std::collections::BTreeMap;
use tracing::warn;

/// Reduced registration status, derived from the modem's raw error code.
/// Downstream retry policy keys off this, so the numeric reduction table is
/// load-bearing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegStatus {
    Good = 0,
    BadLocation = 1,
    Retry = 2,
    Bad = 3,
    NoService = 4,
    RadioDisabled = 5,
}

/// Reduce a raw 2-digit registration error code to a [`RegStatus`].
///
/// Bands: 0 good; 1..=14 bad location; 17..=31 and 36..=64 retry
/// recommended; 15, 16, 33, 65 bad; 32 no service; 34 radio disabled.
/// Codes outside every band are unknown.
pub fn reduce_reg_error(code: u8) -> Option<RegStatus> {
    match code {
        0 => Some(RegStatus::Good),
        1..=14 => Some(RegStatus::BadLocation),
        17..=31 | 36..=64 => Some(RegStatus::Retry),
        15 | 16 | 33 | 65 => Some(RegStatus::Bad),
        32 => Some(RegStatus::NoService),
        34 => Some(RegStatus::RadioDisabled),
        _ => None,
    }
}

/// Quantize an RSSI-style dBm reading into the six display signal levels.
pub fn signal_level(rssi_dbm: i16) -> u8 {
    match rssi_dbm {
        i16::MIN..=-140 => 0,
        -139..=-130 => 1,
        -129..=-120 => 2,
        -119..=-110 => 3,
        -109..=-70 => 4,
        _ => 5,
    }
}

/// Result of one completed SBD session, from a `+SBDIX` response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionResult {
    /// Mobile-originated disposition; 0..=4 means the send succeeded.
    pub mo_status: u8,
    /// Mobile-originated message sequence number.
    pub momsn: u32,
    /// Mobile-terminated disposition; 1 means a message was received.
    pub mt_status: u8,
    /// Mobile-terminated message sequence number.
    pub mtmsn: u32,
    /// Received message length in bytes.
    pub mt_length: usize,
    /// Messages still queued at the gateway.
    pub queue: u32,
}

impl SessionResult {
    /// The mobile-originated half of the session succeeded.
    pub fn send_ok(&self) -> bool {
        self.mo_status <= 4
    }

    /// A mobile-terminated message landed in the modem's buffer.
    pub fn received(&self) -> bool {
        self.mt_status == 1
    }
}

/// A typed event parsed out of one modem response line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseEvent {
    /// Echo, OK, and other lines that carry no information.
    Ignored,
    /// `+AREG` auto-registration event.
    Registration { event: u8, status: RegStatus },
    /// `+SBDREG` registration query reply.
    RegistrationQuery { status: u8, error: RegStatus },
    /// `+SBDSX` extended buffer status.
    ExtendedStatus {
        mo_flag: bool,
        momsn: u32,
        mt_flag: bool,
        mtmsn: u32,
        ra_flag: bool,
    },
    /// `+SBDIX` session result.
    Session(SessionResult),
    /// `+CIEV: 0,<csq>` signal strength indicator.
    SignalQuality(u8),
    /// `+CIEV: 1,<avail>` network availability.
    NetworkAvailable(bool),
    /// `+CIEV: 2,<err>` antenna fault indicator.
    AntennaError(bool),
    /// `+CIEV: 3,...` satellite ephemeris broadcast.
    Ephemeris {
        sv_id: i32,
        beam_id: i32,
        sv_beam: i32,
        sv_x: i32,
        sv_y: i32,
        sv_z: i32,
    },
    /// `+CIER` indicator-reporting configuration readback; false means
    /// signal reporting is off and must be re-enabled.
    SignalReporting(bool),
    /// `+SBDRING` ring alert: the gateway holds a message for us.
    RingAlert,
    /// `+SBDMTA` ring alert enable/disable readback.
    RingAlertConfig(bool),
    /// `+SBDRT` header: message text follows in the data stream.
    ReadText,
    /// `+SBDD` buffer clear confirmation.
    ClearConfirm,
    /// `+DATA` application records: `(packet type, field text)` pairs.
    InboundData(Vec<(String, String)>),
    /// `+WPL` waypoint record: command tag plus sparse key/value fields.
    Waypoint {
        cmd: String,
        fields: BTreeMap<String, String>,
    },
    /// `HARDWARE FAILURE` self-report.
    HardwareFailure,
}

type Handler = fn(&str) -> Option<ResponseEvent>;

/// Ordered dispatch table. First match wins, so longer prefixes sharing a
/// stem sit before shorter ones (`+SBDSX` before `+SBDD`, `+SBDREG` before
/// `+SBDR*` siblings).
const RESPONSES: &[(&str, Handler)] = &[
    ("+SBDSX", parse_sbdsx),
    ("+SBDREG", parse_sbdreg),
    ("+SBDRING", parse_sbdring),
    ("+SBDRT", parse_sbdrt),
    ("+SBDIX", parse_sbdix),
    ("+SBDMTA", parse_sbdmta),
    ("+SBDD", parse_sbdd),
    ("+AREG", parse_areg),
    ("+CIER", parse_cier),
    ("+CIEV", parse_ciev),
    ("+DATA", parse_data),
    ("+WPL", parse_wpl),
    ("-MSSTM", parse_ignored),
    ("-MSGEO", parse_ignored),
    ("HARDWARE", parse_hardware),
    ("AT", parse_ignored),
    ("OK", parse_ignored),
    ("SBDTC", parse_ignored),
];

/// Route one response line to its parser. `None` for unmatched lines and
/// for matched lines whose payload would not parse.
pub fn route(line: &str) -> Option<ResponseEvent> {
    for (prefix, handler) in RESPONSES {
        if line.starts_with(prefix) {
            let event = handler(line);
            if event.is_none() {
                warn!(line, prefix, "unparsable modem response dropped");
            }
            return event;
        }
    }
    None
}

/// Split `+CMD: a,b,c` into its comma fields with whitespace removed.
fn payload_fields(line: &str) -> Option<Vec<String>> {
    let (_, payload) = line.split_once(':')?;
    Some(
        payload
            .replace(' ', "")
            .split(',')
            .map(str::to_string)
            .collect(),
    )
}

fn parse_ignored(_line: &str) -> Option<ResponseEvent> {
    Some(ResponseEvent::Ignored)
}

fn parse_hardware(_line: &str) -> Option<ResponseEvent> {
    Some(ResponseEvent::HardwareFailure)
}

fn parse_areg(line: &str) -> Option<ResponseEvent> {
    let fields = payload_fields(line)?;
    let event = fields.first()?.parse().ok()?;
    let code: u8 = fields.get(1)?.parse().ok()?;
    Some(ResponseEvent::Registration {
        event,
        status: reduce_reg_error(code)?,
    })
}

fn parse_sbdreg(line: &str) -> Option<ResponseEvent> {
    let fields = payload_fields(line)?;
    let status = fields.first()?.parse().ok()?;
    let code: u8 = fields.get(1)?.parse().ok()?;
    Some(ResponseEvent::RegistrationQuery {
        status,
        error: reduce_reg_error(code)?,
    })
}

fn parse_sbdsx(line: &str) -> Option<ResponseEvent> {
    let fields = payload_fields(line)?;
    if fields.len() < 5 {
        return None;
    }
    // The trailing gateway-queue field is deliberately ignored: the modem
    // reports it unreliably, so queue depth comes from session results.
    Some(ResponseEvent::ExtendedStatus {
        mo_flag: fields[0] == "1",
        momsn: fields[1].parse::<i64>().ok()?.max(0) as u32,
        mt_flag: fields[2] == "1",
        mtmsn: fields[3].parse::<i64>().ok()?.max(0) as u32,
        ra_flag: fields[4] == "1",
    })
}

fn parse_sbdix(line: &str) -> Option<ResponseEvent> {
    let fields = payload_fields(line)?;
    if fields.len() < 6 {
        return None;
    }
    Some(ResponseEvent::Session(SessionResult {
        mo_status: fields[0].parse().ok()?,
        momsn: fields[1].parse().ok()?,
        mt_status: fields[2].parse().ok()?,
        mtmsn: fields[3].parse().ok()?,
        mt_length: fields[4].parse().ok()?,
        queue: fields[5].parse().ok()?,
    }))
}

fn parse_cier(line: &str) -> Option<ResponseEvent> {
    let fields = payload_fields(line)?;
    if fields.len() > 2 {
        return Some(ResponseEvent::SignalReporting(fields[1] == "1"));
    }
    Some(ResponseEvent::Ignored)
}

fn parse_ciev(line: &str) -> Option<ResponseEvent> {
    let (_, payload) = line.split_once(':')?;
    let payload = payload.replace(' ', "");
    let (indicator, tail) = payload.split_once(',')?;
    match indicator {
        "0" => Some(ResponseEvent::SignalQuality(tail.parse().ok()?)),
        "1" => Some(ResponseEvent::NetworkAvailable(tail == "1")),
        "2" => Some(ResponseEvent::AntennaError(tail == "1")),
        "3" => {
            let values: Vec<i32> = tail
                .split(',')
                .map(|f| f.parse::<i32>())
                .collect::<Result<_, _>>()
                .ok()?;
            if values.len() < 6 {
                return None;
            }
            Some(ResponseEvent::Ephemeris {
                sv_id: values[0],
                beam_id: values[1],
                sv_beam: values[2],
                sv_x: values[3],
                sv_y: values[4],
                sv_z: values[5],
            })
        }
        _ => None,
    }
}

fn parse_sbdring(_line: &str) -> Option<ResponseEvent> {
    Some(ResponseEvent::RingAlert)
}

fn parse_sbdmta(line: &str) -> Option<ResponseEvent> {
    Some(ResponseEvent::RingAlertConfig(line.ends_with('1')))
}

fn parse_sbdrt(_line: &str) -> Option<ResponseEvent> {
    Some(ResponseEvent::ReadText)
}

fn parse_sbdd(_line: &str) -> Option<ResponseEvent> {
    Some(ResponseEvent::ClearConfirm)
}

/// `+DATA:PK005,1;PK006,5` — semicolon-separated `type,fields` records.
/// Records without a comma are dropped individually.
fn parse_data(line: &str) -> Option<ResponseEvent> {
    let payload = line.strip_prefix("+DATA")?.trim_start_matches(':');
    let records: Vec<(String, String)> = payload
        .split(';')
        .filter_map(|record| {
            let (pkt_type, fields) = record.split_once(',')?;
            Some((pkt_type.to_string(), fields.to_string()))
        })
        .collect();
    Some(ResponseEvent::InboundData(records))
}

/// `+WPL:<cmd>;lat,3745.78;NS,N;name,BUOY001;`
fn parse_wpl(line: &str) -> Option<ResponseEvent> {
    let payload = line.strip_prefix("+WPL")?.trim_start_matches(':');
    let mut items = payload.split(';');
    let cmd = items.next()?.to_string();
    let mut fields = BTreeMap::new();
    for item in items {
        if let Some((key, value)) = item.split_once(',') {
            fields.insert(key.to_string(), value.to_string());
        }
    }
    Some(ResponseEvent::Waypoint { cmd, fields })
}
