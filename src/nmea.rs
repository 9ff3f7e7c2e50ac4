//! NMEA 0183 field parsers.
//!
//! Each parser takes the raw field text of one validated sentence and maps
//! the positional fields it cares about into named string values. Missing or
//! empty positions are simply absent from the output; a parser never fails
//! the whole sentence over one bad field.

use crate::sentence::{Sentence, SentenceSpec};
use std::collections::BTreeMap;

/// Field name to raw value. Values stay strings; consumers convert.
pub type FieldMap = BTreeMap<String, String>;

fn insert(map: &mut FieldMap, key: &str, value: Option<&str>) {
    if let Some(value) = value {
        if !value.is_empty() {
            map.insert(key.to_string(), value.to_string());
        }
    }
}

/// GGA: fix data (time, position, fix quality).
pub fn gga(fields: &[&str]) -> FieldMap {
    let mut out = FieldMap::new();
    insert(&mut out, "utc", fields.first().copied());
    insert(&mut out, "latitude", fields.get(1).copied());
    insert(&mut out, "NS", fields.get(2).copied());
    insert(&mut out, "longitude", fields.get(3).copied());
    insert(&mut out, "EW", fields.get(4).copied());
    insert(&mut out, "fix", fields.get(5).copied());
    insert(&mut out, "sats_used", fields.get(6).copied());
    insert(&mut out, "hdop", fields.get(7).copied());
    insert(&mut out, "msl_alt", fields.get(8).copied());
    out
}

/// GSA: dilution of precision and fix mode.
pub fn gsa(fields: &[&str]) -> FieldMap {
    let mut out = FieldMap::new();
    insert(&mut out, "fix_mode1", fields.first().copied());
    insert(&mut out, "fix_mode2", fields.get(1).copied());
    insert(&mut out, "pdop", fields.get(14).copied());
    insert(&mut out, "hdop", fields.get(15).copied());
    insert(&mut out, "vdop", fields.get(16).copied());
    out
}

/// RMC: recommended minimum. Empty lat/lon positions shift later fields,
/// so the parser skips holes the way the receiver emits them.
pub fn rmc(fields: &[&str]) -> FieldMap {
    let mut out = FieldMap::new();
    let mut skip = 0usize;
    insert(&mut out, "utc", fields.first().copied());
    insert(&mut out, "status", fields.get(1).copied());
    insert(&mut out, "latitude", fields.get(2).copied());
    if fields.get(2).is_none_or(|f| f.is_empty()) {
        skip += 1;
    } else {
        insert(&mut out, "NS", fields.get(3 - skip).copied());
    }
    insert(&mut out, "longitude", fields.get(4 - skip).copied());
    if fields.get(4 - skip).is_none_or(|f| f.is_empty()) {
        skip += 1;
    } else {
        insert(&mut out, "EW", fields.get(5 - skip).copied());
    }
    insert(&mut out, "speed_over_ground", fields.get(6 - skip).copied());
    insert(&mut out, "speed_over_course", fields.get(7 - skip).copied());
    insert(&mut out, "date", fields.get(8 - skip).copied());
    out
}

/// VTG: track made good and ground speed.
pub fn vtg(fields: &[&str]) -> FieldMap {
    let mut out = FieldMap::new();
    insert(&mut out, "t_course", fields.first().copied());
    insert(&mut out, "m_course", fields.get(2).copied());
    insert(&mut out, "nautical_speed", fields.get(4).copied());
    insert(&mut out, "ground_speed", fields.get(6).copied());
    out
}

/// GSV: satellites in view. Only the first satellite block is kept.
pub fn gsv(fields: &[&str]) -> FieldMap {
    let mut out = FieldMap::new();
    if fields.len() < 7 {
        return out;
    }
    insert(&mut out, "msgs", fields.first().copied());
    insert(&mut out, "seq_num", fields.get(1).copied());
    insert(&mut out, "num_sv", fields.get(2).copied());
    insert(&mut out, "sv_prn", fields.get(3).copied());
    insert(&mut out, "elevation", fields.get(4).copied());
    insert(&mut out, "azimuth", fields.get(5).copied());
    insert(&mut out, "snr", fields.get(6).copied());
    out
}

/// Route a parsed sentence to its field parser by type. The two-character
/// talker prefix is stripped and the remainder matched case-insensitively;
/// sentence types the buoy ignores (GLL, proprietary acks) yield an empty
/// map, unknown types yield `None`.
pub fn parse_fields(sentence: &Sentence, spec: &SentenceSpec) -> Option<FieldMap> {
    let suffix = sentence.pkt_type.get(2..)?.to_ascii_lowercase();
    let fields: Vec<&str> = sentence.field_iter(spec).collect();
    match suffix.as_str() {
        "gga" => Some(gga(&fields)),
        "gsa" => Some(gsa(&fields)),
        "rmc" => Some(rmc(&fields)),
        "vtg" => Some(vtg(&fields)),
        "gsv" => Some(gsv(&fields)),
        "gll" | "txt" | "ack" | "tk010" | "tk011" => Some(FieldMap::new()),
        _ => None,
    }
}
