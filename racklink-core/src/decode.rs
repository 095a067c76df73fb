//! Payload decoders for RESPONSE envelopes
//!
//! All decoders are lenient: a payload that does not carry the expected
//! data yields `None` rather than an error.

use crate::constants::outlet;

/// Outlet count from an OUTLET_COUNT response (`[count]`)
pub fn outlet_count(payload: &[u8]) -> Option<u8> {
    payload.first().copied()
}

/// Power state from a POWER_OUTLETS response (`[index, state]`)
pub fn outlet_state(payload: &[u8]) -> Option<bool> {
    payload.get(1).map(|state| *state == outlet::ON)
}

/// Name from an OUTLET_NAME response (`[index, name...]`)
///
/// Non-ASCII bytes are dropped and trailing NUL padding is trimmed.
pub fn outlet_name(payload: &[u8]) -> Option<String> {
    if payload.len() < 2 {
        return None;
    }

    let name: String = payload[1..]
        .iter()
        .filter(|b| b.is_ascii())
        .map(|b| *b as char)
        .collect();

    Some(name.trim_end_matches('\0').to_string())
}

/// Sensor value from an ASCII-encoded sensor response
///
/// Surrounding whitespace and trailing `,`, ` ` and `\0` are stripped before
/// parsing. Empty or non-numeric strings yield `None`.
///
/// # Examples
///
/// ```
/// use racklink_core::decode;
///
/// assert_eq!(decode::sensor_value(b"72.5,\0"), Some(72.5));
/// assert_eq!(decode::sensor_value(b",\0"), None);
/// ```
pub fn sensor_value(payload: &[u8]) -> Option<f64> {
    let text: String = payload
        .iter()
        .filter(|b| b.is_ascii())
        .map(|b| *b as char)
        .collect();

    let value = text
        .trim()
        .trim_end_matches(|c: char| matches!(c, ',' | ' ' | '\0'));

    if value.is_empty() {
        return None;
    }

    value.parse::<f64>().ok()
}

/// Error code carried by a NACK envelope, 0 when absent
pub fn nack_code(payload: &[u8]) -> u8 {
    payload.first().copied().unwrap_or(0)
}
