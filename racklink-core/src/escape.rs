//! Byte stuffing for the data envelope
//!
//! HEADER, TAIL and ESCAPE may not appear inside an envelope on the wire.
//! Each of them is replaced by the two-byte sequence `ESCAPE, !byte`.

use bytes::{BufMut, BytesMut};

use crate::constants::{ESCAPE, HEADER, TAIL};

/// Check if a byte must be escaped inside an envelope
#[inline]
pub fn is_protected(byte: u8) -> bool {
    matches!(byte, HEADER | TAIL | ESCAPE)
}

/// Escape protected bytes
///
/// # Examples
///
/// ```
/// use racklink_core::escape;
///
/// let escaped = escape::escape(&[0x00, 0xFE, 0x01]);
/// assert_eq!(&escaped[..], &[0x00, 0xFD, 0x01, 0x01]);
/// ```
pub fn escape(data: &[u8]) -> BytesMut {
    let extra = data.iter().filter(|b| is_protected(**b)).count();
    let mut out = BytesMut::with_capacity(data.len() + extra);

    for &byte in data {
        if is_protected(byte) {
            out.put_u8(ESCAPE);
            out.put_u8(!byte);
        } else {
            out.put_u8(byte);
        }
    }

    out
}

/// Reverse [`escape`]
///
/// A trailing ESCAPE with no byte after it is kept as-is.
pub fn unescape(data: &[u8]) -> BytesMut {
    let mut out = BytesMut::with_capacity(data.len());
    let mut iter = data.iter().copied();

    while let Some(byte) = iter.next() {
        if byte == ESCAPE {
            match iter.next() {
                Some(next) => out.put_u8(!next),
                None => out.put_u8(byte),
            }
        } else {
            out.put_u8(byte);
        }
    }

    out
}
