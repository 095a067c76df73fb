//! RackLink checksum algorithm
//!
//! 1. Sum HEADER, the escaped LENGTH byte and every byte of the unescaped envelope
//! 2. Keep the low 7 bits

use tracing::trace;

/// Calculate a packet checksum
///
/// `length` is the length of the escaped envelope as it appears on the wire,
/// while `envelope` is the unescaped envelope.
///
/// # Examples
///
/// ```
/// use racklink_core::checksum;
///
/// let mut envelope = vec![0x00, 0x02, 0x01];
/// envelope.extend_from_slice(b"user|password");
///
/// assert_eq!(checksum::calculate(0xFE, 0x10, &envelope), 0x3F);
/// ```
pub fn calculate(header: u8, length: u8, envelope: &[u8]) -> u8 {
    let sum = envelope
        .iter()
        .fold(header as u32 + length as u32, |acc, b| acc + *b as u32);

    let checksum = (sum & 0x7F) as u8;

    trace!(
        length = length,
        envelope_len = envelope.len(),
        checksum = format!("0x{:02X}", checksum),
        "Calculated checksum"
    );

    checksum
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::HEADER;

    fn login_envelope() -> Vec<u8> {
        let mut envelope = vec![0x00, 0x02, 0x01];
        envelope.extend_from_slice(b"user|password");
        envelope
    }

    #[test]
    fn test_checksum_manual_example() {
        assert_eq!(calculate(HEADER, 0x10, &login_envelope()), 0x3F);
    }

    #[test]
    fn test_checksum_is_seven_bit() {
        let envelope = vec![0xFC; 250];
        assert!(calculate(HEADER, 250, &envelope) <= 0x7F);
    }

    #[test]
    fn test_checksum_depends_on_length() {
        let envelope = [0x00, 0x01, 0x01];
        assert_ne!(calculate(HEADER, 3, &envelope), calculate(HEADER, 4, &envelope));
    }

    #[test]
    fn test_checksum_empty_envelope() {
        // 0xFE & 0x7F
        assert_eq!(calculate(HEADER, 0, &[]), 0x7E);
    }
}
