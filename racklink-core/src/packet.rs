//! RackLink packet structure and encoding/decoding

use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;
use tracing::trace;

use crate::{
    checksum,
    command::{Command, Subcommand},
    constants::{DESTINATION, HEADER, TAIL},
    error::{Error, Result},
    escape,
};

/// Bytes surrounding the escaped envelope: header, length, checksum, tail
pub const OVERHEAD: usize = 4;

/// Smallest well-formed packet
pub const MIN_PACKET_SIZE: usize = OVERHEAD + 1;

/// Largest escaped envelope the length byte may declare
pub const MAX_ENVELOPE_SIZE: usize = 250;

/// Semantic content of a packet
///
/// # Packet Structure
///
/// ```text
/// ┌────────┬────────┬──────────────────────┬──────────┬────────┐
/// │ Header │ Length │   Escaped envelope   │ Checksum │  Tail  │
/// │  0xFE  │ 1 byte │     Length bytes     │  7 bits  │  0xFF  │
/// └────────┴────────┴──────────────────────┴──────────┴────────┘
///
/// envelope = destination | command | subcommand | payload...
/// ```
///
/// Command and subcommand are kept as raw bytes so that replies carrying
/// opcodes this crate does not know still parse; use [`Envelope::command`]
/// and [`Envelope::subcommand`] for typed views.
///
/// # Examples
///
/// ```
/// use racklink_core::{Command, Envelope, Subcommand};
///
/// let envelope = Envelope::new(Command::OutletCount, Subcommand::Get);
/// let encoded = envelope.encode().unwrap();
///
/// let decoded = Envelope::decode(&encoded).unwrap();
/// assert_eq!(envelope, decoded);
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Addressed unit (0x00 from the client)
    pub destination: u8,

    /// Command code
    pub command: u8,

    /// Subcommand code
    pub subcommand: u8,

    /// Command-specific data
    pub payload: Bytes,
}

impl Envelope {
    /// Destination, command and subcommand
    pub const MIN_SIZE: usize = 3;

    /// Create an envelope with empty payload
    pub fn new(command: impl Into<u8>, subcommand: impl Into<u8>) -> Self {
        Self {
            destination: DESTINATION,
            command: command.into(),
            subcommand: subcommand.into(),
            payload: Bytes::new(),
        }
    }

    /// Create an envelope with payload
    ///
    /// # Examples
    ///
    /// ```
    /// use racklink_core::{Command, Envelope, Subcommand};
    ///
    /// let envelope = Envelope::with_payload(Command::PowerOutlets, Subcommand::Set, vec![3, 1]);
    /// assert_eq!(envelope.payload.len(), 2);
    /// ```
    pub fn with_payload(
        command: impl Into<u8>,
        subcommand: impl Into<u8>,
        payload: impl Into<Bytes>,
    ) -> Self {
        Self {
            destination: DESTINATION,
            command: command.into(),
            subcommand: subcommand.into(),
            payload: payload.into(),
        }
    }

    /// Address the envelope to another destination
    pub fn with_destination(mut self, destination: u8) -> Self {
        self.destination = destination;
        self
    }

    /// Split an unescaped envelope into its fields
    pub fn from_bytes(raw: &[u8]) -> Result<Self> {
        if raw.len() < Self::MIN_SIZE {
            return Err(Error::EnvelopeTooShort(raw.len()));
        }

        Ok(Self {
            destination: raw[0],
            command: raw[1],
            subcommand: raw[2],
            payload: Bytes::copy_from_slice(&raw[3..]),
        })
    }

    /// Flatten into unescaped envelope bytes
    pub fn to_bytes(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(self.size());
        buf.put_u8(self.destination);
        buf.put_u8(self.command);
        buf.put_u8(self.subcommand);
        buf.put_slice(&self.payload);
        buf
    }

    /// Encode into a complete packet
    ///
    /// # Errors
    ///
    /// Returns [`Error::EnvelopeTooLarge`] if the escaped envelope exceeds
    /// [`MAX_ENVELOPE_SIZE`].
    pub fn encode(&self) -> Result<BytesMut> {
        build_packet(&self.to_bytes())
    }

    /// Decode a complete packet
    pub fn decode(packet: &[u8]) -> Result<Self> {
        parse_packet(packet)
    }

    /// Typed command, if known
    pub fn command(&self) -> Option<Command> {
        Command::try_from(self.command).ok()
    }

    /// Typed subcommand, if known
    pub fn subcommand(&self) -> Option<Subcommand> {
        Subcommand::try_from(self.subcommand).ok()
    }

    /// Check command and subcommand at once
    pub fn is(&self, command: Command, subcommand: Subcommand) -> bool {
        self.command == u8::from(command) && self.subcommand == u8::from(subcommand)
    }

    /// Check if this is a device-side rejection
    pub fn is_nack(&self) -> bool {
        self.command == u8::from(Command::Nack)
    }

    /// Check if this is an unsolicited keepalive from the device
    pub fn is_keepalive(&self) -> bool {
        self.is(Command::Ping, Subcommand::Set)
    }

    /// Unescaped envelope size
    pub fn size(&self) -> usize {
        Self::MIN_SIZE + self.payload.len()
    }
}

/// Build a packet from unescaped envelope bytes
///
/// The length byte counts the escaped envelope; the checksum covers the
/// unescaped one.
pub fn build_packet(envelope: &[u8]) -> Result<BytesMut> {
    let escaped = escape::escape(envelope);

    if escaped.len() > MAX_ENVELOPE_SIZE {
        return Err(Error::EnvelopeTooLarge {
            size: escaped.len(),
            max: MAX_ENVELOPE_SIZE,
        });
    }

    let length = escaped.len() as u8;
    let checksum = checksum::calculate(HEADER, length, envelope);

    let mut buf = BytesMut::with_capacity(OVERHEAD + escaped.len());
    buf.put_u8(HEADER);
    buf.put_u8(length);
    buf.put_slice(&escaped);
    buf.put_u8(checksum);
    buf.put_u8(TAIL);

    trace!(
        length = length,
        checksum = format!("0x{:02X}", checksum),
        envelope = hex::encode(envelope),
        "Built packet"
    );

    Ok(buf)
}

/// Parse a complete packet into its envelope
///
/// # Errors
///
/// Returns an error if:
/// - Packet is shorter than [`MIN_PACKET_SIZE`]
/// - Header or tail marker is wrong
/// - Declared length disagrees with the packet size
/// - Checksum verification fails
/// - Unescaped envelope is shorter than 3 bytes
pub fn parse_packet(packet: &[u8]) -> Result<Envelope> {
    trace!(packet = hex::encode(packet), "Parsing packet");

    if packet.len() < MIN_PACKET_SIZE {
        return Err(Error::PacketTooShort {
            expected: MIN_PACKET_SIZE,
            actual: packet.len(),
        });
    }

    let header = packet[0];
    let tail = packet[packet.len() - 1];
    if header != HEADER || tail != TAIL {
        return Err(Error::InvalidFraming { header, tail });
    }

    let length = packet[1];
    let carried = packet.len() - OVERHEAD;
    if length as usize != carried {
        return Err(Error::LengthMismatch {
            declared: length as usize,
            actual: carried,
        });
    }

    let escaped = &packet[2..packet.len() - 2];
    let received = packet[packet.len() - 2];
    let envelope = escape::unescape(escaped);

    let expected = checksum::calculate(HEADER, length, &envelope);
    if expected != received {
        return Err(Error::ChecksumMismatch { expected, received });
    }

    Envelope::from_bytes(&envelope)
}

impl fmt::Debug for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Envelope")
            .field("destination", &format!("0x{:02X}", self.destination))
            .field("command", &format!("0x{:02X}", self.command))
            .field("subcommand", &format!("0x{:02X}", self.subcommand))
            .field("payload", &hex::encode(&self.payload))
            .finish()
    }
}

impl fmt::Display for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.command() {
            Some(cmd) => write!(f, "Envelope[{}]", cmd)?,
            None => write!(f, "Envelope[0x{:02X}]", self.command)?,
        }
        match self.subcommand() {
            Some(sub) => write!(f, "(sub={}, len={})", sub.name(), self.payload.len()),
            None => write!(f, "(sub=0x{:02X}, len={})", self.subcommand, self.payload.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn login_envelope() -> Envelope {
        Envelope::with_payload(Command::Login, Subcommand::Set, &b"user|password"[..])
    }

    #[test]
    fn test_build_login_packet() {
        let packet = login_envelope().encode().unwrap();

        assert_eq!(packet[0], HEADER);
        assert_eq!(packet[1], 0x10);
        assert_eq!(&packet[2..5], &[0x00, 0x02, 0x01]);
        assert_eq!(&packet[5..18], b"user|password");
        assert_eq!(packet[18], 0x3F);
        assert_eq!(packet[19], TAIL);
    }

    #[test]
    fn test_build_escapes_and_counts_escaped_length() {
        let envelope = Envelope::with_payload(Command::OutletName, Subcommand::Response, vec![0xFE]);
        let packet = envelope.encode().unwrap();

        // 3 header bytes + ESCAPE + inverted byte
        assert_eq!(packet[1], 5);
        assert_eq!(&packet[5..7], &[0xFD, 0x01]);
        assert_eq!(Envelope::decode(&packet).unwrap(), envelope);
    }

    #[test]
    fn test_parse_splits_fields() {
        let raw = [0x00, 0x21, 0x10, 0x01, b'A', b'B'];
        let packet = build_packet(&raw).unwrap();
        let envelope = parse_packet(&packet).unwrap();

        assert_eq!(envelope.destination, 0x00);
        assert_eq!(envelope.command(), Some(Command::OutletName));
        assert_eq!(envelope.subcommand(), Some(Subcommand::Response));
        assert_eq!(envelope.payload.as_ref(), &[0x01, b'A', b'B']);
    }

    #[test]
    fn test_parse_unknown_opcodes() {
        let packet = build_packet(&[0x00, 0x77, 0x33]).unwrap();
        let envelope = parse_packet(&packet).unwrap();

        assert_eq!(envelope.command, 0x77);
        assert_eq!(envelope.command(), None);
        assert_eq!(envelope.subcommand(), None);
    }

    #[test]
    fn test_packet_too_short() {
        let result = parse_packet(&[HEADER, 0x00, 0x7E, TAIL]);
        assert!(matches!(result, Err(Error::PacketTooShort { actual: 4, .. })));
    }

    #[test]
    fn test_invalid_framing() {
        let mut packet = login_envelope().encode().unwrap();
        let last = packet.len() - 1;
        packet[last] = 0x00;

        assert!(matches!(
            parse_packet(&packet),
            Err(Error::InvalidFraming { tail: 0x00, .. })
        ));
    }

    #[test]
    fn test_length_mismatch() {
        let mut packet = login_envelope().encode().unwrap();
        packet[1] = 0x11;

        assert!(matches!(
            parse_packet(&packet),
            Err(Error::LengthMismatch { declared: 0x11, actual: 0x10 })
        ));
    }

    #[test]
    fn test_checksum_mismatch() {
        let mut packet = login_envelope().encode().unwrap();
        packet[18] ^= 0x01;

        let err = parse_packet(&packet).unwrap_err();
        assert!(err.is_malformed());
        assert!(matches!(err, Error::ChecksumMismatch { expected: 0x3F, received: 0x3E }));
    }

    #[test]
    fn test_envelope_too_short() {
        let packet = build_packet(&[0x00, 0x01]).unwrap();
        assert!(matches!(parse_packet(&packet), Err(Error::EnvelopeTooShort(2))));
    }

    #[test]
    fn test_envelope_too_large() {
        // every byte doubles when escaped
        let payload = vec![0xFF; 124];
        let envelope = Envelope::with_payload(Command::OutletName, Subcommand::Set, payload);

        assert!(matches!(
            envelope.encode(),
            Err(Error::EnvelopeTooLarge { size: 251, max: MAX_ENVELOPE_SIZE })
        ));
    }

    #[test]
    fn test_keepalive_and_nack() {
        assert!(Envelope::new(Command::Ping, Subcommand::Set).is_keepalive());
        assert!(!Envelope::new(Command::Ping, Subcommand::Response).is_keepalive());
        assert!(Envelope::with_payload(Command::Nack, Subcommand::Response, vec![0x05]).is_nack());
    }

    #[test]
    fn test_display() {
        let envelope = Envelope::with_payload(Command::OutletCount, Subcommand::Response, vec![8]);
        assert_eq!(
            envelope.to_string(),
            "Envelope[CMD_OUTLET_COUNT(0x22)](sub=SUB_RESPONSE, len=1)"
        );
    }

    fn arb_envelope() -> impl Strategy<Value = Vec<u8>> {
        proptest::collection::vec(any::<u8>(), Envelope::MIN_SIZE..=125)
    }

    proptest! {
        #[test]
        fn prop_build_frames_correctly(raw in arb_envelope()) {
            let packet = build_packet(&raw).unwrap();

            prop_assert_eq!(packet[0], HEADER);
            prop_assert_eq!(packet[packet.len() - 1], TAIL);
            prop_assert_eq!(packet[1] as usize, packet.len() - OVERHEAD);
        }

        #[test]
        fn prop_parse_inverts_build(raw in arb_envelope()) {
            let packet = build_packet(&raw).unwrap();
            let envelope = parse_packet(&packet).unwrap();

            prop_assert_eq!(&envelope.to_bytes()[..], &raw[..]);
        }

        #[test]
        fn prop_tampered_envelope_fails_checksum(
            raw in proptest::collection::vec(0u8..0x80, Envelope::MIN_SIZE..=120),
            index in any::<prop::sample::Index>(),
        ) {
            let mut packet = build_packet(&raw).unwrap();
            let position = 2 + index.index(raw.len());
            packet[position] ^= 0x01;

            let is_checksum_mismatch = matches!(parse_packet(&packet), Err(Error::ChecksumMismatch { .. }));
            prop_assert!(is_checksum_mismatch);
        }

        #[test]
        fn prop_tampered_checksum_fails(raw in arb_envelope()) {
            let mut packet = build_packet(&raw).unwrap();
            let position = packet.len() - 2;
            packet[position] ^= 0x01;

            let is_checksum_mismatch = matches!(parse_packet(&packet), Err(Error::ChecksumMismatch { .. }));
            prop_assert!(is_checksum_mismatch);
        }
    }
}
