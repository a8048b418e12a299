//! Frame encoding and decoding for the rover link
//!
//! Frame format:
//! - LINK HEADER (5 bytes, explicit mode only): length, to, from, id, flags
//! - TAG (1 byte): message kind
//! - PAYLOAD: the message body
//!
//! The length byte counts everything after itself. The rover's radio stack
//! consumes the header on its side; whether the ground writes it here or
//! the transceiver driver does is a deployment choice ([`HeaderMode`]).

use heapless::Vec;

use crate::codec::{CodecError, Encoder};
use crate::messages::{Message, MessageKind};

/// Size of the link header in explicit mode
pub const LINK_HEADER_LEN: usize = 5;

/// Largest frame a one-byte length field can describe
pub const MAX_FRAME_LEN: usize = 255;

/// Largest frame the transceiver accepts with AES enabled
pub const MAX_ENCRYPTED_FRAME_LEN: usize = 64;

/// Broadcast addressing used for every outbound frame
pub const BROADCAST: u8 = 0xFF;

/// Errors that can occur during frame encoding or decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Encoded frame would exceed the configured maximum
    Oversized { len: usize, max: usize },
    /// Received frame too short to hold a header and tag
    TooShort(usize),
    /// Length byte disagrees with the received size
    LengthMismatch { declared: usize, actual: usize },
    /// Tag does not name a known message kind
    UnknownTag(u8),
    /// Output buffer too small for the frame
    BufferTooSmall,
    /// Payload failed to decode
    Codec(CodecError),
}

impl From<CodecError> for FrameError {
    fn from(e: CodecError) -> Self {
        match e {
            CodecError::BufferTooSmall => FrameError::BufferTooSmall,
            other => FrameError::Codec(other),
        }
    }
}

/// Whether the link header travels through the frame codec
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HeaderMode {
    /// Codec writes and strips the 5-byte header
    #[default]
    Explicit,
    /// Header handled below the codec, by the transceiver driver
    Implicit,
}

impl HeaderMode {
    /// Bytes this mode adds in front of the tag
    pub const fn overhead(self) -> usize {
        match self {
            HeaderMode::Explicit => LINK_HEADER_LEN,
            HeaderMode::Implicit => 0,
        }
    }
}

/// Addressing fields of a received link header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkHeader {
    pub to: u8,
    pub from: u8,
    pub id: u8,
    pub flags: u8,
}

impl LinkHeader {
    /// Header the ground station writes on every frame
    pub const BROADCAST: Self = Self {
        to: BROADCAST,
        from: BROADCAST,
        id: 0,
        flags: 0,
    };
}

/// A received frame split into tag and payload, uninterpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawFrame<'a> {
    /// Present only in explicit mode
    pub header: Option<LinkHeader>,
    pub tag: u8,
    pub payload: &'a [u8],
}

impl<'a> RawFrame<'a> {
    pub fn kind(&self) -> Option<MessageKind> {
        MessageKind::from_tag(self.tag)
    }
}

/// Frame codec configured for one deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FrameCodec {
    header: HeaderMode,
    max_len: usize,
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new(HeaderMode::Explicit, MAX_ENCRYPTED_FRAME_LEN)
    }
}

impl FrameCodec {
    /// Create a codec; `max_len` is capped at [`MAX_FRAME_LEN`]
    pub const fn new(header: HeaderMode, max_len: usize) -> Self {
        let max_len = if max_len > MAX_FRAME_LEN {
            MAX_FRAME_LEN
        } else {
            max_len
        };
        Self { header, max_len }
    }

    pub fn header_mode(&self) -> HeaderMode {
        self.header
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Total bytes `msg` occupies on the air, header and tag included
    pub fn frame_len(&self, msg: &Message) -> usize {
        self.header.overhead() + 1 + msg.length()
    }

    /// Encode `msg` into `buffer`
    ///
    /// Returns the number of bytes written. Size is checked against the
    /// configured maximum before anything is written.
    pub fn encode(&self, msg: &Message, buffer: &mut [u8]) -> Result<usize, FrameError> {
        let len = self.frame_len(msg);
        if len > self.max_len {
            return Err(FrameError::Oversized {
                len,
                max: self.max_len,
            });
        }
        if buffer.len() < len {
            return Err(FrameError::BufferTooSmall);
        }

        let mut enc = Encoder::new(&mut buffer[..len]);
        if self.header == HeaderMode::Explicit {
            let h = LinkHeader::BROADCAST;
            // len <= MAX_FRAME_LEN, so the length byte cannot wrap
            enc.put_u8((len - 1) as u8)?;
            enc.put_u8(h.to)?;
            enc.put_u8(h.from)?;
            enc.put_u8(h.id)?;
            enc.put_u8(h.flags)?;
        }
        enc.put_u8(msg.kind().tag())?;
        msg.serialize(&mut enc)?;

        Ok(enc.finish())
    }

    /// Encode `msg` into a heapless Vec
    pub fn encode_to_vec(&self, msg: &Message) -> Result<Vec<u8, MAX_FRAME_LEN>, FrameError> {
        let mut buffer = [0u8; MAX_FRAME_LEN];
        let len = self.encode(msg, &mut buffer)?;
        Vec::from_slice(&buffer[..len]).map_err(|_| FrameError::BufferTooSmall)
    }

    /// Split a received frame into header, tag and payload
    ///
    /// In explicit mode the length byte must match the received size. The
    /// addressing fields are returned as received and not filtered.
    pub fn decode<'a>(&self, bytes: &'a [u8]) -> Result<RawFrame<'a>, FrameError> {
        let overhead = self.header.overhead();
        if bytes.len() < overhead + 1 {
            return Err(FrameError::TooShort(bytes.len()));
        }

        let (header, body) = match self.header {
            HeaderMode::Explicit => {
                let declared = bytes[0] as usize;
                let actual = bytes.len() - 1;
                if declared != actual {
                    return Err(FrameError::LengthMismatch { declared, actual });
                }
                let header = LinkHeader {
                    to: bytes[1],
                    from: bytes[2],
                    id: bytes[3],
                    flags: bytes[4],
                };
                (Some(header), &bytes[LINK_HEADER_LEN..])
            }
            HeaderMode::Implicit => (None, bytes),
        };

        Ok(RawFrame {
            header,
            tag: body[0],
            payload: &body[1..],
        })
    }

    /// Decode a frame all the way to a typed message
    pub fn decode_message(&self, bytes: &[u8]) -> Result<Message, FrameError> {
        let frame = self.decode(bytes)?;
        let kind = frame.kind().ok_or(FrameError::UnknownTag(frame.tag))?;
        Ok(Message::decode(kind, frame.payload)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{Command, CommandAck, TelemetryAck, Timestamp};

    const STAMP: Timestamp = Timestamp::new(24, 6, 1, 12, 0, 0);

    fn ack() -> Message {
        TelemetryAck {
            timestamp: STAMP,
            ack: true,
            command_waiting: false,
        }
        .into()
    }

    #[test]
    fn test_explicit_header_layout() {
        let codec = FrameCodec::new(HeaderMode::Explicit, 64);
        let bytes = codec.encode_to_vec(&ack()).unwrap();

        assert_eq!(bytes.len(), 14);
        assert_eq!(
            bytes.as_slice(),
            &[13, 0xFF, 0xFF, 0x00, 0x00, 1, 24, 6, 1, 12, 0, 0, 1, 0]
        );
    }

    #[test]
    fn test_implicit_header_is_tag_then_body() {
        let codec = FrameCodec::new(HeaderMode::Implicit, 64);
        let bytes = codec.encode_to_vec(&ack()).unwrap();
        assert_eq!(bytes.as_slice(), &[1, 24, 6, 1, 12, 0, 0, 1, 0]);
    }

    #[test]
    fn test_oversized_rejected_before_write() {
        let mut text = heapless::String::<80>::new();
        for _ in 0..60 {
            text.push('x').unwrap();
        }
        let cmd: Message = Command::new(STAMP, false, &text).unwrap().into();
        let codec = FrameCodec::new(HeaderMode::Explicit, 64);

        let mut buffer = [0xAAu8; 128];
        assert_eq!(
            codec.encode(&cmd, &mut buffer),
            Err(FrameError::Oversized { len: 74, max: 64 })
        );
        assert!(buffer.iter().all(|&b| b == 0xAA));

        // The same message fits without encryption
        let roomy = FrameCodec::new(HeaderMode::Explicit, MAX_FRAME_LEN);
        assert_eq!(roomy.encode(&cmd, &mut buffer), Ok(74));
    }

    #[test]
    fn test_max_len_capped() {
        assert_eq!(FrameCodec::new(HeaderMode::Implicit, 1000).max_len(), 255);
    }

    #[test]
    fn test_decode_strips_header() {
        let bytes = [8u8, 0xFF, 0xFF, 0x00, 0x00, 4, 24, 6, 1, 12, 0, 0, 1];
        let frame = FrameCodec::default().decode(&bytes).unwrap();
        assert_eq!(frame.tag, 4);
        assert_eq!(frame.kind(), Some(MessageKind::CommandAck));
        assert_eq!(frame.payload, &bytes[6..]);
        assert_eq!(frame.header, Some(LinkHeader::BROADCAST));
    }

    #[test]
    fn test_decode_rejects_bad_length_byte() {
        let bytes = [20u8, 0xFF, 0xFF, 0x00, 0x00, 4, 24];
        assert_eq!(
            FrameCodec::default().decode(&bytes),
            Err(FrameError::LengthMismatch {
                declared: 20,
                actual: 6
            })
        );
    }

    #[test]
    fn test_decode_too_short() {
        let explicit = FrameCodec::default();
        let implicit = FrameCodec::new(HeaderMode::Implicit, 64);
        assert_eq!(explicit.decode(&[5, 0xFF, 0xFF, 0, 0]), Err(FrameError::TooShort(5)));
        assert_eq!(implicit.decode(&[]), Err(FrameError::TooShort(0)));

        let tag_only = implicit.decode(&[2]).unwrap();
        assert_eq!(tag_only.tag, 2);
        assert!(tag_only.payload.is_empty());
    }

    #[test]
    fn test_decode_message_roundtrip() {
        let codec = FrameCodec::new(HeaderMode::Explicit, 64);
        let msg: Message = CommandAck {
            timestamp: STAMP,
            ack: true,
        }
        .into();
        let bytes = codec.encode_to_vec(&msg).unwrap();
        assert_eq!(codec.decode_message(&bytes), Ok(msg));
    }

    #[test]
    fn test_decode_message_unknown_tag() {
        let codec = FrameCodec::new(HeaderMode::Implicit, 64);
        assert_eq!(
            codec.decode_message(&[9, 1, 2, 3]),
            Err(FrameError::UnknownTag(9))
        );
        assert_eq!(
            codec.decode_message(&[3, 24, 6]),
            Err(FrameError::Codec(CodecError::Truncated {
                needed: 7,
                available: 2
            }))
        );
    }
}
