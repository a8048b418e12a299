//! Message catalog for the rover link
//!
//! Five fixed-schema message kinds share a [`Timestamp`] header:
//! - Rover → Ground: Telemetry, CommandReady, CommandAck
//! - Ground → Rover: TelemetryAck, Command
//!
//! Decoding is positional and never guesses the kind: the caller reads the
//! tag from the frame and routes to [`Message::decode`] with that kind.

use crate::codec::{
    encode_text_byte, text_len, CodecError, Decoder, Encoder, Text, MAX_TEXT_LEN,
};

// Message type tags
pub const TAG_TELEMETRY: u8 = 0;
pub const TAG_TELEMETRY_ACK: u8 = 1;
pub const TAG_COMMAND_READY: u8 = 2;
pub const TAG_COMMAND: u8 = 3;
pub const TAG_COMMAND_ACK: u8 = 4;
/// No message
pub const TAG_NONE: u8 = 255;

/// The closed set of message kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MessageKind {
    Telemetry,
    TelemetryAck,
    CommandReady,
    Command,
    CommandAck,
}

impl MessageKind {
    /// Look up a kind by its wire tag
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            TAG_TELEMETRY => Some(MessageKind::Telemetry),
            TAG_TELEMETRY_ACK => Some(MessageKind::TelemetryAck),
            TAG_COMMAND_READY => Some(MessageKind::CommandReady),
            TAG_COMMAND => Some(MessageKind::Command),
            TAG_COMMAND_ACK => Some(MessageKind::CommandAck),
            _ => None,
        }
    }

    /// Wire tag for this kind
    pub fn tag(self) -> u8 {
        match self {
            MessageKind::Telemetry => TAG_TELEMETRY,
            MessageKind::TelemetryAck => TAG_TELEMETRY_ACK,
            MessageKind::CommandReady => TAG_COMMAND_READY,
            MessageKind::Command => TAG_COMMAND,
            MessageKind::CommandAck => TAG_COMMAND_ACK,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            MessageKind::Telemetry => "TELEMETRY",
            MessageKind::TelemetryAck => "TELEMETRY_ACK",
            MessageKind::CommandReady => "COMMAND_READY",
            MessageKind::Command => "COMMAND",
            MessageKind::CommandAck => "COMMAND_ACK",
        }
    }
}

/// Human-readable name for any tag byte, including unknown ones
pub fn tag_name(tag: u8) -> &'static str {
    match MessageKind::from_tag(tag) {
        Some(kind) => kind.name(),
        None if tag == TAG_NONE => "NONE",
        None => "UNKNOWN",
    }
}

/// Wall-clock time as carried on the wire
///
/// Values are copied verbatim from the producing clock and not validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timestamp {
    /// Years since 2000
    pub year: u8,
    /// 1-12
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl Timestamp {
    pub const SIZE: usize = 6;

    pub const fn new(year: u8, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Self {
        Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
        }
    }

    fn write(&self, enc: &mut Encoder<'_>) -> Result<(), CodecError> {
        enc.put_u8(self.year)?;
        enc.put_u8(self.month)?;
        enc.put_u8(self.day)?;
        enc.put_u8(self.hour)?;
        enc.put_u8(self.minute)?;
        enc.put_u8(self.second)
    }

    fn read(dec: &mut Decoder<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            year: dec.take_u8()?,
            month: dec.take_u8()?,
            day: dec.take_u8()?,
            hour: dec.take_u8()?,
            minute: dec.take_u8()?,
            second: dec.take_u8()?,
        })
    }
}

/// GPS fix reported by the rover
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LocationFix {
    /// Degrees
    pub latitude: f32,
    /// Degrees
    pub longitude: f32,
    pub altitude: f32,
    /// Ground speed
    pub speed: f32,
    /// Satellites in view
    pub satellites: u8,
    /// Heading in degrees
    pub heading: u16,
}

impl LocationFix {
    pub const SIZE: usize = 19;

    fn write(&self, enc: &mut Encoder<'_>) -> Result<(), CodecError> {
        enc.put_f32(self.latitude)?;
        enc.put_f32(self.longitude)?;
        enc.put_f32(self.altitude)?;
        enc.put_f32(self.speed)?;
        enc.put_u8(self.satellites)?;
        enc.put_u16(self.heading)
    }

    fn read(dec: &mut Decoder<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            latitude: dec.take_f32()?,
            longitude: dec.take_f32()?,
            altitude: dec.take_f32()?,
            speed: dec.take_f32()?,
            satellites: dec.take_u8()?,
            heading: dec.take_u16()?,
        })
    }
}

/// Common interface of every message kind
pub trait WireMessage: Sized {
    /// Kind written as the frame tag
    const KIND: MessageKind;

    /// Size of the fixed-width prefix; text fields come after it
    const FIXED_LEN: usize;

    /// Payload length in bytes, tag excluded
    fn length(&self) -> usize;

    /// Append the payload to `enc`
    fn serialize(&self, enc: &mut Encoder<'_>) -> Result<(), CodecError>;

    /// Decode a payload holding one message of this kind
    ///
    /// Fixed-width kinds reject leftover bytes; a text field takes them.
    fn deserialize(src: &[u8]) -> Result<Self, CodecError>;
}

/// Reject buffers shorter than a kind's fixed prefix before slicing
fn check_fixed(src: &[u8], fixed: usize) -> Result<(), CodecError> {
    if src.len() < fixed {
        return Err(CodecError::Truncated {
            needed: fixed,
            available: src.len(),
        });
    }
    Ok(())
}

/// Store text in its wire form
///
/// Code points that cannot travel as one byte are replaced up front, so the
/// stored text always fits [`Text`] and equals what the peer decodes.
fn to_text(s: &str) -> Result<Text, CodecError> {
    if s.chars().count() > MAX_TEXT_LEN {
        return Err(CodecError::TextTooLong);
    }
    let mut text = Text::new();
    for c in s.chars() {
        text.push(char::from(encode_text_byte(c)))
            .map_err(|_| CodecError::TextTooLong)?;
    }
    Ok(text)
}

/// Periodic rover report
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Telemetry {
    pub timestamp: Timestamp,
    pub location: LocationFix,
    /// Rover-side signal strength, 0 when unavailable
    pub signal_strength: i16,
    pub free_memory: u16,
    pub status: Text,
}

impl Telemetry {
    pub fn new(
        timestamp: Timestamp,
        location: LocationFix,
        signal_strength: i16,
        free_memory: u16,
        status: &str,
    ) -> Result<Self, CodecError> {
        Ok(Self {
            timestamp,
            location,
            signal_strength,
            free_memory,
            status: to_text(status)?,
        })
    }

    /// Retry count the rover embeds in its status as `retries=<n>`
    ///
    /// Tokens are separated by whitespace or commas. Missing or unparsable
    /// values count as zero.
    pub fn reported_retries(&self) -> u16 {
        self.status
            .split(|c: char| c.is_whitespace() || c == ',')
            .find_map(|token| token.strip_prefix("retries="))
            .and_then(|value| value.parse().ok())
            .unwrap_or(0)
    }
}

impl WireMessage for Telemetry {
    const KIND: MessageKind = MessageKind::Telemetry;
    const FIXED_LEN: usize = Timestamp::SIZE + LocationFix::SIZE + 2 + 2;

    fn length(&self) -> usize {
        Self::FIXED_LEN + text_len(&self.status)
    }

    fn serialize(&self, enc: &mut Encoder<'_>) -> Result<(), CodecError> {
        self.timestamp.write(enc)?;
        self.location.write(enc)?;
        enc.put_i16(self.signal_strength)?;
        enc.put_u16(self.free_memory)?;
        enc.put_text(&self.status)
    }

    fn deserialize(src: &[u8]) -> Result<Self, CodecError> {
        check_fixed(src, Self::FIXED_LEN)?;
        let mut dec = Decoder::new(src);
        let msg = Self {
            timestamp: Timestamp::read(&mut dec)?,
            location: LocationFix::read(&mut dec)?,
            signal_strength: dec.take_i16()?,
            free_memory: dec.take_u16()?,
            status: dec.take_text()?,
        };
        Ok(msg)
    }
}

/// Ground reply to a Telemetry report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TelemetryAck {
    pub timestamp: Timestamp,
    pub ack: bool,
    /// A Command is queued for the rover
    pub command_waiting: bool,
}

impl WireMessage for TelemetryAck {
    const KIND: MessageKind = MessageKind::TelemetryAck;
    const FIXED_LEN: usize = Timestamp::SIZE + 1 + 1;

    fn length(&self) -> usize {
        Self::FIXED_LEN
    }

    fn serialize(&self, enc: &mut Encoder<'_>) -> Result<(), CodecError> {
        self.timestamp.write(enc)?;
        enc.put_bool(self.ack)?;
        enc.put_bool(self.command_waiting)
    }

    fn deserialize(src: &[u8]) -> Result<Self, CodecError> {
        check_fixed(src, Self::FIXED_LEN)?;
        let mut dec = Decoder::new(src);
        let msg = Self {
            timestamp: Timestamp::read(&mut dec)?,
            ack: dec.take_bool()?,
            command_waiting: dec.take_bool()?,
        };
        dec.finish()?;
        Ok(msg)
    }
}

/// Rover signals it can accept commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CommandReady {
    pub timestamp: Timestamp,
    pub ready: bool,
}

impl WireMessage for CommandReady {
    const KIND: MessageKind = MessageKind::CommandReady;
    const FIXED_LEN: usize = Timestamp::SIZE + 1;

    fn length(&self) -> usize {
        Self::FIXED_LEN
    }

    fn serialize(&self, enc: &mut Encoder<'_>) -> Result<(), CodecError> {
        self.timestamp.write(enc)?;
        enc.put_bool(self.ready)
    }

    fn deserialize(src: &[u8]) -> Result<Self, CodecError> {
        check_fixed(src, Self::FIXED_LEN)?;
        let mut dec = Decoder::new(src);
        let msg = Self {
            timestamp: Timestamp::read(&mut dec)?,
            ready: dec.take_bool()?,
        };
        dec.finish()?;
        Ok(msg)
    }
}

/// Ground → rover instruction
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Command {
    pub timestamp: Timestamp,
    /// Last command of the current sequence
    pub sequence_complete: bool,
    pub command: Text,
}

impl Command {
    pub fn new(
        timestamp: Timestamp,
        sequence_complete: bool,
        command: &str,
    ) -> Result<Self, CodecError> {
        Ok(Self {
            timestamp,
            sequence_complete,
            command: to_text(command)?,
        })
    }
}

impl WireMessage for Command {
    const KIND: MessageKind = MessageKind::Command;
    const FIXED_LEN: usize = Timestamp::SIZE + 1;

    fn length(&self) -> usize {
        Self::FIXED_LEN + text_len(&self.command)
    }

    fn serialize(&self, enc: &mut Encoder<'_>) -> Result<(), CodecError> {
        self.timestamp.write(enc)?;
        enc.put_bool(self.sequence_complete)?;
        enc.put_text(&self.command)
    }

    fn deserialize(src: &[u8]) -> Result<Self, CodecError> {
        check_fixed(src, Self::FIXED_LEN)?;
        let mut dec = Decoder::new(src);
        let msg = Self {
            timestamp: Timestamp::read(&mut dec)?,
            sequence_complete: dec.take_bool()?,
            command: dec.take_text()?,
        };
        Ok(msg)
    }
}

/// Rover confirms a Command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CommandAck {
    pub timestamp: Timestamp,
    pub ack: bool,
}

impl WireMessage for CommandAck {
    const KIND: MessageKind = MessageKind::CommandAck;
    const FIXED_LEN: usize = Timestamp::SIZE + 1;

    fn length(&self) -> usize {
        Self::FIXED_LEN
    }

    fn serialize(&self, enc: &mut Encoder<'_>) -> Result<(), CodecError> {
        self.timestamp.write(enc)?;
        enc.put_bool(self.ack)
    }

    fn deserialize(src: &[u8]) -> Result<Self, CodecError> {
        check_fixed(src, Self::FIXED_LEN)?;
        let mut dec = Decoder::new(src);
        let msg = Self {
            timestamp: Timestamp::read(&mut dec)?,
            ack: dec.take_bool()?,
        };
        dec.finish()?;
        Ok(msg)
    }
}

/// Any message on the link
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Message {
    Telemetry(Telemetry),
    TelemetryAck(TelemetryAck),
    CommandReady(CommandReady),
    Command(Command),
    CommandAck(CommandAck),
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::Telemetry(_) => MessageKind::Telemetry,
            Message::TelemetryAck(_) => MessageKind::TelemetryAck,
            Message::CommandReady(_) => MessageKind::CommandReady,
            Message::Command(_) => MessageKind::Command,
            Message::CommandAck(_) => MessageKind::CommandAck,
        }
    }

    /// Payload length in bytes, tag excluded
    pub fn length(&self) -> usize {
        match self {
            Message::Telemetry(m) => m.length(),
            Message::TelemetryAck(m) => m.length(),
            Message::CommandReady(m) => m.length(),
            Message::Command(m) => m.length(),
            Message::CommandAck(m) => m.length(),
        }
    }

    pub fn serialize(&self, enc: &mut Encoder<'_>) -> Result<(), CodecError> {
        match self {
            Message::Telemetry(m) => m.serialize(enc),
            Message::TelemetryAck(m) => m.serialize(enc),
            Message::CommandReady(m) => m.serialize(enc),
            Message::Command(m) => m.serialize(enc),
            Message::CommandAck(m) => m.serialize(enc),
        }
    }

    /// Decode a payload whose kind was read from the frame tag
    pub fn decode(kind: MessageKind, payload: &[u8]) -> Result<Self, CodecError> {
        Ok(match kind {
            MessageKind::Telemetry => Message::Telemetry(Telemetry::deserialize(payload)?),
            MessageKind::TelemetryAck => {
                Message::TelemetryAck(TelemetryAck::deserialize(payload)?)
            }
            MessageKind::CommandReady => {
                Message::CommandReady(CommandReady::deserialize(payload)?)
            }
            MessageKind::Command => Message::Command(Command::deserialize(payload)?),
            MessageKind::CommandAck => Message::CommandAck(CommandAck::deserialize(payload)?),
        })
    }
}

impl From<Telemetry> for Message {
    fn from(m: Telemetry) -> Self {
        Message::Telemetry(m)
    }
}

impl From<TelemetryAck> for Message {
    fn from(m: TelemetryAck) -> Self {
        Message::TelemetryAck(m)
    }
}

impl From<CommandReady> for Message {
    fn from(m: CommandReady) -> Self {
        Message::CommandReady(m)
    }
}

impl From<Command> for Message {
    fn from(m: Command) -> Self {
        Message::Command(m)
    }
}

impl From<CommandAck> for Message {
    fn from(m: CommandAck) -> Self {
        Message::CommandAck(m)
    }
}
