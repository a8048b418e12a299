//! Little-endian primitive codec
//!
//! Every field on the rover link is fixed width except text, which is sent
//! as one byte per code point followed by a single zero terminator. Text is
//! always the last field of a message, so no length prefix is transmitted
//! and the decoder reads it to the end of the payload.
//!
//! Encoding uses per-call stack arrays or a caller-supplied output slice;
//! nothing here keeps state between calls.

use heapless::String;

/// Longest text field, in code points (terminator excluded)
pub const MAX_TEXT_LEN: usize = 255;

/// Storage needed for a decoded text field. Code points 128..=255 take two
/// bytes once stored as UTF-8.
pub const TEXT_CAPACITY: usize = 2 * MAX_TEXT_LEN;

/// Owned text field
pub type Text = String<TEXT_CAPACITY>;

/// Terminator written after every text field
pub const TEXT_TERMINATOR: u8 = 0x00;

/// Byte emitted for code points that cannot be sent as a single byte
pub const REPLACEMENT_BYTE: u8 = b'#';

/// Errors raised while encoding or decoding primitives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CodecError {
    /// Source ended before a fixed-width field was complete
    Truncated { needed: usize, available: usize },
    /// Bytes left over after the final field
    TrailingBytes(usize),
    /// Decoded text exceeds [`TEXT_CAPACITY`]
    TextTooLong,
    /// Destination buffer too small for the encoded value
    BufferTooSmall,
}

/// Encode a boolean as `1`/`0`
pub const fn encode_bool(value: bool) -> u8 {
    if value {
        1
    } else {
        0
    }
}

pub fn encode_i16(value: i16) -> [u8; 2] {
    value.to_le_bytes()
}

pub fn encode_u16(value: u16) -> [u8; 2] {
    value.to_le_bytes()
}

pub fn encode_f32(value: f32) -> [u8; 4] {
    value.to_bits().to_le_bytes()
}

/// Map one code point to its wire byte
///
/// Code points above 255 become `#`. So does NUL, which would otherwise
/// read as an early terminator.
pub fn encode_text_byte(c: char) -> u8 {
    match c as u32 {
        0 => REPLACEMENT_BYTE,
        cp @ 1..=0xFF => cp as u8,
        _ => REPLACEMENT_BYTE,
    }
}

/// Encoded size of a text field, terminator included
pub fn text_len(text: &str) -> usize {
    text.chars().count() + 1
}

/// Copy a fixed-width field out of `buf` starting at `offset`
fn field<const N: usize>(buf: &[u8], offset: usize) -> Result<[u8; N], CodecError> {
    let available = buf.len().saturating_sub(offset);
    if available < N {
        return Err(CodecError::Truncated {
            needed: N,
            available,
        });
    }

    let mut out = [0u8; N];
    out.copy_from_slice(&buf[offset..offset + N]);
    Ok(out)
}

/// Decode a `u8`, returning the value and bytes consumed
pub fn decode_u8(buf: &[u8], offset: usize) -> Result<(u8, usize), CodecError> {
    let [b] = field::<1>(buf, offset)?;
    Ok((b, 1))
}

/// Decode a boolean. Any non-zero byte reads as `true`.
pub fn decode_bool(buf: &[u8], offset: usize) -> Result<(bool, usize), CodecError> {
    let (b, n) = decode_u8(buf, offset)?;
    Ok((b != 0, n))
}

pub fn decode_i16(buf: &[u8], offset: usize) -> Result<(i16, usize), CodecError> {
    Ok((i16::from_le_bytes(field(buf, offset)?), 2))
}

pub fn decode_u16(buf: &[u8], offset: usize) -> Result<(u16, usize), CodecError> {
    Ok((u16::from_le_bytes(field(buf, offset)?), 2))
}

pub fn decode_f32(buf: &[u8], offset: usize) -> Result<(f32, usize), CodecError> {
    let bits = u32::from_le_bytes(field(buf, offset)?);
    Ok((f32::from_bits(bits), 4))
}

/// Decode the text field that runs from `offset` to the end of `buf`
///
/// Each byte maps to the code point of the same value. Zero bytes are
/// skipped, so a missing terminator or zero padding after it still decodes.
/// Consumes the whole remainder.
pub fn decode_text(buf: &[u8], offset: usize) -> Result<(Text, usize), CodecError> {
    let rest = buf.get(offset..).unwrap_or(&[]);

    let mut text = Text::new();
    for &b in rest.iter().filter(|&&b| b != TEXT_TERMINATOR) {
        text.push(char::from(b))
            .map_err(|_| CodecError::TextTooLong)?;
    }

    Ok((text, rest.len()))
}

/// Sequential writer over a caller-supplied buffer
pub struct Encoder<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> Encoder<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Number of bytes written so far
    pub fn position(&self) -> usize {
        self.pos
    }

    fn put_bytes(&mut self, bytes: &[u8]) -> Result<(), CodecError> {
        let end = self.pos + bytes.len();
        if end > self.buf.len() {
            return Err(CodecError::BufferTooSmall);
        }
        self.buf[self.pos..end].copy_from_slice(bytes);
        self.pos = end;
        Ok(())
    }

    pub fn put_u8(&mut self, value: u8) -> Result<(), CodecError> {
        self.put_bytes(&[value])
    }

    pub fn put_bool(&mut self, value: bool) -> Result<(), CodecError> {
        self.put_u8(encode_bool(value))
    }

    pub fn put_i16(&mut self, value: i16) -> Result<(), CodecError> {
        self.put_bytes(&encode_i16(value))
    }

    pub fn put_u16(&mut self, value: u16) -> Result<(), CodecError> {
        self.put_bytes(&encode_u16(value))
    }

    pub fn put_f32(&mut self, value: f32) -> Result<(), CodecError> {
        self.put_bytes(&encode_f32(value))
    }

    /// Write a text field followed by its terminator
    pub fn put_text(&mut self, text: &str) -> Result<(), CodecError> {
        if self.pos + text_len(text) > self.buf.len() {
            return Err(CodecError::BufferTooSmall);
        }
        for c in text.chars() {
            self.put_u8(encode_text_byte(c))?;
        }
        self.put_u8(TEXT_TERMINATOR)
    }

    /// Consume the encoder, returning the number of bytes written
    pub fn finish(self) -> usize {
        self.pos
    }
}

/// Sequential, bounds-checked reader over a received payload
pub struct Decoder<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes not yet consumed
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn advance<T>(&mut self, (value, used): (T, usize)) -> T {
        self.pos += used;
        value
    }

    pub fn take_u8(&mut self) -> Result<u8, CodecError> {
        let r = decode_u8(self.buf, self.pos)?;
        Ok(self.advance(r))
    }

    pub fn take_bool(&mut self) -> Result<bool, CodecError> {
        let r = decode_bool(self.buf, self.pos)?;
        Ok(self.advance(r))
    }

    pub fn take_i16(&mut self) -> Result<i16, CodecError> {
        let r = decode_i16(self.buf, self.pos)?;
        Ok(self.advance(r))
    }

    pub fn take_u16(&mut self) -> Result<u16, CodecError> {
        let r = decode_u16(self.buf, self.pos)?;
        Ok(self.advance(r))
    }

    pub fn take_f32(&mut self) -> Result<f32, CodecError> {
        let r = decode_f32(self.buf, self.pos)?;
        Ok(self.advance(r))
    }

    /// Take the rest of the payload as text
    pub fn take_text(&mut self) -> Result<Text, CodecError> {
        let r = decode_text(self.buf, self.pos)?;
        Ok(self.advance(r))
    }

    /// Ensure that every byte of the payload was consumed
    pub fn finish(self) -> Result<(), CodecError> {
        match self.remaining() {
            0 => Ok(()),
            extra => Err(CodecError::TrailingBytes(extra)),
        }
    }
}
