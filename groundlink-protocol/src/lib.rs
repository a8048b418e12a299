//! Rover Link Wire Protocol
//!
//! This crate defines the half-duplex radio protocol between the ground
//! station and the rover: fixed-width little-endian primitives, the five
//! typed messages, and the frame that carries them.
//!
//! # Protocol Overview
//!
//! ```text
//! ┌──────────────────────────────┬─────┬──────────────┐
//! │ LINK HEADER (explicit mode)  │ TAG │ PAYLOAD      │
//! │ len · to · from · id · flags │ 1B  │ per kind     │
//! └──────────────────────────────┴─────┴──────────────┘
//! ```
//!
//! The receiver reads the tag and decodes the payload with that kind's
//! schema. Nothing here allocates or keeps state between calls.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod codec;
pub mod frame;
pub mod messages;

#[cfg(test)]
mod proptests;

pub use codec::{CodecError, Decoder, Encoder, Text};
pub use frame::{
    FrameCodec, FrameError, HeaderMode, LinkHeader, RawFrame, LINK_HEADER_LEN,
    MAX_ENCRYPTED_FRAME_LEN, MAX_FRAME_LEN,
};
pub use messages::{
    Command, CommandAck, CommandReady, LocationFix, Message, MessageKind, Telemetry,
    TelemetryAck, Timestamp, WireMessage, tag_name, TAG_NONE,
};
