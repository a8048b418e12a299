//! Property tests over the declared field domains

use proptest::prelude::*;

use crate::codec::Encoder;
use crate::frame::{FrameCodec, FrameError, HeaderMode, MAX_FRAME_LEN};
use crate::messages::*;

fn timestamp() -> impl Strategy<Value = Timestamp> {
    (any::<u8>(), 1u8..=12, 1u8..=31, 0u8..24, 0u8..60, 0u8..60)
        .prop_map(|(y, mo, d, h, mi, s)| Timestamp::new(y, mo, d, h, mi, s))
}

fn location() -> impl Strategy<Value = LocationFix> {
    (
        -90.0f32..90.0,
        -180.0f32..180.0,
        -500.0f32..9000.0,
        0.0f32..200.0,
        any::<u8>(),
        0u16..360,
    )
        .prop_map(|(latitude, longitude, altitude, speed, satellites, heading)| {
            LocationFix {
                latitude,
                longitude,
                altitude,
                speed,
                satellites,
                heading,
            }
        })
}

/// Text that survives the wire unchanged: code points 1..=255
fn single_byte_text(max: usize) -> impl Strategy<Value = String> {
    prop::collection::vec((1u8..=255).prop_map(char::from), 0..max)
        .prop_map(|chars| chars.into_iter().collect())
}

fn message() -> impl Strategy<Value = Message> {
    prop_oneof![
        (timestamp(), location(), any::<i16>(), any::<u16>(), single_byte_text(40)).prop_map(
            |(t, l, sig, mem, status)| Telemetry::new(t, l, sig, mem, &status)
                .unwrap()
                .into()
        ),
        (timestamp(), any::<bool>(), any::<bool>()).prop_map(|(timestamp, ack, command_waiting)| {
            TelemetryAck {
                timestamp,
                ack,
                command_waiting,
            }
            .into()
        }),
        (timestamp(), any::<bool>())
            .prop_map(|(timestamp, ready)| CommandReady { timestamp, ready }.into()),
        (timestamp(), any::<bool>(), single_byte_text(200)).prop_map(
            |(t, done, text)| Command::new(t, done, &text).unwrap().into()
        ),
        (timestamp(), any::<bool>())
            .prop_map(|(timestamp, ack)| CommandAck { timestamp, ack }.into()),
    ]
}

fn encode(msg: &Message) -> Vec<u8> {
    let mut buf = vec![0u8; msg.length() + 16];
    let mut enc = Encoder::new(&mut buf);
    msg.serialize(&mut enc).unwrap();
    let len = enc.finish();
    buf.truncate(len);
    buf
}

fn fixed_len(kind: MessageKind) -> usize {
    match kind {
        MessageKind::Telemetry => Telemetry::FIXED_LEN,
        MessageKind::TelemetryAck => TelemetryAck::FIXED_LEN,
        MessageKind::CommandReady => CommandReady::FIXED_LEN,
        MessageKind::Command => Command::FIXED_LEN,
        MessageKind::CommandAck => CommandAck::FIXED_LEN,
    }
}

fn text_of(msg: &Message) -> Option<&str> {
    match msg {
        Message::Telemetry(t) => Some(t.status.as_str()),
        Message::Command(c) => Some(c.command.as_str()),
        _ => None,
    }
}

proptest! {
    #[test]
    fn prop_length_matches_encoding(msg in message()) {
        prop_assert_eq!(encode(&msg).len(), msg.length());
    }

    #[test]
    fn prop_message_roundtrip(msg in message()) {
        let bytes = encode(&msg);
        let decoded = Message::decode(msg.kind(), &bytes).unwrap();
        prop_assert_eq!(decoded, msg);
    }

    #[test]
    fn prop_truncated_fixed_prefix_is_error(msg in message(), cut in 1usize..8) {
        let bytes = encode(&msg);
        let keep = fixed_len(msg.kind()).saturating_sub(cut);
        prop_assert!(Message::decode(msg.kind(), &bytes[..keep]).is_err());
    }

    #[test]
    fn prop_truncated_text_decodes_as_prefix(msg in message(), cut in 1usize..8) {
        let bytes = encode(&msg);
        let fixed = fixed_len(msg.kind());
        let keep = bytes.len().saturating_sub(cut).max(fixed);
        let decoded = Message::decode(msg.kind(), &bytes[..keep]);
        match text_of(&msg) {
            Some(text) => {
                let decoded = decoded.unwrap();
                let short = text_of(&decoded).unwrap_or_default();
                prop_assert!(text.starts_with(short));
            }
            None if keep < bytes.len() => prop_assert!(decoded.is_err()),
            None => prop_assert_eq!(decoded.unwrap(), msg),
        }
    }

    #[test]
    fn prop_text_maps_wide_code_points(text in "\\PC{0,40}") {
        let expected: String = text
            .chars()
            .map(|c| if c == '\0' || c as u32 > 0xFF { '#' } else { c })
            .collect();
        let cmd = Command::new(Timestamp::default(), true, &text).unwrap();
        let msg: Message = cmd.into();
        let decoded = Message::decode(MessageKind::Command, &encode(&msg)).unwrap();
        match decoded {
            Message::Command(c) => prop_assert_eq!(c.command.as_str(), expected.as_str()),
            other => prop_assert!(false, "decoded as {:?}", other.kind()),
        }
    }

    #[test]
    fn prop_frame_roundtrip(
        msg in message(),
        explicit in any::<bool>(),
    ) {
        let mode = if explicit { HeaderMode::Explicit } else { HeaderMode::Implicit };
        let codec = FrameCodec::new(mode, MAX_FRAME_LEN);
        let bytes = codec.encode_to_vec(&msg).unwrap();
        prop_assert_eq!(bytes.len(), codec.frame_len(&msg));
        prop_assert_eq!(codec.decode_message(&bytes).unwrap(), msg);
    }

    #[test]
    fn prop_oversize_iff_over_limit(msg in message(), max in 7usize..=255) {
        let codec = FrameCodec::new(HeaderMode::Explicit, max);
        let mut buf = [0u8; MAX_FRAME_LEN];
        let len = codec.frame_len(&msg);
        match codec.encode(&msg, &mut buf) {
            Ok(n) => {
                prop_assert!(len <= max);
                prop_assert_eq!(n, len);
            }
            Err(FrameError::Oversized { len: reported, max: limit }) => {
                prop_assert!(len > max);
                prop_assert_eq!(reported, len);
                prop_assert_eq!(limit, max);
            }
            Err(e) => prop_assert!(false, "unexpected {:?}", e),
        }
    }
}
