//! Encoding and decoding of messages to multipart frame sequences.
//!
//! The first frame is the ASCII tag; payload frames follow. Most kinds
//! carry a single JSON object frame. Exceptions: `PUT` carries a raw key
//! frame plus a raw data frame, `DATA` a single raw data frame, and
//! `UPDATE_SERIES` one JSON frame per update in the series.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

// Layer 3: Internal module imports
use super::error::WireError;
use super::types::{
    AcknowledgeMessage, ClearDataMessage, DataMessage, ErrorMessage, GetDataMessage, Message,
    NewTimeMessage, PathMessage, PutDataMessage, QuitMessage, RegistrationMessage, ResultMessage,
    UpdateMessage, UpdateSeriesMessage,
};

fn json_frame<T: Serialize>(tag: &'static str, value: &T) -> Result<Bytes, WireError> {
    serde_json::to_vec(value)
        .map(Bytes::from)
        .map_err(|source| WireError::Payload { tag, source })
}

fn parse_json<T: DeserializeOwned>(tag: &'static str, frame: &Bytes) -> Result<T, WireError> {
    serde_json::from_slice(frame).map_err(|source| WireError::Payload { tag, source })
}

fn single_frame<'a>(tag: &'static str, frames: &'a [Bytes]) -> Result<&'a Bytes, WireError> {
    match frames {
        [frame] => Ok(frame),
        _ => Err(WireError::FrameCount {
            tag,
            expected: "1",
            got: frames.len(),
        }),
    }
}

/// Serialize a message into its multipart frame sequence, tag first.
pub fn encode_message(message: &Message) -> Result<Vec<Bytes>, WireError> {
    let tag = message.tag();
    let mut frames = vec![Bytes::from_static(tag.as_bytes())];
    match message {
        Message::Registration(msg) => frames.push(json_frame(tag, msg)?),
        Message::NewTime(msg) => frames.push(json_frame(tag, msg)?),
        Message::Update(msg) => {
            msg.validate()?;
            frames.push(json_frame(tag, msg)?);
        }
        Message::UpdateSeries(msg) => {
            for upd in &msg.updates {
                upd.validate()?;
                frames.push(json_frame(tag, upd)?);
            }
        }
        Message::Result(msg) => {
            msg.validate()?;
            frames.push(json_frame(tag, msg)?);
        }
        Message::Acknowledge(msg) => frames.push(json_frame(tag, msg)?),
        Message::Quit(msg) => frames.push(json_frame(tag, msg)?),
        Message::GetData(msg) => frames.push(json_frame(tag, msg)?),
        Message::PutData(msg) => {
            frames.push(Bytes::copy_from_slice(msg.key.as_bytes()));
            frames.push(msg.data.clone());
        }
        Message::ClearData(msg) => frames.push(json_frame(tag, msg)?),
        Message::Data(msg) => frames.push(msg.data.clone()),
        Message::Path(msg) => frames.push(json_frame(tag, msg)?),
        Message::Error(msg) => frames.push(json_frame(tag, msg)?),
    }
    Ok(frames)
}

/// Parse a multipart frame sequence back into a typed message.
pub fn decode_message(frames: &[Bytes]) -> Result<Message, WireError> {
    let (tag_frame, payload) = frames.split_first().ok_or(WireError::Empty)?;
    let tag = std::str::from_utf8(tag_frame).map_err(|_| WireError::NonUtf8Frame)?;
    match tag {
        "READY" => {
            let msg: RegistrationMessage = parse_json("READY", single_frame("READY", payload)?)?;
            Ok(Message::Registration(msg))
        }
        "NEW_TIME" => {
            let msg: NewTimeMessage = parse_json("NEW_TIME", single_frame("NEW_TIME", payload)?)?;
            Ok(Message::NewTime(msg))
        }
        "UPDATE" => {
            let msg: UpdateMessage = parse_json("UPDATE", single_frame("UPDATE", payload)?)?;
            msg.validate()?;
            Ok(Message::Update(msg))
        }
        "UPDATE_SERIES" => {
            let updates = payload
                .iter()
                .map(|frame| {
                    let upd: UpdateMessage = parse_json("UPDATE_SERIES", frame)?;
                    upd.validate()?;
                    Ok(upd)
                })
                .collect::<Result<Vec<_>, WireError>>()?;
            Ok(Message::UpdateSeries(UpdateSeriesMessage::new(updates)))
        }
        "RESULT" => {
            let msg: ResultMessage = parse_json("RESULT", single_frame("RESULT", payload)?)?;
            msg.validate()?;
            Ok(Message::Result(msg))
        }
        "ACK" => {
            let msg: AcknowledgeMessage = parse_json("ACK", single_frame("ACK", payload)?)?;
            Ok(Message::Acknowledge(msg))
        }
        "END" => {
            let msg: QuitMessage = parse_json("END", single_frame("END", payload)?)?;
            Ok(Message::Quit(msg))
        }
        "GET" => {
            let msg: GetDataMessage = parse_json("GET", single_frame("GET", payload)?)?;
            Ok(Message::GetData(msg))
        }
        "PUT" => match payload {
            [key, data] => {
                let key = std::str::from_utf8(key).map_err(|_| WireError::NonUtf8Frame)?;
                Ok(Message::PutData(PutDataMessage::new(key, data.clone())))
            }
            _ => Err(WireError::FrameCount {
                tag: "PUT",
                expected: "2",
                got: payload.len(),
            }),
        },
        "CLEAR" => {
            let msg: ClearDataMessage = parse_json("CLEAR", single_frame("CLEAR", payload)?)?;
            Ok(Message::ClearData(msg))
        }
        "DATA" => Ok(Message::Data(DataMessage::new(
            single_frame("DATA", payload)?.clone(),
        ))),
        "PATH" => {
            let msg: PathMessage = parse_json("PATH", single_frame("PATH", payload)?)?;
            Ok(Message::Path(msg))
        }
        "ERROR" => {
            let msg: ErrorMessage = parse_json("ERROR", single_frame("ERROR", payload)?)?;
            Ok(Message::Error(msg))
        }
        other => Err(WireError::UnknownTag(other.to_owned())),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::mask::MaskTree;

    fn roundtrip(message: Message) {
        let frames = encode_message(&message).unwrap();
        let decoded = decode_message(&frames).unwrap();
        assert_eq!(decoded, message);
    }

    #[test]
    fn test_roundtrip_all_kinds() {
        roundtrip(Message::Registration(RegistrationMessage {
            pub_mask: Some(MaskTree::from_pairs([("dataset", MaskTree::Full)])),
            sub_mask: None,
        }));
        roundtrip(Message::NewTime(NewTimeMessage { timestamp: 17 }));
        roundtrip(Message::Update(UpdateMessage::wake(0)));
        roundtrip(Message::Update(UpdateMessage::with_data(
            1,
            "model_a_0",
            "tcp://127.0.0.1:4000",
            Some("model_a".into()),
        )));
        roundtrip(Message::UpdateSeries(UpdateSeriesMessage::new(vec![
            UpdateMessage::wake(2),
            UpdateMessage::with_data(2, "k", "addr", None),
        ])));
        roundtrip(Message::Result(ResultMessage {
            key: Some("k".into()),
            address: Some("addr".into()),
            next_time: Some(5),
            origin: Some("model_a".into()),
        }));
        roundtrip(Message::Acknowledge(AcknowledgeMessage {}));
        roundtrip(Message::Quit(QuitMessage {}));
        roundtrip(Message::GetData(GetDataMessage {
            key: "k".into(),
            mask: Some(serde_json::json!({"ds": null})),
        }));
        roundtrip(Message::PutData(PutDataMessage::new(
            "k",
            vec![0u8, 1, 255],
        )));
        roundtrip(Message::ClearData(ClearDataMessage {
            prefix: "model_a".into(),
        }));
        roundtrip(Message::Data(DataMessage::new(vec![9u8, 8, 7])));
        roundtrip(Message::Path(PathMessage {
            path: Some("/data/roads.json".into()),
        }));
        roundtrip(Message::Path(PathMessage { path: None }));
        roundtrip(Message::Error(ErrorMessage::new("boom")));
    }

    #[test]
    fn test_tag_is_first_frame() {
        let frames = encode_message(&Message::Acknowledge(AcknowledgeMessage {})).unwrap();
        assert_eq!(&frames[0][..], b"ACK");
        assert_eq!(&frames[1][..], b"{}");
    }

    #[test]
    fn test_put_uses_raw_frames() {
        let frames =
            encode_message(&Message::PutData(PutDataMessage::new("key", vec![1u8, 2]))).unwrap();
        assert_eq!(frames.len(), 3);
        assert_eq!(&frames[1][..], b"key");
        assert_eq!(&frames[2][..], &[1u8, 2][..]);
    }

    #[test]
    fn test_series_encodes_one_frame_per_update() {
        let series = UpdateSeriesMessage::new(vec![UpdateMessage::wake(0), UpdateMessage::wake(1)]);
        let frames = encode_message(&Message::UpdateSeries(series)).unwrap();
        assert_eq!(frames.len(), 3);
    }

    #[test]
    fn test_decode_empty_message() {
        assert!(matches!(decode_message(&[]), Err(WireError::Empty)));
    }

    #[test]
    fn test_decode_unknown_tag() {
        let frames = vec![Bytes::from_static(b"BOGUS"), Bytes::from_static(b"{}")];
        assert!(matches!(
            decode_message(&frames),
            Err(WireError::UnknownTag(tag)) if tag == "BOGUS"
        ));
    }

    #[test]
    fn test_decode_malformed_payload() {
        let frames = vec![Bytes::from_static(b"NEW_TIME"), Bytes::from_static(b"not json")];
        assert!(matches!(
            decode_message(&frames),
            Err(WireError::Payload { tag: "NEW_TIME", .. })
        ));
    }

    #[test]
    fn test_decode_rejects_key_without_address() {
        let frames = vec![
            Bytes::from_static(b"RESULT"),
            Bytes::from_static(br#"{"key": "k"}"#),
        ];
        assert!(matches!(
            decode_message(&frames),
            Err(WireError::KeyAddressMismatch)
        ));
    }

    #[test]
    fn test_decode_wrong_frame_count() {
        let frames = vec![Bytes::from_static(b"PUT"), Bytes::from_static(b"only-key")];
        assert!(matches!(
            decode_message(&frames),
            Err(WireError::FrameCount { tag: "PUT", .. })
        ));
    }

    #[test]
    fn test_update_without_fields_decodes_as_wake() {
        let frames = vec![
            Bytes::from_static(b"UPDATE"),
            Bytes::from_static(br#"{"timestamp": 4}"#),
        ];
        let decoded = decode_message(&frames).unwrap();
        assert_eq!(decoded, Message::Update(UpdateMessage::wake(4)));
    }
}
