//! Serializes a [`Message`] plus a session [`Header`] back into a raw
//! tag=value frame with a correct `BodyLength`/`CheckSum` envelope.

use crate::decode::SOH;
use crate::field::{
    TAG_BEGIN_STRING, TAG_BODY_LENGTH, TAG_CHECKSUM, TAG_MSG_SEQ_NUM, TAG_MSG_TYPE,
    TAG_SENDER_COMP_ID, TAG_SENDING_TIME, TAG_TARGET_COMP_ID,
};
use crate::message::Message;

/// Session-header values every outbound frame carries. Kept separate from
/// [`Message`] so callers build application fields without juggling
/// sequence numbers and comp ids by hand.
#[derive(Debug, Clone)]
pub struct Header {
    pub begin_string: String,
    pub sender_comp_id: String,
    pub target_comp_id: String,
    pub msg_seq_num: u64,
    pub sending_time: String,
}

fn push_field(buf: &mut Vec<u8>, tag: u32, value: &str) {
    buf.extend_from_slice(tag.to_string().as_bytes());
    buf.push(b'=');
    buf.extend_from_slice(value.as_bytes());
    buf.push(SOH);
}

/// Encodes `header` and `body` into a complete frame: `BeginString` and
/// `BodyLength` first, then `MsgType`, the rest of the session header, the
/// application fields in the order they were pushed, and finally the
/// trailing `CheckSum`.
pub fn encode(header: &Header, body: &Message) -> Vec<u8> {
    let mut mid = Vec::new();
    push_field(&mut mid, TAG_MSG_TYPE, &body.msg_type);
    push_field(&mut mid, TAG_SENDER_COMP_ID, &header.sender_comp_id);
    push_field(&mut mid, TAG_TARGET_COMP_ID, &header.target_comp_id);
    push_field(&mut mid, TAG_MSG_SEQ_NUM, &header.msg_seq_num.to_string());
    push_field(&mut mid, TAG_SENDING_TIME, &header.sending_time);
    for (tag, value) in body.fields() {
        if *tag == TAG_MSG_TYPE {
            continue; // already carried by Message::msg_type
        }
        push_field(&mut mid, *tag, value);
    }

    let mut frame = Vec::with_capacity(mid.len() + 32);
    push_field(&mut frame, TAG_BEGIN_STRING, &header.begin_string);
    push_field(&mut frame, TAG_BODY_LENGTH, &mid.len().to_string());
    frame.extend_from_slice(&mid);

    let sum = (frame.iter().fold(0u32, |acc, &b| acc + b as u32) % 256) as u8;
    push_field(&mut frame, TAG_CHECKSUM, &format!("{sum:03}"));
    frame
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode;
    use crate::field::MSG_TYPE_HEARTBEAT;

    fn header() -> Header {
        Header {
            begin_string: "FIX.4.2".to_string(),
            sender_comp_id: "MIRROR".to_string(),
            target_comp_id: "SHADOW1".to_string(),
            msg_seq_num: 7,
            sending_time: "20260801-12:00:00".to_string(),
        }
    }

    #[test]
    fn encoded_frame_starts_with_begin_string_and_ends_with_checksum() {
        let raw = encode(&header(), &Message::new(MSG_TYPE_HEARTBEAT));
        let text = String::from_utf8(raw.clone()).unwrap();
        assert!(text.starts_with("8=FIX.4.2\u{1}9="));
        assert!(text.ends_with('\u{1}') && text.contains("10="));
    }

    #[test]
    fn body_length_covers_exactly_the_middle_section() {
        let raw = encode(&header(), &Message::new(MSG_TYPE_HEARTBEAT));
        let (envelope, _) = decode(&raw).unwrap();
        assert!(envelope.body_length > 0);
    }

    #[test]
    fn round_trip_is_lossless_for_application_fields() {
        let mut msg = Message::new("D");
        msg.push(55, "MSFT").push(44, "310.25").push(38, "250");
        let raw = encode(&header(), &msg);
        let (_, decoded) = decode(&raw).unwrap();
        assert_eq!(decoded.get_str(55), Some("MSFT"));
        assert_eq!(decoded.get_str(44), Some("310.25"));
        assert_eq!(decoded.get_str(38), Some("250"));
    }
}
