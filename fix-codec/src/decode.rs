//! Decodes a raw tag=value FIX frame (SOH-delimited) into a [`Message`],
//! validating the standard `BodyLength`/`CheckSum` envelope before
//! trusting any field value.

use crate::error::CodecError;
use crate::field::{TAG_BEGIN_STRING, TAG_BODY_LENGTH, TAG_CHECKSUM, TAG_MSG_TYPE};
use crate::message::Message;

pub const SOH: u8 = 0x01;

/// The session-level envelope fields every frame carries, split out from
/// the application body so callers can authenticate/route on them without
/// re-parsing the whole message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub begin_string: String,
    pub body_length: usize,
    pub checksum: u8,
}

/// Splits `raw` into `(tag, value)` pairs on SOH boundaries. A trailing SOH
/// (the normal case) leaves no empty trailing field; a missing one is still
/// accepted since some counterparties omit it on the final `CheckSum` field.
fn split_fields(raw: &[u8]) -> Result<Vec<(u32, String)>, CodecError> {
    let mut fields = Vec::new();
    for chunk in raw.split(|&b| b == SOH) {
        if chunk.is_empty() {
            continue;
        }
        let text = std::str::from_utf8(chunk)
            .map_err(|_| CodecError::Malformed("non-UTF-8 field".to_string()))?;
        let (tag_str, value) = text
            .split_once('=')
            .ok_or_else(|| CodecError::Malformed(format!("field missing '=': {text:?}")))?;
        let tag: u32 = tag_str
            .parse()
            .map_err(|_| CodecError::Malformed(format!("non-numeric tag: {tag_str:?}")))?;
        fields.push((tag, value.to_string()));
    }
    Ok(fields)
}

fn checksum(bytes: &[u8]) -> u8 {
    (bytes.iter().fold(0u32, |acc, &b| acc + b as u32) % 256) as u8
}

/// Decodes and validates one complete frame. `raw` must contain exactly one
/// message (the session layer is responsible for framing on SOH-delimited
/// `10=...` trailers before calling this).
pub fn decode(raw: &[u8]) -> Result<(Envelope, Message), CodecError> {
    if raw.len() < 20 {
        return Err(CodecError::FrameTooShort {
            expected: 20,
            actual: raw.len(),
        });
    }

    let fields = split_fields(raw)?;
    let mut iter = fields.iter();

    let (tag, begin_string) = iter.next().ok_or(CodecError::MissingTag(TAG_BEGIN_STRING))?;
    if *tag != TAG_BEGIN_STRING {
        return Err(CodecError::MissingTag(TAG_BEGIN_STRING));
    }

    let (tag, body_length_str) = iter.next().ok_or(CodecError::MissingTag(TAG_BODY_LENGTH))?;
    if *tag != TAG_BODY_LENGTH {
        return Err(CodecError::MissingTag(TAG_BODY_LENGTH));
    }
    let declared_body_length: usize = body_length_str
        .parse()
        .map_err(|_| CodecError::BadFieldValue {
            tag: TAG_BODY_LENGTH,
            value: body_length_str.clone(),
        })?;

    let last = fields.last().ok_or(CodecError::MissingTag(TAG_CHECKSUM))?;
    if last.0 != TAG_CHECKSUM {
        return Err(CodecError::MissingTag(TAG_CHECKSUM));
    }
    let declared_checksum: u8 = last.1.parse().map_err(|_| CodecError::BadFieldValue {
        tag: TAG_CHECKSUM,
        value: last.1.clone(),
    })?;

    // Body is everything after "9=<len><SOH>" up to (not including) "10=".
    let body_start = raw
        .windows(1)
        .enumerate()
        .filter(|(_, w)| w[0] == SOH)
        .nth(1)
        .map(|(i, _)| i + 1)
        .ok_or_else(|| CodecError::Malformed("could not locate body start".to_string()))?;
    let checksum_field_start = raw.len() - format!("10={:03}", declared_checksum).len() - 1;
    let actual_body_length = checksum_field_start.saturating_sub(body_start);

    if actual_body_length != declared_body_length {
        return Err(CodecError::BodyLengthMismatch {
            declared: declared_body_length,
            actual: actual_body_length,
        });
    }

    let computed_checksum = checksum(&raw[..checksum_field_start]);
    if computed_checksum != declared_checksum {
        return Err(CodecError::ChecksumMismatch {
            declared: declared_checksum,
            computed: computed_checksum,
        });
    }

    let envelope = Envelope {
        begin_string: begin_string.clone(),
        body_length: declared_body_length,
        checksum: declared_checksum,
    };

    let mut msg_type = None;
    let mut message = Message::default();
    for &(tag, ref value) in fields
        .iter()
        .skip(2) // BeginString, BodyLength
        .take(fields.len() - 3)
    // drop CheckSum
    {
        if tag == TAG_MSG_TYPE {
            msg_type = Some(value.clone());
        }
        message.push(tag, value.clone());
    }
    message.msg_type = msg_type.ok_or(CodecError::MissingTag(TAG_MSG_TYPE))?;

    Ok((envelope, message))
}
