//! In-memory representation of one FIX message: an ordered field list plus
//! typed accessors. Quantities and prices are read through `rust_decimal`
//! so the fast path never rounds through `f64`.

use crate::error::CodecError;
use rust_decimal::Decimal;
use std::str::FromStr;

/// One decoded or to-be-encoded FIX message. Field order is preserved
/// because some counterparties are sensitive to it and because the
/// checksum/body-length computation operates on the exact serialized byte
/// sequence, not a re-ordered one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    pub msg_type: String,
    fields: Vec<(u32, String)>,
}

impl Message {
    pub fn new(msg_type: impl Into<String>) -> Self {
        Self {
            msg_type: msg_type.into(),
            fields: Vec::new(),
        }
    }

    /// Append a field, preserving insertion order. Does not deduplicate —
    /// FIX allows repeating groups to carry the same tag multiple times,
    /// and `get_*` always returns the first occurrence.
    pub fn push(&mut self, tag: u32, value: impl Into<String>) -> &mut Self {
        self.fields.push((tag, value.into()));
        self
    }

    pub fn push_opt<T: ToString>(&mut self, tag: u32, value: Option<T>) -> &mut Self {
        if let Some(v) = value {
            self.push(tag, v.to_string());
        }
        self
    }

    pub fn fields(&self) -> &[(u32, String)] {
        &self.fields
    }

    pub fn get_str(&self, tag: u32) -> Option<&str> {
        self.fields
            .iter()
            .find(|(t, _)| *t == tag)
            .map(|(_, v)| v.as_str())
    }

    pub fn require_str(&self, tag: u32) -> Result<&str, CodecError> {
        self.get_str(tag).ok_or(CodecError::MissingTag(tag))
    }

    pub fn get_char(&self, tag: u32) -> Option<char> {
        self.get_str(tag).and_then(|s| s.chars().next())
    }

    pub fn require_char(&self, tag: u32) -> Result<char, CodecError> {
        self.get_char(tag).ok_or(CodecError::MissingTag(tag))
    }

    pub fn get_decimal(&self, tag: u32) -> Result<Option<Decimal>, CodecError> {
        match self.get_str(tag) {
            None => Ok(None),
            Some(s) => Decimal::from_str(s)
                .map(Some)
                .map_err(|_| CodecError::BadFieldValue {
                    tag,
                    value: s.to_string(),
                }),
        }
    }

    pub fn require_decimal(&self, tag: u32) -> Result<Decimal, CodecError> {
        self.get_decimal(tag)?.ok_or(CodecError::MissingTag(tag))
    }

    pub fn get_i64(&self, tag: u32) -> Result<Option<i64>, CodecError> {
        match self.get_str(tag) {
            None => Ok(None),
            Some(s) => s
                .parse::<i64>()
                .map(Some)
                .map_err(|_| CodecError::BadFieldValue {
                    tag,
                    value: s.to_string(),
                }),
        }
    }

    pub fn require_i64(&self, tag: u32) -> Result<i64, CodecError> {
        self.get_i64(tag)?.ok_or(CodecError::MissingTag(tag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn push_and_read_back_preserves_order_and_first_match() {
        let mut msg = Message::new("D");
        msg.push(55, "AAPL").push(44, "150.00").push(55, "DUPLICATE");

        assert_eq!(msg.get_str(55), Some("AAPL"));
        assert_eq!(msg.fields().len(), 3);
    }

    #[test]
    fn decimal_fields_round_trip_without_float_rounding() {
        let mut msg = Message::new("D");
        msg.push(44, "150.10");
        assert_eq!(msg.require_decimal(44).unwrap(), dec!(150.10));
    }

    #[test]
    fn missing_tag_is_an_error_not_a_panic() {
        let msg = Message::new("D");
        assert!(matches!(
            msg.require_decimal(44),
            Err(CodecError::MissingTag(44))
        ));
    }

    #[test]
    fn bad_decimal_value_is_reported_with_tag_and_value() {
        let mut msg = Message::new("D");
        msg.push(44, "not-a-number");
        match msg.require_decimal(44) {
            Err(CodecError::BadFieldValue { tag, value }) => {
                assert_eq!(tag, 44);
                assert_eq!(value, "not-a-number");
            }
            other => panic!("expected BadFieldValue, got {other:?}"),
        }
    }
}
