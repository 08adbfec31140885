use thiserror::Error;

/// Parse/encode failures for the wire codec. Every variant here corresponds
/// to a malformed-frame condition a session layer must log and discard
/// rather than propagate as a crash.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("frame too short: expected at least {expected} bytes, got {actual}")]
    FrameTooShort { expected: usize, actual: usize },

    #[error("missing required tag {0}")]
    MissingTag(u32),

    #[error("tag {tag} has unparseable value {value:?}")]
    BadFieldValue { tag: u32, value: String },

    #[error("body length mismatch: header said {declared}, actual was {actual}")]
    BodyLengthMismatch { declared: usize, actual: usize },

    #[error("checksum mismatch: header said {declared:03}, computed {computed:03}")]
    ChecksumMismatch { declared: u8, computed: u8 },

    #[error("frame is not valid tag=value encoding: {0}")]
    Malformed(String),
}
