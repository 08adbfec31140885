//! Tag=value FIX wire codec covering the vendor dialect's order-entry,
//! execution-report, and short-locate (`R`/`S`/`p`) message types.
//!
//! This crate is deliberately narrow: it knows how to frame, checksum, and
//! type-convert fields. Session state (sequence numbers, logon handshakes,
//! resend/gap-fill) lives one layer up, in the engine crate that uses this
//! one as its wire format.

pub mod builders;
pub mod decode;
pub mod encode;
pub mod error;
pub mod field;
pub mod message;

pub use builders::{
    locate_accept, locate_reject, new_order_single, order_cancel_replace_request,
    order_cancel_request, parse_quote_response, quote_request, QuoteResponseFields,
};
pub use decode::{decode, Envelope};
pub use encode::{encode, Header};
pub use error::CodecError;
pub use field::{ExecType, OrdStatus, OrdType, Side, TimeInForce};
pub use message::Message;
