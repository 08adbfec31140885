//! Convenience constructors for the message types the mirror engine sends
//! and parses. Each builder fills in only the application fields; the
//! session layer is responsible for stamping the standard header via
//! [`crate::encode::Header`].

use crate::error::CodecError;
use crate::field::*;
use crate::message::Message;
use rust_decimal::Decimal;

/// `NewOrderSingle` (35=D), the replicated order sent to a shadow session.
pub fn new_order_single(
    cl_ord_id: &str,
    account: &str,
    symbol: &str,
    side: Side,
    order_qty: Decimal,
    ord_type: OrdType,
    price: Option<Decimal>,
    time_in_force: TimeInForce,
) -> Message {
    let mut msg = Message::new(MSG_TYPE_NEW_ORDER_SINGLE);
    msg.push(TAG_CL_ORD_ID, cl_ord_id)
        .push(TAG_ACCOUNT, account)
        .push(TAG_SYMBOL, symbol)
        .push(TAG_SIDE, side.to_fix().to_string())
        .push(TAG_ORDER_QTY, order_qty.to_string())
        .push(TAG_ORD_TYPE, ord_type.to_fix().to_string())
        .push(TAG_TIME_IN_FORCE, time_in_force.to_fix().to_string());
    msg.push_opt(TAG_PRICE, price.map(|p| p.to_string()));
    msg
}

/// `OrderCancelReplaceRequest` (35=G), a replicated quantity/price amend.
pub fn order_cancel_replace_request(
    cl_ord_id: &str,
    orig_cl_ord_id: &str,
    account: &str,
    symbol: &str,
    side: Side,
    order_qty: Decimal,
    price: Option<Decimal>,
) -> Message {
    let mut msg = Message::new(MSG_TYPE_ORDER_CANCEL_REPLACE_REQUEST);
    msg.push(TAG_CL_ORD_ID, cl_ord_id)
        .push(TAG_ORIG_CL_ORD_ID, orig_cl_ord_id)
        .push(TAG_ACCOUNT, account)
        .push(TAG_SYMBOL, symbol)
        .push(TAG_SIDE, side.to_fix().to_string())
        .push(TAG_ORDER_QTY, order_qty.to_string());
    msg.push_opt(TAG_PRICE, price.map(|p| p.to_string()));
    msg
}

/// `OrderCancelRequest` (35=F), a replicated cancel.
pub fn order_cancel_request(
    cl_ord_id: &str,
    orig_cl_ord_id: &str,
    account: &str,
    symbol: &str,
    side: Side,
) -> Message {
    let mut msg = Message::new(MSG_TYPE_ORDER_CANCEL_REQUEST);
    msg.push(TAG_CL_ORD_ID, cl_ord_id)
        .push(TAG_ORIG_CL_ORD_ID, orig_cl_ord_id)
        .push(TAG_ACCOUNT, account)
        .push(TAG_SYMBOL, symbol)
        .push(TAG_SIDE, side.to_fix().to_string());
    msg
}

/// `QuoteRequest` (35=R), the short-locate solicitation sent to the
/// locate venue session ahead of a short-sale order.
pub fn quote_request(quote_req_id: &str, symbol: &str, order_qty: Decimal) -> Message {
    let mut msg = Message::new(MSG_TYPE_QUOTE_REQUEST);
    msg.push(TAG_QUOTE_REQ_ID, quote_req_id)
        .push(TAG_SYMBOL, symbol)
        .push(TAG_ORDER_QTY, order_qty.to_string());
    msg
}

/// Decoded fields of a `QuoteResponse` (35=S): the locate venue's offer,
/// keyed for correlation back to the outstanding `QuoteRequest`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteResponseFields {
    pub quote_req_id: String,
    pub quote_id: String,
    pub symbol: String,
    pub offer_size: Decimal,
}

pub fn parse_quote_response(msg: &Message) -> Result<QuoteResponseFields, CodecError> {
    Ok(QuoteResponseFields {
        quote_req_id: msg.require_str(TAG_QUOTE_REQ_ID)?.to_string(),
        quote_id: msg.require_str(TAG_QUOTE_ID)?.to_string(),
        symbol: msg.require_str(TAG_SYMBOL)?.to_string(),
        offer_size: msg.require_decimal(TAG_OFFER_SIZE)?,
    })
}

/// `35=p` carrying `LocateRspType=1`: accept the offered locate and proceed
/// to send the short-sale `NewOrderSingle`.
pub fn locate_accept(quote_id: &str) -> Message {
    let mut msg = Message::new(MSG_TYPE_LOCATE_ACCEPT_REJECT);
    msg.push(TAG_QUOTE_ID, quote_id).push(TAG_LOCATE_RSP_TYPE, "1");
    msg
}

/// `35=p` carrying `LocateRspType=2`: reject the offer, e.g. the offered
/// size does not cover the order quantity.
pub fn locate_reject(quote_id: &str) -> Message {
    let mut msg = Message::new(MSG_TYPE_LOCATE_ACCEPT_REJECT);
    msg.push(TAG_QUOTE_ID, quote_id).push(TAG_LOCATE_RSP_TYPE, "2");
    msg
}
