//! Turns a raw inbound execution report into the engine's own
//! [`OrderEvent`], following the richer decimal/optional-vendor-field
//! variant (the integer-only legacy parser is not reproduced — see
//! DESIGN.md's Open Question decision).

use crate::error::EngineError;
use crate::model::OrderEvent;
use chrono::{DateTime, NaiveDateTime, Utc};
use fix_codec::field::*;
use fix_codec::{ExecType as WireExecType, Message, OrdStatus as WireOrdStatus};

pub fn parse_execution_report(
    session_id: &str,
    msg: &Message,
    ingested_at: DateTime<Utc>,
    raw: Vec<u8>,
) -> Result<OrderEvent, EngineError> {
    let exec_type_char = msg.require_char(TAG_EXEC_TYPE)?;
    let exec_type = WireExecType::from_fix(exec_type_char)
        .ok_or_else(|| fix_codec::CodecError::BadFieldValue { tag: TAG_EXEC_TYPE, value: exec_type_char.to_string() })?;

    let ord_status_char = msg.require_char(TAG_ORD_STATUS)?;
    let ord_status = WireOrdStatus::from_fix(ord_status_char)
        .ok_or_else(|| fix_codec::CodecError::BadFieldValue { tag: TAG_ORD_STATUS, value: ord_status_char.to_string() })?;

    Ok(OrderEvent {
        session_id: session_id.to_string(),
        execution_id: msg.require_str(TAG_EXEC_ID)?.to_string(),
        exec_type: exec_type.into(),
        order_status: ord_status.into(),
        cl_ord_id: msg.require_str(TAG_CL_ORD_ID)?.to_string(),
        orig_cl_ord_id: msg.get_str(TAG_ORIG_CL_ORD_ID).map(String::from),
        venue_order_id: msg.get_str(TAG_ORDER_ID).map(String::from),
        symbol: msg.require_str(TAG_SYMBOL)?.to_string(),
        side: msg.require_str(TAG_SIDE)?.to_string(),
        ord_type: msg.get_str(TAG_ORD_TYPE).map(String::from),
        time_in_force: msg.get_str(TAG_TIME_IN_FORCE).map(String::from),
        order_qty: msg.require_decimal(TAG_ORDER_QTY)?,
        last_qty: msg.get_decimal(TAG_LAST_QTY)?,
        cum_qty: msg.get_decimal(TAG_CUM_QTY)?,
        leaves_qty: msg.get_decimal(TAG_LEAVES_QTY)?,
        price: msg.get_decimal(TAG_PRICE)?,
        stop_px: msg.get_decimal(TAG_STOP_PX)?,
        last_px: msg.get_decimal(TAG_LAST_PX)?,
        avg_px: msg.get_decimal(TAG_AVG_PX)?,
        account: msg.require_str(TAG_ACCOUNT)?.to_string(),
        ex_destination: msg.get_str(TAG_EX_DESTINATION).map(String::from),
        quote_req_id: msg.get_str(TAG_QUOTE_REQ_ID).map(String::from),
        transact_time: msg.get_str(TAG_TRANSACT_TIME).and_then(parse_fix_time),
        text: msg.get_str(TAG_TEXT).map(String::from),
        ingested_at,
        raw,
    })
}

fn parse_fix_time(s: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, "%Y%m%d-%H:%M:%S%.f")
        .ok()
        .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
}
