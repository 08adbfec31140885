use chrono::{DateTime, Utc};
use fix_codec::{OrdType, Side, TimeInForce};
use rust_decimal::Decimal;

/// Transient correlator entry: maps a short quote-request-id back to the
/// mirror intent that produced it, plus everything needed to submit the
/// shadow `NewOrderSingle` once the locate is confirmed.
#[derive(Debug, Clone, PartialEq)]
pub struct LocateContext {
    pub shadow_account: String,
    pub shadow_session_id: String,
    pub primary_cl_ord_id: String,
    pub locate_route: String,
    pub symbol: String,
    pub side: Side,
    pub order_qty: Decimal,
    pub price: Option<Decimal>,
    pub ord_type: OrdType,
    pub time_in_force: TimeInForce,
}

#[derive(Debug, Clone)]
pub(crate) struct LocateEntry {
    pub context: LocateContext,
    pub registered_at: DateTime<Utc>,
}
