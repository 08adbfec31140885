use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecType {
    PendingNew,
    New,
    PartialFill,
    Fill,
    Canceled,
    PendingCancel,
    Replaced,
    Rejected,
    Calculated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    PendingNew,
    New,
    PartiallyFilled,
    Filled,
    Canceled,
    PendingCancel,
    Replaced,
    Rejected,
    /// Vendor extension: locate confirmed, ready to resume as `New`.
    Calculated,
}

impl OrderStatus {
    /// The legal state graph from §3: governs what `apply_event` in the
    /// store is allowed to transition into.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (PendingNew, New)
                | (PendingNew, Rejected)
                | (New, PartiallyFilled)
                | (New, Filled)
                | (New, Canceled)
                | (New, Replaced)
                | (New, Rejected)
                | (New, PendingCancel)
                | (New, Calculated)
                | (PartiallyFilled, PartiallyFilled)
                | (PartiallyFilled, Filled)
                | (PartiallyFilled, Canceled)
                | (PartiallyFilled, Replaced)
                | (PartiallyFilled, PendingCancel)
                | (PartiallyFilled, Calculated)
                | (PendingCancel, Canceled)
                | (PendingCancel, PartiallyFilled)
                | (PendingCancel, Filled)
                | (Calculated, New)
        ) || self == next
    }
}

/// One immutable row per received execution report, keyed by
/// `(session_id, execution_id)` for idempotent replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderEvent {
    pub session_id: String,
    pub execution_id: String,
    pub exec_type: ExecType,
    pub order_status: OrderStatus,
    pub cl_ord_id: String,
    pub orig_cl_ord_id: Option<String>,
    pub venue_order_id: Option<String>,
    pub symbol: String,
    pub side: String,
    pub ord_type: Option<String>,
    pub time_in_force: Option<String>,
    pub order_qty: Decimal,
    pub last_qty: Option<Decimal>,
    pub cum_qty: Option<Decimal>,
    pub leaves_qty: Option<Decimal>,
    pub price: Option<Decimal>,
    pub stop_px: Option<Decimal>,
    pub last_px: Option<Decimal>,
    pub avg_px: Option<Decimal>,
    pub account: String,
    /// The execution destination the primary leg traded on (tag 100),
    /// used as the route-transform fallback when a copy rule sets
    /// neither `copy_route` nor `locate_route`.
    pub ex_destination: Option<String>,
    /// Echoed quote-request-id (tag 131), present only on the vendor's
    /// `OrdStatus='B'` locate-confirmation report; used to find the
    /// matching [`crate::model::locate::LocateContext`].
    pub quote_req_id: Option<String>,
    pub transact_time: Option<DateTime<Utc>>,
    pub text: Option<String>,
    pub ingested_at: DateTime<Utc>,
    pub raw: Vec<u8>,
}

impl OrderEvent {
    pub fn idempotency_key(&self) -> (String, String) {
        (self.session_id.clone(), self.execution_id.clone())
    }
}

impl From<fix_codec::ExecType> for ExecType {
    fn from(v: fix_codec::ExecType) -> Self {
        match v {
            fix_codec::ExecType::New => ExecType::New,
            fix_codec::ExecType::PartialFill => ExecType::PartialFill,
            fix_codec::ExecType::Fill => ExecType::Fill,
            fix_codec::ExecType::Canceled => ExecType::Canceled,
            fix_codec::ExecType::Replaced => ExecType::Replaced,
            fix_codec::ExecType::PendingCancel => ExecType::PendingCancel,
            fix_codec::ExecType::Rejected => ExecType::Rejected,
            fix_codec::ExecType::PendingNew => ExecType::PendingNew,
            fix_codec::ExecType::Calculated => ExecType::Calculated,
        }
    }
}

impl From<fix_codec::OrdStatus> for OrderStatus {
    fn from(v: fix_codec::OrdStatus) -> Self {
        match v {
            fix_codec::OrdStatus::PendingNew => OrderStatus::PendingNew,
            fix_codec::OrdStatus::New => OrderStatus::New,
            fix_codec::OrdStatus::PartiallyFilled => OrderStatus::PartiallyFilled,
            fix_codec::OrdStatus::Filled => OrderStatus::Filled,
            fix_codec::OrdStatus::Canceled => OrderStatus::Canceled,
            fix_codec::OrdStatus::PendingCancel => OrderStatus::PendingCancel,
            fix_codec::OrdStatus::Rejected => OrderStatus::Rejected,
            fix_codec::OrdStatus::Replaced => OrderStatus::Replaced,
            fix_codec::OrdStatus::Calculated => OrderStatus::Calculated,
        }
    }
}
