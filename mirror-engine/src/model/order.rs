use super::order_event::OrderStatus;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Derived projection row, one per distinct `(account, cl_ord_id)`.
/// Maintained exclusively by `store::apply_event`; never written directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub account: String,
    pub cl_ord_id: String,
    pub order_status: OrderStatus,
    pub symbol: String,
    pub side: String,
    pub ord_type: Option<String>,
    pub time_in_force: Option<String>,
    pub order_qty: Decimal,
    pub cum_qty: Decimal,
    pub leaves_qty: Decimal,
    pub price: Option<Decimal>,
    pub avg_px: Option<Decimal>,
    pub venue_order_id: Option<String>,
    /// Set once at creation for a shadow order; `None` for a primary order.
    pub primary_order_cl_ord_id: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn is_quantity_consistent(&self) -> bool {
        self.cum_qty + self.leaves_qty == self.order_qty
    }

    pub fn is_live(&self) -> bool {
        matches!(
            self.order_status,
            OrderStatus::PendingNew
                | OrderStatus::New
                | OrderStatus::PartiallyFilled
                | OrderStatus::PendingCancel
                | OrderStatus::Calculated
        )
    }
}
