//! Plain string <-> enum mappings for the columns that store `ExecType`/
//! `OrderStatus` as text. Kept separate from `serde` (de)serialization
//! because the wire and the row format are allowed to diverge.

use crate::error::EngineError;
use crate::model::account::AccountType;
use crate::model::copy_rule::RatioType;
use crate::model::route::LocateType;
use crate::model::{ExecType, OrderStatus};

pub fn exec_type_to_db(v: ExecType) -> &'static str {
    match v {
        ExecType::PendingNew => "PENDING_NEW",
        ExecType::New => "NEW",
        ExecType::PartialFill => "PARTIAL_FILL",
        ExecType::Fill => "FILL",
        ExecType::Canceled => "CANCELED",
        ExecType::PendingCancel => "PENDING_CANCEL",
        ExecType::Replaced => "REPLACED",
        ExecType::Rejected => "REJECTED",
        ExecType::Calculated => "CALCULATED",
    }
}

pub fn exec_type_from_db(s: &str) -> Result<ExecType, EngineError> {
    Ok(match s {
        "PENDING_NEW" => ExecType::PendingNew,
        "NEW" => ExecType::New,
        "PARTIAL_FILL" => ExecType::PartialFill,
        "FILL" => ExecType::Fill,
        "CANCELED" => ExecType::Canceled,
        "PENDING_CANCEL" => ExecType::PendingCancel,
        "REPLACED" => ExecType::Replaced,
        "REJECTED" => ExecType::Rejected,
        "CALCULATED" => ExecType::Calculated,
        other => return Err(EngineError::Fatal(format!("unknown exec_type in store: {other}"))),
    })
}

pub fn order_status_to_db(v: OrderStatus) -> &'static str {
    match v {
        OrderStatus::PendingNew => "PENDING_NEW",
        OrderStatus::New => "NEW",
        OrderStatus::PartiallyFilled => "PARTIALLY_FILLED",
        OrderStatus::Filled => "FILLED",
        OrderStatus::Canceled => "CANCELED",
        OrderStatus::PendingCancel => "PENDING_CANCEL",
        OrderStatus::Replaced => "REPLACED",
        OrderStatus::Rejected => "REJECTED",
        OrderStatus::Calculated => "CALCULATED",
    }
}

pub fn order_status_from_db(s: &str) -> Result<OrderStatus, EngineError> {
    Ok(match s {
        "PENDING_NEW" => OrderStatus::PendingNew,
        "NEW" => OrderStatus::New,
        "PARTIALLY_FILLED" => OrderStatus::PartiallyFilled,
        "FILLED" => OrderStatus::Filled,
        "CANCELED" => OrderStatus::Canceled,
        "PENDING_CANCEL" => OrderStatus::PendingCancel,
        "REPLACED" => OrderStatus::Replaced,
        "REJECTED" => OrderStatus::Rejected,
        "CALCULATED" => OrderStatus::Calculated,
        other => return Err(EngineError::Fatal(format!("unknown order_status in store: {other}"))),
    })
}

pub fn ratio_type_to_db(v: RatioType) -> &'static str {
    match v {
        RatioType::Percentage => "PERCENTAGE",
        RatioType::Multiplier => "MULTIPLIER",
        RatioType::FixedQuantity => "FIXED_QUANTITY",
    }
}

pub fn ratio_type_from_db(s: &str) -> Result<RatioType, EngineError> {
    Ok(match s {
        "PERCENTAGE" => RatioType::Percentage,
        "MULTIPLIER" => RatioType::Multiplier,
        "FIXED_QUANTITY" => RatioType::FixedQuantity,
        other => return Err(EngineError::Fatal(format!("unknown ratio_type in store: {other}"))),
    })
}

pub fn locate_type_to_db(v: Option<LocateType>) -> Option<&'static str> {
    v.map(|v| match v {
        LocateType::PriceInquiryDirect => "PRICE_INQUIRY_DIRECT",
        LocateType::OfferAcceptReject => "OFFER_ACCEPT_REJECT",
    })
}

pub fn locate_type_from_db(s: Option<String>) -> Result<Option<LocateType>, EngineError> {
    s.map(|s| match s.as_str() {
        "PRICE_INQUIRY_DIRECT" => Ok(LocateType::PriceInquiryDirect),
        "OFFER_ACCEPT_REJECT" => Ok(LocateType::OfferAcceptReject),
        other => Err(EngineError::Fatal(format!("unknown locate_type in store: {other}"))),
    })
    .transpose()
}

pub fn account_type_to_db(v: AccountType) -> &'static str {
    match v {
        AccountType::Primary => "PRIMARY",
        AccountType::Shadow => "SHADOW",
    }
}

pub fn account_type_from_db(s: &str) -> Result<AccountType, EngineError> {
    Ok(match s {
        "PRIMARY" => AccountType::Primary,
        "SHADOW" => AccountType::Shadow,
        other => return Err(EngineError::Fatal(format!("unknown account_type in store: {other}"))),
    })
}

/// `accepted_order_types` is stored as a comma-joined list; `None` means
/// "accepts any type" per [`crate::model::CopyRule::accepts_order_type`].
pub fn order_type_set_to_db(v: &Option<std::collections::HashSet<String>>) -> Option<String> {
    v.as_ref().map(|set| {
        let mut items: Vec<&str> = set.iter().map(String::as_str).collect();
        items.sort_unstable();
        items.join(",")
    })
}

pub fn order_type_set_from_db(s: Option<String>) -> Option<std::collections::HashSet<String>> {
    s.filter(|s| !s.is_empty())
        .map(|s| s.split(',').map(String::from).collect())
}

pub fn decimal_to_db(v: Option<rust_decimal::Decimal>) -> Option<String> {
    v.map(|d| d.to_string())
}

pub fn decimal_from_db(s: Option<String>) -> Result<Option<rust_decimal::Decimal>, EngineError> {
    s.map(|s| {
        s.parse()
            .map_err(|_| EngineError::Fatal(format!("corrupt decimal in store: {s}")))
    })
    .transpose()
}
