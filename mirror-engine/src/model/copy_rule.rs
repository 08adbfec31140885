use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RatioType {
    Percentage,
    Multiplier,
    FixedQuantity,
}

/// Binds one primary account to one shadow account with a scaling and
/// routing policy. `config` is carried opaquely for external policy
/// extensions and never read by engine logic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CopyRule {
    pub id: i64,
    pub primary_account: String,
    pub shadow_account: String,
    pub ratio_type: RatioType,
    pub ratio_value: Decimal,
    pub accepted_order_types: Option<HashSet<String>>,
    pub copy_route: Option<String>,
    pub locate_route: Option<String>,
    pub min_quantity: Option<Decimal>,
    pub max_quantity: Option<Decimal>,
    pub priority: i32,
    pub active: bool,
    #[serde(default)]
    pub config: serde_json::Value,
}

impl CopyRule {
    pub fn is_valid(&self) -> bool {
        self.ratio_value > Decimal::ZERO
    }

    pub fn accepts_order_type(&self, ord_type: Option<&str>) -> bool {
        match (&self.accepted_order_types, ord_type) {
            (None, _) => true,
            (Some(_), None) => true,
            (Some(set), Some(t)) => set.contains(t),
        }
    }

    /// `calculate_copy_quantity` from the catalog's quantity transform:
    /// `out = round(q * ratio)` with ratio depending on `ratio_type`,
    /// half-up to the nearest whole share. Bound-violating results are
    /// surfaced by the caller as a skipped rule, not by this function.
    pub fn transform_quantity(&self, q: Decimal) -> Decimal {
        if q <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        let raw = match self.ratio_type {
            RatioType::Percentage => q * self.ratio_value / Decimal::from(100),
            RatioType::Multiplier => q * self.ratio_value,
            RatioType::FixedQuantity => self.ratio_value,
        };
        raw.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
    }

    pub fn within_bounds(&self, qty: Decimal) -> bool {
        if let Some(min) = self.min_quantity {
            if qty < min {
                return false;
            }
        }
        if let Some(max) = self.max_quantity {
            if qty > max {
                return false;
            }
        }
        true
    }

    /// Route selection per the catalog's route transform: a locate order
    /// prefers `locate_route`, then falls back to `copy_route`, then the
    /// primary order's own route; a non-locate order skips `locate_route`.
    pub fn target_route<'a>(&'a self, primary_route: &'a str, is_locate: bool) -> &'a str {
        if is_locate {
            self.locate_route
                .as_deref()
                .or(self.copy_route.as_deref())
                .unwrap_or(primary_route)
        } else {
            self.copy_route.as_deref().unwrap_or(primary_route)
        }
    }
}
