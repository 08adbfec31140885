//! Handles a primary `REPLACED` execution report: propagates the amend to
//! every live shadow order linked back to the (unchanging) primary
//! identity, per §3's "set at creation, never changes" invariant on
//! `primary_order_cl_ord_id`.

use super::MirrorEngine;
use crate::error::EngineError;
use crate::model::{CopyRule, Order, OrderEvent};
use fix_codec::Side;
use rust_decimal::Decimal;

impl MirrorEngine {
    pub(crate) async fn handle_replace(&self, event: OrderEvent) -> Result<(), EngineError> {
        let inserted = self.store.append_event(&event, None).await?;
        if !inserted {
            return Ok(());
        }

        if event.account != self.config.primary_account {
            return Ok(());
        }

        let primary_key = event.orig_cl_ord_id.as_deref().unwrap_or(event.cl_ord_id.as_str());
        let live = self.store.get_live_orders_by_primary(primary_key).await?;
        if live.is_empty() {
            tracing::info!(primary_cl_ord_id = primary_key, "replace observed with no live shadow orders to amend");
            return Ok(());
        }

        let rules = self.catalog.select_rules(&event.account, event.ord_type.as_deref());

        for order in &live {
            if let Err(err) = self.replace_one_shadow(&event, order, &rules).await {
                tracing::warn!(
                    shadow_account = %order.account,
                    shadow_cl_ord_id = %order.cl_ord_id,
                    error = %err,
                    "shadow replace did not complete"
                );
            }
        }
        Ok(())
    }

    async fn replace_one_shadow(&self, event: &OrderEvent, order: &Order, rules: &[CopyRule]) -> Result<(), EngineError> {
        let rule = rules
            .iter()
            .find(|r| r.shadow_account == order.account)
            .ok_or_else(|| EngineError::RuleExcluded(format!("no active rule maps primary to shadow {}", order.account)))?;

        let qty = rule.transform_quantity(event.order_qty);
        if qty <= Decimal::ZERO || !rule.within_bounds(qty) {
            return Err(EngineError::RuleExcluded(format!(
                "rule {} replace quantity {} is out of policy",
                rule.id, qty
            )));
        }

        let session_id = self.session_for_shadow_account(&order.account).ok_or_else(|| {
            EngineError::SessionUnavailable(format!("no session configured for shadow account {}", order.account))
        })?;

        let side = Side::from_fix(order.side.chars().next().unwrap_or('1')).unwrap_or(Side::Buy);
        let new_cl_ord_id = self.cl_ord_id_gen.next();
        let msg = fix_codec::order_cancel_replace_request(
            &new_cl_ord_id,
            &order.cl_ord_id,
            &order.account,
            &order.symbol,
            side,
            qty,
            event.price,
        );
        self.sessions.send(&session_id, msg).await
    }
}
