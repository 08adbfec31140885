//! Handles a primary `CANCELED`/`PENDING_CANCEL` execution report:
//! propagates the cancel to every live shadow order linked back to the
//! primary order.

use super::MirrorEngine;
use crate::error::EngineError;
use crate::model::OrderEvent;
use fix_codec::Side;

impl MirrorEngine {
    pub(crate) async fn handle_cancel(&self, event: OrderEvent) -> Result<(), EngineError> {
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
            tracing::info!(primary_cl_ord_id = primary_key, "cancel observed with no live shadow orders to cancel");
            return Ok(());
        }

        for order in &live {
            let session_id = match self.session_for_shadow_account(&order.account) {
                Some(id) => id,
                None => {
                    tracing::warn!(shadow_account = %order.account, "no session configured for shadow account, cannot cancel");
                    continue;
                }
            };
            let side = Side::from_fix(order.side.chars().next().unwrap_or('1')).unwrap_or(Side::Buy);
            let new_cl_ord_id = self.cl_ord_id_gen.next();
            let msg = fix_codec::order_cancel_request(&new_cl_ord_id, &order.cl_ord_id, &order.account, &order.symbol, side);
            if let Err(err) = self.sessions.send(&session_id, msg).await {
                tracing::warn!(
                    shadow_account = %order.account,
                    shadow_cl_ord_id = %order.cl_ord_id,
                    error = %err,
                    "shadow cancel did not complete"
                );
            }
        }
        Ok(())
    }
}
