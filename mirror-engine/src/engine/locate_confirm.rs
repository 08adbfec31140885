//! Handles `OrdStatus='B'` (vendor "calculated" / locate confirmed): the
//! final step of the `OFFER_ACCEPT_REJECT` locate variant, after the
//! venue has accepted the borrow and is ready for the short-sale order.

use super::MirrorEngine;
use crate::error::EngineError;
use crate::model::OrderEvent;
use chrono::Utc;

impl MirrorEngine {
    pub(crate) async fn handle_locate_confirm(&self, event: OrderEvent) -> Result<(), EngineError> {
        let inserted = self.store.append_event(&event, None).await?;
        if !inserted {
            return Ok(());
        }

        let Some(quote_req_id) = event.quote_req_id.as_deref() else {
            tracing::warn!(
                cl_ord_id = %event.cl_ord_id,
                "locate-confirmation report carries no quote-request-id, cannot correlate"
            );
            return Ok(());
        };

        let Some(context) = self.correlator.lookup_and_remove(quote_req_id, Utc::now()) else {
            tracing::warn!(
                quote_req_id,
                cl_ord_id = %event.cl_ord_id,
                "locate confirmation matches no outstanding locate (expired or already confirmed)"
            );
            return Ok(());
        };

        self.submit_shadow_new_order(
            &context.primary_cl_ord_id,
            &context.shadow_session_id,
            &context.shadow_account,
            &context.locate_route,
            &context.symbol,
            context.side,
            context.order_qty,
            context.ord_type,
            context.price,
            context.time_in_force,
        )
        .await
    }
}
