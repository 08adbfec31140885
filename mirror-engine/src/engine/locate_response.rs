//! Handles the short-locate quote response (msg-type `S`): §4.F's
//! "short-locate quote response" row and the `PRICE_INQUIRY_DIRECT` half
//! of §4.F's locate protocol table.

use super::MirrorEngine;
use crate::error::EngineError;
use crate::model::route::LocateType;
use chrono::Utc;
use fix_codec::Message;

impl MirrorEngine {
    pub(crate) async fn handle_quote_response(&self, msg: Message) -> Result<(), EngineError> {
        let parsed = fix_codec::parse_quote_response(&msg)?;
        let now = Utc::now();

        let Some(context) = self.correlator.lookup_and_remove(&parsed.quote_req_id, now) else {
            tracing::warn!(
                quote_req_id = %parsed.quote_req_id,
                "quote response matches no outstanding locate (expired or never registered)"
            );
            return Ok(());
        };

        if parsed.offer_size < context.order_qty {
            tracing::warn!(
                quote_req_id = %parsed.quote_req_id,
                primary_cl_ord_id = %context.primary_cl_ord_id,
                offered = %parsed.offer_size,
                requested = %context.order_qty,
                "locate offer size insufficient, shadow order not submitted"
            );
            return Ok(());
        }

        let route = self.routes.get(&context.locate_route);
        let locate_type = route.and_then(|r| r.locate_type);

        match locate_type {
            Some(LocateType::PriceInquiryDirect) => {
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
            Some(LocateType::OfferAcceptReject) => {
                let accept = fix_codec::locate_accept(&parsed.quote_id);
                self.sessions.send(&context.shadow_session_id, accept).await?;
                // Hold the context under the same key until the venue
                // confirms with OrdStatus='B' (see locate_confirm).
                self.correlator.register(parsed.quote_req_id, context, now);
                Ok(())
            }
            None => {
                tracing::warn!(
                    locate_route = %context.locate_route,
                    "locate route no longer resolves to a known locate destination, dropping in-flight locate"
                );
                Ok(())
            }
        }
    }
}
