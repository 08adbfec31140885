//! Handles a primary `NEW`/`PENDING_NEW` execution report: §4.F's first
//! row. Persists the event, then fans it out across every selected copy
//! rule, routing short-sale legs through the locate sub-protocol first.

use super::MirrorEngine;
use crate::error::EngineError;
use crate::model::locate::LocateContext;
use crate::model::{CopyRule, OrderEvent, OrderStatus};
use crate::model::route::Route;
use chrono::Utc;
use fix_codec::field::TAG_EX_DESTINATION;
use fix_codec::{OrdType, Side, TimeInForce};
use rust_decimal::Decimal;

impl MirrorEngine {
    pub(crate) async fn handle_new(&self, event: OrderEvent) -> Result<(), EngineError> {
        let inserted = self.store.append_event(&event, None).await?;
        if !inserted {
            return Ok(());
        }

        if event.account != self.config.primary_account {
            // A shadow order's own NEW/PENDING_NEW ack: already recorded
            // above, nothing further to mirror (mirroring it again would
            // loop shadow executions back onto themselves).
            return Ok(());
        }

        let rules = self.catalog.select_rules(&event.account, event.ord_type.as_deref());
        if rules.is_empty() {
            tracing::info!(
                account = %event.account,
                cl_ord_id = %event.cl_ord_id,
                "no active copy rule matches this primary account/order type, skipping mirror"
            );
            return Ok(());
        }

        let side = Side::from_fix(event.side.chars().next().unwrap_or('1')).unwrap_or(Side::Buy);

        for rule in &rules {
            if let Err(err) = self.mirror_new_for_rule(&event, rule, side).await {
                tracing::warn!(
                    rule_id = rule.id,
                    shadow_account = %rule.shadow_account,
                    primary_cl_ord_id = %event.cl_ord_id,
                    error = %err,
                    "mirror of primary NEW did not complete for this rule"
                );
            }
        }

        Ok(())
    }

    async fn mirror_new_for_rule(&self, event: &OrderEvent, rule: &CopyRule, side: Side) -> Result<(), EngineError> {
        let qty = rule.transform_quantity(event.order_qty);
        if qty <= Decimal::ZERO {
            return Err(EngineError::RuleExcluded(format!(
                "rule {} produced a non-positive quantity for order {}",
                rule.id, event.cl_ord_id
            )));
        }
        if !rule.within_bounds(qty) {
            return Err(EngineError::RuleExcluded(format!(
                "rule {} quantity {} is out of bounds for order {}",
                rule.id, qty, event.cl_ord_id
            )));
        }

        let session_id = self.session_for_shadow_account(&rule.shadow_account).ok_or_else(|| {
            EngineError::SessionUnavailable(format!("no session configured for shadow account {}", rule.shadow_account))
        })?;

        let primary_route = event.ex_destination.as_deref().unwrap_or("");
        let route_name = rule.target_route(primary_route, side.is_short());
        let route = self.routes.get(route_name);

        let ord_type = parse_ord_type(event.ord_type.as_deref());
        let time_in_force = parse_time_in_force(event.time_in_force.as_deref());

        if side.is_short() {
            if let Some(route) = route.as_ref().filter(|r| r.is_locate()) {
                return self
                    .start_locate(event, rule, route, &session_id, side, qty, ord_type, time_in_force)
                    .await;
            }
        }

        self.submit_shadow_new_order(
            &event.cl_ord_id,
            &session_id,
            &rule.shadow_account,
            route_name,
            &event.symbol,
            side,
            qty,
            ord_type,
            event.price,
            time_in_force,
        )
        .await
    }

    /// Builds and sends the shadow `NewOrderSingle`, then records a
    /// synthetic `OrderEvent` linking it back to the primary order — the
    /// venue hasn't issued an `ExecID` for this leg yet, so the event is
    /// keyed by the shadow `ClOrdID` itself.
    #[allow(clippy::too_many_arguments)]
    pub(crate) async fn submit_shadow_new_order(
        &self,
        primary_cl_ord_id: &str,
        session_id: &str,
        shadow_account: &str,
        route_name: &str,
        symbol: &str,
        side: Side,
        qty: Decimal,
        ord_type: OrdType,
        price: Option<Decimal>,
        time_in_force: TimeInForce,
    ) -> Result<(), EngineError> {
        let cl_ord_id = self.cl_ord_id_gen.next();
        let mut msg = fix_codec::new_order_single(&cl_ord_id, shadow_account, symbol, side, qty, ord_type, price, time_in_force);
        msg.push(TAG_EX_DESTINATION, route_name);

        self.sessions.send(session_id, msg).await?;

        let now = Utc::now();
        let synthetic = OrderEvent {
            session_id: session_id.to_string(),
            execution_id: format!("MIRROR-{cl_ord_id}"),
            exec_type: crate::model::ExecType::PendingNew,
            order_status: OrderStatus::PendingNew,
            cl_ord_id: cl_ord_id.clone(),
            orig_cl_ord_id: None,
            venue_order_id: None,
            symbol: symbol.to_string(),
            side: side.to_fix().to_string(),
            ord_type: Some(ord_type.to_fix().to_string()),
            time_in_force: Some(time_in_force.to_fix().to_string()),
            order_qty: qty,
            last_qty: None,
            cum_qty: None,
            leaves_qty: None,
            price,
            stop_px: None,
            last_px: None,
            avg_px: None,
            account: shadow_account.to_string(),
            ex_destination: Some(route_name.to_string()),
            quote_req_id: None,
            transact_time: Some(now),
            text: None,
            ingested_at: now,
            raw: Vec::new(),
        };
        self.store.append_event(&synthetic, Some(primary_cl_ord_id)).await?;
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn start_locate(
        &self,
        event: &OrderEvent,
        rule: &CopyRule,
        route: &Route,
        session_id: &str,
        side: Side,
        qty: Decimal,
        ord_type: OrdType,
        time_in_force: TimeInForce,
    ) -> Result<(), EngineError> {
        if route.locate_type.is_none() {
            return Err(EngineError::Fatal(format!(
                "route {} has is_locate()==true but no locate_type",
                route.name
            )));
        }

        let quote_req_id = crate::clordid::generate_quote_req_id(Utc::now().timestamp_millis().max(0) as u64);
        let context = LocateContext {
            shadow_account: rule.shadow_account.clone(),
            shadow_session_id: session_id.to_string(),
            primary_cl_ord_id: event.cl_ord_id.clone(),
            locate_route: route.name.clone(),
            symbol: event.symbol.clone(),
            side,
            order_qty: qty,
            price: event.price,
            ord_type,
            time_in_force,
        };
        self.correlator.register(quote_req_id.clone(), context, Utc::now());

        // Both locate variants open with the same quote-request; they
        // diverge once the venue responds (see locate_response/locate_confirm).
        let quote = fix_codec::quote_request(&quote_req_id, &event.symbol, qty);
        self.sessions.send(session_id, quote).await
    }
}

fn parse_ord_type(raw: Option<&str>) -> OrdType {
    raw.and_then(|s| s.chars().next())
        .and_then(OrdType::from_fix)
        .unwrap_or(OrdType::Limit)
}

fn parse_time_in_force(raw: Option<&str>) -> TimeInForce {
    raw.and_then(|s| s.chars().next())
        .and_then(TimeInForce::from_fix)
        .unwrap_or(TimeInForce::Day)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CopyRuleCatalog, RouteTable};
    use crate::clordid::ClOrdIdGenerator;
    use crate::config::FixConfig;
    use crate::locate::LocateCorrelator;
    use crate::model::copy_rule::RatioType;
    use crate::model::route::LocateType;
    use crate::ports::{MockOrderStore, MockSessionSender};
    use rust_decimal_macros::dec;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::Duration;

    fn rule(shadow_account: &str, ratio: Decimal) -> CopyRule {
        CopyRule {
            id: 1,
            primary_account: "A1".into(),
            shadow_account: shadow_account.into(),
            ratio_type: RatioType::Multiplier,
            ratio_value: ratio,
            accepted_order_types: None,
            copy_route: None,
            locate_route: None,
            min_quantity: None,
            max_quantity: None,
            priority: 0,
            active: true,
            config: serde_json::Value::Null,
        }
    }

    fn config() -> FixConfig {
        FixConfig {
            enabled: true,
            primary_session: "PRIMARY".into(),
            primary_account: "A1".into(),
            shadow_sessions: vec!["SHADOW1".into()],
            shadow_accounts: HashMap::from([("SHADOW1".into(), "A2".into())]),
            cl_ord_id_prefix: "COPY".into(),
            locate_timeout_ms: 30_000,
            correlator_ttl_secs: 300,
            logon_timeout_ms: 10_000,
            settings_path: PathBuf::from("/dev/null"),
        }
    }

    fn event() -> OrderEvent {
        OrderEvent {
            session_id: "PRIMARY".into(),
            execution_id: "E1".into(),
            exec_type: crate::model::ExecType::New,
            order_status: OrderStatus::New,
            cl_ord_id: "P1".into(),
            orig_cl_ord_id: None,
            venue_order_id: None,
            symbol: "AAPL".into(),
            side: "1".into(),
            ord_type: Some("2".into()),
            time_in_force: Some("0".into()),
            order_qty: dec!(100),
            last_qty: None,
            cum_qty: None,
            leaves_qty: None,
            price: Some(dec!(150.00)),
            stop_px: None,
            last_px: None,
            avg_px: None,
            account: "A1".into(),
            ex_destination: Some("NYSE".into()),
            quote_req_id: None,
            transact_time: None,
            text: None,
            ingested_at: Utc::now(),
            raw: Vec::new(),
        }
    }

    fn engine(store: MockOrderStore, sessions: MockSessionSender) -> MirrorEngine {
        MirrorEngine::new(
            Arc::new(store),
            Arc::new(sessions),
            Arc::new(CopyRuleCatalog::new(vec![rule("A2", dec!(2))])),
            Arc::new(RouteTable::new(vec![])),
            Arc::new(LocateCorrelator::new(Duration::from_secs(300))),
            Arc::new(ClOrdIdGenerator::new("COPY")),
            config(),
        )
    }

    #[tokio::test]
    async fn long_new_order_scales_quantity_and_sends_on_the_shadow_session() {
        let mut store = MockOrderStore::new();
        store.expect_append_event().times(2).returning(|_, _| Ok(true));

        let mut sessions = MockSessionSender::new();
        sessions
            .expect_send()
            .withf(|session_id, msg| session_id == "SHADOW1" && msg.get_str(fix_codec::field::TAG_ORDER_QTY) == Some("200"))
            .times(1)
            .returning(|_, _| Ok(()));

        let engine = engine(store, sessions);
        engine.handle_new(event()).await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_execution_id_is_not_mirrored_twice() {
        let mut store = MockOrderStore::new();
        store.expect_append_event().times(1).returning(|_, _| Ok(false));

        let sessions = MockSessionSender::new();
        let engine = engine(store, sessions);
        engine.handle_new(event()).await.unwrap();
    }

    #[tokio::test]
    async fn shadow_accounts_own_ack_is_persisted_but_not_mirrored() {
        let mut store = MockOrderStore::new();
        store.expect_append_event().times(1).returning(|_, _| Ok(true));

        let sessions = MockSessionSender::new();
        let engine = engine(store, sessions);
        let mut shadow_ack = event();
        shadow_ack.account = "A2".into();
        engine.handle_new(shadow_ack).await.unwrap();
    }

    #[tokio::test]
    async fn short_sale_into_a_locate_route_sends_a_quote_request_instead_of_a_new_order() {
        let mut store = MockOrderStore::new();
        store.expect_append_event().times(1).returning(|_, _| Ok(true));

        let mut sessions = MockSessionSender::new();
        sessions
            .expect_send()
            .withf(|session_id, msg| session_id == "SHADOW1" && msg.msg_type == fix_codec::field::MSG_TYPE_QUOTE_REQUEST)
            .times(1)
            .returning(|_, _| Ok(()));

        let routes = RouteTable::new(vec![Route {
            id: 1,
            name: "LOCATE1".into(),
            broker: "VENDOR".into(),
            priority: 0,
            active: true,
            locate_type: Some(LocateType::OfferAcceptReject),
        }]);
        let mut rule = rule("A2", dec!(1));
        rule.locate_route = Some("LOCATE1".into());

        let engine = MirrorEngine::new(
            Arc::new(store),
            Arc::new(sessions),
            Arc::new(CopyRuleCatalog::new(vec![rule])),
            Arc::new(routes),
            Arc::new(LocateCorrelator::new(Duration::from_secs(300))),
            Arc::new(ClOrdIdGenerator::new("COPY")),
            config(),
        );

        let mut short_event = event();
        short_event.side = "5".into();
        engine.handle_new(short_event).await.unwrap();
        assert_eq!(engine.correlator.len(), 1);
    }
}
