//! End-to-end mirror scenarios driven through `MirrorEngine::handle_inbound`
//! against a real `EventStore` (in-memory SQLite), so the event log and the
//! `orders` projection are exercised exactly as the running process would
//! use them. The outbound session boundary is a small recording fixture
//! rather than a real socket — there is no counterparty to log on to here,
//! and the wire framing itself is already covered by `fix-codec`'s own
//! round-trip tests.

use async_trait::async_trait;
use fix_codec::field::*;
use fix_codec::Message;
use mirror_engine::catalog::{CopyRuleCatalog, RouteTable};
use mirror_engine::clordid::ClOrdIdGenerator;
use mirror_engine::config::FixConfig;
use mirror_engine::engine::MirrorEngine;
use mirror_engine::locate::LocateCorrelator;
use mirror_engine::model::copy_rule::RatioType;
use mirror_engine::model::route::LocateType;
use mirror_engine::model::{CopyRule, Route};
use mirror_engine::ports::SessionSender;
use mirror_engine::store::EventStore;
use mirror_engine::EngineError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Records every outbound send instead of putting bytes on a socket. The
/// scenarios below only ever talk to one shadow/locate session, so there is
/// no need to model per-session routing beyond what's asserted.
#[derive(Default)]
struct RecordingSessions {
    sent: Mutex<Vec<(String, Message)>>,
}

impl RecordingSessions {
    fn sent(&self) -> Vec<(String, Message)> {
        self.sent.lock().unwrap().clone()
    }

    fn sent_of_type(&self, msg_type: &str) -> Vec<Message> {
        self.sent()
            .into_iter()
            .filter(|(_, m)| m.msg_type == msg_type)
            .map(|(_, m)| m)
            .collect()
    }
}

#[async_trait]
impl SessionSender for RecordingSessions {
    async fn send(&self, session_id: &str, message: Message) -> Result<(), EngineError> {
        self.sent.lock().unwrap().push((session_id.to_string(), message));
        Ok(())
    }

    fn is_logged_on(&self, _session_id: &str) -> bool {
        true
    }
}

fn fix_config() -> FixConfig {
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

fn copy_rule(ratio_type: RatioType, ratio_value: Decimal) -> CopyRule {
    CopyRule {
        id: 1,
        primary_account: "A1".into(),
        shadow_account: "A2".into(),
        ratio_type,
        ratio_value,
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

async fn engine_with(rules: Vec<CopyRule>, routes: Vec<Route>) -> (MirrorEngine, Arc<EventStore>, Arc<RecordingSessions>) {
    let store = Arc::new(EventStore::connect("sqlite::memory:").await.unwrap());
    let sessions = Arc::new(RecordingSessions::default());
    let engine = MirrorEngine::new(
        store.clone() as Arc<dyn mirror_engine::ports::OrderStore>,
        sessions.clone() as Arc<dyn SessionSender>,
        Arc::new(CopyRuleCatalog::new(rules)),
        Arc::new(RouteTable::new(routes)),
        Arc::new(LocateCorrelator::new(Duration::from_secs(300))),
        Arc::new(ClOrdIdGenerator::new("COPY")),
        fix_config(),
    );
    (engine, store, sessions)
}

/// A stand-in wire frame: the scenarios below construct `Message`s
/// directly rather than decoding real bytes off a socket, so this is just
/// something distinct per call to verify it survives into `OrderEvent.raw`
/// unchanged rather than being silently replaced with an empty vec.
fn raw_frame(exec_id: &str) -> Vec<u8> {
    format!("8=FIX.4.2|raw-frame-for={exec_id}|10=000|").into_bytes()
}

fn execution_report(exec_type: char, ord_status: char, exec_id: &str, cl_ord_id: &str, account: &str, qty: Decimal) -> Message {
    let mut msg = Message::new(MSG_TYPE_EXECUTION_REPORT);
    msg.push(TAG_EXEC_TYPE, exec_type.to_string())
        .push(TAG_ORD_STATUS, ord_status.to_string())
        .push(TAG_EXEC_ID, exec_id)
        .push(TAG_CL_ORD_ID, cl_ord_id)
        .push(TAG_SYMBOL, "AAPL")
        .push(TAG_SIDE, "1")
        .push(TAG_ORD_TYPE, "2")
        .push(TAG_TIME_IN_FORCE, "0")
        .push(TAG_ORDER_QTY, qty.to_string())
        .push(TAG_PRICE, "150.00")
        .push(TAG_ACCOUNT, account)
        .push(TAG_EX_DESTINATION, "NYSE");
    msg
}

/// S1: a plain long `NEW` on the primary, one 1:1 copy rule, mirrored onto
/// the single configured shadow session at the same quantity.
#[tokio::test]
async fn s1_basic_mirror_replicates_a_long_new_order_one_to_one() {
    let (engine, store, sessions) = engine_with(vec![copy_rule(RatioType::Multiplier, dec!(1))], vec![]).await;

    engine
        .handle_inbound("PRIMARY", execution_report('0', '0', "EX1", "P1", "A1", dec!(100)), raw_frame("EX1"))
        .await
        .unwrap();

    let news = sessions.sent_of_type(MSG_TYPE_NEW_ORDER_SINGLE);
    assert_eq!(news.len(), 1);
    assert_eq!(news[0].get_str(TAG_ORDER_QTY), Some("100"));
    assert_eq!(news[0].get_str(TAG_ACCOUNT), Some("A2"));

    let order = store.get_order("A1", "P1").await.unwrap().unwrap();
    assert_eq!(order.order_qty, dec!(100));
    let shadow_orders = store.get_live_orders_by_primary("P1").await.unwrap();
    assert_eq!(shadow_orders.len(), 1);
    assert_eq!(shadow_orders[0].account, "A2");

    let events = store.events_for_order("A1", "P1").await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].raw, raw_frame("EX1"));
}

/// S2: a 50% `PERCENTAGE` rule halves the mirrored quantity.
#[tokio::test]
async fn s2_scaled_mirror_applies_the_percentage_ratio() {
    let (engine, _store, sessions) = engine_with(vec![copy_rule(RatioType::Percentage, dec!(50))], vec![]).await;

    engine
        .handle_inbound("PRIMARY", execution_report('0', '0', "EX1", "P1", "A1", dec!(200)), raw_frame("EX1"))
        .await
        .unwrap();

    let news = sessions.sent_of_type(MSG_TYPE_NEW_ORDER_SINGLE);
    assert_eq!(news.len(), 1);
    assert_eq!(news[0].get_str(TAG_ORDER_QTY), Some("100"));
}

/// S3: a primary `REPLACED` propagates an amend to the live shadow order
/// opened by the earlier `NEW`, looked up via `orig_cl_ord_id`.
#[tokio::test]
async fn s3_replace_propagates_to_the_live_shadow_order() {
    let (engine, _store, sessions) = engine_with(vec![copy_rule(RatioType::Multiplier, dec!(1))], vec![]).await;

    engine
        .handle_inbound("PRIMARY", execution_report('0', '0', "EX1", "P1", "A1", dec!(100)), raw_frame("EX1"))
        .await
        .unwrap();

    let mut replace = execution_report('5', '5', "EX2", "P1R", "A1", dec!(150));
    replace.push(TAG_ORIG_CL_ORD_ID, "P1");
    engine.handle_inbound("PRIMARY", replace, raw_frame("EX2")).await.unwrap();

    let replaces = sessions.sent_of_type(MSG_TYPE_ORDER_CANCEL_REPLACE_REQUEST);
    assert_eq!(replaces.len(), 1);
    assert_eq!(replaces[0].get_str(TAG_ORDER_QTY), Some("150"));
}

/// S4: a primary `CANCELED` propagates a cancel to the live shadow order.
#[tokio::test]
async fn s4_cancel_propagates_to_the_live_shadow_order() {
    let (engine, store, sessions) = engine_with(vec![copy_rule(RatioType::Multiplier, dec!(1))], vec![]).await;

    engine
        .handle_inbound("PRIMARY", execution_report('0', '0', "EX1", "P1", "A1", dec!(100)), raw_frame("EX1"))
        .await
        .unwrap();

    let mut cancel = execution_report('4', '4', "EX2", "P1", "A1", dec!(100));
    cancel.push(TAG_ORIG_CL_ORD_ID, "P1");
    engine.handle_inbound("PRIMARY", cancel, raw_frame("EX2")).await.unwrap();

    assert_eq!(sessions.sent_of_type(MSG_TYPE_ORDER_CANCEL_REQUEST).len(), 1);
    let live = store.get_live_orders_by_primary("P1").await.unwrap();
    assert!(live.is_empty());
}

fn locate_route() -> Route {
    Route {
        id: 1,
        name: "LOCATE1".into(),
        broker: "VENDOR".into(),
        priority: 0,
        active: true,
        locate_type: Some(LocateType::OfferAcceptReject),
    }
}

fn short_rule() -> CopyRule {
    let mut rule = copy_rule(RatioType::Multiplier, dec!(1));
    rule.locate_route = Some("LOCATE1".into());
    rule
}

/// S5: a short-sale `NEW` drives the `OFFER_ACCEPT_REJECT` locate protocol
/// end to end — quote-request out, a sufficient quote-response accepted,
/// then the vendor's `OrdStatus='B'` confirmation releases the shadow
/// `NewOrderSingle`.
#[tokio::test]
async fn s5_short_sale_locate_offer_accept_succeeds_through_to_a_shadow_order() {
    let (engine, _store, sessions) = engine_with(vec![short_rule()], vec![locate_route()]).await;

    let mut short_new = execution_report('0', '0', "EX1", "P1", "A1", dec!(1000));
    short_new.push(TAG_SIDE, "5"); // SellShort
    engine.handle_inbound("PRIMARY", short_new, raw_frame("EX1")).await.unwrap();

    let quote_requests = sessions.sent_of_type(MSG_TYPE_QUOTE_REQUEST);
    assert_eq!(quote_requests.len(), 1);
    let quote_req_id = quote_requests[0].require_str(TAG_QUOTE_REQ_ID).unwrap().to_string();

    let mut quote_response = Message::new(MSG_TYPE_QUOTE_RESPONSE);
    quote_response
        .push(TAG_QUOTE_REQ_ID, &quote_req_id)
        .push(TAG_QUOTE_ID, "Q-1")
        .push(TAG_SYMBOL, "AAPL")
        .push(TAG_OFFER_SIZE, "1000");
    engine.handle_inbound("SHADOW1", quote_response, Vec::new()).await.unwrap();

    assert_eq!(sessions.sent_of_type(MSG_TYPE_LOCATE_ACCEPT_REJECT).len(), 1);
    assert!(sessions.sent_of_type(MSG_TYPE_NEW_ORDER_SINGLE).is_empty());

    // The venue hasn't produced an ExecID for the shadow leg yet at this
    // point, so the confirmation's own cl_ord_id is irrelevant to matching —
    // only the quote_req_id correlates it back to the held locate context.
    let mut confirm = execution_report('L', 'B', "EX2", "P-SHADOW", "A2", dec!(1000));
    confirm.push(TAG_QUOTE_REQ_ID, &quote_req_id);
    engine.handle_inbound("SHADOW1", confirm, raw_frame("EX2")).await.unwrap();

    assert_eq!(sessions.sent_of_type(MSG_TYPE_NEW_ORDER_SINGLE).len(), 1);
}

/// S6: the locate venue offers less than the requested quantity, so the
/// protocol stops at the quote response and no shadow order is ever sent.
#[tokio::test]
async fn s6_short_sale_locate_rejection_never_submits_a_shadow_order() {
    let (engine, _store, sessions) = engine_with(vec![short_rule()], vec![locate_route()]).await;

    let mut short_new = execution_report('0', '0', "EX1", "P1", "A1", dec!(1000));
    short_new.push(TAG_SIDE, "5");
    engine.handle_inbound("PRIMARY", short_new, raw_frame("EX1")).await.unwrap();

    let quote_req_id = sessions.sent_of_type(MSG_TYPE_QUOTE_REQUEST)[0]
        .require_str(TAG_QUOTE_REQ_ID)
        .unwrap()
        .to_string();

    let mut quote_response = Message::new(MSG_TYPE_QUOTE_RESPONSE);
    quote_response
        .push(TAG_QUOTE_REQ_ID, &quote_req_id)
        .push(TAG_QUOTE_ID, "Q-1")
        .push(TAG_SYMBOL, "AAPL")
        .push(TAG_OFFER_SIZE, "400"); // short of the requested 1000
    engine.handle_inbound("SHADOW1", quote_response, Vec::new()).await.unwrap();

    assert!(sessions.sent_of_type(MSG_TYPE_LOCATE_ACCEPT_REJECT).is_empty());
    assert!(sessions.sent_of_type(MSG_TYPE_NEW_ORDER_SINGLE).is_empty());
}
