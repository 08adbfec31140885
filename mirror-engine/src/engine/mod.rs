//! The decision core: classifies each inbound application message and
//! dispatches to exactly one handler, grounded on the teacher's
//! `message_handler/mod.rs` (a single `match`-based `handle_message`
//! delegating to one submodule per message kind).

mod cancel;
mod fill;
mod locate_confirm;
mod locate_response;
mod new;
mod parse;
mod reject;
mod replace;

use crate::catalog::{CopyRuleCatalog, RouteTable};
use crate::clordid::ClOrdIdGenerator;
use crate::config::FixConfig;
use crate::error::EngineError;
use crate::locate::LocateCorrelator;
use crate::model::ExecType;
use crate::ports::{OrderStore, SessionSender};
use chrono::Utc;
use fix_codec::field::{MSG_TYPE_EXECUTION_REPORT, MSG_TYPE_QUOTE_RESPONSE, TAG_ORD_STATUS};
use fix_codec::{Message, OrdStatus as WireOrdStatus};
use std::sync::Arc;

pub struct MirrorEngine {
    pub(crate) store: Arc<dyn OrderStore>,
    pub(crate) sessions: Arc<dyn SessionSender>,
    pub(crate) catalog: Arc<CopyRuleCatalog>,
    pub(crate) routes: Arc<RouteTable>,
    pub(crate) correlator: Arc<LocateCorrelator>,
    pub(crate) cl_ord_id_gen: Arc<ClOrdIdGenerator>,
    pub(crate) config: FixConfig,
}

impl MirrorEngine {
    pub fn new(
        store: Arc<dyn OrderStore>,
        sessions: Arc<dyn SessionSender>,
        catalog: Arc<CopyRuleCatalog>,
        routes: Arc<RouteTable>,
        correlator: Arc<LocateCorrelator>,
        cl_ord_id_gen: Arc<ClOrdIdGenerator>,
        config: FixConfig,
    ) -> Self {
        Self {
            store,
            sessions,
            catalog,
            routes,
            correlator,
            cl_ord_id_gen,
            config,
        }
    }

    /// Entry point from the acceptor session: one inbound application
    /// message in, fully processed (event persisted and outbound actions
    /// dispatched, or neither) before returning. `raw` is the exact wire
    /// frame the message was decoded from, carried through to
    /// [`crate::model::OrderEvent::raw`] for execution reports.
    pub async fn handle_inbound(&self, session_id: &str, msg: Message, raw: Vec<u8>) -> Result<(), EngineError> {
        match msg.msg_type.as_str() {
            MSG_TYPE_EXECUTION_REPORT => self.handle_execution_report(session_id, msg, raw).await,
            MSG_TYPE_QUOTE_RESPONSE => self.handle_quote_response(msg).await,
            other => {
                tracing::warn!(session_id, msg_type = other, "unhandled application message type, ignoring");
                Ok(())
            }
        }
    }

    /// Maps a copy rule's `shadow_account` to the session that carries it,
    /// by reversing the `fix.shadow_accounts.<session>` overrides (falling
    /// back to treating the session id itself as the account when no
    /// override is configured for it).
    pub(crate) fn session_for_shadow_account(&self, shadow_account: &str) -> Option<String> {
        self.config.shadow_sessions.iter().find_map(|session| {
            match self.config.shadow_account_for(session) {
                Some(account) if account == shadow_account => Some(session.clone()),
                None if session == shadow_account => Some(session.clone()),
                _ => None,
            }
        })
    }

    async fn handle_execution_report(&self, session_id: &str, msg: Message, raw: Vec<u8>) -> Result<(), EngineError> {
        let event = parse::parse_execution_report(session_id, &msg, Utc::now(), raw)?;

        if event.order_status == crate::model::OrderStatus::Calculated
            && msg.get_char(TAG_ORD_STATUS) == Some(WireOrdStatus::Calculated.to_fix())
        {
            return self.handle_locate_confirm(event).await;
        }

        match event.exec_type {
            ExecType::New | ExecType::PendingNew => self.handle_new(event).await,
            ExecType::Replaced => self.handle_replace(event).await,
            ExecType::Canceled | ExecType::PendingCancel => self.handle_cancel(event).await,
            ExecType::Rejected => self.handle_reject(event).await,
            ExecType::PartialFill | ExecType::Fill => self.handle_fill(event).await,
            ExecType::Calculated => self.handle_locate_confirm(event).await,
        }
    }
}
