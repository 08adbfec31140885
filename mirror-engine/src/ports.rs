//! Trait seams between the mirror engine and its two heaviest
//! dependencies (persistence, outbound transport), grounded on the
//! teacher's `ports/outbound.rs` (`#[async_trait]` + `mockall::automock`
//! behind `cfg(test)`). Keeping the engine generic over these traits is
//! what lets its dispatch logic be unit-tested without a socket or a
//! database.

use crate::error::EngineError;
use crate::model::{Order, OrderEvent};
use async_trait::async_trait;
use fix_codec::Message;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn append_event<'a>(&self, event: &OrderEvent, primary_order_cl_ord_id: Option<&'a str>) -> Result<bool, EngineError>;
    async fn get_order(&self, account: &str, cl_ord_id: &str) -> Result<Option<Order>, EngineError>;
    async fn get_live_orders_by_primary(&self, primary_cl_ord_id: &str) -> Result<Vec<Order>, EngineError>;
}

#[async_trait]
impl OrderStore for crate::store::EventStore {
    async fn append_event<'a>(&self, event: &OrderEvent, primary_order_cl_ord_id: Option<&'a str>) -> Result<bool, EngineError> {
        crate::store::EventStore::append_event(self, event, primary_order_cl_ord_id).await
    }

    async fn get_order(&self, account: &str, cl_ord_id: &str) -> Result<Option<Order>, EngineError> {
        crate::store::EventStore::get_order(self, account, cl_ord_id).await
    }

    async fn get_live_orders_by_primary(&self, primary_cl_ord_id: &str) -> Result<Vec<Order>, EngineError> {
        crate::store::EventStore::get_live_orders_by_primary(self, primary_cl_ord_id).await
    }
}

/// Outbound delivery to a named shadow (or locate) session. A send on a
/// session that is not logged on must return
/// [`EngineError::SessionUnavailable`] rather than blocking or silently
/// dropping the message, per §4.B.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionSender: Send + Sync {
    async fn send(&self, session_id: &str, message: Message) -> Result<(), EngineError>;
    fn is_logged_on(&self, session_id: &str) -> bool;
}
