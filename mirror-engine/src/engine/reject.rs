//! Handles a `REJECTED` execution report: §4.F's table has no outbound
//! action here, only the projection update.

use super::MirrorEngine;
use crate::error::EngineError;
use crate::model::OrderEvent;

impl MirrorEngine {
    pub(crate) async fn handle_reject(&self, event: OrderEvent) -> Result<(), EngineError> {
        self.store.append_event(&event, None).await?;
        Ok(())
    }
}
