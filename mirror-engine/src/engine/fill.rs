//! Handles `PARTIAL_FILL`/`FILL` execution reports: fills propagate
//! naturally from each child order's own execution reports, so this is a
//! pure projection update for whichever leg (primary or shadow) reported
//! it — no further outbound dispatch.

use super::MirrorEngine;
use crate::error::EngineError;
use crate::model::OrderEvent;

impl MirrorEngine {
    pub(crate) async fn handle_fill(&self, event: OrderEvent) -> Result<(), EngineError> {
        self.store.append_event(&event, None).await?;
        Ok(())
    }
}
