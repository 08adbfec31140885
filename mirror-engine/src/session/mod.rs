pub mod acceptor;
pub mod initiator;
pub mod seqnum;
pub mod session;

use crate::config::{ConnectionType, SessionSettingsFile};
use crate::error::EngineError;
use crate::ports::SessionSender;
use async_trait::async_trait;
use fix_codec::Message;
use session::SessionHandle;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

/// Owns every session's current [`SessionHandle`] (replaced on
/// reconnect/re-accept) and is the concrete [`SessionSender`] the mirror
/// engine dispatches through.
pub struct SessionManager {
    handles: RwLock<HashMap<String, watch::Receiver<Option<SessionHandle>>>>,
}

impl SessionManager {
    /// Spawns the acceptor and every configured initiator as background
    /// tasks, wiring their inbound application messages into `app_tx`.
    /// `logon_timeout` bounds how long a freshly-spawned connection is
    /// given to complete the handshake before it's forced down.
    pub fn start(
        settings_file: &SessionSettingsFile,
        app_tx: mpsc::Sender<(String, Message, Vec<u8>)>,
        logon_timeout: Duration,
    ) -> Self {
        let mut handles = HashMap::new();
        for settings in &settings_file.sessions {
            let (tx, rx) = watch::channel(None);
            handles.insert(settings.session_id.clone(), rx);
            let settings = settings.clone();
            let app_tx = app_tx.clone();
            match settings.connection_type {
                ConnectionType::Acceptor => {
                    tokio::spawn(async move {
                        if let Err(err) = acceptor::run(settings, app_tx, tx, logon_timeout).await {
                            tracing::error!(%err, "acceptor task ended");
                        }
                    });
                }
                ConnectionType::Initiator => {
                    tokio::spawn(async move {
                        if let Err(err) = initiator::run(settings, app_tx, tx, logon_timeout).await {
                            tracing::error!(%err, "initiator task ended");
                        }
                    });
                }
            }
        }
        Self {
            handles: RwLock::new(handles),
        }
    }

    fn handle_for(&self, session_id: &str) -> Option<SessionHandle> {
        self.handles
            .read()
            .expect("session manager lock poisoned")
            .get(session_id)
            .and_then(|rx| rx.borrow().clone())
    }
}

#[async_trait]
impl SessionSender for SessionManager {
    async fn send(&self, session_id: &str, message: Message) -> Result<(), EngineError> {
        let handle = self
            .handle_for(session_id)
            .ok_or_else(|| EngineError::SessionUnavailable(session_id.to_string()))?;
        handle.send(message)
    }

    fn is_logged_on(&self, session_id: &str) -> bool {
        self.handle_for(session_id).map(|h| h.is_logged_on()).unwrap_or(false)
    }
}
