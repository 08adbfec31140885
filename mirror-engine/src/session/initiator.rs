//! One initiator per shadow session: dials out, logs on, and reconnects
//! with exponential back-off (bounded by a max interval) on drop.

use super::session::{spawn_connection, spawn_logon_deadline, SessionHandle};
use super::seqnum::SeqNumStore;
use crate::config::SessionSettings;
use fix_codec::field::{MSG_TYPE_LOGON, TAG_HEART_BT_INT};
use fix_codec::Message;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

pub async fn run(
    settings: SessionSettings,
    app_tx: mpsc::Sender<(String, Message, Vec<u8>)>,
    handle_tx: watch::Sender<Option<SessionHandle>>,
    logon_timeout: Duration,
) -> anyhow::Result<()> {
    let host = settings
        .socket_connect_host
        .clone()
        .ok_or_else(|| anyhow::anyhow!("initiator {} has no socket_connect_host", settings.session_id))?;
    let port = settings
        .socket_connect_port
        .ok_or_else(|| anyhow::anyhow!("initiator {} has no socket_connect_port", settings.session_id))?;
    let seqnum = Arc::new(SeqNumStore::open(&settings.store_directory, &settings.session_id)?);

    let mut backoff = INITIAL_BACKOFF;
    loop {
        match TcpStream::connect((host.as_str(), port)).await {
            Ok(stream) => {
                backoff = INITIAL_BACKOFF;
                tracing::info!(session = %settings.session_id, %host, port, "initiator connected");
                let handle = spawn_connection(stream, settings.clone(), Arc::clone(&seqnum), app_tx.clone());
                let mut logon = Message::new(MSG_TYPE_LOGON);
                logon.push(TAG_HEART_BT_INT, settings.heart_bt_int.to_string());
                // Bypasses the logged-on gate: this is the very message
                // that will eventually flip it, so the ordinary `send`
                // path would always refuse it.
                if handle.send_unconditional(logon).is_err() {
                    tracing::warn!(session = %settings.session_id, "failed to send logon, retrying connection");
                }
                spawn_logon_deadline(handle.clone(), logon_timeout);
                let _ = handle_tx.send(Some(handle.clone()));

                handle.wait_for_close().await;
                let _ = handle_tx.send(None);
            }
            Err(err) => {
                tracing::warn!(session = %settings.session_id, %err, backoff_secs = backoff.as_secs(), "initiator connect failed");
            }
        }

        tokio::time::sleep(backoff).await;
        backoff = (backoff * 2).min(MAX_BACKOFF);
    }
}
