//! The single drop-copy acceptor: listens for the primary counterparty,
//! accepts a logon, and re-listens after a disconnect rather than ever
//! dialing out itself.

use super::session::{spawn_connection, spawn_logon_deadline, SessionHandle};
use super::seqnum::SeqNumStore;
use crate::config::SessionSettings;
use fix_codec::Message;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};

/// Runs forever, replacing the published [`SessionHandle`] each time a new
/// connection is accepted. `handle_tx` lets the rest of the supervisor
/// observe the current handle without polling. `logon_timeout` bounds how
/// long a freshly-accepted connection is given to complete the handshake
/// before it's forced down and the acceptor goes back to listening.
pub async fn run(
    settings: SessionSettings,
    app_tx: mpsc::Sender<(String, Message, Vec<u8>)>,
    handle_tx: watch::Sender<Option<SessionHandle>>,
    logon_timeout: Duration,
) -> anyhow::Result<()> {
    let port = settings
        .socket_accept_port
        .ok_or_else(|| anyhow::anyhow!("acceptor session {} has no socket_accept_port", settings.session_id))?;
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    let seqnum = Arc::new(SeqNumStore::open(&settings.store_directory, &settings.session_id)?);

    loop {
        tracing::info!(session = %settings.session_id, port, "acceptor listening");
        let (stream, peer) = listener.accept().await?;
        tracing::info!(session = %settings.session_id, %peer, "accepted drop-copy connection");
        let handle = spawn_connection(stream, settings.clone(), Arc::clone(&seqnum), app_tx.clone());
        spawn_logon_deadline(handle.clone(), logon_timeout);
        let _ = handle_tx.send(Some(handle));
    }
}
