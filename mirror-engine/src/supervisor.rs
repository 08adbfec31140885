//! Process lifecycle: ordered startup of the store, copy-rule/route
//! catalogs, locate correlator, session layer and mirror engine, plus a
//! background locate-timeout sweep and a graceful shutdown path.
//! Grounded on the teacher's `bootstrap::services::setup` (ordered
//! `tracing::info!`-logged initialization, `tokio::spawn` background
//! tasks sharing `Arc`-wrapped services).

use crate::catalog::{CopyRuleCatalog, RouteTable};
use crate::clordid::ClOrdIdGenerator;
use crate::config::{CatalogSeed, Config, SessionSettingsFile};
use crate::engine::MirrorEngine;
use crate::error::EngineError;
use crate::locate::LocateCorrelator;
use crate::session::SessionManager;
use crate::store::EventStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// Everything the supervisor brought up, kept alive for the process
/// lifetime. Dropping it (or calling [`Application::shutdown`]) tears
/// sessions down in reverse order of startup.
pub struct Application {
    pub engine: Arc<MirrorEngine>,
    pub sessions: Arc<SessionManager>,
    pub store: Arc<EventStore>,
    shutdown: Arc<Notify>,
}

/// Brings up every subsystem in dependency order and wires the acceptor's
/// inbound stream into the engine. Returns once the session layer is
/// listening/dialing; session logon itself happens asynchronously.
///
/// When `config.catalog_seed_path` is set, the admin tables
/// (`accounts`/`routes`/`copy_rules`) are reconciled with that file on every
/// startup, upserting by natural key; the catalogs themselves are then
/// loaded back from the database, which remains the source of truth for the
/// hot-reload sweep below.
pub async fn start(config: Config) -> anyhow::Result<Application> {
    config.validate()?;
    tracing::info!("configuration validated");

    let store = Arc::new(EventStore::connect(&config.store.database_url).await?);
    tracing::info!(database_url = %config.store.database_url, "event store connected");

    if let Some(path) = &config.catalog_seed_path {
        let seed = CatalogSeed::load(path)?;
        store.seed_catalog(&seed.accounts, &seed.routes, &seed.copy_rules).await?;
        tracing::info!(path = %path.display(), "catalog seed applied");
    }
    let catalog = Arc::new(CopyRuleCatalog::new(store.load_copy_rules().await?));
    let routes = Arc::new(RouteTable::new(store.load_routes().await?));
    tracing::info!("copy-rule and route catalogs loaded");

    let correlator = Arc::new(LocateCorrelator::new(config.fix.correlator_ttl()));
    let cl_ord_id_gen = Arc::new(ClOrdIdGenerator::new(config.fix.cl_ord_id_prefix.clone()));

    let settings = SessionSettingsFile::load(&config.fix.settings_path)?;
    tracing::info!(sessions = settings.sessions.len(), "session settings loaded");

    let (app_tx, mut app_rx) = tokio::sync::mpsc::channel(1024);
    let sessions = Arc::new(SessionManager::start(&settings, app_tx, config.fix.logon_timeout()));
    tracing::info!("session manager started (acceptor + initiators)");

    let engine = Arc::new(MirrorEngine::new(
        store.clone() as Arc<dyn crate::ports::OrderStore>,
        sessions.clone() as Arc<dyn crate::ports::SessionSender>,
        catalog.clone(),
        routes.clone(),
        correlator.clone(),
        cl_ord_id_gen,
        config.fix.clone(),
    ));

    let dispatch_engine = engine.clone();
    tokio::spawn(async move {
        while let Some((session_id, msg, raw)) = app_rx.recv().await {
            if let Err(err) = dispatch_engine.handle_inbound(&session_id, msg, raw).await {
                log_dispatch_error(&session_id, &err);
            }
        }
    });
    tracing::info!("inbound dispatch task spawned");

    let shutdown = Arc::new(Notify::new());
    spawn_locate_ttl_sweep(correlator.clone(), shutdown.clone());
    tracing::info!("locate-ttl sweep task spawned");

    spawn_locate_timeout_sweep(correlator, config.fix.locate_timeout(), shutdown.clone());
    tracing::info!("locate-timeout sweep task spawned");

    spawn_catalog_refresh(store.clone(), catalog.clone(), routes.clone(), shutdown.clone());
    tracing::info!("copy-rule catalog refresh task spawned");

    Ok(Application {
        engine,
        sessions,
        store,
        shutdown,
    })
}

/// Periodically purges locate-correlator entries past the correlator's own
/// (much longer) garbage-collection TTL — the process equivalent of the
/// teacher's timeout-checker task, just against that safety-net TTL
/// instead of a session heartbeat deadline. Distinct from
/// `spawn_locate_timeout_sweep`, which enforces the much shorter locate
/// protocol deadline below.
fn spawn_locate_ttl_sweep(correlator: Arc<LocateCorrelator>, shutdown: Arc<Notify>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(10));
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let purged = correlator.purge_expired(chrono::Utc::now());
                    if purged > 0 {
                        tracing::info!(purged, "swept expired locate correlator entries past the correlator ttl");
                    }
                }
                _ = shutdown.notified() => {
                    tracing::info!("locate-ttl sweep task stopping");
                    return;
                }
            }
        }
    });
}

/// Periodically removes locate-correlator entries that have sat past the
/// locate protocol's own deadline (§5's short-sale locate timeout), logging
/// each one individually as a timeout — distinct from the TTL sweep above,
/// which is a garbage-collection safety net on a much longer horizon and
/// never logs per-entry.
fn spawn_locate_timeout_sweep(correlator: Arc<LocateCorrelator>, locate_timeout: Duration, shutdown: Arc<Notify>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(5));
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let timed_out = correlator.purge_timed_out(chrono::Utc::now(), locate_timeout);
                    for context in timed_out {
                        tracing::warn!(
                            shadow_account = %context.shadow_account,
                            symbol = %context.symbol,
                            primary_cl_ord_id = %context.primary_cl_ord_id,
                            "locate request timed out before a quote response arrived"
                        );
                    }
                }
                _ = shutdown.notified() => {
                    tracing::info!("locate-timeout sweep task stopping");
                    return;
                }
            }
        }
    });
}

/// Periodically reloads `copy_rules`/`routes` from the database and swaps
/// them into the live catalogs. This is the hot-reload path §4.D requires:
/// an operator edits the tables directly (there is no admin API in scope),
/// and a running process picks the change up within one sweep interval
/// instead of requiring a restart.
fn spawn_catalog_refresh(
    store: Arc<EventStore>,
    catalog: Arc<CopyRuleCatalog>,
    routes: Arc<RouteTable>,
    shutdown: Arc<Notify>,
) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(30));
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match store.load_copy_rules().await {
                        Ok(rules) => catalog.refresh(rules),
                        Err(err) => tracing::warn!(%err, "copy-rule catalog refresh failed"),
                    }
                    match store.load_routes().await {
                        Ok(loaded) => routes.refresh(loaded),
                        Err(err) => tracing::warn!(%err, "route table refresh failed"),
                    }
                }
                _ = shutdown.notified() => {
                    tracing::info!("catalog refresh task stopping");
                    return;
                }
            }
        }
    });
}

fn log_dispatch_error(session_id: &str, err: &EngineError) {
    if err.is_skip() {
        tracing::info!(session_id, %err, "inbound message skipped");
    } else {
        tracing::warn!(session_id, %err, "inbound dispatch failed");
    }
}

impl Application {
    /// Stops background tasks and drops the store handle, closing the
    /// pool's connections. Session sockets are shut down when their
    /// owning tasks are cancelled with the rest of the runtime.
    pub async fn shutdown(self) {
        tracing::info!("shutdown requested, stopping background tasks");
        self.shutdown.notify_waiters();
    }
}
