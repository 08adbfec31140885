//! Configuration surface: the `fix.*` keys from a TOML file (or any source
//! the `config` crate can layer — environment overrides included), plus
//! the external session-settings file each session reads its transport
//! parameters from.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

fn default_true() -> bool {
    true
}

fn default_cl_ord_id_prefix() -> String {
    "COPY".to_string()
}

fn default_locate_timeout_ms() -> u64 {
    30_000
}

fn default_correlator_ttl_secs() -> u64 {
    300
}

fn default_logon_timeout_ms() -> u64 {
    10_000
}

fn default_outbound_queue_capacity() -> usize {
    1024
}

#[derive(Debug, Clone, Deserialize)]
pub struct FixConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub primary_session: String,
    pub primary_account: String,
    pub shadow_sessions: Vec<String>,
    #[serde(default)]
    pub shadow_accounts: HashMap<String, String>,
    #[serde(default = "default_cl_ord_id_prefix")]
    pub cl_ord_id_prefix: String,
    #[serde(default = "default_locate_timeout_ms")]
    pub locate_timeout_ms: u64,
    #[serde(default = "default_correlator_ttl_secs")]
    pub correlator_ttl_secs: u64,
    #[serde(default = "default_logon_timeout_ms")]
    pub logon_timeout_ms: u64,
    pub settings_path: PathBuf,
}

impl FixConfig {
    pub fn locate_timeout(&self) -> Duration {
        Duration::from_millis(self.locate_timeout_ms)
    }

    pub fn correlator_ttl(&self) -> Duration {
        Duration::from_secs(self.correlator_ttl_secs)
    }

    pub fn logon_timeout(&self) -> Duration {
        Duration::from_millis(self.logon_timeout_ms)
    }

    pub fn shadow_account_for(&self, session_id: &str) -> Option<&str> {
        self.shadow_accounts.get(session_id).map(|s| s.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub database_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub fix: FixConfig,
    pub store: StoreConfig,
    /// Path to a JSON file seeding the `accounts`/`routes`/`copy_rules`
    /// admin tables on every startup. `None` leaves whatever is already in
    /// the database untouched — the normal case after the first run, since
    /// later edits are expected to go directly against those tables.
    #[serde(default)]
    pub catalog_seed_path: Option<PathBuf>,
    /// Rolling log file directory. `None` logs to stdout only.
    #[serde(default)]
    pub log_directory: Option<PathBuf>,
}

/// Shape of the file `catalog_seed_path` points at. Loaded once at startup
/// and upserted into the database by [`crate::store::EventStore::seed_catalog`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogSeed {
    #[serde(default)]
    pub accounts: Vec<crate::model::Account>,
    #[serde(default)]
    pub routes: Vec<crate::model::Route>,
    #[serde(default)]
    pub copy_rules: Vec<crate::model::CopyRule>,
}

impl CatalogSeed {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

impl Config {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(config::Environment::with_prefix("MIRROR").separator("__"))
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    /// Startup validation beyond what serde already enforces: an enabled
    /// integration must name every credential the session layer needs.
    pub fn validate(&self) -> Result<(), crate::error::EngineError> {
        if !self.fix.enabled {
            return Ok(());
        }
        if self.fix.primary_session.is_empty() {
            return Err(crate::error::EngineError::Fatal(
                "fix.primary_session must not be empty".into(),
            ));
        }
        if self.fix.shadow_sessions.is_empty() {
            return Err(crate::error::EngineError::Fatal(
                "fix.shadow_sessions must name at least one session".into(),
            ));
        }
        if !self.fix.settings_path.exists() {
            return Err(crate::error::EngineError::Fatal(format!(
                "fix.settings_path {:?} does not exist",
                self.fix.settings_path
            )));
        }
        Ok(())
    }
}

/// One entry in the session-settings file: a session's transport and
/// persistence parameters, independent of the business-level `fix.*` keys.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionSettings {
    pub session_id: String,
    pub connection_type: ConnectionType,
    pub sender_comp_id: String,
    pub target_comp_id: String,
    pub begin_string: String,
    pub heart_bt_int: u32,
    #[serde(default)]
    pub socket_accept_port: Option<u16>,
    #[serde(default)]
    pub socket_connect_host: Option<String>,
    #[serde(default)]
    pub socket_connect_port: Option<u16>,
    pub store_directory: PathBuf,
    pub log_directory: PathBuf,
    /// Bound on the per-session outbound queue. A full queue fails the send
    /// with [`crate::error::EngineError::Saturated`] instead of blocking the
    /// caller, per the engine's backpressure design.
    #[serde(default = "default_outbound_queue_capacity")]
    pub outbound_queue_capacity: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    Acceptor,
    Initiator,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionSettingsFile {
    pub sessions: Vec<SessionSettings>,
}

impl SessionSettingsFile {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    pub fn find(&self, session_id: &str) -> Option<&SessionSettings> {
        self.sessions.iter().find(|s| s.session_id == session_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_settings_file_parses_acceptor_and_initiator() {
        let toml = r#"
            [[sessions]]
            session_id = "PRIMARY"
            connection_type = "acceptor"
            sender_comp_id = "MIRROR"
            target_comp_id = "VENDOR"
            begin_string = "FIX.4.2"
            heart_bt_int = 30
            socket_accept_port = 9001
            store_directory = "/tmp/store/primary"
            log_directory = "/tmp/log/primary"

            [[sessions]]
            session_id = "SHADOW1"
            connection_type = "initiator"
            sender_comp_id = "MIRROR"
            target_comp_id = "SHADOW1"
            begin_string = "FIX.4.2"
            heart_bt_int = 30
            socket_connect_host = "127.0.0.1"
            socket_connect_port = 9101
            store_directory = "/tmp/store/shadow1"
            log_directory = "/tmp/log/shadow1"
        "#;
        let parsed: SessionSettingsFile = toml::from_str(toml).unwrap();
        assert_eq!(parsed.sessions.len(), 2);
        assert_eq!(parsed.find("SHADOW1").unwrap().connection_type, ConnectionType::Initiator);
    }
}
