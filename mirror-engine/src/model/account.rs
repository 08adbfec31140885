use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccountType {
    Primary,
    Shadow,
}

/// Identity record for a brokerage account. Mutated only by the
/// administrative surface; the engine treats rows as read-mostly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub account_number: String,
    pub broker: String,
    pub account_type: AccountType,
    pub active: bool,
    pub strategy_key: Option<String>,
}
