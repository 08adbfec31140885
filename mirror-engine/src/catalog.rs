//! Read-mostly copy-rule set. Grounded on the message handler's
//! `Arc<RwLock<...>>` settings-cache pattern: reads never block behind a
//! write, and a `refresh()` swaps the whole snapshot atomically so an
//! in-flight decision never observes a mix of old and new rules.

use crate::model::{CopyRule, Route};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::RwLock;

/// The same read-mostly/atomic-swap pattern as [`CopyRuleCatalog`],
/// applied to named execution destinations.
pub struct RouteTable {
    routes: RwLock<Arc<HashMap<String, Route>>>,
}

impl RouteTable {
    pub fn new(routes: Vec<Route>) -> Self {
        Self {
            routes: RwLock::new(Arc::new(routes.into_iter().map(|r| (r.name.clone(), r)).collect())),
        }
    }

    pub fn refresh(&self, routes: Vec<Route>) {
        let mut guard = self.routes.write().expect("route table lock poisoned");
        *guard = Arc::new(routes.into_iter().map(|r| (r.name.clone(), r)).collect());
    }

    pub fn get(&self, name: &str) -> Option<Route> {
        self.routes.read().expect("route table lock poisoned").get(name).cloned()
    }
}

pub struct CopyRuleCatalog {
    rules: RwLock<Arc<Vec<CopyRule>>>,
}

impl CopyRuleCatalog {
    pub fn new(rules: Vec<CopyRule>) -> Self {
        Self {
            rules: RwLock::new(Arc::new(rules)),
        }
    }

    /// Atomically replaces the active rule set. The old `Arc` stays alive
    /// for any decision already holding a snapshot from `select_rules`.
    pub fn refresh(&self, rules: Vec<CopyRule>) {
        let mut guard = self.rules.write().expect("catalog lock poisoned");
        *guard = Arc::new(rules);
    }

    /// Returns the deterministic, ordered rule set for `primary_account`
    /// and (when known) `order_type`: active rules only, filtered by
    /// accepted order type, sorted by ascending priority then ascending id.
    pub fn select_rules(&self, primary_account: &str, order_type: Option<&str>) -> Vec<CopyRule> {
        let snapshot = self.rules.read().expect("catalog lock poisoned").clone();
        let mut selected: Vec<CopyRule> = snapshot
            .iter()
            .filter(|r| r.active && r.primary_account == primary_account)
            .filter(|r| r.accepts_order_type(order_type))
            .cloned()
            .collect();
        selected.sort_by(|a, b| a.priority.cmp(&b.priority).then(a.id.cmp(&b.id)));
        selected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::copy_rule::RatioType;
    use rust_decimal_macros::dec;

    fn rule(id: i64, priority: i32, active: bool) -> CopyRule {
        CopyRule {
            id,
            primary_account: "A1".into(),
            shadow_account: format!("SHADOW{id}"),
            ratio_type: RatioType::Multiplier,
            ratio_value: dec!(1),
            accepted_order_types: None,
            copy_route: None,
            locate_route: None,
            min_quantity: None,
            max_quantity: None,
            priority,
            active,
            config: serde_json::Value::Null,
        }
    }

    #[test]
    fn selection_is_ordered_by_priority_then_id_and_skips_inactive() {
        let catalog = CopyRuleCatalog::new(vec![rule(3, 1, true), rule(1, 0, true), rule(2, 1, true), rule(4, 0, false)]);
        let selected = catalog.select_rules("A1", None);
        let ids: Vec<i64> = selected.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 3, 2]);
    }

    #[test]
    fn refresh_replaces_the_whole_snapshot() {
        let catalog = CopyRuleCatalog::new(vec![rule(1, 0, true)]);
        assert_eq!(catalog.select_rules("A1", None).len(), 1);
        catalog.refresh(vec![rule(1, 0, true), rule(2, 0, true)]);
        assert_eq!(catalog.select_rules("A1", None).len(), 2);
    }

    #[test]
    fn selection_filters_on_primary_account() {
        let mut other = rule(5, 0, true);
        other.primary_account = "OTHER".into();
        let catalog = CopyRuleCatalog::new(vec![rule(1, 0, true), other]);
        let selected = catalog.select_rules("A1", None);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].id, 1);
    }
}
