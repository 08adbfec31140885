//! Short-lived bidirectional map between a vendor quote-request-id and
//! the mirror intent that produced it. Process-local and recreated on
//! restart; a surviving in-flight locate after a restart is, by design,
//! unmatched (see §4.E and §9).

use crate::model::locate::{LocateContext, LocateEntry};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

pub struct LocateCorrelator {
    entries: Mutex<HashMap<String, LocateEntry>>,
    ttl: Duration,
}

impl LocateCorrelator {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub fn register(&self, short_id: String, context: LocateContext, now: DateTime<Utc>) {
        let mut entries = self.entries.lock().expect("locate correlator poisoned");
        entries.insert(
            short_id,
            LocateEntry {
                context,
                registered_at: now,
            },
        );
    }

    /// Returns and removes the entry for `short_id`, unless it has already
    /// aged out past the TTL — an expired entry is treated the same as a
    /// never-registered one.
    pub fn lookup_and_remove(&self, short_id: &str, now: DateTime<Utc>) -> Option<LocateContext> {
        let mut entries = self.entries.lock().expect("locate correlator poisoned");
        let entry = entries.remove(short_id)?;
        if now - entry.registered_at > self.ttl_as_chrono() {
            return None;
        }
        Some(entry.context)
    }

    /// Sweeps and drops entries older than the TTL without consuming
    /// them as a match; call periodically from the supervisor's
    /// timeout-checker task.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.lock().expect("locate correlator poisoned");
        let ttl = self.ttl_as_chrono();
        let before = entries.len();
        entries.retain(|_, entry| now - entry.registered_at <= ttl);
        before - entries.len()
    }

    /// Removes and returns every entry older than `timeout` — the locate
    /// protocol's own deadline, distinct from and much shorter than the
    /// correlator's garbage-collection TTL. Returning the contexts (rather
    /// than just a count, as `purge_expired` does) lets the caller log each
    /// one as its own timeout event.
    pub fn purge_timed_out(&self, now: DateTime<Utc>, timeout: Duration) -> Vec<LocateContext> {
        let mut entries = self.entries.lock().expect("locate correlator poisoned");
        let timeout = ChronoDuration::from_std(timeout).unwrap_or(ChronoDuration::zero());
        let mut timed_out = Vec::new();
        entries.retain(|_, entry| {
            if now - entry.registered_at > timeout {
                timed_out.push(entry.context.clone());
                false
            } else {
                true
            }
        });
        timed_out
    }

    fn ttl_as_chrono(&self) -> ChronoDuration {
        ChronoDuration::from_std(self.ttl).unwrap_or(ChronoDuration::zero())
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("locate correlator poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use fix_codec::{OrdType, Side, TimeInForce};
    use rust_decimal_macros::dec;

    fn context() -> LocateContext {
        LocateContext {
            shadow_account: "A2".into(),
            shadow_session_id: "SHADOW1".into(),
            primary_cl_ord_id: "P1".into(),
            locate_route: "LOCATE1".into(),
            symbol: "GME".into(),
            side: Side::SellShort,
            order_qty: dec!(1000),
            price: Some(dec!(20.00)),
            ord_type: OrdType::Limit,
            time_in_force: TimeInForce::Day,
        }
    }

    #[test]
    fn round_trip_returns_the_exact_tuple_then_empties() {
        let correlator = LocateCorrelator::new(Duration::from_secs(300));
        let now = Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap();
        correlator.register("QL_1".into(), context(), now);

        let found = correlator.lookup_and_remove("QL_1", now);
        assert_eq!(found, Some(context()));

        let second = correlator.lookup_and_remove("QL_1", now);
        assert_eq!(second, None);
    }

    #[test]
    fn unknown_identifier_returns_empty() {
        let correlator = LocateCorrelator::new(Duration::from_secs(300));
        let now = Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap();
        assert_eq!(correlator.lookup_and_remove("missing", now), None);
    }

    #[test]
    fn entries_older_than_ttl_are_unreachable() {
        let correlator = LocateCorrelator::new(Duration::from_secs(60));
        let registered_at = Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap();
        correlator.register("QL_1".into(), context(), registered_at);

        let later = registered_at + ChronoDuration::seconds(61);
        assert_eq!(correlator.lookup_and_remove("QL_1", later), None);
    }

    #[test]
    fn purge_expired_drops_stale_entries_without_a_lookup() {
        let correlator = LocateCorrelator::new(Duration::from_secs(60));
        let registered_at = Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap();
        correlator.register("QL_1".into(), context(), registered_at);
        correlator.register("QL_2".into(), context(), registered_at + ChronoDuration::seconds(59));

        let later = registered_at + ChronoDuration::seconds(61);
        let purged = correlator.purge_expired(later);
        assert_eq!(purged, 1);
        assert_eq!(correlator.len(), 1);
    }

    #[test]
    fn purge_timed_out_returns_the_dropped_contexts_on_a_shorter_horizon_than_the_ttl() {
        let correlator = LocateCorrelator::new(Duration::from_secs(300));
        let registered_at = Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap();
        correlator.register("QL_1".into(), context(), registered_at);
        correlator.register("QL_2".into(), context(), registered_at + ChronoDuration::seconds(29));

        let later = registered_at + ChronoDuration::seconds(31);
        let timed_out = correlator.purge_timed_out(later, Duration::from_secs(30));
        assert_eq!(timed_out, vec![context()]);
        assert_eq!(correlator.len(), 1);
    }
}
