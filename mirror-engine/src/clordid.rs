//! Outbound client-order-id generation: `<prefix>-<counter>-<4 alnum>`.
//! The counter is process-local; combined with a random suffix it stays
//! unique across restarts within a trading day without any persisted
//! high-water mark.

use std::sync::atomic::{AtomicU64, Ordering};

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

pub struct ClOrdIdGenerator {
    prefix: String,
    counter: AtomicU64,
}

impl ClOrdIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicU64::new(1),
        }
    }

    pub fn next(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("{}-{}-{}", self.prefix, n, random_suffix())
    }
}

fn random_suffix() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    (0..4)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

/// Generates the short locate quote-request identifier from §4.E:
/// `QL_<base36(now_ms)>_<4 alnum random>`, always within the venue's
/// 39-byte limit.
pub fn generate_quote_req_id(now_ms: u64) -> String {
    let id = format!("QL_{}_{}", to_base36(now_ms), random_suffix());
    debug_assert!(id.len() <= 39);
    id
}

fn to_base36(mut n: u64) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let digits = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut out = Vec::new();
    while n > 0 {
        out.push(digits[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches_prefix_counter_suffix_shape(id: &str) -> bool {
        let parts: Vec<&str> = id.split('-').collect();
        parts.len() == 3
            && parts[0] == "COPY"
            && !parts[1].is_empty()
            && parts[1].chars().all(|c| c.is_ascii_digit())
            && parts[2].len() == 4
            && parts[2].chars().all(|c| c.is_ascii_alphanumeric() && c.is_ascii_uppercase() || c.is_ascii_digit())
    }

    #[test]
    fn format_matches_prefix_counter_suffix_shape() {
        let gen = ClOrdIdGenerator::new("COPY");
        let id = gen.next();
        assert!(matches_prefix_counter_suffix_shape(&id), "{id} did not match expected shape");
    }

    #[test]
    fn counter_is_monotonic_and_ids_are_unique_within_a_run() {
        let gen = ClOrdIdGenerator::new("COPY");
        let ids: Vec<String> = (0..200).map(|_| gen.next()).collect();
        let unique: std::collections::HashSet<&String> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len());
    }

    #[test]
    fn quote_req_id_stays_within_the_39_byte_wire_limit() {
        let id = generate_quote_req_id(1_753_000_000_000);
        assert!(id.starts_with("QL_"));
        assert!(id.len() <= 39);
    }
}
