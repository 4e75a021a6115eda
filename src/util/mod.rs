use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};

static COUNTER: AtomicUsize = AtomicUsize::new(1);

/// 64 random bits as 16 lowercase hex chars.
///
/// Falls back to a hashed process-wide counter if the platform RNG is unavailable;
/// callers still check the result against existing ids.
pub(crate) fn random_hex_id() -> String {
    let mut buf = [0u8; 8];
    let bits = match getrandom::getrandom(&mut buf) {
        Ok(()) => u64::from_le_bytes(buf),
        Err(_) => counter_hash(),
    };
    format!("{bits:016x}")
}

fn counter_hash() -> u64 {
    let mut hasher = DefaultHasher::new();
    let counter = COUNTER.fetch_add(1, Ordering::SeqCst);
    counter.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_hex_id_shape() {
        let id = random_hex_id();
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_random_hex_id_distinct() {
        let a = random_hex_id();
        let b = random_hex_id();
        assert_ne!(a, b);
    }

    #[test]
    fn test_counter_hash_advances() {
        assert_ne!(counter_hash(), counter_hash());
    }
}
