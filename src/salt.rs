//! Deployment salts.
//!
//! A salt is the creation time in milliseconds followed by a 32-bit rolling hash
//! of the deployment inputs. The hash is not cryptographic; uniqueness comes from
//! the timestamp, the hash only separates deployments started in the same
//! millisecond by different creators or with different parameters.

use ethers::types::{Address, H256};
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of the current time in milliseconds
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> u64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default()
    }
}

/// Order-sensitive `h = 31 * h + c` over the UTF-16 code units of `input`
fn rolling_hash(input: &str) -> i32 {
    input
        .encode_utf16()
        .fold(0i32, |h, c| h.wrapping_mul(31).wrapping_add(c as i32))
}

/// Salt for a deployment started at `timestamp_ms`
pub fn derive_salt_at(
    creator: Address,
    name: &str,
    symbol: &str,
    metadata_uri: &str,
    timestamp_ms: u64,
) -> H256 {
    let combined = format!("{creator:#x}{name}{symbol}{metadata_uri}{timestamp_ms}");
    let hash = rolling_hash(&combined);

    let mut salt = [0u8; 32];
    salt[16..24].copy_from_slice(&timestamp_ms.to_be_bytes());
    salt[24..28].copy_from_slice(&hash.to_be_bytes());
    H256(salt)
}

/// Derives salts from the current time of its clock
#[derive(Debug, Default, Clone)]
pub struct SaltDeriver<C = SystemClock> {
    clock: C,
}

impl<C: Clock> SaltDeriver<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    pub fn derive(&self, creator: Address, name: &str, symbol: &str, metadata_uri: &str) -> H256 {
        derive_salt_at(creator, name, symbol, metadata_uri, self.clock.now_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    struct FixedClock(u64);

    impl Clock for FixedClock {
        fn now_millis(&self) -> u64 {
            self.0
        }
    }

    struct TickingClock(AtomicU64);

    impl Clock for TickingClock {
        fn now_millis(&self) -> u64 {
            self.0.fetch_add(1, Ordering::SeqCst)
        }
    }

    fn creator() -> Address {
        "0xabc0000000000000000000000000000000000abc".parse().unwrap()
    }

    #[test]
    fn test_same_instant_same_salt() {
        let deriver = SaltDeriver::new(FixedClock(1_700_000_000_000));
        let a = deriver.derive(creator(), "Test Coin", "TST", "ipfs://Qm");
        let b = deriver.derive(creator(), "Test Coin", "TST", "ipfs://Qm");
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_instants_differ() {
        let deriver = SaltDeriver::new(TickingClock(AtomicU64::new(1_700_000_000_000)));
        let a = deriver.derive(creator(), "Test Coin", "TST", "ipfs://Qm");
        let b = deriver.derive(creator(), "Test Coin", "TST", "ipfs://Qm");
        assert_ne!(a, b);
    }

    #[test]
    fn test_inputs_change_salt() {
        let t = 1_700_000_000_000;
        let base = derive_salt_at(creator(), "Test Coin", "TST", "ipfs://Qm", t);
        assert_ne!(base, derive_salt_at(creator(), "Test Coin", "TSU", "ipfs://Qm", t));
        assert_ne!(base, derive_salt_at(Address::zero(), "Test Coin", "TST", "ipfs://Qm", t));
        // order sensitive
        assert_ne!(
            derive_salt_at(creator(), "AB", "CD", "", t),
            derive_salt_at(creator(), "CD", "AB", "", t)
        );
    }

    #[test]
    fn test_timestamp_is_embedded() {
        let t = 0x0102_0304_0506_0708u64;
        let salt = derive_salt_at(creator(), "n", "s", "u", t);
        assert_eq!(&salt.0[..16], &[0u8; 16]);
        assert_eq!(&salt.0[16..24], &t.to_be_bytes());
    }

    #[test]
    fn test_rolling_hash_matches_string_hash_code() {
        // "abc".hashCode() == 96354
        assert_eq!(rolling_hash("abc"), 96354);
        assert_eq!(rolling_hash(""), 0);
    }
}
