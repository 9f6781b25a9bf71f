//! Hashed string identifiers

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 64-bit FNV-1a hash of a name
///
/// Settings, spawners and other data-driven ids are compared by hash so they
/// stay `Copy` and can live inside POD start parameters.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Pod, Zeroable, Serialize, Deserialize,
)]
#[repr(transparent)]
pub struct Sid(pub u64);

impl Sid {
    pub const INVALID: Sid = Sid(0);

    pub const fn new(name: &str) -> Self {
        let bytes = name.as_bytes();
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        let mut i = 0;
        while i < bytes.len() {
            hash ^= bytes[i] as u64;
            hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
            i += 1;
        }
        Sid(hash)
    }

    pub fn is_valid(&self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for Sid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:016x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sid_is_stable() {
        const A: Sid = Sid::new("strafe-default");
        assert_eq!(A, Sid::new("strafe-default"));
        assert_ne!(A, Sid::new("strafe-indoor"));
        assert!(A.is_valid());
        assert!(!Sid::INVALID.is_valid());
    }
}
