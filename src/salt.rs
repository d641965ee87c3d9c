use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Alphabet the string-salt family draws from: 62 alphanumeric symbols.
pub const SALT_CHARS: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Which salt family a hash function belongs to. The code generators pick
/// their hash snippet off this tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaltKind {
    /// Salt is a string over [`SALT_CHARS`].
    Str,
    /// Salt is a table of integers in `[1, n)`.
    Int,
}

/// A salted hash function mapping keys into `[0, n)`.
///
/// The salt grows lazily: hashing a key longer than any seen so far draws
/// fresh random salt positions, which then stay fixed for the lifetime of the
/// instance. Re-hashing a key is therefore always stable, and `hash` takes
/// `&mut self`.
pub trait SaltHash {
    /// Fresh instance with modulus `n`, an empty salt and its own random
    /// source.
    fn initialize(n: usize, rng: StdRng) -> Self
    where
        Self: Sized;

    /// Hash `key` into `[0, n)`, growing the salt if needed.
    fn hash(&mut self, key: &str) -> usize;

    /// The modulus (number of buckets / graph vertices).
    fn n(&self) -> usize;

    fn kind(&self) -> SaltKind;

    /// Current salt length, in positions.
    fn salt_len(&self) -> usize;

    /// Salt rendered for embedding in generated code.
    fn formatted_salt(&self) -> String;
}

/// String-salt hash: each key char is multiplied by the salt char at the same
/// position, summed, reduced mod `n`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone)]
pub struct StrSaltHash {
    n: usize,
    salt: String,
    #[cfg_attr(feature = "serde", serde(skip, default = "entropy_rng"))]
    rng: StdRng,
}

impl StrSaltHash {
    /// Instance with a fixed, pre-chosen salt. Used by deterministic replay;
    /// hashing keys no longer than `salt` never touches the random source.
    pub fn with_salt(n: usize, salt: impl Into<String>) -> Self {
        Self {
            n,
            salt: salt.into(),
            rng: StdRng::from_entropy(),
        }
    }

    /// The raw salt string.
    pub fn salt(&self) -> &str {
        &self.salt
    }
}

impl SaltHash for StrSaltHash {
    fn initialize(n: usize, rng: StdRng) -> Self {
        Self {
            n,
            salt: String::new(),
            rng,
        }
    }

    fn hash(&mut self, key: &str) -> usize {
        let key_len = key.chars().count();
        // Salt chars are ASCII, so byte length == position count.
        while self.salt.len() < key_len {
            let i = self.rng.gen_range(0..SALT_CHARS.len());
            self.salt.push(SALT_CHARS.as_bytes()[i] as char);
        }

        let mut sum: u64 = 0;
        for (s, c) in self.salt.bytes().zip(key.chars()) {
            sum += u64::from(s) * u64::from(c as u32);
        }
        (sum % self.n as u64) as usize
    }

    fn n(&self) -> usize {
        self.n
    }

    fn kind(&self) -> SaltKind {
        SaltKind::Str
    }

    fn salt_len(&self) -> usize {
        self.salt.len()
    }

    fn formatted_salt(&self) -> String {
        self.salt.clone()
    }
}

/// Integer-salt hash: like [`StrSaltHash`], but salt positions are integers
/// drawn uniformly from `[1, n)`. Better spread for large key sets.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone)]
pub struct IntSaltHash {
    n: usize,
    salt: Vec<u64>,
    #[cfg_attr(feature = "serde", serde(skip, default = "entropy_rng"))]
    rng: StdRng,
}

impl IntSaltHash {
    /// The raw salt table.
    pub fn salt(&self) -> &[u64] {
        &self.salt
    }
}

impl SaltHash for IntSaltHash {
    fn initialize(n: usize, rng: StdRng) -> Self {
        debug_assert!(n >= 2, "integer salts are drawn from [1, n)");
        Self {
            n,
            salt: Vec::new(),
            rng,
        }
    }

    fn hash(&mut self, key: &str) -> usize {
        let key_len = key.chars().count();
        while self.salt.len() < key_len {
            self.salt.push(self.rng.gen_range(1..self.n as u64));
        }

        let mut sum: u64 = 0;
        for (&s, c) in self.salt.iter().zip(key.chars()) {
            sum = sum.wrapping_add(s.wrapping_mul(u64::from(c as u32)));
        }
        (sum % self.n as u64) as usize
    }

    fn n(&self) -> usize {
        self.n
    }

    fn kind(&self) -> SaltKind {
        SaltKind::Int
    }

    fn salt_len(&self) -> usize {
        self.salt.len()
    }

    fn formatted_salt(&self) -> String {
        let items: Vec<String> = self.salt.iter().map(|s| s.to_string()).collect();
        items.join(", ")
    }
}

#[cfg(feature = "serde")]
fn entropy_rng() -> StdRng {
    StdRng::from_entropy()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(seed: u64) -> StdRng {
        StdRng::seed_from_u64(seed)
    }

    #[test]
    fn str_salt_grows_and_never_shrinks() {
        let mut h = StrSaltHash::initialize(10, seeded(1));
        assert_eq!(h.salt_len(), 0);
        h.hash("abc");
        assert_eq!(h.salt_len(), 3);
        h.hash("a");
        assert_eq!(h.salt_len(), 3);
        h.hash("abcdef");
        assert_eq!(h.salt_len(), 6);
    }

    #[test]
    fn str_salt_positions_fixed_once_drawn() {
        let mut h = StrSaltHash::initialize(17, seeded(2));
        let first = h.hash("hello");
        let prefix = h.salt().to_string();
        h.hash("hello world, much longer");
        assert!(h.salt().starts_with(&prefix), "old salt positions changed");
        assert_eq!(h.hash("hello"), first, "re-hash of the same key drifted");
    }

    #[test]
    fn str_salt_in_range() {
        let mut h = StrSaltHash::initialize(7, seeded(3));
        for key in ["", "a", "zzzz", "some longer key", "\u{1F600}"] {
            assert!(h.hash(key) < 7);
        }
    }

    #[test]
    fn str_salt_is_deterministic_given_seed() {
        let mut a = StrSaltHash::initialize(31, seeded(99));
        let mut b = StrSaltHash::initialize(31, seeded(99));
        for key in ["x", "yy", "zzz"] {
            assert_eq!(a.hash(key), b.hash(key));
        }
        assert_eq!(a.salt(), b.salt());
    }

    #[test]
    fn with_salt_matches_hand_computation() {
        // 'A' * 'h' + 'B' * 'i' = 65*104 + 66*105 = 13690; 13690 % 7 = 5
        let mut h = StrSaltHash::with_salt(7, "AB");
        assert_eq!(h.hash("hi"), 5);
        assert_eq!(h.formatted_salt(), "AB");
    }

    #[test]
    fn int_salt_elements_in_range() {
        let mut h = IntSaltHash::initialize(12, seeded(4));
        h.hash("a fairly long key here");
        assert_eq!(h.salt_len(), 22);
        assert!(h.salt().iter().all(|&s| (1..12).contains(&s)));
    }

    #[test]
    fn int_salt_formatted_as_list() {
        let mut h = IntSaltHash::initialize(50, seeded(5));
        h.hash("abc");
        let formatted = h.formatted_salt();
        let parts: Vec<&str> = formatted.split(", ").collect();
        assert_eq!(parts.len(), 3);
        for (part, &s) in parts.iter().zip(h.salt()) {
            assert_eq!(part.parse::<u64>().unwrap(), s);
        }
    }

    #[test]
    fn kinds_are_tagged() {
        let s = StrSaltHash::initialize(5, seeded(6));
        let i = IntSaltHash::initialize(5, seeded(7));
        assert_eq!(s.kind(), SaltKind::Str);
        assert_eq!(i.kind(), SaltKind::Int);
    }
}
