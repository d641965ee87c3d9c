//! CHM construction driver: repeated random graph attempts with escalating
//! vertex counts, until one graph is acyclic and its vertex values satisfy
//! the perfect-hash invariant.

use crate::graph::Graph;
use crate::salt::{SaltHash, SaltKind, StrSaltHash};
use log::{debug, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MphError {
    #[error("duplicate key in input")]
    DuplicateKey,
    #[error("no acyclic graph found for {keys} keys (vertex count capped at {cap})")]
    Unresolvable { keys: usize, cap: usize },
    #[error("invalid replay parameters: {0}")]
    BadReplay(String),
    #[error("unknown target language: {0:?}")]
    UnknownLanguage(String),
    #[error("line {line}: key column {col} not found")]
    MissingKeyColumn { line: usize, col: usize },
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[cfg(feature = "serde")]
    #[error("serialization error: {0}")]
    Serde(#[from] Box<bincode::ErrorKind>),
}

/// Search parameters.
#[derive(Debug, Clone)]
pub struct GenConfig {
    /// Consecutive attempts at the same vertex count before it is grown.
    /// Small values give faster builds but a larger table G.
    pub trials: usize,
    /// The vertex count may not exceed `max_growth * (keys + 1)`; past that
    /// the search fails with [`MphError::Unresolvable`].
    pub max_growth: usize,
}

impl Default for GenConfig {
    fn default() -> Self {
        Self {
            trials: 5,
            max_growth: 100,
        }
    }
}

/// A computed minimal perfect hash: two salted hash functions and the vertex
/// value table `g`, with `(g[f1(k)] + g[f2(k)]) % g.len()` equal to each
/// key's position in the input order.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone)]
pub struct PerfectHash<H> {
    pub f1: H,
    pub f2: H,
    pub g: Vec<usize>,
}

impl<H: SaltHash> PerfectHash<H> {
    /// Vertex count / table length.
    pub fn ng(&self) -> usize {
        self.g.len()
    }

    /// Index of `key` in the original key order. Well-defined only for keys
    /// the hash was built from; anything else lands on an arbitrary slot.
    pub fn index(&mut self, key: &str) -> usize {
        let ng = self.g.len();
        (self.g[self.f1.hash(key)] + self.g[self.f2.hash(key)]) % ng
    }
}

#[cfg(feature = "serde")]
impl<H: SaltHash + Serialize + DeserializeOwned> PerfectHash<H> {
    pub fn to_bytes(&self) -> Result<Vec<u8>, MphError> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MphError> {
        Ok(bincode::deserialize(bytes)?)
    }
}

/// Explicit state of the trial/escalation loop.
#[derive(Debug)]
struct Escalation {
    ng: usize,
    trial: usize,
    trials: usize,
    cap: usize,
    keys: usize,
}

impl Escalation {
    fn new(nk: usize, cfg: &GenConfig) -> Self {
        Self {
            ng: nk + 1,
            trial: 0,
            trials: cfg.trials.max(1),
            cap: cfg.max_growth * (nk + 1),
            keys: nk,
        }
    }

    /// Account for one attempt and return the vertex count to use for it,
    /// growing the count every `trials` failures and erroring out once it
    /// passes the cap.
    fn begin_trial(&mut self) -> Result<usize, MphError> {
        if self.trial % self.trials == 0 && self.trial > 0 {
            self.ng = (self.ng + 1).max((1.05 * self.ng as f64).ceil() as usize);
            debug!("growing graphs to ng = {}", self.ng);
        }
        self.trial += 1;
        if self.ng > self.cap {
            return Err(MphError::Unresolvable {
                keys: self.keys,
                cap: self.cap,
            });
        }
        Ok(self.ng)
    }

    fn trial(&self) -> usize {
        self.trial
    }
}

pub struct Generator {
    cfg: GenConfig,
}

impl Default for Generator {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator {
    pub fn new() -> Self {
        Self {
            cfg: GenConfig::default(),
        }
    }

    pub fn with_config(mut self, cfg: GenConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Search for a minimal perfect hash over `keys`, whose positions are the
    /// desired hash values. `rng` seeds the per-instance salt sources, so a
    /// seeded rng makes the whole search reproducible.
    ///
    /// Keys must be pairwise distinct; this is checked up front, before any
    /// randomness is drawn.
    pub fn generate<H, R>(&self, keys: &[String], rng: &mut R) -> Result<PerfectHash<H>, MphError>
    where
        H: SaltHash,
        R: Rng,
    {
        let nk = keys.len();
        assert!(nk > 0, "empty key set is not supported");

        let mut seen = HashSet::with_capacity(nk);
        for key in keys {
            if !seen.insert(key.as_str()) {
                return Err(MphError::DuplicateKey);
            }
        }

        let mut search = Escalation::new(nk, &self.cfg);
        loop {
            let ng = search.begin_trial()?;

            let mut f1 = H::initialize(ng, StdRng::seed_from_u64(rng.next_u64()));
            let mut f2 = H::initialize(ng, StdRng::seed_from_u64(rng.next_u64()));

            if search.trial() == 1 && nk > 10_000 && f1.kind() == SaltKind::Str {
                warn!(
                    "{nk} keys: the string-salt family is likely to fail for \
                     this many keys, use the integer-salt family instead"
                );
            }

            let mut graph = Graph::new(ng);
            for (i, key) in keys.iter().enumerate() {
                graph.connect(f1.hash(key), f2.hash(key), i);
            }

            // Cyclic graphs are the expected per-attempt outcome; discard
            // everything and go again.
            if let Some(g) = graph.assign_vertex_values() {
                debug!(
                    "acyclic graph found after {} trials, ng = {ng}",
                    search.trial()
                );
                verify(keys, &mut f1, &mut f2, &g);
                return Ok(PerfectHash { f1, f2, g });
            }
        }
    }
}

/// Rebuild the vertex value table for a known-good `(ng, f1, f2)` without any
/// random search, e.g. to reproduce a previously found construction. The
/// supplied functions must carry fixed salts covering every key. A cyclic
/// graph here means the parameters do not belong to this key set.
pub fn replay<H: SaltHash>(
    keys: &[String],
    ng: usize,
    mut f1: H,
    mut f2: H,
) -> Result<PerfectHash<H>, MphError> {
    let mut graph = Graph::new(ng);
    for (i, key) in keys.iter().enumerate() {
        graph.connect(f1.hash(key), f2.hash(key), i);
    }
    let g = graph.assign_vertex_values().ok_or_else(|| {
        MphError::BadReplay("graph is cyclic for the supplied parameters".into())
    })?;
    verify(keys, &mut f1, &mut f2, &g);
    Ok(PerfectHash { f1, f2, g })
}

/// Parse the `"N;salt1;salt2"` replay triple and build string-salt hash
/// functions from it. The integer-salt family has no textual salt form and
/// cannot be replayed this way.
pub fn parse_replay(params: &str) -> Result<(usize, StrSaltHash, StrSaltHash), MphError> {
    let parts: Vec<&str> = params.split(';').collect();
    let [ng, salt1, salt2] = parts[..] else {
        return Err(MphError::BadReplay(format!(
            "expected \"N;salt1;salt2\", got {params:?}"
        )));
    };
    let ng: usize = ng
        .trim()
        .parse()
        .map_err(|_| MphError::BadReplay(format!("bad vertex count {ng:?}")))?;
    // The modulus must exceed the key count, so anything below 2 can never
    // describe a valid construction and would divide by zero in the hashes.
    if ng < 2 {
        return Err(MphError::BadReplay(format!(
            "vertex count must be at least 2, got {ng}"
        )));
    }
    Ok((
        ng,
        StrSaltHash::with_salt(ng, salt1),
        StrSaltHash::with_salt(ng, salt2),
    ))
}

/// Re-check the perfect-hash invariant for every key. A failure here is an
/// algorithm defect, not a recoverable condition, so it panics.
fn verify<H: SaltHash>(keys: &[String], f1: &mut H, f2: &mut H, g: &[usize]) {
    let ng = g.len();
    for (i, key) in keys.iter().enumerate() {
        let hashed = (g[f1.hash(key)] + g[f2.hash(key)]) % ng;
        assert_eq!(
            hashed, i,
            "internal error: perfect hash invariant violated for key {key:?}"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::salt::IntSaltHash;
    use rand::RngCore;

    fn keys(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn three_keys_round_trip() {
        let ks = keys(&["a", "b", "c"]);
        let mut rng = StdRng::seed_from_u64(7);
        let mut ph = Generator::new()
            .generate::<StrSaltHash, _>(&ks, &mut rng)
            .unwrap();
        assert!(ph.ng() >= 4);
        for (i, key) in ks.iter().enumerate() {
            assert_eq!(ph.index(key), i);
        }
    }

    #[test]
    fn duplicate_keys_fail_before_any_attempt() {
        let ks = keys(&["a", "a"]);
        let mut rng = StdRng::seed_from_u64(0);
        let err = Generator::new()
            .generate::<StrSaltHash, _>(&ks, &mut rng)
            .unwrap_err();
        assert!(matches!(err, MphError::DuplicateKey));
        // No randomness consumed: the rng still yields its first value.
        assert_eq!(rng.next_u64(), StdRng::seed_from_u64(0).next_u64());
    }

    #[test]
    fn hundred_keys_form_a_bijection() {
        let ks: Vec<String> = (0..100).map(|i| format!("key{i}")).collect();
        let mut rng = StdRng::seed_from_u64(42);
        let mut ph = Generator::new()
            .generate::<StrSaltHash, _>(&ks, &mut rng)
            .unwrap();
        let mut seen = HashSet::new();
        for (i, key) in ks.iter().enumerate() {
            let idx = ph.index(key);
            assert_eq!(idx, i);
            assert!(seen.insert(idx));
        }
    }

    #[test]
    fn int_salt_family_constructs_too() {
        let ks = keys(&["alpha", "beta", "gamma", "delta", "epsilon"]);
        let mut rng = StdRng::seed_from_u64(11);
        let mut ph = Generator::new()
            .generate::<IntSaltHash, _>(&ks, &mut rng)
            .unwrap();
        for (i, key) in ks.iter().enumerate() {
            assert_eq!(ph.index(key), i);
        }
    }

    #[test]
    fn replay_reproduces_a_found_construction() {
        let ks = keys(&["one", "two", "three", "four"]);
        let mut rng = StdRng::seed_from_u64(5);
        let ph = Generator::new()
            .generate::<StrSaltHash, _>(&ks, &mut rng)
            .unwrap();
        let ng = ph.ng();
        let (s1, s2) = (ph.f1.salt().to_string(), ph.f2.salt().to_string());

        let first = replay(
            &ks,
            ng,
            StrSaltHash::with_salt(ng, &s1),
            StrSaltHash::with_salt(ng, &s2),
        )
        .unwrap();
        let second = replay(
            &ks,
            ng,
            StrSaltHash::with_salt(ng, &s1),
            StrSaltHash::with_salt(ng, &s2),
        )
        .unwrap();
        assert_eq!(first.g, ph.g);
        assert_eq!(first.g, second.g);
    }

    #[test]
    fn replay_with_identical_salts_reports_cyclic() {
        // f1 == f2 turns every key into a self-loop.
        let ks = keys(&["a", "b"]);
        let err = replay(
            &ks,
            3,
            StrSaltHash::with_salt(3, "Q"),
            StrSaltHash::with_salt(3, "Q"),
        )
        .unwrap_err();
        assert!(matches!(err, MphError::BadReplay(_)));
    }

    #[test]
    fn parse_replay_round_trip() {
        let (ng, mut f1, mut f2) = parse_replay("5;AB;cD").unwrap();
        assert_eq!(ng, 5);
        assert_eq!(f1.salt(), "AB");
        assert_eq!(f2.salt(), "cD");
        assert!(f1.hash("xy") < 5);
        assert!(f2.hash("xy") < 5);
    }

    #[test]
    fn parse_replay_rejects_malformed_specs() {
        assert!(matches!(
            parse_replay("5;onlyone").unwrap_err(),
            MphError::BadReplay(_)
        ));
        assert!(matches!(
            parse_replay("five;A;B").unwrap_err(),
            MphError::BadReplay(_)
        ));
    }

    #[test]
    fn parse_replay_rejects_degenerate_vertex_counts() {
        assert!(matches!(
            parse_replay("0;;").unwrap_err(),
            MphError::BadReplay(_)
        ));
        assert!(matches!(
            parse_replay("1;A;B").unwrap_err(),
            MphError::BadReplay(_)
        ));
    }

    #[test]
    fn escalation_grows_monotonically_and_caps() {
        let cfg = GenConfig {
            trials: 2,
            max_growth: 2,
        };
        let mut search = Escalation::new(3, &cfg); // ng starts at 4, cap 8
        let mut last = 0;
        let mut outcome = None;
        for _ in 0..100 {
            match search.begin_trial() {
                Ok(ng) => {
                    assert!(ng >= last, "vertex counts must not decrease");
                    assert!(ng <= 8);
                    last = ng;
                }
                Err(err) => {
                    outcome = Some(err);
                    break;
                }
            }
        }
        assert!(matches!(
            outcome,
            Some(MphError::Unresolvable { keys: 3, cap: 8 })
        ));
    }

    #[test]
    fn escalation_keeps_initial_count_for_first_trials() {
        let cfg = GenConfig::default();
        let mut search = Escalation::new(9, &cfg);
        for _ in 0..cfg.trials {
            assert_eq!(search.begin_trial().unwrap(), 10);
        }
        assert!(search.begin_trial().unwrap() > 10);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serialized_hash_still_resolves_keys() {
        let ks = keys(&["red", "green", "blue"]);
        let mut rng = StdRng::seed_from_u64(21);
        let ph = Generator::new()
            .generate::<StrSaltHash, _>(&ks, &mut rng)
            .unwrap();
        let bytes = ph.to_bytes().unwrap();
        let mut restored: PerfectHash<StrSaltHash> = PerfectHash::from_bytes(&bytes).unwrap();
        for (i, key) in ks.iter().enumerate() {
            assert_eq!(restored.index(key), i);
        }
    }
}
