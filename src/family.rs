//! # Family — Target-Family Parameters and Factor Records
//!
//! `FamilyParameters` is the tagged set of integer-sequence families this
//! sieve eliminates terms from (spec §3). Each variant is immutable once
//! constructed and validated by [`FamilyParameters::validate`].

use serde::{Deserialize, Serialize};

use crate::error::SieveError;

/// Per-base entry for a multi-factorial term: one row of the `bases[][]`/
/// `powers[][]` tables in spec §3 (`original_source/multi_factorial/
/// mf_kernel.h`'s `D_BASES` prelude holds the flattened form of this).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MultiFactorialBasis {
    pub base: Vec<u64>,
    pub power: Vec<u32>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "family")]
pub enum FamilyParameters {
    /// n!ₘ = n·(n−m)·(n−2m)·… down to the smallest positive factor.
    MultiFactorial {
        multi: u32,
        min_n: u64,
        max_n: u64,
        bases: Vec<MultiFactorialBasis>,
    },
    /// af(n) = Σ_{k=1..n} (−1)^(n−k) k!.
    AlternatingFactorial { max_n: u64, max_steps: u64 },
    /// k·b^n + c ≡ 0 (mod p), solving for c over [min_c, max_c].
    FixedKBN { k: u64, base: u32, n: u64, min_c: i64, max_c: i64 },
    /// k·b^n + c ≡ 0 (mod p), solving for k over [min_k, max_k].
    FixedBNC { base: u32, n: u64, c: i32, min_k: u64, max_k: u64 },
    /// k·(2^n − 1) + 1 divisors (double-Mersenne cofactors).
    DMDivisor { n: u64, min_k: u64, max_k: u64 },
    /// k·b^n ± c families with no n yielding a prime (generalized
    /// Sierpinski/Riesel), sieved via baby-step/giant-step subsequences.
    SierpinskiRiesel {
        sequences: Vec<SierpinskiSequence>,
        q: u64,
        subsequences: Vec<Subsequence>,
        legendre: Option<LegendreMap>,
        residue_powers: Vec<i16>,
        sieve_low: u64,
    },
    /// Concatenated-decimal Smarandache terms (1, 12, 123, 1234, …) for n
    /// up to `max_digits` decimal digits.
    Smarandache { terms: Vec<u64>, max_digits: u32 },
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct SierpinskiSequence {
    pub k: u64,
    pub c: i64,
    pub base: u32,
    pub n_parity: Parity,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Parity {
    Even,
    Odd,
    Mixed,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Subsequence {
    pub baby_steps: u32,
    pub giant_steps: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LegendreMap {
    pub modulus: u32,
    pub one_parity_map: Option<Vec<u8>>,
    pub dual_parity_map_m1: Option<Vec<u8>>,
    pub dual_parity_map_p1: Option<Vec<u8>>,
}

impl FamilyParameters {
    /// Pre-start validation (spec §7 `DomainError`): reject non-positive
    /// or nonsensical parameters before any worker is spawned.
    pub fn validate(&self) -> Result<(), SieveError> {
        use FamilyParameters::*;
        match self {
            MultiFactorial { multi, min_n, max_n, .. } => {
                if *multi == 0 {
                    return Err(SieveError::Domain("multi must be > 0".into()));
                }
                if min_n > max_n {
                    return Err(SieveError::Domain("min_n must be <= max_n".into()));
                }
            }
            AlternatingFactorial { max_n, max_steps } => {
                if *max_n == 0 || *max_steps == 0 {
                    return Err(SieveError::Domain("max_n and max_steps must be > 0".into()));
                }
            }
            FixedKBN { k, base, min_c, max_c, .. } => {
                if *k == 0 || *base < 2 {
                    return Err(SieveError::Domain("k must be > 0 and base >= 2".into()));
                }
                if min_c > max_c {
                    return Err(SieveError::Domain("min_c must be <= max_c".into()));
                }
            }
            FixedBNC { base, c, min_k, max_k, .. } => {
                if *base < 2 {
                    return Err(SieveError::Domain("base must be >= 2".into()));
                }
                if *c != 1 && *c != -1 {
                    return Err(SieveError::Domain("c must be +1 or -1".into()));
                }
                if min_k > max_k {
                    return Err(SieveError::Domain("min_k must be <= max_k".into()));
                }
            }
            DMDivisor { n, min_k, max_k } => {
                if *n == 0 {
                    return Err(SieveError::Domain("n must be > 0".into()));
                }
                if min_k > max_k {
                    return Err(SieveError::Domain("min_k must be <= max_k".into()));
                }
            }
            SierpinskiRiesel { sequences, q, .. } => {
                if sequences.is_empty() {
                    return Err(SieveError::Domain("at least one sequence is required".into()));
                }
                if *q == 0 {
                    return Err(SieveError::Domain("q must be > 0".into()));
                }
            }
            Smarandache { terms, max_digits } => {
                if terms.is_empty() {
                    return Err(SieveError::Domain("terms must be non-empty".into()));
                }
                if *max_digits == 0 {
                    return Err(SieveError::Domain("max_digits must be > 0".into()));
                }
            }
        }
        Ok(())
    }

    pub fn name(&self) -> &'static str {
        match self {
            FamilyParameters::MultiFactorial { .. } => "multi_factorial",
            FamilyParameters::AlternatingFactorial { .. } => "alternating_factorial",
            FamilyParameters::FixedKBN { .. } => "fixed_kbn",
            FamilyParameters::FixedBNC { .. } => "fixed_bnc",
            FamilyParameters::DMDivisor { .. } => "dm_divisor",
            FamilyParameters::SierpinskiRiesel { .. } => "sierpinski_riesel",
            FamilyParameters::Smarandache { .. } => "smarandache",
        }
    }

    /// Which [`TermKey`] variant this family's table is keyed by, needed to
    /// parse a checkpoint's term list back into typed keys (the checkpoint
    /// wire format itself carries no type tag — see `checkpoint::parse_term_key`).
    pub fn term_key_shape(&self) -> TermKeyShape {
        match self {
            FamilyParameters::MultiFactorial { .. } => TermKeyShape::N,
            FamilyParameters::AlternatingFactorial { .. } => TermKeyShape::N,
            FamilyParameters::Smarandache { .. } => TermKeyShape::N,
            FamilyParameters::FixedKBN { .. } => TermKeyShape::NC,
            FamilyParameters::FixedBNC { .. } => TermKeyShape::K,
            FamilyParameters::DMDivisor { .. } => TermKeyShape::K,
            FamilyParameters::SierpinskiRiesel { .. } => TermKeyShape::KN,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TermKeyShape {
    N,
    NC,
    K,
    KN,
}

/// The per-family key identifying *which* term a factor eliminates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TermKey {
    N(u64),
    NC(u64, i64),
    K(u64),
    KN(u64, u64),
}

/// `{ prime, term, signOrC }` — proof that `prime` divides the family
/// member identified by `term` (spec §3). A given `(prime, TermKey)` pair
/// is reported at most once to downstream consumers (deduplication is
/// [`FactorSink`](crate::factor_sink::FactorSink)'s responsibility).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactorRecord {
    pub prime: u64,
    pub term: TermKey,
    pub sign_or_c: i64,
}

impl std::fmt::Display for TermKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TermKey::N(n) => write!(f, "{n}"),
            TermKey::K(k) => write!(f, "{k}"),
            TermKey::NC(n, c) => write!(f, "{n},{c}"),
            TermKey::KN(k, n) => write!(f, "{k},{n}"),
        }
    }
}

impl PartialOrd for FactorRecord {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FactorRecord {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.prime, self.term).cmp(&(other.prime, other.term))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_multi() {
        let p = FamilyParameters::MultiFactorial { multi: 0, min_n: 1, max_n: 10, bases: vec![] };
        assert!(p.validate().is_err());
    }

    #[test]
    fn rejects_inverted_range() {
        let p = FamilyParameters::FixedBNC { base: 3, n: 2, c: 1, min_k: 20, max_k: 1 };
        assert!(p.validate().is_err());
    }

    #[test]
    fn rejects_bad_c() {
        let p = FamilyParameters::FixedBNC { base: 3, n: 2, c: 2, min_k: 1, max_k: 20 };
        assert!(p.validate().is_err());
    }

    #[test]
    fn accepts_valid_dm_divisor() {
        let p = FamilyParameters::DMDivisor { n: 7, min_k: 1, max_k: 1000 };
        assert!(p.validate().is_ok());
    }

    #[test]
    fn factor_records_order_by_prime_then_term() {
        let mut v = vec![
            FactorRecord { prime: 7, term: TermKey::N(3), sign_or_c: -1 },
            FactorRecord { prime: 5, term: TermKey::N(9), sign_or_c: 1 },
            FactorRecord { prime: 5, term: TermKey::N(4), sign_or_c: -1 },
        ];
        v.sort();
        assert_eq!(v[0].term, TermKey::N(4));
        assert_eq!(v[1].term, TermKey::N(9));
        assert_eq!(v[2].prime, 7);
    }
}
