//! # Montgomery — 64-bit Montgomery-Form Modular Arithmetic
//!
//! Represents arithmetic in ℤ/pℤ using Montgomery form `res(n) = n·R mod p`
//! with `R = 2^64`, replacing division by a fixed odd modulus with
//! multiply-and-shift. Every [`SieveKernel`](crate::kernel) implementation
//! is built on top of [`MontgomeryField`] (one prime per lane) and, for the
//! CPU worker's 4-prime groups, [`MontgomeryVec`] (four independent moduli,
//! lane-uniform instruction sequence, no per-lane branching on modulus).
//!
//! ## References
//!
//! - Peter L. Montgomery, "Modular Multiplication Without Trial Division",
//!   Mathematics of Computation, 44(170):519–521, 1985.

use crate::error::SieveError;

/// Vector lane width for the 4-wide kernel variant. The algorithms in
/// `kernel/` are lane-agnostic; widening to 8 only touches this constant
/// and the array literals in `MontgomeryVec`.
pub const LANES: usize = 4;

/// Per-prime Montgomery context: `{ p, q = -p^-1 mod 2^64, one = R mod p,
/// negOne = p - one, r2 = R^2 mod p }`. Lifetime is scoped to one kernel
/// iteration over that prime (spec §3).
#[derive(Clone, Copy, Debug)]
pub struct MontgomeryField {
    p: u64,
    q: u64,
    one: u64,
    neg_one: u64,
    r2: u64,
}

impl MontgomeryField {
    /// Build a Montgomery context for odd prime `p > 2`.
    ///
    /// # Errors
    /// Returns [`SieveError::Domain`] if `p` is even or less than 3 — the
    /// `PrimeSource` is assumed to only ever yield odd primes, so this is a
    /// defensive check against a family parameter or test misuse, not a
    /// path exercised in the normal sieve loop.
    pub fn new(p: u64) -> Result<Self, SieveError> {
        if p < 3 || p & 1 == 0 {
            return Err(SieveError::Domain(format!(
                "MontgomeryField requires an odd prime >= 3, got {p}"
            )));
        }
        let q = invert(p);
        let one = mont_one(p);
        let neg_one = sub(0, one, p);
        let r2 = r2(p, q, one);
        Ok(MontgomeryField { p, q, one, neg_one, r2 })
    }

    #[inline]
    pub fn p(&self) -> u64 {
        self.p
    }

    #[inline]
    pub fn one(&self) -> u64 {
        self.one
    }

    #[inline]
    pub fn neg_one(&self) -> u64 {
        self.neg_one
    }

    #[inline]
    pub fn add(&self, a: u64, b: u64) -> u64 {
        add(a, b, self.p)
    }

    #[inline]
    pub fn sub(&self, a: u64, b: u64) -> u64 {
        sub(a, b, self.p)
    }

    #[inline]
    pub fn mulmod(&self, a: u64, b: u64) -> u64 {
        mulmod(a, b, self.p, self.q)
    }

    /// `toRes(n) = mulmod(n, r2)`.
    #[inline]
    pub fn to_res(&self, n: u64) -> u64 {
        mulmod(n % self.p, self.r2, self.p, self.q)
    }

    /// `fromRes(x) = mulmod(x, 1)`.
    #[inline]
    pub fn from_res(&self, x: u64) -> u64 {
        mulmod(x, 1, self.p, self.q)
    }

    /// Montgomery modular exponentiation. `base_res` must already be in
    /// Montgomery form; the result is returned in Montgomery form.
    pub fn pow(&self, base_res: u64, mut exp: u64) -> u64 {
        let mut result = self.one;
        let mut b = base_res;
        while exp > 0 {
            if exp & 1 == 1 {
                result = self.mulmod(result, b);
            }
            exp >>= 1;
            if exp > 0 {
                b = self.mulmod(b, b);
            }
        }
        result
    }

    /// Modular inverse via Fermat's little theorem (`a^(p-2)`), operating
    /// entirely in Montgomery form. `a_res` and the result are both in
    /// Montgomery form. Returns `None` if `a_res` is congruent to zero.
    pub fn inverse(&self, a_res: u64) -> Option<u64> {
        if a_res == 0 {
            return None;
        }
        Some(self.pow(a_res, self.p - 2))
    }
}

/// Newton/Hensel iteration for `q` with `q*p ≡ 1 (mod 2^64)`. Each
/// iteration doubles the number of correct low bits; six iterations carry
/// 1 bit to 64 bits of precision (spec §4.1, §9: "preserve this count —
/// exact for 64-bit R, not a heuristic"). Paired with the subtractive
/// REDC in `mulmod` below, which needs the positive inverse, not `-p⁻¹`.
fn invert(p: u64) -> u64 {
    let mut q: u64 = 1;
    for _ in 0..6 {
        q = q.wrapping_mul(2u64.wrapping_sub(p.wrapping_mul(q)));
    }
    q
}

/// `one(p) = (-p) mod p = R mod p`.
fn mont_one(p: u64) -> u64 {
    p.wrapping_neg() % p
}

/// `r2 = R^2 mod p`, computed by 5 Montgomery squarings of `4*one` (spec
/// §4.1, §9: exactly 5 squarings, not a tunable constant).
fn r2(p: u64, q: u64, one: u64) -> u64 {
    let mut t = add(one, one, p);
    t = add(t, t, p);
    for _ in 0..5 {
        t = mulmod(t, t, p, q);
    }
    t
}

#[inline]
fn add(a: u64, b: u64, p: u64) -> u64 {
    let c = if a >= p - b { p } else { 0 };
    a + b - c
}

#[inline]
fn sub(a: u64, b: u64, p: u64) -> u64 {
    let c = if a < b { p } else { 0 };
    a - b + c
}

/// Montgomery reduction: 128-bit product, then REDC.
#[inline]
fn mulmod(a: u64, b: u64, p: u64, q: u64) -> u64 {
    let t = a as u128 * b as u128;
    let lo = t as u64;
    let hi = (t >> 64) as u64;
    let m = lo.wrapping_mul(q);
    let mp_hi = ((m as u128 * p as u128) >> 64) as u64;
    let r = (hi as i128) - (mp_hi as i128);
    if r < 0 {
        (r + p as i128) as u64
    } else {
        r as u64
    }
}

/// 4-wide Montgomery arithmetic over four independent moduli. Every lane
/// runs the same instruction sequence — no branching on which modulus is
/// in play — mirroring the original `MpArithVec` SIMD kernel (spec §4.1).
#[derive(Clone, Copy, Debug)]
pub struct MontgomeryVec {
    lanes: [MontgomeryField; LANES],
}

impl MontgomeryVec {
    pub fn new(primes: [u64; LANES]) -> Result<Self, SieveError> {
        let mut lanes = [MontgomeryField::new(3)?; LANES];
        for (i, &p) in primes.iter().enumerate() {
            lanes[i] = MontgomeryField::new(p)?;
        }
        Ok(MontgomeryVec { lanes })
    }

    #[inline]
    pub fn lane(&self, i: usize) -> &MontgomeryField {
        &self.lanes[i]
    }

    pub fn primes(&self) -> [u64; LANES] {
        std::array::from_fn(|i| self.lanes[i].p())
    }

    pub fn to_res(&self, n: [u64; LANES]) -> [u64; LANES] {
        std::array::from_fn(|i| self.lanes[i].to_res(n[i]))
    }

    pub fn from_res(&self, x: [u64; LANES]) -> [u64; LANES] {
        std::array::from_fn(|i| self.lanes[i].from_res(x[i]))
    }

    pub fn add(&self, a: [u64; LANES], b: [u64; LANES]) -> [u64; LANES] {
        std::array::from_fn(|i| self.lanes[i].add(a[i], b[i]))
    }

    pub fn sub(&self, a: [u64; LANES], b: [u64; LANES]) -> [u64; LANES] {
        std::array::from_fn(|i| self.lanes[i].sub(a[i], b[i]))
    }

    pub fn mulmod(&self, a: [u64; LANES], b: [u64; LANES]) -> [u64; LANES] {
        std::array::from_fn(|i| self.lanes[i].mulmod(a[i], b[i]))
    }

    pub fn pow(&self, base_res: [u64; LANES], exp: u64) -> [u64; LANES] {
        std::array::from_fn(|i| self.lanes[i].pow(base_res[i], exp))
    }
}
