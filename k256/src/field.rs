//! Field arithmetic modulo p = 2²⁵⁶ − 2³² − 977.
//!
//! Elements are held in five 52-bit limbs with lazy reduction: additions and
//! negations only grow a per-element "magnitude" bound, and a single
//! normalization brings an element back to its canonical representative.
//! Multiplication and squaring accept inputs of magnitude at most 8 and
//! always produce magnitude 1.

use subtle::{Choice, ConditionallySelectable, ConstantTimeEq, CtOption};
use zeroize::Zeroize;

/// Low 52 bits set; the bound of limbs 0..=3 of a normalized element.
const M52: u64 = 0xFFFF_FFFF_FFFF_F;

/// Low 48 bits set; the bound of the top limb of a normalized element.
const M48: u64 = 0xFFFF_FFFF_FFFF;

/// 2²⁵⁶ mod p.
const R: u64 = 0x1_0000_03D1;

/// 2²⁶⁰ mod p (the reduction multiplier for limb weights ≥ 2²⁶⁰).
const R52: u128 = 0x10_0000_3D10;

/// Limb 0 of p; limbs 1..=3 are `M52` and limb 4 is `M48`.
const P0: u64 = 0xFFFF_EFFF_FFC2F;

/// An element of the base field, `Σ n[i]·2^(52·i) (mod p)`.
///
/// `magnitude` bounds how far the limbs may have grown past the normalized
/// range: an element of magnitude `m` has `n[0..4] ≤ 2·m·(2⁵² − 1)` and
/// `n[4] ≤ 2·m·(2⁴⁸ − 1)`. `normalized` additionally asserts the unique
/// in-range representative.
#[derive(Clone, Copy, Debug)]
pub struct FieldElement {
    n: [u64; 5],
    magnitude: u32,
    normalized: bool,
}

impl Zeroize for FieldElement {
    fn zeroize(&mut self) {
        self.n.zeroize();
        self.magnitude = 1;
        self.normalized = true;
    }
}

impl FieldElement {
    /// The additive identity.
    pub const ZERO: Self = Self::from_raw([0, 0, 0, 0, 0]);

    /// The multiplicative identity.
    pub const ONE: Self = Self::from_raw([1, 0, 0, 0, 0]);

    /// Constructs a normalized element from raw 52-bit limbs.
    ///
    /// The value must already be fully reduced; only used for constants.
    pub(crate) const fn from_raw(n: [u64; 5]) -> Self {
        Self {
            n,
            magnitude: 1,
            normalized: true,
        }
    }

    #[cfg(debug_assertions)]
    fn verify(&self) {
        let m = self.magnitude as u64;
        debug_assert!(self.magnitude <= 32);
        debug_assert!(self.n[0] <= 2 * m * M52);
        debug_assert!(self.n[1] <= 2 * m * M52);
        debug_assert!(self.n[2] <= 2 * m * M52);
        debug_assert!(self.n[3] <= 2 * m * M52);
        debug_assert!(self.n[4] <= 2 * m * M48);
        if self.normalized {
            debug_assert!(self.magnitude <= 1);
        }
    }

    #[cfg(not(debug_assertions))]
    fn verify(&self) {}

    /// The current magnitude bound.
    pub(crate) fn magnitude(&self) -> u32 {
        self.magnitude
    }

    /// Decodes a big-endian 32-byte value; fails if it is not below p.
    pub fn from_bytes(bytes: &[u8; 32]) -> CtOption<Self> {
        let mut w = [0u64; 4];
        for i in 0..4 {
            let mut limb = 0u64;
            for j in 0..8 {
                limb = (limb << 8) | bytes[i * 8 + j] as u64;
            }
            w[3 - i] = limb;
        }
        let n = [
            w[0] & M52,
            (w[0] >> 52) | ((w[1] << 12) & M52),
            (w[1] >> 40) | ((w[2] << 24) & M52),
            (w[2] >> 28) | ((w[3] << 36) & M52),
            w[3] >> 16,
        ];
        let overflow = n[4].ct_eq(&M48)
            & (n[3] & n[2] & n[1]).ct_eq(&M52)
            & Choice::from((n[0] >= P0) as u8);
        CtOption::new(
            Self {
                n,
                magnitude: 1,
                normalized: true,
            },
            !overflow,
        )
    }

    /// Decodes a big-endian 32-byte value known to be below p. An
    /// out-of-range input yields an unspecified element.
    pub(crate) fn from_bytes_unchecked(bytes: &[u8; 32]) -> Self {
        let r = Self::from_bytes(bytes);
        debug_assert!(bool::from(r.is_some()));
        r.unwrap_or(Self::ZERO)
    }

    /// Encodes the element as 32 big-endian bytes. Requires a normalized input.
    pub fn to_bytes(&self) -> [u8; 32] {
        debug_assert!(self.normalized);
        self.verify();
        let n = &self.n;
        let w = [
            n[0] | (n[1] << 52),
            (n[1] >> 12) | (n[2] << 40),
            (n[2] >> 24) | (n[3] << 28),
            (n[3] >> 36) | (n[4] << 16),
        ];
        let mut out = [0u8; 32];
        for i in 0..4 {
            out[i * 8..(i + 1) * 8].copy_from_slice(&w[3 - i].to_be_bytes());
        }
        out
    }

    /// Fully reduces to the canonical in-range representative.
    pub fn normalize(&self) -> Self {
        self.verify();
        let [mut t0, mut t1, mut t2, mut t3, mut t4] = self.n;

        let x = t4 >> 48;
        t4 &= M48;
        t0 += x * R;
        t1 += t0 >> 52;
        t0 &= M52;
        t2 += t1 >> 52;
        t1 &= M52;
        t3 += t2 >> 52;
        t2 &= M52;
        t4 += t3 >> 52;
        t3 &= M52;
        debug_assert!(t4 >> 49 == 0);

        // at most one copy of p may remain
        let x = (t4 >> 48) | ((t4 == M48) & ((t1 & t2 & t3) == M52) & (t0 >= P0)) as u64;
        t0 += x * R;
        t1 += t0 >> 52;
        t0 &= M52;
        t2 += t1 >> 52;
        t1 &= M52;
        t3 += t2 >> 52;
        t2 &= M52;
        t4 += t3 >> 52;
        t3 &= M52;
        debug_assert!(t4 >> 48 == x);
        t4 &= M48;

        Self {
            n: [t0, t1, t2, t3, t4],
            magnitude: 1,
            normalized: true,
        }
    }

    /// Brings the magnitude down to 1 without producing the canonical
    /// representative (the result may still be p-shifted).
    pub fn normalize_weak(&self) -> Self {
        self.verify();
        let [mut t0, mut t1, mut t2, mut t3, mut t4] = self.n;

        let x = t4 >> 48;
        t4 &= M48;
        t0 += x * R;
        t1 += t0 >> 52;
        t0 &= M52;
        t2 += t1 >> 52;
        t1 &= M52;
        t3 += t2 >> 52;
        t2 &= M52;
        t4 += t3 >> 52;
        t3 &= M52;
        debug_assert!(t4 >> 49 == 0);

        Self {
            n: [t0, t1, t2, t3, t4],
            magnitude: 1,
            normalized: false,
        }
    }

    /// Whether the element is ≡ 0 (mod p), without requiring normalization.
    pub fn normalizes_to_zero(&self) -> Choice {
        self.verify();
        let [mut t0, mut t1, mut t2, mut t3, mut t4] = self.n;

        let x = t4 >> 48;
        t4 &= M48;
        t0 += x * R;
        t1 += t0 >> 52;
        t0 &= M52;
        let mut z0 = t0;
        let mut z1 = t0 ^ 0x1_0000_03D0;
        t2 += t1 >> 52;
        t1 &= M52;
        z0 |= t1;
        z1 &= t1;
        t3 += t2 >> 52;
        t2 &= M52;
        z0 |= t2;
        z1 &= t2;
        t4 += t3 >> 52;
        t3 &= M52;
        z0 |= t3;
        z1 &= t3;
        z0 |= t4;
        z1 &= t4 ^ 0xF_0000_0000_0000;

        z0.ct_eq(&0) | z1.ct_eq(&M52)
    }

    /// Variable-time form of [`normalizes_to_zero`][Self::normalizes_to_zero].
    pub fn normalizes_to_zero_var(&self) -> bool {
        self.normalizes_to_zero().into()
    }

    /// Whether the element is zero. Requires a normalized input.
    pub fn is_zero(&self) -> Choice {
        debug_assert!(self.normalized);
        (self.n[0] | self.n[1] | self.n[2] | self.n[3] | self.n[4]).ct_eq(&0)
    }

    /// Whether the element is odd. Requires a normalized input.
    pub fn is_odd(&self) -> Choice {
        debug_assert!(self.normalized);
        Choice::from((self.n[0] & 1) as u8)
    }

    /// Sum of two elements; magnitudes add.
    pub fn add(&self, rhs: &Self) -> Self {
        self.verify();
        rhs.verify();
        debug_assert!(self.magnitude + rhs.magnitude <= 32);
        Self {
            n: [
                self.n[0] + rhs.n[0],
                self.n[1] + rhs.n[1],
                self.n[2] + rhs.n[2],
                self.n[3] + rhs.n[3],
                self.n[4] + rhs.n[4],
            ],
            magnitude: self.magnitude + rhs.magnitude,
            normalized: false,
        }
    }

    /// Product with a small integer; magnitude is multiplied by `k`.
    pub fn mul_int(&self, k: u32) -> Self {
        self.verify();
        debug_assert!(self.magnitude * k <= 32);
        Self {
            n: [
                self.n[0] * k as u64,
                self.n[1] * k as u64,
                self.n[2] * k as u64,
                self.n[3] * k as u64,
                self.n[4] * k as u64,
            ],
            magnitude: self.magnitude * k,
            normalized: false,
        }
    }

    /// Additive inverse of an element of magnitude at most `m`; the result
    /// has magnitude `m + 1`.
    pub fn negate(&self, m: u32) -> Self {
        self.verify();
        debug_assert!(self.magnitude <= m);
        debug_assert!(m < 32);
        let k = 2 * (m as u64 + 1);
        Self {
            n: [
                P0 * k - self.n[0],
                M52 * k - self.n[1],
                M52 * k - self.n[2],
                M52 * k - self.n[3],
                M48 * k - self.n[4],
            ],
            magnitude: m + 1,
            normalized: false,
        }
    }

    /// Product of two elements, each of magnitude at most 8; magnitude 1 out.
    pub fn mul(&self, rhs: &Self) -> Self {
        self.verify();
        rhs.verify();
        debug_assert!(self.magnitude <= 8);
        debug_assert!(rhs.magnitude <= 8);
        Self {
            n: mul_inner(&self.n, &rhs.n),
            magnitude: 1,
            normalized: false,
        }
    }

    /// Square of an element of magnitude at most 8; magnitude 1 out.
    pub fn square(&self) -> Self {
        self.verify();
        debug_assert!(self.magnitude <= 8);
        Self {
            n: sqr_inner(&self.n),
            magnitude: 1,
            normalized: false,
        }
    }

    fn sqr_n(&self, k: usize) -> Self {
        let mut r = *self;
        for _ in 0..k {
            r = r.square();
        }
        r
    }

    /// The shared (2²²³ − 1)-exponent ladder of [`invert`][Self::invert] and
    /// [`sqrt`][Self::sqrt].
    fn pow_x223(&self) -> (Self, Self, Self) {
        let x2 = self.square().mul(self);
        let x3 = x2.square().mul(self);
        let x6 = x3.sqr_n(3).mul(&x3);
        let x9 = x6.sqr_n(3).mul(&x3);
        let x11 = x9.sqr_n(2).mul(&x2);
        let x22 = x11.sqr_n(11).mul(&x11);
        let x44 = x22.sqr_n(22).mul(&x22);
        let x88 = x44.sqr_n(44).mul(&x44);
        let x176 = x88.sqr_n(88).mul(&x88);
        let x220 = x176.sqr_n(44).mul(&x44);
        let x223 = x220.sqr_n(3).mul(&x3);
        (x223, x22, x2)
    }

    /// Multiplicative inverse via Fermat's little theorem; constant time.
    ///
    /// The inverse of zero is zero.
    pub fn invert(&self) -> Self {
        let (x223, x22, x2) = self.pow_x223();
        let t = x223.sqr_n(23).mul(&x22);
        let t = t.sqr_n(5).mul(self);
        let t = t.sqr_n(3).mul(&x2);
        t.sqr_n(2).mul(self)
    }

    /// Variable-time inversion; only for public operands.
    pub fn invert_var(&self) -> Self {
        self.invert()
    }

    /// Square root as x^((p+1)/4); the flag is set iff the result actually
    /// squares to the input (i.e. the input was a quadratic residue).
    /// Requires magnitude ≤ 8.
    pub fn sqrt(&self) -> (Self, Choice) {
        let (x223, x22, x2) = self.pow_x223();
        let t = x223.sqr_n(23).mul(&x22);
        let t = t.sqr_n(6).mul(&x2);
        let r = t.sqr_n(2);
        let is_root = r.square().add(&self.normalize_weak().negate(1)).normalizes_to_zero();
        (r.normalize(), is_root)
    }
}

impl ConditionallySelectable for FieldElement {
    fn conditional_select(a: &Self, b: &Self, choice: Choice) -> Self {
        Self {
            n: [
                u64::conditional_select(&a.n[0], &b.n[0], choice),
                u64::conditional_select(&a.n[1], &b.n[1], choice),
                u64::conditional_select(&a.n[2], &b.n[2], choice),
                u64::conditional_select(&a.n[3], &b.n[3], choice),
                u64::conditional_select(&a.n[4], &b.n[4], choice),
            ],
            // bookkeeping only; taking the maximum avoids a secret branch
            magnitude: a.magnitude.max(b.magnitude),
            normalized: a.normalized & b.normalized,
        }
    }
}

impl ConstantTimeEq for FieldElement {
    fn ct_eq(&self, other: &Self) -> Choice {
        debug_assert!(self.normalized && other.normalized);
        self.n[0].ct_eq(&other.n[0])
            & self.n[1].ct_eq(&other.n[1])
            & self.n[2].ct_eq(&other.n[2])
            & self.n[3].ct_eq(&other.n[3])
            & self.n[4].ct_eq(&other.n[4])
    }
}

impl PartialEq for FieldElement {
    fn eq(&self, other: &Self) -> bool {
        self.ct_eq(other).into()
    }
}

impl Eq for FieldElement {}

impl Default for FieldElement {
    fn default() -> Self {
        Self::ZERO
    }
}

/// Packed representation for precomputed tables: four 64-bit limbs,
/// little-endian, always fully reduced.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct FieldStorage(pub(crate) [u64; 4]);

impl Zeroize for FieldStorage {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}

impl FieldStorage {
    pub(crate) fn cmov(&mut self, other: &Self, choice: Choice) {
        self.0[0] = u64::conditional_select(&self.0[0], &other.0[0], choice);
        self.0[1] = u64::conditional_select(&self.0[1], &other.0[1], choice);
        self.0[2] = u64::conditional_select(&self.0[2], &other.0[2], choice);
        self.0[3] = u64::conditional_select(&self.0[3], &other.0[3], choice);
    }
}

impl From<&FieldElement> for FieldStorage {
    fn from(v: &FieldElement) -> Self {
        debug_assert!(v.normalized);
        let n = &v.n;
        FieldStorage([
            n[0] | (n[1] << 52),
            (n[1] >> 12) | (n[2] << 40),
            (n[2] >> 24) | (n[3] << 28),
            (n[3] >> 36) | (n[4] << 16),
        ])
    }
}

impl From<&FieldStorage> for FieldElement {
    fn from(v: &FieldStorage) -> Self {
        let w = &v.0;
        Self {
            n: [
                w[0] & M52,
                (w[0] >> 52) | ((w[1] << 12) & M52),
                (w[1] >> 40) | ((w[2] << 24) & M52),
                (w[2] >> 28) | ((w[3] << 36) & M52),
                w[3] >> 16,
            ],
            magnitude: 1,
            normalized: true,
        }
    }
}

/// 5×52 schoolbook multiplication with interleaved reduction by
/// 2²⁵⁶ ≡ 0x1000003D1 (mod p).
fn mul_inner(a: &[u64; 5], b: &[u64; 5]) -> [u64; 5] {
    let m = |x: u64, y: u64| (x as u128) * (y as u128);
    let (a0, a1, a2, a3, a4) = (a[0], a[1], a[2], a[3], a[4]);
    let (b0, b1, b2, b3, b4) = (b[0], b[1], b[2], b[3], b[4]);

    let mut t0 = m(a0, b0);
    let mut t1 = m(a0, b1) + m(a1, b0);
    let mut t2 = m(a0, b2) + m(a1, b1) + m(a2, b0);
    let mut t3 = m(a0, b3) + m(a1, b2) + m(a2, b1) + m(a3, b0);
    let mut t4 = m(a0, b4) + m(a1, b3) + m(a2, b2) + m(a3, b1) + m(a4, b0);
    let t5 = m(a1, b4) + m(a2, b3) + m(a3, b2) + m(a4, b1);
    let t6 = m(a2, b4) + m(a3, b3) + m(a4, b2);
    let t7 = m(a3, b4) + m(a4, b3);
    let t8 = m(a4, b4);

    // carry the high columns into 52-bit digits
    let mut c = t5;
    let u5 = (c as u64) & M52;
    c >>= 52;
    c += t6;
    let u6 = (c as u64) & M52;
    c >>= 52;
    c += t7;
    let u7 = (c as u64) & M52;
    c >>= 52;
    c += t8;
    let u8 = (c as u64) & M52;
    c >>= 52;
    let u9 = c as u64;

    // each digit sits at weight 2^(260 + 52k) and folds into column k
    t0 += R52 * u5 as u128;
    t1 += R52 * u6 as u128;
    t2 += R52 * u7 as u128;
    t3 += R52 * u8 as u128;
    t4 += R52 * u9 as u128;

    reduce_low(t0, t1, t2, t3, t4)
}

/// 5×52 squaring; identical reduction to [`mul_inner`].
fn sqr_inner(a: &[u64; 5]) -> [u64; 5] {
    let m = |x: u64, y: u64| (x as u128) * (y as u128);
    let (a0, a1, a2, a3, a4) = (a[0], a[1], a[2], a[3], a[4]);

    let mut t0 = m(a0, a0);
    let mut t1 = 2 * m(a0, a1);
    let mut t2 = 2 * m(a0, a2) + m(a1, a1);
    let mut t3 = 2 * (m(a0, a3) + m(a1, a2));
    let mut t4 = 2 * (m(a0, a4) + m(a1, a3)) + m(a2, a2);
    let t5 = 2 * (m(a1, a4) + m(a2, a3));
    let t6 = 2 * m(a2, a4) + m(a3, a3);
    let t7 = 2 * m(a3, a4);
    let t8 = m(a4, a4);

    let mut c = t5;
    let u5 = (c as u64) & M52;
    c >>= 52;
    c += t6;
    let u6 = (c as u64) & M52;
    c >>= 52;
    c += t7;
    let u7 = (c as u64) & M52;
    c >>= 52;
    c += t8;
    let u8 = (c as u64) & M52;
    c >>= 52;
    let u9 = c as u64;

    t0 += R52 * u5 as u128;
    t1 += R52 * u6 as u128;
    t2 += R52 * u7 as u128;
    t3 += R52 * u8 as u128;
    t4 += R52 * u9 as u128;

    reduce_low(t0, t1, t2, t3, t4)
}

/// Folds five partially-reduced 2⁵²-weight columns into limbs of magnitude 1.
#[inline(always)]
fn reduce_low(t0: u128, t1: u128, t2: u128, t3: u128, t4: u128) -> [u64; 5] {
    let mut c = t0;
    let r0 = (c as u64) & M52;
    c >>= 52;
    c += t1;
    let r1 = (c as u64) & M52;
    c >>= 52;
    c += t2;
    let r2 = (c as u64) & M52;
    c >>= 52;
    c += t3;
    let r3 = (c as u64) & M52;
    c >>= 52;
    c += t4;
    let r4 = (c as u64) & M52;
    c >>= 52;
    let r5 = c as u64;

    // the 2^260-weight remainder folds once more; at most one carry survives
    let mut c = r0 as u128 + R52 * r5 as u128;
    let r0 = (c as u64) & M52;
    c >>= 52;
    c += r1 as u128;
    let r1 = (c as u64) & M52;
    c >>= 52;
    c += r2 as u128;
    let r2 = (c as u64) & M52;
    c >>= 52;
    c += r3 as u128;
    let r3 = (c as u64) & M52;
    c >>= 52;
    let mut r4 = r4 + c as u64;
    debug_assert!(r4 <= 1 << 52);

    // split the top limb at 48 bits so the result has magnitude 1
    let x = r4 >> 48;
    r4 &= M48;
    let c = r0 as u128 + (R as u128) * x as u128;
    let r0 = (c as u64) & M52;
    let r1 = r1 + (c >> 52) as u64;
    debug_assert!(r1 <= 1 << 52);

    [r0, r1, r2, r3, r4]
}
