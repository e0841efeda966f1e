//! Scalar arithmetic modulo the group order n.

use crate::util::{adc, mac, sbb};
use rand_core::{CryptoRng, RngCore};
use subtle::{Choice, ConditionallySelectable, ConstantTimeEq};
use zeroize::Zeroize;

/// n, the order of the secp256k1 group, as little-endian 64-bit limbs.
const N: [u64; 4] = [
    0xBFD2_5E8C_D036_4141,
    0xBAAE_DCE6_AF48_A03B,
    0xFFFF_FFFF_FFFF_FFFE,
    0xFFFF_FFFF_FFFF_FFFF,
];

/// n - 2, the exponent of Fermat inversion.
const N_MINUS_2: [u64; 4] = [
    0xBFD2_5E8C_D036_413F,
    0xBAAE_DCE6_AF48_A03B,
    0xFFFF_FFFF_FFFF_FFFE,
    0xFFFF_FFFF_FFFF_FFFF,
];

/// (n - 1) / 2; scalars above this bound are the "high" half.
const N_HALF: [u64; 4] = [
    0xDFE9_2F46_681B_20A0,
    0x5D57_6E73_57A4_501D,
    0xFFFF_FFFF_FFFF_FFFF,
    0x7FFF_FFFF_FFFF_FFFF,
];

/// Limbs 0 and 1 of 2²⁵⁶ − n (limb 2 is 1); the reduction multiplier.
const NC0: u64 = 0x402D_A173_2FC9_BEBF;
const NC1: u64 = 0x4551_2319_50B7_5FC4;

/// An integer modulo n, always fully reduced, little-endian 64-bit limbs.
#[derive(Clone, Copy, Debug)]
pub struct Scalar(pub(crate) [u64; 4]);

impl Scalar {
    /// The additive identity.
    pub const ZERO: Self = Self([0, 0, 0, 0]);

    /// The multiplicative identity.
    pub const ONE: Self = Self([1, 0, 0, 0]);

    /// Constructs a scalar from raw limbs; the value must be below n.
    pub(crate) const fn from_raw(limbs: [u64; 4]) -> Self {
        Self(limbs)
    }

    /// Decodes 32 big-endian bytes. The flag is set iff the input was not
    /// below n; the returned scalar is reduced either way.
    pub fn from_bytes(bytes: &[u8; 32]) -> (Self, Choice) {
        let mut limbs = [0u64; 4];
        for i in 0..4 {
            let mut chunk = [0u8; 8];
            chunk.copy_from_slice(&bytes[i * 8..(i + 1) * 8]);
            limbs[3 - i] = u64::from_be_bytes(chunk);
        }
        let (_, borrow) = sub_limbs(&limbs, &N);
        let overflow = !Choice::from((borrow >> 63) as u8);
        (conditional_sub_n(limbs, overflow), overflow)
    }

    /// Decodes 32 big-endian bytes, silently reducing mod n.
    pub fn from_bytes_reduced(bytes: &[u8; 32]) -> Self {
        Self::from_bytes(bytes).0
    }

    /// Encodes the scalar as 32 big-endian bytes.
    pub fn to_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        for i in 0..4 {
            out[i * 8..(i + 1) * 8].copy_from_slice(&self.0[3 - i].to_be_bytes());
        }
        out
    }

    /// Generates a uniformly random non-zero scalar by rejection sampling.
    pub fn random<R: CryptoRng + RngCore>(rng: &mut R) -> Self {
        let mut bytes = [0u8; 32];
        loop {
            rng.fill_bytes(&mut bytes);
            let (s, overflow) = Self::from_bytes(&bytes);
            if !bool::from(overflow | s.is_zero()) {
                bytes.zeroize();
                return s;
            }
        }
    }

    /// Whether the scalar is zero.
    pub fn is_zero(&self) -> Choice {
        (self.0[0] | self.0[1] | self.0[2] | self.0[3]).ct_eq(&0)
    }

    /// Whether the scalar is even.
    pub fn is_even(&self) -> Choice {
        !Choice::from((self.0[0] & 1) as u8)
    }

    /// Whether the scalar exceeds (n − 1)/2, i.e. lies in the high half.
    pub fn is_high(&self) -> Choice {
        let (_, borrow) = sub_limbs(&N_HALF, &self.0);
        Choice::from((borrow >> 63) as u8)
    }

    /// Sum mod n.
    pub fn add(&self, rhs: &Self) -> Self {
        let (w0, carry) = adc(self.0[0], rhs.0[0], 0);
        let (w1, carry) = adc(self.0[1], rhs.0[1], carry);
        let (w2, carry) = adc(self.0[2], rhs.0[2], carry);
        let (w3, carry) = adc(self.0[3], rhs.0[3], carry);
        let (_, borrow) = sub_limbs(&[w0, w1, w2, w3], &N);
        let take = Choice::from(carry as u8) | !Choice::from((borrow >> 63) as u8);
        conditional_sub_n([w0, w1, w2, w3], take)
    }

    /// Additive inverse mod n (zero maps to zero).
    pub fn negate(&self) -> Self {
        let (neg, _) = sub_limbs(&N, &self.0);
        Self::conditional_select(&Self(neg), &Self::ZERO, self.is_zero())
    }

    /// Product mod n.
    pub fn mul(&self, rhs: &Self) -> Self {
        let a = &self.0;
        let b = &rhs.0;

        let (w0, carry) = mac(0, a[0], b[0], 0);
        let (w1, carry) = mac(0, a[0], b[1], carry);
        let (w2, carry) = mac(0, a[0], b[2], carry);
        let (w3, w4) = mac(0, a[0], b[3], carry);

        let (w1, carry) = mac(w1, a[1], b[0], 0);
        let (w2, carry) = mac(w2, a[1], b[1], carry);
        let (w3, carry) = mac(w3, a[1], b[2], carry);
        let (w4, w5) = mac(w4, a[1], b[3], carry);

        let (w2, carry) = mac(w2, a[2], b[0], 0);
        let (w3, carry) = mac(w3, a[2], b[1], carry);
        let (w4, carry) = mac(w4, a[2], b[2], carry);
        let (w5, w6) = mac(w5, a[2], b[3], carry);

        let (w3, carry) = mac(w3, a[3], b[0], 0);
        let (w4, carry) = mac(w4, a[3], b[1], carry);
        let (w5, carry) = mac(w5, a[3], b[2], carry);
        let (w6, w7) = mac(w6, a[3], b[3], carry);

        reduce_wide(&[w0, w1, w2, w3, w4, w5, w6, w7])
    }

    /// Multiplicative inverse via Fermat's little theorem, constant time in
    /// the base. The inverse of zero is zero.
    pub fn invert(&self) -> Self {
        let mut r = Self::ONE;
        let mut i = 256;
        while i > 0 {
            i -= 1;
            r = r.mul(&r);
            if (N_MINUS_2[i / 64] >> (i % 64)) & 1 == 1 {
                r = r.mul(self);
            }
        }
        r
    }

    /// Extracts `count` bits starting at bit `offset` (little-endian).
    pub(crate) fn bits(&self, offset: usize, count: usize) -> u32 {
        debug_assert!(count < 32);
        debug_assert!(offset + count <= 256);
        let index = offset >> 6;
        let shift = offset & 63;
        let mut v = self.0[index] >> shift;
        if shift + count > 64 && index < 3 {
            v |= self.0[index + 1] << (64 - shift);
        }
        (v & ((1u64 << count) - 1)) as u32
    }

    /// Variable-time `self < rhs` comparison; public operands only.
    pub(crate) fn lt_var(&self, rhs: &Self) -> bool {
        let (_, borrow) = sub_limbs(&self.0, &rhs.0);
        borrow != 0
    }
}

fn sub_limbs(l: &[u64; 4], r: &[u64; 4]) -> ([u64; 4], u64) {
    let (w0, borrow) = sbb(l[0], r[0], 0);
    let (w1, borrow) = sbb(l[1], r[1], borrow);
    let (w2, borrow) = sbb(l[2], r[2], borrow);
    let (w3, borrow) = sbb(l[3], r[3], borrow);
    ([w0, w1, w2, w3], borrow)
}

/// Subtracts n when `take` is set; the minuend must be below 2n.
fn conditional_sub_n(l: [u64; 4], take: Choice) -> Scalar {
    let (d, _) = sub_limbs(&l, &N);
    Scalar([
        u64::conditional_select(&l[0], &d[0], take),
        u64::conditional_select(&l[1], &d[1], take),
        u64::conditional_select(&l[2], &d[2], take),
        u64::conditional_select(&l[3], &d[3], take),
    ])
}

/// Reduces a 512-bit value mod n by folding the high half with
/// 2²⁵⁶ ≡ 2²⁵⁶ − n (mod n), three times, then conditionally subtracting n.
fn reduce_wide(l: &[u64; 8]) -> Scalar {
    let m = |x: u64, y: u64| (x as u128) * (y as u128);
    let (h0, h1, h2, h3) = (l[4], l[5], l[6], l[7]);

    let c0 = l[0] as u128 + m(h0, NC0);
    let c1 = l[1] as u128 + m(h0, NC1) + m(h1, NC0);
    let c2 = l[2] as u128 + h0 as u128 + m(h1, NC1) + m(h2, NC0);
    let c3 = l[3] as u128 + h1 as u128 + m(h2, NC1) + m(h3, NC0);
    let c4 = h2 as u128 + m(h3, NC1);
    let c5 = h3 as u128;

    let mut c = c0;
    let m0 = c as u64;
    c >>= 64;
    c += c1;
    let m1 = c as u64;
    c >>= 64;
    c += c2;
    let m2 = c as u64;
    c >>= 64;
    c += c3;
    let m3 = c as u64;
    c >>= 64;
    c += c4;
    let m4 = c as u64;
    c >>= 64;
    c += c5;
    let m5 = c as u64;
    c >>= 64;
    let m6 = c as u64;
    debug_assert!(m6 <= 1);

    let d0 = m0 as u128 + m(m4, NC0);
    let d1 = m1 as u128 + m(m4, NC1) + m(m5, NC0);
    let d2 = m2 as u128 + m4 as u128 + m(m5, NC1) + m(m6, NC0);
    let d3 = m3 as u128 + m5 as u128 + m(m6, NC1);
    let d4 = m6 as u128;

    let mut c = d0;
    let p0 = c as u64;
    c >>= 64;
    c += d1;
    let p1 = c as u64;
    c >>= 64;
    c += d2;
    let p2 = c as u64;
    c >>= 64;
    c += d3;
    let p3 = c as u64;
    c >>= 64;
    let p4 = (c + d4) as u64;
    debug_assert!(p4 <= 2);

    let mut c = p0 as u128 + m(p4, NC0);
    let r0 = c as u64;
    c >>= 64;
    c += p1 as u128 + m(p4, NC1);
    let r1 = c as u64;
    c >>= 64;
    c += p2 as u128 + p4 as u128;
    let r2 = c as u64;
    c >>= 64;
    c += p3 as u128;
    let r3 = c as u64;
    c >>= 64;
    let extra = c as u64;
    debug_assert!(extra <= 1);

    let r = [r0, r1, r2, r3];
    let (_, borrow) = sub_limbs(&r, &N);
    let take = Choice::from(extra as u8) | !Choice::from((borrow >> 63) as u8);
    conditional_sub_n(r, take)
}

impl ConditionallySelectable for Scalar {
    fn conditional_select(a: &Self, b: &Self, choice: Choice) -> Self {
        Self([
            u64::conditional_select(&a.0[0], &b.0[0], choice),
            u64::conditional_select(&a.0[1], &b.0[1], choice),
            u64::conditional_select(&a.0[2], &b.0[2], choice),
            u64::conditional_select(&a.0[3], &b.0[3], choice),
        ])
    }
}

impl ConstantTimeEq for Scalar {
    fn ct_eq(&self, other: &Self) -> Choice {
        self.0[0].ct_eq(&other.0[0])
            & self.0[1].ct_eq(&other.0[1])
            & self.0[2].ct_eq(&other.0[2])
            & self.0[3].ct_eq(&other.0[3])
    }
}

impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        self.ct_eq(other).into()
    }
}

impl Eq for Scalar {}

impl Default for Scalar {
    fn default() -> Self {
        Self::ZERO
    }
}

impl Zeroize for Scalar {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::{Scalar, N};
    use hex_literal::hex;
    use proptest::prelude::*;

    const N_BYTES: [u8; 32] =
        hex!("FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEBAAEDCE6AF48A03BBFD25E8CD0364141");

    #[test]
    fn overflow_flag() {
        let (s, overflow) = Scalar::from_bytes(&N_BYTES);
        assert!(bool::from(overflow));
        assert!(bool::from(s.is_zero()));

        let mut n_minus_1 = N_BYTES;
        n_minus_1[31] -= 1;
        let (s, overflow) = Scalar::from_bytes(&n_minus_1);
        assert!(!bool::from(overflow));
        assert_eq!(s.to_bytes(), n_minus_1);

        let (_, overflow) = Scalar::from_bytes(&[0xFF; 32]);
        assert!(bool::from(overflow));
    }

    #[test]
    fn add_wraps_at_n() {
        let mut n_minus_1 = N_BYTES;
        n_minus_1[31] -= 1;
        let (s, _) = Scalar::from_bytes(&n_minus_1);
        assert!(bool::from(s.add(&Scalar::ONE).is_zero()));
        assert_eq!(s.add(&Scalar::ONE.add(&Scalar::ONE)), Scalar::ONE);
    }

    #[test]
    fn negate() {
        assert!(bool::from(Scalar::ZERO.negate().is_zero()));
        let (s, _) = Scalar::from_bytes(&hex!(
            "00000000000000000000000000000000000000000000000000000000DEADBEEF"
        ));
        assert!(bool::from(s.add(&s.negate()).is_zero()));
    }

    #[test]
    fn high_half() {
        assert!(!bool::from(Scalar::ONE.is_high()));
        assert!(bool::from(Scalar::ONE.negate().is_high()));
        // (n - 1) / 2 is the largest low scalar
        let (half, _) = Scalar::from_bytes(&hex!(
            "7FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF5D576E7357A4501DDFE92F46681B20A0"
        ));
        assert!(!bool::from(half.is_high()));
        assert!(bool::from(half.add(&Scalar::ONE).is_high()));
    }

    #[test]
    fn bits() {
        let s = Scalar(N);
        assert_eq!(s.bits(0, 4), 1);
        assert_eq!(s.bits(4, 4), 4);
        assert_eq!(s.bits(252, 4), 0xF);
        // crosses the limb 0 / limb 1 boundary
        assert_eq!(s.bits(60, 8), 0xBB);
    }

    #[test]
    fn invert_one() {
        assert_eq!(Scalar::ONE.invert(), Scalar::ONE);
        assert!(bool::from(Scalar::ZERO.invert().is_zero()));
    }

    prop_compose! {
        fn scalar()(bytes in any::<[u8; 32]>()) -> Scalar {
            Scalar::from_bytes_reduced(&bytes)
        }
    }

    proptest! {
        #[test]
        fn mul_commutes(a in scalar(), b in scalar()) {
            prop_assert_eq!(a.mul(&b), b.mul(&a));
        }

        #[test]
        fn mul_associates(a in scalar(), b in scalar(), c in scalar()) {
            prop_assert_eq!(a.mul(&b).mul(&c), a.mul(&b.mul(&c)));
        }

        #[test]
        fn mul_distributes_over_add(a in scalar(), b in scalar(), c in scalar()) {
            prop_assert_eq!(a.add(&b).mul(&c), a.mul(&c).add(&b.mul(&c)));
        }

        #[test]
        fn invert_roundtrip(a in scalar()) {
            prop_assume!(!bool::from(a.is_zero()));
            prop_assert_eq!(a.invert().mul(&a), Scalar::ONE);
        }

        #[test]
        fn negate_is_additive_inverse(a in scalar()) {
            prop_assert!(bool::from(a.add(&a.negate()).is_zero()));
        }

        #[test]
        fn bytes_roundtrip(a in scalar()) {
            let (b, overflow) = Scalar::from_bytes(&a.to_bytes());
            prop_assert!(!bool::from(overflow));
            prop_assert_eq!(a, b);
        }
    }
}
