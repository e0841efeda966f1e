//! Variable-base multiplication na·A + ng·G via windowed non-adjacent form.
//!
//! Everything here is variable time and reserved for operations on public
//! data (signature verification, public key recovery, public key tweaks).
//! The signing path never enters this module.

use crate::field::FieldElement;
use crate::group::{AffinePoint, AffineStorage, JacobianPoint};
use crate::scalar::Scalar;
use alloc::boxed::Box;
use alloc::vec::Vec;

/// Window width for the per-call table of the user-supplied point.
pub(crate) const WINDOW_A: usize = 5;

/// Window width for the precomputed generator table.
pub(crate) const WINDOW_G: usize = 16;

const TABLE_SIZE_A: usize = 1 << (WINDOW_A - 2);
const TABLE_SIZE_G: usize = 1 << (WINDOW_G - 2);

/// Precomputed tables accelerating na·A + ng·G.
pub(crate) struct EcMultContext {
    /// Odd multiples 1G, 3G, 5G, …, (2·16383 + 1)G.
    pre_g: Box<[AffineStorage]>,
}

impl EcMultContext {
    /// Builds the generator table. Allocates roughly a mebibyte.
    pub fn new() -> Self {
        let gj = JacobianPoint::from_affine(&AffinePoint::GENERATOR);
        let d = gj.double_var(None);
        let mut prej: Vec<JacobianPoint> = Vec::with_capacity(TABLE_SIZE_G);
        prej.push(gj);
        for i in 1..TABLE_SIZE_G {
            let next = prej[i - 1].add_var(&d);
            prej.push(next);
        }
        let pre_g: Vec<AffineStorage> = AffinePoint::batch_from_jacobian_var(&prej)
            .iter()
            .map(|p| p.to_storage())
            .collect();
        Self {
            pre_g: pre_g.into_boxed_slice(),
        }
    }

    /// Computes na·A + ng·G. Variable time.
    pub fn ecmult(&self, a: &JacobianPoint, na: &Scalar, ng: &Scalar) -> JacobianPoint {
        let mut wnaf_na = [0i32; 256];
        let mut wnaf_ng = [0i32; 256];

        let mut bits_na = 0;
        let mut pre_a = [AffinePoint::INFINITY; TABLE_SIZE_A];
        let mut z = FieldElement::ONE;
        if !a.is_infinity() && !bool::from(na.is_zero()) {
            bits_na = ecmult_wnaf(&mut wnaf_na, na, WINDOW_A);
            z = odd_multiples_table_globalz(&mut pre_a, a);
        }

        let bits_ng = ecmult_wnaf(&mut wnaf_ng, ng, WINDOW_G);
        let bits = bits_na.max(bits_ng);

        let mut r = JacobianPoint::INFINITY;
        for i in (0..bits).rev() {
            r = r.double_var(None);
            if i < bits_na && wnaf_na[i] != 0 {
                let t = table_get_ge(&pre_a, wnaf_na[i], WINDOW_A);
                r = r.add_ge_var(&t, None);
            }
            if i < bits_ng && wnaf_ng[i] != 0 {
                let t = table_get_ge_storage(&self.pre_g, wnaf_ng[i], WINDOW_G);
                r = r.add_zinv_var(&t, &z);
            }
        }

        if !r.is_infinity() {
            r.z = r.z.mul(&z);
        }
        r
    }
}

/// Fills `prej` with the odd multiples 1A, 3A, …, (2n−1)A, computed on the
/// isomorphic curve where 2A is affine. Entry i's true z is short a factor
/// of `d.z`; only the final entry (the only one whose z is consumed) is
/// corrected. `zr` receives the ratios between consecutive z values.
fn odd_multiples_table(
    prej: &mut [JacobianPoint],
    zr: &mut [FieldElement],
    a: &JacobianPoint,
) {
    debug_assert!(prej.len() == zr.len());
    debug_assert!(!prej.is_empty());
    debug_assert!(!a.is_infinity());

    let d = a.double_var(None);
    let d_ge = AffinePoint::from_xy(d.x, d.y);

    let dz2 = d.z.square();
    let dz3 = dz2.mul(&d.z);
    prej[0] = JacobianPoint {
        x: a.x.mul(&dz2),
        y: a.y.mul(&dz3),
        z: a.z,
        infinity: false,
    };
    zr[0] = d.z;

    for i in 1..prej.len() {
        prej[i] = prej[i - 1].add_ge_var(&d_ge, Some(&mut zr[i]));
    }

    let last = prej.len() - 1;
    prej[last].z = prej[last].z.mul(&d.z);
}

/// Builds the window-A odd-multiples table in affine form over a single
/// global denominator, which is returned.
fn odd_multiples_table_globalz(
    pre: &mut [AffinePoint; TABLE_SIZE_A],
    a: &JacobianPoint,
) -> FieldElement {
    let mut prej = [JacobianPoint::INFINITY; TABLE_SIZE_A];
    let mut zr = [FieldElement::ZERO; TABLE_SIZE_A];
    odd_multiples_table(&mut prej, &mut zr, a);

    let last = TABLE_SIZE_A - 1;
    let globalz = prej[last].z;
    pre[last] = AffinePoint::from_xy(prej[last].x, prej[last].y);
    let mut zs = zr[last];
    let mut i = last;
    while i > 0 {
        if i != last {
            zs = zs.mul(&zr[i]);
        }
        i -= 1;
        pre[i] = AffinePoint::from_jacobian_zinv(&prej[i], &zs);
    }
    globalz
}

fn table_get_ge(pre: &[AffinePoint], n: i32, w: usize) -> AffinePoint {
    debug_assert!(n & 1 == 1);
    debug_assert!(n >= -((1 << (w - 1)) - 1));
    debug_assert!(n <= (1 << (w - 1)) - 1);
    if n > 0 {
        pre[((n - 1) / 2) as usize]
    } else {
        pre[((-n - 1) / 2) as usize].neg()
    }
}

fn table_get_ge_storage(pre: &[AffineStorage], n: i32, w: usize) -> AffinePoint {
    debug_assert!(n & 1 == 1);
    debug_assert!(n >= -((1 << (w - 1)) - 1));
    debug_assert!(n <= (1 << (w - 1)) - 1);
    if n > 0 {
        AffinePoint::from(&pre[((n - 1) / 2) as usize])
    } else {
        AffinePoint::from(&pre[((-n - 1) / 2) as usize]).neg()
    }
}

/// Rewrites a scalar in width-`w` non-adjacent form: signed odd digits with
/// at most one nonzero per `w` consecutive positions. Returns the number of
/// significant positions.
pub(crate) fn ecmult_wnaf(wnaf: &mut [i32; 256], a: &Scalar, w: usize) -> usize {
    debug_assert!((2..=31).contains(&w));

    let mut s = *a;
    let mut last_set_bit: i32 = -1;
    let mut bit = 0usize;
    let mut sign = 1i32;
    let mut carry = 0i32;

    for digit in wnaf.iter_mut() {
        *digit = 0;
    }

    // keep the working value short by folding the top bit into the sign
    if s.bits(255, 1) > 0 {
        s = s.negate();
        sign = -1;
    }

    while bit < 256 {
        if s.bits(bit, 1) as i32 == carry {
            bit += 1;
            continue;
        }
        let now = w.min(256 - bit);
        let mut word = s.bits(bit, now) as i32 + carry;
        carry = (word >> (w - 1)) & 1;
        word -= carry << w;
        wnaf[bit] = sign * word;
        last_set_bit = bit as i32;
        bit += now;
    }
    debug_assert!(carry == 0);

    (last_set_bit + 1) as usize
}

#[cfg(test)]
mod tests {
    use super::{ecmult_wnaf, EcMultContext, WINDOW_A, WINDOW_G};
    use crate::group::{AffinePoint, JacobianPoint};
    use crate::scalar::Scalar;
    use hex_literal::hex;

    fn small(k: u64) -> Scalar {
        Scalar::from_raw([k, 0, 0, 0])
    }

    fn naive_mul(p: &AffinePoint, k: &Scalar) -> JacobianPoint {
        let mut r = JacobianPoint::INFINITY;
        for i in (0..256).rev() {
            r = r.double_var(None);
            if k.bits(i, 1) == 1 {
                r = r.add_ge_var(p, None);
            }
        }
        r
    }

    fn wnaf_recompose(wnaf: &[i32; 256]) -> Scalar {
        let mut acc = Scalar::ZERO;
        for digit in wnaf.iter().rev() {
            acc = acc.add(&acc);
            if *digit > 0 {
                acc = acc.add(&small(*digit as u64));
            } else if *digit < 0 {
                acc = acc.add(&small((-digit) as u64).negate());
            }
        }
        acc
    }

    #[test]
    fn wnaf_recomposes_to_input() {
        let cases = [
            small(1),
            small(0xDEADBEEF),
            Scalar::from_bytes_reduced(&hex!(
                "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEBAAEDCE6AF48A03BBFD25E8CD0364140"
            )),
            Scalar::from_bytes_reduced(&hex!(
                "8F8F7B0F632DE8140FE337E62A37F3566500A99934C2231B6CB9FD7584B8E672"
            )),
        ];
        for s in cases {
            for w in [WINDOW_A, WINDOW_G] {
                let mut wnaf = [0i32; 256];
                let bits = ecmult_wnaf(&mut wnaf, &s, w);
                assert!(bits <= 256);
                assert_eq!(wnaf_recompose(&wnaf), s);
                // digit constraints: odd values, w-sparse
                for (i, d) in wnaf.iter().enumerate() {
                    if *d != 0 {
                        assert!(d % 2 != 0);
                        assert!(wnaf[i + 1..256.min(i + w)].iter().all(|x| *x == 0));
                    }
                }
            }
        }
    }

    #[test]
    fn ecmult_matches_naive() {
        let ctx = EcMultContext::new();
        let g = AffinePoint::GENERATOR;
        let p = naive_mul(&g, &small(0x1337)).to_affine();
        let pj = JacobianPoint::from_affine(&p);

        let na = Scalar::from_bytes_reduced(&hex!(
            "00000000000000000000000000000000000000000000000000000FEDCBA98765"
        ));
        let ng = small(0xABCDEF);
        let want = naive_mul(&p, &na)
            .add_var(&naive_mul(&g, &ng))
            .to_affine();
        assert_eq!(ctx.ecmult(&pj, &na, &ng).to_affine(), want);
    }

    #[test]
    fn ecmult_generator_only() {
        let ctx = EcMultContext::new();
        let g = AffinePoint::GENERATOR;
        let k = Scalar::from_bytes_reduced(&hex!(
            "A5A5A5A5A5A5A5A5A5A5A5A5A5A5A5A5A5A5A5A5A5A5A5A5A5A5A5A5A5A5A5A5"
        ));
        let want = naive_mul(&g, &k).to_affine();
        assert_eq!(
            ctx.ecmult(&JacobianPoint::INFINITY, &Scalar::ZERO, &k).to_affine(),
            want
        );
    }

    #[test]
    fn ecmult_cancels_to_infinity() {
        let ctx = EcMultContext::new();
        let gj = JacobianPoint::from_affine(&AffinePoint::GENERATOR);
        // (n - 1)·G + 1·G = n·G = ∞
        let n_minus_1 = Scalar::ONE.negate();
        assert!(ctx.ecmult(&gj, &n_minus_1, &Scalar::ONE).is_infinity());
    }
}
